//! Access-control engine.
//!
//! Orchestrates the sensor gateway (fprintd over D-Bus, or the simulated
//! backend), the JSON label store and the user/fingerprint tables. The
//! daemon's enrolled-finger set is the source of truth for what is enrolled;
//! database rows and labels are best-effort mirrors, kept in sync where
//! possible and logged when not.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, QueryFilter, prelude::*};

pub use error::EngineError;
pub use finger::{Finger, parse_selector};
pub use labels::LabelStore;
pub use sensor::{FprintdSensor, Sensor, SensorTimeouts, SimulatedSensor, VerifyOutcome};

mod error;
mod finger;
pub mod fingerprints;
mod labels;
mod sensor;
pub mod users;

type ResultEngine<T> = Result<T, EngineError>;

/// A user with the mirrored fingerprint rows.
#[derive(Clone, Debug)]
pub struct UserRecord {
    pub id: i32,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub fingerprints: Vec<FingerprintRecord>,
}

#[derive(Clone, Debug)]
pub struct FingerprintRecord {
    pub finger: Finger,
    pub label: Option<String>,
    pub template_ref: Option<String>,
}

/// A daemon-enrolled finger decorated with its label, if any.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnrolledFinger {
    pub finger: Finger,
    pub label: Option<String>,
}

/// Result of a one-to-many identification pass.
#[derive(Clone, Debug)]
pub struct IdentifyOutcome {
    pub user: Option<IdentifiedUser>,
    pub users_checked: usize,
    pub total_fingerprints: usize,
}

#[derive(Clone, Debug)]
pub struct IdentifiedUser {
    pub id: i32,
    pub username: String,
    /// `None` when the user matched but the per-finger pass could not pin
    /// down which finger it was.
    pub finger: Option<Finger>,
    pub label: Option<String>,
    pub enrolled_count: usize,
}

pub struct Engine {
    database: DatabaseConnection,
    // Serializes device access: there is one physical sensor, and the daemon
    // protocol is claim-based.
    sensor: tokio::sync::Mutex<Sensor>,
    labels: LabelStore,
}

impl Engine {
    /// Return a builder for `Engine`.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub async fn sensor_backend(&self) -> &'static str {
        self.sensor.lock().await.backend_name()
    }

    /// Registers a new user. Usernames are at least three alphanumeric
    /// characters and unique.
    pub async fn register_user(&self, username: &str, password: &str) -> ResultEngine<UserRecord> {
        validate_username(username)?;
        if password.is_empty() {
            return Err(EngineError::InvalidInput(
                "password must not be empty".to_string(),
            ));
        }

        if users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.database)
            .await?
            .is_some()
        {
            return Err(EngineError::ExistingKey(username.to_string()));
        }

        let model = users::ActiveModel {
            username: ActiveValue::Set(username.to_string()),
            password: ActiveValue::Set(password.to_string()),
            created_at: ActiveValue::Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.database)
        .await?;

        tracing::info!(user = username, "registered user");
        Ok(UserRecord {
            id: model.id,
            username: model.username,
            created_at: model.created_at,
            fingerprints: Vec::new(),
        })
    }

    /// Returns a user with its mirrored fingerprint rows.
    pub async fn user(&self, username: &str) -> ResultEngine<UserRecord> {
        let user = self.user_model(username).await?;
        let prints = user
            .find_related(fingerprints::Entity)
            .all(&self.database)
            .await?;
        Ok(user_record(user, prints))
    }

    pub async fn list_users(&self) -> ResultEngine<Vec<UserRecord>> {
        let rows = users::Entity::find()
            .find_with_related(fingerprints::Entity)
            .all(&self.database)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(user, prints)| user_record(user, prints))
            .collect())
    }

    /// Deletes a user, cascading mirrored fingerprint rows and best-effort
    /// cleaning the daemon-side prints and labels.
    pub async fn delete_user(&self, username: &str) -> ResultEngine<()> {
        let user = self.user_model(username).await?;

        {
            let sensor = self.sensor.lock().await;
            if let Err(err) = sensor.delete_all(username).await {
                tracing::warn!(%err, user = username, "failed to delete daemon-side prints");
            }
        }
        if let Err(err) = self.labels.remove_user(username).await {
            tracing::warn!(%err, user = username, "failed to remove labels");
        }

        fingerprints::Entity::delete_many()
            .filter(fingerprints::Column::UserId.eq(user.id))
            .exec(&self.database)
            .await?;
        users::Entity::delete_by_id(user.id)
            .exec(&self.database)
            .await?;

        tracing::info!(user = username, "deleted user");
        Ok(())
    }

    /// Enrolls a finger for an existing user, then mirrors the result into
    /// the fingerprints table and the label store.
    pub async fn enroll(
        &self,
        username: &str,
        finger: Finger,
        label: Option<&str>,
    ) -> ResultEngine<()> {
        let user = self.user_model(username).await?;

        {
            let sensor = self.sensor.lock().await;
            sensor.enroll(username, finger).await?;
        }
        tracing::info!(user = username, %finger, "enrollment completed");

        // Mirrors only; the daemon already holds the template.
        if let Err(err) = self.mirror_enrollment(&user, finger, label).await {
            tracing::warn!(%err, user = username, %finger, "failed to mirror enrollment row");
        }
        if let Some(label) = label {
            if let Err(err) = self.labels.set(username, finger, label).await {
                tracing::warn!(%err, user = username, %finger, "failed to persist label");
            }
        }

        Ok(())
    }

    /// One-to-one verification. `finger = None` matches against every
    /// enrolled finger of the user.
    pub async fn verify(&self, username: &str, finger: Option<Finger>) -> ResultEngine<bool> {
        self.user_model(username).await?;

        let outcome = {
            let sensor = self.sensor.lock().await;
            sensor.verify(username, finger).await?
        };

        log_access(username, outcome.is_match(), "verify");
        Ok(outcome.is_match())
    }

    /// The daemon-side enrolled set, decorated with labels.
    pub async fn enrolled_fingers(&self, username: &str) -> ResultEngine<Vec<EnrolledFinger>> {
        self.user_model(username).await?;

        let fingers = {
            let sensor = self.sensor.lock().await;
            sensor.list_enrolled(username).await?
        };

        let mut out = Vec::with_capacity(fingers.len());
        for finger in fingers {
            out.push(EnrolledFinger {
                finger,
                label: self.labels.get(username, finger).await,
            });
        }
        Ok(out)
    }

    pub async fn delete_finger(&self, username: &str, finger: Finger) -> ResultEngine<()> {
        let user = self.user_model(username).await?;

        {
            let sensor = self.sensor.lock().await;
            sensor.delete_finger(username, finger).await?;
        }

        if let Err(err) = fingerprints::Entity::delete_many()
            .filter(fingerprints::Column::UserId.eq(user.id))
            .filter(fingerprints::Column::Finger.eq(finger.as_str()))
            .exec(&self.database)
            .await
        {
            tracing::warn!(%err, user = username, %finger, "failed to remove mirror row");
        }
        if let Err(err) = self.labels.remove(username, finger).await {
            tracing::warn!(%err, user = username, %finger, "failed to remove label");
        }

        tracing::info!(user = username, %finger, "deleted fingerprint");
        Ok(())
    }

    pub async fn delete_all_fingers(&self, username: &str) -> ResultEngine<()> {
        let user = self.user_model(username).await?;

        {
            let sensor = self.sensor.lock().await;
            sensor.delete_all(username).await?;
        }

        if let Err(err) = fingerprints::Entity::delete_many()
            .filter(fingerprints::Column::UserId.eq(user.id))
            .exec(&self.database)
            .await
        {
            tracing::warn!(%err, user = username, "failed to remove mirror rows");
        }
        if let Err(err) = self.labels.remove_user(username).await {
            tracing::warn!(%err, user = username, "failed to remove labels");
        }

        tracing::info!(user = username, "deleted all fingerprints");
        Ok(())
    }

    /// One-to-many identification.
    ///
    /// The daemon has no native Identify, so this degrades to sequential
    /// per-user verification with the `any` selector, followed by a
    /// per-finger pass to pin down which finger matched. O(users × fingers)
    /// daemon round-trips.
    pub async fn identify(&self, candidates: Option<&[String]>) -> ResultEngine<IdentifyOutcome> {
        let mut users = self.list_users().await?;
        if let Some(names) = candidates {
            users.retain(|user| names.iter().any(|name| name == &user.username));
        }

        let sensor = self.sensor.lock().await;

        let mut enrolled: Vec<(UserRecord, Vec<Finger>)> = Vec::new();
        let mut total_fingerprints = 0;
        for user in users {
            match sensor.list_enrolled(&user.username).await {
                Ok(fingers) if !fingers.is_empty() => {
                    total_fingerprints += fingers.len();
                    enrolled.push((user, fingers));
                }
                Ok(_) => {}
                // Users the daemon refuses to report on are skipped, as the
                // source system did.
                Err(err) => {
                    tracing::debug!(%err, user = %user.username, "skipping candidate")
                }
            }
        }

        let users_checked = enrolled.len();

        for (user, fingers) in enrolled {
            tracing::debug!(user = %user.username, fingers = fingers.len(), "identify: checking candidate");
            if !sensor.verify(&user.username, None).await?.is_match() {
                continue;
            }

            // The user matched; try to pin down the exact finger.
            let mut matched_finger = if fingers.len() == 1 {
                Some(fingers[0])
            } else {
                None
            };
            if matched_finger.is_none() {
                for finger in &fingers {
                    if sensor
                        .verify(&user.username, Some(*finger))
                        .await?
                        .is_match()
                    {
                        matched_finger = Some(*finger);
                        break;
                    }
                }
            }

            let label = match matched_finger {
                Some(finger) => self.labels.get(&user.username, finger).await,
                None => None,
            };

            log_access(&user.username, true, "identify");
            return Ok(IdentifyOutcome {
                user: Some(IdentifiedUser {
                    id: user.id,
                    username: user.username,
                    finger: matched_finger,
                    label,
                    enrolled_count: fingers.len(),
                }),
                users_checked,
                total_fingerprints,
            });
        }

        log_access("unknown", false, "identify");
        Ok(IdentifyOutcome {
            user: None,
            users_checked,
            total_fingerprints,
        })
    }

    /// Attaches or replaces a label without re-enrolling.
    pub async fn set_label(&self, username: &str, finger: Finger, label: &str) -> ResultEngine<()> {
        let user = self.user_model(username).await?;
        self.labels.set(username, finger, label).await?;

        // Keep the mirror row in step when one exists.
        if let Some(print) = fingerprints::Entity::find()
            .filter(fingerprints::Column::UserId.eq(user.id))
            .filter(fingerprints::Column::Finger.eq(finger.as_str()))
            .one(&self.database)
            .await?
        {
            let mut print: fingerprints::ActiveModel = print.into();
            print.label = ActiveValue::Set(Some(label.to_string()));
            print.update(&self.database).await?;
        }
        Ok(())
    }

    pub async fn remove_label(&self, username: &str, finger: Finger) -> ResultEngine<()> {
        let user = self.user_model(username).await?;
        self.labels.remove(username, finger).await?;

        if let Some(print) = fingerprints::Entity::find()
            .filter(fingerprints::Column::UserId.eq(user.id))
            .filter(fingerprints::Column::Finger.eq(finger.as_str()))
            .one(&self.database)
            .await?
        {
            let mut print: fingerprints::ActiveModel = print.into();
            print.label = ActiveValue::Set(None);
            print.update(&self.database).await?;
        }
        Ok(())
    }

    async fn user_model(&self, username: &str) -> ResultEngine<users::Model> {
        users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("user {username}")))
    }

    async fn mirror_enrollment(
        &self,
        user: &users::Model,
        finger: Finger,
        label: Option<&str>,
    ) -> ResultEngine<()> {
        // Re-enrolling a finger replaces the mirror row.
        fingerprints::Entity::delete_many()
            .filter(fingerprints::Column::UserId.eq(user.id))
            .filter(fingerprints::Column::Finger.eq(finger.as_str()))
            .exec(&self.database)
            .await?;

        fingerprints::ActiveModel {
            user_id: ActiveValue::Set(user.id),
            finger: ActiveValue::Set(finger.as_str().to_string()),
            label: ActiveValue::Set(label.map(str::to_string)),
            template_ref: ActiveValue::Set(Some(fingerprints::template_ref(finger))),
            enrolled_at: ActiveValue::Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.database)
        .await?;
        Ok(())
    }
}

fn user_record(user: users::Model, prints: Vec<fingerprints::Model>) -> UserRecord {
    let fingerprints = prints
        .into_iter()
        .filter_map(|print| match Finger::try_from(print.finger.as_str()) {
            Ok(finger) => Some(FingerprintRecord {
                finger,
                label: print.label,
                template_ref: print.template_ref,
            }),
            Err(_) => {
                tracing::warn!(finger = print.finger, "mirror row holds unknown finger name");
                None
            }
        })
        .collect();

    UserRecord {
        id: user.id,
        username: user.username,
        created_at: user.created_at,
        fingerprints,
    }
}

fn validate_username(username: &str) -> Result<(), EngineError> {
    if username.len() < 3 {
        return Err(EngineError::InvalidInput(
            "username must be at least 3 characters long".to_string(),
        ));
    }
    if !username.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(EngineError::InvalidInput(
            "username must be alphanumeric".to_string(),
        ));
    }
    Ok(())
}

fn log_access(username: &str, granted: bool, method: &str) {
    if granted {
        tracing::info!(target: "fingergate::access", user = username, method, "access granted");
    } else {
        tracing::info!(target: "fingergate::access", user = username, method, "access denied");
    }
}

/// The builder for `Engine`.
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    sensor: Option<Sensor>,
    labels_path: Option<std::path::PathBuf>,
}

impl EngineBuilder {
    /// Pass the required database.
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Select the sensor backend; defaults to the simulated one.
    pub fn sensor(mut self, sensor: Sensor) -> EngineBuilder {
        self.sensor = Some(sensor);
        self
    }

    pub fn labels_path(mut self, path: impl Into<std::path::PathBuf>) -> EngineBuilder {
        self.labels_path = Some(path.into());
        self
    }

    /// Construct `Engine`.
    pub fn build(self) -> Result<Engine, EngineError> {
        let labels_path = self
            .labels_path
            .unwrap_or_else(|| std::path::PathBuf::from("fingerprints_labels.json"));
        let labels = LabelStore::open(labels_path)?;
        let sensor = self
            .sensor
            .unwrap_or_else(|| Sensor::Simulated(SimulatedSensor::new()));

        Ok(Engine {
            database: self.database,
            sensor: tokio::sync::Mutex::new(sensor),
            labels,
        })
    }
}
