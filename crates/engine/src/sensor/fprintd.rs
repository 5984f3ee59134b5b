//! D-Bus gateway to the `fprintd` daemon.
//!
//! Operations follow the daemon's protocol: Claim the device for a username,
//! start an operation, wait for `EnrollStatus`/`VerifyStatus` signals until a
//! terminal result or the bounded timeout, then Stop and Release. Stop and
//! Release must run even when the wait failed; their own failures are logged
//! and swallowed so a stuck daemon cannot leak the claim silently.

use futures_util::StreamExt;
use zbus::{Connection, proxy, zvariant::OwnedObjectPath};

use super::{SensorTimeouts, VerifyOutcome};
use crate::{EngineError, Finger};

const NO_ENROLLED_PRINTS: &str = "net.reactivated.Fprint.Error.NoEnrolledPrints";

#[proxy(
    interface = "net.reactivated.Fprint.Manager",
    default_service = "net.reactivated.Fprint",
    default_path = "/net/reactivated/Fprint/Manager"
)]
trait Manager {
    fn get_devices(&self) -> zbus::Result<Vec<OwnedObjectPath>>;

    fn get_default_device(&self) -> zbus::Result<OwnedObjectPath>;
}

#[proxy(
    interface = "net.reactivated.Fprint.Device",
    default_service = "net.reactivated.Fprint"
)]
trait Device {
    fn claim(&self, username: &str) -> zbus::Result<()>;

    fn release(&self) -> zbus::Result<()>;

    fn enroll_start(&self, finger_name: &str) -> zbus::Result<()>;

    fn enroll_stop(&self) -> zbus::Result<()>;

    fn verify_start(&self, finger_name: &str) -> zbus::Result<()>;

    fn verify_stop(&self) -> zbus::Result<()>;

    fn list_enrolled_fingers(&self, username: &str) -> zbus::Result<Vec<String>>;

    fn delete_enrolled_finger(&self, finger_name: &str) -> zbus::Result<()>;

    fn delete_enrolled_fingers2(&self) -> zbus::Result<()>;

    #[zbus(signal)]
    fn enroll_status(&self, result: &str, done: bool) -> zbus::Result<()>;

    #[zbus(signal)]
    fn verify_status(&self, result: &str, done: bool) -> zbus::Result<()>;
}

pub struct FprintdSensor {
    device: DeviceProxy<'static>,
    timeouts: SensorTimeouts,
}

impl FprintdSensor {
    /// Connects to the system bus and binds the daemon's default device.
    pub async fn connect(timeouts: SensorTimeouts) -> Result<Self, EngineError> {
        let connection = Connection::system().await?;
        let manager = ManagerProxy::new(&connection).await?;
        let device_path = manager
            .get_default_device()
            .await
            .map_err(|err| EngineError::DeviceUnavailable(err.to_string()))?;

        tracing::info!(device = %device_path, "bound fprintd device");

        let device = DeviceProxy::builder(&connection)
            .path(device_path)?
            .build()
            .await?;

        Ok(Self { device, timeouts })
    }

    pub async fn enroll(&self, username: &str, finger: Finger) -> Result<(), EngineError> {
        self.device.claim(username).await?;
        let outcome = self.enroll_claimed(finger).await;

        // Stop/Release run regardless of the outcome.
        if let Err(err) = self.device.enroll_stop().await {
            tracing::warn!(%err, "EnrollStop failed");
        }
        if let Err(err) = self.device.release().await {
            tracing::warn!(%err, "Release failed");
        }

        outcome
    }

    async fn enroll_claimed(&self, finger: Finger) -> Result<(), EngineError> {
        let mut status = self.device.receive_enroll_status().await?;
        self.device.enroll_start(finger.as_str()).await?;

        let wait = async {
            while let Some(signal) = status.next().await {
                let args = signal.args()?;
                match args.result {
                    "enroll-completed" => return Ok(()),
                    "enroll-failed" | "enroll-unknown-error" | "enroll-disconnected"
                    | "enroll-data-full" => {
                        return Err(EngineError::EnrollFailed(args.result.to_string()));
                    }
                    stage => {
                        // enroll-stage-passed, enroll-retry-scan, ...
                        tracing::debug!(stage, "enrollment stage");
                        if args.done {
                            return Err(EngineError::EnrollFailed(stage.to_string()));
                        }
                    }
                }
            }
            Err(EngineError::DeviceUnavailable(
                "EnrollStatus stream closed".to_string(),
            ))
        };

        match tokio::time::timeout(self.timeouts.enroll, wait).await {
            Ok(result) => result,
            Err(_) => Err(EngineError::OperationTimeout("enrollment".to_string())),
        }
    }

    pub async fn verify(
        &self,
        username: &str,
        finger: Option<Finger>,
    ) -> Result<VerifyOutcome, EngineError> {
        self.device.claim(username).await?;
        let outcome = self.verify_claimed(finger).await;

        if let Err(err) = self.device.verify_stop().await {
            tracing::warn!(%err, "VerifyStop failed");
        }
        if let Err(err) = self.device.release().await {
            tracing::warn!(%err, "Release failed");
        }

        outcome
    }

    async fn verify_claimed(&self, finger: Option<Finger>) -> Result<VerifyOutcome, EngineError> {
        let mut status = self.device.receive_verify_status().await?;
        let selector = finger.map_or("any", Finger::as_str);
        self.device.verify_start(selector).await?;

        let wait = async {
            while let Some(signal) = status.next().await {
                let args = signal.args()?;
                match args.result {
                    "verify-match" => return Ok(VerifyOutcome::Match),
                    "verify-no-match" => return Ok(VerifyOutcome::NoMatch),
                    "verify-unknown-error" | "verify-disconnected" => {
                        return Err(EngineError::DeviceUnavailable(args.result.to_string()));
                    }
                    stage => {
                        // verify-retry-scan, verify-swipe-too-short, ...
                        tracing::debug!(stage, "verification stage");
                        if args.done {
                            return Ok(VerifyOutcome::NoMatch);
                        }
                    }
                }
            }
            Err(EngineError::DeviceUnavailable(
                "VerifyStatus stream closed".to_string(),
            ))
        };

        match tokio::time::timeout(self.timeouts.verify, wait).await {
            Ok(result) => result,
            Err(_) => {
                // No touch within the window counts as no-match.
                tracing::debug!("verification timed out");
                Ok(VerifyOutcome::NoMatch)
            }
        }
    }

    pub async fn list_enrolled(&self, username: &str) -> Result<Vec<Finger>, EngineError> {
        match self.device.list_enrolled_fingers(username).await {
            Ok(names) => Ok(names
                .iter()
                .filter_map(|name| match Finger::try_from(name.as_str()) {
                    Ok(finger) => Some(finger),
                    Err(_) => {
                        tracing::warn!(name, "daemon reported unknown finger name");
                        None
                    }
                })
                .collect()),
            Err(err) if is_no_enrolled_prints(&err) => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn delete_finger(&self, username: &str, finger: Finger) -> Result<(), EngineError> {
        self.device.claim(username).await?;
        let outcome = self.device.delete_enrolled_finger(finger.as_str()).await;
        if let Err(err) = self.device.release().await {
            tracing::warn!(%err, "Release failed");
        }
        outcome.map_err(Into::into)
    }

    pub async fn delete_all(&self, username: &str) -> Result<(), EngineError> {
        self.device.claim(username).await?;
        let outcome = match self.device.delete_enrolled_fingers2().await {
            Err(err) if is_no_enrolled_prints(&err) => Ok(()),
            other => other.map_err(Into::into),
        };
        if let Err(err) = self.device.release().await {
            tracing::warn!(%err, "Release failed");
        }
        outcome
    }
}

fn is_no_enrolled_prints(err: &zbus::Error) -> bool {
    matches!(err, zbus::Error::MethodError(name, _, _) if name.as_str() == NO_ENROLLED_PRINTS)
}
