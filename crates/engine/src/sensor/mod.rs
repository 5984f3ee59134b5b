//! Sensor gateway.
//!
//! Two backends behind one enum: the real `fprintd` daemon spoken to over
//! D-Bus, and an in-memory simulation used when no daemon is reachable and
//! in tests. Matching itself always happens on the other side of the seam;
//! this module only claims the device, starts operations and waits for the
//! daemon's status signals.

use std::time::Duration;

use crate::{EngineError, Finger};

mod fprintd;
mod simulated;

pub use fprintd::FprintdSensor;
pub use simulated::SimulatedSensor;

/// Outcome of a one-to-one verification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerifyOutcome {
    Match,
    NoMatch,
}

impl VerifyOutcome {
    pub fn is_match(self) -> bool {
        matches!(self, Self::Match)
    }
}

/// Bounded waits for daemon-driven operations.
///
/// Defaults follow the source system: enrollment may take several scans,
/// verification is a single touch.
#[derive(Clone, Copy, Debug)]
pub struct SensorTimeouts {
    pub enroll: Duration,
    pub verify: Duration,
}

impl Default for SensorTimeouts {
    fn default() -> Self {
        Self {
            enroll: Duration::from_secs(60),
            verify: Duration::from_secs(10),
        }
    }
}

pub enum Sensor {
    Fprintd(FprintdSensor),
    Simulated(SimulatedSensor),
}

impl Sensor {
    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Fprintd(_) => "fprintd",
            Self::Simulated(_) => "simulated",
        }
    }

    /// Records a new template for `(username, finger)`.
    pub async fn enroll(&self, username: &str, finger: Finger) -> Result<(), EngineError> {
        match self {
            Self::Fprintd(sensor) => sensor.enroll(username, finger).await,
            Self::Simulated(sensor) => sensor.enroll(username, finger).await,
        }
    }

    /// One-to-one match against a named finger, or against every enrolled
    /// finger of the user when `finger` is `None`.
    pub async fn verify(
        &self,
        username: &str,
        finger: Option<Finger>,
    ) -> Result<VerifyOutcome, EngineError> {
        match self {
            Self::Fprintd(sensor) => sensor.verify(username, finger).await,
            Self::Simulated(sensor) => sensor.verify(username, finger).await,
        }
    }

    /// The daemon-side enrolled set; the source of truth.
    pub async fn list_enrolled(&self, username: &str) -> Result<Vec<Finger>, EngineError> {
        match self {
            Self::Fprintd(sensor) => sensor.list_enrolled(username).await,
            Self::Simulated(sensor) => sensor.list_enrolled(username).await,
        }
    }

    pub async fn delete_finger(&self, username: &str, finger: Finger) -> Result<(), EngineError> {
        match self {
            Self::Fprintd(sensor) => sensor.delete_finger(username, finger).await,
            Self::Simulated(sensor) => sensor.delete_finger(username, finger).await,
        }
    }

    pub async fn delete_all(&self, username: &str) -> Result<(), EngineError> {
        match self {
            Self::Fprintd(sensor) => sensor.delete_all(username).await,
            Self::Simulated(sensor) => sensor.delete_all(username).await,
        }
    }
}
