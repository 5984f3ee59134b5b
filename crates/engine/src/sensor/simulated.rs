//! In-memory stand-in for the fingerprint daemon.
//!
//! Used when no daemon is reachable and throughout the test suites. Enroll
//! always succeeds; verify matches iff the pair was enrolled earlier. The
//! scripted no-match set lets tests force a failed touch for an enrolled
//! finger.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tokio::sync::Mutex;

use super::VerifyOutcome;
use crate::{EngineError, Finger};

// Clones share state so callers can keep a scripting handle after handing
// the sensor to the engine.
#[derive(Clone, Default)]
pub struct SimulatedSensor {
    state: Arc<State>,
}

#[derive(Default)]
struct State {
    enrolled: Mutex<HashMap<String, BTreeSet<Finger>>>,
    rejected: Mutex<BTreeSet<String>>,
}

impl SimulatedSensor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every verification for `username` report no-match until
    /// [`accept_user`](Self::accept_user) is called.
    pub async fn reject_user(&self, username: &str) {
        self.state.rejected.lock().await.insert(username.to_string());
    }

    pub async fn accept_user(&self, username: &str) {
        self.state.rejected.lock().await.remove(username);
    }

    pub async fn enroll(&self, username: &str, finger: Finger) -> Result<(), EngineError> {
        self.state
            .enrolled
            .lock()
            .await
            .entry(username.to_string())
            .or_default()
            .insert(finger);
        Ok(())
    }

    pub async fn verify(
        &self,
        username: &str,
        finger: Option<Finger>,
    ) -> Result<VerifyOutcome, EngineError> {
        if self.state.rejected.lock().await.contains(username) {
            return Ok(VerifyOutcome::NoMatch);
        }

        let enrolled = self.state.enrolled.lock().await;
        let matched = match (enrolled.get(username), finger) {
            (Some(fingers), Some(finger)) => fingers.contains(&finger),
            (Some(fingers), None) => !fingers.is_empty(),
            (None, _) => false,
        };

        Ok(if matched {
            VerifyOutcome::Match
        } else {
            VerifyOutcome::NoMatch
        })
    }

    pub async fn list_enrolled(&self, username: &str) -> Result<Vec<Finger>, EngineError> {
        Ok(self
            .state
            .enrolled
            .lock()
            .await
            .get(username)
            .map(|fingers| fingers.iter().copied().collect())
            .unwrap_or_default())
    }

    pub async fn delete_finger(&self, username: &str, finger: Finger) -> Result<(), EngineError> {
        if let Some(fingers) = self.state.enrolled.lock().await.get_mut(username) {
            fingers.remove(&finger);
        }
        Ok(())
    }

    pub async fn delete_all(&self, username: &str) -> Result<(), EngineError> {
        self.state.enrolled.lock().await.remove(username);
        Ok(())
    }
}
