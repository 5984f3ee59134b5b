use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod health {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Health {
        pub status: String,
        pub message: String,
    }
}

pub mod user {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct UserNew {
        pub username: String,
        pub password: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct UserView {
        pub id: i32,
        pub username: String,
        /// RFC3339 timestamp (UTC).
        pub created_at: DateTime<Utc>,
        pub fingerprints: Vec<FingerprintView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct FingerprintView {
        pub finger: String,
        pub label: Option<String>,
        /// Opaque reference to the daemon-held template, e.g.
        /// `fprintd://right-index-finger`.
        pub template_ref: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct UserList {
        pub users: Vec<UserView>,
        pub count: usize,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct UserDeleted {
        pub message: String,
        pub username: String,
    }
}

pub mod enrollment {
    use super::*;

    /// Request body for enrolling a finger of an existing user.
    ///
    /// `finger` defaults to `right-index-finger` when absent.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct EnrollRequest {
        pub finger: Option<String>,
        pub label: Option<String>,
    }

    /// Request body for creating a user and enrolling their first finger in
    /// one call.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct EnrollNewUserRequest {
        pub username: String,
        pub password: String,
        pub finger: Option<String>,
        pub label: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct EnrollResponse {
        pub message: String,
        pub username: String,
        pub finger: Option<String>,
        pub label: Option<String>,
        /// Present when the user was created but enrollment itself failed.
        #[serde(skip_serializing_if = "Option::is_none")]
        pub enrollment_error: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct EnrolledFinger {
        pub finger: String,
        pub label: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct EnrolledFingers {
        pub username: String,
        pub enrolled_fingers: Vec<EnrolledFinger>,
        pub count: usize,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct FingerDeleted {
        pub message: String,
        pub username: String,
        pub deleted_finger: Option<String>,
    }
}

pub mod verification {
    use super::*;

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct VerifyRequest {
        /// Specific finger to match against; `None` means `any`.
        pub finger: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct VerifyResponse {
        pub message: String,
        pub verified: bool,
        pub access_granted: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub user: Option<VerifiedUser>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct VerifiedUser {
        pub id: i32,
        pub username: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct IdentifyResponse {
        pub message: String,
        pub verified: bool,
        pub access_granted: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub user: Option<IdentifiedUser>,
        pub verification_stats: IdentifyStats,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct IdentifiedUser {
        pub id: i32,
        pub username: String,
        /// Which finger matched, when the per-finger pass could pin it down.
        pub finger: Option<String>,
        pub label: Option<String>,
        pub enrolled_fingerprints_count: usize,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct IdentifyStats {
        pub users_checked: usize,
        pub total_fingerprints_in_system: usize,
    }

    /// Request body for the simulated verification endpoint (testing aid).
    #[derive(Debug, Serialize, Deserialize)]
    pub struct SimulateRequest {
        pub username: String,
        /// Defaults to `true`.
        pub success: Option<bool>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SimulateResponse {
        pub message: String,
        pub verified: bool,
        pub access_granted: bool,
        pub simulated: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub user: Option<VerifiedUser>,
    }
}
