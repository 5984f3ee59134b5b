use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;

use serde::Serialize;
pub use server::{ServerState, router, run, run_with_listener, spawn_with_listener};

mod enrollment;
mod health;
mod server;
mod users;
mod verification;

pub mod types {
    pub mod user {
        pub use api_types::user::{FingerprintView, UserDeleted, UserList, UserNew, UserView};
    }

    pub mod enrollment {
        pub use api_types::enrollment::{
            EnrollNewUserRequest, EnrollRequest, EnrollResponse, EnrolledFinger, EnrolledFingers,
            FingerDeleted,
        };
    }

    pub mod verification {
        pub use api_types::verification::{
            IdentifiedUser, IdentifyResponse, IdentifyStats, SimulateRequest, SimulateResponse,
            VerifiedUser, VerifyRequest, VerifyResponse,
        };
    }
}

pub enum ServerError {
    Engine(EngineError),
    Generic(String),
}

#[derive(Serialize)]
struct Error {
    error: String,
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::ExistingKey(_) => StatusCode::CONFLICT,
        EngineError::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
        EngineError::EnrollFailed(_)
        | EngineError::OperationTimeout(_)
        | EngineError::DeviceUnavailable(_)
        | EngineError::Bus(_) => StatusCode::SERVICE_UNAVAILABLE,
        EngineError::LabelStore(_) | EngineError::Database(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        EngineError::LabelStore(store_err) => {
            tracing::error!("label store error: {store_err}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => {
                (status_for_engine_error(&err), message_for_engine_error(err))
            }
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        (status, Json(Error { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}
