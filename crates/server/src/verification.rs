//! Verification and identification endpoints

use api_types::verification::{
    IdentifiedUser, IdentifyResponse, IdentifyStats, SimulateRequest, SimulateResponse,
    VerifiedUser, VerifyRequest, VerifyResponse,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{EngineError, parse_selector};

use crate::{ServerError, server::ServerState};

/// One-to-one verification of a named user. Grants access with 200, denies
/// with 401; both carry a JSON body.
pub async fn verify(
    Path(username): Path<String>,
    State(state): State<ServerState>,
    Json(payload): Json<VerifyRequest>,
) -> Result<(StatusCode, Json<VerifyResponse>), ServerError> {
    let finger = parse_selector(payload.finger.as_deref())?;
    let user = state.engine.user(&username).await?;
    let verified = state.engine.verify(&username, finger).await?;

    let (status, message) = if verified {
        (StatusCode::OK, "Fingerprint verified successfully")
    } else {
        (StatusCode::UNAUTHORIZED, "Fingerprint verification failed")
    };

    Ok((
        status,
        Json(VerifyResponse {
            message: message.to_string(),
            verified,
            access_granted: verified,
            user: verified.then_some(VerifiedUser {
                id: user.id,
                username: user.username,
            }),
        }),
    ))
}

/// One-to-many identification across every registered user.
pub async fn identify(
    State(state): State<ServerState>,
) -> Result<(StatusCode, Json<IdentifyResponse>), ServerError> {
    let outcome = state.engine.identify(None).await?;

    if outcome.users_checked == 0 {
        return Err(ServerError::Engine(EngineError::KeyNotFound(
            "users with enrolled fingerprints".to_string(),
        )));
    }

    let stats = IdentifyStats {
        users_checked: outcome.users_checked,
        total_fingerprints_in_system: outcome.total_fingerprints,
    };

    let response = match outcome.user {
        Some(user) => (
            StatusCode::OK,
            Json(IdentifyResponse {
                message: format!("Access granted to {}", user.username),
                verified: true,
                access_granted: true,
                user: Some(IdentifiedUser {
                    id: user.id,
                    username: user.username,
                    finger: user.finger.map(|finger| finger.to_string()),
                    label: user.label,
                    enrolled_fingerprints_count: user.enrolled_count,
                }),
                verification_stats: stats,
            }),
        ),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(IdentifyResponse {
                message: "Fingerprint not recognized".to_string(),
                verified: false,
                access_granted: false,
                user: None,
                verification_stats: stats,
            }),
        ),
    };

    Ok(response)
}

/// Scripted verification outcome for demos and integration testing; no
/// sensor involved.
pub async fn simulate(
    State(state): State<ServerState>,
    Json(payload): Json<SimulateRequest>,
) -> Result<(StatusCode, Json<SimulateResponse>), ServerError> {
    let user = state.engine.user(&payload.username).await?;
    let success = payload.success.unwrap_or(true);

    let (status, message) = if success {
        (StatusCode::OK, "Fingerprint verified successfully")
    } else {
        (StatusCode::UNAUTHORIZED, "Fingerprint verification failed")
    };

    Ok((
        status,
        Json(SimulateResponse {
            message: message.to_string(),
            verified: success,
            access_granted: success,
            simulated: true,
            user: success.then_some(VerifiedUser {
                id: user.id,
                username: user.username,
            }),
        }),
    ))
}
