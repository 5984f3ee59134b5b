//! Enrollment endpoints

use api_types::enrollment::{
    EnrollNewUserRequest, EnrollRequest, EnrollResponse, EnrolledFinger, EnrolledFingers,
    FingerDeleted,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::Finger;

use crate::{ServerError, server::ServerState};

fn enroll_finger(raw: Option<&str>) -> Result<Finger, ServerError> {
    match raw {
        None => Ok(Finger::RightIndexFinger),
        Some(name) => Finger::try_from(name).map_err(ServerError::from),
    }
}

pub async fn enroll(
    Path(username): Path<String>,
    State(state): State<ServerState>,
    Json(payload): Json<EnrollRequest>,
) -> Result<(StatusCode, Json<EnrollResponse>), ServerError> {
    let finger = enroll_finger(payload.finger.as_deref())?;
    state
        .engine
        .enroll(&username, finger, payload.label.as_deref())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(EnrollResponse {
            message: "Fingerprint enrolled successfully".to_string(),
            username,
            finger: Some(finger.to_string()),
            label: payload.label,
            enrollment_error: None,
        }),
    ))
}

/// Creates the user and enrolls their first finger in one call. The user
/// record survives an enrollment failure; the failure is reported in the
/// response body instead.
pub async fn enroll_new_user(
    State(state): State<ServerState>,
    Json(payload): Json<EnrollNewUserRequest>,
) -> Result<(StatusCode, Json<EnrollResponse>), ServerError> {
    let finger = enroll_finger(payload.finger.as_deref())?;
    let user = state
        .engine
        .register_user(&payload.username, &payload.password)
        .await?;

    let response = match state
        .engine
        .enroll(&user.username, finger, payload.label.as_deref())
        .await
    {
        Ok(()) => EnrollResponse {
            message: "User created and fingerprint enrolled successfully".to_string(),
            username: user.username,
            finger: Some(finger.to_string()),
            label: payload.label,
            enrollment_error: None,
        },
        Err(err) => EnrollResponse {
            message: "User created but fingerprint enrollment failed".to_string(),
            username: user.username,
            finger: Some(finger.to_string()),
            label: payload.label,
            enrollment_error: Some(err.to_string()),
        },
    };

    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn enrolled_fingers(
    Path(username): Path<String>,
    State(state): State<ServerState>,
) -> Result<Json<EnrolledFingers>, ServerError> {
    let fingers: Vec<EnrolledFinger> = state
        .engine
        .enrolled_fingers(&username)
        .await?
        .into_iter()
        .map(|entry| EnrolledFinger {
            finger: entry.finger.to_string(),
            label: entry.label,
        })
        .collect();
    let count = fingers.len();

    Ok(Json(EnrolledFingers {
        username,
        enrolled_fingers: fingers,
        count,
    }))
}

pub async fn delete_finger(
    Path((username, finger)): Path<(String, String)>,
    State(state): State<ServerState>,
) -> Result<Json<FingerDeleted>, ServerError> {
    let finger = Finger::try_from(finger.as_str())?;
    state.engine.delete_finger(&username, finger).await?;

    Ok(Json(FingerDeleted {
        message: "Fingerprint deleted successfully".to_string(),
        username,
        deleted_finger: Some(finger.to_string()),
    }))
}

pub async fn delete_all(
    Path(username): Path<String>,
    State(state): State<ServerState>,
) -> Result<Json<FingerDeleted>, ServerError> {
    state.engine.delete_all_fingers(&username).await?;

    Ok(Json(FingerDeleted {
        message: "All fingerprints deleted successfully".to_string(),
        username,
        deleted_finger: None,
    }))
}
