//! User CRUD endpoints

use api_types::user::{FingerprintView, UserDeleted, UserList, UserNew, UserView};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{ServerError, server::ServerState};

fn user_view(user: engine::UserRecord) -> UserView {
    UserView {
        id: user.id,
        username: user.username,
        created_at: user.created_at,
        fingerprints: user
            .fingerprints
            .into_iter()
            .map(|print| FingerprintView {
                finger: print.finger.to_string(),
                label: print.label,
                template_ref: print.template_ref,
            })
            .collect(),
    }
}

pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<UserNew>,
) -> Result<(StatusCode, Json<UserView>), ServerError> {
    let user = state
        .engine
        .register_user(&payload.username, &payload.password)
        .await?;
    Ok((StatusCode::CREATED, Json(user_view(user))))
}

pub async fn list(State(state): State<ServerState>) -> Result<Json<UserList>, ServerError> {
    let users: Vec<UserView> = state
        .engine
        .list_users()
        .await?
        .into_iter()
        .map(user_view)
        .collect();
    let count = users.len();
    Ok(Json(UserList { users, count }))
}

pub async fn get(
    Path(username): Path<String>,
    State(state): State<ServerState>,
) -> Result<Json<UserView>, ServerError> {
    let user = state.engine.user(&username).await?;
    Ok(Json(user_view(user)))
}

pub async fn remove(
    Path(username): Path<String>,
    State(state): State<ServerState>,
) -> Result<Json<UserDeleted>, ServerError> {
    state.engine.delete_user(&username).await?;
    Ok(Json(UserDeleted {
        message: "User deleted successfully".to_string(),
        username,
    }))
}
