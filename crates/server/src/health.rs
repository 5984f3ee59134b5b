use api_types::health::Health;
use axum::{Json, extract::State};

use crate::server::ServerState;

pub async fn get(State(state): State<ServerState>) -> Json<Health> {
    let backend = state.engine.sensor_backend().await;
    Json(Health {
        status: "healthy".to_string(),
        message: format!("Fingerprint access control API is running ({backend} sensor)"),
    })
}
