use axum::{
    Router,
    routing::{delete, get, post},
};

use std::sync::Arc;

use crate::{enrollment, health, users, verification};
use engine::Engine;

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/api/health", get(health::get))
        .route("/api/users", post(users::create).get(users::list))
        .route(
            "/api/users/{username}",
            get(users::get).delete(users::remove),
        )
        .route("/api/enrollment/user", post(enrollment::enroll_new_user))
        .route("/api/enrollment/{username}", post(enrollment::enroll))
        .route(
            "/api/enrollment/{username}/fingers",
            get(enrollment::enrolled_fingers),
        )
        .route(
            "/api/enrollment/{username}/all",
            delete(enrollment::delete_all),
        )
        .route(
            "/api/enrollment/{username}/{finger}",
            delete(enrollment::delete_finger),
        )
        .route("/api/verification", post(verification::identify))
        .route(
            "/api/verification/simulate",
            post(verification::simulate),
        )
        .route("/api/verification/{username}", post(verification::verify))
        .with_state(state)
}

pub async fn run(engine: Engine, bind: &str) {
    let listener = match tokio::net::TcpListener::bind(bind).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState {
        engine: Arc::new(engine),
    };

    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
