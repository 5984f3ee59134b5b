use std::time::Duration;

use engine::{FprintdSensor, Sensor, SensorTimeouts, SimulatedSensor};
use migration::{Migrator, MigratorTrait};
use settings::Database;

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "fingergate={level},server={level},engine={level},fingergate::access=info",
            level = settings.app.level
        ))
        .init();

    let db = parse_database(&settings.server.database).await?;

    let sensor_settings = settings.sensor.unwrap_or_default();
    let mut timeouts = SensorTimeouts::default();
    if let Some(secs) = sensor_settings.enroll_timeout_secs {
        timeouts.enroll = Duration::from_secs(secs);
    }
    if let Some(secs) = sensor_settings.verify_timeout_secs {
        timeouts.verify = Duration::from_secs(secs);
    }

    let sensor = match sensor_settings.mode {
        settings::SensorMode::Simulated => {
            tracing::info!("using simulated sensor");
            Sensor::Simulated(SimulatedSensor::new())
        }
        settings::SensorMode::Fprintd => match FprintdSensor::connect(timeouts).await {
            Ok(sensor) => Sensor::Fprintd(sensor),
            Err(err) => {
                // Daemon absence is recoverable; fall back instead of dying.
                tracing::warn!("fingerprint daemon unreachable ({err}); using simulated sensor");
                Sensor::Simulated(SimulatedSensor::new())
            }
        },
    };

    let mut builder = engine::Engine::builder().database(db).sensor(sensor);
    if let Some(labels) = sensor_settings.labels {
        builder = builder.labels_path(labels);
    }
    let engine = builder.build()?;

    let bind = settings.server.bind.unwrap_or_else(|| "127.0.0.1".to_string());
    let addr = format!("{}:{}", bind, settings.server.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    server::run_with_listener(engine, listener).await?;

    Ok(())
}

async fn parse_database(
    config: &settings::Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
