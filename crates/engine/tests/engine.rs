use engine::{Engine, EngineError, Finger, Sensor, SimulatedSensor};
use migration::MigratorTrait;
use sea_orm::Database;

async fn engine_with_sensor(name: &str) -> (Engine, SimulatedSensor) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();

    let root =
        std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../target/test_engine");
    std::fs::create_dir_all(&root).unwrap();
    let labels = root.join(format!("{name}.json"));
    let _ = std::fs::remove_file(&labels);

    let sensor = SimulatedSensor::new();
    let engine = Engine::builder()
        .database(db)
        .sensor(Sensor::Simulated(sensor.clone()))
        .labels_path(labels)
        .build()
        .unwrap();
    (engine, sensor)
}

#[tokio::test]
async fn register_and_fetch_user() {
    let (engine, _) = engine_with_sensor("register_and_fetch_user").await;

    let alice = engine.register_user("alice", "secret").await.unwrap();
    assert_eq!(alice.username, "alice");
    assert!(alice.fingerprints.is_empty());

    let fetched = engine.user("alice").await.unwrap();
    assert_eq!(fetched.id, alice.id);

    let all = engine.list_users().await.unwrap();
    assert_eq!(all.len(), 1);

    let err = engine.register_user("alice", "other").await.unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));

    let err = engine.user("nobody").await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn register_rejects_bad_input() {
    let (engine, _) = engine_with_sensor("register_rejects_bad_input").await;

    let err = engine.register_user("ab", "secret").await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));

    let err = engine.register_user("not valid", "secret").await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));

    let err = engine.register_user("alice", "").await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));
}

#[tokio::test]
async fn enroll_mirrors_row_and_label() {
    let (engine, _) = engine_with_sensor("enroll_mirrors_row_and_label").await;
    engine.register_user("alice", "secret").await.unwrap();

    engine
        .enroll("alice", Finger::RightIndexFinger, Some("front door"))
        .await
        .unwrap();

    let alice = engine.user("alice").await.unwrap();
    assert_eq!(alice.fingerprints.len(), 1);
    let print = &alice.fingerprints[0];
    assert_eq!(print.finger, Finger::RightIndexFinger);
    assert_eq!(print.label.as_deref(), Some("front door"));
    assert_eq!(print.template_ref.as_deref(), Some("fprintd://right-index-finger"));

    let enrolled = engine.enrolled_fingers("alice").await.unwrap();
    assert_eq!(enrolled.len(), 1);
    assert_eq!(enrolled[0].finger, Finger::RightIndexFinger);
    assert_eq!(enrolled[0].label.as_deref(), Some("front door"));

    // Re-enrollment replaces the mirror row instead of stacking another.
    engine
        .enroll("alice", Finger::RightIndexFinger, Some("garage"))
        .await
        .unwrap();
    let alice = engine.user("alice").await.unwrap();
    assert_eq!(alice.fingerprints.len(), 1);
    assert_eq!(alice.fingerprints[0].label.as_deref(), Some("garage"));
}

#[tokio::test]
async fn enroll_requires_existing_user() {
    let (engine, _) = engine_with_sensor("enroll_requires_existing_user").await;
    let err = engine
        .enroll("nobody", Finger::LeftThumb, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn verify_matches_and_rejects() {
    let (engine, sensor) = engine_with_sensor("verify_matches_and_rejects").await;
    engine.register_user("alice", "secret").await.unwrap();
    engine
        .enroll("alice", Finger::RightIndexFinger, None)
        .await
        .unwrap();

    assert!(engine.verify("alice", None).await.unwrap());
    assert!(engine.verify("alice", Some(Finger::RightIndexFinger)).await.unwrap());
    assert!(!engine.verify("alice", Some(Finger::LeftThumb)).await.unwrap());

    sensor.reject_user("alice").await;
    assert!(!engine.verify("alice", None).await.unwrap());

    sensor.accept_user("alice").await;
    assert!(engine.verify("alice", None).await.unwrap());

    let err = engine.verify("nobody", None).await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn identify_finds_the_matching_user() {
    let (engine, sensor) = engine_with_sensor("identify_finds_the_matching_user").await;
    engine.register_user("alice", "secret").await.unwrap();
    engine.register_user("bob", "secret").await.unwrap();
    engine.register_user("carol", "secret").await.unwrap();

    engine
        .enroll("alice", Finger::RightIndexFinger, Some("front door"))
        .await
        .unwrap();
    engine
        .enroll("bob", Finger::LeftThumb, None)
        .await
        .unwrap();
    // carol has no prints and must not count as checked.

    sensor.reject_user("alice").await;

    let outcome = engine.identify(None).await.unwrap();
    let user = outcome.user.expect("bob should match");
    assert_eq!(user.username, "bob");
    assert_eq!(user.finger, Some(Finger::LeftThumb));
    assert_eq!(user.enrolled_count, 1);
    assert_eq!(outcome.users_checked, 2);
    assert_eq!(outcome.total_fingerprints, 2);
}

#[tokio::test]
async fn identify_reports_no_match() {
    let (engine, sensor) = engine_with_sensor("identify_reports_no_match").await;
    engine.register_user("alice", "secret").await.unwrap();
    engine
        .enroll("alice", Finger::RightIndexFinger, None)
        .await
        .unwrap();
    sensor.reject_user("alice").await;

    let outcome = engine.identify(None).await.unwrap();
    assert!(outcome.user.is_none());
    assert_eq!(outcome.users_checked, 1);
}

#[tokio::test]
async fn identify_respects_candidate_filter() {
    let (engine, _) = engine_with_sensor("identify_respects_candidate_filter").await;
    engine.register_user("alice", "secret").await.unwrap();
    engine.register_user("bob", "secret").await.unwrap();
    engine
        .enroll("alice", Finger::RightIndexFinger, None)
        .await
        .unwrap();
    engine.enroll("bob", Finger::LeftThumb, None).await.unwrap();

    let candidates = vec!["bob".to_string()];
    let outcome = engine.identify(Some(&candidates)).await.unwrap();
    assert_eq!(outcome.user.unwrap().username, "bob");
    assert_eq!(outcome.users_checked, 1);
    assert_eq!(outcome.total_fingerprints, 1);
}

#[tokio::test]
async fn delete_finger_and_delete_all() {
    let (engine, _) = engine_with_sensor("delete_finger_and_delete_all").await;
    engine.register_user("alice", "secret").await.unwrap();
    engine
        .enroll("alice", Finger::RightIndexFinger, Some("front door"))
        .await
        .unwrap();
    engine
        .enroll("alice", Finger::LeftThumb, None)
        .await
        .unwrap();

    engine
        .delete_finger("alice", Finger::RightIndexFinger)
        .await
        .unwrap();
    let enrolled = engine.enrolled_fingers("alice").await.unwrap();
    assert_eq!(enrolled.len(), 1);
    assert_eq!(enrolled[0].finger, Finger::LeftThumb);
    assert_eq!(engine.user("alice").await.unwrap().fingerprints.len(), 1);

    engine.delete_all_fingers("alice").await.unwrap();
    assert!(engine.enrolled_fingers("alice").await.unwrap().is_empty());
    assert!(engine.user("alice").await.unwrap().fingerprints.is_empty());
    assert!(!engine.verify("alice", None).await.unwrap());
}

#[tokio::test]
async fn delete_user_cascades() {
    let (engine, sensor) = engine_with_sensor("delete_user_cascades").await;
    engine.register_user("alice", "secret").await.unwrap();
    engine
        .enroll("alice", Finger::RightIndexFinger, Some("front door"))
        .await
        .unwrap();

    engine.delete_user("alice").await.unwrap();
    let err = engine.user("alice").await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
    assert!(sensor.list_enrolled("alice").await.unwrap().is_empty());

    // A re-registered alice starts clean.
    let alice = engine.register_user("alice", "secret").await.unwrap();
    assert!(alice.fingerprints.is_empty());
    assert!(engine.enrolled_fingers("alice").await.unwrap().is_empty());
}

#[tokio::test]
async fn labels_can_be_managed_after_enrollment() {
    let (engine, _) = engine_with_sensor("labels_can_be_managed_after_enrollment").await;
    engine.register_user("alice", "secret").await.unwrap();
    engine
        .enroll("alice", Finger::RightIndexFinger, None)
        .await
        .unwrap();

    engine
        .set_label("alice", Finger::RightIndexFinger, "server room")
        .await
        .unwrap();
    let enrolled = engine.enrolled_fingers("alice").await.unwrap();
    assert_eq!(enrolled[0].label.as_deref(), Some("server room"));
    let alice = engine.user("alice").await.unwrap();
    assert_eq!(alice.fingerprints[0].label.as_deref(), Some("server room"));

    engine
        .remove_label("alice", Finger::RightIndexFinger)
        .await
        .unwrap();
    let enrolled = engine.enrolled_fingers("alice").await.unwrap();
    assert_eq!(enrolled[0].label, None);
}
