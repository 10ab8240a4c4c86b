//! Dispatcher routing, config validation, and one-time initialization.

mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use sinkbyte_engine::commit::CommitDestination;
use sinkbyte_engine::config::types::{CommitSettings, SharedTokenSettings};
use sinkbyte_engine::config::Settings;
use sinkbyte_engine::container::lifecycle::ContainerRuntime;
use sinkbyte_engine::definitions::commit_definitions;
use sinkbyte_engine::{Connection, DestinationError, Dispatcher, Initializer, Variant};
use sinkbyte_types::definition::ConnectorDefinition;
use uuid::Uuid;

use common::{container_definition, container_destination, FakeRuntime, CONTAINER_UID};

const COMMIT_UID: Uuid = Uuid::from_u128(0x2222);

fn commit_definition(uid: Uuid) -> ConnectorDefinition {
    ConnectorDefinition {
        uid,
        id: "commit-dest".into(),
        title: "Commit".into(),
        image: None,
        spec: json!({"type": "object", "required": ["captureToken"]}),
        documentation_url: None,
    }
}

fn dispatcher(workspace: &std::path::Path, commit_uid: Uuid) -> Result<Dispatcher, DestinationError> {
    let container = container_destination(Arc::new(FakeRuntime::new()), workspace, Duration::ZERO);
    let commit = Arc::new(
        CommitDestination::new(vec![commit_definition(commit_uid)], &CommitSettings::default())
            .unwrap(),
    );
    Dispatcher::new(vec![Variant::Container(container), Variant::Commit(commit)])
}

#[test]
fn dispatch_routes_to_owning_variant() {
    let workspace = tempfile::tempdir().unwrap();
    let dispatcher = dispatcher(workspace.path(), COMMIT_UID).unwrap();

    let conn = dispatcher
        .dispatch(&CONTAINER_UID, json!({"destination_path": "/x"}))
        .unwrap();
    assert!(matches!(conn, Connection::Container(_)));
    assert_eq!(conn.definition().id, "acme-dest");

    let conn = dispatcher
        .dispatch(&COMMIT_UID, json!({"captureToken": "t"}))
        .unwrap();
    assert!(matches!(conn, Connection::Commit(_)));
}

#[test]
fn dispatch_is_deterministic() {
    let workspace = tempfile::tempdir().unwrap();
    let dispatcher = dispatcher(workspace.path(), COMMIT_UID).unwrap();
    for _ in 0..5 {
        let conn = dispatcher
            .dispatch(&CONTAINER_UID, json!({"destination_path": "/x"}))
            .unwrap();
        assert!(matches!(conn, Connection::Container(_)));
    }
}

#[test]
fn unknown_uid_is_unknown_destination() {
    let workspace = tempfile::tempdir().unwrap();
    let dispatcher = dispatcher(workspace.path(), COMMIT_UID).unwrap();
    let missing = Uuid::from_u128(0xdead);
    let err = dispatcher.dispatch(&missing, json!({})).unwrap_err();
    assert!(matches!(err, DestinationError::UnknownDestination(u) if u == missing));
}

#[test]
fn schema_violation_is_invalid_config() {
    let workspace = tempfile::tempdir().unwrap();
    let dispatcher = dispatcher(workspace.path(), COMMIT_UID).unwrap();
    let err = dispatcher
        .dispatch(&CONTAINER_UID, json!({"destination_path": 42}))
        .unwrap_err();
    assert!(matches!(err, DestinationError::InvalidConfig { .. }));
}

#[test]
fn uid_claimed_by_two_variants_fails() {
    let workspace = tempfile::tempdir().unwrap();
    let err = dispatcher(workspace.path(), CONTAINER_UID).err().unwrap();
    assert!(matches!(err, DestinationError::DuplicateUid(u) if u == CONTAINER_UID));
}

#[test]
fn registry_lists_container_then_commit() {
    let workspace = tempfile::tempdir().unwrap();
    let dispatcher = dispatcher(workspace.path(), COMMIT_UID).unwrap();
    let ids: Vec<_> = dispatcher
        .registry()
        .list()
        .iter()
        .map(|d| d.id.clone())
        .collect();
    assert_eq!(ids, vec![container_definition().id, "commit-dest".to_string()]);
    assert_eq!(dispatcher.resolve("commit-dest").unwrap().uid, COMMIT_UID);
}

#[test]
fn shared_token_mode_with_empty_token_loads_no_commit_definitions() {
    let shared = SharedTokenSettings {
        enabled: true,
        token: String::new(),
    };
    assert!(commit_definitions(&shared).unwrap().is_empty());
}

fn fake_runtime() -> Result<Arc<dyn ContainerRuntime>, DestinationError> {
    Ok(Arc::new(FakeRuntime::new()))
}

#[test]
fn initializer_builds_once_from_seeds() {
    let init = Initializer::new();
    assert!(init.get().is_none());

    let first = init.initialize_with(&Settings::default(), fake_runtime).unwrap();
    let second = init
        .initialize_with(&Settings::default(), || panic!("runtime built twice"))
        .unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert!(!first.registry().is_empty());
    assert_eq!(first.variants().len(), 2);
}

#[test]
fn initializer_concurrent_callers_share_handle() {
    let init = Arc::new(Initializer::new());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let init = Arc::clone(&init);
            std::thread::spawn(move || init.initialize_with(&Settings::default(), fake_runtime).unwrap())
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for r in &results[1..] {
        assert!(Arc::ptr_eq(&results[0], r));
    }
}

#[test]
fn failed_initialization_is_not_cached() {
    let init = Initializer::new();
    let err = init
        .initialize_with(&Settings::default(), || {
            Err(DestinationError::ContainerLifecycle {
                stage: "connect",
                message: "no docker".into(),
            })
        })
        .err()
        .unwrap();
    assert!(matches!(err, DestinationError::ContainerLifecycle { stage: "connect", .. }));
    assert!(init.get().is_none());
    assert!(init.initialize_with(&Settings::default(), fake_runtime).is_ok());
}
