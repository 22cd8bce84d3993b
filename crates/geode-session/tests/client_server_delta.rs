//! End-to-end replication tests.
//!
//! Two repositories share one region, standing in for two application nodes
//! talking to the same data grid. Writes from one node are read back by the
//! other, and lifecycle events arrive through region notifications.

use std::sync::Arc;
use std::time::Duration;

use geode_session::{
    AttributeStore, AttributeValue, DATA_ATTRIBUTES_SERIALIZER_ID, EncodeMode, Error, LocalRegion,
    LocalRegionConfig, RepositoryConfig, SerializerRegistry, SessionEventKind, SessionRepository,
};
use proptest::prelude::*;

fn cluster(
    region_config: LocalRegionConfig,
    repo_config: RepositoryConfig,
) -> (
    Arc<LocalRegion>,
    SessionRepository<LocalRegion>,
    SessionRepository<LocalRegion>,
) {
    let registry = Arc::new(SerializerRegistry::with_defaults());
    let region = Arc::new(LocalRegion::new(region_config, Arc::clone(&registry)));
    let node_a =
        SessionRepository::new(Arc::clone(&region), Arc::clone(&registry), repo_config.clone())
            .unwrap();
    let node_b = SessionRepository::new(Arc::clone(&region), registry, repo_config).unwrap();
    (region, node_a, node_b)
}

#[tokio::test]
async fn test_attribute_set_and_remove_replicate() {
    let (_region, node_a, node_b) = cluster(LocalRegionConfig::new(), RepositoryConfig::new());

    let mut session = node_a.create_session();
    session.set_attribute("a", 1);
    node_a.save(&mut session).await.unwrap();

    let mut remote = node_b.find_by_id(session.id()).await.unwrap().unwrap();
    assert_eq!(remote.get_attribute("a"), Some(AttributeValue::Int(1)));

    remote.remove_attribute("a");
    node_b.save(&mut remote).await.unwrap();

    let back = node_a.find_by_id(session.id()).await.unwrap().unwrap();
    assert_eq!(back.attribute_names().count(), 0);
}

#[tokio::test]
async fn test_delta_carries_only_changes() {
    let (_region, node_a, node_b) = cluster(LocalRegionConfig::new(), RepositoryConfig::new());

    let mut session = node_a.create_session();
    session.set_attribute("keep", "unchanged");
    session.set_attribute("y", 2);
    node_a.save(&mut session).await.unwrap();

    session.set_attribute("x", 1);
    session.remove_attribute("y");
    let delta = session.delta();
    assert_eq!(
        delta.attributes.updated,
        vec![("x".to_string(), AttributeValue::Int(1))]
    );
    assert_eq!(delta.attributes.removed, vec!["y".to_string()]);
    node_a.save(&mut session).await.unwrap();

    let remote = node_b.find_by_id(session.id()).await.unwrap().unwrap();
    let mut names: Vec<String> = remote.attribute_names().collect();
    names.sort();
    assert_eq!(names, vec!["keep".to_string(), "x".to_string()]);
}

#[tokio::test]
async fn test_events_reach_every_node() {
    let (_region, node_a, node_b) = cluster(LocalRegionConfig::new(), RepositoryConfig::new());
    let mut events_b = node_b.notifier().subscribe_channel();

    let mut session = node_a.create_session();
    node_a.save(&mut session).await.unwrap();
    session.set_attribute("n", 1);
    node_a.save(&mut session).await.unwrap();
    node_a.delete_by_id(session.id()).await.unwrap();

    let mut kinds = Vec::new();
    while let Ok(event) = events_b.try_recv() {
        assert_eq!(event.session_id, session.id());
        kinds.push(event.kind);
    }
    assert_eq!(
        kinds,
        vec![
            SessionEventKind::Created,
            SessionEventKind::Updated,
            SessionEventKind::Deleted
        ]
    );
}

#[tokio::test]
async fn test_expiration_boundary_and_event() {
    let region_config =
        LocalRegionConfig::new().with_expiration_interval(Duration::from_millis(20));
    let repo_config = RepositoryConfig::new().with_max_inactive_interval_secs(1);
    let (region, node_a, _node_b) = cluster(region_config, repo_config);
    let mut events = node_a.notifier().subscribe_channel();
    let reaper = region.start_expiration_task();

    let mut session = node_a.create_session();
    node_a.save(&mut session).await.unwrap();
    assert_eq!(events.recv().await.unwrap().kind, SessionEventKind::Created);

    tokio::time::sleep(Duration::from_millis(900)).await;
    assert!(region.contains(session.id()).await);

    let expired = tokio::time::timeout(Duration::from_secs(3), events.recv())
        .await
        .unwrap()
        .unwrap();
    reaper.abort();

    assert_eq!(expired.kind, SessionEventKind::Expired);
    assert_eq!(expired.session_id, session.id());
    assert!(expired.session.is_some());
    assert!(node_a.find_by_id(session.id()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_unavailable_region_keeps_delta_for_retry() {
    let (region, node_a, node_b) = cluster(LocalRegionConfig::new(), RepositoryConfig::new());

    let mut session = node_a.create_session();
    node_a.save(&mut session).await.unwrap();
    session.set_attribute("retry", true);

    region.set_available(false);
    assert!(matches!(
        node_a.save(&mut session).await,
        Err(Error::CacheUnavailable(_))
    ));
    assert!(session.has_delta());

    region.set_available(true);
    node_a.save(&mut session).await.unwrap();
    assert!(!session.has_delta());

    let remote = node_b.find_by_id(session.id()).await.unwrap().unwrap();
    assert_eq!(remote.get_attribute("retry"), Some(AttributeValue::Bool(true)));
}

fn value_strategy() -> impl Strategy<Value = AttributeValue> {
    prop_oneof![
        Just(AttributeValue::Null),
        any::<bool>().prop_map(AttributeValue::Bool),
        any::<i32>().prop_map(AttributeValue::Int),
        any::<i64>().prop_map(AttributeValue::Long),
        any::<f64>().prop_map(AttributeValue::Double),
        Just(AttributeValue::Double(f64::NAN)),
        Just(AttributeValue::Double(-0.0)),
        ".{0,16}".prop_map(AttributeValue::String),
        proptest::collection::vec(any::<u8>(), 0..32).prop_map(AttributeValue::Opaque),
    ]
}

fn same_entries(a: &[(String, AttributeValue)], b: &[(String, AttributeValue)]) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .zip(b)
            .all(|((na, va), (nb, vb))| na == nb && va.is_identical(vb))
}

proptest! {
    #[test]
    fn prop_full_frame_restores_store(
        entries in proptest::collection::hash_map("[a-z.]{1,12}", value_strategy(), 0..12)
    ) {
        let registry = SerializerRegistry::with_defaults();
        let store = AttributeStore::from_entries(entries.clone());
        let frame = registry
            .encode_attributes(DATA_ATTRIBUTES_SERIALIZER_ID, &store, EncodeMode::Full)
            .unwrap();

        let decoded = registry.decode_attributes(&frame).unwrap();
        prop_assert!(!decoded.has_delta());
        prop_assert!(same_entries(&decoded.snapshot(), &store.snapshot()));
    }

    #[test]
    fn prop_delta_brings_baseline_to_local(
        baseline in proptest::collection::hash_map("[a-z]{1,6}", value_strategy(), 0..8),
        updates in proptest::collection::vec(("[a-z]{1,6}", value_strategy()), 0..6),
        removals in proptest::collection::vec("[a-z]{1,6}", 0..4),
    ) {
        let registry = SerializerRegistry::with_defaults();
        let remote = AttributeStore::from_entries(baseline.clone());
        let local = AttributeStore::from_entries(baseline);
        for (name, value) in updates {
            local.set_attribute(name, value);
        }
        for name in &removals {
            local.remove_attribute(name);
        }

        let frame = registry
            .encode_attributes(DATA_ATTRIBUTES_SERIALIZER_ID, &local, EncodeMode::Delta)
            .unwrap();
        registry.apply_attributes_delta(&frame, &remote).unwrap();

        prop_assert!(same_entries(&remote.snapshot(), &local.snapshot()));
        prop_assert!(!local.has_delta());
    }
}
