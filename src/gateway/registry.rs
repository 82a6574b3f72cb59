use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::Serialize;
use tokio::sync::{broadcast, Mutex, OwnedMutexGuard};
use tracing::{error, info, warn};

use super::definition::validate_all;
use super::store::{RouteStore, StoreError};
use super::{RouteDefinition, RouteError};

/// Immutable view of the full route set at one point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteSnapshot {
    pub version: u64,
    pub definitions: Vec<RouteDefinition>,
}

impl RouteSnapshot {
    pub fn empty() -> Self {
        Self {
            version: 0,
            definitions: Vec::new(),
        }
    }

    pub fn get(&self, route_id: &str) -> Option<&RouteDefinition> {
        self.definitions.iter().find(|d| d.route_id == route_id)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// Published after every successful swap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRegistryRefreshed {
    pub version: u64,
    pub route_count: usize,
}

/// Authoritative set of gateway routes.
///
/// Readers load the current snapshot without locking. Writers are serialized
/// by `write_lock`, which is held across validation, persistence and the swap
/// but is never touched by readers.
pub struct RouteRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    active: ArcSwap<RouteSnapshot>,
    write_lock: Arc<Mutex<()>>,
    store: Arc<dyn RouteStore>,
    refreshed_tx: broadcast::Sender<RouteRegistryRefreshed>,
}

impl RouteRegistry {
    /// Build a registry from whatever `store` currently holds.
    ///
    /// Called once at startup, before any proxied traffic is accepted.
    pub async fn load(store: Arc<dyn RouteStore>, channel_capacity: usize) -> Result<Self, RouteError> {
        let definitions = store.load().await.map_err(|e| {
            error!("Failed to load routes from {} store: {}", store.name(), e);
            RouteError::PersistenceFailure(e)
        })?;
        validate_all(&definitions)?;

        info!("Loaded {} route definitions from {} store", definitions.len(), store.name());

        let (refreshed_tx, _) = broadcast::channel(channel_capacity.max(1));
        Ok(Self {
            inner: Arc::new(RegistryInner {
                active: ArcSwap::from_pointee(RouteSnapshot {
                    version: 1,
                    definitions,
                }),
                write_lock: Arc::new(Mutex::new(())),
                store,
                refreshed_tx,
            }),
        })
    }

    /// Current definitions in insertion order
    pub fn list(&self) -> Vec<RouteDefinition> {
        self.inner.active.load().definitions.clone()
    }

    /// Current snapshot, shared rather than copied
    pub fn snapshot(&self) -> Arc<RouteSnapshot> {
        self.inner.active.load_full()
    }

    pub fn version(&self) -> u64 {
        self.inner.active.load().version
    }

    pub fn get(&self, route_id: &str) -> Option<RouteDefinition> {
        self.inner.active.load().get(route_id).cloned()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RouteRegistryRefreshed> {
        self.inner.refreshed_tx.subscribe()
    }

    /// Replace the whole route set.
    ///
    /// Nothing changes unless validation and persistence both succeed. On
    /// success the new snapshot is visible to every reader at once and a
    /// refresh notification is broadcast. Once the writer lock is taken the
    /// update runs to completion even if the caller stops waiting.
    pub async fn replace_all(&self, definitions: Vec<RouteDefinition>) -> Result<RouteRegistryRefreshed, RouteError> {
        let writer = self.inner.write_lock.clone().lock_owned().await;
        self.commit(writer, definitions).await
    }

    /// Insert or replace one definition, keeping its list position when present
    pub async fn upsert(&self, definition: RouteDefinition) -> Result<RouteRegistryRefreshed, RouteError> {
        let writer = self.inner.write_lock.clone().lock_owned().await;

        let mut definitions = self.list();
        match definitions.iter_mut().find(|d| d.route_id == definition.route_id) {
            Some(existing) => *existing = definition,
            None => definitions.push(definition),
        }
        self.commit(writer, definitions).await
    }

    /// Remove one definition by id
    pub async fn remove(&self, route_id: &str) -> Result<RouteRegistryRefreshed, RouteError> {
        let writer = self.inner.write_lock.clone().lock_owned().await;

        let mut definitions = self.list();
        let before = definitions.len();
        definitions.retain(|d| d.route_id != route_id);
        if definitions.len() == before {
            return Err(RouteError::NotFound(route_id.to_string()));
        }
        self.commit(writer, definitions).await
    }

    // Persist and swap on a detached task so a dropped caller cannot leave the
    // store ahead of the live snapshot.
    async fn commit(
        &self,
        writer: OwnedMutexGuard<()>,
        definitions: Vec<RouteDefinition>,
    ) -> Result<RouteRegistryRefreshed, RouteError> {
        let inner = self.inner.clone();
        let task = tokio::spawn(async move {
            let _writer = writer;
            inner.commit(definitions).await
        });

        match task.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => Err(RouteError::PersistenceFailure(StoreError::Unavailable(format!(
                "route update task did not finish: {}",
                e
            )))),
        }
    }
}

impl RegistryInner {
    // Caller must hold `write_lock`.
    async fn commit(&self, definitions: Vec<RouteDefinition>) -> Result<RouteRegistryRefreshed, RouteError> {
        validate_all(&definitions)?;

        if let Err(e) = self.store.save(&definitions).await {
            error!("Route persistence to {} store failed, keeping current snapshot: {}", self.store.name(), e);
            return Err(RouteError::PersistenceFailure(e));
        }

        let version = self.active.load().version + 1;
        let event = RouteRegistryRefreshed {
            version,
            route_count: definitions.len(),
        };
        self.active.store(Arc::new(RouteSnapshot { version, definitions }));
        info!("Route registry swapped to version {} ({} routes)", version, event.route_count);

        if let Err(e) = self.refreshed_tx.send(event) {
            let failure = RouteError::NotificationDeliveryFailure(format!("no active subscribers for version {}", e.0.version));
            warn!("{}", failure);
        }

        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{MemoryRouteStore, PredicateDefinition};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    fn route(id: &str, uri: &str, path: &str) -> RouteDefinition {
        RouteDefinition::new(id, uri).with_predicate(PredicateDefinition::parse_shortcut(&format!("Path={}", path)))
    }

    async fn registry_with(initial: Vec<RouteDefinition>) -> (RouteRegistry, Arc<MemoryRouteStore>) {
        let store = Arc::new(MemoryRouteStore::with_definitions(initial));
        let registry = RouteRegistry::load(store.clone(), 8).await.unwrap();
        (registry, store)
    }

    #[tokio::test]
    async fn load_reads_store_at_version_one() {
        let (registry, _) = registry_with(vec![route("a", "http://svc1", "/a/**")]).await;
        assert_eq!(registry.version(), 1);
        assert_eq!(registry.list().len(), 1);
        assert!(registry.get("a").is_some());
    }

    #[tokio::test]
    async fn load_rejects_invalid_stored_set() {
        let store = Arc::new(MemoryRouteStore::with_definitions(vec![
            route("a", "http://svc1", "/a/**"),
            route("a", "http://svc2", "/b/**"),
        ]));
        assert!(matches!(
            RouteRegistry::load(store, 8).await,
            Err(RouteError::DuplicateRouteId(_))
        ));
    }

    #[tokio::test]
    async fn replace_all_round_trips_and_notifies_once() {
        let (registry, store) = registry_with(Vec::new()).await;
        let mut rx = registry.subscribe();

        let next = vec![route("a", "http://svc1", "/foo/**")];
        let event = registry.replace_all(next.clone()).await.unwrap();

        assert_eq!(event, RouteRegistryRefreshed { version: 2, route_count: 1 });
        assert_eq!(registry.list(), next);
        assert_eq!(store.stored(), next);
        assert_eq!(rx.recv().await.unwrap(), event);
        assert!(matches!(rx.try_recv(), Err(broadcast::error::TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn duplicate_ids_leave_snapshot_intact() {
        let original = vec![route("keep", "http://svc0", "/keep/**")];
        let (registry, store) = registry_with(original.clone()).await;
        let mut rx = registry.subscribe();

        let err = registry
            .replace_all(vec![route("a", "http://svc1", "/x/**"), route("a", "http://svc2", "/y/**")])
            .await
            .unwrap_err();

        assert!(matches!(err, RouteError::DuplicateRouteId(id) if id == "a"));
        assert_eq!(registry.list(), original);
        assert_eq!(registry.version(), 1);
        assert_eq!(store.stored(), original);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn persistence_failure_leaves_snapshot_intact() {
        let original = vec![route("keep", "http://svc0", "/keep/**")];
        let (registry, store) = registry_with(original.clone()).await;
        store.set_fail_writes(true);

        let err = registry.replace_all(vec![route("a", "http://svc1", "/x/**")]).await.unwrap_err();

        assert!(matches!(err, RouteError::PersistenceFailure(_)));
        assert_eq!(registry.list(), original);
        assert_eq!(registry.version(), 1);
    }

    #[tokio::test]
    async fn replace_without_subscribers_still_succeeds() {
        let (registry, _) = registry_with(Vec::new()).await;
        let event = registry.replace_all(vec![route("a", "http://svc1", "/x/**")]).await.unwrap();
        assert_eq!(event.version, 2);
    }

    #[tokio::test]
    async fn upsert_and_remove_go_through_replace() {
        let (registry, _) = registry_with(vec![
            route("a", "http://svc1", "/a/**"),
            route("b", "http://svc2", "/b/**"),
        ])
        .await;

        registry.upsert(route("a", "http://svc9", "/a/**")).await.unwrap();
        registry.upsert(route("c", "http://svc3", "/c/**")).await.unwrap();
        let ids: Vec<_> = registry.list().into_iter().map(|d| d.route_id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(registry.get("a").unwrap().uri, "http://svc9");

        registry.remove("b").await.unwrap();
        assert!(registry.get("b").is_none());
        assert!(matches!(registry.remove("b").await, Err(RouteError::NotFound(_))));
        assert_eq!(registry.version(), 4);
    }

    /// Store whose save blocks until released, to observe readers mid-update
    struct SlowStore {
        inner: MemoryRouteStore,
        release: tokio::sync::Notify,
        saving: AtomicBool,
    }

    #[async_trait]
    impl RouteStore for SlowStore {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn load(&self) -> Result<Vec<RouteDefinition>, StoreError> {
            self.inner.load().await
        }

        async fn save(&self, definitions: &[RouteDefinition]) -> Result<(), StoreError> {
            self.saving.store(true, Ordering::SeqCst);
            self.release.notified().await;
            self.inner.save(definitions).await
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn readers_see_old_or_new_never_a_mix() {
        let old: Vec<_> = (0..20).map(|i| route(&format!("old-{}", i), "http://old", "/old/**")).collect();
        let new: Vec<_> = (0..30).map(|i| route(&format!("new-{}", i), "http://new", "/new/**")).collect();

        let store = Arc::new(SlowStore {
            inner: MemoryRouteStore::with_definitions(old.clone()),
            release: tokio::sync::Notify::new(),
            saving: AtomicBool::new(false),
        });
        let registry = Arc::new(RouteRegistry::load(store.clone(), 8).await.unwrap());

        let writer = {
            let registry = registry.clone();
            let new = new.clone();
            tokio::spawn(async move { registry.replace_all(new).await })
        };

        // Readers are not blocked while persistence is in flight
        while !store.saving.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
        let during = tokio::time::timeout(Duration::from_secs(1), async { registry.list() })
            .await
            .unwrap();
        assert_eq!(during, old);

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let registry = registry.clone();
                let (old, new) = (old.clone(), new.clone());
                tokio::spawn(async move {
                    for _ in 0..500 {
                        let seen = registry.list();
                        assert!(seen == old || seen == new, "torn snapshot with {} entries", seen.len());
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();

        store.release.notify_one();
        writer.await.unwrap().unwrap();
        for reader in readers {
            reader.await.unwrap();
        }
        assert_eq!(registry.list(), new);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_writers_are_serialized() {
        let (registry, _) = registry_with(Vec::new()).await;
        let registry = Arc::new(registry);

        let writers: Vec<_> = (0..10)
            .map(|i| {
                let registry = registry.clone();
                tokio::spawn(async move {
                    registry
                        .replace_all(vec![route(&format!("r{}", i), "http://svc", "/x/**")])
                        .await
                        .unwrap()
                        .version
                })
            })
            .collect();

        let mut versions = Vec::new();
        for writer in writers {
            versions.push(writer.await.unwrap());
        }
        versions.sort_unstable();
        assert_eq!(versions, (2..=11).collect::<Vec<u64>>());
        assert_eq!(registry.version(), 11);
    }

    /// Store that finishes writing, then lingers before returning
    struct LingeringStore {
        inner: MemoryRouteStore,
        linger: Duration,
    }

    #[async_trait]
    impl RouteStore for LingeringStore {
        fn name(&self) -> &'static str {
            "lingering"
        }

        async fn load(&self) -> Result<Vec<RouteDefinition>, StoreError> {
            self.inner.load().await
        }

        async fn save(&self, definitions: &[RouteDefinition]) -> Result<(), StoreError> {
            self.inner.save(definitions).await?;
            tokio::time::sleep(self.linger).await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn abandoned_replace_still_swaps_what_was_saved() {
        let old = vec![route("old", "http://old", "/old/**")];
        let new = vec![route("new", "http://new", "/new/**")];
        let store = Arc::new(LingeringStore {
            inner: MemoryRouteStore::with_definitions(old.clone()),
            linger: Duration::from_millis(200),
        });
        let registry = RouteRegistry::load(store.clone(), 8).await.unwrap();
        let mut rx = registry.subscribe();

        let abandoned = tokio::time::timeout(Duration::from_millis(20), registry.replace_all(new.clone())).await;
        assert!(abandoned.is_err());

        let event = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
        assert_eq!(event.version, 2);
        assert_eq!(store.inner.stored(), new);
        assert_eq!(registry.list(), new);

        // The writer lock was released by the finished update
        registry.replace_all(old.clone()).await.unwrap();
        assert_eq!(registry.list(), old);
        assert_eq!(registry.version(), 3);
    }
}
