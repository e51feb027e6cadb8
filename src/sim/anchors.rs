//! Simulated anchor providers.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use crate::anchor::{AnchorError, AnchorHandle, AnchorProvider, AnchorResolver, PendingAnchor};
use crate::geometry::Pose;

#[derive(Debug, Default)]
struct RegistryInner {
    next_id: u64,
    live: BTreeSet<AnchorHandle>,
    destroyed: Vec<AnchorHandle>,
    invalid_destroys: usize,
}

/// Book-keeping of which simulated anchors are alive. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct AnchorRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl AnchorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn create(&self) -> AnchorHandle {
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let handle = AnchorHandle(inner.next_id);
        inner.live.insert(handle);
        handle
    }

    /// Hand a fresh anchor to its requester. If the request was dropped in
    /// the meantime nobody can adopt or destroy it, so it is released here.
    fn deliver(&self, resolver: AnchorResolver, handle: AnchorHandle) -> bool {
        match resolver.resolve(Ok(handle)) {
            Ok(()) => true,
            Err(_) => {
                debug!(anchor = %handle, "anchor request dropped before completion, releasing");
                self.destroy(handle);
                false
            }
        }
    }

    fn destroy(&self, handle: AnchorHandle) {
        let mut inner = self.inner.lock();
        if inner.live.remove(&handle) {
            inner.destroyed.push(handle);
        } else {
            inner.invalid_destroys += 1;
            warn!(anchor = %handle, "destroy of unknown or already destroyed anchor");
        }
    }

    /// Anchors created and not yet destroyed, in creation order.
    pub fn live(&self) -> Vec<AnchorHandle> {
        self.inner.lock().live.iter().copied().collect()
    }

    pub fn live_count(&self) -> usize {
        self.inner.lock().live.len()
    }

    pub fn created_count(&self) -> u64 {
        self.inner.lock().next_id
    }

    pub fn destroyed(&self) -> Vec<AnchorHandle> {
        self.inner.lock().destroyed.clone()
    }

    /// Destroy calls that did not match a live anchor.
    pub fn invalid_destroys(&self) -> usize {
        self.inner.lock().invalid_destroys
    }
}

/// Anchor provider that resolves each request on its own thread.
pub struct SimAnchorProvider {
    registry: AnchorRegistry,
    latency: Duration,
    jitter: Duration,
    failing: HashSet<u64>,
    requests: u64,
    rng: StdRng,
}

impl SimAnchorProvider {
    pub fn new(registry: AnchorRegistry, latency: Duration) -> Self {
        Self {
            registry,
            latency,
            jitter: Duration::ZERO,
            failing: HashSet::new(),
            requests: 0,
            rng: StdRng::seed_from_u64(0x5eed),
        }
    }

    /// Add up to `jitter` of random extra latency per request.
    pub fn with_jitter(mut self, jitter: Duration, seed: u64) -> Self {
        self.jitter = jitter;
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Make the given 1-based request numbers fail.
    pub fn with_failures<I: IntoIterator<Item = u64>>(mut self, requests: I) -> Self {
        self.failing.extend(requests);
        self
    }

    pub fn requests(&self) -> u64 {
        self.requests
    }
}

impl AnchorProvider for SimAnchorProvider {
    fn create_anchor(&mut self, _pose: &Pose) -> PendingAnchor {
        self.requests += 1;
        let request = self.requests;
        let fail = self.failing.contains(&request);

        let mut delay = self.latency;
        if !self.jitter.is_zero() {
            let extra = self.rng.gen_range(0..=self.jitter.as_micros() as u64);
            delay += Duration::from_micros(extra);
        }

        let (resolver, pending) = PendingAnchor::channel();
        let registry = self.registry.clone();
        thread::spawn(move || {
            thread::sleep(delay);
            if fail {
                debug!(request, "simulated anchor request failing");
                let _ = resolver.resolve(Err(AnchorError::Rejected(format!(
                    "simulated failure #{request}"
                ))));
            } else {
                registry.deliver(resolver, registry.create());
            }
        });
        pending
    }

    fn destroy_anchor(&mut self, handle: AnchorHandle) {
        self.registry.destroy(handle);
    }
}

struct ManualRequest {
    pose: Pose,
    resolver: Option<AnchorResolver>,
}

/// Test-side control over a `ManualAnchorProvider`.
#[derive(Clone)]
pub struct ManualAnchorControl {
    registry: AnchorRegistry,
    requests: Arc<Mutex<Vec<ManualRequest>>>,
}

impl ManualAnchorControl {
    /// Number of create requests received so far.
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Pose of the `index`-th request (0-based).
    pub fn pose(&self, index: usize) -> Option<Pose> {
        self.requests.lock().get(index).map(|r| r.pose)
    }

    fn take_resolver(&self, index: usize) -> Option<AnchorResolver> {
        self.requests
            .lock()
            .get_mut(index)
            .and_then(|r| r.resolver.take())
    }

    /// Resolve request `index` with a freshly created anchor.
    ///
    /// The anchor is destroyed straight away if the requester already
    /// dropped its `PendingAnchor`.
    pub fn succeed(&self, index: usize) -> Option<AnchorHandle> {
        let resolver = self.take_resolver(index)?;
        let handle = self.registry.create();
        self.registry.deliver(resolver, handle);
        Some(handle)
    }

    /// Resolve request `index` with `error`.
    pub fn fail(&self, index: usize, error: AnchorError) -> bool {
        match self.take_resolver(index) {
            Some(resolver) => {
                let _ = resolver.resolve(Err(error));
                true
            }
            None => false,
        }
    }

    /// Drop request `index` without resolving it.
    pub fn abandon(&self, index: usize) -> bool {
        self.take_resolver(index).is_some()
    }
}

/// Anchor provider whose requests stay pending until resolved through its
/// `ManualAnchorControl`.
pub struct ManualAnchorProvider {
    registry: AnchorRegistry,
    requests: Arc<Mutex<Vec<ManualRequest>>>,
}

impl ManualAnchorProvider {
    pub fn new(registry: AnchorRegistry) -> Self {
        Self {
            registry,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn control(&self) -> ManualAnchorControl {
        ManualAnchorControl {
            registry: self.registry.clone(),
            requests: Arc::clone(&self.requests),
        }
    }
}

impl AnchorProvider for ManualAnchorProvider {
    fn create_anchor(&mut self, pose: &Pose) -> PendingAnchor {
        let (resolver, pending) = PendingAnchor::channel();
        self.requests.lock().push(ManualRequest {
            pose: *pose,
            resolver: Some(resolver),
        });
        pending
    }

    fn destroy_anchor(&mut self, handle: AnchorHandle) {
        self.registry.destroy(handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sim_provider_resolves_and_fails() {
        let registry = AnchorRegistry::new();
        let mut provider =
            SimAnchorProvider::new(registry.clone(), Duration::from_millis(1)).with_failures([2]);

        let first = provider.create_anchor(&Pose::identity());
        let second = provider.create_anchor(&Pose::identity());

        let a = first.wait_timeout(Duration::from_secs(2)).expect("first resolves");
        let b = second.wait_timeout(Duration::from_secs(2)).expect("second resolves");

        let handle = a.expect("first succeeds");
        assert!(matches!(b, Err(AnchorError::Rejected(_))));
        assert_eq!(registry.live(), vec![handle]);
        assert_eq!(provider.requests(), 2);

        provider.destroy_anchor(handle);
        assert_eq!(registry.live_count(), 0);
        assert_eq!(registry.destroyed(), vec![handle]);
    }

    #[test]
    fn test_manual_provider_out_of_order() {
        let registry = AnchorRegistry::new();
        let mut provider = ManualAnchorProvider::new(registry.clone());
        let control = provider.control();

        let p0 = provider.create_anchor(&Pose::identity());
        let p1 = provider.create_anchor(&Pose::identity());
        assert_eq!(control.request_count(), 2);

        let h1 = control.succeed(1).unwrap();
        assert_eq!(p1.try_resolve(), Some(Ok(h1)));
        assert_eq!(p0.try_resolve(), None);

        assert!(control.fail(0, AnchorError::InsufficientTracking));
        assert!(!control.fail(0, AnchorError::InsufficientTracking));
        assert_eq!(p0.try_resolve(), Some(Err(AnchorError::InsufficientTracking)));
    }

    #[test]
    fn test_success_after_task_dropped_releases_anchor() {
        let registry = AnchorRegistry::new();
        let mut provider = ManualAnchorProvider::new(registry.clone());
        let control = provider.control();

        drop(provider.create_anchor(&Pose::identity()));
        let handle = control.succeed(0).unwrap();

        assert_eq!(registry.created_count(), 1);
        assert_eq!(registry.destroyed(), vec![handle]);
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn test_double_destroy_is_counted() {
        let registry = AnchorRegistry::new();
        let mut provider = ManualAnchorProvider::new(registry.clone());
        let control = provider.control();
        let _p = provider.create_anchor(&Pose::identity());
        let h = control.succeed(0).unwrap();

        provider.destroy_anchor(h);
        provider.destroy_anchor(h);
        assert_eq!(registry.invalid_destroys(), 1);
    }
}
