//! C6 — Multi-Route Bus.
//!
//! Routes broadcast lifecycle events to every other route registered on
//! the router; each peer reacts via its `on_route_*` hooks and then runs
//! its own reconciler, so a fill on one route can immediately affect
//! basket state on another before the next tick (spec §4.6).
//!
//! Strategies hold the router only as a `Weak` reference — the router
//! owns the strong `Arc<dyn RouteHandle>` for each route, so a strong
//! cycle never forms and a route can be dropped from the router without
//! keeping every other route alive.

use crate::types::RouteId;
use std::sync::{Arc, Mutex, RwLock, Weak};

/// An event one route broadcasts to its peers.
#[derive(Debug, Clone)]
pub enum RouteEvent {
    OpenedPosition,
    ClosedPosition,
    IncreasedPosition,
    ReducedPosition,
    StoppedOut,
    TookProfit,
    Cancelled,
}

/// What the router calls on every route other than the one broadcasting.
/// `Strategy` implements this; the router never needs to know the
/// concrete strategy type.
pub trait RouteHandle: Send + Sync {
    fn route_id(&self) -> RouteId;
    fn on_route_event(&self, from: RouteId, event: RouteEvent);
    /// Runs the receiving route's own reconciler after it has reacted to
    /// the event above, mirroring what a normal tick would do.
    fn reconcile(&self);
}

/// Holds every registered route and fans a broadcast out to all but the
/// sender, in registration order.
#[derive(Default)]
pub struct Router {
    routes: RwLock<Vec<Arc<dyn RouteHandle>>>,
}

impl Router {
    pub fn new() -> Arc<Self> {
        Arc::new(Router { routes: RwLock::new(Vec::new()) })
    }

    pub fn register(self: &Arc<Self>, route: Arc<dyn RouteHandle>) {
        self.routes.write().unwrap().push(route);
    }

    pub fn unregister(&self, id: RouteId) {
        self.routes.write().unwrap().retain(|r| r.route_id() != id);
    }

    /// Dispatches `event` to every registered route except `from`, then
    /// runs that peer's reconciler, in registration order.
    pub fn broadcast(&self, from: RouteId, event: RouteEvent) {
        let routes = self.routes.read().unwrap().clone();
        for route in routes.iter().filter(|r| r.route_id() != from) {
            route.on_route_event(from, event.clone());
            route.reconcile();
        }
    }

    pub fn weak(self: &Arc<Self>) -> Weak<Router> {
        Arc::downgrade(self)
    }
}

/// A route's handle to the bus it's registered on. `None` before
/// registration (e.g. during construction, or for a strategy never wired
/// into a multi-route setup).
pub struct BusHandle {
    router: Mutex<Option<Weak<Router>>>,
}

impl Default for BusHandle {
    fn default() -> Self {
        BusHandle { router: Mutex::new(None) }
    }
}

impl BusHandle {
    pub fn attach(&self, router: &Arc<Router>) {
        *self.router.lock().unwrap() = Some(router.weak());
    }

    /// Broadcasts `event` from `from` to every other registered route, if
    /// this handle is attached to a live router.
    pub fn broadcast(&self, from: RouteId, event: RouteEvent) {
        if let Some(router) = self.router.lock().unwrap().as_ref().and_then(Weak::upgrade) {
            router.broadcast(from, event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingRoute {
        id: RouteId,
        events_seen: AtomicUsize,
        reconciles_seen: AtomicUsize,
    }

    impl RouteHandle for CountingRoute {
        fn route_id(&self) -> RouteId {
            self.id
        }
        fn on_route_event(&self, _from: RouteId, _event: RouteEvent) {
            self.events_seen.fetch_add(1, Ordering::SeqCst);
        }
        fn reconcile(&self) {
            self.reconciles_seen.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn broadcast_skips_the_sender() {
        let router = Router::new();
        let a = Arc::new(CountingRoute { id: RouteId(1), events_seen: AtomicUsize::new(0), reconciles_seen: AtomicUsize::new(0) });
        let b = Arc::new(CountingRoute { id: RouteId(2), events_seen: AtomicUsize::new(0), reconciles_seen: AtomicUsize::new(0) });
        router.register(a.clone());
        router.register(b.clone());

        router.broadcast(RouteId(1), RouteEvent::OpenedPosition);

        assert_eq!(a.events_seen.load(Ordering::SeqCst), 0);
        assert_eq!(b.events_seen.load(Ordering::SeqCst), 1);
        assert_eq!(b.reconciles_seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unregister_removes_a_route_from_future_broadcasts() {
        let router = Router::new();
        let a = Arc::new(CountingRoute { id: RouteId(1), events_seen: AtomicUsize::new(0), reconciles_seen: AtomicUsize::new(0) });
        let b = Arc::new(CountingRoute { id: RouteId(2), events_seen: AtomicUsize::new(0), reconciles_seen: AtomicUsize::new(0) });
        router.register(a.clone());
        router.register(b.clone());
        router.unregister(RouteId(2));

        router.broadcast(RouteId(1), RouteEvent::Cancelled);

        assert_eq!(b.events_seen.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn bus_handle_is_a_no_op_before_attach() {
        let handle = BusHandle::default();
        handle.broadcast(RouteId(1), RouteEvent::Cancelled);
    }
}
