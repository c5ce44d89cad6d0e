// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The route event bus connects the sessions of one process: an update
//! accepted from one peer is published here so every sibling session can
//! re-advertise it, and collision probes let sessions discover that a
//! sibling already peers with the same remote speaker.

use crate::messages::PathAttribute;
use bgp_types::{Prefix4, Prefix6};
use slog::{trace, Logger};
use std::net::Ipv6Addr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

/// Identifies one bus subscriber. Handed out by `subscribe` and passed back
/// to `publish` so a publisher never hears its own events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriberId(u64);

#[derive(Debug, Clone)]
pub enum RouteEvent {
    /// Routes were added, all sharing one attribute set.
    Add(RouteAddEvent),

    /// Routes were withdrawn.
    Withdraw(RouteWithdrawEvent),

    /// IPv6 analogue of `Add`.
    Add6(RouteAdd6Event),

    /// IPv6 analogue of `Withdraw`.
    Withdraw6(RouteWithdraw6Event),

    /// A session in open-sent just learned its peer's BGP identifier and
    /// asks whether a sibling already has a session with that speaker.
    /// Receivers that match report the event consumed, which ends
    /// propagation; the losing side closes itself.
    CollisionProbe { peer_bgp_id: u32 },
}

impl RouteEvent {
    pub fn title(&self) -> &'static str {
        match self {
            RouteEvent::Add(_) => "route add",
            RouteEvent::Withdraw(_) => "route withdraw",
            RouteEvent::Add6(_) => "route add (v6)",
            RouteEvent::Withdraw6(_) => "route withdraw (v6)",
            RouteEvent::CollisionProbe { .. } => "collision probe",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RouteAddEvent {
    /// Path attributes shared by every route in the event. Shared with the
    /// RIB entries the routes were stored under.
    pub attribs: Arc<Vec<PathAttribute>>,

    /// Routes to add.
    pub routes: Vec<Prefix4>,
}

#[derive(Debug, Clone)]
pub struct RouteWithdrawEvent {
    /// Routes to withdraw.
    pub routes: Vec<Prefix4>,
}

#[derive(Debug, Clone)]
pub struct RouteAdd6Event {
    pub attribs: Arc<Vec<PathAttribute>>,
    pub routes: Vec<Prefix6>,
    pub nexthop_global: Ipv6Addr,
    pub nexthop_linklocal: Option<Ipv6Addr>,
}

#[derive(Debug, Clone)]
pub struct RouteWithdraw6Event {
    pub routes: Vec<Prefix6>,
}

/// Implemented by anything that wants to hear route events. The return
/// value reports whether the receiver acted on the event.
pub trait RouteEventReceiver: Send + Sync {
    fn handle_route_event(
        &self,
        from: Option<SubscriberId>,
        event: &RouteEvent,
    ) -> bool;
}

/// A synchronous fan-out channel. Delivery happens on the publisher's call
/// stack, in subscription order. The bus holds weak references; dropped
/// receivers are skipped.
pub struct RouteEventBus {
    subscribers: Mutex<Vec<(SubscriberId, Weak<dyn RouteEventReceiver>)>>,
    next_id: AtomicU64,
    log: Logger,
}

impl RouteEventBus {
    pub fn new(log: Logger) -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            log,
        }
    }

    pub fn subscribe(
        &self,
        receiver: Weak<dyn RouteEventReceiver>,
    ) -> SubscriberId {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers.lock().unwrap().push((id, receiver));
        id
    }

    pub fn unsubscribe(&self, id: SubscriberId) {
        self.subscribers.lock().unwrap().retain(|(sid, _)| *sid != id);
    }

    /// Deliver an event to every subscriber except the publisher. Returns
    /// how many receivers reported the event consumed. A consumed
    /// collision probe stops propagating immediately.
    pub fn publish(
        &self,
        from: Option<SubscriberId>,
        event: &RouteEvent,
    ) -> usize {
        // Deliver against a snapshot so receivers may subscribe or
        // unsubscribe from within their handlers.
        let subscribers = self.subscribers.lock().unwrap().clone();

        let mut handled = 0;
        for (id, receiver) in subscribers {
            if Some(id) == from {
                continue;
            }
            let receiver = match receiver.upgrade() {
                Some(r) => r,
                None => continue,
            };
            if receiver.handle_route_event(from, event) {
                handled += 1;
                if matches!(event, RouteEvent::CollisionProbe { .. }) {
                    break;
                }
            }
        }

        trace!(
            self.log,
            "published {} to {} receiver(s)",
            event.title(),
            handled
        );
        handled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::init_logger;
    use std::sync::atomic::AtomicUsize;

    struct Recorder {
        seen: AtomicUsize,
        consume: bool,
    }

    impl RouteEventReceiver for Recorder {
        fn handle_route_event(
            &self,
            _from: Option<SubscriberId>,
            _event: &RouteEvent,
        ) -> bool {
            self.seen.fetch_add(1, Ordering::Relaxed);
            self.consume
        }
    }

    fn recorder(consume: bool) -> Arc<Recorder> {
        Arc::new(Recorder {
            seen: AtomicUsize::new(0),
            consume,
        })
    }

    #[test]
    fn publisher_skipped() {
        let bus = RouteEventBus::new(init_logger());
        let a = recorder(true);
        let b = recorder(true);
        let a_id = bus
            .subscribe(Arc::downgrade(&a) as Weak<dyn RouteEventReceiver>);
        let _b_id = bus
            .subscribe(Arc::downgrade(&b) as Weak<dyn RouteEventReceiver>);

        let handled = bus.publish(
            Some(a_id),
            &RouteEvent::Withdraw(RouteWithdrawEvent { routes: vec![] }),
        );
        assert_eq!(handled, 1);
        assert_eq!(a.seen.load(Ordering::Relaxed), 0);
        assert_eq!(b.seen.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn collision_probe_short_circuits() {
        let bus = RouteEventBus::new(init_logger());
        let a = recorder(true);
        let b = recorder(true);
        bus.subscribe(Arc::downgrade(&a) as Weak<dyn RouteEventReceiver>);
        bus.subscribe(Arc::downgrade(&b) as Weak<dyn RouteEventReceiver>);

        let handled = bus
            .publish(None, &RouteEvent::CollisionProbe { peer_bgp_id: 7 });
        assert_eq!(handled, 1);
        // The second receiver never saw the probe.
        assert_eq!(a.seen.load(Ordering::Relaxed), 1);
        assert_eq!(b.seen.load(Ordering::Relaxed), 0);

        // Other events reach everyone regardless of consumption.
        let handled = bus.publish(
            None,
            &RouteEvent::Withdraw(RouteWithdrawEvent { routes: vec![] }),
        );
        assert_eq!(handled, 2);
    }

    #[test]
    fn dropped_receivers_skipped() {
        let bus = RouteEventBus::new(init_logger());
        let a = recorder(true);
        bus.subscribe(Arc::downgrade(&a) as Weak<dyn RouteEventReceiver>);
        drop(a);
        let handled = bus.publish(
            None,
            &RouteEvent::Withdraw(RouteWithdrawEvent { routes: vec![] }),
        );
        assert_eq!(handled, 0);
    }

    #[test]
    fn unsubscribe() {
        let bus = RouteEventBus::new(init_logger());
        let a = recorder(true);
        let id =
            bus.subscribe(Arc::downgrade(&a) as Weak<dyn RouteEventReceiver>);
        bus.unsubscribe(id);
        let handled = bus.publish(
            None,
            &RouteEvent::Withdraw(RouteWithdrawEvent { routes: vec![] }),
        );
        assert_eq!(handled, 0);
        assert_eq!(a.seen.load(Ordering::Relaxed), 0);
    }
}
