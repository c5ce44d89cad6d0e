// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Routing information bases. One instance per address family; each entry
//! is scoped by the router id of the speaker it was learned from, with
//! source zero meaning locally originated. Entries inserted together share
//! an update id so downstream sessions can coalesce them into a single
//! update message.

use crate::bestpath::{preferred4, preferred6};
use crate::messages::{AsPath, PathAttribute, PathOrigin};
use bgp_types::{Prefix4, Prefix6};
use slog::{info, Logger};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::{Arc, Mutex};

/// The source router id used for locally originated routes.
pub const LOCAL_SOURCE: u32 = 0;

#[derive(Debug, Clone)]
pub struct Rib4Entry {
    pub route: Prefix4,

    /// Router id of the originating speaker, `LOCAL_SOURCE` for local
    /// routes.
    pub src_router_id: u32,

    pub nexthop: Ipv4Addr,

    /// Path attributes, shared with any route event the entry was announced
    /// through.
    pub attribs: Arc<Vec<PathAttribute>>,

    pub weight: i32,

    /// Groups entries that were inserted together.
    pub update_id: u64,
}

struct RibInner<E> {
    entries: Vec<E>,
    update_id: u64,
}

/// The IPv4 RIB. A cheaply cloneable handle; all clones share one table.
#[derive(Clone)]
pub struct Rib4 {
    inner: Arc<Mutex<RibInner<Rib4Entry>>>,
    log: Logger,
}

fn local_attribs() -> Arc<Vec<PathAttribute>> {
    Arc::new(vec![
        PathAttribute::origin(PathOrigin::Igp),
        PathAttribute::as_path(AsPath {
            four_byte: true,
            segments: Vec::new(),
        }),
    ])
}

impl Rib4 {
    pub fn new(log: Logger) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RibInner {
                entries: Vec::new(),
                update_id: 0,
            })),
            log,
        }
    }

    /// Insert one route learned from a peer. An existing entry for the same
    /// `(source, route)` pair is replaced only if the new entry wins the
    /// best-path decision; returns whether the RIB changed.
    pub fn insert_from_peer(
        &self,
        src_router_id: u32,
        route: Prefix4,
        nexthop: Ipv4Addr,
        attribs: Arc<Vec<PathAttribute>>,
        weight: i32,
    ) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let update_id = inner.update_id;
        // The counter advances once per insert call, accepted or not.
        inner.update_id += 1;
        Self::insert_entry(
            &mut inner,
            Rib4Entry {
                route,
                src_router_id,
                nexthop,
                attribs,
                weight,
                update_id,
            },
            &self.log,
        )
    }

    /// Insert a batch of routes sharing one attribute set, as received in a
    /// single update message. The whole batch lands in one update group.
    /// Returns the routes that actually changed the RIB.
    pub fn insert_many_from_peer(
        &self,
        src_router_id: u32,
        routes: &[Prefix4],
        nexthop: Ipv4Addr,
        attribs: Arc<Vec<PathAttribute>>,
        weight: i32,
    ) -> Vec<Prefix4> {
        let mut inner = self.inner.lock().unwrap();
        let update_id = inner.update_id;
        let mut inserted = Vec::new();
        for route in routes {
            if Self::insert_entry(
                &mut inner,
                Rib4Entry {
                    route: *route,
                    src_router_id,
                    nexthop,
                    attribs: attribs.clone(),
                    weight,
                    update_id,
                },
                &self.log,
            ) {
                inserted.push(*route);
            }
        }
        inner.update_id += 1;
        inserted
    }

    fn insert_entry(
        inner: &mut RibInner<Rib4Entry>,
        new: Rib4Entry,
        log: &Logger,
    ) -> bool {
        if let Some(pos) = inner.entries.iter().position(|e| {
            e.route == new.route && e.src_router_id == new.src_router_id
        }) {
            if !preferred4(&new, &inner.entries[pos]) {
                return false;
            }
            info!(
                log,
                "rib4 replace";
                "route" => %new.route,
                "scope" => new.src_router_id,
                "group" => new.update_id,
            );
            inner.entries[pos] = new;
            return true;
        }

        info!(
            log,
            "rib4 insert";
            "route" => %new.route,
            "scope" => new.src_router_id,
            "group" => new.update_id,
        );
        inner.entries.push(new);
        true
    }

    /// Insert a locally originated route. Synthesizes IGP origin and an
    /// empty 4-byte AS_PATH. Returns `None` when a local entry for the
    /// route already exists. Local entries sharing a nexthop are grouped
    /// under one update id.
    pub fn insert_local(
        &self,
        route: Prefix4,
        nexthop: Ipv4Addr,
        weight: i32,
    ) -> Option<Rib4Entry> {
        let mut inner = self.inner.lock().unwrap();

        let mut use_update_id = inner.update_id;
        for e in &inner.entries {
            if e.src_router_id != LOCAL_SOURCE {
                continue;
            }
            if e.route == route {
                return None;
            }
            if e.nexthop == nexthop {
                use_update_id = e.update_id;
            }
        }

        if use_update_id == inner.update_id {
            inner.update_id += 1;
        }

        let entry = Rib4Entry {
            route,
            src_router_id: LOCAL_SOURCE,
            nexthop,
            attribs: local_attribs(),
            weight,
            update_id: use_update_id,
        };
        info!(
            self.log,
            "rib4 insert local";
            "route" => %route,
            "group" => use_update_id,
        );
        inner.entries.push(entry.clone());
        Some(entry)
    }

    /// Delete the exact `(source, route)` entry.
    pub fn withdraw(&self, src_router_id: u32, route: Prefix4) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.entries.len();
        inner
            .entries
            .retain(|e| {
                !(e.route == route && e.src_router_id == src_router_id)
            });
        let dropped = inner.entries.len() != before;
        if dropped {
            info!(
                self.log,
                "rib4 withdraw";
                "route" => %route,
                "scope" => src_router_id,
            );
        }
        dropped
    }

    /// Remove every entry learned from the given source; returns their
    /// routes.
    pub fn discard(&self, src_router_id: u32) -> Vec<Prefix4> {
        let mut inner = self.inner.lock().unwrap();
        let mut dropped = Vec::new();
        inner.entries.retain(|e| {
            if e.src_router_id == src_router_id {
                dropped.push(e.route);
                false
            } else {
                true
            }
        });
        if !dropped.is_empty() {
            info!(
                self.log,
                "rib4 discard";
                "scope" => src_router_id,
                "count" => dropped.len(),
            );
        }
        dropped
    }

    /// Longest-prefix lookup, best path among equally specific entries.
    pub fn lookup(&self, addr: Ipv4Addr) -> Option<Rib4Entry> {
        let inner = self.inner.lock().unwrap();
        Self::select(inner.entries.iter().filter(|e| e.route.includes(addr)))
    }

    /// Scoped lookup over routes from one source only.
    pub fn lookup_from(
        &self,
        src_router_id: u32,
        addr: Ipv4Addr,
    ) -> Option<Rib4Entry> {
        let inner = self.inner.lock().unwrap();
        Self::select(inner.entries.iter().filter(|e| {
            e.src_router_id == src_router_id && e.route.includes(addr)
        }))
    }

    fn select<'a>(
        candidates: impl Iterator<Item = &'a Rib4Entry>,
    ) -> Option<Rib4Entry> {
        let mut selected: Option<&Rib4Entry> = None;
        for entry in candidates {
            selected = Some(match selected {
                None => entry,
                Some(cur) => {
                    if entry.route.length != cur.route.length {
                        if entry.route.length > cur.route.length {
                            entry
                        } else {
                            cur
                        }
                    } else if preferred4(entry, cur) {
                        entry
                    } else {
                        cur
                    }
                }
            });
        }
        selected.cloned()
    }

    /// A snapshot of the whole table.
    pub fn entries(&self) -> Vec<Rib4Entry> {
        self.inner.lock().unwrap().entries.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
pub struct Rib6Entry {
    pub route: Prefix6,
    pub src_router_id: u32,
    pub nexthop_global: Ipv6Addr,
    pub nexthop_linklocal: Option<Ipv6Addr>,
    pub attribs: Arc<Vec<PathAttribute>>,
    pub weight: i32,
    pub update_id: u64,
}

/// The IPv6 RIB. Same contract as [`Rib4`] modulo address width; fed by
/// the host and the event bus rather than the wire.
#[derive(Clone)]
pub struct Rib6 {
    inner: Arc<Mutex<RibInner<Rib6Entry>>>,
    log: Logger,
}

impl Rib6 {
    pub fn new(log: Logger) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RibInner {
                entries: Vec::new(),
                update_id: 0,
            })),
            log,
        }
    }

    pub fn insert_from_peer(
        &self,
        src_router_id: u32,
        route: Prefix6,
        nexthop_global: Ipv6Addr,
        nexthop_linklocal: Option<Ipv6Addr>,
        attribs: Arc<Vec<PathAttribute>>,
        weight: i32,
    ) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let update_id = inner.update_id;
        // The counter advances once per insert call, accepted or not.
        inner.update_id += 1;
        Self::insert_entry(
            &mut inner,
            Rib6Entry {
                route,
                src_router_id,
                nexthop_global,
                nexthop_linklocal,
                attribs,
                weight,
                update_id,
            },
            &self.log,
        )
    }

    fn insert_entry(
        inner: &mut RibInner<Rib6Entry>,
        new: Rib6Entry,
        log: &Logger,
    ) -> bool {
        if let Some(pos) = inner.entries.iter().position(|e| {
            e.route == new.route && e.src_router_id == new.src_router_id
        }) {
            if !preferred6(&new, &inner.entries[pos]) {
                return false;
            }
            info!(
                log,
                "rib6 replace";
                "route" => %new.route,
                "scope" => new.src_router_id,
                "group" => new.update_id,
            );
            inner.entries[pos] = new;
            return true;
        }

        info!(
            log,
            "rib6 insert";
            "route" => %new.route,
            "scope" => new.src_router_id,
            "group" => new.update_id,
        );
        inner.entries.push(new);
        true
    }

    pub fn insert_local(
        &self,
        route: Prefix6,
        nexthop_global: Ipv6Addr,
        nexthop_linklocal: Option<Ipv6Addr>,
        weight: i32,
    ) -> Option<Rib6Entry> {
        let mut inner = self.inner.lock().unwrap();

        let mut use_update_id = inner.update_id;
        for e in &inner.entries {
            if e.src_router_id != LOCAL_SOURCE {
                continue;
            }
            if e.route == route {
                return None;
            }
            if e.nexthop_global == nexthop_global
                && e.nexthop_linklocal == nexthop_linklocal
            {
                use_update_id = e.update_id;
            }
        }

        if use_update_id == inner.update_id {
            inner.update_id += 1;
        }

        let entry = Rib6Entry {
            route,
            src_router_id: LOCAL_SOURCE,
            nexthop_global,
            nexthop_linklocal,
            attribs: local_attribs(),
            weight,
            update_id: use_update_id,
        };
        info!(
            self.log,
            "rib6 insert local";
            "route" => %route,
            "group" => use_update_id,
        );
        inner.entries.push(entry.clone());
        Some(entry)
    }

    pub fn withdraw(&self, src_router_id: u32, route: Prefix6) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.entries.len();
        inner
            .entries
            .retain(|e| {
                !(e.route == route && e.src_router_id == src_router_id)
            });
        let dropped = inner.entries.len() != before;
        if dropped {
            info!(
                self.log,
                "rib6 withdraw";
                "route" => %route,
                "scope" => src_router_id,
            );
        }
        dropped
    }

    pub fn discard(&self, src_router_id: u32) -> Vec<Prefix6> {
        let mut inner = self.inner.lock().unwrap();
        let mut dropped = Vec::new();
        inner.entries.retain(|e| {
            if e.src_router_id == src_router_id {
                dropped.push(e.route);
                false
            } else {
                true
            }
        });
        if !dropped.is_empty() {
            info!(
                self.log,
                "rib6 discard";
                "scope" => src_router_id,
                "count" => dropped.len(),
            );
        }
        dropped
    }

    pub fn lookup(&self, addr: Ipv6Addr) -> Option<Rib6Entry> {
        let inner = self.inner.lock().unwrap();
        Self::select(inner.entries.iter().filter(|e| e.route.includes(addr)))
    }

    pub fn lookup_from(
        &self,
        src_router_id: u32,
        addr: Ipv6Addr,
    ) -> Option<Rib6Entry> {
        let inner = self.inner.lock().unwrap();
        Self::select(inner.entries.iter().filter(|e| {
            e.src_router_id == src_router_id && e.route.includes(addr)
        }))
    }

    fn select<'a>(
        candidates: impl Iterator<Item = &'a Rib6Entry>,
    ) -> Option<Rib6Entry> {
        let mut selected: Option<&Rib6Entry> = None;
        for entry in candidates {
            selected = Some(match selected {
                None => entry,
                Some(cur) => {
                    if entry.route.length != cur.route.length {
                        if entry.route.length > cur.route.length {
                            entry
                        } else {
                            cur
                        }
                    } else if preferred6(entry, cur) {
                        entry
                    } else {
                        cur
                    }
                }
            });
        }
        selected.cloned()
    }

    pub fn entries(&self) -> Vec<Rib6Entry> {
        self.inner.lock().unwrap().entries.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::init_logger;
    use crate::messages::{AsPathSegment, AsPathSegmentType};
    use pretty_assertions::assert_eq;

    fn p(s: &str) -> Prefix4 {
        s.parse().unwrap()
    }

    fn peer_attribs(med: u32) -> Arc<Vec<PathAttribute>> {
        Arc::new(vec![
            PathAttribute::origin(PathOrigin::Igp),
            PathAttribute::as_path(AsPath {
                four_byte: true,
                segments: vec![AsPathSegment {
                    typ: AsPathSegmentType::AsSequence,
                    value: vec![65001],
                }],
            }),
            PathAttribute::next_hop("192.0.2.1".parse().unwrap()),
            PathAttribute::med(med),
        ])
    }

    #[test]
    fn lower_med_replaces() {
        let rib = Rib4::new(init_logger());
        assert!(rib.insert_from_peer(
            1,
            p("10.0.0.0/8"),
            "192.0.2.1".parse().unwrap(),
            peer_attribs(100),
            0,
        ));
        assert!(rib.insert_from_peer(
            2,
            p("10.0.0.0/8"),
            "192.0.2.2".parse().unwrap(),
            peer_attribs(50),
            0,
        ));

        let best = rib.lookup("10.1.2.3".parse().unwrap()).unwrap();
        assert_eq!(best.src_router_id, 2);
    }

    #[test]
    fn same_source_keeps_better_entry() {
        let rib = Rib4::new(init_logger());
        assert!(rib.insert_from_peer(
            1,
            p("10.0.0.0/8"),
            "192.0.2.1".parse().unwrap(),
            peer_attribs(50),
            0,
        ));
        // A worse route from the same source does not replace.
        assert!(!rib.insert_from_peer(
            1,
            p("10.0.0.0/8"),
            "192.0.2.1".parse().unwrap(),
            peer_attribs(100),
            0,
        ));
        // A better one does.
        assert!(rib.insert_from_peer(
            1,
            p("10.0.0.0/8"),
            "192.0.2.1".parse().unwrap(),
            peer_attribs(10),
            0,
        ));
        assert_eq!(rib.len(), 1);

        // Every insert call consumes an update-id slot, even the rejected
        // one in the middle.
        assert_eq!(rib.entries()[0].update_id, 2);
    }

    #[test]
    fn longest_prefix_wins() {
        let rib = Rib4::new(init_logger());
        rib.insert_from_peer(
            1,
            p("10.0.0.0/8"),
            "192.0.2.1".parse().unwrap(),
            peer_attribs(0),
            100,
        );
        // Lower weight, but specificity is decided before the tie-break.
        rib.insert_from_peer(
            2,
            p("10.1.0.0/16"),
            "192.0.2.2".parse().unwrap(),
            peer_attribs(0),
            0,
        );

        let best = rib.lookup("10.1.9.9".parse().unwrap()).unwrap();
        assert_eq!(best.route, p("10.1.0.0/16"));

        let best = rib.lookup("10.2.0.1".parse().unwrap()).unwrap();
        assert_eq!(best.route, p("10.0.0.0/8"));

        assert!(rib.lookup("11.0.0.1".parse().unwrap()).is_none());
    }

    #[test]
    fn scoped_lookup() {
        let rib = Rib4::new(init_logger());
        rib.insert_from_peer(
            1,
            p("10.0.0.0/8"),
            "192.0.2.1".parse().unwrap(),
            peer_attribs(0),
            0,
        );
        assert!(rib.lookup_from(1, "10.0.0.1".parse().unwrap()).is_some());
        assert!(rib.lookup_from(2, "10.0.0.1".parse().unwrap()).is_none());
    }

    #[test]
    fn withdraw_and_discard() {
        let rib = Rib4::new(init_logger());
        rib.insert_many_from_peer(
            1,
            &[p("10.0.0.0/8"), p("10.1.0.0/16")],
            "192.0.2.1".parse().unwrap(),
            peer_attribs(0),
            0,
        );
        rib.insert_from_peer(
            2,
            p("172.16.0.0/12"),
            "192.0.2.2".parse().unwrap(),
            peer_attribs(0),
            0,
        );

        assert!(rib.withdraw(1, p("10.1.0.0/16")));
        assert!(!rib.withdraw(1, p("10.1.0.0/16")));
        // Wrong scope does not remove.
        assert!(!rib.withdraw(2, p("10.0.0.0/8")));

        let dropped = rib.discard(1);
        assert_eq!(dropped, vec![p("10.0.0.0/8")]);
        assert_eq!(rib.len(), 1);
    }

    #[test]
    fn batch_shares_update_group() {
        let rib = Rib4::new(init_logger());
        let inserted = rib.insert_many_from_peer(
            1,
            &[p("10.0.0.0/8"), p("10.1.0.0/16")],
            "192.0.2.1".parse().unwrap(),
            peer_attribs(0),
            0,
        );
        assert_eq!(inserted.len(), 2);

        let entries = rib.entries();
        assert_eq!(entries[0].update_id, entries[1].update_id);

        // The next batch lands in a fresh group.
        rib.insert_many_from_peer(
            1,
            &[p("192.168.0.0/16")],
            "192.0.2.1".parse().unwrap(),
            peer_attribs(0),
            0,
        );
        let entries = rib.entries();
        assert!(entries[2].update_id != entries[0].update_id);
    }

    #[test]
    fn local_insert_coalesces_by_nexthop() {
        let rib = Rib4::new(init_logger());
        let nh: Ipv4Addr = "10.0.0.1".parse().unwrap();
        let a = rib.insert_local(p("172.30.0.0/24"), nh, 0).unwrap();
        let b = rib.insert_local(p("172.30.1.0/24"), nh, 0).unwrap();
        let c = rib
            .insert_local(p("172.30.2.0/24"), "10.0.0.2".parse().unwrap(), 0)
            .unwrap();

        assert_eq!(a.update_id, b.update_id);
        assert!(c.update_id != a.update_id);

        // Duplicate local route is refused.
        assert!(rib.insert_local(p("172.30.0.0/24"), nh, 0).is_none());

        // Local routes answer lookups like any other.
        let found = rib.lookup("172.30.1.77".parse().unwrap()).unwrap();
        assert_eq!(found.src_router_id, LOCAL_SOURCE);
        assert_eq!(found.route, p("172.30.1.0/24"));
    }

    #[test]
    fn rib6_basics() {
        let rib = Rib6::new(init_logger());
        let route: Prefix6 = "fd00:1701::/32".parse().unwrap();
        let gw: Ipv6Addr = "fd00::1".parse().unwrap();
        let ll: Ipv6Addr = "fe80::1".parse().unwrap();

        let entry = rib.insert_local(route, gw, Some(ll), 0).unwrap();
        assert_eq!(entry.nexthop_global, gw);
        assert_eq!(entry.nexthop_linklocal, Some(ll));

        let found = rib.lookup("fd00:1701::42".parse().unwrap()).unwrap();
        assert_eq!(found.route, route);
        assert_eq!(found.nexthop_global, gw);

        assert!(rib.withdraw(LOCAL_SOURCE, route));
        assert!(rib.lookup("fd00:1701::42".parse().unwrap()).is_none());
    }

    #[test]
    fn rib6_peer_routes_tie_break() {
        let rib = Rib6::new(init_logger());
        let route: Prefix6 = "fd00:1701::/32".parse().unwrap();

        assert!(rib.insert_from_peer(
            1,
            route,
            "fd00::1".parse().unwrap(),
            None,
            peer_attribs(100),
            0,
        ));
        assert!(rib.insert_from_peer(
            2,
            route,
            "fd00::2".parse().unwrap(),
            None,
            peer_attribs(50),
            0,
        ));

        let best = rib.lookup("fd00:1701::1".parse().unwrap()).unwrap();
        assert_eq!(best.src_router_id, 2);

        let dropped = rib.discard(2);
        assert_eq!(dropped, vec![route]);
        let best = rib.lookup("fd00:1701::1".parse().unwrap()).unwrap();
        assert_eq!(best.src_router_id, 1);
    }
}
