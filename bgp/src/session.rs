// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The per-peer session state machine. A session owns no socket and no
//! thread: the host feeds it inbound bytes through [`Session::bytes_in`],
//! drives time through [`Session::tick`], and receives outbound messages
//! synchronously through its [`OutputHandler`]. Sibling sessions of one
//! process communicate through the route event bus.

use crate::bus::{
    RouteAddEvent, RouteEvent, RouteEventBus, RouteEventReceiver,
    RouteWithdrawEvent, SubscriberId,
};
use crate::clock::{Clock, Timer};
use crate::config::SessionConfig;
use crate::error::Error;
use crate::filter::{self, FilterAction};
use crate::messages::{
    CeaseErrorSubcode, FsmErrorSubcode, Header, Message, NotificationMessage,
    OpenErrorSubcode, OpenMessage, PathAttribute, PathAttributeFlags,
    PathAttributeValue, UpdateMessage, AS_TRANS, HEADER_SIZE,
};
use crate::rib::{Rib4, Rib6};
use bgp_types::Prefix4;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use slog::{debug, info, warn, Logger};
use std::fmt::{self, Display, Formatter};
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

/// Implemented by the host to carry outbound messages to the peer. Called
/// synchronously during message emission; returning `false` is treated as
/// a transport failure and drops the session back to idle.
pub trait OutputHandler: Send + Sync {
    fn handle_out(&self, msg: &[u8]) -> bool;
}

/// The states a session may be in. The connect/active states of RFC 4271
/// have no analogue here because transport is the host's business.
#[derive(
    Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize, JsonSchema,
)]
pub enum FsmState {
    /// No session. Inbound OPENs are answered (passive open); everything
    /// else is ignored.
    Idle,

    /// Our OPEN is out, waiting for the peer's.
    OpenSent,

    /// OPENs exchanged, waiting for the peer's keepalive.
    OpenConfirm,

    /// Able to exchange update, notification and keepalive messages with
    /// the peer.
    Established,
}

impl FsmState {
    fn as_str(&self) -> &'static str {
        match self {
            FsmState::Idle => "idle",
            FsmState::OpenSent => "open sent",
            FsmState::OpenConfirm => "open confirm",
            FsmState::Established => "established",
        }
    }
}

impl Display for FsmState {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Session parameters learned from the peer's OPEN.
#[derive(Debug, Default, Clone, Copy)]
struct Negotiated {
    /// Both sides advertised the four-octet-AS capability.
    four_byte: bool,

    /// The peer's BGP identifier.
    peer_id: u32,

    /// The peer's ASN, reconciled through the capability when 4-byte.
    peer_asn: u32,

    /// min(local proposal, peer proposal); zero disables the hold timer.
    hold_time: u16,
}

#[derive(Default)]
pub struct SessionCounters {
    pub opens_sent: AtomicU64,
    pub opens_received: AtomicU64,
    pub updates_sent: AtomicU64,
    pub updates_received: AtomicU64,
    pub keepalives_sent: AtomicU64,
    pub keepalives_received: AtomicU64,
    pub notifications_sent: AtomicU64,
    pub notifications_received: AtomicU64,
    pub transitions_to_idle: AtomicU64,
}

pub struct Session<Out: OutputHandler> {
    pub config: SessionConfig,
    pub counters: SessionCounters,

    state: Mutex<FsmState>,
    neg: Mutex<Negotiated>,

    hold_timer: Mutex<Timer>,
    keepalive_timer: Mutex<Timer>,
    last_tick: Mutex<Option<u64>>,

    /// Reassembly buffer for inbound bytes.
    in_buf: Mutex<Vec<u8>>,

    rib4: Rib4,
    rib6: Rib6,

    bus: Option<Arc<RouteEventBus>>,
    bus_id: Mutex<Option<SubscriberId>>,

    clock: Arc<dyn Clock>,
    out: Out,
    log: Logger,
}

enum FrameStep {
    Frame(Vec<u8>),
    Wait,
    Fail(Error),
}

impl<Out: OutputHandler + 'static> Session<Out> {
    /// Create a session and, when a bus is given, subscribe it there.
    pub fn new(
        config: SessionConfig,
        rib4: Rib4,
        rib6: Rib6,
        bus: Option<Arc<RouteEventBus>>,
        clock: Arc<dyn Clock>,
        out: Out,
        log: Logger,
    ) -> Arc<Self> {
        let hold = config.hold_time as u64;
        let session = Arc::new(Session {
            config,
            counters: SessionCounters::default(),
            state: Mutex::new(FsmState::Idle),
            neg: Mutex::new(Negotiated::default()),
            hold_timer: Mutex::new(Timer::new(hold)),
            keepalive_timer: Mutex::new(Timer::new(hold / 3)),
            last_tick: Mutex::new(None),
            in_buf: Mutex::new(Vec::new()),
            rib4,
            rib6,
            bus,
            bus_id: Mutex::new(None),
            clock,
            out,
            log,
        });
        if let Some(bus) = &session.bus {
            let receiver = Arc::downgrade(&session)
                as Weak<dyn RouteEventReceiver>;
            let id = bus.subscribe(receiver);
            *session.bus_id.lock().unwrap() = Some(id);
        }
        session
    }

    pub fn state(&self) -> FsmState {
        *self.state.lock().unwrap()
    }

    pub fn rib4(&self) -> &Rib4 {
        &self.rib4
    }

    pub fn rib6(&self) -> &Rib6 {
        &self.rib6
    }

    /// The peer's BGP identifier, once an OPEN has been accepted.
    pub fn peer_id(&self) -> u32 {
        self.neg.lock().unwrap().peer_id
    }

    /// Whether the session negotiated 4-byte ASNs.
    pub fn four_byte(&self) -> bool {
        self.neg.lock().unwrap().four_byte
    }

    /// Begin actively: send OPEN and wait for the peer's.
    pub fn start(&self) {
        if self.state() != FsmState::Idle {
            warn!(self.log, "start ignored, session already running");
            return;
        }
        let open = self.make_open(None);
        self.set_state(FsmState::OpenSent);
        self.send(open.into());
    }

    /// Stop the session. Idempotent; sends a cease notification on a best
    /// effort basis and returns to idle.
    pub fn stop(&self) {
        if self.state() == FsmState::Idle {
            return;
        }
        self.close(Some(
            Error::cease(CeaseErrorSubcode::AdministrativeShutdown)
                .to_notification()
                .unwrap(),
        ));
    }

    /// Advance time. Reads the host clock and ticks the hold and keepalive
    /// timers with the elapsed whole seconds since the previous call.
    pub fn tick(&self) {
        let now = self.clock.now();
        let elapsed = {
            let mut last = self.last_tick.lock().unwrap();
            let elapsed = match *last {
                Some(prev) => now.saturating_sub(prev),
                None => 0,
            };
            *last = Some(now);
            elapsed
        };
        if elapsed == 0 || self.state() != FsmState::Established {
            return;
        }

        let fire_keepalive = {
            let timer = self.keepalive_timer.lock().unwrap();
            timer.tick(elapsed);
            if timer.expired() {
                timer.reset();
                true
            } else {
                false
            }
        };
        if fire_keepalive {
            self.send(Message::KeepAlive);
        }

        let hold_expired = {
            let timer = self.hold_timer.lock().unwrap();
            timer.tick(elapsed);
            timer.expired()
        };
        if hold_expired {
            warn!(self.log, "hold timer expired");
            self.close(Some(
                Error::hold_timer_expired().to_notification().unwrap(),
            ));
        }
    }

    /// Feed inbound bytes. Complete messages are parsed and dispatched in
    /// arrival order; a trailing partial message stays buffered.
    pub fn bytes_in(&self, input: &[u8]) {
        self.in_buf.lock().unwrap().extend_from_slice(input);

        loop {
            let step = {
                let mut buf = self.in_buf.lock().unwrap();
                if buf.len() < HEADER_SIZE {
                    FrameStep::Wait
                } else {
                    match Header::from_wire(&buf) {
                        Ok(header) => {
                            let length = header.length as usize;
                            if buf.len() < length {
                                FrameStep::Wait
                            } else {
                                FrameStep::Frame(
                                    buf.drain(..length).collect(),
                                )
                            }
                        }
                        Err(e) => {
                            buf.clear();
                            FrameStep::Fail(e)
                        }
                    }
                }
            };

            match step {
                FrameStep::Frame(frame) => self.handle_frame(&frame),
                FrameStep::Wait => break,
                FrameStep::Fail(e) => {
                    self.fatal_error(e);
                    break;
                }
            }
        }
    }

    fn handle_frame(&self, frame: &[u8]) {
        let four_byte = self.four_byte();
        match Message::from_wire(frame, four_byte) {
            Ok((msg, _)) => self.handle_message(msg),
            Err(e) => self.fatal_error(e),
        }
    }

    fn handle_message(&self, msg: Message) {
        let counter = match &msg {
            Message::Open(_) => &self.counters.opens_received,
            Message::Update(_) => &self.counters.updates_received,
            Message::Notification(_) => &self.counters.notifications_received,
            Message::KeepAlive => &self.counters.keepalives_received,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        if self.config.verbose {
            info!(
                self.log,
                "rx {}", msg.title();
                "state" => %self.state(),
            );
        }

        match (self.state(), msg) {
            // Passive open: an idle session answers a valid OPEN.
            (FsmState::Idle, Message::Open(om)) => {
                self.process_open(om, true)
            }
            (FsmState::Idle, msg) => {
                debug!(self.log, "rx {} while idle, ignored", msg.title());
            }

            // A notification is the peer closing on us; never answered.
            (_, Message::Notification(n)) => {
                warn!(self.log, "peer sent notification: {n}");
                self.close(None);
            }

            (FsmState::OpenSent, Message::Open(om)) => {
                self.process_open(om, false)
            }
            (FsmState::OpenSent, msg) => {
                warn!(
                    self.log,
                    "rx unexpected {} in open sent, dropping session",
                    msg.title()
                );
                self.close(
                    Error::fsm(FsmErrorSubcode::UnexpectedMessageInOpenSent)
                        .to_notification(),
                );
            }

            (FsmState::OpenConfirm, Message::KeepAlive) => self.establish(),
            (FsmState::OpenConfirm, msg) => {
                warn!(
                    self.log,
                    "rx unexpected {} in open confirm, dropping session",
                    msg.title()
                );
                self.close(
                    Error::fsm(
                        FsmErrorSubcode::UnexpectedMessageInOpenConfirm,
                    )
                    .to_notification(),
                );
            }

            (FsmState::Established, Message::Update(um)) => {
                self.reset_hold();
                self.handle_update(um);
            }
            (FsmState::Established, Message::KeepAlive) => {
                self.reset_hold();
            }
            (FsmState::Established, msg) => {
                warn!(
                    self.log,
                    "rx unexpected {} in established, dropping session",
                    msg.title()
                );
                self.close(
                    Error::fsm(
                        FsmErrorSubcode::UnexpectedMessageInEstablished,
                    )
                    .to_notification(),
                );
            }
        }
    }

    fn make_open(&self, peer: Option<&OpenMessage>) -> OpenMessage {
        let c = &self.config;
        let mut open = if c.four_byte_asn {
            OpenMessage::new4(c.asn, c.hold_time, c.router_id)
        } else {
            let wire_asn = if c.asn > u16::MAX as u32 {
                AS_TRANS
            } else {
                c.asn as u16
            };
            OpenMessage::new2(wire_asn, c.hold_time, c.router_id)
        };
        // Unknown capabilities from the peer's OPEN are reflected back in
        // the passive reply.
        if let Some(peer) = peer {
            for cap in peer.capabilities() {
                if let crate::messages::Capability::Unknown { .. } = cap {
                    open.parameters.push(cap.clone().into());
                }
            }
        }
        open
    }

    fn validate_open(&self, om: &OpenMessage) -> Result<(u32, bool), Error> {
        if om.id == 0 {
            return Err(Error::open(
                OpenErrorSubcode::BadBgpIdentifier,
                om.id.to_be_bytes().to_vec(),
            ));
        }

        // Zero disables the hold timer, anything else below three seconds
        // is unacceptable.
        if om.hold_time == 1 || om.hold_time == 2 {
            return Err(Error::open(
                OpenErrorSubcode::UnacceptableHoldTime,
                om.hold_time.to_be_bytes().to_vec(),
            ));
        }

        let four_byte =
            self.config.four_byte_asn && om.four_octet_asn().is_some();
        let peer_asn = match om.four_octet_asn() {
            Some(asn) if four_byte => asn,
            _ => om.asn as u32,
        };

        if self.config.peer_asn != 0 {
            let expected =
                if self.config.peer_asn > u16::MAX as u32 && !four_byte {
                    AS_TRANS as u32
                } else {
                    self.config.peer_asn
                };
            if peer_asn != expected {
                return Err(Error::open(
                    OpenErrorSubcode::BadPeerAs,
                    om.asn.to_be_bytes().to_vec(),
                ));
            }
        }

        Ok((peer_asn, four_byte))
    }

    /// Accept a peer OPEN from idle (passive) or open-sent (active): adopt
    /// the negotiated parameters, run collision detection against sibling
    /// sessions, and confirm.
    fn process_open(&self, om: OpenMessage, passive: bool) {
        let (peer_asn, four_byte) = match self.validate_open(&om) {
            Ok(v) => v,
            Err(e) => {
                self.fatal_error(e);
                return;
            }
        };

        let hold_time = self.config.hold_time.min(om.hold_time);
        {
            let mut neg = self.neg.lock().unwrap();
            neg.four_byte = four_byte;
            neg.peer_id = om.id;
            neg.peer_asn = peer_asn;
            neg.hold_time = hold_time;
        }
        *self.hold_timer.lock().unwrap() = Timer::new(hold_time as u64);
        *self.keepalive_timer.lock().unwrap() =
            Timer::new(hold_time as u64 / 3);

        info!(
            self.log,
            "peer open accepted";
            "peer_asn" => peer_asn,
            "peer_id" => om.id,
            "hold_time" => hold_time,
            "four_byte" => four_byte,
        );

        // Ask the bus whether a sibling already has a session with this
        // speaker. A surviving sibling means this session is the loser.
        if !self.config.no_collision_detection {
            if let Some(bus) = &self.bus {
                let from = *self.bus_id.lock().unwrap();
                let handled = bus.publish(
                    from,
                    &RouteEvent::CollisionProbe { peer_bgp_id: om.id },
                );
                if handled > 0 && self.config.router_id > om.id {
                    warn!(
                        self.log,
                        "session collision lost, dropping session";
                        "peer_id" => om.id,
                    );
                    self.close(
                        Error::cease(
                            CeaseErrorSubcode::ConnectionCollisionResolution,
                        )
                        .to_notification(),
                    );
                    return;
                }
            }
        }

        self.set_state(FsmState::OpenConfirm);
        if passive {
            let open = self.make_open(Some(&om));
            if !self.send(open.into()) {
                return;
            }
        }
        self.send(Message::KeepAlive);
    }

    /// The peer confirmed with a keepalive: the session is up. Arm the
    /// timers and advertise what the RIB already holds.
    fn establish(&self) {
        self.set_state(FsmState::Established);
        *self.last_tick.lock().unwrap() = Some(self.clock.now());

        let hold_time = self.neg.lock().unwrap().hold_time;
        if hold_time > 0 {
            let hold = self.hold_timer.lock().unwrap();
            hold.reset();
            hold.enable();
            let keepalive = self.keepalive_timer.lock().unwrap();
            keepalive.reset();
            keepalive.enable();
        }

        info!(self.log, "session established");
        self.flush_rib();
    }

    /// Advertise the current RIB contents, one update per group of entries
    /// sharing an update id and attribute set. Routes learned from this
    /// very peer are not reflected back.
    fn flush_rib(&self) {
        let peer_id = self.peer_id();
        type Group = (u64, Arc<Vec<PathAttribute>>, Vec<Prefix4>);
        let mut groups: Vec<Group> = Vec::new();
        for entry in self.rib4.entries() {
            if entry.src_router_id == peer_id {
                continue;
            }
            match groups.iter_mut().find(|(id, attribs, _)| {
                *id == entry.update_id && **attribs == *entry.attribs
            }) {
                Some((_, _, routes)) => routes.push(entry.route),
                None => groups.push((
                    entry.update_id,
                    entry.attribs.clone(),
                    vec![entry.route],
                )),
            }
        }
        for (_, attribs, routes) in groups {
            self.announce(&attribs, routes);
        }
    }

    fn reset_hold(&self) {
        self.hold_timer.lock().unwrap().reset();
    }

    /// The ingress pipeline for one UPDATE received in established state.
    fn handle_update(&self, um: UpdateMessage) {
        // Attribute syntax and uniqueness were already checked during
        // parsing. Next: does the path loop through us?
        if let Some(path) = um.as_path() {
            if path.contains(self.config.asn) {
                warn!(
                    self.log,
                    "as path loops through local asn, update dropped"
                );
                return;
            }
        }

        // Nexthop reachability.
        if !self.config.no_nexthop_check && !um.nlri.is_empty() {
            if let (Some(lan), Some(nexthop)) =
                (self.config.peering_lan, um.nexthop())
            {
                if !lan.includes(nexthop) {
                    warn!(
                        self.log,
                        "nexthop {} outside peering lan {}, update dropped",
                        nexthop,
                        lan
                    );
                    return;
                }
            }
        }

        let mut um = um;
        let (four_byte, peer_id) = {
            let neg = self.neg.lock().unwrap();
            (neg.four_byte, neg.peer_id)
        };
        if four_byte {
            um.restore_as_path(&self.log);
            um.restore_aggregator();
        }

        let mut withdrawn = Vec::new();
        for route in &um.withdrawn {
            if self.rib4.withdraw(peer_id, *route) {
                withdrawn.push(*route);
            }
        }

        let mut inserted = Vec::new();
        let mut attribs = None;
        if !um.nlri.is_empty() {
            let nexthop = um.nexthop().unwrap_or(Ipv4Addr::UNSPECIFIED);
            let accepted: Vec<Prefix4> = um
                .nlri
                .iter()
                .filter(|r| {
                    filter::apply(&self.config.in_filters, r)
                        == FilterAction::Accept
                })
                .cloned()
                .collect();
            let shared = Arc::new(um.path_attributes);
            inserted = self.rib4.insert_many_from_peer(
                peer_id,
                &accepted,
                nexthop,
                shared.clone(),
                self.config.weight,
            );
            attribs = Some(shared);
        }

        if let Some(bus) = &self.bus {
            let from = *self.bus_id.lock().unwrap();
            if !withdrawn.is_empty() {
                bus.publish(
                    from,
                    &RouteEvent::Withdraw(RouteWithdrawEvent {
                        routes: withdrawn,
                    }),
                );
            }
            if !inserted.is_empty() {
                bus.publish(
                    from,
                    &RouteEvent::Add(RouteAddEvent {
                        attribs: attribs.unwrap(),
                        routes: inserted,
                    }),
                );
            }
        }
    }

    /// The egress pipeline: filter, rewrite, and send one UPDATE carrying
    /// the given routes under the given attributes.
    fn announce(&self, attribs: &[PathAttribute], routes: Vec<Prefix4>) {
        let routes: Vec<Prefix4> = routes
            .into_iter()
            .filter(|r| {
                filter::apply(&self.config.out_filters, r)
                    == FilterAction::Accept
            })
            .collect();
        if routes.is_empty() {
            return;
        }

        let mut um = UpdateMessage {
            withdrawn: Vec::new(),
            path_attributes: attribs.to_vec(),
            nlri: routes,
        };
        self.prepare_egress(&mut um);
        self.send(um.into());
    }

    fn withdraw_out(&self, routes: Vec<Prefix4>) {
        let routes: Vec<Prefix4> = routes
            .into_iter()
            .filter(|r| {
                filter::apply(&self.config.out_filters, r)
                    == FilterAction::Accept
            })
            .collect();
        if routes.is_empty() {
            return;
        }
        let um = UpdateMessage {
            withdrawn: routes,
            ..Default::default()
        };
        self.send(um.into());
    }

    fn prepare_egress(&self, um: &mut UpdateMessage) {
        let c = &self.config;

        let nexthop = if c.forced_default_nexthop {
            c.nexthop
        } else {
            match um.nexthop() {
                None => c.nexthop,
                Some(current) => match c.peering_lan {
                    Some(lan) if !lan.includes(current) => c.nexthop,
                    _ => current,
                },
            }
        };
        um.set_nexthop(nexthop);

        um.prepend(c.asn);

        // Unknown transitive attributes travel on with the partial bit set.
        for attr in &mut um.path_attributes {
            if matches!(attr.value, PathAttributeValue::Unknown(_))
                && attr.typ.is_transitive()
            {
                attr.typ.flags |= PathAttributeFlags::Partial as u8;
            }
        }

        if !self.four_byte() {
            um.downgrade_as_path();
            um.downgrade_aggregator();
        }
    }

    fn send(&self, msg: Message) -> bool {
        let buf = match msg.to_wire() {
            Ok(buf) => buf,
            Err(e) => {
                warn!(self.log, "serialize {} failed: {e}", msg.title());
                return false;
            }
        };

        let counter = match &msg {
            Message::Open(_) => &self.counters.opens_sent,
            Message::Update(_) => &self.counters.updates_sent,
            Message::Notification(_) => &self.counters.notifications_sent,
            Message::KeepAlive => &self.counters.keepalives_sent,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        if self.config.verbose {
            info!(self.log, "tx {}", msg.title(); "state" => %self.state());
        }

        if !self.out.handle_out(&buf) {
            warn!(self.log, "output handler refused write, dropping session");
            self.close(None);
            return false;
        }
        true
    }

    fn fatal_error(&self, e: Error) {
        warn!(self.log, "protocol error: {e}");
        self.close(e.to_notification());
    }

    /// Return to idle. Sends the given notification on a best effort
    /// basis, releases timers and buffered input, and when the session was
    /// established, withdraws everything learned from the peer.
    fn close(&self, notification: Option<NotificationMessage>) {
        let prev = {
            let mut state = self.state.lock().unwrap();
            std::mem::replace(&mut *state, FsmState::Idle)
        };

        // A notification goes out even when a passive open was rejected
        // from idle.
        if let Some(n) = notification {
            self.send(Message::Notification(n));
        }

        if prev == FsmState::Idle {
            return;
        }

        info!(self.log, "fsm transition to idle"; "from" => %prev);
        self.counters
            .transitions_to_idle
            .fetch_add(1, Ordering::Relaxed);

        self.hold_timer.lock().unwrap().disable();
        self.keepalive_timer.lock().unwrap().disable();
        self.in_buf.lock().unwrap().clear();

        if prev == FsmState::Established {
            self.withdraw_peer_routes();
        }
    }

    /// Drop everything learned from the peer and tell the siblings.
    fn withdraw_peer_routes(&self) {
        let peer_id = self.peer_id();
        let from = *self.bus_id.lock().unwrap();

        let routes = self.rib4.discard(peer_id);
        if !routes.is_empty() {
            if let Some(bus) = &self.bus {
                bus.publish(
                    from,
                    &RouteEvent::Withdraw(RouteWithdrawEvent { routes }),
                );
            }
        }

        let routes6 = self.rib6.discard(peer_id);
        if !routes6.is_empty() {
            if let Some(bus) = &self.bus {
                bus.publish(
                    from,
                    &RouteEvent::Withdraw6(crate::bus::RouteWithdraw6Event {
                        routes: routes6,
                    }),
                );
            }
        }
    }

    fn set_state(&self, next: FsmState) {
        let mut state = self.state.lock().unwrap();
        debug!(self.log, "fsm transition"; "from" => %*state, "to" => %next);
        *state = next;
    }

    /// Collision resolution, RFC 4271 §6.8 shape: a sibling in open-sent
    /// discovered a second session to our peer. If our local identifier
    /// outranks the peer's, this established session survives and the
    /// probing one closes itself; otherwise we are the losing side.
    fn handle_collision_probe(&self, peer_bgp_id: u32) -> bool {
        let state = self.state();
        if state != FsmState::OpenConfirm && state != FsmState::Established {
            return false;
        }
        if self.peer_id() != peer_bgp_id {
            return false;
        }

        if self.config.router_id > peer_bgp_id {
            info!(
                self.log,
                "session collision won, sibling session will close";
                "peer_id" => peer_bgp_id,
            );
        } else {
            warn!(
                self.log,
                "session collision lost, dropping session";
                "peer_id" => peer_bgp_id,
            );
            self.close(
                Error::cease(CeaseErrorSubcode::ConnectionCollisionResolution)
                    .to_notification(),
            );
        }
        true
    }
}

impl<Out: OutputHandler + 'static> RouteEventReceiver for Session<Out> {
    fn handle_route_event(
        &self,
        _from: Option<SubscriberId>,
        event: &RouteEvent,
    ) -> bool {
        match event {
            RouteEvent::CollisionProbe { peer_bgp_id } => {
                self.handle_collision_probe(*peer_bgp_id)
            }
            RouteEvent::Add(ev) => {
                if self.state() != FsmState::Established {
                    return false;
                }
                self.announce(&ev.attribs, ev.routes.clone());
                true
            }
            RouteEvent::Withdraw(ev) => {
                if self.state() != FsmState::Established {
                    return false;
                }
                self.withdraw_out(ev.routes.clone());
                true
            }
            // This session speaks IPv4 unicast on the wire; v6 events are
            // for the host's benefit.
            RouteEvent::Add6(_) | RouteEvent::Withdraw6(_) => false,
        }
    }
}

impl<Out: OutputHandler> Drop for Session<Out> {
    fn drop(&mut self) {
        if let (Some(bus), Some(id)) =
            (&self.bus, *self.bus_id.lock().unwrap())
        {
            bus.unsubscribe(id);
        }
    }
}
