// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::filter::FilterRule;
use bgp_types::Prefix4;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// The hold time proposed when the host does not configure one.
pub const DEFAULT_HOLD_TIME: u16 = 120;

/// Static configuration for one peering session.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SessionConfig {
    /// Local ASN.
    pub asn: u32,

    /// Expected peer ASN. A mismatch in the peer's OPEN is rejected with a
    /// bad-peer-AS notification. Zero accepts any peer ASN.
    pub peer_asn: u32,

    /// Local BGP identifier, as a host-order integer.
    pub router_id: u32,

    /// Advertise the four-octet-AS capability (RFC 6793). The session runs
    /// 4-byte only when both sides advertise it.
    pub four_byte_asn: bool,

    /// Proposed hold time in seconds. Zero disables the hold timer. The
    /// negotiated value is the minimum of both proposals.
    pub hold_time: u16,

    /// Weight given to routes learned from this peer. First key of the
    /// best-path decision.
    pub weight: i32,

    /// Default nexthop for egress updates.
    pub nexthop: Ipv4Addr,

    /// The prefix of the shared peering LAN. When set, received nexthops
    /// must fall inside it (unless `no_nexthop_check`), and outgoing
    /// nexthops outside it are rewritten to `nexthop`.
    pub peering_lan: Option<Prefix4>,

    /// Always rewrite the egress nexthop to `nexthop`.
    pub forced_default_nexthop: bool,

    /// Skip the ingress nexthop reachability rule.
    pub no_nexthop_check: bool,

    /// Do not probe the route event bus for sessions to the same peer.
    pub no_collision_detection: bool,

    /// Ingress route filters, applied to received NLRI before RIB insert.
    pub in_filters: Vec<FilterRule>,

    /// Egress route filters, applied before advertising.
    pub out_filters: Vec<FilterRule>,

    /// Log every message sent and received.
    pub verbose: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            asn: 0,
            peer_asn: 0,
            router_id: 0,
            four_byte_asn: false,
            hold_time: DEFAULT_HOLD_TIME,
            weight: 0,
            nexthop: Ipv4Addr::UNSPECIFIED,
            peering_lan: None,
            forced_default_nexthop: false,
            no_nexthop_check: false,
            no_collision_detection: false,
            in_filters: Vec::new(),
            out_filters: Vec::new(),
            verbose: false,
        }
    }
}
