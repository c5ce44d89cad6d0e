// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use bgp_types::Prefix4;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema,
)]
pub enum FilterAction {
    Accept,
    Reject,
}

/// How a rule's prefix is matched against a route.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema,
)]
pub enum PrefixMatch {
    /// The route must equal the rule prefix exactly.
    Exact,

    /// The route must equal the rule prefix or be a more specific prefix
    /// inside it.
    OrLonger,
}

/// One entry of an ingress or egress filter list.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema,
)]
pub struct FilterRule {
    pub action: FilterAction,
    pub prefix: Prefix4,
    pub mode: PrefixMatch,
}

impl FilterRule {
    pub fn new(
        action: FilterAction,
        prefix: Prefix4,
        mode: PrefixMatch,
    ) -> Self {
        Self {
            action,
            prefix,
            mode,
        }
    }

    fn matches(&self, route: &Prefix4) -> bool {
        match self.mode {
            PrefixMatch::Exact => self.prefix == *route,
            PrefixMatch::OrLonger => self.prefix.includes_prefix(route),
        }
    }
}

/// Apply an ordered rule list to a route. The first matching rule decides;
/// a route no rule matches is accepted.
pub fn apply(rules: &[FilterRule], route: &Prefix4) -> FilterAction {
    for rule in rules {
        if rule.matches(route) {
            return rule.action;
        }
    }
    FilterAction::Accept
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn p(s: &str) -> Prefix4 {
        s.parse().unwrap()
    }

    #[test]
    fn empty_list_accepts() {
        assert_eq!(apply(&[], &p("10.0.0.0/8")), FilterAction::Accept);
    }

    #[test]
    fn first_match_wins() {
        let rules = [
            FilterRule::new(
                FilterAction::Reject,
                p("10.1.0.0/16"),
                PrefixMatch::OrLonger,
            ),
            FilterRule::new(
                FilterAction::Accept,
                p("10.0.0.0/8"),
                PrefixMatch::OrLonger,
            ),
            FilterRule::new(
                FilterAction::Reject,
                p("0.0.0.0/0"),
                PrefixMatch::OrLonger,
            ),
        ];

        assert_eq!(apply(&rules, &p("10.1.2.0/24")), FilterAction::Reject);
        assert_eq!(apply(&rules, &p("10.2.0.0/16")), FilterAction::Accept);
        assert_eq!(apply(&rules, &p("192.0.2.0/24")), FilterAction::Reject);
    }

    #[test]
    fn exact_match() {
        let rules = [FilterRule::new(
            FilterAction::Reject,
            p("10.0.0.0/8"),
            PrefixMatch::Exact,
        )];

        assert_eq!(apply(&rules, &p("10.0.0.0/8")), FilterAction::Reject);
        // A more specific route does not hit an exact rule.
        assert_eq!(apply(&rules, &p("10.1.0.0/16")), FilterAction::Accept);
    }
}
