// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Best-path selection. The decision runs over the attributes stored with
//! each RIB entry, first difference wins:
//!
//! 1. higher weight
//! 2. higher LOCAL_PREF
//! 3. shorter AS_PATH (an AS_SET counts as one hop)
//! 4. lower ORIGIN
//! 5. lower MED, compared only between routes from the same neighboring AS
//! 6. lower source router id

use crate::messages::{PathAttribute, PathAttributeValue, PathOrigin};
use crate::rib::{Rib4Entry, Rib6Entry};
use std::cmp::Ordering;

/// Is `a` strictly preferred over `b`?
pub fn preferred4(a: &Rib4Entry, b: &Rib4Entry) -> bool {
    compare(
        a.weight,
        &a.attribs,
        a.src_router_id,
        b.weight,
        &b.attribs,
        b.src_router_id,
    ) == Ordering::Greater
}

/// Is `a` strictly preferred over `b`?
pub fn preferred6(a: &Rib6Entry, b: &Rib6Entry) -> bool {
    compare(
        a.weight,
        &a.attribs,
        a.src_router_id,
        b.weight,
        &b.attribs,
        b.src_router_id,
    ) == Ordering::Greater
}

fn compare(
    a_weight: i32,
    a_attribs: &[PathAttribute],
    a_src: u32,
    b_weight: i32,
    b_attribs: &[PathAttribute],
    b_src: u32,
) -> Ordering {
    if a_weight != b_weight {
        return a_weight.cmp(&b_weight);
    }

    let a_pref = local_pref(a_attribs).unwrap_or(0);
    let b_pref = local_pref(b_attribs).unwrap_or(0);
    if a_pref != b_pref {
        return a_pref.cmp(&b_pref);
    }

    let a_hops = hop_count(a_attribs);
    let b_hops = hop_count(b_attribs);
    if a_hops != b_hops {
        return b_hops.cmp(&a_hops);
    }

    let a_origin = origin(a_attribs).unwrap_or(PathOrigin::Incomplete) as u8;
    let b_origin = origin(b_attribs).unwrap_or(PathOrigin::Incomplete) as u8;
    if a_origin != b_origin {
        return b_origin.cmp(&a_origin);
    }

    // MED is only comparable between routes through the same neighboring AS.
    let a_first = first_asn(a_attribs);
    if a_first.is_some() && a_first == first_asn(b_attribs) {
        let a_med = med(a_attribs).unwrap_or(0);
        let b_med = med(b_attribs).unwrap_or(0);
        if a_med != b_med {
            return b_med.cmp(&a_med);
        }
    }

    b_src.cmp(&a_src)
}

fn local_pref(attribs: &[PathAttribute]) -> Option<u32> {
    attribs.iter().find_map(|a| match &a.value {
        PathAttributeValue::LocalPref(v) => Some(*v),
        _ => None,
    })
}

fn med(attribs: &[PathAttribute]) -> Option<u32> {
    attribs.iter().find_map(|a| match &a.value {
        PathAttributeValue::MultiExitDisc(v) => Some(*v),
        _ => None,
    })
}

fn origin(attribs: &[PathAttribute]) -> Option<PathOrigin> {
    attribs.iter().find_map(|a| match &a.value {
        PathAttributeValue::Origin(o) => Some(*o),
        _ => None,
    })
}

fn hop_count(attribs: &[PathAttribute]) -> usize {
    attribs
        .iter()
        .find_map(|a| match &a.value {
            PathAttributeValue::AsPath(p) => Some(p.hop_count()),
            _ => None,
        })
        .unwrap_or(0)
}

fn first_asn(attribs: &[PathAttribute]) -> Option<u32> {
    attribs.iter().find_map(|a| match &a.value {
        PathAttributeValue::AsPath(p) => p.first_asn(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{AsPath, AsPathSegment, AsPathSegmentType};
    use bgp_types::Prefix4;
    use std::sync::Arc;

    fn entry(
        src: u32,
        weight: i32,
        attribs: Vec<PathAttribute>,
    ) -> Rib4Entry {
        Rib4Entry {
            route: "10.0.0.0/8".parse::<Prefix4>().unwrap(),
            src_router_id: src,
            nexthop: "192.0.2.1".parse().unwrap(),
            attribs: Arc::new(attribs),
            weight,
            update_id: 0,
        }
    }

    fn path(asns: &[u32]) -> PathAttribute {
        PathAttribute::as_path(AsPath {
            four_byte: true,
            segments: vec![AsPathSegment {
                typ: AsPathSegmentType::AsSequence,
                value: asns.to_vec(),
            }],
        })
    }

    #[test]
    fn weight_dominates() {
        let a = entry(1, 10, vec![PathAttribute::local_pref(0)]);
        let b = entry(2, 5, vec![PathAttribute::local_pref(500)]);
        assert!(preferred4(&a, &b));
        assert!(!preferred4(&b, &a));
    }

    #[test]
    fn local_pref_beats_path_length() {
        let a = entry(1, 0, vec![PathAttribute::local_pref(200), path(&[1, 2, 3])]);
        let b = entry(2, 0, vec![PathAttribute::local_pref(100), path(&[1])]);
        assert!(preferred4(&a, &b));
    }

    #[test]
    fn shorter_path_wins() {
        let a = entry(1, 0, vec![path(&[65001, 65002])]);
        let b = entry(2, 0, vec![path(&[65001])]);
        assert!(preferred4(&b, &a));
    }

    #[test]
    fn as_set_counts_once() {
        let mut seq_and_set = vec![path(&[65001])];
        if let PathAttributeValue::AsPath(p) = &mut seq_and_set[0].value {
            p.segments.push(AsPathSegment {
                typ: AsPathSegmentType::AsSet,
                value: vec![65002, 65003, 65004],
            });
        }
        // Two hops total vs a three hop sequence.
        let a = entry(1, 0, seq_and_set);
        let b = entry(2, 0, vec![path(&[65001, 65002, 65003])]);
        assert!(preferred4(&a, &b));
    }

    #[test]
    fn lower_origin_wins() {
        let a = entry(
            1,
            0,
            vec![PathAttribute::origin(PathOrigin::Igp), path(&[65001])],
        );
        let b = entry(
            2,
            0,
            vec![PathAttribute::origin(PathOrigin::Egp), path(&[65001])],
        );
        assert!(preferred4(&a, &b));
    }

    #[test]
    fn med_only_compared_same_neighbor() {
        let a = entry(1, 0, vec![path(&[65001]), PathAttribute::med(100)]);
        let b = entry(2, 0, vec![path(&[65001]), PathAttribute::med(50)]);
        assert!(preferred4(&b, &a));

        // Different neighboring AS: MED ignored, falls to source id.
        let c = entry(1, 0, vec![path(&[65001]), PathAttribute::med(100)]);
        let d = entry(2, 0, vec![path(&[65002]), PathAttribute::med(50)]);
        assert!(preferred4(&c, &d));
    }

    #[test]
    fn source_id_breaks_ties() {
        let a = entry(1, 0, vec![path(&[65001])]);
        let b = entry(2, 0, vec![path(&[65001])]);
        assert!(preferred4(&a, &b));
        assert!(!preferred4(&b, &a));
    }

    #[test]
    fn anti_symmetry() {
        let cases = [
            (entry(1, 1, vec![]), entry(2, 0, vec![])),
            (entry(1, 0, vec![path(&[1])]), entry(2, 0, vec![path(&[1, 2])])),
            (entry(3, 0, vec![]), entry(4, 0, vec![])),
        ];
        for (a, b) in &cases {
            assert!(preferred4(a, b) != preferred4(b, a));
        }
    }
}
