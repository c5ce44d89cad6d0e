// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Address and prefix value types shared across the BGP crates.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// An IPv4 prefix. Stored in canonical form: bits beyond `length` are zero.
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
)]
pub struct Prefix4 {
    pub value: Ipv4Addr,
    pub length: u8,
}

impl Prefix4 {
    /// Create a prefix, masking off any host bits so the result is canonical.
    /// Lengths above 32 are clamped.
    pub fn new(value: Ipv4Addr, length: u8) -> Self {
        let length = length.min(32);
        let value =
            Ipv4Addr::from(u32::from(value) & mask4(length));
        Self { value, length }
    }

    /// The netmask implied by this prefix's length.
    pub fn mask(&self) -> u32 {
        mask4(self.length)
    }

    /// Does this prefix contain the given address? A zero-length prefix
    /// contains every address.
    pub fn includes(&self, addr: Ipv4Addr) -> bool {
        (u32::from(self.value) ^ u32::from(addr)) & self.mask() == 0
    }

    /// Does this prefix contain `other`? True when `other` is the same
    /// prefix or a more specific one inside it.
    pub fn includes_prefix(&self, other: &Prefix4) -> bool {
        self.length <= other.length && self.includes(other.value)
    }

    /// Same base prefix but strictly longer, i.e. more specific.
    pub fn more_specific_than(&self, other: &Prefix4) -> bool {
        other.includes_prefix(self) && self.length > other.length
    }
}

impl Display for Prefix4 {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.value, self.length)
    }
}

impl FromStr for Prefix4 {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (value, length) =
            s.split_once('/').ok_or("malformed prefix".to_string())?;
        let value: Ipv4Addr =
            value.parse().map_err(|_| "malformed ip addr".to_string())?;
        let length: u8 = length
            .parse()
            .map_err(|_| "malformed prefix length".to_string())?;
        if length > 32 {
            return Err(format!("prefix length {} > 32", length));
        }
        Ok(Self::new(value, length))
    }
}

fn mask4(length: u8) -> u32 {
    if length == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(length.min(32)))
    }
}

/// An IPv6 prefix. Stored in canonical form: bits beyond `length` are zero.
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
)]
pub struct Prefix6 {
    pub value: Ipv6Addr,
    pub length: u8,
}

impl Prefix6 {
    /// Create a prefix, masking off any host bits so the result is canonical.
    /// Lengths above 128 are clamped.
    pub fn new(value: Ipv6Addr, length: u8) -> Self {
        let length = length.min(128);
        let value =
            Ipv6Addr::from(u128::from(value) & mask6(length));
        Self { value, length }
    }

    pub fn mask(&self) -> u128 {
        mask6(self.length)
    }

    pub fn includes(&self, addr: Ipv6Addr) -> bool {
        (u128::from(self.value) ^ u128::from(addr)) & self.mask() == 0
    }

    pub fn includes_prefix(&self, other: &Prefix6) -> bool {
        self.length <= other.length && self.includes(other.value)
    }

    pub fn more_specific_than(&self, other: &Prefix6) -> bool {
        other.includes_prefix(self) && self.length > other.length
    }
}

impl Display for Prefix6 {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.value, self.length)
    }
}

impl FromStr for Prefix6 {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (value, length) =
            s.split_once('/').ok_or("malformed prefix".to_string())?;
        let value: Ipv6Addr =
            value.parse().map_err(|_| "malformed ip addr".to_string())?;
        let length: u8 = length
            .parse()
            .map_err(|_| "malformed prefix length".to_string())?;
        if length > 128 {
            return Err(format!("prefix length {} > 128", length));
        }
        Ok(Self::new(value, length))
    }
}

fn mask6(length: u8) -> u128 {
    if length == 0 {
        0
    } else {
        u128::MAX << (128 - u32::from(length.min(128)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn prefix4_canonical() {
        let p = Prefix4::new("10.1.2.3".parse().unwrap(), 16);
        assert_eq!(p, "10.1.0.0/16".parse().unwrap());
        assert_eq!(p.to_string(), "10.1.0.0/16");
    }

    #[test]
    fn prefix4_includes() {
        let p: Prefix4 = "10.0.0.0/8".parse().unwrap();
        assert!(p.includes("10.1.2.3".parse().unwrap()));
        assert!(!p.includes("11.0.0.1".parse().unwrap()));

        // Zero length matches everything.
        let all: Prefix4 = "0.0.0.0/0".parse().unwrap();
        assert!(all.includes("255.255.255.255".parse().unwrap()));

        // A host prefix matches exactly one address.
        let host: Prefix4 = "10.0.0.1/32".parse().unwrap();
        assert!(host.includes("10.0.0.1".parse().unwrap()));
        assert!(!host.includes("10.0.0.2".parse().unwrap()));
    }

    #[test]
    fn prefix4_containment() {
        let a: Prefix4 = "10.0.0.0/8".parse().unwrap();
        let b: Prefix4 = "10.1.0.0/16".parse().unwrap();
        assert!(a.includes_prefix(&b));
        assert!(!b.includes_prefix(&a));
        assert!(b.more_specific_than(&a));
        assert!(!a.more_specific_than(&a));
        assert!(a.includes_prefix(&a));
    }

    #[test]
    fn prefix4_parse_rejects() {
        assert!("10.0.0.0".parse::<Prefix4>().is_err());
        assert!("10.0.0.0/33".parse::<Prefix4>().is_err());
        assert!("banana/8".parse::<Prefix4>().is_err());
    }

    #[test]
    fn prefix6_includes() {
        let p: Prefix6 = "fd00:1701::/32".parse().unwrap();
        assert!(p.includes("fd00:1701::c".parse().unwrap()));
        assert!(!p.includes("fd00:1702::c".parse().unwrap()));

        let all: Prefix6 = "::/0".parse().unwrap();
        assert!(all.includes("2001:db8::1".parse().unwrap()));

        let host: Prefix6 = "fd00::1/128".parse().unwrap();
        assert!(host.includes("fd00::1".parse().unwrap()));
        assert!(!host.includes("fd00::2".parse().unwrap()));
    }

    #[test]
    fn prefix6_canonical() {
        let p = Prefix6::new("fd00:1701:dead:beef::1".parse().unwrap(), 32);
        assert_eq!(p, "fd00:1701::/32".parse().unwrap());
    }
}
