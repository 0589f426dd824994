//! Routes parsed prefixes into the primary/secondary [`PrefixTree`]s,
//! honoring family matching and an optional maximum prefix length.

use std::net::IpAddr;

use ipnet::IpNet;

use crate::error::RadixError;
use crate::trie::PrefixTree;

/// Which address family a run is primarily collecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    V4,
    V6,
}

impl Family {
    fn of(net: &IpNet) -> Self {
        match net {
            IpNet::V4(_) => Family::V4,
            IpNet::V6(_) => Family::V6,
        }
    }
}

/// Accepts prefix text from protocol responses and files it into the right
/// tree. The secondary tree, when present, always holds IPv6 — mirroring
/// the common case of a primary IPv4 run that also wants a dual-stack
/// prefix set out of the same expansion.
pub struct PrefixSink {
    primary_family: Family,
    primary: Box<dyn PrefixTree>,
    secondary: Option<Box<dyn PrefixTree>>,
    maxlen: Option<u8>,
}

impl PrefixSink {
    pub fn new(
        primary_family: Family,
        primary: Box<dyn PrefixTree>,
        secondary: Option<Box<dyn PrefixTree>>,
        maxlen: Option<u8>,
    ) -> Self {
        Self {
            primary_family,
            primary,
            secondary,
            maxlen,
        }
    }

    pub fn primary(&self) -> &dyn PrefixTree {
        self.primary.as_ref()
    }

    pub fn secondary(&self) -> Option<&dyn PrefixTree> {
        self.secondary.as_deref()
    }

    /// Parses a bare `addr/len` prefix and inserts it.
    pub fn add_prefix(&mut self, text: &str) -> Result<(), RadixError> {
        let net: IpNet = text
            .trim()
            .parse()
            .map_err(|_| RadixError::ParsePrefix(text.to_string()))?;
        self.insert_net(net);
        Ok(())
    }

    /// Parses `addr/len^spec`, where `spec` is `len` or `min-max`, and
    /// inserts every sub-prefix of every length in range.
    pub fn add_prefix_range(&mut self, text: &str) -> Result<(), RadixError> {
        let (head, range) = text
            .trim()
            .split_once('^')
            .ok_or_else(|| RadixError::ParseRange(text.to_string()))?;
        let base: IpNet = head
            .trim()
            .parse()
            .map_err(|_| RadixError::ParsePrefix(head.to_string()))?;
        let (min, max) = parse_range(range, base.prefix_len(), base.max_prefix_len())?;
        for len in min..=max {
            let subnets = base
                .subnets(len)
                .map_err(|_| RadixError::ParseRange(text.to_string()))?;
            for subnet in subnets {
                self.insert_net(subnet);
            }
        }
        Ok(())
    }

    fn insert_net(&mut self, net: IpNet) {
        let family = Family::of(&net);
        let prefix_len = net.prefix_len();
        let bits = addr_bits(net.network());
        if family == self.primary_family {
            if let Some(maxlen) = self.maxlen {
                if prefix_len > maxlen {
                    log::debug!("dropping {net} past configured maxlen {maxlen}");
                    return;
                }
            }
            self.primary.insert(bits, prefix_len);
        } else if family == Family::V6 {
            match &mut self.secondary {
                Some(secondary) => secondary.insert(bits, prefix_len),
                None => log::debug!("dropping {net}: no secondary tree for IPv6"),
            }
        } else {
            log::debug!("dropping {net}: family does not match primary {:?}", self.primary_family);
        }
    }
}

fn parse_range(range: &str, base_len: u8, max_len: u8) -> Result<(u8, u8), RadixError> {
    let invalid = || RadixError::ParseRange(range.to_string());
    if let Some((lo, hi)) = range.split_once('-') {
        let min: u8 = lo.parse().map_err(|_| invalid())?;
        let max: u8 = hi.parse().map_err(|_| invalid())?;
        if min < base_len || max > max_len || min > max {
            return Err(invalid());
        }
        Ok((min, max))
    } else {
        let len: u8 = range.parse().map_err(|_| invalid())?;
        if len < base_len || len > max_len {
            return Err(invalid());
        }
        Ok((len, len))
    }
}

fn addr_bits(addr: IpAddr) -> u128 {
    match addr {
        IpAddr::V4(v4) => (u32::from(v4) as u128) << 96,
        IpAddr::V6(v6) => u128::from(v6),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trie::RadixTrie;

    fn sink(family: Family, secondary: bool, maxlen: Option<u8>) -> PrefixSink {
        PrefixSink::new(
            family,
            Box::new(RadixTrie::new()),
            secondary.then(|| Box::new(RadixTrie::new()) as Box<dyn PrefixTree>),
            maxlen,
        )
    }

    #[test]
    fn inserts_matching_family_into_primary() {
        let mut s = sink(Family::V4, false, None);
        s.add_prefix("192.0.2.0/24").unwrap();
        assert_eq!(s.primary().len(), 1);
    }

    #[test]
    fn routes_ipv6_into_secondary_when_present() {
        let mut s = sink(Family::V4, true, None);
        s.add_prefix("2001:db8::/32").unwrap();
        assert_eq!(s.primary().len(), 0);
        assert_eq!(s.secondary().unwrap().len(), 1);
    }

    #[test]
    fn drops_ipv6_without_secondary() {
        let mut s = sink(Family::V4, false, None);
        s.add_prefix("2001:db8::/32").unwrap();
        assert_eq!(s.primary().len(), 0);
    }

    #[test]
    fn drops_mismatched_v4_when_primary_is_v6() {
        let mut s = sink(Family::V6, false, None);
        s.add_prefix("192.0.2.0/24").unwrap();
        assert_eq!(s.primary().len(), 0);
    }

    #[test]
    fn drops_prefix_past_maxlen() {
        let mut s = sink(Family::V4, false, Some(23));
        s.add_prefix("192.0.2.0/24").unwrap();
        assert_eq!(s.primary().len(), 0);
    }

    #[test]
    fn maxlen_does_not_gate_secondary_tree() {
        let mut s = sink(Family::V4, true, Some(8));
        s.add_prefix("2001:db8::/32").unwrap();
        assert_eq!(s.secondary().unwrap().len(), 1);
    }

    #[test]
    fn expands_single_length_range() {
        let mut s = sink(Family::V4, false, None);
        s.add_prefix_range("192.0.2.0/23^24").unwrap();
        assert_eq!(s.primary().len(), 2);
    }

    #[test]
    fn expands_min_max_range() {
        let mut s = sink(Family::V4, false, None);
        s.add_prefix_range("192.0.0.0/22^23-24").unwrap();
        // 2 /23s + 4 /24s
        assert_eq!(s.primary().len(), 6);
    }

    #[test]
    fn rejects_range_shorter_than_base() {
        let mut s = sink(Family::V4, false, None);
        assert!(s.add_prefix_range("192.0.2.0/24^16").is_err());
    }

    #[test]
    fn rejects_malformed_prefix() {
        let mut s = sink(Family::V4, false, None);
        assert!(s.add_prefix("not-a-prefix").is_err());
    }
}
