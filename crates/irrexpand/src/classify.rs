//! Token classification and the ASN admission filter (C6, §4.6).
//!
//! Every token an `!i` response hands back is one of: a set name to recurse
//! into, an ASN to admit, the literal `ANY` (dropped), or something
//! unexpected (reported). This module makes that call, and separately
//! applies the admission rules (special-range/23456/32-bit filters) that
//! decide what `AsnBitset::add` actually receives.

use irrexpand_proto::parse_asn;

use crate::config::{ExpanderConfig, Generation};

/// AS_TRANS, RFC 5398 §3's placeholder for "no real 16-bit value fits".
pub const AS_TRANS: u32 = 23456;

/// Documentation and private 16-bit ASN range (RFC 5398 §3: `64496-64511`
/// and `64512-65534` reserved for documentation/private use, plus the
/// `65535` reserved ASN and the `64496..=65551` 32-bit-mapped documentation
/// block). Bounds match the literal range the historical tool filters by
/// default; see `DESIGN.md` for the adjacent off-by-one question this
/// resolves (a *different* comparison, on the 16-bit/32-bit admission
/// boundary, not this range).
const SPECIAL_RANGE: std::ops::RangeInclusive<u32> = 64496..=65551;

/// Start of the private 32-bit ASN range (RFC 6996).
const PRIVATE_32BIT_START: u32 = 4_200_000_000;

/// What a single response token, inspected by the expansion driver, turns
/// out to be.
pub enum Token {
    /// A set name (contains `-` or `:`) to recurse into.
    SetName(String),
    /// An ASN admitted under the run's filtering rules; `None` when the
    /// token parsed as an ASN but admission rejected it (silently, or by
    /// folding to [`AS_TRANS`]).
    Asn(Option<u32>),
    /// The literal `ANY`, dropped silently.
    Any,
    /// Anything else: not a set name, not a parseable ASN, not `ANY`.
    Unexpected,
}

/// Classifies a single whitespace-delimited response token.
pub fn classify(token: &str, config: &ExpanderConfig) -> Token {
    if token == "ANY" {
        return Token::Any;
    }
    if is_set_name(token) {
        return Token::SetName(token.to_string());
    }
    match parse_asn(token) {
        Ok(asn) => Token::Asn(admit(asn, config)),
        Err(_) => Token::Unexpected,
    }
}

/// A set name is any token containing `-` or `:` (`AS-FOO`, `rs:bar:baz`).
pub fn is_set_name(token: &str) -> bool {
    token.contains('-') || token.contains(':')
}

/// Applies the admission filter of §4.6 to an already-parsed ASN, returning
/// the ASN to record (possibly folded to [`AS_TRANS`]), or `None` if the ASN
/// is filtered out entirely.
///
/// The 16-bit-only fold is checked first and unconditionally: when
/// `asn32=false` and the run's generation is below `PrefixList`, any 32-bit
/// ASN becomes [`AS_TRANS`] without passing through the special-range or
/// `AS_TRANS` filters below, mirroring the original tool's branch structure
/// (the 32-bit-fold branch never reaches the filter checks at all).
pub fn admit(asn: u32, config: &ExpanderConfig) -> Option<u32> {
    if asn > 0xFFFF && !config.admits_32bit_asns() {
        log::debug!("folding 32-bit ASN {asn} to AS_TRANS sentinel ({AS_TRANS})");
        return Some(AS_TRANS);
    }
    if !config.expand_special_asn {
        if SPECIAL_RANGE.contains(&asn) {
            log::debug!("dropping ASN {asn}: in the special/documentation range");
            return None;
        }
        if asn >= PRIVATE_32BIT_START {
            log::debug!("dropping ASN {asn}: in the private 32-bit range");
            return None;
        }
    }
    if asn == AS_TRANS && !config.expand_as23456 {
        log::debug!("dropping ASN {asn}: AS_TRANS placeholder");
        return None;
    }
    Some(asn)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(asn32: bool, generation: Generation, expand_special: bool, expand_23456: bool) -> ExpanderConfig {
        ExpanderConfig {
            asn32,
            generation,
            expand_special_asn: expand_special,
            expand_as23456: expand_23456,
            ..ExpanderConfig::default()
        }
    }

    #[test]
    fn classifies_set_names_asns_any_and_unexpected() {
        let cfg = ExpanderConfig::default();
        assert!(matches!(classify("AS-FOO", &cfg), Token::SetName(n) if n == "AS-FOO"));
        assert!(matches!(classify("rs:bar", &cfg), Token::SetName(_)));
        assert!(matches!(classify("ANY", &cfg), Token::Any));
        assert!(matches!(classify("garbage", &cfg), Token::Unexpected));
    }

    #[test]
    fn filters_special_range_by_default() {
        let cfg = config(true, Generation::PrefixList, false, false);
        assert_eq!(admit(65000, &cfg), None);
        assert_eq!(admit(100, &cfg), Some(100));
    }

    #[test]
    fn special_range_upper_bound_is_65535_not_65536() {
        // Regression guard for the documented off-by-one decision.
        let cfg = config(true, Generation::PrefixList, false, false);
        assert_eq!(admit(65551, &cfg), None);
        assert_eq!(admit(65552, &cfg), Some(65552));
    }

    #[test]
    fn filters_private_32bit_range_by_default() {
        let cfg = config(true, Generation::PrefixList, false, false);
        assert_eq!(admit(4_200_000_001, &cfg), None);
    }

    #[test]
    fn expand_special_asn_disables_both_filters() {
        let cfg = config(true, Generation::PrefixList, true, false);
        assert_eq!(admit(65000, &cfg), Some(65000));
        assert_eq!(admit(4_200_000_001, &cfg), Some(4_200_000_001));
    }

    #[test]
    fn filters_as_trans_by_default() {
        let cfg = config(true, Generation::PrefixList, false, false);
        assert_eq!(admit(AS_TRANS, &cfg), None);
    }

    #[test]
    fn expand_as23456_admits_as_trans() {
        let cfg = config(true, Generation::PrefixList, false, true);
        assert_eq!(admit(AS_TRANS, &cfg), Some(AS_TRANS));
    }

    #[test]
    fn sixteen_bit_only_mode_folds_32bit_asns_to_as_trans() {
        let cfg = config(false, Generation::AsPath, true, true);
        assert_eq!(admit(4_294_967_200, &cfg), Some(AS_TRANS));
    }

    #[test]
    fn sixteen_bit_only_mode_folds_even_under_default_filters() {
        // S5: asn32=false, generation < PrefixList, and the *default*
        // filters active (expand_special_asn=false, expand_as23456=false).
        // The 32-bit fold must win unconditionally, even though this ASN
        // also falls in the private 32-bit range the special filter would
        // otherwise drop.
        let cfg = ExpanderConfig::default();
        assert_eq!(admit(4_294_967_200, &cfg), Some(AS_TRANS));
    }

    #[test]
    fn asn32_admits_32bit_asns_verbatim() {
        let cfg = config(true, Generation::AsPath, true, true);
        assert_eq!(admit(4_294_967_200, &cfg), Some(4_294_967_200));
    }

    #[test]
    fn prefix_list_generation_admits_32bit_asns_even_without_asn32() {
        let cfg = config(false, Generation::PrefixList, true, true);
        assert_eq!(admit(4_294_967_200, &cfg), Some(4_294_967_200));
    }
}
