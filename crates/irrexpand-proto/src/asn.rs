//! Parses the two textual ASN forms an IRRd server returns in `!i` payload
//! tokens: plain decimal (`AS65000`) and dotted `high.low` (`AS1.100`), per
//! the `Dotted ASN` glossary entry.

use crate::error::ProtoError;

/// Parses an `AS<digits>` or `AS<digits>.<digits>` token into its 32-bit
/// numeric value. The `AS`/`as` prefix is required and case-insensitive.
///
/// For the dotted form, both halves must fit in 16 bits; the result is
/// `high * 65536 + low`, matching the textual convention used by IRRd's
/// `32bit-asn` extension.
pub fn parse_asn(token: &str) -> Result<u32, ProtoError> {
    let invalid = || ProtoError::InvalidAsn(token.to_string());
    if !token.get(..2).is_some_and(|p| p.eq_ignore_ascii_case("AS")) {
        return Err(invalid());
    }
    let digits = &token[2..];

    if let Some((high, low)) = digits.split_once('.') {
        let high: u32 = high.parse().map_err(|_| invalid())?;
        let low: u32 = low.parse().map_err(|_| invalid())?;
        if high > 0xFFFF || low > 0xFFFF {
            return Err(invalid());
        }
        Ok(high * 65536 + low)
    } else {
        digits.parse().map_err(|_| invalid())
    }
}
