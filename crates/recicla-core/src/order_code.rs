//! Human-readable order codes.
//!
//! Orders created on the device get a code `{prefix}-{n}` (e.g. `TR-7`)
//! from a per-prefix counter kept in the settings store. The code is the
//! order's natural key on the remote side, so line items pushed later can
//! find their parent order by code.

use crate::error::{CoreError, CoreResult};
use crate::validation::validate_order_prefix;

/// Prefix used when the settings store has none configured.
pub const DEFAULT_ORDER_PREFIX: &str = "PED";

/// Formats an order code.
pub fn format_order_code(prefix: &str, sequence: i64) -> String {
    format!("{prefix}-{sequence}")
}

/// Splits an order code back into prefix and sequence number.
///
/// ```rust
/// use recicla_core::order_code::parse_order_code;
///
/// assert_eq!(parse_order_code("TR-7").unwrap(), ("TR".to_string(), 7));
/// assert!(parse_order_code("TR7").is_err());
/// ```
pub fn parse_order_code(code: &str) -> CoreResult<(String, i64)> {
    let invalid = || CoreError::InvalidOrderCode(code.to_string());

    let (prefix, sequence) = code.rsplit_once('-').ok_or_else(invalid)?;
    validate_order_prefix(prefix).map_err(|_| invalid())?;

    let sequence: i64 = sequence.parse().map_err(|_| invalid())?;
    if sequence <= 0 {
        return Err(invalid());
    }

    Ok((prefix.to_string(), sequence))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_and_parse() {
        let code = format_order_code("TR", 12);
        assert_eq!(code, "TR-12");
        assert_eq!(parse_order_code(&code).unwrap(), ("TR".to_string(), 12));
    }

    #[test]
    fn test_rejects_bad_codes() {
        assert!(parse_order_code("").is_err());
        assert!(parse_order_code("TR-").is_err());
        assert!(parse_order_code("TR-0").is_err());
        assert!(parse_order_code("-5").is_err());
        assert!(parse_order_code("TR-abc").is_err());
    }
}
