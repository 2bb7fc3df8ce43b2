use thiserror::Error;

/// Port specification used when the caller does not provide one.
pub const DEFAULT_PORT_SPEC: &str = "1-1000";

const MIN_PORT: i64 = 1;
const MAX_PORT: i64 = 65535;

/// Reasons a port specification can be rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A single-port token is not an integer in 1..=65535.
    #[error("invalid port number: {token} (expected 1-65535)")]
    InvalidPort { token: String },

    /// A range side is not an integer, or the range is not `start-end`.
    #[error("invalid bound '{bound}' in port range: {token}")]
    InvalidRangeBound { token: String, bound: String },

    /// A range whose start is greater than its end.
    #[error("start port cannot be greater than end port in range: {token} ({start} > {end})")]
    InvalidRangeOrder { token: String, start: i64, end: i64 },
}

/// Resolve a port specification into the ordered list of ports to scan.
///
/// Supported tokens, separated by commas:
/// - single port: `80`
/// - inclusive range: `20-25`
///
/// Whitespace around tokens and around the hyphen is ignored and empty tokens
/// are skipped. The first malformed token aborts the parse.
///
/// Single ports outside 1..=65535 are rejected, while range expansion drops
/// out-of-range values silently. Overlapping tokens are not deduplicated.
pub fn resolve(spec: &str) -> Result<Vec<u16>, ParseError> {
    let mut out: Vec<u16> = Vec::new();

    for raw in spec.split(',') {
        let token = raw.trim();
        if token.is_empty() {
            continue;
        }

        if let Some((a, b)) = token.split_once('-') {
            let start = parse_bound(token, a)?;
            let end = parse_bound(token, b)?;
            if start > end {
                return Err(ParseError::InvalidRangeOrder {
                    token: token.to_string(),
                    start,
                    end,
                });
            }
            // Only the part of the range inside 1..=65535 survives.
            let lo = start.max(MIN_PORT);
            let hi = end.min(MAX_PORT);
            if lo <= hi {
                out.extend((lo..=hi).map(|p| p as u16));
            }
            continue;
        }

        out.push(parse_single(token)?);
    }

    Ok(out)
}

fn parse_single(token: &str) -> Result<u16, ParseError> {
    let invalid = || ParseError::InvalidPort {
        token: token.to_string(),
    };
    let val: i64 = token.parse().map_err(|_| invalid())?;
    if !(MIN_PORT..=MAX_PORT).contains(&val) {
        return Err(invalid());
    }
    Ok(val as u16)
}

// A second hyphen lands in `bound` and fails the integer parse.
fn parse_bound(token: &str, bound: &str) -> Result<i64, ParseError> {
    let bound = bound.trim();
    bound.parse::<i64>().map_err(|_| ParseError::InvalidRangeBound {
        token: token.to_string(),
        bound: bound.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_single_ports() {
        assert_eq!(resolve("80").unwrap(), vec![80]);
        assert_eq!(resolve("22,80,443").unwrap(), vec![22, 80, 443]);
    }

    #[test]
    fn parse_ranges_and_lists() {
        assert_eq!(resolve("20-22").unwrap(), vec![20, 21, 22]);
        assert_eq!(resolve("22,100-102").unwrap(), vec![22, 100, 101, 102]);
    }

    #[test]
    fn whitespace_is_ignored() {
        let ports = resolve("  22 , 8000 - 8002 ,443 ").unwrap();
        assert_eq!(ports, vec![22, 8000, 8001, 8002, 443]);
    }

    #[test]
    fn range_expansion_drops_out_of_range_values() {
        assert_eq!(resolve("0-5").unwrap(), vec![1, 2, 3, 4, 5]);
        assert_eq!(resolve("65534-70000").unwrap(), vec![65534, 65535]);
        assert!(resolve("70000-70010").unwrap().is_empty());
    }

    #[test]
    fn duplicates_are_kept() {
        assert_eq!(resolve("80,79-81,80").unwrap(), vec![80, 79, 80, 81, 80]);
    }

    #[test]
    fn empty_spec_is_not_an_error() {
        assert!(resolve("").unwrap().is_empty());
        assert!(resolve(" , ,").unwrap().is_empty());
        assert_eq!(resolve("80,,443").unwrap(), vec![80, 443]);
    }

    #[test]
    fn invalid_single_ports() {
        for bad in ["0", "70000", "http", "8O", "99999999999999999999"] {
            assert!(
                matches!(resolve(bad), Err(ParseError::InvalidPort { .. })),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn invalid_range_bounds() {
        let err = resolve("a-5").unwrap_err();
        assert_eq!(
            err,
            ParseError::InvalidRangeBound {
                token: "a-5".into(),
                bound: "a".into()
            }
        );
        assert!(matches!(
            resolve("1-2-3"),
            Err(ParseError::InvalidRangeBound { .. })
        ));
        assert!(matches!(resolve("-5"), Err(ParseError::InvalidRangeBound { .. })));
    }

    #[test]
    fn reversed_range_is_rejected() {
        let err = resolve("10-5").unwrap_err();
        assert!(matches!(
            err,
            ParseError::InvalidRangeOrder { start: 10, end: 5, .. }
        ));
        assert!(err.to_string().contains("10-5"));
    }

    #[test]
    fn first_bad_token_aborts_everything() {
        assert!(resolve("22,80,0,443").is_err());
        assert!(resolve("22,10-5,443").is_err());
    }
}
