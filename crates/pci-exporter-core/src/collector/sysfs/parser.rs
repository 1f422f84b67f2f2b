//! Parsers for PCI sysfs attribute files.
//!
//! These are pure functions that parse the content of device attribute files
//! into values. They are designed to be easily testable with string inputs.

/// Error type for parsing failures.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    /// The kernel wrote its `Unknown` placeholder instead of a value.
    pub unknown: bool,
}

impl ParseError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            unknown: false,
        }
    }

    fn unknown(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            unknown: true,
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

/// Placeholder sysfs reports for link attributes of untrained links.
const UNKNOWN_VALUE: &str = "Unknown";

/// Name shared by all region files; the bare name aggregates every region.
const REGION_PREFIX: &str = "resource";

/// Parses `current_link_speed`.
///
/// Format: leading transfer rate followed by a unit, e.g. `8.0 GT/s PCIe`
/// or `2.5 GT/s`. Devices without a trained link report `Unknown`.
pub fn parse_link_speed(content: &str) -> Result<f64, ParseError> {
    let content = content.trim_start();
    if content.trim_end() == UNKNOWN_VALUE {
        return Err(ParseError::unknown("link speed reported as Unknown"));
    }
    let end = content
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(content.len());
    let token = &content[..end];

    if token.is_empty() {
        return Err(ParseError::new(format!(
            "no leading number in link speed {:?}",
            content.trim_end()
        )));
    }

    token
        .parse()
        .map_err(|_| ParseError::new(format!("invalid link speed {:?}", token)))
}

/// Parses `current_link_width`.
///
/// Format: number of lanes as a decimal integer, e.g. `16`.
pub fn parse_link_width(content: &str) -> Result<f64, ParseError> {
    let trimmed = content.trim();
    trimmed
        .parse::<u32>()
        .map(f64::from)
        .map_err(|_| ParseError::new(format!("invalid link width {:?}", trimmed)))
}

/// Parses a hex attribute such as `revision`, `vendor` or `device`.
///
/// Format: `0x` followed by hex digits, e.g. `0x01` or `0x8086`.
/// Returns the digits without the marker, lowercased.
pub fn parse_hex_attribute(content: &str) -> Result<String, ParseError> {
    let trimmed = content.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ParseError::new(format!("invalid hex value {:?}", trimmed)));
    }

    Ok(digits.to_ascii_lowercase())
}

/// Returns true for per-region entries (`resource0`, `resource2_wc`, ...).
///
/// The bare `resource` file lists every region and is excluded, as are
/// unrelated names that merely share the prefix.
pub fn is_region_entry(name: &str) -> bool {
    name.strip_prefix(REGION_PREFIX)
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c.is_ascii_digit())
}
