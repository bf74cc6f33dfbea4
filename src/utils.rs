//! # Utility Functions Module
//!
//! Helpers for the configuration surface: human-readable size strings
//! accepted by the `--min-size` / `--max-size` filters.

use crate::error::TranscodeError;

const KIB: f64 = 1024.0;

/// Parses a human size string into a byte count.
///
/// Accepts a plain number of bytes or a number followed by one of the
/// suffixes `B`, `K`/`KB`, `M`/`MB`, `G`/`GB` (case-insensitive, optional
/// whitespace before the suffix). Multiples are binary, so `1KB` is 1024
/// bytes. Fractional values such as `1.5MB` are rounded down to whole bytes.
///
/// # Example
/// ```rust
/// use image_transcoder::utils::parse_size;
///
/// assert_eq!(parse_size("512").unwrap(), 512);
/// assert_eq!(parse_size("10KB").unwrap(), 10 * 1024);
/// assert_eq!(parse_size("1.5 m").unwrap(), 1_572_864);
/// ```
pub fn parse_size(input: &str) -> Result<u64, TranscodeError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(TranscodeError::InvalidSize("empty size string".to_string()));
    }

    let split = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(trimmed.len());
    let (number, suffix) = trimmed.split_at(split);

    let value: f64 = number
        .parse()
        .map_err(|_| TranscodeError::InvalidSize(format!("'{}' has no numeric part", input)))?;

    let multiplier = match suffix.trim().to_ascii_uppercase().as_str() {
        "" | "B" => 1.0,
        "K" | "KB" => KIB,
        "M" | "MB" => KIB * KIB,
        "G" | "GB" => KIB * KIB * KIB,
        other => {
            return Err(TranscodeError::InvalidSize(format!(
                "unknown unit '{}' in '{}' (expected B, K, KB, M, MB, G or GB)",
                other, input
            )))
        }
    };

    Ok((value * multiplier) as u64)
}
