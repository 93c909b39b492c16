//! Parses the admin console's `newuser <quota>` argument: a decimal
//! number followed by a byte-unit suffix.

const MAX_QUOTA_BYTES: f64 = 9_007_199_254_740_992.0; // 2^53

fn unit_multiplier(unit: &str) -> Option<f64> {
    Some(match unit {
        "b" => 1.0,
        "kb" => 1_000.0,
        "kib" => 1024.0,
        "mb" => 1_000.0_f64.powi(2),
        "mib" => 1024.0_f64.powi(2),
        "gb" => 1_000.0_f64.powi(3),
        "gib" => 1024.0_f64.powi(3),
        "tb" => 1_000.0_f64.powi(4),
        "tib" => 1024.0_f64.powi(4),
        "pb" => 1_000.0_f64.powi(5),
        "pib" => 1024.0_f64.powi(5),
        _ => return None,
    })
}

/// Parse a quota like `"10GB"`, `"2.5 TiB"`, or `"512mib"` into bytes.
/// Rejects anything that doesn't fit in `[0, 2^53]`.
pub fn parse_quota_bytes(input: &str) -> Result<u64, String> {
    let trimmed = input.trim();
    let split_at = trimmed
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .ok_or_else(|| "missing unit suffix".to_string())?;
    let (number_part, unit_part) = trimmed.split_at(split_at);
    let number: f64 = number_part
        .parse()
        .map_err(|_| format!("not a number: {number_part}"))?;
    let unit = unit_part.trim().to_ascii_lowercase();
    let multiplier = unit_multiplier(&unit).ok_or_else(|| format!("unknown unit: {unit}"))?;

    let bytes = number * multiplier;
    if !(0.0..=MAX_QUOTA_BYTES).contains(&bytes) {
        return Err(format!("quota out of range: max is {MAX_QUOTA_BYTES} bytes"));
    }
    Ok(bytes as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_whole_gigabytes() {
        assert_eq!(parse_quota_bytes("10GB").unwrap(), 10_000_000_000);
    }

    #[test]
    fn parses_binary_units_and_decimals() {
        assert_eq!(parse_quota_bytes("2.5GiB").unwrap(), (2.5 * 1024.0_f64.powi(3)) as u64);
    }

    #[test]
    fn is_case_insensitive_and_tolerates_spaces() {
        assert_eq!(parse_quota_bytes("1 TiB").unwrap(), parse_quota_bytes("1tib").unwrap());
    }

    #[test]
    fn rejects_unknown_unit() {
        assert!(parse_quota_bytes("5xb").is_err());
    }

    #[test]
    fn rejects_over_max() {
        assert!(parse_quota_bytes("100PiB").is_err());
    }
}
