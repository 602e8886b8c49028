//! Field transforms applied during reconciliation.
//!
//! Every transform is a deterministic string function: same input, same
//! output, no locale, no floating point. Money and percentages go through
//! integer arithmetic only.

use std::fmt;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors produced by field transforms. One failed field becomes one sync
/// warning for the owning party; it never aborts the merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    /// The input was empty after trimming.
    Empty { field: &'static str },
    /// The input could not be interpreted under the transform's rules.
    Unparseable { field: &'static str, raw: String },
    /// A numeric input carried more precision than the canonical form keeps.
    TooPrecise { field: &'static str, raw: String },
}

impl fmt::Display for TransformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformError::Empty { field } => write!(f, "field '{field}' is empty"),
            TransformError::Unparseable { field, raw } => {
                write!(f, "field '{field}' could not be parsed: '{raw}'")
            }
            TransformError::TooPrecise { field, raw } => {
                write!(f, "field '{field}' carries unsupported precision: '{raw}'")
            }
        }
    }
}

impl std::error::Error for TransformError {}

// ---------------------------------------------------------------------------
// Identifier transforms
// ---------------------------------------------------------------------------

/// Canonicalize a tax identifier: separators out, alphanumerics kept,
/// letters uppercased. "123-45-6789" becomes "123456789"; a foreign TIN like
/// "gb ab-123456-c" becomes "GBAB123456C".
pub fn tax_id_digits(raw: &str, field: &'static str) -> Result<String, TransformError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TransformError::Empty { field });
    }
    let mut out = String::with_capacity(trimmed.len());
    for c in trimmed.chars() {
        match c {
            '0'..='9' => out.push(c),
            'a'..='z' => out.push(c.to_ascii_uppercase()),
            'A'..='Z' => out.push(c),
            ' ' | '-' | '.' | '/' | '(' | ')' => {}
            _ => {
                return Err(TransformError::Unparseable {
                    field,
                    raw: raw.to_string(),
                })
            }
        }
    }
    if out.is_empty() {
        return Err(TransformError::Unparseable {
            field,
            raw: raw.to_string(),
        });
    }
    Ok(out)
}

/// Reduce a phone number to its digits. "+1 (212) 555-0100" becomes
/// "12125550100". Extensions are not preserved.
pub fn phone_digits(raw: &str, field: &'static str) -> Result<String, TransformError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TransformError::Empty { field });
    }
    let out: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    if out.is_empty() {
        return Err(TransformError::Unparseable {
            field,
            raw: raw.to_string(),
        });
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Country mapping
// ---------------------------------------------------------------------------

/// Common free-text spellings to ISO 3166-1 alpha-2. Closed table: an
/// unknown spelling returns `None` and the caller decides (the merge keeps
/// the raw value and records a warning rather than inventing a code).
const COUNTRY_TABLE: &[(&str, &str)] = &[
    ("united states", "US"),
    ("united states of america", "US"),
    ("usa", "US"),
    ("u.s.", "US"),
    ("u.s.a.", "US"),
    ("america", "US"),
    ("canada", "CA"),
    ("mexico", "MX"),
    ("united kingdom", "GB"),
    ("uk", "GB"),
    ("great britain", "GB"),
    ("england", "GB"),
    ("germany", "DE"),
    ("france", "FR"),
    ("spain", "ES"),
    ("italy", "IT"),
    ("china", "CN"),
    ("japan", "JP"),
    ("india", "IN"),
    ("brazil", "BR"),
    ("australia", "AU"),
    ("singapore", "SG"),
    ("hong kong", "HK"),
    ("switzerland", "CH"),
    ("united arab emirates", "AE"),
    ("cayman islands", "KY"),
    ("british virgin islands", "VG"),
    ("panama", "PA"),
];

/// Map a country as submitted to an alpha-2 code. Inputs that already look
/// like a code (two ASCII letters) pass through uppercased.
pub fn country_code(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.len() == 2 && trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        return Some(trimmed.to_ascii_uppercase());
    }
    let lowered = trimmed.to_ascii_lowercase();
    COUNTRY_TABLE
        .iter()
        .find(|(name, _)| *name == lowered)
        .map(|(_, code)| (*code).to_string())
}

// ---------------------------------------------------------------------------
// Date canonicalization
// ---------------------------------------------------------------------------

/// Reformat a date to YYYY-MM-DD. Accepts YYYY-MM-DD and MM/DD/YYYY; both
/// reject impossible dates.
pub fn canonical_date(raw: &str, field: &'static str) -> Result<String, TransformError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TransformError::Empty { field });
    }
    for fmt in ["%Y-%m-%d", "%m/%d/%Y"] {
        if let Ok(d) = chrono::NaiveDate::parse_from_str(trimmed, fmt) {
            return Ok(d.format("%Y-%m-%d").to_string());
        }
    }
    Err(TransformError::Unparseable {
        field,
        raw: raw.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Money and percentages (integer arithmetic only)
// ---------------------------------------------------------------------------

/// Canonicalize a money amount to a fixed two-decimal string with no
/// grouping: "$425,000.5" becomes "425000.50". At most two decimal places
/// are accepted; negative amounts are rejected.
pub fn money_canonical(raw: &str, field: &'static str) -> Result<String, TransformError> {
    let cents = money_to_cents(raw, field)?;
    Ok(format!("{}.{:02}", cents / 100, cents % 100))
}

/// Parse a money string into non-negative integer cents.
pub fn money_to_cents(raw: &str, field: &'static str) -> Result<i64, TransformError> {
    let trimmed = raw.trim().trim_start_matches('$').trim();
    if trimmed.is_empty() {
        return Err(TransformError::Empty { field });
    }
    let cleaned: String = trimmed.chars().filter(|c| *c != ',').collect();
    let (whole, frac) = match cleaned.split_once('.') {
        None => (cleaned.as_str(), ""),
        Some((w, f)) => (w, f),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(TransformError::Unparseable {
            field,
            raw: raw.to_string(),
        });
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(TransformError::Unparseable {
            field,
            raw: raw.to_string(),
        });
    }
    if frac.len() > 2 {
        return Err(TransformError::TooPrecise {
            field,
            raw: raw.to_string(),
        });
    }

    let mut cents: i64 = 0;
    for c in whole.chars() {
        let digit = (c as u8 - b'0') as i64;
        cents = cents
            .checked_mul(10)
            .and_then(|v| v.checked_add(digit))
            .ok_or_else(|| TransformError::Unparseable {
                field,
                raw: raw.to_string(),
            })?;
    }
    cents = cents
        .checked_mul(100)
        .ok_or_else(|| TransformError::Unparseable {
            field,
            raw: raw.to_string(),
        })?;

    let frac_cents = match frac.len() {
        0 => 0,
        1 => (frac.as_bytes()[0] - b'0') as i64 * 10,
        _ => (frac.as_bytes()[0] - b'0') as i64 * 10 + (frac.as_bytes()[1] - b'0') as i64,
    };
    cents
        .checked_add(frac_cents)
        .ok_or_else(|| TransformError::Unparseable {
            field,
            raw: raw.to_string(),
        })
}

/// Canonicalize an ownership percentage to one decimal place: "60" and
/// "60%" become "60.0". More than one decimal place is rejected rather than
/// rounded; values above 100 are rejected.
pub fn ownership_percent(raw: &str, field: &'static str) -> Result<String, TransformError> {
    let trimmed = raw.trim().trim_end_matches('%').trim();
    if trimmed.is_empty() {
        return Err(TransformError::Empty { field });
    }
    let (whole, frac) = match trimmed.split_once('.') {
        None => (trimmed, ""),
        Some((w, f)) => (w, f),
    };
    if whole.is_empty()
        || !whole.chars().all(|c| c.is_ascii_digit())
        || !frac.chars().all(|c| c.is_ascii_digit())
    {
        return Err(TransformError::Unparseable {
            field,
            raw: raw.to_string(),
        });
    }
    if frac.len() > 1 {
        return Err(TransformError::TooPrecise {
            field,
            raw: raw.to_string(),
        });
    }
    let tenths: i64 = whole
        .parse::<i64>()
        .map_err(|_| TransformError::Unparseable {
            field,
            raw: raw.to_string(),
        })?
        * 10
        + frac.parse::<i64>().unwrap_or(0);
    if tenths > 1000 {
        return Err(TransformError::Unparseable {
            field,
            raw: raw.to_string(),
        });
    }
    Ok(format!("{}.{}", tenths / 10, tenths % 10))
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- tax_id_digits ------------------------------------------------------

    #[test]
    fn tax_id_strips_separators() {
        assert_eq!(tax_id_digits("123-45-6789", "taxId").unwrap(), "123456789");
        assert_eq!(tax_id_digits(" 12.3456789 ", "taxId").unwrap(), "123456789");
        assert_eq!(tax_id_digits("12-3456789", "taxId").unwrap(), "123456789");
    }

    #[test]
    fn tax_id_keeps_foreign_letters_uppercased() {
        assert_eq!(
            tax_id_digits("gb ab-123456-c", "taxId").unwrap(),
            "GBAB123456C"
        );
    }

    #[test]
    fn tax_id_already_canonical_is_unchanged() {
        assert_eq!(tax_id_digits("123456789", "taxId").unwrap(), "123456789");
    }

    #[test]
    fn tax_id_rejects_empty_and_symbols() {
        assert_eq!(
            tax_id_digits("  ", "taxId"),
            Err(TransformError::Empty { field: "taxId" })
        );
        assert!(matches!(
            tax_id_digits("---", "taxId"),
            Err(TransformError::Unparseable { .. })
        ));
        assert!(matches!(
            tax_id_digits("123#456", "taxId"),
            Err(TransformError::Unparseable { .. })
        ));
    }

    // -- phone_digits -------------------------------------------------------

    #[test]
    fn phone_reduces_to_digits() {
        assert_eq!(
            phone_digits("+1 (212) 555-0100", "phone").unwrap(),
            "12125550100"
        );
        assert_eq!(phone_digits("212.555.0100", "phone").unwrap(), "2125550100");
    }

    #[test]
    fn phone_rejects_no_digits() {
        assert!(matches!(
            phone_digits("call me", "phone"),
            Err(TransformError::Unparseable { .. })
        ));
    }

    // -- country_code -------------------------------------------------------

    #[test]
    fn country_maps_common_spellings() {
        assert_eq!(country_code("United States").as_deref(), Some("US"));
        assert_eq!(country_code("USA").as_deref(), Some("US"));
        assert_eq!(country_code("u.s.").as_deref(), Some("US"));
        assert_eq!(country_code("United Kingdom").as_deref(), Some("GB"));
        assert_eq!(country_code("Cayman Islands").as_deref(), Some("KY"));
    }

    #[test]
    fn country_passes_codes_through() {
        assert_eq!(country_code("us").as_deref(), Some("US"));
        assert_eq!(country_code("DE").as_deref(), Some("DE"));
    }

    #[test]
    fn country_unknown_spelling_is_none() {
        assert_eq!(country_code("Freedonia"), None);
    }

    // -- canonical_date -----------------------------------------------------

    #[test]
    fn date_accepts_both_input_formats() {
        assert_eq!(canonical_date("1985-03-09", "dob").unwrap(), "1985-03-09");
        assert_eq!(canonical_date("03/09/1985", "dob").unwrap(), "1985-03-09");
    }

    #[test]
    fn date_rejects_impossible_and_unknown_formats() {
        assert!(matches!(
            canonical_date("02/30/1985", "dob"),
            Err(TransformError::Unparseable { .. })
        ));
        assert!(matches!(
            canonical_date("9 March 1985", "dob"),
            Err(TransformError::Unparseable { .. })
        ));
    }

    // -- money --------------------------------------------------------------

    #[test]
    fn money_canonical_two_decimals_no_grouping() {
        assert_eq!(money_canonical("425000", "amount").unwrap(), "425000.00");
        assert_eq!(
            money_canonical("$425,000.5", "amount").unwrap(),
            "425000.50"
        );
        assert_eq!(money_canonical("0.05", "amount").unwrap(), "0.05");
    }

    #[test]
    fn money_to_cents_is_exact() {
        assert_eq!(money_to_cents("425,000.00", "amount").unwrap(), 42_500_000);
        assert_eq!(money_to_cents("$1.07", "amount").unwrap(), 107);
    }

    #[test]
    fn money_rejects_precision_and_negatives() {
        assert!(matches!(
            money_to_cents("1.005", "amount"),
            Err(TransformError::TooPrecise { .. })
        ));
        assert!(matches!(
            money_to_cents("-5", "amount"),
            Err(TransformError::Unparseable { .. })
        ));
    }

    // -- ownership_percent --------------------------------------------------

    #[test]
    fn percent_canonical_one_decimal() {
        assert_eq!(ownership_percent("60", "pct").unwrap(), "60.0");
        assert_eq!(ownership_percent("60%", "pct").unwrap(), "60.0");
        assert_eq!(ownership_percent("40.0", "pct").unwrap(), "40.0");
        assert_eq!(ownership_percent("12.5", "pct").unwrap(), "12.5");
        assert_eq!(ownership_percent("100", "pct").unwrap(), "100.0");
    }

    #[test]
    fn percent_rejects_excess_precision_and_range() {
        assert!(matches!(
            ownership_percent("33.33", "pct"),
            Err(TransformError::TooPrecise { .. })
        ));
        assert!(matches!(
            ownership_percent("101", "pct"),
            Err(TransformError::Unparseable { .. })
        ));
        assert!(matches!(
            ownership_percent("sixty", "pct"),
            Err(TransformError::Unparseable { .. })
        ));
    }
}
