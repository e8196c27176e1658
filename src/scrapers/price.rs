//! Price text parsing and plausibility checks.
//!
//! Listing pages mix European (`1.234,56 €`) and US (`1,234.56`) number
//! formats, and price-styled elements sometimes carry numbers that are not
//! prices at all (model codes, years). Parsing and validation are kept
//! separate so each can be tested on its own.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};

/// Lowest plausible price, in currency units.
pub const MIN_PRICE: Decimal = Decimal::from_parts(50, 0, 0, false, 0);
/// Highest plausible price, in currency units.
pub const MAX_PRICE: Decimal = Decimal::from_parts(5000, 0, 0, false, 0);
/// Above this a price needs a currency marker in its source text.
pub const UNMARKED_PRICE_LIMIT: Decimal = Decimal::from_parts(2000, 0, 0, false, 0);
/// Values in this range read like a model year.
const YEAR_RANGE: (Decimal, Decimal) = (
    Decimal::from_parts(2020, 0, 0, false, 0),
    Decimal::from_parts(2030, 0, 0, false, 0),
);

/// Currency symbols, or the words for euro / price (`cena`, `cene`).
static CURRENCY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\p{Sc}|\beur\b|euro|\bcen[aeio]?\b").unwrap());

/// Parse free-form price text into a positive decimal with two decimal places.
///
/// Everything except digits, commas and dots is dropped. When both
/// separators appear, the more frequent one is the thousands separator; on
/// a tie the separator that comes last is the decimal point. A lone comma
/// exactly three characters from the end is a decimal comma, other commas
/// are thousands separators. Several dots without a comma are thousands
/// separators, a single dot is a decimal point.
pub fn parse_price(text: &str) -> Option<Decimal> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();

    if !cleaned.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }

    let dots = cleaned.matches('.').count();
    let commas = cleaned.matches(',').count();

    let normalized = if dots > 0 && commas > 0 {
        let comma_is_decimal = match dots.cmp(&commas) {
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Less => false,
            std::cmp::Ordering::Equal => cleaned.rfind(',') > cleaned.rfind('.'),
        };
        if comma_is_decimal {
            cleaned.replace('.', "").replace(',', ".")
        } else {
            cleaned.replace(',', "")
        }
    } else if commas > 0 {
        let decimal_comma = cleaned
            .len()
            .checked_sub(3)
            .is_some_and(|idx| cleaned.rfind(',') == Some(idx));
        if commas == 1 && decimal_comma {
            cleaned.replace(',', ".")
        } else {
            cleaned.replace(',', "")
        }
    } else if dots > 1 {
        cleaned.replace('.', "")
    } else {
        cleaned
    };

    // Leading or trailing separators ("9.", ".5") are still numbers.
    let normalized = normalized.trim_end_matches('.');
    let normalized = if normalized.starts_with('.') {
        format!("0{normalized}")
    } else {
        normalized.to_string()
    };

    let value = Decimal::from_str(&normalized)
        .ok()?
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    if value > Decimal::ZERO {
        Some(value)
    } else {
        None
    }
}

/// Whether the source text carries a currency marker.
pub fn has_currency_marker(text: &str) -> bool {
    CURRENCY_RE.is_match(text)
}

/// Check a parsed price against the plausibility rules for the catalog.
///
/// Rejects values outside the retail range, values that look like a model
/// year, and large values whose source text has no currency marker (those
/// are usually model numbers).
pub fn is_valid_price(value: Decimal, original_text: &str) -> bool {
    if value < MIN_PRICE || value > MAX_PRICE {
        return false;
    }

    if value >= YEAR_RANGE.0 && value <= YEAR_RANGE.1 {
        return false;
    }

    if value > UNMARKED_PRICE_LIMIT && !has_currency_marker(original_text) {
        return false;
    }

    true
}
