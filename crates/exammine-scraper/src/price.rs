use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;

static BRL_PRICE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"R\$\s*([\d.,]+)").expect("valid BRL price regex"));

/// Parses the first `R$ …` amount in a displayed price string.
///
/// Brazilian formatting is assumed: `.` groups thousands and `,` separates
/// cents. Text without a currency marker, or digits that do not form a number
/// once normalised, yield `None`.
#[must_use]
pub fn parse_price(text: &str) -> Option<Decimal> {
    let digits = BRL_PRICE.captures(text)?.get(1)?.as_str();
    let normalised = digits.replace('.', "").replace(',', ".");
    Decimal::from_str(&normalised).ok()
}

#[cfg(test)]
#[path = "price_test.rs"]
mod tests;
