use lcm_models::{Cell, Currency, Money};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Cell contents that mean "no price" rather than a malformed one
const SENTINELS: &[&str] = &[
    "n/a", "na", "n.a.", "tbd", "tba", "-", "--", "none", "poa", "on request", "included",
];

static CURRENCY_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(USD|EUR|GBP)\b").expect("currency code pattern"));

/// Parses loosely formatted price cells into [`Money`].
///
/// Accepts `1234.56`, `1,234.56`, `1.234,56`, `$ 1 234`, `1234.56 USD` and
/// numeric cells. Anything that is not a positive amount yields `None`.
#[derive(Debug, Clone)]
pub struct PriceExtractor {
    default_currency: Currency,
}

impl Default for PriceExtractor {
    fn default() -> Self {
        Self::new(Currency::Usd)
    }
}

impl PriceExtractor {
    pub fn new(default_currency: Currency) -> Self {
        Self { default_currency }
    }

    /// `column_currency` is the currency implied by the column header, used
    /// when the cell itself carries no symbol or code.
    pub fn extract(&self, cell: &Cell, column_currency: Option<Currency>) -> Option<Money> {
        match cell {
            Cell::Empty => None,
            Cell::Number(n) => {
                let amount = Decimal::from_f64(*n)?.round_dp(4);
                positive(amount, column_currency.unwrap_or(self.default_currency))
            }
            Cell::Text(text) => self.parse(text, column_currency),
        }
    }

    pub fn parse(&self, raw: &str, column_currency: Option<Currency>) -> Option<Money> {
        let text = raw.trim();
        if text.is_empty() {
            return None;
        }

        let lower = text.to_lowercase();
        if SENTINELS.contains(&lower.as_str()) || lower.contains("contact") || lower.contains("tbd") {
            return None;
        }

        let (currency, remainder) = split_currency(text);
        let number = normalize_separators(&remainder)?;
        let amount = Decimal::from_str(&number).ok()?;

        positive(
            amount,
            currency.or(column_currency).unwrap_or(self.default_currency),
        )
    }
}

fn positive(amount: Decimal, currency: Currency) -> Option<Money> {
    if amount > Decimal::ZERO {
        Some(Money::new(amount, currency))
    } else {
        None
    }
}

/// Removes currency markers and whitespace, returning the first currency seen
fn split_currency(text: &str) -> (Option<Currency>, String) {
    let mut currency = CURRENCY_CODE
        .captures(text)
        .and_then(|caps| Currency::from_code(&caps[1]));
    let remainder = CURRENCY_CODE.replace_all(text, "");

    let mut cleaned = String::with_capacity(remainder.len());
    for ch in remainder.chars() {
        if let Some(symbol_currency) = Currency::from_symbol(ch) {
            currency.get_or_insert(symbol_currency);
        } else if !ch.is_whitespace() && ch != '\'' {
            cleaned.push(ch);
        }
    }

    (currency, cleaned)
}

/// Rewrites thousands/decimal separators into a plain `1234.56` form.
///
/// When both `,` and `.` appear the rightmost one is the decimal separator.
/// A lone comma followed by one or two digits is decimal, otherwise commas
/// group thousands. Several dots without a comma group thousands.
fn normalize_separators(text: &str) -> Option<String> {
    if text.is_empty()
        || !text
            .chars()
            .all(|c| c.is_ascii_digit() || c == '.' || c == ',' || c == '-')
        || !text.chars().any(|c| c.is_ascii_digit())
    {
        return None;
    }

    let last_comma = text.rfind(',');
    let last_dot = text.rfind('.');

    let normalized = match (last_comma, last_dot) {
        (Some(comma), Some(dot)) if comma > dot => text.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => text.replace(',', ""),
        (Some(comma), None) => {
            let decimals = text.len() - comma - 1;
            if text.matches(',').count() == 1 && (1..=2).contains(&decimals) {
                text.replace(',', ".")
            } else {
                text.replace(',', "")
            }
        }
        (None, Some(_)) if text.matches('.').count() > 1 => text.replace('.', ""),
        _ => text.to_string(),
    };

    Some(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usd(s: &str) -> Option<Money> {
        Some(Money::usd(Decimal::from_str(s).unwrap()))
    }

    #[test]
    fn test_separator_conventions() {
        let extractor = PriceExtractor::default();
        assert_eq!(extractor.parse("1234.56", None), usd("1234.56"));
        assert_eq!(extractor.parse("1,234.56", None), usd("1234.56"));
        assert_eq!(extractor.parse("1.234,56", None), usd("1234.56"));
        assert_eq!(extractor.parse("1234,56", None), usd("1234.56"));
        assert_eq!(extractor.parse("1,234", None), usd("1234"));
        assert_eq!(extractor.parse("1.234.567", None), usd("1234567"));
        assert_eq!(extractor.parse("1 234 567,5", None), usd("1234567.5"));
    }

    #[test]
    fn test_currency_markers() {
        let extractor = PriceExtractor::default();
        assert_eq!(
            extractor.parse("€ 1.999,00", None),
            Some(Money::eur(Decimal::from(1999)))
        );
        assert_eq!(
            extractor.parse("2500 EUR", Some(Currency::Usd)),
            Some(Money::eur(Decimal::from(2500)))
        );
        assert_eq!(
            extractor.parse("$12,300.00", Some(Currency::Eur)),
            usd("12300")
        );
        // Column currency applies when the cell is bare
        assert_eq!(
            extractor.parse("800", Some(Currency::Gbp)),
            Some(Money::new(Decimal::from(800), Currency::Gbp))
        );
    }

    #[test]
    fn test_sentinels_and_garbage() {
        let extractor = PriceExtractor::default();
        for raw in ["", "  ", "N/A", "TBD", "Contact sales", "-", "POA", "SR630", "0", "-15"] {
            assert_eq!(extractor.parse(raw, None), None, "{raw:?}");
        }
    }

    #[test]
    fn test_numeric_cells() {
        let extractor = PriceExtractor::new(Currency::Eur);
        assert_eq!(
            extractor.extract(&Cell::Number(12345.67), None),
            Some(Money::eur(Decimal::from_str("12345.67").unwrap()))
        );
        assert_eq!(
            extractor.extract(&Cell::Number(99.0), Some(Currency::Usd)),
            usd("99")
        );
        assert_eq!(extractor.extract(&Cell::Number(0.0), None), None);
        assert_eq!(extractor.extract(&Cell::Empty, None), None);
    }

    #[test]
    fn test_rendered_amount_parses_back() {
        let extractor = PriceExtractor::default();
        let original = Money::usd(Decimal::from_str("12345.5").unwrap());
        let rendered = format!("{:.2}", original.amount);
        assert_eq!(extractor.parse(&rendered, None), Some(original));
    }
}
