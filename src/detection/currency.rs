use once_cell::sync::Lazy;
use regex::Regex;

use crate::metrics::CurrencySymbol;
use crate::types::Dataset;

/// Rows inspected when a column name carries no currency marker.
const VALUE_SAMPLE_ROWS: usize = 100;

/// Checked in order; the first hit wins.
static CURRENCY_PATTERNS: Lazy<Vec<(CurrencySymbol, Regex)>> = Lazy::new(|| {
    [
        (CurrencySymbol::Euro, r"(?i)€|EUR|euro"),
        (CurrencySymbol::Dollar, r"(?i)\$|USD|dollar"),
        (CurrencySymbol::Pound, r"(?i)£|GBP|pound"),
        (CurrencySymbol::Yen, r"(?i)¥|JPY|yen"),
        (CurrencySymbol::Krona, r"(?i)kr|SEK|NOK|DKK|krona|krone"),
        (CurrencySymbol::Franc, r"(?i)CHF|franc"),
    ]
    .into_iter()
    .map(|(symbol, pattern)| (symbol, Regex::new(pattern).unwrap()))
    .collect()
});

/// Money-like words in English, French, German and Spanish.
pub const REVENUE_KEYWORDS: &[&str] = &[
    "revenue", "sales", "amount", "price", "cost", "value", "total", "chiffre", "montant", "prix",
    "vente", "umsatz", "betrag", "preis", "ingresos", "ventas", "precio", "importe",
];

/// Currency implied by free text, if any.
pub fn match_currency(text: &str) -> Option<CurrencySymbol> {
    CURRENCY_PATTERNS
        .iter()
        .find(|(_, re)| re.is_match(text))
        .map(|(symbol, _)| *symbol)
}

pub fn is_revenue_name(column: &str) -> bool {
    let lower = column.to_lowercase();
    REVENUE_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Currency of `column`: its name first, then its leading values, then the
/// euro default for money-like names.
pub fn detect_currency(data: &Dataset, column: &str) -> Option<CurrencySymbol> {
    if let Some(symbol) = match_currency(column) {
        return Some(symbol);
    }

    let from_values = data
        .rows()
        .iter()
        .take(VALUE_SAMPLE_ROWS)
        .filter_map(|row| row.get(column))
        .find_map(|cell| match_currency(&cell.to_string()));
    if from_values.is_some() {
        return from_values;
    }

    if is_revenue_name(column) {
        return Some(CurrencySymbol::Euro);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ds(v: serde_json::Value) -> Dataset {
        Dataset::from_value(v).unwrap()
    }

    #[test]
    fn test_column_name_wins() {
        let data = ds(json!([{"revenue_usd": "€12"}]));
        assert_eq!(detect_currency(&data, "revenue_usd"), Some(CurrencySymbol::Dollar));
    }

    #[test]
    fn test_pattern_order_prefers_euro() {
        assert_eq!(match_currency("EUR/USD"), Some(CurrencySymbol::Euro));
        assert_eq!(match_currency("price in GBP"), Some(CurrencySymbol::Pound));
        assert_eq!(match_currency("betrag_chf"), Some(CurrencySymbol::Franc));
        assert_eq!(match_currency("¥1000"), Some(CurrencySymbol::Yen));
        assert_eq!(match_currency("plain"), None);
    }

    #[test]
    fn test_values_are_sampled() {
        let data = ds(json!([{"spend": "12.00"}, {"spend": "£4.50"}]));
        assert_eq!(detect_currency(&data, "spend"), Some(CurrencySymbol::Pound));
    }

    #[test]
    fn test_values_beyond_sample_are_ignored() {
        let mut rows: Vec<serde_json::Value> = (0..100).map(|_| json!({"spend": 1})).collect();
        rows.push(json!({"spend": "$5"}));
        let data = ds(serde_json::Value::Array(rows));
        assert_eq!(detect_currency(&data, "spend"), None);
    }

    #[test]
    fn test_gross_revenue_defaults_to_euro() {
        let data = ds(json!([{"gross_revenue": 100}, {"gross_revenue": 250.5}]));
        assert_eq!(detect_currency(&data, "gross_revenue"), Some(CurrencySymbol::Euro));
    }

    #[test]
    fn test_non_money_column_is_undetected() {
        let data = ds(json!([{"clicks": 3}]));
        assert_eq!(detect_currency(&data, "clicks"), None);
    }

    #[test]
    fn test_revenue_keywords_multilingual() {
        assert!(is_revenue_name("Umsatz_Gesamt"));
        assert!(is_revenue_name("montant"));
        assert!(!is_revenue_name("sessions"));
    }
}
