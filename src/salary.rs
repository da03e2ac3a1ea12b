use std::sync::LazyLock;

use regex::Regex;

static CURRENCY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[$£€₹]").expect("valid currency regex"));

static RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d[\d.]*[kKmM]?)\s*(?:-|–|(?i:to))\s*[$£€₹]?\s*(\d[\d.]*[kKmM]?)")
        .expect("valid range regex")
});

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d[\d.]*[kKmM]?").expect("valid number regex"));

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SalaryRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub currency: Option<String>,
}

impl SalaryRange {
    pub fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none() && self.currency.is_none()
    }
}

/// Extract (min, max, currency) from a salary-like string.
///
/// A range is returned as found, without checking that min <= max. A lone
/// number is returned as both bounds.
pub fn parse(text: Option<&str>) -> SalaryRange {
    let Some(text) = text.filter(|t| !t.is_empty()) else {
        return SalaryRange::default();
    };

    let text = text.replace(',', "");
    let currency = CURRENCY.find(&text).map(|m| m.as_str().to_string());

    if let Some(caps) = RANGE.captures(&text) {
        let low = value_from_token(&caps[1]);
        let high = value_from_token(&caps[2]);
        if let (Some(min), Some(max)) = (low, high) {
            return SalaryRange {
                min: Some(min),
                max: Some(max),
                currency,
            };
        }
    }

    if let Some(m) = NUMBER.find(&text) {
        let value = value_from_token(m.as_str());
        return SalaryRange {
            min: value,
            max: value,
            currency,
        };
    }

    SalaryRange {
        min: None,
        max: None,
        currency,
    }
}

/// Parse one numeric token, honouring a single trailing k/m multiplier.
fn value_from_token(token: &str) -> Option<f64> {
    let (digits, multiplier) = match token.chars().last() {
        Some('k' | 'K') => (&token[..token.len() - 1], 1_000.0),
        Some('m' | 'M') => (&token[..token.len() - 1], 1_000_000.0),
        _ => (token, 1.0),
    };

    let cleaned: String = digits
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    cleaned.parse::<f64>().ok().map(|v| v * multiplier)
}
