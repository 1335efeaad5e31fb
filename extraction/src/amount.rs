//! Parsing and formatting of ingredient quantities.

/// A quantity parsed from an ingredient amount.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParsedAmount {
    /// A single value such as `1.5` or `1 1/2`.
    Single(f64),
    /// An inclusive range such as `3-4`.
    Range(f64, f64),
}

impl ParsedAmount {
    /// Multiplies every bound by `factor`.
    #[must_use]
    pub fn scale(self, factor: f64) -> Self {
        match self {
            Self::Single(v) => Self::Single(v * factor),
            Self::Range(lo, hi) => Self::Range(lo * factor, hi * factor),
        }
    }

    /// The largest bound, used to pick a display unit.
    #[must_use]
    pub const fn upper(self) -> f64 {
        match self {
            Self::Single(v) | Self::Range(_, v) => v,
        }
    }

    /// Renders the quantity with at most two decimals.
    #[must_use]
    pub fn format(self) -> String {
        match self {
            Self::Single(v) => format_quantity(v),
            Self::Range(lo, hi) => format!("{}-{}", format_quantity(lo), format_quantity(hi)),
        }
    }
}

/// Formats a value rounded to two decimals, trimming trailing zeros.
///
/// ```
/// use reel_recipe_extraction::amount::format_quantity;
///
/// assert_eq!(format_quantity(236.588), "236.59");
/// assert_eq!(format_quantity(250.0), "250");
/// ```
#[must_use]
pub fn format_quantity(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    let text = format!("{rounded:.2}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

/// Parses a textual amount.
///
/// Accepts integers, decimals, fractions (`1/2`), mixed numbers (`1 1/2`),
/// unicode vulgar fractions (`½`, `1½`) and ranges (`3-4`, `3 to 4`).
/// Returns `None` for anything else (e.g. `"a pinch"`).
#[must_use]
pub fn parse_amount(text: &str) -> Option<ParsedAmount> {
    let expanded = expand_vulgar_fractions(text.trim());
    let normalized = expanded.trim().to_ascii_lowercase().replace(',', ".");
    if normalized.is_empty() {
        return None;
    }

    if let Some((lo, hi)) = split_range(&normalized) {
        let lo = parse_single(lo)?;
        let hi = parse_single(hi)?;
        return Some(ParsedAmount::Range(lo, hi));
    }

    parse_single(&normalized).map(ParsedAmount::Single)
}

fn split_range(text: &str) -> Option<(&str, &str)> {
    if let Some(pair) = text.split_once(" to ") {
        return Some(pair);
    }
    text.split_once(['-', '–'])
        .filter(|(lo, hi)| !lo.trim().is_empty() && !hi.trim().is_empty())
}

fn parse_single(text: &str) -> Option<f64> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    match tokens.as_slice() {
        [one] => parse_number_or_fraction(one),
        [whole, fraction] if fraction.contains('/') => {
            let whole = parse_number(whole)?;
            let fraction = parse_fraction(fraction)?;
            Some(whole + fraction)
        }
        _ => None,
    }
}

fn parse_number_or_fraction(token: &str) -> Option<f64> {
    if token.contains('/') {
        parse_fraction(token)
    } else {
        parse_number(token)
    }
}

fn parse_number(token: &str) -> Option<f64> {
    if token.is_empty() || !token.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    token.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_fraction(token: &str) -> Option<f64> {
    let (num, den) = token.split_once('/')?;
    let num = parse_number(num)?;
    let den = parse_number(den)?;
    (den != 0.0).then(|| num / den)
}

fn expand_vulgar_fractions(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 4);
    for c in text.chars() {
        let replacement = match c {
            '½' => Some("1/2"),
            '⅓' => Some("1/3"),
            '⅔' => Some("2/3"),
            '¼' => Some("1/4"),
            '¾' => Some("3/4"),
            '⅛' => Some("1/8"),
            '⅜' => Some("3/8"),
            '⅝' => Some("5/8"),
            '⅞' => Some("7/8"),
            _ => None,
        };
        match replacement {
            Some(fraction) => {
                out.push(' ');
                out.push_str(fraction);
            }
            None => out.push(c),
        }
    }
    out
}
