//! Imperial-to-metric normalization of recipe drafts.
//!
//! Volume units always become millilitres: no density is applied, so
//! "1 cup butter" becomes 236.59 ml rather than a weight. The only mass/volume
//! guess made is for a bare `oz`, which is read as fluid ounces when the item
//! names a liquid (see [`is_liquid`]) and as mass otherwise.

use crate::amount::ParsedAmount;
use crate::types::{Amount, Ingredient, RecipeDraft};

/// Imperial units the normalizer converts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImperialUnit {
    /// lb, pound(s).
    Pound,
    /// oz, ounce(s); mass or fluid depending on the item.
    Ounce,
    /// fl oz, fluid ounce(s).
    FluidOunce,
    /// cup(s).
    Cup,
    /// tbsp, tablespoon(s), `T`.
    Tablespoon,
    /// tsp, teaspoon(s), `t`.
    Teaspoon,
    /// pint(s), pt.
    Pint,
    /// quart(s), qt.
    Quart,
    /// gallon(s), gal.
    Gallon,
    /// °F, fahrenheit.
    Fahrenheit,
}

/// Classification of a unit token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    /// Already metric (g, kg, ml, l, °C, ...).
    Metric,
    /// A convertible imperial unit.
    Imperial(ImperialUnit),
    /// Anything else (cloves, pinch, serving, ...).
    Unknown,
}

/// Metric base a conversion lands in before kilo-promotion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MetricBase {
    Grams,
    Millilitres,
}

/// Fixed conversion factors used by the normalizer.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionTable {
    /// Grams per pound.
    pub grams_per_pound: f64,
    /// Grams per (mass) ounce.
    pub grams_per_ounce: f64,
    /// Millilitres per fluid ounce.
    pub ml_per_fluid_ounce: f64,
    /// Millilitres per cup.
    pub ml_per_cup: f64,
    /// Millilitres per tablespoon.
    pub ml_per_tablespoon: f64,
    /// Millilitres per teaspoon.
    pub ml_per_teaspoon: f64,
    /// Millilitres per pint.
    pub ml_per_pint: f64,
    /// Millilitres per quart.
    pub ml_per_quart: f64,
    /// Millilitres per gallon.
    pub ml_per_gallon: f64,
}

impl Default for ConversionTable {
    fn default() -> Self {
        Self {
            grams_per_pound: 453.59,
            grams_per_ounce: 28.35,
            ml_per_fluid_ounce: 29.57,
            ml_per_cup: 236.59,
            ml_per_tablespoon: 14.79,
            ml_per_teaspoon: 4.93,
            ml_per_pint: 473.18,
            ml_per_quart: 946.35,
            ml_per_gallon: 3785.41,
        }
    }
}

impl ConversionTable {
    fn factor(&self, unit: ImperialUnit, liquid: bool) -> Option<(f64, MetricBase)> {
        let conversion = match unit {
            ImperialUnit::Pound => (self.grams_per_pound, MetricBase::Grams),
            ImperialUnit::Ounce if liquid => (self.ml_per_fluid_ounce, MetricBase::Millilitres),
            ImperialUnit::Ounce => (self.grams_per_ounce, MetricBase::Grams),
            ImperialUnit::FluidOunce => (self.ml_per_fluid_ounce, MetricBase::Millilitres),
            ImperialUnit::Cup => (self.ml_per_cup, MetricBase::Millilitres),
            ImperialUnit::Tablespoon => (self.ml_per_tablespoon, MetricBase::Millilitres),
            ImperialUnit::Teaspoon => (self.ml_per_teaspoon, MetricBase::Millilitres),
            ImperialUnit::Pint => (self.ml_per_pint, MetricBase::Millilitres),
            ImperialUnit::Quart => (self.ml_per_quart, MetricBase::Millilitres),
            ImperialUnit::Gallon => (self.ml_per_gallon, MetricBase::Millilitres),
            ImperialUnit::Fahrenheit => return None,
        };
        Some(conversion)
    }
}

const LIQUID_KEYWORDS: &[&str] = &[
    "water", "milk", "cream", "stock", "broth", "juice", "oil", "vinegar", "wine", "sauce",
    "syrup", "beer", "rum", "vodka", "whiskey", "liqueur", "coffee", "tea", "liquid",
];

const NON_LIQUID_KEYWORDS: &[&str] = &["cheese", "powder", "steak", "leaves"];

/// Whether an ingredient name describes a liquid, for the `oz` ambiguity.
///
/// Keywords match whole words only, with an optional plural `s`.
#[must_use]
pub fn is_liquid(item: &str) -> bool {
    let item = item.to_lowercase();
    let words: Vec<&str> = item
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    let mentions = |keywords: &[&str]| {
        words.iter().any(|word| {
            let singular = word.strip_suffix('s').unwrap_or(*word);
            keywords.iter().any(|k| *word == *k || singular == *k)
        })
    };
    mentions(LIQUID_KEYWORDS) && !mentions(NON_LIQUID_KEYWORDS)
}

/// Splits a unit string into its leading unit token and a trailing qualifier.
///
/// `"cups, packed"` → `("cups", Some("packed"))`; `"fl oz"` stays whole.
fn split_unit(unit: &str) -> (&str, Option<&str>) {
    let unit = unit.trim();
    let lower = unit.to_ascii_lowercase();

    let multiword = ["fluid ounces", "fluid ounce", "fl. oz.", "fl. oz", "fl oz"]
        .iter()
        .find(|prefix| lower.starts_with(*prefix))
        .map(|prefix| prefix.len());

    let token_len = multiword.unwrap_or_else(|| {
        unit.find(|c: char| c.is_whitespace() || c == ',' || c == '(')
            .unwrap_or(unit.len())
    });

    let (token, rest) = unit.split_at(token_len);
    let qualifier = rest.trim_matches(|c: char| c.is_whitespace() || matches!(c, ',' | '(' | ')'));
    (token, (!qualifier.is_empty()).then_some(qualifier))
}

fn classify_token(token: &str) -> UnitKind {
    match token {
        "T" | "Tbsp" | "TBSP" => return UnitKind::Imperial(ImperialUnit::Tablespoon),
        "t" => return UnitKind::Imperial(ImperialUnit::Teaspoon),
        _ => {}
    }

    let lower = token.to_lowercase();
    match lower.trim_end_matches('.') {
        "lb" | "lbs" | "pound" | "pounds" => UnitKind::Imperial(ImperialUnit::Pound),
        "oz" | "ounce" | "ounces" => UnitKind::Imperial(ImperialUnit::Ounce),
        "fl oz" | "fl. oz" | "fluid ounce" | "fluid ounces" | "floz" => {
            UnitKind::Imperial(ImperialUnit::FluidOunce)
        }
        "c" | "cup" | "cups" => UnitKind::Imperial(ImperialUnit::Cup),
        "tbsp" | "tbs" | "tbl" | "tablespoon" | "tablespoons" => {
            UnitKind::Imperial(ImperialUnit::Tablespoon)
        }
        "tsp" | "teaspoon" | "teaspoons" => UnitKind::Imperial(ImperialUnit::Teaspoon),
        "pint" | "pints" | "pt" => UnitKind::Imperial(ImperialUnit::Pint),
        "quart" | "quarts" | "qt" => UnitKind::Imperial(ImperialUnit::Quart),
        "gallon" | "gallons" | "gal" => UnitKind::Imperial(ImperialUnit::Gallon),
        "°f" | "f" | "fahrenheit" => UnitKind::Imperial(ImperialUnit::Fahrenheit),
        "g" | "gram" | "grams" | "gramme" | "grammes" | "kg" | "kilogram" | "kilograms"
        | "mg" | "milligram" | "milligrams" | "ml" | "milliliter" | "milliliters"
        | "millilitre" | "millilitres" | "cl" | "dl" | "l" | "liter" | "liters" | "litre"
        | "litres" | "°c" | "celsius" => UnitKind::Metric,
        _ => UnitKind::Unknown,
    }
}

/// Classifies a unit string by its leading token.
#[must_use]
pub fn classify_unit(unit: &str) -> UnitKind {
    classify_token(split_unit(unit).0)
}

/// Rounds Fahrenheit to the nearest 5 °C, the usual oven-dial precision.
#[must_use]
pub fn fahrenheit_to_celsius(fahrenheit: f64) -> f64 {
    let celsius = (fahrenheit - 32.0) * 5.0 / 9.0;
    (celsius / 5.0).round() * 5.0
}

/// Converts imperial quantities in a draft to metric.
///
/// Never fails: anything it cannot convert is left untouched. Applying it to
/// its own output is a no-op.
#[derive(Debug, Clone, Default)]
pub struct UnitNormalizer {
    table: ConversionTable,
}

impl UnitNormalizer {
    /// Creates a normalizer using the given conversion factors.
    #[must_use]
    pub const fn new(table: ConversionTable) -> Self {
        Self { table }
    }

    /// Normalizes every ingredient and rewrites Fahrenheit temperatures in the
    /// instructions.
    #[must_use]
    pub fn normalize_draft(&self, mut draft: RecipeDraft) -> RecipeDraft {
        draft.ingredients = draft
            .ingredients
            .into_iter()
            .map(|ingredient| self.normalize_ingredient(ingredient))
            .collect();
        draft.instructions = draft
            .instructions
            .iter()
            .map(|step| rewrite_fahrenheit(step))
            .collect();
        draft
    }

    /// Normalizes a single ingredient.
    #[must_use]
    pub fn normalize_ingredient(&self, mut ingredient: Ingredient) -> Ingredient {
        let Some(unit) = ingredient.unit.clone() else {
            return ingredient;
        };
        let (token, qualifier) = split_unit(&unit);
        let UnitKind::Imperial(imperial) = classify_token(token) else {
            return ingredient;
        };
        let Some(parsed) = ingredient.amount.parse() else {
            tracing::debug!(item = %ingredient.item, %unit, "amount not numeric, unit left as-is");
            return ingredient;
        };

        let (converted, metric_unit) = if imperial == ImperialUnit::Fahrenheit {
            let celsius = match parsed {
                ParsedAmount::Single(v) => ParsedAmount::Single(fahrenheit_to_celsius(v)),
                ParsedAmount::Range(lo, hi) => {
                    ParsedAmount::Range(fahrenheit_to_celsius(lo), fahrenheit_to_celsius(hi))
                }
            };
            (celsius, "°C")
        } else {
            let Some((factor, base)) = self.table.factor(imperial, is_liquid(&ingredient.item))
            else {
                return ingredient;
            };
            promote(parsed.scale(factor), base)
        };

        ingredient.amount = match (&ingredient.amount, converted) {
            (Amount::Number(_), ParsedAmount::Single(v)) => {
                Amount::Number((v * 100.0).round() / 100.0)
            }
            _ => Amount::Text(converted.format()),
        };
        ingredient.unit = Some(metric_unit.to_string());

        if let Some(qualifier) = qualifier {
            ingredient.notes = Some(match ingredient.notes.take() {
                Some(notes) if !notes.trim().is_empty() => format!("{notes}; {qualifier}"),
                _ => qualifier.to_string(),
            });
        }
        ingredient
    }
}

fn promote(amount: ParsedAmount, base: MetricBase) -> (ParsedAmount, &'static str) {
    let large = amount.upper() >= 1000.0;
    match (base, large) {
        (MetricBase::Grams, false) => (amount, "g"),
        (MetricBase::Grams, true) => (amount.scale(0.001), "kg"),
        (MetricBase::Millilitres, false) => (amount, "ml"),
        (MetricBase::Millilitres, true) => (amount.scale(0.001), "l"),
    }
}

/// Fahrenheit suffixes recognised after a number, longest first.
const FAHRENHEIT_SUFFIXES: &[&str] = &[
    " degrees fahrenheit",
    " degree fahrenheit",
    " degrees f",
    " degree f",
    " fahrenheit",
    " ° f",
    " °f",
    "° f",
    "°f",
    "ºf",
    " f",
];

/// Rewrites Fahrenheit temperatures (`350°F`, `350 degrees F`, `350-375 F`) in
/// free text to Celsius.
#[must_use]
pub fn rewrite_fahrenheit(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    let mut search = 0;

    while let Some(offset) = text[search..].find(|c: char| c.is_ascii_digit()) {
        let start = search + offset;
        let preceded_by_word = text[..start]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_alphanumeric() || c == '.');
        let (first, after_first) = read_number(text, start);

        if preceded_by_word {
            search = after_first;
            continue;
        }

        let range = read_range_tail(text, after_first);
        let (celsius_text, end) = match range {
            Some((second, after_second)) => match match_suffix(&text[after_second..]) {
                Some(len) => (
                    format!(
                        "{}-{}°C",
                        fahrenheit_to_celsius(first),
                        fahrenheit_to_celsius(second)
                    ),
                    after_second + len,
                ),
                None => {
                    search = after_first;
                    continue;
                }
            },
            None => match match_suffix(&text[after_first..]) {
                Some(len) => (
                    format!("{}°C", fahrenheit_to_celsius(first)),
                    after_first + len,
                ),
                None => {
                    search = after_first;
                    continue;
                }
            },
        };

        out.push_str(&text[cursor..start]);
        out.push_str(&celsius_text);
        cursor = end;
        search = end;
    }

    out.push_str(&text[cursor..]);
    out
}

/// Reads digits and at most one decimal point starting at `start`.
fn read_number(text: &str, start: usize) -> (f64, usize) {
    let mut end = start;
    let mut seen_dot = false;
    for (i, c) in text[start..].char_indices() {
        if c.is_ascii_digit() {
            end = start + i + 1;
        } else if c == '.' && !seen_dot {
            let next_is_digit = text[start + i + 1..]
                .chars()
                .next()
                .is_some_and(|n| n.is_ascii_digit());
            if !next_is_digit {
                break;
            }
            seen_dot = true;
        } else {
            break;
        }
    }
    (text[start..end].parse().unwrap_or(0.0), end)
}

/// Parses `-375`, `–375` or ` to 375` directly after a number.
fn read_range_tail(text: &str, at: usize) -> Option<(f64, usize)> {
    let rest = &text[at..];
    let sep_len = ["-", "–", " - ", " to "]
        .iter()
        .find(|sep| rest.starts_with(*sep))
        .map(|sep| sep.len())?;
    let number_start = at + sep_len;
    if !text[number_start..].starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    Some(read_number(text, number_start))
}

/// Length in bytes of a Fahrenheit suffix at the start of `rest`, if any.
fn match_suffix(rest: &str) -> Option<usize> {
    FAHRENHEIT_SUFFIXES.iter().find_map(|suffix| {
        let len = prefix_len_ignore_case(rest, suffix)?;
        let next = rest[len..].chars().next();
        (!next.is_some_and(char::is_alphanumeric)).then_some(len)
    })
}

fn prefix_len_ignore_case(text: &str, prefix: &str) -> Option<usize> {
    let mut consumed = 0;
    let mut chars = text.chars();
    for expected in prefix.chars() {
        let actual = chars.next()?;
        if actual.to_ascii_lowercase() != expected {
            return None;
        }
        consumed += actual.len_utf8();
    }
    Some(consumed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RecipeOverview;

    fn normalizer() -> UnitNormalizer {
        UnitNormalizer::default()
    }

    #[test]
    fn test_cup_butter_becomes_millilitres() {
        let butter = Ingredient::new("butter", "1", Some("cup"));
        let result = normalizer().normalize_ingredient(butter);

        assert_eq!(result.unit.as_deref(), Some("ml"));
        assert_eq!(result.amount, Amount::Text("236.59".to_string()));
        assert_eq!(result.item, "butter");
        assert_eq!(result.notes, None);
    }

    #[test]
    fn test_pound_to_grams_and_kilo_promotion() {
        let beef = normalizer().normalize_ingredient(Ingredient::new("beef", 1.0, Some("lb")));
        assert_eq!(beef.amount, Amount::Number(453.59));
        assert_eq!(beef.unit.as_deref(), Some("g"));

        let pork = normalizer().normalize_ingredient(Ingredient::new("pork", "3", Some("lbs")));
        assert_eq!(pork.amount, Amount::Text("1.36".to_string()));
        assert_eq!(pork.unit.as_deref(), Some("kg"));
    }

    #[test]
    fn test_ounce_depends_on_liquid_heuristic() {
        let milk = normalizer().normalize_ingredient(Ingredient::new("whole milk", "8", Some("oz")));
        assert_eq!(milk.unit.as_deref(), Some("ml"));
        assert_eq!(milk.amount, Amount::Text("236.56".to_string()));

        let cheese =
            normalizer().normalize_ingredient(Ingredient::new("cream cheese", "8", Some("oz")));
        assert_eq!(cheese.unit.as_deref(), Some("g"));
        assert_eq!(cheese.amount, Amount::Text("226.8".to_string()));

        for item in ["crumbled feta", "breadcrumbs", "boiled potatoes"] {
            let solid = normalizer().normalize_ingredient(Ingredient::new(item, "4", Some("oz")));
            assert_eq!(solid.unit.as_deref(), Some("g"), "{item}");
            assert_eq!(solid.amount, Amount::Text("113.4".to_string()), "{item}");
        }

        assert!(is_liquid("olive oil"));
        assert!(is_liquid("chicken stocks"));
        assert!(!is_liquid("parmesan cheese in oil"));
    }

    #[test]
    fn test_bare_c_is_a_cup() {
        assert_eq!(classify_unit("c"), UnitKind::Imperial(ImperialUnit::Cup));
        assert_eq!(classify_unit("C"), UnitKind::Imperial(ImperialUnit::Cup));
        assert_eq!(classify_unit("°C"), UnitKind::Metric);

        let sugar = normalizer().normalize_ingredient(Ingredient::new("sugar", "1", Some("c")));
        assert_eq!(sugar.unit.as_deref(), Some("ml"));
        assert_eq!(sugar.amount, Amount::Text("236.59".to_string()));
    }

    #[test]
    fn test_metric_unknown_and_missing_units_pass_through() {
        for ingredient in [
            Ingredient::new("flour", "200", Some("g")),
            Ingredient::new("garlic", "3-4", Some("cloves")),
            Ingredient::new("egg", "2", None),
        ] {
            assert_eq!(normalizer().normalize_ingredient(ingredient.clone()), ingredient);
        }
    }

    #[test]
    fn test_unparseable_amount_left_as_is() {
        let salt = Ingredient::new("salt", "a pinch", Some("tsp"));
        assert_eq!(normalizer().normalize_ingredient(salt.clone()), salt);
    }

    #[test]
    fn test_qualifier_moves_to_notes() {
        let mut sugar = Ingredient::new("brown sugar", "1", Some("cup, packed"));
        sugar.notes = Some("dark".to_string());
        let result = normalizer().normalize_ingredient(sugar);

        assert_eq!(result.unit.as_deref(), Some("ml"));
        assert_eq!(result.amount, Amount::Text("236.59".to_string()));
        assert_eq!(result.notes.as_deref(), Some("dark; packed"));
    }

    #[test]
    fn test_ranges_and_fluid_ounces() {
        let stock = normalizer().normalize_ingredient(Ingredient::new("stock", "2-3", Some("cups")));
        assert_eq!(stock.amount, Amount::Text("473.18-709.77".to_string()));

        let rum = normalizer().normalize_ingredient(Ingredient::new("rum", "2", Some("fl oz")));
        assert_eq!(rum.unit.as_deref(), Some("ml"));
        assert_eq!(rum.amount, Amount::Text("59.14".to_string()));
    }

    #[test]
    fn test_case_sensitive_spoon_abbreviations() {
        assert_eq!(classify_unit("T"), UnitKind::Imperial(ImperialUnit::Tablespoon));
        assert_eq!(classify_unit("t"), UnitKind::Imperial(ImperialUnit::Teaspoon));
        assert_eq!(classify_unit("Tbsp."), UnitKind::Imperial(ImperialUnit::Tablespoon));
        assert_eq!(classify_unit("ml"), UnitKind::Metric);
        assert_eq!(classify_unit("pinch"), UnitKind::Unknown);
    }

    #[test]
    fn test_fahrenheit_in_instructions() {
        assert_eq!(rewrite_fahrenheit("Preheat oven to 350°F."), "Preheat oven to 175°C.");
        assert_eq!(rewrite_fahrenheit("Bake at 400 degrees F for 20 minutes"), "Bake at 205°C for 20 minutes");
        assert_eq!(rewrite_fahrenheit("Heat oil to 350-375 F"), "Heat oil to 175-190°C");
        assert_eq!(rewrite_fahrenheit("Add 2 fish fillets"), "Add 2 fish fillets");
        assert_eq!(rewrite_fahrenheit("Cook 5 minutes at 180°C"), "Cook 5 minutes at 180°C");
    }

    #[test]
    fn test_normalizing_twice_is_a_no_op() {
        let draft = RecipeDraft {
            overview: RecipeOverview::titled("Cookies"),
            ingredients: vec![
                Ingredient::new("butter", "1", Some("cup")),
                Ingredient::new("flour", 2.25, Some("cups")),
                Ingredient::new("chocolate", "12", Some("oz, chopped")),
                Ingredient::new("eggs", "2", None),
                Ingredient::new("salt", "to taste", Some("tsp")),
            ],
            instructions: vec!["Preheat to 375°F.".to_string(), "Bake 10 minutes.".to_string()],
            equipment: vec!["baking sheet".to_string()],
        };

        let once = normalizer().normalize_draft(draft);
        let twice = normalizer().normalize_draft(once.clone());

        assert_eq!(once, twice);
        assert_eq!(once.instructions[0], "Preheat to 190°C.");
        assert_eq!(once.ingredients[2].notes.as_deref(), Some("chopped"));
    }
}
