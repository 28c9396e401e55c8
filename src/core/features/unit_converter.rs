use crate::shared::error::{AppError, AppResult};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

pub mod parsing;

pub use parsing::{normalize_unit, parse_conversion_query, ConversionQuery};

// ============================================================================
// Categories
// ============================================================================

/// Measurement categories. Each one owns a closed unit list; labels are never
/// compared across categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Length,
    Weight,
    Temperature,
    Time,
    #[serde(rename = "Data Storage")]
    DataStorage,
    Speed,
    Energy,
    Pressure,
    Volume,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::Length,
        Category::Weight,
        Category::Temperature,
        Category::Time,
        Category::DataStorage,
        Category::Speed,
        Category::Energy,
        Category::Pressure,
        Category::Volume,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::Length => "Length",
            Category::Weight => "Weight",
            Category::Temperature => "Temperature",
            Category::Time => "Time",
            Category::DataStorage => "Data Storage",
            Category::Speed => "Speed",
            Category::Energy => "Energy",
            Category::Pressure => "Pressure",
            Category::Volume => "Volume",
        }
    }

    /// Units offered for this category, in display order.
    pub fn units(self) -> &'static [&'static str] {
        match self {
            Category::Length => &["Meter", "Kilometer", "Mile", "Foot", "Inch"],
            Category::Weight => &["Kilogram", "Gram", "Pound", "Ounce"],
            Category::Temperature => &["Celsius", "Fahrenheit", "Kelvin"],
            Category::Time => &["Seconds", "Minutes", "Hours", "Days", "Weeks"],
            Category::DataStorage => &["Bytes", "KB", "MB", "GB", "TB"],
            Category::Speed => &["m/s", "km/h", "mph"],
            Category::Energy => &["Joule", "Kilojoule", "Calorie", "Kilocalorie", "Watt-hour", "Kilowatt-hour"],
            Category::Pressure => &["Pascal", "Kilopascal", "Bar", "PSI", "Atmosphere"],
            Category::Volume => &["Liter", "Milliliter", "Cubic Meter", "Gallon", "Cup"],
        }
    }

    pub fn has_unit(self, unit: &str) -> bool {
        self.units().contains(&unit)
    }

    /// Noun used in boundary validation messages ("Length cannot be negative").
    pub fn quantity_name(self) -> &'static str {
        match self {
            Category::DataStorage => "Data size",
            other => other.label(),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.label().to_string()
    }
}

impl FromStr for Category {
    type Err = AppError;

    /// Case-insensitive; `Data Storage`, `data_storage` and `data-storage` all match.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(*c, ' ' | '_' | '-'))
            .flat_map(char::to_lowercase)
            .collect();

        Category::ALL
            .into_iter()
            .find(|category| {
                category
                    .label()
                    .chars()
                    .filter(|c| *c != ' ')
                    .flat_map(char::to_lowercase)
                    .eq(key.chars())
            })
            .ok_or_else(|| AppError::Validation(format!("Unknown category: {}", s)))
    }
}

// ============================================================================
// Conversion rules
// ============================================================================

/// How one unit turns into another.
#[derive(Debug, Clone, Copy)]
pub enum ConversionRule {
    /// result = value * factor. The reverse pair can be derived as 1 / factor.
    Multiplier(f64),
    /// result = f(value). Never inverted; the reverse pair needs its own entry.
    Affine(fn(f64) -> f64),
}

impl ConversionRule {
    pub fn apply(self, value: f64) -> f64 {
        match self {
            ConversionRule::Multiplier(factor) => value * factor,
            ConversionRule::Affine(formula) => formula(value),
        }
    }
}

/// from unit -> to unit -> rule
type PairRules = HashMap<&'static str, HashMap<&'static str, ConversionRule>>;

/// Immutable lookup table keyed by (category, from unit, to unit).
#[derive(Debug, Clone, Default)]
pub struct ConversionTable {
    rules: HashMap<Category, PairRules>,
}

impl ConversionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The table shipped with the converter, built once per process.
    pub fn builtin() -> &'static ConversionTable {
        &BUILTIN_TABLE
    }

    pub fn with_rule(mut self, category: Category, from: &'static str, to: &'static str, rule: ConversionRule) -> Self {
        self.insert(category, from, to, rule);
        self
    }

    pub fn with_multiplier(self, category: Category, from: &'static str, to: &'static str, factor: f64) -> Self {
        self.with_rule(category, from, to, ConversionRule::Multiplier(factor))
    }

    pub fn with_formula(self, category: Category, from: &'static str, to: &'static str, formula: fn(f64) -> f64) -> Self {
        self.with_rule(category, from, to, ConversionRule::Affine(formula))
    }

    fn insert(&mut self, category: Category, from: &'static str, to: &'static str, rule: ConversionRule) {
        self.rules
            .entry(category)
            .or_default()
            .entry(from)
            .or_default()
            .insert(to, rule);
    }

    /// Registers only the forward direction for every ordered pair `(units[i], units[j])`
    /// with `i < j`. `units` carries each unit's size in a shared base unit.
    fn insert_forward_pairs(&mut self, category: Category, units: &[(&'static str, f64)]) {
        for (i, &(from, from_base)) in units.iter().enumerate() {
            for &(to, to_base) in &units[i + 1..] {
                self.insert(category, from, to, ConversionRule::Multiplier(from_base / to_base));
            }
        }
    }

    /// Rule registered for exactly this direction.
    pub fn rule(&self, category: Category, from: &str, to: &str) -> Option<ConversionRule> {
        self.rules
            .get(&category)?
            .get(from)?
            .get(to)
            .copied()
    }

    /// Number of registered directed pairs.
    pub fn len(&self) -> usize {
        self.rules
            .values()
            .flat_map(|pairs| pairs.values())
            .map(HashMap::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolve a conversion: identity, then the direct pair, then the reverse pair.
    ///
    /// A reverse multiplier is applied as its reciprocal. A reverse formula is not
    /// inverted, so the lookup reports `None` for it. Same-unit input only counts
    /// as identity when the unit belongs to `category`.
    pub fn resolve(&self, category: Category, value: f64, from: &str, to: &str) -> Option<f64> {
        if from == to {
            return category.has_unit(from).then_some(value);
        }

        if let Some(rule) = self.rule(category, from, to) {
            let result = rule.apply(value);
            debug!(%category, value, from, to, result, "resolved direct pair");
            return Some(result);
        }

        match self.rule(category, to, from) {
            Some(ConversionRule::Multiplier(factor)) => {
                let result = value * (1.0 / factor);
                debug!(%category, value, from, to, result, "resolved reciprocal of reverse pair");
                Some(result)
            }
            Some(ConversionRule::Affine(_)) => {
                debug!(%category, from, to, "reverse pair is a formula; not inverting");
                None
            }
            None => {
                debug!(%category, from, to, "no rule in either direction");
                None
            }
        }
    }
}

// ============================================================================
// Built-in table
// ============================================================================

fn celsius_to_fahrenheit(x: f64) -> f64 {
    (x * 9.0 / 5.0) + 32.0
}

fn celsius_to_kelvin(x: f64) -> f64 {
    x + 273.15
}

fn fahrenheit_to_celsius(x: f64) -> f64 {
    (x - 32.0) * 5.0 / 9.0
}

fn fahrenheit_to_kelvin(x: f64) -> f64 {
    (x - 32.0) * 5.0 / 9.0 + 273.15
}

fn kelvin_to_celsius(x: f64) -> f64 {
    x - 273.15
}

fn kelvin_to_fahrenheit(x: f64) -> f64 {
    (x - 273.15) * 9.0 / 5.0 + 32.0
}

const LENGTH_FACTORS: &[(&str, &str, f64)] = &[
    ("Meter", "Kilometer", 0.001), ("Meter", "Mile", 0.000621371), ("Meter", "Foot", 3.28084), ("Meter", "Inch", 39.3701),
    ("Kilometer", "Meter", 1000.0), ("Kilometer", "Mile", 0.621371), ("Kilometer", "Foot", 3280.84), ("Kilometer", "Inch", 39370.1),
    ("Mile", "Meter", 1609.34), ("Mile", "Kilometer", 1.60934), ("Mile", "Foot", 5280.0), ("Mile", "Inch", 63360.0),
    ("Foot", "Meter", 0.3048), ("Foot", "Kilometer", 0.0003048), ("Foot", "Mile", 0.000189394), ("Foot", "Inch", 12.0),
    ("Inch", "Meter", 0.0254), ("Inch", "Kilometer", 0.0000254), ("Inch", "Mile", 0.0000157828), ("Inch", "Foot", 0.0833333),
];

const WEIGHT_FACTORS: &[(&str, &str, f64)] = &[
    ("Kilogram", "Gram", 1000.0), ("Kilogram", "Pound", 2.20462), ("Kilogram", "Ounce", 35.274),
    ("Gram", "Kilogram", 0.001), ("Gram", "Pound", 0.00220462), ("Gram", "Ounce", 0.035274),
    ("Pound", "Kilogram", 0.453592), ("Pound", "Gram", 453.592), ("Pound", "Ounce", 16.0),
    ("Ounce", "Kilogram", 0.0283495), ("Ounce", "Gram", 28.3495), ("Ounce", "Pound", 0.0625),
];

const TIME_FACTORS: &[(&str, &str, f64)] = &[
    ("Seconds", "Minutes", 1.0 / 60.0), ("Seconds", "Hours", 1.0 / 3600.0), ("Seconds", "Days", 1.0 / 86400.0), ("Seconds", "Weeks", 1.0 / 604800.0),
    ("Minutes", "Seconds", 60.0), ("Minutes", "Hours", 1.0 / 60.0), ("Minutes", "Days", 1.0 / 1440.0), ("Minutes", "Weeks", 1.0 / 10080.0),
    ("Hours", "Seconds", 3600.0), ("Hours", "Minutes", 60.0), ("Hours", "Days", 1.0 / 24.0), ("Hours", "Weeks", 1.0 / 168.0),
    ("Days", "Seconds", 86400.0), ("Days", "Minutes", 1440.0), ("Days", "Hours", 24.0), ("Days", "Weeks", 1.0 / 7.0),
    ("Weeks", "Seconds", 604800.0), ("Weeks", "Minutes", 10080.0), ("Weeks", "Hours", 168.0), ("Weeks", "Days", 7.0),
];

const DATA_STORAGE_FACTORS: &[(&str, &str, f64)] = &[
    ("Bytes", "KB", 1.0 / 1024.0), ("Bytes", "MB", 1.0 / 1048576.0), ("Bytes", "GB", 1.0 / 1073741824.0), ("Bytes", "TB", 1.0 / 1099511627776.0),
    ("KB", "Bytes", 1024.0), ("KB", "MB", 1.0 / 1024.0), ("KB", "GB", 1.0 / 1048576.0), ("KB", "TB", 1.0 / 1073741824.0),
    ("MB", "Bytes", 1048576.0), ("MB", "KB", 1024.0), ("MB", "GB", 1.0 / 1024.0), ("MB", "TB", 1.0 / 1048576.0),
    ("GB", "Bytes", 1073741824.0), ("GB", "KB", 1048576.0), ("GB", "MB", 1024.0), ("GB", "TB", 1.0 / 1024.0),
    ("TB", "Bytes", 1099511627776.0), ("TB", "KB", 1073741824.0), ("TB", "MB", 1048576.0), ("TB", "GB", 1024.0),
];

const SPEED_FACTORS: &[(&str, &str, f64)] = &[
    ("m/s", "km/h", 3.6), ("m/s", "mph", 2.23694),
    ("km/h", "m/s", 1.0 / 3.6), ("km/h", "mph", 0.621371),
    ("mph", "m/s", 0.44704), ("mph", "km/h", 1.60934),
];

const TEMPERATURE_FORMULAS: &[(&str, &str, fn(f64) -> f64)] = &[
    ("Celsius", "Fahrenheit", celsius_to_fahrenheit),
    ("Celsius", "Kelvin", celsius_to_kelvin),
    ("Fahrenheit", "Celsius", fahrenheit_to_celsius),
    ("Fahrenheit", "Kelvin", fahrenheit_to_kelvin),
    ("Kelvin", "Celsius", kelvin_to_celsius),
    ("Kelvin", "Fahrenheit", kelvin_to_fahrenheit),
];

// Sizes in a per-category base unit; only forward pairs get tabled.
const ENERGY_BASE: &[(&str, f64)] = &[
    ("Joule", 1.0),
    ("Kilojoule", 1000.0),
    ("Calorie", 4.184),
    ("Kilocalorie", 4184.0),
    ("Watt-hour", 3600.0),
    ("Kilowatt-hour", 3_600_000.0),
];

const PRESSURE_BASE: &[(&str, f64)] = &[
    ("Pascal", 1.0),
    ("Kilopascal", 1000.0),
    ("Bar", 100_000.0),
    ("PSI", 6894.757),
    ("Atmosphere", 101_325.0),
];

const VOLUME_BASE: &[(&str, f64)] = &[
    ("Liter", 1.0),
    ("Milliliter", 0.001),
    ("Cubic Meter", 1000.0),
    ("Gallon", 3.78541),
    ("Cup", 0.236588),
];

static BUILTIN_TABLE: Lazy<ConversionTable> = Lazy::new(|| {
    let mut table = ConversionTable::new();

    for (category, factors) in [
        (Category::Length, LENGTH_FACTORS),
        (Category::Weight, WEIGHT_FACTORS),
        (Category::Time, TIME_FACTORS),
        (Category::DataStorage, DATA_STORAGE_FACTORS),
        (Category::Speed, SPEED_FACTORS),
    ] {
        for &(from, to, factor) in factors {
            table.insert(category, from, to, ConversionRule::Multiplier(factor));
        }
    }

    for &(from, to, formula) in TEMPERATURE_FORMULAS {
        table.insert(Category::Temperature, from, to, ConversionRule::Affine(formula));
    }

    table.insert_forward_pairs(Category::Energy, ENERGY_BASE);
    table.insert_forward_pairs(Category::Pressure, PRESSURE_BASE);
    table.insert_forward_pairs(Category::Volume, VOLUME_BASE);

    debug!(pairs = table.len(), "built conversion table");
    table
});

// ============================================================================
// Public API
// ============================================================================

/// Resolve against the built-in table. `None` means the conversion is unavailable.
pub fn resolve(category: Category, value: f64, from_unit: &str, to_unit: &str) -> Option<f64> {
    ConversionTable::builtin().resolve(category, value, from_unit, to_unit)
}

/// Like [`resolve`], with the miss reported as [`AppError::ConversionUnavailable`].
pub fn convert_value(category: Category, value: f64, from_unit: &str, to_unit: &str) -> AppResult<f64> {
    resolve(category, value, from_unit, to_unit)
        .ok_or_else(|| AppError::unavailable(category.label(), from_unit, to_unit))
}

/// String-keyed entry point. An unknown category is reported the same way as an
/// unknown pair.
pub fn convert_by_name(category: &str, value: f64, from_unit: &str, to_unit: &str) -> AppResult<f64> {
    let parsed = category
        .parse::<Category>()
        .map_err(|_| AppError::unavailable(category, from_unit, to_unit))?;
    convert_value(parsed, value, from_unit, to_unit)
}

// ============================================================================
// Formatting
// ============================================================================

fn add_thousands_separators(digits: &str) -> String {
    let mut result = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(ch);
    }
    result
}

/// Human-readable number: thousands separators, at most 2 decimals, trailing zeros
/// stripped. Magnitudes below 0.01 keep 4 significant digits in scientific form so
/// small storage conversions do not collapse to 0.
///
/// 130000.0 -> "130,000", 12.5 -> "12.5", 12.567 -> "12.57", 0.000953 -> "9.53e-4"
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value.is_sign_positive() { "∞".to_string() } else { "-∞".to_string() };
    }
    if value != 0.0 && value.abs() < 0.01 {
        let formatted = format!("{:.3e}", value);
        return match formatted.split_once('e') {
            Some((mantissa, exponent)) => {
                let mantissa = mantissa.trim_end_matches('0').trim_end_matches('.');
                format!("{}e{}", mantissa, exponent)
            }
            None => formatted,
        };
    }

    let fixed = format!("{:.2}", value.abs());
    let (integer_part, decimal_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let decimal_part = decimal_part.trim_end_matches('0');
    let sign = if value < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0') { "-" } else { "" };

    if decimal_part.is_empty() {
        format!("{}{}", sign, add_thousands_separators(integer_part))
    } else {
        format!("{}{}.{}", sign, add_thousands_separators(integer_part), decimal_part)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * b.abs().max(1.0)
    }

    #[test]
    fn test_meter_to_kilometer() {
        let result = resolve(Category::Length, 5.0, "Meter", "Kilometer").unwrap();
        assert!(approx(result, 0.005), "got {}", result);
    }

    #[test]
    fn test_kilometer_to_meter() {
        let result = resolve(Category::Length, 5.0, "Kilometer", "Meter").unwrap();
        assert!(approx(result, 5000.0), "got {}", result);
    }

    #[test]
    fn test_temperature_formulas() {
        assert!(approx(resolve(Category::Temperature, 0.0, "Celsius", "Fahrenheit").unwrap(), 32.0));
        assert!(approx(resolve(Category::Temperature, 100.0, "Celsius", "Kelvin").unwrap(), 373.15));
        assert!(approx(resolve(Category::Temperature, 212.0, "Fahrenheit", "Celsius").unwrap(), 100.0));
        assert!(approx(resolve(Category::Temperature, 0.0, "Kelvin", "Celsius").unwrap(), -273.15));
    }

    #[test]
    fn test_unknown_pair_is_not_found() {
        assert_eq!(resolve(Category::Speed, 10.0, "m/s", "furlong/fortnight"), None);
        assert!(convert_value(Category::Speed, 10.0, "m/s", "furlong/fortnight")
            .unwrap_err()
            .is_conversion_unavailable());
    }

    #[test]
    fn test_units_do_not_cross_categories() {
        assert_eq!(resolve(Category::Weight, 1.0, "Meter", "Kilometer"), None);
    }

    #[test]
    fn test_identity_for_known_unit() {
        assert_eq!(resolve(Category::Temperature, 42.0, "Kelvin", "Kelvin"), Some(42.0));
        assert_eq!(resolve(Category::Length, 7.5, "Meter", "Meter"), Some(7.5));
    }

    #[test]
    fn test_identity_requires_unit_in_category() {
        assert_eq!(resolve(Category::Length, 7.5, "Kelvin", "Kelvin"), None);
    }

    #[test]
    fn test_reciprocal_fallback_for_forward_only_categories() {
        let table = ConversionTable::builtin();
        assert!(table.rule(Category::Energy, "Joule", "Kilojoule").is_some());
        assert!(table.rule(Category::Energy, "Kilojoule", "Joule").is_none());

        let result = resolve(Category::Energy, 2.0, "Kilojoule", "Joule").unwrap();
        assert!(approx(result, 2000.0), "got {}", result);

        let forward = resolve(Category::Pressure, 3.0, "Pascal", "Bar").unwrap();
        let back = resolve(Category::Pressure, 1.0, "Bar", "Pascal").unwrap();
        assert!(approx(forward * back, 3.0));
    }

    #[test]
    fn test_reverse_formula_is_not_inverted() {
        let table = ConversionTable::new().with_formula(Category::Temperature, "Celsius", "Fahrenheit", celsius_to_fahrenheit);

        assert_eq!(table.resolve(Category::Temperature, 0.0, "Celsius", "Fahrenheit"), Some(32.0));
        assert_eq!(table.resolve(Category::Temperature, 32.0, "Fahrenheit", "Celsius"), None);
    }

    #[test]
    fn test_table_len() {
        let table = ConversionTable::new();
        assert!(table.is_empty());

        let table = table.with_multiplier(Category::Length, "Meter", "Kilometer", 0.001);
        assert_eq!(table.len(), 1);
        assert!(!table.is_empty());
        assert!(!ConversionTable::builtin().is_empty());
    }

    #[test]
    fn test_direct_entry_wins_over_reciprocal() {
        let table = ConversionTable::new()
            .with_multiplier(Category::Length, "Inch", "Foot", 0.0833333)
            .with_multiplier(Category::Length, "Foot", "Inch", 12.0);

        assert_eq!(table.resolve(Category::Length, 2.0, "Foot", "Inch"), Some(24.0));
    }

    #[test]
    fn test_every_listed_pair_resolves() {
        for category in Category::ALL {
            for from in category.units() {
                for to in category.units() {
                    assert!(
                        resolve(category, 1.0, from, to).is_some(),
                        "{} {} -> {} should resolve",
                        category, from, to
                    );
                }
            }
        }
    }

    #[test]
    fn test_convert_by_name_collapses_unknown_category() {
        let err = convert_by_name("Luminosity", 1.0, "Lux", "Lumen").unwrap_err();
        assert!(err.is_conversion_unavailable());

        let ok = convert_by_name("data storage", 1.0, "KB", "Bytes").unwrap();
        assert_eq!(ok, 1024.0);
    }

    #[test]
    fn test_category_from_str() {
        assert_eq!("Data Storage".parse::<Category>().unwrap(), Category::DataStorage);
        assert_eq!("data_storage".parse::<Category>().unwrap(), Category::DataStorage);
        assert_eq!("data-storage".parse::<Category>().unwrap(), Category::DataStorage);
        assert_eq!("LENGTH".parse::<Category>().unwrap(), Category::Length);
        assert!("furlongs".parse::<Category>().is_err());
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(130000.0), "130,000");
        assert_eq!(format_number(12.5), "12.5");
        assert_eq!(format_number(12.567), "12.57");
        assert_eq!(format_number(-1234.5), "-1,234.5");
        assert_eq!(format_number(0.0), "0");
        assert_eq!(format_number(0.005), "5e-3");
        assert_eq!(format_number(999.999), "1,000");
    }
}
