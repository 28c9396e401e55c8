//! Free-text conversion queries such as `5 km to mi` or `100°F in celsius`.

use super::Category;
use crate::shared::error::{AppError, AppResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

const ERR_EMPTY_QUERY: &str = "Empty conversion query";
const ERR_CANNOT_PARSE_QUERY: &str = "Could not parse conversion query";
const ERR_INVALID_NUMBER: &str = "Invalid number";

/// A query resolved down to canonical unit labels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionQuery {
    pub category: Category,
    pub value: f64,
    pub from_unit: &'static str,
    pub to_unit: &'static str,
}

// Using expect is safe here since these are compile-time constant patterns
static RE_QUERY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*([+-]?\d+(?:[.,]\d+)*)\s*(.+?)\s+(?:to|in|into|as|->)\s+(.+?)\s*$")
        .expect("Failed to compile conversion query pattern")
});

/// Map a unit alias (case-insensitive) to its category and canonical label.
pub fn normalize_unit(unit: &str) -> Option<(Category, &'static str)> {
    let unit_lower = unit.trim().to_lowercase();
    let canonical = match unit_lower.as_str() {
        // Length
        "m" | "meter" | "meters" | "metre" | "metres" => (Category::Length, "Meter"),
        "km" | "kilometer" | "kilometers" | "kilometre" | "kilometres" => (Category::Length, "Kilometer"),
        "mi" | "mile" | "miles" => (Category::Length, "Mile"),
        "ft" | "foot" | "feet" | "'" => (Category::Length, "Foot"),
        "in" | "inch" | "inches" | "\"" => (Category::Length, "Inch"),
        // Weight
        "kg" | "kilogram" | "kilograms" => (Category::Weight, "Kilogram"),
        "g" | "gram" | "grams" => (Category::Weight, "Gram"),
        "lb" | "lbs" | "pound" | "pounds" => (Category::Weight, "Pound"),
        "oz" | "ounce" | "ounces" => (Category::Weight, "Ounce"),
        // Temperature
        "c" | "°c" | "celsius" => (Category::Temperature, "Celsius"),
        "f" | "°f" | "fahrenheit" => (Category::Temperature, "Fahrenheit"),
        "k" | "kelvin" => (Category::Temperature, "Kelvin"),
        // Time
        "s" | "sec" | "secs" | "second" | "seconds" => (Category::Time, "Seconds"),
        "min" | "mins" | "minute" | "minutes" => (Category::Time, "Minutes"),
        "h" | "hr" | "hrs" | "hour" | "hours" => (Category::Time, "Hours"),
        "d" | "day" | "days" => (Category::Time, "Days"),
        "wk" | "wks" | "week" | "weeks" => (Category::Time, "Weeks"),
        // Data Storage
        "b" | "byte" | "bytes" => (Category::DataStorage, "Bytes"),
        "kb" | "kilobyte" | "kilobytes" => (Category::DataStorage, "KB"),
        "mb" | "megabyte" | "megabytes" => (Category::DataStorage, "MB"),
        "gb" | "gigabyte" | "gigabytes" => (Category::DataStorage, "GB"),
        "tb" | "terabyte" | "terabytes" => (Category::DataStorage, "TB"),
        // Speed
        "m/s" | "mps" | "meters per second" => (Category::Speed, "m/s"),
        "km/h" | "kmh" | "kph" | "kilometers per hour" => (Category::Speed, "km/h"),
        "mph" | "miles per hour" => (Category::Speed, "mph"),
        // Energy
        "j" | "joule" | "joules" => (Category::Energy, "Joule"),
        "kj" | "kilojoule" | "kilojoules" => (Category::Energy, "Kilojoule"),
        "cal" | "calorie" | "calories" => (Category::Energy, "Calorie"),
        "kcal" | "kilocalorie" | "kilocalories" => (Category::Energy, "Kilocalorie"),
        "wh" | "watt-hour" | "watt-hours" => (Category::Energy, "Watt-hour"),
        "kwh" | "kilowatt-hour" | "kilowatt-hours" => (Category::Energy, "Kilowatt-hour"),
        // Pressure
        "pa" | "pascal" | "pascals" => (Category::Pressure, "Pascal"),
        "kpa" | "kilopascal" | "kilopascals" => (Category::Pressure, "Kilopascal"),
        "bar" | "bars" => (Category::Pressure, "Bar"),
        "psi" => (Category::Pressure, "PSI"),
        "atm" | "atmosphere" | "atmospheres" => (Category::Pressure, "Atmosphere"),
        // Volume
        "l" | "liter" | "liters" | "litre" | "litres" => (Category::Volume, "Liter"),
        "ml" | "milliliter" | "milliliters" | "millilitre" | "millilitres" => (Category::Volume, "Milliliter"),
        "m3" | "m³" | "cubic meter" | "cubic meters" => (Category::Volume, "Cubic Meter"),
        "gal" | "gallon" | "gallons" => (Category::Volume, "Gallon"),
        "cup" | "cups" => (Category::Volume, "Cup"),
        _ => return None,
    };
    Some(canonical)
}

/// Parse the leading number of a query.
///
/// A comma followed by exactly three digits groups thousands (`1,000`, `12,500.5`).
/// A single comma in any other position is a decimal separator (`2,5`). A comma
/// after the decimal point is rejected.
fn parse_amount(raw: &str) -> AppResult<f64> {
    let invalid = || AppError::Validation(format!("{} '{}'", ERR_INVALID_NUMBER, raw));

    let (int_part, frac_part) = match raw.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (raw, None),
    };
    if frac_part.is_some_and(|f| f.contains(',')) {
        return Err(invalid());
    }

    let groups: Vec<&str> = int_part.split(',').collect();
    let leading_digits = groups[0].trim_start_matches(['+', '-']).len();
    let normalized = if groups.len() == 1 {
        raw.to_string()
    } else if leading_digits <= 3 && groups[1..].iter().all(|g| g.len() == 3) {
        match frac_part {
            Some(frac) => format!("{}.{}", groups.concat(), frac),
            None => groups.concat(),
        }
    } else if groups.len() == 2 && frac_part.is_none() {
        format!("{}.{}", groups[0], groups[1])
    } else {
        return Err(invalid());
    };

    normalized
        .parse::<f64>()
        .map_err(|e| AppError::Validation(format!("{} '{}': {}", ERR_INVALID_NUMBER, raw, e)))
}

/// Parse `"<number> <unit> to <unit>"` (also `in`, `into`, `as`, `->`).
///
/// Commas in the number are read by `parse_amount`. Both units must belong to
/// the same category.
pub fn parse_conversion_query(text: &str) -> AppResult<ConversionQuery> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::Validation(ERR_EMPTY_QUERY.to_string()));
    }

    let caps = RE_QUERY
        .captures(text)
        .ok_or_else(|| AppError::Validation(format!("{}: {}", ERR_CANNOT_PARSE_QUERY, text)))?;

    let value = parse_amount(&caps[1])?;

    let (from_category, from_unit) = normalize_unit(&caps[2])
        .ok_or_else(|| AppError::Validation(format!("Unknown unit: {}", &caps[2])))?;
    let (to_category, to_unit) = normalize_unit(&caps[3])
        .ok_or_else(|| AppError::Validation(format!("Unknown unit: {}", &caps[3])))?;

    if from_category != to_category {
        return Err(AppError::Validation(format!(
            "Cannot convert between {} and {} (incompatible categories)",
            from_category, to_category
        )));
    }

    debug!(value, from_unit, to_unit, category = %from_category, "parsed conversion query");

    Ok(ConversionQuery {
        category: from_category,
        value,
        from_unit,
        to_unit,
    })
}
