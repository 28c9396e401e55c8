//! Boundary operations: what the front end calls.
//!
//! These validate raw input, run the resolver and record successful conversions.
//! A failed conversion never touches the history.

use std::path::Path;
use tracing::warn;

use crate::core::features::unit_converter::{self, parse_conversion_query, Category};
use crate::core::history::ConversionHistory;
use crate::shared::error::{AppError, AppResult};
use crate::shared::types::{
    ConversionRecord, ConvertUnitsRequest, ConvertUnitsResponse, ExportHistoryResponse, GetUnitsResponse,
    ParseQueryResponse, RecentConversionsResponse, UnitDTO,
};

fn validate_amount(category: Category, amount: f64) -> AppResult<()> {
    if !amount.is_finite() {
        return Err(AppError::Validation(format!("{} must be a finite number.", category.quantity_name())));
    }
    if amount < 0.0 {
        return Err(AppError::Validation(format!(
            "{} cannot be negative. Please provide a positive value.",
            category.quantity_name()
        )));
    }
    Ok(())
}

/// Convert and, on success, append the conversion to `history`.
pub fn convert_units_command(history: &ConversionHistory, request: ConvertUnitsRequest) -> AppResult<ConvertUnitsResponse> {
    let category = match request.category.parse::<Category>() {
        Ok(category) => category,
        Err(_) => {
            warn!(category = %request.category, "conversion requested for unknown category");
            return Err(AppError::unavailable(request.category, request.from_unit, request.to_unit));
        }
    };
    validate_amount(category, request.amount)?;

    let result = match unit_converter::convert_value(category, request.amount, &request.from_unit, &request.to_unit) {
        Ok(result) => result,
        Err(e) => {
            warn!(%category, from = %request.from_unit, to = %request.to_unit, "conversion not available");
            return Err(e);
        }
    };

    let record = ConversionRecord::new(category, request.amount, request.from_unit, request.to_unit, result);
    let response = ConvertUnitsResponse::from(&record);
    history.append(record)?;
    Ok(response)
}

/// Parse a free-text query such as `5 km to mi`.
pub fn parse_query_command(text: &str) -> AppResult<ParseQueryResponse> {
    let query = parse_conversion_query(text)?;
    Ok(ParseQueryResponse {
        category: query.category,
        amount: query.value,
        from_unit: query.from_unit.to_string(),
        to_unit: query.to_unit.to_string(),
    })
}

/// Parse a free-text query and run it through [`convert_units_command`].
pub fn convert_query_command(history: &ConversionHistory, text: &str) -> AppResult<ConvertUnitsResponse> {
    let parsed = parse_query_command(text)?;
    convert_units_command(
        history,
        ConvertUnitsRequest {
            category: parsed.category.label().to_string(),
            amount: parsed.amount,
            from_unit: parsed.from_unit,
            to_unit: parsed.to_unit,
        },
    )
}

/// Every unit of every category, in catalogue order.
pub fn get_all_units_command() -> GetUnitsResponse {
    let units = Category::ALL
        .into_iter()
        .flat_map(|category| {
            category.units().iter().map(move |unit| UnitDTO {
                id: unit.to_string(),
                category: category.label().to_string(),
            })
        })
        .collect();

    GetUnitsResponse { units }
}

pub fn get_units_for_category(category: &str) -> AppResult<Vec<String>> {
    let category = category.parse::<Category>()?;
    Ok(category.units().iter().map(|s| s.to_string()).collect())
}

/// The last `limit` conversions, oldest first.
pub fn get_recent_conversions(history: &ConversionHistory, limit: usize) -> AppResult<RecentConversionsResponse> {
    let items = history.tail(limit)?;
    let total = history.count()?;
    Ok(RecentConversionsResponse { total, items })
}

pub fn export_history_command(history: &ConversionHistory, dest: &Path) -> AppResult<ExportHistoryResponse> {
    let records = history.export_to(dest)?;
    Ok(ExportHistoryResponse {
        path: dest.display().to_string(),
        records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(category: &str, amount: f64, from: &str, to: &str) -> ConvertUnitsRequest {
        ConvertUnitsRequest {
            category: category.to_string(),
            amount,
            from_unit: from.to_string(),
            to_unit: to.to_string(),
        }
    }

    #[test]
    fn test_successful_conversion_is_recorded() {
        let history = ConversionHistory::in_memory();
        let response = convert_units_command(&history, request("Length", 5.0, "Kilometer", "Meter")).unwrap();

        assert_eq!(response.result, 5000.0);
        assert_eq!(response.formatted_result, "5,000");

        let items = history.load_all().unwrap();
        assert_eq!(items, vec![ConversionRecord::new(Category::Length, 5.0, "Kilometer", "Meter", 5000.0)]);
    }

    #[test]
    fn test_unavailable_conversion_is_not_recorded() {
        let history = ConversionHistory::in_memory();
        let err = convert_units_command(&history, request("Speed", 10.0, "m/s", "furlong/fortnight")).unwrap_err();

        assert!(err.is_conversion_unavailable());
        assert_eq!(history.count().unwrap(), 0);
    }

    #[test]
    fn test_unknown_category_is_unavailable() {
        let history = ConversionHistory::in_memory();
        let err = convert_units_command(&history, request("Luminosity", 1.0, "Lux", "Lumen")).unwrap_err();
        assert!(err.is_conversion_unavailable());
    }

    #[test]
    fn test_negative_and_non_finite_values_rejected() {
        let history = ConversionHistory::in_memory();

        let err = convert_units_command(&history, request("Weight", -1.0, "Kilogram", "Gram")).unwrap_err();
        assert_eq!(
            err,
            AppError::Validation("Weight cannot be negative. Please provide a positive value.".to_string())
        );

        let err = convert_units_command(&history, request("Weight", f64::NAN, "Kilogram", "Gram")).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(history.count().unwrap(), 0);
    }

    #[test]
    fn test_convert_query() {
        let history = ConversionHistory::in_memory();
        let response = convert_query_command(&history, "0 celsius to fahrenheit").unwrap();
        assert_eq!(response.result, 32.0);
        assert_eq!(history.load_all().unwrap()[0].to_unit, "Fahrenheit");
    }

    #[test]
    fn test_recent_conversions() {
        let history = ConversionHistory::in_memory();
        for amount in [1.0, 2.0, 3.0] {
            convert_units_command(&history, request("Time", amount, "Hours", "Minutes")).unwrap();
        }

        let recent = get_recent_conversions(&history, 5).unwrap();
        assert_eq!(recent.total, 3);
        assert_eq!(recent.items.iter().map(|r| r.value).collect::<Vec<_>>(), vec![1.0, 2.0, 3.0]);

        let recent = get_recent_conversions(&history, 1).unwrap();
        assert_eq!(recent.items.len(), 1);
        assert_eq!(recent.items[0].result, 180.0);
    }

    #[test]
    fn test_recent_conversions_with_zero_limit() {
        let history = ConversionHistory::in_memory();
        convert_units_command(&history, request("Time", 1.0, "Hours", "Minutes")).unwrap();

        let recent = get_recent_conversions(&history, 0).unwrap();
        assert!(recent.items.is_empty());
        assert_eq!(recent.total, 1);
    }

    #[test]
    fn test_conversion_appends_after_unknown_category_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conversion_history.csv");
        std::fs::write(&path, "Category,Value,From,To,Result\nArea,1.0,Acre,Hectare,0.404686\n").unwrap();
        let history = ConversionHistory::new(&path);

        let response = convert_units_command(&history, request("Length", 5.0, "Meter", "Kilometer")).unwrap();
        assert_eq!(response.result, 0.005);

        let items = history.load_all().unwrap();
        assert_eq!(
            items,
            vec![
                ConversionRecord::new("Area", 1.0, "Acre", "Hectare", 0.404686),
                ConversionRecord::new(Category::Length, 5.0, "Meter", "Kilometer", 0.005),
            ]
        );

        let recent = get_recent_conversions(&history, 5).unwrap();
        assert_eq!(recent.total, 2);
        assert_eq!(recent.items[0].to_string(), "1.0 Acre ➡ 0.404686 Hectare");
    }

    #[test]
    fn test_unit_catalogue() {
        let all = get_all_units_command();
        assert_eq!(all.units.first(), Some(&UnitDTO { id: "Meter".to_string(), category: "Length".to_string() }));
        assert!(all.units.iter().any(|u| u.id == "TB" && u.category == "Data Storage"));

        assert_eq!(get_units_for_category("speed").unwrap(), vec!["m/s", "km/h", "mph"]);
        assert!(get_units_for_category("furlongs").is_err());
    }
}
