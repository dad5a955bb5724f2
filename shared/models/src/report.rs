//! Completion report: how much of a basket the extraction rules populated.
//!
//! Purely derived from a `Basket` plus the row counters gathered while
//! grouping. Never authoritative state.

use serde::{Deserialize, Serialize};

use crate::hardware::{Basket, HardwareModel};

/// Fields measured per hardware model, in report order
pub const MODEL_FIELDS: [&str; 10] = [
    "lot_description",
    "model_name",
    "model_number",
    "category",
    "form_factor",
    "price",
    "processor_info",
    "ram_info",
    "network_info",
    "storage_info",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldCompletion {
    pub field: String,
    pub filled: usize,
    pub total: usize,
}

impl FieldCompletion {
    /// Fill percentage; an empty population counts as complete
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.filled as f64 / self.total as f64 * 100.0
        }
    }

    pub fn missing(&self) -> usize {
        self.total - self.filled
    }
}

/// Counters collected while classifying and grouping rows
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowStatistics {
    pub data_rows: usize,
    pub lot_headers: usize,
    pub server_descriptions: usize,
    pub component_lines: usize,
    pub blank_rows: usize,
    /// Non-lot rows seen before the first lot header
    pub skipped_before_first_lot: usize,
    /// Lot header rows whose price cell held no usable amount
    pub absent_lot_prices: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionReport {
    pub total_models: usize,
    pub fields: Vec<FieldCompletion>,
    pub components: FieldCompletion,
    pub specifications: FieldCompletion,
    pub rows: RowStatistics,
}

impl CompletionReport {
    pub fn from_basket(basket: &Basket, rows: RowStatistics) -> Self {
        let total = basket.models.len();
        let fields = MODEL_FIELDS
            .iter()
            .map(|field| FieldCompletion {
                field: field.to_string(),
                filled: basket.models.iter().filter(|m| is_filled(m, field)).count(),
                total,
            })
            .collect();

        let all_components = basket.models.iter().flat_map(|m| m.components.iter());
        let component_total = basket.total_components();
        let typed = all_components.clone().filter(|c| !c.is_generic()).count();
        let specified = all_components.filter(|c| !c.specification.is_empty()).count();

        Self {
            total_models: total,
            fields,
            components: FieldCompletion {
                field: "component_type".to_string(),
                filled: typed,
                total: component_total,
            },
            specifications: FieldCompletion {
                field: "specification".to_string(),
                filled: specified,
                total: component_total,
            },
            rows,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldCompletion> {
        self.fields.iter().find(|f| f.field == name)
    }

    /// Mean fill percentage across the per-model fields
    pub fn overall_percentage(&self) -> f64 {
        if self.fields.is_empty() {
            return 100.0;
        }
        self.fields.iter().map(FieldCompletion::percentage).sum::<f64>() / self.fields.len() as f64
    }

    /// Fields below the given fill percentage
    pub fn incomplete_fields(&self, threshold: f64) -> Vec<&FieldCompletion> {
        self.fields
            .iter()
            .filter(|f| f.percentage() < threshold)
            .collect()
    }
}

fn is_filled(model: &HardwareModel, field: &str) -> bool {
    fn present(value: &Option<String>) -> bool {
        value.as_deref().map_or(false, |v| !v.trim().is_empty())
    }

    match field {
        "lot_description" => !model.lot_description.trim().is_empty(),
        "model_name" => present(&model.model_name),
        "model_number" => present(&model.model_number),
        "category" => !model.category.trim().is_empty(),
        "form_factor" => present(&model.form_factor),
        "price" => model.price.is_some(),
        "processor_info" => present(&model.processor_info),
        "ram_info" => present(&model.ram_info),
        "network_info" => present(&model.network_info),
        "storage_info" => present(&model.storage_info),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::BasketSource;
    use crate::money::Money;
    use rust_decimal::Decimal;

    fn basket(models: Vec<HardwareModel>) -> Basket {
        Basket {
            vendor: "Lenovo".into(),
            quarter: None,
            year: None,
            source: BasketSource {
                file_name: "basket.xlsx".into(),
                sheet_name: "Lots".into(),
            },
            models,
        }
    }

    fn model(row: usize, price: Option<Money>) -> HardwareModel {
        let source = BasketSource {
            file_name: "basket.xlsx".into(),
            sheet_name: "Lots".into(),
        };
        let mut m = HardwareModel::seed(&source, "Lenovo", row, "SMI1", None, price.into_iter().collect());
        m.category = "Server".into();
        m
    }

    #[test]
    fn test_price_completion_counts_absent_prices() {
        let b = basket(vec![
            model(1, Some(Money::usd(Decimal::new(2850, 0)))),
            model(5, None),
        ]);
        let report = CompletionReport::from_basket(&b, RowStatistics::default());

        let price = report.field("price").unwrap();
        assert_eq!(price.filled, 1);
        assert_eq!(price.total, 2);
        assert_eq!(price.missing(), 1);
        assert_eq!(price.percentage(), 50.0);
        assert_eq!(report.field("category").unwrap().filled, 2);
        assert!(report
            .incomplete_fields(100.0)
            .iter()
            .any(|f| f.field == "price"));
    }

    #[test]
    fn test_empty_basket_is_complete() {
        let report = CompletionReport::from_basket(&basket(vec![]), RowStatistics::default());
        assert_eq!(report.total_models, 0);
        assert_eq!(report.overall_percentage(), 100.0);
        assert_eq!(report.components.total, 0);
    }
}
