use lcm_models::{Cell, Currency, Money};
use once_cell::sync::Lazy;
use regex::Regex;

use super::header::ColumnMap;
use super::price::PriceExtractor;
use super::rules::{ColumnField, RuleSet};
use crate::validation::normalize_text;

static QUANTITY_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(\d{1,3})\s*x\s+").expect("quantity prefix pattern"));

/// Classification of one data row
#[derive(Debug, Clone, PartialEq)]
pub enum RowClass {
    /// `price` is the first parsed price; `prices` holds every one found
    LotHeader {
        price: Option<Money>,
        prices: Vec<Money>,
    },
    ServerDescription,
    ComponentLine,
    Blank,
}

impl RowClass {
    pub fn name(&self) -> &'static str {
        match self {
            Self::LotHeader { .. } => "lot_header",
            Self::ServerDescription => "server_description",
            Self::ComponentLine => "component_line",
            Self::Blank => "blank",
        }
    }
}

/// Cells of one row read through the column map
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowView<'s> {
    pub index: usize,
    pub part_number: Option<String>,
    /// Lot description column when filled, else the description column
    pub description: Option<String>,
    pub item_type: Option<String>,
    pub quantity: Option<f64>,
    /// `(cell, column currency)` per resolved price column, in priority order
    pub price_cells: Vec<(&'s Cell, Option<Currency>)>,
}

impl<'s> RowView<'s> {
    pub fn is_blank(&self) -> bool {
        self.description.is_none() && self.part_number.is_none()
    }

    /// Item label and description joined, for keyword matching
    pub fn classification_text(&self) -> String {
        match (&self.item_type, &self.description) {
            (Some(item), Some(desc)) => format!("{} {}", item, desc),
            (Some(item), None) => item.clone(),
            (None, Some(desc)) => desc.clone(),
            (None, None) => String::new(),
        }
    }

    /// Quantity column, else a leading `N x` multiplier, else 1
    pub fn quantity(&self) -> u32 {
        if let Some(q) = self.quantity.filter(|q| *q >= 1.0 && *q <= u32::MAX as f64) {
            return q.round() as u32;
        }
        self.description
            .as_deref()
            .and_then(|d| QUANTITY_PREFIX.captures(d))
            .and_then(|caps| caps[1].parse().ok())
            .filter(|q| *q >= 1)
            .unwrap_or(1)
    }
}

/// Classifies data rows as lot headers, server descriptions, component
/// lines or blanks
#[derive(Debug, Clone)]
pub struct RowClassifier<'r> {
    rules: &'r RuleSet,
    columns: &'r ColumnMap,
    prices: PriceExtractor,
}

impl<'r> RowClassifier<'r> {
    pub fn new(rules: &'r RuleSet, columns: &'r ColumnMap) -> Self {
        Self {
            rules,
            columns,
            prices: PriceExtractor::new(rules.currency()),
        }
    }

    pub fn read<'s>(&self, index: usize, row: &'s [Cell]) -> RowView<'s> {
        static EMPTY: Cell = Cell::Empty;
        let cell = |field: ColumnField| -> &'s Cell {
            self.columns
                .get(field)
                .and_then(|idx| row.get(idx))
                .unwrap_or(&EMPTY)
        };

        let description = cell(ColumnField::LotDescription)
            .as_text()
            .or_else(|| cell(ColumnField::Description).as_text());

        RowView {
            index,
            part_number: cell(ColumnField::PartNumber).as_text(),
            description,
            item_type: cell(ColumnField::ItemType).as_text(),
            quantity: cell(ColumnField::Quantity).as_number(),
            price_cells: self
                .columns
                .price_columns()
                .into_iter()
                .map(|(idx, currency)| (row.get(idx).unwrap_or(&EMPTY), currency))
                .collect(),
        }
    }

    pub fn classify(&self, row: &RowView<'_>) -> RowClass {
        if row.is_blank() {
            return RowClass::Blank;
        }

        let description = row
            .description
            .as_deref()
            .map(normalize_text)
            .unwrap_or_default();

        let has_price_cell = row.price_cells.iter().any(|(cell, _)| !cell.is_blank());
        if has_price_cell && self.rules.is_lot_signal(&description, row.part_number.as_deref()) {
            let prices: Vec<Money> = row
                .price_cells
                .iter()
                .filter_map(|(cell, currency)| self.prices.extract(cell, *currency))
                .collect();
            return RowClass::LotHeader {
                price: prices.first().copied(),
                prices,
            };
        }

        if self.rules.is_server_description(&description) {
            return RowClass::ServerDescription;
        }

        RowClass::ComponentLine
    }

    pub fn read_and_classify<'s>(&self, index: usize, row: &'s [Cell]) -> (RowView<'s>, RowClass) {
        let view = self.read(index, row);
        let class = self.classify(&view);
        (view, class)
    }
}
