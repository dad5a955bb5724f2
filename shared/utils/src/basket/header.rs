use lcm_models::{Cell, Currency, Sheet};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use super::rules::{contains_any, ColumnField, RuleSet};
use crate::validation::normalize_text;

/// Best-scoring header candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderMatch {
    pub row: usize,
    pub score: usize,
}

/// Why no header was accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderMiss {
    pub scanned_rows: usize,
    pub best_score: usize,
}

/// Scores the first rows of a sheet as header candidates
#[derive(Debug, Clone)]
pub struct HeaderLocator<'r> {
    keywords: &'r [String],
    min_score: usize,
    scan_rows: usize,
}

impl<'r> HeaderLocator<'r> {
    pub fn new(rules: &'r RuleSet) -> Self {
        Self {
            keywords: rules.header_keywords(),
            min_score: rules.min_header_score(),
            scan_rows: rules.header_scan_rows(),
        }
    }

    pub fn min_score(&self) -> usize {
        self.min_score
    }

    /// Number of cells in `row` whose text contains a header keyword
    pub fn score(&self, row: &[Cell]) -> usize {
        row.iter()
            .filter_map(Cell::as_text)
            .filter(|text| contains_any(&normalize_text(text), self.keywords))
            .count()
    }

    /// Highest-scoring row among the first `scan_rows`; ties keep the earlier row
    pub fn locate(&self, sheet: &Sheet) -> Result<HeaderMatch, HeaderMiss> {
        let scanned_rows = sheet.row_count().min(self.scan_rows);
        let mut best: Option<HeaderMatch> = None;

        for (row, cells) in sheet.rows.iter().take(scanned_rows).enumerate() {
            let score = self.score(cells);
            if best.map_or(true, |b| score > b.score) {
                best = Some(HeaderMatch { row, score });
            }
        }

        match best {
            Some(found) if found.score >= self.min_score => Ok(found),
            _ => Err(HeaderMiss {
                scanned_rows,
                best_score: best.map_or(0, |b| b.score),
            }),
        }
    }
}

/// Logical field to physical column index, resolved once per sheet
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnMap {
    columns: BTreeMap<ColumnField, usize>,
}

impl ColumnMap {
    /// Binds header cells to fields through the vendor aliases.
    ///
    /// Fields claim columns in [`ColumnField::RESOLUTION_ORDER`]. For each
    /// field an exact alias match wins over a substring match, and a column
    /// already claimed by an earlier field is never reused.
    pub fn resolve(header: &[Cell], aliases: &BTreeMap<ColumnField, Vec<String>>) -> Self {
        let headers: Vec<Option<String>> = header
            .iter()
            .map(|cell| cell.as_text().map(|t| normalize_text(&t)))
            .collect();

        let mut claimed = BTreeSet::new();
        let mut columns = BTreeMap::new();

        for field in ColumnField::RESOLUTION_ORDER {
            let Some(field_aliases) = aliases.get(&field) else {
                continue;
            };

            let unclaimed = || {
                headers
                    .iter()
                    .enumerate()
                    .filter(|(idx, _)| !claimed.contains(idx))
                    .filter_map(|(idx, text)| text.as_deref().map(|t| (idx, t)))
            };

            let exact = unclaimed().find(|(_, text)| field_aliases.iter().any(|a| a.as_str() == *text));
            let found = exact.or_else(|| {
                unclaimed().find(|(_, text)| field_aliases.iter().any(|a| text.contains(a.as_str())))
            });

            if let Some((idx, _)) = found {
                claimed.insert(idx);
                columns.insert(field, idx);
            }
        }

        Self { columns }
    }

    pub fn get(&self, field: ColumnField) -> Option<usize> {
        self.columns.get(&field).copied()
    }

    pub fn contains(&self, field: ColumnField) -> bool {
        self.columns.contains_key(&field)
    }

    /// Resolved price columns with their implied currency, in priority order
    pub fn price_columns(&self) -> Vec<(usize, Option<Currency>)> {
        ColumnField::PRICE_FIELDS
            .iter()
            .filter_map(|field| self.get(*field).map(|idx| (idx, field.currency())))
            .collect()
    }

    pub fn has_description(&self) -> bool {
        self.contains(ColumnField::Description) || self.contains(ColumnField::LotDescription)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
