use lcm_models::{Basket, BasketSource, CompletionReport, Quarter, Sheet};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::grouper::ModelGrouper;
use super::header::{ColumnMap, HeaderLocator};
use super::row::RowClassifier;
use super::rules::{ColumnField, RuleSet};
use crate::error::{AssemblyError, LcmError, LcmResult};
use crate::workbook::Workbook;

// `_` is a word character, so `\b` cannot delimit tokens in names like `dell_q1_2024`
static QUARTER_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|[^a-z0-9])Q([1-4])[\s_\-]*((?:19|20)\d{2})(?:$|\D)").expect("quarter/year pattern")
});
static YEAR_QUARTER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|\D)((?:19|20)\d{2})[\s_\-]*Q([1-4])(?:$|\D)").expect("year/quarter pattern")
});
static YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|\D)((?:19|20)\d{2})(?:$|\D)").expect("year pattern"));

/// A basket and its completion report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssembledBasket {
    pub basket: Basket,
    pub report: CompletionReport,
}

/// Turns one vendor sheet into a [`Basket`]. Cheap to clone; the compiled
/// rules are shared.
#[derive(Debug, Clone)]
pub struct BasketAssembler {
    rules: Arc<RuleSet>,
}

impl BasketAssembler {
    pub fn new(rules: Arc<RuleSet>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn vendor(&self) -> &str {
        self.rules.vendor()
    }

    pub fn assemble(&self, sheet: &Sheet, file_name: &str) -> Result<AssembledBasket, AssemblyError> {
        let span = tracing::info_span!("assemble", vendor = self.vendor(), sheet = %sheet.name);
        let _guard = span.enter();

        if sheet.is_empty() {
            tracing::warn!("Sheet is empty");
            return Err(AssemblyError::EmptySheet {
                sheet: sheet.name.clone(),
            });
        }

        let locator = HeaderLocator::new(&self.rules);
        let header = locator.locate(sheet).map_err(|miss| {
            tracing::warn!(best_score = miss.best_score, "No header row found");
            AssemblyError::HeaderNotFound {
                sheet: sheet.name.clone(),
                scanned_rows: miss.scanned_rows,
                best_score: miss.best_score,
                min_score: locator.min_score(),
            }
        })?;

        let header_cells = sheet.row(header.row).unwrap_or_default();
        let columns = ColumnMap::resolve(header_cells, self.rules.column_aliases());
        self.require_columns(sheet, header.row, &columns)?;
        tracing::debug!(header_row = header.row, score = header.score, ?columns, "Header resolved");

        let source = BasketSource {
            file_name: file_name.to_string(),
            sheet_name: sheet.name.clone(),
        };
        let classifier = RowClassifier::new(&self.rules, &columns);
        let mut grouper = ModelGrouper::new(&self.rules, &source);

        for (index, cells) in sheet.rows.iter().enumerate().skip(header.row + 1) {
            let (view, class) = classifier.read_and_classify(index, cells);
            grouper.consume(&view, class);
        }

        let (models, stats) = grouper.finish();
        let (quarter, year) = parse_period(file_name);
        let basket = Basket {
            vendor: self.vendor().to_string(),
            quarter,
            year,
            source,
            models,
        };
        let report = CompletionReport::from_basket(&basket, stats);

        tracing::info!(
            models = report.total_models,
            components = report.components.total,
            completion_pct = report.overall_percentage(),
            "Basket assembled"
        );

        Ok(AssembledBasket { basket, report })
    }

    fn require_columns(
        &self,
        sheet: &Sheet,
        header_row: usize,
        columns: &ColumnMap,
    ) -> Result<(), AssemblyError> {
        let missing = if !columns.has_description() {
            Some(ColumnField::Description)
        } else if columns.price_columns().is_empty() {
            Some(ColumnField::Price)
        } else {
            None
        };

        match missing {
            Some(field) => {
                tracing::warn!(field = field.as_str(), "Required column missing");
                Err(AssemblyError::MissingRequiredColumn {
                    sheet: sheet.name.clone(),
                    field: field.as_str().to_string(),
                    header_row,
                })
            }
            None => Ok(()),
        }
    }

    /// Assembles the tabs this vendor prices lots on, or every tab when
    /// none of them is named in the rules
    pub fn assemble_workbook(
        &self,
        workbook: &Workbook,
    ) -> Vec<(String, Result<AssembledBasket, AssemblyError>)> {
        let selected: Vec<&Sheet> = workbook
            .sheets
            .iter()
            .filter(|sheet| self.rules.selects_sheet(&sheet.name))
            .collect();

        let sheets = if selected.is_empty() {
            workbook.sheets.iter().collect()
        } else {
            selected
        };

        sheets
            .into_iter()
            .map(|sheet| (sheet.name.clone(), self.assemble(sheet, &workbook.file_name)))
            .collect()
    }
}

/// One independent unit of work for [`assemble_concurrently`]
#[derive(Debug, Clone)]
pub struct AssemblyJob {
    pub assembler: BasketAssembler,
    pub sheet: Sheet,
    pub file_name: String,
}

/// Runs jobs on the blocking pool, at most `max_concurrent` at a time.
/// Results come back in job order.
pub async fn assemble_concurrently(
    jobs: Vec<AssemblyJob>,
    max_concurrent: usize,
) -> Vec<LcmResult<AssembledBasket>> {
    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let mut tasks = JoinSet::new();
    let total = jobs.len();

    for (index, job) in jobs.into_iter().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            let result = match semaphore.acquire_owned().await {
                Ok(_permit) => tokio::task::spawn_blocking(move || {
                    job.assembler.assemble(&job.sheet, &job.file_name)
                })
                .await
                .map_err(|e| LcmError::internal(format!("assembly task failed: {}", e)))
                .and_then(|r| r.map_err(LcmError::from)),
                Err(e) => Err(LcmError::internal(format!("semaphore closed: {}", e))),
            };
            (index, result)
        });
    }

    let mut results: Vec<Option<LcmResult<AssembledBasket>>> = (0..total).map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, result)) => results[index] = Some(result),
            Err(e) => tracing::error!(error = %e, "Assembly task panicked"),
        }
    }

    results
        .into_iter()
        .map(|r| r.unwrap_or_else(|| Err(LcmError::internal("assembly task did not complete"))))
        .collect()
}

/// Quarter and year named in a file name such as `Lenovo Q3 2025.xlsx`
pub fn parse_period(file_name: &str) -> (Option<Quarter>, Option<i32>) {
    if let Some(caps) = QUARTER_YEAR.captures(file_name) {
        return (
            caps[1].parse().ok().and_then(Quarter::from_number),
            caps[2].parse().ok(),
        );
    }
    if let Some(caps) = YEAR_QUARTER.captures(file_name) {
        return (
            caps[2].parse().ok().and_then(Quarter::from_number),
            caps[1].parse().ok(),
        );
    }
    (None, YEAR.captures(file_name).and_then(|caps| caps[1].parse().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basket::rules::VendorRegistry;
    use lcm_models::Cell;

    fn lenovo() -> BasketAssembler {
        VendorRegistry::builtin().unwrap().assembler("lenovo").unwrap()
    }

    fn sheet(rows: &[&[&str]]) -> Sheet {
        Sheet::new(
            "Lenovo X86 Server Lots",
            rows.iter()
                .map(|r| r.iter().map(|c| Cell::from(*c)).collect())
                .collect(),
        )
    }

    #[test]
    fn test_empty_sheet() {
        let err = lenovo().assemble(&sheet(&[&["", " "]]), "x.xlsx").unwrap_err();
        assert_eq!(err.error_code(), "EMPTY_SHEET");
    }

    #[test]
    fn test_missing_price_column() {
        let err = lenovo()
            .assemble(
                &sheet(&[&["Part number", "Description", "Quantity"], &["", "SMI1 Rack Server", "1"]]),
                "x.xlsx",
            )
            .unwrap_err();
        assert_eq!(
            err,
            AssemblyError::MissingRequiredColumn {
                sheet: "Lenovo X86 Server Lots".to_string(),
                field: "price".to_string(),
                header_row: 0,
            }
        );
    }

    #[test]
    fn test_missing_description_column() {
        let err = lenovo()
            .assemble(
                &sheet(&[&["Part number", "Quantity", "Price in USD"], &["7D73CTO1WW", "1", "2850.00"]]),
                "x.xlsx",
            )
            .unwrap_err();
        assert_eq!(err.error_code(), "MISSING_REQUIRED_COLUMN");
        assert_eq!(
            err,
            AssemblyError::MissingRequiredColumn {
                sheet: "Lenovo X86 Server Lots".to_string(),
                field: "description".to_string(),
                header_row: 0,
            }
        );
    }

    #[test]
    fn test_basket_carries_source_and_period() {
        let assembled = lenovo()
            .assemble(
                &sheet(&[
                    &["Part number", "Description", "Qty", "Price in USD"],
                    &["", "SMI1 Rack Server", "", "1000"],
                ]),
                "Lenovo Server Lots Q3 2025.xlsx",
            )
            .unwrap();

        assert_eq!(assembled.basket.vendor, "Lenovo");
        assert_eq!(assembled.basket.quarter, Some(Quarter::Q3));
        assert_eq!(assembled.basket.year, Some(2025));
        assert_eq!(assembled.basket.source.sheet_name, "Lenovo X86 Server Lots");
        assert_eq!(assembled.report.total_models, 1);
        assert_eq!(assembled.report.rows.lot_headers, 1);
    }

    #[test]
    fn test_parse_period_variants() {
        assert_eq!(parse_period("dell_q1_2024.csv"), (Some(Quarter::Q1), Some(2024)));
        assert_eq!(parse_period("2025-Q4 pricing.xlsx"), (Some(Quarter::Q4), Some(2025)));
        assert_eq!(parse_period("pricing 2023.xlsx"), (None, Some(2023)));
        assert_eq!(parse_period("pricing.xlsx"), (None, None));
    }

    #[test]
    fn test_workbook_sheet_selection() {
        let lots = sheet(&[
            &["Part number", "Description", "Qty", "Price in USD"],
            &["", "SMI1 Rack Server", "", "1000"],
        ]);
        let mut parts = lots.clone();
        parts.name = "Lenovo X86 Parts".to_string();

        let workbook = Workbook {
            file_name: "lenovo.xlsx".to_string(),
            format: crate::workbook::WorkbookFormat::Excel,
            sheets: vec![parts, lots],
        };
        let results = lenovo().assemble_workbook(&workbook);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, "Lenovo X86 Server Lots");
        assert!(results[0].1.is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_results_keep_job_order() {
        let assembler = lenovo();
        let good = sheet(&[
            &["Part number", "Description", "Qty", "Price in USD"],
            &["", "SMI1 Rack Server", "", "1000"],
        ]);
        let jobs = vec![
            AssemblyJob {
                assembler: assembler.clone(),
                sheet: good.clone(),
                file_name: "a.xlsx".to_string(),
            },
            AssemblyJob {
                assembler: assembler.clone(),
                sheet: sheet(&[&[""]]),
                file_name: "b.xlsx".to_string(),
            },
            AssemblyJob {
                assembler,
                sheet: good,
                file_name: "c.xlsx".to_string(),
            },
        ];

        let results = assemble_concurrently(jobs, 2).await;
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().basket.source.file_name, "a.xlsx");
        assert_eq!(results[1].as_ref().unwrap_err().error_code(), "EMPTY_SHEET");
        assert_eq!(results[2].as_ref().unwrap().basket.source.file_name, "c.xlsx");
    }
}
