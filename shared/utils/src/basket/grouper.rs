//! Row grouping state machine.
//!
//! Consumes classified rows in sheet order and emits one [`HardwareModel`]
//! per lot. The accumulator is owned by the grouper, so each sheet parse has
//! its own and nothing is shared between parses.

use lcm_models::{
    Attribute, BasketSource, ComponentLine, ComponentType, HardwareModel, Money, RowStatistics,
};
use once_cell::sync::Lazy;
use regex::Regex;

use super::row::{RowClass, RowView};
use super::rules::RuleSet;
use super::spec::SpecExtractor;

static RACK_UNIT_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b([1-8])\s*U\b").expect("rack unit pattern"));

/// Grouper states
#[derive(Debug)]
pub enum GrouperState {
    /// No lot seen yet
    Idle,
    /// Collecting rows into the current model
    Accumulating(Box<HardwareModel>),
}

impl GrouperState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Accumulating(_) => "accumulating",
        }
    }
}

pub struct ModelGrouper<'r> {
    rules: &'r RuleSet,
    source: &'r BasketSource,
    specs: SpecExtractor,
    state: GrouperState,
    finished: Vec<HardwareModel>,
    stats: RowStatistics,
}

impl<'r> ModelGrouper<'r> {
    pub fn new(rules: &'r RuleSet, source: &'r BasketSource) -> Self {
        Self {
            rules,
            source,
            specs: SpecExtractor,
            state: GrouperState::Idle,
            finished: Vec::new(),
            stats: RowStatistics::default(),
        }
    }

    pub fn state(&self) -> &GrouperState {
        &self.state
    }

    /// Models finalized so far
    pub fn finished(&self) -> &[HardwareModel] {
        &self.finished
    }

    pub fn consume(&mut self, row: &RowView<'_>, class: RowClass) {
        use GrouperState::*;

        self.stats.data_rows += 1;
        match &class {
            RowClass::LotHeader { .. } => self.stats.lot_headers += 1,
            RowClass::ServerDescription => self.stats.server_descriptions += 1,
            RowClass::ComponentLine => self.stats.component_lines += 1,
            RowClass::Blank => self.stats.blank_rows += 1,
        }

        tracing::debug!(
            row = row.index,
            class = class.name(),
            state = self.state.name(),
            "Row classified"
        );

        let state = std::mem::replace(&mut self.state, Idle);
        self.state = match (state, class) {
            (Idle, RowClass::LotHeader { prices, .. }) => Accumulating(Box::new(self.seed(row, prices))),
            (Idle, RowClass::Blank) => Idle,
            (Idle, _) => {
                self.stats.skipped_before_first_lot += 1;
                Idle
            }

            (Accumulating(current), RowClass::LotHeader { prices, .. }) => {
                self.finalize(*current);
                Accumulating(Box::new(self.seed(row, prices)))
            }
            (Accumulating(mut current), RowClass::ServerDescription) => {
                self.apply_server_description(&mut current, row);
                Accumulating(current)
            }
            (Accumulating(mut current), RowClass::ComponentLine) => {
                self.append_component(&mut current, row);
                Accumulating(current)
            }
            (Accumulating(current), RowClass::Blank) => Accumulating(current),
        };
    }

    /// Ends the input: finalizes any open model
    pub fn finish(mut self) -> (Vec<HardwareModel>, RowStatistics) {
        if let GrouperState::Accumulating(current) =
            std::mem::replace(&mut self.state, GrouperState::Idle)
        {
            self.finalize(*current);
        }
        (self.finished, self.stats)
    }

    fn seed(&mut self, row: &RowView<'_>, prices: Vec<Money>) -> HardwareModel {
        if prices.is_empty() {
            self.stats.absent_lot_prices += 1;
            tracing::warn!(row = row.index, "Lot header without a usable price");
        }

        HardwareModel::seed(
            self.source,
            self.rules.vendor(),
            row.index,
            row.description.clone().unwrap_or_default(),
            row.part_number.clone(),
            prices,
        )
    }

    fn apply_server_description(&self, model: &mut HardwareModel, row: &RowView<'_>) {
        if model.model_name.is_some() {
            return;
        }
        let Some(description) = row.description.as_deref() else {
            return;
        };

        // "ThinkSystem SR630 V3 - 3yr Warranty" names the model before the dash
        let name = description
            .split(" - ")
            .next()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(description);
        model.model_name = Some(name.to_string());

        if model.form_factor.is_none() {
            if let Some(rule) = self.rules.lookup_form_factor(description) {
                model.form_factor = Some(rule.form_factor.clone());
            }
        }
    }

    fn append_component(&self, model: &mut HardwareModel, row: &RowView<'_>) {
        let classification_text = row.classification_text();
        let component_type = self
            .rules
            .classifier()
            .classify(&classification_text, row.part_number.as_deref());

        let description = row
            .description
            .clone()
            .or_else(|| row.part_number.clone())
            .unwrap_or_default();
        let specification = self.specs.extract(component_type, &description);

        let summary = match component_type {
            ComponentType::Processor => Some(&mut model.processor_info),
            ComponentType::Memory => Some(&mut model.ram_info),
            ComponentType::Network => Some(&mut model.network_info),
            ComponentType::Storage => Some(&mut model.storage_info),
            _ => None,
        };
        if let Some(field) = summary {
            if field.is_none() {
                *field = Some(description.clone());
            }
        }

        model.components.push(ComponentLine::new(
            row.index,
            description,
            row.part_number.clone(),
            row.quantity(),
            specification,
        ));
    }

    /// Fills what the rows left open, then moves the model to the output
    fn finalize(&mut self, mut model: HardwareModel) {
        if let Some(rule) = self.rules.lookup_form_factor(&model.lot_description) {
            if model.model_name.is_none() {
                model.model_name = rule.model_name.clone();
            }
            if model.form_factor.is_none() {
                model.form_factor = Some(rule.form_factor.clone());
            }
        }

        if model.form_factor.is_none() {
            model.form_factor = RACK_UNIT_TOKEN
                .captures(&model.lot_description)
                .map(|caps| format!("{}U", &caps[1]))
                .or_else(|| chassis_rack_units(&model))
                .or_else(|| {
                    model
                        .lot_description
                        .to_lowercase()
                        .contains("tower")
                        .then(|| "Tower".to_string())
                });
        }

        model.category = self.rules.category_for(&model.lot_description).to_string();
        roll_up(&mut model);

        tracing::debug!(
            row = model.source_row,
            lot = %model.lot_description,
            components = model.components.len(),
            price = ?model.price,
            "Model finalized"
        );
        self.finished.push(model);
    }
}

fn chassis_rack_units(model: &HardwareModel) -> Option<String> {
    model
        .components_of(ComponentType::Chassis)
        .find_map(|c| c.specification.get(Attribute::RackUnits))
        .and_then(|v| v.as_integer())
        .map(|units| format!("{}U", units))
}

/// Model-level CPU and memory summaries from the typed component specs
fn roll_up(model: &mut HardwareModel) {
    let cpu = model
        .components_of(ComponentType::Processor)
        .find(|c| !c.specification.is_empty())
        .map(|c| c.specification.clone());
    if let Some(spec) = cpu {
        model.cpu_model = spec
            .get(Attribute::CpuModel)
            .and_then(|v| v.as_text())
            .map(str::to_string);
        model.cpu_cores = spec.get(Attribute::Cores).and_then(|v| v.as_integer());
        model.cpu_frequency_ghz = spec.get(Attribute::FrequencyGhz).and_then(|v| v.as_decimal());
    }

    let sockets: u32 = model
        .components_of(ComponentType::Processor)
        .map(|c| c.quantity)
        .sum();
    model.socket_count = (sockets > 0).then_some(sockets);

    model.total_memory_gb = model
        .components_of(ComponentType::Memory)
        .filter_map(|c| {
            c.specification
                .get(Attribute::CapacityGb)
                .and_then(|v| v.as_integer())
                .map(|gb| gb * i64::from(c.quantity))
        })
        .reduce(|a, b| a + b);
}
