//! Hardware models and the baskets that group them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::component::{ComponentLine, ComponentType};
use crate::money::Money;

/// Namespace for deterministic model identifiers
const MODEL_ID_NAMESPACE: Uuid = Uuid::from_u128(0x6c63_6d2d_6261_736b_6574_2d6d_6f64_656c);

/// Where a basket was read from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BasketSource {
    pub file_name: String,
    pub sheet_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Quarter {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl Quarter {
    pub fn from_number(n: u32) -> Option<Self> {
        match n {
            1 => Some(Self::Q1),
            2 => Some(Self::Q2),
            3 => Some(Self::Q3),
            4 => Some(Self::Q4),
            _ => None,
        }
    }
}

/// One purchasable hardware bundle and its constituent parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardwareModel {
    pub id: Uuid,
    /// Zero-based row of the lot header this model was seeded from
    pub source_row: usize,
    pub lot_description: String,
    pub model_name: Option<String>,
    pub model_number: Option<String>,
    pub category: String,
    pub form_factor: Option<String>,
    pub vendor: String,
    /// Primary price taken from the lot header row
    pub price: Option<Money>,
    /// Every price found on the lot header row, in column priority order
    pub prices: Vec<Money>,
    pub components: Vec<ComponentLine>,
    pub processor_info: Option<String>,
    pub ram_info: Option<String>,
    pub network_info: Option<String>,
    pub storage_info: Option<String>,
    /// Rollups computed when the model is finalized
    pub cpu_model: Option<String>,
    pub cpu_cores: Option<i64>,
    pub cpu_frequency_ghz: Option<Decimal>,
    /// Total processor quantity
    pub socket_count: Option<u32>,
    /// Memory capacity weighted by line quantity
    pub total_memory_gb: Option<i64>,
}

impl HardwareModel {
    /// Seeds a model from a lot header row
    pub fn seed(
        source: &BasketSource,
        vendor: impl Into<String>,
        source_row: usize,
        lot_description: impl Into<String>,
        model_number: Option<String>,
        prices: Vec<Money>,
    ) -> Self {
        Self {
            id: Self::derive_id(source, source_row),
            source_row,
            lot_description: lot_description.into(),
            model_name: None,
            model_number,
            category: String::new(),
            form_factor: None,
            vendor: vendor.into(),
            price: prices.first().copied(),
            prices,
            components: Vec::new(),
            processor_info: None,
            ram_info: None,
            network_info: None,
            storage_info: None,
            cpu_model: None,
            cpu_cores: None,
            cpu_frequency_ghz: None,
            socket_count: None,
            total_memory_gb: None,
        }
    }

    /// Stable identifier: the same sheet row always yields the same id
    pub fn derive_id(source: &BasketSource, source_row: usize) -> Uuid {
        let name = format!("{}#{}#{}", source.file_name, source.sheet_name, source_row);
        Uuid::new_v5(&MODEL_ID_NAMESPACE, name.as_bytes())
    }

    pub fn components_of(&self, component_type: ComponentType) -> impl Iterator<Item = &ComponentLine> {
        self.components
            .iter()
            .filter(move |c| c.component_type == component_type)
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }
}

/// Every hardware model parsed from one vendor price sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Basket {
    pub vendor: String,
    pub quarter: Option<Quarter>,
    pub year: Option<i32>,
    pub source: BasketSource,
    pub models: Vec<HardwareModel>,
}

impl Basket {
    pub fn total_components(&self) -> usize {
        self.models.iter().map(HardwareModel::component_count).sum()
    }

    pub fn find_model(&self, model_number: &str) -> Option<&HardwareModel> {
        self.models
            .iter()
            .find(|m| m.model_number.as_deref() == Some(model_number))
    }
}
