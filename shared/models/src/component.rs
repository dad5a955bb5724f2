//! Component lines and their typed specifications.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Semantic type of a component line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentType {
    Processor,
    Memory,
    Storage,
    Network,
    Power,
    RaidController,
    Cable,
    Service,
    Chassis,
    /// Fallback when no classification rule matches
    Component,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentCategory {
    Processing,
    Memory,
    Storage,
    Networking,
    Power,
    Services,
    Chassis,
    Accessory,
}

impl ComponentType {
    pub fn category(&self) -> ComponentCategory {
        match self {
            Self::Processor => ComponentCategory::Processing,
            Self::Memory => ComponentCategory::Memory,
            Self::Storage | Self::RaidController => ComponentCategory::Storage,
            Self::Network | Self::Cable => ComponentCategory::Networking,
            Self::Power => ComponentCategory::Power,
            Self::Service => ComponentCategory::Services,
            Self::Chassis => ComponentCategory::Chassis,
            Self::Component => ComponentCategory::Accessory,
        }
    }

    /// Attributes a specification of this type may carry
    pub fn attributes(&self) -> &'static [Attribute] {
        use Attribute::*;
        match self {
            Self::Processor => &[CpuModel, Cores, Threads, FrequencyGhz, TdpWatts],
            Self::Memory => &[CapacityGb, Generation, Form, SpeedMts],
            Self::Storage => &[Capacity, Medium, Interface, DriveFormFactor],
            Self::Network => &[LinkSpeed, Ports, Connector],
            Self::Power => &[Wattage],
            Self::Chassis => &[RackUnits],
            Self::RaidController => &[CacheGb],
            Self::Cable | Self::Service | Self::Component => &[],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processor => "processor",
            Self::Memory => "memory",
            Self::Storage => "storage",
            Self::Network => "network",
            Self::Power => "power",
            Self::RaidController => "raid_controller",
            Self::Cable => "cable",
            Self::Service => "service",
            Self::Chassis => "chassis",
            Self::Component => "component",
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attribute names known to the specification extractor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    CpuModel,
    Cores,
    Threads,
    FrequencyGhz,
    TdpWatts,
    CapacityGb,
    Generation,
    Form,
    SpeedMts,
    Capacity,
    Medium,
    Interface,
    DriveFormFactor,
    LinkSpeed,
    Ports,
    Connector,
    Wattage,
    RackUnits,
    CacheGb,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Integer(i64),
    Decimal(Decimal),
    Text(String),
    Quantity { value: Decimal, unit: String },
}

impl AttributeValue {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Self::Decimal(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{}", v),
            Self::Decimal(v) => write!(f, "{}", v),
            Self::Text(v) => f.write_str(v),
            Self::Quantity { value, unit } => write!(f, "{}{}", value, unit),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecificationError {
    #[error("attribute {attribute:?} is not defined for {component_type} specifications")]
    UnknownAttribute {
        component_type: ComponentType,
        attribute: Attribute,
    },
}

/// Typed attributes mined from one component description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Specification {
    pub component_type: ComponentType,
    pub attributes: BTreeMap<Attribute, AttributeValue>,
}

impl Specification {
    pub fn new(component_type: ComponentType) -> Self {
        Self {
            component_type,
            attributes: BTreeMap::new(),
        }
    }

    /// Sets an attribute, rejecting names outside the type's attribute set
    pub fn set(&mut self, attribute: Attribute, value: AttributeValue) -> Result<(), SpecificationError> {
        if !self.component_type.attributes().contains(&attribute) {
            return Err(SpecificationError::UnknownAttribute {
                component_type: self.component_type,
                attribute,
            });
        }
        self.attributes.insert(attribute, value);
        Ok(())
    }

    pub fn get(&self, attribute: Attribute) -> Option<&AttributeValue> {
        self.attributes.get(&attribute)
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }
}

/// One constituent part of a hardware model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentLine {
    /// Zero-based row index in the source sheet
    pub row: usize,
    pub description: String,
    pub part_number: Option<String>,
    pub quantity: u32,
    pub component_type: ComponentType,
    pub category: ComponentCategory,
    pub specification: Specification,
}

impl ComponentLine {
    pub fn new(
        row: usize,
        description: String,
        part_number: Option<String>,
        quantity: u32,
        specification: Specification,
    ) -> Self {
        let component_type = specification.component_type;
        Self {
            row,
            description,
            part_number,
            quantity: quantity.max(1),
            component_type,
            category: component_type.category(),
            specification,
        }
    }

    /// True when the classifier fell back to the generic type
    pub fn is_generic(&self) -> bool {
        self.component_type == ComponentType::Component
    }
}
