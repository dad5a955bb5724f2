//! Attribute mining from free-text component descriptions.

use lcm_models::{Attribute, AttributeValue, ComponentType, Specification};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;

fn pattern(re: &str) -> Regex {
    Regex::new(re).expect("spec extraction pattern")
}

static CPU_MODEL: Lazy<Regex> = Lazy::new(|| {
    pattern(
        r"(?i)\b((?:Intel\s+)?Xeon\s+(?:Platinum|Gold|Silver|Bronze|Max|[DEW])[\s-]+[A-Z]?\d{3,5}[A-Z]*\+?|(?:AMD\s+)?EPYC\s+\d{4}[A-Z]*)",
    )
});
static CORES_THREADS: Lazy<Regex> = Lazy::new(|| pattern(r"(?i)\b(\d+)\s*C\s*/\s*(\d+)\s*T\b"));
static CORES: Lazy<Regex> = Lazy::new(|| pattern(r"(?i)\b(\d+)\s*(?:C|cores?)\b"));
static THREADS: Lazy<Regex> = Lazy::new(|| pattern(r"(?i)\b(\d+)\s*threads?\b"));
static FREQUENCY: Lazy<Regex> = Lazy::new(|| pattern(r"(?i)\b(\d+(?:\.\d+)?)\s*GHz"));
static WATTS: Lazy<Regex> = Lazy::new(|| pattern(r"(?i)\b(\d+)\s*W\b"));

static MEMORY_CAPACITY: Lazy<Regex> = Lazy::new(|| pattern(r"\b(\d+)\s*[Gg]B\b"));
static MEMORY_GENERATION: Lazy<Regex> = Lazy::new(|| pattern(r"(?i)DDR(\d)"));
static MEMORY_FORM: Lazy<Regex> = Lazy::new(|| pattern(r"(?i)\b(LRDIMM|RDIMM|UDIMM|SODIMM)\b"));
static MEMORY_SPEED: Lazy<Regex> = Lazy::new(|| pattern(r"(?i)\b(\d{4})\s*(?:MT/s|MHz)"));

// Upper-case `B` only, so link rates like `6Gb` are not read as capacity
static STORAGE_CAPACITY: Lazy<Regex> = Lazy::new(|| pattern(r"\b(\d+(?:\.\d+)?)\s*([GgTt]B)\b"));
static STORAGE_INTERFACE: Lazy<Regex> = Lazy::new(|| pattern(r"(?i)\b(SATA|SAS|NVMe)\b"));
static DRIVE_FORM_FACTOR: Lazy<Regex> = Lazy::new(|| pattern(r#"\b([23]\.5)\s*(?:"|''|in\b|inch)"#));

static LINK_SPEED: Lazy<Regex> = Lazy::new(|| pattern(r"(?i)\b(\d+)(?:/(\d+))?\s*GbE\b"));
static PORT_COUNT: Lazy<Regex> = Lazy::new(|| pattern(r"(?i)\b(\d+)\s*-?\s*ports?\b"));
static PORT_WORD: Lazy<Regex> = Lazy::new(|| pattern(r"(?i)\b(single|dual|two|quad|four)[\s-]*ports?\b"));
static CONNECTOR: Lazy<Regex> =
    Lazy::new(|| pattern(r"(?i)(QSFP56|QSFP28|QSFP\+|QSFP|SFP56|SFP28|SFP\+|SFP|BASE-T|RJ45)"));

static RACK_UNITS: Lazy<Regex> = Lazy::new(|| pattern(r"(?i)\b(\d)\s*U\b"));
static CACHE: Lazy<Regex> = Lazy::new(|| pattern(r"\b(\d+)\s*[Gg]B\b"));

/// Per-type attribute extraction. Patterns that do not match leave the
/// attribute absent; a description matching nothing yields an empty spec.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpecExtractor;

impl SpecExtractor {
    pub fn extract(&self, component_type: ComponentType, description: &str) -> Specification {
        let mut spec = SpecBuilder::new(component_type);
        match component_type {
            ComponentType::Processor => processor(&mut spec, description),
            ComponentType::Memory => memory(&mut spec, description),
            ComponentType::Storage => storage(&mut spec, description),
            ComponentType::Network => network(&mut spec, description),
            ComponentType::Power => {
                spec.integer(Attribute::Wattage, capture_i64(&WATTS, description, 1));
            }
            ComponentType::Chassis => {
                spec.integer(Attribute::RackUnits, capture_i64(&RACK_UNITS, description, 1));
            }
            ComponentType::RaidController => {
                spec.integer(Attribute::CacheGb, capture_i64(&CACHE, description, 1));
            }
            ComponentType::Cable | ComponentType::Service | ComponentType::Component => {}
        }
        spec.finish()
    }
}

fn processor(spec: &mut SpecBuilder, text: &str) {
    spec.text(
        Attribute::CpuModel,
        capture_str(&CPU_MODEL, text).map(|m| m.split_whitespace().collect::<Vec<_>>().join(" ")),
    );
    if let Some(caps) = CORES_THREADS.captures(text) {
        spec.integer(Attribute::Cores, caps[1].parse().ok());
        spec.integer(Attribute::Threads, caps[2].parse().ok());
    } else {
        spec.integer(Attribute::Cores, capture_i64(&CORES, text, 1));
        spec.integer(Attribute::Threads, capture_i64(&THREADS, text, 1));
    }
    spec.decimal(Attribute::FrequencyGhz, capture_decimal(&FREQUENCY, text));
    spec.integer(Attribute::TdpWatts, capture_i64(&WATTS, text, 1));
}

fn memory(spec: &mut SpecBuilder, text: &str) {
    spec.integer(Attribute::CapacityGb, capture_i64(&MEMORY_CAPACITY, text, 1));
    spec.text(
        Attribute::Generation,
        capture_str(&MEMORY_GENERATION, text).map(|g| format!("DDR{}", g)),
    );
    spec.text(
        Attribute::Form,
        capture_str(&MEMORY_FORM, text).map(|f| f.to_uppercase()),
    );
    spec.integer(Attribute::SpeedMts, capture_i64(&MEMORY_SPEED, text, 1));
}

fn storage(spec: &mut SpecBuilder, text: &str) {
    if let Some(caps) = STORAGE_CAPACITY.captures(text) {
        if let Ok(value) = Decimal::from_str(&caps[1]) {
            spec.set(
                Attribute::Capacity,
                AttributeValue::Quantity {
                    value: value.normalize(),
                    unit: caps[2].to_uppercase(),
                },
            );
        }
    }

    let lower = text.to_lowercase();
    let medium = if lower.contains("ssd") {
        Some("SSD")
    } else if lower.contains("hdd") {
        Some("HDD")
    } else if lower.contains("nvme") {
        Some("NVMe")
    } else {
        None
    };
    spec.text(Attribute::Medium, medium.map(str::to_string));

    spec.text(
        Attribute::Interface,
        capture_str(&STORAGE_INTERFACE, text).map(|i| match i.to_lowercase().as_str() {
            "nvme" => "NVMe".to_string(),
            _ => i.to_uppercase(),
        }),
    );
    spec.text(
        Attribute::DriveFormFactor,
        capture_str(&DRIVE_FORM_FACTOR, text).map(|ff| format!("{}\"", ff)),
    );
}

fn network(spec: &mut SpecBuilder, text: &str) {
    if let Some(caps) = LINK_SPEED.captures(text) {
        let speed = caps
            .iter()
            .skip(1)
            .flatten()
            .filter_map(|m| m.as_str().parse::<u32>().ok())
            .max();
        spec.text(Attribute::LinkSpeed, speed.map(|s| format!("{}GbE", s)));
    }

    let ports = capture_i64(&PORT_COUNT, text, 1).or_else(|| {
        capture_str(&PORT_WORD, text).map(|word| match word.to_lowercase().as_str() {
            "single" => 1,
            "dual" | "two" => 2,
            _ => 4,
        })
    });
    spec.integer(Attribute::Ports, ports);

    spec.text(
        Attribute::Connector,
        capture_str(&CONNECTOR, text).map(|c| c.to_uppercase()),
    );
}

fn capture_str<'t>(re: &Regex, text: &'t str) -> Option<&'t str> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn capture_i64(re: &Regex, text: &str, group: usize) -> Option<i64> {
    re.captures(text)
        .and_then(|caps| caps.get(group))
        .and_then(|m| m.as_str().parse().ok())
}

fn capture_decimal(re: &Regex, text: &str) -> Option<Decimal> {
    capture_str(re, text).and_then(|m| Decimal::from_str(m).ok())
}

/// Collects attributes, silently skipping absent values
struct SpecBuilder {
    spec: Specification,
}

impl SpecBuilder {
    fn new(component_type: ComponentType) -> Self {
        Self {
            spec: Specification::new(component_type),
        }
    }

    fn set(&mut self, attribute: Attribute, value: AttributeValue) {
        if let Err(e) = self.spec.set(attribute, value) {
            tracing::warn!(error = %e, "Dropping attribute outside the type's set");
        }
    }

    fn integer(&mut self, attribute: Attribute, value: Option<i64>) {
        if let Some(v) = value {
            self.set(attribute, AttributeValue::Integer(v));
        }
    }

    fn decimal(&mut self, attribute: Attribute, value: Option<Decimal>) {
        if let Some(v) = value {
            self.set(attribute, AttributeValue::Decimal(v.normalize()));
        }
    }

    fn text(&mut self, attribute: Attribute, value: Option<String>) {
        if let Some(v) = value {
            self.set(attribute, AttributeValue::Text(v));
        }
    }

    fn finish(self) -> Specification {
        self.spec
    }
}
