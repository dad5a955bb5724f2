//! Per-vendor rule tables.
//!
//! A [`VendorRules`] value is plain data (YAML or built-in). It is validated
//! and compiled once into a [`RuleSet`], which every parse of that vendor's
//! sheets shares read-only.

use lcm_models::{ComponentType, Currency};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use validator::{Validate, ValidationError};

use super::assembler::BasketAssembler;
use super::classifier::ComponentClassifier;
use crate::config::EngineConfig;
use crate::error::{LcmError, LcmResult};
use crate::validation::{normalize_text, validate_keywords, validate_model, validate_regex_list};

const LENOVO_RULES: &str = include_str!("../../rules/lenovo.yaml");
const DELL_RULES: &str = include_str!("../../rules/dell.yaml");

/// Keys of [`VendorRules::keyword_lists`]
pub const LOT_KEYWORDS: &str = "lot";
pub const LOT_EXCLUDE_KEYWORDS: &str = "lot_exclude";
pub const SERVER_FAMILY_KEYWORDS: &str = "server_family";
pub const SERVER_DESCRIPTION_KEYWORDS: &str = "server_description";

/// Logical column a header cell can resolve to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnField {
    PartNumber,
    Description,
    LotDescription,
    ItemType,
    Quantity,
    PriceUsd,
    PriceEur,
    Price,
}

impl ColumnField {
    /// Order in which fields claim header columns. Specific price columns
    /// go before the generic one, lot descriptions before plain ones.
    pub const RESOLUTION_ORDER: [ColumnField; 8] = [
        ColumnField::PriceUsd,
        ColumnField::PriceEur,
        ColumnField::Price,
        ColumnField::LotDescription,
        ColumnField::PartNumber,
        ColumnField::ItemType,
        ColumnField::Description,
        ColumnField::Quantity,
    ];

    pub const PRICE_FIELDS: [ColumnField; 3] =
        [ColumnField::PriceUsd, ColumnField::PriceEur, ColumnField::Price];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PartNumber => "part_number",
            Self::Description => "description",
            Self::LotDescription => "lot_description",
            Self::ItemType => "item_type",
            Self::Quantity => "quantity",
            Self::PriceUsd => "price_usd",
            Self::PriceEur => "price_eur",
            Self::Price => "price",
        }
    }

    /// Currency implied by a price column; `None` for the generic one
    pub fn currency(&self) -> Option<Currency> {
        match self {
            Self::PriceUsd => Some(Currency::Usd),
            Self::PriceEur => Some(Currency::Eur),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ComponentRule {
    pub component_type: ComponentType,
    #[serde(default)]
    #[validate(custom = "validate_keywords")]
    pub keywords: Vec<String>,
    #[serde(default)]
    #[validate(custom = "validate_regex_list")]
    pub part_number_patterns: Vec<String>,
}

/// Model-family lookup entry: a lower-cased substring and what it implies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormFactorRule {
    pub pattern: String,
    #[serde(default)]
    pub model_name: Option<String>,
    pub form_factor: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub keywords: Vec<String>,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct VendorRules {
    #[validate(length(min = 1, max = 64))]
    pub vendor: String,
    /// Workbook tabs holding lot pricing; empty means every tab
    #[serde(default)]
    pub sheet_names: Vec<String>,
    /// Currency for bare amounts in currency-less price columns
    #[serde(default = "default_currency")]
    pub currency: Currency,
    #[serde(default = "default_header_scan_rows")]
    #[validate(range(min = 1, max = 500))]
    pub header_scan_rows: usize,
    #[serde(default = "default_min_header_score")]
    #[validate(range(min = 1, max = 64))]
    pub min_header_score: usize,
    #[validate(length(min = 1), custom = "validate_keywords")]
    pub header_keywords: Vec<String>,
    pub column_aliases: BTreeMap<ColumnField, Vec<String>>,
    #[validate(custom = "validate_keyword_lists")]
    pub keyword_lists: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    #[validate(custom = "validate_regex_list")]
    pub part_number_patterns: Vec<String>,
    #[serde(default)]
    pub component_rules: Vec<ComponentRule>,
    #[serde(default)]
    pub form_factors: Vec<FormFactorRule>,
    #[serde(default)]
    pub category_rules: Vec<CategoryRule>,
    #[serde(default = "default_category")]
    #[validate(length(min = 1))]
    pub default_category: String,
}

fn default_currency() -> Currency {
    Currency::Usd
}

fn default_header_scan_rows() -> usize {
    20
}

fn default_min_header_score() -> usize {
    3
}

fn default_category() -> String {
    "Server".to_string()
}

fn validate_keyword_lists(lists: &BTreeMap<String, Vec<String>>) -> Result<(), ValidationError> {
    if !lists.contains_key(LOT_KEYWORDS) {
        return Err(ValidationError::new("missing_lot_keywords"));
    }
    lists.values().try_for_each(|keywords| validate_keywords(keywords))
}

impl VendorRules {
    pub fn from_yaml(yaml: &str) -> LcmResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn lenovo() -> LcmResult<Self> {
        Self::from_yaml(LENOVO_RULES)
    }

    pub fn dell() -> LcmResult<Self> {
        Self::from_yaml(DELL_RULES)
    }

    pub fn builtin() -> LcmResult<Vec<Self>> {
        Ok(vec![Self::lenovo()?, Self::dell()?])
    }

    pub fn keywords(&self, list: &str) -> &[String] {
        self.keyword_lists
            .get(list)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Validated, compiled form of [`VendorRules`]
#[derive(Debug)]
pub struct RuleSet {
    rules: VendorRules,
    header_keywords: Vec<String>,
    column_aliases: BTreeMap<ColumnField, Vec<String>>,
    lot_keywords: Vec<String>,
    lot_exclude: Vec<String>,
    server_family: Vec<String>,
    server_description: Vec<String>,
    part_number_patterns: Vec<Regex>,
    classifier: ComponentClassifier,
}

impl RuleSet {
    pub fn compile(rules: VendorRules) -> LcmResult<Self> {
        validate_model(&rules)
            .map_err(|e| LcmError::rules(&rules.vendor, e.to_string()))?;
        for rule in &rules.component_rules {
            validate_model(rule).map_err(|e| LcmError::rules(&rules.vendor, e.to_string()))?;
        }

        let lowered = |list: &[String]| -> Vec<String> {
            list.iter().map(|k| normalize_text(k)).collect()
        };

        let part_number_patterns = rules
            .part_number_patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| LcmError::rules(&rules.vendor, e.to_string()))?;

        let classifier = ComponentClassifier::from_rules(&rules.component_rules)
            .map_err(|e| LcmError::rules(&rules.vendor, e.to_string()))?;

        let column_aliases = rules
            .column_aliases
            .iter()
            .map(|(field, aliases)| (*field, lowered(aliases)))
            .collect();

        Ok(Self {
            header_keywords: lowered(&rules.header_keywords),
            column_aliases,
            lot_keywords: lowered(rules.keywords(LOT_KEYWORDS)),
            lot_exclude: lowered(rules.keywords(LOT_EXCLUDE_KEYWORDS)),
            server_family: lowered(rules.keywords(SERVER_FAMILY_KEYWORDS)),
            server_description: lowered(rules.keywords(SERVER_DESCRIPTION_KEYWORDS)),
            part_number_patterns,
            classifier,
            rules,
        })
    }

    pub fn vendor(&self) -> &str {
        &self.rules.vendor
    }

    pub fn rules(&self) -> &VendorRules {
        &self.rules
    }

    pub fn currency(&self) -> Currency {
        self.rules.currency
    }

    pub fn header_keywords(&self) -> &[String] {
        &self.header_keywords
    }

    pub fn header_scan_rows(&self) -> usize {
        self.rules.header_scan_rows
    }

    pub fn min_header_score(&self) -> usize {
        self.rules.min_header_score
    }

    pub fn column_aliases(&self) -> &BTreeMap<ColumnField, Vec<String>> {
        &self.column_aliases
    }

    pub fn classifier(&self) -> &ComponentClassifier {
        &self.classifier
    }

    /// Lot keyword or lot part number, and no exclusion keyword.
    /// `description` must already be normalized.
    pub fn is_lot_signal(&self, description: &str, part_number: Option<&str>) -> bool {
        let keyword_hit = contains_any(description, &self.lot_keywords);
        let pattern_hit = part_number
            .map(|pn| self.part_number_patterns.iter().any(|re| re.is_match(pn)))
            .unwrap_or(false);

        (keyword_hit || pattern_hit) && !contains_any(description, &self.lot_exclude)
    }

    /// Starts with a server family name and carries a description token
    pub fn is_server_description(&self, description: &str) -> bool {
        self.server_family
            .iter()
            .any(|family| description.starts_with(family.as_str()))
            && contains_any(description, &self.server_description)
    }

    /// First model-family entry whose pattern occurs in `text`
    pub fn lookup_form_factor(&self, text: &str) -> Option<&FormFactorRule> {
        let text = normalize_text(text);
        self.rules
            .form_factors
            .iter()
            .find(|rule| text.contains(&normalize_text(&rule.pattern)))
    }

    pub fn category_for(&self, text: &str) -> &str {
        let text = normalize_text(text);
        self.rules
            .category_rules
            .iter()
            .find(|rule| {
                rule.keywords
                    .iter()
                    .any(|k| text.contains(&normalize_text(k)))
            })
            .map(|rule| rule.category.as_str())
            .unwrap_or(&self.rules.default_category)
    }

    /// Whether the sheet name is one this vendor prices lots on
    pub fn selects_sheet(&self, sheet_name: &str) -> bool {
        let name = normalize_text(sheet_name);
        self.rules
            .sheet_names
            .iter()
            .any(|candidate| normalize_text(candidate) == name)
    }
}

pub(crate) fn contains_any(text: &str, keywords: &[String]) -> bool {
    keywords.iter().any(|k| text.contains(k.as_str()))
}

/// Compiled rule sets keyed by lower-cased vendor name
#[derive(Debug, Default, Clone)]
pub struct VendorRegistry {
    vendors: HashMap<String, Arc<RuleSet>>,
}

impl VendorRegistry {
    pub fn builtin() -> LcmResult<Self> {
        let mut registry = Self::default();
        for rules in VendorRules::builtin()? {
            registry.register(rules)?;
        }
        Ok(registry)
    }

    /// Built-ins, then every `*.yaml`/`*.yml` in `rules_dir`. A file for a
    /// vendor that already exists replaces it.
    pub fn from_config(config: &EngineConfig) -> LcmResult<Self> {
        let mut loaded = VendorRules::builtin()?;

        if let Some(dir) = &config.rules_dir {
            loaded.extend(load_rules_dir(Path::new(dir))?);
        }

        let mut registry = Self::default();
        for mut rules in loaded {
            if let Some(rows) = config.header_scan_rows {
                rules.header_scan_rows = rows;
            }
            registry.register(rules)?;
        }

        tracing::info!(vendors = ?registry.vendors(), "Vendor rules loaded");
        Ok(registry)
    }

    pub fn register(&mut self, rules: VendorRules) -> LcmResult<Arc<RuleSet>> {
        let key = rules.vendor.to_lowercase();
        let compiled = Arc::new(RuleSet::compile(rules)?);
        self.vendors.insert(key, Arc::clone(&compiled));
        Ok(compiled)
    }

    pub fn get(&self, vendor: &str) -> LcmResult<Arc<RuleSet>> {
        self.vendors
            .get(&vendor.trim().to_lowercase())
            .cloned()
            .ok_or_else(|| LcmError::unknown_vendor(vendor))
    }

    pub fn assembler(&self, vendor: &str) -> LcmResult<BasketAssembler> {
        Ok(BasketAssembler::new(self.get(vendor)?))
    }

    /// Sorted vendor keys
    pub fn vendors(&self) -> Vec<String> {
        let mut names: Vec<String> = self.vendors.keys().cloned().collect();
        names.sort();
        names
    }
}

fn load_rules_dir(dir: &Path) -> LcmResult<Vec<VendorRules>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| matches!(ext.to_lowercase().as_str(), "yaml" | "yml"))
            .unwrap_or(false);
        if is_yaml {
            paths.push(path);
        }
    }
    paths.sort();

    paths
        .iter()
        .map(|path| {
            let yaml = fs::read_to_string(path)?;
            VendorRules::from_yaml(&yaml).map_err(|e| {
                LcmError::configuration(format!("{}: {}", path.display(), e))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_yaml_files_parse() {
        let lenovo = VendorRules::from_yaml(LENOVO_RULES).unwrap();
        assert_eq!(lenovo.vendor, "Lenovo");
        assert_eq!(
            lenovo.column_aliases[&ColumnField::PartNumber],
            vec!["part number", "part no", "part #", "p/n"]
        );
        assert_eq!(lenovo.component_rules.len(), 9);

        let dell = VendorRules::from_yaml(DELL_RULES).unwrap();
        assert_eq!(dell.vendor, "Dell");
        assert_eq!(dell.column_aliases[&ColumnField::ItemType], vec!["item", "component"]);
        assert_eq!(dell.component_rules.len(), 9);
    }

    #[test]
    fn test_builtin_rules_compile() {
        let registry = VendorRegistry::builtin().unwrap();
        assert_eq!(registry.vendors(), vec!["dell", "lenovo"]);

        let lenovo = registry.get("Lenovo").unwrap();
        assert_eq!(lenovo.vendor(), "Lenovo");
        assert_eq!(lenovo.header_scan_rows(), 20);
        assert_eq!(lenovo.min_header_score(), 3);
        assert!(lenovo.selects_sheet("Lenovo X86 Server Lots"));
        assert!(!lenovo.selects_sheet("Lenovo X86 Parts"));
    }

    #[test]
    fn test_unknown_vendor() {
        let registry = VendorRegistry::builtin().unwrap();
        let err = registry.get("hpe").unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_VENDOR");
    }

    #[test]
    fn test_lot_signal() {
        let rules = RuleSet::compile(VendorRules::lenovo().unwrap()).unwrap();
        assert!(rules.is_lot_signal("smi1 - intel - 1 proc - small rack server", None));
        assert!(rules.is_lot_signal("custom bundle", Some("7D73CTO1WW")));
        assert!(!rules.is_lot_signal("thinksystem 32gb truddr5 memory", None));
        // Exclusion keyword vetoes the lot keyword
        assert!(!rules.is_lot_signal("smi1 processor upgrade", None));
    }

    #[test]
    fn test_server_description_needs_family_prefix() {
        let rules = RuleSet::compile(VendorRules::lenovo().unwrap()).unwrap();
        assert!(rules.is_server_description("thinksystem sr630 v3 - 3yr warranty"));
        assert!(!rules.is_server_description("thinksystem sr630 v3 chassis"));
        assert!(!rules.is_server_description("premier support warranty for thinksystem sr630"));
    }

    #[test]
    fn test_form_factor_and_category_lookup() {
        let rules = RuleSet::compile(VendorRules::lenovo().unwrap()).unwrap();
        let hit = rules.lookup_form_factor("ThinkSystem SR650 V3").unwrap();
        assert_eq!(hit.form_factor, "2U");
        assert!(rules.lookup_form_factor("Mystery box").is_none());

        assert_eq!(rules.category_for("HVI1 ThinkAgile VX Node"), "Hyperconverged");
        assert_eq!(rules.category_for("SMI1 Small Rack Server"), "Server");
    }

    #[test]
    fn test_invalid_pattern_rejected_at_load() {
        let mut rules = VendorRules::lenovo().unwrap();
        rules.part_number_patterns.push("(unclosed".to_string());
        let err = RuleSet::compile(rules).unwrap_err();
        assert_eq!(err.error_code(), "RULE_ERROR");
    }

    #[test]
    fn test_missing_lot_keywords_rejected() {
        let mut rules = VendorRules::dell().unwrap();
        rules.keyword_lists.remove(LOT_KEYWORDS);
        assert!(RuleSet::compile(rules).is_err());
    }

    #[test]
    fn test_yaml_vendor_added_from_rules_dir() {
        let dir = std::env::temp_dir().join(format!("lcm-rules-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let mut acme = VendorRules::dell().unwrap();
        acme.vendor = "Acme".to_string();
        fs::write(dir.join("acme.yaml"), serde_yaml::to_string(&acme).unwrap()).unwrap();
        fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let config = EngineConfig {
            rules_dir: Some(dir.to_string_lossy().into_owned()),
            header_scan_rows: Some(10),
            ..EngineConfig::default()
        };
        let registry = VendorRegistry::from_config(&config).unwrap();
        fs::remove_dir_all(&dir).ok();

        assert_eq!(registry.vendors(), vec!["acme", "dell", "lenovo"]);
        assert_eq!(registry.get("ACME").unwrap().header_scan_rows(), 10);
    }
}
