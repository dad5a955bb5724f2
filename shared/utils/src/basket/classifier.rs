use lcm_models::ComponentType;
use regex::Regex;

use super::rules::ComponentRule;
use crate::validation::normalize_text;

#[derive(Debug)]
struct CompiledRule {
    component_type: ComponentType,
    keywords: Option<Regex>,
    part_number_patterns: Vec<Regex>,
}

/// One alternation over a rule's keywords. A keyword must not sit inside a
/// longer word: letters may not touch either end, digits may (`25gbe`,
/// `truddr5`, `sfp28`), and a plural `s`/`es` is allowed.
fn keyword_pattern(keywords: &[String]) -> Result<Option<Regex>, regex::Error> {
    let alternatives: Vec<String> = keywords
        .iter()
        .map(|k| normalize_text(k))
        .filter(|k| !k.is_empty())
        .map(|k| regex::escape(&k))
        .collect();
    if alternatives.is_empty() {
        return Ok(None);
    }
    Regex::new(&format!(
        r"(?:^|[^a-z])(?:{})(?:e?s)?(?:$|[^a-z])",
        alternatives.join("|")
    ))
    .map(Some)
}

/// Ordered keyword/part-number rule table. First matching rule wins and
/// anything unmatched is a generic [`ComponentType::Component`].
#[derive(Debug, Default)]
pub struct ComponentClassifier {
    rules: Vec<CompiledRule>,
}

impl ComponentClassifier {
    pub fn from_rules(rules: &[ComponentRule]) -> Result<Self, regex::Error> {
        let rules = rules
            .iter()
            .map(|rule| {
                Ok(CompiledRule {
                    component_type: rule.component_type,
                    keywords: keyword_pattern(&rule.keywords)?,
                    part_number_patterns: rule
                        .part_number_patterns
                        .iter()
                        .map(|p| Regex::new(p))
                        .collect::<Result<_, _>>()?,
                })
            })
            .collect::<Result<_, regex::Error>>()?;

        Ok(Self { rules })
    }

    pub fn classify(&self, description: &str, part_number: Option<&str>) -> ComponentType {
        let text = normalize_text(description);
        let part_number = part_number.map(str::trim).filter(|pn| !pn.is_empty());

        self.rules
            .iter()
            .find(|rule| {
                rule.keywords.as_ref().map_or(false, |re| re.is_match(&text))
                    || part_number
                        .map(|pn| rule.part_number_patterns.iter().any(|re| re.is_match(pn)))
                        .unwrap_or(false)
            })
            .map(|rule| rule.component_type)
            .unwrap_or(ComponentType::Component)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basket::rules::VendorRules;

    fn lenovo() -> ComponentClassifier {
        ComponentClassifier::from_rules(&VendorRules::lenovo().unwrap().component_rules).unwrap()
    }

    #[test]
    fn test_common_lenovo_lines() {
        let classifier = lenovo();
        let cases = [
            ("Intel Xeon Silver 4410T 10C 150W 2.7GHz", ComponentType::Processor),
            ("ThinkSystem 16GB TruDDR5 4800MHz (1Rx8) RDIMM", ComponentType::Memory),
            ("ThinkSystem 2.5\" 5400 PRO 480GB Read Intensive SATA 6Gb HS SSD", ComponentType::Storage),
            ("ThinkSystem Broadcom 57414 10/25GbE SFP28 2-Port OCP Ethernet Adapter", ComponentType::Network),
            ("ThinkSystem 750W 230V Titanium Hot-Swap Gen2 Power Supply", ComponentType::Power),
            ("ThinkSystem 1U 10x2.5\" Chassis", ComponentType::Chassis),
            ("3Yr Premier Support 24x7 4Hr Response", ComponentType::Service),
            ("1.5m Passive 25G SFP28 DAC Cable", ComponentType::Cable),
        ];
        for (description, expected) in cases {
            assert_eq!(classifier.classify(description, None), expected, "{description}");
        }
    }

    #[test]
    fn test_keywords_do_not_match_inside_words() {
        let classifier = lenovo();
        assert_eq!(
            classifier.classify("ThinkSystem SR630 V3 Mechanical Kit", None),
            ComponentType::Component
        );
        assert_eq!(
            classifier.classify("ThinkSystem Electronic Lock Bezel", None),
            ComponentType::Chassis
        );
        assert_eq!(classifier.classify("ThinkSystem OCP NIC 3.0", None), ComponentType::Network);
        assert_eq!(classifier.classify("2x 800GB NVMe SSDs", None), ComponentType::Storage);
        assert_eq!(
            classifier.classify("Intel X710-T2L 10GBASE-T 2-port", None),
            ComponentType::Network
        );

        let dell = ComponentClassifier::from_rules(&VendorRules::dell().unwrap().component_rules).unwrap();
        assert_eq!(dell.classify("BIOS and Firmware Parameters", None), ComponentType::Component);
        assert_eq!(dell.classify("Standard Bezel Frame", None), ComponentType::Chassis);
        assert_eq!(dell.classify("RAM (Capacity) 8 x 32GB", None), ComponentType::Memory);
    }

    #[test]
    fn test_raid_checked_before_storage() {
        let classifier = lenovo();
        assert_eq!(
            classifier.classify("ThinkSystem RAID 940-8i 4GB Flash PCIe Gen4 12Gb SAS Adapter", None),
            ComponentType::RaidController
        );
    }

    #[test]
    fn test_part_number_pattern() {
        let classifier = lenovo();
        assert_eq!(
            classifier.classify("Extended coverage", Some("5WS7A01234")),
            ComponentType::Service
        );
    }

    #[test]
    fn test_unmatched_falls_back_to_component() {
        let classifier = lenovo();
        assert_eq!(classifier.classify("Mystery widget", None), ComponentType::Component);
        assert_eq!(classifier.classify("", Some("  ")), ComponentType::Component);
        assert_eq!(
            ComponentClassifier::default().classify("Intel Xeon", None),
            ComponentType::Component
        );
    }
}
