//! Symptom rule table loaded once at startup.
//!
//! The table is the sole source of follow-up questions: an ordered sequence
//! of rules, one per symptom, each mapping section names to ordered question
//! lists. Section order inside a rule follows the rule-file document order,
//! which is why the mapping is deserialized through a custom visitor instead
//! of a plain `HashMap`. The table is validated here and immutable
//! afterwards; a malformed rule file is a startup-fatal condition.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

use crate::error::RuleTableError;

/// One named section of follow-up questions within a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSection {
    /// Stable section identifier, e.g. "Cardiac History".
    pub name: String,
    /// Questions in presentation order.
    pub questions: Vec<String>,
}

/// A single symptom rule: the symptom key plus its question sections.
#[derive(Debug, Clone, Deserialize)]
pub struct SymptomRule {
    /// Case-sensitive symptom key, e.g. "Chest Pain".
    pub symptom: String,
    /// Sections in rule-file document order.
    #[serde(rename = "follow_up_questions", deserialize_with = "ordered_sections")]
    pub sections: Vec<RuleSection>,
}

fn ordered_sections<'de, D>(deserializer: D) -> Result<Vec<RuleSection>, D::Error>
where
    D: Deserializer<'de>,
{
    struct SectionVisitor;

    impl<'de> Visitor<'de> for SectionVisitor {
        type Value = Vec<RuleSection>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a map of section name to question list")
        }

        fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut sections = Vec::with_capacity(access.size_hint().unwrap_or(0));
            while let Some((name, questions)) = access.next_entry::<String, Vec<String>>()? {
                sections.push(RuleSection { name, questions });
            }
            Ok(sections)
        }
    }

    deserializer.deserialize_map(SectionVisitor)
}

/// The immutable rule table. Shared by reference across all sessions.
#[derive(Debug)]
pub struct RuleTable {
    rules: Vec<SymptomRule>,
    /// Symptom key → position in `rules`, for O(1) lookup.
    index: HashMap<String, usize>,
}

impl RuleTable {
    /// Reads and validates a rule file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RuleTableError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Parses and validates rules from a JSON string.
    pub fn from_json(raw: &str) -> Result<Self, RuleTableError> {
        let rules: Vec<SymptomRule> = serde_json::from_str(raw)?;
        Self::from_rules(rules)
    }

    /// Validates an already-parsed rule sequence and builds the lookup index.
    pub fn from_rules(rules: Vec<SymptomRule>) -> Result<Self, RuleTableError> {
        let mut index = HashMap::with_capacity(rules.len());
        for (pos, rule) in rules.iter().enumerate() {
            if rule.symptom.trim().is_empty() {
                return Err(RuleTableError::Invalid {
                    symptom: rule.symptom.clone(),
                    message: "symptom key must not be empty".into(),
                });
            }
            for section in &rule.sections {
                if section.name.trim().is_empty() {
                    return Err(RuleTableError::Invalid {
                        symptom: rule.symptom.clone(),
                        message: "section name must not be empty".into(),
                    });
                }
                if section.questions.iter().any(|q| q.trim().is_empty()) {
                    return Err(RuleTableError::Invalid {
                        symptom: rule.symptom.clone(),
                        message: format!("section {:?} contains an empty question", section.name),
                    });
                }
            }
            if index.insert(rule.symptom.clone(), pos).is_some() {
                return Err(RuleTableError::Invalid {
                    symptom: rule.symptom.clone(),
                    message: "duplicate symptom key".into(),
                });
            }
        }
        Ok(Self { rules, index })
    }

    /// Case-sensitive exact-match lookup.
    pub fn lookup(&self, symptom: &str) -> Option<&SymptomRule> {
        self.index.get(symptom).map(|&pos| &self.rules[pos])
    }

    /// All symptom keys in rule-file order, for the selection catalog.
    pub fn symptom_names(&self) -> Vec<String> {
        self.rules.iter().map(|r| r.symptom.clone()).collect()
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

    const SAMPLE: &str = r#"[
        {
            "symptom": "Chest Pain",
            "follow_up_questions": {
                "Cardiac History": ["Pain duration?", "Pain triggers?"],
                "Lifestyle": ["Do you smoke?"]
            }
        },
        {
            "symptom": "Headache",
            "follow_up_questions": {
                "Neurological": ["Where is the pain located?"]
            }
        }
    ]"#;

    #[test]
    fn parses_rules_in_document_order() {
        let table = RuleTable::from_json(SAMPLE).unwrap();
        assert_eq!(table.symptom_names(), vec!["Chest Pain", "Headache"]);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn preserves_section_order_within_a_rule() {
        let table = RuleTable::from_json(SAMPLE).unwrap();
        let rule = table.lookup("Chest Pain").unwrap();
        let names: Vec<&str> = rule.sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Cardiac History", "Lifestyle"]);
        assert_eq!(
            rule.sections[0].questions,
            vec!["Pain duration?", "Pain triggers?"]
        );
    }

    #[test]
    fn lookup_is_case_sensitive_exact_match() {
        let table = RuleTable::from_json(SAMPLE).unwrap();
        assert!(table.lookup("Chest Pain").is_some());
        assert!(table.lookup("chest pain").is_none());
        assert!(table.lookup("Back Pain").is_none());
    }

    #[test]
    fn rejects_duplicate_symptom_key() {
        let raw = r#"[
            {"symptom": "Fever", "follow_up_questions": {"General": ["How high?"]}},
            {"symptom": "Fever", "follow_up_questions": {"General": ["How long?"]}}
        ]"#;
        let err = RuleTable::from_json(raw).unwrap_err();
        assert!(matches!(err, RuleTableError::Invalid { .. }));
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn rejects_empty_symptom_key() {
        let raw = r#"[{"symptom": "  ", "follow_up_questions": {}}]"#;
        assert!(matches!(
            RuleTable::from_json(raw),
            Err(RuleTableError::Invalid { .. })
        ));
    }

    #[test]
    fn rejects_empty_question_text() {
        let raw = r#"[
            {"symptom": "Fever", "follow_up_questions": {"General": ["How high?", ""]}}
        ]"#;
        let err = RuleTable::from_json(raw).unwrap_err();
        assert!(err.to_string().contains("empty question"));
    }

    #[test]
    fn rejects_empty_section_name() {
        let raw = r#"[
            {"symptom": "Fever", "follow_up_questions": {"": ["How high?"]}}
        ]"#;
        assert!(matches!(
            RuleTable::from_json(raw),
            Err(RuleTableError::Invalid { .. })
        ));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            RuleTable::from_json("{not json"),
            Err(RuleTableError::Parse(_))
        ));
        // An object where a sequence is expected is a parse error too
        assert!(matches!(
            RuleTable::from_json(r#"{"symptom": "Fever"}"#),
            Err(RuleTableError::Parse(_))
        ));
    }

    #[test]
    fn load_reads_a_rule_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, SAMPLE).unwrap();

        let table = RuleTable::load(&path).unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn load_reports_missing_file_as_io_error() {
        let err = RuleTable::load("/nonexistent/rules.json").unwrap_err();
        assert!(matches!(err, RuleTableError::Io(_)));
    }

    #[test]
    fn shipped_rule_file_is_valid() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/data/symptom-rules.json");
        let table = RuleTable::load(path).unwrap();
        assert!(!table.is_empty());
        assert!(table.lookup("Chest Pain").is_some());
        assert!(table.lookup("Shortness of Breath").is_some());
    }
}
