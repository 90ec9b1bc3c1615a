use crate::errors::{AutofillError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Semantic slot -> ordered candidate keywords, fuzzy-matched against label
/// text, placeholder, name, aria-label and id. Loaded once per page load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldMappings {
    mappings: BTreeMap<String, Vec<String>>,
}

impl FieldMappings {
    pub fn new(mappings: BTreeMap<String, Vec<String>>) -> Self {
        Self { mappings }
    }

    /// Accepts a JSON object mapping slot names to a keyword string or a
    /// list of keyword strings.
    pub fn from_json(value: &Value) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| AutofillError::ProfileError("field mappings must be an object".into()))?;

        let mut mappings = BTreeMap::new();
        for (slot, raw) in object {
            let keywords = match raw {
                Value::String(s) => vec![s.clone()],
                Value::Array(items) => items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect(),
                other => {
                    return Err(AutofillError::ProfileError(format!(
                        "keywords for '{}' must be a string or list, got {}",
                        slot, other
                    )));
                }
            };
            mappings.insert(slot.clone(), keywords);
        }
        Ok(Self { mappings })
    }

    pub fn keywords(&self, slot: &str) -> Option<&[String]> {
        self.mappings.get(slot).map(Vec::as_slice)
    }

    pub fn slots(&self) -> impl Iterator<Item = &str> {
        self.mappings.keys().map(String::as_str)
    }

    pub fn insert(&mut self, slot: impl Into<String>, keywords: Vec<String>) {
        self.mappings.insert(slot.into(), keywords);
    }
}

impl Default for FieldMappings {
    /// Built-in keyword table covering the slots common to application forms.
    fn default() -> Self {
        let table: &[(&str, &[&str])] = &[
            ("firstName", &["first name", "first_name", "firstname", "given name", "given-name"]),
            ("lastName", &["last name", "last_name", "lastname", "family name", "surname"]),
            ("fullName", &["full name", "your name", "legal name", "name"]),
            ("email", &["email", "e-mail"]),
            ("phone", &["phone", "mobile", "telephone", "cell"]),
            ("linkedin", &["linkedin"]),
            ("github", &["github"]),
            ("website", &["website", "portfolio", "personal site"]),
            ("location", &["location", "city", "address"]),
            ("currentCompany", &["current company", "employer", "company", "org"]),
            ("currentTitle", &["current title", "job title", "title"]),
            ("salary", &["salary", "compensation", "desired pay", "expected pay"]),
            ("gender", &["gender"]),
            ("ethnicity", &["ethnicity", "race"]),
            ("veteranStatus", &["veteran"]),
            ("disabilityStatus", &["disability"]),
            ("workAuthorization", &["authorized to work", "work authorization", "legally authorized"]),
            ("sponsorship", &["sponsorship", "require sponsorship", "visa"]),
            ("pronouns", &["pronouns"]),
            ("howHeard", &["how did you hear"]),
            ("coverLetter", &["cover letter", "cover_letter"]),
            ("resume", &["resume", "cv"]),
        ];

        let mappings = table
            .iter()
            .map(|(slot, keywords)| {
                (
                    slot.to_string(),
                    keywords.iter().map(|k| k.to_string()).collect(),
                )
            })
            .collect();
        Self { mappings }
    }
}

/// Flat mapping from semantic slot to the literal value to inject. Immutable
/// for the session; supplied by the caller (answers to free-text questions
/// arrive here already resolved).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileRecord {
    values: BTreeMap<String, String>,
}

impl ProfileRecord {
    pub fn new(values: BTreeMap<String, String>) -> Self {
        Self { values }
    }

    /// Accepts a JSON object of string values; non-string entries are
    /// rejected rather than coerced.
    pub fn from_json(value: &Value) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| AutofillError::ProfileError("profile must be an object".into()))?;

        let mut values = BTreeMap::new();
        for (slot, v) in object {
            match v {
                Value::String(s) => {
                    values.insert(slot.clone(), s.clone());
                }
                other => {
                    return Err(AutofillError::ProfileError(format!(
                        "profile value for '{}' must be a string, got {}",
                        slot, other
                    )));
                }
            }
        }
        Ok(Self { values })
    }

    pub fn get(&self, slot: &str) -> Option<&str> {
        self.values.get(slot).map(String::as_str)
    }

    pub fn set(&mut self, slot: impl Into<String>, value: impl Into<String>) {
        self.values.insert(slot.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn mappings_accept_string_and_list_values() {
        let value = json!({
            "email": "email",
            "phone": ["phone", "mobile"],
        });
        let mappings = FieldMappings::from_json(&value).unwrap();
        assert_eq!(mappings.keywords("email").unwrap(), &["email".to_string()]);
        assert_eq!(
            mappings.keywords("phone").unwrap(),
            &["phone".to_string(), "mobile".to_string()]
        );
        assert!(mappings.keywords("linkedin").is_none());
    }

    #[test]
    fn mappings_reject_non_string_entries() {
        let value = json!({ "email": 42 });
        assert!(FieldMappings::from_json(&value).is_err());
    }

    #[test]
    fn default_mappings_cover_core_slots() {
        let mappings = FieldMappings::default();
        for slot in ["firstName", "lastName", "email", "phone", "linkedin"] {
            assert!(mappings.keywords(slot).is_some(), "missing slot {}", slot);
        }
    }

    #[test]
    fn profile_round_trips_string_values() {
        let value = json!({ "email": "jane@example.com", "phone": "555-0100" });
        let profile = ProfileRecord::from_json(&value).unwrap();
        assert_eq!(profile.get("email"), Some("jane@example.com"));
        assert_eq!(profile.get("missing"), None);
        assert_eq!(profile.len(), 2);
    }

    #[test]
    fn profile_rejects_non_string_values() {
        let value = json!({ "email": ["a", "b"] });
        assert!(ProfileRecord::from_json(&value).is_err());
    }
}
