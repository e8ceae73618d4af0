//! Item records for the build.
//!
//! A catalog is either a JSON array of objects or JSON Lines (one object per
//! line). Each record needs a non-empty title and a descriptor; the descriptor
//! may be a string or an array of strings, which are joined with spaces.
//! Other fields are ignored.
//!
//! ```text
//! [{"title": "The Matrix", "tags": "hacker simulation kung fu"}, ...]
//! ```

use crate::config::CatalogConfig;
use crate::error::{BuildError, Result};
use serde_json::Value;
use std::path::Path;

/// Fallback descriptor field when the configured one is `tags` and absent.
pub const LEGACY_TAGS_FIELD: &str = "TKN";

/// A titled item with its raw descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub title: String,
    pub descriptor: String,
}

impl Item {
    pub fn new(title: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            descriptor: descriptor.into(),
        }
    }
}

/// Items in build order. Position is the item index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    items: Vec<Item>,
}

impl Catalog {
    pub fn new(items: Vec<Item>) -> Self {
        Self { items }
    }

    #[must_use]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn titles(&self) -> Vec<String> {
        self.items.iter().map(|i| i.title.clone()).collect()
    }

    pub fn descriptors(&self) -> Vec<&str> {
        self.items.iter().map(|i| i.descriptor.as_str()).collect()
    }

    /// Read a catalog file.
    pub fn from_path(path: &Path, fields: &CatalogConfig) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| BuildError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text, fields)
    }

    /// Parse a JSON array or JSON Lines document.
    pub fn from_json_str(text: &str, fields: &CatalogConfig) -> Result<Self> {
        let records: Vec<Value> = if text.trim_start().starts_with('[') {
            serde_json::from_str(text).map_err(|e| BuildError::Catalog(e.to_string()))?
        } else {
            text.lines()
                .enumerate()
                .filter(|(_, line)| !line.trim().is_empty())
                .map(|(n, line)| {
                    serde_json::from_str(line)
                        .map_err(|e| BuildError::Catalog(format!("line {}: {e}", n + 1)))
                })
                .collect::<Result<_>>()?
        };
        Self::from_records(&records, fields)
    }

    /// Extract items from parsed records.
    pub fn from_records(records: &[Value], fields: &CatalogConfig) -> Result<Self> {
        let items = records
            .iter()
            .enumerate()
            .map(|(record, value)| parse_record(record, value, fields))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { items })
    }
}

impl FromIterator<Item> for Catalog {
    fn from_iter<I: IntoIterator<Item = Item>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

fn parse_record(record: usize, value: &Value, fields: &CatalogConfig) -> Result<Item> {
    let obj = value
        .as_object()
        .ok_or_else(|| BuildError::Catalog(format!("record {record} is not an object")))?;

    let missing = |field: &str| BuildError::MissingField {
        record,
        field: field.to_string(),
    };

    let title = obj
        .get(&fields.title_field)
        .and_then(Value::as_str)
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| missing(&fields.title_field))?;

    let tags = obj.get(&fields.tags_field).or_else(|| {
        (fields.tags_field == "tags")
            .then(|| obj.get(LEGACY_TAGS_FIELD))
            .flatten()
    });

    let descriptor = match tags {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(parts)) => {
            let parts: Option<Vec<&str>> = parts.iter().map(Value::as_str).collect();
            parts.ok_or_else(|| missing(&fields.tags_field))?.join(" ")
        }
        _ => return Err(missing(&fields.tags_field)),
    };

    Ok(Item {
        title: title.to_string(),
        descriptor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> CatalogConfig {
        CatalogConfig::default()
    }

    #[test]
    fn parses_json_array() {
        let text = r#"[
            {"title": "The Matrix", "tags": "hacker simulation", "year": 1999},
            {"title": "Inception", "tags": ["dream", "heist"]}
        ]"#;
        let catalog = Catalog::from_json_str(text, &fields()).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.items()[1].descriptor, "dream heist");
    }

    #[test]
    fn parses_json_lines_and_legacy_field() {
        let text = "{\"title\": \"A\", \"TKN\": \"x y\"}\n\n{\"title\": \"B\", \"tags\": \"z\"}\n";
        let catalog = Catalog::from_json_str(text, &fields()).unwrap();
        assert_eq!(catalog.titles(), vec!["A", "B"]);
        assert_eq!(catalog.descriptors(), vec!["x y", "z"]);
    }

    #[test]
    fn missing_fields_name_the_record() {
        let text = r#"[{"title": "A", "tags": "x"}, {"tags": "y"}]"#;
        match Catalog::from_json_str(text, &fields()) {
            Err(BuildError::MissingField { record, field }) => {
                assert_eq!(record, 1);
                assert_eq!(field, "title");
            }
            other => panic!("unexpected: {other:?}"),
        }

        let text = r#"[{"title": "A"}]"#;
        assert!(matches!(
            Catalog::from_json_str(text, &fields()),
            Err(BuildError::MissingField { record: 0, .. })
        ));

        let text = r#"[{"title": "  ", "tags": "x"}]"#;
        assert!(matches!(
            Catalog::from_json_str(text, &fields()),
            Err(BuildError::MissingField { .. })
        ));
    }

    #[test]
    fn malformed_json_is_a_catalog_error() {
        let text = "{\"title\": \"A\", \"tags\": \"x\"}\n{oops";
        match Catalog::from_json_str(text, &fields()) {
            Err(BuildError::Catalog(msg)) => assert!(msg.starts_with("line 2")),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
