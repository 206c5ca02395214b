// Copyright 2026 The Onelane Project
// SPDX-License-Identifier: Apache-2.0

// Model catalog served by the /models routes.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse catalog file: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelEntry {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub owned_by: String,
}

impl ModelEntry {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            object: "model".to_string(),
            created: 0,
            owned_by: "onelane".to_string(),
        }
    }
}

/// OpenAI-shape model list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelCatalog {
    pub object: String,
    pub data: Vec<ModelEntry>,
}

impl ModelCatalog {
    pub fn new(data: Vec<ModelEntry>) -> Self {
        Self {
            object: "list".to_string(),
            data,
        }
    }

    /// Catalog advertised when no file is configured.
    pub fn builtin() -> Self {
        Self::new(vec![
            ModelEntry::new("onelane-default"),
            ModelEntry::new("gpt-3.5-turbo"),
        ])
    }

    /// Load entries from a JSON file holding either a bare entry array or
    /// a full `{"object": "list", "data": [...]}` document.
    pub fn from_json_file(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path)?;
        if let Ok(entries) = serde_json::from_str::<Vec<ModelEntry>>(&raw) {
            return Ok(Self::new(entries));
        }
        Ok(serde_json::from_str(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---------------------------------------------------------------
    // 1. Serialized shape
    // ---------------------------------------------------------------

    #[test]
    fn catalog_serializes_as_openai_list() {
        let value = serde_json::to_value(ModelCatalog::builtin()).unwrap();
        assert_eq!(value["object"], "list");
        assert_eq!(value["data"][0]["object"], "model");
        assert!(value["data"][0]["id"].is_string());
    }

    // ---------------------------------------------------------------
    // 2. File loading accepts both layouts
    // ---------------------------------------------------------------

    #[test]
    fn bare_array_file_parses() {
        let dir = std::env::temp_dir();
        let path = dir.join("onelane-catalog-bare.json");
        std::fs::write(
            &path,
            r#"[{"id": "a", "object": "model", "created": 1, "owned_by": "x"}]"#,
        )
        .unwrap();

        let catalog = ModelCatalog::from_json_file(&path).unwrap();
        assert_eq!(catalog.object, "list");
        assert_eq!(catalog.data[0].id, "a");
    }

    #[test]
    fn full_document_file_parses() {
        let dir = std::env::temp_dir();
        let path = dir.join("onelane-catalog-full.json");
        std::fs::write(
            &path,
            r#"{"object": "list", "data": [{"id": "b", "object": "model", "created": 2, "owned_by": "y"}]}"#,
        )
        .unwrap();

        let catalog = ModelCatalog::from_json_file(&path).unwrap();
        assert_eq!(catalog.data[0].id, "b");
    }
}
