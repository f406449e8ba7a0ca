//! JSON dataset ingestion
//!
//! ```json
//! {"factor": "TTFF",
//!  "variables": [{"name": "R bucket",
//!                 "groups": [{"label": "Transparent", "values": [1.2, null]}]}]}
//! ```

use crate::preprocess::RawGroup;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// One measured variable with its per-condition observations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub groups: Vec<RawGroup>,
}

/// All variables recorded for one factor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Measured quantity (e.g. "TTFF", "Duration")
    pub factor: String,
    pub variables: Vec<Variable>,
}

impl Dataset {
    /// Load and validate a dataset file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read dataset: {}", path.display()))?;
        Self::from_json_str(&content)
            .with_context(|| format!("Invalid dataset: {}", path.display()))
    }

    /// Parse and validate dataset JSON
    pub fn from_json_str(content: &str) -> Result<Self> {
        let dataset: Dataset =
            serde_json::from_str(content).context("Failed to parse dataset JSON")?;
        dataset.validate()?;
        Ok(dataset)
    }

    /// Unique, non-empty variable names and unique labels per variable
    pub fn validate(&self) -> Result<()> {
        if self.factor.trim().is_empty() {
            bail!("factor name is empty");
        }
        if self.variables.is_empty() {
            bail!("dataset '{}' has no variables", self.factor);
        }
        let mut names = HashSet::new();
        for variable in &self.variables {
            if !names.insert(variable.name.as_str()) {
                bail!("duplicate variable '{}'", variable.name);
            }
            let mut labels = HashSet::new();
            for group in &variable.groups {
                if !labels.insert(group.label.as_str()) {
                    bail!(
                        "duplicate group '{}' in variable '{}'",
                        group.label,
                        variable.name
                    );
                }
            }
        }
        Ok(())
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"{
        "factor": "TTFF",
        "variables": [
            {"name": "R bucket", "groups": [
                {"label": "Transparent", "values": [120.5, null, 98.0]},
                {"label": "Red", "values": [140.0, 150.5]}
            ]}
        ]
    }"#;

    #[test]
    fn test_parse_with_missing_values() {
        let dataset = Dataset::from_json_str(SAMPLE).unwrap();
        assert_eq!(dataset.factor, "TTFF");
        let variable = dataset.variable("R bucket").unwrap();
        assert_eq!(variable.groups[0].values, vec![Some(120.5), None, Some(98.0)]);
    }

    #[test]
    fn test_rejects_duplicate_labels() {
        let json = r#"{"factor": "TTFF", "variables": [{"name": "x", "groups": [
            {"label": "Red", "values": [1.0]}, {"label": "Red", "values": [2.0]}]}]}"#;
        let err = Dataset::from_json_str(json).unwrap_err();
        assert!(err.to_string().contains("duplicate group"));
    }

    #[test]
    fn test_rejects_empty_dataset() {
        assert!(Dataset::from_json_str(r#"{"factor": "TTFF", "variables": []}"#).is_err());
        assert!(Dataset::from_json_str("not json").is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let dataset = Dataset::from_file(file.path()).unwrap();
        assert_eq!(dataset.variables.len(), 1);

        let missing = Dataset::from_file("/nonexistent/goggles.json").unwrap_err();
        assert!(format!("{:#}", missing).contains("Failed to read dataset"));
    }
}
