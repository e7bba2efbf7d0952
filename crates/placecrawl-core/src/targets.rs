use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// One query to resolve. Immutable once enqueued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlTarget {
    /// Business name as typed into the site search.
    pub name: String,
    /// Free-text area hint (e.g. a district) used to score candidate addresses.
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl CrawlTarget {
    #[must_use]
    pub fn new(name: &str, location: Option<&str>) -> Self {
        Self {
            name: name.trim().to_string(),
            location: non_blank(location),
            address: None,
        }
    }

    #[must_use]
    pub fn with_address(mut self, address: &str) -> Self {
        self.address = non_blank(Some(address));
        self
    }

    /// The location hint, or an empty string when none was given.
    #[must_use]
    pub fn location_hint(&self) -> &str {
        self.location.as_deref().unwrap_or("")
    }

    /// Text matched against candidate addresses: the location hint, else the
    /// street address, else nothing.
    #[must_use]
    pub fn resolution_hint(&self) -> &str {
        self.location
            .as_deref()
            .or(self.address.as_deref())
            .unwrap_or("")
    }

    fn trimmed(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            location: non_blank(self.location.as_deref()),
            address: non_blank(self.address.as_deref()),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl std::fmt::Display for CrawlTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.location {
            Some(loc) => write!(f, "{} ({loc})", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TargetsFile {
    pub targets: Vec<CrawlTarget>,
}

/// Load and validate a YAML target list.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_targets(path: &Path) -> Result<TargetsFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::TargetsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let mut targets_file: TargetsFile = serde_yaml::from_str(&content)?;
    targets_file.targets = targets_file
        .targets
        .into_iter()
        .map(CrawlTarget::trimmed)
        .collect();
    validate_targets(&targets_file)?;
    Ok(targets_file)
}

fn validate_targets(targets_file: &TargetsFile) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for target in &targets_file.targets {
        if target.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "target name must be non-empty".to_string(),
            ));
        }
        let key = (target.name.trim(), target.location_hint().trim());
        if !seen.insert(key) {
            return Err(ConfigError::Validation(format!(
                "duplicate target: '{target}'"
            )));
        }
    }

    Ok(())
}
