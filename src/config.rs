//! Configuration handling for jtple.
//! Selectors that decide which elements are template roots and which are
//! variables, loadable from JSON or YAML.

use crate::error::{Error, Result};
use crate::selector::Selector;
use log::debug;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Supported configuration file names
pub const CONFIG_FILES: [&str; 3] = ["jtple.json", "jtple.yml", "jtple.yaml"];

pub const DEFAULT_TEMPLATE_ROOT_SELECTOR: &str = ".tpl";
pub const DEFAULT_VARIABLE_SELECTOR: &str = ".var";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct Config {
    /// Which elements are treated as template roots
    #[serde(alias = "tplClass")]
    pub template_root_selector: String,
    /// Which descendants are treated as substitutable variables
    #[serde(alias = "varClass")]
    pub variable_selector: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            template_root_selector: DEFAULT_TEMPLATE_ROOT_SELECTOR.to_string(),
            variable_selector: DEFAULT_VARIABLE_SELECTOR.to_string(),
        }
    }
}

/// Compiled form of [`Config`].
#[derive(Debug, Clone)]
pub struct Selectors {
    pub template_root: Selector,
    pub variable: Selector,
}

impl Selectors {
    /// True when either selector reads the attribute `name`.
    pub fn references_attribute(&self, name: &str) -> bool {
        self.template_root.references_attribute(name) || self.variable.references_attribute(name)
    }
}

impl Config {
    /// Parses configuration content, trying JSON first and YAML second.
    pub fn from_content(content: &str) -> Result<Self> {
        match serde_json::from_str(content) {
            Ok(config) => Ok(config),
            Err(_) => serde_yaml::from_str(content)
                .map_err(|e| Error::ConfigError(format!("Invalid configuration format: {e}"))),
        }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading configuration from {}", path.display());
        let content = std::fs::read_to_string(path).map_err(Error::IoError)?;
        Self::from_content(&content)
    }

    /// Compiles both selectors. A bare word such as `tpl` is read as the
    /// class selector `.tpl`.
    pub fn selectors(&self) -> Result<Selectors> {
        Ok(Selectors {
            template_root: Selector::parse(&normalize_selector(&self.template_root_selector))?,
            variable: Selector::parse(&normalize_selector(&self.variable_selector))?,
        })
    }
}

/// Reads instance values from a JSON or YAML file.
pub fn load_values<P: AsRef<Path>>(path: P) -> Result<serde_json::Value> {
    let path = path.as_ref();
    debug!("Loading values from {}", path.display());
    let content = std::fs::read_to_string(path).map_err(Error::IoError)?;
    match serde_json::from_str(&content) {
        Ok(values) => Ok(values),
        Err(_) => serde_yaml::from_str(&content)
            .map_err(|e| Error::ConfigError(format!("Invalid values file: {e}"))),
    }
}

/// Looks for the first supported configuration file inside `dir`.
pub fn find_config<P: AsRef<Path>>(dir: P) -> Option<PathBuf> {
    CONFIG_FILES
        .iter()
        .map(|file| dir.as_ref().join(file))
        .find(|path| path.exists())
}

fn normalize_selector(selector: &str) -> String {
    let selector = selector.trim();
    let bare_word = !selector.is_empty()
        && selector
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if bare_word {
        format!(".{selector}")
    } else {
        selector.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_selector() {
        assert_eq!(normalize_selector("tpl"), ".tpl");
        assert_eq!(normalize_selector(".tpl"), ".tpl");
        assert_eq!(normalize_selector("[data-var]"), "[data-var]");
    }

    #[test]
    fn test_yaml_with_legacy_keys() {
        let config = Config::from_content("tplClass: template\nvarClass: slot\n").unwrap();
        assert_eq!(config.template_root_selector, "template");
        assert_eq!(config.variable_selector, "slot");
        let selectors = config.selectors().unwrap();
        assert_eq!(selectors.template_root.as_str(), ".template");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = Config::from_content(r#"{"variableSelector": "[data-var]"}"#).unwrap();
        assert_eq!(config.template_root_selector, DEFAULT_TEMPLATE_ROOT_SELECTOR);
        assert_eq!(config.variable_selector, "[data-var]");
    }
}
