use std::path::{Path, PathBuf};

use serde::Deserialize;

pub const CONFIG_FILE: &str = "Decaf.toml";

/// The parsed Decaf.toml configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DecafConfig {
    #[serde(default)]
    pub analysis: AnalysisSection,
    #[serde(default)]
    pub diagnostics: DiagnosticsSection,
    /// The directory containing the Decaf.toml file.
    #[serde(skip)]
    pub root_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisSection {
    #[serde(default = "default_entry_point")]
    pub entry_point: String,
    #[serde(default = "default_true")]
    pub require_entry_point: bool,
}

impl Default for AnalysisSection {
    fn default() -> Self {
        Self {
            entry_point: default_entry_point(),
            require_entry_point: true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiagnosticsSection {
    #[serde(default)]
    pub format: DiagnosticFormat,
    /// 0 prints every diagnostic.
    #[serde(default)]
    pub max_errors: usize,
}

/// How the command-line front end renders diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticFormat {
    #[default]
    Human,
    Plain,
    Json,
}

fn default_entry_point() -> String {
    "main".to_string()
}

fn default_true() -> bool {
    true
}

/// Errors that can occur when loading a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read Decaf.toml: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("invalid Decaf.toml: {0}")]
    ParseError(String),
    #[error("invalid Decaf.toml: [analysis] entry_point must not be empty")]
    EmptyEntryPoint,
}

/// Walk up from `start_dir` looking for `Decaf.toml`.
pub fn find_config(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();
    loop {
        let candidate = current.join(CONFIG_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Load and validate a configuration file from a path.
pub fn load_config(path: &Path) -> Result<DecafConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let root_dir = path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    parse_config(&content, root_dir)
}

/// Parse and validate a configuration from a string.
pub fn parse_config(content: &str, root_dir: PathBuf) -> Result<DecafConfig, ConfigError> {
    let mut config: DecafConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    if config.analysis.entry_point.trim().is_empty() {
        return Err(ConfigError::EmptyEntryPoint);
    }
    config.root_dir = root_dir;
    Ok(config)
}

/// Find and load the configuration governing `input_file`.
///
/// A missing file yields the defaults.
pub fn find_and_load_config(input_file: &Path) -> Result<DecafConfig, ConfigError> {
    let start_dir = input_file.parent().unwrap_or_else(|| Path::new("."));
    match find_config(start_dir) {
        Some(path) => load_config(&path),
        None => Ok(DecafConfig {
            root_dir: start_dir.to_path_buf(),
            ..DecafConfig::default()
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_config_uses_defaults() {
        let config = parse_config("", PathBuf::from(".")).unwrap();
        assert_eq!(config.analysis.entry_point, "main");
        assert!(config.analysis.require_entry_point);
        assert_eq!(config.diagnostics.format, DiagnosticFormat::Human);
        assert_eq!(config.diagnostics.max_errors, 0);
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[analysis]
entry_point = "start"
require_entry_point = false

[diagnostics]
format = "json"
max_errors = 10
"#;
        let config = parse_config(toml, PathBuf::from("/proj")).unwrap();
        assert_eq!(config.analysis.entry_point, "start");
        assert!(!config.analysis.require_entry_point);
        assert_eq!(config.diagnostics.format, DiagnosticFormat::Json);
        assert_eq!(config.diagnostics.max_errors, 10);
        assert_eq!(config.root_dir, PathBuf::from("/proj"));
    }

    #[test]
    fn unknown_format_fails() {
        let toml = "[diagnostics]\nformat = \"xml\"\n";
        assert!(matches!(
            parse_config(toml, PathBuf::from(".")),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn empty_entry_point_fails() {
        let toml = "[analysis]\nentry_point = \"  \"\n";
        assert!(matches!(
            parse_config(toml, PathBuf::from(".")),
            Err(ConfigError::EmptyEntryPoint)
        ));
    }

    #[test]
    fn find_config_walks_up() {
        let tmp = std::env::temp_dir().join("decaf_test_config");
        let _ = std::fs::remove_dir_all(&tmp);
        std::fs::create_dir_all(tmp.join("src/nested")).unwrap();
        std::fs::write(tmp.join(CONFIG_FILE), "[analysis]\nentry_point = \"go\"\n").unwrap();

        let found = find_config(&tmp.join("src/nested"));
        assert_eq!(found, Some(tmp.join(CONFIG_FILE)));

        let config = find_and_load_config(&tmp.join("src/nested/prog.json")).unwrap();
        assert_eq!(config.analysis.entry_point, "go");

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
