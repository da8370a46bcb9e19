use super::types::{FolioConfig, CONFIG_FILE};
use crate::error::{FolioError, Result};
use std::path::Path;

/// Parse a folio.yaml file into a FolioConfig
pub fn parse_config(path: &Path) -> Result<FolioConfig> {
    let content = std::fs::read_to_string(path)?;
    parse_config_str(&content)
}

/// Parse a config YAML string into a FolioConfig
pub fn parse_config_str(content: &str) -> Result<FolioConfig> {
    if content.trim().is_empty() {
        return Ok(FolioConfig::default());
    }
    let config: FolioConfig = serde_yaml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Load `folio.yaml` from the content directory, falling back to defaults
/// when the file does not exist.
pub fn load_config(content_dir: &Path) -> Result<FolioConfig> {
    let path = content_dir.join(CONFIG_FILE);
    if path.exists() {
        log::debug!("Loading config from {}", path.display());
        parse_config(&path)
    } else {
        Ok(FolioConfig::default())
    }
}

fn validate(config: &FolioConfig) -> Result<()> {
    for (name, marker) in [
        ("sections_marker", &config.sections_marker),
        ("specials_marker", &config.specials_marker),
    ] {
        if marker.is_empty() || marker.contains('/') {
            return Err(FolioError::Config(format!(
                "{name} must be a single non-empty path segment, got '{marker}'"
            )));
        }
    }
    if config.sections_marker == config.specials_marker {
        return Err(FolioError::Config(
            "sections_marker and specials_marker must differ".into(),
        ));
    }
    if config.extensions.is_empty() {
        return Err(FolioError::Config("extensions must not be empty".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_SENTINEL;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config_str("").unwrap();
        assert_eq!(config, FolioConfig::default());
        assert_eq!(config.sentinel, DEFAULT_SENTINEL);
        assert_eq!(config.sections_marker, "sections");
    }

    #[test]
    fn test_partial_config() {
        let config = parse_config_str("root: /crypto-high/\nsentinel: 9999\n").unwrap();
        assert_eq!(config.root_prefix(), "/crypto-high");
        assert_eq!(config.sentinel, 9999);
        assert_eq!(config.specials_marker, "specials");
        assert!(config.indexes_extension("MD"));
    }

    #[test]
    fn test_rejects_bad_markers() {
        assert!(parse_config_str("sections_marker: a/b").is_err());
        assert!(parse_config_str("sections_marker: x\nspecials_marker: x").is_err());
        assert!(parse_config_str("extensions: []").is_err());
    }

    #[test]
    fn test_load_config_missing_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.root_prefix(), "");
    }
}
