use crate::config::settings::RecapConfig;
use crate::error::{RecapError, Result};
use crate::llm::LlmProvider;
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

/// Get XDG-compliant config directory
pub fn config_dir() -> Result<PathBuf> {
    ProjectDirs::from("", "", "recap")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| RecapError::Config("Could not determine config directory".to_string()))
}

/// Get config file path
pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Load config from the default location, creating it if missing
pub fn load_config() -> Result<RecapConfig> {
    load_config_from(&config_path()?)
}

pub fn load_config_from(path: &Path) -> Result<RecapConfig> {
    if !path.exists() {
        let config = RecapConfig::default();
        save_config_to(&config, path)?;
        return Ok(config);
    }

    read_config_from(path)
}

/// Load config without touching the filesystem when it is missing
pub fn peek_config() -> Result<Option<RecapConfig>> {
    let path = config_path()?;
    if !path.exists() {
        return Ok(None);
    }
    read_config_from(&path).map(Some)
}

fn read_config_from(path: &Path) -> Result<RecapConfig> {
    let content = fs::read_to_string(path)?;
    let config: RecapConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Write a default config unless one exists. Returns whether it was created.
pub fn init_config_at(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    save_config_to(&RecapConfig::default(), path)?;
    Ok(true)
}

pub fn save_config_to(config: &RecapConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let content = toml::to_string_pretty(config)?;
    fs::write(path, content)?;
    Ok(())
}

pub fn load_config_with_env() -> Result<RecapConfig> {
    let mut config = load_config()?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    config.summarizer.validate()?;
    Ok(config)
}

/// Later keys in each list win. `OPENAI_MODEL` is ignored for Anthropic.
pub fn apply_env_overrides<F>(config: &mut RecapConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(provider) = lookup("RECAP_PROVIDER") {
        config.llm.provider = provider;
    }
    for key in ["OPENAI_API_KEY", "RECAP_API_KEY"] {
        if let Some(value) = lookup(key) {
            config.llm.api_key = Some(value);
        }
    }
    let provider = LlmProvider::from_provider(&config.llm.provider);
    if provider != Some(LlmProvider::Anthropic) {
        if let Some(value) = lookup("OPENAI_MODEL") {
            config.llm.model = Some(value);
        }
    }
    if let Some(value) = lookup("RECAP_MODEL") {
        config.llm.model = Some(value);
    }
    if let Some(bind) = lookup("RECAP_BIND") {
        config.server.bind = bind;
    }
    if let Some(key) = lookup("RECAP_TRANSCRIPTION_API_KEY") {
        config.transcription.api_key = Some(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_serializes() {
        let config = RecapConfig::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[llm]"));
        assert!(toml.contains("[summarizer]"));
        assert!(toml.contains("[retry]"));
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = load_config_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.summarizer.cache_capacity, 100);
    }

    #[test]
    fn test_config_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = RecapConfig::default();
        config.summarizer.chunk_char_limit = 500;
        config.llm.model = Some("gpt-4o".to_string());
        save_config_to(&config, &path).unwrap();

        let parsed = load_config_from(&path).unwrap();
        assert_eq!(parsed.summarizer.chunk_char_limit, 500);
        assert_eq!(parsed.llm.model.as_deref(), Some("gpt-4o"));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_MODEL", "gpt-4o-mini"),
            ("RECAP_BIND", "0.0.0.0:9000"),
        ]
        .into_iter()
        .collect();

        let mut config = RecapConfig::default();
        apply_env_overrides(&mut config, |key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.llm.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.llm.effective_model(), "gpt-4o-mini");
        assert_eq!(config.server.bind, "0.0.0.0:9000");
        assert_eq!(config.llm.provider, "openai");
    }

    #[test]
    fn test_openai_model_ignored_for_anthropic() {
        let env: HashMap<&str, &str> = [
            ("RECAP_PROVIDER", "anthropic"),
            ("OPENAI_MODEL", "gpt-4o-mini"),
        ]
        .into_iter()
        .collect();

        let mut config = RecapConfig::default();
        apply_env_overrides(&mut config, |key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.llm.provider, "anthropic");
        assert_eq!(config.llm.model, None);

        let env: HashMap<&str, &str> = [
            ("RECAP_PROVIDER", "anthropic"),
            ("OPENAI_MODEL", "gpt-4o-mini"),
            ("RECAP_MODEL", "claude-sonnet-4-20250514"),
        ]
        .into_iter()
        .collect();

        let mut config = RecapConfig::default();
        apply_env_overrides(&mut config, |key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.llm.model.as_deref(), Some("claude-sonnet-4-20250514"));
    }

    #[test]
    fn test_init_creates_only_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("recap").join("config.toml");

        assert!(init_config_at(&path).unwrap());
        assert!(path.exists());
        assert!(!init_config_at(&path).unwrap());
    }

    #[test]
    fn test_read_does_not_create_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        assert!(read_config_from(&path).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_config_paths_are_valid() {
        let _ = config_dir();
        let _ = config_path();
    }
}
