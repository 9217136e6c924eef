use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// The recognized settings keys, in display order.
pub const CONFIG_KEYS: [&str; 4] = ["apiKey", "baseUrl", "model", "debug"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
            debug: false,
        }
    }
}

impl Config {
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "apiKey" => Some(self.api_key.clone()),
            "baseUrl" => Some(self.base_url.clone()),
            "model" => Some(self.model.clone()),
            "debug" => Some(self.debug.to_string()),
            _ => None,
        }
    }

    /// Updates one key in memory. Unknown keys and malformed values are
    /// rejected and leave the record untouched.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), SessionError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(SessionError::ConfigValidation(format!(
                "value for `{key}` must not be empty"
            )));
        }
        match key {
            "apiKey" => self.api_key = value.to_string(),
            "baseUrl" => self.base_url = value.to_string(),
            "model" => self.model = value.to_string(),
            "debug" => {
                self.debug = match value {
                    "true" => true,
                    "false" => false,
                    other => {
                        return Err(SessionError::ConfigValidation(format!(
                            "debug must be `true` or `false`, got `{other}`"
                        )));
                    }
                }
            }
            other => {
                return Err(SessionError::ConfigValidation(format!(
                    "unknown key `{other}` (expected one of: {})",
                    CONFIG_KEYS.join(", ")
                )));
            }
        }
        Ok(())
    }

    pub fn list(&self) -> Vec<(&'static str, String)> {
        CONFIG_KEYS
            .iter()
            .map(|key| (*key, self.get(key).unwrap_or_default()))
            .collect()
    }
}

pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("cannot resolve home directory")?;
    Ok(home.join(".confab"))
}

pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads the record from `path`, creating the file with defaults when it is
/// missing. A present but unreadable or unparsable file is reported as a
/// warning and defaults are used; the session still starts.
pub fn load_or_default(path: &Path) -> Config {
    if !path.exists() {
        let cfg = Config::default();
        if let Err(err) = save_to(path, &cfg) {
            tracing::warn!("could not write default config {}: {err}", path.display());
        }
        return cfg;
    }

    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            tracing::warn!("could not read config {}: {err}; using defaults", path.display());
            return Config::default();
        }
    };
    match toml::from_str(&text) {
        Ok(cfg) => cfg,
        Err(err) => {
            tracing::warn!("invalid config {}: {err}; using defaults", path.display());
            Config::default()
        }
    }
}

/// Persists the record atomically: the new content goes to a temp file in
/// the same directory, is synced, then renamed over the target. A failure
/// at any step leaves the previous on-disk record in place.
pub fn save_to(path: &Path, cfg: &Config) -> Result<(), SessionError> {
    let Some(parent) = path.parent() else {
        return Err(SessionError::fs(
            path,
            io::Error::new(io::ErrorKind::InvalidInput, "config path has no parent directory"),
        ));
    };
    if !parent.as_os_str().is_empty() {
        fs::create_dir_all(parent).map_err(|err| SessionError::fs(parent, err))?;
    }

    let text = toml::to_string_pretty(cfg)
        .map_err(|err| SessionError::ConfigValidation(format!("cannot serialize settings: {err}")))?;

    let tmp = path.with_extension("toml.tmp");
    if let Err(err) = write_replace(&tmp, path, &text) {
        let _ = fs::remove_file(&tmp);
        return Err(SessionError::fs(path, err));
    }
    Ok(())
}

fn write_replace(tmp: &Path, path: &Path, text: &str) -> io::Result<()> {
    let mut file = File::create(tmp)?;
    file.write_all(text.as_bytes())?;
    file.sync_all()?;
    drop(file);
    fs::rename(tmp, path)
}

/// Validates, persists, then commits, so the in-memory record only changes
/// when the new value reached disk.
pub fn set_and_save(cfg: &mut Config, path: &Path, key: &str, value: &str) -> Result<(), SessionError> {
    let mut next = cfg.clone();
    next.set(key, value)?;
    save_to(path, &next)?;
    *cfg = next;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_config_path(dir: &TempDir) -> PathBuf {
        dir.path().join("config.toml")
    }

    // ---- defaults and key access ----

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.api_key, "");
        assert_eq!(cfg.base_url, "https://api.openai.com/v1");
        assert_eq!(cfg.model, "gpt-4o");
        assert!(!cfg.debug);
    }

    #[test]
    fn test_get_known_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("apiKey"), Some(String::new()));
        assert_eq!(cfg.get("baseUrl"), Some("https://api.openai.com/v1".to_string()));
        assert_eq!(cfg.get("model"), Some("gpt-4o".to_string()));
        assert_eq!(cfg.get("debug"), Some("false".to_string()));
        assert_eq!(cfg.get("nonsense"), None);
    }

    #[test]
    fn test_list_is_ordered() {
        let cfg = Config::default();
        let keys: Vec<&str> = cfg.list().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["apiKey", "baseUrl", "model", "debug"]);
    }

    // ---- set validation ----

    #[test]
    fn test_set_valid_keys() {
        let mut cfg = Config::default();
        cfg.set("apiKey", "sk-test").unwrap();
        cfg.set("baseUrl", "https://example.invalid/v1").unwrap();
        cfg.set("model", "gpt-4o-mini").unwrap();
        cfg.set("debug", "true").unwrap();
        assert_eq!(cfg.api_key, "sk-test");
        assert_eq!(cfg.base_url, "https://example.invalid/v1");
        assert_eq!(cfg.model, "gpt-4o-mini");
        assert!(cfg.debug);
    }

    #[test]
    fn test_set_unknown_key_rejected_and_unchanged() {
        let mut cfg = Config::default();
        let before = cfg.clone();
        let err = cfg.set("temperature", "0.7").unwrap_err();
        assert!(matches!(err, SessionError::ConfigValidation(_)));
        assert!(err.to_string().contains("unknown key `temperature`"));
        assert_eq!(cfg, before);
    }

    #[test]
    fn test_set_malformed_debug_rejected() {
        let mut cfg = Config::default();
        let err = cfg.set("debug", "yes").unwrap_err();
        assert!(matches!(err, SessionError::ConfigValidation(_)));
        assert!(!cfg.debug);
    }

    #[test]
    fn test_set_empty_value_rejected() {
        let mut cfg = Config::default();
        let err = cfg.set("model", "   ").unwrap_err();
        assert!(matches!(err, SessionError::ConfigValidation(_)));
        assert_eq!(cfg.model, "gpt-4o");
    }

    #[test]
    fn test_set_trims_value() {
        let mut cfg = Config::default();
        cfg.set("model", "  gpt-4o-mini  ").unwrap();
        assert_eq!(cfg.model, "gpt-4o-mini");
    }

    // ---- persistence ----

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = temp_config_path(&dir);
        let mut cfg = Config::default();
        cfg.set("apiKey", "sk-round-trip").unwrap();
        cfg.set("debug", "true").unwrap();
        save_to(&path, &cfg).unwrap();

        let loaded = load_or_default(&path);
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn test_on_disk_keys_are_camel_case() {
        let dir = TempDir::new().unwrap();
        let path = temp_config_path(&dir);
        save_to(&path, &Config::default()).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("apiKey"));
        assert!(text.contains("baseUrl"));
        assert!(!text.contains("api_key"));
    }

    #[test]
    fn test_load_missing_file_creates_defaults() {
        let dir = TempDir::new().unwrap();
        let path = temp_config_path(&dir);
        let cfg = load_or_default(&path);
        assert_eq!(cfg, Config::default());
        assert!(path.exists());
    }

    #[test]
    fn test_load_corrupt_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = temp_config_path(&dir);
        fs::write(&path, "model = [this is not toml").unwrap();
        let cfg = load_or_default(&path);
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn test_load_ignores_unknown_keys() {
        let dir = TempDir::new().unwrap();
        let path = temp_config_path(&dir);
        fs::write(&path, "model = \"gpt-4o-mini\"\nfutureKey = \"whatever\"\n").unwrap();
        let cfg = load_or_default(&path);
        assert_eq!(cfg.model, "gpt-4o-mini");
        assert_eq!(cfg.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let path = temp_config_path(&dir);
        save_to(&path, &Config::default()).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("toml.tmp").exists());
    }

    #[test]
    fn test_set_and_save_commits_both_layers() {
        let dir = TempDir::new().unwrap();
        let path = temp_config_path(&dir);
        let mut cfg = Config::default();
        set_and_save(&mut cfg, &path, "model", "gpt-4o-mini").unwrap();
        assert_eq!(cfg.model, "gpt-4o-mini");
        assert_eq!(load_or_default(&path).model, "gpt-4o-mini");
    }

    #[test]
    fn test_set_and_save_invalid_key_leaves_disk_unchanged() {
        let dir = TempDir::new().unwrap();
        let path = temp_config_path(&dir);
        let mut cfg = Config::default();
        set_and_save(&mut cfg, &path, "model", "gpt-4o-mini").unwrap();
        let before = fs::read_to_string(&path).unwrap();

        let err = set_and_save(&mut cfg, &path, "bogus", "value").unwrap_err();
        assert!(matches!(err, SessionError::ConfigValidation(_)));
        assert_eq!(cfg.model, "gpt-4o-mini");
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
    }
}
