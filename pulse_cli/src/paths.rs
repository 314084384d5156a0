//! Where the CLI keeps its data and which generator it talks to.

use std::path::PathBuf;

/// Overrides the data directory
pub const DATA_DIR_ENV: &str = "PULSETRACE_DATA_DIR";

/// Overrides the generator endpoint
pub const GENERATOR_URL_ENV: &str = "PULSETRACE_GENERATOR_URL";

/// Generator endpoint used when nothing else is configured
pub const DEFAULT_GENERATOR_URL: &str = "http://localhost:5000/generate_profile";

/// File holding the saved profile collection
pub const STORE_FILE: &str = "profiles.json";

/// Resolved locations for this run
#[derive(Debug, Clone)]
pub struct PathConfig {
    /// Custom data directory (from CLI or ENV)
    pub data_dir: Option<PathBuf>,
}

impl PathConfig {
    /// Priority: CLI args → ENV var (PULSETRACE_DATA_DIR) → None (use defaults)
    pub fn from_env_and_cli(cli_dir: Option<PathBuf>) -> Self {
        let data_dir = cli_dir.or_else(|| std::env::var(DATA_DIR_ENV).ok().map(PathBuf::from));
        Self { data_dir }
    }

    /// Path of the profile store file
    ///
    /// Platform paths when no override is set:
    /// - Linux: ~/.local/share/pulsetrace/profiles.json
    /// - macOS: ~/Library/Application Support/pulsetrace/profiles.json
    /// - Windows: %APPDATA%\pulsetrace\profiles.json
    pub fn store_file(&self) -> PathBuf {
        self.data_dir().join(STORE_FILE)
    }

    fn data_dir(&self) -> PathBuf {
        if let Some(dir) = &self.data_dir {
            return dir.clone();
        }
        if let Some(dir) = dirs_next::data_dir() {
            return dir.join("pulsetrace");
        }
        PathBuf::from(".")
    }
}

/// Priority: CLI flag → ENV var (PULSETRACE_GENERATOR_URL) → default
pub fn generator_url(cli_url: Option<String>) -> String {
    resolve_url(cli_url, std::env::var(GENERATOR_URL_ENV).ok())
}

fn resolve_url(cli_url: Option<String>, env_url: Option<String>) -> String {
    cli_url
        .or(env_url)
        .filter(|url| !url.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_GENERATOR_URL.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_file_with_custom_dir() {
        let config = PathConfig {
            data_dir: Some(PathBuf::from("/custom")),
        };
        assert_eq!(config.store_file(), PathBuf::from("/custom/profiles.json"));
    }

    #[test]
    fn test_store_file_uses_platform_defaults() {
        let config = PathConfig { data_dir: None };
        let path = config.store_file();
        assert!(path.to_string_lossy().ends_with(STORE_FILE));
    }

    #[test]
    fn test_cli_dir_wins() {
        let config = PathConfig::from_env_and_cli(Some(PathBuf::from("/from-cli")));
        assert_eq!(config.data_dir, Some(PathBuf::from("/from-cli")));
    }

    #[test]
    fn test_url_precedence() {
        assert_eq!(
            resolve_url(Some("http://cli".into()), Some("http://env".into())),
            "http://cli"
        );
        assert_eq!(resolve_url(None, Some("http://env".into())), "http://env");
        assert_eq!(resolve_url(None, None), DEFAULT_GENERATOR_URL);
        assert_eq!(resolve_url(Some("  ".into()), None), DEFAULT_GENERATOR_URL);
    }
}
