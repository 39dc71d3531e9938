use std::path::{Path, PathBuf};

use parley_core::WidgetConfig;
use serde::Deserialize;

use crate::error::ToolError;

const KEY_VAR: &str = "PARLEY_API_KEY";
const SECRET_VAR: &str = "PARLEY_API_SECRET";

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    /// Overrides the hosted API endpoint.
    pub base_url: Option<String>,
    /// Directory the session snapshot is kept in.
    pub session_dir: Option<PathBuf>,
    pub widget: WidgetConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub key: String,
    pub secret: String,
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("parley").join("config.toml"))
}

/// Reads the config file. A missing file is an empty config; a malformed
/// one is an error.
pub fn load_config(path: Option<&Path>) -> Result<Config, ToolError> {
    let Some(path) = path.map(Path::to_path_buf).or_else(default_config_path) else {
        return Ok(Config::default());
    };

    match std::fs::read_to_string(&path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
        Err(e) => Err(e.into()),
    }
}

pub fn load_credentials(config: &Config) -> Result<Credentials, ToolError> {
    resolve_credentials(
        std::env::var(KEY_VAR).ok(),
        std::env::var(SECRET_VAR).ok(),
        config,
    )
}

/// Environment values win over the config file, each half on its own.
fn resolve_credentials(
    env_key: Option<String>,
    env_secret: Option<String>,
    config: &Config,
) -> Result<Credentials, ToolError> {
    let pick = |env: Option<String>, file: &Option<String>| {
        env.filter(|v| !v.is_empty())
            .or_else(|| file.clone().filter(|v| !v.is_empty()))
    };

    match (pick(env_key, &config.api_key), pick(env_secret, &config.api_secret)) {
        (Some(key), Some(secret)) => Ok(Credentials { key, secret }),
        _ => Err(ToolError::CredentialsNotFound),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::SourceDisplay;

    fn file_config() -> Config {
        Config {
            api_key: Some("file-key".to_string()),
            api_secret: Some("file-secret".to_string()),
            ..Config::default()
        }
    }

    #[test]
    fn env_overrides_file() {
        let creds = resolve_credentials(Some("env-key".to_string()), None, &file_config()).unwrap();
        assert_eq!(creds.key, "env-key");
        assert_eq!(creds.secret, "file-secret");
    }

    #[test]
    fn empty_env_falls_back() {
        let creds = resolve_credentials(Some(String::new()), None, &file_config()).unwrap();
        assert_eq!(creds.key, "file-key");
    }

    #[test]
    fn missing_secret_is_an_error() {
        let config = Config {
            api_key: Some("k".to_string()),
            ..Config::default()
        };
        assert!(matches!(
            resolve_credentials(None, None, &config),
            Err(ToolError::CredentialsNotFound)
        ));
    }

    #[test]
    fn parses_widget_section() {
        let config: Config = toml::from_str(
            r#"
            api_key = "k"
            api_secret = "s"

            [widget]
            greeting = "Ask me about the docs"
            source_display = "all"
            starter_prompts = ["What is RSE?"]

            [widget.generation]
            model = "gpt-3.5-turbo"
            knowledge_base_ids = ["kb1"]
            "#,
        )
        .unwrap();

        assert_eq!(config.widget.greeting, "Ask me about the docs");
        assert_eq!(config.widget.source_display, SourceDisplay::All);
        assert_eq!(config.widget.starter_prompts, vec!["What is RSE?"]);
        assert_eq!(config.widget.generation.model, "gpt-3.5-turbo");
        assert_eq!(config.widget.generation.knowledge_base_ids, vec!["kb1"]);
        assert_eq!(config.widget.page_size, 10);
    }

    #[test]
    fn missing_file_is_default() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = load_config(Some(&dir.path().join("absent.toml"))).unwrap();
        assert!(config.api_key.is_none());
    }
}
