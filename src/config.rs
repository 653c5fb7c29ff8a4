use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub token: String,
    pub app_id: u64,
    #[serde(default)]
    pub keepalive: Option<KeepAliveConfig>,
    #[serde(default)]
    pub lavalink: Option<LavalinkConfig>,
    #[serde(default)]
    pub music: MusicConfig,
}

#[derive(Debug, Deserialize)]
pub struct KeepAliveConfig {
    /// Socket address the keep-alive endpoint listens on.
    pub bind: String,
}

#[derive(Debug, Deserialize)]
pub struct LavalinkConfig {
    /// `host:port` of the Lavalink node.
    pub host: String,
    pub password: String,
    #[serde(default)]
    pub ssl: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MusicConfig {
    pub inactivity_timeout_secs: u64,
    /// How many search results an autoplay refill appends.
    pub autoplay_results: usize,
    pub genres: Vec<String>,
}

impl Default for MusicConfig {
    fn default() -> Self {
        Self {
            inactivity_timeout_secs: 300,
            autoplay_results: 5,
            genres: DEFAULT_GENRES.iter().map(|g| g.to_string()).collect(),
        }
    }
}

impl MusicConfig {
    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_secs(self.inactivity_timeout_secs)
    }
}

const DEFAULT_GENRES: &[&str] = &[
    "lofi hip hop",
    "synthwave",
    "jazz",
    "classic rock",
    "indie pop",
    "house music",
    "drum and bass",
    "acoustic",
    "soul",
    "ambient",
];

impl Config {
    /// Reads the config from a given TOML path.
    pub fn from_path(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::InvalidPath(path.to_string(), e))?;
        Self::from_toml(path, &content)
    }

    fn from_toml(path: &str, content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ConfigError::InvalidContent(path.to_string(), e))?;

        if config.music.genres.is_empty() {
            return Err(ConfigError::Invalid(
                path.to_string(),
                "`music.genres` must not be empty",
            ));
        }

        Ok(config)
    }

    /// Path given as the first CLI argument, or `default`.
    pub fn path_from_args(default: &str) -> String {
        std::env::args().nth(1).unwrap_or_else(|| default.to_string())
    }

    pub fn lavalink(&self, path: &str) -> Result<&LavalinkConfig, ConfigError> {
        self.lavalink
            .as_ref()
            .ok_or_else(|| ConfigError::Missing(path.to_string(), "lavalink"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_music_defaults() {
        let config = Config::from_toml("test.toml", "token = \"abc\"\napp_id = 42\n").unwrap();

        assert_eq!(config.token, "abc");
        assert_eq!(config.app_id, 42);
        assert!(config.keepalive.is_none());
        assert!(config.lavalink.is_none());
        assert_eq!(config.music.inactivity_timeout(), Duration::from_secs(300));
        assert_eq!(config.music.genres.len(), DEFAULT_GENRES.len());
    }

    #[test]
    fn full_config_parses_sections() {
        let content = r#"
            token = "abc"
            app_id = 1

            [keepalive]
            bind = "0.0.0.0:8080"

            [lavalink]
            host = "localhost:2333"
            password = "youshallnotpass"

            [music]
            inactivity_timeout_secs = 60
            genres = ["jazz"]
        "#;
        let config = Config::from_toml("test.toml", content).unwrap();

        assert_eq!(config.keepalive.unwrap().bind, "0.0.0.0:8080");
        let lavalink = config.lavalink.unwrap();
        assert_eq!(lavalink.host, "localhost:2333");
        assert!(!lavalink.ssl);
        assert_eq!(config.music.inactivity_timeout_secs, 60);
        assert_eq!(config.music.autoplay_results, 5);
        assert_eq!(config.music.genres, vec!["jazz".to_string()]);
    }

    #[test]
    fn missing_lavalink_section_is_reported() {
        let config = Config::from_toml("music.toml", "token = \"t\"\napp_id = 1\n").unwrap();
        assert!(matches!(
            config.lavalink("music.toml"),
            Err(ConfigError::Missing(_, "lavalink"))
        ));
    }

    #[test]
    fn empty_genre_list_is_rejected() {
        let content = "token = \"t\"\napp_id = 1\n[music]\ngenres = []\n";
        assert!(matches!(
            Config::from_toml("music.toml", content),
            Err(ConfigError::Invalid(..))
        ));
    }

    #[test]
    fn garbage_is_invalid_content() {
        assert!(matches!(
            Config::from_toml("x.toml", "token = "),
            Err(ConfigError::InvalidContent(..))
        ));
    }
}
