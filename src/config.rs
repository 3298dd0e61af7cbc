//! Configuration management for Luminaria Server

use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub extraction: ExtractionConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    /// Base URL of the Gemini API.
    pub base_url: String,
    /// Vision-language model used for code extraction.
    pub model: String,
    /// Fallback API key. A key stored through the settings endpoint takes
    /// precedence over this one.
    pub api_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                url: "sqlite:./luminarias.db".to_string(),
            },
            extraction: ExtractionConfig {
                base_url: "https://generativelanguage.googleapis.com".to_string(),
                model: "gemini-2.5-flash".to_string(),
                api_key: None,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Config::default();

        Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: env::var("SERVER_PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(defaults.server.port),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or(defaults.database.url),
            },
            extraction: ExtractionConfig {
                base_url: env::var("GEMINI_API_URL").unwrap_or(defaults.extraction.base_url),
                model: env::var("GEMINI_MODEL").unwrap_or(defaults.extraction.model),
                api_key: env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty()),
            },
        }
    }
}
