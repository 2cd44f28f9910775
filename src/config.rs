// src/config.rs
use serde::Deserialize;

/// Application configuration loaded from environment variables
/// (a `.env` file next to the binary is honored).
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Calibre content server base URL, e.g. http://localhost:8080
    pub calibre_url: String,

    /// Content server username
    pub calibre_user: String,

    /// Content server password
    pub calibre_pass: String,

    /// Library id on the server
    #[serde(default = "default_library")]
    pub calibre_library: String,
}

fn default_library() -> String {
    "Calibre_Library".to_string()
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| {
            anyhow::anyhow!(
                "Failed to load config ({}). Set CALIBRE_URL, CALIBRE_USER and CALIBRE_PASS.",
                e
            )
        })
    }
}
