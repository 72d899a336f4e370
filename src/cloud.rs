//! Cloud sync detection
//!
//! The remote backend is optional: its presence is derived from configuration,
//! never assumed. The flag is true only when both an endpoint URL and an
//! access credential are set and neither is the known placeholder.

use serde::Serialize;
use std::env;

const PLACEHOLDER_URL: &str = "https://placeholder.supabase.co";
const PLACEHOLDER_KEY: &str = "placeholder";

#[derive(Debug, Clone, Serialize)]
pub struct CloudConfig {
    pub url: Option<String>,
    #[serde(skip_serializing)]
    pub access_key: Option<String>,
    #[serde(skip_serializing)]
    pub database_url: Option<String>,
}

impl CloudConfig {
    pub fn from_env() -> Self {
        Self {
            url: env::var("SUPABASE_URL").ok().filter(|v| !v.trim().is_empty()),
            access_key: env::var("SUPABASE_SERVICE_KEY")
                .or_else(|_| env::var("SUPABASE_ANON_KEY"))
                .ok()
                .filter(|v| !v.trim().is_empty()),
            database_url: env::var("DATABASE_URL").ok().filter(|v| !v.trim().is_empty()),
        }
    }

    pub fn disconnected() -> Self {
        Self {
            url: None,
            access_key: None,
            database_url: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        let url_ok = self
            .url
            .as_deref()
            .map(|u| u != PLACEHOLDER_URL)
            .unwrap_or(false);
        let key_ok = self
            .access_key
            .as_deref()
            .map(|k| k != PLACEHOLDER_KEY)
            .unwrap_or(false);
        url_ok && key_ok
    }
}
