use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use tracing::warn;

use crate::clients::flexible::ClientType;
use crate::generator::GeneratorConfig;

/// Trait for types that can retrieve their configuration key from environment variables
pub trait KeyFromEnv {
    /// The environment variable name for this client's API key
    const KEY_NAME: &'static str;

    /// Find the API key by checking environment variables first, then .env file
    fn find_key() -> Option<String> {
        // First try to load .env file (silently fail if not found)
        let _ = dotenvy::dotenv();

        env::var(Self::KEY_NAME).ok().filter(|k| !k.trim().is_empty())
    }

    fn has_key() -> bool {
        Self::find_key().is_some()
    }
}

pub const DEFAULT_PORT: u16 = 3000;

/// Runtime settings for `studygen serve`.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub client: ClientType,
    /// Model name override for the hosted provider.
    pub model: Option<String>,
    pub generator: GeneratorConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            client: ClientType::default(),
            model: None,
            generator: GeneratorConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Read `STUDYGEN_*` variables (after loading `.env`), falling back to defaults
    /// for anything unset or unparsable.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let mut config = Self::default();

        if let Some(bind) = parsed_var::<SocketAddr>("STUDYGEN_BIND") {
            config.bind = bind;
        }
        if let Ok(client) = env::var("STUDYGEN_CLIENT") {
            match client.parse::<ClientType>() {
                Ok(c) => config.client = c,
                Err(e) => warn!(error = %e, "ignoring STUDYGEN_CLIENT"),
            }
        }
        config.model = env::var("STUDYGEN_MODEL").ok().filter(|m| !m.is_empty());
        if let Some(pairs) = parsed_var::<usize>("STUDYGEN_MATCHING_PAIRS") {
            config.generator = config.generator.with_matching_pairs(pairs);
        }
        if let Some(secs) = parsed_var::<u64>("STUDYGEN_MAX_DURATION_SECS") {
            config.generator.max_duration = Duration::from_secs(secs);
        }
        config
    }
}

fn parsed_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = env::var(name).ok()?;
    match raw.parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(variable = name, value = %raw, "ignoring unparsable environment variable");
            None
        }
    }
}
