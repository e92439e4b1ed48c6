use crate::sync::PollSettings;
use std::{env, path::PathBuf, str::FromStr, time::Duration};
use url::Url;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATA_PATH: &str = "data/fleet.json";

/// Runtime settings, read once from the environment at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub port: u16,
    pub data_path: PathBuf,
    /// Base URL of the REST backend used by the CRUD Client.
    pub api_base_url: String,
    pub poll: PollSettings,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Malformed numbers fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let port = parsed(&lookup, "PORT").unwrap_or(DEFAULT_PORT);
        let data_path = lookup("APP_DATA_PATH")
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_PATH));
        let api_base_url = lookup("FLEET_API_URL")
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| format!("http://127.0.0.1:{port}"));

        let defaults = PollSettings::default();
        let poll = PollSettings {
            interval: parsed(&lookup, "LIVE_POLL_INTERVAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.interval),
            max_checks: parsed(&lookup, "LIVE_POLL_MAX_CHECKS")
                .filter(|checks| *checks > 0)
                .unwrap_or(defaults.max_checks),
        };

        Self {
            port,
            data_path,
            api_base_url,
            poll,
        }
    }

    /// Whether the CRUD Client calls this process. Live tables only follow
    /// the in-process store.
    pub fn api_is_local(&self) -> bool {
        let Ok(url) = Url::parse(&self.api_base_url) else {
            return false;
        };
        let loopback = matches!(
            url.host_str(),
            Some("127.0.0.1" | "localhost" | "0.0.0.0" | "[::1]")
        );
        loopback && url.port_or_known_default() == Some(self.port)
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key)?.trim().parse().ok()
}
