use std::path::PathBuf;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DATA_PATH: &str = "data/db.json";
pub const DEFAULT_TOKEN: &str = "dev-token";
pub const DEFAULT_USER: &str = "local-user";

/// Runtime settings for the persistence service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub data_path: PathBuf,
    /// Bearer token every `/api` request must carry.
    pub api_token: String,
    /// Owner of every record this instance stores.
    pub user_id: String,
    pub static_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            api_token: DEFAULT_TOKEN.to_string(),
            user_id: DEFAULT_USER.to_string(),
            static_dir: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Config::default();

        let port = get("FOCUS_TRACKER_PORT")
            .or_else(|| get("PORT"))
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(defaults.port);

        Config {
            host: get("FOCUS_TRACKER_HOST").unwrap_or(defaults.host),
            port,
            data_path: get("FOCUS_TRACKER_DATA")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_path),
            api_token: get("FOCUS_TRACKER_TOKEN").unwrap_or(defaults.api_token),
            user_id: get("FOCUS_TRACKER_USER").unwrap_or(defaults.user_id),
            static_dir: get("STATIC_DIR").map(PathBuf::from),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
