use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

pub const ENV_PORT: &str = "GROCERY_PORT";
pub const ENV_DATA_DIR: &str = "GROCERY_DATA_DIR";
pub const ENV_API_TOKEN: &str = "GROCERY_API_TOKEN";
pub const ENV_LIST_NAME: &str = "GROCERY_LIST_NAME";

const DEFAULT_PORT: u16 = 5080;
const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_LIST_NAME: &str = "Groceries";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub port: u16,
    pub data_dir: PathBuf,
    pub api_token: Option<String>,
    pub list_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            api_token: None,
            list_name: DEFAULT_LIST_NAME.to_string(),
        }
    }
}

/// Where the server keeps its data and logs. Resolvable before the logger exists, so it
/// stays silent.
pub fn data_dir_from_env() -> PathBuf {
    data_dir_from_lookup(|key| env::var(key).ok())
}

pub fn data_dir_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> PathBuf {
    var(&lookup, ENV_DATA_DIR)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

impl Config {
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup. Missing or unparsable values fall back to
    /// their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let api_token = var(&lookup, ENV_API_TOKEN);
        if api_token.is_none() {
            log::warn!("{ENV_API_TOKEN} not set, API authentication is disabled");
        }
        if var(&lookup, ENV_DATA_DIR).is_none() {
            log::info!("{ENV_DATA_DIR} not set, using default: {DEFAULT_DATA_DIR}");
        }
        let data_dir = data_dir_from_lookup(&lookup);
        Self {
            port: try_load(&lookup, ENV_PORT, defaults.port),
            data_dir,
            api_token,
            list_name: try_load(&lookup, ENV_LIST_NAME, defaults.list_name),
        }
    }
}

fn var(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).filter(|value| !value.trim().is_empty())
}

fn try_load<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    let Some(raw) = var(lookup, key) else {
        log::info!("{key} not set, using default: {default}");
        return default;
    };
    match raw.trim().parse() {
        Ok(value) => value,
        Err(error) => {
            log::warn!("invalid {key} value {raw:?}: {error}, using default: {default}");
            default
        }
    }
}
