use crate::adapters::outbound::SenderConfig;
use crate::infrastructure::HeartbeatConfig;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Properties file read when `FAILOVER_PROXY_CONFIG` is not set.
pub const DEFAULT_CONFIG_PATH: &str = "config.properties";

#[derive(Debug, Clone)]
pub struct Config {
    // Listening socket
    pub host: String,
    pub port: u16,

    // Heartbeat
    pub heartbeat_secs: u64,
    pub probe_timeout_ms: u64,

    // Outbound sends
    pub send_timeout_ms: u64,
    pub send_attempts: u32,
    pub retry_backoff_ms: u64,

    // Delay before pushing the peer list after a registration
    pub broadcast_delay_ms: u64,

    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9000,
            heartbeat_secs: 5,
            probe_timeout_ms: 1000,
            send_timeout_ms: 1000,
            send_attempts: 3,
            retry_backoff_ms: 200,
            broadcast_delay_ms: 1000,
            debug: false,
        }
    }
}

impl Config {
    pub fn listen_addr(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    pub fn heartbeat(&self) -> HeartbeatConfig {
        HeartbeatConfig {
            interval: Duration::from_secs(self.heartbeat_secs),
            probe_timeout: Duration::from_millis(self.probe_timeout_ms),
        }
    }

    pub fn sender(&self) -> SenderConfig {
        SenderConfig {
            connect_timeout: Duration::from_millis(self.send_timeout_ms),
            write_timeout: Duration::from_millis(self.send_timeout_ms),
            read_timeout: Duration::from_millis(self.send_timeout_ms),
            max_attempts: self.send_attempts,
            backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }

    pub fn broadcast_delay(&self) -> Duration {
        Duration::from_millis(self.broadcast_delay_ms)
    }
}

/// Configuration loading errors. All of them abort startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },
    #[error("{0} must be at least 1")]
    Zero(&'static str),
}

/// Load configuration from defaults, the properties file, then the
/// environment, each overriding the previous.
pub fn load_config() -> Result<Config, ConfigError> {
    let mut cfg = Config::default();

    match std::env::var("FAILOVER_PROXY_CONFIG") {
        Ok(path) => apply_properties(&mut cfg, &read_properties(Path::new(&path))?)?,
        Err(_) => {
            let path = Path::new(DEFAULT_CONFIG_PATH);
            if path.exists() {
                apply_properties(&mut cfg, &read_properties(path)?)?;
            }
        }
    }

    if let Ok(host) = std::env::var("FAILOVER_PROXY_HOST") {
        cfg.host = host;
    }
    if let Some(port) = env_parse("FAILOVER_PROXY_PORT")? {
        cfg.port = port;
    }
    if let Some(secs) = env_parse("FAILOVER_PROXY_HEARTBEAT_SECS")? {
        cfg.heartbeat_secs = secs;
    }
    if let Some(ms) = env_parse("FAILOVER_PROXY_PROBE_TIMEOUT_MS")? {
        cfg.probe_timeout_ms = ms;
    }
    if let Some(ms) = env_parse("FAILOVER_PROXY_SEND_TIMEOUT_MS")? {
        cfg.send_timeout_ms = ms;
    }
    if let Some(n) = env_parse("FAILOVER_PROXY_SEND_ATTEMPTS")? {
        cfg.send_attempts = n;
    }
    if let Some(ms) = env_parse("FAILOVER_PROXY_RETRY_BACKOFF_MS")? {
        cfg.retry_backoff_ms = ms;
    }
    if let Some(ms) = env_parse("FAILOVER_PROXY_BROADCAST_DELAY_MS")? {
        cfg.broadcast_delay_ms = ms;
    }

    cfg.debug = std::env::var("DEBUG").is_ok();

    if cfg.send_attempts == 0 {
        return Err(ConfigError::Zero("send attempts"));
    }
    if cfg.heartbeat_secs == 0 {
        return Err(ConfigError::Zero("heartbeat interval"));
    }

    Ok(cfg)
}

/// Parse a `key=value` properties file. `#` and `!` start comments.
pub fn read_properties(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_properties(&text))
}

fn parse_properties(text: &str) -> HashMap<String, String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
        .filter_map(|line| {
            let (key, value) = line.split_once('=').or_else(|| line.split_once(':'))?;
            Some((key.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

fn apply_properties(cfg: &mut Config, props: &HashMap<String, String>) -> Result<(), ConfigError> {
    if let Some(host) = props.get("monitor.host") {
        cfg.host = host.clone();
    }
    if let Some(port) = props.get("monitor.port") {
        cfg.port = parse_value("monitor.port", port)?;
    }
    Ok(())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(value) => parse_value(key, &value).map(Some),
        Err(_) => Ok(None),
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}
