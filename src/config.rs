use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_QUIZ_OPTION_COUNT: usize = 4;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    /// Directory for daily rolling log files; `None` logs to stdout only.
    pub log_dir: Option<PathBuf>,
    pub database_url: String,
    pub redis_url: Option<String>,
    pub catalog_cache_ttl: Duration,
    pub progress_cache_ttl: Duration,
    pub jwt_secret: Option<String>,
    pub seed_words_path: Option<PathBuf>,
    pub session_idle_timeout: Duration,
    pub quiz_option_count: usize,
    pub workers_enabled: bool,
}

impl Config {
    pub fn from_env() -> Self {
        let port = env_parse::<u16>("PORT").unwrap_or(3000);

        let host = env_parse::<IpAddr>("HOST").unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let log_dir = env_bool("ENABLE_FILE_LOGS").unwrap_or(false).then(|| {
            env_non_empty("LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./logs"))
        });

        let database_url = env_non_empty("DATABASE_URL").unwrap_or_else(default_database_url);

        let catalog_cache_ttl =
            Duration::from_secs(env_parse::<u64>("CACHE_TTL_SECS").unwrap_or(3600));
        let progress_cache_ttl =
            Duration::from_secs(env_parse::<u64>("PROGRESS_CACHE_TTL_SECS").unwrap_or(60));

        let session_idle_timeout =
            Duration::from_secs(env_parse::<u64>("SESSION_IDLE_MINUTES").unwrap_or(30) * 60);

        let quiz_option_count = env_parse::<usize>("QUIZ_OPTION_COUNT")
            .unwrap_or(DEFAULT_QUIZ_OPTION_COUNT)
            .clamp(2, 8);

        Self {
            host,
            port,
            log_level,
            log_dir,
            database_url,
            redis_url: env_non_empty("REDIS_URL"),
            catalog_cache_ttl,
            progress_cache_ttl,
            jwt_secret: env_non_empty("JWT_SECRET"),
            seed_words_path: env_non_empty("SEED_WORDS_PATH").map(PathBuf::from),
            session_idle_timeout,
            quiz_option_count,
            workers_enabled: env_bool("WORKERS_ENABLED").unwrap_or(true),
        }
    }

    /// In-memory configuration with every optional subsystem disabled.
    pub fn in_memory(jwt_secret: impl Into<String>) -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            log_level: "warn".to_string(),
            log_dir: None,
            database_url: "sqlite::memory:".to_string(),
            redis_url: None,
            catalog_cache_ttl: Duration::from_secs(3600),
            progress_cache_ttl: Duration::from_secs(60),
            jwt_secret: Some(jwt_secret.into()),
            seed_words_path: None,
            session_idle_timeout: Duration::from_secs(30 * 60),
            quiz_option_count: DEFAULT_QUIZ_OPTION_COUNT,
            workers_enabled: false,
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn default_database_url() -> String {
    let path = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vocab-study")
        .join("data.db");
    format!("sqlite://{}", path.display())
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_non_empty(key).and_then(|value| value.parse::<T>().ok())
}

fn env_bool(key: &str) -> Option<bool> {
    let value = std::env::var(key).ok()?;
    let normalized = value.trim().to_ascii_lowercase();
    if normalized.is_empty() {
        return None;
    }
    match normalized.as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}
