use std::path::PathBuf;
use serde::Deserialize;

/// Origins of the hosted admin frontends. Always allowed in addition to
/// `FRONTEND_URL` and whatever the config file lists.
pub const DEPLOYMENT_ORIGINS: &[&str] = &[
    "https://pwa-app-sigma-lovat.vercel.app",
    "https://pwa-app-lbb8.onrender.com",
];

/// Where the HTTP listener binds when no explicit host is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindMode {
    /// All interfaces. Selected when running on the hosting platform.
    Wildcard,
    Loopback,
}

impl BindMode {
    pub fn host(&self) -> &'static str {
        match self {
            BindMode::Wildcard => "0.0.0.0",
            BindMode::Loopback => "127.0.0.1",
        }
    }
}

/// All configuration for the stadium service.
///
/// Precedence (lowest to highest): defaults → config file → env var → CLI arg.
/// CLI arg merging is done by the caller after `Config::load()`.
#[derive(Debug, Clone)]
pub struct Config {
    // Database
    pub db_url: String,
    /// Keep serving (liveness only) when the database is unreachable at boot.
    pub degraded_start: bool,

    // Server
    pub port: u16,
    pub host: Option<String>,
    pub bind_mode: BindMode,
    pub frontend_url: Option<String>,
    pub allowed_origins: Vec<String>,
    pub static_dir: Option<PathBuf>,
    pub uploads_dir: Option<PathBuf>,
    pub upload_base_url: String,
    pub realtime: bool,

    // Auth
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub bcrypt_cost: u32,

    // Logging
    pub log_level: String,
    pub log_json: bool,
    pub utc: bool,
}

/// Config file layout (~/.stadium/config.toml). All fields optional; they layer
/// on top of compiled-in defaults.
#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    db_url: Option<String>,
    degraded_start: Option<bool>,
    port: Option<u16>,
    host: Option<String>,
    frontend_url: Option<String>,
    allowed_origins: Option<Vec<String>>,
    static_dir: Option<PathBuf>,
    uploads_dir: Option<PathBuf>,
    upload_base_url: Option<String>,
    realtime: Option<bool>,
    jwt_secret: Option<String>,
    token_ttl_hours: Option<i64>,
    bcrypt_cost: Option<u32>,
    log_level: Option<String>,
    log_json: Option<bool>,
    utc: Option<bool>,
}

pub const DEFAULT_JWT_SECRET: &str = "stadium-dev-secret";

impl Default for Config {
    fn default() -> Self {
        Self {
            db_url: "sqlite:stadium.db".to_string(),
            degraded_start: false,
            port: 5000,
            host: None,
            bind_mode: BindMode::Loopback,
            frontend_url: None,
            allowed_origins: DEPLOYMENT_ORIGINS.iter().map(|s| s.to_string()).collect(),
            static_dir: None,
            uploads_dir: None,
            upload_base_url: "http://localhost:5000/uploads/".to_string(),
            realtime: true,
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            token_ttl_hours: 24,
            bcrypt_cost: 12,
            log_level: "info".to_string(),
            log_json: false,
            utc: false,
        }
    }
}

impl Config {
    /// Config directory: ~/.stadium/
    pub fn dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".stadium")
    }

    /// Config file path: ~/.stadium/config.toml
    pub fn file_path() -> PathBuf {
        Self::dir().join("config.toml")
    }

    /// Load config: defaults → config file → env vars.
    /// CLI args should be merged by the caller afterward.
    pub fn load() -> Self {
        let mut config = Self::default();

        // Layer 2: config file
        if let Ok(contents) = std::fs::read_to_string(Self::file_path()) {
            // A broken file is ignored rather than fatal; defaults still apply.
            let _ = config.apply_toml(&contents);
        }

        // Layer 3: environment variables
        config.apply_env(|key| std::env::var(key).ok());

        config
    }

    /// Every origin allowed to make credentialed cross-origin requests,
    /// without trailing slashes.
    pub fn origins(&self) -> Vec<String> {
        let mut origins: Vec<String> = self
            .frontend_url
            .iter()
            .chain(self.allowed_origins.iter())
            .map(|o| o.trim().trim_end_matches('/').to_string())
            .filter(|o| !o.is_empty())
            .collect();
        origins.dedup();
        origins
    }

    /// `host:port` the server binds to.
    pub fn bind_addr(&self) -> String {
        let host = self.host.as_deref().unwrap_or(self.bind_mode.host());
        format!("{host}:{}", self.port)
    }

    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }

    pub fn apply_toml(&mut self, contents: &str) -> Result<(), toml::de::Error> {
        let file = toml::from_str::<FileConfig>(contents)?;
        self.apply_file(file);
        Ok(())
    }

    /// Layer environment variables read through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |names: &[&str]| names.iter().find_map(|name| lookup(name));

        if let Some(v) = var(&["STADIUM_DB_URL", "DATABASE_URL"]) { self.db_url = v; }
        if let Some(v) = var(&["STADIUM_DEGRADED_START"]) { self.degraded_start = truthy(&v); }
        if let Some(v) = var(&["STADIUM_PORT", "PORT"]) {
            if let Ok(p) = v.parse() { self.port = p; }
        }
        if let Some(v) = var(&["STADIUM_HOST"]) { self.host = Some(v); }
        if lookup("RENDER").is_some() { self.bind_mode = BindMode::Wildcard; }
        if let Some(v) = var(&["FRONTEND_URL"]) { self.frontend_url = Some(v); }
        if let Some(v) = var(&["STADIUM_ALLOWED_ORIGINS"]) {
            self.allowed_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Some(v) = var(&["STADIUM_STATIC_DIR"]) { self.static_dir = Some(PathBuf::from(v)); }
        if let Some(v) = var(&["STADIUM_UPLOADS_DIR"]) { self.uploads_dir = Some(PathBuf::from(v)); }
        if let Some(v) = var(&["STADIUM_UPLOAD_BASE_URL"]) { self.upload_base_url = v; }
        if let Some(v) = var(&["STADIUM_REALTIME"]) { self.realtime = truthy(&v); }
        if let Some(v) = var(&["STADIUM_JWT_SECRET", "JWT_SECRET"]) { self.jwt_secret = v; }
        if let Some(v) = var(&["STADIUM_TOKEN_TTL_HOURS"]) {
            if let Ok(h) = v.parse() { self.token_ttl_hours = h; }
        }
        if let Some(v) = var(&["STADIUM_BCRYPT_COST"]) {
            if let Ok(c) = v.parse() { self.bcrypt_cost = c; }
        }
        if let Some(v) = var(&["STADIUM_LOG_LEVEL"]) { self.log_level = v; }
        if let Some(v) = var(&["STADIUM_LOG_JSON"]) { self.log_json = truthy(&v); }
        if let Some(v) = var(&["STADIUM_UTC"]) { self.utc = truthy(&v); }
    }

    // --- Private helpers ---

    fn apply_file(&mut self, file: FileConfig) {
        if let Some(v) = file.db_url { self.db_url = v; }
        if let Some(v) = file.degraded_start { self.degraded_start = v; }
        if let Some(v) = file.port { self.port = v; }
        if let Some(v) = file.host { self.host = Some(v); }
        if let Some(v) = file.frontend_url { self.frontend_url = Some(v); }
        if let Some(v) = file.allowed_origins { self.allowed_origins.extend(v); }
        if let Some(v) = file.static_dir { self.static_dir = Some(v); }
        if let Some(v) = file.uploads_dir { self.uploads_dir = Some(v); }
        if let Some(v) = file.upload_base_url { self.upload_base_url = v; }
        if let Some(v) = file.realtime { self.realtime = v; }
        if let Some(v) = file.jwt_secret { self.jwt_secret = v; }
        if let Some(v) = file.token_ttl_hours { self.token_ttl_hours = v; }
        if let Some(v) = file.bcrypt_cost { self.bcrypt_cost = v; }
        if let Some(v) = file.log_level { self.log_level = v; }
        if let Some(v) = file.log_json { self.log_json = v; }
        if let Some(v) = file.utc { self.utc = v; }
    }
}

fn truthy(v: &str) -> bool {
    v == "1" || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes")
}
