//!
//! policyhub configuration
//! ------------------------
//! Settings come from CLI flags, then environment variables, then defaults.
//! The token secret has no default: startup fails when it is not supplied.

use std::env;
use std::path::PathBuf;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_HTTP_PORT: u16 = 3000;
pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_DB_FOLDER: &str = "dbs";
pub const DEFAULT_DATABASE: &str = "insurancePoliciesDB";
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 60 * 60;
pub const DEFAULT_HASH_COST: u32 = 2;
pub const DEFAULT_LOG_FILTER: &str = "info";
/// Upper bound for the token lifetime: ten years.
pub const MAX_TOKEN_TTL_SECS: i64 = 10 * 365 * 24 * 60 * 60;

pub const ENV_HTTP_PORT: &str = "POLICYHUB_HTTP_PORT";
pub const ENV_BIND: &str = "POLICYHUB_BIND";
pub const ENV_STORE: &str = "POLICYHUB_STORE";
pub const ENV_DB_FOLDER: &str = "POLICYHUB_DB_FOLDER";
pub const ENV_DATABASE: &str = "POLICYHUB_DATABASE";
pub const ENV_JWT_SECRET: &str = "POLICYHUB_JWT_SECRET";
pub const ENV_TOKEN_TTL: &str = "POLICYHUB_TOKEN_TTL_SECS";
pub const ENV_HASH_COST: &str = "POLICYHUB_HASH_COST";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("token secret is required (set POLICYHUB_JWT_SECRET or pass --jwt-secret)")]
    MissingSecret,
    #[error("invalid value '{value}' for {name}")]
    InvalidValue { name: String, value: String },
    #[error("flag {0} expects a value")]
    MissingValue(String),
    #[error("unknown argument '{0}'")]
    UnknownArgument(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Memory,
    File,
}

impl std::str::FromStr for StoreKind {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(StoreKind::Memory),
            "file" | "document" | "disk" => Ok(StoreKind::File),
            _ => Err(()),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub http_port: u16,
    pub bind: String,
    pub store: StoreKind,
    pub db_root: PathBuf,
    pub database: String,
    pub jwt_secret: String,
    pub token_ttl_secs: i64,
    pub hash_cost: u32,
}

// Keep the secret out of logs.
impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("http_port", &self.http_port)
            .field("bind", &self.bind)
            .field("store", &self.store)
            .field("db_root", &self.db_root)
            .field("database", &self.database)
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("hash_cost", &self.hash_cost)
            .finish()
    }
}

impl ServerConfig {
    /// Defaults for everything except the secret.
    pub fn with_secret<S: Into<String>>(secret: S) -> Self {
        Self {
            http_port: DEFAULT_HTTP_PORT,
            bind: DEFAULT_BIND.to_string(),
            store: StoreKind::File,
            db_root: PathBuf::from(DEFAULT_DB_FOLDER),
            database: DEFAULT_DATABASE.to_string(),
            jwt_secret: secret.into(),
            token_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
            hash_cost: DEFAULT_HASH_COST,
        }
    }

    /// Resolve from process arguments (without the program name) and the environment.
    pub fn from_env_and_args(args: &[String]) -> Result<Self, ConfigError> {
        Self::resolve(args, |name| env::var(name).ok())
    }

    /// Same as `from_env_and_args` with an injectable environment lookup.
    pub fn resolve<F>(args: &[String], env_lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let flags = Flags::parse(args)?;
        let pick = |flag: &Option<String>, env_name: &str| -> Option<(String, String)> {
            flag.clone()
                .map(|v| (v, env_name.to_string()))
                .or_else(|| env_lookup(env_name).map(|v| (v, env_name.to_string())))
        };

        let secret = pick(&flags.jwt_secret, ENV_JWT_SECRET)
            .map(|(v, _)| v)
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingSecret)?;
        let mut cfg = Self::with_secret(secret);

        if let Some((v, name)) = pick(&flags.http_port, ENV_HTTP_PORT) { cfg.http_port = parse_value(&name, &v)?; }
        if let Some((v, _)) = pick(&flags.bind, ENV_BIND) { cfg.bind = v; }
        if let Some((v, name)) = pick(&flags.store, ENV_STORE) {
            cfg.store = v.parse().map_err(|_| ConfigError::InvalidValue { name, value: v.clone() })?;
        }
        if let Some((v, _)) = pick(&flags.db_folder, ENV_DB_FOLDER) { cfg.db_root = PathBuf::from(v); }
        if let Some((v, _)) = pick(&flags.database, ENV_DATABASE) { cfg.database = v; }
        if let Some((v, name)) = pick(&flags.token_ttl, ENV_TOKEN_TTL) {
            let ttl: i64 = parse_value(&name, &v)?;
            if ttl <= 0 || ttl > MAX_TOKEN_TTL_SECS { return Err(ConfigError::InvalidValue { name, value: v }); }
            cfg.token_ttl_secs = ttl;
        }
        if let Some((v, name)) = pick(&flags.hash_cost, ENV_HASH_COST) {
            let cost: u32 = parse_value(&name, &v)?;
            if cost == 0 { return Err(ConfigError::InvalidValue { name, value: v }); }
            cfg.hash_cost = cost;
        }
        Ok(cfg)
    }
}

fn parse_value<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidValue { name: name.to_string(), value: value.to_string() })
}

#[derive(Default)]
struct Flags {
    http_port: Option<String>,
    bind: Option<String>,
    store: Option<String>,
    db_folder: Option<String>,
    database: Option<String>,
    jwt_secret: Option<String>,
    token_ttl: Option<String>,
    hash_cost: Option<String>,
}

impl Flags {
    fn parse(args: &[String]) -> Result<Self, ConfigError> {
        let mut flags = Flags::default();
        let mut i = 0;
        while i < args.len() {
            let flag = args[i].as_str();
            let slot = match flag {
                "--http-port" => &mut flags.http_port,
                "--bind" => &mut flags.bind,
                "--store" => &mut flags.store,
                "--db-folder" => &mut flags.db_folder,
                "--database" => &mut flags.database,
                "--jwt-secret" => &mut flags.jwt_secret,
                "--token-ttl" => &mut flags.token_ttl,
                "--hash-cost" => &mut flags.hash_cost,
                other => return Err(ConfigError::UnknownArgument(other.to_string())),
            };
            let value = args.get(i + 1).ok_or_else(|| ConfigError::MissingValue(flag.to_string()))?;
            *slot = Some(value.clone());
            i += 2;
        }
        Ok(flags)
    }
}

/// Log filter from a `RUST_LOG`-style directive string. Unset or unparsable
/// values fall back to `info`.
pub fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

pub fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

pub fn usage() -> String {
    format!(
        "policyhub server\n\nUSAGE:\n  policyhub_server [OPTIONS]\n\nOPTIONS:\n  --http-port N       HTTP port (env: {ENV_HTTP_PORT}, default {DEFAULT_HTTP_PORT})\n  --bind ADDR         Bind address (env: {ENV_BIND}, default {DEFAULT_BIND})\n  --store KIND        memory | file (env: {ENV_STORE}, default file)\n  --db-folder PATH    Data root for the file store (env: {ENV_DB_FOLDER}, default {DEFAULT_DB_FOLDER})\n  --database NAME     Database name (env: {ENV_DATABASE}, default {DEFAULT_DATABASE})\n  --jwt-secret S      Token signing secret (env: {ENV_JWT_SECRET}, required)\n  --token-ttl N       Token lifetime in seconds (env: {ENV_TOKEN_TTL}, default {DEFAULT_TOKEN_TTL_SECS})\n  --hash-cost N       Password hash time cost (env: {ENV_HASH_COST}, default {DEFAULT_HASH_COST})\n  -h, --help          Show this help\n"
    )
}
