use anyhow::{Context, Result, bail};
use clap::Parser;
use std::{env, path::PathBuf, str::FromStr, time::Duration};

/// Name of the store backed by `storage_dir`.
pub const DEFAULT_STORE_NAME: &str = "default";

/// Request bodies up to this size are accepted unless configured otherwise.
/// Must stay above the 5 MiB minimum part size.
pub const DEFAULT_MAX_BODY_BYTES: usize = 6 * 1024 * 1024;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_dir: PathBuf,
    pub stores: Vec<StoreConfig>,
    pub max_body_bytes: usize,
    pub upload_ttl: Option<Duration>,
}

/// One named file store: `name=type:path`, or `name=path` for a disk store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub name: String,
    pub store_type: String,
    pub base_path: PathBuf,
}

impl FromStr for StoreConfig {
    type Err = anyhow::Error;

    fn from_str(entry: &str) -> Result<Self> {
        let Some((name, rest)) = entry.split_once('=') else {
            bail!("store entry `{}` must look like name=type:path", entry);
        };
        let name = name.trim();
        if name.is_empty() {
            bail!("store entry `{}` has an empty name", entry);
        }

        // Windows drive letters (`C:\data`) must not be read as a type prefix.
        let (store_type, path) = match rest.split_once(':') {
            Some((t, p)) if t.len() > 1 && t.chars().all(|c| c.is_ascii_alphanumeric()) => (t, p),
            _ => ("disk", rest),
        };

        Ok(Self {
            name: name.to_string(),
            store_type: store_type.to_ascii_lowercase(),
            base_path: PathBuf::from(path.trim()),
        })
    }
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "File store with multipart uploads")]
pub struct Args {
    /// Host to bind to (overrides FILE_STORE_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides FILE_STORE_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory of the `default` disk store (overrides FILE_STORE_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<PathBuf>,

    /// Additional named store as name=type:path; repeatable (extends FILE_STORE_STORES)
    #[arg(long = "store")]
    pub stores: Vec<String>,

    /// Largest accepted request body in bytes (overrides FILE_STORE_MAX_BODY_BYTES)
    #[arg(long)]
    pub max_body_bytes: Option<usize>,

    /// Abort multipart uploads older than this many seconds; 0 disables
    /// (overrides FILE_STORE_UPLOAD_TTL_SECS)
    #[arg(long)]
    pub upload_ttl_secs: Option<u64>,
}

fn parse_env<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|err| anyhow::anyhow!("parsing {} value `{}`: {}", key, value, err)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(err).with_context(|| format!("reading {}", key)),
    }
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        Self::from_args(Args::parse())
    }

    /// Merge already-parsed CLI args over the environment.
    pub fn from_args(args: Args) -> Result<Self> {
        // --- Environment fallback ---
        let env_host = env::var("FILE_STORE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = parse_env::<u16>("FILE_STORE_PORT")?.unwrap_or(3000);
        let env_storage = env::var("FILE_STORE_STORAGE_DIR").unwrap_or_else(|_| "./data/files".into());
        let env_stores = env::var("FILE_STORE_STORES").unwrap_or_default();
        let env_body = parse_env::<usize>("FILE_STORE_MAX_BODY_BYTES")?;
        let env_ttl = parse_env::<u64>("FILE_STORE_UPLOAD_TTL_SECS")?;

        // --- Merge ---
        let storage_dir = args.storage_dir.unwrap_or_else(|| PathBuf::from(env_storage));

        let mut stores = vec![StoreConfig {
            name: DEFAULT_STORE_NAME.into(),
            store_type: "disk".into(),
            base_path: storage_dir.clone(),
        }];
        let entries = env_stores
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .chain(args.stores);
        for entry in entries {
            let store = entry
                .parse::<StoreConfig>()
                .with_context(|| format!("parsing store entry `{}`", entry))?;
            // an explicit `default` entry replaces the storage_dir one
            stores.retain(|s| s.name != store.name);
            stores.push(store);
        }

        let max_body_bytes = args
            .max_body_bytes
            .or(env_body)
            .unwrap_or(DEFAULT_MAX_BODY_BYTES);
        let upload_ttl = args
            .upload_ttl_secs
            .or(env_ttl)
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            storage_dir,
            stores,
            max_body_bytes,
            upload_ttl,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
