use std::env;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TesseraError;

pub const MIN_CHUNK_SIZE: u32 = 16;
pub const MAX_CHUNK_SIZE: u32 = 1024;
pub const DEFAULT_CHUNK_SIZE: u32 = 256;
/// Longest side of a preview thumbnail.
pub const DEFAULT_PREVIEW_SIZE: u32 = 140;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Which work scheduler executes chunk packages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerKind {
    /// Fixed pool of CPU worker threads.
    #[default]
    Threads,
    /// Everything runs on the calling thread.
    Inline,
    /// Accelerator-backed workers; falls back to threads without a device.
    Gpu,
}

impl FromStr for SchedulerKind {
    type Err = TesseraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "threads" | "cpu" => Ok(SchedulerKind::Threads),
            "inline" | "none" => Ok(SchedulerKind::Inline),
            "gpu" | "opencl" => Ok(SchedulerKind::Gpu),
            other => Err(TesseraError::Config(format!(
                "unknown scheduler '{other}', expected 'threads', 'inline' or 'gpu'"
            ))),
        }
    }
}

impl std::fmt::Display for SchedulerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchedulerKind::Threads => write!(f, "threads"),
            SchedulerKind::Inline => write!(f, "inline"),
            SchedulerKind::Gpu => write!(f, "gpu"),
        }
    }
}

/// Engine configuration, typically parsed from TOML with `TESSERA_*` env overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Number of worker threads. 0 = available parallelism.
    #[serde(default)]
    pub worker_threads: usize,
    #[serde(default)]
    pub scheduler: SchedulerKind,
    /// Allow accelerator devices when the tree asks for them.
    #[serde(default)]
    pub use_gpu: bool,
    /// Overrides the chunk size stored in the node tree.
    #[serde(default)]
    pub chunk_size: Option<u32>,
    #[serde(default = "default_preview_size")]
    pub preview_size: u32,
}

fn default_preview_size() -> u32 {
    DEFAULT_PREVIEW_SIZE
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            scheduler: SchedulerKind::default(),
            use_gpu: false,
            chunk_size: None,
            preview_size: default_preview_size(),
        }
    }
}

impl ExecutionConfig {
    /// Parse config from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, TesseraError> {
        let mut config: Self = toml::from_str(toml_str)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TesseraError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Build config from defaults plus environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Result<Self, TesseraError> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve worker thread count (0 means use available parallelism).
    pub fn resolved_worker_threads(&self) -> usize {
        if self.worker_threads == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        } else {
            self.worker_threads
        }
    }

    /// Apply environment variable overrides.
    ///
    /// - `TESSERA_WORKER_THREADS` → `worker_threads`
    /// - `TESSERA_SCHEDULER` → `scheduler`
    /// - `TESSERA_USE_GPU` → `use_gpu`
    /// - `TESSERA_CHUNK_SIZE` → `chunk_size`
    /// - `TESSERA_PREVIEW_SIZE` → `preview_size`
    fn apply_env_overrides(&mut self) -> Result<(), TesseraError> {
        if let Some(v) = env_opt("TESSERA_WORKER_THREADS") {
            self.worker_threads = parse_env("TESSERA_WORKER_THREADS", &v)?;
        }
        if let Some(v) = env_opt("TESSERA_SCHEDULER") {
            self.scheduler = v.parse()?;
        }
        if let Some(v) = env_opt("TESSERA_USE_GPU") {
            self.use_gpu = matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Some(v) = env_opt("TESSERA_CHUNK_SIZE") {
            self.chunk_size = Some(parse_env("TESSERA_CHUNK_SIZE", &v)?);
        }
        if let Some(v) = env_opt("TESSERA_PREVIEW_SIZE") {
            self.preview_size = parse_env("TESSERA_PREVIEW_SIZE", &v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), TesseraError> {
        if let Some(size) = self.chunk_size {
            if !(MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE).contains(&size) {
                return Err(TesseraError::Config(format!(
                    "chunk_size {size} outside {MIN_CHUNK_SIZE}..={MAX_CHUNK_SIZE}"
                )));
            }
        }
        if self.preview_size == 0 {
            return Err(TesseraError::Config("preview_size must be positive".into()));
        }
        Ok(())
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Execution config:");
        tracing::info!(
            "  scheduler:   kind={}, workers={}",
            self.scheduler,
            self.resolved_worker_threads()
        );
        tracing::info!("  gpu:         use_gpu={}", self.use_gpu);
        tracing::info!(
            "  chunks:      size={}",
            self.chunk_size
                .map(|s| s.to_string())
                .unwrap_or_else(|| "(from tree)".into())
        );
        tracing::info!("  previews:    max_side={}", self.preview_size);
    }
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T, TesseraError> {
    value
        .parse()
        .map_err(|_| TesseraError::Config(format!("invalid value '{value}' for {key}")))
}
