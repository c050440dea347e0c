// src/errlog/mod.rs
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Default cap on buffered entries.
pub const DEFAULT_MAX_ENTRIES: usize = 100;

/// One recorded failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub timestamp: DateTime<Utc>,
    /// Top-level failure message.
    pub message: String,
    /// Full cause chain, when there is more to say than `message`.
    pub detail: String,
    /// Caller-supplied label identifying which operation failed.
    pub context: String,
    /// Client identity string, the browser original's userAgent analogue.
    pub environment: String,
}

/// Capped FIFO buffer of failure events, mirrored to the console sink and to
/// a durable JSON store on every append.
///
/// Constructed once and passed by reference to whatever needs to log; there
/// is no global instance.
pub struct ErrorLog {
    entries: VecDeque<ErrorEntry>,
    max_entries: usize,
    store_path: PathBuf,
    environment: String,
}

fn environment_descriptor() -> String {
    format!(
        "{}/{} ({})",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS
    )
}

impl ErrorLog {
    /// Create a log persisting to `store_path`, holding at most
    /// `max_entries` entries in memory.
    pub fn new(store_path: impl Into<PathBuf>, max_entries: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_entries,
            store_path: store_path.into(),
            environment: environment_descriptor(),
        }
    }

    /// Create a log with the default cap.
    pub fn with_default_capacity(store_path: impl Into<PathBuf>) -> Self {
        Self::new(store_path, DEFAULT_MAX_ENTRIES)
    }

    /// Append an entry built from `err`, evicting the oldest entries while
    /// over the cap, then persist the buffer. The persisted write is
    /// best-effort: a store failure is warned about, never propagated.
    /// Returns the entry just recorded.
    pub fn record(&mut self, err: &anyhow::Error, context: &str) -> ErrorEntry {
        let entry = ErrorEntry {
            timestamp: Utc::now(),
            message: err.to_string(),
            detail: format!("{err:#}"),
            context: context.to_string(),
            environment: self.environment.clone(),
        };

        error!(context, error = %entry.detail, "recorded failure");

        self.entries.push_back(entry.clone());
        while self.entries.len() > self.max_entries {
            self.entries.pop_front();
        }

        if let Err(e) = self.persist() {
            warn!(store = %self.store_path.display(), error = %e, "could not persist error log");
        }
        entry
    }

    /// Current buffer, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &ErrorEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Empty the buffer and remove the durable store.
    pub fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        if self.store_path.exists() {
            fs::remove_file(&self.store_path).with_context(|| {
                format!("removing error store {}", self.store_path.display())
            })?;
        }
        Ok(())
    }

    /// Serialize the buffer to `error-log-<timestamp>.json` under `dir` for
    /// offline inspection. Returns the written path.
    pub fn export(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)
            .with_context(|| format!("creating export directory {}", dir.display()))?;
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
        let path = dir.join(format!("error-log-{stamp}.json"));
        let json = serde_json::to_string_pretty(&self.entries.iter().collect::<Vec<_>>())?;
        fs::write(&path, json)
            .with_context(|| format!("writing error log export {}", path.display()))?;
        info!(path = %path.display(), entries = self.entries.len(), "exported error log");
        Ok(path)
    }

    /// Best-effort load of a previously persisted buffer. Called once at
    /// startup; a missing store is normal, an unreadable one is a warning
    /// rather than a fatal condition.
    pub fn restore(&mut self) {
        if !self.store_path.exists() {
            return;
        }
        let loaded: Result<Vec<ErrorEntry>> = fs::read_to_string(&self.store_path)
            .context("reading error store")
            .and_then(|text| serde_json::from_str(&text).context("decoding error store"));
        match loaded {
            Ok(entries) => {
                info!(entries = entries.len(), "restored error log");
                self.entries = entries.into();
                while self.entries.len() > self.max_entries {
                    self.entries.pop_front();
                }
            }
            Err(e) => {
                warn!(store = %self.store_path.display(), error = %e, "could not restore error log");
            }
        }
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.store_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(&self.entries.iter().collect::<Vec<_>>())?;
        fs::write(&self.store_path, json)
            .with_context(|| format!("writing error store {}", self.store_path.display()))?;
        Ok(())
    }
}
