//! Persisted tally of completed analyses.
//!
//! The read-modify-write in [`UsageCounter::increment`] is not atomic
//! across processes; two instances finishing at once can lose a count.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Fixed key the stats are stored under.
pub const STATS_KEY: &str = "autoVisionStats";

/// Stored shape: `{ "scansCount": n }`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageStats {
    #[serde(rename = "scansCount", default)]
    pub scans_count: u64,
}

/// Durable key-value slot for [`UsageStats`].
pub trait CounterStore: Send {
    fn load(&self) -> Result<Option<UsageStats>>;
    fn save(&self, stats: &UsageStats) -> Result<()>;
}

/// Stats as a JSON file named after [`STATS_KEY`].
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            path: dir.join(format!("{STATS_KEY}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CounterStore for JsonFileStore {
    fn load(&self) -> Result<Option<UsageStats>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read(&self.path)
            .with_context(|| format!("cannot read {}", self.path.display()))?;
        let stats = serde_json::from_slice(&raw)
            .with_context(|| format!("invalid stats in {}", self.path.display()))?;
        Ok(Some(stats))
    }

    fn save(&self, stats: &UsageStats) -> Result<()> {
        let raw = serde_json::to_vec(stats)?;
        fs::write(&self.path, raw)
            .with_context(|| format!("cannot write {}", self.path.display()))
    }
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slot: Mutex<Option<UsageStats>>,
}

impl MemoryStore {
    pub fn with(stats: UsageStats) -> Self {
        Self {
            slot: Mutex::new(Some(stats)),
        }
    }
}

impl CounterStore for MemoryStore {
    fn load(&self) -> Result<Option<UsageStats>> {
        Ok(*self.slot.lock().map_err(|_| anyhow::anyhow!("stats lock poisoned"))?)
    }

    fn save(&self, stats: &UsageStats) -> Result<()> {
        *self.slot.lock().map_err(|_| anyhow::anyhow!("stats lock poisoned"))? = Some(*stats);
        Ok(())
    }
}

/// Count of successful analyses, backed by a [`CounterStore`].
pub struct UsageCounter {
    store: Box<dyn CounterStore>,
    current: u64,
}

impl UsageCounter {
    /// Read the persisted count once; unreadable stats count as zero.
    pub fn open(store: Box<dyn CounterStore>) -> Self {
        let current = match store.load() {
            Ok(stats) => stats.unwrap_or_default().scans_count,
            Err(err) => {
                tracing::warn!("starting usage count at 0: {err:#}");
                0
            }
        };
        Self { store, current }
    }

    pub fn count(&self) -> u64 {
        self.current
    }

    /// Add one completed analysis and persist it. Returns the new count.
    ///
    /// A failed write is logged; the displayed count still advances.
    pub fn increment(&mut self) -> u64 {
        let last = match self.store.load() {
            Ok(stats) => stats.map_or(self.current, |s| s.scans_count),
            Err(err) => {
                tracing::warn!("cannot re-read usage count: {err:#}");
                self.current
            }
        };
        self.current = last.saturating_add(1);
        if let Err(err) = self.store.save(&UsageStats {
            scans_count: self.current,
        }) {
            tracing::warn!("cannot persist usage count: {err:#}");
        }
        self.current
    }
}

impl std::fmt::Debug for UsageCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsageCounter")
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}
