//! Run Identifier Persistence
//!
//! Every record written during one process lifetime carries the same run
//! identifier; identifiers are distinct across separate invocations. The
//! counter lives in a plain-text side-store file holding a single
//! non-negative integer. A missing or unreadable file is the expected
//! first-run state and loads as 0, never an error.
//!
//! The id is claimed lazily: the first `current_run_id` call returns the
//! loaded value and bumps the in-memory counter by one, exactly once per
//! counter instance no matter how many compilation units are processed.
//! `save` then persists the next run's starting value.
//!
//! The side store is shared mutable state across processes with no
//! locking; concurrent engines can lose counter updates. Known limitation.

use crate::extractor::error::ExtractorError;
use std::path::PathBuf;

/// Persistent run counter with claim-once semantics.
#[derive(Debug)]
pub struct RunCounter {
    path: PathBuf,
    value: u32,
    claimed: Option<u32>,
}

impl RunCounter {
    /// Load the counter from its side store.
    ///
    /// The file is opened, read, and closed within this call; no handle is
    /// held across the run. Absence or garbage content yields 0.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let value = match std::fs::read_to_string(&path) {
            Ok(text) => match text.trim().parse::<u32>() {
                Ok(value) => {
                    log::info!("Read run counter {} from {}", value, path.display());
                    value
                }
                Err(_) => {
                    log::warn!(
                        "Run counter file {} is not a number, starting from 0",
                        path.display()
                    );
                    0u32
                }
            },
            Err(_) => {
                log::info!("No run counter file at {}, starting from 0", path.display());
                0u32
            }
        };
        Self {
            path,
            value,
            claimed: None,
        }
    }

    /// The run identifier for this process.
    ///
    /// First call claims the loaded value and increments the in-memory
    /// counter by one; later calls return the claimed id unchanged.
    pub fn current_run_id(&mut self) -> u32 {
        if let Some(id) = self.claimed {
            return id;
        }
        let id = self.value;
        self.value = self.value.wrapping_add(1);
        self.claimed = Some(id);
        log::debug!("Claimed run id {}", id);
        id
    }

    /// Persist the (possibly incremented) counter back to the side store.
    ///
    /// # Errors
    /// Returns `CounterPersist` on write failure; callers report it and
    /// keep already-written dataset rows.
    pub fn save(&self) -> Result<(), ExtractorError> {
        std::fs::write(&self.path, self.value.to_string()).map_err(|e| {
            ExtractorError::CounterPersist {
                path: self.path.clone(),
                source: e,
            }
        })?;
        log::info!("Saved run counter {} to {}", self.value, self.path.display());
        Ok(())
    }

    /// The value `save` would persist.
    pub fn value(&self) -> u32 {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_loads_as_zero() {
        let dir = tempfile::tempdir().unwrap();
        let counter = RunCounter::load(dir.path().join("code_id.txt"));
        assert_eq!(counter.value(), 0);
    }

    #[test]
    fn test_claim_increments_exactly_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut counter = RunCounter::load(dir.path().join("code_id.txt"));
        let first = counter.current_run_id();
        let second = counter.current_run_id();
        assert_eq!(first, 0);
        assert_eq!(second, 0);
        assert_eq!(counter.value(), 1);
    }

    #[test]
    fn test_save_then_reload_advances_run_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("code_id.txt");

        let mut counter = RunCounter::load(&path);
        assert_eq!(counter.current_run_id(), 0);
        counter.save().unwrap();

        let mut counter = RunCounter::load(&path);
        assert_eq!(counter.current_run_id(), 1);
    }

    #[test]
    fn test_garbage_content_loads_as_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("code_id.txt");
        std::fs::write(&path, "not a number").unwrap();
        let counter = RunCounter::load(&path);
        assert_eq!(counter.value(), 0);
    }
}
