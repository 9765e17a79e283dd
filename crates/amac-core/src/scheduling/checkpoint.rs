// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of FluxION.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! Persistence of partially trained policies.
//!
//! A checkpoint carries the Q-table, the ε schedule and the number of
//! finished episodes, which is enough to continue training where it stopped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::exploration::EpsilonSchedule;
use super::q_table::QTable;
use crate::error::{Result, SchedulerError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyCheckpoint {
    pub episodes_completed: usize,
    pub schedule: EpsilonSchedule,
    pub q_table: QTable,
    pub saved_at: DateTime<Utc>,
}

impl PolicyCheckpoint {
    pub fn new(episodes_completed: usize, schedule: EpsilonSchedule, q_table: QTable) -> Self {
        Self {
            episodes_completed,
            schedule,
            q_table,
            saved_at: Utc::now(),
        }
    }

    /// Write the checkpoint as JSON via temp file + rename
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string(self)?;
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, json)?;
        fs::rename(&temp_path, path)?;

        debug!(
            "Saved policy checkpoint to {} after {} episodes",
            path.display(),
            self.episodes_completed
        );
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let checkpoint: Self = serde_json::from_str(&contents)?;

        if !checkpoint.q_table.is_consistent() {
            return Err(SchedulerError::CorruptCheckpoint(path.to_path_buf()));
        }

        info!(
            "Loaded policy checkpoint from {} ({} episodes, epsilon={:.4})",
            path.display(),
            checkpoint.episodes_completed,
            checkpoint.schedule.epsilon()
        );
        Ok(checkpoint)
    }

    /// Fails unless the stored table fits a `steps` x `bins` problem
    pub fn ensure_shape(&self, steps: usize, bins: usize) -> Result<()> {
        if self.q_table.steps() == steps && self.q_table.bins() == bins {
            Ok(())
        } else {
            Err(SchedulerError::CheckpointMismatch {
                expected_steps: steps,
                expected_bins: bins,
                found_steps: self.q_table.steps(),
                found_bins: self.q_table.bins(),
            })
        }
    }
}

/// Where and how often training writes checkpoints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointPolicy {
    pub path: PathBuf,
    /// Episodes between writes; 0 only writes when training stops
    pub every_episodes: usize,
}

impl CheckpointPolicy {
    pub fn new(path: impl Into<PathBuf>, every_episodes: usize) -> Self {
        Self {
            path: path.into(),
            every_episodes,
        }
    }

    pub(crate) fn is_due(&self, episodes_completed: usize) -> bool {
        self.every_episodes > 0 && episodes_completed.is_multiple_of(self.every_episodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("policy.json");

        let mut q_table = QTable::new(3, 4);
        q_table.set(2, 1, 3, -0.25);
        let mut schedule = EpsilonSchedule::new(0.5, 2.0, 6);
        schedule.for_episode(13);

        let checkpoint = PolicyCheckpoint::new(14, schedule, q_table);
        checkpoint.save(&path).unwrap();
        assert!(!path.with_extension("tmp").exists());

        let loaded = PolicyCheckpoint::load(&path).unwrap();
        assert_eq!(loaded, checkpoint);
        assert_eq!(loaded.q_table.get(2, 1, 3), -0.25);
    }

    #[test]
    fn test_save_creates_parent_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("policy.json");
        let checkpoint =
            PolicyCheckpoint::new(0, EpsilonSchedule::new(0.5, 1.1, 1), QTable::new(1, 2));
        checkpoint.save(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_truncated_table_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("policy.json");
        let mut json = serde_json::to_value(PolicyCheckpoint::new(
            0,
            EpsilonSchedule::new(0.5, 1.1, 1),
            QTable::new(2, 2),
        ))
        .unwrap();
        json["q_table"]["values"] = serde_json::json!([0.0, 1.0]);
        fs::write(&path, json.to_string()).unwrap();

        assert!(matches!(
            PolicyCheckpoint::load(&path),
            Err(SchedulerError::CorruptCheckpoint(_))
        ));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let result = PolicyCheckpoint::load(&dir.path().join("missing.json"));
        assert!(matches!(result, Err(SchedulerError::Io(_))));
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let checkpoint =
            PolicyCheckpoint::new(0, EpsilonSchedule::new(0.5, 1.1, 1), QTable::new(2, 3));
        assert!(checkpoint.ensure_shape(2, 3).is_ok());
        assert!(matches!(
            checkpoint.ensure_shape(4, 3),
            Err(SchedulerError::CheckpointMismatch { expected_steps: 4, .. })
        ));
    }

    #[test]
    fn test_checkpoint_cadence() {
        let policy = CheckpointPolicy::new("policy.json", 5);
        assert!(!policy.is_due(4));
        assert!(policy.is_due(10));
        assert!(!CheckpointPolicy::new("policy.json", 0).is_due(10));
    }
}
