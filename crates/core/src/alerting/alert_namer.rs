use std::path::{Path, PathBuf};

use crate::shared::constants::{ALERT_FILE_EXTENSION, ALERT_FILE_PREFIX};

/// What to do when an alert file for the same second already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollisionPolicy {
    /// Reuse `alert_<secs>.jpg`; the newer snapshot replaces the older one.
    #[default]
    Overwrite,
    /// Append a sequence number: `alert_<secs>_1.jpg`, `alert_<secs>_2.jpg`, ...
    Unique,
}

/// Picks the output path for an alert snapshot.
#[derive(Debug, Clone, Default)]
pub struct AlertNamer {
    policy: CollisionPolicy,
}

impl AlertNamer {
    pub fn new(policy: CollisionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> CollisionPolicy {
        self.policy
    }

    pub fn path_for(&self, dir: &Path, unix_seconds: u64) -> PathBuf {
        let base = dir.join(file_name(unix_seconds, None));
        if !base.exists() {
            return base;
        }

        match self.policy {
            CollisionPolicy::Overwrite => {
                log::warn!(
                    "{} already exists and will be overwritten by a newer alert",
                    base.display()
                );
                base
            }
            CollisionPolicy::Unique => {
                let mut seq = 1u32;
                loop {
                    let candidate = dir.join(file_name(unix_seconds, Some(seq)));
                    if !candidate.exists() {
                        return candidate;
                    }
                    seq += 1;
                }
            }
        }
    }
}

fn file_name(unix_seconds: u64, seq: Option<u32>) -> String {
    match seq {
        Some(n) => format!("{ALERT_FILE_PREFIX}{unix_seconds}_{n}.{ALERT_FILE_EXTENSION}"),
        None => format!("{ALERT_FILE_PREFIX}{unix_seconds}.{ALERT_FILE_EXTENSION}"),
    }
}
