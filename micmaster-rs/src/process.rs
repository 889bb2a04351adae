//! Running-process snapshots.
//!
//! Used by the auto-mute policy, the updater's wait loop and the
//! application picker. Name matching is case-insensitive throughout.

use std::collections::BTreeSet;
use sysinfo::System;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Failed to enumerate processes: {0}")]
    Enumeration(String),
}

/// One running process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEntry {
    pub pid: u32,
    pub name: String,
}

/// Point-in-time list of running processes.
#[derive(Debug, Clone, Default)]
pub struct ProcessSnapshot {
    entries: Vec<ProcessEntry>,
}

impl ProcessSnapshot {
    pub fn new(entries: Vec<ProcessEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[ProcessEntry] {
        &self.entries
    }

    /// True if any process is named `name`, ignoring case.
    pub fn contains_name(&self, name: &str) -> bool {
        let wanted = name.to_lowercase();
        self.entries.iter().any(|e| e.name.to_lowercase() == wanted)
    }

    /// Like [`contains_name`](Self::contains_name) but ignores process `pid`.
    pub fn is_running_except(&self, name: &str, pid: u32) -> bool {
        let wanted = name.to_lowercase();
        self.entries
            .iter()
            .any(|e| e.pid != pid && e.name.to_lowercase() == wanted)
    }

    /// Lowercased names, for repeated membership checks.
    pub fn lowercase_names(&self) -> BTreeSet<String> {
        self.entries.iter().map(|e| e.name.to_lowercase()).collect()
    }

    /// Unique process names, sorted for display.
    pub fn sorted_names(&self) -> Vec<String> {
        let names: BTreeSet<&str> = self
            .entries
            .iter()
            .map(|e| e.name.as_str())
            .filter(|n| !n.is_empty())
            .collect();
        names.into_iter().map(str::to_string).collect()
    }
}

/// Something that can list running processes.
pub trait ProcessSource {
    fn snapshot(&mut self) -> Result<ProcessSnapshot, ProcessError>;
}

/// Process source backed by `sysinfo`.
pub struct SystemProcesses {
    system: System,
}

impl SystemProcesses {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for SystemProcesses {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessSource for SystemProcesses {
    fn snapshot(&mut self) -> Result<ProcessSnapshot, ProcessError> {
        self.system.refresh_processes();
        let entries = self
            .system
            .processes()
            .iter()
            .map(|(pid, process)| ProcessEntry {
                pid: pid.as_u32(),
                name: process.name().to_string(),
            })
            .collect();
        Ok(ProcessSnapshot::new(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> ProcessSnapshot {
        ProcessSnapshot::new(vec![
            ProcessEntry {
                pid: 10,
                name: "Teams.exe".into(),
            },
            ProcessEntry {
                pid: 11,
                name: "explorer.exe".into(),
            },
            ProcessEntry {
                pid: 12,
                name: "explorer.exe".into(),
            },
            ProcessEntry {
                pid: 13,
                name: "MicMaster.exe".into(),
            },
        ])
    }

    #[test]
    fn test_contains_name_ignores_case() {
        let snap = snapshot();
        assert!(snap.contains_name("teams.exe"));
        assert!(snap.contains_name("EXPLORER.EXE"));
        assert!(!snap.contains_name("zoom.exe"));
    }

    #[test]
    fn test_is_running_except_skips_own_pid() {
        let snap = snapshot();
        assert!(!snap.is_running_except("micmaster.exe", 13));
        assert!(snap.is_running_except("explorer.exe", 11));
    }

    #[test]
    fn test_sorted_names_are_unique() {
        assert_eq!(
            snapshot().sorted_names(),
            vec!["MicMaster.exe", "Teams.exe", "explorer.exe"]
        );
    }

    #[test]
    fn test_system_snapshot_lists_current_process() {
        let mut source = SystemProcesses::new();
        let snap = source.snapshot().unwrap();
        let own = std::process::id();
        assert!(snap.entries().iter().any(|e| e.pid == own));
    }
}
