//! Automatic muting while watched applications run.
//!
//! Ticks on the control thread's scheduler. Each tick compares the
//! watch-list against the running processes and drives the mute state to
//! match; the controller skips the device when nothing changes.

use crate::audio::{AudioError, MuteController};
use crate::process::ProcessSource;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Result of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoMuteOutcome {
    pub want_mute: bool,
    pub changed: bool,
}

pub struct AutoMuteMonitor {
    source: Box<dyn ProcessSource>,
    period: Duration,
    enabled: bool,
    /// Lowercased watch-list
    watchlist: Vec<String>,
    next_due: Option<Instant>,
}

impl AutoMuteMonitor {
    pub fn new(source: Box<dyn ProcessSource>, period: Duration) -> Self {
        Self {
            source,
            period,
            enabled: false,
            watchlist: Vec::new(),
            next_due: None,
        }
    }

    /// Replace the policy with a profile's settings.
    pub fn configure(&mut self, enabled: bool, watchlist: &[String]) {
        self.enabled = enabled;
        self.watchlist = watchlist.iter().map(|app| app.to_lowercase()).collect();
        info!(
            enabled,
            apps = ?self.watchlist,
            "Auto-mute configured"
        );
    }

    pub fn is_active(&self) -> bool {
        self.enabled && !self.watchlist.is_empty()
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Evaluate if a period has elapsed since the last evaluation.
    pub fn poll(
        &mut self,
        now: Instant,
        mute: &mut MuteController,
    ) -> Result<Option<AutoMuteOutcome>, AudioError> {
        match self.next_due {
            Some(due) if now < due => return Ok(None),
            _ => self.next_due = Some(now + self.period),
        }
        self.tick(mute)
    }

    /// Evaluate the policy once.
    ///
    /// Returns `None` when inactive or when the process snapshot failed.
    pub fn tick(&mut self, mute: &mut MuteController) -> Result<Option<AutoMuteOutcome>, AudioError> {
        if !self.is_active() {
            return Ok(None);
        }

        let snapshot = match self.source.snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "Skipping auto-mute check");
                return Ok(None);
            }
        };
        let running = snapshot.lowercase_names();
        let want_mute = self.watchlist.iter().any(|app| running.contains(app));

        let changed = mute.set_mute(want_mute)?;
        if changed {
            info!(muted = want_mute, "Auto-mute changed microphone state");
        } else {
            debug!(muted = want_mute, "Auto-mute check");
        }
        Ok(Some(AutoMuteOutcome { want_mute, changed }))
    }
}
