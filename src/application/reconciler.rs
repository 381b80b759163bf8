// Command-vs-telemetry reconciliation for one continuous device quantity
use crate::application::clock::Clock;
use crate::domain::bearing;
use crate::domain::device::Command;
use std::time::Duration;

/// Reconciliation constants. These bound the time a rotator needs to leave
/// its previous reading and the angular slack of one polling tick; they are
/// configuration, not derived values.
#[derive(Debug, Clone)]
pub struct ReconcilerTunables {
    /// How long after a command incoming telemetry is filtered against the
    /// commanded value before being trusted.
    pub confirm_window: Duration,
    /// Maximum circular distance between a sample and the commanded value
    /// for the sample to count as confirmation.
    pub confirm_tolerance_deg: f64,
    /// Known bad-transient reading the hardware emits during internal state
    /// transitions. `None` disables sentinel handling.
    pub sentinel_deg: Option<f64>,
    /// A sentinel sample is only trusted when the displayed value is already
    /// within this circular distance of the sentinel.
    pub sentinel_guard_deg: f64,
}

impl Default for ReconcilerTunables {
    fn default() -> Self {
        Self {
            confirm_window: Duration::from_millis(1000),
            confirm_tolerance_deg: 15.0,
            sentinel_deg: Some(0.0),
            sentinel_guard_deg: 30.0,
        }
    }
}

/// Decides the authoritative displayed value for one device quantity as
/// locally issued commands race against asynchronous telemetry.
///
/// Callers validate samples before they get here; nothing in this state
/// machine fails.
#[derive(Debug)]
pub struct Reconciler<C: Clock> {
    clock: C,
    tunables: ReconcilerTunables,
    pending: Option<Command>,
    displayed: Option<f64>,
}

impl<C: Clock> Reconciler<C> {
    pub fn new(clock: C, tunables: ReconcilerTunables) -> Self {
        Self {
            clock,
            tunables,
            pending: None,
            displayed: None,
        }
    }

    pub fn displayed(&self) -> Option<f64> {
        self.displayed
    }

    /// True while an issued command is still inside its confirmation window.
    pub fn awaiting_confirmation(&self) -> bool {
        self.pending.is_some_and(|cmd| {
            self.clock.now().duration_since(cmd.issued_at) < self.tunables.confirm_window
        })
    }

    /// Record a locally requested value. The display moves optimistically;
    /// a new command supersedes any prior one's confirmation window. Network
    /// dispatch is the caller's job and never feeds back into this state;
    /// only telemetry does.
    pub fn issue_command(&mut self, value: f64) {
        self.pending = Some(Command {
            value,
            issued_at: self.clock.now(),
        });
        self.displayed = Some(value);
    }

    /// Apply one telemetry sample. Returns whether it was accepted as the
    /// new displayed value.
    pub fn on_telemetry(&mut self, value: f64) -> bool {
        // Spurious transient reading: never allowed to overwrite a
        // legitimate display far from the sentinel, pending command or not.
        if let Some(sentinel) = self.tunables.sentinel_deg {
            if value == sentinel {
                if let Some(displayed) = self.displayed {
                    if !bearing::is_near(displayed, sentinel, self.tunables.sentinel_guard_deg) {
                        return false;
                    }
                }
            }
        }

        if let Some(cmd) = self.pending {
            if self.clock.now().duration_since(cmd.issued_at) < self.tunables.confirm_window {
                // Inside the window: only a sample near the commanded value
                // is trusted. A late sample describing the pre-command
                // position must not flicker the display backward.
                if bearing::is_near(value, cmd.value, self.tunables.confirm_tolerance_deg) {
                    self.displayed = Some(value);
                    self.pending = None;
                    return true;
                }
                return false;
            }
        }

        self.displayed = Some(value);
        self.pending = None;
        true
    }

    /// Drop the confirmation window after a failed command dispatch. The
    /// displayed value is kept so the panel does not flicker, but the next
    /// sample is accepted unconditionally rather than being held to a
    /// now-meaningless commanded value.
    pub fn clear_pending(&mut self) {
        self.pending = None;
    }
}
