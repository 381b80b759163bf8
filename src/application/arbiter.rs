// Auto-reconnect arbitration for hardware connections
use crate::domain::device::{AutoReconnectTarget, ConnectionState, DeviceId, DeviceKind};
use std::collections::HashMap;

/// What the service should do for a connection event, if anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArbiterAction {
    /// The backend already has a live session: mark the device selected,
    /// do not issue a connect command.
    Adopt,
    /// Issue a connect command for the device.
    Connect,
}

/// Tri-state reconnect decision logic. A device is only acted on when it is
/// the auto-reconnect target and the user has nothing selected; `Unknown`
/// never triggers a command in either direction.
#[derive(Debug, Default)]
pub struct ConnectionArbiter {
    auto_target: Option<AutoReconnectTarget>,
    selected: Option<DeviceId>,
    observed: HashMap<DeviceId, ConnectionState>,
}

impl ConnectionArbiter {
    pub fn new(auto_target: Option<AutoReconnectTarget>) -> Self {
        Self {
            auto_target,
            ..Default::default()
        }
    }

    pub fn auto_target(&self) -> Option<&AutoReconnectTarget> {
        self.auto_target.as_ref()
    }

    pub fn selected(&self) -> Option<&DeviceId> {
        self.selected.as_ref()
    }

    pub fn select(&mut self, device: DeviceId) {
        self.selected = Some(device);
    }

    /// Record a connection-state event and decide on an action.
    pub fn on_connection_event(
        &mut self,
        device: &DeviceId,
        state: ConnectionState,
    ) -> Option<ArbiterAction> {
        let previous = self.observed.insert(device.clone(), state);
        if previous == Some(state) {
            // At-least-once channel: a repeat of the recorded state is a
            // duplicate delivery, not a transition.
            return None;
        }

        if self.selected.is_some() {
            return None;
        }
        let target = self.auto_target.as_ref()?;
        if &target.device != device {
            return None;
        }

        match state {
            // A discovery notification can arrive before the backend reports
            // whether it already holds a live session. Acting here risks
            // tearing down a working connection; wait for an explicit state.
            ConnectionState::Unknown => None,
            ConnectionState::Discovering | ConnectionState::Connecting => None,
            ConnectionState::Connected | ConnectionState::Monitoring => {
                self.selected = Some(device.clone());
                Some(ArbiterAction::Adopt)
            }
            ConnectionState::Disconnected | ConnectionState::Error => Some(ArbiterAction::Connect),
        }
    }

    /// The user manually disconnected: drop selection and opt out of
    /// auto-reconnect so the arbiter does not fight the user. Returns true
    /// when the persisted target changed.
    pub fn user_disconnected(&mut self, device: &DeviceId) -> bool {
        if self.selected.as_ref() == Some(device) {
            self.selected = None;
        }
        if self.auto_target.is_some() {
            self.auto_target = None;
            return true;
        }
        false
    }

    /// Target exactly the currently selected device, never "the first
    /// discovered one". Returns `None` when nothing is selected.
    pub fn enable_auto_reconnect(&mut self, kind: DeviceKind) -> Option<&AutoReconnectTarget> {
        let device = self.selected.clone()?;
        self.auto_target = Some(AutoReconnectTarget { device, kind });
        self.auto_target.as_ref()
    }

    pub fn disable_auto_reconnect(&mut self) -> bool {
        self.auto_target.take().is_some()
    }
}
