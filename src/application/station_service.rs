// Station service - owns the device registry and drives reconciliation
use crate::application::arbiter::{ArbiterAction, ConnectionArbiter};
use crate::application::clock::SystemClock;
use crate::application::command_port::CommandPort;
use crate::application::link_registry::DeviceLinkRegistry;
use crate::application::reconciler::{Reconciler, ReconcilerTunables};
use crate::application::settings_port::{PersistedLink, PersistedSettings, SettingsStore};
use crate::domain::bearing;
use crate::domain::device::{
    ConnectionState, DeviceId, DeviceKind, Quantity, TelemetryEvent, TelemetryPayload,
};
use crate::domain::link::LinkRole;
use crate::domain::panel::{AmplifierPanel, ConnectionPanel, RotatorPanel, StationSnapshot};
use anyhow::Context;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;

struct DeviceEntry {
    kind: DeviceKind,
    connection: ConnectionState,
    azimuth: Option<Reconciler<SystemClock>>,
    frequency_hz: Option<f64>,
}

impl DeviceEntry {
    fn new(kind: DeviceKind) -> Self {
        Self {
            kind,
            connection: ConnectionState::Unknown,
            azimuth: None,
            frequency_hz: None,
        }
    }
}

struct StationState {
    devices: HashMap<DeviceId, DeviceEntry>,
    arbiter: ConnectionArbiter,
    links: DeviceLinkRegistry,
}

impl StationState {
    fn entry_mut(&mut self, device: DeviceId, discovered_kind: DeviceKind) -> &mut DeviceEntry {
        match self.devices.entry(device) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                tracing::info!(device = %entry.key(), kind = ?discovered_kind, "discovered device");
                entry.insert(DeviceEntry::new(discovered_kind))
            }
        }
    }
}

/// Owns every per-device reconciler, the connection arbiter, and the link
/// registry. All mutation runs under one lock, matching the serialized
/// callback dispatch the backends guarantee; network calls never hold it.
#[derive(Clone)]
pub struct StationService {
    state: Arc<Mutex<StationState>>,
    commands: Arc<dyn CommandPort>,
    settings: Arc<dyn SettingsStore>,
    tunables: ReconcilerTunables,
    snapshots: Arc<watch::Sender<StationSnapshot>>,
}

impl StationService {
    pub fn new(
        commands: Arc<dyn CommandPort>,
        settings: Arc<dyn SettingsStore>,
        tunables: ReconcilerTunables,
    ) -> anyhow::Result<Self> {
        let persisted = settings.load().context("failed to load persisted settings")?;

        let mut state = StationState {
            devices: HashMap::new(),
            arbiter: ConnectionArbiter::new(persisted.auto_reconnect),
            links: DeviceLinkRegistry::default(),
        };
        for link in persisted.links {
            state.links.set_link(link.role, Some(link.device));
        }

        let (snapshots, _) = watch::channel(StationSnapshot::default());
        Ok(Self {
            state: Arc::new(Mutex::new(state)),
            commands,
            settings,
            tunables,
            snapshots: Arc::new(snapshots),
        })
    }

    /// Pre-register a device from configuration so its panel exists before
    /// the first telemetry arrives.
    pub fn register_device(&self, device: DeviceId, kind: DeviceKind) {
        let mut state = self.lock();
        state.devices.entry(device).or_insert_with(|| DeviceEntry::new(kind));
        self.publish(&state);
    }

    /// Route one validated telemetry event into the reconciliation core.
    /// Never fails: every inconsistency is resolved locally.
    pub fn handle_event(&self, event: TelemetryEvent) {
        tracing::trace!(device = %event.device, received_at = %event.received_at, "telemetry event");
        let mut follow_up = None;
        {
            let mut state = self.lock();
            let device = event.device;
            match event.payload {
                TelemetryPayload::Reading {
                    quantity: Quantity::Azimuth,
                    value,
                } => {
                    let tunables = self.tunables.clone();
                    let entry = state.entry_mut(device.clone(), DeviceKind::Rotator);
                    let reconciler = entry
                        .azimuth
                        .get_or_insert_with(|| Reconciler::new(SystemClock, tunables));
                    if !reconciler.on_telemetry(value) {
                        tracing::debug!(device = %device, value, "discarded azimuth sample");
                    }
                }
                TelemetryPayload::Reading {
                    quantity: Quantity::Frequency,
                    value,
                } => {
                    let entry = state.entry_mut(device.clone(), DeviceKind::Transceiver);
                    entry.frequency_hz = Some(value);
                }
                TelemetryPayload::Connection(connection) => {
                    {
                        let entry = state.entry_mut(device.clone(), DeviceKind::Transceiver);
                        entry.connection = connection;
                    }
                    if let Some(action) = state.arbiter.on_connection_event(&device, connection) {
                        follow_up = Some((device, action));
                    }
                }
                TelemetryPayload::Status(status) => {
                    state.entry_mut(device.clone(), DeviceKind::Transceiver);
                    state.links.on_status(device, status);
                }
            }
            self.publish(&state);
        }

        if let Some((device, action)) = follow_up {
            match action {
                ArbiterAction::Adopt => {
                    tracing::info!(device = %device, "adopted already-connected device");
                }
                ArbiterAction::Connect => {
                    tracing::info!(device = %device, "auto-reconnecting");
                    let commands = self.commands.clone();
                    tokio::spawn(async move {
                        if let Err(err) = commands.connect(&device).await {
                            tracing::warn!(device = %device, error = %err, "auto-reconnect dispatch failed");
                        }
                    });
                }
            }
        }
    }

    /// Command the rotator to a new bearing. The display moves immediately;
    /// the network call is fire-and-forget, and a rejected dispatch drops
    /// the confirmation window so the next sample is trusted as-is.
    pub fn set_bearing(&self, device: &DeviceId, value: f64) -> anyhow::Result<()> {
        anyhow::ensure!(value.is_finite(), "bearing must be finite");
        let value = bearing::normalize(value);

        {
            let mut state = self.lock();
            anyhow::ensure!(
                state.devices.contains_key(device),
                "unknown device {device}"
            );
            let tunables = self.tunables.clone();
            let entry = state.entry_mut(device.clone(), DeviceKind::Rotator);
            entry
                .azimuth
                .get_or_insert_with(|| Reconciler::new(SystemClock, tunables))
                .issue_command(value);
            self.publish(&state);
        }

        let service = self.clone();
        let device = device.clone();
        tokio::spawn(async move {
            if let Err(err) = service
                .commands
                .issue_command(&device, Quantity::Azimuth, value)
                .await
            {
                tracing::warn!(device = %device, error = %err, "bearing command dispatch failed");
                let mut state = service.lock();
                if let Some(reconciler) = state
                    .devices
                    .get_mut(&device)
                    .and_then(|entry| entry.azimuth.as_mut())
                {
                    reconciler.clear_pending();
                }
                service.publish(&state);
            }
        });
        Ok(())
    }

    /// User-initiated connect. Also selects the device: connecting is the
    /// strongest form of choosing it.
    pub async fn connect_device(&self, device: &DeviceId) -> anyhow::Result<()> {
        {
            let mut state = self.lock();
            anyhow::ensure!(
                state.devices.contains_key(device),
                "unknown device {device}"
            );
            state.arbiter.select(device.clone());
            self.publish(&state);
        }
        self.commands
            .connect(device)
            .await
            .with_context(|| format!("connect command for {device} failed"))
    }

    /// User-initiated disconnect. Clears the auto-reconnect target so the
    /// arbiter does not immediately undo the user's decision.
    pub async fn disconnect_device(&self, device: &DeviceId) -> anyhow::Result<()> {
        let target_cleared = {
            let mut state = self.lock();
            anyhow::ensure!(
                state.devices.contains_key(device),
                "unknown device {device}"
            );
            let cleared = state.arbiter.user_disconnected(device);
            self.publish(&state);
            cleared
        };
        if target_cleared {
            self.persist_settings()?;
        }
        self.commands
            .disconnect(device)
            .await
            .with_context(|| format!("disconnect command for {device} failed"))
    }

    pub fn select_device(&self, device: &DeviceId) -> anyhow::Result<()> {
        let mut state = self.lock();
        anyhow::ensure!(
            state.devices.contains_key(device),
            "unknown device {device}"
        );
        state.arbiter.select(device.clone());
        self.publish(&state);
        Ok(())
    }

    pub fn set_auto_reconnect(&self, enabled: bool) -> anyhow::Result<()> {
        let changed = {
            let mut state = self.lock();
            let changed = if enabled {
                let selected = state
                    .arbiter
                    .selected()
                    .cloned()
                    .context("no device selected to auto-reconnect")?;
                let kind = state
                    .devices
                    .get(&selected)
                    .map(|entry| entry.kind)
                    .with_context(|| format!("selected device {selected} is not registered"))?;
                state.arbiter.enable_auto_reconnect(kind).is_some()
            } else {
                state.arbiter.disable_auto_reconnect()
            };
            self.publish(&state);
            changed
        };
        if changed {
            self.persist_settings()?;
        }
        Ok(())
    }

    pub fn set_link(&self, role: LinkRole, target: Option<DeviceId>) -> anyhow::Result<()> {
        {
            let mut state = self.lock();
            state.links.set_link(role, target);
            self.publish(&state);
        }
        self.persist_settings()
    }

    pub fn subscribe(&self) -> watch::Receiver<StationSnapshot> {
        self.snapshots.subscribe()
    }

    pub fn snapshot(&self) -> StationSnapshot {
        self.snapshots.borrow().clone()
    }

    fn lock(&self) -> MutexGuard<'_, StationState> {
        self.state.lock().expect("station state lock poisoned")
    }

    fn persist_settings(&self) -> anyhow::Result<()> {
        let persisted = {
            let state = self.lock();
            let mut links: Vec<PersistedLink> = state
                .links
                .links()
                .map(|(role, device)| PersistedLink {
                    role,
                    device: device.clone(),
                })
                .collect();
            links.sort_by_key(|link| link.role);
            PersistedSettings {
                auto_reconnect: state.arbiter.auto_target().cloned(),
                links,
            }
        };
        self.settings
            .save(&persisted)
            .context("failed to persist settings")
    }

    fn publish(&self, state: &StationState) {
        self.snapshots.send_replace(Self::snapshot_of(state));
    }

    fn snapshot_of(state: &StationState) -> StationSnapshot {
        let mut ids: Vec<&DeviceId> = state.devices.keys().collect();
        ids.sort();

        let rotator = ids
            .iter()
            .filter_map(|id| state.devices.get(*id).map(|entry| (*id, entry)))
            .find(|(_, entry)| entry.kind == DeviceKind::Rotator)
            .map(|(id, entry)| RotatorPanel {
                device: id.clone(),
                bearing_deg: entry.azimuth.as_ref().and_then(|r| r.displayed()),
                slewing: entry
                    .azimuth
                    .as_ref()
                    .is_some_and(|r| r.awaiting_confirmation()),
            });

        let connections = ids
            .iter()
            .filter_map(|id| state.devices.get(*id).map(|entry| (*id, entry)))
            .map(|(id, entry)| ConnectionPanel {
                device: id.clone(),
                kind: entry.kind,
                state: entry.connection,
                selected: state.arbiter.selected() == Some(id),
                auto_reconnect: state
                    .arbiter
                    .auto_target()
                    .is_some_and(|target| &target.device == id),
                frequency_hz: entry.frequency_hz,
            })
            .collect();

        StationSnapshot {
            rotator,
            connections,
            amplifier: AmplifierPanel {
                input_a: state.links.resolve(LinkRole::A),
                input_b: state.links.resolve(LinkRole::B),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::link::{CompositeStatus, RadioStatus};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    struct RecordingPort {
        calls: Mutex<Vec<String>>,
        fail_commands: AtomicBool,
    }

    impl RecordingPort {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CommandPort for RecordingPort {
        async fn issue_command(
            &self,
            device: &DeviceId,
            quantity: Quantity,
            value: f64,
        ) -> anyhow::Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("command:{}:{}:{}", device, quantity.as_str(), value));
            if self.fail_commands.load(Ordering::SeqCst) {
                anyhow::bail!("backend rejected command");
            }
            Ok(())
        }

        async fn connect(&self, device: &DeviceId) -> anyhow::Result<()> {
            self.calls.lock().unwrap().push(format!("connect:{}", device));
            Ok(())
        }

        async fn disconnect(&self, device: &DeviceId) -> anyhow::Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("disconnect:{}", device));
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemorySettings {
        initial: PersistedSettings,
        saved: Mutex<Option<PersistedSettings>>,
    }

    impl SettingsStore for MemorySettings {
        fn load(&self) -> anyhow::Result<PersistedSettings> {
            Ok(self.initial.clone())
        }

        fn save(&self, settings: &PersistedSettings) -> anyhow::Result<()> {
            *self.saved.lock().unwrap() = Some(settings.clone());
            Ok(())
        }
    }

    fn rotator() -> DeviceId {
        DeviceId::new("rotator-1")
    }

    fn service_with(
        port: Arc<RecordingPort>,
        settings: Arc<MemorySettings>,
    ) -> StationService {
        StationService::new(port, settings, ReconcilerTunables::default()).unwrap()
    }

    fn connection_event(device: DeviceId, state: ConnectionState) -> TelemetryEvent {
        TelemetryEvent {
            device,
            payload: TelemetryPayload::Connection(state),
            received_at: Utc::now(),
        }
    }

    fn azimuth_event(device: DeviceId, value: f64) -> TelemetryEvent {
        TelemetryEvent {
            device,
            payload: TelemetryPayload::Reading {
                quantity: Quantity::Azimuth,
                value,
            },
            received_at: Utc::now(),
        }
    }

    async fn drain_spawned() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_first_telemetry_registers_device() {
        let service = service_with(Arc::default(), Arc::default());
        service.handle_event(TelemetryEvent {
            device: DeviceId::new("ic7300"),
            payload: TelemetryPayload::Reading {
                quantity: Quantity::Frequency,
                value: 14_074_000.0,
            },
            received_at: Utc::now(),
        });

        let snapshot = service.snapshot();
        assert_eq!(snapshot.connections.len(), 1);
        assert_eq!(snapshot.connections[0].state, ConnectionState::Unknown);
        assert_eq!(snapshot.connections[0].frequency_hz, Some(14_074_000.0));
    }

    #[tokio::test]
    async fn test_bearing_command_confirmed_by_telemetry() {
        let port = Arc::new(RecordingPort::default());
        let service = service_with(port.clone(), Arc::default());
        service.register_device(rotator(), DeviceKind::Rotator);

        service.set_bearing(&rotator(), 90.0).unwrap();
        let snapshot = service.snapshot();
        assert_eq!(snapshot.rotator.as_ref().unwrap().bearing_deg, Some(90.0));
        assert!(snapshot.rotator.as_ref().unwrap().slewing);

        drain_spawned().await;
        assert_eq!(port.calls(), vec!["command:rotator-1:azimuth:90"]);

        service.handle_event(azimuth_event(rotator(), 95.0));
        let snapshot = service.snapshot();
        assert_eq!(snapshot.rotator.as_ref().unwrap().bearing_deg, Some(95.0));
        assert!(!snapshot.rotator.as_ref().unwrap().slewing);
    }

    #[tokio::test]
    async fn test_failed_dispatch_trusts_next_sample() {
        let port = Arc::new(RecordingPort::default());
        port.fail_commands.store(true, Ordering::SeqCst);
        let service = service_with(port.clone(), Arc::default());
        service.register_device(rotator(), DeviceKind::Rotator);

        service.set_bearing(&rotator(), 90.0).unwrap();
        drain_spawned().await;

        // Optimistic value survives the failure, but the window is gone:
        // a divergent sample is accepted unconditionally.
        let snapshot = service.snapshot();
        assert_eq!(snapshot.rotator.as_ref().unwrap().bearing_deg, Some(90.0));
        service.handle_event(azimuth_event(rotator(), 300.0));
        assert_eq!(
            service.snapshot().rotator.unwrap().bearing_deg,
            Some(300.0)
        );
    }

    #[tokio::test]
    async fn test_auto_reconnect_issues_single_connect() {
        let port = Arc::new(RecordingPort::default());
        let settings = Arc::new(MemorySettings {
            initial: PersistedSettings {
                auto_reconnect: Some(crate::domain::device::AutoReconnectTarget {
                    device: rotator(),
                    kind: DeviceKind::Rotator,
                }),
                links: Vec::new(),
            },
            saved: Mutex::new(None),
        });
        let service = service_with(port.clone(), settings);

        service.handle_event(connection_event(rotator(), ConnectionState::Unknown));
        service.handle_event(connection_event(rotator(), ConnectionState::Unknown));
        drain_spawned().await;
        assert!(port.calls().is_empty());

        service.handle_event(connection_event(rotator(), ConnectionState::Disconnected));
        drain_spawned().await;
        assert_eq!(port.calls(), vec!["connect:rotator-1"]);
    }

    #[tokio::test]
    async fn test_already_connected_target_adopted_without_command() {
        let port = Arc::new(RecordingPort::default());
        let settings = Arc::new(MemorySettings {
            initial: PersistedSettings {
                auto_reconnect: Some(crate::domain::device::AutoReconnectTarget {
                    device: rotator(),
                    kind: DeviceKind::Rotator,
                }),
                links: Vec::new(),
            },
            saved: Mutex::new(None),
        });
        let service = service_with(port.clone(), settings);

        service.handle_event(connection_event(rotator(), ConnectionState::Unknown));
        service.handle_event(connection_event(rotator(), ConnectionState::Connected));
        drain_spawned().await;

        assert!(port.calls().is_empty());
        let snapshot = service.snapshot();
        assert!(snapshot.connections[0].selected);
    }

    #[tokio::test]
    async fn test_user_disconnect_clears_persisted_target() {
        let port = Arc::new(RecordingPort::default());
        let settings = Arc::new(MemorySettings {
            initial: PersistedSettings {
                auto_reconnect: Some(crate::domain::device::AutoReconnectTarget {
                    device: rotator(),
                    kind: DeviceKind::Rotator,
                }),
                links: Vec::new(),
            },
            saved: Mutex::new(None),
        });
        let service = service_with(port.clone(), settings.clone());
        service.register_device(rotator(), DeviceKind::Rotator);

        service.disconnect_device(&rotator()).await.unwrap();

        assert_eq!(port.calls(), vec!["disconnect:rotator-1"]);
        let saved = settings.saved.lock().unwrap().clone().unwrap();
        assert_eq!(saved.auto_reconnect, None);
    }

    #[tokio::test]
    async fn test_enable_auto_reconnect_targets_selection() {
        let port = Arc::new(RecordingPort::default());
        let settings = Arc::new(MemorySettings::default());
        let service = service_with(port, settings.clone());
        service.register_device(rotator(), DeviceKind::Rotator);

        assert!(service.set_auto_reconnect(true).is_err());

        service.select_device(&rotator()).unwrap();
        service.set_auto_reconnect(true).unwrap();

        let saved = settings.saved.lock().unwrap().clone().unwrap();
        assert_eq!(saved.auto_reconnect.unwrap().device, rotator());
        assert!(service.snapshot().connections[0].auto_reconnect);
    }

    #[tokio::test]
    async fn test_link_status_flows_into_amplifier_panel() {
        let service = service_with(Arc::default(), Arc::default());
        service.set_link(LinkRole::A, Some(DeviceId::new("ic7300"))).unwrap();
        assert!(matches!(
            service.snapshot().amplifier.input_a,
            CompositeStatus::Broken { .. }
        ));

        service.handle_event(TelemetryEvent {
            device: DeviceId::new("ic7300"),
            payload: TelemetryPayload::Status(RadioStatus {
                band: "20m".to_string(),
                mode: "CW".to_string(),
                transmitting: true,
            }),
            received_at: Utc::now(),
        });
        match service.snapshot().amplifier.input_a {
            CompositeStatus::Live { status, .. } => {
                assert_eq!(status.band, "20m");
                assert!(status.transmitting);
            }
            other => panic!("expected live link, got {:?}", other),
        }
    }
}
