// Role-to-device link registry deriving composite amplifier status
use crate::domain::device::DeviceId;
use crate::domain::link::{CompositeStatus, LinkRole, RadioStatus};
use std::collections::HashMap;

/// Maps logical amplifier inputs to physical radios and mirrors their
/// band/mode/transmit status.
///
/// A configured link whose device has never reported is `Broken`, not
/// `Unlinked`: the UI warns specifically about a configured-but-silent link.
#[derive(Debug, Default)]
pub struct DeviceLinkRegistry {
    links: HashMap<LinkRole, DeviceId>,
    latest: HashMap<DeviceId, RadioStatus>,
}

impl DeviceLinkRegistry {
    pub fn set_link(&mut self, role: LinkRole, target: Option<DeviceId>) {
        match target {
            Some(device) => {
                self.links.insert(role, device);
            }
            None => {
                self.links.remove(&role);
            }
        }
    }

    pub fn link(&self, role: LinkRole) -> Option<&DeviceId> {
        self.links.get(&role)
    }

    pub fn links(&self) -> impl Iterator<Item = (LinkRole, &DeviceId)> {
        self.links.iter().map(|(role, device)| (*role, device))
    }

    /// Record the latest status telemetry for a device. Only the most recent
    /// observation is kept.
    pub fn on_status(&mut self, device: DeviceId, status: RadioStatus) {
        self.latest.insert(device, status);
    }

    pub fn resolve(&self, role: LinkRole) -> CompositeStatus {
        match self.links.get(&role) {
            None => CompositeStatus::Unlinked,
            Some(device) => match self.latest.get(device) {
                None => CompositeStatus::Broken {
                    device: device.clone(),
                },
                Some(status) => CompositeStatus::Live {
                    device: device.clone(),
                    status: status.clone(),
                },
            },
        }
    }
}
