// Device link domain models - logical amplifier inputs mirrored from radios
use crate::domain::device::DeviceId;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Logical port of a multi-input device (amplifier input A or B).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkRole {
    A,
    B,
}

impl FromStr for LinkRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "a" | "A" => Ok(LinkRole::A),
            "b" | "B" => Ok(LinkRole::B),
            other => Err(format!("unknown link role: {}", other)),
        }
    }
}

/// Band/mode/transmit status mirrored from a linked radio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadioStatus {
    pub band: String,
    pub mode: String,
    pub transmitting: bool,
}

/// Three-way link status. `Broken` (configured link, silent device) is a
/// first-class outcome and must stay distinguishable from `Unlinked`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CompositeStatus {
    Unlinked,
    Broken {
        device: DeviceId,
    },
    Live {
        device: DeviceId,
        #[serde(flatten, rename = "radio")]
        status: RadioStatus,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        assert_eq!("a".parse::<LinkRole>().unwrap(), LinkRole::A);
        assert_eq!("B".parse::<LinkRole>().unwrap(), LinkRole::B);
        assert!("c".parse::<LinkRole>().is_err());
    }

    #[test]
    fn test_status_tags_are_distinguishable() {
        let unlinked = serde_json::to_value(CompositeStatus::Unlinked).unwrap();
        assert_eq!(unlinked["status"], "unlinked");

        let broken = serde_json::to_value(CompositeStatus::Broken {
            device: DeviceId::new("ic7300"),
        })
        .unwrap();
        assert_eq!(broken["status"], "broken");
        assert_eq!(broken["device"], "ic7300");

        let live = serde_json::to_value(CompositeStatus::Live {
            device: DeviceId::new("ic7300"),
            status: RadioStatus {
                band: "20m".to_string(),
                mode: "CW".to_string(),
                transmitting: false,
            },
        })
        .unwrap();
        assert_eq!(live["status"], "live");
        assert_eq!(live["band"], "20m");
    }
}
