//! Per-family knowledge accumulated from discovery responses.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::family::DeviceFamily;
use crate::state::{Snapshot, StateStore};

/// What discovery has learned about the lighting bridge.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeState {
    pub address: Option<IpAddr>,
    pub bridge_id: Option<String>,
}

/// One discovered UPnP plug.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlugEntry {
    /// URL of the device setup document; the identity of the plug.
    pub setup_location: String,
    pub address: IpAddr,
    pub unique_service_name: Option<String>,
}

/// The discovered state of one family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FamilyState {
    Bridge(BridgeState),
    /// Plugs in first-seen order, unique by setup location.
    Plugs(Vec<PlugEntry>),
}

/// Discovery state keyed by family. Families with nothing known yet are absent.
pub type DiscoverySnapshot = Snapshot<DeviceFamily, FamilyState>;

pub(crate) type DiscoveryStore = StateStore<DeviceFamily, FamilyState>;

impl Snapshot<DeviceFamily, FamilyState> {
    pub fn bridge(&self) -> Option<&BridgeState> {
        match self.get(&DeviceFamily::BridgeLight) {
            Some(FamilyState::Bridge(bridge)) => Some(bridge),
            _ => None,
        }
    }

    pub fn plugs(&self) -> &[PlugEntry] {
        match self.get(&DeviceFamily::UpnpPlug) {
            Some(FamilyState::Plugs(plugs)) => plugs,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_snapshot_accessors() {
        let snapshot = DiscoverySnapshot::default();
        assert!(snapshot.bridge().is_none());
        assert!(snapshot.plugs().is_empty());
    }

    #[test]
    fn test_accessors_read_family_entries() {
        let bridge = BridgeState {
            address: Some("10.0.0.9".parse().unwrap()),
            bridge_id: Some("ABCD".into()),
        };
        let plug = PlugEntry {
            setup_location: "http://10.0.0.7:49153/setup.xml".into(),
            address: "10.0.0.7".parse().unwrap(),
            unique_service_name: None,
        };
        let snapshot: DiscoverySnapshot = [
            (DeviceFamily::BridgeLight, FamilyState::Bridge(bridge.clone())),
            (DeviceFamily::UpnpPlug, FamilyState::Plugs(vec![plug.clone()])),
        ]
        .into_iter()
        .collect();

        assert_eq!(snapshot.bridge(), Some(&bridge));
        assert_eq!(snapshot.plugs(), &[plug]);
    }
}
