//! Supported device families.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::errors::Error;

/// Search target answered by UPnP smart plugs.
pub const PLUG_SEARCH_TARGET: &str = "urn:Belkin:service:basicevent:1";

/// Search target matching every SSDP device.
pub const SEARCH_ALL: &str = "ssdp:all";

/// Response header carried only by lighting bridges.
pub const BRIDGE_ID_HEADER: &str = "HUE-BRIDGEID";

/// A category of controllable hardware sharing one discovery and control protocol.
///
/// Families are parsed from their wire names, which are the names used in
/// device declarations:
///
/// ```
/// use std::str::FromStr;
/// use smarthome_manager::DeviceFamily;
///
/// assert_eq!(DeviceFamily::from_str("philipsHue").unwrap(), DeviceFamily::BridgeLight);
/// assert_eq!(DeviceFamily::from_str("meshLight").unwrap(), DeviceFamily::MeshLight);
/// assert_eq!(DeviceFamily::UpnpPlug.to_string(), "wemo");
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
)]
pub enum DeviceFamily {
    /// Lights reached through a bridge found by its SSDP bridge id header.
    #[serde(rename = "philipsHue", alias = "bridgeLight")]
    #[strum(to_string = "philipsHue", serialize = "bridgeLight")]
    BridgeLight,
    /// Lights addressed directly on the local network; no discovery needed.
    #[serde(rename = "magicHome", alias = "meshLight")]
    #[strum(to_string = "magicHome", serialize = "meshLight")]
    MeshLight,
    /// UPnP plugs and lights located by their setup document URL.
    #[serde(rename = "wemo", alias = "upnpPlug")]
    #[strum(to_string = "wemo", serialize = "upnpPlug")]
    UpnpPlug,
}

impl DeviceFamily {
    /// Parses a wire name, failing with [`Error::InvalidConfiguration`].
    pub fn parse(name: &str) -> Result<Self, Error> {
        DeviceFamily::from_str(name).map_err(|_| Error::invalid_family(name))
    }

    /// The wire name of this family.
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Wire names of every known family.
    pub fn names() -> Vec<&'static str> {
        DeviceFamily::iter().map(DeviceFamily::name).collect()
    }

    /// The SSDP search target scoped to this family, if it has one.
    pub fn search_target(self) -> Option<&'static str> {
        match self {
            DeviceFamily::UpnpPlug => Some(PLUG_SEARCH_TARGET),
            DeviceFamily::BridgeLight | DeviceFamily::MeshLight => None,
        }
    }

    /// Whether controllers of this family can only be built after discovery.
    pub fn needs_discovery(self) -> bool {
        !matches!(self, DeviceFamily::MeshLight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wire_names() {
        assert_eq!(DeviceFamily::parse("philipsHue").unwrap(), DeviceFamily::BridgeLight);
        assert_eq!(DeviceFamily::parse("magicHome").unwrap(), DeviceFamily::MeshLight);
        assert_eq!(DeviceFamily::parse("wemo").unwrap(), DeviceFamily::UpnpPlug);
        assert_eq!(DeviceFamily::parse("upnpPlug").unwrap(), DeviceFamily::UpnpPlug);
    }

    #[test]
    fn test_parse_unknown_family() {
        let err = DeviceFamily::parse("doesNotExist").unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration { ref family, .. } if family == "doesNotExist"));
        assert!(err.to_string().contains("philipsHue, magicHome, wemo"));
    }

    #[test]
    fn test_serde_uses_wire_names() {
        let json = serde_json::to_string(&DeviceFamily::MeshLight).unwrap();
        assert_eq!(json, "\"magicHome\"");
        let family: DeviceFamily = serde_json::from_str("\"bridgeLight\"").unwrap();
        assert_eq!(family, DeviceFamily::BridgeLight);
    }

    #[test]
    fn test_search_target() {
        assert_eq!(DeviceFamily::UpnpPlug.search_target(), Some(PLUG_SEARCH_TARGET));
        assert_eq!(DeviceFamily::BridgeLight.search_target(), None);
        assert!(!DeviceFamily::MeshLight.needs_discovery());
    }
}
