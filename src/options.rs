//! Strongly typed per-family controller options.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::family::DeviceFamily;

/// Options for a bridge-mediated light controller.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeLightOptions {
    /// Bridge IP address, usually filled in by discovery.
    pub ip: Option<String>,
    /// Whitelisted bridge user, if already paired.
    pub user_name: Option<String>,
}

/// Options for a light controlled directly on the local network.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshLightOptions {
    #[serde(alias = "address")]
    pub ip: Option<String>,
    pub port: Option<u16>,
}

/// Options for a UPnP plug.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpnpPlugOptions {
    /// URL of the device setup document.
    pub setup_url: Option<String>,
    pub ip: Option<String>,
}

/// Options for one family, as handed to a [`crate::ControllerFactory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FamilyOptions {
    BridgeLight(BridgeLightOptions),
    MeshLight(MeshLightOptions),
    UpnpPlug(UpnpPlugOptions),
}

impl FamilyOptions {
    pub fn family(&self) -> DeviceFamily {
        match self {
            FamilyOptions::BridgeLight(_) => DeviceFamily::BridgeLight,
            FamilyOptions::MeshLight(_) => DeviceFamily::MeshLight,
            FamilyOptions::UpnpPlug(_) => DeviceFamily::UpnpPlug,
        }
    }

    /// Decode a merged key/value option map into the family's option shape.
    pub fn from_map(family: DeviceFamily, options: Map<String, Value>) -> serde_json::Result<Self> {
        let value = Value::Object(options);
        Ok(match family {
            DeviceFamily::BridgeLight => FamilyOptions::BridgeLight(serde_json::from_value(value)?),
            DeviceFamily::MeshLight => FamilyOptions::MeshLight(serde_json::from_value(value)?),
            DeviceFamily::UpnpPlug => FamilyOptions::UpnpPlug(serde_json::from_value(value)?),
        })
    }

    /// Encode these options back into a key/value map.
    pub fn to_map(&self) -> Map<String, Value> {
        let value = match self {
            FamilyOptions::BridgeLight(options) => serde_json::to_value(options),
            FamilyOptions::MeshLight(options) => serde_json::to_value(options),
            FamilyOptions::UpnpPlug(options) => serde_json::to_value(options),
        };
        match value {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

impl From<BridgeLightOptions> for FamilyOptions {
    fn from(options: BridgeLightOptions) -> Self {
        FamilyOptions::BridgeLight(options)
    }
}

impl From<MeshLightOptions> for FamilyOptions {
    fn from(options: MeshLightOptions) -> Self {
        FamilyOptions::MeshLight(options)
    }
}

impl From<UpnpPlugOptions> for FamilyOptions {
    fn from(options: UpnpPlugOptions) -> Self {
        FamilyOptions::UpnpPlug(options)
    }
}
