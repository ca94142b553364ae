//! Routing of discovery responses into the discovery state.

use std::sync::{Arc, Mutex};

use log::{debug, trace};

use crate::family::{BRIDGE_ID_HEADER, DeviceFamily, PLUG_SEARCH_TARGET};
use crate::registry::DeviceRegistry;
use crate::snapshot::{BridgeState, DiscoveryStore, FamilyState, PlugEntry};
use crate::transport::DiscoveryResponse;

/// Family-specific fields extracted from one response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classified {
    pub bridge: Option<BridgeState>,
    pub plug: Option<PlugEntry>,
}

impl Classified {
    pub fn is_empty(&self) -> bool {
        self.bridge.is_none() && self.plug.is_none()
    }
}

/// Extract bridge and plug information from a raw response.
///
/// Unrecognized responses yield an empty result.
pub fn classify(response: &DiscoveryResponse) -> Classified {
    let bridge = response.header(BRIDGE_ID_HEADER).map(|bridge_id| BridgeState {
        address: Some(response.remote.address),
        bridge_id: Some(bridge_id.to_string()),
    });

    let plug = match (response.header("ST"), response.header("LOCATION")) {
        (Some(PLUG_SEARCH_TARGET), Some(location)) => Some(PlugEntry {
            setup_location: location.to_string(),
            address: response.remote.address,
            unique_service_name: response.header("USN").map(String::from),
        }),
        _ => None,
    };

    Classified { bridge, plug }
}

#[derive(Debug, Default)]
struct Seen {
    bridge: Option<BridgeState>,
    plugs: Vec<PlugEntry>,
}

/// Feeds classified responses into the discovery store, one at a time.
pub(crate) struct DiscoveryRouter {
    registry: Arc<DeviceRegistry>,
    store: Arc<DiscoveryStore>,
    seen: Mutex<Seen>,
}

impl DiscoveryRouter {
    pub(crate) fn new(registry: Arc<DeviceRegistry>, store: Arc<DiscoveryStore>) -> Self {
        DiscoveryRouter {
            registry,
            store,
            seen: Mutex::new(Seen::default()),
        }
    }

    /// Merge one response and publish the requested families' state.
    ///
    /// The lock is held while listeners run so that responses are applied and
    /// observed in delivery order.
    pub(crate) fn route(&self, response: &DiscoveryResponse) {
        let classified = classify(response);
        let mut seen = crate::state::lock(&self.seen);

        if classified.is_empty() {
            trace!("unrecognized discovery response from {}", response.remote.address);
        }
        if let Some(bridge) = classified.bridge {
            debug!("bridge {:?} found at {:?}", bridge.bridge_id, bridge.address);
            seen.bridge = Some(bridge);
        }
        if let Some(plug) = classified.plug {
            if seen
                .plugs
                .iter()
                .any(|known| known.setup_location == plug.setup_location)
            {
                trace!("ignoring duplicate plug at {}", plug.setup_location);
            } else {
                debug!("plug found at {}", plug.setup_location);
                seen.plugs.push(plug);
            }
        }

        let mut partial = Vec::new();
        if self.registry.has(DeviceFamily::BridgeLight)
            && let Some(bridge) = &seen.bridge
        {
            partial.push((DeviceFamily::BridgeLight, FamilyState::Bridge(bridge.clone())));
        }
        if self.registry.has(DeviceFamily::UpnpPlug) && !seen.plugs.is_empty() {
            partial.push((DeviceFamily::UpnpPlug, FamilyState::Plugs(seen.plugs.clone())));
        }
        self.store.change_state(partial);
    }
}
