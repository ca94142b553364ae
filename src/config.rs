//! Manager and discovery configuration.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::controller::{Controllers, ControllerFactory, DeviceFactory};
use crate::errors::Error;
use crate::snapshot::DiscoverySnapshot;
use crate::ssdp::SsdpClient;
use crate::transport::DiscoveryTransport;

/// Settings for the SSDP discovery transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiscoveryConfig {
    /// Where M-SEARCH requests are sent.
    pub multicast_address: String,
    /// Local address the search socket binds to.
    pub bind_address: String,
    /// Maximum response delay requested from devices, in seconds.
    pub mx: u8,
    pub ttl: u32,
    /// How many times each M-SEARCH is sent.
    pub search_repeats: u8,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        DiscoveryConfig {
            multicast_address: "239.255.255.250:1900".to_string(),
            bind_address: "0.0.0.0:0".to_string(),
            mx: 2,
            ttl: 4,
            search_repeats: 2,
        }
    }
}

impl DiscoveryConfig {
    /// Decode a config map; missing keys take their defaults.
    pub fn from_value(value: Value) -> Result<Self, Error> {
        serde_json::from_value(value).map_err(Error::Config)
    }
}

/// Completion callback, invoked once with the discovery snapshot and the handles.
pub type OnReady<H> = Box<dyn FnOnce(&DiscoverySnapshot, &Controllers<H>) + Send>;

/// Creates the discovery transport from the discovery config.
pub type TransportFactory = Box<dyn FnOnce(&DiscoveryConfig) -> Box<dyn DiscoveryTransport> + Send>;

/// Options for [`crate::SmartHomeManager`].
///
/// ```
/// use smarthome_manager::{DiscoveryConfig, ManagerOptions};
///
/// let options = ManagerOptions::new()
///     .auto_discovery(true)
///     .ssdp()
///     .discovery_config(DiscoveryConfig { mx: 3, ..DiscoveryConfig::default() })
///     .on_ready(|_snapshot, controllers| println!("{} controllers ready", controllers.len()));
/// ```
pub struct ManagerOptions<F: ControllerFactory = DeviceFactory> {
    pub(crate) factory: F,
    pub(crate) on_ready: Option<OnReady<F::Handle>>,
    pub(crate) transport_factory: Option<TransportFactory>,
    pub(crate) discovery_config: DiscoveryConfig,
    pub(crate) auto_discovery: bool,
}

impl Default for ManagerOptions<DeviceFactory> {
    fn default() -> Self {
        Self::new()
    }
}

impl ManagerOptions<DeviceFactory> {
    pub fn new() -> Self {
        Self::with_factory(DeviceFactory)
    }
}

impl<F: ControllerFactory> ManagerOptions<F> {
    /// Options building handles with a custom factory.
    pub fn with_factory(factory: F) -> Self {
        ManagerOptions {
            factory,
            on_ready: None,
            transport_factory: None,
            discovery_config: DiscoveryConfig::default(),
            auto_discovery: false,
        }
    }

    pub fn on_ready<C>(mut self, callback: C) -> Self
    where
        C: FnOnce(&DiscoverySnapshot, &Controllers<F::Handle>) + Send + 'static,
    {
        self.on_ready = Some(Box::new(callback));
        self
    }

    pub fn transport_factory<T>(mut self, factory: T) -> Self
    where
        T: FnOnce(&DiscoveryConfig) -> Box<dyn DiscoveryTransport> + Send + 'static,
    {
        self.transport_factory = Some(Box::new(factory));
        self
    }

    /// Discover devices with the built-in [`SsdpClient`].
    pub fn ssdp(self) -> Self {
        self.transport_factory(|config| {
            Box::new(SsdpClient::new(config.clone())) as Box<dyn DiscoveryTransport>
        })
    }

    pub fn discovery_config(mut self, config: DiscoveryConfig) -> Self {
        self.discovery_config = config;
        self
    }

    pub fn auto_discovery(mut self, enabled: bool) -> Self {
        self.auto_discovery = enabled;
        self
    }
}
