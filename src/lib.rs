//! # smarthome_manager
//!
//! Discovery and readiness coordination for heterogeneous smart-home devices.
//!
//! You declare which device families you want to control (a bridge-mediated
//! light, a directly addressed network light, UPnP plugs), optionally with
//! options such as addresses. The [`SmartHomeManager`] either builds a
//! controller for each family right away, or first searches the local network
//! over SSDP until every family has been found, and then builds the
//! controllers with the discovered addresses filled in.
//!
//! ## Quick Start
//!
//! ```ignore
//! use smarthome_manager::{DeviceDeclaration, ManagerOptions, SmartHomeManager};
//! use serde_json::Map;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let devices = vec![
//!         DeviceDeclaration::new("philipsHue", Map::new()),
//!         DeviceDeclaration::new("wemo", Map::new()),
//!     ];
//!     let options = ManagerOptions::new()
//!         .auto_discovery(true)
//!         .ssdp()
//!         .on_ready(|snapshot, controllers| {
//!             println!("found {} plugs, {} controllers", snapshot.plugs().len(), controllers.len());
//!         });
//!
//!     let manager = SmartHomeManager::new(devices, options)?;
//!     // Resolves once discovery has found the bridge and a plug.
//!     let controllers = manager.ready().await?;
//!     if let Some(hue) = controllers.hue() {
//!         println!("bridge API at {}", hue.endpoint());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Device families
//!
//! | Family | Wire name | Ready when |
//! |---|---|---|
//! | [`DeviceFamily::BridgeLight`] | `philipsHue` | a bridge answered the search |
//! | [`DeviceFamily::MeshLight`] | `magicHome` | always |
//! | [`DeviceFamily::UpnpPlug`] | `wemo` | at least one plug answered |
//!
//! ## Building blocks
//!
//! - [`StateStore`]: observable key/value state with snapshot and per-key listeners
//! - [`DeviceRegistry`]: validated requests and the readiness predicate
//! - [`classify`]: extraction of family data from one [`DiscoveryResponse`]
//! - [`DiscoveryTransport`]: the transport seam, implemented by [`SsdpClient`]
//! - [`ControllerFactory`]: the construction seam, implemented by [`DeviceFactory`]
//!
//! ## Runtime Selection
//!
//! The coordinator is runtime-agnostic. Only the built-in SSDP transport spawns
//! tasks; select its runtime using feature flags:
//!
//! ```toml
//! [dependencies]
//! smarthome-manager = { version = "0.1", default-features = false, features = ["runtime-smol"] }
//! ```
//!
//! ## Feature Flags
//!
//! - `runtime-tokio` (default): Use the tokio async runtime
//! - `runtime-async-std`: Use the async-std runtime
//! - `runtime-smol`: Use the smol runtime

mod config;
mod controller;
mod errors;
mod family;
mod manager;
mod options;
mod registry;
mod request;
mod router;
pub mod runtime;
mod snapshot;
pub mod ssdp;
mod state;
mod transport;

// Re-export public API
pub use config::{DiscoveryConfig, ManagerOptions, OnReady, TransportFactory};
pub use controller::{
    Controller, ControllerFactory, Controllers, DeviceFactory, HueController, HueLightState,
    MeshLightController, PlugController,
};
pub use errors::{ConstructionError, Error};
pub use family::{BRIDGE_ID_HEADER, DeviceFamily, PLUG_SEARCH_TARGET, SEARCH_ALL};
pub use manager::{Phase, SmartHomeManager};
pub use options::{BridgeLightOptions, FamilyOptions, MeshLightOptions, UpnpPlugOptions};
pub use registry::{DeviceRegistry, family_ready, validate};
pub use request::{DeviceDeclaration, DeviceRequest};
pub use router::{Classified, classify};
pub use snapshot::{BridgeState, DiscoverySnapshot, FamilyState, PlugEntry};
pub use ssdp::SsdpClient;
pub use state::{ListenerId, Snapshot, StateStore};
pub use transport::{DiscoveryResponse, DiscoveryTransport, RemoteInfo, ResponseHandler};
