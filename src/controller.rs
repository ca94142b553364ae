//! Per-family controllers and the factory contract that builds them.

use std::future::Future;
use std::net::{IpAddr, SocketAddr};

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::errors::ConstructionError;
use crate::family::DeviceFamily;
use crate::options::{BridgeLightOptions, FamilyOptions, MeshLightOptions, UpnpPlugOptions};

type Result<T> = std::result::Result<T, ConstructionError>;

/// Builds a control handle for one family from its final options.
///
/// Construction may perform network I/O. A factory whose future completes on
/// its first poll is built synchronously by the coordinator; anything else is
/// finished by [`crate::SmartHomeManager::ready`].
pub trait ControllerFactory: Send + Sync + 'static {
    type Handle: Send + Sync + 'static;

    fn construct(&self, options: FamilyOptions) -> impl Future<Output = Result<Self::Handle>> + Send;
}

/// Light state accepted by a bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HueLightState {
    pub on: bool,
    pub sat: u8,
    pub bri: u8,
    pub hue: u16,
}

/// Handle for lights behind a lighting bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HueController {
    endpoint: String,
    user_name: Option<String>,
}

impl HueController {
    pub fn new(options: &BridgeLightOptions) -> Result<Self> {
        let ip = parse_ip(options.ip.as_deref(), "bridge ip")?;
        Ok(HueController {
            endpoint: format!("http://{ip}/api"),
            user_name: options.user_name.clone(),
        })
    }

    /// Base URL of the bridge API.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn user_name(&self) -> Option<&str> {
        self.user_name.as_deref()
    }

    /// Record the user name returned by a successful pairing.
    pub fn set_user_name(&mut self, user_name: &str) {
        self.user_name = Some(user_name.to_string());
    }

    /// Body of the pairing request posted to [`HueController::endpoint`].
    pub fn pairing_request(&self, device_type: &str) -> Value {
        json!({ "devicetype": device_type })
    }

    /// URL for setting one light's state; needs a paired user.
    pub fn light_state_url(&self, light_id: u32) -> Option<String> {
        self.user_name
            .as_ref()
            .map(|user| format!("{}/{user}/lights/{light_id}/state", self.endpoint))
    }

    pub fn light_state_body(&self, state: &HueLightState) -> Value {
        json!(state)
    }
}

/// Handle for a light addressed directly on the local network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshLightController {
    addr: SocketAddr,
}

impl MeshLightController {
    pub const DEFAULT_PORT: u16 = 5577;

    pub fn new(options: &MeshLightOptions) -> Result<Self> {
        let ip = parse_ip(options.ip.as_deref(), "light ip")?;
        Ok(MeshLightController {
            addr: SocketAddr::new(ip, options.port.unwrap_or(Self::DEFAULT_PORT)),
        })
    }

    pub fn ip(&self) -> IpAddr {
        self.addr.ip()
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

/// Handle for a UPnP plug, located by its setup document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlugController {
    setup_url: String,
    ip: Option<IpAddr>,
}

impl PlugController {
    pub fn new(options: &UpnpPlugOptions) -> Result<Self> {
        let setup_url = options
            .setup_url
            .clone()
            .ok_or(ConstructionError::MissingOption("setup url"))?;
        let ip = match options.ip.as_deref() {
            Some(ip) => Some(parse_ip(Some(ip), "plug ip")?),
            None => None,
        };
        Ok(PlugController { setup_url, ip })
    }

    pub fn setup_url(&self) -> &str {
        &self.setup_url
    }

    pub fn ip(&self) -> Option<IpAddr> {
        self.ip
    }
}

fn parse_ip(ip: Option<&str>, what: &'static str) -> Result<IpAddr> {
    let ip = ip.ok_or(ConstructionError::MissingOption(what))?;
    ip.parse()
        .map_err(|_| ConstructionError::InvalidAddress(ip.to_string()))
}

/// A control handle built by [`DeviceFactory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Controller {
    BridgeLight(HueController),
    MeshLight(MeshLightController),
    UpnpPlug(PlugController),
}

impl Controller {
    pub fn family(&self) -> DeviceFamily {
        match self {
            Controller::BridgeLight(_) => DeviceFamily::BridgeLight,
            Controller::MeshLight(_) => DeviceFamily::MeshLight,
            Controller::UpnpPlug(_) => DeviceFamily::UpnpPlug,
        }
    }
}

/// The built-in factory producing [`Controller`] handles.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeviceFactory;

impl ControllerFactory for DeviceFactory {
    type Handle = Controller;

    async fn construct(&self, options: FamilyOptions) -> Result<Controller> {
        Ok(match &options {
            FamilyOptions::BridgeLight(options) => Controller::BridgeLight(HueController::new(options)?),
            FamilyOptions::MeshLight(options) => Controller::MeshLight(MeshLightController::new(options)?),
            FamilyOptions::UpnpPlug(options) => Controller::UpnpPlug(PlugController::new(options)?),
        })
    }
}

/// Handles for every requested family, in requested order.
#[derive(Debug, Clone)]
pub struct Controllers<H> {
    handles: Vec<(DeviceFamily, H)>,
}

impl<H> Default for Controllers<H> {
    fn default() -> Self {
        Controllers { handles: Vec::new() }
    }
}

impl<H> Controllers<H> {
    pub(crate) fn push(&mut self, family: DeviceFamily, handle: H) {
        self.handles.push((family, handle));
    }

    pub fn get(&self, family: DeviceFamily) -> Option<&H> {
        self.handles
            .iter()
            .find(|(f, _)| *f == family)
            .map(|(_, handle)| handle)
    }

    pub fn families(&self) -> impl Iterator<Item = DeviceFamily> + '_ {
        self.handles.iter().map(|(family, _)| *family)
    }

    pub fn iter(&self) -> impl Iterator<Item = (DeviceFamily, &H)> {
        self.handles.iter().map(|(family, handle)| (*family, handle))
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

impl Controllers<Controller> {
    pub fn hue(&self) -> Option<&HueController> {
        match self.get(DeviceFamily::BridgeLight) {
            Some(Controller::BridgeLight(controller)) => Some(controller),
            _ => None,
        }
    }

    pub fn mesh_light(&self) -> Option<&MeshLightController> {
        match self.get(DeviceFamily::MeshLight) {
            Some(Controller::MeshLight(controller)) => Some(controller),
            _ => None,
        }
    }

    pub fn plug(&self) -> Option<&PlugController> {
        match self.get(DeviceFamily::UpnpPlug) {
            Some(Controller::UpnpPlug(controller)) => Some(controller),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    fn mesh(ip: Option<&str>) -> FamilyOptions {
        FamilyOptions::MeshLight(MeshLightOptions {
            ip: ip.map(String::from),
            port: None,
        })
    }

    #[test]
    fn test_factory_builds_mesh_light() {
        let controller = block_on(DeviceFactory.construct(mesh(Some("10.0.0.5")))).unwrap();
        assert_eq!(controller.family(), DeviceFamily::MeshLight);
        let Controller::MeshLight(light) = controller else {
            panic!("expected a mesh light");
        };
        assert_eq!(light.addr(), "10.0.0.5:5577".parse().unwrap());
    }

    #[test]
    fn test_factory_reports_missing_ip() {
        let err = block_on(DeviceFactory.construct(mesh(None))).unwrap_err();
        assert!(matches!(err, ConstructionError::MissingOption("light ip")));
    }

    #[test]
    fn test_factory_reports_invalid_ip() {
        let err = block_on(DeviceFactory.construct(mesh(Some("not-an-ip")))).unwrap_err();
        assert!(matches!(err, ConstructionError::InvalidAddress(ref ip) if ip == "not-an-ip"));
    }

    #[test]
    fn test_hue_urls() {
        let mut hue = HueController::new(&BridgeLightOptions {
            ip: Some("10.0.0.9".into()),
            user_name: None,
        })
        .unwrap();
        assert_eq!(hue.endpoint(), "http://10.0.0.9/api");
        assert_eq!(hue.light_state_url(1), None);
        assert_eq!(hue.pairing_request("smarthome#cli"), json!({"devicetype": "smarthome#cli"}));

        hue.set_user_name("abc");
        assert_eq!(
            hue.light_state_url(3).as_deref(),
            Some("http://10.0.0.9/api/abc/lights/3/state")
        );
        let body = hue.light_state_body(&HueLightState {
            on: true,
            sat: 254,
            bri: 200,
            hue: 10000,
        });
        assert_eq!(body, json!({"on": true, "sat": 254, "bri": 200, "hue": 10000}));
    }

    #[test]
    fn test_plug_requires_setup_url() {
        let err = PlugController::new(&UpnpPlugOptions::default()).unwrap_err();
        assert!(matches!(err, ConstructionError::MissingOption("setup url")));

        let plug = PlugController::new(&UpnpPlugOptions {
            setup_url: Some("http://10.0.0.7:49153/setup.xml".into()),
            ip: Some("10.0.0.7".into()),
        })
        .unwrap();
        assert_eq!(plug.ip(), Some("10.0.0.7".parse().unwrap()));
    }

    #[test]
    fn test_controllers_lookup() {
        let mut controllers = Controllers::default();
        let light = MeshLightController::new(&MeshLightOptions {
            ip: Some("10.0.0.5".into()),
            port: Some(6000),
        })
        .unwrap();
        controllers.push(DeviceFamily::MeshLight, Controller::MeshLight(light));

        assert_eq!(controllers.len(), 1);
        assert_eq!(controllers.mesh_light(), Some(&light));
        assert!(controllers.hue().is_none());
        assert_eq!(controllers.families().collect::<Vec<_>>(), vec![DeviceFamily::MeshLight]);
    }
}
