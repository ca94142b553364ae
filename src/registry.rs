//! Requested device families and their readiness.

use serde_json::{Map, Value};

use crate::errors::{ConstructionError, Error};
use crate::family::DeviceFamily;
use crate::options::FamilyOptions;
use crate::request::{DeviceDeclaration, DeviceRequest};
use crate::snapshot::DiscoverySnapshot;

type Result<T> = std::result::Result<T, Error>;

/// Check that every declaration names a known family.
pub fn validate(declarations: &[DeviceDeclaration]) -> Result<()> {
    declarations
        .iter()
        .try_for_each(|declaration| DeviceFamily::parse(&declaration.family).map(|_| ()))
}

/// Whether enough is known about `family` to build its controller.
pub fn family_ready(family: DeviceFamily, snapshot: &DiscoverySnapshot) -> bool {
    match family {
        DeviceFamily::BridgeLight => snapshot
            .bridge()
            .is_some_and(|bridge| bridge.address.is_some()),
        DeviceFamily::UpnpPlug => !snapshot.plugs().is_empty(),
        DeviceFamily::MeshLight => true,
    }
}

/// The fixed list of requests for one coordination run.
#[derive(Debug, Clone)]
pub struct DeviceRegistry {
    requests: Vec<DeviceRequest>,
    families: Vec<DeviceFamily>,
}

impl DeviceRegistry {
    /// Validate and register declarations. Nothing is kept if any is invalid.
    pub fn new(declarations: Vec<DeviceDeclaration>) -> Result<Self> {
        validate(&declarations)?;
        let requests = declarations
            .into_iter()
            .map(DeviceRequest::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_requests(requests))
    }

    pub fn from_requests(requests: Vec<DeviceRequest>) -> Self {
        let mut families = Vec::new();
        for request in &requests {
            if !families.contains(&request.family()) {
                families.push(request.family());
            }
        }
        DeviceRegistry { requests, families }
    }

    pub fn requests(&self) -> &[DeviceRequest] {
        &self.requests
    }

    /// Distinct requested families, in first-requested order.
    pub fn requested_families(&self) -> &[DeviceFamily] {
        &self.families
    }

    pub fn has(&self, family: DeviceFamily) -> bool {
        self.families.contains(&family)
    }

    /// True when every requested family is ready. Vacuously true with no requests.
    pub fn is_ready(&self, snapshot: &DiscoverySnapshot) -> bool {
        self.families
            .iter()
            .all(|family| family_ready(*family, snapshot))
    }

    /// The search target for this run: scoped to plugs when they are requested.
    pub fn search_target(&self) -> &'static str {
        self.families
            .iter()
            .find_map(|family| family.search_target())
            .unwrap_or(crate::family::SEARCH_ALL)
    }

    /// All declared options of `family` merged in request order.
    pub fn merged_options(&self, family: DeviceFamily) -> Map<String, Value> {
        let mut merged = Map::new();
        for request in self.requests.iter().filter(|r| r.family() == family) {
            merged.extend(request.options().clone());
        }
        merged
    }

    /// Options for every requested family, overridden by discovered fields when given.
    pub fn derive_options(&self, discovered: Option<&DiscoverySnapshot>) -> Result<Vec<FamilyOptions>> {
        self.families
            .iter()
            .map(|&family| {
                let mut options = self.merged_options(family);
                if let Some(snapshot) = discovered.filter(|_| family.needs_discovery()) {
                    apply_discovered(family, snapshot, &mut options);
                }
                FamilyOptions::from_map(family, options)
                    .map_err(|e| Error::construction(family, ConstructionError::InvalidOptions(e)))
            })
            .collect()
    }
}

fn apply_discovered(family: DeviceFamily, snapshot: &DiscoverySnapshot, options: &mut Map<String, Value>) {
    match family {
        DeviceFamily::BridgeLight => {
            if let Some(address) = snapshot.bridge().and_then(|bridge| bridge.address) {
                options.insert("ip".into(), Value::String(address.to_string()));
            }
        }
        DeviceFamily::UpnpPlug => {
            if let Some(plug) = snapshot.plugs().first() {
                options.insert("setupUrl".into(), Value::String(plug.setup_location.clone()));
                options.insert("ip".into(), Value::String(plug.address.to_string()));
            }
        }
        DeviceFamily::MeshLight => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::PLUG_SEARCH_TARGET;
    use crate::options::{BridgeLightOptions, MeshLightOptions, UpnpPlugOptions};
    use crate::snapshot::{BridgeState, FamilyState, PlugEntry};
    use serde_json::json;

    fn declaration(family: &str, options: Value) -> DeviceDeclaration {
        DeviceDeclaration::new(family, options.as_object().cloned().unwrap_or_default())
    }

    fn bridge_at(address: &str) -> (DeviceFamily, FamilyState) {
        (
            DeviceFamily::BridgeLight,
            FamilyState::Bridge(BridgeState {
                address: Some(address.parse().unwrap()),
                bridge_id: Some("ABCD".into()),
            }),
        )
    }

    fn plug_at(location: &str) -> (DeviceFamily, FamilyState) {
        (
            DeviceFamily::UpnpPlug,
            FamilyState::Plugs(vec![PlugEntry {
                setup_location: location.into(),
                address: "10.0.0.7".parse().unwrap(),
                unique_service_name: None,
            }]),
        )
    }

    #[test]
    fn test_validate_known_families() {
        let declarations = vec![
            declaration("philipsHue", json!({})),
            declaration("wemo", json!({})),
            declaration("magicHome", json!({"ip": "10.0.0.5"})),
        ];
        assert!(validate(&declarations).is_ok());
        assert!(validate(&[]).is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_family() {
        let declarations = vec![declaration("wemo", json!({})), declaration("doesNotExist", json!({}))];
        let err = validate(&declarations).unwrap_err();
        assert_eq!(err, Error::invalid_family("doesNotExist"));
        assert!(DeviceRegistry::new(declarations).is_err());
    }

    #[test]
    fn test_requested_families_are_distinct_and_ordered() {
        let registry = DeviceRegistry::new(vec![
            declaration("wemo", json!({})),
            declaration("philipsHue", json!({})),
            declaration("wemo", json!({})),
        ])
        .unwrap();
        assert_eq!(
            registry.requested_families(),
            &[DeviceFamily::UpnpPlug, DeviceFamily::BridgeLight]
        );
        assert_eq!(registry.requests().len(), 3);
    }

    #[test]
    fn test_empty_registry_is_ready() {
        let registry = DeviceRegistry::from_requests(Vec::new());
        assert!(registry.is_ready(&DiscoverySnapshot::default()));
    }

    #[test]
    fn test_family_predicates() {
        let empty = DiscoverySnapshot::default();
        assert!(family_ready(DeviceFamily::MeshLight, &empty));
        assert!(!family_ready(DeviceFamily::BridgeLight, &empty));
        assert!(!family_ready(DeviceFamily::UpnpPlug, &empty));

        let unaddressed: DiscoverySnapshot = [(
            DeviceFamily::BridgeLight,
            FamilyState::Bridge(BridgeState {
                address: None,
                bridge_id: Some("ABCD".into()),
            }),
        )]
        .into_iter()
        .collect();
        assert!(!family_ready(DeviceFamily::BridgeLight, &unaddressed));

        let known: DiscoverySnapshot = [bridge_at("10.0.0.9"), plug_at("http://10.0.0.7/setup.xml")]
            .into_iter()
            .collect();
        assert!(family_ready(DeviceFamily::BridgeLight, &known));
        assert!(family_ready(DeviceFamily::UpnpPlug, &known));
    }

    #[test]
    fn test_is_ready_requires_every_family() {
        let registry = DeviceRegistry::from_requests(vec![
            DeviceRequest::bare(DeviceFamily::BridgeLight),
            DeviceRequest::bare(DeviceFamily::UpnpPlug),
            DeviceRequest::bare(DeviceFamily::MeshLight),
        ]);
        let bridge_only: DiscoverySnapshot = [bridge_at("10.0.0.9")].into_iter().collect();
        assert!(!registry.is_ready(&bridge_only));

        let both: DiscoverySnapshot = [bridge_at("10.0.0.9"), plug_at("http://10.0.0.7/setup.xml")]
            .into_iter()
            .collect();
        assert!(registry.is_ready(&both));
    }

    #[test]
    fn test_search_target() {
        let plugs = DeviceRegistry::from_requests(vec![
            DeviceRequest::bare(DeviceFamily::BridgeLight),
            DeviceRequest::bare(DeviceFamily::UpnpPlug),
        ]);
        assert_eq!(plugs.search_target(), PLUG_SEARCH_TARGET);

        let bridge = DeviceRegistry::from_requests(vec![DeviceRequest::bare(DeviceFamily::BridgeLight)]);
        assert_eq!(bridge.search_target(), "ssdp:all");
    }

    #[test]
    fn test_merged_options_later_keys_win() {
        let registry = DeviceRegistry::new(vec![
            declaration("philipsHue", json!({"userName": "first", "ip": "10.0.0.2"})),
            declaration("magicHome", json!({"ip": "10.0.0.5"})),
            declaration("philipsHue", json!({"userName": "second"})),
        ])
        .unwrap();
        assert_eq!(
            Value::Object(registry.merged_options(DeviceFamily::BridgeLight)),
            json!({"userName": "second", "ip": "10.0.0.2"})
        );
    }

    #[test]
    fn test_derive_options_without_discovery() {
        let registry =
            DeviceRegistry::new(vec![declaration("magicHome", json!({"address": "10.0.0.5"}))]).unwrap();
        let options = registry.derive_options(None).unwrap();
        assert_eq!(
            options,
            vec![FamilyOptions::MeshLight(MeshLightOptions {
                ip: Some("10.0.0.5".into()),
                port: None,
            })]
        );
    }

    #[test]
    fn test_derive_options_overrides_from_discovery() {
        let registry = DeviceRegistry::new(vec![
            declaration("philipsHue", json!({"userName": "hue-user", "ip": "192.168.1.2"})),
            declaration("wemo", json!({})),
        ])
        .unwrap();
        let snapshot: DiscoverySnapshot = [bridge_at("10.0.0.9"), plug_at("http://10.0.0.7:49153/setup.xml")]
            .into_iter()
            .collect();

        let options = registry.derive_options(Some(&snapshot)).unwrap();
        assert_eq!(
            options,
            vec![
                FamilyOptions::BridgeLight(BridgeLightOptions {
                    ip: Some("10.0.0.9".into()),
                    user_name: Some("hue-user".into()),
                }),
                FamilyOptions::UpnpPlug(UpnpPlugOptions {
                    setup_url: Some("http://10.0.0.7:49153/setup.xml".into()),
                    ip: Some("10.0.0.7".into()),
                }),
            ]
        );
    }

    #[test]
    fn test_derive_options_keeps_static_family_declared() {
        let registry =
            DeviceRegistry::new(vec![declaration("magicHome", json!({"ip": "10.0.0.5"}))]).unwrap();
        let snapshot: DiscoverySnapshot = [bridge_at("10.0.0.9"), plug_at("http://10.0.0.7:49153/setup.xml")]
            .into_iter()
            .collect();

        let options = registry.derive_options(Some(&snapshot)).unwrap();
        assert_eq!(
            options,
            vec![FamilyOptions::MeshLight(MeshLightOptions {
                ip: Some("10.0.0.5".into()),
                port: None,
            })]
        );
    }

    #[test]
    fn test_derive_options_reports_bad_shape() {
        let registry =
            DeviceRegistry::new(vec![declaration("magicHome", json!({"port": "not a port"}))]).unwrap();
        let err = registry.derive_options(None).unwrap_err();
        assert!(matches!(
            err,
            Error::ControllerConstructionFailed {
                family: DeviceFamily::MeshLight,
                source: ConstructionError::InvalidOptions(_),
            }
        ));
    }
}
