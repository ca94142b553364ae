//! Declarations of the devices a caller wants controllers for.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::Error;
use crate::family::DeviceFamily;
use crate::options::FamilyOptions;

/// An unvalidated device declaration, in the shape callers write in config files.
///
/// ```
/// use smarthome_manager::DeviceDeclaration;
///
/// let declaration: DeviceDeclaration =
///     serde_json::from_str(r#"{"type": "magicHome", "options": {"ip": "10.0.0.5"}}"#).unwrap();
/// assert_eq!(declaration.family, "magicHome");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceDeclaration {
    #[serde(rename = "type", alias = "family")]
    pub family: String,
    #[serde(default)]
    pub options: Map<String, Value>,
}

impl DeviceDeclaration {
    pub fn new(family: &str, options: Map<String, Value>) -> Self {
        DeviceDeclaration {
            family: family.to_string(),
            options,
        }
    }
}

/// A validated request for one device family and its declared options.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRequest {
    family: DeviceFamily,
    options: Map<String, Value>,
}

impl DeviceRequest {
    pub fn new(family: DeviceFamily, options: Map<String, Value>) -> Self {
        DeviceRequest { family, options }
    }

    /// A request for `family` with no declared options.
    pub fn bare(family: DeviceFamily) -> Self {
        DeviceRequest::new(family, Map::new())
    }

    pub fn family(&self) -> DeviceFamily {
        self.family
    }

    pub fn options(&self) -> &Map<String, Value> {
        &self.options
    }
}

impl From<FamilyOptions> for DeviceRequest {
    fn from(options: FamilyOptions) -> Self {
        DeviceRequest::new(options.family(), options.to_map())
    }
}

impl From<DeviceRequest> for DeviceDeclaration {
    fn from(request: DeviceRequest) -> Self {
        DeviceDeclaration {
            family: request.family.name().to_string(),
            options: request.options,
        }
    }
}

impl From<FamilyOptions> for DeviceDeclaration {
    fn from(options: FamilyOptions) -> Self {
        DeviceRequest::from(options).into()
    }
}

impl TryFrom<DeviceDeclaration> for DeviceRequest {
    type Error = Error;

    fn try_from(declaration: DeviceDeclaration) -> Result<Self, Error> {
        let family = DeviceFamily::parse(&declaration.family)?;
        Ok(DeviceRequest::new(family, declaration.options))
    }
}
