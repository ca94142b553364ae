use crate::family::DeviceFamily;

/// All error types that can occur while coordinating smart-home devices.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A device declaration named a family this crate does not know.
    #[error("wrong device type {family:?}; should be one of {expected}")]
    InvalidConfiguration { family: String, expected: String },

    /// Auto discovery was requested without a usable discovery transport.
    #[error("trying to use auto discovery even though no discovery transport is configured")]
    MisconfiguredDiscovery,

    /// The controller for one family could not be built; the whole run is aborted.
    #[error("failed to construct {family} controller: {source}")]
    ControllerConstructionFailed {
        family: DeviceFamily,
        source: ConstructionError,
    },

    /// The readiness signal was dropped before every requested family became ready.
    #[error("discovery stopped before every requested device family was ready")]
    DiscoveryAborted,

    /// The coordination run already ended without producing controllers.
    #[error("coordination run already terminated")]
    Terminated,

    /// A network socket operation failed inside the discovery transport.
    #[error("socket {action} error: {err:?}")]
    Socket { action: String, err: std::io::Error },

    /// A discovery configuration map could not be decoded.
    #[error("invalid discovery config: {0}")]
    Config(serde_json::Error),
}

impl Error {
    /// Create a new socket error
    pub fn socket(action: &str, err: std::io::Error) -> Self {
        Error::Socket {
            action: action.to_string(),
            err,
        }
    }

    /// Create a new controller construction error
    pub fn construction(family: DeviceFamily, source: ConstructionError) -> Self {
        Error::ControllerConstructionFailed { family, source }
    }

    /// Create a new invalid configuration error for an unknown family name
    pub fn invalid_family(family: &str) -> Self {
        Error::InvalidConfiguration {
            family: family.to_string(),
            expected: DeviceFamily::names().join(", "),
        }
    }
}

/// Failure reported by a [`crate::ControllerFactory`] for a single family.
#[derive(Debug, thiserror::Error)]
pub enum ConstructionError {
    /// A required option was neither declared nor discovered.
    #[error("no {0} provided")]
    MissingOption(&'static str),

    /// An address option could not be parsed.
    #[error("invalid address {0:?}")]
    InvalidAddress(String),

    /// The merged options did not match the family's option shape.
    #[error("invalid options: {0}")]
    InvalidOptions(serde_json::Error),

    /// Any other failure raised by a host-supplied factory.
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

/// Hacky implementation of PartialEq for testing
#[cfg(test)]
impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}
