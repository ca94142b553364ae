//! The discovery transport contract.

use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use crate::errors::Error;

/// Where a discovery response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteInfo {
    pub address: IpAddr,
    pub port: u16,
}

impl From<SocketAddr> for RemoteInfo {
    fn from(addr: SocketAddr) -> Self {
        RemoteInfo {
            address: addr.ip(),
            port: addr.port(),
        }
    }
}

/// One discovery response: status code, headers and sender.
///
/// Header names are case-insensitive.
///
/// ```
/// use smarthome_manager::DiscoveryResponse;
///
/// let response = DiscoveryResponse::new(200, "10.0.0.9:1900".parse().unwrap())
///     .with_header("hue-bridgeid", "ABCD");
/// assert_eq!(response.header("HUE-BRIDGEID"), Some("ABCD"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryResponse {
    pub status_code: u16,
    pub remote: RemoteInfo,
    headers: BTreeMap<String, String>,
}

impl DiscoveryResponse {
    pub fn new(status_code: u16, remote: SocketAddr) -> Self {
        DiscoveryResponse {
            status_code,
            remote: remote.into(),
            headers: BTreeMap::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.insert_header(name, value);
        self
    }

    pub fn insert_header(&mut self, name: &str, value: &str) {
        self.headers
            .insert(name.trim().to_ascii_uppercase(), value.trim().to_string());
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_uppercase())
            .map(String::as_str)
    }

    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Callback registered for discovery responses.
pub type ResponseHandler = Arc<dyn Fn(&DiscoveryResponse) + Send + Sync>;

/// A source of asynchronous discovery responses.
///
/// Handlers may be invoked from any thread, in the order the transport
/// received the responses.
pub trait DiscoveryTransport: Send {
    /// Register a handler for every response.
    fn on_response(&mut self, handler: ResponseHandler);

    /// Drop every registered response handler.
    fn remove_all_listeners(&mut self);

    /// Start searching for `target`. Responses arrive through the handlers.
    fn search(&mut self, target: &str) -> Result<(), Error>;
}

impl<T: DiscoveryTransport + ?Sized> DiscoveryTransport for Box<T> {
    fn on_response(&mut self, handler: ResponseHandler) {
        (**self).on_response(handler)
    }

    fn remove_all_listeners(&mut self) {
        (**self).remove_all_listeners()
    }

    fn search(&mut self, target: &str) -> Result<(), Error> {
        (**self).search(target)
    }
}
