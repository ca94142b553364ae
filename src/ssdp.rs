//! SSDP discovery over UDP multicast.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, error, trace, warn};

use crate::config::DiscoveryConfig;
use crate::errors::Error;
use crate::runtime::{self, SearchSocket, Socket, TaskHandle};
use crate::state::lock;
use crate::transport::{DiscoveryResponse, DiscoveryTransport, ResponseHandler};

type Result<T> = std::result::Result<T, Error>;

const RECV_TIMEOUT: Duration = Duration::from_millis(500);
const REPEAT_INTERVAL: Duration = Duration::from_millis(100);

/// Build an `M-SEARCH` request for `target`.
///
/// ```
/// let request = smarthome_manager::ssdp::build_search("239.255.255.250:1900", "ssdp:all", 2);
/// assert!(request.starts_with("M-SEARCH * HTTP/1.1\r\n"));
/// assert!(request.contains("ST: ssdp:all\r\n"));
/// ```
pub fn build_search(host: &str, target: &str, mx: u8) -> String {
    format!(
        "M-SEARCH * HTTP/1.1\r\n\
         HOST: {host}\r\n\
         MAN: \"ssdp:discover\"\r\n\
         MX: {mx}\r\n\
         ST: {target}\r\n\
         \r\n"
    )
}

/// Parse a search response datagram.
///
/// Returns `None` for anything that is not an HTTP status line followed by headers.
pub fn parse_response(buf: &[u8], remote: SocketAddr) -> Option<DiscoveryResponse> {
    let packet = std::str::from_utf8(buf).ok()?;
    let mut lines = packet.lines();

    let mut status = lines.next()?.split_whitespace();
    if !status.next()?.starts_with("HTTP/") {
        return None;
    }
    let status_code = status.next()?.parse().ok()?;

    let mut response = DiscoveryResponse::new(status_code, remote);
    for line in lines {
        if let Some((key, value)) = line.split_once(':') {
            response.insert_header(key, value);
        }
    }
    Some(response)
}

/// A [`DiscoveryTransport`] sending `M-SEARCH` requests on the local network.
///
/// `search` spawns a listener task on the selected runtime, so it must be
/// called from within that runtime.
///
/// ```ignore
/// use smarthome_manager::{DiscoveryConfig, DiscoveryResponse, DiscoveryTransport, SsdpClient};
/// use std::sync::Arc;
///
/// let mut client = SsdpClient::new(DiscoveryConfig::default());
/// client.on_response(Arc::new(|response: &DiscoveryResponse| {
///     println!("{:?}", response.header("LOCATION"));
/// }));
/// client.search("ssdp:all")?;
/// ```
pub struct SsdpClient {
    config: DiscoveryConfig,
    handlers: Arc<Mutex<Vec<ResponseHandler>>>,
    running: Arc<AtomicBool>,
    tasks: Vec<TaskHandle>,
}

impl SsdpClient {
    pub fn new(config: DiscoveryConfig) -> Self {
        SsdpClient {
            config,
            handlers: Arc::new(Mutex::new(Vec::new())),
            running: Arc::new(AtomicBool::new(false)),
            tasks: Vec::new(),
        }
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop every listener task.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.tasks.clear();
    }
}

impl DiscoveryTransport for SsdpClient {
    fn on_response(&mut self, handler: ResponseHandler) {
        lock(&self.handlers).push(handler);
    }

    fn remove_all_listeners(&mut self) {
        lock(&self.handlers).clear();
    }

    fn search(&mut self, target: &str) -> Result<()> {
        let group = self
            .config
            .multicast_address
            .parse::<SocketAddr>()
            .map_err(|e| {
                Error::socket(
                    "resolve multicast address",
                    std::io::Error::new(std::io::ErrorKind::InvalidInput, e),
                )
            })?;

        let request = build_search(&self.config.multicast_address, target, self.config.mx);
        debug!("SSDP search for {target} on {}", self.config.multicast_address);

        self.running.store(true, Ordering::SeqCst);
        let config = self.config.clone();
        let handlers = Arc::clone(&self.handlers);
        let running = Arc::clone(&self.running);

        self.tasks.push(runtime::spawn(async move {
            if let Err(e) = listen(config, group, request, handlers, running).await {
                error!("SSDP search failed: {e}");
            }
        }));
        Ok(())
    }
}

impl Drop for SsdpClient {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn listen(
    config: DiscoveryConfig,
    group: SocketAddr,
    request: String,
    handlers: Arc<Mutex<Vec<ResponseHandler>>>,
    running: Arc<AtomicBool>,
) -> Result<()> {
    let socket = Socket::open(&config.bind_address, config.ttl)
        .await
        .map_err(|e| Error::socket("open", e))?;

    for attempt in 0..config.search_repeats.max(1) {
        if attempt > 0 {
            runtime::sleep(REPEAT_INTERVAL).await;
        }
        socket
            .send_search(request.as_bytes(), group)
            .await
            .map_err(|e| Error::socket("send_to", e))?;
    }

    let mut buffer = [0u8; 2048];
    while running.load(Ordering::SeqCst) {
        match runtime::timeout(RECV_TIMEOUT, socket.recv_response(&mut buffer)).await {
            Some(Ok((size, addr))) => {
                let Some(response) = parse_response(&buffer[..size], addr) else {
                    trace!("Dropping unparseable datagram from {addr}");
                    continue;
                };
                let current = lock(&handlers).clone();
                for handler in &current {
                    handler(&response);
                }
            }
            Some(Err(e)) => warn!("SSDP receive error: {e}"),
            // Timed out; re-check the running flag
            None => continue,
        }
    }
    debug!("SSDP listener stopped");
    Ok(())
}
