//! Async runtime backends.
//!
//! The coordinator only needs the async [`Mutex`]. [`crate::SsdpClient`] also
//! spawns its listener with [`spawn`] and talks through a [`SearchSocket`].
//!
//! Exactly one backend feature must be enabled: `runtime-tokio` (default),
//! `runtime-async-std` or `runtime-smol`.
//!
//! ```toml
//! [dependencies]
//! smarthome-manager = { version = "0.1", default-features = false, features = ["runtime-async-std"] }
//! ```

use std::future::Future;
use std::io;
use std::net::SocketAddr;

#[cfg(feature = "runtime-tokio")]
mod tokio_impl;
#[cfg(feature = "runtime-tokio")]
pub use tokio::sync::Mutex;
#[cfg(feature = "runtime-tokio")]
pub use tokio_impl::{Socket, TaskHandle, sleep, spawn, timeout};

#[cfg(feature = "runtime-async-std")]
mod async_std_impl;
#[cfg(feature = "runtime-async-std")]
pub use async_std::sync::Mutex;
#[cfg(feature = "runtime-async-std")]
pub use async_std_impl::{Socket, TaskHandle, sleep, spawn, timeout};

#[cfg(feature = "runtime-smol")]
mod smol_impl;
#[cfg(feature = "runtime-smol")]
pub use async_lock::Mutex;
#[cfg(feature = "runtime-smol")]
pub use smol_impl::{Socket, TaskHandle, sleep, spawn, timeout};

/// A UDP socket that multicasts search requests and receives unicast answers.
pub trait SearchSocket: Send + Sync + Sized {
    /// Bind to `addr`, with `multicast_ttl` applied to outgoing multicast packets.
    fn open(addr: &str, multicast_ttl: u32) -> impl Future<Output = io::Result<Self>> + Send;

    fn send_search(
        &self,
        request: &[u8],
        target: SocketAddr,
    ) -> impl Future<Output = io::Result<usize>> + Send;

    /// Receive one datagram and its sender.
    fn recv_response(
        &self,
        buf: &mut [u8],
    ) -> impl Future<Output = io::Result<(usize, SocketAddr)>> + Send;
}

#[cfg(not(any(
    feature = "runtime-tokio",
    feature = "runtime-async-std",
    feature = "runtime-smol"
)))]
compile_error!("enable one runtime feature: runtime-tokio, runtime-async-std or runtime-smol");

#[cfg(any(
    all(feature = "runtime-tokio", feature = "runtime-async-std"),
    all(feature = "runtime-tokio", feature = "runtime-smol"),
    all(feature = "runtime-async-std", feature = "runtime-smol")
))]
compile_error!("runtime features are mutually exclusive; enable only one");
