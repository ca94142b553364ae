//! async-std backend.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use async_std::net::UdpSocket;
use async_std::task::{self, JoinHandle};

use super::SearchSocket;

pub struct Socket(UdpSocket);

impl SearchSocket for Socket {
    async fn open(addr: &str, multicast_ttl: u32) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        socket.set_multicast_ttl_v4(multicast_ttl)?;
        Ok(Socket(socket))
    }

    async fn send_search(&self, request: &[u8], target: SocketAddr) -> io::Result<usize> {
        self.0.send_to(request, target).await
    }

    async fn recv_response(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        self.0.recv_from(buf).await
    }
}

/// A background task, cancelled when dropped.
pub struct TaskHandle(Option<JoinHandle<()>>);

impl Drop for TaskHandle {
    fn drop(&mut self) {
        // async-std only cancels asynchronously.
        if let Some(handle) = self.0.take() {
            task::spawn(async move {
                handle.cancel().await;
            });
        }
    }
}

pub fn spawn<F>(future: F) -> TaskHandle
where
    F: Future<Output = ()> + Send + 'static,
{
    TaskHandle(Some(task::spawn(future)))
}

pub async fn sleep(duration: Duration) {
    task::sleep(duration).await;
}

/// Run `future`, or return `None` once `duration` has elapsed.
pub async fn timeout<F: Future>(duration: Duration, future: F) -> Option<F::Output> {
    async_std::future::timeout(duration, future).await.ok()
}
