//! smol backend, on top of async-io.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use async_io::{Async, Timer};
use futures::future::{self, Either};

use super::SearchSocket;

pub struct Socket(Async<std::net::UdpSocket>);

impl SearchSocket for Socket {
    async fn open(addr: &str, multicast_ttl: u32) -> io::Result<Self> {
        let socket = std::net::UdpSocket::bind(addr)?;
        socket.set_multicast_ttl_v4(multicast_ttl)?;
        Ok(Socket(Async::new(socket)?))
    }

    async fn send_search(&self, request: &[u8], target: SocketAddr) -> io::Result<usize> {
        self.0.send_to(request, target).await
    }

    async fn recv_response(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        self.0.recv_from(buf).await
    }
}

/// A background task, cancelled when dropped.
pub struct TaskHandle {
    _task: smol::Task<()>,
}

pub fn spawn<F>(future: F) -> TaskHandle
where
    F: Future<Output = ()> + Send + 'static,
{
    TaskHandle {
        _task: smol::spawn(future),
    }
}

pub async fn sleep(duration: Duration) {
    Timer::after(duration).await;
}

/// Run `future`, or return `None` once `duration` has elapsed.
pub async fn timeout<F: Future>(duration: Duration, future: F) -> Option<F::Output> {
    let timer = Timer::after(duration);
    futures::pin_mut!(future);
    match future::select(future, timer).await {
        Either::Left((output, _)) => Some(output),
        Either::Right(_) => None,
    }
}
