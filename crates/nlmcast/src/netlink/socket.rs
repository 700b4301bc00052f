//! Low-level async netlink socket operations.

use std::sync::atomic::{AtomicU32, Ordering};

use bytes::BytesMut;
use netlink_sys::{Socket, SocketAddr, protocols};
use tokio::io::Interest;
use tokio::io::unix::AsyncFd;

use super::error::{Error, Result};
use super::transport::Transport;

/// Receive buffer size. Large enough for a full controller dump datagram.
const RECV_BUF_SIZE: usize = 32768;

/// Async `NETLINK_GENERIC` socket.
///
/// The file descriptor is closed when the socket is dropped.
pub struct NetlinkSocket {
    /// The underlying async file descriptor.
    fd: AsyncFd<Socket>,
    /// Sequence number counter.
    seq: AtomicU32,
    /// Local port ID (assigned by kernel).
    pid: u32,
}

impl NetlinkSocket {
    /// Create, bind and register a generic netlink socket.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new() -> Result<Self> {
        let mut socket = Socket::new(protocols::NETLINK_GENERIC).map_err(Error::Connection)?;
        socket.set_non_blocking(true).map_err(Error::Connection)?;

        // Bind to get a port ID
        let mut addr = SocketAddr::new(0, 0);
        socket.bind(&addr).map_err(Error::Connection)?;
        socket.get_address(&mut addr).map_err(Error::Connection)?;
        let pid = addr.port_number();

        let fd = AsyncFd::new(socket).map_err(Error::Connection)?;

        tracing::debug!(pid, "opened generic netlink socket");

        Ok(Self {
            fd,
            seq: AtomicU32::new(1),
            pid,
        })
    }

    /// Get the next sequence number.
    pub fn next_seq(&self) -> u32 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    /// Get the local port ID.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Send a message.
    pub async fn send(&self, msg: &[u8]) -> Result<()> {
        loop {
            let mut guard = self
                .fd
                .ready(Interest::WRITABLE)
                .await
                .map_err(Error::Send)?;

            match guard.try_io(|inner| inner.get_ref().send(msg, 0)) {
                Ok(result) => {
                    result.map_err(Error::Send)?;
                    return Ok(());
                }
                Err(_would_block) => continue,
            }
        }
    }

    /// Receive one datagram, allocating a buffer.
    pub async fn recv_msg(&self) -> Result<Vec<u8>> {
        // recv fills the spare capacity and advances the length
        let mut buf = BytesMut::with_capacity(RECV_BUF_SIZE);

        loop {
            let mut guard = self
                .fd
                .ready(Interest::READABLE)
                .await
                .map_err(Error::Recv)?;

            match guard.try_io(|inner| inner.get_ref().recv(&mut buf, 0)) {
                Ok(result) => {
                    result.map_err(Error::Recv)?;
                    return Ok(buf.to_vec());
                }
                Err(_would_block) => continue,
            }
        }
    }
}

impl Transport for NetlinkSocket {
    fn pid(&self) -> u32 {
        NetlinkSocket::pid(self)
    }

    fn next_seq(&self) -> u32 {
        NetlinkSocket::next_seq(self)
    }

    async fn send(&self, msg: &[u8]) -> Result<()> {
        NetlinkSocket::send(self, msg).await
    }

    async fn recv_msg(&self) -> Result<Vec<u8>> {
        NetlinkSocket::recv_msg(self).await
    }
}

impl Drop for NetlinkSocket {
    fn drop(&mut self) {
        tracing::debug!(pid = self.pid, "closing generic netlink socket");
    }
}
