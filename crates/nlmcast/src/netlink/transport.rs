//! The boundary between a session and the kernel.
//!
//! [`NetlinkSocket`](super::NetlinkSocket) is the production transport. Tests
//! implement [`Transport`] with a scripted fake kernel so the protocol code
//! can run without `NETLINK_GENERIC` access.

use std::future::Future;

use super::error::Result;

/// A datagram channel to the netlink controller.
///
/// Requests are whole netlink messages; `recv_msg` returns one datagram,
/// which may carry several netlink messages.
pub trait Transport {
    /// Local port ID stamped into outgoing requests.
    fn pid(&self) -> u32;

    /// Allocate the sequence number for the next request.
    fn next_seq(&self) -> u32;

    /// Send one request. Failures map to [`Error::Send`](super::Error::Send).
    fn send(&self, msg: &[u8]) -> impl Future<Output = Result<()>>;

    /// Wait for the next datagram. Failures map to
    /// [`Error::Recv`](super::Error::Recv).
    fn recv_msg(&self) -> impl Future<Output = Result<Vec<u8>>>;
}
