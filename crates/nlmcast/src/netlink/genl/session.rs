//! Generic Netlink session with controller resolution.

use std::time::Duration;

use super::header::{GENL_HDRLEN, GenlMsgHdr};
use super::{CtrlAttr, CtrlCmd, GENL_CTRL_VERSION, GENL_ID_CTRL};
use crate::netlink::attr::{AttrTable, get};
use crate::netlink::builder::MessageBuilder;
use crate::netlink::error::{Error, Result};
use crate::netlink::message::{MessageIter, NLM_F_ACK, NLM_F_REQUEST, NlMsgError, NlMsgHdr};
use crate::netlink::socket::NetlinkSocket;
use crate::netlink::transport::Transport;

/// Default time to wait for each reply datagram.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// A decoded generic netlink data message, borrowed from the receive buffer.
#[derive(Debug, Clone, Copy)]
pub struct GenlMessage<'a> {
    /// Netlink header.
    pub header: &'a NlMsgHdr,
    /// Generic netlink header.
    pub genl: GenlMsgHdr,
    /// Attribute bytes following the generic netlink header.
    pub attrs: &'a [u8],
}

/// A session with the generic netlink controller.
///
/// Owns one transport for its whole lifetime and runs one request at a
/// time: every [`request`](Self::request) is expected to be followed by a
/// [`receive`](Self::receive) for the same sequence number before the next
/// request goes out. The socket is released when the session is dropped.
///
/// # Example
///
/// ```rust,no_run
/// use nlmcast::netlink::genl::GenlSession;
///
/// # async fn example() -> nlmcast::Result<()> {
/// let mut session = GenlSession::open()?;
/// let ctrl = session.resolve_controller("nlctrl").await?;
/// println!("nlctrl family ID: {:#x}", ctrl);
/// # Ok(())
/// # }
/// ```
pub struct GenlSession<T = NetlinkSocket> {
    transport: T,
    controller_id: u16,
    timeout: Option<Duration>,
}

impl GenlSession<NetlinkSocket> {
    /// Open a session on a new generic netlink socket.
    pub fn open() -> Result<Self> {
        Ok(Self::with_transport(NetlinkSocket::new()?))
    }
}

impl<T: Transport> GenlSession<T> {
    /// Create a session over an existing transport.
    ///
    /// Requests are addressed to the well-known controller ID until
    /// [`resolve_controller`](Self::resolve_controller) is called.
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport,
            controller_id: GENL_ID_CTRL,
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }

    /// Set the per-reply timeout. `None` waits forever.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    /// Builder-style variant of [`set_timeout`](Self::set_timeout).
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Family ID that controller requests are addressed to.
    pub fn controller_id(&self) -> u16 {
        self.controller_id
    }

    /// Get the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Resolve the controller family and address later requests to it.
    ///
    /// The controller is registered at [`GENL_ID_CTRL`] on every kernel,
    /// but asking for it by name confirms generic netlink is usable.
    pub async fn resolve_controller(&mut self, name: &str) -> Result<u16> {
        let id = self.family_id(name).await?;
        tracing::debug!(name, id, "resolved generic netlink controller");
        self.controller_id = id;
        Ok(id)
    }

    /// Look up the numeric ID of a family by name.
    pub async fn family_id(&self, name: &str) -> Result<u16> {
        let seq = self
            .request(
                self.controller_id,
                CtrlCmd::GetFamily as u8,
                NLM_F_REQUEST | NLM_F_ACK,
                |b| b.append_attr_str(CtrlAttr::FamilyName as u16, name),
            )
            .await?;

        let mut id = None;
        let operation = format!("resolving family {}", name);
        let result = self
            .receive(seq, &operation, |msg| {
                let attrs = AttrTable::parse(msg.attrs, CtrlAttr::MAX);
                if let Some(payload) = attrs.get(CtrlAttr::FamilyId as u16) {
                    let value = get::uint_ne(payload)?;
                    id = Some(u16::try_from(value).map_err(|_| {
                        Error::InvalidAttribute(format!("family ID {} out of range", value))
                    })?);
                }
                Ok(())
            })
            .await;

        match result {
            Err(e) if e.is_not_found() => Err(Error::FamilyNotFound {
                name: name.to_string(),
            }),
            Err(e) => Err(e.with_context(operation)),
            Ok(()) => id.ok_or_else(|| Error::FamilyNotFound {
                name: name.to_string(),
            }),
        }
    }

    /// Build and send a request. Returns its sequence number.
    ///
    /// The generic netlink header carries `cmd`; `build_attrs` appends the
    /// attributes after it.
    pub async fn request(
        &self,
        family_id: u16,
        cmd: u8,
        flags: u16,
        build_attrs: impl FnOnce(&mut MessageBuilder),
    ) -> Result<u32> {
        let mut builder = MessageBuilder::new(family_id, flags);
        builder.append(&GenlMsgHdr::new(cmd, GENL_CTRL_VERSION));
        build_attrs(&mut builder);

        let seq = self.transport.next_seq();
        builder.set_seq(seq);
        builder.set_pid(self.transport.pid());

        let msg = builder.finish();
        tracing::trace!(family_id, cmd, flags, seq, len = msg.len(), "sending request");
        self.transport.send(&msg).await?;

        Ok(seq)
    }

    /// Receive the replies to request `seq`, calling `handler` once per
    /// data message.
    ///
    /// Returns when the kernel sends `NLMSG_DONE` or an ACK. A negative
    /// error frame is returned as [`Error::Kernel`]. Messages carrying a
    /// different sequence number are ignored. `operation` names the request
    /// in timeout errors.
    pub async fn receive<F>(&self, seq: u32, operation: &str, mut handler: F) -> Result<()>
    where
        F: FnMut(GenlMessage<'_>) -> Result<()>,
    {
        loop {
            let data = self.recv_datagram(operation).await?;

            for result in MessageIter::new(&data) {
                let (header, payload) = result?;

                if header.nlmsg_seq != seq {
                    tracing::trace!(
                        expected = seq,
                        actual = header.nlmsg_seq,
                        "skipping message with foreign sequence number"
                    );
                    continue;
                }

                if header.is_error() {
                    let err = NlMsgError::from_bytes(payload)?;
                    if err.is_ack() {
                        return Ok(());
                    }
                    return Err(Error::from_errno(err.error));
                }

                if header.is_done() {
                    // A dump that failed part-way reports the errno here
                    if let Ok(errno) = get::i32_ne(payload)
                        && errno < 0
                    {
                        return Err(Error::from_errno(errno));
                    }
                    return Ok(());
                }

                if header.is_noop() {
                    continue;
                }

                if header.is_overrun() {
                    return Err(Error::InvalidMessage(
                        "receive buffer overrun, reply lost".into(),
                    ));
                }

                let genl = GenlMsgHdr::from_bytes(payload)?;
                handler(GenlMessage {
                    header,
                    genl,
                    attrs: &payload[GENL_HDRLEN..],
                })?;
            }
        }
    }

    /// Release the session and its socket.
    pub fn close(self) {
        tracing::debug!(controller_id = self.controller_id, "closing session");
    }

    async fn recv_datagram(&self, operation: &str) -> Result<Vec<u8>> {
        let Some(limit) = self.timeout else {
            return self.transport.recv_msg().await;
        };

        tokio::time::timeout(limit, self.transport.recv_msg())
            .await
            .map_err(|_| Error::Timeout {
                operation: operation.to_string(),
                elapsed: limit,
            })?
    }
}
