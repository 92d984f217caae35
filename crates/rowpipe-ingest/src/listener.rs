//! UDP listener.
//!
//! Reads datagrams into a fixed buffer and hands each one to the router on
//! its own task, so a full lane never stalls the socket loop. Datagrams
//! longer than `MAX_DATAGRAM_SIZE` are dropped and counted as malformed.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use rowpipe_core::MAX_DATAGRAM_SIZE;
use tokio::net::UdpSocket;
use tracing::{info, trace, warn};

use crate::error::{IngestError, Result};
use crate::router::Router;
use crate::stats::IngestStats;

pub struct Listener {
    socket: UdpSocket,
    stats: Arc<IngestStats>,
}

impl Listener {
    /// Bind the receive socket. Failure here is a startup failure.
    pub async fn bind(addr: SocketAddr, stats: Arc<IngestStats>) -> Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| IngestError::Bind { addr, source })?;

        info!(addr = %socket.local_addr()?, "Listening for datagrams");
        Ok(Self { socket, stats })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Receive forever. Receive errors are logged and the loop continues.
    pub async fn run(self, router: Router) {
        // One spare byte tells an oversized datagram from a full-size one.
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE + 1];

        loop {
            let (len, peer) = match self.socket.recv_from(&mut buf).await {
                Ok(received) => received,
                Err(e) => {
                    warn!(error = %e, "Failed to receive datagram");
                    continue;
                }
            };

            self.stats.record_received();
            trace!(peer = %peer, len = len, "Datagram received");

            if len > MAX_DATAGRAM_SIZE {
                self.stats.record_malformed();
                warn!(
                    peer = %peer,
                    max = MAX_DATAGRAM_SIZE,
                    "Dropping oversized datagram"
                );
                continue;
            }

            let data = Bytes::copy_from_slice(&buf[..len]);
            let router = router.clone();
            tokio::spawn(async move {
                // Malformed records are already logged and counted by the router.
                if let Err(IngestError::LaneClosed(lane)) = router.route(data).await {
                    warn!(lane = lane, "Dropping record, lane is closed");
                }
            });
        }
    }
}
