//! UDP listener and worker dispatch.
//!
//! The accept loop only ever blocks on receiving datagrams; each query is
//! resolved on its own task under a semaphore bound. A fixed dispatch
//! timeout caps one client query across its whole recursive chain; hitting
//! it drops the in-flight resolution future and answers SERVFAIL with the
//! client's transaction id and question intact. Exactly one response (or
//! none, for an undecodable query) goes back per datagram.

use crate::dns::resolver::RecursiveResolver;
use delver_dns_domain::config::ServerConfig;
use delver_dns_domain::message::{FLAG_RESPONSE, RCODE_SERVFAIL};
use delver_dns_domain::{wire, DomainError};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Largest datagram accepted from a client.
const MAX_UDP_QUERY_SIZE: usize = 4096;

pub struct DnsServer {
    socket: Arc<UdpSocket>,
    resolver: Arc<RecursiveResolver>,
    query_timeout: Duration,
    workers: Arc<Semaphore>,
}

impl DnsServer {
    pub async fn bind(
        config: &ServerConfig,
        resolver: Arc<RecursiveResolver>,
    ) -> Result<Self, DomainError> {
        let addr = format!("{}:{}", config.bind_address, config.port);
        let socket = UdpSocket::bind(&addr)
            .await
            .map_err(|e| DomainError::IoError(format!("failed to bind {}: {}", addr, e)))?;

        info!(addr = %addr, "DNS server listening");

        Ok(Self {
            socket: Arc::new(socket),
            resolver,
            query_timeout: Duration::from_millis(config.query_timeout_ms),
            workers: Arc::new(Semaphore::new(config.max_concurrent_queries)),
        })
    }

    /// Address the listener actually bound to (port 0 resolves here).
    pub fn local_addr(&self) -> Result<SocketAddr, DomainError> {
        self.socket
            .local_addr()
            .map_err(|e| DomainError::IoError(e.to_string()))
    }

    pub async fn run(&self, shutdown: CancellationToken) -> Result<(), DomainError> {
        let mut buf = vec![0u8; MAX_UDP_QUERY_SIZE];

        loop {
            let (len, peer) = tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("shutdown requested, stopping accept loop");
                    return Ok(());
                }
                received = self.socket.recv_from(&mut buf) => {
                    received.map_err(|e| DomainError::IoError(format!("recv_from failed: {}", e)))?
                }
            };

            let query = buf[..len].to_vec();
            let Ok(permit) = self.workers.clone().acquire_owned().await else {
                // Semaphore is never closed while the loop runs.
                continue;
            };

            let socket = self.socket.clone();
            let resolver = self.resolver.clone();
            let query_timeout = self.query_timeout;
            tokio::spawn(async move {
                let _permit = permit;
                handle_query(socket, resolver, query, peer, query_timeout).await;
            });
        }
    }
}

async fn handle_query(
    socket: Arc<UdpSocket>,
    resolver: Arc<RecursiveResolver>,
    query: Vec<u8>,
    peer: SocketAddr,
    query_timeout: Duration,
) {
    let reply = match tokio::time::timeout(query_timeout, resolver.resolve(&query)).await {
        Ok(Ok(bytes)) => {
            debug!(peer = %peer, bytes = bytes.len(), "resolution complete");
            bytes
        }
        Ok(Err(e)) => {
            warn!(peer = %peer, error = %e, "resolution failed, answering SERVFAIL");
            match synthesize_failure(&query) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(peer = %peer, error = %e, "dropping undecodable query");
                    return;
                }
            }
        }
        Err(_) => {
            warn!(
                peer = %peer,
                timeout_ms = query_timeout.as_millis() as u64,
                "resolution timed out, answering SERVFAIL"
            );
            match synthesize_failure(&query) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(peer = %peer, error = %e, "dropping undecodable query");
                    return;
                }
            }
        }
    };

    if let Err(e) = socket.send_to(&reply, peer).await {
        warn!(peer = %peer, error = %e, "failed to send response");
    }
}

/// Turns the client's own query into a SERVFAIL response: QR and rcode bits
/// set, additional records stripped, id and question untouched.
fn synthesize_failure(raw_query: &[u8]) -> Result<Vec<u8>, DomainError> {
    let mut message = wire::decode(raw_query)?;
    message.header.flags |= FLAG_RESPONSE | RCODE_SERVFAIL;
    message.header.ar_count = 0;
    message.additionals.clear();
    wire::encode(&message)
}
