pub mod udp;

use async_trait::async_trait;
use delver_dns_domain::DomainError;
use std::time::Duration;

pub use udp::UdpTransport;

/// One request/response exchange with a nameserver.
#[async_trait]
pub trait DnsTransport: Send + Sync {
    async fn send(&self, message_bytes: &[u8], timeout: Duration)
        -> Result<Vec<u8>, DomainError>;
}
