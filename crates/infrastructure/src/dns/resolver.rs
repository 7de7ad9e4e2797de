//! Iterative delegation-following resolution.
//!
//! The engine takes a raw client query and walks the nameserver chain from
//! the configured root, one UDP exchange per hop. Protocol-level failures
//! are data: the raw upstream reply is handed back to the caller unchanged.
//! Only transport faults and the depth guard surface as errors.

use crate::dns::transport::{DnsTransport, UdpTransport};
use delver_dns_domain::config::ResolverConfig;
use delver_dns_domain::message::{Question, RData, TYPE_A, TYPE_NS};
use delver_dns_domain::{wire, DomainError, Message};
use futures::future::{BoxFuture, FutureExt};
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use tracing::{debug, info};

pub struct RecursiveResolver {
    root: Ipv4Addr,
    upstream_port: u16,
    upstream_timeout: Duration,
    max_depth: usize,
}

impl RecursiveResolver {
    pub fn new(config: &ResolverConfig) -> Result<Self, DomainError> {
        let root = config
            .root_server
            .parse::<Ipv4Addr>()
            .map_err(|_| DomainError::InvalidIpAddress(config.root_server.clone()))?;

        info!(
            root = %root,
            upstream_timeout_ms = config.upstream_timeout_ms,
            max_depth = config.max_depth,
            "Recursive resolver created"
        );

        Ok(Self {
            root,
            upstream_port: config.upstream_port,
            upstream_timeout: Duration::from_millis(config.upstream_timeout_ms),
            max_depth: config.max_depth,
        })
    }

    /// Resolves a raw client query, returning the raw bytes of the best
    /// response obtained. Negative and error replies come back as `Ok`;
    /// `Err` means no upstream produced any reply at all.
    pub async fn resolve(&self, raw_query: &[u8]) -> Result<Vec<u8>, DomainError> {
        self.walk(raw_query.to_vec(), self.root, 0).await
    }

    fn walk(
        &self,
        raw_query: Vec<u8>,
        server: Ipv4Addr,
        depth: usize,
    ) -> BoxFuture<'_, Result<Vec<u8>, DomainError>> {
        async move {
            if depth >= self.max_depth {
                return Err(DomainError::DelegationDepthExceeded(self.max_depth));
            }

            let raw_reply = self.exchange(&raw_query, server).await?;
            let reply = wire::decode(&raw_reply)?;

            // Authoritative enough to hand back: a failure rcode, a pure-SOA
            // authority section, or at least one answer.
            if reply.is_error_response() || reply.has_answers() {
                return Ok(raw_reply);
            }

            let glue = match_ns_and_additional(&reply);
            if !glue.is_empty() {
                for (target, addr) in &glue {
                    debug!(ns = %target, addr = %addr, depth, "following glued referral");
                    match self.walk(raw_query.clone(), *addr, depth + 1).await {
                        Ok(sub_raw) => {
                            let sub = wire::decode(&sub_raw)?;
                            if sub.is_error_response() || sub.has_answers() {
                                return Ok(sub_raw);
                            }
                        }
                        Err(e) => {
                            debug!(ns = %target, error = %e, "glued nameserver failed, trying next");
                        }
                    }
                }
                return Ok(raw_reply);
            }

            // Referral without glue: look up each nameserver's own address
            // from the root, then retry the original query against it.
            let original = wire::decode(&raw_query)?;
            for authority in &reply.authorities {
                let RData::Ns(target) = &authority.rdata else {
                    continue;
                };
                debug!(ns = %target, depth, "resolving unglued nameserver address");

                let ns_query = build_ns_address_query(&original, target)?;
                match self.walk(ns_query, self.root, depth + 1).await {
                    Ok(ns_raw) => {
                        let ns_reply = wire::decode(&ns_raw)?;
                        if ns_reply.is_error_response() {
                            return Ok(ns_raw);
                        }
                        if let Some(addr) = first_a_answer(&ns_reply) {
                            return self.walk(raw_query, addr, depth + 1).await;
                        }
                    }
                    Err(e) => {
                        debug!(ns = %target, error = %e, "nameserver address lookup failed");
                    }
                }
            }

            // Best-effort fallback: the referral we could not act on.
            Ok(raw_reply)
        }
        .boxed()
    }

    async fn exchange(&self, raw_query: &[u8], server: Ipv4Addr) -> Result<Vec<u8>, DomainError> {
        let transport = UdpTransport::new(SocketAddr::from((server, self.upstream_port)));
        transport.send(raw_query, self.upstream_timeout).await
    }
}

/// Builds the glue set of a referral: each type-NS authority target paired
/// with the address of the first type-A additional owned by that target, in
/// authority order. Nameservers without a matching additional are excluded.
fn match_ns_and_additional(message: &Message) -> Vec<(String, Ipv4Addr)> {
    let mut matched = Vec::new();
    for authority in &message.authorities {
        if authority.rtype != TYPE_NS {
            continue;
        }
        let RData::Ns(target) = &authority.rdata else {
            continue;
        };
        let glue = message
            .additionals
            .iter()
            .filter(|additional| additional.rtype == TYPE_A && additional.name == *target)
            .find_map(|additional| additional.ipv4_address());
        if let Some(addr) = glue {
            matched.push((target.clone(), addr));
        }
    }
    matched
}

/// Synthesizes an A/IN query for a nameserver hostname, reusing the original
/// query's header but with a single question and no additional records.
fn build_ns_address_query(original: &Message, target: &str) -> Result<Vec<u8>, DomainError> {
    let mut query = original.clone();
    query.header.qd_count = 1;
    query.header.ar_count = 0;
    query.additionals.clear();
    query.questions = vec![Question::a_in(target)];
    wire::encode(&query)
}

fn first_a_answer(message: &Message) -> Option<Ipv4Addr> {
    message
        .answers
        .iter()
        .find_map(|answer| answer.ipv4_address())
}
