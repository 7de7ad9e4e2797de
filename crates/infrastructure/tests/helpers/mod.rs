#![allow(dead_code)]

use delver_dns_domain::config::ResolverConfig;
use delver_dns_domain::message::{
    Header, Message, Question, RData, ResourceRecord, CLASS_IN, FLAG_RESPONSE, TYPE_A, TYPE_NS,
    TYPE_SOA,
};
use delver_dns_domain::wire;
use std::net::{Ipv4Addr, SocketAddr};
use tokio::net::UdpSocket;

/// Spawns a scripted nameserver on a loopback ephemeral port. The handler
/// sees every decoded query and decides what (if anything) to send back.
pub async fn spawn_mock_nameserver<F>(mut handler: F) -> SocketAddr
where
    F: FnMut(&Message) -> Option<Message> + Send + 'static,
{
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();

    tokio::spawn(async move {
        let mut buf = vec![0u8; 4096];
        loop {
            let Ok((len, peer)) = socket.recv_from(&mut buf).await else {
                break;
            };
            let Ok(query) = wire::decode(&buf[..len]) else {
                continue;
            };
            if let Some(reply) = handler(&query) {
                let bytes = wire::encode(&reply).unwrap();
                let _ = socket.send_to(&bytes, peer).await;
            }
        }
    });

    addr
}

/// Resolver configuration pointed at a mock root.
pub fn resolver_config(root: SocketAddr, max_depth: usize) -> ResolverConfig {
    ResolverConfig {
        root_server: root.ip().to_string(),
        upstream_port: root.port(),
        upstream_timeout_ms: 500,
        max_depth,
    }
}

pub fn a_query(id: u16, name: &str) -> Message {
    Message {
        header: Header {
            id,
            flags: 0x0100,
            qd_count: 1,
            ..Header::default()
        },
        questions: vec![Question::a_in(name)],
        ..Message::default()
    }
}

fn reply_skeleton(query: &Message) -> Message {
    Message {
        header: Header {
            id: query.header.id,
            flags: FLAG_RESPONSE,
            qd_count: query.questions.len() as u16,
            ..Header::default()
        },
        questions: query.questions.clone(),
        ..Message::default()
    }
}

pub fn answer_reply(query: &Message, addr: Ipv4Addr) -> Message {
    let mut reply = reply_skeleton(query);
    reply.answers.push(ResourceRecord {
        name: query.questions[0].name.clone(),
        rtype: TYPE_A,
        class: CLASS_IN,
        ttl: 300,
        rdata: RData::A(addr),
    });
    reply.header.an_count = 1;
    reply
}

/// Referral: NS authority records, plus a glue A additional for each target
/// that supplies one.
pub fn referral_reply(query: &Message, zone: &str, ns: &[(&str, Option<Ipv4Addr>)]) -> Message {
    let mut reply = reply_skeleton(query);
    for (target, glue) in ns {
        reply.authorities.push(ResourceRecord {
            name: zone.to_string(),
            rtype: TYPE_NS,
            class: CLASS_IN,
            ttl: 172800,
            rdata: RData::Ns(target.to_string()),
        });
        if let Some(addr) = glue {
            reply.additionals.push(ResourceRecord {
                name: target.to_string(),
                rtype: TYPE_A,
                class: CLASS_IN,
                ttl: 172800,
                rdata: RData::A(*addr),
            });
        }
    }
    reply.header.ns_count = reply.authorities.len() as u16;
    reply.header.ar_count = reply.additionals.len() as u16;
    reply
}

/// Authoritative negative answer: rcode 0, lone SOA in the authority section.
pub fn soa_negative_reply(query: &Message) -> Message {
    let mut reply = reply_skeleton(query);
    reply.authorities.push(ResourceRecord {
        name: query.questions[0].name.clone(),
        rtype: TYPE_SOA,
        class: CLASS_IN,
        ttl: 900,
        rdata: RData::Soa(vec![0x00]),
    });
    reply.header.ns_count = 1;
    reply
}

pub fn rcode_reply(query: &Message, rcode: u16) -> Message {
    let mut reply = reply_skeleton(query);
    reply.header.flags |= rcode & 0x000F;
    reply
}
