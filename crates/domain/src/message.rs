//! In-memory model of a DNS message (RFC 1035 §4).
//!
//! A [`Message`] is built fresh for every wire buffer decoded and never
//! mutated once serialized. Names are held as labels joined by `.`; the root
//! name is the empty string.

use std::net::Ipv4Addr;

pub const TYPE_A: u16 = 1;
pub const TYPE_NS: u16 = 2;
pub const TYPE_SOA: u16 = 6;
pub const CLASS_IN: u16 = 1;

/// QR bit of the header flags word.
pub const FLAG_RESPONSE: u16 = 0x8000;
/// SERVFAIL rcode (RFC 1035 §4.1.1).
pub const RCODE_SERVFAIL: u16 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Header {
    pub id: u16,
    pub flags: u16,
    pub qd_count: u16,
    pub an_count: u16,
    pub ns_count: u16,
    pub ar_count: u16,
}

impl Header {
    /// Response code nibble packed into the low 4 bits of the flags.
    pub fn rcode(&self) -> u8 {
        (self.flags & 0x000F) as u8
    }

    pub fn is_response(&self) -> bool {
        self.flags & FLAG_RESPONSE != 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub name: String,
    pub qtype: u16,
    pub qclass: u16,
}

impl Question {
    pub fn a_in(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            qtype: TYPE_A,
            qclass: CLASS_IN,
        }
    }
}

/// Record payload, selected by the wire type code.
///
/// Only the types resolution actually inspects get their own shape; every
/// other rdata is carried through untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RData {
    /// Type 1: a 4-byte IPv4 address.
    A(Ipv4Addr),
    /// Type 2: the nameserver's (possibly compressed) domain name.
    Ns(String),
    /// Type 6: opaque SOA payload, kept distinct because a lone SOA
    /// authority section signals a negative answer.
    Soa(Vec<u8>),
    /// Anything else, passed through as raw bytes.
    Other(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRecord {
    pub name: String,
    pub rtype: u16,
    pub class: u16,
    pub ttl: u32,
    pub rdata: RData,
}

impl ResourceRecord {
    pub fn ipv4_address(&self) -> Option<Ipv4Addr> {
        match self.rdata {
            RData::A(addr) => Some(addr),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Message {
    pub header: Header,
    pub questions: Vec<Question>,
    pub answers: Vec<ResourceRecord>,
    pub authorities: Vec<ResourceRecord>,
    pub additionals: Vec<ResourceRecord>,
}

impl Message {
    /// Whether this reply is terminal for recursion: either the server
    /// reported a failure rcode, or the authority section consists solely of
    /// SOA records — the shape of an authoritative negative answer even when
    /// the rcode is zero.
    pub fn is_error_response(&self) -> bool {
        if self.header.rcode() != 0 {
            return true;
        }
        !self.authorities.is_empty()
            && self
                .authorities
                .iter()
                .all(|record| record.rtype == TYPE_SOA)
    }

    pub fn has_answers(&self) -> bool {
        !self.answers.is_empty()
    }
}
