//! Wire-format codec for DNS messages (RFC 1035 §4.1).
//!
//! `decode` accepts compressed names from upstream servers; `encode` always
//! writes names out in full. Both thread the buffer and cursor explicitly
//! and return an immutable [`Message`] or a fresh byte vector.

use crate::errors::DomainError;
use crate::message::{Header, Message, Question, RData, ResourceRecord, TYPE_A, TYPE_NS, TYPE_SOA};
use std::net::Ipv4Addr;

const HEADER_LEN: usize = 12;
const MAX_LABEL_LEN: usize = 63;
/// Upper bound on capacity reserved up front from header counts.
const MAX_PREALLOC: usize = 64;
/// Top two bits of a length byte marking a 14-bit compression pointer.
const POINTER_MASK: u8 = 0xC0;

/// Parses a raw DNS message.
///
/// The header is read from the first 12 bytes, then `qd_count` questions
/// starting at offset 12, then `an + ns + ar` resource records immediately
/// following; the combined record run is split into sections by the header
/// counts. Every element starts exactly where the previous one ended.
pub fn decode(buf: &[u8]) -> Result<Message, DomainError> {
    let header = Header {
        id: read_u16(buf, 0)?,
        flags: read_u16(buf, 2)?,
        qd_count: read_u16(buf, 4)?,
        an_count: read_u16(buf, 6)?,
        ns_count: read_u16(buf, 8)?,
        ar_count: read_u16(buf, 10)?,
    };

    // Header counts are attacker-controlled; cap the pre-allocation and let
    // the vectors grow if a message genuinely carries that many elements.
    let mut pos = HEADER_LEN;
    let mut questions = Vec::with_capacity((header.qd_count as usize).min(MAX_PREALLOC));
    for _ in 0..header.qd_count {
        let (question, next) = decode_question(buf, pos)?;
        questions.push(question);
        pos = next;
    }

    let record_count =
        header.an_count as usize + header.ns_count as usize + header.ar_count as usize;
    let mut records = Vec::with_capacity(record_count.min(MAX_PREALLOC));
    for _ in 0..record_count {
        let (record, next) = decode_record(buf, pos)?;
        records.push(record);
        pos = next;
    }

    let mut answers = records;
    let mut authorities = answers.split_off(header.an_count as usize);
    let additionals = authorities.split_off(header.ns_count as usize);

    Ok(Message {
        header,
        questions,
        answers,
        authorities,
        additionals,
    })
}

/// Serializes a message into wire format.
///
/// Section counts are recomputed from the actual section lengths, so the
/// header count invariant holds by construction. Names are never compressed
/// on encode; output is byte-exact and deterministic for a given message.
pub fn encode(message: &Message) -> Result<Vec<u8>, DomainError> {
    let mut out = Vec::with_capacity(512);

    out.extend_from_slice(&message.header.id.to_be_bytes());
    out.extend_from_slice(&message.header.flags.to_be_bytes());
    out.extend_from_slice(&(message.questions.len() as u16).to_be_bytes());
    out.extend_from_slice(&(message.answers.len() as u16).to_be_bytes());
    out.extend_from_slice(&(message.authorities.len() as u16).to_be_bytes());
    out.extend_from_slice(&(message.additionals.len() as u16).to_be_bytes());

    for question in &message.questions {
        write_name(&mut out, &question.name)?;
        out.extend_from_slice(&question.qtype.to_be_bytes());
        out.extend_from_slice(&question.qclass.to_be_bytes());
    }

    for record in message
        .answers
        .iter()
        .chain(&message.authorities)
        .chain(&message.additionals)
    {
        write_record(&mut out, record)?;
    }

    Ok(out)
}

fn decode_question(buf: &[u8], start: usize) -> Result<(Question, usize), DomainError> {
    let (name, pos) = read_name(buf, start)?;
    let qtype = read_u16(buf, pos)?;
    let qclass = read_u16(buf, pos + 2)?;
    Ok((
        Question {
            name,
            qtype,
            qclass,
        },
        pos + 4,
    ))
}

fn decode_record(buf: &[u8], start: usize) -> Result<(ResourceRecord, usize), DomainError> {
    let (name, pos) = read_name(buf, start)?;
    let rtype = read_u16(buf, pos)?;
    let class = read_u16(buf, pos + 2)?;
    let ttl = read_u32(buf, pos + 4)?;
    let rd_len = read_u16(buf, pos + 8)? as usize;

    let rdata_start = pos + 10;
    let raw = buf
        .get(rdata_start..rdata_start + rd_len)
        .ok_or(DomainError::TruncatedMessage {
            offset: rdata_start,
            needed: rd_len,
        })?;

    let rdata = match rtype {
        TYPE_A if rd_len == 4 => RData::A(Ipv4Addr::new(raw[0], raw[1], raw[2], raw[3])),
        // NS rdata is itself a possibly-compressed name; decode it in place.
        // The record still spans the full rdlength in the original stream.
        TYPE_NS => {
            let (target, _) = read_name(buf, rdata_start)?;
            RData::Ns(target)
        }
        TYPE_SOA => RData::Soa(raw.to_vec()),
        _ => RData::Other(raw.to_vec()),
    };

    Ok((
        ResourceRecord {
            name,
            rtype,
            class,
            ttl,
            rdata,
        },
        rdata_start + rd_len,
    ))
}

/// Reads a (possibly compressed) domain name starting at `start`.
///
/// Returns the assembled name and the first offset in the original stream
/// not consumed by it. Once the first pointer is followed, the end offset is
/// pinned to the byte after that 2-byte pointer even though label reading
/// continues elsewhere. Pointers must target a strictly earlier offset than
/// the current read position, and the total number of hops is bounded by the
/// message length; both guards reject crafted packets that would otherwise
/// loop forever.
fn read_name(buf: &[u8], start: usize) -> Result<(String, usize), DomainError> {
    let mut labels: Vec<String> = Vec::new();
    let mut pos = start;
    let mut end: Option<usize> = None;
    let mut hops = 0usize;

    loop {
        let len_byte = *buf.get(pos).ok_or(DomainError::TruncatedMessage {
            offset: pos,
            needed: 1,
        })?;

        if len_byte == 0 {
            return Ok((labels.join("."), end.unwrap_or(pos + 1)));
        }

        match len_byte & POINTER_MASK {
            POINTER_MASK => {
                let second = *buf.get(pos + 1).ok_or(DomainError::TruncatedMessage {
                    offset: pos + 1,
                    needed: 1,
                })?;
                let target = usize::from(len_byte & 0x3F) << 8 | usize::from(second);
                if target >= pos {
                    return Err(DomainError::InvalidCompressionPointer { at: pos, target });
                }
                hops += 1;
                if hops > buf.len() {
                    return Err(DomainError::CompressionBudgetExhausted);
                }
                if end.is_none() {
                    end = Some(pos + 2);
                }
                pos = target;
            }
            0 => {
                let len = usize::from(len_byte);
                let label = buf
                    .get(pos + 1..pos + 1 + len)
                    .ok_or(DomainError::TruncatedMessage {
                        offset: pos + 1,
                        needed: len,
                    })?;
                labels.push(String::from_utf8_lossy(label).into_owned());
                pos += len + 1;
            }
            // 0x40 and 0x80 are reserved label types (RFC 1035 §4.1.4).
            _ => {
                return Err(DomainError::InvalidLabel(format!(
                    "reserved label type {:#04x} at offset {}",
                    len_byte, pos
                )))
            }
        }
    }
}

/// Writes a name as length-prefixed labels with a zero terminator.
fn write_name(out: &mut Vec<u8>, name: &str) -> Result<(), DomainError> {
    for label in name.split('.').filter(|label| !label.is_empty()) {
        if label.len() > MAX_LABEL_LEN {
            return Err(DomainError::InvalidLabel(format!(
                "label '{}' exceeds {} bytes",
                label, MAX_LABEL_LEN
            )));
        }
        out.push(label.len() as u8);
        out.extend_from_slice(label.as_bytes());
    }
    out.push(0);
    Ok(())
}

fn write_record(out: &mut Vec<u8>, record: &ResourceRecord) -> Result<(), DomainError> {
    write_name(out, &record.name)?;
    out.extend_from_slice(&record.rtype.to_be_bytes());
    out.extend_from_slice(&record.class.to_be_bytes());
    out.extend_from_slice(&record.ttl.to_be_bytes());

    let rdata = match &record.rdata {
        RData::A(addr) => addr.octets().to_vec(),
        RData::Ns(target) => {
            let mut encoded = Vec::new();
            write_name(&mut encoded, target)?;
            encoded
        }
        RData::Soa(raw) | RData::Other(raw) => raw.clone(),
    };
    out.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
    out.extend_from_slice(&rdata);
    Ok(())
}

fn read_u16(buf: &[u8], pos: usize) -> Result<u16, DomainError> {
    let bytes = buf.get(pos..pos + 2).ok_or(DomainError::TruncatedMessage {
        offset: pos,
        needed: 2,
    })?;
    Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
}

fn read_u32(buf: &[u8], pos: usize) -> Result<u32, DomainError> {
    let bytes = buf.get(pos..pos + 4).ok_or(DomainError::TruncatedMessage {
        offset: pos,
        needed: 4,
    })?;
    Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}
