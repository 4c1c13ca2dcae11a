//! Fixed 60-byte record header of the UCB Home-IP trace.
//!
//! `LAYOUT` is the only place offsets and widths are written down. Everything
//! else (decoder, dump, test encoder) goes through `read_field` / `write_field`.

use crate::error::{Result, TraceError};

pub const HEADER_LEN: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Big,
    #[allow(dead_code)]
    Little,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    ClientRequestSec,
    ClientRequestUsec,
    ServerFirstByteSec,
    ServerFirstByteUsec,
    ServerLastByteSec,
    ServerLastByteUsec,
    ClientIp,
    ClientPort,
    ServerIp,
    ServerPort,
    ClientPragma,
    ServerPragma,
    ClientIfModifiedSince,
    ServerExpires,
    ServerLastModified,
    ResponseHeaderLength,
    ResponseBodyLength,
    UrlLen,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub field: Field,
    pub name: &'static str,
    pub offset: usize,
    pub width: usize,
    pub endian: Endian,
}

const fn be(field: Field, name: &'static str, offset: usize, width: usize) -> FieldSpec {
    FieldSpec { field, name, offset, width, endian: Endian::Big }
}

/// Indexed by `Field as usize`.
pub const LAYOUT: [FieldSpec; 18] = [
    be(Field::ClientRequestSec, "client_request_sec", 0, 4),
    be(Field::ClientRequestUsec, "client_request_usec", 4, 4),
    be(Field::ServerFirstByteSec, "server_first_byte_sec", 8, 4),
    be(Field::ServerFirstByteUsec, "server_first_byte_usec", 12, 4),
    be(Field::ServerLastByteSec, "server_last_byte_sec", 16, 4),
    be(Field::ServerLastByteUsec, "server_last_byte_usec", 20, 4),
    be(Field::ClientIp, "client_ip", 24, 4),
    be(Field::ClientPort, "client_port", 28, 2),
    be(Field::ServerIp, "server_ip", 30, 4),
    be(Field::ServerPort, "server_port", 34, 2),
    be(Field::ClientPragma, "client_pragma", 36, 1),
    be(Field::ServerPragma, "server_pragma", 37, 1),
    be(Field::ClientIfModifiedSince, "client_if_modified_since", 38, 4),
    be(Field::ServerExpires, "server_expires", 42, 4),
    be(Field::ServerLastModified, "server_last_modified", 46, 4),
    be(Field::ResponseHeaderLength, "response_header_length", 50, 4),
    be(Field::ResponseBodyLength, "response_body_length", 54, 4),
    be(Field::UrlLen, "url_len", 58, 2),
];

impl Field {
    pub fn spec(self) -> &'static FieldSpec {
        let spec = &LAYOUT[self as usize];
        debug_assert_eq!(spec.field, self);
        spec
    }
}

/// Read one field from a header buffer. Widths up to 4 bytes.
pub fn read_field(buf: &[u8], field: Field) -> Result<u32> {
    let spec = field.spec();
    let bytes = buf
        .get(spec.offset..spec.offset + spec.width)
        .filter(|b| b.len() <= 4)
        .ok_or(TraceError::Field {
            field: spec.name,
            offset: spec.offset,
            width: spec.width,
            len: buf.len(),
        })?;

    let value = match spec.endian {
        Endian::Big => bytes.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b)),
        Endian::Little => bytes.iter().rev().fold(0u32, |acc, &b| (acc << 8) | u32::from(b)),
    };
    Ok(value)
}

/// Inverse of `read_field`; used to build synthetic traces in tests.
#[cfg(test)]
pub fn write_field(buf: &mut [u8], field: Field, value: u32) {
    let spec = field.spec();
    let slot = &mut buf[spec.offset..spec.offset + spec.width];
    for (i, byte) in slot.iter_mut().enumerate() {
        let shift = match spec.endian {
            Endian::Big => 8 * (spec.width - 1 - i),
            Endian::Little => 8 * i,
        };
        *byte = (value >> shift) as u8;
    }
}

/// Every header field, including the ones the page grouping never looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordHeader {
    pub client_request_sec: u32,
    pub client_request_usec: u32,
    pub server_first_byte_sec: u32,
    pub server_first_byte_usec: u32,
    pub server_last_byte_sec: u32,
    pub server_last_byte_usec: u32,
    pub client_ip: u32,
    pub client_port: u16,
    pub server_ip: u32,
    pub server_port: u16,
    pub client_pragma: u8,
    pub server_pragma: u8,
    pub client_if_modified_since: u32,
    pub server_expires: u32,
    pub server_last_modified: u32,
    pub response_header_length: u32,
    pub response_body_length: u32,
    pub url_len: u16,
}

impl RecordHeader {
    pub fn parse(buf: &[u8]) -> Result<Self> {
        let f = |field| read_field(buf, field);
        Ok(RecordHeader {
            client_request_sec: f(Field::ClientRequestSec)?,
            client_request_usec: f(Field::ClientRequestUsec)?,
            server_first_byte_sec: f(Field::ServerFirstByteSec)?,
            server_first_byte_usec: f(Field::ServerFirstByteUsec)?,
            server_last_byte_sec: f(Field::ServerLastByteSec)?,
            server_last_byte_usec: f(Field::ServerLastByteUsec)?,
            client_ip: f(Field::ClientIp)?,
            client_port: f(Field::ClientPort)? as u16,
            server_ip: f(Field::ServerIp)?,
            server_port: f(Field::ServerPort)? as u16,
            client_pragma: f(Field::ClientPragma)? as u8,
            server_pragma: f(Field::ServerPragma)? as u8,
            client_if_modified_since: f(Field::ClientIfModifiedSince)?,
            server_expires: f(Field::ServerExpires)?,
            server_last_modified: f(Field::ServerLastModified)?,
            response_header_length: f(Field::ResponseHeaderLength)?,
            response_body_length: f(Field::ResponseBodyLength)?,
            url_len: f(Field::UrlLen)? as u16,
        })
    }

    #[cfg(test)]
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        let fields = [
            (Field::ClientRequestSec, self.client_request_sec),
            (Field::ClientRequestUsec, self.client_request_usec),
            (Field::ServerFirstByteSec, self.server_first_byte_sec),
            (Field::ServerFirstByteUsec, self.server_first_byte_usec),
            (Field::ServerLastByteSec, self.server_last_byte_sec),
            (Field::ServerLastByteUsec, self.server_last_byte_usec),
            (Field::ClientIp, self.client_ip),
            (Field::ClientPort, u32::from(self.client_port)),
            (Field::ServerIp, self.server_ip),
            (Field::ServerPort, u32::from(self.server_port)),
            (Field::ClientPragma, u32::from(self.client_pragma)),
            (Field::ServerPragma, u32::from(self.server_pragma)),
            (Field::ClientIfModifiedSince, self.client_if_modified_since),
            (Field::ServerExpires, self.server_expires),
            (Field::ServerLastModified, self.server_last_modified),
            (Field::ResponseHeaderLength, self.response_header_length),
            (Field::ResponseBodyLength, self.response_body_length),
            (Field::UrlLen, u32::from(self.url_len)),
        ];
        for (field, value) in fields {
            write_field(&mut buf, field, value);
        }
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_contiguous_and_covers_header() {
        let mut next = 0;
        for (i, spec) in LAYOUT.iter().enumerate() {
            assert_eq!(spec.field as usize, i, "{} out of order", spec.name);
            assert_eq!(spec.offset, next, "gap before {}", spec.name);
            assert_eq!(spec.endian, Endian::Big);
            next = spec.offset + spec.width;
        }
        assert_eq!(next, HEADER_LEN);
    }

    #[test]
    fn reads_big_endian_fields() {
        let mut buf = [0u8; HEADER_LEN];
        buf[24..28].copy_from_slice(&[0x0a, 0x00, 0x00, 0x01]);
        buf[28..30].copy_from_slice(&[0x1f, 0x90]);
        buf[36] = 1;
        buf[58..60].copy_from_slice(&[0x00, 0x0b]);

        assert_eq!(read_field(&buf, Field::ClientIp).unwrap(), 0x0a00_0001);
        assert_eq!(read_field(&buf, Field::ClientPort).unwrap(), 8080);
        assert_eq!(read_field(&buf, Field::ClientPragma).unwrap(), 1);
        assert_eq!(read_field(&buf, Field::UrlLen).unwrap(), 11);
    }

    #[test]
    fn short_buffer_is_a_field_error() {
        let buf = [0u8; 40];
        assert_eq!(read_field(&buf, Field::ServerPort).unwrap(), 0);
        match read_field(&buf, Field::ResponseBodyLength) {
            Err(TraceError::Field { field, offset, width, len }) => {
                assert_eq!(field, "response_body_length");
                assert_eq!((offset, width, len), (54, 4, 40));
            }
            other => panic!("expected field error, got {:?}", other),
        }
        assert!(RecordHeader::parse(&buf).is_err());
    }

    #[test]
    fn parse_reads_every_field() {
        let header = RecordHeader {
            client_request_sec: 846_000_000,
            client_request_usec: 123_456,
            server_first_byte_sec: 846_000_002,
            server_first_byte_usec: 1,
            server_last_byte_sec: 846_000_005,
            server_last_byte_usec: 2,
            client_ip: 0xc0a8_0001,
            client_port: 1025,
            server_ip: 0x8020_0304,
            server_port: 80,
            client_pragma: 1,
            server_pragma: 0,
            client_if_modified_since: 845_000_000,
            server_expires: 847_000_000,
            server_last_modified: 844_000_000,
            response_header_length: 250,
            response_body_length: 4096,
            url_len: 17,
        };
        let parsed = RecordHeader::parse(&header.encode()).unwrap();
        assert_eq!(parsed, header);
    }
}
