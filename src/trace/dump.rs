//! Human-readable, one-line-per-record listing of a raw trace.

use std::io::{Read, Write};
use std::net::Ipv4Addr;

use chrono::DateTime;

use super::decoder::{Decoder, StopReason};
use super::layout::RecordHeader;
use super::request::Request;
use crate::classify;
use crate::error::Result;

pub struct DumpSummary {
    pub records: usize,
    pub stop: Option<StopReason>,
}

/// `secs` (+ `usec`) as a UTC timestamp; `-` for the zero "not present" value.
fn timestamp(secs: u32, usec: u32) -> String {
    if secs == 0 {
        return "-".to_string();
    }
    match DateTime::from_timestamp(i64::from(secs), usec.min(999_999) * 1000) {
        Some(t) if usec > 0 => t.format("%Y-%m-%d %H:%M:%S%.6f").to_string(),
        Some(t) => t.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => secs.to_string(),
    }
}

pub fn format_record(header: &RecordHeader, request: &Request) -> String {
    format!(
        "{:>6} {}:{} -> {}:{} req={} first={} last={} pragma={}/{} ims={} exp={} lm={} hdr={} body={} rt={}s [{}] {}",
        request.id(),
        Ipv4Addr::from(header.client_ip),
        header.client_port,
        Ipv4Addr::from(header.server_ip),
        header.server_port,
        timestamp(header.client_request_sec, header.client_request_usec),
        timestamp(header.server_first_byte_sec, header.server_first_byte_usec),
        timestamp(header.server_last_byte_sec, header.server_last_byte_usec),
        header.client_pragma,
        header.server_pragma,
        timestamp(header.client_if_modified_since, 0),
        timestamp(header.server_expires, 0),
        timestamp(header.server_last_modified, 0),
        header.response_header_length,
        header.response_body_length,
        request.response_time(),
        classify::explain(request.url()).label(),
        request.url(),
    )
}

/// Write up to `limit` records from `reader` to `out`.
pub fn dump<R: Read, W: Write>(reader: R, out: &mut W, limit: Option<usize>) -> Result<DumpSummary> {
    let mut decoder = Decoder::new(reader);
    let mut records = 0;

    while limit.map_or(true, |n| records < n) {
        let Some(next) = decoder.next_with_header() else {
            break;
        };
        let (header, request) = next?;
        writeln!(out, "{}", format_record(&header, &request))?;
        records += 1;
    }

    Ok(DumpSummary {
        records,
        stop: decoder.stop_reason(),
    })
}
