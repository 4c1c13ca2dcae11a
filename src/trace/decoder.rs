use std::io::{self, Read};
use std::net::Ipv4Addr;

use tracing::{debug, warn};

use super::layout::{read_field, Field, RecordHeader, HEADER_LEN};
use super::request::Request;
use crate::classify;
use crate::error::{Result, TraceError};

/// Why decoding stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EndOfStream,
    /// Input ended inside a record header.
    TruncatedHeader { record: u64, got: usize },
    /// Input ended inside a record's URL trailer.
    TruncatedUrl { record: u64, expected: usize, got: usize },
}

impl StopReason {
    pub fn is_truncated(&self) -> bool {
        !matches!(self, StopReason::EndOfStream)
    }
}

enum Step {
    Record(RecordHeader, Request),
    Skipped,
    Stop(StopReason),
}

/// Lazily decodes trace records from a byte source.
///
/// Yields `Ok(Request)` per record and a single `Err` on I/O failure. After the
/// iterator is exhausted, `stop_reason` tells a clean end from a truncated tail.
pub struct Decoder<R> {
    reader: R,
    next_id: u64,
    record: u64,
    skipped: u64,
    stop: Option<StopReason>,
    failed: bool,
}

impl<R: Read> Decoder<R> {
    pub fn new(reader: R) -> Self {
        Decoder {
            reader,
            next_id: 0,
            record: 0,
            skipped: 0,
            stop: None,
            failed: false,
        }
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop
    }

    /// Records dropped after a field error.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    fn read_record(&mut self) -> Result<Step> {
        let record = self.record;
        let mut header_buf = [0u8; HEADER_LEN];
        let got = read_full(&mut self.reader, &mut header_buf)?;
        if got == 0 {
            return Ok(Step::Stop(StopReason::EndOfStream));
        }
        if got < HEADER_LEN {
            warn!(record, got, "truncated record header at end of trace");
            return Ok(Step::Stop(StopReason::TruncatedHeader { record, got }));
        }
        self.record += 1;

        let header = match RecordHeader::parse(&header_buf) {
            Ok(h) => h,
            Err(e) => return self.skip_record(record, &header_buf, e),
        };

        let expected = usize::from(header.url_len);
        let mut url_buf = vec![0u8; expected];
        let got = read_full(&mut self.reader, &mut url_buf)?;
        if got < expected {
            warn!(record, expected, got, "truncated URL at end of trace");
            return Ok(Step::Stop(StopReason::TruncatedUrl { record, expected, got }));
        }

        let url = String::from_utf8_lossy(&url_buf).into_owned();
        let request = Request::from_header(self.next_id, &header, url);
        self.next_id += 1;
        Ok(Step::Record(header, request))
    }

    /// Best effort: drop the record and jump over its URL trailer. There is no
    /// sync marker in the format, so a bad `url_len` desynchronizes the rest.
    fn skip_record(&mut self, record: u64, header_buf: &[u8], err: TraceError) -> Result<Step> {
        warn!(record, error = %err, "skipping undecodable record");
        let Ok(url_len) = read_field(header_buf, Field::UrlLen) else {
            return Ok(Step::Stop(StopReason::TruncatedHeader { record, got: header_buf.len() }));
        };
        let expected = url_len as usize;
        let got = io::copy(&mut (&mut self.reader).take(expected as u64), &mut io::sink())? as usize;
        if got < expected {
            return Ok(Step::Stop(StopReason::TruncatedUrl { record, expected, got }));
        }
        self.skipped += 1;
        Ok(Step::Skipped)
    }

    /// Like iterating, but also hands back the full header (used by `dump`).
    pub fn next_with_header(&mut self) -> Option<Result<(RecordHeader, Request)>> {
        loop {
            if self.stop.is_some() || self.failed {
                return None;
            }
            match self.read_record() {
                Ok(Step::Record(header, request)) => return Some(Ok((header, request))),
                Ok(Step::Skipped) => continue,
                Ok(Step::Stop(reason)) => self.stop = Some(reason),
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

impl<R: Read> Iterator for Decoder<R> {
    type Item = Result<Request>;

    fn next(&mut self) -> Option<Self::Item> {
        let (_, r) = match self.next_with_header()? {
            Ok(pair) => pair,
            Err(e) => return Some(Err(e)),
        };
        debug!(
            id = r.id(),
            client = %Ipv4Addr::from(r.client_ip()),
            client_port = r.client_port(),
            server = %Ipv4Addr::from(r.server_ip()),
            server_port = r.server_port(),
            rule = classify::explain(r.url()).label(),
            url = r.url(),
            "decoded record"
        );
        Some(Ok(r))
    }
}

/// Everything decoded from one trace.
#[derive(Debug)]
pub struct Decoded {
    pub requests: Vec<Request>,
    pub stop: StopReason,
    pub skipped: u64,
}

/// Decode a whole trace. `on_progress` is called with the running count every
/// `progress_every` records (never when `progress_every` is 0).
pub fn decode_all<R: Read>(
    reader: R,
    progress_every: u64,
    mut on_progress: impl FnMut(u64),
) -> Result<Decoded> {
    let mut decoder = Decoder::new(reader);
    let mut requests = Vec::new();

    for request in decoder.by_ref() {
        requests.push(request?);
        let n = requests.len() as u64;
        if progress_every > 0 && n % progress_every == 0 {
            on_progress(n);
        }
    }

    Ok(Decoded {
        requests,
        stop: decoder.stop_reason().unwrap_or(StopReason::EndOfStream),
        skipped: decoder.skipped(),
    })
}

/// Fill `buf` as far as the reader allows; returns bytes read (short only at EOF).
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
