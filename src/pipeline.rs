//! Decode → sort → group → write, each stage taking ownership of the last one's output.

use std::io::{Read, Write};

use tracing::{info, warn};

use crate::error::Result;
use crate::pages::{self, GroupingMode};
use crate::trace::{self, StopReason};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSummary {
    pub requests: usize,
    pub clients: usize,
    pub pages: usize,
    pub promoted: usize,
    pub skipped: u64,
    pub stop: StopReason,
}

pub fn run<R: Read, W: Write>(
    input: R,
    out: &mut W,
    mode: GroupingMode,
    progress_every: u64,
    on_progress: impl FnMut(u64),
) -> Result<PipelineSummary> {
    let decoded = trace::decode_all(input, progress_every, on_progress)?;
    match decoded.stop {
        StopReason::EndOfStream => {}
        StopReason::TruncatedHeader { record, got } => {
            warn!("Trace ends inside record {} header ({} bytes); keeping earlier records", record, got)
        }
        StopReason::TruncatedUrl { record, expected, got } => warn!(
            "Unexpected EOF reading URL of record {} ({}/{} bytes); keeping earlier records",
            record, got, expected
        ),
    }
    if decoded.skipped > 0 {
        warn!("Skipped {} undecodable records", decoded.skipped);
    }
    info!("Parsed {} records", decoded.requests.len());

    let sorted = pages::sort_by_client(decoded.requests);
    let requests = sorted.len();
    let clients = count_clients(&sorted);

    let grouped = pages::group_pages(sorted, mode);
    let promoted = grouped.iter().filter(|p| p.promoted()).count();
    info!(
        "Grouped {} requests from {} clients into {} pages ({} orphan pages promoted)",
        requests,
        clients,
        grouped.len(),
        promoted
    );

    pages::write_pages(out, &grouped)?;

    Ok(PipelineSummary {
        requests,
        clients,
        pages: grouped.len(),
        promoted,
        skipped: decoded.skipped,
        stop: decoded.stop,
    })
}

/// Distinct clients in a client-sorted slice.
fn count_clients(sorted: &[trace::Request]) -> usize {
    if sorted.is_empty() {
        return 0;
    }
    1 + sorted
        .windows(2)
        .filter(|w| w[0].client_ip() != w[1].client_ip())
        .count()
}
