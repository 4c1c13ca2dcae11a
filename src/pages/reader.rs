//! Load the normalized page format back, the way the simulators read it.

use std::io::BufRead;
use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use crate::error::{Result, TraceError};

static PAGE_START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^# --- Page (\d+)(?: \((\d+) requests\))? ---$").unwrap());
static PAGE_END_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^# --- End of Page (\d+) ---$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageEntry {
    pub url: String,
    pub size: u64,
    pub is_primary: bool,
    /// Missing in files written before these columns existed.
    pub request_time: Option<u32>,
    pub response_time: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedPage {
    pub index: usize,
    pub entries: Vec<PageEntry>,
    pub promoted: bool,
}

impl LoadedPage {
    pub fn total_size(&self) -> u64 {
        self.entries.iter().map(|e| e.size).sum()
    }
}

fn format_err(line: usize, reason: impl Into<String>) -> TraceError {
    TraceError::Format { line, reason: reason.into() }
}

fn parse_flag(line: usize, s: &str) -> Result<bool> {
    match s.trim() {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        other => Err(format_err(line, format!("bad primary flag {:?}", other))),
    }
}

fn parse_num<T: std::str::FromStr>(line: usize, what: &str, s: &str) -> Result<T> {
    s.trim()
        .parse()
        .map_err(|_| format_err(line, format!("bad {} {:?}", what, s)))
}

/// Parse `url,size,primary[,request_time,response_time]`. Numbers are taken
/// from the right so a URL with commas stays intact.
fn parse_entry(line: usize, text: &str) -> Result<PageEntry> {
    let full: Vec<&str> = text.rsplitn(5, ',').collect();
    if let [rt, req, flag, size, url] = full.as_slice() {
        if let (Ok(response_time), Ok(request_time)) = (rt.trim().parse(), req.trim().parse()) {
            if let Ok(is_primary) = parse_flag(line, flag) {
                return Ok(PageEntry {
                    url: url.to_string(),
                    size: parse_num(line, "size", size)?,
                    is_primary,
                    request_time: Some(request_time),
                    response_time: Some(response_time),
                });
            }
        }
    }

    let short: Vec<&str> = text.rsplitn(3, ',').collect();
    match short.as_slice() {
        [flag, size, url] => Ok(PageEntry {
            url: url.to_string(),
            size: parse_num(line, "size", size)?,
            is_primary: parse_flag(line, flag)?,
            request_time: None,
            response_time: None,
        }),
        _ => Err(format_err(line, "expected url,size,primary[,request_time,response_time]")),
    }
}

struct PageBuilder {
    index: Option<usize>,
    declared: Option<usize>,
    entries: Vec<PageEntry>,
}

impl PageBuilder {
    fn new() -> Self {
        PageBuilder { index: None, declared: None, entries: Vec::new() }
    }

    fn finish(self, fallback_index: usize) -> Option<LoadedPage> {
        if self.entries.is_empty() {
            return None;
        }
        let index = self.index.unwrap_or(fallback_index);
        if let Some(declared) = self.declared.filter(|&d| d != self.entries.len()) {
            warn!(page = index, declared, found = self.entries.len(), "page request count mismatch");
        }
        let mut entries = self.entries;
        let promoted = !entries.iter().any(|e| e.is_primary);
        if promoted {
            entries[0].is_primary = true;
        }
        Some(LoadedPage { index, entries, promoted })
    }
}

pub fn read_pages<R: BufRead>(input: R) -> Result<Vec<LoadedPage>> {
    let mut pages = Vec::new();
    let mut current = PageBuilder::new();

    for (i, line) in input.lines().enumerate() {
        let line = line?;
        let lineno = i + 1;
        let text = line.trim_end_matches('\r');

        if text.is_empty() {
            continue;
        }
        if text.starts_with('#') {
            if let Some(caps) = PAGE_START_RE.captures(text) {
                if !current.entries.is_empty() {
                    let open = std::mem::replace(&mut current, PageBuilder::new());
                    pages.extend(open.finish(pages.len() + 1));
                }
                current.index = caps[1].parse().ok();
                current.declared = caps.get(2).and_then(|m| m.as_str().parse().ok());
            } else if PAGE_END_RE.is_match(text) {
                let done = std::mem::replace(&mut current, PageBuilder::new());
                pages.extend(done.finish(pages.len() + 1));
            }
            continue;
        }

        current.entries.push(parse_entry(lineno, text)?);
    }

    pages.extend(current.finish(pages.len() + 1));
    Ok(pages)
}
