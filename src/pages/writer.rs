use std::io::Write;

use super::Page;
use crate::error::Result;

pub const HEADER_LINE: &str = "# URL,SIZE_IN_BYTES,IS_PRIMARY(1=true,0=false),REQUEST_TIME,RESPONSE_TIME";

/// Write pages in the normalized text format. Sink errors are returned as-is.
pub fn write_pages<W: Write>(out: &mut W, pages: &[Page]) -> Result<()> {
    writeln!(out, "{}", HEADER_LINE)?;

    for (i, page) in pages.iter().enumerate() {
        let n = i + 1;
        writeln!(out, "# --- Page {} ({} requests) ---", n, page.len())?;
        for r in page.requests() {
            writeln!(
                out,
                "{},{},{},{},{}",
                r.url(),
                r.size(),
                u8::from(r.is_primary()),
                r.client_request_time(),
                r.response_time()
            )?;
        }
        writeln!(out, "# --- End of Page {} ---", n)?;
    }

    out.flush()?;
    Ok(())
}
