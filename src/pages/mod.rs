pub mod group;
pub mod reader;
pub mod sort;
pub mod writer;

use crate::trace::Request;

pub use group::{group_pages, GroupingMode};
pub use sort::sort_by_client;
pub use writer::write_pages;

/// One browsing action: a primary request and the secondary requests that
/// followed it for the same client. Never empty; the first request is primary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    requests: Vec<Request>,
    promoted: bool,
}

impl Page {
    /// Seal a page, promoting the first request when none is primary.
    pub(crate) fn seal(mut requests: Vec<Request>) -> Option<Self> {
        let promoted = !requests.iter().any(Request::is_primary);
        if promoted {
            requests.first_mut()?.promote();
        }
        Some(Page { requests, promoted })
    }

    pub fn requests(&self) -> &[Request] {
        &self.requests
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// True when this was an orphan page whose first request got promoted.
    pub fn promoted(&self) -> bool {
        self.promoted
    }
}
