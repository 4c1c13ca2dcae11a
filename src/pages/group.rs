//! Page reconstruction over a client-sorted request sequence.
//!
//! Each contiguous run of secondary requests is attached to the primary
//! request right before it. A secondary run with no primary in front of it
//! (first requests of a client) becomes an orphan page and gets promoted.

use tracing::debug;

use super::Page;
use crate::trace::Request;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupingMode {
    /// Split only on primary requests and client changes.
    Contiguous,
    /// Also split when a secondary request arrives more than `secs` after the
    /// first request of the open page.
    Timeout { secs: u32 },
}

enum GroupState {
    NoClient,
    BuildingPage { client: u32, page: Vec<Request> },
}

fn opens_page(page: &[Request], r: &Request, mode: GroupingMode) -> bool {
    if r.is_primary() {
        return true;
    }
    match mode {
        GroupingMode::Contiguous => false,
        GroupingMode::Timeout { secs } => {
            let anchor = page.first().map_or(0, Request::client_request_time);
            i64::from(r.client_request_time()) - i64::from(anchor) > i64::from(secs)
        }
    }
}

fn step(done: &mut Vec<Vec<Request>>, state: GroupState, r: Request, mode: GroupingMode) -> GroupState {
    match state {
        GroupState::NoClient => GroupState::BuildingPage {
            client: r.client_ip(),
            page: vec![r],
        },
        GroupState::BuildingPage { client, page } if client != r.client_ip() || opens_page(&page, &r, mode) => {
            if !page.is_empty() {
                done.push(page);
            }
            GroupState::BuildingPage {
                client: r.client_ip(),
                page: vec![r],
            }
        }
        GroupState::BuildingPage { client, mut page } => {
            page.push(r);
            GroupState::BuildingPage { client, page }
        }
    }
}

/// Partition client-sorted requests into pages, in completion order.
pub fn group_pages(requests: Vec<Request>, mode: GroupingMode) -> Vec<Page> {
    let mut done = Vec::new();
    let last = requests
        .into_iter()
        .fold(GroupState::NoClient, |state, r| step(&mut done, state, r, mode));

    if let GroupState::BuildingPage { page, .. } = last {
        if !page.is_empty() {
            done.push(page);
        }
    }

    let pages: Vec<Page> = done.into_iter().filter_map(Page::seal).collect();
    debug!(
        pages = pages.len(),
        promoted = pages.iter().filter(|p| p.promoted()).count(),
        "grouped pages"
    );
    pages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pages::sort_by_client;
    use crate::trace::fixtures::{requests, RecordSpec};

    fn shape(pages: &[Page]) -> Vec<Vec<(u64, bool)>> {
        pages
            .iter()
            .map(|p| p.requests().iter().map(|r| (r.id(), r.is_primary())).collect())
            .collect()
    }

    #[test]
    fn primary_secondary_and_orphan_pages() {
        let input = requests(&[
            RecordSpec::new(1, "/index.html"),
            RecordSpec::new(1, "/logo.gif"),
            RecordSpec::new(1, "/site.css"),
            RecordSpec::new(2, "/banner.jpg"),
            RecordSpec::new(2, "/about.html"),
            RecordSpec::new(2, "/photo.png"),
        ]);

        let pages = group_pages(input, GroupingMode::Contiguous);
        assert_eq!(
            shape(&pages),
            vec![
                vec![(0, true), (1, false), (2, false)],
                vec![(3, true)],
                vec![(4, true), (5, false)],
            ]
        );
        assert!(!pages[0].promoted());
        assert!(pages[1].promoted());
        assert!(!pages[2].promoted());
        assert_eq!(pages[1].requests()[0].client_ip(), 2);
    }

    #[test]
    fn empty_input_has_no_pages() {
        assert!(group_pages(Vec::new(), GroupingMode::Contiguous).is_empty());
    }

    #[test]
    fn consecutive_primaries_each_open_a_page() {
        let input = requests(&[
            RecordSpec::new(5, "/a.html"),
            RecordSpec::new(5, "/b.html"),
            RecordSpec::new(5, "/c/"),
        ]);
        let pages = group_pages(input, GroupingMode::Contiguous);
        assert_eq!(pages.len(), 3);
        assert!(pages.iter().all(|p| p.len() == 1 && !p.promoted()));
    }

    #[test]
    fn client_change_closes_the_page() {
        // Client 2 has only secondaries: they belong to an orphan page of
        // their own, never to client 1's page.
        let input = sort_by_client(requests(&[
            RecordSpec::new(1, "/index.html"),
            RecordSpec::new(2, "/x.gif"),
            RecordSpec::new(1, "/y.gif"),
            RecordSpec::new(2, "/z.gif"),
        ]));
        let pages = group_pages(input, GroupingMode::Contiguous);
        assert_eq!(
            shape(&pages),
            vec![vec![(0, true), (2, false)], vec![(1, true), (3, false)]]
        );
        assert!(pages[1].promoted());
    }

    #[test]
    fn every_page_starts_with_a_primary() {
        let input = sort_by_client(requests(&[
            RecordSpec::new(9, "/a.gif"),
            RecordSpec::new(4, "/b.js"),
            RecordSpec::new(9, "/c.html"),
            RecordSpec::new(4, "/d.png"),
            RecordSpec::new(4, "/e/"),
            RecordSpec::new(7, "/f.ico"),
        ]));
        let pages = group_pages(input, GroupingMode::Contiguous);
        let total: usize = pages.iter().map(Page::len).sum();
        assert_eq!(total, 6);
        for page in &pages {
            assert!(page.requests()[0].is_primary());
            let client = page.requests()[0].client_ip();
            assert!(page.requests().iter().all(|r| r.client_ip() == client));
        }
    }

    #[test]
    fn timeout_mode_splits_on_gaps() {
        let input = requests(&[
            RecordSpec::new(1, "/index.html").at(100),
            RecordSpec::new(1, "/a.gif").at(105),
            RecordSpec::new(1, "/b.gif").at(110),
            RecordSpec::new(1, "/c.gif").at(111),
            RecordSpec::new(1, "/d.gif").at(115),
        ]);

        let pages = group_pages(input.clone(), GroupingMode::Timeout { secs: 10 });
        assert_eq!(
            shape(&pages),
            vec![vec![(0, true), (1, false), (2, false)], vec![(3, true), (4, false)]]
        );
        assert!(pages[1].promoted());

        let pages = group_pages(input, GroupingMode::Contiguous);
        assert_eq!(pages.len(), 1);
    }
}
