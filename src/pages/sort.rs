use crate::trace::Request;

/// Stable sort by client address. Requests of one client keep decode order,
/// which is what lets the grouper treat them as a contiguous session.
pub fn sort_by_client(mut requests: Vec<Request>) -> Vec<Request> {
    requests.sort_by_key(Request::client_ip);
    requests
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::fixtures::{requests, RecordSpec};

    #[test]
    fn groups_clients_and_keeps_decode_order() {
        let input = requests(&[
            RecordSpec::new(3, "/a.html"),
            RecordSpec::new(1, "/b.html"),
            RecordSpec::new(3, "/c.gif"),
            RecordSpec::new(2, "/d.html"),
            RecordSpec::new(1, "/e.gif"),
            RecordSpec::new(3, "/f.gif"),
        ]);

        let sorted = sort_by_client(input);
        let order: Vec<(u32, u64)> = sorted.iter().map(|r| (r.client_ip(), r.id())).collect();
        assert_eq!(order, vec![(1, 1), (1, 4), (2, 3), (3, 0), (3, 2), (3, 5)]);
    }

    #[test]
    fn empty_is_fine() {
        assert!(sort_by_client(Vec::new()).is_empty());
    }
}
