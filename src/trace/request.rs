use super::layout::RecordHeader;
use crate::classify;

/// One decoded HTTP transaction.
///
/// Fields are read-only after decode. The only mutation is `promote`, which
/// the page grouper uses to mark an orphan page's first request as primary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    id: u64,
    url: String,
    client_ip: u32,
    client_port: u16,
    server_ip: u32,
    server_port: u16,
    client_request_time: u32,
    server_first_byte_time: u32,
    server_last_byte_time: u32,
    response_header_length: u32,
    response_body_length: u32,
    is_primary: bool,
}

impl Request {
    pub fn from_header(id: u64, header: &RecordHeader, url: String) -> Self {
        let is_primary = classify::classify(&url);
        Request {
            id,
            url,
            client_ip: header.client_ip,
            client_port: header.client_port,
            server_ip: header.server_ip,
            server_port: header.server_port,
            client_request_time: header.client_request_sec,
            server_first_byte_time: header.server_first_byte_sec,
            server_last_byte_time: header.server_last_byte_sec,
            response_header_length: header.response_header_length,
            response_body_length: header.response_body_length,
            is_primary,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn client_ip(&self) -> u32 {
        self.client_ip
    }

    pub fn client_port(&self) -> u16 {
        self.client_port
    }

    pub fn server_ip(&self) -> u32 {
        self.server_ip
    }

    pub fn server_port(&self) -> u16 {
        self.server_port
    }

    pub fn client_request_time(&self) -> u32 {
        self.client_request_time
    }

    /// Header plus body bytes. Summed in 64 bits so huge responses don't wrap.
    pub fn size(&self) -> u64 {
        u64::from(self.response_header_length) + u64::from(self.response_body_length)
    }

    /// Last-byte minus first-byte time, never below 1 second.
    pub fn response_time(&self) -> u32 {
        let delta = i64::from(self.server_last_byte_time) - i64::from(self.server_first_byte_time);
        delta.max(1) as u32
    }

    pub fn is_primary(&self) -> bool {
        self.is_primary
    }

    pub(crate) fn promote(&mut self) {
        self.is_primary = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(first: u32, last: u32) -> Request {
        let header = RecordHeader {
            server_first_byte_sec: first,
            server_last_byte_sec: last,
            response_header_length: u32::MAX,
            response_body_length: 10,
            ..Default::default()
        };
        Request::from_header(0, &header, "/a.gif".into())
    }

    #[test]
    fn response_time_floors_at_one() {
        assert_eq!(request(100, 100).response_time(), 1);
        assert_eq!(request(100, 90).response_time(), 1);
        assert_eq!(request(100, 107).response_time(), 7);
    }

    #[test]
    fn size_does_not_wrap() {
        assert_eq!(request(0, 0).size(), u64::from(u32::MAX) + 10);
    }

    #[test]
    fn promote_only_sets_primary() {
        let mut r = request(1, 2);
        let before = r.clone();
        assert!(!r.is_primary());
        r.promote();
        assert!(r.is_primary());
        assert_eq!(r.url(), before.url());
        assert_eq!(r.size(), before.size());
        assert_eq!(r.id(), before.id());
    }
}
