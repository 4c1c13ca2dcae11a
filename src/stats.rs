use std::collections::BTreeMap;

use serde::Serialize;

use crate::pages::reader::LoadedPage;

/// Requests-per-page buckets the plotting scripts slice on; the last one is open-ended.
const BUCKETS: &[(usize, usize, &str)] = &[
    (1, 1, "1"),
    (2, 2, "2"),
    (3, 4, "3-4"),
    (5, 8, "5-8"),
    (9, 16, "9-16"),
    (17, usize::MAX, "17+"),
];

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PageStats {
    pub pages: usize,
    pub requests: usize,
    pub primary: usize,
    pub secondary: usize,
    pub promoted_pages: usize,
    pub mean_requests_per_page: f64,
    pub mean_page_bytes: f64,
    pub max_requests_per_page: usize,
    /// Index (1-based, as written) of the page with the most requests.
    pub largest_page: Option<usize>,
    pub largest_page_url: Option<String>,
    /// Over entries that carry a response time.
    pub mean_response_time: Option<f64>,
    /// Earliest and latest request time seen.
    pub request_time_span: Option<(u32, u32)>,
    pub histogram: BTreeMap<String, usize>,
}

pub fn compute(pages: &[LoadedPage]) -> PageStats {
    let requests: usize = pages.iter().map(|p| p.entries.len()).sum();
    let primary = pages
        .iter()
        .flat_map(|p| &p.entries)
        .filter(|e| e.is_primary)
        .count();
    let total_bytes: u64 = pages.iter().map(LoadedPage::total_size).sum();

    let response_times: Vec<u32> = pages
        .iter()
        .flat_map(|p| &p.entries)
        .filter_map(|e| e.response_time)
        .collect();
    let request_times = pages.iter().flat_map(|p| &p.entries).filter_map(|e| e.request_time);
    let request_time_span = request_times.fold(None, |span: Option<(u32, u32)>, t| match span {
        None => Some((t, t)),
        Some((lo, hi)) => Some((lo.min(t), hi.max(t))),
    });

    // first page wins ties
    let largest = pages.iter().rev().max_by_key(|p| p.entries.len());

    let mut histogram: BTreeMap<String, usize> =
        BUCKETS.iter().map(|(_, _, label)| (label.to_string(), 0)).collect();
    for page in pages {
        let n = page.entries.len();
        if let Some((_, _, label)) = BUCKETS.iter().find(|(lo, hi, _)| (*lo..=*hi).contains(&n)) {
            *histogram.entry(label.to_string()).or_default() += 1;
        }
    }

    PageStats {
        pages: pages.len(),
        requests,
        primary,
        secondary: requests - primary,
        promoted_pages: pages.iter().filter(|p| p.promoted).count(),
        mean_requests_per_page: ratio(requests as f64, pages.len()),
        mean_page_bytes: ratio(total_bytes as f64, pages.len()),
        max_requests_per_page: pages.iter().map(|p| p.entries.len()).max().unwrap_or(0),
        largest_page: largest.map(|p| p.index),
        largest_page_url: largest.map(|p| p.entries[0].url.clone()),
        mean_response_time: (!response_times.is_empty()).then(|| {
            response_times.iter().map(|&t| f64::from(t)).sum::<f64>() / response_times.len() as f64
        }),
        request_time_span,
        histogram,
    }
}

fn ratio(total: f64, n: usize) -> f64 {
    if n == 0 {
        0.0
    } else {
        total / n as f64
    }
}

pub fn print(stats: &PageStats) {
    println!("Pages:          {}", stats.pages);
    println!("Requests:       {}", stats.requests);
    println!("  primary:      {}", stats.primary);
    println!("  secondary:    {}", stats.secondary);
    println!("Promoted pages: {}", stats.promoted_pages);
    println!("Requests/page:  {:.2} mean, {} max", stats.mean_requests_per_page, stats.max_requests_per_page);
    println!("Bytes/page:     {:.0} mean", stats.mean_page_bytes);
    if let (Some(index), Some(url)) = (stats.largest_page, &stats.largest_page_url) {
        println!("Largest page:   #{} ({}, {} requests)", index, url, stats.max_requests_per_page);
    }
    if let Some(rt) = stats.mean_response_time {
        println!("Response time:  {:.2}s mean", rt);
    }
    if let Some((first, last)) = stats.request_time_span {
        println!("Request span:   {}s", last - first);
    }
    println!("\n--- Requests per page ---");
    for (_, _, label) in BUCKETS {
        let count = stats.histogram.get(*label).copied().unwrap_or(0);
        println!("  {:>5} | {}", label, count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pages::reader::read_pages;

    const SAMPLE: &str = "\
# URL,SIZE_IN_BYTES,IS_PRIMARY(1=true,0=false),REQUEST_TIME,RESPONSE_TIME
# --- Page 1 (3 requests) ---
/index.html,1000,1,10,1
/a.gif,200,0,11,1
/b.gif,300,0,11,2
# --- End of Page 1 ---
# --- Page 2 (1 requests) ---
/x.gif,500,0,20,1
# --- End of Page 2 ---
";

    #[test]
    fn summarizes_pages() {
        let pages = read_pages(SAMPLE.as_bytes()).unwrap();
        let s = compute(&pages);

        assert_eq!(s.pages, 2);
        assert_eq!(s.requests, 4);
        assert_eq!(s.primary, 2);
        assert_eq!(s.secondary, 2);
        assert_eq!(s.promoted_pages, 1);
        assert_eq!(s.mean_requests_per_page, 2.0);
        assert_eq!(s.mean_page_bytes, 1000.0);
        assert_eq!(s.max_requests_per_page, 3);
        assert_eq!(s.histogram["1"], 1);
        assert_eq!(s.histogram["3-4"], 1);
        assert_eq!(s.histogram["17+"], 0);
        assert_eq!(s.largest_page, Some(1));
        assert_eq!(s.largest_page_url.as_deref(), Some("/index.html"));
        assert_eq!(s.mean_response_time, Some(1.25));
        assert_eq!(s.request_time_span, Some((10, 20)));
    }

    #[test]
    fn empty_input() {
        let s = compute(&[]);
        assert_eq!(s.pages, 0);
        assert_eq!(s.mean_requests_per_page, 0.0);
        assert_eq!(s.histogram.len(), BUCKETS.len());
        assert_eq!(s.largest_page, None);
        assert_eq!(s.mean_response_time, None);
    }

    #[test]
    fn serializes_to_json() {
        let pages = read_pages(SAMPLE.as_bytes()).unwrap();
        let json = serde_json::to_value(compute(&pages)).unwrap();
        assert_eq!(json["pages"], 2);
        assert_eq!(json["histogram"]["3-4"], 1);
    }
}
