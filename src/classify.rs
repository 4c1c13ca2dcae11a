//! Primary/secondary heuristic for trace URLs.
//!
//! Rules are checked in order on the lower-cased URL; the first match wins.

const SECONDARY_EXTENSIONS: &[&str] = &[".gif", ".jpg", ".jpeg", ".png", ".css", ".js", ".ico", ".bmp"];
const CGI_MARKER: &str = ".c";
const DOCUMENT_EXTENSIONS: &[&str] = &[".html", ".htm"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Image, stylesheet or script extension.
    SecondaryExtension,
    /// `.c` anywhere in the URL (CGI scripts).
    Cgi,
    /// `.html` / `.htm`.
    Document,
    /// Last path segment has no dot.
    Directory,
    /// Nothing recognized; counted as primary.
    Fallback,
}

impl Rule {
    pub fn is_primary(self) -> bool {
        !matches!(self, Rule::SecondaryExtension | Rule::Cgi)
    }

    pub fn label(self) -> &'static str {
        match self {
            Rule::SecondaryExtension => "secondary-ext",
            Rule::Cgi => "cgi",
            Rule::Document => "document",
            Rule::Directory => "directory",
            Rule::Fallback => "fallback",
        }
    }
}

/// Which rule decides `url`.
pub fn explain(url: &str) -> Rule {
    let lower = url.to_lowercase();

    if SECONDARY_EXTENSIONS.iter().any(|ext| lower.contains(ext)) {
        Rule::SecondaryExtension
    } else if lower.contains(CGI_MARKER) {
        Rule::Cgi
    } else if DOCUMENT_EXTENSIONS.iter().any(|ext| lower.contains(ext)) {
        Rule::Document
    } else if !lower.rsplit('/').next().unwrap_or_default().contains('.') {
        Rule::Directory
    } else {
        Rule::Fallback
    }
}

/// `true` when `url` looks like a top-level document fetch.
pub fn classify(url: &str) -> bool {
    explain(url).is_primary()
}
