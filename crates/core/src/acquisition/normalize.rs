const FEEDBOOKS: &str = "http://feedbooks.com/";
const FEEDBOOKS_WWW: &str = "http://www.feedbooks.com/";
const FEEDBOOKS_STANZA: &str = "http://feedbooks.com/book/stanza/";

/// Canonical form of a remote book identifier or URL.
///
/// Aliases of the same book collapse to one string so they share one local
/// file. Matching is case-sensitive and each rule applies once.
pub fn normalize_url(url: &str) -> String {
    let mut normalized = match url.strip_prefix(FEEDBOOKS_WWW) {
        Some(rest) => format!("{}{}", FEEDBOOKS, rest),
        None => url.to_string(),
    };
    if let Some(id) = normalized.strip_prefix(FEEDBOOKS_STANZA) {
        normalized = format!("{}book/{}.epub", FEEDBOOKS, id);
    }
    normalized
}
