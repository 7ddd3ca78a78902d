//! Document reference linking
//!
//! Rewrites naming-series tokens (`SI-2024-00001`, `PO-0042`, ...) in answer
//! text into markdown links pointing at the desk record page. Tokens already
//! inside a markdown link are left alone, so running the rewrite twice is a
//! no-op.

use std::sync::OnceLock;

use regex::Regex;

/// Naming-series prefix to desk category slug
const PREFIX_TABLE: &[(&str, &str)] = &[
    ("SINV", "sales-invoice"),
    ("SI", "sales-invoice"),
    ("PINV", "purchase-invoice"),
    ("PI", "purchase-invoice"),
    ("SO", "sales-order"),
    ("POS", "pos-invoice"),
    ("PO", "purchase-order"),
    ("DN", "delivery-note"),
    ("PR", "purchase-receipt"),
    ("PE", "payment-entry"),
    ("JE", "journal-entry"),
    ("QTN", "quotation"),
    ("MR", "material-request"),
    ("STE", "stock-entry"),
    ("WO", "work-order"),
    ("SVP", "service-protocol"),
];

/// Alternation over all prefixes, longest first so compound prefixes win
/// (POS before PO, SINV before SI), matching `PREFIX-YYYY-NNNN` or
/// `PREFIX-NNNN` shaped tokens at word edges.
fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        let mut prefixes: Vec<&str> = PREFIX_TABLE.iter().map(|(p, _)| *p).collect();
        prefixes.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
        let alternation = prefixes.join("|");
        Regex::new(&format!(r"\b(?:{alternation})-(?:\d{{4}}-)?\d+\b"))
            .expect("prefix alternation is a valid pattern")
    })
}

/// Slug for the longest table prefix that starts the token
fn slug_for(token: &str) -> Option<&'static str> {
    PREFIX_TABLE
        .iter()
        .filter(|(prefix, _)| {
            token.len() > prefix.len()
                && token.starts_with(prefix)
                && token.as_bytes()[prefix.len()] == b'-'
        })
        .max_by_key(|(prefix, _)| prefix.len())
        .map(|(_, slug)| *slug)
}

/// True when the text before a match ends an open markdown link construct:
/// the token is a link label (`[SI-...`) or sits in a link target
/// (`](/app/.../SI-...`).
fn inside_link(preceding: &str) -> bool {
    preceding.ends_with('[') || preceding.ends_with('/') || preceding.ends_with("](")
}

/// Rewrite recognizable document references into markdown links.
///
/// Idempotent: already-linked references are never wrapped again.
pub fn linkify(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 32);
    let mut last = 0;

    for m in token_pattern().find_iter(text) {
        out.push_str(&text[last..m.start()]);
        let token = m.as_str();
        match slug_for(token) {
            Some(slug) if !inside_link(&text[..m.start()]) => {
                out.push_str(&format!("[{token}](/app/{slug}/{token})"));
            }
            _ => out.push_str(token),
        }
        last = m.end();
    }

    out.push_str(&text[last..]);
    out
}
