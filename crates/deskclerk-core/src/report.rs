//! Fault reporting collaborator
//!
//! Tool and model failures are surfaced to an injected reporter rather than an
//! ambient global, so hosts can route them to their own error log.

use tracing::error;

/// Maximum length of a fault title; longer titles are truncated
pub const MAX_TITLE_LEN: usize = 140;

/// Receives operational faults from the orchestration core
pub trait FaultReporter: Send + Sync {
    /// Report a fault. `title` is bounded; `message` may carry full detail.
    fn report(&self, title: &str, message: &str);
}

/// Default reporter that writes faults to the tracing error log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogFaultReporter;

impl FaultReporter for LogFaultReporter {
    fn report(&self, title: &str, message: &str) {
        error!(title = %bound_title(title), "{}", message);
    }
}

/// Truncate a title to the reporting bound, adding "..." if cut
pub fn bound_title(title: &str) -> String {
    if title.len() <= MAX_TITLE_LEN {
        title.to_string()
    } else {
        let mut cut = MAX_TITLE_LEN.saturating_sub(3);
        while !title.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}...", &title[..cut])
    }
}
