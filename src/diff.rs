// src/diff.rs
//! Watermark diffing: which entries of a freshly fetched feed are new.

use crate::feed::FeedEntry;

/// Compute the entries published since `watermark`, oldest-new first.
///
/// The input is scanned in feed order (newest-first). Entries without a link
/// cannot be tracked and are skipped, not treated as a stop condition. The
/// scan stops at the first entry whose link equals the watermark; everything
/// after it is already seen. When the watermark never matches (first run, or
/// a feed that rotated past the last-seen item), the whole feed counts as new.
/// Over-notifying on rotation is preferred to silently dropping entries.
pub fn new_entries(entries: &[FeedEntry], watermark: Option<&str>) -> Vec<FeedEntry> {
    let mut fresh = Vec::new();
    for entry in entries {
        let Some(link) = entry.link.as_deref() else {
            tracing::debug!(title = %entry.title, "feed entry without link, skipping");
            continue;
        };
        if Some(link) == watermark {
            break;
        }
        fresh.push(entry.clone());
    }
    fresh.reverse();
    fresh
}
