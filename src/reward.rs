// src/reward.rs
//! Reward extraction from free-text feed entries.
//!
//! Job posts carry their payout inline ("Translation job | Reward: US$ 12.40").
//! There is no structured field for it, so we scan title + summary for the
//! first `Reward:` marker followed by an optional currency prefix and a
//! decimal number.

use once_cell::sync::OnceCell;
use regex::Regex;

fn reward_re() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)Reward:\s*(?:US\$|\$)?\s*(\d+\.?\d*)").expect("reward regex")
    })
}

/// Extract the reward value from an entry's title and summary.
///
/// Returns `0.0` when no reward marker is present or the matched numeral does
/// not parse; a missing reward and a malformed one are treated identically.
/// Never panics, for any input.
pub fn extract(title: &str, summary: &str) -> f64 {
    let text = format!("{title} | {summary}");
    let Some(caps) = reward_re().captures(&text) else {
        return 0.0;
    };
    match caps[1].parse::<f64>() {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(numeral = &caps[1], error = %e, "unparseable reward numeral");
            0.0
        }
    }
}
