//! Section completeness markers
//!
//! Generated sections end with a star rating line and a "📈 Next Steps:"
//! list. These helpers read both back out of section content.

use once_cell::sync::Lazy;
use regex::Regex;

/// Rating assumed for a section that has none yet
pub const DEFAULT_RATING: &str = "★☆☆☆☆";

const NEXT_STEPS_MARKER: &str = "📈 Next Steps:";
const NEXT_STEPS_END: char = '💎';
const DONE_MARK: char = '✓';

static RATING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"⭐ Provided Information Rating: ([★☆]+)").expect("valid rating regex")
});
static ITEM_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\s•-]*").expect("valid prefix regex"));

/// Star rating string of `content`, if present
#[must_use]
pub fn rating_of(content: &str) -> Option<&str> {
    RATING
        .captures(content)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Number of filled stars in `content`'s rating, defaulting to one
#[must_use]
pub fn star_count(content: &str) -> usize {
    rating_of(content)
        .unwrap_or(DEFAULT_RATING)
        .chars()
        .filter(|c| *c == '★')
        .count()
}

/// Text of the Next Steps block, marker included
#[must_use]
pub fn next_steps_block(content: &str) -> Option<&str> {
    let start = content.find(NEXT_STEPS_MARKER)?;
    let rest = &content[start..];
    let end = rest.find(NEXT_STEPS_END).unwrap_or(rest.len());
    Some(&rest[..end])
}

/// Next Steps lines marked done
#[must_use]
pub fn completed_items(content: &str) -> Vec<String> {
    next_steps_block(content)
        .map(|block| {
            block
                .lines()
                .filter(|line| line.contains(DONE_MARK))
                .map(|line| line.trim().to_string())
                .collect()
        })
        .unwrap_or_default()
}

/// Next Steps lines still open, bullets stripped
#[must_use]
pub fn incomplete_items(content: &str) -> Vec<String> {
    next_steps_block(content)
        .map(|block| {
            block
                .lines()
                .filter(|line| {
                    !line.trim().is_empty()
                        && !line.contains(DONE_MARK)
                        && !line.contains("Next Steps")
                })
                .map(|line| ITEM_PREFIX.replace(line, "").trim_end().to_string())
                .collect()
        })
        .unwrap_or_default()
}
