//! Typing pacer
//!
//! Presentation-only throttling of streamed tokens: tokens longer than a
//! threshold are cut into fixed-size slices delivered with a random delay.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Pacing settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Whether pacing is applied
    pub enabled: bool,
    /// Tokens up to this many characters pass through whole
    pub split_threshold: usize,
    /// Characters per slice
    pub slice_chars: usize,
    /// Lower bound of the delay between slices
    pub min_delay_ms: u64,
    /// Upper bound of the delay between slices
    pub max_delay_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            split_threshold: 3,
            slice_chars: 15,
            min_delay_ms: 125,
            max_delay_ms: 250,
        }
    }
}

impl PacingConfig {
    /// Pacing switched on with default bounds
    #[must_use]
    pub fn typing() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }
}

/// Splits tokens and picks delays per [`PacingConfig`]
#[derive(Debug, Clone, Default)]
pub struct TypingPacer {
    config: PacingConfig,
}

impl TypingPacer {
    /// Create pacer
    #[inline]
    #[must_use]
    pub fn new(config: PacingConfig) -> Self {
        Self { config }
    }

    /// Pacer that never splits or waits
    #[inline]
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Whether pacing is applied
    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Slices of `token` in delivery order
    #[must_use]
    pub fn slices(&self, token: &str) -> Vec<String> {
        let chars: Vec<char> = token.chars().collect();
        if !self.config.enabled || chars.len() <= self.config.split_threshold {
            return vec![token.to_string()];
        }
        chars
            .chunks(self.config.slice_chars.max(1))
            .map(|c| c.iter().collect())
            .collect()
    }

    /// Delay before the next slice
    #[must_use]
    pub fn next_delay(&self) -> Duration {
        if !self.config.enabled {
            return Duration::ZERO;
        }
        let low = self.config.min_delay_ms.min(self.config.max_delay_ms);
        let high = self.config.max_delay_ms.max(low);
        Duration::from_millis(rand::rng().random_range(low..=high))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_tokens_pass_through() {
        let pacer = TypingPacer::new(PacingConfig::typing());
        assert_eq!(pacer.slices("abc"), vec!["abc"]);
    }

    #[test]
    fn long_tokens_split_into_fifteen_char_slices() {
        let pacer = TypingPacer::new(PacingConfig::typing());
        let token = "abcdefghijklmnopqrstuvwxyz0123";
        let slices = pacer.slices(token);
        assert_eq!(slices, vec!["abcdefghijklmno", "pqrstuvwxyz0123"]);
        assert_eq!(slices.concat(), token);
    }

    #[test]
    fn multibyte_text_splits_on_char_boundaries() {
        let pacer = TypingPacer::new(PacingConfig::typing());
        let token = "★★★★★☆☆☆☆☆★★★★★☆";
        assert_eq!(pacer.slices(token).concat(), token);
    }

    #[test]
    fn delays_stay_in_bounds() {
        let pacer = TypingPacer::new(PacingConfig::typing());
        for _ in 0..50 {
            let delay = pacer.next_delay();
            assert!(delay >= Duration::from_millis(125) && delay <= Duration::from_millis(250));
        }
        assert_eq!(TypingPacer::disabled().next_delay(), Duration::ZERO);
    }
}
