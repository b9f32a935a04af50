//! Context store configuration

use crate::error::{ContextError, ContextResult};
use serde::{Deserialize, Serialize};

/// Default token window
pub const DEFAULT_WINDOW_LIMIT: usize = 8000;
/// Default fraction of the window that triggers compression
pub const DEFAULT_COMPRESSION_THRESHOLD: f64 = 0.6;
/// Default fraction of the window to compress down to
pub const DEFAULT_TARGET_RATIO: f64 = 0.5;
/// Default budget multiplier for the focus segment
pub const DEFAULT_FOCUS_MULTIPLIER: f64 = 1.5;

/// Tunables for a [`ContextStore`](crate::ContextStore)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Token window the store must stay within
    pub window_limit: usize,
    /// Fraction of `window_limit` at which compression kicks in
    pub compression_threshold: f64,
    /// Fraction of `window_limit` that compression aims for
    pub target_ratio: f64,
    /// Budget multiplier for the focus segment
    pub focus_multiplier: f64,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            window_limit: DEFAULT_WINDOW_LIMIT,
            compression_threshold: DEFAULT_COMPRESSION_THRESHOLD,
            target_ratio: DEFAULT_TARGET_RATIO,
            focus_multiplier: DEFAULT_FOCUS_MULTIPLIER,
        }
    }
}

impl ContextConfig {
    /// Set window limit
    #[inline]
    #[must_use]
    pub fn with_window_limit(mut self, window_limit: usize) -> Self {
        self.window_limit = window_limit;
        self
    }

    /// Set compression threshold
    #[inline]
    #[must_use]
    pub fn with_compression_threshold(mut self, threshold: f64) -> Self {
        self.compression_threshold = threshold;
        self
    }

    /// Set compression target ratio
    #[inline]
    #[must_use]
    pub fn with_target_ratio(mut self, ratio: f64) -> Self {
        self.target_ratio = ratio;
        self
    }

    /// Set focus multiplier
    #[inline]
    #[must_use]
    pub fn with_focus_multiplier(mut self, multiplier: f64) -> Self {
        self.focus_multiplier = multiplier;
        self
    }

    /// Token count at which compression is due: `floor(limit * threshold)`
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )]
    pub fn threshold_tokens(&self) -> usize {
        (self.window_limit as f64 * self.compression_threshold).floor() as usize
    }

    /// Token total compression aims for: `floor(limit * target_ratio)`
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )]
    pub fn target_tokens(&self) -> usize {
        (self.window_limit as f64 * self.target_ratio).floor() as usize
    }

    /// Check ranges
    ///
    /// # Errors
    /// [`ContextError::InvalidConfig`] naming the first bad field
    pub fn validate(&self) -> ContextResult<()> {
        if self.window_limit == 0 {
            return Err(ContextError::invalid("window_limit", "must be positive"));
        }
        if !(self.compression_threshold > 0.0 && self.compression_threshold <= 1.0) {
            return Err(ContextError::invalid(
                "compression_threshold",
                format!("must be in (0, 1], got {}", self.compression_threshold),
            ));
        }
        if !(self.target_ratio > 0.0 && self.target_ratio <= 1.0) {
            return Err(ContextError::invalid(
                "target_ratio",
                format!("must be in (0, 1], got {}", self.target_ratio),
            ));
        }
        if !(self.focus_multiplier >= 1.0 && self.focus_multiplier.is_finite()) {
            return Err(ContextError::invalid(
                "focus_multiplier",
                format!("must be at least 1.0, got {}", self.focus_multiplier),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ContextConfig::default();
        assert_eq!(config.threshold_tokens(), 4800);
        assert_eq!(config.target_tokens(), 4000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(ContextConfig::default().with_window_limit(0).validate().is_err());
        assert!(ContextConfig::default()
            .with_compression_threshold(1.5)
            .validate()
            .is_err());
        assert!(ContextConfig::default().with_target_ratio(0.0).validate().is_err());
        assert!(ContextConfig::default()
            .with_focus_multiplier(f64::NAN)
            .validate()
            .is_err());
    }

    #[test]
    fn partial_toml_like_input_uses_defaults() {
        let config: ContextConfig = serde_json::from_str(r#"{"window_limit": 1000}"#).unwrap();
        assert_eq!(config.window_limit, 1000);
        assert_eq!(config.threshold_tokens(), 600);
    }
}
