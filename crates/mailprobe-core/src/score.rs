//! Multiplicative deliverability score
//!
//! A handful of findings force the score to zero. Otherwise the score starts
//! at 100 and each risk factor scales what is left, so the order of the
//! multipliers below is part of the result.

use mailprobe_common::config::ScoringConfig;
use mailprobe_common::types::VerificationChecks;
use tracing::trace;

const BASE_SCORE: f64 = 100.0;

/// Inputs to the score that are not carried on the checks
#[derive(Debug, Clone, Default)]
pub struct ScoreContext<'a> {
    pub domain: &'a str,
    /// Explicitly flagged extra risk (for example a redirecting domain)
    pub other: bool,
}

/// Computes scores from a multiplier table
#[derive(Debug, Clone)]
pub struct ScoreEngine {
    config: ScoringConfig,
}

impl ScoreEngine {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    /// Score in `0..=100`
    pub fn calculate(&self, checks: &VerificationChecks, context: &ScoreContext<'_>) -> u8 {
        if let Some(score) = self.hard_score(checks) {
            trace!(domain = %context.domain, score, "Hard score");
            return score;
        }

        let c = &self.config;
        let mut score = BASE_SCORE;

        if let Some(multiplier) = c.domain_multipliers.get(&context.domain.to_lowercase()) {
            score *= multiplier;
        }
        if checks.free {
            score *= c.free;
        }

        // typo replaces the disposable penalty when both apply
        if checks.domain_validity {
            if checks.typo_domain {
                score *= c.typo_domain;
            } else if checks.disposable {
                score *= c.disposable;
            }
        }

        if checks.role {
            score *= c.role;
        }
        if checks.catch_all && !checks.free {
            score *= c.catch_all;
        }
        if checks.mailbox_full {
            score *= c.mailbox_full;
        }
        if checks.alias_of.is_some() {
            score *= c.alias;
        }
        if checks.numerical_characters > 0 {
            let decay = 1.0 - f64::from(checks.numerical_characters) * c.numeric_per_char;
            score *= decay.max(c.numeric_min_multiplier);
        }
        if checks.alphabetical_characters <= c.short_alpha_max_letters {
            score *= c.short_alpha;
        }
        if context.other {
            score *= c.other;
        }

        let score = score.round().clamp(0.0, 100.0) as u8;
        trace!(domain = %context.domain, score, "Calculated score");
        score
    }

    /// Fixed scores that bypass the multipliers
    fn hard_score(&self, checks: &VerificationChecks) -> Option<u8> {
        if checks.no_reply
            || (checks.typo_domain && !checks.domain_validity)
            || checks.isp_esp
            || checks.blacklisted
            || !checks.syntax
            || !checks.domain_validity
        {
            return Some(0);
        }
        if !checks.mx_record {
            return Some(if checks.implicit_mx {
                self.config.implicit_mx_score
            } else {
                0
            });
        }
        None
    }
}

impl Default for ScoreEngine {
    fn default() -> Self {
        Self::new(ScoringConfig::default())
    }
}
