//! mailprobe Core - Email deliverability verification
//!
//! This crate turns an address string into a scored, classified
//! [`VerificationResult`](mailprobe_common::types::VerificationResult):
//! syntax and alias parsing, DNS and provider intelligence, risk lists,
//! an SMTP mailbox probe with rate limiting and MX skip-listing, and the
//! scoring and classification that follow.

pub mod address;
pub mod cache;
pub mod classify;
pub mod dns;
pub mod domain;
pub mod enrichment;
pub mod pipeline;
pub mod rate_limiter;
pub mod risk;
pub mod score;
pub mod smtp;

#[cfg(test)]
mod testing;

pub use address::{AddressParser, CharacterCounts};
pub use cache::TtlCache;
pub use classify::{ClassifyInput, ResultClassifier};
pub use dns::{DnsResolver, TrustDnsResolver};
pub use domain::{DomainIntelligence, DomainValidity, ProviderMatch};
pub use enrichment::{DmarcPolicy, Enrichment, EnrichmentBonus};
pub use pipeline::{Verifier, VerifierBuilder};
pub use rate_limiter::{backoff_delay, backoff_schedule, RateLimiter};
pub use risk::{RiskSignals, TypoMatch};
pub use score::{ScoreContext, ScoreEngine};
pub use smtp::{ProbeOutcome, SmtpProbe, SmtpReply};
