//! Risk signals derived from the local part and the domain name
//!
//! Keyword and list checks are pure. Typo detection consults
//! [`DomainIntelligence`] so that real domains that merely look like a
//! provider are not flagged.

use crate::domain::DomainIntelligence;
use mailprobe_common::config::{ListsConfig, TypoConfig};
use mailprobe_common::Config;
use std::sync::Arc;
use textdistance::str::levenshtein;
use tracing::debug;

/// Separators splitting a local part into words for role matching
const LOCAL_SEPARATORS: &[char] = &['.', '-', '_', '+'];

/// A domain judged to be a misspelling of a known domain
#[derive(Debug, Clone, PartialEq)]
pub struct TypoMatch {
    pub suggestion: String,
    pub distance: usize,
    pub similarity: f64,
    /// Found in the static typo table rather than by fuzzy matching
    pub from_list: bool,
}

/// Keyword, list and typo checks
pub struct RiskSignals {
    lists: ListsConfig,
    typo: TypoConfig,
    domains: Arc<DomainIntelligence>,
}

impl RiskSignals {
    pub fn new(config: &Config, domains: Arc<DomainIntelligence>) -> Self {
        Self {
            lists: config.lists.clone(),
            typo: config.typo.clone(),
            domains,
        }
    }

    /// Local part equals or contains a no-reply keyword
    pub fn check_no_reply(&self, local_part: &str) -> bool {
        let local = local_part.to_lowercase();
        self.lists
            .no_reply_keywords
            .iter()
            .any(|kw| local == *kw || local.contains(kw.as_str()))
    }

    /// Local part is a role mailbox such as `info` or `sales-team`
    pub fn check_role(&self, local_part: &str) -> bool {
        let local = local_part.to_lowercase();
        let first_word = local.split(LOCAL_SEPARATORS).next().unwrap_or(local.as_str());
        self.lists
            .role_keywords
            .iter()
            .any(|kw| local == *kw || first_word == kw)
    }

    pub fn check_disposable(&self, domain: &str) -> bool {
        matches_domain_list(domain, &self.lists.disposable_domains)
    }

    /// Domains that are never verified, such as reserved example domains
    pub fn check_unsupported(&self, domain: &str) -> bool {
        matches_domain_list(domain, &self.lists.unsupported_domains)
    }

    /// Infrastructure domain of an ISP or email service provider
    pub fn check_isp_esp_domain(&self, domain: &str) -> bool {
        matches_domain_list(domain, &self.lists.isp_esp_domains)
    }

    pub fn check_government_tld(&self, domain: &str) -> bool {
        matches_domain_list(domain, &self.lists.government_tlds)
    }

    /// Typo candidate for a domain before DNS suppression.
    ///
    /// The static table wins; otherwise the closest provider domain within
    /// the configured distance and similarity.
    pub fn find_typo_candidate(&self, domain: &str) -> Option<TypoMatch> {
        let domain = domain.to_lowercase();
        if let Some(fix) = self.lists.typo_domains.get(&domain) {
            return Some(TypoMatch {
                suggestion: fix.clone(),
                distance: levenshtein(&domain, fix),
                similarity: similarity(&domain, fix),
                from_list: true,
            });
        }

        let mut best: Option<TypoMatch> = None;
        for known in self.domains.provider_domains() {
            if known == domain {
                return None;
            }
            let distance = levenshtein(&domain, known);
            let score = similarity(&domain, known);
            if distance > self.typo.max_distance || score < self.typo.similarity_threshold {
                continue;
            }
            if best.as_ref().map_or(true, |b| score > b.similarity) {
                best = Some(TypoMatch {
                    suggestion: known.to_string(),
                    distance,
                    similarity: score,
                    from_list: false,
                });
            }
        }
        best
    }

    /// Typo verdict with suppression for domains that are real mail domains.
    ///
    /// A fuzzy candidate whose own name resolves and has MX records is only
    /// kept when it is nearly identical to the provider and the edit sits on
    /// the name part rather than the suffix.
    pub async fn detect_typo(&self, domain: &str) -> Option<TypoMatch> {
        let candidate = self.find_typo_candidate(domain)?;
        if candidate.from_list {
            return Some(candidate);
        }

        let resolves = self.domains.check_domain_validity(domain).await.valid;
        let has_mx = resolves
            && self
                .domains
                .get_mx_records(domain)
                .await
                .map(|records| !records.is_empty())
                .unwrap_or(false);
        if !has_mx {
            return Some(candidate);
        }

        let structural = self.is_structural_typo(domain, &candidate.suggestion);
        if candidate.similarity >= self.typo.strict_similarity && structural {
            Some(candidate)
        } else {
            debug!(
                domain = %domain,
                suggestion = %candidate.suggestion,
                similarity = candidate.similarity,
                "Typo suppressed for live mail domain"
            );
            None
        }
    }

    pub async fn check_typo_domain(&self, domain: &str) -> bool {
        self.detect_typo(domain).await.is_some()
    }

    /// Suggested domain when `domain` is a typo
    pub async fn get_typo_correction(&self, domain: &str) -> Option<String> {
        self.detect_typo(domain).await.map(|m| m.suggestion)
    }

    /// Single-character edit on the name part, or a close enough name part
    fn is_structural_typo(&self, domain: &str, known: &str) -> bool {
        let (base, known_base) = (base_name(domain), base_name(known));
        levenshtein(base, known_base) <= 1 || similarity(base, known_base) >= self.typo.base_similarity
    }
}

/// Exact match or subdomain of any list entry
fn matches_domain_list(domain: &str, list: &[String]) -> bool {
    let domain = domain.to_lowercase();
    list.iter().any(|entry| {
        let entry = entry.to_lowercase();
        domain == entry || domain.ends_with(&format!(".{}", entry))
    })
}

/// Domain without its last label
fn base_name(domain: &str) -> &str {
    domain.rsplit_once('.').map_or(domain, |(base, _)| base)
}

/// `1 - distance / longest length`
fn similarity(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f64 / longest as f64
}
