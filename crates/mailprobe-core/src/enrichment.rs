//! Gravatar and DMARC score bonuses
//!
//! Both lookups hit live services, so results are best effort: any failure
//! simply means no bonus.

use crate::cache::TtlCache;
use crate::dns::DnsResolver;
use mailprobe_common::config::EnrichmentConfig;
use mailprobe_common::types::EmailAddress;
use mailprobe_common::Config;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// DMARC policy action (p= tag)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmarcPolicy {
    None,
    Quarantine,
    Reject,
}

/// Signals found and the bonus they earn
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentBonus {
    pub gravatar: bool,
    pub dmarc: Option<DmarcPolicy>,
    /// Combined bonus, already capped
    pub points: u8,
}

impl EnrichmentBonus {
    /// Add the bonus to a score without passing 100
    pub fn apply(&self, score: u8) -> u8 {
        score.saturating_add(self.points).min(100)
    }
}

/// Gravatar/DMARC enricher
pub struct Enrichment {
    config: EnrichmentConfig,
    resolver: Arc<dyn DnsResolver>,
    http: Option<reqwest::Client>,
    dmarc_cache: TtlCache<Option<DmarcPolicy>>,
}

impl Enrichment {
    pub fn new(config: &Config, resolver: Arc<dyn DnsResolver>) -> Self {
        let enrichment = config.enrichment.clone();
        let http = if enrichment.gravatar_enabled {
            match reqwest::Client::builder()
                .timeout(Duration::from_millis(enrichment.timeout_ms))
                .build()
            {
                Ok(client) => Some(client),
                Err(e) => {
                    warn!("Failed to build HTTP client, Gravatar lookups disabled: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Self {
            config: enrichment,
            resolver,
            http,
            dmarc_cache: TtlCache::new(Duration::from_secs(config.dns.validity_cache_ttl_secs)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.gravatar_enabled || self.config.dmarc_enabled
    }

    /// Whether a Gravatar profile image exists for the address
    pub async fn has_gravatar(&self, address: &str) -> bool {
        let Some(client) = &self.http else {
            return false;
        };

        let url = format!(
            "{}/{}?d=404",
            self.config.gravatar_url.trim_end_matches('/'),
            gravatar_hash(address)
        );
        match client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Gravatar lookup failed: {}", e);
                false
            }
        }
    }

    /// Published DMARC policy of a domain, falling back to its
    /// organizational domain
    pub async fn dmarc_policy(&self, domain: &str) -> Option<DmarcPolicy> {
        let domain = domain.to_lowercase();
        if let Some(policy) = self.dmarc_cache.get(&domain).await {
            return policy;
        }

        let mut policy = self.fetch_dmarc_policy(&domain).await;
        if policy.is_none() {
            if let Some(org) = organizational_domain(&domain).filter(|org| *org != domain) {
                policy = self.fetch_dmarc_policy(&org).await;
            }
        }

        self.dmarc_cache.insert(domain, policy).await;
        policy
    }

    async fn fetch_dmarc_policy(&self, domain: &str) -> Option<DmarcPolicy> {
        let name = format!("_dmarc.{}", domain);
        let records = match self.resolver.txt_lookup(&name).await {
            Ok(records) => records,
            Err(e) => {
                debug!(domain = %domain, "DMARC lookup failed: {}", e);
                return None;
            }
        };
        records.iter().find_map(|txt| parse_dmarc_policy(txt))
    }

    /// Bonus for an address; zero when both lookups are disabled
    pub async fn bonus(&self, email: &EmailAddress) -> EnrichmentBonus {
        let address = email.address();
        let (gravatar, dmarc) = tokio::join!(
            async {
                self.config.gravatar_enabled && self.has_gravatar(&address).await
            },
            async {
                if self.config.dmarc_enabled {
                    self.dmarc_policy(&email.domain).await
                } else {
                    None
                }
            }
        );

        let mut points: u16 = 0;
        if gravatar {
            points += u16::from(self.config.gravatar_bonus);
        }
        points += u16::from(match dmarc {
            Some(DmarcPolicy::Reject) => self.config.dmarc_reject_bonus,
            Some(DmarcPolicy::Quarantine) => self.config.dmarc_quarantine_bonus,
            Some(DmarcPolicy::None) => self.config.dmarc_none_bonus,
            None => 0,
        });
        let points = points.min(u16::from(self.config.max_bonus)) as u8;

        debug!(domain = %email.domain, gravatar, ?dmarc, points, "Enrichment bonus");
        EnrichmentBonus {
            gravatar,
            dmarc,
            points,
        }
    }
}

/// Hex SHA-256 of the trimmed, lowercased address
pub fn gravatar_hash(address: &str) -> String {
    hex::encode(Sha256::digest(address.trim().to_lowercase().as_bytes()))
}

/// Policy of a `v=DMARC1` record; `None` for anything else
fn parse_dmarc_policy(txt: &str) -> Option<DmarcPolicy> {
    let tags = parse_tags(txt);
    if !tags.get("v").is_some_and(|v| v.eq_ignore_ascii_case("DMARC1")) {
        return None;
    }
    tags.get("p").and_then(|p| parse_policy(p))
}

fn parse_tags(txt: &str) -> HashMap<String, String> {
    txt.split(';')
        .filter_map(|part| part.split_once('='))
        .map(|(name, value)| (name.trim().to_lowercase(), value.trim().to_string()))
        .collect()
}

fn parse_policy(s: &str) -> Option<DmarcPolicy> {
    match s.to_lowercase().as_str() {
        "none" => Some(DmarcPolicy::None),
        "quarantine" => Some(DmarcPolicy::Quarantine),
        "reject" => Some(DmarcPolicy::Reject),
        _ => None,
    }
}

/// Last two labels; a public suffix list would be more precise
fn organizational_domain(domain: &str) -> Option<String> {
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() >= 2 {
        Some(labels[labels.len() - 2..].join("."))
    } else {
        None
    }
}
