//! Domain intelligence: MX resolution, domain validity, provider catalog
//! and MX skip decisions

use crate::cache::TtlCache;
use crate::dns::DnsResolver;
use mailprobe_common::config::{DomainProbeConfig, ProviderEntry};
use mailprobe_common::types::{normalize_host, DomainProfile, MxRecord};
use mailprobe_common::{Config, Result};
use mailprobe_storage::SkipListRepository;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Length of the random local part used for catch-all probing
pub const RANDOM_MAILBOX_LEN: usize = 32;

/// Cached result of an A/AAAA check plus the optional website probe
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainValidity {
    pub valid: bool,
    /// Website redirects to a different host
    pub redirects: bool,
    /// Website answered; `None` when not probed
    pub reachable: Option<bool>,
}

/// Catalog hit for a domain
#[derive(Debug, Clone, Copy)]
pub struct ProviderMatch<'a> {
    pub provider: &'a ProviderEntry,
    /// Matched on the consumer domain itself rather than on an MX host
    pub by_domain: bool,
}

/// DNS-backed knowledge about domains and their mail exchangers
pub struct DomainIntelligence {
    resolver: Arc<dyn DnsResolver>,
    skip_list: Arc<dyn SkipListRepository>,
    mx_cache: TtlCache<Vec<MxRecord>>,
    validity_cache: TtlCache<DomainValidity>,
    providers: Vec<ProviderEntry>,
    manual_skip_hosts: Vec<String>,
    secure_gateway_patterns: Vec<String>,
    domain_probe: DomainProbeConfig,
    http: Option<reqwest::Client>,
}

impl DomainIntelligence {
    pub fn new(
        config: &Config,
        resolver: Arc<dyn DnsResolver>,
        skip_list: Arc<dyn SkipListRepository>,
    ) -> Self {
        let http = if config.domain_probe.enabled {
            match reqwest::Client::builder()
                .redirect(reqwest::redirect::Policy::none())
                .timeout(Duration::from_millis(config.domain_probe.timeout_ms))
                .build()
            {
                Ok(client) => Some(client),
                Err(e) => {
                    warn!("Failed to build HTTP client, website probes disabled: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Self {
            resolver,
            skip_list,
            mx_cache: TtlCache::new(Duration::from_secs(config.dns.mx_cache_ttl_secs)),
            validity_cache: TtlCache::new(Duration::from_secs(config.dns.validity_cache_ttl_secs)),
            providers: config.providers.clone(),
            manual_skip_hosts: config
                .skip_list
                .manual_hosts
                .iter()
                .map(|h| normalize_host(h))
                .collect(),
            secure_gateway_patterns: config
                .lists
                .secure_gateway_patterns
                .iter()
                .map(|p| p.to_lowercase())
                .collect(),
            domain_probe: config.domain_probe.clone(),
            http,
        }
    }

    /// MX records sorted by ascending priority.
    ///
    /// Successful answers, empty ones included, are cached. When the primary
    /// lookup fails the raw record query is tried before giving up.
    pub async fn get_mx_records(&self, domain: &str) -> Result<Vec<MxRecord>> {
        let domain = normalize_host(domain);
        if let Some(records) = self.mx_cache.get(&domain).await {
            return Ok(records);
        }

        let mut records = match self.resolver.mx_lookup(&domain).await {
            Ok(records) => records,
            Err(e) => {
                debug!(domain = %domain, "MX lookup failed, trying raw query: {}", e);
                self.resolver.raw_mx_lookup(&domain).await?
            }
        };
        records.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.host.cmp(&b.host)));
        records.dedup();

        self.mx_cache.insert(domain, records.clone()).await;
        Ok(records)
    }

    /// A/AAAA check of a domain. Any resolver failure counts as invalid.
    pub async fn check_domain_validity(&self, domain: &str) -> DomainValidity {
        let domain = normalize_host(domain);
        if let Some(validity) = self.validity_cache.get(&domain).await {
            return validity;
        }

        let valid = match self.resolver.ip_lookup(&domain).await {
            Ok(addrs) => addrs.iter().any(|ip| !ip.is_unspecified()),
            Err(e) => {
                debug!(domain = %domain, "Domain resolution failed: {}", e);
                false
            }
        };

        let mut validity = DomainValidity {
            valid,
            ..Default::default()
        };
        if valid {
            if let Some(client) = &self.http {
                self.probe_website(client, &domain, &mut validity).await;
            }
        }

        self.validity_cache.insert(domain, validity.clone()).await;
        validity
    }

    async fn probe_website(&self, client: &reqwest::Client, domain: &str, validity: &mut DomainValidity) {
        let url = format!("http://{}/", domain);
        match client.get(&url).send().await {
            Ok(response) => {
                validity.reachable = Some(true);
                if self.domain_probe.check_redirect && response.status().is_redirection() {
                    let target = response
                        .headers()
                        .get(reqwest::header::LOCATION)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|location| reqwest::Url::parse(location).ok())
                        .and_then(|url| url.host_str().map(normalize_host));
                    if let Some(target) = target {
                        let same_site = target == domain || target == format!("www.{}", domain);
                        if !same_site {
                            debug!(domain = %domain, target = %target, "Website redirects off-domain");
                            validity.redirects = true;
                        }
                    }
                }
            }
            Err(e) => {
                validity.reachable = Some(false);
                if self.domain_probe.check_availability {
                    debug!(domain = %domain, "Website unavailable: {}", e);
                }
            }
        }
    }

    /// Catalog entry for a domain, by exact domain or MX host substring
    pub fn is_public_provider(&self, domain: &str, mx_records: &[MxRecord]) -> Option<ProviderMatch<'_>> {
        let domain = normalize_host(domain);
        if let Some(provider) = self
            .providers
            .iter()
            .find(|p| p.domains.iter().any(|d| d.eq_ignore_ascii_case(&domain)))
        {
            return Some(ProviderMatch {
                provider,
                by_domain: true,
            });
        }

        self.providers
            .iter()
            .find(|p| {
                mx_records.iter().any(|mx| {
                    p.mx_patterns
                        .iter()
                        .any(|pattern| mx.host.contains(&pattern.to_lowercase()))
                })
            })
            .map(|provider| ProviderMatch {
                provider,
                by_domain: false,
            })
    }

    /// Every consumer domain in the provider catalog
    pub fn provider_domains(&self) -> impl Iterator<Item = &str> {
        self.providers
            .iter()
            .flat_map(|p| p.domains.iter().map(String::as_str))
    }

    /// True for manually excluded hosts (exact or suffix match) and hosts
    /// with an active skip-list entry
    pub async fn should_skip_mx_server(&self, host: &str) -> bool {
        let host = normalize_host(host);
        let manual = self
            .manual_skip_hosts
            .iter()
            .any(|m| host == *m || host.ends_with(&format!(".{}", m)));
        if manual {
            return true;
        }

        match self.skip_list.is_active(&host).await {
            Ok(active) => active,
            Err(e) => {
                warn!(mx_host = %host, "Skip-list lookup failed: {}", e);
                false
            }
        }
    }

    /// Whether any MX host belongs to a filtering gateway
    pub fn is_secure_gateway(&self, mx_records: &[MxRecord]) -> bool {
        mx_records.iter().any(|mx| {
            self.secure_gateway_patterns
                .iter()
                .any(|pattern| mx.host.contains(pattern.as_str()))
        })
    }

    /// Random address at `domain` that almost certainly does not exist
    pub fn generate_random_mailbox(domain: &str) -> String {
        let local: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(RANDOM_MAILBOX_LEN)
            .map(|b| (b as char).to_ascii_lowercase())
            .collect();
        format!("{}@{}", local, domain)
    }

    /// Gather everything known about a domain before SMTP.
    ///
    /// MX failures degrade to "no MX" here; the caller decides what that means.
    pub async fn profile(&self, domain: &str) -> DomainProfile {
        let domain = normalize_host(domain);
        let validity = self.check_domain_validity(&domain).await;
        let mx_records = match self.get_mx_records(&domain).await {
            Ok(records) => records,
            Err(e) => {
                warn!(domain = %domain, "MX resolution failed: {}", e);
                Vec::new()
            }
        };

        let provider = self.is_public_provider(&domain, &mx_records);
        let implicit_mx = mx_records.is_empty() && validity.valid;
        let secure_gateway = self.is_secure_gateway(&mx_records);

        DomainProfile {
            is_public_provider: provider.is_some(),
            provider_policy: provider.map(|m| m.provider.policy),
            dns_valid: validity.valid,
            implicit_mx,
            secure_gateway,
            redirects: validity.redirects,
            mx_records,
            domain,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeResolver;
    use mailprobe_common::types::ProviderPolicy;
    use mailprobe_storage::models::UpsertSkipListEntry;
    use mailprobe_storage::MemorySkipListRepository;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::Ordering;

    fn intelligence(resolver: FakeResolver, config: &Config) -> (DomainIntelligence, Arc<FakeResolver>) {
        let resolver = Arc::new(resolver);
        let intel = DomainIntelligence::new(
            config,
            resolver.clone(),
            Arc::new(MemorySkipListRepository::new()),
        );
        (intel, resolver)
    }

    #[tokio::test]
    async fn test_mx_records_sorted_and_cached() {
        let resolver = FakeResolver::new()
            .with_mx("acme.test", "mx2.acme.test", 20)
            .with_mx("acme.test", "MX1.acme.test.", 10);
        let (intel, resolver) = intelligence(resolver, &Config::default());

        let records = intel.get_mx_records("ACME.test").await.unwrap();
        assert_eq!(
            records,
            vec![
                MxRecord::new("mx1.acme.test", 10),
                MxRecord::new("mx2.acme.test", 20)
            ]
        );

        intel.get_mx_records("acme.test").await.unwrap();
        assert_eq!(resolver.mx_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_mx_falls_back_to_raw_query() {
        let resolver = FakeResolver::new()
            .with_mx("flaky.test", "mx.flaky.test", 5)
            .failing_mx("flaky.test");
        let (intel, _) = intelligence(resolver, &Config::default());

        let records = intel.get_mx_records("flaky.test").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].host, "mx.flaky.test");
    }

    #[tokio::test]
    async fn test_domain_validity_fails_closed() {
        let resolver = FakeResolver::new()
            .with_ip("ok.test", "192.0.2.1")
            .with_ip("zero.test", "0.0.0.0")
            .failing_ip("broken.test");
        let (intel, _) = intelligence(resolver, &Config::default());

        assert!(intel.check_domain_validity("ok.test").await.valid);
        assert!(!intel.check_domain_validity("zero.test").await.valid);
        assert!(!intel.check_domain_validity("broken.test").await.valid);
        assert!(!intel.check_domain_validity("missing.test").await.valid);
    }

    #[tokio::test]
    async fn test_public_provider_by_domain_and_mx() {
        let (intel, _) = intelligence(FakeResolver::new(), &Config::default());

        let hit = intel.is_public_provider("gmail.com", &[]).unwrap();
        assert_eq!(hit.provider.name, "google");
        assert!(hit.by_domain);

        let mx = vec![MxRecord::new("aspmx.l.google.com", 1)];
        let hit = intel.is_public_provider("corp.test", &mx).unwrap();
        assert_eq!(hit.provider.policy, ProviderPolicy::SkipSmtpValid);
        assert!(!hit.by_domain);

        assert!(intel.is_public_provider("corp.test", &[]).is_none());
    }

    #[tokio::test]
    async fn test_should_skip_manual_and_active_entries() {
        let mut config = Config::default();
        config.skip_list.manual_hosts = vec!["blocked.test".to_string()];
        let skip_list = Arc::new(MemorySkipListRepository::new());
        let intel = DomainIntelligence::new(&config, Arc::new(FakeResolver::new()), skip_list.clone());

        assert!(intel.should_skip_mx_server("blocked.test").await);
        assert!(intel.should_skip_mx_server("mx1.Blocked.test.").await);
        assert!(!intel.should_skip_mx_server("notblocked.test").await);

        skip_list
            .upsert(UpsertSkipListEntry::new("mx.bad.test", "handshake failed").expires_in_days(1))
            .await
            .unwrap();
        assert!(intel.should_skip_mx_server("MX.BAD.TEST").await);
    }

    #[test]
    fn test_random_mailbox_shape() {
        let address = DomainIntelligence::generate_random_mailbox("acme.test");
        let (local, domain) = address.split_once('@').unwrap();
        assert_eq!(domain, "acme.test");
        assert_eq!(local.len(), RANDOM_MAILBOX_LEN);
        assert!(local
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
        assert_ne!(address, DomainIntelligence::generate_random_mailbox("acme.test"));
    }

    #[tokio::test]
    async fn test_profile_implicit_mx_and_gateway() {
        let resolver = FakeResolver::new()
            .with_ip("bare.test", "192.0.2.7")
            .with_ip("guarded.test", "192.0.2.8")
            .with_mx("guarded.test", "mx0a-001.pphosted.com", 10);
        let (intel, _) = intelligence(resolver, &Config::default());

        let bare = intel.profile("bare.test").await;
        assert!(bare.dns_valid);
        assert!(bare.implicit_mx);
        assert!(bare.mx_records.is_empty());

        let guarded = intel.profile("guarded.test").await;
        assert!(guarded.secure_gateway);
        assert!(!guarded.implicit_mx);
        assert!(!guarded.is_public_provider);
    }
}
