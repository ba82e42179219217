//! DNS resolution
//!
//! [`DnsResolver`] is the seam the verifier resolves through; the production
//! implementation wraps the trust-dns async resolver.

use async_trait::async_trait;
use mailprobe_common::config::DnsConfig;
use mailprobe_common::types::MxRecord;
use mailprobe_common::{Error, Result};
use std::net::IpAddr;
use std::time::Duration;
use tracing::{debug, info, warn};
use trust_dns_resolver::config::{ResolverConfig, ResolverOpts};
use trust_dns_resolver::error::{ResolveError, ResolveErrorKind};
use trust_dns_resolver::proto::rr::{RData, RecordType};
use trust_dns_resolver::TokioAsyncResolver;

/// DNS lookups used by the verification pipeline.
///
/// Lookups that succeed with no records return an empty list; `Err` is
/// reserved for resolver failures.
#[async_trait]
pub trait DnsResolver: Send + Sync {
    /// MX records of a domain, in any order
    async fn mx_lookup(&self, domain: &str) -> Result<Vec<MxRecord>>;

    /// MX records through a generic record query, used when `mx_lookup` fails
    async fn raw_mx_lookup(&self, domain: &str) -> Result<Vec<MxRecord>> {
        self.mx_lookup(domain).await
    }

    /// A and AAAA addresses of a host
    async fn ip_lookup(&self, host: &str) -> Result<Vec<IpAddr>>;

    /// TXT strings published at a name
    async fn txt_lookup(&self, name: &str) -> Result<Vec<String>>;
}

/// trust-dns backed resolver
pub struct TrustDnsResolver {
    resolver: TokioAsyncResolver,
}

impl TrustDnsResolver {
    /// Build a resolver from configuration
    pub fn new(config: &DnsConfig) -> Result<Self> {
        let resolver = if config.use_system_config {
            let (resolver_config, mut opts) = trust_dns_resolver::system_conf::read_system_conf()
                .map_err(|e| Error::Dns(format!("Failed to read system resolver config: {}", e)))?;
            apply_opts(&mut opts, config);
            TokioAsyncResolver::tokio(resolver_config, opts)
        } else {
            let mut opts = ResolverOpts::default();
            apply_opts(&mut opts, config);
            TokioAsyncResolver::tokio(ResolverConfig::default(), opts)
        };

        info!(
            timeout_ms = config.timeout_ms,
            attempts = config.attempts,
            system = config.use_system_config,
            "DNS resolver initialized"
        );

        Ok(Self { resolver })
    }
}

fn apply_opts(opts: &mut ResolverOpts, config: &DnsConfig) {
    opts.timeout = Duration::from_millis(config.timeout_ms);
    opts.attempts = config.attempts;
}

/// Query names are made fully qualified so search domains are never appended
fn fqdn(name: &str) -> String {
    if name.ends_with('.') {
        name.to_string()
    } else {
        format!("{}.", name)
    }
}

fn is_no_records(e: &ResolveError) -> bool {
    matches!(e.kind(), ResolveErrorKind::NoRecordsFound { .. })
}

#[async_trait]
impl DnsResolver for TrustDnsResolver {
    async fn mx_lookup(&self, domain: &str) -> Result<Vec<MxRecord>> {
        match self.resolver.mx_lookup(fqdn(domain)).await {
            Ok(lookup) => Ok(lookup
                .iter()
                .map(|mx| MxRecord::new(mx.exchange().to_string(), mx.preference()))
                .collect()),
            Err(e) if is_no_records(&e) => {
                debug!("No MX records for {}", domain);
                Ok(Vec::new())
            }
            Err(e) => Err(Error::Dns(format!("MX lookup failed for {}: {}", domain, e))),
        }
    }

    async fn raw_mx_lookup(&self, domain: &str) -> Result<Vec<MxRecord>> {
        match self.resolver.lookup(fqdn(domain), RecordType::MX).await {
            Ok(lookup) => Ok(lookup
                .iter()
                .filter_map(|rdata| match rdata {
                    RData::MX(mx) => Some(MxRecord::new(mx.exchange().to_string(), mx.preference())),
                    _ => None,
                })
                .collect()),
            Err(e) if is_no_records(&e) => Ok(Vec::new()),
            Err(e) => Err(Error::Dns(format!("raw MX query failed for {}: {}", domain, e))),
        }
    }

    async fn ip_lookup(&self, host: &str) -> Result<Vec<IpAddr>> {
        match self.resolver.lookup_ip(fqdn(host)).await {
            Ok(lookup) => Ok(lookup.iter().collect()),
            Err(e) if is_no_records(&e) => Ok(Vec::new()),
            Err(e) => {
                warn!("Address lookup failed for {}: {}", host, e);
                Err(Error::Dns(format!("address lookup failed for {}: {}", host, e)))
            }
        }
    }

    async fn txt_lookup(&self, name: &str) -> Result<Vec<String>> {
        match self.resolver.txt_lookup(fqdn(name)).await {
            Ok(lookup) => Ok(lookup
                .iter()
                .map(|record| {
                    record
                        .txt_data()
                        .iter()
                        .map(|d| String::from_utf8_lossy(d))
                        .collect::<String>()
                })
                .collect()),
            Err(e) if is_no_records(&e) => Ok(Vec::new()),
            Err(e) => Err(Error::Dns(format!("TXT lookup failed for {}: {}", name, e))),
        }
    }
}
