//! Configuration for mailprobe

use crate::types::{ProviderPolicy, VerificationStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Environment variable prefix for overrides, e.g. `MAILPROBE__SMTP__PORT=2525`
pub const ENV_PREFIX: &str = "MAILPROBE";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Database configuration. Stores are kept in memory when absent.
    #[serde(default)]
    pub database: Option<DatabaseConfig>,

    /// DNS resolver and cache configuration
    #[serde(default)]
    pub dns: DnsConfig,

    /// SMTP probe configuration
    #[serde(default)]
    pub smtp: SmtpConfig,

    /// Per-domain and global probe rate limits
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// MX skip-list configuration
    #[serde(default)]
    pub skip_list: SkipListConfig,

    /// Typo-domain detection parameters
    #[serde(default)]
    pub typo: TypoConfig,

    /// Score multipliers
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Status thresholds
    #[serde(default)]
    pub thresholds: ThresholdConfig,

    /// Keyword and domain lists
    #[serde(default)]
    pub lists: ListsConfig,

    /// Public mailbox provider catalog
    #[serde(default = "default_providers")]
    pub providers: Vec<ProviderEntry>,

    /// Gravatar and DMARC score bonuses
    #[serde(default)]
    pub enrichment: EnrichmentConfig,

    /// HTTP redirect/availability probes of the domain website
    #[serde(default)]
    pub domain_probe: DomainProbeConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            database: None,
            dns: DnsConfig::default(),
            smtp: SmtpConfig::default(),
            rate_limit: RateLimitConfig::default(),
            skip_list: SkipListConfig::default(),
            typo: TypoConfig::default(),
            scoring: ScoringConfig::default(),
            thresholds: ThresholdConfig::default(),
            lists: ListsConfig::default(),
            providers: default_providers(),
            enrichment: EnrichmentConfig::default(),
            domain_probe: DomainProbeConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "json" or "text"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// DNS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsConfig {
    /// Per-query timeout in milliseconds
    #[serde(default = "default_dns_timeout")]
    pub timeout_ms: u64,

    /// Query attempts before giving up
    #[serde(default = "default_dns_attempts")]
    pub attempts: usize,

    /// MX record cache TTL in seconds
    #[serde(default = "default_cache_ttl")]
    pub mx_cache_ttl_secs: u64,

    /// A/AAAA validity cache TTL in seconds
    #[serde(default = "default_cache_ttl")]
    pub validity_cache_ttl_secs: u64,

    /// Use /etc/resolv.conf instead of the resolver defaults
    #[serde(default = "default_true")]
    pub use_system_config: bool,
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_dns_timeout(),
            attempts: default_dns_attempts(),
            mx_cache_ttl_secs: default_cache_ttl(),
            validity_cache_ttl_secs: default_cache_ttl(),
            use_system_config: true,
        }
    }
}

fn default_dns_timeout() -> u64 {
    2000
}

fn default_dns_attempts() -> usize {
    2
}

fn default_cache_ttl() -> u64 {
    3600
}

fn default_true() -> bool {
    true
}

/// SMTP probe configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    /// Run the SMTP stage at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Port dialed on each MX host
    #[serde(default = "default_smtp_port")]
    pub port: u16,

    /// Name announced in EHLO and used as the MAIL FROM domain
    #[serde(default = "default_helo_hostname")]
    pub helo_hostname: String,

    /// Local part of the MAIL FROM address
    #[serde(default = "default_mail_from_local")]
    pub mail_from_local: String,

    /// Connect timeout in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// Per-command read/write timeout in milliseconds
    #[serde(default = "default_operation_timeout")]
    pub operation_timeout_ms: u64,

    /// Extra sequential connect attempts per host after the concurrent race fails
    #[serde(default = "default_connect_retries")]
    pub connect_retries: u32,

    /// Hosts dialed in parallel in the first connect round
    #[serde(default = "default_concurrent_dial")]
    pub concurrent_dial: usize,

    /// Probe for catch-all (VRFY/EXPN, then a random recipient)
    #[serde(default = "default_true")]
    pub catch_all_detection: bool,

    /// Try VRFY before catch-all probing
    #[serde(default = "default_true")]
    pub use_vrfy: bool,

    /// Try EXPN when VRFY is inconclusive
    #[serde(default = "default_true")]
    pub use_expn: bool,

    /// Retry once on a 45x greylisting reply
    #[serde(default = "default_true")]
    pub greylist_retry: bool,

    /// Delay before the greylisting retry in milliseconds
    #[serde(default = "default_greylist_delay")]
    pub greylist_delay_ms: u64,

    /// Maximum EHLO continuation lines read before giving up
    #[serde(default = "default_max_reply_lines")]
    pub max_reply_lines: usize,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_smtp_port(),
            helo_hostname: default_helo_hostname(),
            mail_from_local: default_mail_from_local(),
            connect_timeout_ms: default_connect_timeout(),
            operation_timeout_ms: default_operation_timeout(),
            connect_retries: default_connect_retries(),
            concurrent_dial: default_concurrent_dial(),
            catch_all_detection: true,
            use_vrfy: true,
            use_expn: true,
            greylist_retry: true,
            greylist_delay_ms: default_greylist_delay(),
            max_reply_lines: default_max_reply_lines(),
        }
    }
}

impl SmtpConfig {
    /// Envelope sender used for MAIL FROM
    pub fn mail_from(&self) -> String {
        format!("{}@{}", self.mail_from_local, self.helo_hostname)
    }
}

fn default_smtp_port() -> u16 {
    25
}

fn default_helo_hostname() -> String {
    "localhost".to_string()
}

fn default_mail_from_local() -> String {
    "probe".to_string()
}

fn default_connect_timeout() -> u64 {
    3000
}

fn default_operation_timeout() -> u64 {
    6000
}

fn default_connect_retries() -> u32 {
    1
}

fn default_concurrent_dial() -> usize {
    3
}

fn default_greylist_delay() -> u64 {
    5000
}

fn default_max_reply_lines() -> usize {
    64
}

/// Rate limit configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Enable rate limiting
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// SMTP checks allowed per domain within the window
    #[serde(default = "default_per_domain_limit")]
    pub per_domain_limit: u32,

    /// Sliding window length in seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Optional cap across all domains within `global_window_secs`
    #[serde(default)]
    pub global_limit: Option<u32>,

    /// Global sliding window length in seconds
    #[serde(default = "default_window_secs")]
    pub global_window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            per_domain_limit: default_per_domain_limit(),
            window_secs: default_window_secs(),
            global_limit: None,
            global_window_secs: default_window_secs(),
        }
    }
}

fn default_per_domain_limit() -> u32 {
    20
}

fn default_window_secs() -> u64 {
    60
}

/// MX skip-list configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkipListConfig {
    /// Hosts never probed; matched exactly or as a suffix
    #[serde(default)]
    pub manual_hosts: Vec<String>,

    /// Expiry of the first automatic entry for a host, in days
    #[serde(default = "default_auto_expiry_days")]
    pub auto_expiry_days: i64,

    /// Upper bound for the doubling expiry
    #[serde(default = "default_max_expiry_days")]
    pub max_expiry_days: i64,

    /// Skip-list hosts that cannot be reached at all
    #[serde(default = "default_true")]
    pub escalate_on_connect_failure: bool,
}

impl Default for SkipListConfig {
    fn default() -> Self {
        Self {
            manual_hosts: Vec::new(),
            auto_expiry_days: default_auto_expiry_days(),
            max_expiry_days: default_max_expiry_days(),
            escalate_on_connect_failure: true,
        }
    }
}

fn default_auto_expiry_days() -> i64 {
    1
}

fn default_max_expiry_days() -> i64 {
    30
}

/// Typo-domain detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypoConfig {
    /// Maximum Levenshtein distance for a fuzzy candidate
    #[serde(default = "default_max_distance")]
    pub max_distance: usize,

    /// Minimum similarity (1 - distance / max_len) for a fuzzy candidate
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,

    /// Similarity required to flag a domain that resolves and has MX
    #[serde(default = "default_strict_similarity")]
    pub strict_similarity: f64,

    /// Base-domain similarity accepted as a structural typo pattern
    #[serde(default = "default_base_similarity")]
    pub base_similarity: f64,
}

impl Default for TypoConfig {
    fn default() -> Self {
        Self {
            max_distance: default_max_distance(),
            similarity_threshold: default_similarity_threshold(),
            strict_similarity: default_strict_similarity(),
            base_similarity: default_base_similarity(),
        }
    }
}

fn default_max_distance() -> usize {
    2
}

fn default_similarity_threshold() -> f64 {
    0.85
}

fn default_strict_similarity() -> f64 {
    0.95
}

fn default_base_similarity() -> f64 {
    0.80
}

/// Score multiplier table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Per-domain multipliers applied first
    #[serde(default = "default_domain_multipliers")]
    pub domain_multipliers: HashMap<String, f64>,

    #[serde(default = "default_free_multiplier")]
    pub free: f64,

    #[serde(default = "default_penalty_multiplier")]
    pub disposable: f64,

    #[serde(default = "default_penalty_multiplier")]
    pub typo_domain: f64,

    #[serde(default = "default_role_multiplier")]
    pub role: f64,

    #[serde(default = "default_catch_all_multiplier")]
    pub catch_all: f64,

    #[serde(default = "default_mailbox_full_multiplier")]
    pub mailbox_full: f64,

    #[serde(default = "default_alias_multiplier")]
    pub alias: f64,

    /// Penalty per digit in the local part
    #[serde(default = "default_numeric_per_char")]
    pub numeric_per_char: f64,

    /// Floor of the digit penalty multiplier
    #[serde(default = "default_numeric_min")]
    pub numeric_min_multiplier: f64,

    /// Local parts with at most this many letters are penalized
    #[serde(default = "default_short_alpha_max")]
    pub short_alpha_max_letters: u32,

    #[serde(default = "default_short_alpha_multiplier")]
    pub short_alpha: f64,

    /// Flat multiplier for explicitly flagged risks
    #[serde(default = "default_other_multiplier")]
    pub other: f64,

    /// Fixed score for domains that only have an implicit MX
    #[serde(default = "default_implicit_mx_score")]
    pub implicit_mx_score: u8,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            domain_multipliers: default_domain_multipliers(),
            free: default_free_multiplier(),
            disposable: default_penalty_multiplier(),
            typo_domain: default_penalty_multiplier(),
            role: default_role_multiplier(),
            catch_all: default_catch_all_multiplier(),
            mailbox_full: default_mailbox_full_multiplier(),
            alias: default_alias_multiplier(),
            numeric_per_char: default_numeric_per_char(),
            numeric_min_multiplier: default_numeric_min(),
            short_alpha_max_letters: default_short_alpha_max(),
            short_alpha: default_short_alpha_multiplier(),
            other: default_other_multiplier(),
            implicit_mx_score: default_implicit_mx_score(),
        }
    }
}

fn default_domain_multipliers() -> HashMap<String, f64> {
    [
        ("yahoo.com", 0.9),
        ("aol.com", 0.9),
        ("hotmail.com", 0.9),
        ("mail.ru", 0.9),
    ]
    .into_iter()
    .map(|(domain, multiplier)| (domain.to_string(), multiplier))
    .collect()
}

fn default_free_multiplier() -> f64 {
    0.95
}

fn default_penalty_multiplier() -> f64 {
    0.05
}

fn default_role_multiplier() -> f64 {
    0.7
}

fn default_catch_all_multiplier() -> f64 {
    0.6
}

fn default_mailbox_full_multiplier() -> f64 {
    0.5
}

fn default_alias_multiplier() -> f64 {
    0.95
}

fn default_numeric_per_char() -> f64 {
    0.02
}

fn default_numeric_min() -> f64 {
    0.8
}

fn default_short_alpha_max() -> u32 {
    4
}

fn default_short_alpha_multiplier() -> f64 {
    0.9
}

fn default_other_multiplier() -> f64 {
    0.8
}

fn default_implicit_mx_score() -> u8 {
    10
}

/// Score thresholds for the final status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdConfig {
    #[serde(default = "default_valid_threshold")]
    pub valid: u8,

    #[serde(default = "default_risky_threshold")]
    pub risky: u8,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            valid: default_valid_threshold(),
            risky: default_risky_threshold(),
        }
    }
}

fn default_valid_threshold() -> u8 {
    85
}

fn default_risky_threshold() -> u8 {
    70
}

/// Static keyword and domain tables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListsConfig {
    #[serde(default = "default_role_keywords")]
    pub role_keywords: Vec<String>,

    #[serde(default = "default_no_reply_keywords")]
    pub no_reply_keywords: Vec<String>,

    /// Known typo domain -> intended domain
    #[serde(default = "default_typo_domains")]
    pub typo_domains: HashMap<String, String>,

    #[serde(default = "default_isp_esp_domains")]
    pub isp_esp_domains: Vec<String>,

    #[serde(default = "default_government_tlds")]
    pub government_tlds: Vec<String>,

    #[serde(default = "default_disposable_domains")]
    pub disposable_domains: Vec<String>,

    /// Domains that are never verified
    #[serde(default = "default_unsupported_domains")]
    pub unsupported_domains: Vec<String>,

    /// SMTP reply fragments that mean the prober itself is blocked
    #[serde(default = "default_blocking_patterns")]
    pub blocking_patterns: Vec<String>,

    #[serde(default = "default_mailbox_full_phrases")]
    pub mailbox_full_phrases: Vec<String>,

    #[serde(default = "default_secure_gateway_patterns")]
    pub secure_gateway_patterns: Vec<String>,

    /// Blacklist reason -> reported status
    #[serde(default = "default_blacklist_reasons")]
    pub blacklist_reasons: HashMap<String, VerificationStatus>,
}

impl Default for ListsConfig {
    fn default() -> Self {
        Self {
            role_keywords: default_role_keywords(),
            no_reply_keywords: default_no_reply_keywords(),
            typo_domains: default_typo_domains(),
            isp_esp_domains: default_isp_esp_domains(),
            government_tlds: default_government_tlds(),
            disposable_domains: default_disposable_domains(),
            unsupported_domains: default_unsupported_domains(),
            blocking_patterns: default_blocking_patterns(),
            mailbox_full_phrases: default_mailbox_full_phrases(),
            secure_gateway_patterns: default_secure_gateway_patterns(),
            blacklist_reasons: default_blacklist_reasons(),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_role_keywords() -> Vec<String> {
    strings(&[
        "admin",
        "administrator",
        "info",
        "support",
        "sales",
        "contact",
        "billing",
        "help",
        "office",
        "hr",
        "jobs",
        "careers",
        "marketing",
        "team",
        "webmaster",
        "postmaster",
        "hostmaster",
        "abuse",
        "security",
        "privacy",
        "legal",
        "accounts",
        "enquiries",
        "feedback",
        "press",
        "service",
    ])
}

fn default_no_reply_keywords() -> Vec<String> {
    strings(&[
        "no-reply",
        "noreply",
        "do-not-reply",
        "donotreply",
        "test",
        "devnull",
        "mailer-daemon",
        "bounce",
    ])
}

fn default_typo_domains() -> HashMap<String, String> {
    [
        ("gmial.com", "gmail.com"),
        ("gamil.com", "gmail.com"),
        ("gmai.com", "gmail.com"),
        ("gmal.com", "gmail.com"),
        ("gnail.com", "gmail.com"),
        ("gmail.con", "gmail.com"),
        ("gmail.cm", "gmail.com"),
        ("gmail.co", "gmail.com"),
        ("hotmail.co", "hotmail.com"),
        ("yahoo.co", "yahoo.com"),
        ("hotmial.com", "hotmail.com"),
        ("hotmal.com", "hotmail.com"),
        ("hotmai.com", "hotmail.com"),
        ("yaho.com", "yahoo.com"),
        ("yahooo.com", "yahoo.com"),
        ("outlok.com", "outlook.com"),
        ("iclod.com", "icloud.com"),
    ]
    .into_iter()
    .map(|(typo, fix)| (typo.to_string(), fix.to_string()))
    .collect()
}

fn default_isp_esp_domains() -> Vec<String> {
    strings(&[
        "sendgrid.net",
        "mailgun.org",
        "amazonses.com",
        "mandrillapp.com",
        "sparkpostmail.com",
        "mcsv.net",
        "rsgsv.net",
        "mcdlv.net",
        "createsend.com",
        "cmail19.com",
        "cmail20.com",
        "exacttarget.com",
        "mktomail.com",
        "hubspotemail.net",
        "bounces.google.com",
    ])
}

fn default_government_tlds() -> Vec<String> {
    strings(&[
        "gov", "mil", "gov.uk", "gouv.fr", "gov.au", "gc.ca", "gov.in", "go.jp", "gov.br",
        "gob.mx", "gov.cn", "gov.za",
    ])
}

fn default_disposable_domains() -> Vec<String> {
    strings(&[
        "mailinator.com",
        "guerrillamail.com",
        "10minutemail.com",
        "tempmail.com",
        "temp-mail.org",
        "yopmail.com",
        "trashmail.com",
        "sharklasers.com",
        "getnada.com",
        "dispostable.com",
        "maildrop.cc",
        "throwawaymail.com",
        "fakeinbox.com",
        "mintemail.com",
        "mohmal.com",
    ])
}

fn default_unsupported_domains() -> Vec<String> {
    strings(&["example.com", "example.org", "example.net", "localhost", "invalid"])
}

fn default_blocking_patterns() -> Vec<String> {
    strings(&[
        "administrative prohibition",
        "550 5.7.1",
        "554 5.7.1",
        "spamhaus",
        "blocked",
        "blacklisted",
        "access denied",
        "poor reputation",
        "too many connections",
    ])
}

fn default_mailbox_full_phrases() -> Vec<String> {
    strings(&[
        "mailbox full",
        "mailbox is full",
        "quota exceeded",
        "over quota",
        "overquota",
        "insufficient storage",
        "exceeded storage",
    ])
}

fn default_secure_gateway_patterns() -> Vec<String> {
    strings(&[
        "pphosted.com",
        "ppe-hosted.com",
        "mimecast.com",
        "barracudanetworks.com",
        "messagelabs.com",
        "iphmx.com",
        "mailcontrol.com",
        "sophos.com",
        "fireeyecloud.com",
        "trendmicro",
    ])
}

fn default_blacklist_reasons() -> HashMap<String, VerificationStatus> {
    [
        ("spamtrap", VerificationStatus::Spamtrap),
        ("spam_trap", VerificationStatus::Spamtrap),
        ("abuse", VerificationStatus::Abuse),
        ("complainer", VerificationStatus::Abuse),
        ("do_not_mail", VerificationStatus::DoNotMail),
        ("unsubscribed", VerificationStatus::DoNotMail),
        ("blocked", VerificationStatus::Blocked),
    ]
    .into_iter()
    .map(|(reason, status)| (reason.to_string(), status))
    .collect()
}

/// Public mailbox provider catalog entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderEntry {
    pub name: String,

    /// Consumer domains, matched exactly
    #[serde(default)]
    pub domains: Vec<String>,

    /// Substrings of MX hosts operated by the provider
    #[serde(default)]
    pub mx_patterns: Vec<String>,

    pub policy: ProviderPolicy,
}

fn provider(name: &str, domains: &[&str], mx_patterns: &[&str], policy: ProviderPolicy) -> ProviderEntry {
    ProviderEntry {
        name: name.to_string(),
        domains: strings(domains),
        mx_patterns: strings(mx_patterns),
        policy,
    }
}

fn default_providers() -> Vec<ProviderEntry> {
    vec![
        provider(
            "google",
            &["gmail.com", "googlemail.com"],
            &["google.com", "googlemail.com"],
            ProviderPolicy::SkipSmtpValid,
        ),
        provider(
            "microsoft",
            &["outlook.com", "hotmail.com", "live.com", "msn.com", "hotmail.co.uk"],
            &["protection.outlook.com", "hotmail.com"],
            ProviderPolicy::SkipSmtpValid,
        ),
        provider(
            "yahoo",
            &["yahoo.com", "ymail.com", "rocketmail.com", "yahoo.co.uk", "aol.com"],
            &["yahoodns.net"],
            ProviderPolicy::AssumeCatchAll,
        ),
        provider(
            "apple",
            &["icloud.com", "me.com", "mac.com"],
            &["mail.icloud.com"],
            ProviderPolicy::SkipSmtpValid,
        ),
        provider(
            "proton",
            &["protonmail.com", "proton.me", "pm.me"],
            &["protonmail.ch"],
            ProviderPolicy::Verify,
        ),
        provider(
            "gmx",
            &["gmx.com", "gmx.de", "gmx.net", "web.de"],
            &["gmx.net", "web.de"],
            ProviderPolicy::Verify,
        ),
        provider(
            "yandex",
            &["yandex.ru", "yandex.com"],
            &["yandex.net"],
            ProviderPolicy::Verify,
        ),
        provider(
            "zoho",
            &["zoho.com", "zohomail.com"],
            &["zoho.com"],
            ProviderPolicy::Verify,
        ),
        provider(
            "fastmail",
            &["fastmail.com"],
            &["messagingengine.com"],
            ProviderPolicy::Verify,
        ),
        provider(
            "mailru",
            &["mail.ru", "inbox.ru", "list.ru", "bk.ru"],
            &["mail.ru"],
            ProviderPolicy::Verify,
        ),
    ]
}

/// Gravatar/DMARC enrichment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    #[serde(default)]
    pub gravatar_enabled: bool,

    #[serde(default)]
    pub dmarc_enabled: bool,

    #[serde(default = "default_gravatar_url")]
    pub gravatar_url: String,

    #[serde(default = "default_gravatar_bonus")]
    pub gravatar_bonus: u8,

    #[serde(default = "default_dmarc_reject_bonus")]
    pub dmarc_reject_bonus: u8,

    #[serde(default = "default_dmarc_quarantine_bonus")]
    pub dmarc_quarantine_bonus: u8,

    #[serde(default = "default_dmarc_none_bonus")]
    pub dmarc_none_bonus: u8,

    /// Cap on the combined bonus
    #[serde(default = "default_max_bonus")]
    pub max_bonus: u8,

    /// HTTP timeout in milliseconds
    #[serde(default = "default_http_timeout")]
    pub timeout_ms: u64,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            gravatar_enabled: false,
            dmarc_enabled: false,
            gravatar_url: default_gravatar_url(),
            gravatar_bonus: default_gravatar_bonus(),
            dmarc_reject_bonus: default_dmarc_reject_bonus(),
            dmarc_quarantine_bonus: default_dmarc_quarantine_bonus(),
            dmarc_none_bonus: default_dmarc_none_bonus(),
            max_bonus: default_max_bonus(),
            timeout_ms: default_http_timeout(),
        }
    }
}

fn default_gravatar_url() -> String {
    "https://www.gravatar.com/avatar".to_string()
}

fn default_gravatar_bonus() -> u8 {
    10
}

fn default_dmarc_reject_bonus() -> u8 {
    5
}

fn default_dmarc_quarantine_bonus() -> u8 {
    3
}

fn default_dmarc_none_bonus() -> u8 {
    1
}

fn default_max_bonus() -> u8 {
    15
}

fn default_http_timeout() -> u64 {
    3000
}

/// Website probes of the address domain. They never decide deliverability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainProbeConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Flag domains whose website redirects to another host
    #[serde(default = "default_true")]
    pub check_redirect: bool,

    /// Log domains whose website does not answer
    #[serde(default = "default_true")]
    pub check_availability: bool,

    #[serde(default = "default_http_timeout")]
    pub timeout_ms: u64,
}

impl Default for DomainProbeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            check_redirect: true,
            check_availability: true,
            timeout_ms: default_http_timeout(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Load configuration from an optional file plus `MAILPROBE__*` environment overrides
    pub fn load(path: Option<&Path>) -> crate::Result<Self> {
        let file = match path {
            Some(path) => {
                if !path.exists() {
                    return Err(crate::Error::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                Some(path.to_path_buf())
            }
            None => Self::default_paths().into_iter().find(|p| p.exists()),
        };

        let mut builder = config::Config::builder();
        if let Some(file) = &file {
            tracing::debug!(path = %file.display(), "Loading configuration file");
            builder = builder.add_source(config::File::from(file.as_path()));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__"),
        );

        builder
            .build()
            .and_then(|settings| settings.try_deserialize::<Config>())
            .map_err(|e| crate::Error::Config(format!("Failed to load config: {}", e)))
    }

    fn default_paths() -> Vec<PathBuf> {
        vec![
            PathBuf::from("./mailprobe.toml"),
            PathBuf::from("/etc/mailprobe/config.toml"),
        ]
    }
}
