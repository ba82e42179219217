//! Common types for mailprobe

use serde::{Deserialize, Serialize};

/// Parsed email address, both parts lowercased
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmailAddress {
    pub local_part: String,
    pub domain: String,
}

impl EmailAddress {
    /// Create a new email address
    pub fn new(local_part: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            local_part: local_part.into(),
            domain: domain.into(),
        }
    }

    /// Get the full email address as a string
    pub fn address(&self) -> String {
        format!("{}@{}", self.local_part, self.domain)
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.local_part, self.domain)
    }
}

/// Mail exchanger record. Lower priority means higher precedence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MxRecord {
    pub host: String,
    pub priority: u16,
}

impl MxRecord {
    pub fn new(host: impl Into<String>, priority: u16) -> Self {
        Self {
            host: normalize_host(&host.into()),
            priority,
        }
    }
}

/// Lowercase a host name and strip the trailing root dot
pub fn normalize_host(host: &str) -> String {
    host.trim().trim_end_matches('.').to_lowercase()
}

/// How a public mailbox provider is handled by the SMTP stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderPolicy {
    /// Probe normally
    Verify,
    /// Provider accepts every recipient; treat as catch-all without dialing
    AssumeCatchAll,
    /// Skip SMTP entirely and report the address valid
    SkipSmtpValid,
    /// Skip SMTP entirely and report the address catch-all
    SkipSmtpCatchAll,
}

impl ProviderPolicy {
    /// Whether the orchestrator should short-circuit before probing
    pub fn skips_smtp(&self) -> bool {
        matches!(
            self,
            ProviderPolicy::SkipSmtpValid | ProviderPolicy::SkipSmtpCatchAll
        )
    }
}

/// Everything known about a domain before SMTP probing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainProfile {
    pub domain: String,
    pub dns_valid: bool,
    pub mx_records: Vec<MxRecord>,
    pub is_public_provider: bool,
    pub provider_policy: Option<ProviderPolicy>,
    /// No MX records, but the domain resolves to an address
    pub implicit_mx: bool,
    /// MX points at a filtering gateway that accepts every recipient
    pub secure_gateway: bool,
    /// Website redirects to another host (only when HTTP probes are enabled)
    pub redirects: bool,
}

/// Deliverability state reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationState {
    Deliverable,
    Undeliverable,
    Risky,
    Unknown,
    Error,
}

impl VerificationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationState::Deliverable => "deliverable",
            VerificationState::Undeliverable => "undeliverable",
            VerificationState::Risky => "risky",
            VerificationState::Unknown => "unknown",
            VerificationState::Error => "error",
        }
    }
}

/// Reason code attached to a state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultCode {
    Valid,
    SyntaxError,
    Typo,
    Disposable,
    Blocked,
    MailboxFull,
    Role,
    CatchAll,
    MailboxNotFound,
    Invalid,
    LowQuality,
    Skipped,
    Error,
}

impl ResultCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultCode::Valid => "valid",
            ResultCode::SyntaxError => "syntax_error",
            ResultCode::Typo => "typo",
            ResultCode::Disposable => "disposable",
            ResultCode::Blocked => "blocked",
            ResultCode::MailboxFull => "mailbox_full",
            ResultCode::Role => "role",
            ResultCode::CatchAll => "catch_all",
            ResultCode::MailboxNotFound => "mailbox_not_found",
            ResultCode::Invalid => "invalid",
            ResultCode::LowQuality => "low_quality",
            ResultCode::Skipped => "skipped",
            ResultCode::Error => "error",
        }
    }
}

/// Older single-field status, still consumed by some callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Valid,
    Invalid,
    Risky,
    CatchAll,
    Unknown,
    Skipped,
    Error,
    Blocked,
    Spamtrap,
    Abuse,
    DoNotMail,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Valid => "valid",
            VerificationStatus::Invalid => "invalid",
            VerificationStatus::Risky => "risky",
            VerificationStatus::CatchAll => "catch_all",
            VerificationStatus::Unknown => "unknown",
            VerificationStatus::Skipped => "skipped",
            VerificationStatus::Error => "error",
            VerificationStatus::Blocked => "blocked",
            VerificationStatus::Spamtrap => "spamtrap",
            VerificationStatus::Abuse => "abuse",
            VerificationStatus::DoNotMail => "do_not_mail",
        }
    }

    /// Statuses produced by a blacklist hit
    pub fn is_blocked(&self) -> bool {
        matches!(
            self,
            VerificationStatus::Blocked
                | VerificationStatus::Spamtrap
                | VerificationStatus::Abuse
                | VerificationStatus::DoNotMail
        )
    }
}

/// SMTP command that produced a definite mailbox answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationMethod {
    Vrfy,
    Expn,
    Rcpt,
}

impl VerificationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationMethod::Vrfy => "vrfy",
            VerificationMethod::Expn => "expn",
            VerificationMethod::Rcpt => "rcpt",
        }
    }
}

/// Whether the caller can reschedule the verification later
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Answer now; a rate-limited SMTP stage is silently skipped
    #[default]
    Interactive,
    /// Queued job; a rate-limited SMTP stage surfaces `RateLimitExceeded`
    Retryable,
}

/// Flags gathered while verifying one address
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerificationChecks {
    pub syntax: bool,
    pub domain_validity: bool,
    pub mx_record: bool,
    pub implicit_mx: bool,
    pub smtp: bool,
    pub disposable: bool,
    pub role: bool,
    pub no_reply: bool,
    pub typo_domain: bool,
    pub isp_esp: bool,
    pub government_tld: bool,
    pub mailbox_full: bool,
    pub free: bool,
    pub catch_all: bool,
    pub blacklisted: bool,
    pub secure_gateway: bool,
    pub alias_of: Option<String>,
    pub did_you_mean: Option<String>,
    pub numerical_characters: u32,
    pub alphabetical_characters: u32,
    pub unicode_symbols: u32,
}

/// Outcome of verifying one address. Built once per call and never mutated
/// after it is returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub email: String,
    pub state: VerificationState,
    pub result: Option<ResultCode>,
    pub status: VerificationStatus,
    pub score: u8,
    pub checks: VerificationChecks,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_method: Option<VerificationMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_mx_record_normalizes_host() {
        let mx = MxRecord::new("MX1.Example.COM.", 10);
        assert_eq!(mx.host, "mx1.example.com");
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&VerificationStatus::DoNotMail).unwrap();
        assert_eq!(json, "\"do_not_mail\"");
        let status: VerificationStatus = serde_json::from_str("\"catch_all\"").unwrap();
        assert_eq!(status, VerificationStatus::CatchAll);
    }

    #[test]
    fn test_blocked_statuses() {
        assert!(VerificationStatus::Spamtrap.is_blocked());
        assert!(!VerificationStatus::Invalid.is_blocked());
    }

    #[test]
    fn test_result_serializes_codes() {
        let result = VerificationResult {
            email: "a@b.com".into(),
            state: VerificationState::Undeliverable,
            result: Some(ResultCode::SyntaxError),
            status: VerificationStatus::Invalid,
            score: 0,
            checks: VerificationChecks::default(),
            error: None,
            duration_seconds: 0.0,
            verification_method: None,
            confidence: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["state"], "undeliverable");
        assert_eq!(json["result"], "syntax_error");
        assert!(json.get("error").is_none());
    }
}
