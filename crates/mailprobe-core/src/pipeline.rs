//! Verification pipeline
//!
//! [`Verifier`] runs one address through a fixed sequence of stages. Each
//! stage either lets the address continue or settles it; the first stage
//! that settles the address decides its status.

use crate::address::AddressParser;
use crate::classify::{ClassifyInput, ResultClassifier};
use crate::dns::{DnsResolver, TrustDnsResolver};
use crate::domain::DomainIntelligence;
use crate::enrichment::Enrichment;
use crate::rate_limiter::RateLimiter;
use crate::risk::RiskSignals;
use crate::score::{ScoreContext, ScoreEngine};
use crate::smtp::{ProbeOutcome, SmtpProbe};
use mailprobe_common::config::ThresholdConfig;
use mailprobe_common::types::{
    EmailAddress, ExecutionMode, ProviderPolicy, VerificationChecks, VerificationMethod,
    VerificationResult, VerificationStatus,
};
use mailprobe_common::{Config, Error, Result};
use mailprobe_storage::{
    BlacklistRepository, MemoryBlacklistRepository, MemorySkipListRepository, SkipListRepository,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, field, info, info_span, warn, Instrument, Span};

/// Whether the pipeline goes on after a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Continue,
    Terminate,
}

/// Mutable state of one verification while the stages run
#[derive(Debug, Default)]
struct Draft {
    input: String,
    email: Option<EmailAddress>,
    checks: VerificationChecks,
    status: Option<VerificationStatus>,
    score: u8,
    error: Option<String>,
    method: Option<VerificationMethod>,
    confidence: Option<u8>,
    /// Explicit extra risk for the score (redirecting website)
    other: bool,
    trusted_provider: bool,
    smtp_rejected: bool,
    policy: Option<ProviderPolicy>,
}

impl Draft {
    fn new(input: &str) -> Self {
        Self {
            input: input.trim().to_string(),
            ..Default::default()
        }
    }

    fn domain(&self) -> &str {
        self.email.as_ref().map(|e| e.domain.as_str()).unwrap_or("")
    }

    /// Settle with a zero score
    fn reject(&mut self, status: VerificationStatus) -> Stage {
        self.score = 0;
        self.status = Some(status);
        Stage::Terminate
    }
}

/// Email verification pipeline
pub struct Verifier {
    domains: Arc<DomainIntelligence>,
    risk: RiskSignals,
    probe: SmtpProbe,
    scorer: ScoreEngine,
    classifier: ResultClassifier,
    enrichment: Enrichment,
    blacklist: Arc<dyn BlacklistRepository>,
    blacklist_reasons: HashMap<String, VerificationStatus>,
    thresholds: ThresholdConfig,
    smtp_enabled: bool,
}

impl Verifier {
    /// Verifier with the system resolver and in-memory stores
    pub fn new(config: &Config) -> Result<Self> {
        VerifierBuilder::new(config.clone()).build()
    }

    pub fn builder(config: Config) -> VerifierBuilder {
        VerifierBuilder::new(config)
    }

    /// Verify an address interactively. Never fails: every problem ends up in
    /// the returned result.
    pub async fn verify(&self, address: &str) -> VerificationResult {
        let started = Instant::now();
        match self.verify_with_mode(address, ExecutionMode::Interactive).await {
            Ok(result) => result,
            Err(e) => {
                let mut draft = Draft::new(address);
                draft.status = Some(VerificationStatus::Error);
                draft.error = Some(e.to_string());
                self.finish(draft, started)
            }
        }
    }

    /// Verify an address.
    ///
    /// In [`ExecutionMode::Retryable`] a rate-limited domain surfaces as
    /// [`Error::RateLimitExceeded`] so the caller can reschedule; nothing else
    /// is returned as an error.
    pub async fn verify_with_mode(&self, address: &str, mode: ExecutionMode) -> Result<VerificationResult> {
        let started = Instant::now();
        let span = info_span!("verify", domain = field::Empty);

        async move {
            let mut draft = Draft::new(address);
            match self.run(&mut draft, mode).await {
                Ok(()) => {}
                Err(e @ Error::RateLimitExceeded { .. }) if mode == ExecutionMode::Retryable => {
                    info!("Rate limited, caller should retry: {}", e);
                    return Err(e);
                }
                Err(e) => {
                    warn!("Verification failed: {}", e);
                    draft.status = Some(VerificationStatus::Error);
                    draft.error = Some(e.to_string());
                }
            }
            Ok(self.finish(draft, started))
        }
        .instrument(span)
        .await
    }

    async fn run(&self, draft: &mut Draft, mode: ExecutionMode) -> Result<()> {
        if self.parse(draft) == Stage::Terminate {
            return Ok(());
        }
        Span::current().record("domain", draft.domain());

        self.annotate(draft).await;
        if self.syntax(draft) == Stage::Terminate
            || self.blacklisted(draft).await == Stage::Terminate
            || self.risk_lists(draft).await == Stage::Terminate
            || self.domain_stage(draft).await == Stage::Terminate
            || self.provider(draft).await == Stage::Terminate
        {
            return Ok(());
        }

        draft.score = self.score(draft);
        debug!(score = draft.score, "Preliminary score");

        self.smtp(draft, mode).await?;
        self.final_status(draft);
        Ok(())
    }

    fn parse(&self, draft: &mut Draft) -> Stage {
        match AddressParser::split(&draft.input) {
            Ok(email) => {
                let counts = AddressParser::character_counts(&email.local_part);
                draft.checks.numerical_characters = counts.numerical;
                draft.checks.alphabetical_characters = counts.alphabetical;
                draft.checks.unicode_symbols = counts.unicode_symbols;
                draft.email = Some(email);
                Stage::Continue
            }
            Err(e) => {
                debug!("Unparsable address: {}", e);
                draft.error = Some(e.to_string());
                draft.reject(VerificationStatus::Invalid)
            }
        }
    }

    /// Alias and typo hints; these never stop the pipeline
    async fn annotate(&self, draft: &mut Draft) {
        draft.checks.alias_of = AddressParser::detect_alias(&draft.input);
        let domain = draft.domain().to_string();
        draft.checks.did_you_mean = self.risk.get_typo_correction(&domain).await;
    }

    fn syntax(&self, draft: &mut Draft) -> Stage {
        let valid = draft.email.as_ref().is_some_and(AddressParser::is_valid_syntax);
        draft.checks.syntax = valid;
        if valid {
            Stage::Continue
        } else {
            draft.reject(VerificationStatus::Invalid)
        }
    }

    async fn blacklisted(&self, draft: &mut Draft) -> Stage {
        let Some(email) = &draft.email else {
            return Stage::Continue;
        };
        match self.blacklist.find(&email.address(), &email.domain).await {
            Ok(Some(entry)) => {
                let status = self
                    .blacklist_reasons
                    .get(&entry.reason.to_lowercase())
                    .copied()
                    .unwrap_or(VerificationStatus::Blocked);
                info!(reason = %entry.reason, status = status.as_str(), "Address is blacklisted");
                draft.checks.blacklisted = true;
                draft.reject(status)
            }
            Ok(None) => Stage::Continue,
            Err(e) => {
                warn!("Blacklist lookup failed, continuing: {}", e);
                Stage::Continue
            }
        }
    }

    /// No-reply, typo, infrastructure, government, disposable, unsupported
    /// and role checks, in that order
    async fn risk_lists(&self, draft: &mut Draft) -> Stage {
        let Some(email) = draft.email.clone() else {
            return Stage::Continue;
        };
        let domain = email.domain.as_str();

        if self.risk.check_no_reply(&email.local_part) {
            draft.checks.no_reply = true;
            return draft.reject(VerificationStatus::Invalid);
        }

        if self.risk.check_typo_domain(domain).await {
            draft.checks.typo_domain = true;
            if !self.domain_valid(draft, domain).await {
                return draft.reject(VerificationStatus::Invalid);
            }
        }

        if self.risk.check_isp_esp_domain(domain) {
            draft.checks.isp_esp = true;
            return draft.reject(VerificationStatus::Invalid);
        }

        draft.checks.government_tld = self.risk.check_government_tld(domain);

        if self.risk.check_disposable(domain) {
            draft.checks.disposable = true;
            if !self.domain_valid(draft, domain).await {
                return draft.reject(VerificationStatus::Invalid);
            }
        }

        if self.risk.check_unsupported(domain) {
            debug!("Domain is not verified");
            return draft.reject(VerificationStatus::Skipped);
        }

        draft.checks.role = self.risk.check_role(&email.local_part);
        Stage::Continue
    }

    async fn domain_valid(&self, draft: &mut Draft, domain: &str) -> bool {
        let valid = self.domains.check_domain_validity(domain).await.valid;
        draft.checks.domain_validity = valid;
        valid
    }

    /// Domain validity, MX records, implicit MX, gateway and redirect flags
    async fn domain_stage(&self, draft: &mut Draft) -> Stage {
        let profile = self.domains.profile(draft.domain()).await;

        draft.checks.domain_validity = profile.dns_valid;
        if !profile.dns_valid {
            debug!("Domain does not resolve");
            return draft.reject(VerificationStatus::Invalid);
        }

        draft.checks.mx_record = !profile.mx_records.is_empty();
        draft.checks.implicit_mx = profile.implicit_mx;
        draft.checks.secure_gateway = profile.secure_gateway;
        draft.other = profile.redirects;

        if !draft.checks.mx_record {
            draft.score = self.score(draft);
            draft.status = Some(VerificationStatus::Invalid);
            debug!(implicit_mx = profile.implicit_mx, score = draft.score, "No MX records");
            return Stage::Terminate;
        }
        Stage::Continue
    }

    /// Public provider detection and the skip-SMTP policies
    async fn provider(&self, draft: &mut Draft) -> Stage {
        let Some(email) = draft.email.clone() else {
            return Stage::Continue;
        };
        let records = self.domains.get_mx_records(&email.domain).await.unwrap_or_default();
        let Some(found) = self.domains.is_public_provider(&email.domain, &records) else {
            return Stage::Continue;
        };

        draft.checks.free = true;
        // hosted domains on a provider's MX are probed like any other domain
        if !found.by_domain {
            return Stage::Continue;
        }
        let policy = found.provider.policy;
        draft.policy = Some(policy);
        if !policy.skips_smtp() {
            return Stage::Continue;
        }

        debug!(provider = %found.provider.name, ?policy, "Provider policy skips SMTP");
        draft.trusted_provider = true;
        let status = if policy == ProviderPolicy::SkipSmtpCatchAll {
            draft.checks.catch_all = true;
            VerificationStatus::CatchAll
        } else {
            VerificationStatus::Valid
        };
        draft.score = self.score(draft);
        draft.score = self.enrich(&email, draft.score).await;
        draft.status = Some(status);
        Stage::Terminate
    }

    async fn smtp(&self, draft: &mut Draft, mode: ExecutionMode) -> Result<()> {
        if !self.smtp_enabled {
            return Ok(());
        }
        if draft.checks.secure_gateway {
            debug!("MX is a filtering gateway, skipping SMTP");
            return Ok(());
        }
        let Some(email) = draft.email.clone() else {
            return Ok(());
        };

        let outcome = self.probe.probe(&email, draft.policy, mode).await?;
        self.apply_probe(draft, &email, outcome).await;
        Ok(())
    }

    async fn apply_probe(&self, draft: &mut Draft, email: &EmailAddress, outcome: ProbeOutcome) {
        debug!(
            mx_host = outcome.mx_host.as_deref().unwrap_or("-"),
            valid = outcome.valid,
            catch_all = outcome.catch_all,
            rejected = outcome.rejected,
            code = outcome.smtp_code,
            "SMTP outcome"
        );
        draft.method = outcome.verification_method;
        draft.confidence = outcome.confidence;
        draft.error = outcome.error;

        if outcome.catch_all {
            draft.checks.catch_all = true;
            draft.score = self.score(draft);
            draft.score = self.enrich(email, draft.score).await;
        } else if outcome.valid {
            draft.checks.smtp = true;
        } else if outcome.rejected {
            draft.smtp_rejected = true;
        } else if outcome.mailbox_full {
            draft.checks.mailbox_full = true;
            draft.score = self.score(draft);
        }
    }

    fn final_status(&self, draft: &mut Draft) {
        let status = if draft.checks.smtp {
            VerificationStatus::Valid
        } else if draft.smtp_rejected {
            draft.score = 0;
            VerificationStatus::Invalid
        } else if draft.checks.catch_all {
            VerificationStatus::CatchAll
        } else if draft.score >= self.thresholds.valid {
            VerificationStatus::Valid
        } else if draft.score >= self.thresholds.risky {
            VerificationStatus::Risky
        } else {
            VerificationStatus::Invalid
        };
        draft.status = Some(status);
    }

    fn score(&self, draft: &Draft) -> u8 {
        self.scorer.calculate(
            &draft.checks,
            &ScoreContext {
                domain: draft.domain(),
                other: draft.other,
            },
        )
    }

    async fn enrich(&self, email: &EmailAddress, score: u8) -> u8 {
        if !self.enrichment.is_enabled() {
            return score;
        }
        self.enrichment.bonus(email).await.apply(score)
    }

    fn finish(&self, draft: Draft, started: Instant) -> VerificationResult {
        let status = draft.status.unwrap_or(VerificationStatus::Unknown);
        let (state, result) = self.classifier.classify(&ClassifyInput {
            checks: &draft.checks,
            status,
            trusted_provider: draft.trusted_provider,
            smtp_rejected: draft.smtp_rejected,
            error: draft.error.as_deref(),
        });

        let email = draft.email.as_ref().map(|e| e.address()).unwrap_or(draft.input);
        info!(
            state = state.as_str(),
            result = result.map(|r| r.as_str()).unwrap_or("-"),
            status = status.as_str(),
            score = draft.score,
            "Verification finished"
        );

        VerificationResult {
            email,
            state,
            result,
            status,
            score: draft.score,
            checks: draft.checks,
            error: draft.error,
            duration_seconds: started.elapsed().as_secs_f64(),
            verification_method: draft.method,
            confidence: draft.confidence,
        }
    }
}

/// Wires a [`Verifier`] with optional injected collaborators
pub struct VerifierBuilder {
    config: Config,
    resolver: Option<Arc<dyn DnsResolver>>,
    skip_list: Option<Arc<dyn SkipListRepository>>,
    blacklist: Option<Arc<dyn BlacklistRepository>>,
    rate_limiter: Option<Arc<RateLimiter>>,
}

impl VerifierBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            resolver: None,
            skip_list: None,
            blacklist: None,
            rate_limiter: None,
        }
    }

    pub fn resolver(mut self, resolver: Arc<dyn DnsResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn skip_list(mut self, skip_list: Arc<dyn SkipListRepository>) -> Self {
        self.skip_list = Some(skip_list);
        self
    }

    pub fn blacklist(mut self, blacklist: Arc<dyn BlacklistRepository>) -> Self {
        self.blacklist = Some(blacklist);
        self
    }

    /// Share a limiter between verifiers
    pub fn rate_limiter(mut self, rate_limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = Some(rate_limiter);
        self
    }

    pub fn build(self) -> Result<Verifier> {
        let config = self.config;
        let resolver: Arc<dyn DnsResolver> = match self.resolver {
            Some(resolver) => resolver,
            None => Arc::new(TrustDnsResolver::new(&config.dns)?),
        };
        let skip_list = self
            .skip_list
            .unwrap_or_else(|| Arc::new(MemorySkipListRepository::new()));
        let blacklist = self
            .blacklist
            .unwrap_or_else(|| Arc::new(MemoryBlacklistRepository::new()));
        let rate_limiter = self
            .rate_limiter
            .unwrap_or_else(|| Arc::new(RateLimiter::new(config.rate_limit.clone())));

        let domains = Arc::new(DomainIntelligence::new(&config, resolver.clone(), skip_list.clone()));

        Ok(Verifier {
            risk: RiskSignals::new(&config, domains.clone()),
            probe: SmtpProbe::new(&config, domains.clone(), skip_list, rate_limiter),
            scorer: ScoreEngine::new(config.scoring.clone()),
            classifier: ResultClassifier,
            enrichment: Enrichment::new(&config, resolver),
            blacklist,
            blacklist_reasons: config
                .lists
                .blacklist_reasons
                .iter()
                .map(|(reason, status)| (reason.to_lowercase(), *status))
                .collect(),
            thresholds: config.thresholds.clone(),
            smtp_enabled: config.smtp.enabled,
            domains,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeResolver, FakeSmtpServer, SmtpScript};
    use mailprobe_common::types::{ResultCode, VerificationState};
    use pretty_assertions::assert_eq;

    const DOMAIN: &str = "acme.test";

    fn config(port: u16) -> Config {
        let mut config = Config::default();
        config.smtp.port = port;
        config.smtp.connect_timeout_ms = 1000;
        config.smtp.operation_timeout_ms = 1000;
        config.smtp.greylist_delay_ms = 10;
        config
    }

    fn verifier(config: Config, resolver: FakeResolver) -> Verifier {
        Verifier::builder(config)
            .resolver(Arc::new(resolver))
            .build()
            .unwrap()
    }

    fn local_verifier(port: u16) -> Verifier {
        verifier(config(port), FakeResolver::new().with_local_domain(DOMAIN))
    }

    #[tokio::test]
    async fn test_syntax_gate() {
        let v = local_verifier(1);
        for input in ["not-an-email", "jane..doe@acme.test", "@acme.test"] {
            let result = v.verify(input).await;
            assert_eq!(result.score, 0, "{}", input);
            assert_eq!(result.state, VerificationState::Undeliverable);
            assert_eq!(result.result, Some(ResultCode::SyntaxError));
        }
    }

    #[tokio::test]
    async fn test_catch_all_end_to_end() {
        let server = FakeSmtpServer::start(SmtpScript::default()).await;
        let v = local_verifier(server.port);

        let result = v.verify("jane.doe@acme.test").await;
        assert_eq!(result.status, VerificationStatus::CatchAll);
        assert_eq!(result.state, VerificationState::Risky);
        assert_eq!(result.result, Some(ResultCode::CatchAll));
        assert_eq!(result.score, 60);
        assert!(result.checks.catch_all);

        let targets = server.rcpt_targets();
        assert_eq!(targets.len(), 1);
        assert_ne!(targets[0], "jane.doe@acme.test");
    }

    #[tokio::test]
    async fn test_role_on_catch_all_domain_is_role() {
        let server = FakeSmtpServer::start(SmtpScript::default()).await;
        let v = local_verifier(server.port);

        let result = v.verify("sales@acme.test").await;
        assert!(result.checks.role);
        assert!(result.checks.catch_all);
        assert_eq!(result.state, VerificationState::Risky);
        assert_eq!(result.result, Some(ResultCode::Role));
    }

    #[tokio::test]
    async fn test_vrfy_rejection_end_to_end() {
        let script = SmtpScript {
            vrfy: "550 no such user".to_string(),
            ..SmtpScript::default()
        };
        let server = FakeSmtpServer::start(script).await;
        let v = local_verifier(server.port);

        let result = v.verify("jane.doe@acme.test").await;
        assert_eq!(result.state, VerificationState::Undeliverable);
        assert_eq!(result.result, Some(ResultCode::MailboxNotFound));
        assert_eq!(result.score, 0);
        assert_eq!(result.verification_method, Some(VerificationMethod::Vrfy));
        assert_eq!(result.confidence, Some(95));
        assert!(server.rcpt_targets().is_empty());
    }

    #[tokio::test]
    async fn test_rcpt_accepted_is_deliverable() {
        let server = FakeSmtpServer::start(SmtpScript::accepting(&["jane.doe@acme.test"])).await;
        let v = local_verifier(server.port);

        let result = v.verify("Jane.Doe@ACME.test").await;
        assert_eq!(result.email, "jane.doe@acme.test");
        assert_eq!(result.status, VerificationStatus::Valid);
        assert_eq!(result.state, VerificationState::Deliverable);
        assert_eq!(result.result, Some(ResultCode::Valid));
        assert_eq!(result.verification_method, Some(VerificationMethod::Rcpt));
        assert!(result.checks.smtp);
        assert_eq!(result.score, 100);
    }

    #[tokio::test]
    async fn test_idempotent_against_same_fixtures() {
        let server = FakeSmtpServer::start(SmtpScript::accepting(&["jane.doe@acme.test"])).await;
        let v = local_verifier(server.port);

        let mut first = v.verify("jane.doe@acme.test").await;
        let mut second = v.verify("jane.doe@acme.test").await;
        first.duration_seconds = 0.0;
        second.duration_seconds = 0.0;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_blacklist_reason_maps_status() {
        let blacklist = Arc::new(MemoryBlacklistRepository::new());
        blacklist.add("trap@acme.test", "spamtrap").await.unwrap();
        let v = Verifier::builder(config(1))
            .resolver(Arc::new(FakeResolver::new().with_local_domain(DOMAIN)))
            .blacklist(blacklist)
            .build()
            .unwrap();

        let result = v.verify("trap@acme.test").await;
        assert_eq!(result.status, VerificationStatus::Spamtrap);
        assert_eq!(result.state, VerificationState::Undeliverable);
        assert_eq!(result.result, Some(ResultCode::Blocked));
        assert_eq!(result.score, 0);
        assert!(result.checks.blacklisted);
    }

    #[tokio::test]
    async fn test_skip_smtp_provider_short_circuits() {
        let resolver = FakeResolver::new()
            .with_ip("gmail.com", "142.250.1.27")
            .with_mx("gmail.com", "gmail-smtp-in.l.google.com", 5);
        let v = verifier(config(1), resolver);

        let result = v.verify("janedoe@gmail.com").await;
        assert!(result.checks.free);
        assert!(!result.checks.smtp);
        assert_eq!(result.status, VerificationStatus::Valid);
        assert_eq!(result.state, VerificationState::Deliverable);
        assert_eq!(result.score, 95);
    }

    #[tokio::test]
    async fn test_no_reply_and_unsupported() {
        let v = local_verifier(1);

        let result = v.verify("no-reply@acme.test").await;
        assert!(result.checks.no_reply);
        assert_eq!(result.score, 0);
        assert_eq!(result.status, VerificationStatus::Invalid);

        let result = v.verify("jane.doe@example.com").await;
        assert_eq!(result.status, VerificationStatus::Skipped);
        assert_eq!(result.state, VerificationState::Unknown);
        assert_eq!(result.result, Some(ResultCode::Skipped));
    }

    #[tokio::test]
    async fn test_dead_domain_and_implicit_mx() {
        let v = local_verifier(1);
        let result = v.verify("jane.doe@nowhere.test").await;
        assert!(!result.checks.domain_validity);
        assert_eq!(result.score, 0);
        assert_eq!(result.state, VerificationState::Undeliverable);
        assert_eq!(result.result, Some(ResultCode::MailboxNotFound));

        let v = verifier(config(1), FakeResolver::new().with_ip("bare.test", "192.0.2.10"));
        let result = v.verify("jane.doe@bare.test").await;
        assert!(result.checks.implicit_mx);
        assert_eq!(result.score, 10);
        assert_eq!(result.status, VerificationStatus::Invalid);
    }

    #[tokio::test]
    async fn test_typo_domain_that_does_not_resolve() {
        let v = local_verifier(1);
        let result = v.verify("jane.doe@gmial.com").await;
        assert!(result.checks.typo_domain);
        assert_eq!(result.checks.did_you_mean.as_deref(), Some("gmail.com"));
        assert_eq!(result.score, 0);
        assert_eq!(result.result, Some(ResultCode::Typo));
    }

    #[tokio::test]
    async fn test_rate_limit_by_mode() {
        let server = FakeSmtpServer::start(SmtpScript::default()).await;
        let mut cfg = config(server.port);
        cfg.rate_limit.per_domain_limit = 1;
        let v = verifier(cfg, FakeResolver::new().with_local_domain(DOMAIN));

        v.verify("jane.doe@acme.test").await;

        let err = v
            .verify_with_mode("john.doe@acme.test", ExecutionMode::Retryable)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "RATE_LIMITED");
        assert!(err.retry_after().is_some());

        let result = v.verify("john.doe@acme.test").await;
        assert!(!result.checks.smtp);
        assert!(!result.checks.catch_all);
        assert!(result.error.is_some());
    }

    #[tokio::test]
    async fn test_secure_gateway_skips_smtp() {
        let resolver = FakeResolver::new()
            .with_ip("corp.test", "192.0.2.20")
            .with_mx("corp.test", "mx1.corp-test.pphosted.com", 10);
        let v = verifier(config(1), resolver);

        let result = v.verify("jane.doe@corp.test").await;
        assert!(result.checks.secure_gateway);
        assert!(!result.checks.smtp);
        assert_eq!(result.score, 100);
        assert_eq!(result.status, VerificationStatus::Valid);
        assert_eq!(result.error, None);
    }
}
