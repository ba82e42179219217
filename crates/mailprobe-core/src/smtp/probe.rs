//! SMTP mailbox probe
//!
//! Dials the domain's mail exchangers, runs EHLO / MAIL FROM, asks VRFY and
//! EXPN, checks for catch-all with a random recipient and finally issues
//! RCPT TO for the real address. No message is ever sent.

use super::reply::{ReplyPatterns, SmtpReply};
use super::session::{SessionConfig, SmtpSession};
use crate::domain::DomainIntelligence;
use crate::rate_limiter::RateLimiter;
use mailprobe_common::config::{SkipListConfig, SmtpConfig};
use mailprobe_common::types::{EmailAddress, ExecutionMode, ProviderPolicy, VerificationMethod};
use mailprobe_common::{Config, Error, Result};
use mailprobe_storage::{SkipListRepository, UpsertSkipListEntry};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

const VRFY_CONFIDENCE: u8 = 95;
const EXPN_CONFIDENCE: u8 = 90;

/// Outcome of probing one address
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbeOutcome {
    /// The server accepted the mailbox
    pub valid: bool,
    /// The server accepts any recipient; `valid` is meaningless then
    pub catch_all: bool,
    pub mailbox_full: bool,
    /// The server definitely rejected the mailbox
    pub rejected: bool,
    pub verification_method: Option<VerificationMethod>,
    pub confidence: Option<u8>,
    pub error: Option<String>,
    /// A connection was made and the conversation started
    pub attempted: bool,
    /// SMTP was skipped because the domain hit its rate limit
    pub rate_limited: bool,
    pub mx_host: Option<String>,
    /// Code of the last reply that decided the outcome
    pub smtp_code: Option<u16>,
}

impl ProbeOutcome {
    fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            error: Some(reason.into()),
            ..Default::default()
        }
    }
}

/// RCPT TO verdict for the real address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RcptVerdict {
    Accepted,
    Greylisted,
    MailboxFull,
    Rejected,
    /// The prober itself is refused; the host should be skip-listed
    Blocked,
    Inconclusive,
}

/// Answer to VRFY or EXPN
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lookup {
    Exists,
    Absent,
    Inconclusive,
}

/// A conversation that ended without a verdict
struct SessionFailure {
    reason: &'static str,
    message: String,
    reply: Option<SmtpReply>,
    escalate: bool,
}

impl SessionFailure {
    fn from_reply(reason: &'static str, reply: SmtpReply, escalate: bool) -> Self {
        Self {
            reason,
            message: format!("{}: {}", reason, reply),
            reply: Some(reply),
            escalate,
        }
    }
}

impl From<Error> for SessionFailure {
    fn from(e: Error) -> Self {
        let reason = if e.is_network() {
            "timeout or connection failure"
        } else {
            "protocol error"
        };
        Self {
            reason,
            message: e.to_string(),
            reply: None,
            escalate: true,
        }
    }
}

/// Days an automatic skip-list entry lives after its `failure_count`-th
/// failure: doubling from `base_days`, capped at `max_days`
pub fn skip_list_expiry_days(failure_count: u32, base_days: i64, max_days: i64) -> i64 {
    let doublings = failure_count.saturating_sub(1).min(32);
    base_days
        .max(1)
        .saturating_mul(1_i64 << doublings)
        .min(max_days.max(1))
}

/// SMTP prober
pub struct SmtpProbe {
    smtp: SmtpConfig,
    skip: SkipListConfig,
    session: SessionConfig,
    blocking_patterns: ReplyPatterns,
    mailbox_full_phrases: ReplyPatterns,
    domains: Arc<DomainIntelligence>,
    skip_list: Arc<dyn SkipListRepository>,
    rate_limiter: Arc<RateLimiter>,
}

impl SmtpProbe {
    pub fn new(
        config: &Config,
        domains: Arc<DomainIntelligence>,
        skip_list: Arc<dyn SkipListRepository>,
        rate_limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            session: SessionConfig::from(&config.smtp),
            smtp: config.smtp.clone(),
            skip: config.skip_list.clone(),
            blocking_patterns: ReplyPatterns::new(&config.lists.blocking_patterns),
            mailbox_full_phrases: ReplyPatterns::new(&config.lists.mailbox_full_phrases),
            domains,
            skip_list,
            rate_limiter,
        }
    }

    /// Probe one address.
    ///
    /// Only a rate-limited domain in [`ExecutionMode::Retryable`] produces an
    /// error; every other failure is folded into the outcome.
    pub async fn probe(
        &self,
        email: &EmailAddress,
        policy: Option<ProviderPolicy>,
        mode: ExecutionMode,
    ) -> Result<ProbeOutcome> {
        if policy == Some(ProviderPolicy::AssumeCatchAll) {
            debug!(domain = %email.domain, "Provider accepts all recipients, not dialing");
            return Ok(ProbeOutcome {
                catch_all: true,
                ..Default::default()
            });
        }

        if let Err(e) = self.rate_limiter.try_acquire(&email.domain).await {
            return match mode {
                ExecutionMode::Retryable => Err(e),
                ExecutionMode::Interactive => {
                    info!(domain = %email.domain, "Rate limited, skipping SMTP stage");
                    Ok(ProbeOutcome {
                        rate_limited: true,
                        ..ProbeOutcome::unavailable(e.to_string())
                    })
                }
            };
        }

        let records = match self.domains.get_mx_records(&email.domain).await {
            Ok(records) => records,
            Err(e) => return Ok(ProbeOutcome::unavailable(e.to_string())),
        };

        let mut hosts = Vec::with_capacity(records.len());
        for record in records {
            if self.domains.should_skip_mx_server(&record.host).await {
                debug!(mx_host = %record.host, "MX host is skip-listed");
            } else {
                hosts.push(record.host);
            }
        }
        if hosts.is_empty() {
            return Ok(ProbeOutcome::unavailable("no MX host available for probing"));
        }

        let Some(mut session) = self.dial(&hosts).await else {
            return Ok(ProbeOutcome::unavailable("could not connect to any MX host"));
        };

        let host = session.host().to_string();
        let result = self.converse(&mut session, email).await;
        session.quit().await;

        let mut outcome = match result {
            Ok(outcome) => outcome,
            Err(failure) => {
                warn!(mx_host = %host, domain = %email.domain, "SMTP probe failed: {}", failure.message);
                if failure.escalate {
                    self.escalate(&host, failure.reason, failure.reply.as_ref().map(|r| r.to_string()))
                        .await;
                }
                ProbeOutcome {
                    smtp_code: failure.reply.as_ref().map(|r| r.code),
                    ..ProbeOutcome::unavailable(failure.message)
                }
            }
        };
        outcome.attempted = true;
        outcome.mx_host = Some(host);
        Ok(outcome)
    }

    /// Race the first hosts, then walk all of them one by one in priority
    /// order. Hosts seen failing before a winner is adopted are escalated.
    async fn dial(&self, hosts: &[String]) -> Option<SmtpSession> {
        let width = self.smtp.concurrent_dial.clamp(1, hosts.len());
        let mut race = JoinSet::new();
        for host in &hosts[..width] {
            let host = host.clone();
            let config = self.session.clone();
            race.spawn(async move {
                let result = SmtpSession::connect(&host, &config).await;
                (host, result)
            });
        }

        let mut failed: Vec<(String, _)> = Vec::new();
        while let Some(joined) = race.join_next().await {
            match joined {
                Ok((_, Ok(session))) => {
                    race.abort_all();
                    for (host, error) in failed {
                        self.connect_failed(&host, Some(error)).await;
                    }
                    return Some(session);
                }
                Ok((host, Err(e))) => {
                    debug!(mx_host = %host, "Concurrent dial failed: {}", e);
                    failed.push((host, e));
                }
                Err(e) => warn!("Dial task failed: {}", e),
            }
        }

        for host in hosts {
            let mut last_error = None;
            for attempt in 1..=self.smtp.connect_retries.max(1) {
                match SmtpSession::connect(host, &self.session).await {
                    Ok(session) => return Some(session),
                    Err(e) => {
                        debug!(mx_host = %host, attempt, "Dial failed: {}", e);
                        last_error = Some(e);
                    }
                }
            }
            self.connect_failed(host, last_error).await;
        }
        None
    }

    async fn connect_failed(&self, host: &str, error: Option<Error>) {
        if self.skip.escalate_on_connect_failure {
            self.escalate(host, "connection failed", error.map(|e| e.to_string()))
                .await;
        }
    }

    async fn converse(
        &self,
        session: &mut SmtpSession,
        email: &EmailAddress,
    ) -> std::result::Result<ProbeOutcome, SessionFailure> {
        self.handshake(session).await?;
        let address = email.address();

        if self.smtp.catch_all_detection {
            if self.smtp.use_vrfy {
                let reply = session.command(&format!("VRFY <{}>", address)).await?;
                if let Some(outcome) = lookup_outcome(vrfy_lookup(&reply), VerificationMethod::Vrfy, VRFY_CONFIDENCE, &reply) {
                    return Ok(outcome);
                }
            }
            if self.smtp.use_expn {
                let reply = session.command(&format!("EXPN <{}>", address)).await?;
                if let Some(outcome) = lookup_outcome(expn_lookup(&reply), VerificationMethod::Expn, EXPN_CONFIDENCE, &reply) {
                    return Ok(outcome);
                }
            }

            let random = DomainIntelligence::generate_random_mailbox(&email.domain);
            let reply = session.command(&format!("RCPT TO:<{}>", random)).await?;
            if self.blocking_patterns.matches(&reply) {
                return Err(SessionFailure::from_reply("blocked", reply, true));
            }
            if reply.code != 550 {
                debug!(domain = %email.domain, code = reply.code, "Random recipient accepted, domain is catch-all");
                return Ok(ProbeOutcome {
                    catch_all: true,
                    smtp_code: Some(reply.code),
                    ..Default::default()
                });
            }
        }

        let mut reply = session.command(&format!("RCPT TO:<{}>", address)).await?;
        let mut verdict = self.classify_rcpt(&reply);
        if verdict == RcptVerdict::Greylisted && self.smtp.greylist_retry {
            debug!(domain = %email.domain, "Greylisted, retrying once");
            tokio::time::sleep(Duration::from_millis(self.smtp.greylist_delay_ms)).await;
            reply = session.command(&format!("RCPT TO:<{}>", address)).await?;
            verdict = self.classify_rcpt(&reply);
        }

        let mut outcome = ProbeOutcome {
            smtp_code: Some(reply.code),
            ..Default::default()
        };
        match verdict {
            RcptVerdict::Accepted => {
                outcome.valid = true;
                outcome.verification_method = Some(VerificationMethod::Rcpt);
            }
            RcptVerdict::Rejected => {
                outcome.rejected = true;
                outcome.verification_method = Some(VerificationMethod::Rcpt);
            }
            RcptVerdict::MailboxFull => outcome.mailbox_full = true,
            RcptVerdict::Blocked => return Err(SessionFailure::from_reply("blocked", reply, true)),
            RcptVerdict::Greylisted => outcome.error = Some(format!("greylisted: {}", reply)),
            RcptVerdict::Inconclusive => outcome.error = Some(format!("inconclusive reply: {}", reply)),
        }
        Ok(outcome)
    }

    /// Greeting, EHLO (HELO fallback) and MAIL FROM
    async fn handshake(&self, session: &mut SmtpSession) -> std::result::Result<(), SessionFailure> {
        let greeting = session.read_reply().await?;
        if !greeting.is_positive() {
            return Err(self.handshake_failure(greeting));
        }

        let mut hello = session
            .command(&format!("EHLO {}", self.smtp.helo_hostname))
            .await?;
        if hello.is_permanent() {
            hello = session
                .command(&format!("HELO {}", self.smtp.helo_hostname))
                .await?;
        }
        if !hello.is_positive() {
            return Err(self.handshake_failure(hello));
        }

        let mail = session
            .command(&format!("MAIL FROM:<{}>", self.smtp.mail_from()))
            .await?;
        if !mail.is_positive() {
            return Err(self.handshake_failure(mail));
        }
        Ok(())
    }

    fn handshake_failure(&self, reply: SmtpReply) -> SessionFailure {
        let escalate = reply.is_permanent() || self.blocking_patterns.matches(&reply);
        SessionFailure::from_reply("handshake failed", reply, escalate)
    }

    /// Classify the reply to RCPT TO for the real address
    pub fn classify_rcpt(&self, reply: &SmtpReply) -> RcptVerdict {
        if reply.is_positive() {
            RcptVerdict::Accepted
        } else if self.blocking_patterns.matches(reply) {
            RcptVerdict::Blocked
        } else if reply.code == 552 || self.mailbox_full_phrases.matches(reply) {
            RcptVerdict::MailboxFull
        } else if matches!(reply.code, 450..=452) {
            RcptVerdict::Greylisted
        } else if reply.is_permanent() {
            RcptVerdict::Rejected
        } else {
            RcptVerdict::Inconclusive
        }
    }

    /// Record a failure against `host` with a doubling expiry
    async fn escalate(&self, host: &str, reason: &str, response: Option<String>) {
        let failures = match self.skip_list.get(host).await {
            Ok(Some(entry)) => u32::try_from(entry.failure_count).unwrap_or(0) + 1,
            Ok(None) => 1,
            Err(e) => {
                warn!(mx_host = %host, "Skip-list lookup failed: {}", e);
                1
            }
        };
        let days = skip_list_expiry_days(failures, self.skip.auto_expiry_days, self.skip.max_expiry_days);

        let mut input = UpsertSkipListEntry::new(host, reason).expires_in_days(days);
        if let Some(response) = response {
            input = input.with_response(response);
        }
        match self.skip_list.upsert(input).await {
            Ok(entry) => info!(
                mx_host = %host,
                reason,
                failures = entry.failure_count,
                expires_days = days,
                "MX host skip-listed"
            ),
            Err(e) => warn!(mx_host = %host, "Failed to skip-list host: {}", e),
        }
    }
}

fn vrfy_lookup(reply: &SmtpReply) -> Lookup {
    match reply.code {
        250 | 251 => Lookup::Exists,
        550 => Lookup::Absent,
        _ => Lookup::Inconclusive,
    }
}

fn expn_lookup(reply: &SmtpReply) -> Lookup {
    match reply.code {
        250 => Lookup::Exists,
        550 => Lookup::Absent,
        _ => Lookup::Inconclusive,
    }
}

fn lookup_outcome(
    lookup: Lookup,
    method: VerificationMethod,
    confidence: u8,
    reply: &SmtpReply,
) -> Option<ProbeOutcome> {
    let base = ProbeOutcome {
        verification_method: Some(method),
        confidence: Some(confidence),
        smtp_code: Some(reply.code),
        ..Default::default()
    };
    match lookup {
        Lookup::Exists => Some(ProbeOutcome { valid: true, ..base }),
        Lookup::Absent => Some(ProbeOutcome {
            rejected: true,
            ..base
        }),
        Lookup::Inconclusive => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{closed_port, FakeResolver, FakeSmtpServer, SmtpScript};
    use mailprobe_storage::MemorySkipListRepository;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const DOMAIN: &str = "acme.test";

    struct Harness {
        probe: SmtpProbe,
        skip_list: Arc<MemorySkipListRepository>,
    }

    fn harness(port: u16, tweak: impl FnOnce(&mut Config)) -> Harness {
        harness_with(FakeResolver::new().with_local_domain(DOMAIN), port, tweak)
    }

    fn harness_with(resolver: FakeResolver, port: u16, tweak: impl FnOnce(&mut Config)) -> Harness {
        let mut config = Config::default();
        config.smtp.port = port;
        config.smtp.connect_timeout_ms = 1000;
        config.smtp.operation_timeout_ms = 1000;
        config.smtp.greylist_delay_ms = 10;
        tweak(&mut config);

        let skip_list = Arc::new(MemorySkipListRepository::new());
        let domains = Arc::new(DomainIntelligence::new(
            &config,
            Arc::new(resolver),
            skip_list.clone(),
        ));
        let limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));
        Harness {
            probe: SmtpProbe::new(&config, domains, skip_list.clone(), limiter),
            skip_list,
        }
    }

    fn jane() -> EmailAddress {
        EmailAddress::new("jane", DOMAIN)
    }

    async fn run(h: &Harness) -> ProbeOutcome {
        h.probe
            .probe(&jane(), None, ExecutionMode::Interactive)
            .await
            .unwrap()
    }

    #[test]
    fn test_skip_list_expiry_doubles_and_caps() {
        let days: Vec<i64> = (1..=7).map(|n| skip_list_expiry_days(n, 1, 30)).collect();
        assert_eq!(days, vec![1, 2, 4, 8, 16, 30, 30]);
        assert_eq!(skip_list_expiry_days(0, 1, 30), 1);
        assert_eq!(skip_list_expiry_days(100, 2, 30), 30);
    }

    #[tokio::test]
    async fn test_catch_all_never_probes_real_address() {
        let server = FakeSmtpServer::start(SmtpScript::default()).await;
        let h = harness(server.port, |_| {});

        let outcome = run(&h).await;
        assert!(outcome.catch_all);
        assert!(!outcome.valid);
        assert!(outcome.attempted);

        let rcpts = server.rcpt_targets();
        assert_eq!(rcpts.len(), 1);
        assert_ne!(rcpts[0], "jane@acme.test");
        assert!(rcpts[0].ends_with("@acme.test"));
        assert!(server.received("QUIT"));
    }

    #[tokio::test]
    async fn test_eight_bit_banner_still_gets_a_verdict() {
        let script = SmtpScript::accepting(&[])
            .with_greeting(b"220 mx.acme.test Bienvenue \xe9 ESMTP");
        let server = FakeSmtpServer::start(script).await;
        let h = harness(server.port, |_| {});

        let outcome = run(&h).await;
        assert!(outcome.rejected);
        assert!(!outcome.valid);
        assert_eq!(outcome.error, None);
        assert_eq!(outcome.smtp_code, Some(550));
        assert!(h.skip_list.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dead_primary_falls_back_to_next_priority() {
        let server = FakeSmtpServer::start(SmtpScript::accepting(&["jane@acme.test"])).await;
        // nothing listens on 127.0.0.2, the fake server is bound to 127.0.0.1
        let resolver = FakeResolver::new()
            .with_ip(DOMAIN, "127.0.0.1")
            .with_mx(DOMAIN, "127.0.0.2", 5)
            .with_mx(DOMAIN, "127.0.0.1", 10);
        let h = harness_with(resolver, server.port, |c| c.smtp.concurrent_dial = 1);

        let outcome = run(&h).await;
        assert!(outcome.valid);
        assert_eq!(outcome.mx_host.as_deref(), Some("127.0.0.1"));

        let dead = h.skip_list.get("127.0.0.2").await.unwrap().unwrap();
        assert_eq!(dead.reason, "connection failed");
        assert_eq!(dead.failure_count, 1);
        assert!(h.skip_list.get("127.0.0.1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_dial_adopts_live_host() {
        let server = FakeSmtpServer::start(SmtpScript::accepting(&["jane@acme.test"])).await;
        let resolver = FakeResolver::new()
            .with_ip(DOMAIN, "127.0.0.1")
            .with_mx(DOMAIN, "127.0.0.2", 5)
            .with_mx(DOMAIN, "127.0.0.1", 10);
        let h = harness_with(resolver, server.port, |c| c.smtp.concurrent_dial = 2);

        let outcome = run(&h).await;
        assert!(outcome.valid);
        assert_eq!(outcome.mx_host.as_deref(), Some("127.0.0.1"));
        assert_eq!(server.rcpt_targets().last().map(String::as_str), Some("jane@acme.test"));

        // the dead host is skip-listed only if its refusal beat the winner
        for entry in h.skip_list.list().await.unwrap() {
            assert_eq!(entry.mx_host, "127.0.0.2");
            assert_eq!(entry.reason, "connection failed");
        }
    }

    #[tokio::test]
    async fn test_vrfy_rejection_is_definite() {
        let script = SmtpScript {
            vrfy: "550 5.1.1 no such user".to_string(),
            ..SmtpScript::default()
        };
        let server = FakeSmtpServer::start(script).await;
        let h = harness(server.port, |_| {});

        let outcome = run(&h).await;
        assert!(outcome.rejected);
        assert!(!outcome.catch_all);
        assert_eq!(outcome.verification_method, Some(VerificationMethod::Vrfy));
        assert_eq!(outcome.confidence, Some(95));
        assert!(server.rcpt_targets().is_empty());
        assert!(!server.received("EXPN"));
        assert!(server.received("QUIT"));
    }

    #[tokio::test]
    async fn test_expn_confirms_after_inconclusive_vrfy() {
        let script = SmtpScript {
            vrfy: "252 Cannot VRFY user".to_string(),
            expn: "250 Jane Doe <jane@acme.test>".to_string(),
            ..SmtpScript::default()
        };
        let server = FakeSmtpServer::start(script).await;
        let h = harness(server.port, |_| {});

        let outcome = run(&h).await;
        assert!(outcome.valid);
        assert_eq!(outcome.verification_method, Some(VerificationMethod::Expn));
        assert_eq!(outcome.confidence, Some(90));
        assert!(server.rcpt_targets().is_empty());
    }

    #[tokio::test]
    async fn test_rcpt_accepts_real_address() {
        let server = FakeSmtpServer::start(SmtpScript::accepting(&["jane@acme.test"])).await;
        let h = harness(server.port, |_| {});

        let outcome = run(&h).await;
        assert!(outcome.valid);
        assert!(!outcome.catch_all);
        assert_eq!(outcome.verification_method, Some(VerificationMethod::Rcpt));
        assert_eq!(outcome.confidence, None);
        assert_eq!(server.rcpt_targets().len(), 2);
        assert_eq!(server.rcpt_targets()[1], "jane@acme.test");
    }

    #[tokio::test]
    async fn test_rcpt_rejects_real_address() {
        let server = FakeSmtpServer::start(SmtpScript::accepting(&[])).await;
        let h = harness(server.port, |_| {});

        let outcome = run(&h).await;
        assert!(outcome.rejected);
        assert!(!outcome.valid);
        assert_eq!(outcome.smtp_code, Some(550));
    }

    #[tokio::test]
    async fn test_mailbox_full() {
        let script = SmtpScript::accepting(&[]).with_rcpt(|rcpt| {
            if rcpt == "jane@acme.test" {
                "452 4.2.2 Mailbox is full".to_string()
            } else {
                "550 5.1.1 unknown".to_string()
            }
        });
        let server = FakeSmtpServer::start(script).await;
        let h = harness(server.port, |_| {});

        let outcome = run(&h).await;
        assert!(outcome.mailbox_full);
        assert!(!outcome.valid);
    }

    #[tokio::test]
    async fn test_greylisting_is_retried_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let script = SmtpScript::default().with_rcpt(move |rcpt| {
            if rcpt != "jane@acme.test" {
                return "550 5.1.1 unknown".to_string();
            }
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                "451 4.7.1 Greylisted, please try again".to_string()
            } else {
                "250 2.1.5 OK".to_string()
            }
        });
        let server = FakeSmtpServer::start(script).await;
        let h = harness(server.port, |_| {});

        let outcome = run(&h).await;
        assert!(outcome.valid);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_blocking_reply_escalates_host() {
        let script = SmtpScript::default().with_rcpt(|rcpt| {
            if rcpt == "jane@acme.test" {
                "554 5.7.1 Service unavailable; client host blocked".to_string()
            } else {
                "550 5.1.1 unknown".to_string()
            }
        });
        let server = FakeSmtpServer::start(script).await;
        let h = harness(server.port, |_| {});

        let outcome = run(&h).await;
        assert!(!outcome.valid);
        assert!(outcome.error.is_some());
        assert!(!outcome.rejected && !outcome.catch_all && !outcome.mailbox_full);

        let entry = h.skip_list.get("127.0.0.1").await.unwrap().unwrap();
        assert_eq!(entry.reason, "blocked");
        assert_eq!(entry.failure_count, 1);
        assert!(!entry.is_manual);
        assert!(entry.expires_at.is_some());
        assert!(entry.response_snippet.unwrap().contains("5.7.1"));
    }

    #[tokio::test]
    async fn test_handshake_rejection_escalates() {
        let script = SmtpScript {
            mail_from: "550 5.7.1 sender rejected".to_string(),
            ..SmtpScript::default()
        };
        let server = FakeSmtpServer::start(script).await;
        let h = harness(server.port, |_| {});

        let outcome = run(&h).await;
        assert!(!outcome.valid);
        assert_eq!(outcome.smtp_code, Some(550));
        assert!(h.skip_list.is_active("127.0.0.1").await.unwrap());
        assert!(server.received("QUIT"));
    }

    #[tokio::test]
    async fn test_skip_listed_host_is_not_dialed() {
        let server = FakeSmtpServer::start(SmtpScript::default()).await;
        let h = harness(server.port, |_| {});
        h.skip_list
            .upsert(UpsertSkipListEntry::new("127.0.0.1", "manual").manual())
            .await
            .unwrap();

        let outcome = run(&h).await;
        assert!(!outcome.attempted);
        assert!(!outcome.valid);
        assert!(!outcome.catch_all);
        assert!(server.commands().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_escalated() {
        let port = closed_port().await;
        let h = harness(port, |_| {});

        let outcome = run(&h).await;
        assert!(!outcome.attempted);
        assert!(outcome.error.is_some());
        let entry = h.skip_list.get("127.0.0.1").await.unwrap().unwrap();
        assert_eq!(entry.reason, "connection failed");
    }

    #[tokio::test]
    async fn test_assume_catch_all_policy_skips_dial() {
        let port = closed_port().await;
        let h = harness(port, |_| {});

        let outcome = h
            .probe
            .probe(&jane(), Some(ProviderPolicy::AssumeCatchAll), ExecutionMode::Interactive)
            .await
            .unwrap();
        assert!(outcome.catch_all);
        assert!(!outcome.attempted);
        assert!(h.skip_list.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rate_limit_by_execution_mode() {
        let server = FakeSmtpServer::start(SmtpScript::default()).await;
        let h = harness(server.port, |c| c.rate_limit.per_domain_limit = 1);

        run(&h).await;

        let skipped = run(&h).await;
        assert!(skipped.rate_limited);
        assert!(!skipped.attempted);

        let err = h
            .probe
            .probe(&jane(), None, ExecutionMode::Retryable)
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_classify_rcpt() {
        let h = harness(25, |_| {});
        let classify = |code: u16, text: &str| h.probe.classify_rcpt(&SmtpReply::new(code, vec![text.to_string()]));

        assert_eq!(classify(250, "OK"), RcptVerdict::Accepted);
        assert_eq!(classify(251, "forwarded"), RcptVerdict::Accepted);
        assert_eq!(classify(450, "try later"), RcptVerdict::Greylisted);
        assert_eq!(classify(550, "5.1.1 unknown user"), RcptVerdict::Rejected);
        assert_eq!(classify(552, "5.2.2 storage"), RcptVerdict::MailboxFull);
        assert_eq!(classify(550, "5.2.2 quota exceeded"), RcptVerdict::MailboxFull);
        assert_eq!(classify(550, "5.7.1 relaying denied"), RcptVerdict::Blocked);
        assert_eq!(classify(421, "closing"), RcptVerdict::Inconclusive);
    }
}
