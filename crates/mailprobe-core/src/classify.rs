//! Maps checks and status onto a (state, reason) pair

use mailprobe_common::types::{ResultCode, VerificationChecks, VerificationState, VerificationStatus};

/// Everything the classifier looks at
#[derive(Debug, Clone, Copy)]
pub struct ClassifyInput<'a> {
    pub checks: &'a VerificationChecks,
    pub status: VerificationStatus,
    /// A trusted provider was accepted without an SMTP conversation
    pub trusted_provider: bool,
    /// SMTP definitely rejected the mailbox
    pub smtp_rejected: bool,
    pub error: Option<&'a str>,
}

/// First matching rule wins
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultClassifier;

impl ResultClassifier {
    pub fn classify(&self, input: &ClassifyInput<'_>) -> (VerificationState, Option<ResultCode>) {
        use ResultCode as R;
        use VerificationState as S;

        let checks = input.checks;
        if !checks.syntax {
            return (S::Undeliverable, Some(R::SyntaxError));
        }
        if checks.typo_domain {
            return (S::Undeliverable, Some(R::Typo));
        }
        if checks.disposable {
            return (S::Undeliverable, Some(R::Disposable));
        }
        if checks.blacklisted || input.status.is_blocked() {
            return (S::Undeliverable, Some(R::Blocked));
        }
        if checks.mailbox_full {
            return (S::Risky, Some(R::MailboxFull));
        }
        if checks.role {
            return (S::Risky, Some(R::Role));
        }
        if checks.catch_all {
            return (S::Risky, Some(R::CatchAll));
        }
        if checks.smtp {
            return (S::Deliverable, Some(R::Valid));
        }
        if input.trusted_provider
            && checks.mx_record
            && checks.domain_validity
            && input.status == VerificationStatus::Valid
        {
            return (S::Deliverable, Some(R::Valid));
        }
        if input.status == VerificationStatus::Invalid
            && (!checks.mx_record || !checks.domain_validity || input.smtp_rejected)
        {
            return (S::Undeliverable, Some(R::MailboxNotFound));
        }
        if let Some(error) = input.error {
            if is_connection_error(error) {
                return (S::Unknown, None);
            }
            if input.status == VerificationStatus::Error {
                return (S::Error, Some(R::Error));
            }
        }
        legacy_mapping(input.status)
    }
}

/// Mapping used when no specific rule applies
pub fn legacy_mapping(status: VerificationStatus) -> (VerificationState, Option<ResultCode>) {
    use VerificationStatus::*;
    match status {
        Valid => (VerificationState::Deliverable, Some(ResultCode::Valid)),
        Invalid => (VerificationState::Undeliverable, Some(ResultCode::Invalid)),
        Risky => (VerificationState::Risky, Some(ResultCode::LowQuality)),
        CatchAll => (VerificationState::Risky, Some(ResultCode::CatchAll)),
        Unknown => (VerificationState::Unknown, None),
        Skipped => (VerificationState::Unknown, Some(ResultCode::Skipped)),
        Error => (VerificationState::Error, Some(ResultCode::Error)),
        Blocked | Spamtrap | Abuse | DoNotMail => {
            (VerificationState::Undeliverable, Some(ResultCode::Blocked))
        }
    }
}

fn is_connection_error(error: &str) -> bool {
    let error = error.to_lowercase();
    ["timeout", "timed out", "connect"]
        .iter()
        .any(|needle| error.contains(needle))
}
