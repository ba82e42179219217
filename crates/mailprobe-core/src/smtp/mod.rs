//! SMTP client used for mailbox probing

mod probe;
mod reply;
mod session;

pub use probe::{skip_list_expiry_days, ProbeOutcome, RcptVerdict, SmtpProbe};
pub use reply::{ReplyClass, ReplyLine, ReplyPatterns, SmtpReply};
pub use session::{SessionConfig, SmtpSession};
