//! SMTP reply parsing

use mailprobe_common::{Error, Result};
use regex::{Regex, RegexBuilder};
use tracing::warn;

/// First digit of a reply code (RFC 5321 §4.2.1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyClass {
    PositiveCompletion,
    PositiveIntermediate,
    TransientFailure,
    PermanentFailure,
}

/// A complete, possibly multi-line, server reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpReply {
    pub code: u16,
    /// Text of all lines joined with a space
    pub text: String,
    pub lines: Vec<String>,
    pub class: ReplyClass,
}

/// One parsed reply line: code, whether more lines follow, text
#[derive(Debug, PartialEq, Eq)]
pub struct ReplyLine<'a> {
    pub code: u16,
    pub continues: bool,
    pub text: &'a str,
}

impl<'a> ReplyLine<'a> {
    /// Parse `250-text`, `250 text` or a bare `250`
    pub fn parse(line: &'a str) -> Result<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        let digits = line
            .get(..3)
            .filter(|d| d.bytes().all(|b| b.is_ascii_digit()))
            .ok_or_else(|| Error::Protocol(format!("malformed reply line: {:?}", line)))?;
        let code: u16 = digits
            .parse()
            .map_err(|_| Error::Protocol(format!("malformed reply code: {:?}", line)))?;
        if !(200..600).contains(&code) {
            return Err(Error::Protocol(format!("reply code out of range: {}", code)));
        }

        let (continues, text) = match line.as_bytes().get(3) {
            None => (false, ""),
            Some(b'-') => (true, &line[4..]),
            Some(b' ') => (false, &line[4..]),
            Some(_) => {
                return Err(Error::Protocol(format!("malformed reply separator: {:?}", line)));
            }
        };

        Ok(Self {
            code,
            continues,
            text: text.trim(),
        })
    }
}

impl SmtpReply {
    /// Assemble a reply from its lines; every line must carry the same code
    pub fn from_lines<S: AsRef<str>>(raw: &[S]) -> Result<Self> {
        let mut code = None;
        let mut lines = Vec::with_capacity(raw.len());
        for line in raw {
            let parsed = ReplyLine::parse(line.as_ref())?;
            match code {
                None => code = Some(parsed.code),
                Some(c) if c != parsed.code => {
                    return Err(Error::Protocol(format!(
                        "mixed reply codes {} and {}",
                        c, parsed.code
                    )));
                }
                Some(_) => {}
            }
            lines.push(parsed.text.to_string());
        }

        let code = code.ok_or_else(|| Error::Protocol("empty reply".to_string()))?;
        Ok(Self::new(code, lines))
    }

    pub fn new(code: u16, lines: Vec<String>) -> Self {
        let class = match code / 100 {
            2 => ReplyClass::PositiveCompletion,
            3 => ReplyClass::PositiveIntermediate,
            4 => ReplyClass::TransientFailure,
            _ => ReplyClass::PermanentFailure,
        };
        Self {
            code,
            text: lines.join(" "),
            lines,
            class,
        }
    }

    pub fn is_positive(&self) -> bool {
        self.class == ReplyClass::PositiveCompletion
    }

    pub fn is_permanent(&self) -> bool {
        self.class == ReplyClass::PermanentFailure
    }
}

/// Case-insensitive patterns matched against `"<code> <text>"` of a reply.
///
/// Entries are regular expressions; one that does not compile is matched
/// literally instead.
#[derive(Debug, Clone, Default)]
pub struct ReplyPatterns {
    patterns: Vec<Regex>,
}

impl ReplyPatterns {
    pub fn new(sources: &[String]) -> Self {
        let patterns = sources
            .iter()
            .filter(|source| !source.is_empty())
            .filter_map(|source| {
                RegexBuilder::new(source)
                    .case_insensitive(true)
                    .build()
                    .or_else(|e| {
                        warn!("Invalid reply pattern {:?}, matching literally: {}", source, e);
                        RegexBuilder::new(&regex::escape(source))
                            .case_insensitive(true)
                            .build()
                    })
                    .ok()
            })
            .collect();
        Self { patterns }
    }

    pub fn matches(&self, reply: &SmtpReply) -> bool {
        let text = reply.to_string();
        self.patterns.iter().any(|p| p.is_match(&text))
    }
}

impl std::fmt::Display for SmtpReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.text.is_empty() {
            write!(f, "{}", self.code)
        } else {
            write!(f, "{} {}", self.code, self.text)
        }
    }
}
