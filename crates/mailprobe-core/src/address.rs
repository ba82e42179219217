//! Address parsing, syntax validation and alias canonicalization
//!
//! Pure functions, no I/O. The only failure mode is [`Error::Format`].

use mailprobe_common::types::EmailAddress;
use mailprobe_common::{Error, Result};
use std::net::IpAddr;

const MAX_ADDRESS_LEN: usize = 254;
const MAX_LOCAL_LEN: usize = 64;
const MAX_DOMAIN_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

/// Special characters allowed unquoted in a dot-atom local part (RFC 5322 atext)
const ATEXT_SPECIALS: &str = "!#$%&'*+/=?^_`{|}~-";

const GMAIL_DOMAINS: &[&str] = &["gmail.com", "googlemail.com"];
const YAHOO_DOMAINS: &[&str] = &[
    "yahoo.com",
    "ymail.com",
    "rocketmail.com",
    "yahoo.co.uk",
    "yahoo.fr",
    "yahoo.de",
];
const OUTLOOK_DOMAINS: &[&str] = &[
    "outlook.com",
    "hotmail.com",
    "live.com",
    "msn.com",
    "hotmail.co.uk",
    "outlook.fr",
    "outlook.de",
];

/// Character classes of a local part
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CharacterCounts {
    pub numerical: u32,
    pub alphabetical: u32,
    pub unicode_symbols: u32,
}

/// Email address parser
pub struct AddressParser;

impl AddressParser {
    /// Split on the last unescaped `@` and lowercase both halves.
    ///
    /// Only checks that both halves are present; see [`AddressParser::parse`]
    /// for full syntax validation.
    pub fn split(address: &str) -> Result<EmailAddress> {
        let address = address.trim();
        let at = find_separator(address)
            .ok_or_else(|| Error::Format(format!("missing '@' in {:?}", address)))?;

        let local_part = &address[..at];
        let domain = &address[at + 1..];
        if local_part.is_empty() {
            return Err(Error::Format("empty local part".to_string()));
        }
        if domain.is_empty() {
            return Err(Error::Format("empty domain".to_string()));
        }

        Ok(EmailAddress::new(
            local_part.to_lowercase(),
            domain.trim_end_matches('.').to_lowercase(),
        ))
    }

    /// Split and validate an address
    pub fn parse(address: &str) -> Result<EmailAddress> {
        let email = Self::split(address)?;
        Self::validate(&email)?;
        Ok(email)
    }

    /// Whether a split address is syntactically valid
    pub fn is_valid_syntax(email: &EmailAddress) -> bool {
        Self::validate(email).is_ok()
    }

    fn validate(email: &EmailAddress) -> Result<()> {
        if email.local_part.len() + email.domain.len() + 1 > MAX_ADDRESS_LEN {
            return Err(Error::Format("address too long".to_string()));
        }
        validate_local_part(&email.local_part)?;
        validate_domain(&email.domain)
    }

    /// Canonical form of a provider alias, or `None` when the address is
    /// already canonical or the provider does not alias.
    ///
    /// Gmail drops `+tag` and dots and folds googlemail.com into gmail.com,
    /// Yahoo drops a `-keyword` suffix and the Outlook family drops `+tag`.
    pub fn detect_alias(address: &str) -> Option<String> {
        let email = Self::split(address).ok()?;
        let domain = email.domain.as_str();
        let local = email.local_part.as_str();

        let canonical = if GMAIL_DOMAINS.contains(&domain) {
            let base = strip_suffix_at(local, '+').replace('.', "");
            format!("{}@gmail.com", base)
        } else if YAHOO_DOMAINS.contains(&domain) {
            format!("{}@{}", strip_suffix_at(local, '-'), domain)
        } else if OUTLOOK_DOMAINS.contains(&domain) {
            format!("{}@{}", strip_suffix_at(local, '+'), domain)
        } else {
            return None;
        };

        if canonical == email.address() || canonical.starts_with('@') {
            None
        } else {
            Some(canonical)
        }
    }

    /// Count digits, ASCII letters and non-ASCII characters of a local part
    pub fn character_counts(local_part: &str) -> CharacterCounts {
        local_part
            .chars()
            .fold(CharacterCounts::default(), |mut counts, c| {
                if c.is_ascii_digit() {
                    counts.numerical += 1;
                } else if c.is_ascii_alphabetic() {
                    counts.alphabetical += 1;
                } else if !c.is_ascii() {
                    counts.unicode_symbols += 1;
                }
                counts
            })
    }
}

/// Byte index of the last `@` that is neither escaped nor quoted
fn find_separator(address: &str) -> Option<usize> {
    let mut escaped = false;
    let mut quoted = false;
    let mut separator = None;

    for (idx, c) in address.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '"' => quoted = !quoted,
            '@' if !quoted => separator = Some(idx),
            _ => {}
        }
    }
    separator
}

fn strip_suffix_at(local: &str, marker: char) -> &str {
    local.split(marker).next().unwrap_or(local)
}

fn validate_local_part(local: &str) -> Result<()> {
    if local.len() > MAX_LOCAL_LEN {
        return Err(Error::Format("local part too long".to_string()));
    }

    if local.len() >= 2 && local.starts_with('"') && local.ends_with('"') {
        let inner = &local[1..local.len() - 1];
        let mut escaped = false;
        for c in inner.chars() {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' || c.is_control() {
                return Err(Error::Format("invalid character in quoted local part".to_string()));
            }
        }
        if escaped {
            return Err(Error::Format("dangling escape in local part".to_string()));
        }
        return Ok(());
    }

    if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return Err(Error::Format("misplaced dot in local part".to_string()));
    }

    let valid = local.chars().all(|c| {
        c.is_ascii_alphanumeric()
            || c == '.'
            || ATEXT_SPECIALS.contains(c)
            || (!c.is_ascii() && c.is_alphanumeric())
    });
    if valid {
        Ok(())
    } else {
        Err(Error::Format("invalid character in local part".to_string()))
    }
}

fn validate_domain(domain: &str) -> Result<()> {
    if domain.len() > MAX_DOMAIN_LEN {
        return Err(Error::Format("domain too long".to_string()));
    }

    if let Some(literal) = domain.strip_prefix('[').and_then(|d| d.strip_suffix(']')) {
        let literal = literal.strip_prefix("ipv6:").unwrap_or(literal);
        return literal
            .parse::<IpAddr>()
            .map(|_| ())
            .map_err(|_| Error::Format("invalid domain literal".to_string()));
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return Err(Error::Format("domain needs at least two labels".to_string()));
    }

    for label in &labels {
        if label.is_empty() || label.chars().count() > MAX_LABEL_LEN {
            return Err(Error::Format(format!("invalid domain label {:?}", label)));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(Error::Format(format!("hyphen at label edge in {:?}", label)));
        }
        if !label.chars().all(|c| c.is_alphanumeric() || c == '-') {
            return Err(Error::Format(format!("invalid character in label {:?}", label)));
        }
    }

    let tld = labels[labels.len() - 1];
    let tld_ok = tld.starts_with("xn--") || (tld.chars().count() >= 2 && tld.chars().all(char::is_alphabetic));
    if tld_ok {
        Ok(())
    } else {
        Err(Error::Format(format!("invalid top-level domain {:?}", tld)))
    }
}
