//! Canned DNS and a scripted SMTP server for tests

use crate::dns::DnsResolver;
use async_trait::async_trait;
use mailprobe_common::types::MxRecord;
use mailprobe_common::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

/// Resolver answering from fixed tables
#[derive(Default)]
pub(crate) struct FakeResolver {
    mx: HashMap<String, Vec<MxRecord>>,
    ips: HashMap<String, Vec<IpAddr>>,
    txt: HashMap<String, Vec<String>>,
    failing_mx: HashSet<String>,
    failing_ip: HashSet<String>,
    pub mx_calls: AtomicUsize,
}

impl FakeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mx(mut self, domain: &str, host: &str, priority: u16) -> Self {
        self.mx
            .entry(domain.to_string())
            .or_default()
            .push(MxRecord::new(host, priority));
        self
    }

    pub fn with_ip(mut self, host: &str, ip: &str) -> Self {
        let ip: IpAddr = ip.parse().expect("test ip");
        self.ips.entry(host.to_string()).or_default().push(ip);
        self
    }

    pub fn with_txt(mut self, name: &str, value: &str) -> Self {
        self.txt
            .entry(name.to_string())
            .or_default()
            .push(value.to_string());
        self
    }

    /// Make the primary MX lookup fail; the raw query still answers
    pub fn failing_mx(mut self, domain: &str) -> Self {
        self.failing_mx.insert(domain.to_string());
        self
    }

    pub fn failing_ip(mut self, host: &str) -> Self {
        self.failing_ip.insert(host.to_string());
        self
    }

    /// A deliverable test domain whose only MX is the local fake server
    pub fn with_local_domain(self, domain: &str) -> Self {
        self.with_ip(domain, "127.0.0.1")
            .with_mx(domain, "127.0.0.1", 10)
    }
}

#[async_trait]
impl DnsResolver for FakeResolver {
    async fn mx_lookup(&self, domain: &str) -> Result<Vec<MxRecord>> {
        self.mx_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_mx.contains(domain) {
            return Err(Error::Dns(format!("SERVFAIL for {}", domain)));
        }
        Ok(self.mx.get(domain).cloned().unwrap_or_default())
    }

    async fn raw_mx_lookup(&self, domain: &str) -> Result<Vec<MxRecord>> {
        Ok(self.mx.get(domain).cloned().unwrap_or_default())
    }

    async fn ip_lookup(&self, host: &str) -> Result<Vec<IpAddr>> {
        if self.failing_ip.contains(host) {
            return Err(Error::Dns(format!("timeout resolving {}", host)));
        }
        Ok(self.ips.get(host).cloned().unwrap_or_default())
    }

    async fn txt_lookup(&self, name: &str) -> Result<Vec<String>> {
        Ok(self.txt.get(name).cloned().unwrap_or_default())
    }
}

type RcptHandler = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Replies the fake server sends, one per command
#[derive(Clone)]
pub(crate) struct SmtpScript {
    /// Raw bytes so banners need not be UTF-8
    pub greeting: Vec<u8>,
    pub ehlo: String,
    pub mail_from: String,
    pub vrfy: String,
    pub expn: String,
    pub rcpt: RcptHandler,
}

impl Default for SmtpScript {
    fn default() -> Self {
        Self {
            greeting: b"220 fake.test ESMTP ready".to_vec(),
            ehlo: "250-fake.test greets you\r\n250-PIPELINING\r\n250 8BITMIME".to_string(),
            mail_from: "250 2.1.0 OK".to_string(),
            vrfy: "502 5.5.1 VRFY command is disabled".to_string(),
            expn: "502 5.5.1 EXPN command is disabled".to_string(),
            rcpt: Arc::new(|_| "250 2.1.5 OK".to_string()),
        }
    }
}

impl SmtpScript {
    /// Accepts exactly the given recipients, rejects the rest with 550
    pub fn accepting(recipients: &[&str]) -> Self {
        let accepted: HashSet<String> = recipients.iter().map(|r| r.to_string()).collect();
        Self {
            rcpt: Arc::new(move |rcpt| {
                if accepted.contains(rcpt) {
                    "250 2.1.5 OK".to_string()
                } else {
                    "550 5.1.1 No such user here".to_string()
                }
            }),
            ..Self::default()
        }
    }

    pub fn with_greeting(mut self, greeting: &[u8]) -> Self {
        self.greeting = greeting.to_vec();
        self
    }

    pub fn with_rcpt(mut self, handler: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        self.rcpt = Arc::new(handler);
        self
    }
}

/// SMTP server on 127.0.0.1 that records every command it receives
pub(crate) struct FakeSmtpServer {
    pub port: u16,
    commands: Arc<Mutex<Vec<String>>>,
}

impl FakeSmtpServer {
    pub async fn start(script: SmtpScript) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("local addr").port();
        let commands = Arc::new(Mutex::new(Vec::new()));

        let log = commands.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let script = script.clone();
                let log = log.clone();
                tokio::spawn(async move {
                    let (reader, mut writer) = stream.into_split();
                    let mut reader = BufReader::new(reader);
                    let mut greeting = script.greeting.clone();
                    greeting.extend_from_slice(b"\r\n");
                    if writer.write_all(&greeting).await.is_err() {
                        return;
                    }

                    let mut line = String::new();
                    loop {
                        line.clear();
                        match reader.read_line(&mut line).await {
                            Ok(0) | Err(_) => break,
                            Ok(_) => {}
                        }
                        let command = line.trim_end().to_string();
                        log.lock().expect("command log").push(command.clone());

                        let verb = command
                            .split_whitespace()
                            .next()
                            .unwrap_or_default()
                            .to_uppercase();
                        let reply = match verb.as_str() {
                            "EHLO" | "HELO" => script.ehlo.clone(),
                            "MAIL" => script.mail_from.clone(),
                            "VRFY" => script.vrfy.clone(),
                            "EXPN" => script.expn.clone(),
                            "RCPT" => {
                                let rcpt = command
                                    .split_once('<')
                                    .and_then(|(_, rest)| rest.split_once('>'))
                                    .map(|(addr, _)| addr.to_string())
                                    .unwrap_or_default();
                                (script.rcpt)(&rcpt)
                            }
                            "RSET" | "NOOP" => "250 OK".to_string(),
                            "QUIT" => {
                                let _ = writer.write_all(b"221 2.0.0 Bye\r\n").await;
                                break;
                            }
                            _ => "500 5.5.2 Command unrecognized".to_string(),
                        };
                        if writer
                            .write_all(format!("{}\r\n", reply).as_bytes())
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                });
            }
        });

        Self { port, commands }
    }

    /// Every command received so far, across connections
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().expect("command log").clone()
    }

    /// Recipients named in RCPT TO commands, in order
    pub fn rcpt_targets(&self) -> Vec<String> {
        self.commands()
            .iter()
            .filter(|c| c.to_uppercase().starts_with("RCPT"))
            .filter_map(|c| {
                c.split_once('<')
                    .and_then(|(_, rest)| rest.split_once('>'))
                    .map(|(addr, _)| addr.to_string())
            })
            .collect()
    }

    pub fn received(&self, verb: &str) -> bool {
        self.commands()
            .iter()
            .any(|c| c.to_uppercase().starts_with(verb))
    }
}

/// A local port with nothing listening on it
pub(crate) async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    port
}
