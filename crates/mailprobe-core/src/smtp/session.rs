//! Client side of a single SMTP conversation

use super::reply::{ReplyLine, SmtpReply};
use mailprobe_common::config::SmtpConfig;
use mailprobe_common::{Error, Result};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// Longest reply line accepted before the peer is considered broken
const MAX_LINE_LEN: usize = 4096;

/// Socket parameters shared by every session of a probe
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub port: u16,
    pub connect_timeout: Duration,
    pub operation_timeout: Duration,
    pub max_reply_lines: usize,
}

impl From<&SmtpConfig> for SessionConfig {
    fn from(config: &SmtpConfig) -> Self {
        Self {
            port: config.port,
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
            operation_timeout: Duration::from_millis(config.operation_timeout_ms),
            max_reply_lines: config.max_reply_lines,
        }
    }
}

/// An open connection to one MX host
pub struct SmtpSession {
    host: String,
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    config: SessionConfig,
}

impl SmtpSession {
    /// Open a TCP connection within the connect timeout
    pub async fn connect(host: &str, config: &SessionConfig) -> Result<Self> {
        let stream = timeout(config.connect_timeout, TcpStream::connect((host, config.port)))
            .await
            .map_err(|_| Error::Network(format!("connect to {}:{} timed out", host, config.port)))?
            .map_err(|e| Error::Network(format!("connect to {}:{} failed: {}", host, config.port, e)))?;

        debug!(mx_host = %host, port = config.port, "SMTP connection established");

        let (reader, writer) = stream.into_split();
        Ok(Self {
            host: host.to_string(),
            reader: BufReader::new(reader),
            writer,
            config: config.clone(),
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Read one complete reply, bounded in lines and time
    pub async fn read_reply(&mut self) -> Result<SmtpReply> {
        let mut lines = Vec::new();
        loop {
            if lines.len() >= self.config.max_reply_lines {
                return Err(Error::Protocol(format!(
                    "{} sent more than {} reply lines",
                    self.host, self.config.max_reply_lines
                )));
            }

            let line = self.read_line().await?;
            let continues = ReplyLine::parse(&line)?.continues;
            lines.push(line);
            if !continues {
                break;
            }
        }

        let reply = SmtpReply::from_lines(&lines)?;
        debug!(mx_host = %self.host, "SMTP <- {}", reply);
        Ok(reply)
    }

    /// One reply line, never buffering more than `MAX_LINE_LEN` bytes.
    /// Banners may carry 8-bit text, so bytes are decoded lossily.
    async fn read_line(&mut self) -> Result<String> {
        let mut raw = Vec::new();
        let limit = (MAX_LINE_LEN + 1) as u64;
        let read = timeout(
            self.config.operation_timeout,
            (&mut self.reader).take(limit).read_until(b'\n', &mut raw),
        )
        .await
        .map_err(|_| Error::Network(format!("read from {} timed out", self.host)))??;
        if read == 0 {
            return Err(Error::Network(format!("{} closed the connection", self.host)));
        }
        if raw.len() > MAX_LINE_LEN {
            return Err(Error::Protocol(format!("{} sent an oversized reply line", self.host)));
        }
        Ok(String::from_utf8_lossy(&raw).into_owned())
    }

    /// Send a command line and read its reply
    pub async fn command(&mut self, command: &str) -> Result<SmtpReply> {
        debug!(mx_host = %self.host, "SMTP -> {}", command);
        let line = format!("{}\r\n", command);
        let writer = &mut self.writer;
        timeout(self.config.operation_timeout, async move {
            writer.write_all(line.as_bytes()).await?;
            writer.flush().await
        })
        .await
        .map_err(|_| Error::Network(format!("write to {} timed out", self.host)))??;

        self.read_reply().await
    }

    /// Say goodbye and close the socket. Failures are ignored; the
    /// connection is dropped either way.
    pub async fn quit(mut self) {
        if let Err(e) = self.command("QUIT").await {
            debug!(mx_host = %self.host, "QUIT failed: {}", e);
        }
        let _ = timeout(self.config.operation_timeout, self.writer.shutdown()).await;
    }
}
