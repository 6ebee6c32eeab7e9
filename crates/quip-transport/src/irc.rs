//! A minimal IRC adapter: NICK/USER login, JOIN, PRIVMSG, PING/PONG.
//! Server-initiated PINGs are answered inside the adapter; everything the
//! supervisor cares about becomes a [`TransportEvent`].

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LinesCodec};
use tracing::{debug, info, warn};

use quip_core::{QuipError, Result};

use crate::{Transport, TransportEvent};

const KEEPALIVE_TOKEN: &str = "quip-keepalive";

/// Numeric the server sends once registration succeeds.
const RPL_WELCOME: &str = "001";
/// Numeric for a nickname collision during registration.
const ERR_NICKNAMEINUSE: &str = "433";

pub struct IrcTransport {
    server: String,
    port: u16,
    nickname: String,
    realname: String,
    stream: Option<Framed<TcpStream, LinesCodec>>,
}

/// What one inbound line means before any state is touched.
enum Parsed {
    Event(TransportEvent),
    Reply(String),
    NickTaken,
    Ignore,
}

impl IrcTransport {
    pub fn new(server: &str, port: u16, nickname: &str, realname: &str) -> Self {
        Self {
            server: server.to_string(),
            port,
            nickname: nickname.to_string(),
            realname: realname.to_string(),
            stream: None,
        }
    }

    async fn send_line(&mut self, line: String) -> Result<()> {
        let framed = self.stream.as_mut().ok_or(QuipError::NotConnected)?;
        // IRC wants CRLF; the codec supplies the LF.
        framed
            .send(format!("{line}\r"))
            .await
            .map_err(|e| QuipError::Transport(e.to_string()))
    }

    fn parse(&self, raw: &str) -> Parsed {
        let line = raw.trim_end_matches('\r');
        if let Some(token) = line.strip_prefix("PING ") {
            return Parsed::Reply(format!("PONG {token}"));
        }

        let (prefix, rest) = match line.strip_prefix(':') {
            Some(rest) => match rest.split_once(' ') {
                Some((prefix, rest)) => (prefix, rest),
                None => return Parsed::Ignore,
            },
            None => ("", line),
        };
        let mut words = rest.splitn(3, ' ');
        let command = words.next().unwrap_or("");
        match command {
            RPL_WELCOME => Parsed::Event(TransportEvent::Welcome),
            ERR_NICKNAMEINUSE => Parsed::NickTaken,
            "PONG" => Parsed::Event(TransportEvent::Pong),
            "PRIVMSG" => {
                let Some(target) = words.next() else {
                    return Parsed::Ignore;
                };
                if !target.starts_with('#') {
                    // Private messages are ignored, like the original.
                    return Parsed::Ignore;
                }
                let text = words
                    .next()
                    .map(|t| t.strip_prefix(':').unwrap_or(t))
                    .unwrap_or("");
                let sender = prefix.split('!').next().unwrap_or(prefix);
                Parsed::Event(TransportEvent::Message {
                    sender: sender.to_string(),
                    channel: target.to_string(),
                    text: text.to_string(),
                })
            }
            _ => Parsed::Ignore,
        }
    }
}

#[async_trait]
impl Transport for IrcTransport {
    async fn connect(&mut self) -> Result<()> {
        info!(server = %self.server, port = self.port, "connecting");
        let socket = TcpStream::connect((self.server.as_str(), self.port))
            .await
            .map_err(|e| QuipError::Transport(format!("connect failed: {e}")))?;
        self.stream = Some(Framed::new(socket, LinesCodec::new()));
        self.send_line(format!("NICK {}", self.nickname)).await?;
        self.send_line(format!(
            "USER {} 0 * :{}",
            self.nickname, self.realname
        ))
        .await
    }

    async fn join(&mut self, channel: &str) -> Result<()> {
        info!(channel, "joining");
        self.send_line(format!("JOIN {channel}")).await
    }

    async fn send_message(&mut self, channel: &str, text: &str) -> Result<()> {
        self.send_line(format!("PRIVMSG {channel} :{text}")).await
    }

    async fn ping(&mut self) -> Result<()> {
        self.send_line(format!("PING :{KEEPALIVE_TOKEN}")).await
    }

    async fn disconnect(&mut self) -> Result<()> {
        if self.stream.is_some() {
            // Best effort; the link may already be dead.
            let _ = self.send_line("QUIT :bye".to_string()).await;
            self.stream = None;
        }
        Ok(())
    }

    async fn next_event(&mut self) -> Option<TransportEvent> {
        loop {
            let framed = self.stream.as_mut()?;
            let line = match framed.next().await {
                None => {
                    self.stream = None;
                    return Some(TransportEvent::Disconnected(None));
                }
                Some(Err(e)) => {
                    self.stream = None;
                    return Some(TransportEvent::Disconnected(Some(e.to_string())));
                }
                Some(Ok(line)) => line,
            };
            match self.parse(&line) {
                Parsed::Event(event) => return Some(event),
                Parsed::Reply(reply) => {
                    debug!("answering server ping");
                    if let Err(e) = self.send_line(reply).await {
                        warn!(error = %e, "failed to answer server ping");
                    }
                }
                Parsed::NickTaken => {
                    self.nickname.push('_');
                    let nick = format!("NICK {}", self.nickname);
                    warn!(nickname = %self.nickname, "nickname in use, retrying");
                    if let Err(e) = self.send_line(nick).await {
                        warn!(error = %e, "failed to renegotiate nickname");
                    }
                }
                Parsed::Ignore => {}
            }
        }
    }
}
