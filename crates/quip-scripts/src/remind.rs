//! The remind script: stores messages on behalf of users and plays them back
//! into the channel after a requested delay.

use async_trait::async_trait;
use std::collections::HashMap;

use quip_core::text::shell_split;
use quip_core::{ParamDefault, ParamSpec, Reply, ResolvedParams, Result, Script, ScriptDescriptor};

const SYNTAX: &str = "Syntax: !remind [-s|-m|-h|-d] <time> <message>";

/// A message waiting to fire.
#[derive(Debug, Clone)]
struct ReminderTask {
    fire_at: i64,
    message: String,
}

/// Per-channel delayed-message scheduler. Time is Unix wall-clock seconds,
/// passed explicitly so the poll cycle and the tests share one code path;
/// nothing survives a restart.
#[derive(Debug)]
pub struct ReminderStore {
    tasks: HashMap<String, Vec<ReminderTask>>,
    tasklimit: usize,
    durlimit: i64,
}

impl ReminderStore {
    pub fn new(tasklimit: usize, durlimit: i64) -> Self {
        Self {
            tasks: HashMap::new(),
            tasklimit,
            durlimit,
        }
    }

    /// Schedule a message. Failures are user-facing reply strings, not
    /// errors: too-distant delays and full channels are refused outright,
    /// while a negative delay clamps to "now".
    pub fn schedule_at(
        &mut self,
        channel: &str,
        delay_secs: i64,
        message: &str,
        now: i64,
    ) -> std::result::Result<(), String> {
        if delay_secs > self.durlimit {
            return Err("NOPE. That's too far in the future for me to remember.".to_string());
        }
        let delay_secs = delay_secs.max(0);
        let pending = self.tasks.entry(channel.to_string()).or_default();
        if pending.len() >= self.tasklimit {
            return Err("NOPE. I have too many other things to remember.".to_string());
        }
        pending.push(ReminderTask {
            fire_at: now.saturating_add(delay_secs),
            message: message.to_string(),
        });
        Ok(())
    }

    pub fn schedule(
        &mut self,
        channel: &str,
        delay_secs: i64,
        message: &str,
    ) -> std::result::Result<(), String> {
        self.schedule_at(channel, delay_secs, message, chrono::Utc::now().timestamp())
    }

    /// Remove every task whose fire time has passed and return its message,
    /// in original scheduling order. Still-pending tasks are untouched, so a
    /// second immediate poll returns nothing more.
    pub fn poll_at(&mut self, channel: &str, now: i64) -> Vec<String> {
        let Some(pending) = self.tasks.get_mut(channel) else {
            return Vec::new();
        };
        let mut fired = Vec::new();
        pending.retain(|task| {
            if task.fire_at <= now {
                fired.push(task.message.clone());
                false
            } else {
                true
            }
        });
        fired
    }

    pub fn poll(&mut self, channel: &str) -> Vec<String> {
        self.poll_at(channel, chrono::Utc::now().timestamp())
    }

    pub fn pending(&self, channel: &str) -> usize {
        self.tasks.get(channel).map_or(0, Vec::len)
    }
}

// ── The script wrapper ─────────────────────────────────────────

const PARAMS: &[ParamSpec] = &[
    ParamSpec::new("tasklimit", ParamDefault::Int(1000)),
    ParamSpec::new("durlimit", ParamDefault::Int(604_800)),
];

pub const DESCRIPTOR: ScriptDescriptor = ScriptDescriptor {
    name: "remind",
    params: PARAMS,
    help: Some(
        "!remind [-s|-m|-h|-d] <time> <message> - Schedule a message to be \
         announced after a certain time. -s, -m, -h, or -d specifies the time \
         to be in seconds, minutes, hours, or days (defaults to seconds)",
    ),
    factory: Remind::factory,
};

pub struct Remind {
    store: ReminderStore,
}

impl Remind {
    fn factory(params: &ResolvedParams) -> Result<Box<dyn Script>> {
        let tasklimit = params.get_int("tasklimit")?.max(0) as usize;
        let durlimit = params.get_int("durlimit")?;
        Ok(Box::new(Self {
            store: ReminderStore::new(tasklimit, durlimit),
        }))
    }

    /// Parse `!remind [-s|-m|-h|-d] <time> <message>` into a delay in
    /// seconds plus the message body. `None` means "not our command";
    /// `Some(Err(..))` is the syntax reply.
    fn parse(text: &str) -> Option<std::result::Result<(i64, String), String>> {
        let mut words = text.split_whitespace();
        if words.next() != Some("!remind") {
            return None;
        }
        let tail = text.trim_start().strip_prefix("!remind").unwrap_or("");
        let tokens = match shell_split(tail) {
            Ok(tokens) => tokens,
            Err(_) => return Some(Err(SYNTAX.to_string())),
        };

        let mut iter = tokens.into_iter().peekable();
        let mult = match iter.peek().map(String::as_str) {
            Some("-s") => {
                iter.next();
                1
            }
            Some("-m") => {
                iter.next();
                60
            }
            Some("-h") => {
                iter.next();
                60 * 60
            }
            Some("-d") => {
                iter.next();
                60 * 60 * 24
            }
            _ => 1,
        };
        let Some(time) = iter.next().and_then(|t| t.parse::<i64>().ok()) else {
            return Some(Err(SYNTAX.to_string()));
        };
        let message = iter.collect::<Vec<_>>().join(" ");
        Some(Ok((time.saturating_mul(mult), message)))
    }
}

#[async_trait]
impl Script for Remind {
    fn name(&self) -> &'static str {
        "remind"
    }

    async fn on_message(
        &mut self,
        _sender: &str,
        channel: &str,
        text: &str,
    ) -> Result<Option<Reply>> {
        let Some(parsed) = Self::parse(text) else {
            return Ok(None);
        };
        let reply = match parsed {
            Ok((delay, message)) => match self.store.schedule(channel, delay, &message) {
                Ok(()) => "Task registered".to_string(),
                Err(refusal) => refusal,
            },
            Err(syntax) => syntax,
        };
        Ok(Some(Reply::One(reply)))
    }

    async fn on_poll(&mut self, channel: &str) -> Result<Option<Reply>> {
        let fired = self.store.poll(channel);
        if fired.is_empty() {
            Ok(None)
        } else {
            Ok(Some(Reply::Many(fired)))
        }
    }
}
