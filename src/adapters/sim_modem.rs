//! Scripted modem for host simulation and tests.
//!
//! Implements [`SerialPort`] by answering each command line with a canned
//! reply.  Writes are accumulated and classified once a unit is complete:
//!
//! | Ends with     | Starts with `AT` | Treated as                 |
//! |---------------|------------------|----------------------------|
//! | `\r\n`        | yes              | command line               |
//! | `\r\n`        | no               | certificate upload         |
//! | `0x1A 0x1A`   | —                | publish payload            |
//!
//! A reply script is a list of responses; each hit consumes the front entry
//! and the last entry repeats forever.  Commands without a rule get the
//! default reply (silence unless set).

use std::collections::VecDeque;

use crate::app::ports::{SerialError, SerialPort};
use crate::modem::commands::PAYLOAD_TERMINATOR;

/// Canned replies for one command pattern.
#[derive(Debug, Clone)]
struct Rule {
    pattern: String,
    prefix: bool,
    replies: VecDeque<String>,
}

impl Rule {
    fn matches(&self, line: &str) -> bool {
        if self.prefix {
            line.starts_with(self.pattern.as_str())
        } else {
            line == self.pattern
        }
    }

    fn next_reply(&mut self) -> String {
        pop_or_repeat(&mut self.replies)
    }
}

fn script(replies: &[&str]) -> VecDeque<String> {
    replies.iter().map(|r| (*r).to_owned()).collect()
}

/// A modem that answers from a script.
#[derive(Debug, Default)]
pub struct ScriptedModem {
    rules: Vec<Rule>,
    upload_replies: VecDeque<String>,
    payload_replies: VecDeque<String>,
    default_reply: String,
    pending: Vec<u8>,
    rx: VecDeque<u8>,
    commands: Vec<String>,
    uploads: Vec<Vec<u8>>,
    payloads: Vec<Vec<u8>>,
    fail_writes: bool,
}

impl ScriptedModem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply to exactly `command` with `reply`.
    #[must_use]
    pub fn on(self, command: &str, reply: &str) -> Self {
        self.on_sequence(command, &[reply])
    }

    /// Reply to successive `command`s with successive entries of `replies`.
    #[must_use]
    pub fn on_sequence(mut self, command: &str, replies: &[&str]) -> Self {
        self.rules.push(Rule {
            pattern: command.to_owned(),
            prefix: false,
            replies: script(replies),
        });
        self
    }

    /// Reply to every command starting with `prefix`.
    #[must_use]
    pub fn on_prefix(mut self, prefix: &str, reply: &str) -> Self {
        self.rules.push(Rule {
            pattern: prefix.to_owned(),
            prefix: true,
            replies: script(&[reply]),
        });
        self
    }

    /// Reply to a completed certificate upload.
    #[must_use]
    pub fn on_upload(mut self, reply: &str) -> Self {
        self.upload_replies = script(&[reply]);
        self
    }

    /// Reply to completed publish payloads in order.
    #[must_use]
    pub fn on_payload(mut self, replies: &[&str]) -> Self {
        self.payload_replies = script(replies);
        self
    }

    /// Reply to commands no rule matches.
    #[must_use]
    pub fn with_default(mut self, reply: &str) -> Self {
        self.default_reply = reply.to_owned();
        self
    }

    /// Make every write fail.
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Queue unsolicited bytes, as if the modem spoke on its own.
    pub fn inject(&mut self, text: &str) {
        self.rx.extend(text.bytes());
    }

    /// Every command line received, without terminators.
    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    /// How often exactly `command` was sent.
    pub fn count_of(&self, command: &str) -> usize {
        self.commands.iter().filter(|c| c.as_str() == command).count()
    }

    /// Whether `command` was sent at all.
    pub fn sent(&self, command: &str) -> bool {
        self.count_of(command) > 0
    }

    /// Certificate blobs received, without the terminator.
    pub fn uploads(&self) -> &[Vec<u8>] {
        &self.uploads
    }

    /// Publish payloads received, without the terminator.
    pub fn payloads(&self) -> &[Vec<u8>] {
        &self.payloads
    }

    fn respond(&mut self, reply: &str) {
        self.rx.extend(reply.bytes());
    }

    fn complete_unit(&mut self) {
        if self.pending.ends_with(PAYLOAD_TERMINATOR) {
            let body = self.pending[..self.pending.len() - PAYLOAD_TERMINATOR.len()].to_vec();
            self.payloads.push(body);
            let reply = pop_or_repeat(&mut self.payload_replies);
            self.respond(&reply);
            self.pending.clear();
        } else if self.pending.ends_with(b"\r\n") {
            let body = self.pending[..self.pending.len() - 2].to_vec();
            self.pending.clear();
            if body.is_empty() {
                return;
            }
            if body.starts_with(b"AT") {
                let line = String::from_utf8_lossy(&body).into_owned();
                let reply = match self.rules.iter_mut().find(|r| r.matches(&line)) {
                    Some(rule) => rule.next_reply(),
                    None => self.default_reply.clone(),
                };
                self.commands.push(line);
                self.respond(&reply);
            } else {
                self.uploads.push(body);
                let reply = pop_or_repeat(&mut self.upload_replies);
                self.respond(&reply);
            }
        }
    }
}

fn pop_or_repeat(replies: &mut VecDeque<String>) -> String {
    if replies.len() > 1 {
        replies.pop_front().unwrap_or_default()
    } else {
        replies.front().cloned().unwrap_or_default()
    }
}

impl SerialPort for ScriptedModem {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), SerialError> {
        if self.fail_writes {
            return Err(SerialError::WriteFailed);
        }
        self.pending.extend_from_slice(bytes);
        self.complete_unit();
        Ok(())
    }

    fn read_byte(&mut self) -> Option<u8> {
        self.rx.pop_front()
    }
}
