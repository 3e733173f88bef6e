//! Chat state and the oracle worker thread.
//!
//! Requests go to a background thread that owns the [`Transport`] and does
//! the blocking HTTP call; replies come back over a channel that the render
//! loop drains once per frame, so drawing never waits on the network.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use log::{error, info, warn};
use thiserror::Error;

use sigil_oracle::{generate_spell, mystic_advice, ChatMessage, OracleError, SpellInfo, Transport};

/// Shown in the chat whenever advice could not be fetched.
pub const UNSTABLE_REPLY: &str = "The mystical energies are unstable. Try again.";

// ════════════════════════════════════════════════════════════════════════════
// OracleCommand / OracleReply
// ════════════════════════════════════════════════════════════════════════════

pub enum OracleCommand {
    /// Generate a spell themed on the text.
    Spell(String),
    /// Ask for advice on the latest message of the history.
    Advice(Vec<ChatMessage>),
    /// Terminate the thread.
    Quit,
}

#[derive(Debug)]
pub enum OracleReply {
    Spell(SpellInfo),
    Advice(Result<String, OracleError>),
}

// ════════════════════════════════════════════════════════════════════════════
// OracleWorker: the request thread
// ════════════════════════════════════════════════════════════════════════════

/// Handle to the oracle thread.
pub struct OracleWorker {
    cmd_tx:   Sender<OracleCommand>,
    reply_rx: Receiver<OracleReply>,
}

impl OracleWorker {
    /// Spawn the worker; `transport` is moved into the thread.
    pub fn spawn<T: Transport + 'static>(transport: T) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel::<OracleCommand>();
        let (reply_tx, reply_rx) = mpsc::channel::<OracleReply>();

        thread::spawn(move || oracle_thread(transport, cmd_rx, reply_tx));

        OracleWorker { cmd_tx, reply_rx }
    }

    /// Queue a command; `false` if the thread is gone.
    pub fn request(&self, cmd: OracleCommand) -> bool {
        self.cmd_tx.send(cmd).is_ok()
    }

    /// Drain any pending replies (non-blocking).
    pub fn drain_replies(&self) -> Vec<OracleReply> {
        let mut out = Vec::new();
        while let Ok(r) = self.reply_rx.try_recv() { out.push(r); }
        out
    }
}

impl Drop for OracleWorker {
    fn drop(&mut self) { let _ = self.cmd_tx.send(OracleCommand::Quit); }
}

fn oracle_thread<T: Transport>(transport: T, cmd_rx: Receiver<OracleCommand>, reply_tx: Sender<OracleReply>) {
    for cmd in cmd_rx {
        let reply = match cmd {
            OracleCommand::Spell(prompt)    => OracleReply::Spell(generate_spell(&transport, &prompt)),
            OracleCommand::Advice(history)  => OracleReply::Advice(mystic_advice(&transport, &history)),
            OracleCommand::Quit             => return,
        };
        if reply_tx.send(reply).is_err() { return; }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Sanctum: chat + current spell
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    #[error("nothing to send")]
    Empty,
    #[error("the oracle is still answering")]
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind { Spell, Advice }

/// Inputs mentioning "spell" or "magic" ask for a new spell; anything else
/// asks for advice.
pub fn request_kind(input: &str) -> RequestKind {
    let lower = input.to_lowercase();
    if lower.contains("spell") || lower.contains("magic") {
        RequestKind::Spell
    } else {
        RequestKind::Advice
    }
}

pub fn spell_announcement(spell: &SpellInfo) -> String {
    format!(
        "I have prepared the {}. It is described as: {}. Recite: \"{}\"",
        spell.name, spell.description, spell.incantation
    )
}

pub struct Sanctum {
    current_spell: SpellInfo,
    history:       Vec<ChatMessage>,
    is_generating: bool,
    worker:        OracleWorker,
}

impl Sanctum {
    pub fn new<T: Transport + 'static>(transport: T) -> Self {
        Sanctum {
            current_spell: SpellInfo::initial(),
            history:       Vec::new(),
            is_generating: false,
            worker:        OracleWorker::spawn(transport),
        }
    }

    pub fn current_spell(&self) -> &SpellInfo { &self.current_spell }
    pub fn history(&self) -> &[ChatMessage] { &self.history }
    pub fn is_generating(&self) -> bool { self.is_generating }

    /// Record the user's message and hand it to the oracle.
    pub fn submit(&mut self, input: &str) -> Result<RequestKind, SubmitError> {
        let text = input.trim();
        if text.is_empty() {
            return Err(SubmitError::Empty);
        }
        if self.is_generating {
            return Err(SubmitError::Busy);
        }

        self.history.push(ChatMessage::user(text));
        self.is_generating = true;

        let kind = request_kind(text);
        let cmd = match kind {
            RequestKind::Spell  => OracleCommand::Spell(text.to_string()),
            RequestKind::Advice => OracleCommand::Advice(self.history.clone()),
        };
        info!("[sanctum] {:?} request: {:?}", kind, text);
        if !self.worker.request(cmd) {
            error!("[sanctum] oracle thread is gone");
            self.finish(ChatMessage::model(UNSTABLE_REPLY));
        }
        Ok(kind)
    }

    /// Apply every reply that has arrived.  Returns how many were applied.
    pub fn tick(&mut self) -> usize {
        let replies = self.worker.drain_replies();
        let n = replies.len();
        for reply in replies {
            self.apply(reply);
        }
        n
    }

    fn apply(&mut self, reply: OracleReply) {
        let line = match reply {
            OracleReply::Spell(spell) => {
                let line = spell_announcement(&spell);
                info!("[sanctum] new spell {:?} ({})", spell.name, spell.color);
                self.current_spell = spell;
                line
            }
            OracleReply::Advice(Ok(text)) => text,
            OracleReply::Advice(Err(e)) => {
                warn!("[sanctum] advice failed: {e}");
                UNSTABLE_REPLY.to_string()
            }
        };
        self.finish(ChatMessage::model(line));
    }

    fn finish(&mut self, message: ChatMessage) {
        self.history.push(message);
        self.is_generating = false;
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
