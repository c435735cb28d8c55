//! Reply Mailbox
//!
//! The hand-off between exchange tasks and the controller. Tasks post a
//! [`Reply`] through a cloned [`MailboxSender`]; the controller drains the
//! [`Mailbox`] from its poll loop without ever blocking.

use tokio::sync::mpsc;

use crate::messages::TurnId;

/// How a reply was obtained
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplyOutcome {
    /// The conversation service answered
    Answered,
    /// The exchange failed and the fallback text was substituted
    Fallback,
    /// The exchange took too long and the fallback text was substituted
    TimedOut,
}

/// A completed turn waiting to be delivered
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    /// Turn this reply belongs to
    pub turn: TurnId,
    /// User message that started the turn
    pub prompt: String,
    /// Text for the response box
    pub text: String,
    /// How the text was obtained
    pub outcome: ReplyOutcome,
}

/// Producer half, cloned into each exchange task
#[derive(Clone, Debug)]
pub struct MailboxSender {
    tx: mpsc::UnboundedSender<Reply>,
}

impl MailboxSender {
    /// Post a reply; dropped silently if the controller is gone
    pub fn post(&self, reply: Reply) {
        if self.tx.send(reply).is_err() {
            tracing::debug!("Mailbox closed, dropping reply");
        }
    }
}

/// Consumer half, owned by the controller
#[derive(Debug)]
pub struct Mailbox {
    rx: mpsc::UnboundedReceiver<Reply>,
}

impl Mailbox {
    /// Create a connected sender/mailbox pair
    #[must_use]
    pub fn channel() -> (MailboxSender, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (MailboxSender { tx }, Self { rx })
    }

    /// Take every reply currently waiting, in arrival order
    pub fn drain(&mut self) -> Vec<Reply> {
        let mut replies = Vec::new();
        while let Ok(reply) = self.rx.try_recv() {
            replies.push(reply);
        }
        replies
    }
}
