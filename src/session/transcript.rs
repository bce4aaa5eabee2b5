use crate::models::{Message, Role};

/// Ordered user/assistant messages for one model. Entries are only ever
/// appended or dropped from the tail.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn push(&mut self, message: Message) -> &Message {
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Everything except the final message, which is the one in flight.
    pub fn history(&self) -> Vec<Message> {
        match self.messages.split_last() {
            Some((_, earlier)) => earlier.to_vec(),
            None => Vec::new(),
        }
    }

    /// Drops the trailing assistant reply, if there is one.
    pub fn pop_reply(&mut self) -> Option<Message> {
        match self.messages.last() {
            Some(message) if message.role == Role::Assistant => self.messages.pop(),
            _ => None,
        }
    }

    /// Removes the last exchange and returns how many messages went.
    ///
    /// A reply is removed together with the user message it answers; an
    /// unanswered user message goes on its own.
    pub fn undo(&mut self) -> usize {
        let mut removed = 0;
        if self.pop_reply().is_some() {
            removed += 1;
        }
        if matches!(self.messages.last(), Some(message) if message.role == Role::User) {
            self.messages.pop();
            removed += 1;
        }
        removed
    }
}
