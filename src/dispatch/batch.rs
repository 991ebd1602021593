use crate::broker::SerializedMessage;

/// Ordered, capacity-bounded group of messages published together.
///
/// Not `Clone`: a batch handed to a publish task is moved, so the
/// dispatcher cannot touch it again.
#[derive(Debug, PartialEq, Eq)]
pub struct Batch {
    messages: Vec<SerializedMessage>,
    max: usize,
}

impl Batch {
    pub fn with_capacity(max: usize) -> Self {
        Self {
            messages: Vec::with_capacity(max),
            max,
        }
    }

    /// Append a message. A full batch hands the message back.
    pub fn push(&mut self, message: SerializedMessage) -> Result<(), SerializedMessage> {
        if self.is_full() {
            return Err(message);
        }
        self.messages.push(message);
        Ok(())
    }

    /// Move the contents out, leaving a freshly allocated empty batch.
    pub fn take(&mut self) -> Batch {
        let max = self.max;
        std::mem::replace(self, Batch::with_capacity(max))
    }

    pub fn is_full(&self) -> bool {
        self.messages.len() >= self.max
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn into_messages(self) -> Vec<SerializedMessage> {
        self.messages
    }
}
