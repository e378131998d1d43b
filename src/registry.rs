use std::collections::{HashMap, hash_map::Entry};

use crate::{CqrsError, MessageType, Result};

/// Maps a message type to exactly one handler.
///
/// Lookups are exact-type matches. A rejected registration leaves the registry untouched.
pub struct Registry<H> {
    handlers: HashMap<MessageType, H>,
}

impl<H> Registry<H> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Stores the handler produced by `build`, which only runs when `message_type` is free.
    ///
    /// A taken type fails with [`CqrsError::AlreadyRegistered`] before `build` is called; an
    /// error from `build` is returned as is. Either way nothing is stored.
    pub fn insert_with<F>(&mut self, message_type: MessageType, build: F) -> Result<()>
    where
        F: FnOnce() -> Result<H>,
    {
        match self.handlers.entry(message_type) {
            Entry::Occupied(_) => Err(CqrsError::AlreadyRegistered(message_type)),
            Entry::Vacant(slot) => {
                slot.insert(build()?);
                Ok(())
            }
        }
    }

    pub fn get(&self, message_type: &MessageType) -> Option<&H> {
        self.handlers.get(message_type)
    }

    pub fn contains(&self, message_type: &MessageType) -> bool {
        self.handlers.contains_key(message_type)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<H> Default for Registry<H> {
    fn default() -> Self {
        Self::new()
    }
}
