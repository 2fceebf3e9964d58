//! Pending viewer input
//!
//! Local events are queued here and flushed by the video loop on its next
//! tick. Only the latest click survives between ticks, keys are kept in
//! order.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::network::{InputCommand, MouseButton};

/// Shared queue between the event source and the video loop
#[derive(Debug, Clone, Default)]
pub struct InputQueue {
    pending: Arc<Mutex<VecDeque<InputCommand>>>,
}

impl InputQueue {
    /// Creates an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a command, replacing any click that has not been sent yet
    pub fn push(&self, command: InputCommand) {
        let mut pending = self.pending.lock();
        if is_click(&command) {
            pending.retain(|queued| !is_click(queued));
        }
        pending.push_back(command);
    }

    /// Queues a single click
    pub fn click(&self, x: i32, y: i32, button: MouseButton) {
        self.push(InputCommand::Click { x, y, button });
    }

    /// Queues a double click
    pub fn double_click(&self, x: i32, y: i32, button: MouseButton) {
        self.push(InputCommand::DoubleClick { x, y, button });
    }

    /// Queues a key press
    pub fn key(&self, key: impl Into<String>) {
        self.push(InputCommand::Key { key: key.into() });
    }

    /// Takes everything queued so far
    pub fn drain(&self) -> Vec<InputCommand> {
        self.pending.lock().drain(..).collect()
    }

    /// Number of queued commands
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Returns true if nothing is queued
    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}

fn is_click(command: &InputCommand) -> bool {
    matches!(
        command,
        InputCommand::Click { .. } | InputCommand::DoubleClick { .. }
    )
}
