//! Presentation session management
//!
//! This module defines the trait for tunneling display commands from the
//! game controller to the presentation layer. The tunnel abstraction lets
//! a terminal, a web socket or a test recorder render the same game.

use super::{SyncMessage, UpdateMessage};

/// Trait for sending display commands to the presentation layer
pub trait Tunnel {
    /// Sends an incremental display command
    ///
    /// # Arguments
    ///
    /// * `message` - The update message to render
    fn send_message(&self, message: &UpdateMessage);

    /// Sends a full snapshot of the game
    ///
    /// Snapshots let a display that joined late or reconnected rebuild
    /// its view without replaying every update.
    ///
    /// # Arguments
    ///
    /// * `state` - The synchronization message to render
    fn send_state(&self, state: &SyncMessage);
}

impl<T: Tunnel + ?Sized> Tunnel for &T {
    fn send_message(&self, message: &UpdateMessage) {
        (**self).send_message(message);
    }

    fn send_state(&self, state: &SyncMessage) {
        (**self).send_state(state);
    }
}
