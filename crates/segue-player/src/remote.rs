//! Bridge for system media controls (lock screen, headset buttons, ...).

use tracing::{debug, warn};

use crate::manager::PlaylistManager;

/// A command issued by a system remote-control surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RemoteCommand {
    Play,
    Pause,
    TogglePlayPause,
    Next,
    Previous,
    /// Absolute position in seconds.
    ChangePosition(f64),
    /// Relative skip; negative values skip backward.
    SkipBy(f64),
}

/// What the remote surface is told after handling a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    Success,
    CommandFailed,
}

impl PlaylistManager {
    /// Map a remote command onto the matching core command.
    pub fn handle_remote(&self, command: RemoteCommand) -> CommandStatus {
        debug!("Remote command: {command:?}");
        let result = match command {
            RemoteCommand::Play => self.play(None),
            RemoteCommand::Pause => self.pause(),
            RemoteCommand::TogglePlayPause => {
                if self.is_playing() {
                    self.pause()
                } else {
                    self.play(None)
                }
            }
            RemoteCommand::Next => self.play_next(),
            RemoteCommand::Previous => self.play_previous(),
            RemoteCommand::ChangePosition(seconds) => self.seek(seconds),
            RemoteCommand::SkipBy(delta) if delta < 0.0 => self.seek_backward(Some(-delta)),
            RemoteCommand::SkipBy(delta) => self.seek_forward(Some(delta)),
        };

        match result {
            Ok(()) => CommandStatus::Success,
            Err(e) => {
                warn!("Remote command {command:?} failed: {e}");
                CommandStatus::CommandFailed
            }
        }
    }
}
