use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use thiserror::Error;

use crate::alerting::domain::alert_actuator::AlertActuator;
use crate::shared::constants::{CHIME_FILE_NAME, DEFAULT_PLAYER_BIN};

#[derive(Error, Debug)]
pub enum ChimeError {
    #[error("failed to launch audio player `{player}`: {source}")]
    Launch {
        player: String,
        #[source]
        source: std::io::Error,
    },
    #[error("audio player `{player}` exited with {status}")]
    PlayerFailed { player: String, status: ExitStatus },
}

/// Plays the chime by running an external audio player and waiting for it
/// to exit.
pub struct ProcessChimePlayer {
    player_bin: String,
    sound_path: PathBuf,
}

impl ProcessChimePlayer {
    pub fn new(sound_path: PathBuf) -> Self {
        Self::with_player(DEFAULT_PLAYER_BIN, sound_path)
    }

    pub fn with_player(player_bin: impl Into<String>, sound_path: PathBuf) -> Self {
        Self {
            player_bin: player_bin.into(),
            sound_path,
        }
    }

    /// Path of the chime bundled with the application:
    /// `<executable dir>/assets/doorbell.mp3`.
    pub fn bundled_sound_path() -> std::io::Result<PathBuf> {
        let exe = std::env::current_exe()?;
        let dir = exe.parent().unwrap_or_else(|| Path::new("."));
        Ok(dir.join("assets").join(CHIME_FILE_NAME))
    }
}

impl AlertActuator for ProcessChimePlayer {
    fn trigger(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let status = Command::new(&self.player_bin)
            .arg(&self.sound_path)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| ChimeError::Launch {
                player: self.player_bin.clone(),
                source: e,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(ChimeError::PlayerFailed {
                player: self.player_bin.clone(),
                status,
            }
            .into())
        }
    }
}
