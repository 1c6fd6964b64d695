use std::time::Duration;

pub const DETECT_MODEL_NAME: &str = "yolov8n.onnx";
pub const DETECT_MODEL_URL: &str =
    "https://github.com/neutrinographics/doorguard/releases/download/v0.1.0/yolov8n.onnx";

/// Max frames a track can be lost before it expires (~1 second at 30 fps).
pub const TRACKER_MAX_LOST: usize = 30;

/// Minimum interval between two chimes while someone stays at the door.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(5);

/// Interval between presence checks while the door is empty.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Chime file bundled next to the executable, under `assets/`.
pub const CHIME_FILE_NAME: &str = "doorbell.mp3";

/// External audio player invoked to play the chime.
pub const DEFAULT_PLAYER_BIN: &str = "mpg321";
