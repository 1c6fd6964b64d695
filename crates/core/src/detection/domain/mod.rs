pub mod detection;
pub mod detection_monitor;
pub mod object_detector;
