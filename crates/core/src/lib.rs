pub mod alerting;
pub mod detection;
pub mod pipeline;
pub mod shared;
pub mod video;
