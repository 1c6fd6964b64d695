use crate::shared::frame::Frame;
use crate::shared::stream_info::StreamInfo;

/// Supplies a lazy stream of frames from a camera or network source.
///
/// Implementations handle transport and codec details; consumers see only
/// [`Frame`] values. The source is expected to block or rate-limit
/// internally, making it the natural pace-setter for the ingestion loop.
pub trait FrameSource: Send {
    /// Opens the stream at `url` and returns its properties.
    fn open(&mut self, url: &str) -> Result<StreamInfo, Box<dyn std::error::Error>>;

    /// Returns the next frame in decode order.
    ///
    /// May return the empty sentinel ([`Frame::is_empty`]) when no new
    /// picture was ready; callers skip it and poll again. An error means
    /// the stream has failed or ended and cannot produce further frames.
    fn next_frame(&mut self) -> Result<Frame, Box<dyn std::error::Error>>;

    /// Releases any resources held by the source.
    fn close(&mut self);
}
