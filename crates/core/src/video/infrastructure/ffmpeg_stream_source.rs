use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::stream_info::StreamInfo;
use crate::video::domain::frame_source::FrameSource;

/// Decodes a live or file-backed video stream via ffmpeg-next
/// (libavformat + libavcodec).
///
/// Pull-based: each [`next_frame`](FrameSource::next_frame) call feeds at
/// most one packet to the decoder. Packets that yield no picture (audio
/// streams, partial GOPs) surface as the empty sentinel, so the caller can
/// keep polling without stalling inside the decoder. Demuxing blocks on the
/// network, which is what rate-limits ingestion for RTSP sources.
pub struct FfmpegStreamSource {
    input_ctx: Option<ffmpeg_next::format::context::Input>,
    decoder: Option<ffmpeg_next::decoder::Video>,
    scaler: Option<ffmpeg_next::software::scaling::Context>,
    video_stream_index: usize,
    width: u32,
    height: u32,
    frame_index: usize,
    flushing: bool,
}

// Safety: FfmpegStreamSource is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegStreamSource {}

impl FfmpegStreamSource {
    pub fn new() -> Self {
        Self {
            input_ctx: None,
            decoder: None,
            scaler: None,
            video_stream_index: 0,
            width: 0,
            height: 0,
            frame_index: 0,
            flushing: false,
        }
    }
}

impl Default for FfmpegStreamSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSource for FfmpegStreamSource {
    fn open(&mut self, url: &str) -> Result<StreamInfo, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        let ictx = ffmpeg_next::format::input(&Path::new(url))?;

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("No video stream found")?;
        let video_stream_index = stream.index();

        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;

        let rate = stream.rate();
        let fps = if rate.denominator() != 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            0.0
        };

        let width = decoder.width();
        let height = decoder.height();
        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        let info = StreamInfo {
            width,
            height,
            fps,
            codec: decoder
                .codec()
                .map(|c| c.name().to_string())
                .unwrap_or_default(),
            source: url.to_string(),
        };

        self.video_stream_index = video_stream_index;
        self.width = width;
        self.height = height;
        self.frame_index = 0;
        self.flushing = false;
        self.decoder = Some(decoder);
        self.scaler = Some(scaler);
        self.input_ctx = Some(ictx);

        Ok(info)
    }

    fn next_frame(&mut self) -> Result<Frame, Box<dyn std::error::Error>> {
        let stream_index = self.video_stream_index;
        let ictx = self.input_ctx.as_mut().ok_or("stream not opened")?;
        let decoder = self.decoder.as_mut().ok_or("stream not opened")?;
        let scaler = self.scaler.as_mut().ok_or("stream not opened")?;

        // A picture may already be buffered from a previous packet.
        if let Some(frame) = receive_frame(decoder, scaler, self.width, self.height, self.frame_index)? {
            self.frame_index += 1;
            return Ok(frame);
        }

        if self.flushing {
            return Err("video stream ended".into());
        }

        match ictx.packets().next() {
            Some((stream, packet)) => {
                if stream.index() != stream_index {
                    return Ok(Frame::empty());
                }
                if let Err(e) = decoder.send_packet(&packet) {
                    log::warn!("dropping undecodable packet: {e}");
                    return Ok(Frame::empty());
                }
            }
            None => {
                // End of stream: flush the decoder, fail once it runs dry.
                let _ = decoder.send_eof();
                self.flushing = true;
            }
        }

        match receive_frame(decoder, scaler, self.width, self.height, self.frame_index)? {
            Some(frame) => {
                self.frame_index += 1;
                Ok(frame)
            }
            None if self.flushing => Err("video stream ended".into()),
            None => Ok(Frame::empty()),
        }
    }

    fn close(&mut self) {
        self.input_ctx = None;
        self.decoder = None;
        self.scaler = None;
        self.flushing = false;
    }
}

fn receive_frame(
    decoder: &mut ffmpeg_next::decoder::Video,
    scaler: &mut ffmpeg_next::software::scaling::Context,
    width: u32,
    height: u32,
    index: usize,
) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
    let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
    if decoder.receive_frame(&mut decoded).is_err() {
        return Ok(None);
    }
    let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
    scaler.run(&decoded, &mut rgb_frame)?;
    let pixels = extract_rgb_pixels(&rgb_frame, width, height);
    Ok(Some(Frame::new(pixels, width, height, 3, index)))
}

/// Copies pixel data from an ffmpeg frame into a contiguous RGB buffer.
///
/// ffmpeg frames may have padding bytes at the end of each row
/// (stride > width*3); this strips the padding.
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    /// Encodes a small grayscale-gradient MPEG4 clip for decode tests.
    fn create_test_clip(path: &Path, num_frames: usize) -> (u32, u32) {
        let (width, height, fps) = (160u32, 120u32, 30i32);
        ffmpeg_next::init().unwrap();

        let mut octx = ffmpeg_next::format::output(path).unwrap();
        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MPEG4).unwrap();
        let mut ost = octx.add_stream(Some(codec)).unwrap();

        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()
            .unwrap();
        encoder_ctx.set_width(width);
        encoder_ctx.set_height(height);
        encoder_ctx.set_format(ffmpeg_next::format::Pixel::YUV420P);
        encoder_ctx.set_time_base(ffmpeg_next::Rational(1, fps));
        encoder_ctx.set_frame_rate(Some(ffmpeg_next::Rational(fps, 1)));
        if global_header {
            encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }

        let mut encoder = encoder_ctx
            .open_with(ffmpeg_next::Dictionary::new())
            .unwrap();
        ost.set_parameters(&encoder);
        octx.write_header().unwrap();
        let ost_time_base = octx.stream(0).unwrap().time_base();

        let mut scaler = ffmpeg_next::software::scaling::Context::get(
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::format::Pixel::YUV420P,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )
        .unwrap();

        for i in 0..num_frames {
            let mut rgb_frame = ffmpeg_next::util::frame::video::Video::new(
                ffmpeg_next::format::Pixel::RGB24,
                width,
                height,
            );
            let value = ((i * 40) % 256) as u8;
            let stride = rgb_frame.stride(0);
            let data = rgb_frame.data_mut(0);
            for row in 0..height as usize {
                for col in 0..width as usize {
                    let offset = row * stride + col * 3;
                    data[offset] = value;
                    data[offset + 1] = value;
                    data[offset + 2] = value;
                }
            }

            let mut yuv_frame = ffmpeg_next::util::frame::video::Video::empty();
            scaler.run(&rgb_frame, &mut yuv_frame).unwrap();
            yuv_frame.set_pts(Some(i as i64));
            encoder.send_frame(&yuv_frame).unwrap();

            let mut encoded = ffmpeg_next::Packet::empty();
            while encoder.receive_packet(&mut encoded).is_ok() {
                encoded.set_stream(0);
                encoded.rescale_ts(ffmpeg_next::Rational(1, fps), ost_time_base);
                encoded.write_interleaved(&mut octx).unwrap();
            }
        }

        encoder.send_eof().unwrap();
        let mut encoded = ffmpeg_next::Packet::empty();
        while encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(0);
            encoded.rescale_ts(ffmpeg_next::Rational(1, fps), ost_time_base);
            encoded.write_interleaved(&mut octx).unwrap();
        }
        octx.write_trailer().unwrap();

        (width, height)
    }

    fn clip_path(dir: &Path) -> PathBuf {
        dir.join("clip.mp4")
    }

    /// Polls the source to exhaustion, returning all non-empty frames.
    fn drain(source: &mut FfmpegStreamSource) -> Vec<Frame> {
        let mut frames = Vec::new();
        loop {
            match source.next_frame() {
                Ok(frame) if frame.is_empty() => continue,
                Ok(frame) => frames.push(frame),
                Err(_) => return frames,
            }
        }
    }

    #[test]
    fn test_open_returns_stream_info() {
        let dir = tempfile::tempdir().unwrap();
        let path = clip_path(dir.path());
        create_test_clip(&path, 5);

        let mut source = FfmpegStreamSource::new();
        let info = source.open(path.to_str().unwrap()).unwrap();
        assert_eq!(info.width, 160);
        assert_eq!(info.height, 120);
        assert!(info.fps > 0.0);
        assert_eq!(info.source, path.to_str().unwrap());
    }

    #[test]
    fn test_open_nonexistent_errors() {
        let mut source = FfmpegStreamSource::new();
        assert!(source.open("/nonexistent/clip.mp4").is_err());
    }

    #[test]
    fn test_yields_all_frames_then_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = clip_path(dir.path());
        create_test_clip(&path, 5);

        let mut source = FfmpegStreamSource::new();
        source.open(path.to_str().unwrap()).unwrap();

        let frames = drain(&mut source);
        assert_eq!(frames.len(), 5);
        // Exhausted stream keeps failing.
        assert!(source.next_frame().is_err());
    }

    #[test]
    fn test_non_empty_frames_have_sequential_indices() {
        let dir = tempfile::tempdir().unwrap();
        let path = clip_path(dir.path());
        create_test_clip(&path, 4);

        let mut source = FfmpegStreamSource::new();
        source.open(path.to_str().unwrap()).unwrap();

        let frames = drain(&mut source);
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(frame.index(), i);
            assert_eq!(frame.channels(), 3);
            assert_eq!(frame.data().len(), 160 * 120 * 3);
        }
    }

    #[test]
    fn test_next_frame_without_open_errors() {
        let mut source = FfmpegStreamSource::new();
        assert!(source.next_frame().is_err());
    }

    #[test]
    fn test_close_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = clip_path(dir.path());
        create_test_clip(&path, 1);

        let mut source = FfmpegStreamSource::new();
        source.open(path.to_str().unwrap()).unwrap();
        source.close();
        source.close();
        assert!(source.next_frame().is_err());
    }
}
