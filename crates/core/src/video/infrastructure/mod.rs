pub mod ffmpeg_stream_source;
