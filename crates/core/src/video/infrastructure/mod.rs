pub mod ffmpeg_reader;
pub(crate) mod ffmpeg_util;
pub mod image_file_reader;
pub mod image_file_writer;
