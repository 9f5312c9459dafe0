pub mod bbox;
pub mod constants;
pub mod device;
pub mod frame;
pub mod video_metadata;
