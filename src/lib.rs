pub mod angle;
#[cfg(feature = "desktop")]
pub mod camera;
pub mod config;
pub mod error;
pub mod frame_loop;
pub mod pose;
pub mod render;
