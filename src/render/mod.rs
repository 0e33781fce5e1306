#[cfg(feature = "desktop")]
pub mod canvas;
pub mod skeleton;
#[cfg(feature = "desktop")]
pub mod window;

#[cfg(feature = "desktop")]
pub use canvas::MatCanvas;
pub use skeleton::{
    render_skeleton, visible_connections, DrawSurface, Rgb, SkeletonStyle, SKELETON_CONNECTIONS,
};
#[cfg(feature = "desktop")]
pub use window::PreviewWindow;
