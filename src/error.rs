use thiserror::Error;

use crate::frame_loop::LoopState;

/// パイプライン起動時のエラー。発生した場合ループは Running に入らない
#[derive(Debug, Error)]
pub enum BoundaryError {
    #[error("failed to load pose model: {0:#}")]
    ModelLoad(anyhow::Error),

    #[error("frame source unavailable: {0:#}")]
    FrameSource(anyhow::Error),

    #[error("frame loop can only start from Idle (current state: {0:?})")]
    InvalidStart(LoopState),
}

/// 1フレーム分の処理で発生するエラー。ループはそのフレームを捨てて継続する
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame capture failed: {0:#}")]
    Capture(anyhow::Error),

    #[error("malformed frame: {0:#}")]
    MalformedFrame(anyhow::Error),

    #[error("detector output shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch {
        expected: &'static str,
        actual: String,
    },

    #[error("inference failed: {0:#}")]
    Inference(anyhow::Error),

    #[error("render failed: {0:#}")]
    Render(anyhow::Error),
}
