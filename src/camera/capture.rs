use anyhow::{bail, Context, Result};
use opencv::{
    core::Mat,
    prelude::*,
    videoio::{self, VideoCapture, VideoCaptureAPIs},
};

use crate::config::CameraConfig;
use crate::frame_loop::{FrameSource, VideoFrame};

/// OpenCV の VideoCapture から BGR フレームを供給する
pub struct OpenCvCamera {
    capture: VideoCapture,
    index: i32,
    resolution: (u32, u32),
}

impl OpenCvCamera {
    /// 設定の解像度・FPSを要求して開く。実際の値はドライバ次第
    pub fn open(config: &CameraConfig) -> Result<Self> {
        let index = config.index;
        let mut capture = VideoCapture::new(index, VideoCaptureAPIs::CAP_ANY as i32)
            .with_context(|| format!("Failed to open camera {}", index))?;
        if !capture.is_opened()? {
            bail!("Camera {} is not available", index);
        }

        let requested = [
            (videoio::CAP_PROP_FRAME_WIDTH, config.width as f64),
            (videoio::CAP_PROP_FRAME_HEIGHT, config.height as f64),
            (videoio::CAP_PROP_FPS, config.fps as f64),
            // 古いフレームを溜めない
            (videoio::CAP_PROP_BUFFERSIZE, 1.0),
        ];
        for (prop, value) in requested {
            // 未対応のプロパティは false が返るだけなので無視する
            capture.set(prop, value)?;
        }

        let resolution = (
            capture.get(videoio::CAP_PROP_FRAME_WIDTH)? as u32,
            capture.get(videoio::CAP_PROP_FRAME_HEIGHT)? as u32,
        );
        log::info!(
            "Camera {}: {}x{} @ {} fps (requested {}x{} @ {})",
            index,
            resolution.0,
            resolution.1,
            capture.get(videoio::CAP_PROP_FPS)?,
            config.width,
            config.height,
            config.fps
        );

        Ok(Self {
            capture,
            index,
            resolution,
        })
    }

    /// (width, height)
    pub fn resolution(&self) -> (u32, u32) {
        self.resolution
    }
}

impl VideoFrame for Mat {
    fn dimensions(&self) -> (u32, u32) {
        (self.cols() as u32, self.rows() as u32)
    }
}

impl FrameSource for OpenCvCamera {
    type Frame = Mat;

    fn ensure_ready(&mut self) -> Result<()> {
        if !self.capture.is_opened()? {
            bail!("Camera {} was closed", self.index);
        }
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Mat> {
        let mut frame = Mat::default();
        let grabbed = self
            .capture
            .read(&mut frame)
            .with_context(|| format!("Camera {} read failed", self.index))?;
        if !grabbed || frame.empty() {
            bail!("Camera {} returned no frame", self.index);
        }
        Ok(frame)
    }
}
