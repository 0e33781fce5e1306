use anyhow::{Context, Result};
use ndarray::{Array4, ArrayD};
use opencv::core::Mat;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;

use super::detector::PoseDetector;
use super::preprocess::{preprocess_for_movenet, MOVENET_INPUT_SIZE};
use crate::error::BoundaryError;

const INPUT_NAME: &str = "serving_default_input_0";
const OUTPUT_NAME: &str = "StatefulPartitionedCall_0";

/// MoveNet (single pose) を ONNX Runtime で動かす検出器
pub struct MoveNetDetector {
    session: Session,
    input_size: i32,
}

impl MoveNetDetector {
    /// ONNXモデルを読み込んで初期化
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self, BoundaryError> {
        let session = load_session(model_path.as_ref()).map_err(BoundaryError::ModelLoad)?;
        log::info!("MoveNet model loaded from {}", model_path.as_ref().display());

        Ok(Self {
            session,
            input_size: MOVENET_INPUT_SIZE,
        })
    }
}

fn load_session(model_path: &Path) -> Result<Session> {
    let builder = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?;

    #[cfg(feature = "cuda")]
    let builder = {
        log::info!("[ort] Attempting CUDA execution provider...");
        builder.with_execution_providers([ort::execution_providers::CUDAExecutionProvider::default().build()])?
    };

    builder
        .commit_from_file(model_path)
        .with_context(|| format!("Failed to load ONNX model {}", model_path.display()))
}

impl PoseDetector<Mat> for MoveNetDetector {
    type Input = Array4<f32>;
    type Output = ArrayD<f32>;

    /// 入力: BGR フレーム → [1, 192, 192, 3] の f32 テンソル
    fn preprocess(&mut self, frame: &Mat) -> Result<Array4<f32>> {
        preprocess_for_movenet(frame, self.input_size)
    }

    /// 出力: [1, 1, 17, 3] (y, x, confidence)
    fn predict(&mut self, input: Array4<f32>) -> Result<ArrayD<f32>> {
        let input_tensor = Tensor::from_array(input)?;
        let outputs = self
            .session
            .run(ort::inputs![INPUT_NAME => input_tensor])
            .context("Inference failed")?;

        let output: ndarray::ArrayViewD<f32> = outputs[OUTPUT_NAME]
            .try_extract_array()
            .context("Failed to extract output tensor")?;

        Ok(output.to_owned())
    }
}
