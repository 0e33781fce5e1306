use anyhow::Result;
use ndarray::{ArrayD, ArrayViewD};

use super::keypoint::KeypointName;
use crate::error::FrameError;

/// 推論結果 `[1, N, 17, 3]` (y, x, confidence) を読み出すためのビュー
pub trait DetectorOutput {
    fn as_view(&self) -> ArrayViewD<'_, f32>;
}

impl DetectorOutput for ArrayD<f32> {
    fn as_view(&self) -> ArrayViewD<'_, f32> {
        self.view()
    }
}

/// 姿勢検出器
///
/// 前処理で作った入力は `predict` に move され、推論が終わった時点で解放される。
pub trait PoseDetector<F> {
    type Input;
    type Output: DetectorOutput;

    fn preprocess(&mut self, frame: &F) -> Result<Self::Input>;

    fn predict(&mut self, input: Self::Input) -> Result<Self::Output>;
}

/// 出力テンソルから先頭人物の 17 行を取り出す
///
/// 人物が 0 件なら `None`。2 人以上いても先頭のみを使う。
pub fn first_person_rows(output: ArrayViewD<'_, f32>) -> Result<Option<Vec<[f32; 3]>>, FrameError> {
    let shape = output.shape();
    if shape.len() != 4 || shape[0] != 1 || shape[2] != KeypointName::COUNT || shape[3] != 3 {
        return Err(FrameError::ShapeMismatch {
            expected: "[1, N, 17, 3]",
            actual: format!("{:?}", shape),
        });
    }

    if shape[1] == 0 {
        return Ok(None);
    }

    let rows = (0..KeypointName::COUNT)
        .map(|i| [output[[0, 0, i, 0]], output[[0, 0, i, 1]], output[[0, 0, i, 2]]])
        .collect();

    Ok(Some(rows))
}
