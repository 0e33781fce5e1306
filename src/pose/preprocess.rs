use anyhow::{bail, Result};
use ndarray::Array4;
use opencv::{
    core::{Mat, Size, Vec3f, CV_32FC3},
    imgproc,
    prelude::*,
};

/// MoveNet用の入力サイズ
pub const MOVENET_INPUT_SIZE: i32 = 192;

/// OpenCV Mat を MoveNet用の入力テンソルに変換
///
/// - BGR -> RGB
/// - size x size にリサイズ
/// - [1, size, size, 3] の f32 テンソルに変換 (0.0-255.0)
///
/// 途中の Mat はこの関数を抜けた時点で解放される。
pub fn preprocess_for_movenet(frame: &Mat, size: i32) -> Result<Array4<f32>> {
    if frame.empty() {
        bail!("empty frame");
    }
    if frame.channels() != 3 {
        bail!("expected a 3-channel BGR frame, got {} channels", frame.channels());
    }

    let mut rgb = Mat::default();
    imgproc::cvt_color_def(frame, &mut rgb, imgproc::COLOR_BGR2RGB)?;

    let mut resized = Mat::default();
    imgproc::resize(
        &rgb,
        &mut resized,
        Size::new(size, size),
        0.0,
        0.0,
        imgproc::INTER_LINEAR,
    )?;

    let mut float_mat = Mat::default();
    resized.convert_to(&mut float_mat, CV_32FC3, 1.0, 0.0)?;

    let s = size as usize;
    let mut tensor = Array4::<f32>::zeros((1, s, s, 3));
    for y in 0..size {
        for x in 0..size {
            let pixel = float_mat.at_2d::<Vec3f>(y, x)?;
            for c in 0..3 {
                tensor[[0, y as usize, x as usize, c]] = pixel[c];
            }
        }
    }

    Ok(tensor)
}
