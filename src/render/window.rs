use anyhow::{bail, Context, Result};
use minifb::{Key, Window, WindowOptions};
use opencv::core::{Mat, Vec3b};
use opencv::prelude::*;

use super::skeleton::Rgb;

/// 描画済みキャンバスを表示するプレビューウィンドウ（ESC で閉じる）
pub struct PreviewWindow {
    window: Window,
    pixels: Vec<u32>,
    size: (usize, usize),
}

impl PreviewWindow {
    /// 更新レートは FrameLoop 側のスケジューラで決めるので、minifb の制限は外す
    pub fn open(title: &str, width: u32, height: u32) -> Result<Self> {
        let (w, h) = (width as usize, height as usize);
        let options = WindowOptions {
            resize: false,
            ..WindowOptions::default()
        };
        let mut window = Window::new(title, w, h, options)
            .with_context(|| format!("Failed to open {}x{} window", w, h))?;
        window.set_target_fps(0);

        Ok(Self {
            window,
            pixels: vec![0; w * h],
            size: (w, h),
        })
    }

    /// 閉じるボタンまたは ESC で false
    pub fn is_open(&self) -> bool {
        self.window.is_open() && !self.window.is_key_down(Key::Escape)
    }

    /// フレームが描画されない間もキー入力と閉じる操作を受け付ける
    pub fn poll_events(&mut self) {
        self.window.update();
    }

    /// BGR Mat を表示する。ウィンドウより大きい部分は切り捨て
    pub fn present(&mut self, image: &Mat) -> Result<()> {
        if image.channels() != 3 {
            bail!("expected a BGR image, got {} channels", image.channels());
        }

        let (w, h) = self.size;
        let rows = h.min(image.rows().max(0) as usize);
        let cols = w.min(image.cols().max(0) as usize);
        for y in 0..rows {
            let line = &mut self.pixels[y * w..y * w + cols];
            for (x, out) in line.iter_mut().enumerate() {
                let bgr = image.at_2d::<Vec3b>(y as i32, x as i32)?;
                *out = Rgb::new(bgr[2], bgr[1], bgr[0]).to_u32();
            }
        }

        self.window.update_with_buffer(&self.pixels, w, h)?;
        Ok(())
    }
}
