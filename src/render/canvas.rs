use anyhow::{Context, Result};
use opencv::{
    core::{self, Mat, Point, Scalar, Size, CV_8UC3},
    imgproc,
    prelude::*,
};

use super::skeleton::{DrawSurface, Rgb};
use crate::pose::Point2;

/// OpenCV の BGR Mat に描画するキャンバス
pub struct MatCanvas {
    mat: Mat,
    width: i32,
    height: i32,
    font_scale: f64,
}

impl MatCanvas {
    pub fn new(width: u32, height: u32, font_scale: f64) -> Result<Self> {
        let mat = Mat::new_rows_cols_with_default(
            height as i32,
            width as i32,
            CV_8UC3,
            Scalar::all(0.0),
        )
        .context("Failed to allocate canvas")?;

        Ok(Self {
            mat,
            width: width as i32,
            height: height as i32,
            font_scale,
        })
    }

    /// 描画済みの画像
    pub fn mat(&self) -> &Mat {
        &self.mat
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width as u32, self.height as u32)
    }
}

/// RGB -> BGR の Scalar
fn scalar(color: Rgb) -> Scalar {
    Scalar::new(color.b as f64, color.g as f64, color.r as f64, 0.0)
}

fn pixel(p: Point2) -> Point {
    Point::new(p.x.round() as i32, p.y.round() as i32)
}

impl DrawSurface for MatCanvas {
    type Image = Mat;

    fn clear(&mut self) -> Result<()> {
        self.mat.set_to(&Scalar::all(0.0), &core::no_array())?;
        Ok(())
    }

    /// フレームをキャンバス全面に描く（サイズが違えばリサイズ）
    fn draw_image(&mut self, image: &Mat) -> Result<()> {
        if image.cols() == self.width && image.rows() == self.height {
            image.copy_to(&mut self.mat)?;
        } else {
            imgproc::resize(
                image,
                &mut self.mat,
                Size::new(self.width, self.height),
                0.0,
                0.0,
                imgproc::INTER_LINEAR,
            )?;
        }
        Ok(())
    }

    fn draw_circle(&mut self, center: Point2, radius: f32, color: Rgb) -> Result<()> {
        imgproc::circle(
            &mut self.mat,
            pixel(center),
            radius.round() as i32,
            scalar(color),
            imgproc::FILLED,
            imgproc::LINE_AA,
            0,
        )?;
        Ok(())
    }

    fn draw_line(&mut self, from: Point2, to: Point2, width: f32, color: Rgb) -> Result<()> {
        imgproc::line(
            &mut self.mat,
            pixel(from),
            pixel(to),
            scalar(color),
            (width.round() as i32).max(1),
            imgproc::LINE_AA,
            0,
        )?;
        Ok(())
    }

    fn draw_text(&mut self, text: &str, origin: Point2, color: Rgb) -> Result<()> {
        imgproc::put_text(
            &mut self.mat,
            text,
            pixel(origin),
            imgproc::FONT_HERSHEY_SIMPLEX,
            self.font_scale,
            scalar(color),
            1,
            imgproc::LINE_AA,
            false,
        )?;
        Ok(())
    }
}
