use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::pose::CONFIDENCE_THRESHOLD;
use crate::render::SkeletonStyle;

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub pose: PoseConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub frame_loop: FrameLoopConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CameraConfig {
    #[serde(default)]
    pub index: i32,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_camera_fps")]
    pub fps: u32,
}

fn default_width() -> u32 { 640 }
fn default_height() -> u32 { 480 }
fn default_camera_fps() -> u32 { 30 }

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 0,
            width: default_width(),
            height: default_height(),
            fps: default_camera_fps(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    /// MoveNet singlepose lightning (ONNX)
    #[serde(default = "default_model_path")]
    pub path: String,
}

fn default_model_path() -> String { "models/movenet_lightning.onnx".to_string() }

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: default_model_path(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PoseConfig {
    /// これを超える信頼度のキーポイントのみ採用
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,
}

fn default_confidence_threshold() -> f32 { CONFIDENCE_THRESHOLD }

impl Default for PoseConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RenderConfig {
    #[serde(default = "default_window_title")]
    pub window_title: String,
    #[serde(default = "default_marker_radius")]
    pub marker_radius: f32,
    #[serde(default = "default_label_offset_x")]
    pub label_offset_x: f32,
    #[serde(default = "default_label_offset_y")]
    pub label_offset_y: f32,
    #[serde(default = "default_line_width")]
    pub line_width: f32,
    #[serde(default = "default_font_scale")]
    pub font_scale: f64,
}

fn default_window_title() -> String { "Pose Feedback".to_string() }
fn default_marker_radius() -> f32 { 5.0 }
fn default_label_offset_x() -> f32 { 10.0 }
fn default_label_offset_y() -> f32 { 5.0 }
fn default_line_width() -> f32 { 2.0 }
fn default_font_scale() -> f64 { 0.4 }

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            window_title: default_window_title(),
            marker_radius: default_marker_radius(),
            label_offset_x: default_label_offset_x(),
            label_offset_y: default_label_offset_y(),
            line_width: default_line_width(),
            font_scale: default_font_scale(),
        }
    }
}

impl From<&RenderConfig> for SkeletonStyle {
    fn from(config: &RenderConfig) -> Self {
        Self {
            marker_radius: config.marker_radius,
            label_offset: (config.label_offset_x, config.label_offset_y),
            line_width: config.line_width,
            ..SkeletonStyle::default()
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FrameLoopConfig {
    /// 0 なら制限なし
    #[serde(default = "default_target_fps")]
    pub target_fps: u32,
    /// FPS と角度をログに出す間隔（秒）
    #[serde(default = "default_report_interval_secs")]
    pub report_interval_secs: f32,
}

fn default_target_fps() -> u32 { 30 }
fn default_report_interval_secs() -> f32 { 1.0 }

impl Default for FrameLoopConfig {
    fn default() -> Self {
        Self {
            target_fps: default_target_fps(),
            report_interval_secs: default_report_interval_secs(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// 読み込みに失敗したらデフォルト設定を使う
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("{:#}; using default config", e);
                Self::default()
            }
        }
    }
}
