use anyhow::Result;
use log::{error, info};
use std::cell::RefCell;
use std::time::Instant;

use pose_feedback::camera::OpenCvCamera;
use pose_feedback::config::Config;
use pose_feedback::error::BoundaryError;
use pose_feedback::frame_loop::{FrameLoop, IntervalScheduler, Scheduler};
use pose_feedback::pose::MoveNetDetector;
use pose_feedback::render::{MatCanvas, PreviewWindow, SkeletonStyle};

const CONFIG_PATH: &str = "config.toml";

/// フレームの成否に関係なく毎 tick ウィンドウを確認し、閉じられたらループを終える
struct PreviewScheduler<'a> {
    window: &'a RefCell<PreviewWindow>,
    pacing: IntervalScheduler,
}

impl Scheduler for PreviewScheduler<'_> {
    fn schedule_next(&mut self) -> bool {
        let open = {
            let mut window = self.window.borrow_mut();
            window.poll_events();
            window.is_open()
        };
        open && self.pacing.schedule_next()
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config_path = std::env::args().nth(1).unwrap_or_else(|| CONFIG_PATH.to_string());
    let config = Config::load_or_default(&config_path);

    info!("Pose Feedback");
    info!("Press ESC to exit");

    // モデル → カメラの順に準備。どちらかが失敗したらループは始めない
    let detector = MoveNetDetector::new(&config.model.path)?;
    let camera = OpenCvCamera::open(&config.camera).map_err(BoundaryError::FrameSource)?;
    let (width, height) = camera.resolution();

    let canvas = MatCanvas::new(width, height, config.render.font_scale)?;
    let window = RefCell::new(PreviewWindow::open(
        &config.render.window_title,
        width,
        height,
    )?);

    let mut frame_loop = FrameLoop::new(camera, detector, canvas)
        .with_style(SkeletonStyle::from(&config.render))
        .with_confidence_threshold(config.pose.confidence_threshold);
    frame_loop.start()?;

    let stop = frame_loop.stop_handle();
    let mut scheduler = PreviewScheduler {
        window: &window,
        pacing: IntervalScheduler::new(config.frame_loop.target_fps),
    };
    let report_interval = config.frame_loop.report_interval_secs;

    // FPS計測用
    let mut frame_count = 0u32;
    let mut report_timer = Instant::now();

    frame_loop.run(&mut scheduler, |result, canvas| {
        if let Err(e) = window.borrow_mut().present(canvas.mat()) {
            error!("Failed to update window: {:#}", e);
            stop.stop();
            return;
        }

        frame_count += 1;
        let elapsed = report_timer.elapsed().as_secs_f32();
        if elapsed >= report_interval {
            info!(
                "FPS: {:.1}, keypoints: {}/17",
                frame_count as f32 / elapsed,
                result.keypoints.len()
            );
            for sample in result.angles.iter() {
                info!("  {}", sample);
            }
            frame_count = 0;
            report_timer = Instant::now();
        }
    })?;

    info!(
        "Shutting down ({} frames skipped)",
        frame_loop.frames_skipped()
    );
    Ok(())
}
