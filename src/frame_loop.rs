//! フレームループ
//!
//! 1 回の tick で「フレーム取得 → 前処理 → 推論 → キーポイント抽出 → 描画 → 角度計算 → 公開」
//! を行う。推論は常に 1 件だけで、次の tick は前の tick の後始末が終わってから始まる。
//!
//! 1 イテレーション中に確保するバッファ（フレーム、入力テンソル、出力テンソル、行バッファ）は
//! すべて `process_frame` のスコープが所有する。途中で失敗して `?` で抜けた場合も
//! スコープ終了時に解放される。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::angle::JointAngles;
use crate::error::{BoundaryError, FrameError};
use crate::pose::{first_person_rows, DetectorOutput, KeypointMap, PoseDetector, CONFIDENCE_THRESHOLD};
use crate::render::{render_skeleton, DrawSurface, SkeletonStyle};

/// ピクセルサイズを持つフレーム
pub trait VideoFrame {
    /// (width, height)
    fn dimensions(&self) -> (u32, u32);
}

/// フレームの供給元（カメラなど）
pub trait FrameSource {
    type Frame: VideoFrame;

    /// 起動前の確認。失敗するとループは Running に入らない
    fn ensure_ready(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn next_frame(&mut self) -> anyhow::Result<Self::Frame>;
}

/// 次の tick のタイミングを決める
pub trait Scheduler {
    /// 前のイテレーションの後始末が終わってから呼ばれ、次の tick まで待つ。
    /// `false` を返すとループを終了する。
    fn schedule_next(&mut self) -> bool;
}

/// 目標 FPS に合わせて待機するスケジューラ
#[derive(Debug)]
pub struct IntervalScheduler {
    period: Option<Duration>,
    last_tick: Option<Instant>,
}

impl IntervalScheduler {
    /// `target_fps` が 0 なら待機しない
    pub fn new(target_fps: u32) -> Self {
        let period = (target_fps > 0).then(|| Duration::from_secs_f64(1.0 / target_fps as f64));
        Self {
            period,
            last_tick: None,
        }
    }
}

impl Scheduler for IntervalScheduler {
    fn schedule_next(&mut self) -> bool {
        if let (Some(period), Some(last)) = (self.period, self.last_tick) {
            let elapsed = last.elapsed();
            if elapsed < period {
                std::thread::sleep(period - elapsed);
            }
        }
        self.last_tick = Some(Instant::now());
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    /// 次のイテレーションを開始できる
    Ready,
    /// 推論中
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running(Activity),
    Stopped,
}

/// ループ外から停止を要求するハンドル
///
/// 停止は次のイテレーション境界で反映され、推論中の処理は中断しない。
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// 1 フレーム分の処理結果。次のフレームの結果で置き換えられる
#[derive(Debug, Clone, PartialEq)]
pub struct FrameResult {
    pub frame_index: u64,
    pub keypoints: KeypointMap,
    pub angles: JointAngles,
}

#[derive(Debug)]
pub enum TickOutcome {
    /// 結果を公開した
    Published(u64),
    /// このフレームは失敗したが、ループは継続する
    Skipped(FrameError),
    /// Running(Ready) でないため何もしなかった
    Inactive,
}

pub struct FrameLoop<S, D, C>
where
    S: FrameSource,
    D: PoseDetector<S::Frame>,
    C: DrawSurface<Image = S::Frame>,
{
    source: S,
    detector: D,
    surface: C,
    style: SkeletonStyle,
    confidence_threshold: f32,
    state: LoopState,
    stop: StopHandle,
    next_index: u64,
    frames_skipped: u64,
    last_result: Option<FrameResult>,
}

impl<S, D, C> FrameLoop<S, D, C>
where
    S: FrameSource,
    D: PoseDetector<S::Frame>,
    C: DrawSurface<Image = S::Frame>,
{
    pub fn new(source: S, detector: D, surface: C) -> Self {
        Self {
            source,
            detector,
            surface,
            style: SkeletonStyle::default(),
            confidence_threshold: CONFIDENCE_THRESHOLD,
            state: LoopState::Idle,
            stop: StopHandle::default(),
            next_index: 0,
            frames_skipped: 0,
            last_result: None,
        }
    }

    pub fn with_style(mut self, style: SkeletonStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, LoopState::Running(_))
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// 最後に公開した結果
    pub fn last_result(&self) -> Option<&FrameResult> {
        self.last_result.as_ref()
    }

    pub fn surface(&self) -> &C {
        &self.surface
    }

    pub fn frames_skipped(&self) -> u64 {
        self.frames_skipped
    }

    /// Idle → Running(Ready)
    pub fn start(&mut self) -> Result<(), BoundaryError> {
        if self.state != LoopState::Idle {
            return Err(BoundaryError::InvalidStart(self.state));
        }
        self.source.ensure_ready().map_err(BoundaryError::FrameSource)?;

        self.state = LoopState::Running(Activity::Ready);
        info!("frame loop started");
        Ok(())
    }

    /// 停止する。Stopped からは再開できない
    pub fn stop(&mut self) {
        self.stop.stop();
        self.finish();
    }

    fn finish(&mut self) {
        if self.state != LoopState::Stopped {
            self.state = LoopState::Stopped;
            info!(
                "frame loop stopped ({} frames, {} skipped)",
                self.next_index, self.frames_skipped
            );
        }
    }

    /// 1 イテレーション実行する
    ///
    /// フレーム単位の失敗はここで吸収し、ループは Running(Ready) に戻る。
    pub fn tick(&mut self) -> TickOutcome {
        if self.stop.is_stopped() {
            self.finish();
        }
        if self.state != LoopState::Running(Activity::Ready) {
            return TickOutcome::Inactive;
        }

        self.state = LoopState::Running(Activity::Busy);
        let frame_index = self.next_index;
        self.next_index += 1;

        let outcome = match self.process_frame(frame_index) {
            Ok(result) => {
                debug!(
                    "frame {}: {} keypoints, {} angles",
                    frame_index,
                    result.keypoints.len(),
                    result.angles.determined()
                );
                self.last_result = Some(result);
                TickOutcome::Published(frame_index)
            }
            Err(err) => {
                self.frames_skipped += 1;
                warn!("frame {} skipped: {}", frame_index, err);
                TickOutcome::Skipped(err)
            }
        };

        if self.stop.is_stopped() {
            self.finish();
        } else {
            self.state = LoopState::Running(Activity::Ready);
        }
        outcome
    }

    fn process_frame(&mut self, frame_index: u64) -> Result<FrameResult, FrameError> {
        let frame = self.source.next_frame().map_err(FrameError::Capture)?;
        let (width, height) = frame.dimensions();

        let input = self
            .detector
            .preprocess(&frame)
            .map_err(FrameError::MalformedFrame)?;
        // input は predict に move され、推論後に解放される
        let output = self.detector.predict(input).map_err(FrameError::Inference)?;
        let rows = first_person_rows(output.as_view())?;
        drop(output);

        let keypoints = match rows {
            Some(rows) => KeypointMap::extract_with_threshold(
                &rows,
                width,
                height,
                self.confidence_threshold,
            )?,
            None => {
                debug!("frame {}: no person detected", frame_index);
                KeypointMap::default()
            }
        };

        render_skeleton(&mut self.surface, &frame, &keypoints, &self.style)
            .map_err(FrameError::Render)?;

        let angles = JointAngles::compute(&keypoints);

        Ok(FrameResult {
            frame_index,
            keypoints,
            angles,
        })
    }

    /// 停止するまで tick を繰り返す
    ///
    /// 結果を公開するたびに `publish` を呼ぶ。Idle なら先に `start` する。
    pub fn run<Sch, P>(&mut self, scheduler: &mut Sch, mut publish: P) -> Result<(), BoundaryError>
    where
        Sch: Scheduler + ?Sized,
        P: FnMut(&FrameResult, &C),
    {
        if self.state == LoopState::Idle {
            self.start()?;
        }

        while self.is_running() {
            if let TickOutcome::Published(_) = self.tick() {
                if let Some(result) = &self.last_result {
                    publish(result, &self.surface);
                }
            }

            if self.stop.is_stopped() {
                self.finish();
                break;
            }
            if !scheduler.schedule_next() {
                self.stop();
            }
        }

        Ok(())
    }
}
