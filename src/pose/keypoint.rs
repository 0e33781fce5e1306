use std::fmt;

use crate::error::FrameError;

/// キーポイント採用の信頼度閾値（この値ちょうどは不採用）
pub const CONFIDENCE_THRESHOLD: f32 = 0.3;

/// MoveNet の 17 キーポイント
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(usize)]
pub enum KeypointName {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

impl KeypointName {
    pub const COUNT: usize = 17;

    /// 検出器の出力行の順序。i 行目が ALL[i] に対応する
    pub const ALL: [KeypointName; Self::COUNT] = [
        Self::Nose,
        Self::LeftEye,
        Self::RightEye,
        Self::LeftEar,
        Self::RightEar,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftWrist,
        Self::RightWrist,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
        Self::LeftAnkle,
        Self::RightAnkle,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// 描画ラベルに使う名前
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Nose => "nose",
            Self::LeftEye => "left_eye",
            Self::RightEye => "right_eye",
            Self::LeftEar => "left_ear",
            Self::RightEar => "right_ear",
            Self::LeftShoulder => "left_shoulder",
            Self::RightShoulder => "right_shoulder",
            Self::LeftElbow => "left_elbow",
            Self::RightElbow => "right_elbow",
            Self::LeftWrist => "left_wrist",
            Self::RightWrist => "right_wrist",
            Self::LeftHip => "left_hip",
            Self::RightHip => "right_hip",
            Self::LeftKnee => "left_knee",
            Self::RightKnee => "right_knee",
            Self::LeftAnkle => "left_ankle",
            Self::RightAnkle => "right_ankle",
        }
    }
}

impl fmt::Display for KeypointName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 2次元座標（ピクセル）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

impl Point2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// 単一キーポイント
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    pub name: KeypointName,
    /// ピクセル X 座標
    pub x: f32,
    /// ピクセル Y 座標
    pub y: f32,
    /// 信頼度スコア (0.0〜1.0)
    pub confidence: f32,
}

impl Keypoint {
    pub fn position(&self) -> Point2 {
        Point2::new(self.x, self.y)
    }
}

/// 1フレーム分の信頼度フィルタ済みキーポイント
///
/// 閾値を超えたキーポイントのみを保持する。エントリが無い名前は
/// 「このフレームでは見えていない」を意味する。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeypointMap {
    entries: [Option<Keypoint>; KeypointName::COUNT],
}

impl KeypointMap {
    /// 検出器の 17 行 `(y, x, confidence)` からマップを作る
    pub fn extract(rows: &[[f32; 3]], width: u32, height: u32) -> Result<Self, FrameError> {
        Self::extract_with_threshold(rows, width, height, CONFIDENCE_THRESHOLD)
    }

    /// 閾値を指定して抽出。`confidence > threshold` のみ採用
    ///
    /// 出力の軸順は (y, x) なので、x には 1 列目、y には 0 列目を使う。
    pub fn extract_with_threshold(
        rows: &[[f32; 3]],
        width: u32,
        height: u32,
        threshold: f32,
    ) -> Result<Self, FrameError> {
        if rows.len() != KeypointName::COUNT {
            return Err(FrameError::ShapeMismatch {
                expected: "17 keypoint rows",
                actual: format!("{} rows", rows.len()),
            });
        }

        let mut map = Self::default();
        for (name, &[y_norm, x_norm, confidence]) in KeypointName::ALL.iter().zip(rows) {
            if confidence > threshold {
                map.entries[name.index()] = Some(Keypoint {
                    name: *name,
                    x: x_norm * width as f32,
                    y: y_norm * height as f32,
                    confidence,
                });
            }
        }

        Ok(map)
    }

    pub fn get(&self, name: KeypointName) -> Option<&Keypoint> {
        self.entries[name.index()].as_ref()
    }

    pub fn position(&self, name: KeypointName) -> Option<Point2> {
        self.get(name).map(Keypoint::position)
    }

    pub fn contains(&self, name: KeypointName) -> bool {
        self.entries[name.index()].is_some()
    }

    /// 検出器の行順で列挙
    pub fn iter(&self) -> impl Iterator<Item = &Keypoint> {
        self.entries.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(Option::is_none)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows_with_confidence(confidence: f32) -> Vec<[f32; 3]> {
        vec![[0.5, 0.5, confidence]; KeypointName::COUNT]
    }

    #[test]
    fn test_keypoint_name_order() {
        assert_eq!(KeypointName::COUNT, 17);
        for (i, name) in KeypointName::ALL.iter().enumerate() {
            assert_eq!(name.index(), i);
        }
        assert_eq!(KeypointName::ALL[0], KeypointName::Nose);
        assert_eq!(KeypointName::ALL[KeypointName::COUNT - 1], KeypointName::RightAnkle);
    }

    #[test]
    fn test_keypoint_name_labels() {
        assert_eq!(KeypointName::LeftShoulder.as_str(), "left_shoulder");
        assert_eq!(KeypointName::RightAnkle.to_string(), "right_ankle");
    }

    #[test]
    fn test_extract_threshold_is_strict() {
        for c in [0.0, 0.1, 0.29, 0.3] {
            let map = KeypointMap::extract(&rows_with_confidence(c), 640, 480).unwrap();
            assert!(map.is_empty(), "confidence {} should be filtered", c);
        }

        for c in [0.31, 0.5, 1.0] {
            let map = KeypointMap::extract(&rows_with_confidence(c), 640, 480).unwrap();
            assert_eq!(map.len(), KeypointName::COUNT, "confidence {} should pass", c);
        }
    }

    #[test]
    fn test_extract_scales_y_x_order() {
        let mut rows = rows_with_confidence(0.0);
        // (y, x, confidence)
        rows[KeypointName::LeftWrist.index()] = [0.25, 0.5, 0.9];

        let map = KeypointMap::extract(&rows, 640, 480).unwrap();
        assert_eq!(map.len(), 1);

        let wrist = map.get(KeypointName::LeftWrist).unwrap();
        assert_eq!(wrist.name, KeypointName::LeftWrist);
        // x = 0.5 * 640, y = 0.25 * 480
        assert!((wrist.x - 320.0).abs() < 1e-4);
        assert!((wrist.y - 120.0).abs() < 1e-4);
        assert_eq!(wrist.confidence, 0.9);
        assert!(map.get(KeypointName::RightWrist).is_none());
    }

    #[test]
    fn test_extract_rejects_wrong_row_count() {
        let rows = vec![[0.5, 0.5, 1.0]; 16];
        let err = KeypointMap::extract(&rows, 640, 480).unwrap_err();
        assert!(matches!(err, FrameError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_extract_ignores_nan_confidence() {
        let mut rows = rows_with_confidence(1.0);
        rows[KeypointName::Nose.index()][2] = f32::NAN;
        let map = KeypointMap::extract(&rows, 640, 480).unwrap();
        assert!(!map.contains(KeypointName::Nose));
        assert_eq!(map.len(), 16);
    }

    #[test]
    fn test_iter_follows_detector_order() {
        let map = KeypointMap::extract(&rows_with_confidence(0.8), 100, 100).unwrap();
        let names: Vec<_> = map.iter().map(|kp| kp.name).collect();
        assert_eq!(names, KeypointName::ALL.to_vec());
    }
}
