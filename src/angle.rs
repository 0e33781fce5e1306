//! 3点からの関節角度計算
//!
//! 角度は頂点 p2 における内角で、p1-p2 と p3-p2 の2ベクトルの内積から求める。

use std::fmt;

use crate::pose::{KeypointMap, KeypointName, Point2};

/// p2 を頂点とする内角（度、整数 0〜180）
///
/// いずれかの点が欠けている場合、または辺の長さが 0 になる退化ケースでは `None`。
pub fn joint_angle(p1: Option<Point2>, p2: Option<Point2>, p3: Option<Point2>) -> Option<u32> {
    let (p1, p2, p3) = (p1?, p2?, p3?);

    // 両端点が重なっている場合も角度は定まらない扱い
    if p1 == p3 {
        return None;
    }

    let v1 = (f64::from(p1.x) - f64::from(p2.x), f64::from(p1.y) - f64::from(p2.y));
    let v2 = (f64::from(p3.x) - f64::from(p2.x), f64::from(p3.y) - f64::from(p2.y));

    let mag1 = v1.0.hypot(v1.1);
    let mag2 = v2.0.hypot(v2.1);
    if mag1 == 0.0 || mag2 == 0.0 {
        return None;
    }

    let cos_theta = (v1.0 * v2.0 + v1.1 * v2.1) / (mag1 * mag2);
    if !cos_theta.is_finite() {
        return None;
    }

    // 浮動小数点誤差で [-1, 1] を僅かに超えると acos が NaN になる
    let radians = cos_theta.clamp(-1.0, 1.0).acos();
    Some(round_degrees(radians.to_degrees()))
}

/// 四捨五入（.5 は 0 から遠い方へ）
fn round_degrees(degrees: f64) -> u32 {
    degrees.round() as u32
}

/// 角度を計測する 8 関節
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AngleJoint {
    LeftElbow,
    RightElbow,
    LeftShoulder,
    RightShoulder,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
}

impl AngleJoint {
    pub const COUNT: usize = 8;

    pub const ALL: [AngleJoint; Self::COUNT] = [
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
    ];

    /// (端点, 頂点, 端点)
    pub fn keypoints(self) -> (KeypointName, KeypointName, KeypointName) {
        use KeypointName::*;
        match self {
            Self::LeftElbow => (LeftShoulder, LeftElbow, LeftWrist),
            Self::RightElbow => (RightShoulder, RightElbow, RightWrist),
            Self::LeftShoulder => (LeftElbow, LeftShoulder, LeftHip),
            Self::RightShoulder => (RightElbow, RightShoulder, RightHip),
            Self::LeftHip => (LeftShoulder, LeftHip, LeftKnee),
            Self::RightHip => (RightShoulder, RightHip, RightKnee),
            Self::LeftKnee => (LeftHip, LeftKnee, LeftAnkle),
            Self::RightKnee => (RightHip, RightKnee, RightAnkle),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::LeftElbow => "leftElbow",
            Self::RightElbow => "rightElbow",
            Self::LeftShoulder => "leftShoulder",
            Self::RightShoulder => "rightShoulder",
            Self::LeftHip => "leftHip",
            Self::RightHip => "rightHip",
            Self::LeftKnee => "leftKnee",
            Self::RightKnee => "rightKnee",
        }
    }

    /// 表示用ラベル
    pub fn label(self) -> &'static str {
        match self {
            Self::LeftElbow => "Left Elbow",
            Self::RightElbow => "Right Elbow",
            Self::LeftShoulder => "Left Shoulder",
            Self::RightShoulder => "Right Shoulder",
            Self::LeftHip => "Left Hip",
            Self::RightHip => "Right Hip",
            Self::LeftKnee => "Left Knee",
            Self::RightKnee => "Right Knee",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AngleSample {
    pub joint: AngleJoint,
    /// 求まらなかった場合は None
    pub degrees: Option<u32>,
}

impl fmt::Display for AngleSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.degrees {
            Some(deg) => write!(f, "{}: {}°", self.joint.label(), deg),
            None => write!(f, "{}: N/A", self.joint.label()),
        }
    }
}

/// 8 関節すべての角度。求まらない関節も必ずエントリを持つ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JointAngles {
    samples: [AngleSample; AngleJoint::COUNT],
}

impl JointAngles {
    /// 各関節を独立に計算する
    pub fn compute(keypoints: &KeypointMap) -> Self {
        let samples = AngleJoint::ALL.map(|joint| {
            let (a, vertex, b) = joint.keypoints();
            AngleSample {
                joint,
                degrees: joint_angle(
                    keypoints.position(a),
                    keypoints.position(vertex),
                    keypoints.position(b),
                ),
            }
        });
        Self { samples }
    }

    pub fn get(&self, joint: AngleJoint) -> Option<u32> {
        self.sample(joint).degrees
    }

    pub fn sample(&self, joint: AngleJoint) -> &AngleSample {
        &self.samples[joint as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = &AngleSample> {
        self.samples.iter()
    }

    /// 角度が求まった関節の数
    pub fn determined(&self) -> usize {
        self.samples.iter().filter(|s| s.degrees.is_some()).count()
    }
}

impl Default for JointAngles {
    fn default() -> Self {
        Self::compute(&KeypointMap::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f32, y: f32) -> Option<Point2> {
        Some(Point2::new(x, y))
    }

    #[test]
    fn test_right_angle() {
        assert_eq!(joint_angle(p(1.0, 0.0), p(0.0, 0.0), p(0.0, 1.0)), Some(90));
    }

    #[test]
    fn test_straight_angle() {
        assert_eq!(joint_angle(p(1.0, 0.0), p(0.0, 0.0), p(-1.0, 0.0)), Some(180));
    }

    #[test]
    #[allow(clippy::excessive_precision)]
    fn test_cosine_rounding_past_minus_one_is_clamped() {
        // f32 の丸めで cos が -1 をわずかに下回るケース
        let a = p(96.908_866_882_324_22, 17.409_116_744_995_117);
        let b = p(27.623_037_338_256_836, 475.200_744_628_906_25);
        let c = p(-53.009_235_382_080_08, 1_007.961_608_886_718_8);
        assert_eq!(joint_angle(a, b, c), Some(180));
        assert_eq!(joint_angle(c, b, a), Some(180));
    }

    #[test]
    fn test_overlapping_limbs_is_absent() {
        assert_eq!(joint_angle(p(1.0, 0.0), p(0.0, 0.0), p(1.0, 0.0)), None);
    }

    #[test]
    fn test_collinear_same_side_is_zero() {
        assert_eq!(joint_angle(p(1.0, 0.0), p(0.0, 0.0), p(2.0, 0.0)), Some(0));
    }

    #[test]
    fn test_zero_length_limb_is_absent() {
        assert_eq!(joint_angle(p(0.0, 0.0), p(0.0, 0.0), p(1.0, 1.0)), None);
        assert_eq!(joint_angle(p(1.0, 1.0), p(0.0, 0.0), p(0.0, 0.0)), None);
    }

    #[test]
    fn test_missing_point_is_absent() {
        assert_eq!(joint_angle(None, p(0.0, 0.0), p(0.0, 1.0)), None);
        assert_eq!(joint_angle(p(1.0, 0.0), None, p(0.0, 1.0)), None);
        assert_eq!(joint_angle(p(1.0, 0.0), p(0.0, 0.0), None), None);
    }

    #[test]
    fn test_non_finite_is_absent() {
        assert_eq!(joint_angle(p(f32::NAN, 0.0), p(0.0, 0.0), p(0.0, 1.0)), None);
        assert_eq!(joint_angle(p(f32::INFINITY, 0.0), p(0.0, 0.0), p(0.0, 1.0)), None);
    }

    #[test]
    fn test_symmetric() {
        let cases = [
            (p(3.0, 1.0), p(0.5, 0.5), p(-2.0, 4.0)),
            (p(100.0, 20.0), p(50.0, 80.0), p(10.0, 30.0)),
            (p(0.1, 0.9), p(0.4, 0.4), p(0.8, 0.2)),
        ];
        for (a, b, c) in cases {
            assert_eq!(joint_angle(a, b, c), joint_angle(c, b, a));
            assert!(joint_angle(a, b, c).is_some());
        }
    }

    #[test]
    fn test_acute_and_obtuse() {
        // 45°
        assert_eq!(joint_angle(p(1.0, 0.0), p(0.0, 0.0), p(1.0, 1.0)), Some(45));
        // 135°
        assert_eq!(joint_angle(p(1.0, 0.0), p(0.0, 0.0), p(-1.0, 1.0)), Some(135));
        // 60° (正三角形)
        let h = 3.0f32.sqrt() / 2.0;
        assert_eq!(joint_angle(p(1.0, 0.0), p(0.0, 0.0), p(0.5, h)), Some(60));
    }

    #[test]
    fn test_round_half_away_from_zero() {
        assert_eq!(round_degrees(44.5), 45);
        assert_eq!(round_degrees(44.49), 44);
        assert_eq!(round_degrees(0.5), 1);
        assert_eq!(round_degrees(179.5), 180);
        assert_eq!(round_degrees(0.0), 0);
    }

    #[test]
    fn test_result_within_range() {
        let vertex = p(0.0, 0.0);
        for i in 0..360 {
            let theta = (i as f32).to_radians();
            let angle = joint_angle(p(1.0, 0.0), vertex, p(theta.cos() * 2.0, theta.sin() * 2.0));
            let deg = angle.expect("non-degenerate");
            assert!(deg <= 180, "{} -> {}", i, deg);
        }
    }

    #[test]
    fn test_joint_angles_complete_when_empty() {
        let angles = JointAngles::compute(&KeypointMap::default());
        assert_eq!(angles.iter().count(), AngleJoint::COUNT);
        assert_eq!(angles.determined(), 0);
        for (sample, joint) in angles.iter().zip(AngleJoint::ALL) {
            assert_eq!(sample.joint, joint);
            assert_eq!(sample.degrees, None);
        }
    }

    #[test]
    fn test_joint_angles_independent() {
        // 左肘まわりだけ見えている
        let mut rows = vec![[0.0f32, 0.0, 0.0]; KeypointName::COUNT];
        rows[KeypointName::LeftShoulder.index()] = [0.5, 0.5, 0.9];
        rows[KeypointName::LeftElbow.index()] = [0.5, 0.6, 0.9];
        rows[KeypointName::LeftWrist.index()] = [0.4, 0.6, 0.9];
        let map = KeypointMap::extract(&rows, 100, 100).unwrap();

        let angles = JointAngles::compute(&map);
        assert_eq!(angles.get(AngleJoint::LeftElbow), Some(90));
        assert_eq!(angles.get(AngleJoint::RightElbow), None);
        assert_eq!(angles.get(AngleJoint::LeftShoulder), None);
        assert_eq!(angles.determined(), 1);
    }

    #[test]
    fn test_angle_sample_display() {
        let sample = AngleSample { joint: AngleJoint::LeftKnee, degrees: Some(172) };
        assert_eq!(sample.to_string(), "Left Knee: 172°");
        let sample = AngleSample { joint: AngleJoint::RightHip, degrees: None };
        assert_eq!(sample.to_string(), "Right Hip: N/A");
        assert_eq!(AngleJoint::RightShoulder.as_str(), "rightShoulder");
    }
}
