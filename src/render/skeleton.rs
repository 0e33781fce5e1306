use anyhow::Result;

use crate::pose::{KeypointMap, KeypointName, Point2};

/// 骨格の接続定義 (キーポイント, キーポイント)
pub const SKELETON_CONNECTIONS: [(KeypointName, KeypointName); 18] = [
    // 顔
    (KeypointName::Nose, KeypointName::LeftEye),
    (KeypointName::Nose, KeypointName::RightEye),
    (KeypointName::LeftEye, KeypointName::LeftEar),
    (KeypointName::RightEye, KeypointName::RightEar),
    // 首
    (KeypointName::Nose, KeypointName::LeftShoulder),
    (KeypointName::Nose, KeypointName::RightShoulder),
    // 腕
    (KeypointName::LeftShoulder, KeypointName::LeftElbow),
    (KeypointName::RightShoulder, KeypointName::RightElbow),
    (KeypointName::LeftElbow, KeypointName::LeftWrist),
    (KeypointName::RightElbow, KeypointName::RightWrist),
    // 胴体
    (KeypointName::LeftShoulder, KeypointName::RightShoulder),
    (KeypointName::LeftShoulder, KeypointName::LeftHip),
    (KeypointName::RightShoulder, KeypointName::RightHip),
    (KeypointName::LeftHip, KeypointName::RightHip),
    // 脚
    (KeypointName::LeftHip, KeypointName::LeftKnee),
    (KeypointName::RightHip, KeypointName::RightKnee),
    (KeypointName::LeftKnee, KeypointName::LeftAnkle),
    (KeypointName::RightKnee, KeypointName::RightAnkle),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// 0x00RRGGBB
    pub fn to_u32(self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }
}

/// キーポイントの色
pub const KEYPOINT_COLOR: Rgb = Rgb::new(255, 0, 0); // 赤

/// ラベル文字の色
pub const LABEL_COLOR: Rgb = Rgb::new(255, 255, 255); // 白

/// 骨格線の色
pub const SKELETON_COLOR: Rgb = Rgb::new(0, 255, 0); // ライム

/// オーバーレイの描画先
pub trait DrawSurface {
    /// 背景として描く画像（カメラフレーム）
    type Image: ?Sized;

    fn clear(&mut self) -> Result<()>;

    fn draw_image(&mut self, image: &Self::Image) -> Result<()>;

    /// 塗りつぶし円
    fn draw_circle(&mut self, center: Point2, radius: f32, color: Rgb) -> Result<()>;

    fn draw_line(&mut self, from: Point2, to: Point2, width: f32, color: Rgb) -> Result<()>;

    /// `origin` は文字列の左下
    fn draw_text(&mut self, text: &str, origin: Point2, color: Rgb) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkeletonStyle {
    pub marker_radius: f32,
    pub label_offset: (f32, f32),
    pub line_width: f32,
    pub keypoint_color: Rgb,
    pub label_color: Rgb,
    pub skeleton_color: Rgb,
}

impl Default for SkeletonStyle {
    fn default() -> Self {
        Self {
            marker_radius: 5.0,
            label_offset: (10.0, 5.0),
            line_width: 2.0,
            keypoint_color: KEYPOINT_COLOR,
            label_color: LABEL_COLOR,
            skeleton_color: SKELETON_COLOR,
        }
    }
}

/// 両端が揃っている接続を線分 (始点, 終点) として返す
pub fn visible_connections(keypoints: &KeypointMap) -> impl Iterator<Item = (Point2, Point2)> + '_ {
    SKELETON_CONNECTIONS
        .iter()
        .filter_map(|&(a, b)| Some((keypoints.position(a)?, keypoints.position(b)?)))
}

/// フレーム画像の上に骨格を描画
///
/// 骨格線を先に描き、その上にキーポイントとラベルを重ねる。
/// 片方の端点が欠けた接続は描かない。
pub fn render_skeleton<S>(
    surface: &mut S,
    image: &S::Image,
    keypoints: &KeypointMap,
    style: &SkeletonStyle,
) -> Result<()>
where
    S: DrawSurface + ?Sized,
{
    surface.clear()?;
    surface.draw_image(image)?;

    for (from, to) in visible_connections(keypoints) {
        surface.draw_line(from, to, style.line_width, style.skeleton_color)?;
    }

    let (dx, dy) = style.label_offset;
    for kp in keypoints.iter() {
        let center = kp.position();
        surface.draw_circle(center, style.marker_radius, style.keypoint_color)?;
        surface.draw_text(kp.name.as_str(), center.offset(dx, dy), style.label_color)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Op {
        Clear,
        Image,
        Circle(Point2),
        Line(Point2, Point2),
        Text(String, Point2),
    }

    #[derive(Default)]
    struct RecordingSurface {
        ops: Vec<Op>,
    }

    impl RecordingSurface {
        fn lines(&self) -> Vec<(Point2, Point2)> {
            self.ops
                .iter()
                .filter_map(|op| match op {
                    Op::Line(a, b) => Some((*a, *b)),
                    _ => None,
                })
                .collect()
        }
    }

    impl DrawSurface for RecordingSurface {
        type Image = ();

        fn clear(&mut self) -> Result<()> {
            self.ops.push(Op::Clear);
            Ok(())
        }

        fn draw_image(&mut self, _image: &()) -> Result<()> {
            self.ops.push(Op::Image);
            Ok(())
        }

        fn draw_circle(&mut self, center: Point2, _radius: f32, _color: Rgb) -> Result<()> {
            self.ops.push(Op::Circle(center));
            Ok(())
        }

        fn draw_line(&mut self, from: Point2, to: Point2, _width: f32, _color: Rgb) -> Result<()> {
            self.ops.push(Op::Line(from, to));
            Ok(())
        }

        fn draw_text(&mut self, text: &str, origin: Point2, _color: Rgb) -> Result<()> {
            self.ops.push(Op::Text(text.to_string(), origin));
            Ok(())
        }
    }

    fn map_with(points: &[(KeypointName, f32, f32)]) -> KeypointMap {
        let mut rows = vec![[0.0f32, 0.0, 0.0]; KeypointName::COUNT];
        for &(name, x, y) in points {
            rows[name.index()] = [y, x, 1.0];
        }
        KeypointMap::extract(&rows, 1, 1).unwrap()
    }

    #[test]
    fn test_connection_table() {
        assert_eq!(SKELETON_CONNECTIONS.len(), 18);
        for (a, b) in SKELETON_CONNECTIONS {
            assert_ne!(a, b);
        }
        // 重複なし（順不同）
        for (i, &(a, b)) in SKELETON_CONNECTIONS.iter().enumerate() {
            for &(c, d) in &SKELETON_CONNECTIONS[i + 1..] {
                assert!(!((a == c && b == d) || (a == d && b == c)));
            }
        }
    }

    #[test]
    fn test_partial_arm_draws_only_complete_edges() {
        let map = map_with(&[
            (KeypointName::LeftShoulder, 10.0, 10.0),
            (KeypointName::LeftElbow, 20.0, 20.0),
        ]);

        let mut surface = RecordingSurface::default();
        render_skeleton(&mut surface, &(), &map, &SkeletonStyle::default()).unwrap();

        assert_eq!(
            surface.lines(),
            vec![(Point2::new(10.0, 10.0), Point2::new(20.0, 20.0))]
        );
        let circles = surface.ops.iter().filter(|op| matches!(op, Op::Circle(_))).count();
        assert_eq!(circles, 2);
    }

    #[test]
    fn test_draw_order() {
        let map = map_with(&[
            (KeypointName::LeftHip, 10.0, 50.0),
            (KeypointName::RightHip, 30.0, 50.0),
        ]);

        let mut surface = RecordingSurface::default();
        render_skeleton(&mut surface, &(), &map, &SkeletonStyle::default()).unwrap();

        assert_eq!(surface.ops[0], Op::Clear);
        assert_eq!(surface.ops[1], Op::Image);
        assert!(matches!(surface.ops[2], Op::Line(..)));
        // 線より後にマーカーとラベル
        assert!(surface.ops[3..].iter().all(|op| matches!(op, Op::Circle(_) | Op::Text(..))));
        assert_eq!(
            surface.ops[3..],
            [
                Op::Circle(Point2::new(10.0, 50.0)),
                Op::Text("left_hip".to_string(), Point2::new(20.0, 55.0)),
                Op::Circle(Point2::new(30.0, 50.0)),
                Op::Text("right_hip".to_string(), Point2::new(40.0, 55.0)),
            ]
        );
    }

    #[test]
    fn test_empty_map_draws_only_background() {
        let mut surface = RecordingSurface::default();
        render_skeleton(&mut surface, &(), &KeypointMap::default(), &SkeletonStyle::default())
            .unwrap();
        assert_eq!(surface.ops, vec![Op::Clear, Op::Image]);
    }

    #[test]
    fn test_visible_connections_full_body() {
        let points: Vec<_> = KeypointName::ALL.iter().map(|&n| (n, 0.5, 0.5)).collect();
        let map = map_with(&points);
        assert_eq!(visible_connections(&map).count(), SKELETON_CONNECTIONS.len());
    }

    #[test]
    fn test_visible_connections_yield_endpoints() {
        let map = map_with(&[
            (KeypointName::LeftShoulder, 0.25, 0.5),
            (KeypointName::LeftElbow, 0.5, 0.75),
            (KeypointName::RightWrist, 0.1, 0.1),
        ]);
        let segments: Vec<_> = visible_connections(&map).collect();
        assert_eq!(segments, vec![(Point2::new(0.25, 0.5), Point2::new(0.5, 0.75))]);
    }

    #[test]
    fn test_rgb_to_u32() {
        assert_eq!(SKELETON_COLOR.to_u32(), 0x00FF00);
        assert_eq!(Rgb::new(0x12, 0x34, 0x56).to_u32(), 0x123456);
    }
}
