pub mod detector;
pub mod keypoint;
#[cfg(feature = "desktop")]
pub mod movenet;
#[cfg(feature = "desktop")]
pub mod preprocess;

pub use detector::{first_person_rows, DetectorOutput, PoseDetector};
pub use keypoint::{Keypoint, KeypointMap, KeypointName, Point2, CONFIDENCE_THRESHOLD};
#[cfg(feature = "desktop")]
pub use movenet::MoveNetDetector;
#[cfg(feature = "desktop")]
pub use preprocess::{preprocess_for_movenet, MOVENET_INPUT_SIZE};
