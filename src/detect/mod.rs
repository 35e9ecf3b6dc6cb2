mod backends;
mod input;
mod result;
mod source;

pub use backends::{RecordedSource, SimulatedSource, SimulationProfile};
pub use input::{load_detections, parse_detections};
pub use result::{frame_timestamp, Detection, ObjectClass, Position, TrainStatus, PLANE_EXTENT};
pub use source::DetectionSource;
