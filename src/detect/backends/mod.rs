pub mod recorded;
pub mod simulated;

pub use recorded::RecordedSource;
pub use simulated::{SimulatedSource, SimulationProfile};
