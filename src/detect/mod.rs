mod backend;
mod backends;
mod hash;
mod registry;
mod result;

pub use backend::LabelerBackend;
pub use backends::{label_file, simulated_processing_secs, FileNameLabeler};
pub use hash::{name_hash, seeded_unit};
pub use registry::LabelerRegistry;
pub use result::{primary_detection, Detection, LightState, TRAFFIC_LIGHT_CLASS};
