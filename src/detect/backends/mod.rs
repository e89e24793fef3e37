pub mod filename;

pub use filename::{label_file, simulated_processing_secs, FileNameLabeler};
