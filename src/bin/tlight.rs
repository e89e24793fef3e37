//! tlight - traffic light lab front end
//!
//! Labels single files or whole folders with the configured backend,
//! compares primary detections with manual annotations and writes CSV exports.

fn main() -> anyhow::Result<()> {
    traffic_light_lab::cli::run()
}
