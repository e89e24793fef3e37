use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use tempfile::tempdir;

use traffic_light_lab::annotation::AnnotationBook;
use traffic_light_lab::batch::{BatchOptions, CancelToken, FileStatus, Orchestrator};
use traffic_light_lab::dataset::validate_label_dir;
use traffic_light_lab::detect::{LabelerRegistry, LightState};
use traffic_light_lab::export::{
    accuracy_csv, batch_accuracy_file_name, batch_csv, batch_results_file_name, write_export,
    BatchReport, ACCURACY_HEADER, BATCH_HEADER,
};
use traffic_light_lab::media::{collect_inputs, scan_folder, MediaType};
use traffic_light_lab::store::{Action, Store};

fn touch(dir: &Path, name: &str, bytes: usize) {
    fs::write(dir.join(name), vec![0u8; bytes]).expect("write fixture");
}

fn orchestrator() -> Orchestrator {
    Orchestrator::new(
        LabelerRegistry::with_builtin(),
        BatchOptions {
            simulate_delay_scale: 0.0,
            preview: false,
        },
    )
}

fn fixture_folder(dir: &Path) {
    touch(dir, "traffic.jpg", 30);
    touch(dir, "cat.jpg", 10);
    touch(dir, "red_stop_sign.jpg", 20);
    touch(dir, "notes.txt", 5);
}

#[test]
fn scans_folder_in_name_order_and_skips_other_files() {
    let dir = tempdir().unwrap();
    fixture_folder(dir.path());
    fs::create_dir(dir.path().join("clips")).unwrap();
    touch(&dir.path().join("clips"), "highway.mp4", 40);

    let files = scan_folder(dir.path()).unwrap();
    let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["cat.jpg", "highway.mp4", "red_stop_sign.jpg", "traffic.jpg"]
    );
    assert_eq!(files[1].media_type, MediaType::Video);
    assert_eq!(files[2].size, 20);
}

#[test]
fn empty_folder_is_rejected() {
    let dir = tempdir().unwrap();
    touch(dir.path(), "readme.md", 3);
    let err = scan_folder(dir.path()).unwrap_err();
    assert!(err.to_string().contains("no supported image/video files"));
}

#[test]
fn folder_batch_with_annotations_and_exports() {
    let dir = tempdir().unwrap();
    fixture_folder(dir.path());
    let annotations_path = dir.path().join("labels.csv");
    fs::write(
        &annotations_path,
        "file_name,label\nred_stop_sign.jpg,red_light\ntraffic.jpg,red_light\ncat.jpg,no_traffic_light\n",
    )
    .unwrap();

    let files = collect_inputs(&[dir.path()]).unwrap();
    let annotations = AnnotationBook::load(&annotations_path).unwrap();
    assert_eq!(annotations.len(), 3);

    let mut store = Store::new();
    store.dispatch(Action::SelectFolder(files));
    for annotation in &annotations {
        store.dispatch(Action::Annotate(annotation.clone()));
    }
    let mut progress = Vec::new();
    store.run_batch_with(&orchestrator(), &CancelToken::new(), |event| {
        if let traffic_light_lab::BatchEvent::Completed { progress: p, .. } = event {
            progress.push(*p);
        }
    });

    let state = store.state();
    assert_eq!(progress.len(), 3);
    assert_eq!(progress.last().copied(), Some(100.0));
    assert!(state.results.iter().all(|r| r.status == FileStatus::Completed));
    assert!(state.results[0].detections.is_empty());
    assert_eq!(state.results[1].detections.len(), 1);
    assert_eq!(state.results[2].detections.len(), 3);

    // cat.jpg has no detections, so it yields no comparison.
    assert_eq!(state.comparisons.len(), 2);
    let metrics = state.metrics().unwrap();
    assert_eq!(metrics.total, 2);
    assert_eq!(metrics.correct, 1);
    assert_eq!(metrics.accuracy, 50.0);
    let red = &metrics.per_class[&LightState::RedLight];
    assert_eq!((red.correct, red.total), (1, 2));

    let export_dir = dir.path().join("exports");
    let date = NaiveDate::from_ymd_opt(2024, 5, 17).unwrap();
    let batch_path = write_export(
        &export_dir,
        &batch_results_file_name(date),
        &batch_csv(&state.results),
    )
    .unwrap();
    assert!(batch_path.ends_with("traffic_light_batch_results_2024-05-17.csv"));
    let batch = fs::read_to_string(&batch_path).unwrap();
    let lines: Vec<&str> = batch.lines().collect();
    assert_eq!(lines[0], BATCH_HEADER);
    assert_eq!(lines.len(), 4);
    assert!(lines[1].starts_with("cat.jpg,10,0,"));
    assert!(lines[3].contains("red_light; yellow_light; green_light"));

    let accuracy_path = write_export(
        &export_dir,
        &batch_accuracy_file_name(date),
        &accuracy_csv(&state.comparisons),
    )
    .unwrap();
    let accuracy = fs::read_to_string(accuracy_path).unwrap();
    let lines: Vec<&str> = accuracy.lines().collect();
    assert_eq!(lines[0], ACCURACY_HEADER);
    assert!(lines[1].starts_with("red_stop_sign.jpg,red_light,red_light,"));
    assert!(lines[1].ends_with(",Yes,✓"));
    assert!(lines[2].starts_with("traffic.jpg,red_light,green_light,"));
    assert!(lines[2].ends_with(",No,✗"));

    let report = BatchReport::new(&state.results, &state.comparisons, false);
    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert_eq!(json["results"].as_array().unwrap().len(), 3);
    assert_eq!(json["metrics"]["accuracy"], 50.0);
    assert_eq!(json["cancelled"], false);
}

#[test]
fn cancelled_folder_batch_keeps_pending_files() {
    let dir = tempdir().unwrap();
    fixture_folder(dir.path());
    let files = scan_folder(dir.path()).unwrap();

    let cancel = CancelToken::new();
    let mut seen = 0;
    let outcome = orchestrator().run(&files, &AnnotationBook::new(), &cancel, |event| {
        if let traffic_light_lab::BatchEvent::Completed { .. } = event {
            seen += 1;
            cancel.cancel();
        }
    });

    assert!(outcome.cancelled);
    assert_eq!(seen, 1);
    assert_eq!(outcome.results[0].status, FileStatus::Completed);
    assert_eq!(outcome.results[1].status, FileStatus::Pending);
    assert_eq!(outcome.results[2].status, FileStatus::Pending);
    assert!((outcome.progress() - 100.0 / 3.0).abs() < 1e-9);
}

#[test]
fn validates_yolo_label_directory() {
    let dir = tempdir().unwrap();
    let labels = dir.path().join("labels");
    let images = dir.path().join("images");
    fs::create_dir_all(&labels).unwrap();
    fs::create_dir_all(&images).unwrap();
    touch(&images, "good.jpg", 1);
    touch(&images, "bad.png", 1);
    fs::write(labels.join("good.txt"), "0 0.5 0.5 0.1 0.2\n3 0.1 0.1 0.05 0.05\n").unwrap();
    fs::write(
        labels.join("bad.txt"),
        "7 0.5 0.5 0.1 0.2\n0 0.5 0.5\n\n1 1.5 0.5 0.1 0.1\n",
    )
    .unwrap();
    fs::write(labels.join("orphan.txt"), "not a label\n").unwrap();
    fs::write(labels.join("ignored.csv"), "not,a,label\n").unwrap();

    let issues = validate_label_dir(&labels, &images).unwrap();
    assert_eq!(issues.len(), 4);
    assert!(issues[..3].iter().all(|i| i.path.ends_with("bad.txt")));
    assert_eq!(issues[0].line, Some(1));
    assert!(issues[0].message.contains("unknown class id"));
    assert_eq!(issues[1].line, Some(2));
    assert_eq!(issues[2].line, Some(4));
    assert!(issues[3].path.ends_with("orphan.txt"));
    assert_eq!(issues[3].line, None);
    assert_eq!(issues[3].message, "missing image");
}
