use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::formats::{DefaultImageReader, ImageReader, IoError};
use crate::model::{
    DisplayOptions, HistogramScale, ImageRecord, PixelArray, ThresholdConfig, YBounds,
};
use crate::table::{Dataset, RowUpdate};
use image::{GrayImage, Luma};
use ndarray::{Array2, array};
use tempfile::tempdir;

use super::{
    BatchError, CancelToken, CollisionPolicy, Histogram, MASKED_RGBA, NoProgress, compute_stats,
    histogram_above, plan_batch, process_all, render_heatmap, render_preview,
    render_record_preview, viridis,
};

/// Serves pixel arrays from memory; unknown paths behave like missing files.
#[derive(Default)]
struct MemoryReader {
    images: HashMap<PathBuf, PixelArray>,
}

impl MemoryReader {
    fn with(mut self, path: &Path, pixels: PixelArray) -> Self {
        self.images.insert(path.to_path_buf(), pixels);
        self
    }
}

impl ImageReader for MemoryReader {
    fn supports(&self, _path: &Path) -> bool {
        true
    }

    fn read(&self, path: &Path) -> crate::formats::Result<PixelArray> {
        self.images.get(path).cloned().ok_or_else(|| {
            IoError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} not found", path.display()),
            ))
        })
    }
}

fn dataset_of(paths: &[PathBuf]) -> Dataset {
    Dataset::from_selection(paths, None).expect("dataset")
}

fn row_paths(count: usize) -> Vec<PathBuf> {
    (1..=count)
        .map(|index| PathBuf::from(format!("/data/cell_{index:02}.tif")))
        .collect()
}

#[test]
fn threshold_is_inclusive() {
    let pixels = array![[50.0_f32, 49.0], [51.0, 50.0]];
    let stats = compute_stats(&pixels, 50.0);
    assert_eq!(stats.above, 3);
    assert_eq!(stats.fraction, 0.75);
    assert!((stats.mean_value - 151.0 / 3.0).abs() < 1e-9);
}

#[test]
fn nothing_above_threshold_yields_zero_sentinel() {
    let pixels = array![[1.0_f32, 2.0], [3.0, 4.0]];
    let stats = compute_stats(&pixels, 100.0);
    assert_eq!(stats.fraction, 0.0);
    assert_eq!(stats.mean_value, 0.0);

    let empty = Array2::<f32>::zeros((0, 0));
    let stats = compute_stats(&empty, 1.0);
    assert_eq!((stats.fraction, stats.mean_value, stats.total), (0.0, 0.0, 0));
}

#[test]
fn statistics_are_deterministic_over_large_images() {
    let pixels =
        Array2::from_shape_fn((700, 300), |(y, x)| ((y * 31 + x * 17) % 997) as f32 * 0.37);
    let first = compute_stats(&pixels, 100.0);
    let second = compute_stats(&pixels, 100.0);
    assert_eq!(first, second);
    assert!((0.0..=1.0).contains(&first.fraction));

    // Column-major copy goes through the non-contiguous path.
    let transposed = pixels.t().to_owned();
    assert_eq!(compute_stats(&transposed, 100.0).above, first.above);
}

#[test]
fn histogram_places_maximum_in_last_bin() {
    let histogram = Histogram::from_values(&[0.0, 1.0, 2.0, 3.0, 4.0], 4).expect("histogram");
    assert_eq!(histogram.counts, vec![1, 1, 1, 2]);
    assert_eq!(histogram.total(), 5);
    assert_eq!(histogram.bin_width(), 1.0);
    assert_eq!(histogram.bin_center(0), 0.5);
}

#[test]
fn histogram_handles_flat_and_empty_input() {
    let flat = Histogram::from_values(&[7.0; 10], 8).expect("histogram");
    assert!(flat.max > flat.min);
    assert_eq!(flat.total(), 10);
    assert!(Histogram::from_values(&[], 8).is_none());
    assert!(Histogram::from_values(&[f32::NAN], 8).is_none());
}

#[test]
fn above_threshold_histogram_drops_background() {
    let pixels = array![[10.0_f32, 60.0], [70.0, 20.0]];
    let histogram = histogram_above(&pixels, Some(50.0), 10).expect("histogram");
    assert_eq!(histogram.total(), 2);
    assert_eq!(histogram.min, 60.0);
    assert!(histogram_above(&pixels, Some(500.0), 10).is_none());
}

#[test]
fn heatmap_masks_pixels_below_threshold() {
    let pixels = array![[0.0_f32, 10.0], [20.0, 30.0]];
    let masked = render_heatmap(&pixels, Some(15.0));
    assert_eq!(masked.pixel(0, 0), MASKED_RGBA);
    assert_eq!(masked.pixel(1, 0), MASKED_RGBA);
    let [red, green, blue] = viridis(0.0);
    assert_eq!(masked.pixel(0, 1), [red, green, blue, 255]);
    let [red, green, blue] = viridis(1.0);
    assert_eq!(masked.pixel(1, 1), [red, green, blue, 255]);

    let plain = render_heatmap(&pixels, None);
    assert_ne!(plain.pixel(0, 0), MASKED_RGBA);
    assert_eq!(plain.rgba.len(), 16);
    assert!(plain.to_rgba_image().is_some());
}

#[test]
fn viridis_endpoints_match_the_palette() {
    assert_eq!(viridis(0.0), [68, 1, 84]);
    assert_eq!(viridis(1.0), [253, 231, 37]);
    assert_eq!(viridis(-3.0), viridis(0.0));
    assert_eq!(viridis(f32::NAN), viridis(0.0));
}

#[test]
fn preview_honours_scale_bounds_and_marker() {
    let pixels = Array2::from_shape_fn((16, 16), |(y, x)| (y * 16 + x) as f32);
    let threshold = ThresholdConfig::new(100.0);

    let linear = render_preview(&pixels, &threshold, &DisplayOptions::default(), 256);
    let plot = linear.histogram.expect("histogram");
    assert_eq!(plot.marker, Some(100.0));
    assert!(!plot.manual_y);
    assert_eq!(plot.histogram.bins(), 256);
    assert_eq!(plot.threshold_at(-50.0), plot.histogram.min);
    assert_eq!(plot.threshold_at(1e6), plot.histogram.max);
    assert_eq!(linear.stats.expect("stats").above, 156);

    let display = DisplayOptions {
        scale: HistogramScale::Log,
        y_bounds: YBounds {
            min: 1.0,
            max: 100.0,
        },
        normalize: false,
    };
    let log = render_preview(&pixels, &ThresholdConfig::default(), &display, 256);
    let plot = log.histogram.expect("histogram");
    assert!(plot.manual_y);
    assert_eq!(plot.y_range, (0.0, 2.0));
    assert!(plot.heights().iter().all(|height| *height >= 0.0));
    assert_eq!(plot.marker, None);
    assert!(log.stats.is_none());

    let inverted = DisplayOptions {
        y_bounds: YBounds { min: 5.0, max: 1.0 },
        ..DisplayOptions::default()
    };
    let auto = render_preview(&pixels, &threshold, &inverted, 256);
    assert!(!auto.histogram.expect("histogram").manual_y);
}

#[test]
fn record_preview_loads_pixels_once() {
    struct CountingReader(Mutex<usize>);
    impl ImageReader for CountingReader {
        fn supports(&self, _path: &Path) -> bool {
            true
        }
        fn read(&self, _path: &Path) -> crate::formats::Result<PixelArray> {
            *self.0.lock().expect("lock") += 1;
            Ok(array![[1.0_f32, 2.0], [3.0, 4.0]])
        }
    }

    let reader = CountingReader(Mutex::new(0));
    let mut record = ImageRecord::new("/data/a.tif");
    let display = DisplayOptions::default();
    for value in [1.0, 2.0, 3.0] {
        let threshold = ThresholdConfig::new(value);
        render_record_preview(&mut record, &reader, &threshold, &display, 16).expect("preview");
    }
    assert_eq!(*reader.0.lock().expect("lock"), 1);
}

#[test]
fn scenario_three_images_at_threshold_fifty() {
    let dir = tempdir().expect("tempdir");
    let images: [[u8; 4]; 3] = [[10, 60, 70, 20], [100, 100, 0, 0], [49, 49, 51, 51]];
    let paths = images
        .iter()
        .enumerate()
        .map(|(index, values)| {
            let path = dir.path().join(format!("img_{index}.png"));
            let image = GrayImage::from_fn(2, 2, |x, y| Luma([values[(y * 2 + x) as usize]]));
            image.save(&path).expect("write png");
            path
        })
        .collect::<Vec<_>>();

    let mut dataset = dataset_of(&paths);
    let report = process_all(
        &mut dataset,
        &ThresholdConfig::new(50.0),
        None,
        &DefaultImageReader,
        &NoProgress,
        &CancelToken::new(),
    )
    .expect("batch");
    assert_eq!(report.processed, 3);
    assert!(report.succeeded());
    assert_eq!(report.saved_to, None);

    let results = dataset
        .rows()
        .iter()
        .map(|row| (row.threshold(), row.fraction(), row.mean_value()))
        .collect::<Vec<_>>();
    assert_eq!(
        results,
        vec![
            (Some(50.0), Some(0.5), Some(65.0)),
            (Some(50.0), Some(0.5), Some(100.0)),
            (Some(50.0), Some(0.5), Some(51.0)),
        ]
    );
}

#[test]
fn missing_file_is_reported_and_others_are_filled() {
    let paths = row_paths(10);
    let reader = paths
        .iter()
        .enumerate()
        .filter(|(index, _)| *index != 6)
        .fold(MemoryReader::default(), |reader, (_, path)| {
            reader.with(path, array![[10.0_f32, 90.0]])
        });
    let mut dataset = dataset_of(&paths);
    let seen = Mutex::new(Vec::new());
    let progress = |done: usize, total: usize, _label: &str| {
        seen.lock().expect("lock").push((done, total));
    };

    let report = process_all(
        &mut dataset,
        &ThresholdConfig::new(50.0),
        None,
        &reader,
        &progress,
        &CancelToken::new(),
    )
    .expect("batch");
    assert_eq!(report.processed, 9);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].index, 6);
    assert_eq!(report.failures[0].file_path, paths[6]);
    assert!(report.failures[0].reason.contains("not found"));
    assert_eq!(seen.lock().expect("lock").last(), Some(&(10, 10)));

    for (index, row) in dataset.rows().iter().enumerate() {
        assert_eq!(row.fraction().is_some(), index != 6, "row {}", index + 1);
    }

    match report.ensure_complete() {
        Err(BatchError::PartialFailure { failures }) => assert_eq!(failures.len(), 1),
        other => panic!("expected partial failure, got {other:?}"),
    }
}

fn processed_snapshot(dir: &Path) -> (Dataset, MemoryReader, PathBuf) {
    let paths = row_paths(3);
    let reader = paths.iter().fold(MemoryReader::default(), |reader, path| {
        reader.with(path, array![[0.0_f32, 100.0]])
    });
    let mut dataset = dataset_of(&paths);
    let updates = paths
        .iter()
        .map(|path| RowUpdate {
            file_path: path.clone(),
            threshold: 10.0,
            fraction: 0.25,
            mean_value: 42.0,
        })
        .collect::<Vec<_>>();
    dataset.add_or_update_columns(&updates, false).expect("seed");
    let snapshot = dir.join("dataset.json");
    dataset.save_as(&snapshot).expect("save");
    (dataset, reader, snapshot)
}

#[test]
fn collision_without_policy_touches_nothing() {
    let dir = tempdir().expect("tempdir");
    let (dataset, _reader, _snapshot) = processed_snapshot(dir.path());
    let error = plan_batch(&dataset, &ThresholdConfig::new(50.0), None).expect_err("collision");
    assert!(matches!(error, BatchError::ColumnCollision { rows } if rows.len() == 3));
}

#[test]
fn cancel_policy_leaves_dataset_and_file_identical() {
    let dir = tempdir().expect("tempdir");
    let (mut dataset, reader, snapshot) = processed_snapshot(dir.path());
    let before_rows = dataset.clone();
    let before_bytes = fs::read(&snapshot).expect("read");

    let report = process_all(
        &mut dataset,
        &ThresholdConfig::new(50.0),
        Some(&CollisionPolicy::Cancel),
        &reader,
        &NoProgress,
        &CancelToken::new(),
    )
    .expect("batch");
    assert!(report.cancelled);
    assert_eq!(report.processed, 0);
    assert_eq!(dataset, before_rows);
    assert_eq!(fs::read(&snapshot).expect("read"), before_bytes);
}

#[test]
fn overwrite_policy_replaces_values_and_saves_in_place() {
    let dir = tempdir().expect("tempdir");
    let (mut dataset, reader, snapshot) = processed_snapshot(dir.path());
    let report = process_all(
        &mut dataset,
        &ThresholdConfig::new(50.0),
        Some(&CollisionPolicy::Overwrite),
        &reader,
        &NoProgress,
        &CancelToken::new(),
    )
    .expect("batch");
    assert_eq!(report.saved_to.as_deref(), Some(snapshot.as_path()));

    let reloaded = Dataset::load(&snapshot).expect("load");
    for row in reloaded.rows() {
        assert_eq!(row.threshold(), Some(50.0));
        assert_eq!(row.fraction(), Some(0.5));
        assert_eq!(row.mean_value(), Some(100.0));
    }
}

#[test]
fn save_as_policy_keeps_original_snapshot() {
    let dir = tempdir().expect("tempdir");
    let (mut dataset, reader, snapshot) = processed_snapshot(dir.path());
    let before_bytes = fs::read(&snapshot).expect("read");
    let target = dir.path().join("rerun.json");

    let report = process_all(
        &mut dataset,
        &ThresholdConfig::new(50.0),
        Some(&CollisionPolicy::SaveAs(target.clone())),
        &reader,
        &NoProgress,
        &CancelToken::new(),
    )
    .expect("batch");
    assert_eq!(report.saved_to.as_deref(), Some(target.as_path()));
    assert_eq!(fs::read(&snapshot).expect("read"), before_bytes);
    assert_eq!(dataset.storage_path(), Some(target.as_path()));

    let saved = Dataset::load(&target).expect("load");
    assert!(saved.rows().iter().all(|row| row.threshold() == Some(50.0)));
}

#[test]
fn disabled_threshold_is_rejected() {
    let dataset = dataset_of(&row_paths(2));
    let disabled = ThresholdConfig {
        value: 10.0,
        enabled: false,
    };
    assert!(matches!(
        plan_batch(&dataset, &disabled, None),
        Err(BatchError::ThresholdDisabled)
    ));
}

#[test]
fn cancellation_keeps_rows_already_processed() {
    let paths = row_paths(5);
    let reader = paths.iter().fold(MemoryReader::default(), |reader, path| {
        reader.with(path, array![[60.0_f32, 0.0]])
    });
    let mut dataset = dataset_of(&paths);
    let cancel = CancelToken::new();
    let progress = |done: usize, _total: usize, _label: &str| {
        if done == 2 {
            cancel.cancel();
        }
    };

    let plan = plan_batch(&dataset, &ThresholdConfig::new(50.0), None).expect("plan");
    let staged = plan.stage(&reader, &progress, &cancel);
    assert_eq!(staged.updates().len(), 2);
    let report = staged.apply(&mut dataset).expect("apply");
    assert!(report.cancelled);
    assert_eq!(report.processed, 2);
    assert_eq!(dataset.summary().processed, 2);
    assert!(dataset.rows()[2].threshold().is_none());
}

#[test]
fn staged_results_are_rejected_by_a_different_dataset() {
    let dir = tempdir().expect("tempdir");
    let (first_dir, second_dir) = (dir.path().join("a"), dir.path().join("b"));
    fs::create_dir(&first_dir).expect("mkdir");
    fs::create_dir(&second_dir).expect("mkdir");
    let (first, reader, _) = processed_snapshot(&first_dir);
    let (mut second, _, second_snapshot) = processed_snapshot(&second_dir);
    let second_before = second.clone();
    let second_bytes = fs::read(&second_snapshot).expect("read");

    let plan = plan_batch(
        &first,
        &ThresholdConfig::new(50.0),
        Some(&CollisionPolicy::Overwrite),
    )
    .expect("plan");
    let staged = plan.stage(&reader, &NoProgress, &CancelToken::new());
    assert_eq!(staged.updates().len(), 3);

    let error = staged.apply(&mut second).expect_err("other dataset");
    assert!(matches!(error, BatchError::DatasetChanged));
    assert_eq!(second, second_before);
    assert_eq!(fs::read(&second_snapshot).expect("read"), second_bytes);
}

#[test]
fn staged_results_follow_reordering_but_not_relocation() {
    let paths = row_paths(3);
    let reader = paths.iter().fold(MemoryReader::default(), |reader, path| {
        reader.with(path, array![[60.0_f32, 0.0]])
    });
    let threshold = ThresholdConfig::new(50.0);

    let mut reordered = dataset_of(&paths);
    let plan = plan_batch(&reordered, &threshold, None).expect("plan");
    let staged = plan.stage(&reader, &NoProgress, &CancelToken::new());
    reordered.apply_filename_order();
    let report = staged.apply(&mut reordered).expect("apply");
    assert_eq!(report.processed, 3);

    let mut relocated = dataset_of(&paths);
    let plan = plan_batch(&relocated, &threshold, None).expect("plan");
    let staged = plan.stage(&reader, &NoProgress, &CancelToken::new());
    relocated.relocate("/moved").expect("relocate");
    assert!(matches!(
        staged.apply(&mut relocated),
        Err(BatchError::DatasetChanged)
    ));
    assert_eq!(relocated.summary().processed, 0);
}

#[test]
fn non_finite_thresholds_never_reach_the_snapshot() {
    let paths = row_paths(2);
    let mut dataset = dataset_of(&paths);
    for value in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
        let error = plan_batch(&dataset, &ThresholdConfig::new(value), None)
            .expect_err("non-finite threshold");
        assert!(matches!(error, BatchError::InvalidThreshold(_)));
    }

    let update = RowUpdate {
        file_path: paths[0].clone(),
        threshold: f64::INFINITY,
        fraction: 0.5,
        mean_value: 10.0,
    };
    assert!(dataset.add_or_update_columns(&[update], false).is_err());
    assert!(dataset.rows().iter().all(|row| !row.has_statistics()));
}
