use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::analysis::{CancelToken, NoProgress};
use crate::formats::{ImageReader, IoError};
use crate::model::{
    DisplayOptions, GroupingRule, HistogramScale, ImageRecord, PixelArray, ThresholdConfig,
};
use crate::report::{
    ExportFormat, PREVIEW_SHEET_SIZE, ReportSheet, Result as ReportResult, SheetBitmap,
    SheetRenderer,
};
use ndarray::Array2;
use tempfile::tempdir;

use super::{AppConfig, AppContext, AppError, ConfigError, Debouncer, JobKind, JobSlot};

#[derive(Default)]
struct FixedReader {
    images: HashMap<PathBuf, PixelArray>,
}

impl ImageReader for FixedReader {
    fn supports(&self, _path: &Path) -> bool {
        true
    }

    fn read(&self, path: &Path) -> crate::formats::Result<PixelArray> {
        self.images.get(path).cloned().ok_or_else(|| {
            IoError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                path.display().to_string(),
            ))
        })
    }
}

/// Paints every sheet white; nothing touches the disk.
struct BlankRenderer;

impl SheetRenderer for BlankRenderer {
    fn render(
        &self,
        _sheet: &ReportSheet,
        _format: ExportFormat,
        _path: &Path,
    ) -> ReportResult<()> {
        Ok(())
    }

    fn rasterize(
        &self,
        sheet: &ReportSheet,
        (width, height): (u32, u32),
    ) -> ReportResult<SheetBitmap> {
        Ok(SheetBitmap {
            group_name: sheet.group_name.clone(),
            width,
            height,
            rgb: vec![255; width as usize * height as usize * 3],
        })
    }
}

fn grouped_files() -> Vec<PathBuf> {
    ["ctrl_1.tif", "ctrl_2.tif", "drug_1.tif"]
        .iter()
        .map(|name| Path::new("/data").join(name))
        .collect()
}

#[test]
fn partial_json_config_keeps_defaults() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("cellsheet.json");
    fs::write(&path, r#"{ "threshold": 12.5, "histogram_bins": 64 }"#).expect("write");

    let config = AppConfig::load(&path).expect("config");
    assert_eq!(config.threshold, 12.5);
    assert_eq!(config.histogram_bins, 64);
    assert_eq!(config.distribution_bins, AppConfig::default().distribution_bins);
    assert_eq!(config.threshold_debounce(), Duration::from_millis(300));
    assert_eq!(config.selection_debounce(), Duration::from_millis(400));
}

#[test]
fn yaml_config_is_read_by_extension() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("cellsheet.yaml");
    fs::write(
        &path,
        "export_format: svg\nexport_folder: sheets\ndisplay:\n  scale: log\n",
    )
    .expect("write");

    let config = AppConfig::resolve(Some(&path)).expect("config");
    assert_eq!(config.export_format, ExportFormat::Svg);
    assert_eq!(config.export_folder, "sheets");
    assert_eq!(config.display.scale, HistogramScale::Log);
}

#[test]
fn invalid_config_is_rejected() {
    let dir = tempdir().expect("tempdir");
    let zero_bins = dir.path().join("zero.json");
    fs::write(&zero_bins, r#"{ "histogram_bins": 0 }"#).expect("write");
    assert!(matches!(
        AppConfig::load(&zero_bins),
        Err(ConfigError::Invalid(_))
    ));

    let garbage = dir.path().join("garbage.json");
    fs::write(&garbage, "{ not json").expect("write");
    assert!(matches!(
        AppConfig::load(&garbage),
        Err(ConfigError::Parse { .. })
    ));

    let missing = dir.path().join("missing.json");
    assert!(matches!(
        AppConfig::load(&missing),
        Err(ConfigError::Read { .. })
    ));
}

#[test]
fn debouncer_fires_once_for_latest_request() {
    let start = Instant::now();
    let mut debouncer = Debouncer::new(Duration::from_millis(300));
    let first = debouncer.schedule(start);
    let second = debouncer.schedule(start + Duration::from_millis(100));
    assert!(!debouncer.is_current(first));

    assert_eq!(debouncer.poll(start + Duration::from_millis(350)), None);
    assert_eq!(
        debouncer.poll(start + Duration::from_millis(400)),
        Some(second)
    );
    assert_eq!(debouncer.poll(start + Duration::from_millis(900)), None);
    assert!(debouncer.is_current(second));

    debouncer.schedule(start + Duration::from_millis(1000));
    debouncer.cancel();
    assert!(!debouncer.is_pending());
    assert_eq!(debouncer.poll(start + Duration::from_secs(5)), None);
}

#[test]
fn job_slot_admits_one_job_at_a_time() {
    let slot = JobSlot::default();
    let guard = slot.try_start(JobKind::Batch).expect("first job");
    assert_eq!(slot.active(), Some(JobKind::Batch));

    let shared = slot.clone();
    assert!(matches!(
        shared.try_start(JobKind::Export),
        Err(AppError::Busy(JobKind::Batch))
    ));

    drop(guard);
    assert!(!slot.is_busy());
    let _export = shared.try_start(JobKind::Export).expect("slot released");
    assert_eq!(slot.active(), Some(JobKind::Export));
}

#[test]
fn session_reuses_cached_preview_pixels() {
    let context = AppContext::new();
    let mut session = context.new_session();
    let rule = GroupingRule::Underscore { start: 0, end: 1 };
    let dataset = context
        .dataset_service()
        .create(&grouped_files(), Some(&rule))
        .expect("dataset");
    session.open_dataset(dataset);

    let path = Path::new("/data/ctrl_2.tif");
    let mut record = session.preview_record(path);
    assert_eq!(record.group, "ctrl");
    assert!(record.pixels().is_none());

    record
        .pixels_or_load(|_| Ok::<_, IoError>(Array2::from_elem((2, 2), 7.0)))
        .expect("pixels");
    session.remember_preview(record);

    assert!(session.preview_record(path).pixels().is_some());
    assert!(
        session
            .preview_record(Path::new("/data/drug_1.tif"))
            .pixels()
            .is_none()
    );
}

#[test]
fn session_requires_an_open_dataset() {
    let mut session = AppContext::new().new_session();
    assert!(matches!(session.require_dataset(), Err(AppError::NoDataset)));
    session.toggle_group("ctrl");
    assert!(session.is_group_selected("ctrl"));
    session.toggle_group("ctrl");
    assert!(!session.is_group_selected("ctrl"));
}

#[test]
fn compose_rejects_unknown_groups() {
    let context = AppContext::new();
    let rule = GroupingRule::Underscore { start: 0, end: 1 };
    let dataset = context
        .dataset_service()
        .create(&grouped_files(), Some(&rule))
        .expect("dataset");
    let display = context.config().display;

    let all = context
        .report_service()
        .compose(&dataset, &[], &display)
        .expect("sheets");
    let names = all
        .iter()
        .map(|sheet| sheet.group_name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["ctrl", "drug"]);

    let error = context
        .report_service()
        .compose(&dataset, &["mutant".to_string()], &display)
        .expect_err("unknown group");
    assert!(matches!(error, AppError::UnknownGroup(name) if name == "mutant"));
}

#[test]
fn sheet_previews_follow_dataset_group_order() {
    let context = AppContext::new().with_renderer(Arc::new(BlankRenderer));
    let rule = GroupingRule::Underscore { start: 0, end: 1 };
    let dataset = context
        .dataset_service()
        .create(&grouped_files(), Some(&rule))
        .expect("dataset");
    let names = ["drug".to_string(), "ctrl".to_string()];
    let sheets = context
        .report_service()
        .compose(&dataset, &names, &context.config().display)
        .expect("sheets");

    let bitmaps = context
        .report_service()
        .preview(&sheets, PREVIEW_SHEET_SIZE)
        .expect("preview");
    let groups = bitmaps
        .iter()
        .map(|bitmap| bitmap.group_name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(groups, vec!["ctrl", "drug"]);
    let (width, height) = PREVIEW_SHEET_SIZE;
    assert!(
        bitmaps
            .iter()
            .all(|bitmap| bitmap.rgb.len() == width as usize * height as usize * 3)
    );
}

#[test]
fn batch_service_fills_rows_through_the_context_reader() {
    let files = grouped_files();
    let mut reader = FixedReader::default();
    for (index, path) in files.iter().enumerate() {
        let pixels = Array2::from_shape_fn((2, 2), |(y, x)| (index * 10 + y * 2 + x) as f32);
        reader.images.insert(path.clone(), pixels);
    }
    let context = AppContext::with_reader(AppConfig::default(), Arc::new(reader));
    let mut dataset = context
        .dataset_service()
        .create(&files, None)
        .expect("dataset");

    let report = context
        .batch_service()
        .run(
            &mut dataset,
            &ThresholdConfig::new(2.0),
            None,
            &NoProgress,
            &CancelToken::new(),
        )
        .expect("batch");
    assert_eq!(report.processed, 3);
    assert!(report.succeeded());

    // ctrl_1 holds 0..=3, so two of four pixels reach 2.0.
    let first = dataset.row(&files[0]).expect("row");
    assert_eq!(first.fraction(), Some(0.5));
    assert_eq!(first.mean_value(), Some(2.5));
    assert_eq!(first.threshold(), Some(2.0));
}

#[test]
fn io_service_describes_and_previews_through_the_context_reader() {
    let path = PathBuf::from("/nowhere/cell_1.tif");
    let mut reader = FixedReader::default();
    reader.images.insert(
        path.clone(),
        Array2::from_shape_fn((2, 3), |(y, x)| (y * 3 + x) as f32),
    );
    let context = AppContext::with_reader(AppConfig::default(), Arc::new(reader));

    let info = context.io_service().describe(&path).expect("describe");
    assert_eq!((info.width, info.height, info.channels), (3, 2, 1));
    assert_eq!((info.min, info.max), (Some(0.0), Some(5.0)));

    let mut record = ImageRecord::new(path.clone());
    let (preview, channels) = context
        .io_service()
        .preview(
            &mut record,
            &ThresholdConfig::new(3.0),
            &DisplayOptions::default(),
            16,
        )
        .expect("preview");
    assert_eq!(channels, Some(1));
    assert!(record.pixels().is_some());
    let stats = preview.stats.expect("stats");
    assert_eq!((stats.above, stats.total), (3, 6));
}

#[test]
fn select_files_filters_and_expands_directories() {
    let dir = tempdir().expect("tempdir");
    let nested = dir.path().join("plate");
    fs::create_dir(&nested).expect("mkdir");
    fs::write(nested.join("b.tif"), b"").expect("write");
    fs::write(nested.join("notes.txt"), b"").expect("write");
    fs::write(dir.path().join("a.png"), b"").expect("write");

    let selection = AppContext::new()
        .dataset_service()
        .select_files(vec![
            dir.path().join("a.png"),
            nested.clone(),
            dir.path().join("a.png"),
        ])
        .expect("selection");
    assert_eq!(
        selection.accepted,
        vec![dir.path().join("a.png"), nested.join("b.tif")]
    );
    assert_eq!(selection.skipped, vec![nested.join("notes.txt")]);
}
