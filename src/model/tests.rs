use std::path::{Path, PathBuf};

use super::{DatasetRow, GroupingRule, ImageRecord, ThresholdConfig, YBounds, group_files};

fn paths(names: &[&str]) -> Vec<PathBuf> {
    names.iter().map(|name| Path::new("/data").join(name)).collect()
}

#[test]
fn underscore_rule_extracts_joined_parts() {
    let rule = GroupingRule::Underscore { start: 0, end: 2 };
    assert_eq!(rule.key_for("ctrl_24h_03.tif").as_deref(), Some("ctrl_24h"));
    let rule = GroupingRule::Underscore { start: 2, end: 4 };
    assert_eq!(rule.key_for("ctrl_24h_03.tif"), None);
}

#[test]
fn char_range_rule_is_one_based_inclusive() {
    let rule = GroupingRule::CharRange { start: 1, end: 6 };
    assert_eq!(rule.key_for("STAT3a_01.nd2").as_deref(), Some("STAT3a"));
    let rule = GroupingRule::CharRange { start: 3, end: 40 };
    assert_eq!(rule.key_for("short.png"), None);
}

#[test]
fn grouping_rule_parses_from_cli_syntax() {
    let rule: GroupingRule = "chars:2:5".parse().expect("rule");
    assert_eq!(rule, GroupingRule::CharRange { start: 2, end: 5 });
    assert_eq!(rule.to_string(), "chars:2:5");
    assert!("underscore:3:1".parse::<GroupingRule>().is_err());
    assert!("chars:0:4".parse::<GroupingRule>().is_err());
    assert!("words:1:2".parse::<GroupingRule>().is_err());
}

#[test]
fn group_files_numbers_groups_in_key_order() {
    let files = paths(&["b_1.tif", "a_1.tif", "a_2.tif", "nounderscore.tif"]);
    let rule = GroupingRule::Underscore { start: 0, end: 1 };
    let assignment = group_files(&files, Some(&rule));
    assert_eq!(assignment.group_count(), 2);
    let assignments = assignment.assignments();
    let summary = assignments
        .iter()
        .map(|(path, group, id)| {
            (
                path.file_name().unwrap().to_str().unwrap().to_string(),
                group.clone(),
                *id,
            )
        })
        .collect::<Vec<_>>();
    assert_eq!(
        summary,
        vec![
            ("a_1.tif".to_string(), "a".to_string(), 1),
            ("a_2.tif".to_string(), "a".to_string(), 1),
            ("b_1.tif".to_string(), "b".to_string(), 2),
            ("nounderscore.tif".to_string(), String::new(), 0),
        ]
    );
    let (first, members) = assignment.preview().expect("preview");
    assert_eq!(first, "a");
    assert_eq!(members.len(), 2);
}

#[test]
fn disabled_grouping_keeps_selection_order() {
    let files = paths(&["z.tif", "a.tif"]);
    let assignment = group_files(&files, None);
    assert!(!assignment.is_grouped());
    assert_eq!(assignment.ungrouped, files);
}

#[test]
fn row_rejects_fraction_outside_unit_interval() {
    let mut row = DatasetRow::new(Path::new("/data/a.tif"), "a", 1).expect("row");
    assert!(row.set_statistics(50.0, 1.5, 10.0).is_err());
    assert!(!row.has_statistics());
    row.set_statistics(50.0, 0.25, 10.0).expect("stats");
    assert_eq!(row.fraction(), Some(0.25));
    assert!(row.validate().is_ok());
    row.clear_statistics();
    assert_eq!(row.threshold(), None);
}

#[test]
fn row_without_threshold_but_with_fraction_is_invalid() {
    let raw = serde_json::json!({
        "Filename": "a.tif",
        "Directory": "/data",
        "Group": "a",
        "Group_ID": 1,
        "Threshold": null,
        "Fraction": 0.5,
        "Mean Value": null
    });
    let row: DatasetRow = serde_json::from_value(raw).expect("deserialize");
    assert!(row.validate().is_err());
}

#[test]
fn image_record_loads_pixels_once() {
    let mut record = ImageRecord::new("/data/a.tif");
    record.assign_group("a", 1);
    let mut calls = 0;
    for _ in 0..2 {
        let pixels = record
            .pixels_or_load(|_| {
                calls += 1;
                Ok::<_, ()>(ndarray::Array2::zeros((2, 2)))
            })
            .expect("pixels");
        assert_eq!(pixels.dim(), (2, 2));
    }
    assert_eq!(calls, 1);
    let row = record.into_row().expect("row");
    assert_eq!(row.file_path(), PathBuf::from("/data/a.tif"));
    assert_eq!(row.group_id, 1);
}

#[test]
fn threshold_config_and_bounds() {
    assert_eq!(ThresholdConfig::new(12.0).active(), Some(12.0));
    assert_eq!(ThresholdConfig::default().active(), None);
    assert_eq!(YBounds { min: 0.0, max: 0.0 }.resolve(), None);
    assert_eq!(YBounds { min: 1.0, max: 5.0 }.resolve(), Some((1.0, 5.0)));
}
