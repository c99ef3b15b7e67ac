use clap::Parser;

use super::types::{Cli, Commands};

#[test]
fn process_accepts_a_finite_threshold() {
    let cli = Cli::try_parse_from(["cellsheet", "process", "snap.json", "--threshold", "42.5"])
        .expect("parse");
    match cli.command {
        Commands::Process { threshold, .. } => assert_eq!(threshold, Some(42.5)),
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn non_finite_thresholds_are_rejected() {
    for value in ["inf", "-inf", "NaN"] {
        for command in ["process", "stats"] {
            let parsed = Cli::try_parse_from(["cellsheet", command, "input", "--threshold", value]);
            assert!(parsed.is_err(), "{command} accepted threshold {value}");
        }
    }
    let preview = Cli::try_parse_from([
        "cellsheet",
        "preview",
        "cell.tif",
        "--output",
        "out",
        "--threshold",
        "inf",
    ]);
    assert!(preview.is_err());
}
