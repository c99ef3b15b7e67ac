pub mod analysis;
pub mod cli;
pub mod formats;
pub mod model;
pub mod report;
pub mod runtime;
pub mod table;
pub mod ui;

pub fn run_cli() -> Result<(), String> {
    cli::run_cli()
}
