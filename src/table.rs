mod dataset;
mod error;
mod group;
mod snapshot;


pub use dataset::{Dataset, DatasetSummary, RowUpdate};
pub use error::{DatasetError, Result};
pub use group::Group;
pub use snapshot::{COLUMNS, DEFAULT_SNAPSHOT_NAME, SNAPSHOT_FORMAT, SNAPSHOT_VERSION};
