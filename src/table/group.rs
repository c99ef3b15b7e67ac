use crate::model::DatasetRow;

/// Rows sharing a group name; derived from the dataset, never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub name: String,
    pub id: u32,
    pub rows: Vec<DatasetRow>,
}

impl Group {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Label used in headers and export file names.
    pub fn title(&self) -> String {
        format!("{} (ID: {})", self.name, self.id)
    }
}
