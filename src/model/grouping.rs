use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{ModelError, Result, UNGROUPED_ID};

/// How a group key is cut out of a file stem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GroupingRule {
    /// Underscore-separated parts `[start, end)`, re-joined with `_`.
    Underscore { start: usize, end: usize },
    /// Characters `start..=end`, 1-based.
    CharRange { start: usize, end: usize },
}

impl Default for GroupingRule {
    fn default() -> Self {
        Self::Underscore { start: 0, end: 1 }
    }
}

impl GroupingRule {
    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::Underscore { start, end } if start >= end => Err(
                ModelError::InvalidGroupingRule(format!(
                    "underscore range {start}..{end} is empty"
                )),
            ),
            Self::CharRange { start, .. } if start == 0 => Err(ModelError::InvalidGroupingRule(
                "character positions start at 1".to_string(),
            )),
            Self::CharRange { start, end } if start > end => Err(ModelError::InvalidGroupingRule(
                format!("character range {start}..={end} is empty"),
            )),
            _ => Ok(()),
        }
    }

    /// Group key of `file_name`, or `None` when the rule does not fit it.
    pub fn key_for(&self, file_name: &str) -> Option<String> {
        let stem = Path::new(file_name)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(file_name);
        match *self {
            Self::Underscore { start, end } => {
                let parts = stem.split('_').collect::<Vec<_>>();
                if start >= parts.len() || end > parts.len() || start >= end {
                    return None;
                }
                Some(parts[start..end].join("_"))
            }
            Self::CharRange { start, end } => {
                let chars = stem.chars().collect::<Vec<_>>();
                let first = start.checked_sub(1)?;
                if end > chars.len() || first >= end {
                    return None;
                }
                Some(chars[first..end].iter().collect())
            }
        }
    }
}

impl fmt::Display for GroupingRule {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Underscore { start, end } => write!(formatter, "underscore:{start}:{end}"),
            Self::CharRange { start, end } => write!(formatter, "chars:{start}:{end}"),
        }
    }
}

impl FromStr for GroupingRule {
    type Err = ModelError;

    /// Parses `underscore:START:END` or `chars:START:END`.
    fn from_str(value: &str) -> Result<Self> {
        let parts = value.split(':').collect::<Vec<_>>();
        let [kind, start, end] = parts.as_slice() else {
            return Err(ModelError::InvalidGroupingRule(format!(
                "expected KIND:START:END, found `{value}`"
            )));
        };
        let parse = |raw: &str| {
            raw.trim().parse::<usize>().map_err(|_| {
                ModelError::InvalidGroupingRule(format!("`{raw}` is not a position"))
            })
        };
        let (start, end) = (parse(start)?, parse(end)?);
        let rule = match kind.trim() {
            "underscore" => Self::Underscore { start, end },
            "chars" => Self::CharRange { start, end },
            other => {
                return Err(ModelError::InvalidGroupingRule(format!(
                    "unknown rule kind `{other}`"
                )));
            }
        };
        rule.validate()?;
        Ok(rule)
    }
}

/// Files partitioned by group key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupAssignment {
    pub groups: BTreeMap<String, Vec<PathBuf>>,
    pub ungrouped: Vec<PathBuf>,
}

impl GroupAssignment {
    /// Every file ungrouped, in the given order.
    pub fn ungrouped(files: &[PathBuf]) -> Self {
        Self {
            groups: BTreeMap::new(),
            ungrouped: files.to_vec(),
        }
    }

    pub fn is_grouped(&self) -> bool {
        !self.groups.is_empty()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// `(path, group name, group id)` in dataset order: groups by ascending
    /// id (1.. in key order), then ungrouped files with id 0.
    pub fn assignments(&self) -> Vec<(PathBuf, String, u32)> {
        let mut out = Vec::new();
        for (index, (name, files)) in self.groups.iter().enumerate() {
            let id = index as u32 + 1;
            out.extend(files.iter().map(|path| (path.clone(), name.clone(), id)));
        }
        out.extend(
            self.ungrouped
                .iter()
                .map(|path| (path.clone(), String::new(), UNGROUPED_ID)),
        );
        out
    }

    /// First group in key order with its files sorted by name.
    pub fn preview(&self) -> Option<(&str, Vec<&Path>)> {
        let (name, files) = self.groups.iter().next()?;
        let mut files = files.iter().map(PathBuf::as_path).collect::<Vec<_>>();
        files.sort();
        Some((name.as_str(), files))
    }
}

/// Groups `files` by `rule`; `None` leaves everything ungrouped.
pub fn group_files(files: &[PathBuf], rule: Option<&GroupingRule>) -> GroupAssignment {
    let Some(rule) = rule else {
        return GroupAssignment::ungrouped(files);
    };
    let mut assignment = GroupAssignment::default();
    for path in files {
        let key = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| rule.key_for(name));
        match key {
            Some(key) => assignment.groups.entry(key).or_default().push(path.clone()),
            None => assignment.ungrouped.push(path.clone()),
        }
    }
    assignment
}
