//! Spreadsheet loader for counter exports.

use anyhow::{Context, Result, anyhow};
use calamine::{Data, Range, Reader, Xlsx, open_workbook};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Header plus data rows, concatenated from one or more worksheets.
///
/// Every row has exactly `columns.len()` cells.
#[derive(Debug, Default, Clone)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Data>>,
}

impl RawTable {
    /// Builds a table from a worksheet range whose first row is the header.
    pub fn from_range(range: &Range<Data>) -> Self {
        let mut rows = range.rows();
        let columns: Vec<String> = match rows.next() {
            Some(header) => header.iter().map(|c| c.to_string().trim().to_string()).collect(),
            None => return Self::default(),
        };

        let rows = rows
            .filter(|r| r.iter().any(|c| !matches!(c, Data::Empty)))
            .map(|r| {
                let mut row = r.to_vec();
                row.resize(columns.len(), Data::Empty);
                row
            })
            .collect();

        Self { columns, rows }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Appends `other`, aligning columns by name. Columns only one side has
    /// are filled with empty cells on the other.
    ///
    /// A header repeated within a sheet (blank headers, typically) is matched
    /// by occurrence: the second "" in `other` lands in the second "" here.
    pub fn append(&mut self, other: RawTable) {
        let mut occurrences: HashMap<&str, usize> = HashMap::new();
        let mut mapping = Vec::with_capacity(other.columns.len());
        for name in &other.columns {
            let nth = occurrences.entry(name.as_str()).or_default();
            let existing = self
                .columns
                .iter()
                .enumerate()
                .filter(|(_, c)| *c == name)
                .map(|(i, _)| i)
                .nth(*nth);
            *nth += 1;

            let idx = match existing {
                Some(idx) => idx,
                None => {
                    self.columns.push(name.clone());
                    for row in &mut self.rows {
                        row.push(Data::Empty);
                    }
                    self.columns.len() - 1
                }
            };
            mapping.push(idx);
        }

        let width = self.columns.len();
        for source in other.rows {
            let mut row = vec![Data::Empty; width];
            for (cell, &idx) in source.into_iter().zip(&mapping) {
                row[idx] = cell;
            }
            self.rows.push(row);
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Lists `.xlsx` files directly inside `folder`, sorted by name.
pub fn list_excel_files(folder: &Path) -> Result<Vec<PathBuf>> {
    if !folder.exists() {
        return Err(anyhow!("folder not found: {}", folder.display()));
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(folder)? {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("xlsx") {
            files.push(path);
        }
    }
    files.sort();

    if files.is_empty() {
        return Err(anyhow!("no Excel files found in {}", folder.display()));
    }
    Ok(files)
}

/// Reads the first worksheet of a workbook.
pub fn read_workbook(path: &Path) -> Result<RawTable> {
    let mut workbook: Xlsx<_> = open_workbook(path)
        .with_context(|| format!("failed to open workbook {}", path.display()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| anyhow!("workbook {} has no worksheet", path.display()))?
        .with_context(|| format!("failed to read first worksheet of {}", path.display()))?;

    Ok(RawTable::from_range(&range))
}

/// Loads every Excel file in `folder` into a single table.
#[tracing::instrument(skip(folder), fields(folder = %folder.display()))]
pub fn load_excel_files(folder: &Path) -> Result<RawTable> {
    let files = list_excel_files(folder)?;

    let mut table = RawTable::default();
    for file in &files {
        let sheet = read_workbook(file)?;
        debug!(file = %file.display(), rows = sheet.len(), "Worksheet loaded");
        table.append(sheet);
    }

    info!(files = files.len(), rows = table.len(), columns = table.columns.len(), "Excel folder loaded");
    Ok(table)
}
