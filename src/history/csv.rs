use std::{
    fs::{self, File, OpenOptions},
    io::{BufRead, BufReader, BufWriter, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::Result;

use crate::{
    declare::{Column, StationRecord},
    error::Error,
    history::HistoryRepository,
    logging,
    util::text,
};

/// History kept in a flat CSV file.
///
/// The first line is the header. Rows are only ever appended, and always in
/// the column order of the header already in the file. `columns` is the
/// layout used when the file is created.
pub struct CsvHistory {
    path: PathBuf,
    columns: Vec<Column>,
}

impl CsvHistory {
    pub fn new(path: impl Into<PathBuf>, columns: Vec<Column>) -> Self {
        CsvHistory {
            path: path.into(),
            columns,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn malformed(&self, record: usize, reason: impl ToString) -> Error {
        Error::MalformedHistory {
            path: self.path.display().to_string(),
            record,
            reason: reason.to_string(),
        }
    }

    /// 標題列中不認得的欄位以 None 表示，讀取時略過、寫入時留空
    fn parse_header(fields: &[String]) -> Vec<Option<Column>> {
        fields
            .iter()
            .map(|name| Column::from_str(name.trim()).ok())
            .collect()
    }

    /// Header of the file on disk, if it has a readable first line.
    fn existing_header(&self) -> Option<Vec<Option<Column>>> {
        let file = File::open(&self.path).ok()?;
        let mut first_line = String::new();
        BufReader::new(file).read_line(&mut first_line).ok()?;

        let records = text::csv_records(&first_line).ok()?;
        let header = Self::parse_header(records.first()?);
        if header.iter().any(Option::is_some) {
            Some(header)
        } else {
            None
        }
    }

    fn has_content(&self) -> bool {
        fs::metadata(&self.path).is_ok_and(|m| m.len() > 0)
    }

    /// pandas 寫出的檔案一定以換行結尾，其他工具不一定
    fn ends_with_newline(&self) -> Result<bool> {
        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::End(-1))?;
        let mut last = [0u8; 1];
        file.read_exact(&mut last)?;
        Ok(last[0] == b'\n')
    }
}

impl HistoryRepository for CsvHistory {
    fn exists(&self) -> bool {
        self.path.exists()
    }

    fn read_all(&self) -> Result<Vec<StationRecord>> {
        let content = fs::read_to_string(&self.path).map_err(Error::Io)?;
        let records = text::csv_records(&content).map_err(|why| self.malformed(0, why))?;

        let (header_fields, rows) = records
            .split_first()
            .ok_or_else(|| self.malformed(1, "no header"))?;
        let header = Self::parse_header(header_fields);

        for required in [Column::Id, Column::Timestamp] {
            if !header.contains(&Some(required)) {
                return Err(self.malformed(1, format!("missing column '{}'", required)).into());
            }
        }

        let timestamp_at = header.iter().position(|c| *c == Some(Column::Timestamp));

        let mut history = Vec::with_capacity(rows.len());
        for (i, cells) in rows.iter().enumerate() {
            let record_no = i + 2;
            if cells.len() > header.len() {
                return Err(self
                    .malformed(
                        record_no,
                        format!("expected {} fields, found {}", header.len(), cells.len()),
                    )
                    .into());
            }

            // 缺少的尾端欄位視為空值；沒有時間的列無法參與判斷，略過
            let cell_at = |i: usize| cells.get(i).map(String::as_str).unwrap_or_default();
            if timestamp_at.is_some_and(|i| cell_at(i).trim().is_empty()) {
                logging::warn_file_async(format!(
                    "{} record {} has no timestamp, skipped",
                    self.path.display(),
                    record_no
                ));
                continue;
            }

            let mut record = StationRecord::default();
            for (i, column) in header.iter().enumerate() {
                if let Some(column) = column {
                    record
                        .set_cell(*column, cell_at(i))
                        .map_err(|why| self.malformed(record_no, format!("{}: {}", column, why)))?;
                }
            }
            history.push(record);
        }

        Ok(history)
    }

    fn append(&mut self, rows: &[StationRecord], with_header: bool) -> Result<usize> {
        let has_content = self.has_content();

        let layout: Vec<Option<Column>> = if has_content {
            if with_header {
                logging::warn_file_async(format!(
                    "{} already has content, appending without header",
                    self.path.display()
                ));
            }
            self.existing_header()
                .unwrap_or_else(|| self.columns.iter().copied().map(Some).collect())
        } else {
            self.columns.iter().copied().map(Some).collect()
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(Error::Io)?;
            }
        }

        let needs_newline = has_content && !self.ends_with_newline()?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(Error::Io)?;
        let mut writer = BufWriter::new(file);

        if needs_newline {
            writer.write_all(b"\n").map_err(Error::Io)?;
        }

        // 空檔案一律補上標題列
        if !has_content {
            let header = layout
                .iter()
                .map(|column| column.map(|c| c.to_string()).unwrap_or_default());
            writer
                .write_all(text::csv_line(header).as_bytes())
                .map_err(Error::Io)?;
        }

        for row in rows {
            let cells = layout
                .iter()
                .map(|column| column.map(|c| row.cell(c)).unwrap_or_default());
            writer
                .write_all(text::csv_line(cells).as_bytes())
                .map_err(Error::Io)?;
        }

        writer.flush().map_err(Error::Io)?;

        Ok(rows.len())
    }
}
