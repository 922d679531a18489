use anyhow::Result;

use crate::{declare::StationRecord, error::Error, history::HistoryRepository};

/// In-memory history for exercising the policies without touching disk.
#[derive(Default)]
pub struct MemoryHistory {
    rows: Option<Vec<StationRecord>>,
    corrupt: bool,
    header_writes: usize,
}

impl MemoryHistory {
    /// A store that does not exist yet.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<StationRecord>) -> Self {
        MemoryHistory {
            rows: Some(rows),
            ..Default::default()
        }
    }

    /// A store that exists but cannot be read.
    pub fn corrupt() -> Self {
        MemoryHistory {
            rows: Some(vec![]),
            corrupt: true,
            ..Default::default()
        }
    }

    pub fn rows(&self) -> &[StationRecord] {
        self.rows.as_deref().unwrap_or_default()
    }

    pub fn header_writes(&self) -> usize {
        self.header_writes
    }
}

impl HistoryRepository for MemoryHistory {
    fn exists(&self) -> bool {
        self.rows.is_some()
    }

    fn read_all(&self) -> Result<Vec<StationRecord>> {
        if self.corrupt {
            return Err(Error::MalformedHistory {
                path: "memory".to_string(),
                record: 1,
                reason: "corrupt".to_string(),
            }
            .into());
        }

        Ok(self.rows().to_vec())
    }

    fn append(&mut self, rows: &[StationRecord], with_header: bool) -> Result<usize> {
        if with_header {
            self.header_writes += 1;
        }

        self.rows
            .get_or_insert_with(Vec::new)
            .extend_from_slice(rows);

        Ok(rows.len())
    }
}
