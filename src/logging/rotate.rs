use std::{
    fs::{self, File, OpenOptions},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use anyhow::{anyhow, Result};
use chrono::{DateTime, Local};
use rayon::prelude::*;

use crate::logging;

/// 預設單檔最大大小：10 MB
const DEFAULT_MAX_SIZE: u64 = 10 * 1024 * 1024;
/// 預設保留天數：7 天
const DEFAULT_MAX_AGE_DAYS: u64 = 7;

/// Log file writer that switches files when the date changes or the current
/// file grows past `max_size`.
///
/// `log/%Y-%m-%d-http.log` grows into `log/2026-03-01-http.log`,
/// `log/2026-03-01-http.1.log`, `log/2026-03-01-http.2.log`, ...
pub struct Rotate {
    fn_pattern: String,
    /// 目前日期對應的檔名（不含世代編號）
    base_fn: String,
    generation: u32,
    current_size: u64,
    max_size: u64,
    max_age: Duration,
    out: Option<BufWriter<File>>,
}

impl Rotate {
    pub fn new(fn_pattern: String) -> Self {
        Self::with_options(fn_pattern, DEFAULT_MAX_SIZE, DEFAULT_MAX_AGE_DAYS)
    }

    pub fn with_options(fn_pattern: String, max_size: u64, max_age_days: u64) -> Self {
        Rotate {
            fn_pattern,
            base_fn: String::new(),
            generation: 0,
            current_size: 0,
            max_size,
            max_age: Duration::from_secs(max_age_days * 24 * 60 * 60),
            out: None,
        }
    }

    /// Appends `msg` to the file for `now`, rotating first when needed.
    pub fn write_msg(&mut self, now: DateTime<Local>, msg: &[u8]) -> Result<()> {
        let base_fn = now.format(&self.fn_pattern).to_string();

        if base_fn != self.base_fn || self.out.is_none() {
            self.base_fn = base_fn;
            self.generation = 0;
            self.open_current()?;
            self.cleanup_old_files();
        }

        // 只有在檔案已有內容時才換世代，避免單筆超大訊息無限輪轉
        if self.current_size > 0 && self.current_size + msg.len() as u64 > self.max_size {
            self.generation += 1;
            self.open_current()?;
        }

        let out = self
            .out
            .as_mut()
            .ok_or_else(|| anyhow!("log file {} is not open", self.base_fn))?;
        out.write_all(msg)?;
        self.current_size += msg.len() as u64;

        Ok(())
    }

    pub fn flush(&mut self) {
        if let Some(out) = self.out.as_mut() {
            let _ = out.flush();
        }
    }

    fn current_fn(&self) -> PathBuf {
        generation_fn(&self.base_fn, self.generation)
    }

    fn open_current(&mut self) -> Result<()> {
        self.flush();

        let path = self.current_fn();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        self.current_size = file.metadata().map(|m| m.len()).unwrap_or(0);
        self.out = Some(BufWriter::with_capacity(4096, file));

        Ok(())
    }

    /// 刪除同目錄下超過保留天數的檔案
    fn cleanup_old_files(&self) {
        let current = self.current_fn();
        let dir = match current.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(why) => {
                logging::error_console(format!(
                    "Failed to read log directory {} because {:?}",
                    dir.display(),
                    why
                ));
                return;
            }
        };

        let cut_off = SystemTime::now() - self.max_age;
        let expired: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "log"))
            .filter(|path| {
                fs::metadata(path)
                    .and_then(|m| m.modified())
                    .is_ok_and(|modified| modified <= cut_off)
            })
            .collect();

        expired
            .par_iter()
            .with_min_len(num_cpus::get())
            .for_each(|path| {
                if let Err(why) = fs::remove_file(path) {
                    logging::error_console(format!(
                        "couldn't remove the file({}). because {:?}",
                        path.display(),
                        why
                    ));
                }
            });
    }
}

impl Drop for Rotate {
    fn drop(&mut self) {
        self.flush();
    }
}

/// generation 0 keeps the base name, later ones insert `.N` before the extension.
fn generation_fn(base_fn: &str, generation: u32) -> PathBuf {
    let path = Path::new(base_fn);
    if generation == 0 {
        return path.to_path_buf();
    }

    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("log");
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("log");
    path.with_file_name(format!("{}.{}.{}", stem, generation, ext))
}
