use std::{sync::mpsc as std_mpsc, thread, time::Duration};

use chrono::{format::DelayedFormat, DateTime, Local};
use concat_string::concat_string;
use once_cell::sync::Lazy;
use strum::Display;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::logging::rotate::Rotate;

pub mod rotate;

static LOGGER: Lazy<Logger> = Lazy::new(|| Logger::new("default"));

/// 累積到這個大小就寫入檔案
const BATCH_SIZE: usize = 4096;
/// flush 最多等待的時間
const FLUSH_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Display)]
pub enum Level {
    Info,
    Warn,
    Error,
    Debug,
}

pub struct LogMessage {
    pub level: Level,
    pub msg: String,
    pub created_at: DateTime<Local>,
}

impl LogMessage {
    pub fn new(level: Level, msg: String) -> Self {
        LogMessage {
            level,
            msg,
            created_at: Local::now(),
        }
    }
}

enum Command {
    Write(LogMessage),
    Flush(std_mpsc::Sender<()>),
}

/// A named log file fed through a channel.
///
/// The file is written by a dedicated thread so callers never block on disk.
pub struct Logger {
    writer: UnboundedSender<Command>,
}

impl Logger {
    pub fn new(log_name: &str) -> Self {
        let (tx, rx) = unbounded_channel::<Command>();
        let pattern = concat_string!("log/%Y-%m-%d-", log_name, ".log");

        //寫入檔案的操作使用另一個線程處理
        thread::spawn(move || Self::run_writer(Rotate::new(pattern), rx));

        Logger { writer: tx }
    }

    fn run_writer(mut rotate: Rotate, mut rx: UnboundedReceiver<Command>) {
        let mut together = String::with_capacity(BATCH_SIZE);

        while let Some(command) = rx.blocking_recv() {
            match command {
                Command::Write(received) => {
                    together.push_str(&concat_string!(
                        received.created_at.format("%F %X%.6f").to_string(),
                        " ",
                        received.level.to_string(),
                        " ",
                        received.msg,
                        "\r\n"
                    ));

                    if rx.is_empty() || together.len() >= BATCH_SIZE {
                        Self::write_out(&mut rotate, &mut together);
                    }
                }
                Command::Flush(ack) => {
                    Self::write_out(&mut rotate, &mut together);
                    let _ = ack.send(());
                }
            }
        }

        Self::write_out(&mut rotate, &mut together);
    }

    fn write_out(rotate: &mut Rotate, together: &mut String) {
        if together.is_empty() {
            return;
        }

        if let Err(why) = rotate.write_msg(Local::now(), together.as_bytes()) {
            error_console(format!("Failed to write log file because {:?}", why));
            info_console(together.clone());
        }

        rotate.flush();
        together.clear();
    }

    pub fn info(&self, log: String) {
        self.send(Level::Info, log);
    }

    pub fn warn(&self, log: String) {
        self.send(Level::Warn, log);
    }

    pub fn error(&self, log: String) {
        self.send(Level::Error, log);
    }

    pub fn debug(&self, log: String) {
        self.send(Level::Debug, log);
    }

    fn send(&self, level: Level, msg: String) {
        if let Err(why) = self.writer.send(Command::Write(LogMessage::new(level, msg))) {
            error_console(why.to_string());
        }
    }

    /// Blocks until every message sent so far is on disk, or the timeout passes.
    pub fn flush(&self) {
        let (ack_tx, ack_rx) = std_mpsc::channel();
        if self.writer.send(Command::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.recv_timeout(FLUSH_TIMEOUT);
        }
    }
}

pub fn info_file_async(log: String) {
    LOGGER.info(log);
}

pub fn warn_file_async(log: String) {
    LOGGER.warn(log);
}

pub fn error_file_async(log: String) {
    LOGGER.error(log);
}

pub fn debug_file_async(log: String) {
    LOGGER.debug(log);
}

/// 程式結束前呼叫，確保日誌都已寫入
pub fn flush() {
    LOGGER.flush();
}

pub fn info_console(log: String) {
    println!(
        "{} Info {}",
        Local::now().format("%Y-%m-%d %H:%M:%S.%3f"),
        log
    );
}

pub fn error_console(log: String) {
    println!(
        "{} Error {}",
        DelayedFormat::to_string(&Local::now().format("%Y-%m-%d %H:%M:%S.%3f")),
        log
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_display() {
        assert_eq!(Level::Info.to_string(), "Info");
        assert_eq!(Level::Warn.to_string(), "Warn");
    }

    #[test]
    fn test_flush_returns() {
        info_file_async("logging::test_flush_returns".to_string());
        debug_file_async("logging::test_flush_returns".to_string());
        flush();
    }
}
