// SPDX-License-Identifier: Apache-2.0 OR MIT
// Output sinks

use super::entry::Record;
use super::error::SinkError;
use super::Level;
use parking_lot::{Mutex, RwLock};
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};

/// Destination for dispatched records
///
/// Called from worker threads, possibly several at once, so implementations
/// synchronize internally.
pub trait Sink: Send + Sync {
    fn write(&self, record: &Record) -> Result<(), SinkError>;

    fn flush(&self) -> Result<(), SinkError>;
}

/// Render the plain-text line shared by the text sinks (no newline)
///
/// Format: `[time] [logger] [LEVEL] payload`
pub fn format_record(record: &Record) -> String {
    format!(
        "[{}] [{}] [{}] {}",
        format_time(record),
        record.logger_name(),
        record.level(),
        record.payload()
    )
}

fn format_time(record: &Record) -> String {
    let time: chrono::DateTime<chrono::Utc> = record.timestamp().into();
    time.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

/// Line-per-record sink over any writer
pub struct WriterSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Run `f` with exclusive access to the underlying writer
    pub fn with_writer<R>(&self, f: impl FnOnce(&mut W) -> R) -> R {
        f(&mut self.writer.lock())
    }
}

impl WriterSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl WriterSink<std::io::Stderr> {
    pub fn stderr() -> Self {
        Self::new(std::io::stderr())
    }
}

impl<W: Write + Send> Sink for WriterSink<W> {
    fn write(&self, record: &Record) -> Result<(), SinkError> {
        let line = format_record(record);
        writeln!(self.writer.lock(), "{}", line)?;
        Ok(())
    }

    fn flush(&self) -> Result<(), SinkError> {
        self.writer.lock().flush()?;
        Ok(())
    }
}

/// ANSI escape sequences used by [`AnsiColorSink`]
pub mod color {
    pub const RESET: &str = "\x1b[m";
    pub const BOLD: &str = "\x1b[1m";
    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const CYAN: &str = "\x1b[36m";
    pub const WHITE: &str = "\x1b[37m";
    pub const YELLOW_BOLD: &str = "\x1b[33m\x1b[1m";
    pub const RED_BOLD: &str = "\x1b[31m\x1b[1m";
    pub const BOLD_ON_RED: &str = "\x1b[1m\x1b[41m";
}

/// Text sink that highlights part of each line with a per-level color
///
/// The record's color range is highlighted when present; otherwise the
/// level tag is.
pub struct AnsiColorSink<W: Write + Send> {
    writer: Mutex<W>,
    colors: RwLock<[String; 7]>,
}

impl<W: Write + Send> AnsiColorSink<W> {
    pub fn new(writer: W) -> Self {
        let colors = [
            color::WHITE,
            color::CYAN,
            color::GREEN,
            color::YELLOW_BOLD,
            color::RED_BOLD,
            color::BOLD_ON_RED,
            color::RESET,
        ]
        .map(String::from);
        Self {
            writer: Mutex::new(writer),
            colors: RwLock::new(colors),
        }
    }

    pub fn set_color(&self, level: Level, code: impl Into<String>) {
        self.colors.write()[level.as_u8() as usize] = code.into();
    }

    pub fn color(&self, level: Level) -> String {
        self.colors.read()[level.as_u8() as usize].clone()
    }

    pub fn with_writer<R>(&self, f: impl FnOnce(&mut W) -> R) -> R {
        f(&mut self.writer.lock())
    }

    fn render(&self, record: &Record) -> String {
        let code = self.color(record.level());
        let prefix = format!("[{}] [{}] ", format_time(record), record.logger_name());
        match record.color_range() {
            Some(_) => {
                let (before, colored, after) = record.colored_segments();
                format!(
                    "{}[{}] {}{}{}{}{}",
                    prefix,
                    record.level(),
                    before,
                    code,
                    colored,
                    color::RESET,
                    after
                )
            }
            None => format!(
                "{}[{}{}{}] {}",
                prefix,
                code,
                record.level(),
                color::RESET,
                record.payload()
            ),
        }
    }
}

impl AnsiColorSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl AnsiColorSink<std::io::Stderr> {
    pub fn stderr() -> Self {
        Self::new(std::io::stderr())
    }
}

impl<W: Write + Send> Sink for AnsiColorSink<W> {
    fn write(&self, record: &Record) -> Result<(), SinkError> {
        let line = self.render(record);
        writeln!(self.writer.lock(), "{}", line)?;
        Ok(())
    }

    fn flush(&self) -> Result<(), SinkError> {
        self.writer.lock().flush()?;
        Ok(())
    }
}

/// One JSON object per line
pub struct JsonSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn with_writer<R>(&self, f: impl FnOnce(&mut W) -> R) -> R {
        f(&mut self.writer.lock())
    }
}

impl<W: Write + Send> Sink for JsonSink<W> {
    fn write(&self, record: &Record) -> Result<(), SinkError> {
        let time: chrono::DateTime<chrono::Utc> = record.timestamp().into();
        let location = record.location();
        let value = serde_json::json!({
            "timestamp": time.to_rfc3339(),
            "logger": record.logger_name(),
            "level": record.level(),
            "thread": record.thread_id(),
            "file": location.file,
            "line": location.line,
            "module": location.module_path,
            "message": record.payload(),
        });
        let mut writer = self.writer.lock();
        serde_json::to_writer(&mut *writer, &value)
            .map_err(|e| SinkError::Rejected(e.to_string()))?;
        writer.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&self) -> Result<(), SinkError> {
        self.writer.lock().flush()?;
        Ok(())
    }
}

/// Counts and discards records
#[derive(Debug, Default)]
pub struct NullSink {
    written: AtomicU64,
    flushes: AtomicU64,
}

impl NullSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    pub fn flushes(&self) -> u64 {
        self.flushes.load(Ordering::Relaxed)
    }
}

impl Sink for NullSink {
    fn write(&self, _record: &Record) -> Result<(), SinkError> {
        self.written.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn flush(&self) -> Result<(), SinkError> {
        self.flushes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
