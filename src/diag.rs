//! Diagnostic wire logging.
//!
//! A [`DiagnosticSink`] receives every outbound and inbound payload,
//! tagged with its direction or message type. Sinks are best-effort: the
//! core never fails because a sink did. The default sink discards
//! everything; [`FileSink`] appends timestamped hex dumps to a file.

use std::fmt::Write as _;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::Result;

/// Longest data prefix a [`FileSink`] dumps per record.
const DUMP_LIMIT: usize = 64;

/// Best-effort sink for raw protocol traffic.
pub trait DiagnosticSink: Send + Sync {
    /// Record one payload. Implementations must not panic and should
    /// swallow their own I/O errors.
    fn log(&self, tag: &str, data: &[u8]);
}

/// The default sink: discards everything.
#[derive(Debug, Default)]
pub struct NoopSink;

impl DiagnosticSink for NoopSink {
    fn log(&self, _tag: &str, _data: &[u8]) {}
}

/// Appends timestamped hex dumps to a file.
pub struct FileSink {
    file: Mutex<File>,
}

impl FileSink {
    /// Open (or create) the log file in append mode.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl DiagnosticSink for FileSink {
    fn log(&self, tag: &str, data: &[u8]) {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();

        let mut line = format!(
            "[{}.{:03}] {} ({} bytes)",
            timestamp.as_secs(),
            timestamp.subsec_millis(),
            tag,
            data.len()
        );
        for byte in data.iter().take(DUMP_LIMIT) {
            let _ = write!(line, " {byte:02x}");
        }
        if data.len() > DUMP_LIMIT {
            line.push_str(" ..");
        }
        line.push('\n');

        if let Ok(mut file) = self.file.lock() {
            let _ = file.write_all(line.as_bytes());
        }
    }
}
