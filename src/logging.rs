//! JSON line-delimited operation logging.
//!
//! The sink is opt-in: [`init`] opens an append-only JSONL file once per
//! process, and [`log_operation`] becomes a no-op until that happens. Engine
//! operations log their summary records through this module and report
//! failures to stderr rather than interrupting numeric work.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use once_cell::sync::OnceCell;
use serde::Serialize;

use crate::error::{NowcastError, Result};

static SINK: OnceCell<Mutex<File>> = OnceCell::new();

#[derive(Serialize)]
struct Record<'a, T: Serialize> {
    op: &'a str,
    details: &'a T,
}

/// Open the JSONL sink. The first call wins; later calls keep the existing
/// sink and report success.
pub fn init<P: AsRef<Path>>(path: P) -> Result<()> {
    if SINK.get().is_some() {
        return Ok(());
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let _ = SINK.set(Mutex::new(file));
    Ok(())
}

/// Append one `{"op": .., "details": ..}` line to the sink, if initialized.
pub fn log_operation<T: Serialize>(op: &str, details: &T) -> Result<()> {
    let Some(sink) = SINK.get() else {
        return Ok(());
    };
    let line = serde_json::to_string(&Record { op, details }).map_err(|err| {
        NowcastError::InvalidArgument(format!("failed to serialize log record: {err}"))
    })?;
    if let Ok(mut file) = sink.lock() {
        writeln!(file, "{line}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_log_operation_appends_jsonl() {
        let path = std::env::temp_dir().join("nowcast_cascade_core_logging_test.jsonl");
        let _ = fs::remove_file(&path);

        // Uninitialized sink is a silent no-op.
        log_operation("noop", &serde_json::json!({"x": 1})).unwrap();

        init(&path).unwrap();
        log_operation("decompose", &serde_json::json!({"levels": 2})).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let line = contents.lines().find(|l| l.contains("\"decompose\""));
        assert!(line.is_some(), "expected a decompose record in {contents}");
    }
}
