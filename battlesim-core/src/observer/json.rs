//! JSON-lines progress output.
//!
//! One object per line, tagged by kind:
//! ```json
//! {"type":"progress","progress":0.42,"win_rate":{...},...}
//! {"type":"finished","cancelled":false,"snapshot":{...},"metrics":{...}}
//! ```

use super::{ObserverError, ProgressObserver};
use crate::analyze::{AnalysisReport, AnalysisSnapshot};
use serde::Serialize;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Record<'a> {
    Progress(&'a AnalysisSnapshot),
    Finished(&'a AnalysisReport),
}

/// Writes every snapshot and the final report to any `Write` destination.
pub struct JsonLinesObserver {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl JsonLinesObserver {
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(BufWriter::new(std::io::stdout())))
    }

    pub fn to_file(path: &Path) -> Result<Self, ObserverError> {
        let file = std::fs::File::create(path)?;
        Ok(Self::new(Box::new(BufWriter::new(file))))
    }

    fn write(&self, record: &Record<'_>) -> Result<(), ObserverError> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| ObserverError::Render("JsonLinesObserver writer lock poisoned".into()))?;
        serde_json::to_writer(&mut *writer, record)?;
        writeln!(writer)?;
        Ok(())
    }
}

impl ProgressObserver for JsonLinesObserver {
    fn on_progress(&self, snapshot: &AnalysisSnapshot) -> Result<(), ObserverError> {
        self.write(&Record::Progress(snapshot))
    }

    fn on_finish(&self, report: &AnalysisReport) -> Result<(), ObserverError> {
        self.write(&Record::Finished(report))?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| ObserverError::Render("JsonLinesObserver writer lock poisoned".into()))?;
        writer.flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "JsonLinesObserver"
    }

    fn on_shutdown(&self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::WinRateProgress;
    use std::io::Cursor;
    use std::sync::Arc;

    /// Shares the buffer with the test after the observer takes ownership.
    struct Capture(Arc<Mutex<Cursor<Vec<u8>>>>);

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().map_err(|_| std::io::ErrorKind::Other)?.write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_writes_one_line_per_record() {
        let buffer = Arc::new(Mutex::new(Cursor::new(Vec::new())));
        let observer = JsonLinesObserver::new(Box::new(Capture(buffer.clone())));

        let snapshot = AnalysisSnapshot {
            win_rate: Some(WinRateProgress {
                attacker: 0.75,
                ..Default::default()
            }),
            progress: 0.5,
            ..Default::default()
        };
        observer.on_progress(&snapshot).unwrap();
        observer.on_finish(&AnalysisReport::default()).unwrap();

        let output = String::from_utf8(buffer.lock().unwrap().get_ref().clone()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["type"], "progress");
        assert_eq!(first["progress"], 0.5);
        assert_eq!(first["win_rate"]["attacker"], 0.75);

        let last: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(last["type"], "finished");
        assert_eq!(last["cancelled"], false);
    }
}
