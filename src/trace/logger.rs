use std::fs::{File, OpenOptions};
use std::io::{self, LineWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::trace::trace::TraceEvent;

/// Appends one JSON line per `TraceEvent` to a file.
///
/// Opening or writing the file never fails a submission: errors are
/// reported through `tracing` and the event is dropped.
pub struct TraceLogger {
    sink: Option<Mutex<LineWriter<File>>>,
    path: Option<PathBuf>,
}

impl TraceLogger {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                debug!(path = %path.display(), "tracing submissions");
                TraceLogger {
                    sink: Some(Mutex::new(LineWriter::new(file))),
                    path: Some(path.to_path_buf()),
                }
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not open trace file");
                Self::disabled()
            }
        }
    }

    pub fn disabled() -> Self {
        TraceLogger {
            sink: None,
            path: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// File being appended to, when enabled.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn log(&self, event: &TraceEvent) {
        let Some(sink) = &self.sink else {
            return;
        };
        if let Err(e) = Self::append(sink, event) {
            warn!(form = %event.form, error = %e, "dropped trace event");
        }
    }

    fn append(sink: &Mutex<LineWriter<File>>, event: &TraceEvent) -> io::Result<()> {
        let mut out = sink
            .lock()
            .map_err(|_| io::Error::other("trace sink lock poisoned"))?;
        serde_json::to_writer(&mut *out, event)?;
        out.write_all(b"\n")
    }
}
