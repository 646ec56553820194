//! Run-scoped performance/audit log, written alongside the SQL output.
//!
//! Independent of the user-facing `RUST_LOG` verbosity (handled by
//! `log`/`env_logger`, initialized once in `main`): this always writes a
//! timestamped trail of what the run did, the same job the teacher's
//! `Logger`/`PerfHandle` performed.

use std::fmt;
use std::fs::File;
use std::io::prelude::*;
use std::path::Path;
use std::time::Instant;

pub struct Logger {
    file: File,
    timer: Instant,
}

impl Logger {
    pub fn new<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        Ok(Logger {
            file: File::create(path)?,
            timer: Instant::now(),
        })
    }

    pub fn info<M: fmt::Display>(&mut self, message: M) {
        self.log("info", message);
    }

    pub fn warn<M: fmt::Display>(&mut self, message: M) {
        self.log("warn", message);
    }

    /// Returns a handle which, when stopped, writes an elapsed-time log
    /// entry for the measured span.
    pub fn perf<'a, S: Into<String>>(&'a mut self, id: S) -> PerfHandle<'a> {
        PerfHandle {
            logger: self,
            id: id.into(),
            started: Instant::now(),
        }
    }

    fn log<M: fmt::Display>(&mut self, header: &str, message: M) {
        let _ = writeln!(
            self.file,
            "[{:>9.5}] {}: {}",
            self.timer.elapsed().as_secs_f32(),
            header,
            message
        );
    }
}

pub struct PerfHandle<'a> {
    logger: &'a mut Logger,
    id: String,
    started: Instant,
}

impl<'a> PerfHandle<'a> {
    pub fn stop(self) {
        let elapsed = self.started.elapsed().as_secs_f32();
        self.logger
            .log("perf", format!("\"{}\" took {:.5} secs", self.id, elapsed));
    }
}
