//! Log capture for tests.
//!
//! Installs a process-wide `log::Log` once and records into a thread-local
//! buffer, so each test (libtest runs each on its own thread) only sees its
//! own records.

use std::cell::RefCell;
use std::sync::Once;

use log::{Level, LevelFilter, Log, Metadata, Record};

struct CaptureLogger;

thread_local! {
    static RECORDS: RefCell<Vec<(Level, String)>> = const { RefCell::new(Vec::new()) };
}

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        RECORDS.with(|r| r.borrow_mut().push((record.level(), record.args().to_string())));
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger;
static INIT: Once = Once::new();

/// Start capturing on the current thread, discarding anything recorded so far.
pub(crate) fn capture() {
    INIT.call_once(|| {
        if log::set_logger(&LOGGER).is_ok() {
            log::set_max_level(LevelFilter::Trace);
        }
    });
    RECORDS.with(|r| r.borrow_mut().clear());
}

/// Whether a record at `level` containing `needle` was logged on this thread.
pub(crate) fn logged(level: Level, needle: &str) -> bool {
    RECORDS.with(|r| {
        r.borrow()
            .iter()
            .any(|(l, msg)| *l == level && msg.contains(needle))
    })
}

