//! `tracing` output routed to the browser console
//!
//! Installed by [`PagePulse`](crate::PagePulse) when the `debug` option is
//! set, so diagnostics from the core (skipped streams and listeners, lost
//! reports) show up in devtools.

use std::io;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;

/// Buffers one formatted event and logs it when dropped
pub struct ConsoleWriter {
    buf: Vec<u8>,
}

impl io::Write for ConsoleWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for ConsoleWriter {
    fn drop(&mut self) {
        if let Some(line) = console_line(&self.buf) {
            web_sys::console::debug_1(&line.into());
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleMakeWriter;

impl<'a> MakeWriter<'a> for ConsoleMakeWriter {
    type Writer = ConsoleWriter;

    fn make_writer(&'a self) -> Self::Writer {
        ConsoleWriter { buf: Vec::new() }
    }
}

/// Text logged for one buffered event, `None` when there is nothing to show
fn console_line(buf: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(buf);
    let text = text.trim_end();
    (!text.is_empty()).then(|| format!("[pagepulse] {}", text))
}

/// Install the console subscriber. A subscriber already set by the host
/// application is left in place.
pub fn install() {
    // No timestamps: the system clock is unavailable on wasm32-unknown-unknown
    let _ = tracing_subscriber::fmt()
        .with_writer(ConsoleMakeWriter)
        .with_max_level(LevelFilter::DEBUG)
        .with_ansi(false)
        .without_time()
        .try_init();
}
