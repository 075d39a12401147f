//! Output sinks for build progress and streamed command output

use super::context::UiContext;
use console::style;
use std::io::Write;

/// Receives live command output and progress lines.
///
/// Implementations must not block indefinitely; output is best-effort.
pub trait OutputSink: Send + Sync {
    /// Raw bytes streamed from a running step
    fn write_output(&self, bytes: &[u8]);

    /// A formatted progress line
    fn progress(&self, message: &str);

    /// A non-fatal warning
    fn warn(&self, message: &str) {
        self.progress(message);
    }
}

/// Sink writing to the process's stdout
#[derive(Debug, Clone, Copy)]
pub struct ConsoleSink {
    ctx: UiContext,
}

impl ConsoleSink {
    pub fn new(ctx: UiContext) -> Self {
        Self { ctx }
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new(UiContext::detect())
    }
}

impl OutputSink for ConsoleSink {
    fn write_output(&self, bytes: &[u8]) {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(bytes).ok();
        stdout.flush().ok();
    }

    fn progress(&self, message: &str) {
        if self.ctx.use_fancy_output() {
            println!("{} {}", style("==>").cyan().bold(), style(message).bold());
        } else {
            println!("==> {}", message);
        }
    }

    fn warn(&self, message: &str) {
        if self.ctx.use_fancy_output() {
            println!("{} {}", style("!").yellow(), message);
        } else {
            println!("[WARN] {}", message);
        }
    }
}
