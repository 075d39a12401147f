//! UI module: where build progress and step output go
//!
//! Colors and spinners are used only in an interactive terminal; CI gets
//! plain lines.

mod context;
mod output;
mod sink;

pub use context::UiContext;
pub use output::{outro_success, step_ok_detail, step_warn_hint};
pub use sink::{ConsoleSink, OutputSink};
