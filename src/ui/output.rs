//! Output functions for consistent CLI formatting

use super::context::UiContext;
use console::style;

/// (terminal, plain) marker pairs
const CHECK: (&str, &str) = ("✓", "[OK]");
const WARN: (&str, &str) = ("⚠", "[WARN]");

fn mark(ctx: &UiContext, marker: (&'static str, &'static str)) -> &'static str {
    if ctx.use_fancy_output() {
        marker.0
    } else {
        marker.1
    }
}

/// Display the final success line
pub fn outro_success(ctx: &UiContext, message: &str) {
    println!();
    println!(
        "{} {}",
        style(mark(ctx, CHECK)).green(),
        style(message).green().bold()
    );
}

/// Display a success step with detail
pub fn step_ok_detail(ctx: &UiContext, message: &str, detail: &str) {
    println!(
        "  {} {} ({})",
        style(mark(ctx, CHECK)).green(),
        message,
        style(detail).dim()
    );
}

/// Display a warning step with hint
pub fn step_warn_hint(ctx: &UiContext, message: &str, hint: &str) {
    println!(
        "  {} {} - {}",
        style(mark(ctx, WARN)).yellow(),
        message,
        style(hint).dim()
    );
}
