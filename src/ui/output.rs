//! Output functions for consistent CLI formatting

use super::context::UiContext;
use console::style;

/// Display a title line
pub fn intro(ctx: &UiContext, title: &str) {
    if ctx.use_fancy_output() {
        println!("{} {}", style("┌").dim(), style(title).cyan().bold());
    } else {
        println!("{}", style(title).cyan().bold());
        println!();
    }
}

/// Display a success step
pub fn step_ok(ctx: &UiContext, message: &str) {
    if ctx.use_fancy_output() {
        println!("  {} {}", style("✓").green(), message);
    } else {
        println!("  {} {}", style("[OK]").green(), message);
    }
}

/// Display a success step with detail
pub fn step_ok_detail(ctx: &UiContext, message: &str, detail: &str) {
    if ctx.use_fancy_output() {
        println!("  {} {} ({})", style("✓").green(), message, style(detail).dim());
    } else {
        println!("  {} {} ({})", style("[OK]").green(), message, detail);
    }
}

/// Display a warning step
pub fn step_warn(ctx: &UiContext, message: &str) {
    if ctx.use_fancy_output() {
        println!("  {} {}", style("!").yellow(), message);
    } else {
        println!("  {} {}", style("[WARN]").yellow(), message);
    }
}

/// Display a warning step with an actionable hint
pub fn step_warn_hint(ctx: &UiContext, message: &str, hint: &str) {
    step_warn(ctx, message);
    println!("      {}", style(hint).dim());
}

/// Display a dimmed remark
pub fn remark(_ctx: &UiContext, message: &str) {
    println!("  {}", style(message).dim());
}

/// Display a key/value pair colored by status
pub fn key_value_status(_ctx: &UiContext, key: &str, value: &str, ok: bool) {
    let value = if ok {
        style(value).green()
    } else {
        style(value).yellow()
    };
    println!("  {:<24} {}", style(key).bold(), value);
}
