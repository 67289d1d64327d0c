//! Terminal output for the CLI
//!
//! Styled with `console`; spinners use `indicatif`. Everything falls back
//! to plain line output when stdout is not a terminal or a CI
//! environment is detected.
//!
//! # Example
//!
//! ```rust,ignore
//! use rr_cache::ui::{self, UiContext, TaskSpinner};
//!
//! let ctx = UiContext::detect();
//! let mut spinner = TaskSpinner::new(&ctx);
//! spinner.start("Loading cid_strc...");
//! // ... do work ...
//! spinner.clear();
//!
//! ui::step_ok_detail(&ctx, "cid_strc", "local, verified");
//! ```

mod context;
mod output;
mod progress;

pub use context::UiContext;
pub use output::{
    intro, key_value_status, remark, step_ok, step_ok_detail, step_warn, step_warn_hint,
};
pub use progress::TaskSpinner;
