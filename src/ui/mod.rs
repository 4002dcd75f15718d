//! User interface module - interaction (prompts) and formatting.
//!
//! - `formatter` - Pure formatting functions and the printers built on them
//! - This module - Interactive prompts

use console::{style, Term};
use std::io;

pub mod formatter;

pub use formatter::{
    display_boundary_warning, display_error, display_plan, display_run, display_status,
    display_success,
};

/// Prompts user to confirm an action with a yes/no prompt.
///
/// Accepts "y" or "yes" (case-insensitive). Default is "no" if the user
/// presses Enter.
pub fn confirm_action(prompt: &str) -> io::Result<bool> {
    let term = Term::stderr();
    term.write_str(&format!("\n{} (y/N): ", style(prompt).bold()))?;
    let input = term.read_line()?;
    Ok(is_yes(&input))
}

fn is_yes(input: &str) -> bool {
    let response = input.trim().to_lowercase();
    response == "y" || response == "yes"
}
