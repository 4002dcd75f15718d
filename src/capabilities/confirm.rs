use crate::capabilities::Confirmation;
use crate::error::Result;
use crate::ui;
use log::info;

/// Asks the operator on the terminal
#[derive(Debug, Default)]
pub struct ConsolePrompt;

impl Confirmation for ConsolePrompt {
    fn confirm(&self, prompt: &str) -> Result<bool> {
        Ok(ui::confirm_action(prompt)?)
    }
}

/// Answers yes to everything, for `--yes` runs
#[derive(Debug, Default)]
pub struct AutoConfirm;

impl Confirmation for AutoConfirm {
    fn confirm(&self, prompt: &str) -> Result<bool> {
        info!("Auto-confirmed: {}", prompt);
        Ok(true)
    }
}
