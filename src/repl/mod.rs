//! REPL (Read-Eval-Print Loop) module for interactive terminal sessions
//!
//! Every interactive scenario reads lines the same way: empty lines are
//! skipped, `exit`/`quit`/`bye` or EOF end the session.

pub mod display;
pub mod input;

use anyhow::Result;
use std::path::PathBuf;
use tracing::debug;

pub use crate::repl::display::DisplayManager;
use crate::repl::input::InputHandler;

/// Words that end a session, compared case-insensitively
pub const EXIT_WORDS: [&str; 3] = ["exit", "quit", "bye"];

/// Check if input ends the session
pub fn is_exit_command(input: &str) -> bool {
    let input = input.trim();
    EXIT_WORDS.iter().any(|word| input.eq_ignore_ascii_case(word))
}

/// REPL session coordinator
pub struct ReplSession {
    input_handler: InputHandler,
    display_manager: DisplayManager,
}

impl ReplSession {
    /// Create REPL session with persistent history
    pub fn with_history(history_path: PathBuf, display_manager: DisplayManager) -> Result<Self> {
        Ok(ReplSession {
            input_handler: InputHandler::with_history(history_path)?,
            display_manager,
        })
    }

    /// Next non-empty line; `None` when the session should end
    pub fn next_input(&mut self) -> Result<Option<String>> {
        loop {
            match self.input_handler.read_line()? {
                None => return Ok(None),
                Some(line) if line.is_empty() => continue,
                Some(line) if is_exit_command(&line) => return Ok(None),
                Some(line) => return Ok(Some(line)),
            }
        }
    }

    /// Replace the input prompt
    pub fn set_prompt(&mut self, prompt: &str) {
        self.input_handler.set_prompt(prompt.to_string());
    }

    /// Get display manager
    pub fn display(&self) -> &DisplayManager {
        &self.display_manager
    }

    /// Save session state
    pub fn save(&mut self) -> Result<()> {
        self.input_handler.save_history()?;
        debug!(entries = self.input_handler.history_len(), "saved input history");
        Ok(())
    }
}
