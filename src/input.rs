use std::borrow::Cow;

use anyhow::Result;
use colored::*;
use reedline::{
    default_emacs_keybindings, Emacs, KeyCode, KeyModifiers, Prompt, PromptEditMode, PromptHistorySearch,
    PromptHistorySearchStatus, Reedline, ReedlineEvent, Signal, ValidationResult, Validator,
};

use crate::preferences::Tab;

// Keeps the editor open while a fenced block is unterminated
pub struct NotesValidator;

impl Validator for NotesValidator {
    fn validate(&self, line: &str) -> ValidationResult {
        if line.matches("```").count() % 2 == 1 {
            return ValidationResult::Incomplete;
        }
        if line.trim_end().ends_with('\\') {
            return ValidationResult::Incomplete;
        }
        ValidationResult::Complete
    }
}

/// Prompt that shows which input tab is active.
pub struct TabPrompt {
    pub tab: Tab,
    pub style: String,
}

impl Prompt for TabPrompt {
    fn render_prompt_left(&self) -> Cow<str> {
        let tab = match self.tab {
            Tab::Text => "text",
            Tab::Image => "image",
            Tab::Video => "video",
        };
        format!("[{}:{}]", tab, self.style).dimmed().to_string().into()
    }

    fn render_prompt_right(&self) -> Cow<str> {
        "".into()
    }

    fn render_prompt_indicator(&self, _edit_mode: PromptEditMode) -> Cow<str> {
        " › ".bright_green().bold().to_string().into()
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<str> {
        "... ".dimmed().to_string().into()
    }

    fn render_prompt_history_search_indicator(&self, history_search: PromptHistorySearch) -> Cow<str> {
        let prefix = match history_search.status {
            PromptHistorySearchStatus::Passing => "",
            PromptHistorySearchStatus::Failing => "failing ",
        };
        format!("({}reverse-search: {}) ", prefix, history_search.term).into()
    }
}

pub struct LineReader {
    editor: Reedline,
}

impl LineReader {
    pub fn new() -> Self {
        let mut keybindings = default_emacs_keybindings();
        keybindings.add_binding(KeyModifiers::CONTROL, KeyCode::Char('l'), ReedlineEvent::ClearScreen);

        let editor = Reedline::create()
            .with_edit_mode(Box::new(Emacs::new(keybindings)))
            .with_validator(Box::new(NotesValidator));
        Self { editor }
    }

    /// Next line of input, or `None` when the user asked to leave.
    pub fn read_line(&mut self, prompt: &TabPrompt) -> Result<Option<String>> {
        match self.editor.read_line(prompt) {
            Ok(Signal::Success(buffer)) => Ok(Some(buffer)),
            Ok(Signal::CtrlD) | Ok(Signal::CtrlC) => Ok(None),
            Err(e) => Err(anyhow::anyhow!("Error reading input: {}", e)),
        }
    }
}
