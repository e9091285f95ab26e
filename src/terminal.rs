use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use termimad::MadSkin;
use tracing::debug;

use crate::conversation::{Author, Modality, Turn, TurnId, TurnKind};
use crate::preferences::Theme;
use crate::surface::{Control, InputTarget, UiSurface};
use crate::upload::PreviewRef;

const WRAP_WIDTH: usize = 80;

/// Renders the conversation straight to the terminal.
pub struct TerminalSurface {
    theme: Mutex<Theme>,
    spinners: Mutex<HashMap<TurnId, ProgressBar>>,
    controls: Mutex<HashMap<Control, bool>>,
}

impl TerminalSurface {
    pub fn new(theme: Theme) -> Self {
        Self {
            theme: Mutex::new(theme),
            spinners: Mutex::new(HashMap::new()),
            controls: Mutex::new(HashMap::new()),
        }
    }

    pub fn set_theme(&self, theme: Theme) {
        if let Ok(mut current) = self.theme.lock() {
            *current = theme;
        }
    }

    fn skin(&self) -> MadSkin {
        match self.theme.lock().map(|t| *t).unwrap_or_default() {
            Theme::Light => MadSkin::default_light(),
            Theme::Dark => MadSkin::default_dark(),
        }
    }

    fn spinner(modality: Modality) -> ProgressBar {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.bright_cyan} {msg}") {
            spinner.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
        }
        let message = match modality {
            Modality::Text => "Generating notes...",
            Modality::Image => "Reading the image...",
            Modality::Video => "Watching the video...",
        };
        spinner.set_message(message.dimmed().to_string());
        spinner.enable_steady_tick(Duration::from_millis(80));
        spinner
    }

    fn print_turn(&self, turn: &Turn) {
        let label = match turn.author {
            Author::User => "You:".bright_green().bold(),
            Author::Assistant => "Notes:".bright_blue().bold(),
        };
        let label = format!("{} {}", turn.created_at.format("%H:%M:%S").to_string().dimmed(), label);
        match turn.kind {
            TurnKind::TextEcho => {
                println!("{} {}", label, textwrap::fill(&turn.content, WRAP_WIDTH));
            }
            TurnKind::ImageEcho => {
                println!("{} {}", label, "Generated notes from this image".italic());
            }
            TurnKind::VideoEcho => {
                println!(
                    "{} Generated notes from this video: {}",
                    label,
                    turn.content.underline().cyan()
                );
            }
            TurnKind::Result => {
                println!("{}", label);
                self.skin().print_text(&turn.content);
            }
            TurnKind::ErrorResult => {
                let message = textwrap::fill(&format!("Error: {}", turn.content), WRAP_WIDTH);
                println!("{}", message.red());
            }
            TurnKind::Placeholder => {}
        }
        println!();
    }
}

impl UiSurface for TerminalSurface {
    fn turn_appended(&self, turn: &Turn) {
        if turn.is_placeholder() {
            if let Ok(mut spinners) = self.spinners.lock() {
                spinners.insert(turn.id, Self::spinner(turn.modality));
            }
            return;
        }
        self.print_turn(turn);
    }

    fn turn_replaced(&self, turn: &Turn) {
        if let Ok(mut spinners) = self.spinners.lock() {
            if let Some(spinner) = spinners.remove(&turn.id) {
                spinner.finish_and_clear();
            }
        }
        self.print_turn(turn);
    }

    fn set_control_enabled(&self, control: Control, enabled: bool) {
        let previous = self
            .controls
            .lock()
            .ok()
            .and_then(|mut c| c.insert(control, enabled));
        if control == Control::SubmitImage && enabled && previous != Some(true) {
            println!("{} {}", "📎".yellow(), "Image ready. Use /submit_image to generate notes.".dimmed());
        }
        debug!(?control, enabled, "control state");
    }

    fn shake(&self, target: InputTarget, _duration: Duration) {
        let hint = match target {
            InputTarget::TextInput => "Type something to generate notes from.",
            InputTarget::ImageUploadArea => "Select an image first: /image <path>",
            InputTarget::VideoUrlInput => "Enter a YouTube URL first.",
        };
        println!("{} {}", "!".yellow().bold(), hint.yellow());
    }

    fn clear_input(&self, target: InputTarget) {
        debug!(?target, "input cleared");
    }

    fn show_preview(&self, preview: Option<&PreviewRef>) {
        match preview {
            Some(preview) => {
                let kind = preview
                    .as_str()
                    .strip_prefix("data:")
                    .and_then(|rest| rest.split(';').next())
                    .unwrap_or("image");
                println!("{} {}", "Preview:".dimmed(), format!("{} staged", kind).dimmed());
            }
            None => debug!("upload prompt restored"),
        }
    }
}

impl Drop for TerminalSurface {
    fn drop(&mut self) {
        if let Ok(mut spinners) = self.spinners.lock() {
            for (_, spinner) in spinners.drain() {
                spinner.finish_and_clear();
            }
        }
    }
}
