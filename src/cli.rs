use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::*;
use tracing::{debug, info};

use crate::backend::HttpBackend;
use crate::config::AppConfig;
use crate::input::{LineReader, TabPrompt};
use crate::orchestrator::{OrchestratorOptions, SubmissionOrchestrator, VideoOrigin};
use crate::preferences::{StyleSelector, Tab, ThemePreference, KNOWN_STYLES};
use crate::terminal::TerminalSurface;
use crate::upload::{DataUrlPreviews, ImageFile};

/// A parsed line of REPL input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Quit,
    Text(String),
    Image(PathBuf),
    SubmitImage,
    RemoveImage,
    Video(String),
    Examples,
    Example(usize),
    Style(Option<String>),
    Theme,
    Tab(Option<String>),
    Copy(Option<PathBuf>),
    Html(Option<PathBuf>),
    Unknown(String),
}

fn optional(arg: &str) -> Option<String> {
    if arg.is_empty() {
        None
    } else {
        Some(arg.to_string())
    }
}

/// Slash commands are explicit; anything else goes to the active tab.
pub fn parse_command(line: &str, tab: Tab) -> Command {
    let trimmed = line.trim();
    if !trimmed.starts_with('/') {
        return match tab {
            Tab::Text => Command::Text(line.to_string()),
            Tab::Image if trimmed.is_empty() => Command::SubmitImage,
            Tab::Image => Command::Image(PathBuf::from(trimmed)),
            Tab::Video => Command::Video(line.to_string()),
        };
    }

    let parts: Vec<&str> = trimmed.splitn(2, ' ').collect();
    let command = parts[0];
    let arg = if parts.len() > 1 { parts[1].trim() } else { "" };

    match command {
        "/help" => Command::Help,
        "/quit" | "/exit" => Command::Quit,
        "/text" => Command::Text(arg.to_string()),
        "/image" if arg.is_empty() => Command::SubmitImage,
        "/image" => Command::Image(PathBuf::from(arg)),
        "/submit_image" => Command::SubmitImage,
        "/remove_image" => Command::RemoveImage,
        "/video" => Command::Video(arg.to_string()),
        "/examples" => Command::Examples,
        "/example" => match arg.parse::<usize>() {
            Ok(n) => Command::Example(n),
            Err(_) => Command::Unknown(trimmed.to_string()),
        },
        "/style" => Command::Style(optional(arg)),
        "/theme" => Command::Theme,
        "/tab" => Command::Tab(optional(arg)),
        "/copy" => Command::Copy(optional(arg).map(PathBuf::from)),
        "/html" => Command::Html(optional(arg).map(PathBuf::from)),
        _ => Command::Unknown(command.to_string()),
    }
}

fn print_help() {
    let rows = [
        ("/text <text>", "Generate notes from text (default in the text tab)"),
        ("/image <path>", "Stage an image for upload"),
        ("/submit_image", "Generate notes from the staged image"),
        ("/remove_image", "Discard the staged image"),
        ("/video <url>", "Generate notes from a YouTube video"),
        ("/examples", "List example videos"),
        ("/example <n>", "Generate notes from example video n"),
        ("/style [name]", "Show or set the note style"),
        ("/theme", "Toggle light/dark output"),
        ("/tab <text|image|video>", "Choose where plain input goes"),
        ("/copy [path]", "Write the latest notes to a file or stdout"),
        ("/html [path]", "Export the conversation as HTML"),
        ("/quit", "Exit"),
    ];
    for (command, description) in rows {
        println!("  {:<26} {}", command.cyan(), description.dimmed());
    }
}

fn write_or_print(path: Option<&Path>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
            println!("{} {}", "Written to".green(), path.display());
        }
        None => println!("{}", content),
    }
    Ok(())
}

struct Session {
    orchestrator: SubmissionOrchestrator,
    surface: Arc<TerminalSurface>,
    theme: ThemePreference,
    tab: Tab,
    examples: Vec<String>,
}

impl Session {
    /// Returns `false` when the REPL should stop.
    async fn handle(&mut self, command: Command) -> Result<bool> {
        match command {
            Command::Help => print_help(),
            Command::Quit => return Ok(false),
            Command::Text(text) => {
                self.orchestrator.submit_text(&text).await;
            }
            Command::Image(path) => match ImageFile::from_path(&path) {
                Ok(file) => {
                    // Rejections are already reported in the conversation
                    let _ = self.orchestrator.select_image(file).await;
                }
                Err(e) => eprintln!("{} {:#}", "Could not open image:".red(), e),
            },
            Command::SubmitImage => {
                self.orchestrator.submit_image().await;
            }
            Command::RemoveImage => self.orchestrator.remove_image(),
            Command::Video(url) => {
                self.orchestrator.submit_video(&url, VideoOrigin::Input).await;
            }
            Command::Examples => {
                for (i, url) in self.examples.iter().enumerate() {
                    println!("  {} {}", format!("{}.", i + 1).dimmed(), url.cyan());
                }
            }
            Command::Example(n) => match n.checked_sub(1).and_then(|i| self.examples.get(i)) {
                Some(url) => {
                    let url = url.clone();
                    self.orchestrator.submit_video(&url, VideoOrigin::Example).await;
                }
                None => println!("{} {}", "No example numbered".yellow(), n),
            },
            Command::Style(None) => {
                println!(
                    "{} {} ({})",
                    "Style:".dimmed(),
                    self.orchestrator.style().current().cyan(),
                    KNOWN_STYLES.join(", ")
                );
            }
            Command::Style(Some(style)) => {
                self.orchestrator.style().set(style.as_str());
                println!("{} {}", "Style set to".green(), style.cyan());
            }
            Command::Theme => {
                let theme = self.theme.toggle()?;
                self.surface.set_theme(theme);
                println!("{} {}", "Theme:".dimmed(), theme);
            }
            Command::Tab(None) => println!("{} {:?}", "Tab:".dimmed(), self.tab),
            Command::Tab(Some(name)) => match name.parse::<Tab>() {
                Ok(tab) => self.tab = tab,
                Err(e) => println!("{}", e.to_string().yellow()),
            },
            Command::Copy(path) => {
                let notes = self
                    .orchestrator
                    .with_log(|log| log.last_notes().map(|t| t.content.clone()));
                match notes {
                    Some(notes) => write_or_print(path.as_deref(), &notes)?,
                    None => println!("{}", "No notes to copy yet.".yellow()),
                }
            }
            Command::Html(path) => {
                let html = self.orchestrator.with_log(|log| log.to_html());
                write_or_print(path.as_deref(), &html)?;
            }
            Command::Unknown(command) => {
                println!("{} {} (try /help)", "Unknown command:".yellow(), command);
            }
        }
        Ok(true)
    }
}

/// Runs the interactive chat until the user quits.
pub async fn run_cli(config: AppConfig) -> Result<()> {
    let theme = ThemePreference::load(&config.general.theme_file);
    let surface = Arc::new(TerminalSurface::new(theme.current()));
    let backend = Arc::new(HttpBackend::new(&config.backend)?);
    let style = StyleSelector::new(config.ui.default_style.as_str());

    let orchestrator = SubmissionOrchestrator::new(
        backend,
        surface.clone(),
        Arc::new(DataUrlPreviews::default()),
        style,
        OrchestratorOptions::from(&config.ui),
    );

    let mut session = Session {
        orchestrator,
        surface,
        theme,
        tab: Tab::default(),
        examples: config.ui.example_videos.clone(),
    };

    let header_width = 60;
    println!("{}", "═".repeat(header_width).bright_blue());
    println!("{}", "Notes Generator".bright_white().bold());
    println!("{}", "═".repeat(header_width).bright_blue());
    println!("{} {}", "Service:".dimmed(), config.backend.base_url.cyan());
    println!("{} Type '/help' for available commands", "💡".yellow());
    println!();
    info!(backend = %config.backend.base_url, "session started");

    let mut reader = LineReader::new();
    loop {
        let prompt = TabPrompt {
            tab: session.tab,
            style: session.orchestrator.style().current(),
        };
        let Some(line) = reader.read_line(&prompt)? else {
            break;
        };
        let command = parse_command(&line, session.tab);
        debug!(?command, "command");

        if !session.handle(command).await? {
            break;
        }
    }

    println!("{}", "Goodbye!".bright_white());
    Ok(())
}
