//! Safe HTML for conversation turns.
//!
//! Every piece of user or backend text is escaped before any markup is
//! introduced, so nothing the backend returns can inject elements.

use std::sync::LazyLock;

use regex::Regex;

use super::types::{Turn, TurnKind};

static FENCED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```([^`]+)```").expect("fenced block pattern is valid"));
static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("bold pattern is valid"));
static ITALIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*(.*?)\*").expect("italic pattern is valid"));

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn inline_markup(escaped: &str) -> String {
    let bolded = BOLD.replace_all(escaped, "<strong>$1</strong>");
    let emphasised = ITALIC.replace_all(&bolded, "<em>$1</em>");
    emphasised.replace('\n', "<br>")
}

/// Lightweight markdown used for note content: `**bold**`, `*italic*`,
/// fenced blocks and line breaks. Fenced block bodies are left as-is.
pub fn render_notes(raw: &str) -> String {
    let escaped = escape_html(raw);
    let mut out = String::with_capacity(escaped.len() + 32);
    let mut last = 0;

    for caps in FENCED.captures_iter(&escaped) {
        let (Some(whole), Some(body)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        out.push_str(&inline_markup(&escaped[last..whole.start()]));
        out.push_str("<pre>");
        out.push_str(body.as_str());
        out.push_str("</pre>");
        last = whole.end();
    }
    out.push_str(&inline_markup(&escaped[last..]));
    out
}

/// Renders a single turn as it would appear inside the chat box.
pub fn turn_to_html(turn: &Turn) -> String {
    let body = match turn.kind {
        TurnKind::TextEcho => format!("<p>{}</p>", escape_html(&turn.content)),
        TurnKind::ImageEcho => format!(
            "<p>Generated notes from this image:</p>\
             <div class=\"image-preview\"><img src=\"{}\" alt=\"Uploaded content\" class=\"uploaded-image\"></div>",
            escape_html(&turn.content)
        ),
        TurnKind::VideoEcho => {
            let url = escape_html(&turn.content);
            format!(
                "<p>Generated notes from this video: \
                 <a href=\"{url}\" target=\"_blank\" rel=\"noopener noreferrer\">{url}</a></p>"
            )
        }
        TurnKind::Result => format!(
            "<div class=\"notes-content\">{}</div>",
            render_notes(&turn.content)
        ),
        TurnKind::ErrorResult => format!(
            "<p class=\"error-message\">Error: {}</p>",
            escape_html(&turn.content)
        ),
        TurnKind::Placeholder => {
            "<div class=\"loading-dots\"><span></span><span></span><span></span></div>".to_string()
        }
    };

    let (class, icon) = match turn.author {
        super::types::Author::User => ("user-message", "fa-user"),
        super::types::Author::Assistant => ("bot-message", "fa-robot"),
    };
    let loading = if turn.is_placeholder() { " loading" } else { "" };

    format!(
        "<div class=\"message {class}{loading}\" data-turn=\"{}\">\
         <div class=\"avatar\"><i class=\"fa-solid {icon}\"></i></div>\
         <div class=\"message-content\">{body}</div></div>",
        turn.id.0
    )
}
