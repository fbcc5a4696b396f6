//! Renders session events to the terminal.
//!
//! Runs as its own task consuming the event channel, so display keeps
//! pace with the stream instead of waiting for the turn to finish.

use stitch_parse::event::{Color, ErrorScope, SessionEvent};
use tokio::sync::mpsc::UnboundedReceiver;

const RESET: &str = "\x1b[0m";

fn ansi(color: Color) -> &'static str {
    match color {
        Color::Cyan => "\x1b[36m",
        Color::Green => "\x1b[32m",
        Color::Yellow => "\x1b[33m",
        Color::Red => "\x1b[31m",
    }
}

/// One event as a display line. Progress events return `None`: they
/// update too fast to be worth a line each in a plain terminal.
pub fn render_event(event: &SessionEvent) -> Option<String> {
    match event {
        SessionEvent::Commentary { text, color } => Some(match color {
            Some(color) => format!("{}{}{}", ansi(*color), text, RESET),
            None => text.clone(),
        }),
        SessionEvent::EditOpened { path, kind } => Some(format!(
            "{}--- {:?} {} ---{}",
            ansi(Color::Green),
            kind,
            path.display(),
            RESET
        )),
        SessionEvent::EditProgress { .. } => None,
        SessionEvent::EditClosed {
            path,
            interval,
            lines,
        } => {
            let location = match interval {
                Some(iv) if iv.is_empty() => format!("insert before line {}", iv.start()),
                Some(iv) => format!("lines {}..{}", iv.start(), iv.end()),
                None => "resolved later".to_string(),
            };
            Some(format!(
                "{}=== {} ({location}, {} new lines) ==={}",
                ansi(Color::Green),
                path.display(),
                lines.len(),
                RESET
            ))
        }
        SessionEvent::Error { message, scope } => {
            let scope = match scope {
                ErrorScope::Edit => "edit".to_string(),
                ErrorScope::File(path) => path.display().to_string(),
                ErrorScope::Stream => "stream".to_string(),
            };
            Some(format!("{}error [{scope}]: {message}{}", ansi(Color::Red), RESET))
        }
    }
}

/// Drain the channel until every sender is gone, printing as we go.
pub async fn run_display(mut events: UnboundedReceiver<SessionEvent>) {
    while let Some(event) = events.recv().await {
        if let Some(line) = render_event(&event) {
            println!("{line}");
        }
    }
}
