//! One-shot "bubble" adapter: submits a single message and streams the
//! reveal to stdout as it happens.

use std::io::{self, Write};

use parley_client::Transport;
use parley_core::{ChatSession, Message, SourceDisplay, ThreadEvent};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::debug;

use crate::error::ToolError;

pub async fn run<T: Transport>(
    session: &ChatSession<T>,
    text: &str,
) -> Result<(), ToolError> {
    let mut events = session.subscribe();
    let mut stdout = io::stdout();
    let mut printed = String::new();

    let submit = session.submit(text);
    tokio::pin!(submit);

    let result = loop {
        tokio::select! {
            result = &mut submit => break result,
            Some(event) = events.recv() => handle_event(&mut stdout, &mut printed, event)?,
        }
    };
    for event in drain(&mut events) {
        handle_event(&mut stdout, &mut printed, event)?;
    }
    writeln!(stdout)?;

    let message = match result {
        Ok(message) => message,
        Err(e) => {
            debug!(error = %e, "Ask ended without an answer");
            return Err(e.into());
        }
    };

    write_sources(&mut stdout, &message, session.config().source_display)?;
    if let Some(thread_id) = session.thread_id() {
        eprintln!("Thread: {} (continue with --thread {})", thread_id, thread_id);
    }
    Ok(())
}

fn handle_event(out: &mut impl Write, printed: &mut String, event: ThreadEvent) -> io::Result<()> {
    match event {
        ThreadEvent::StreamingUpdated { content } => write_delta(out, printed, &content),
        ThreadEvent::Finalized(message) => write_delta(out, printed, &message.content),
        ThreadEvent::Notice(notice) => {
            eprintln!("{}", notice);
            Ok(())
        }
        _ => Ok(()),
    }
}

fn drain(events: &mut UnboundedReceiver<ThreadEvent>) -> Vec<ThreadEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}

/// Prints what `content` adds to `printed`. Content that rewrites what was
/// already printed starts over on a new line.
fn write_delta(out: &mut impl Write, printed: &mut String, content: &str) -> io::Result<()> {
    match content.strip_prefix(printed.as_str()) {
        Some(delta) => write!(out, "{}", delta)?,
        None => write!(out, "\n{}", content)?,
    }
    out.flush()?;
    printed.clear();
    printed.push_str(content);
    Ok(())
}

fn write_sources(out: &mut impl Write, message: &Message, display: SourceDisplay) -> io::Result<()> {
    let sources = display.filter(&message.sources);
    if sources.is_empty() {
        return Ok(());
    }

    writeln!(out, "\nSources:")?;
    for (i, source) in sources.iter().enumerate() {
        if source.has_link() {
            writeln!(out, "  [{}] {} <{}>", i + 1, source.display_title, source.document.link_to_source)?;
        } else {
            writeln!(out, "  [{}] {}", i + 1, source.display_title)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_client::{Document, RankedResult};
    use parley_core::format_sources;

    fn output(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn delta_prints_only_new_text() {
        let mut out = Vec::new();
        let mut printed = String::new();
        write_delta(&mut out, &mut printed, "Hello").unwrap();
        write_delta(&mut out, &mut printed, "Hello there").unwrap();
        write_delta(&mut out, &mut printed, "Hello there").unwrap();
        assert_eq!(output(out), "Hello there");
        assert_eq!(printed, "Hello there");
    }

    #[test]
    fn rewritten_text_starts_over() {
        let mut out = Vec::new();
        let mut printed = String::new();
        write_delta(&mut out, &mut printed, "Hello world").unwrap();
        write_delta(&mut out, &mut printed, "Goodbye").unwrap();
        assert_eq!(output(out), "Hello world\nGoodbye");
    }

    #[test]
    fn sources_follow_display_mode() {
        let ranked = |title: &str, link: &str| RankedResult {
            content: String::new(),
            metadata: Document {
                title: title.to_string(),
                link_to_source: link.to_string(),
            },
        };
        let mut message = Message::assistant("ai_1", "answer");
        message.sources =
            format_sources(&[0, 1], &[ranked("Guide", ""), ranked("Manual", "https://x")]).unwrap();

        let mut out = Vec::new();
        write_sources(&mut out, &message, SourceDisplay::LinkToSourceOnly).unwrap();
        assert_eq!(output(out), "\nSources:\n  [1] Manual <https://x>\n");

        let mut out = Vec::new();
        write_sources(&mut out, &message, SourceDisplay::None).unwrap();
        assert!(out.is_empty());
    }
}
