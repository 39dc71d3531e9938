use std::ops::Range;

use parley_client::Transport;
use parley_core::{Message, Role, ScrollMode};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph},
};

use super::app::ChatApp;

struct Theme {
    user: Color,
    assistant: Color,
    text: Color,
    dim: Color,
    accent: Color,
}

impl Theme {
    fn new(dark: bool) -> Self {
        if dark {
            Self {
                user: Color::LightGreen,
                assistant: Color::LightBlue,
                text: Color::White,
                dim: Color::Gray,
                accent: Color::LightCyan,
            }
        } else {
            Self {
                user: Color::Green,
                assistant: Color::Blue,
                text: Color::Black,
                dim: Color::DarkGray,
                accent: Color::Cyan,
            }
        }
    }
}

/// Draws the thread and returns the id of the top-most message in view.
pub fn render<T: Transport + 'static>(frame: &mut Frame, app: &ChatApp<T>) -> Option<String> {
    let theme = Theme::new(app.session.config().dark_mode);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header
            Constraint::Min(1),    // Messages
            Constraint::Length(3), // Input
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    render_header(frame, app, &theme, chunks[0]);
    let top = render_messages(frame, app, &theme, chunks[1]);
    render_input(frame, app, &theme, chunks[2]);
    render_status_bar(frame, app, &theme, chunks[3]);
    top
}

fn render_header<T: Transport + 'static>(frame: &mut Frame, app: &ChatApp<T>, theme: &Theme, area: Rect) {
    let thread_text = match &app.view.thread_id {
        Some(id) => format!("  Thread: {}", id),
        None => "  (connecting...)".to_string(),
    };
    let title = format!(
        "parley chat - {}{}",
        app.session.config().generation.model,
        thread_text
    );

    let header =
        Paragraph::new(title).style(Style::default().fg(theme.accent).add_modifier(Modifier::BOLD));

    frame.render_widget(header, area);
}

/// The message list laid out as terminal rows at a fixed width.
struct Transcript {
    width: usize,
    rows: Vec<Line<'static>>,
    /// Row range and id of each message, top to bottom.
    spans: Vec<(Range<usize>, String)>,
}

impl Transcript {
    fn new(width: usize) -> Self {
        Self {
            width,
            rows: Vec::new(),
            spans: Vec::new(),
        }
    }

    fn push(&mut self, text: &str, style: Style) {
        for row in wrap_row(text, self.width) {
            self.rows.push(Line::from(Span::styled(row, style)));
        }
    }

    fn blank(&mut self) {
        self.rows.push(Line::from(""));
    }

    fn row_of(&self, message_id: &str) -> Option<usize> {
        self.spans
            .iter()
            .find(|(_, id)| id == message_id)
            .map(|(rows, _)| rows.start)
    }

    /// First message with a row at or below `top`.
    fn message_at(&self, top: usize) -> Option<String> {
        self.spans
            .iter()
            .find(|(rows, _)| rows.end > top)
            .map(|(_, id)| id.clone())
    }
}

/// Word-wraps one logical line; continuation rows keep its indent.
fn wrap_row(text: &str, width: usize) -> Vec<String> {
    let body = text.trim_start_matches(' ');
    if body.is_empty() {
        return vec![text.to_string()];
    }
    let indent = &text[..text.len() - body.len()];
    let indent = if indent.len() * 2 > width { "" } else { indent };

    let options = textwrap::Options::new(width.max(1))
        .initial_indent(indent)
        .subsequent_indent(indent)
        .wrap_algorithm(textwrap::WrapAlgorithm::FirstFit)
        .word_splitter(textwrap::WordSplitter::NoHyphenation)
        .break_words(true);
    textwrap::wrap(body, &options)
        .into_iter()
        .map(|row| row.into_owned())
        .collect()
}

fn transcript<T: Transport + 'static>(app: &ChatApp<T>, theme: &Theme, width: usize) -> Transcript {
    let view = &app.view;
    let mut out = Transcript::new(width);

    if view.backfilling {
        out.push(
            "Loading earlier messages...",
            Style::default().fg(theme.dim).add_modifier(Modifier::ITALIC),
        );
        out.blank();
    } else if view.has_more_history {
        out.push("▲ Earlier messages (Ctrl+L)", Style::default().fg(theme.accent));
        out.blank();
    }

    for message in &view.messages {
        let start = out.rows.len();
        push_message(&mut out, app, theme, message);
        out.spans.push((start..out.rows.len(), message.id.clone()));
        out.blank(); // Empty line between messages
    }

    if view.thinking {
        out.push(
            "Assistant:",
            Style::default().fg(theme.assistant).add_modifier(Modifier::BOLD),
        );
        out.push(
            "  ...",
            Style::default().fg(theme.dim).add_modifier(Modifier::ITALIC),
        );
    }

    if app.is_fresh() && !view.thinking {
        let prompts = &app.session.config().starter_prompts;
        if !prompts.is_empty() {
            out.push("Try (Tab):", Style::default().fg(theme.dim));
            for prompt in prompts {
                out.push(&format!("  {}", prompt), Style::default().fg(theme.dim));
            }
        }
    }

    if let Some(notice) = &app.last_notice {
        out.push(&format!("Error: {}", notice), Style::default().fg(Color::Red));
    }

    out
}

fn push_message<T: Transport + 'static>(
    out: &mut Transcript,
    app: &ChatApp<T>,
    theme: &Theme,
    message: &Message,
) {
    let (role, color) = match message.role {
        Role::User => ("You", theme.user),
        Role::Assistant => ("Assistant", theme.assistant),
    };
    out.push(
        &format!("{}:", role),
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    );

    for line in message.content.lines() {
        out.push(&format!("  {}", line), Style::default().fg(theme.text));
    }
    if message.is_streaming() {
        out.push("  ▌", Style::default().fg(theme.dim));
    }

    let sources = app.session.config().source_display.filter(&message.sources);
    if !sources.is_empty() {
        out.push(
            "  Sources:",
            Style::default().fg(theme.dim).add_modifier(Modifier::ITALIC),
        );
        for (i, source) in sources.iter().enumerate() {
            let text = if source.has_link() {
                format!("   [{}] {} <{}>", i + 1, source.display_title, source.document.link_to_source)
            } else {
                format!("   [{}] {}", i + 1, source.display_title)
            };
            out.push(&text, Style::default().fg(theme.dim));
        }
    }
}

fn render_messages<T: Transport + 'static>(
    frame: &mut Frame,
    app: &ChatApp<T>,
    theme: &Theme,
    area: Rect,
) -> Option<String> {
    // Account for borders
    let width = area.width.saturating_sub(2) as usize;
    let visible_height = area.height.saturating_sub(2) as usize;
    let transcript = transcript(app, theme, width);

    let max_top = transcript.rows.len().saturating_sub(visible_height);
    let base = match &app.view.scroll {
        ScrollMode::FollowTail => max_top,
        ScrollMode::Anchored(anchor) => transcript
            .row_of(anchor)
            .map_or(max_top, |row| row.min(max_top)),
    };
    let top = base.saturating_sub(app.messages_scroll as usize);
    let top_message = transcript.message_at(top);

    let paragraph = Paragraph::new(Text::from(transcript.rows))
        .block(Block::default().borders(Borders::ALL).title("Messages"))
        .scroll((u16::try_from(top).unwrap_or(u16::MAX), 0));

    frame.render_widget(paragraph, area);
    top_message
}

fn render_input<T: Transport + 'static>(frame: &mut Frame, app: &ChatApp<T>, theme: &Theme, area: Rect) {
    let input_block = Block::default().borders(Borders::ALL).title("Input");

    let (display_text, style) = if app.input.is_empty() {
        (
            app.session.config().placeholder.clone(),
            Style::default().fg(theme.dim),
        )
    } else {
        (app.input.clone(), Style::default())
    };

    let input_paragraph = Paragraph::new(display_text).style(style).block(input_block);

    frame.render_widget(input_paragraph, area);

    let cursor_cols = app.input[..app.cursor_pos].chars().count();
    let cursor_x = area
        .x
        .saturating_add(1)
        .saturating_add(u16::try_from(cursor_cols).unwrap_or(u16::MAX));
    frame.set_cursor_position((cursor_x, area.y + 1));
}

fn render_status_bar<T: Transport + 'static>(
    frame: &mut Frame,
    app: &ChatApp<T>,
    theme: &Theme,
    area: Rect,
) {
    let status = if app.view.busy {
        format!(
            "Generating response... (poll {})  Ctrl+L: Earlier messages  Ctrl+↑/↓: Scroll  Esc: Quit",
            app.view.polls
        )
    } else {
        "Enter: Send  Tab: Starter prompt  Ctrl+L: Earlier messages  Ctrl+N: New thread  Ctrl+↑/↓: Scroll  Esc: Quit"
            .to_string()
    };

    let status_bar = Paragraph::new(status).style(Style::default().fg(theme.dim));

    frame.render_widget(status_bar, area);
}
