use std::time::Instant;

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use super::app::{App, NoticeLevel, RevealedChunk};
use crate::domain::Turn;

const PLACEHOLDER: &str = "Ask any question to get started";
/// Assistant text once fully faded in.
const ASSISTANT_RGB: (u8, u8, u8) = (163, 163, 163);
/// Starting point of a fade: close to the dark background.
const FADE_FROM_RGB: (u8, u8, u8) = (40, 40, 44);

pub fn draw(frame: &mut Frame, app: &App) {
    let [header_area, transcript_area, notice_area, input_area, hint_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Fill(1),
        Constraint::Length(1),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    draw_header(frame, app, header_area);
    draw_transcript(frame, app, transcript_area, Instant::now());
    draw_notice(frame, app, notice_area);
    draw_input(frame, app, input_area);
    draw_hints(frame, app, hint_area);
}

fn draw_header(frame: &mut Frame, app: &App, area: Rect) {
    let state = if app.is_streaming() {
        "● streaming"
    } else {
        "○ idle"
    };
    let text = format!(" {} @ {} | {} ", app.model, app.backend, state);
    frame.render_widget(
        Paragraph::new(text).style(Style::default().fg(Color::DarkGray)),
        area,
    );
}

fn draw_transcript(frame: &mut Frame, app: &App, area: Rect, now: Instant) {
    if app.transcript.is_empty() && app.streaming.is_none() {
        frame.render_widget(
            Paragraph::new(PLACEHOLDER)
                .style(Style::default().fg(Color::Gray))
                .centered(),
            area,
        );
        return;
    }

    let mut lines: Vec<Line> = Vec::new();
    for turn in &app.transcript {
        push_turn(&mut lines, turn);
    }

    if let Some(view) = &app.streaming {
        push_turn(&mut lines, &view.prompt);
        let spans: Vec<Span> = view.chunks.iter().map(|c| chunk_span(c, now)).collect();
        lines.push(Line::from(spans));
        lines.push(Line::raw(""));
    }

    let rows = wrapped_rows(&lines, area.width);
    let offset = rows
        .saturating_sub(area.height)
        .saturating_sub(app.scroll_back);

    frame.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .scroll((offset, 0)),
        area,
    );
}

fn push_turn<'a>(lines: &mut Vec<Line<'a>>, turn: &'a Turn) {
    let style = if turn.is_user() {
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(rgb(ASSISTANT_RGB))
    };
    for text in turn.content().lines() {
        lines.push(Line::from(Span::styled(text, style)));
    }
    if !turn.is_user() {
        lines.push(Line::raw(""));
    }
}

fn chunk_span(chunk: &RevealedChunk, now: Instant) -> Span<'_> {
    let color = blend(FADE_FROM_RGB, ASSISTANT_RGB, chunk.opacity(now));
    Span::styled(chunk.text.as_str(), Style::default().fg(color))
}

fn draw_notice(frame: &mut Frame, app: &App, area: Rect) {
    let Some(notice) = &app.notice else {
        return;
    };
    let color = match notice.level {
        NoticeLevel::Info => Color::Yellow,
        NoticeLevel::Error => Color::Red,
    };
    frame.render_widget(
        Paragraph::new(format!(" {}", notice.text)).style(Style::default().fg(color)),
        area,
    );
}

fn draw_input(frame: &mut Frame, app: &App, area: Rect) {
    let border = if app.is_streaming() {
        Color::DarkGray
    } else {
        Color::Blue
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border));

    let content = if app.input.is_empty() {
        Line::from(Span::styled(
            "Ask a question...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Line::from(app.input.as_str())
    };

    frame.render_widget(Paragraph::new(content).block(block), area);

    let typed = u16::try_from(Line::from(app.input.as_str()).width()).unwrap_or(u16::MAX);
    let cursor_x = area.x.saturating_add(1).saturating_add(typed);
    let max_x = area.x.saturating_add(area.width.saturating_sub(2));
    frame.set_cursor_position((cursor_x.min(max_x), area.y + 1));
}

fn draw_hints(frame: &mut Frame, app: &App, area: Rect) {
    let hints = if app.is_streaming() {
        " [Esc] cancel  [PgUp/PgDn] scroll  [Ctrl+C] quit "
    } else {
        " [Enter] send  [PgUp/PgDn] scroll  [Ctrl+C] quit "
    };
    frame.render_widget(
        Paragraph::new(hints).style(Style::default().fg(Color::DarkGray)),
        area,
    );
}

/// Rows the lines occupy once word-wrapped at `width`. Errs on the high side,
/// so the newest line is never scrolled below the pane.
fn wrapped_rows(lines: &[Line], width: u16) -> u16 {
    let width = usize::from(width.max(1));
    let rows: usize = lines.iter().map(|line| line_rows(line, width)).sum();
    u16::try_from(rows).unwrap_or(u16::MAX)
}

fn line_rows(line: &Line, width: usize) -> usize {
    let text: String = line.spans.iter().map(|span| span.content.as_ref()).collect();
    let mut rows = 1;
    let mut col = 0;
    for word in text.split_inclusive(char::is_whitespace) {
        let visible = Span::raw(word.trim_end()).width();
        if col > 0 && col + visible > width {
            rows += 1;
            col = 0;
        }
        col += Span::raw(word).width();
        while col > width {
            rows += 1;
            col -= width;
        }
    }
    rows
}

fn rgb((r, g, b): (u8, u8, u8)) -> Color {
    Color::Rgb(r, g, b)
}

fn blend(from: (u8, u8, u8), to: (u8, u8, u8), t: f32) -> Color {
    let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
    Color::Rgb(mix(from.0, to.0), mix(from.1, to.1), mix(from.2, to.2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FadeIn, SessionEvent, StreamId};
    use ratatui::{backend::TestBackend, Terminal};

    fn render(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(60, 12)).unwrap();
        terminal.draw(|frame| draw(frame, app)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content()
            .chunks(60)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn empty_conversation_shows_placeholder() {
        let app = App::new("llama3.1", "http://localhost:11434");
        let screen = render(&app);
        assert!(screen.contains(PLACEHOLDER));
        assert!(screen.contains("llama3.1"));
    }

    #[test]
    fn streaming_answer_is_drawn_from_chunks() {
        let mut app = App::new("m", "b");
        let stream = StreamId::new();
        app.handle_session_event(SessionEvent::StreamStarted {
            stream,
            prompt: Turn::user("Tell me"),
        });
        app.handle_session_event(SessionEvent::ChunksRevealed {
            stream,
            chunks: vec![crate::domain::ChunkReveal {
                index: 0,
                text: "Once upon ".into(),
                fade: FadeIn::default(),
            }],
        });

        let screen = render(&app);
        assert!(screen.contains("Tell me"));
        assert!(screen.contains("Once upon"));
        assert!(screen.contains("[Esc] cancel"));
    }

    #[test]
    fn blend_reaches_endpoints() {
        assert_eq!(blend((0, 0, 0), (200, 100, 50), 0.0), Color::Rgb(0, 0, 0));
        assert_eq!(blend((0, 0, 0), (200, 100, 50), 1.0), Color::Rgb(200, 100, 50));
    }

    #[test]
    fn wrapped_rows_counts_long_lines() {
        let lines = vec![Line::raw("a".repeat(25)), Line::raw("")];
        assert_eq!(wrapped_rows(&lines, 10), 4);
    }

    #[test]
    fn wrapped_rows_breaks_at_word_boundaries() {
        // 27 columns would fit in 3 rows, but no two words share a row.
        let lines = vec![Line::raw("aaaaaa bbbbbb cccccc dddddd")];
        assert_eq!(wrapped_rows(&lines, 10), 4);

        let spans = Line::from(vec![Span::raw("Once upon "), Span::raw("a time ")]);
        assert_eq!(wrapped_rows(&[spans], 10), 2);
    }

    #[test]
    fn newest_chunk_stays_visible_when_wrapping() {
        let mut app = App::new("m", "b");
        let stream = StreamId::new();
        app.handle_session_event(SessionEvent::StreamStarted {
            stream,
            prompt: Turn::user("Tell me"),
        });
        let words = [
            "alpha beta ", "gamma delta ", "epsilon zeta ", "theta iota ", "kappa lambda ",
            "sigma omega ", "north south ", "east west ", "final words ",
        ];
        let chunks = words
            .iter()
            .enumerate()
            .map(|(index, text)| crate::domain::ChunkReveal {
                index,
                text: text.to_string(),
                fade: FadeIn::from_millis(0),
            })
            .collect();
        app.handle_session_event(SessionEvent::ChunksRevealed { stream, chunks });

        let mut terminal = Terminal::new(TestBackend::new(16, 12)).unwrap();
        terminal.draw(|frame| draw(frame, &app)).unwrap();
        let screen: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(screen.contains("final"));
    }

    #[test]
    fn very_long_input_does_not_overflow_cursor() {
        let mut app = App::new("m", "b");
        app.input = "x".repeat(usize::from(u16::MAX) + 10);
        let screen = render(&app);
        assert!(screen.contains("xxxx"));
    }
}
