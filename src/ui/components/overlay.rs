use super::input::TextInput;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

const ACCENT: Color = Color::Magenta;

/// Draw a floating box at the top-left of `area` with a prompt line for
/// `input`. Returns the rows below the prompt, if any were requested.
pub fn draw_prompt_box(
  frame: &mut Frame,
  area: Rect,
  title: &str,
  prompt: char,
  input: &TextInput,
  extra_rows: u16,
) -> Option<Rect> {
  let width = (area.width * 60 / 100).clamp(30, 60).min(area.width.saturating_sub(2));
  let height = (3 + extra_rows).min(area.height.saturating_sub(1));
  let overlay = Rect::new(area.x + 1, area.y + 1, width, height);

  frame.render_widget(Clear, overlay);
  let block = Block::default()
    .borders(Borders::ALL)
    .border_style(Style::default().fg(ACCENT))
    .title(format!(" {} ", title));
  let inner = block.inner(overlay);
  frame.render_widget(block, overlay);
  if inner.height == 0 {
    return None;
  }

  let (before, after) = input.split_at_cursor();
  let line = Line::from(vec![
    Span::styled(prompt.to_string(), Style::default().fg(ACCENT)),
    Span::raw(before),
    Span::styled("▏", Style::default().fg(ACCENT)),
    Span::raw(after),
  ]);
  frame.render_widget(Paragraph::new(line), Rect { height: 1, ..inner });

  (extra_rows > 0 && inner.height > 1).then(|| Rect {
    y: inner.y + 1,
    height: inner.height - 1,
    ..inner
  })
}
