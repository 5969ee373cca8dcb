use crate::ui::view::ShortcutInfo;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// What the header shows besides shortcuts
pub struct HeaderInfo<'a> {
  pub title: &'a str,
  pub username: Option<&'a str>,
  pub liked_count: usize,
  pub loading: bool,
}

/// Draw the header bar with logo, context, and shortcuts
pub fn draw_header(frame: &mut Frame, area: Rect, info: &HeaderInfo, shortcuts: &[ShortcutInfo]) {
  let mut spans = vec![
    Span::styled(" haven ", Style::default().fg(Color::Magenta).bold()),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(format!(" {} ", info.title), Style::default().fg(Color::White)),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(
      format!(" {} ", info.username.unwrap_or("guest")),
      Style::default().fg(Color::Yellow).bold(),
    ),
    Span::styled(
      format!("♥ {} ", info.liked_count),
      Style::default().fg(Color::Red),
    ),
  ];

  if info.loading {
    spans.push(Span::styled("(syncing...) ", Style::default().fg(Color::DarkGray)));
  }
  spans.push(Span::raw(" "));

  // Shortcuts - keys highlighted, descriptions dimmed
  let mut sorted: Vec<&ShortcutInfo> = shortcuts.iter().collect();
  sorted.sort_by_key(|s| s.priority);
  for shortcut in sorted {
    spans.push(Span::styled(
      format!("<{}>", shortcut.key),
      Style::default().fg(Color::Cyan),
    ));
    spans.push(Span::styled(
      format!(" {}   ", shortcut.label),
      Style::default().fg(Color::DarkGray),
    ));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));

  frame.render_widget(paragraph, area);
}
