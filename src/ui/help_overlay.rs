//! Help overlay: key bindings and how the numbers on screen are produced

use ratatui::{
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

/// Key bindings as (keys, action)
const KEYS: &[(&str, &str)] = &[
    ("r", "Fetch fresh data now, ignoring the cache"),
    ("c", "Clear the cached snapshot"),
    ("?", "Toggle this help"),
    ("q / Esc", "Quit"),
];

const OVERLAY_WIDTH: u16 = 60;
const OVERLAY_HEIGHT: u16 = 16;

/// Draws the overlay centred over whatever is already on screen
pub fn render(frame: &mut Frame, refresh_minutes: u64) {
    let area = overlay_area(frame.area());
    frame.render_widget(Clear, area);

    let heading = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD);
    let muted = Style::default().fg(Color::DarkGray);

    let mut lines = vec![Line::from(Span::styled("Keys", heading))];
    lines.extend(KEYS.iter().map(|(keys, action)| {
        Line::from(vec![
            Span::styled(format!("  {:<10}", keys), Style::default().fg(Color::Yellow)),
            Span::raw(*action),
        ])
    }));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("Charts", heading)));
    lines.push(Line::from("  Top: average power per quarter hour today (kW)"));
    lines.push(Line::from("  Bottom: energy per day, last 30 days (kWh)"));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!(
            "Updates every {} minutes; cached data is reused in between.",
            refresh_minutes
        ),
        muted,
    )));
    lines.push(Line::from(Span::styled("Esc or ? closes this window", muted)));

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

/// Fixed-size box centred in `area`, shrunk to fit small terminals
fn overlay_area(area: Rect) -> Rect {
    let [row] = Layout::vertical([Constraint::Length(OVERLAY_HEIGHT.min(area.height))])
        .flex(Flex::Center)
        .areas(area);
    let [cell] = Layout::horizontal([Constraint::Length(OVERLAY_WIDTH.min(area.width))])
        .flex(Flex::Center)
        .areas(row);
    cell
}
