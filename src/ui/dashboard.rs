//! Dashboard screen rendering
//!
//! Renders current power, today's energy, the intraday power curve and the
//! 30-day energy bars from the chart slots owned by the [`App`].

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Bar, BarChart, BarGroup, Block, Borders, Chart, Dataset, GraphType, Paragraph},
    Frame,
};

use crate::app::{App, ChartSlot};
use solarpeek::data::{ChartPoint, EnergySource};

/// Widest bar drawn in the daily chart
const MAX_BAR_WIDTH: u16 = 5;

/// Renders the full dashboard
pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Min(8),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(frame.area());

    render_header(frame, app, chunks[0]);
    render_intraday_chart(frame, &app.intraday_chart, chunks[1]);
    render_daily_chart(frame, &app.daily_chart, chunks[2]);
    render_status(frame, app, chunks[3]);
    render_footer(frame, chunks[4]);
}

/// Renders a full-screen failure message
pub fn render_error(frame: &mut Frame, message: &str) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Length(5),
            Constraint::Percentage(40),
        ])
        .split(frame.area());

    let lines = vec![
        Line::from(Span::styled(
            message.to_string(),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "r retry   q quit   (solarpeek configure --api-key KEY --site-id ID)",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center), chunks[1]);
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let value_style = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD);
    let label_style = Style::default().fg(Color::Gray);

    let mut spans = Vec::new();
    match &app.metrics {
        Some(metrics) => {
            spans.push(Span::styled("Now ", label_style));
            spans.push(Span::styled(format!("{:.2}", metrics.current_power_kw), value_style));
            spans.push(Span::styled(" kW   ", label_style));
            spans.push(Span::styled("Today ", label_style));
            spans.push(Span::styled(format!("{:.2}", metrics.today_energy_kwh), value_style));
            spans.push(Span::styled(" kWh   ", label_style));
        }
        None => spans.push(Span::styled("No data   ", label_style)),
    }
    if let Some(updated) = app.last_update {
        spans.push(Span::styled(
            format!("Updated {}", updated.format("%H:%M:%S")),
            label_style,
        ));
    }
    if app.is_loading() {
        spans.push(Span::styled("   refreshing…", Style::default().fg(Color::Cyan)));
    }

    let block = Block::default()
        .title(" solarpeek ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn render_intraday_chart(frame: &mut Frame, slot: &ChartSlot, area: Rect) {
    let block = Block::default()
        .title(" Today · Power (kW) ")
        .borders(Borders::ALL);

    if slot.points().is_empty() {
        render_empty(frame, block, area);
        return;
    }

    let data: Vec<(f64, f64)> = slot
        .points()
        .iter()
        .enumerate()
        .map(|(i, p)| (i as f64, p.value))
        .collect();
    let x_max = data.len().saturating_sub(1).max(1) as f64;
    let y_max = axis_ceiling(slot.max_value());

    let dataset = Dataset::default()
        .name("Power (kW)")
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Cyan))
        .data(&data);

    let axis_style = Style::default().fg(Color::Gray);
    let chart = Chart::new(vec![dataset])
        .block(block)
        .x_axis(
            Axis::default()
                .style(axis_style)
                .bounds([0.0, x_max])
                .labels(time_axis_labels(slot.points())),
        )
        .y_axis(
            Axis::default()
                .style(axis_style)
                .bounds([0.0, y_max])
                .labels(vec![
                    Span::raw("0"),
                    Span::raw(format!("{:.1}", y_max / 2.0)),
                    Span::raw(format!("{:.1}", y_max)),
                ]),
        );

    frame.render_widget(chart, area);
}

fn render_daily_chart(frame: &mut Frame, slot: &ChartSlot, area: Rect) {
    let block = Block::default()
        .title(" Last 30 days · Energy (kWh) ")
        .borders(Borders::ALL);

    if slot.points().is_empty() {
        render_empty(frame, block, area);
        return;
    }

    let inner_width = area.width.saturating_sub(2) as usize;
    let (bar_width, visible) = bar_layout(slot.points().len(), inner_width);
    let points = &slot.points()[slot.points().len() - visible..];

    let bars: Vec<Bar> = points
        .iter()
        .map(|p| {
            Bar::default()
                // BarChart takes integers; tenths of a kWh keep the bar heights smooth
                .value((p.value.max(0.0) * 10.0).round() as u64)
                .label(Line::from(day_of_month(&p.label).to_string()))
                .text_value(format!("{:.0}", p.value))
        })
        .collect();

    let chart = BarChart::default()
        .block(block)
        .bar_width(bar_width)
        .bar_gap(1)
        .bar_style(Style::default().fg(Color::Green))
        .value_style(Style::default().fg(Color::Black).bg(Color::Green))
        .data(BarGroup::default().bars(&bars));

    frame.render_widget(chart, area);
}

fn render_empty(frame: &mut Frame, block: Block, area: Rect) {
    let paragraph = Paragraph::new("No data yet")
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center)
        .block(block);
    frame.render_widget(paragraph, area);
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
    let line = match (&app.notice, &app.metrics) {
        (Some(notice), _) => Line::from(Span::styled(
            notice.clone(),
            Style::default().fg(Color::Yellow),
        )),
        (None, Some(metrics)) => Line::from(Span::styled(
            match metrics.energy_source {
                EnergySource::Overview => "Today's energy: reported by site overview",
                EnergySource::Derived => "Today's energy: summed from quarter-hour data",
            },
            Style::default().fg(Color::DarkGray),
        )),
        (None, None) => Line::from(""),
    };
    frame.render_widget(Paragraph::new(line), area);
}

fn render_footer(frame: &mut Frame, area: Rect) {
    let key = Style::default().fg(Color::Yellow);
    let text = Style::default().fg(Color::DarkGray);
    let line = Line::from(vec![
        Span::styled("r", key),
        Span::styled(" refresh  ", text),
        Span::styled("c", key),
        Span::styled(" clear cache  ", text),
        Span::styled("?", key),
        Span::styled(" help  ", text),
        Span::styled("q", key),
        Span::styled(" quit", text),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

/// First, middle and last labels of the series
fn time_axis_labels(points: &[ChartPoint]) -> Vec<Span<'static>> {
    match points.len() {
        0 => Vec::new(),
        1 => vec![Span::raw(points[0].label.clone())],
        n => vec![
            Span::raw(points[0].label.clone()),
            Span::raw(points[n / 2].label.clone()),
            Span::raw(points[n - 1].label.clone()),
        ],
    }
}

/// Rounds the chart's top up to a whole number (at least 1)
fn axis_ceiling(max: f64) -> f64 {
    if max.is_finite() && max > 1.0 {
        max.ceil()
    } else {
        1.0
    }
}

/// Bar width and number of trailing bars that fit in `width` columns
///
/// Bars are separated by a one-column gap. When even one-column bars do not
/// fit, only the most recent ones are shown.
fn bar_layout(count: usize, width: usize) -> (u16, usize) {
    if count == 0 || width == 0 {
        return (1, 0);
    }
    let per_bar = (width + 1) / count;
    if per_bar >= 2 {
        let bar_width = ((per_bar - 1) as u16).min(MAX_BAR_WIDTH);
        (bar_width, count)
    } else {
        (1, ((width + 1) / 2).min(count))
    }
}

/// "Oct 1" -> "1"
fn day_of_month(label: &str) -> &str {
    label.rsplit(' ').next().unwrap_or(label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_layout_wide_area_caps_width() {
        assert_eq!(bar_layout(10, 200), (MAX_BAR_WIDTH, 10));
    }

    #[test]
    fn test_bar_layout_fits_all_bars() {
        // 31 bars in 92 columns: 93 / 31 = 3 columns per bar including the gap
        assert_eq!(bar_layout(31, 92), (2, 31));
    }

    #[test]
    fn test_bar_layout_narrow_area_shows_latest() {
        assert_eq!(bar_layout(31, 20), (1, 10));
    }

    #[test]
    fn test_bar_layout_empty() {
        assert_eq!(bar_layout(0, 80), (1, 0));
        assert_eq!(bar_layout(5, 0), (1, 0));
    }

    #[test]
    fn test_axis_ceiling() {
        assert_eq!(axis_ceiling(0.0), 1.0);
        assert_eq!(axis_ceiling(0.4), 1.0);
        assert_eq!(axis_ceiling(3.2), 4.0);
        assert_eq!(axis_ceiling(f64::NAN), 1.0);
    }

    #[test]
    fn test_day_of_month() {
        assert_eq!(day_of_month("Oct 1"), "1");
        assert_eq!(day_of_month("12"), "12");
    }

    #[test]
    fn test_time_axis_labels() {
        let points: Vec<ChartPoint> = ["06:00", "06:15", "06:30", "06:45"]
            .iter()
            .map(|l| ChartPoint {
                label: l.to_string(),
                value: 1.0,
            })
            .collect();
        let labels: Vec<String> = time_axis_labels(&points)
            .into_iter()
            .map(|s| s.content.to_string())
            .collect();
        assert_eq!(labels, vec!["06:00", "06:30", "06:45"]);
    }
}
