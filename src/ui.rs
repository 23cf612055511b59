//! TUI rendering for the Ember hotspot dashboard.
//!
//! Pure presentation: every function reads the [`App`] (selection, view, search
//! prompt) and a [`RetrievalState`] snapshot, and never mutates either.

use crate::app::{App, InputMode, ViewMode};
use crate::controller::{LocationSource, RetrievalState};
use crate::models::Hotspot;
use crate::projection::RiskLevel;
use chrono::Utc;
use ratatui::{
    prelude::*,
    widgets::{canvas::*, *}, // Imports Map, Context, etc.
};

use ratatui::text::Line;

const SPINNER: [&str; 8] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧"];

/// Renders one frame: the selected view plus the status bar underneath.
pub fn render(f: &mut Frame, app: &App, state: &RetrievalState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)])
        .split(f.size());

    match app.view_mode {
        ViewMode::Dashboard => render_dashboard_view(f, app, state, chunks[0]),
        ViewMode::Map => render_map_view(f, app, state, chunks[0]),
    }
    render_status_bar(f, app, state, chunks[1]);
}

/// Color for a confidence bucket. Used by the list, the markers and the legend.
pub fn risk_color(level: RiskLevel) -> Color {
    match level {
        RiskLevel::High => Color::Red,
        RiskLevel::Medium => Color::Rgb(255, 140, 0),
        RiskLevel::Low => Color::Yellow,
    }
}

/// Dashboard view: ranked hotspot list (35%) + conditions and detail panels.
fn render_dashboard_view(f: &mut Frame, app: &App, state: &RetrievalState, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(area);

    draw_ranked_list(f, app, state, chunks[0]);

    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(8), Constraint::Min(0)])
        .split(chunks[1]);

    draw_conditions(f, state, main_chunks[0]);
    draw_hotspot_details(f, app, state, main_chunks[1]);
}

fn draw_ranked_list(f: &mut Frame, app: &App, state: &RetrievalState, area: Rect) {
    let block = Block::default()
        .title(" Top Hotspots ")
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded);

    let ranked = state.ranked();
    if ranked.is_empty() {
        let text = if state.loading {
            "Searching for hotspots..."
        } else {
            "No hotspots found in this area"
        };
        let p = Paragraph::new(text)
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(p, area);
        return;
    }

    let items: Vec<ListItem> = ranked
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let level = RiskLevel::of(h);
            let style = if i == app.selected_index {
                Style::default()
                    .fg(Color::Cyan)
                    .bg(Color::Rgb(30, 30, 60))
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };

            ListItem::new(Line::from(vec![
                Span::styled(format!(" {}. ", i + 1), style),
                Span::styled("▲ ", Style::default().fg(risk_color(level))),
                Span::styled(format!("{:>3}% ", h.confidence), style),
                Span::styled(
                    format!("│ {:>5.1} MW │ {:>5.1} km", h.frp, state.center.distance_km(&h.coordinate())),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
        })
        .collect();

    f.render_widget(List::new(items).block(block), area);
}

fn draw_conditions(f: &mut Frame, state: &RetrievalState, area: Rect) {
    let counts = state.risk_counts();
    let bold = Style::default().add_modifier(Modifier::BOLD);

    let weather_line = match &state.weather {
        Some(w) => Line::from(vec![
            Span::styled("  TEMP: ", bold),
            Span::raw(format!("{:.0}°C", w.temp)),
            Span::raw("  │  "),
            Span::styled("HUMIDITY: ", bold),
            Span::styled(
                format!("{}%", w.humidity),
                Style::default().fg(if w.humidity < 20 { Color::Red } else { Color::Green }),
            ),
            Span::raw("  │  "),
            Span::styled("WIND: ", bold),
            Span::raw(format!("{:.0} km/h", w.wind_speed)),
        ]),
        None => Line::from(Span::styled(
            "  Weather unavailable",
            Style::default().fg(Color::DarkGray),
        )),
    };

    let source = match &state.location_source {
        LocationSource::Default => "Default area".to_string(),
        LocationSource::Device => "Your location".to_string(),
        LocationSource::Search(q) => format!("Search: {q}"),
    };

    let content = vec![
        weather_line,
        Line::from(""),
        Line::from(vec![
            Span::styled("  RISK: ", bold),
            Span::styled(format!("{} High", counts.high), Style::default().fg(risk_color(RiskLevel::High))),
            Span::raw("  "),
            Span::styled(
                format!("{} Medium", counts.medium),
                Style::default().fg(risk_color(RiskLevel::Medium)),
            ),
            Span::raw("  "),
            Span::styled(format!("{} Low", counts.low), Style::default().fg(risk_color(RiskLevel::Low))),
            Span::raw("  │  "),
            Span::styled("TOTAL: ", bold),
            Span::raw(counts.total().to_string()),
        ]),
        Line::from(vec![
            Span::styled("  CENTER: ", bold),
            Span::styled(state.center.to_string(), Style::default().fg(Color::Magenta)),
            Span::raw("  │  "),
            Span::styled(source, Style::default().fg(Color::DarkGray)),
        ]),
    ];

    let block = Paragraph::new(content).block(
        Block::default()
            .title(" Conditions ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    f.render_widget(block, area);
}

fn draw_hotspot_details(f: &mut Frame, app: &App, state: &RetrievalState, area: Rect) {
    let block = Block::default()
        .title(" Hotspot Detail ")
        .borders(Borders::ALL)
        .padding(Padding::new(2, 2, 1, 1));

    let Some(h) = state.ranked().get(app.selected_index) else {
        f.render_widget(block, area);
        return;
    };

    let level = RiskLevel::of(h);
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let details = vec![
        Line::from(vec![
            Span::styled("Risk:        ", bold),
            Span::styled(level.label(), Style::default().fg(risk_color(level)).add_modifier(Modifier::BOLD)),
            Span::raw(format!("  ({}% confidence)", h.confidence)),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("Position:    ", bold),
            Span::raw(h.coordinate().to_string()),
        ]),
        Line::from(vec![
            Span::styled("Distance:    ", bold),
            Span::raw(format!("{:.1} km from center", state.center.distance_km(&h.coordinate()))),
        ]),
        Line::from(vec![
            Span::styled("FRP:         ", bold),
            Span::raw(format!("{:.1} MW", h.frp)),
        ]),
        Line::from(vec![
            Span::styled("Detected:    ", bold),
            Span::raw(format!(
                "{} ({} min ago)",
                h.detection_time.format("%Y-%m-%d %H:%M UTC"),
                h.minutes_since_detection(Utc::now())
            )),
        ]),
    ];

    f.render_widget(Paragraph::new(details).block(block), area);
}

fn render_map_view(f: &mut Frame, app: &App, state: &RetrievalState, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(22)])
        .split(area);

    let center = state.center;
    let (lat_span, lon_span) = (0.6, 0.9);
    let selected_id = state.ranked().get(app.selected_index).map(|h| h.id);

    let canvas = Canvas::default()
        .block(
            Block::default()
                .title(format!(" Hotspot Map ({}) ", center))
                .borders(Borders::ALL),
        )
        .marker(symbols::Marker::Braille)
        .x_bounds([center.lng - lon_span, center.lng + lon_span])
        .y_bounds([center.lat - lat_span, center.lat + lat_span])
        .paint(|ctx| {
            ctx.draw(&Map {
                color: Color::Rgb(50, 50, 50),
                resolution: MapResolution::High,
            });
            ctx.layer();

            for h in &state.hotspots {
                draw_marker(ctx, h, selected_id == Some(h.id));
            }

            if let Some(me) = state.user_location {
                ctx.print(
                    me.lng,
                    me.lat,
                    Line::from(Span::styled(" ◉ you", Style::default().fg(Color::Cyan))),
                );
            }

            ctx.print(
                center.lng,
                center.lat,
                Line::from(Span::styled("⌖", Style::default().fg(Color::Magenta))),
            );
        });

    f.render_widget(canvas, chunks[0]);
    draw_legend(f, state, chunks[1]);
}

fn draw_marker(ctx: &mut Context<'_>, h: &Hotspot, selected: bool) {
    let color = risk_color(RiskLevel::of(h));
    if selected {
        ctx.print(
            h.lng,
            h.lat,
            Line::from(vec![
                Span::styled("▲", Style::default().fg(color).add_modifier(Modifier::BOLD)),
                Span::styled(
                    format!(" {}% ", h.confidence),
                    Style::default().fg(Color::Black).bg(color),
                ),
            ]),
        );
    } else {
        ctx.print(h.lng, h.lat, Line::from(Span::styled("▲", Style::default().fg(color))));
    }
}

fn draw_legend(f: &mut Frame, state: &RetrievalState, area: Rect) {
    let counts = state.risk_counts();
    let row = |level: RiskLevel, range: &str, n: usize| {
        Line::from(vec![
            Span::styled(" ▲ ", Style::default().fg(risk_color(level))),
            Span::raw(format!("{:<7}{:<7}{:>3}", level.label(), range, n)),
        ])
    };

    let lines = vec![
        row(RiskLevel::High, "≥80", counts.high),
        row(RiskLevel::Medium, "50-79", counts.medium),
        row(RiskLevel::Low, "<50", counts.low),
        Line::from(""),
        Line::from(Span::styled(" ◉ you   ⌖ center", Style::default().fg(Color::DarkGray))),
    ];

    f.render_widget(
        Paragraph::new(lines).block(Block::default().title(" Legend ").borders(Borders::ALL)),
        area,
    );
}

fn render_status_bar(f: &mut Frame, app: &App, state: &RetrievalState, area: Rect) {
    if app.input_mode == InputMode::Searching {
        let prompt = Paragraph::new(Line::from(vec![
            Span::styled(" Search: ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(app.search_input.as_str()),
            Span::styled("█", Style::default().fg(Color::Cyan)),
        ]))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(" Enter to search, Esc to cancel "),
        );
        f.render_widget(prompt, area);
        return;
    }

    let status = if state.loading {
        Span::styled(
            format!(" {} Loading...", SPINNER[app.tick_count % SPINNER.len()]),
            Style::default().fg(Color::Cyan),
        )
    } else if let Some(kind) = state.error.filter(|k| k.is_user_visible()) {
        Span::styled(format!(" ⚠ {}", kind.message()), Style::default().fg(Color::Yellow))
    } else {
        let updated = state
            .last_updated
            .map(|t| format!(" Updated {}", t.with_timezone(&chrono::Local).format("%H:%M:%S")))
            .unwrap_or_else(|| " Waiting for data".to_string());
        Span::styled(updated, Style::default().fg(Color::Green))
    };

    let help = Span::styled(
        "  │  / search  r refresh  l locate  j/k select  1/2/Tab views  q quit",
        Style::default().fg(Color::DarkGray),
    );

    f.render_widget(
        Paragraph::new(Line::from(vec![status, help])).block(Block::default().borders(Borders::ALL)),
        area,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Coordinate, HotspotBundle};
    use ratatui::{backend::TestBackend, Terminal};

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        buffer.content.iter().map(|c| c.symbol()).collect()
    }

    fn draw(app: &App, state: &RetrievalState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|f| render(f, app, state)).unwrap();
        buffer_text(&terminal)
    }

    #[test]
    fn test_empty_result_shows_no_hotspots() {
        let state = RetrievalState::new(Coordinate::new(34.0522, -118.2437));
        let text = draw(&App::default(), &state);
        assert!(text.contains("No hotspots found"));
    }

    #[test]
    fn test_degraded_state_shows_advisory() {
        let center = Coordinate::new(34.0522, -118.2437);
        let mut state = RetrievalState::new(center);
        let bundle = HotspotBundle::mock(center, Utc::now());
        state.top_ranked = bundle.hotspots.clone();
        state.hotspots = bundle.hotspots;
        state.weather = bundle.weather;
        state.error = Some(crate::error::ErrorKind::BackendUnavailable);

        let text = draw(&App::default(), &state);
        assert!(text.contains("Backend unavailable"));
        assert!(text.contains("2 High"));
        assert!(text.contains("2 Medium"));
        assert!(text.contains("1 Low"));

        let map = draw(&App::new(ViewMode::Map), &state);
        assert!(map.contains("Legend"));
    }

    #[test]
    fn test_risk_colors_are_distinct() {
        let colors = [
            risk_color(RiskLevel::High),
            risk_color(RiskLevel::Medium),
            risk_color(RiskLevel::Low),
        ];
        assert_ne!(colors[0], colors[1]);
        assert_ne!(colors[1], colors[2]);
        assert_ne!(colors[0], colors[2]);
    }
}
