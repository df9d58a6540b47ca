use crate::app::{App, AppState, MainTab};
use crate::config::crypto_label;
use crate::forecast::{Horizon, SignalKind};
use crate::market::{AssetKind, AssetSnapshot, format_billions, format_grouped};
use crate::model::{MODEL_ACCURACY_PCT, MODEL_R_SQUARED};
use crate::news::Sentiment;
use crate::technical::{Level, Trend, ZoneKind, fibonacci_levels, order_blocks, strength_level};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, BarChart, Block, Borders, Cell, Chart, Dataset, GraphType, Paragraph, Row, Table, Tabs, Wrap},
};

pub fn render(f: &mut Frame, app: &App) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(2)])
        .split(f.area());

    render_header(f, app, layout[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(36), Constraint::Min(0)])
        .split(layout[1]);

    render_sidebar(f, app, body[0]);
    render_main(f, app, body[1]);
    render_footer(f, app, layout[2]);
}

fn bold(color: Color) -> Style {
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

fn change_color(up: bool) -> Color {
    if up { Color::Green } else { Color::Red }
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let panel = app.active_panel();
    let mut spans = vec![
        Span::styled(" MarketDesk ", bold(Color::Cyan)),
        Span::raw(" | "),
        Span::styled(
            match app.kind {
                AssetKind::Stock => "Stocks",
                AssetKind::Crypto => "Crypto",
            },
            Style::default().fg(Color::Yellow),
        ),
    ];

    if let Some(snap) = panel.snapshot() {
        let symbol = snap.currency.symbol();
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(
            format!("{} {}{:.2}", snap.symbol, symbol, snap.price),
            bold(Color::White),
        ));
        spans.push(Span::raw(" "));
        spans.push(Span::styled(
            format!("({:+.2}, {:+.2}%)", snap.change, snap.change_percent),
            Style::default().fg(change_color(snap.is_up())),
        ));
        spans.push(Span::styled(format!("  via {}", snap.source), Style::default().fg(Color::DarkGray)));
    }

    if app.pending.is_some() {
        spans.push(Span::styled("  loading...", Style::default().fg(Color::Yellow)));
    } else if panel.is_refreshing() {
        spans.push(Span::styled("  ● live", Style::default().fg(Color::Green)));
    }

    spans.push(Span::raw(" | "));
    spans.push(Span::styled(app.currency.code(), Style::default().fg(Color::Magenta)));

    let header = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    f.render_widget(header, area);
}

fn render_footer(f: &mut Frame, app: &App, area: Rect) {
    let hint = match app.state {
        AppState::Searching => "Type query | Enter: search/select | ↑↓: results | Esc: back",
        AppState::Browsing => match app.tab {
            MainTab::Strategies => "↑↓: strategy | space: toggle | Tab: tabs | s: stocks/crypto | q: quit",
            MainTab::Predictions => "h: daily/hourly | g: regenerate | m: model | e: on/off | q: quit",
            _ => "s: stocks/crypto | /: search | ←→ Enter: pick | [ ]: category | c: currency | q: quit",
        },
    };

    let mut spans = vec![
        Span::styled(" Controls: ", Style::default().fg(Color::Gray)),
        Span::styled(hint, Style::default().fg(Color::White)),
    ];
    if let Some(status) = &app.status {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(status.as_str(), Style::default().fg(Color::Yellow)));
    }

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

// ──────────────────────────────────────────────────────────────────────────────
// Sidebar
// ──────────────────────────────────────────────────────────────────────────────

fn render_sidebar(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(6),
            Constraint::Length(6),
            Constraint::Length(5),
        ])
        .split(area);

    let selector = Tabs::new(vec!["Stocks", "Crypto"])
        .select(match app.kind {
            AssetKind::Stock => 0,
            AssetKind::Crypto => 1,
        })
        .block(Block::default().borders(Borders::ALL).title(" Market "))
        .highlight_style(bold(Color::Cyan));
    f.render_widget(selector, chunks[0]);

    let searching = matches!(app.state, AppState::Searching);
    let input_style = if searching {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let placeholder = if searching || !app.input.is_empty() {
        app.input.as_str()
    } else {
        "press / to search"
    };
    let input = Paragraph::new(placeholder)
        .style(input_style)
        .block(Block::default().borders(Borders::ALL).title(" Search "));
    f.render_widget(input, chunks[1]);

    render_picks(f, app, chunks[2]);
    render_model(f, app, chunks[3]);
    render_stop_loss(f, app, chunks[4]);
}

fn render_picks(f: &mut Frame, app: &App, area: Rect) {
    let panel = app.active_panel();
    let results = panel.search_results();
    let mut lines: Vec<Line> = Vec::new();

    let title = if matches!(app.state, AppState::Searching) && !results.is_empty() {
        for (i, r) in results.iter().enumerate() {
            let style = if i == app.result_cursor {
                bold(Color::Black).bg(Color::Cyan)
            } else {
                Style::default().fg(Color::White)
            };
            lines.push(Line::from(Span::styled(format!(" {:<6} {}", r.symbol, r.name), style)));
        }
        " Results ".to_string()
    } else {
        let selected = panel.selected();
        for (i, id) in app.picks().iter().enumerate() {
            let label = match app.kind {
                AssetKind::Stock => id.to_string(),
                AssetKind::Crypto => crypto_label(id),
            };
            let marker = if Some(*id) == selected { "●" } else { " " };
            let style = if i == app.pick_cursor {
                bold(Color::Black).bg(Color::Cyan)
            } else {
                Style::default().fg(Color::White)
            };
            lines.push(Line::from(Span::styled(format!("{} {}", marker, label), style)));
        }

        if app.kind == AssetKind::Crypto && !app.crypto.trending().is_empty() {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled("Trending", bold(Color::Yellow))));
            for t in app.crypto.trending() {
                let rank = t.market_cap_rank.map(|r| format!("#{}", r)).unwrap_or_default();
                lines.push(Line::from(vec![
                    Span::styled(format!(" {:<5}", rank), Style::default().fg(Color::DarkGray)),
                    Span::styled(format!("{:<6}", t.symbol), Style::default().fg(Color::White)),
                    Span::styled(t.name.clone(), Style::default().fg(Color::Gray)),
                ]));
            }
        }

        match app.kind {
            AssetKind::Stock => " Watchlist ".to_string(),
            AssetKind::Crypto => format!(" {} [ ] ", app.category_name()),
        }
    };

    let list = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(list, area);
}

fn render_model(f: &mut Frame, app: &App, area: Rect) {
    let (status, color) = if app.model.enabled {
        ("ON", Color::Green)
    } else {
        ("OFF", Color::Red)
    };
    let lines = vec![
        Line::from(vec![
            Span::styled(app.model.summary(), bold(Color::Cyan)),
            Span::raw(" "),
            Span::styled(status, bold(color)),
        ]),
        Line::from(Span::styled(app.model.kind.description(), Style::default().fg(Color::Gray))),
        Line::from(format!("Accuracy {:.1}%  R² {:.3}", MODEL_ACCURACY_PCT, MODEL_R_SQUARED)),
    ];
    let block = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(" Model (m/e) "));
    f.render_widget(block, area);
}

fn render_stop_loss(f: &mut Frame, app: &App, area: Rect) {
    let sl = &app.stop_loss;
    let mut lines = vec![Line::from(vec![
        Span::styled(
            if sl.enabled { "Enabled " } else { "Disabled " },
            Style::default().fg(if sl.enabled { Color::Green } else { Color::DarkGray }),
        ),
        Span::styled(format!("{}%", sl.percent()), bold(Color::Yellow)),
        Span::raw(if sl.trailing { " trailing" } else { " fixed" }),
    ])];

    if let Some(snap) = app.active_panel().snapshot() {
        if let Some(stop) = sl.stop_price(snap.price, None) {
            lines.push(Line::from(Span::styled(
                format!("Stop @ {}{:.2}", snap.currency.symbol(), stop),
                Style::default().fg(Color::Red),
            )));
        }
    }

    let block = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Stop Loss (+/-) "));
    f.render_widget(block, area);
}

// ──────────────────────────────────────────────────────────────────────────────
// Main area
// ──────────────────────────────────────────────────────────────────────────────

fn render_main(f: &mut Frame, app: &App, area: Rect) {
    let error = app.active_panel().error();
    let mut constraints = vec![Constraint::Length(3), Constraint::Min(0)];
    if error.is_some() {
        constraints.push(Constraint::Length(3));
    }
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    let titles: Vec<String> = MainTab::ALL
        .iter()
        .enumerate()
        .map(|(i, t)| format!("{} {}", i + 1, t.title()))
        .collect();
    let tabs = Tabs::new(titles)
        .select(app.tab.index())
        .block(Block::default().borders(Borders::ALL))
        .highlight_style(bold(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    match app.tab {
        MainTab::Analysis => render_analysis(f, app, chunks[1]),
        MainTab::Predictions => render_predictions(f, app, chunks[1]),
        MainTab::News => render_news(f, app, chunks[1]),
        MainTab::Portfolio => render_portfolio(f, app, chunks[1]),
        MainTab::Strategies => render_strategies(f, app, chunks[1]),
    }

    if let Some(err) = error {
        let error = Paragraph::new(err)
            .style(Style::default().fg(Color::Red))
            .block(Block::default().borders(Borders::ALL).title(" Error "));
        f.render_widget(error, chunks[2]);
    }
}

fn snapshot_lines(snap: &AssetSnapshot) -> Vec<Line<'static>> {
    let sym = snap.currency.symbol();
    let mut lines = vec![
        Line::from(Span::styled(format!("{} ({})", snap.name, snap.symbol), bold(Color::Cyan))),
        Line::from(vec![
            Span::raw("Price:   "),
            Span::styled(format!("{}{:.2}", sym, snap.price), bold(Color::White)),
        ]),
        Line::from(vec![
            Span::raw("Change:  "),
            Span::styled(
                format!("{:+.2} ({:+.2}%)", snap.change, snap.change_percent),
                Style::default().fg(change_color(snap.is_up())),
            ),
        ]),
    ];
    if let Some(volume) = snap.volume {
        lines.push(Line::from(format!("Volume:  {}", format_grouped(volume))));
    }
    if let Some(cap) = snap.market_cap {
        lines.push(Line::from(format!("Mkt cap: {}{}", sym, format_billions(cap))));
    }
    lines.push(Line::from(Span::styled(
        format!(
            "{} · updated {}",
            snap.source,
            snap.updated_at.with_timezone(&chrono::Local).format("%H:%M:%S")
        ),
        Style::default().fg(Color::DarkGray),
    )));
    lines
}

fn render_analysis(f: &mut Frame, app: &App, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(8), Constraint::Min(0)])
        .split(columns[0]);

    let snapshot = app.active_panel().snapshot();
    let card = match snapshot {
        Some(snap) => Paragraph::new(snapshot_lines(snap)),
        None => Paragraph::new("No asset selected").alignment(Alignment::Center),
    };
    f.render_widget(card.block(Block::default().borders(Borders::ALL).title(" Quote ")), left[0]);

    let a = &app.analysis;
    let mut summary = vec![
        Line::from(vec![
            Span::raw("Current: "),
            Span::styled(format!("${:.2}", a.current_price), bold(Color::White)),
            Span::raw("  Predicted: "),
            Span::styled(format!("${:.2}", a.predicted_price), bold(Color::Cyan)),
        ]),
        Line::from(vec![
            Span::raw("Change:  "),
            Span::styled(
                format!("{:+.2} ({:+.2}%)", a.price_diff(), a.change_percent()),
                Style::default().fg(change_color(!a.price_diff().is_sign_negative())),
            ),
        ]),
        Line::from(vec![
            Span::raw("Trend:   "),
            Span::styled(a.trend.label(), bold(change_color(a.trend == Trend::Bullish))),
            Span::raw(format!("  Confidence {:.1}%", a.confidence)),
        ]),
        Line::from(format!(
            "Volatility: hist {:.1}%  implied {:.1}%",
            a.historical_vol, a.implied_vol
        )),
        Line::from(format!("Risk: {:.1}/10 ({})", a.risk_score, a.risk_bucket())),
        Line::from(""),
        Line::from(Span::styled("Timeline", bold(Color::Yellow))),
    ];
    for point in &a.timeline {
        summary.push(Line::from(format!(
            "{:<9} ${:>8.2}  {:>3}%",
            point.period, point.price, point.confidence
        )));
    }
    let summary = Paragraph::new(summary).block(Block::default().borders(Borders::ALL).title(" AI Analysis "));
    f.render_widget(summary, left[1]);

    let price = snapshot.map(|s| s.price);
    let mut levels = vec![Line::from(Span::styled("Order Blocks", bold(Color::Yellow)))];
    for block in order_blocks(price) {
        let zone_color = match block.kind {
            ZoneKind::Supply => Color::Red,
            ZoneKind::Demand => Color::Green,
        };
        let strength_color = match strength_level(block.strength) {
            Level::High => Color::Green,
            Level::Medium => Color::Yellow,
            Level::Low => Color::Red,
        };
        levels.push(Line::from(vec![
            Span::styled(format!("{:<12}", block.kind.label()), Style::default().fg(zone_color)),
            Span::raw(format!("{:>10.2} ", block.price)),
            Span::styled(format!("{:>3}% ", block.strength), Style::default().fg(strength_color)),
            Span::raw(format!("vol {:<6}", block.volume.label())),
            Span::styled(
                if block.active { "active" } else { "inactive" },
                Style::default().fg(if block.active { Color::White } else { Color::DarkGray }),
            ),
        ]));
    }
    levels.push(Line::from(""));
    levels.push(Line::from(Span::styled("Fibonacci", bold(Color::Yellow))));
    for fib in fibonacci_levels(price) {
        levels.push(Line::from(format!("{:<6} {:>10.2}  {}", fib.label, fib.price, fib.kind)));
    }
    let levels = Paragraph::new(levels).block(Block::default().borders(Borders::ALL).title(" Technical Levels "));
    f.render_widget(levels, columns[1]);
}

fn render_predictions(f: &mut Frame, app: &App, area: Rect) {
    let Some(forecast) = &app.forecast else {
        let msg = Paragraph::new("Model disabled. Press e to enable forecasting.")
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(msg, area);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(8), Constraint::Length(10)])
        .split(area);

    let path: Vec<(f64, f64)> = forecast
        .points
        .iter()
        .enumerate()
        .map(|(i, p)| (i as f64, p.price))
        .collect();
    let marks = |kind: SignalKind| -> Vec<(f64, f64)> {
        forecast
            .signals
            .iter()
            .filter(|s| s.kind == kind)
            .map(|s| (s.index as f64, s.price))
            .collect()
    };
    let buys = marks(SignalKind::Buy);
    let sells = marks(SignalKind::Sell);
    let x_max = (path.len().max(2) - 1) as f64;
    let base_line = vec![(0.0, forecast.base_price), (x_max, forecast.base_price)];

    let datasets = vec![
        Dataset::default()
            .name("Base")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::DarkGray))
            .data(&base_line),
        Dataset::default()
            .name("Forecast")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Yellow))
            .data(&path),
        Dataset::default()
            .name("BUY")
            .marker(symbols::Marker::Dot)
            .graph_type(GraphType::Scatter)
            .style(bold(Color::Green))
            .data(&buys),
        Dataset::default()
            .name("SELL")
            .marker(symbols::Marker::Dot)
            .graph_type(GraphType::Scatter)
            .style(bold(Color::Red))
            .data(&sells),
    ];

    let min_price = path.iter().map(|p| p.1).fold(forecast.base_price, f64::min);
    let max_price = path.iter().map(|p| p.1).fold(forecast.base_price, f64::max);
    let (unit, title) = match forecast.horizon {
        Horizon::Daily => ("Days", format!("{}-Day Forecast", forecast.horizon.points())),
        Horizon::Hourly => ("Hours", format!("{}-Hour Forecast", forecast.horizon.points())),
    };

    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .title(Span::styled(format!(" {} · {} ", title, app.model.summary()), bold(Color::Cyan)))
                .borders(Borders::ALL),
        )
        .x_axis(
            Axis::default()
                .title(unit)
                .style(Style::default().fg(Color::Gray))
                .bounds([0.0, x_max]),
        )
        .y_axis(
            Axis::default()
                .title("Price")
                .style(Style::default().fg(Color::Gray))
                .bounds([min_price * 0.98, max_price * 1.02])
                .labels(vec![
                    Span::styled(format!("{:.1}", min_price), Style::default().fg(Color::Gray)),
                    Span::styled(format!("{:.1}", max_price), Style::default().fg(Color::Gray)),
                ]),
        );
    f.render_widget(chart, chunks[0]);

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(chunks[1]);

    let rows: Vec<Row> = forecast
        .prediction_rows()
        .into_iter()
        .enumerate()
        .filter(|(i, row)| match forecast.horizon {
            Horizon::Daily => !row.label.starts_with("Day "),
            Horizon::Hourly => i % 6 == 5 || *i == 0,
        })
        .map(|(_, row)| {
            let color = change_color(row.change_pct >= 0.0);
            Row::new(vec![
                Cell::from(row.label),
                Cell::from(format!("{:.2}", row.price)),
                Cell::from(format!("{:+.2}%", row.change_pct)).style(Style::default().fg(color)),
                Cell::from(format!("{:.0}%", row.confidence * 100.0)),
            ])
        })
        .collect();
    let table = Table::new(
        rows,
        [Constraint::Length(10), Constraint::Length(10), Constraint::Length(9), Constraint::Length(6)],
    )
    .header(Row::new(vec!["When", "Price", "Change", "Conf"]).style(bold(Color::Yellow)))
    .block(Block::default().borders(Borders::ALL).title(" Predictions "));
    f.render_widget(table, bottom[0]);

    let mut signal_lines: Vec<Line> = Vec::new();
    if forecast.signals.is_empty() {
        signal_lines.push(Line::from(Span::styled("No signals on this path", Style::default().fg(Color::DarkGray))));
    }
    for s in &forecast.signals {
        let color = match s.kind {
            SignalKind::Buy => Color::Green,
            SignalKind::Sell => Color::Red,
        };
        signal_lines.push(Line::from(vec![
            Span::styled(format!("{:<4} ", s.kind.as_str()), bold(color)),
            Span::raw(format!("{:.2} @ {} ", s.price, s.at.format("%m-%d %H:%M"))),
            Span::styled(format!("{:.0}%", s.confidence * 100.0), Style::default().fg(Color::Gray)),
        ]));
        signal_lines.push(Line::from(Span::styled(format!("  {}", s.reason), Style::default().fg(Color::Gray))));
    }
    let signals = Paragraph::new(signal_lines).block(Block::default().borders(Borders::ALL).title(" Signals "));
    f.render_widget(signals, bottom[1]);
}

fn render_news(f: &mut Frame, app: &App, area: Rect) {
    let feed = &app.news;
    let overall = feed.overall_score();
    let mut lines = vec![
        Line::from(vec![
            Span::raw("Overall sentiment: "),
            Span::styled(
                format!("{} ({:+.2})", feed.overall_label(), overall),
                bold(change_color(overall > 0.0)),
            ),
            Span::styled(
                format!(
                    "   {} positive · {} negative · {} neutral",
                    feed.count(Sentiment::Positive),
                    feed.count(Sentiment::Negative),
                    feed.count(Sentiment::Neutral)
                ),
                Style::default().fg(Color::Gray),
            ),
        ]),
        Line::from(""),
    ];

    for item in &feed.items {
        let color = match item.sentiment {
            Sentiment::Positive => Color::Green,
            Sentiment::Negative => Color::Red,
            Sentiment::Neutral => Color::Gray,
        };
        lines.push(Line::from(Span::styled(item.title.clone(), bold(Color::White))));
        lines.push(Line::from(Span::styled(item.summary.clone(), Style::default().fg(Color::Gray))));
        lines.push(Line::from(vec![
            Span::styled(format!("{:+.2} ", item.score), Style::default().fg(color)),
            Span::styled(
                format!("{} · {} · {:?} impact", item.source, item.published, item.impact),
                Style::default().fg(Color::DarkGray),
            ),
        ]));
        lines.push(Line::from(""));
    }

    let news = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(" News & Sentiment "));
    f.render_widget(news, area);
}

fn render_portfolio(f: &mut Frame, app: &App, area: Rect) {
    let p = &app.portfolio;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(5), Constraint::Length(8)])
        .split(area);

    let summary = vec![
        Line::from(vec![
            Span::raw("Total "),
            Span::styled(format!("${:.2}", p.total_value), bold(Color::White)),
            Span::raw("  Gain "),
            Span::styled(
                format!("${:.2} ({:+.2}%)", p.total_gain, p.total_gain_percent),
                Style::default().fg(change_color(!p.total_gain.is_sign_negative())),
            ),
        ]),
        Line::from(vec![
            Span::raw("Today "),
            Span::styled(
                format!("${:.2} ({:+.2}%)", p.day_change, p.day_change_percent),
                Style::default().fg(change_color(!p.day_change.is_sign_negative())),
            ),
            Span::raw(format!("  Cash ${:.2}  Invested ${:.2}", p.cash_balance, p.invested_value())),
        ]),
    ];
    f.render_widget(
        Paragraph::new(summary).block(Block::default().borders(Borders::ALL).title(" Portfolio ")),
        chunks[0],
    );

    let rows: Vec<Row> = p
        .positions
        .iter()
        .map(|pos| {
            let gain_color = change_color(!pos.gain().is_sign_negative());
            Row::new(vec![
                Cell::from(pos.symbol),
                Cell::from(pos.shares.to_string()),
                Cell::from(format!("{:.2}", pos.avg_price)),
                Cell::from(format!("{:.2}", pos.current_price)),
                Cell::from(format!("{:.2}", pos.market_value())),
                Cell::from(format!("{:+.2}%", pos.gain_percent())).style(Style::default().fg(gain_color)),
                Cell::from(format!("{:.1}%", p.allocation(pos))),
            ])
        })
        .collect();
    let table = Table::new(
        rows,
        [
            Constraint::Length(7),
            Constraint::Length(7),
            Constraint::Length(10),
            Constraint::Length(10),
            Constraint::Length(12),
            Constraint::Length(9),
            Constraint::Length(7),
        ],
    )
    .header(Row::new(vec!["Symbol", "Shares", "Avg", "Price", "Value", "Gain", "Alloc"]).style(bold(Color::Yellow)))
    .block(Block::default().borders(Borders::ALL).title(" Positions "));
    f.render_widget(table, chunks[1]);

    let allocations: Vec<(&str, u64)> = p
        .allocations()
        .into_iter()
        .map(|(symbol, pct)| (symbol, pct.round() as u64))
        .collect();
    let bars = BarChart::default()
        .block(Block::default().borders(Borders::ALL).title(" Allocation % "))
        .data(allocations.as_slice())
        .bar_width(7)
        .bar_gap(2)
        .bar_style(Style::default().fg(Color::Cyan))
        .value_style(bold(Color::Black).bg(Color::Cyan));
    f.render_widget(bars, chunks[2]);
}

fn render_strategies(f: &mut Frame, app: &App, area: Rect) {
    let board = &app.strategies;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let summary = Paragraph::new(Line::from(vec![
        Span::raw(format!("Active {}/{}  ", board.enabled_count(), board.strategies().len())),
        Span::styled(format!("Avg return {:+.1}%  ", board.avg_performance()), Style::default().fg(Color::Green)),
        Span::raw(format!("Win rate {:.1}%  Signals {}", board.avg_win_rate(), board.total_signals())),
    ]))
    .block(Block::default().borders(Borders::ALL).title(" Strategies "));
    f.render_widget(summary, chunks[0]);

    let rows: Vec<Row> = board
        .strategies()
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let mut style = Style::default().fg(if s.enabled { Color::White } else { Color::DarkGray });
            if i == app.strategy_cursor {
                style = style.add_modifier(Modifier::REVERSED);
            }
            Row::new(vec![
                if s.enabled { "[x]".to_string() } else { "[ ]".to_string() },
                s.name.to_string(),
                s.kind.label().to_string(),
                format!("{:+.1}%", s.performance),
                format!("{:.1}%", s.win_rate),
                s.risk.label().to_string(),
                s.signals.to_string(),
                s.last_signal.as_str().to_string(),
            ])
            .style(style)
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(4),
            Constraint::Min(24),
            Constraint::Length(16),
            Constraint::Length(8),
            Constraint::Length(7),
            Constraint::Length(7),
            Constraint::Length(5),
            Constraint::Length(5),
        ],
    )
    .header(
        Row::new(vec!["On", "Name", "Type", "Return", "Win", "Risk", "Sig", "Last"]).style(bold(Color::Yellow)),
    );
    f.render_widget(table.block(Block::default().borders(Borders::ALL)), chunks[1]);
}
