use log::error;
use tui::Frame;
use tui::Terminal;
use tui::backend::Backend;
use tui::layout::{Alignment, Constraint, Layout, Rect};
use tui::style::{Color, Modifier, Style};
use tui::text::{Line, Span};
use tui::widgets::{Block, BorderType, Borders, Cell, Paragraph, Row, Table, Tabs, Wrap};
use tui_logger::TuiLoggerWidget;

use crate::app::{App, MenuItem};
use crate::components::roster::RosterView;
use crate::components::score_bug::{SCORE_BUG_HEIGHT, ScoreBug, team_style};
use crate::live::rules::period_label;
use crate::live::{ActionStatus, GamePhase, LiveSession, format_clock};
use crate::state::app_state::AlertLevel;
use crate::state::network::{ERROR_CHAR, LoadingState};
use crate::ui::layout::LayoutAreas;
use courtside_api::{MatchStatus, MatchSummary, Side};

static TABS: &[&str; 4] = &["Live", "Scoreboard", "Standings", "Help"];

const HELP_TEXT: &str = "\
Tabs        F1 Live   F2 Scoreboard   F3 Standings   F4 / ? Help   Esc leaves help

Before tip-off
  Tab       switch team              j/k   move cursor
  Space     pick / unpick starter    c     confirm the focused team's five
  Enter     begin the match (both fives confirmed)

Live
  Space     start / pause clock      n     next period
  1 2 3     points for the player    ! @ # correct 1/2/3 points
  f         personal foul            t     timeout for the focused team
  b         mark player leaving, then b on the player coming in (Esc cancels)
  + / -     clock +1 / -1 s          ] / [ clock +10 / -10 s
  e         type a new clock (mm:ss) R     reset clock (confirm y / n)

Scoreboard  j/k select   v cycle filter
Global      \" log pane   z full screen   q quit";

pub fn draw<B>(terminal: &mut Terminal<B>, app: &mut App, loading: LoadingState)
where
    B: Backend,
{
    let current_size = terminal.size().unwrap_or_default();
    if current_size.width <= 10 || current_size.height <= 10 {
        return;
    }

    let mut layout = LayoutAreas::new(current_size);

    let drawn = terminal.draw(|f| {
        layout.update(f.area(), app.settings.full_screen, app.state.show_logs);

        if !app.settings.full_screen {
            draw_tabs(f, layout.tab_bar, app);
        }

        match app.state.active_tab {
            MenuItem::Live => draw_live(f, layout.main, app),
            MenuItem::Scoreboard => draw_scoreboard(f, layout.main, app),
            MenuItem::Standings => draw_standings(f, layout.main, app),
            MenuItem::Help => draw_help(f, layout.main),
        }

        if let Some(logs) = layout.logs {
            draw_logs(f, logs);
        }

        draw_loading_spinner(f, f.area(), app, loading);
    });
    if drawn.is_err() {
        error!("terminal draw failed");
    }
}

pub fn default_border<'a>(color: Color) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(color))
}

fn draw_tabs(f: &mut Frame, tab_bar: [Rect; 2], app: &App) {
    let style = Style::default().fg(Color::White);
    let border_type = BorderType::Rounded;

    let tab_index = match app.state.active_tab {
        MenuItem::Live => 0,
        MenuItem::Scoreboard => 1,
        MenuItem::Standings => 2,
        MenuItem::Help => 3,
    };

    let titles: Vec<Line> = TABS
        .iter()
        .enumerate()
        .map(|(i, t)| Line::from(format!("F{} {t}", i + 1)))
        .collect();
    let tabs = Tabs::new(titles)
        .block(
            Block::default()
                .borders(Borders::LEFT | Borders::BOTTOM | Borders::TOP)
                .border_type(border_type),
        )
        .highlight_style(Style::default().add_modifier(Modifier::UNDERLINED))
        .select(tab_index)
        .style(style);
    f.render_widget(tabs, tab_bar[0]);

    let sync = &app.state.sync;
    let (dot, color) = match (sync.connected, sync.gave_up) {
        (true, _) => ("●", Color::Green),
        (false, true) => ("●", Color::Red),
        (false, false) => ("○", Color::Yellow),
    };
    let mut status = vec![Span::styled(format!("{dot} "), Style::default().fg(color))];
    status.push(Span::raw(sync.status.clone()));
    if let Some(clients) = sync.clients
        && sync.connected
    {
        status.push(Span::styled(format!(" ({clients})"), Style::default().fg(Color::DarkGray)));
    }
    status.push(Span::raw(" "));
    let sync_line = Paragraph::new(Line::from(status))
        .alignment(Alignment::Right)
        .block(
            Block::default()
                .borders(Borders::RIGHT | Borders::BOTTOM | Borders::TOP)
                .border_type(border_type),
        )
        .style(style);
    f.render_widget(sync_line, tab_bar[1]);
}

// ---------------------------------------------------------------------------
// Live tab
// ---------------------------------------------------------------------------

fn draw_live(f: &mut Frame, area: Rect, app: &App) {
    let live = &app.state.live;
    let Some(session) = live.session.as_ref() else {
        let msg = if let Some(reason) = live.locked.as_deref() {
            format!("{reason}\n\nSet COURTSIDE_TOKEN to operate the live view.")
        } else if let Some(err) = app.state.last_error.as_deref() {
            format!("Match load failed:\n{err}")
        } else if app.settings.match_id.is_none() {
            "No match selected. Start with --match <id>.".to_string()
        } else {
            "Loading match...".to_string()
        };
        draw_placeholder(f, area, " Live ", &msg);
        return;
    };

    let [bug_area, rosters_area, log_area, prompt_area] = Layout::vertical([
        Constraint::Length(SCORE_BUG_HEIGHT + 2),
        Constraint::Fill(1),
        Constraint::Length(8),
        Constraint::Length(1),
    ])
    .areas(area);

    let bug_block = default_border(Color::DarkGray).title(format!(" Match {} ", session.match_id()));
    let bug_inner = bug_block.inner(bug_area);
    f.render_widget(bug_block, bug_area);
    f.render_widget(ScoreBug { session }, bug_inner);

    let [local_area, visitor_area] =
        Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(rosters_area);
    for (side, pane) in [(Side::Local, local_area), (Side::Visitor, visitor_area)] {
        draw_roster_pane(f, pane, app, session, side);
    }

    let [actions_area, alerts_area] =
        Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(log_area);
    draw_action_log(f, actions_area, session);
    draw_alerts(f, alerts_area, app);

    f.render_widget(prompt_line(app, session), prompt_area);
}

fn draw_roster_pane(f: &mut Frame, area: Rect, app: &App, session: &LiveSession, side: Side) {
    let live = &app.state.live;
    let focused = live.focus == side;
    let team = session.ledger().team(side);
    let mut title = format!(" {} ", team.name);
    if session.phase() == GamePhase::SelectingRosters {
        let picked = session.lineup(side).len();
        let state = if session.lineup_confirmed(side) { "confirmed" } else { "picking" };
        title = format!(" {}  {picked}/5 {state} ", team.name);
    }
    let border = if focused { team_style(side).fg.unwrap_or(Color::White) } else { Color::DarkGray };
    let block = default_border(border).title(title);
    let inner = block.inner(area);
    f.render_widget(block, area);
    f.render_widget(
        RosterView {
            session,
            side,
            cursor: focused.then_some(live.cursor),
            sub_out: if focused { live.sub_out } else { None },
        },
        inner,
    );
}

fn draw_action_log(f: &mut Frame, area: Rect, session: &LiveSession) {
    let block = default_border(Color::DarkGray).title(format!(
        " Actions ({} pending) ",
        session.pending_actions()
    ));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let ledger = session.ledger();
    let lines: Vec<Line> = session
        .actions()
        .iter()
        .rev()
        .take(inner.height as usize)
        .map(|action| {
            let (mark, color) = match session.action_status(action.id) {
                Some(ActionStatus::Confirmed) => ("✓", Color::Green),
                Some(ActionStatus::Rejected) => ("!", Color::Yellow),
                Some(ActionStatus::RolledBack) => ("↺", Color::Red),
                Some(ActionStatus::Pending) | None => ("…", Color::DarkGray),
            };
            Line::from(vec![
                Span::styled(format!("{mark} "), Style::default().fg(color)),
                Span::styled(
                    format!("{} {} ", period_label(action.period), format_clock(action.clock_secs)),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(action.describe(ledger), team_style(action.side)),
            ])
        })
        .collect();
    f.render_widget(Paragraph::new(lines), inner);
}

fn draw_alerts(f: &mut Frame, area: Rect, app: &App) {
    let block = default_border(Color::DarkGray).title(" Alerts ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let lines: Vec<Line> = app
        .state
        .alerts
        .iter()
        .rev()
        .take(inner.height as usize)
        .map(|alert| {
            let color = match alert.level {
                AlertLevel::Info => Color::White,
                AlertLevel::Warning => Color::Yellow,
                AlertLevel::Error => Color::Red,
            };
            Line::from(vec![
                Span::styled(format!("{} ", alert.at), Style::default().fg(Color::DarkGray)),
                Span::styled(alert.text.clone(), Style::default().fg(color)),
            ])
        })
        .collect();
    f.render_widget(Paragraph::new(lines), inner);
}

fn prompt_line<'a>(app: &App, session: &LiveSession) -> Paragraph<'a> {
    let live = &app.state.live;
    let accent = Style::default().fg(Color::Black).bg(Color::Yellow);
    if let Some(input) = live.clock_input.as_deref() {
        return Paragraph::new(format!(" Set clock (mm:ss): {input}_   Enter apply  Esc cancel")).style(accent);
    }
    if let Some(to) = session.reset_request() {
        return Paragraph::new(format!(" Reset clock to {}? y / n", format_clock(to))).style(accent);
    }
    if let Some(err) = app.state.last_error.as_deref() {
        return Paragraph::new(format!(" {err}")).style(Style::default().fg(Color::Red));
    }
    if live.sub_out.is_some() {
        return Paragraph::new(" Substitution: move to the player coming in and press b (Esc cancels)")
            .style(Style::default().fg(Color::Cyan));
    }
    let legend = match session.phase() {
        GamePhase::SelectingRosters => "Tab team  j/k move  Space starter  c confirm five  Enter begin",
        GamePhase::Finished { .. } => "Match finished  F2 scoreboard  F3 standings  q quit",
        GamePhase::Halftime => "Halftime  Space clock  n start Q3",
        GamePhase::Timeout => "Timeout running  clock resumes when it ends",
        GamePhase::Regulation | GamePhase::Overtime => {
            "Space clock  1/2/3 pts  !/@/# undo  f foul  b sub  t timeout  n next  e edit  R reset  ? help"
        }
    };
    Paragraph::new(format!(" {legend}")).style(Style::default().fg(Color::DarkGray))
}

// ---------------------------------------------------------------------------
// Scoreboard and standings
// ---------------------------------------------------------------------------

fn draw_scoreboard(f: &mut Frame, area: Rect, app: &App) {
    let board = &app.state.scoreboard;
    let block = default_border(Color::White).title(format!(
        " Scoreboard  [{}]  {} live ",
        board.filter.label(),
        board.live_count()
    ));
    let inner = block.inner(area);
    f.render_widget(block, area);

    if app.settings.tournament_id.is_none() {
        f.render_widget(
            Paragraph::new("No tournament known yet. Start with --tournament <id> or load a match.")
                .style(Style::default().fg(Color::DarkGray)),
            inner,
        );
        return;
    }

    let visible = board.visible();
    let [header, content] = Layout::vertical([Constraint::Length(2), Constraint::Fill(1)]).areas(inner);
    let updated = board.updated_at.as_deref().unwrap_or("never");
    f.render_widget(
        Paragraph::new(format!("Updated {updated}   j/k move   v filter"))
            .style(Style::default().fg(Color::DarkGray)),
        header,
    );

    if visible.is_empty() {
        f.render_widget(Paragraph::new("No matches for this filter"), content);
        return;
    }

    let lines: Vec<Line> = visible
        .iter()
        .enumerate()
        .map(|(idx, m)| {
            let marker = if idx == board.selected { ">" } else { " " };
            let own = if app.settings.match_id == Some(m.id) { "*" } else { " " };
            let style = if idx == board.selected {
                Style::default().add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Line::styled(
                format!(
                    "{marker}{own} {:>22} {:>3} - {:<3} {:<22} [{}]",
                    m.local.name,
                    m.local.points,
                    m.visitor.points,
                    m.visitor.name,
                    match_status(m)
                ),
                style,
            )
        })
        .collect();
    f.render_widget(Paragraph::new(lines), content);
}

fn match_status(m: &MatchSummary) -> String {
    match m.status {
        MatchStatus::Finished => "FINAL".to_string(),
        MatchStatus::InProgress => {
            let period = m.period.map(period_label).unwrap_or_default();
            let clock = m.remaining_seconds.map(format_clock).unwrap_or_default();
            format!("LIVE {period} {clock}").trim_end().to_string()
        }
        MatchStatus::Scheduled => m
            .scheduled_at
            .map(|t| t.with_timezone(&chrono::Local).format("%m/%d %H:%M").to_string())
            .or_else(|| m.court.clone())
            .unwrap_or_else(|| "SCHEDULED".to_string()),
    }
}

fn draw_standings(f: &mut Frame, area: Rect, app: &App) {
    let standings = &app.state.standings;
    let title = match (standings.stale, standings.updated_at.as_deref()) {
        (true, _) => " Standings (updating...) ".to_string(),
        (false, Some(at)) => format!(" Standings  {at} "),
        (false, None) => " Standings ".to_string(),
    };
    let block = default_border(Color::White).title(title);

    if standings.rows.is_empty() {
        let inner = block.inner(area);
        f.render_widget(block, area);
        f.render_widget(
            Paragraph::new("No standings loaded").style(Style::default().fg(Color::DarkGray)),
            inner,
        );
        return;
    }

    let header = Row::new(["#", "Team", "P", "W", "L", "PF", "PA", "+/-", "Pts"])
        .style(Style::default().fg(Color::DarkGray));
    let rows = standings.rows.iter().map(|r| {
        Row::new(vec![
            Cell::from(r.position.to_string()),
            Cell::from(r.team_name.clone()),
            Cell::from(r.played.to_string()),
            Cell::from(r.won.to_string()),
            Cell::from(r.lost.to_string()),
            Cell::from(r.points_for.to_string()),
            Cell::from(r.points_against.to_string()),
            Cell::from(format!("{:+}", r.point_difference())),
            Cell::from(r.standing_points.to_string()).style(Style::default().add_modifier(Modifier::BOLD)),
        ])
    });
    let widths = [
        Constraint::Length(3),
        Constraint::Fill(1),
        Constraint::Length(4),
        Constraint::Length(4),
        Constraint::Length(4),
        Constraint::Length(5),
        Constraint::Length(5),
        Constraint::Length(5),
        Constraint::Length(4),
    ];
    f.render_widget(Table::new(rows, widths).header(header).block(block), area);
}

// ---------------------------------------------------------------------------
// Help, logs, spinner
// ---------------------------------------------------------------------------

fn draw_help(f: &mut Frame, area: Rect) {
    let block = default_border(Color::White).title(" Help ");
    f.render_widget(Paragraph::new(HELP_TEXT).wrap(Wrap { trim: false }).block(block), area);
}

fn draw_logs(f: &mut Frame, area: Rect) {
    let logs = TuiLoggerWidget::default()
        .block(default_border(Color::DarkGray).title(" Log "))
        .style_error(Style::default().fg(Color::Red))
        .style_warn(Style::default().fg(Color::Yellow))
        .style_info(Style::default().fg(Color::White))
        .style_debug(Style::default().fg(Color::DarkGray))
        .output_separator(' ')
        .output_timestamp(Some("%H:%M:%S".to_string()))
        .output_target(false)
        .output_file(false)
        .output_line(false);
    f.render_widget(logs, area);
}

fn draw_placeholder(f: &mut Frame, area: Rect, title: &str, msg: &str) {
    let block = default_border(Color::White).title(title.to_string());
    let inner = block.inner(area);
    f.render_widget(block, area);
    f.render_widget(
        Paragraph::new(msg.to_string())
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center),
        inner,
    );
}

fn draw_loading_spinner(f: &mut Frame, area: Rect, app: &App, loading: LoadingState) {
    if !loading.is_loading && loading.spinner_char != ERROR_CHAR {
        return;
    }
    let style = match loading.spinner_char {
        ERROR_CHAR => Style::default().fg(Color::Red),
        _ => Style::default().fg(Color::White),
    };
    let spinner = Paragraph::new(loading.spinner_char.to_string())
        .alignment(Alignment::Right)
        .style(style);
    let area = if app.settings.full_screen {
        Rect::new(area.width.saturating_sub(3), area.height.saturating_sub(2), 1, 1)
    } else {
        Rect::new(area.width.saturating_sub(3), 1, 1, 1)
    };
    f.render_widget(spinner, area);
}
