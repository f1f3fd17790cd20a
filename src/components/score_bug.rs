use courtside_api::Side;
use tui::buffer::Buffer;
use tui::layout::Rect;
use tui::style::{Color, Modifier, Style};
use tui::widgets::Widget;

use crate::live::{GamePhase, LiveSession, TeamState};
use crate::live::rules::TIMEOUTS_PER_GAME;

/// Rows the score bug needs: names/score/clock, period/phase, timeouts/fouls.
pub const SCORE_BUG_HEIGHT: u16 = 3;

/// Broadcast-style score line for the refereed match.
pub struct ScoreBug<'a> {
    pub session: &'a LiveSession,
}

impl<'a> Widget for ScoreBug<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width < 30 || area.height < 1 {
            return;
        }
        let ledger = self.session.ledger();
        let local = ledger.team(Side::Local);
        let visitor = ledger.team(Side::Visitor);

        let clock = self.session.clock();
        let clock_style = if clock.is_running() {
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        };
        let score_style = Style::default().fg(Color::White).add_modifier(Modifier::BOLD);
        let dim = Style::default().fg(Color::DarkGray);

        let mid = area.x + area.width / 2;
        let clock_text = clock.display();
        let clock_x = mid.saturating_sub(clock_text.len() as u16 / 2);
        buf.set_string(clock_x, area.y, &clock_text, clock_style);

        let local_score = format!("{:>3}", local.points);
        let visitor_score = format!("{:<3}", visitor.points);
        let local_score_x = clock_x.saturating_sub(local_score.len() as u16 + 3);
        let visitor_score_x = clock_x + clock_text.len() as u16 + 3;
        buf.set_string(local_score_x, area.y, &local_score, score_style);
        buf.set_string(visitor_score_x, area.y, &visitor_score, score_style);

        let name_room = local_score_x.saturating_sub(area.x + 2) as usize;
        let local_name = fit(&local.name, name_room);
        let local_name_x = local_score_x.saturating_sub(local_name.chars().count() as u16 + 2);
        buf.set_string(local_name_x, area.y, &local_name, team_style(Side::Local));
        let visitor_name = fit(&visitor.name, name_room);
        buf.set_string(visitor_score_x + 5, area.y, &visitor_name, team_style(Side::Visitor));

        if area.height < 2 {
            return;
        }
        let periods = self.session.periods();
        let status = match (periods.phase(), self.session.active_timeout()) {
            (GamePhase::Timeout, Some(t)) => format!("{}  TIMEOUT {}", periods.label(), t.side.label().to_uppercase()),
            (GamePhase::Finished { winner: Some(side) }, _) => {
                format!("FINAL  {} wins", ledger.team(side).name)
            }
            (GamePhase::Finished { winner: None }, _) => "FINAL".to_string(),
            (GamePhase::SelectingRosters, _) => "PRE  pick starting fives".to_string(),
            (_, _) if periods.awaiting_advance() => format!("{}  END", periods.label()),
            (_, _) => periods.label(),
        };
        let status_x = mid.saturating_sub(status.chars().count() as u16 / 2);
        buf.set_string(status_x, area.y + 1, &status, Style::default().fg(Color::Cyan));

        if area.height < 3 {
            return;
        }
        let local_extra = team_extras(local);
        let visitor_extra = team_extras(visitor);
        buf.set_string(
            local_score_x.saturating_sub(local_extra.chars().count() as u16).max(area.x),
            area.y + 2,
            &local_extra,
            dim,
        );
        buf.set_string(visitor_score_x, area.y + 2, &visitor_extra, dim);
    }
}

pub fn team_style(side: Side) -> Style {
    match side {
        Side::Local => Style::default().fg(Color::LightBlue),
        Side::Visitor => Style::default().fg(Color::LightRed),
    }
}

fn team_extras(team: &TeamState) -> String {
    let used = TIMEOUTS_PER_GAME.saturating_sub(team.timeouts);
    let dots: String = std::iter::repeat_n('●', team.timeouts as usize)
        .chain(std::iter::repeat_n('○', used as usize))
        .collect();
    format!("TO {dots}  F {}", team.fouls)
}

fn fit(name: &str, max: usize) -> String {
    if name.chars().count() <= max {
        name.to_string()
    } else if max <= 1 {
        String::new()
    } else {
        let mut short: String = name.chars().take(max - 1).collect();
        short.push('…');
        short
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::ledger::tests::roster;
    use crate::live::{GameRules, RollbackPolicy};
    use courtside_api::{MatchSnapshot, MatchStatus};

    fn buffer_text(buf: &Buffer) -> String {
        let area = buf.area;
        (area.y..area.y + area.height)
            .map(|y| (area.x..area.x + area.width).map(|x| buf[(x, y)].symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn renders_names_clock_and_timeouts() {
        let snapshot = MatchSnapshot {
            id: 1,
            status: MatchStatus::InProgress,
            period: Some(2),
            remaining_seconds: Some(125),
            local: roster(1, "Hawks", 10, 8),
            visitor: roster(2, "Owls", 30, 8),
            ..Default::default()
        };
        let session = LiveSession::from_snapshot(&snapshot, GameRules::default(), RollbackPolicy::default());
        let area = Rect::new(0, 0, 60, SCORE_BUG_HEIGHT);
        let mut buf = Buffer::empty(area);
        ScoreBug { session: &session }.render(area, &mut buf);
        let text = buffer_text(&buf);
        assert!(text.contains("Hawks"));
        assert!(text.contains("Owls"));
        assert!(text.contains("02:05"));
        assert!(text.contains("Q2"));
        assert!(text.contains("TO ●●●"));
    }

    #[test]
    fn long_names_are_shortened() {
        assert_eq!(fit("Basketball Club", 6), "Baske…");
        assert_eq!(fit("Owls", 6), "Owls");
    }
}
