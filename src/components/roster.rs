use courtside_api::{PlayerId, Side};
use tui::buffer::Buffer;
use tui::layout::Rect;
use tui::style::{Color, Modifier, Style};
use tui::widgets::Widget;

use crate::live::{GamePhase, LiveSession, PlayerState};
use crate::live::rules::FOUL_LIMIT;

/// One team's player list: court/bench markers, points and fouls.
///
/// During roster selection the markers show the drafted starters instead of the
/// on-court flags.
pub struct RosterView<'a> {
    pub session: &'a LiveSession,
    pub side: Side,
    /// Row under the cursor, when this pane has focus.
    pub cursor: Option<usize>,
    /// Player marked to leave the court.
    pub sub_out: Option<PlayerId>,
}

impl<'a> RosterView<'a> {
    fn marker(&self, player: &PlayerState) -> &'static str {
        if self.sub_out == Some(player.id) {
            return "»";
        }
        let active = if self.session.phase() == GamePhase::SelectingRosters {
            self.session.lineup(self.side).contains(&player.id)
        } else {
            player.on_court
        };
        match (active, player.fouled_out()) {
            (_, true) => "x",
            (true, false) => "●",
            (false, false) => " ",
        }
    }
}

impl<'a> Widget for RosterView<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width < 16 || area.height == 0 {
            return;
        }
        let team = self.session.ledger().team(self.side);
        let header = format!(" {:>3}  {:<w$} {:>3} {:>2}", "#", "Player", "PTS", "F", w = name_width(area));
        buf.set_string(area.x, area.y, &header, Style::default().fg(Color::DarkGray));

        let rows = area.height.saturating_sub(1) as usize;
        // Keep the cursor row visible on short panes.
        let skip = match self.cursor {
            Some(c) if c >= rows => c + 1 - rows,
            _ => 0,
        };

        for (row, (idx, player)) in team.players.iter().enumerate().skip(skip).take(rows).enumerate() {
            let y = area.y + 1 + row as u16;
            let selected = self.cursor == Some(idx);
            let mut style = if player.fouled_out() {
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::CROSSED_OUT)
            } else if player.fouls + 1 >= FOUL_LIMIT {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default().fg(Color::White)
            };
            if selected {
                style = style.add_modifier(Modifier::REVERSED);
            }
            let line = format!(
                "{}{:>3}  {:<w$} {:>3} {:>2}",
                self.marker(player),
                player.number,
                truncate(&player.name, name_width(area)),
                player.points,
                player.fouls,
                w = name_width(area),
            );
            buf.set_string(area.x, y, &line, style);
        }
    }
}

fn name_width(area: Rect) -> usize {
    (area.width as usize).saturating_sub(14).max(4)
}

fn truncate(name: &str, max: usize) -> String {
    name.chars().take(max).collect()
}
