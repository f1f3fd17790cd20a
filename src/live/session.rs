use crate::live::clock::{ClockMode, GameClock, TickOutcome};
use crate::live::error::{LiveError, LiveResult};
use crate::live::ledger::{Action, ActionId, ActionKind, Ledger, TeamState};
use crate::live::period::{GamePhase, PeriodMachine, Transition};
use crate::live::rules::{GameRules, LINEUP_SIZE, is_overtime, period_label};
use chrono::Utc;
use courtside_api::{MatchId, MatchSnapshot, MatchStatus, PlayerId, Side};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// What happens to the local ledger when the backend refuses an action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RollbackPolicy {
    /// Apply the inverse of the refused action.
    #[default]
    Compensate,
    /// Leave the optimistic value in place and only report the failure.
    Keep,
}

impl RollbackPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compensate" | "rollback" => Some(RollbackPolicy::Compensate),
            "keep" => Some(RollbackPolicy::Keep),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionStatus {
    Pending,
    Confirmed,
    /// Refused by the backend, optimistic value kept.
    Rejected,
    /// Refused by the backend and compensated locally.
    RolledBack,
}

/// Backend call a session step asks the controller to make.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Action(Action),
    Lineups { local: Vec<PlayerId>, visitor: Vec<PlayerId> },
    Finalize,
}

/// Operator-facing message produced by a session step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    LineupConfirmed(Side),
    PeriodStarted(u8),
    PeriodOver(u8),
    HalftimeStarted,
    HalftimeOver,
    OvertimeStarted(u8),
    Finished { winner: Side, local: u32, visitor: u32 },
    FouledOut { side: Side, name: String },
    TimeoutCalled { side: Side, left: u8 },
    TimeoutOver { side: Side, restored: u32 },
    ResetRequested(u32),
    ClockReset(u32),
    ActionRejected { summary: String, reason: String },
    ActionRolledBack { summary: String, reason: String },
}

impl Notice {
    /// Notices that deserve a warning rather than an info line.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            Notice::FouledOut { .. } | Notice::ActionRejected { .. } | Notice::ActionRolledBack { .. }
        )
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::LineupConfirmed(side) => write!(f, "{side} starting five confirmed"),
            Notice::PeriodStarted(period) => write!(f, "{} started", period_label(*period)),
            Notice::PeriodOver(period) => {
                write!(f, "End of {}; press n for the next period", period_label(*period))
            }
            Notice::HalftimeStarted => f.write_str("Halftime"),
            Notice::HalftimeOver => f.write_str("Halftime is over; press n to start Q3"),
            Notice::OvertimeStarted(period) => {
                write!(f, "Tied! {} started, timeouts reset", period_label(*period))
            }
            Notice::Finished { winner, local, visitor } => {
                write!(f, "Final: {local}-{visitor}, {winner} wins")
            }
            Notice::FouledOut { side, name } => write!(f, "{name} ({side}) fouled out"),
            Notice::TimeoutCalled { side, left } => {
                write!(f, "Timeout {side} ({left} left)")
            }
            Notice::TimeoutOver { side, restored } => write!(
                f,
                "Timeout {side} over, clock back at {}",
                crate::live::clock::format_clock(*restored)
            ),
            Notice::ResetRequested(to) => write!(
                f,
                "Reset clock to {}? (y/n)",
                crate::live::clock::format_clock(*to)
            ),
            Notice::ClockReset(to) => {
                write!(f, "Clock reset to {}", crate::live::clock::format_clock(*to))
            }
            Notice::ActionRejected { summary, reason } => {
                write!(f, "Backend refused {summary}: {reason} (kept locally)")
            }
            Notice::ActionRolledBack { summary, reason } => {
                write!(f, "Backend refused {summary}: {reason} (undone)")
            }
        }
    }
}

/// Result of one session operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Step {
    pub outbound: Vec<Outbound>,
    pub notices: Vec<Notice>,
}

impl Step {
    fn notice(notice: Notice) -> Self {
        Self { outbound: Vec::new(), notices: vec![notice] }
    }

    fn merge(mut self, other: Step) -> Self {
        self.outbound.extend(other.outbound);
        self.notices.extend(other.notices);
        self
    }
}

#[derive(Debug, Clone, Default)]
struct LineupDraft {
    selected: Vec<PlayerId>,
    confirmed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveTimeout {
    pub token: u64,
    pub side: Side,
    pub saved_remaining: u32,
    pub saved_mode: ClockMode,
    prior_phase: GamePhase,
}

/// One refereed match, from roster selection to the final whistle.
///
/// The session never talks to the network. Each operation validates first and
/// leaves the state untouched on `Err`; on success it returns a [`Step`] listing
/// the backend calls to make and the notices to show.
#[derive(Debug, Clone)]
pub struct LiveSession {
    match_id: MatchId,
    rules: GameRules,
    policy: RollbackPolicy,
    clock: GameClock,
    periods: PeriodMachine,
    ledger: Ledger,
    local_draft: LineupDraft,
    visitor_draft: LineupDraft,
    actions: Vec<Action>,
    statuses: HashMap<ActionId, ActionStatus>,
    next_action_id: ActionId,
    timeout: Option<ActiveTimeout>,
    timeout_seq: u64,
    reset_request: Option<u32>,
}

impl LiveSession {
    pub fn from_snapshot(snapshot: &MatchSnapshot, rules: GameRules, policy: RollbackPolicy) -> Self {
        let ledger = Ledger::new(TeamState::from(&snapshot.local), TeamState::from(&snapshot.visitor));
        let period = snapshot.period.unwrap_or(1).max(1);
        let mut local_draft = LineupDraft::default();
        let mut visitor_draft = LineupDraft::default();

        let (periods, clock) = match snapshot.status {
            MatchStatus::Scheduled => (
                PeriodMachine::new(),
                GameClock::new(rules.quarter_secs, ClockMode::Regulation),
            ),
            MatchStatus::InProgress => {
                let mode = if is_overtime(period) { ClockMode::Overtime } else { ClockMode::Regulation };
                let remaining = snapshot.remaining_seconds.unwrap_or_else(|| rules.period_secs(period));
                for (draft, side) in [(&mut local_draft, Side::Local), (&mut visitor_draft, Side::Visitor)] {
                    draft.selected = ledger.team(side).active_five().map(|p| p.id).collect();
                    draft.confirmed = true;
                }
                (PeriodMachine::resume(period), GameClock::new(remaining, mode))
            }
            MatchStatus::Finished => {
                let winner = match ledger.points(Side::Local).cmp(&ledger.points(Side::Visitor)) {
                    std::cmp::Ordering::Greater => Some(Side::Local),
                    std::cmp::Ordering::Less => Some(Side::Visitor),
                    std::cmp::Ordering::Equal => None,
                };
                let mode = if is_overtime(period) { ClockMode::Overtime } else { ClockMode::Regulation };
                (PeriodMachine::finished(period, winner), GameClock::new(0, mode))
            }
        };

        Self {
            match_id: snapshot.id,
            rules,
            policy,
            clock,
            periods,
            ledger,
            local_draft,
            visitor_draft,
            actions: Vec::new(),
            statuses: HashMap::new(),
            next_action_id: 1,
            timeout: None,
            timeout_seq: 0,
            reset_request: None,
        }
    }

    pub fn match_id(&self) -> MatchId {
        self.match_id
    }

    pub fn clock(&self) -> &GameClock {
        &self.clock
    }

    pub fn periods(&self) -> &PeriodMachine {
        &self.periods
    }

    pub fn phase(&self) -> GamePhase {
        self.periods.phase()
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn action_status(&self, id: ActionId) -> Option<ActionStatus> {
        self.statuses.get(&id).copied()
    }

    pub fn pending_actions(&self) -> usize {
        self.statuses.values().filter(|s| **s == ActionStatus::Pending).count()
    }

    pub fn lineup(&self, side: Side) -> &[PlayerId] {
        &self.draft(side).selected
    }

    pub fn lineup_confirmed(&self, side: Side) -> bool {
        self.draft(side).confirmed
    }

    pub fn reset_request(&self) -> Option<u32> {
        self.reset_request
    }

    pub fn active_timeout(&self) -> Option<&ActiveTimeout> {
        self.timeout.as_ref()
    }

    /// Epoch the clock ticker must carry, while the clock runs.
    pub fn clock_epoch(&self) -> Option<u64> {
        self.clock.tick_epoch()
    }

    /// Token and duration of the timeout one-shot that should be armed.
    pub fn pending_timeout(&self) -> Option<(u64, Duration)> {
        self.timeout
            .map(|t| (t.token, Duration::from_secs(u64::from(self.rules.timeout_secs))))
    }

    /// Full duration of whatever the clock is currently counting.
    pub fn full_clock(&self) -> u32 {
        match self.periods.phase() {
            GamePhase::Halftime => self.rules.halftime_secs,
            GamePhase::Timeout => self.rules.timeout_secs,
            _ => self.rules.period_secs(self.periods.period()),
        }
    }

    // -----------------------------------------------------------------------
    // Roster selection
    // -----------------------------------------------------------------------

    pub fn toggle_starter(&mut self, side: Side, player: PlayerId) -> LiveResult<Step> {
        self.require_selection("pick starters")?;
        let state = self.ledger.player(side, player)?;
        let fouled_out = state.fouled_out().then(|| state.name.clone());
        let draft = self.draft_mut(side);
        if let Some(pos) = draft.selected.iter().position(|id| *id == player) {
            draft.selected.remove(pos);
            draft.confirmed = false;
            return Ok(Step::default());
        }
        if draft.selected.len() >= LINEUP_SIZE {
            return Err(LiveError::LineupFull(side));
        }
        if let Some(name) = fouled_out {
            return Err(LiveError::PlayerFouledOut(name));
        }
        draft.selected.push(player);
        Ok(Step::default())
    }

    pub fn confirm_lineup(&mut self, side: Side) -> LiveResult<Step> {
        self.require_selection("confirm a lineup")?;
        let draft = self.draft_mut(side);
        if draft.selected.len() != LINEUP_SIZE {
            return Err(LiveError::LineupIncomplete { side, selected: draft.selected.len() });
        }
        draft.confirmed = true;
        Ok(Step::notice(Notice::LineupConfirmed(side)))
    }

    /// Puts both confirmed fives on court and opens the first period.
    pub fn begin(&mut self) -> LiveResult<Step> {
        self.require_selection("start the match")?;
        if !self.local_draft.confirmed || !self.visitor_draft.confirmed {
            return Err(LiveError::LineupsNotConfirmed);
        }
        self.periods.begin()?;
        let local = self.local_draft.selected.clone();
        let visitor = self.visitor_draft.selected.clone();
        self.ledger.set_active_five(Side::Local, &local);
        self.ledger.set_active_five(Side::Visitor, &visitor);
        self.ledger.reset_timeouts();
        self.clock.reset(self.rules.quarter_secs);
        self.clock.set_mode(ClockMode::Regulation);
        Ok(Step {
            outbound: vec![Outbound::Lineups { local, visitor }],
            notices: vec![Notice::PeriodStarted(1)],
        })
    }

    // -----------------------------------------------------------------------
    // Clock
    // -----------------------------------------------------------------------

    pub fn start_clock(&mut self) -> LiveResult<Step> {
        self.require_live("start the clock")?;
        self.clock.start();
        Ok(Step::default())
    }

    pub fn pause_clock(&mut self) -> LiveResult<Step> {
        self.clock.pause();
        Ok(Step::default())
    }

    pub fn toggle_clock(&mut self) -> LiveResult<Step> {
        if self.clock.is_running() {
            self.pause_clock()
        } else {
            self.start_clock()
        }
    }

    /// First half of a reset: nothing changes until [`Self::confirm_clock_reset`].
    pub fn request_clock_reset(&mut self, to_secs: u32) -> LiveResult<Step> {
        self.require_live("reset the clock")?;
        self.reset_request = Some(to_secs);
        Ok(Step::notice(Notice::ResetRequested(to_secs)))
    }

    pub fn confirm_clock_reset(&mut self) -> LiveResult<Step> {
        self.require_live("reset the clock")?;
        let to = self.reset_request.take().ok_or(LiveError::NothingToConfirm)?;
        self.clock.reset(to);
        Ok(Step::notice(Notice::ClockReset(to)))
    }

    pub fn cancel_clock_reset(&mut self) -> LiveResult<Step> {
        self.reset_request.take().ok_or(LiveError::NothingToConfirm)?;
        Ok(Step::default())
    }

    pub fn adjust_clock(&mut self, delta_secs: i64) -> LiveResult<Step> {
        self.require_live("adjust the clock")?;
        let before = self.clock.remaining();
        self.clock.adjust(delta_secs);
        Ok(self.after_manual_set(before))
    }

    pub fn edit_clock(&mut self, minutes: i64, seconds: i64) -> LiveResult<Step> {
        self.require_live("edit the clock")?;
        let before = self.clock.remaining();
        self.clock.edit_absolute(minutes, seconds)?;
        Ok(self.after_manual_set(before))
    }

    /// One second from the ticker that was armed for `epoch`.
    pub fn tick(&mut self, epoch: u64) -> Step {
        match self.clock.tick(epoch) {
            TickOutcome::Expired => self.clock_expired(),
            TickOutcome::Running | TickOutcome::Ignored => Step::default(),
        }
    }

    fn after_manual_set(&mut self, before: u32) -> Step {
        if before > 0 && self.clock.remaining() == 0 {
            return self.clock_expired();
        }
        Step::default()
    }

    fn clock_expired(&mut self) -> Step {
        self.clock.pause();
        let (local, visitor) = self.scores();
        match self.periods.on_clock_expired(local, visitor) {
            Some(transition) => self.apply_transition(transition),
            None => Step::default(),
        }
    }

    // -----------------------------------------------------------------------
    // Periods and timeouts
    // -----------------------------------------------------------------------

    pub fn next_period(&mut self) -> LiveResult<Step> {
        let (local, visitor) = self.scores();
        let transition = self.periods.advance(local, visitor)?;
        Ok(self.apply_transition(transition))
    }

    pub fn use_timeout(&mut self, side: Side) -> LiveResult<Step> {
        match self.periods.phase() {
            GamePhase::Regulation | GamePhase::Overtime => {}
            GamePhase::Finished { .. } => return Err(LiveError::MatchFinished),
            phase => return Err(LiveError::InvalidPhase { action: "call a timeout", phase }),
        }
        let left = self.ledger.use_timeout(side)?;
        let prior_phase = self.periods.enter_timeout()?;
        let saved_remaining = self.clock.remaining();
        let saved_mode = self.clock.mode();
        self.clock.reset(self.rules.timeout_secs);
        self.clock.set_mode(ClockMode::Timeout);
        self.clock.start();
        self.timeout_seq += 1;
        self.timeout = Some(ActiveTimeout {
            token: self.timeout_seq,
            side,
            saved_remaining,
            saved_mode,
            prior_phase,
        });
        Ok(Step::notice(Notice::TimeoutCalled { side, left }))
    }

    /// The timeout one-shot fired. Stale tokens are ignored.
    pub fn finish_timeout(&mut self, token: u64) -> Step {
        let Some(active) = self.timeout.filter(|t| t.token == token) else {
            return Step::default();
        };
        self.timeout = None;
        self.clock.reset(active.saved_remaining);
        self.clock.set_mode(active.saved_mode);
        self.periods.leave_timeout(active.prior_phase);
        Step::notice(Notice::TimeoutOver { side: active.side, restored: active.saved_remaining })
    }

    fn apply_transition(&mut self, transition: Transition) -> Step {
        match transition {
            Transition::PeriodOver { period } => Step::notice(Notice::PeriodOver(period)),
            Transition::HalftimeStarted => {
                self.clock.reset(self.rules.halftime_secs);
                self.clock.set_mode(ClockMode::Halftime);
                Step::notice(Notice::HalftimeStarted)
            }
            Transition::HalftimeOver => Step::notice(Notice::HalftimeOver),
            Transition::PeriodStarted { period } => {
                self.clock.reset(self.rules.quarter_secs);
                self.clock.set_mode(ClockMode::Regulation);
                Step::notice(Notice::PeriodStarted(period))
            }
            Transition::OvertimeStarted { period } => {
                self.clock.reset(self.rules.overtime_secs);
                self.clock.set_mode(ClockMode::Overtime);
                self.ledger.reset_timeouts();
                Step::notice(Notice::OvertimeStarted(period))
            }
            Transition::Finished { winner } => {
                self.clock.pause();
                self.timeout = None;
                self.reset_request = None;
                let (local, visitor) = self.scores();
                Step {
                    outbound: vec![Outbound::Finalize],
                    notices: vec![Notice::Finished { winner, local, visitor }],
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Ledger
    // -----------------------------------------------------------------------

    pub fn record_points(&mut self, side: Side, player: PlayerId, delta: i32) -> LiveResult<Step> {
        self.require_live("record points")?;
        self.ledger.add_points(side, player, delta)?;
        Ok(self.log(ActionKind::Points { delta }, side, Some(player)))
    }

    pub fn record_foul(&mut self, side: Side, player: PlayerId) -> LiveResult<Step> {
        self.require_live("record a foul")?;
        let fouled_out = self.ledger.add_foul(side, player)?;
        let step = self.log(ActionKind::Foul, side, Some(player));
        if !fouled_out {
            return Ok(step);
        }
        let name = self.ledger.player(side, player).map(|p| p.name.clone()).unwrap_or_default();
        Ok(step.merge(Step::notice(Notice::FouledOut { side, name })))
    }

    pub fn substitute(&mut self, side: Side, out: PlayerId, into: PlayerId) -> LiveResult<Step> {
        self.require_live("make a substitution")?;
        self.ledger.substitute(side, out, into)?;
        Ok(self.log(ActionKind::Substitution { out, into }, side, None))
    }

    pub fn on_action_acked(&mut self, id: ActionId) -> Step {
        if let Some(status) = self.statuses.get_mut(&id)
            && *status == ActionStatus::Pending
        {
            *status = ActionStatus::Confirmed;
        }
        Step::default()
    }

    pub fn on_action_failed(&mut self, id: ActionId, reason: &str) -> Step {
        if self.statuses.get(&id) != Some(&ActionStatus::Pending) {
            return Step::default();
        }
        let Some(action) = self.actions.iter().find(|a| a.id == id).cloned() else {
            return Step::default();
        };
        let summary = action.describe(&self.ledger);
        let reason = reason.to_string();
        // The final score was already reported; a late refusal is only recorded.
        if self.periods.is_finished() {
            self.statuses.insert(id, ActionStatus::Rejected);
            return Step::notice(Notice::ActionRejected { summary, reason });
        }
        match self.policy {
            RollbackPolicy::Compensate => {
                self.ledger.revert(&action);
                self.statuses.insert(id, ActionStatus::RolledBack);
                Step::notice(Notice::ActionRolledBack { summary, reason })
            }
            RollbackPolicy::Keep => {
                self.statuses.insert(id, ActionStatus::Rejected);
                Step::notice(Notice::ActionRejected { summary, reason })
            }
        }
    }

    /// Stops the clock and drops the timeout one-shot before the session goes away.
    pub fn close(&mut self) {
        self.clock.pause();
        self.timeout = None;
        self.reset_request = None;
    }

    fn log(&mut self, kind: ActionKind, side: Side, player: Option<PlayerId>) -> Step {
        let id = self.next_action_id;
        self.next_action_id += 1;
        let clock_secs = self.timeout.map_or(self.clock.remaining(), |t| t.saved_remaining);
        let action = Action {
            id,
            kind,
            side,
            player,
            period: self.periods.period(),
            clock_secs,
            recorded_at: Utc::now(),
        };
        self.actions.push(action.clone());
        self.statuses.insert(id, ActionStatus::Pending);
        Step { outbound: vec![Outbound::Action(action)], notices: Vec::new() }
    }

    fn scores(&self) -> (u32, u32) {
        (self.ledger.points(Side::Local), self.ledger.points(Side::Visitor))
    }

    fn require_selection(&self, action: &'static str) -> LiveResult<()> {
        match self.periods.phase() {
            GamePhase::SelectingRosters => Ok(()),
            GamePhase::Finished { .. } => Err(LiveError::MatchFinished),
            phase => Err(LiveError::InvalidPhase { action, phase }),
        }
    }

    fn require_live(&self, action: &'static str) -> LiveResult<()> {
        match self.periods.phase() {
            GamePhase::Finished { .. } => Err(LiveError::MatchFinished),
            GamePhase::SelectingRosters => Err(LiveError::InvalidPhase {
                action,
                phase: GamePhase::SelectingRosters,
            }),
            _ => Ok(()),
        }
    }

    fn draft(&self, side: Side) -> &LineupDraft {
        match side {
            Side::Local => &self.local_draft,
            Side::Visitor => &self.visitor_draft,
        }
    }

    fn draft_mut(&mut self, side: Side) -> &mut LineupDraft {
        match side {
            Side::Local => &mut self.local_draft,
            Side::Visitor => &mut self.visitor_draft,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::ledger::tests::roster;

    fn snapshot(status: MatchStatus) -> MatchSnapshot {
        MatchSnapshot {
            id: 77,
            tournament_id: Some(3),
            status,
            period: None,
            remaining_seconds: None,
            local: roster(1, "Halcones", 10, 8),
            visitor: roster(2, "Toros", 20, 8),
        }
    }

    fn scheduled() -> LiveSession {
        LiveSession::from_snapshot(
            &snapshot(MatchStatus::Scheduled),
            GameRules::default(),
            RollbackPolicy::Compensate,
        )
    }

    fn started() -> LiveSession {
        let mut session = scheduled();
        for id in 10..15 {
            session.toggle_starter(Side::Local, id).unwrap();
        }
        for id in 20..25 {
            session.toggle_starter(Side::Visitor, id).unwrap();
        }
        session.confirm_lineup(Side::Local).unwrap();
        session.confirm_lineup(Side::Visitor).unwrap();
        session.begin().unwrap();
        session
    }

    /// Runs the clock down to zero through the ticker path.
    fn run_out(session: &mut LiveSession) -> Step {
        session.start_clock().unwrap();
        let mut last = Step::default();
        while let Some(epoch) = session.clock_epoch() {
            last = session.tick(epoch);
        }
        last
    }

    fn in_period(period: u8) -> LiveSession {
        let mut session = started();
        while session.periods().period() < period {
            run_out(&mut session);
            session.next_period().unwrap();
        }
        session
    }

    #[test]
    fn sixth_starter_is_rejected() {
        let mut session = scheduled();
        for id in 10..15 {
            session.toggle_starter(Side::Local, id).unwrap();
        }
        assert_eq!(session.toggle_starter(Side::Local, 15), Err(LiveError::LineupFull(Side::Local)));
        assert_eq!(session.lineup(Side::Local).len(), 5);
    }

    #[test]
    fn begin_requires_both_confirmed_fives() {
        let mut session = scheduled();
        assert_eq!(session.begin(), Err(LiveError::LineupsNotConfirmed));
        for id in 10..14 {
            session.toggle_starter(Side::Local, id).unwrap();
        }
        assert_eq!(
            session.confirm_lineup(Side::Local),
            Err(LiveError::LineupIncomplete { side: Side::Local, selected: 4 })
        );
        assert!(matches!(session.start_clock(), Err(LiveError::InvalidPhase { .. })));
    }

    #[test]
    fn begin_submits_lineups_and_sets_the_court() {
        let mut session = scheduled();
        for id in 10..15 {
            session.toggle_starter(Side::Local, id).unwrap();
        }
        for id in 20..25 {
            session.toggle_starter(Side::Visitor, id).unwrap();
        }
        session.confirm_lineup(Side::Local).unwrap();
        session.confirm_lineup(Side::Visitor).unwrap();
        let step = session.begin().unwrap();
        assert_eq!(
            step.outbound,
            vec![Outbound::Lineups { local: vec![10, 11, 12, 13, 14], visitor: vec![20, 21, 22, 23, 24] }]
        );
        assert_eq!(session.phase(), GamePhase::Regulation);
        assert_eq!(session.ledger().team(Side::Local).active_five().count(), 5);
        assert_eq!(session.clock().remaining(), 600);
    }

    #[test]
    fn starting_twice_decrements_once_per_tick() {
        let mut session = started();
        session.start_clock().unwrap();
        let epoch = session.clock_epoch().unwrap();
        session.start_clock().unwrap();
        assert_eq!(session.clock_epoch(), Some(epoch));
        session.tick(epoch);
        assert_eq!(session.clock().remaining(), 599);
    }

    #[test]
    fn ticks_after_pause_do_nothing() {
        let mut session = started();
        session.start_clock().unwrap();
        let epoch = session.clock_epoch().unwrap();
        session.tick(epoch);
        session.pause_clock().unwrap();
        for _ in 0..10 {
            session.tick(epoch);
        }
        assert_eq!(session.clock().remaining(), 599);
        session.start_clock().unwrap();
        session.tick(epoch);
        assert_eq!(session.clock().remaining(), 599, "superseded epoch");
    }

    #[test]
    fn expiry_in_first_quarter_waits_for_operator() {
        let mut session = started();
        let step = run_out(&mut session);
        assert_eq!(step.notices, vec![Notice::PeriodOver(1)]);
        assert_eq!(session.clock().remaining(), 0);
        assert!(!session.clock().is_running());
        let step = session.next_period().unwrap();
        assert_eq!(step.notices, vec![Notice::PeriodStarted(2)]);
        assert_eq!(session.clock().remaining(), 600);
    }

    #[test]
    fn second_quarter_leads_into_halftime() {
        let mut session = in_period(2);
        let step = run_out(&mut session);
        assert_eq!(step.notices, vec![Notice::HalftimeStarted]);
        assert_eq!(session.clock().remaining(), 900);
        assert_eq!(session.clock().mode(), ClockMode::Halftime);
        session.next_period().unwrap();
        assert_eq!(session.periods().period(), 3);
        assert_eq!(session.clock().remaining(), 600);
    }

    #[test]
    fn tie_after_fourth_goes_to_overtime_with_fresh_timeouts() {
        let mut session = in_period(4);
        session.use_timeout(Side::Local).unwrap();
        let token = session.pending_timeout().unwrap().0;
        session.finish_timeout(token);
        session.record_points(Side::Local, 10, 2).unwrap();
        session.record_points(Side::Visitor, 20, 2).unwrap();
        let step = run_out(&mut session);
        assert_eq!(step.notices, vec![Notice::OvertimeStarted(5)]);
        assert_eq!(session.periods().period(), 5);
        assert_eq!(session.phase(), GamePhase::Overtime);
        assert_eq!(session.clock().remaining(), 300);
        assert_eq!(session.clock().mode(), ClockMode::Overtime);
        assert_eq!(session.ledger().team(Side::Local).timeouts, 3);
        assert_eq!(session.ledger().team(Side::Visitor).timeouts, 3);
    }

    #[test]
    fn unequal_fourth_finishes_and_finalizes() {
        let mut session = in_period(4);
        session.record_points(Side::Visitor, 21, 3).unwrap();
        let step = run_out(&mut session);
        assert_eq!(step.outbound, vec![Outbound::Finalize]);
        assert_eq!(session.phase(), GamePhase::Finished { winner: Some(Side::Visitor) });
        assert_eq!(session.record_points(Side::Local, 10, 2), Err(LiveError::MatchFinished));
        assert_eq!(session.start_clock(), Err(LiveError::MatchFinished));
        assert_eq!(session.use_timeout(Side::Local), Err(LiveError::MatchFinished));
    }

    #[test]
    fn manual_advance_blocked_in_fourth() {
        let mut session = in_period(4);
        assert_eq!(session.next_period(), Err(LiveError::AdvanceBlocked { period: 4 }));
    }

    #[test]
    fn editing_clock_to_zero_runs_the_boundary_once() {
        let mut session = in_period(4);
        session.record_points(Side::Local, 10, 1).unwrap();
        let step = session.edit_clock(0, 0).unwrap();
        assert_eq!(step.outbound, vec![Outbound::Finalize]);
        assert!(session.periods().is_finished());

        let mut session = started();
        session.adjust_clock(-1000).unwrap();
        assert_eq!(session.adjust_clock(-5).unwrap(), Step::default());
        assert_eq!(session.clock().remaining(), 0);
    }

    #[test]
    fn invalid_edit_leaves_clock_alone() {
        let mut session = started();
        assert_eq!(
            session.edit_clock(3, 60),
            Err(LiveError::InvalidTime { minutes: 3, seconds: 60 })
        );
        assert_eq!(session.clock().remaining(), 600);
    }

    #[test]
    fn reset_needs_confirmation() {
        let mut session = started();
        session.adjust_clock(-100).unwrap();
        session.request_clock_reset(600).unwrap();
        assert_eq!(session.clock().remaining(), 500);
        session.cancel_clock_reset().unwrap();
        assert_eq!(session.confirm_clock_reset(), Err(LiveError::NothingToConfirm));

        session.start_clock().unwrap();
        session.request_clock_reset(600).unwrap();
        session.confirm_clock_reset().unwrap();
        assert_eq!(session.clock().remaining(), 600);
        assert!(!session.clock().is_running());
    }

    #[test]
    fn timeout_restores_clock_and_mode() {
        let mut session = started();
        session.use_timeout(Side::Visitor).unwrap();
        session.finish_timeout(session.pending_timeout().unwrap().0);
        session.adjust_clock(-120).unwrap();

        let step = session.use_timeout(Side::Visitor).unwrap();
        assert_eq!(step.notices, vec![Notice::TimeoutCalled { side: Side::Visitor, left: 1 }]);
        assert_eq!(session.clock().remaining(), 60);
        assert_eq!(session.clock().mode(), ClockMode::Timeout);
        assert_eq!(session.phase(), GamePhase::Timeout);

        let (token, duration) = session.pending_timeout().unwrap();
        assert_eq!(duration, Duration::from_secs(60));
        let step = session.finish_timeout(token);
        assert_eq!(step.notices, vec![Notice::TimeoutOver { side: Side::Visitor, restored: 480 }]);
        assert_eq!(session.clock().remaining(), 480);
        assert_eq!(session.clock().mode(), ClockMode::Regulation);
        assert_eq!(session.phase(), GamePhase::Regulation);
        assert!(session.pending_timeout().is_none());
        assert_eq!(session.finish_timeout(token), Step::default());
    }

    #[test]
    fn timeout_countdown_expiry_does_not_end_the_period() {
        let mut session = started();
        session.use_timeout(Side::Local).unwrap();
        let step = run_out(&mut session);
        assert_eq!(step, Step::default());
        assert_eq!(session.phase(), GamePhase::Timeout);
        assert_eq!(session.periods().period(), 1);
    }

    #[test]
    fn no_timeouts_left_changes_nothing() {
        let mut session = started();
        for _ in 0..3 {
            session.use_timeout(Side::Local).unwrap();
            session.finish_timeout(session.pending_timeout().unwrap().0);
        }
        let remaining = session.clock().remaining();
        assert_eq!(session.use_timeout(Side::Local), Err(LiveError::NoTimeoutsLeft(Side::Local)));
        assert_eq!(session.clock().remaining(), remaining);
        assert_eq!(session.phase(), GamePhase::Regulation);
    }

    #[test]
    fn timeout_at_halftime_keeps_team_timeouts() {
        let mut session = in_period(2);
        run_out(&mut session);
        assert!(matches!(session.use_timeout(Side::Local), Err(LiveError::InvalidPhase { .. })));
        assert_eq!(session.ledger().team(Side::Local).timeouts, 3);
    }

    #[test]
    fn fifth_foul_benches_player_and_warns() {
        let mut session = started();
        for _ in 0..4 {
            session.record_foul(Side::Local, 12).unwrap();
        }
        let step = session.record_foul(Side::Local, 12).unwrap();
        assert!(step.notices.iter().any(|n| matches!(n, Notice::FouledOut { side: Side::Local, .. })));
        assert!(!session.ledger().player(Side::Local, 12).unwrap().on_court);
        assert!(matches!(
            session.record_foul(Side::Local, 12),
            Err(LiveError::FoulLimitReached { .. })
        ));
        assert_eq!(session.actions().len(), 5);
    }

    #[test]
    fn actions_carry_period_and_game_clock() {
        let mut session = started();
        session.adjust_clock(-30).unwrap();
        session.use_timeout(Side::Local).unwrap();
        let step = session.record_points(Side::Local, 10, 1).unwrap();
        let Outbound::Action(action) = &step.outbound[0] else {
            panic!("expected an action, got {step:?}");
        };
        assert_eq!(action.period, 1);
        assert_eq!(action.clock_secs, 570);
        assert_eq!(session.action_status(action.id), Some(ActionStatus::Pending));
    }

    #[test]
    fn failed_action_is_compensated() {
        let mut session = started();
        let step = session.record_points(Side::Local, 10, 3).unwrap();
        let Outbound::Action(action) = &step.outbound[0] else {
            panic!("expected an action");
        };
        let step = session.on_action_failed(action.id, "HTTP 500");
        assert!(matches!(step.notices[0], Notice::ActionRolledBack { .. }));
        assert_eq!(session.ledger().points(Side::Local), 0);
        assert_eq!(session.action_status(action.id), Some(ActionStatus::RolledBack));
        assert_eq!(session.actions().len(), 1);
        assert_eq!(session.on_action_failed(action.id, "again"), Step::default());
    }

    #[test]
    fn refusal_after_final_whistle_keeps_the_score() {
        let mut session = in_period(4);
        let step = session.record_points(Side::Local, 10, 2).unwrap();
        let Outbound::Action(action) = &step.outbound[0] else {
            panic!("expected an action");
        };
        let step = run_out(&mut session);
        assert_eq!(step.outbound, vec![Outbound::Finalize]);

        let step = session.on_action_failed(action.id, "HTTP 500");
        assert!(matches!(step.notices[0], Notice::ActionRejected { .. }));
        assert!(step.outbound.is_empty());
        assert_eq!(session.phase(), GamePhase::Finished { winner: Some(Side::Local) });
        assert_eq!(session.ledger().points(Side::Local), 2);
        assert_eq!(session.ledger().player(Side::Local, 10).unwrap().points, 2);
        assert_eq!(session.action_status(action.id), Some(ActionStatus::Rejected));
    }

    #[test]
    fn refused_fifth_foul_keeps_player_disqualified() {
        let mut session = started();
        for _ in 0..4 {
            session.record_foul(Side::Local, 12).unwrap();
        }
        let step = session.record_foul(Side::Local, 12).unwrap();
        let Outbound::Action(action) = &step.outbound[0] else {
            panic!("expected an action");
        };
        session.on_action_failed(action.id, "HTTP 500");
        let player = session.ledger().player(Side::Local, 12).unwrap();
        assert_eq!(player.fouls, 4);
        assert!(player.fouled_out());
        assert!(matches!(
            session.substitute(Side::Local, 10, 12),
            Err(LiveError::PlayerFouledOut(_))
        ));
        assert!(!session.ledger().player(Side::Local, 12).unwrap().on_court);
    }

    #[test]
    fn keep_policy_leaves_optimistic_value() {
        let mut session = started();
        session.policy = RollbackPolicy::Keep;
        let step = session.record_foul(Side::Visitor, 20).unwrap();
        let Outbound::Action(action) = &step.outbound[0] else {
            panic!("expected an action");
        };
        session.on_action_failed(action.id, "offline");
        assert_eq!(session.ledger().team(Side::Visitor).fouls, 1);
        assert_eq!(session.action_status(action.id), Some(ActionStatus::Rejected));
    }

    #[test]
    fn acked_action_is_confirmed() {
        let mut session = started();
        session.substitute(Side::Local, 10, 15).unwrap();
        let id = session.actions()[0].id;
        session.on_action_acked(id);
        assert_eq!(session.action_status(id), Some(ActionStatus::Confirmed));
        assert_eq!(session.pending_actions(), 0);
    }

    #[test]
    fn resumes_in_progress_match_from_backend_hints() {
        let mut snap = snapshot(MatchStatus::InProgress);
        snap.period = Some(5);
        snap.remaining_seconds = Some(125);
        for p in snap.local.players.iter_mut().take(5) {
            p.on_court = true;
        }
        let session = LiveSession::from_snapshot(&snap, GameRules::default(), RollbackPolicy::Keep);
        assert_eq!(session.phase(), GamePhase::Overtime);
        assert_eq!(session.clock().remaining(), 125);
        assert_eq!(session.clock().mode(), ClockMode::Overtime);
        assert_eq!(session.lineup(Side::Local).len(), 5);
        assert!(session.lineup_confirmed(Side::Visitor));
    }

    #[test]
    fn finished_snapshot_is_terminal() {
        let mut snap = snapshot(MatchStatus::Finished);
        snap.local.points = 60;
        snap.visitor.points = 58;
        let mut session = LiveSession::from_snapshot(&snap, GameRules::default(), RollbackPolicy::Keep);
        assert_eq!(session.phase(), GamePhase::Finished { winner: Some(Side::Local) });
        assert_eq!(session.next_period(), Err(LiveError::MatchFinished));
    }

    #[test]
    fn rollback_policy_parses() {
        assert_eq!(RollbackPolicy::parse("Keep"), Some(RollbackPolicy::Keep));
        assert_eq!(RollbackPolicy::parse("compensate"), Some(RollbackPolicy::Compensate));
        assert_eq!(RollbackPolicy::parse("maybe"), None);
    }
}
