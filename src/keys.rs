use crate::app::{App, MenuItem};
use crossterm::event::KeyCode::Char;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::sync::Arc;
use tokio::sync::Mutex;

pub async fn handle_key_bindings(key_event: KeyEvent, app: &Arc<Mutex<App>>) {
    let mut guard = app.lock().await;
    dispatch(key_event, &mut guard);
}

fn dispatch(key_event: KeyEvent, app: &mut App) {
    // Clock edit prompt swallows everything until Enter or Esc.
    if app.state.live.clock_input.is_some() {
        match key_event.code {
            KeyCode::Enter => app.submit_clock_edit(),
            KeyCode::Esc => app.cancel_clock_edit(),
            KeyCode::Backspace => app.clock_edit_backspace(),
            Char(c) => app.clock_edit_push(c),
            _ => {}
        }
        return;
    }

    if app.state.active_tab == MenuItem::Live && app.reset_pending() {
        match key_event.code {
            Char('y') | Char('Y') => app.live_confirm_reset(),
            Char('n') | Char('N') | KeyCode::Esc => app.live_cancel_reset(),
            _ => {}
        }
        return;
    }

    match (app.state.active_tab, key_event.code, key_event.modifiers) {
        // Quit
        (_, Char('q'), _) | (_, Char('c'), KeyModifiers::CONTROL) => app.quit(),

        // Tab switching
        (_, KeyCode::F(1), _) => app.update_tab(MenuItem::Live),
        (_, KeyCode::F(2), _) => app.update_tab(MenuItem::Scoreboard),
        (_, KeyCode::F(3), _) => app.update_tab(MenuItem::Standings),
        (_, KeyCode::F(4), _) | (_, Char('?'), _) => app.update_tab(MenuItem::Help),
        (MenuItem::Help, KeyCode::Esc, _) => app.exit_help(),

        // Live: navigation
        (MenuItem::Live, KeyCode::Tab, _) => app.state.live.switch_focus(),
        (MenuItem::Live, Char('j') | KeyCode::Down, _) => app.state.live.cursor_down(),
        (MenuItem::Live, Char('k') | KeyCode::Up, _) => app.state.live.cursor_up(),
        (MenuItem::Live, KeyCode::Esc, _) => app.state.live.sub_out = None,

        // Live: roster selection and match start
        (MenuItem::Live, Char(' '), _) => app.live_space(),
        (MenuItem::Live, Char('c'), _) => app.live_confirm_lineup(),
        (MenuItem::Live, KeyCode::Enter, _) => app.live_begin(),

        // Live: ledger
        (MenuItem::Live, Char('1'), _) => app.live_points(1),
        (MenuItem::Live, Char('2'), _) => app.live_points(2),
        (MenuItem::Live, Char('3'), _) => app.live_points(3),
        (MenuItem::Live, Char('!'), _) => app.live_points(-1),
        (MenuItem::Live, Char('@'), _) => app.live_points(-2),
        (MenuItem::Live, Char('#'), _) => app.live_points(-3),
        (MenuItem::Live, Char('f'), _) => app.live_foul(),
        (MenuItem::Live, Char('b'), _) => app.live_substitution(),
        (MenuItem::Live, Char('t'), _) => app.live_timeout(),
        (MenuItem::Live, Char('n'), _) => app.live_next_period(),

        // Live: clock corrections
        (MenuItem::Live, Char('+') | Char('='), _) => app.live_adjust_clock(1),
        (MenuItem::Live, Char('-'), _) => app.live_adjust_clock(-1),
        (MenuItem::Live, Char(']'), _) => app.live_adjust_clock(10),
        (MenuItem::Live, Char('['), _) => app.live_adjust_clock(-10),
        (MenuItem::Live, Char('e'), _) => app.start_clock_edit(),
        (MenuItem::Live, Char('R'), _) => app.live_request_reset(),

        // Scoreboard navigation
        (MenuItem::Scoreboard, Char('j') | KeyCode::Down, _) => app.state.scoreboard.select_next(),
        (MenuItem::Scoreboard, Char('k') | KeyCode::Up, _) => app.state.scoreboard.select_prev(),
        (MenuItem::Scoreboard, Char('v'), _) => app.state.scoreboard.cycle_filter(),

        // Global
        (_, Char('z'), _) => app.toggle_full_screen(),
        (_, Char('"'), _) => app.toggle_show_logs(),

        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::app_settings::AppSettings;

    fn press(app: &mut App, code: KeyCode) {
        dispatch(KeyEvent::new(code, KeyModifiers::NONE), app);
    }

    #[test]
    fn function_keys_switch_tabs() {
        let mut app = App::new(AppSettings::default());
        press(&mut app, KeyCode::F(3));
        assert_eq!(app.state.active_tab, MenuItem::Standings);
        press(&mut app, KeyCode::F(4));
        assert_eq!(app.state.active_tab, MenuItem::Help);
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.state.active_tab, MenuItem::Standings);
    }

    #[test]
    fn quit_key_sets_flag() {
        let mut app = App::new(AppSettings::default());
        press(&mut app, Char('q'));
        assert!(app.should_quit);
    }

    #[test]
    fn scoreboard_v_cycles_filter() {
        let mut app = App::new(AppSettings::default());
        press(&mut app, KeyCode::F(2));
        press(&mut app, Char('v'));
        assert_eq!(app.state.scoreboard.filter.label(), "Live");
    }

    #[test]
    fn clock_prompt_captures_q() {
        let mut app = App::new(AppSettings::default());
        app.state.live.clock_input = Some(String::new());
        press(&mut app, Char('q'));
        assert!(!app.should_quit);
        press(&mut app, KeyCode::Esc);
        assert!(app.state.live.clock_input.is_none());
    }
}
