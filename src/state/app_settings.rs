use crate::live::{GameRules, RollbackPolicy};
use crate::state::sync::ReconnectPolicy;
use courtside_api::{Identity, MatchId, TournamentId, User};
use log::LevelFilter;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_API_URL: &str = "http://127.0.0.1:8000/api";
const DEFAULT_WS_URL: &str = "ws://127.0.0.1:8000/ws";

/// What the command line asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliCommand {
    Run,
    Help,
    Version,
}

#[derive(Debug, Clone)]
pub struct AppSettings {
    pub full_screen: bool,
    pub log_level: LevelFilter,
    pub api_url: String,
    pub ws_url: String,
    pub match_id: Option<MatchId>,
    pub tournament_id: Option<TournamentId>,
    pub token: Option<String>,
    pub user: Option<User>,
    pub rules: GameRules,
    pub reconnect: ReconnectPolicy,
    pub refresh_every: Duration,
    pub rollback: RollbackPolicy,
    /// Values that could not be read; logged once the logger is up.
    pub warnings: Vec<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            full_screen: false,
            log_level: LevelFilter::Info,
            api_url: DEFAULT_API_URL.to_string(),
            ws_url: DEFAULT_WS_URL.to_string(),
            match_id: None,
            tournament_id: None,
            token: None,
            user: None,
            rules: GameRules::default(),
            reconnect: ReconnectPolicy::default(),
            refresh_every: Duration::from_secs(30),
            rollback: RollbackPolicy::default(),
            warnings: Vec::new(),
        }
    }
}

impl AppSettings {
    pub fn load() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from any key lookup; unreadable values keep their default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(url) = get("COURTSIDE_API_URL") {
            settings.api_url = url;
        }
        if let Some(url) = get("COURTSIDE_WS_URL") {
            settings.ws_url = url.trim_end_matches('/').to_string();
        }
        settings.match_id = settings.parsed(get("COURTSIDE_MATCH_ID"), "COURTSIDE_MATCH_ID");
        settings.tournament_id =
            settings.parsed(get("COURTSIDE_TOURNAMENT_ID"), "COURTSIDE_TOURNAMENT_ID");

        settings.token = get("COURTSIDE_TOKEN");
        let email = get("COURTSIDE_USER_EMAIL");
        let name = get("COURTSIDE_USER_NAME");
        if email.is_some() || name.is_some() {
            let email = email.unwrap_or_default();
            let name = name.unwrap_or_else(|| email.clone());
            settings.user = Some(User { email, name });
        }

        let mut rules = settings.rules;
        for (key, slot) in [
            ("COURTSIDE_QUARTER_SECS", &mut rules.quarter_secs),
            ("COURTSIDE_OVERTIME_SECS", &mut rules.overtime_secs),
            ("COURTSIDE_HALFTIME_SECS", &mut rules.halftime_secs),
            ("COURTSIDE_TIMEOUT_SECS", &mut rules.timeout_secs),
        ] {
            if let Some(secs) = settings.parsed::<u32>(get(key), key).filter(|s| *s > 0) {
                *slot = secs;
            }
        }
        settings.rules = rules;

        if let Some(secs) = settings.parsed::<u64>(get("COURTSIDE_RECONNECT_DELAY_SECS"), "COURTSIDE_RECONNECT_DELAY_SECS") {
            settings.reconnect.delay = Duration::from_secs(secs);
        }
        if let Some(n) = settings.parsed(get("COURTSIDE_RECONNECT_ATTEMPTS"), "COURTSIDE_RECONNECT_ATTEMPTS") {
            settings.reconnect.max_attempts = n;
        }
        if let Some(secs) = settings
            .parsed::<u64>(get("COURTSIDE_HEARTBEAT_SECS"), "COURTSIDE_HEARTBEAT_SECS")
            .filter(|s| *s > 0)
        {
            settings.reconnect.heartbeat = Duration::from_secs(secs);
        }
        if let Some(secs) = settings
            .parsed::<u64>(get("COURTSIDE_REFRESH_SECS"), "COURTSIDE_REFRESH_SECS")
            .filter(|s| *s > 0)
        {
            settings.refresh_every = Duration::from_secs(secs);
        }

        if let Some(raw) = get("COURTSIDE_ROLLBACK") {
            match RollbackPolicy::parse(&raw) {
                Some(policy) => settings.rollback = policy,
                None => settings.warn("COURTSIDE_ROLLBACK", &raw),
            }
        }
        if let Some(level) = settings.parsed(get("COURTSIDE_LOG"), "COURTSIDE_LOG") {
            settings.log_level = level;
        }

        settings
    }

    /// Applies command-line overrides on top of the environment.
    pub fn apply_args<I>(&mut self, args: I) -> Result<CliCommand, String>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-h" | "--help" => return Ok(CliCommand::Help),
                "-V" | "--version" => return Ok(CliCommand::Version),
                "-m" | "--match" => self.match_id = Some(id_arg(&arg, args.next())?),
                "-t" | "--tournament" => self.tournament_id = Some(id_arg(&arg, args.next())?),
                _ => return Err(format!("Unknown argument: {arg}")),
            }
        }
        Ok(CliCommand::Run)
    }

    pub fn identity(&self) -> Identity {
        Identity::new(self.token.clone(), self.user.clone())
    }

    /// Push channel of the tournament, once the tournament is known.
    pub fn channel_url(&self) -> Option<String> {
        self.tournament_id
            .map(|id| format!("{}/tournaments/{id}", self.ws_url))
    }

    fn parsed<T: FromStr>(&mut self, raw: Option<String>, key: &str) -> Option<T> {
        let raw = raw?;
        match raw.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                self.warn(key, &raw);
                None
            }
        }
    }

    fn warn(&mut self, key: &str, raw: &str) {
        self.warnings.push(format!("ignoring {key}={raw:?}, using the default"));
    }
}

fn id_arg(flag: &str, value: Option<String>) -> Result<u64, String> {
    let value = value.ok_or_else(|| format!("{flag} needs a numeric id"))?;
    value.parse().map_err(|_| format!("{flag} needs a numeric id, got {value:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> AppSettings {
        let env: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppSettings::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_match_league_rules() {
        let s = settings(&[]);
        assert_eq!(s.rules, GameRules::default());
        assert_eq!(s.reconnect.delay, Duration::from_secs(3));
        assert_eq!(s.reconnect.max_attempts, 5);
        assert_eq!(s.reconnect.heartbeat, Duration::from_secs(30));
        assert_eq!(s.rollback, RollbackPolicy::Compensate);
        assert_eq!(s.log_level, LevelFilter::Info);
        assert!(s.channel_url().is_none());
        assert!(!s.identity().is_authenticated());
    }

    #[test]
    fn reads_environment_overrides() {
        let s = settings(&[
            ("COURTSIDE_WS_URL", "wss://league.test/ws/"),
            ("COURTSIDE_TOURNAMENT_ID", "12"),
            ("COURTSIDE_MATCH_ID", "340"),
            ("COURTSIDE_QUARTER_SECS", "480"),
            ("COURTSIDE_RECONNECT_ATTEMPTS", "2"),
            ("COURTSIDE_ROLLBACK", "keep"),
            ("COURTSIDE_TOKEN", "abc"),
            ("COURTSIDE_USER_EMAIL", "ref@league.test"),
            ("COURTSIDE_LOG", "debug"),
        ]);
        assert_eq!(s.channel_url().as_deref(), Some("wss://league.test/ws/tournaments/12"));
        assert_eq!(s.match_id, Some(340));
        assert_eq!(s.rules.quarter_secs, 480);
        assert_eq!(s.rules.overtime_secs, 300);
        assert_eq!(s.reconnect.max_attempts, 2);
        assert_eq!(s.rollback, RollbackPolicy::Keep);
        assert_eq!(s.log_level, LevelFilter::Debug);
        let identity = s.identity();
        assert_eq!(identity.current_user().map(|u| u.name.as_str()), Some("ref@league.test"));
        assert!(s.warnings.is_empty());
    }

    #[test]
    fn bad_values_fall_back_with_warning() {
        let s = settings(&[
            ("COURTSIDE_TIMEOUT_SECS", "a minute"),
            ("COURTSIDE_ROLLBACK", "sometimes"),
            ("COURTSIDE_MATCH_ID", "-4"),
        ]);
        assert_eq!(s.rules.timeout_secs, 60);
        assert_eq!(s.rollback, RollbackPolicy::Compensate);
        assert_eq!(s.match_id, None);
        assert_eq!(s.warnings.len(), 3);
    }

    #[test]
    fn cli_overrides_ids() {
        let mut s = settings(&[("COURTSIDE_MATCH_ID", "1")]);
        let args = ["--match", "9", "-t", "4"].map(String::from);
        assert_eq!(s.apply_args(args), Ok(CliCommand::Run));
        assert_eq!(s.match_id, Some(9));
        assert_eq!(s.tournament_id, Some(4));
        assert_eq!(s.apply_args(["--version".to_string()]), Ok(CliCommand::Version));
        assert!(s.apply_args(["--match".to_string()]).is_err());
        assert!(s.apply_args(["--court".to_string()]).is_err());
    }
}
