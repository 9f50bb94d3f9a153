use std::time::Instant;

use fpl_dashboard::api::health::HealthResponse;
use fpl_dashboard::config::TOP_N;
use fpl_dashboard::query::{
    self, FilterConfig, GroupKey, GroupTotal, NumericField, SortDirection, SortField, ALL,
};
use fpl_dashboard::types::PlayerRecord;

// ---------------------------------------------------------------------------
// Sort presets
// ---------------------------------------------------------------------------

pub struct SortPreset {
    pub label: &'static str,
    pub field: Option<SortField>,
    pub direction: SortDirection,
}

const fn preset(label: &'static str, field: SortField, direction: SortDirection) -> SortPreset {
    SortPreset { label, field: Some(field), direction }
}

pub const SORT_PRESETS: &[SortPreset] = &[
    SortPreset { label: "None", field: None, direction: SortDirection::Ascending },
    preset("Name (A-Z)", SortField::Name, SortDirection::Ascending),
    preset("Name (Z-A)", SortField::Name, SortDirection::Descending),
    preset("Price (Low to High)", SortField::Price, SortDirection::Ascending),
    preset("Price (High to Low)", SortField::Price, SortDirection::Descending),
    preset("Total Points (High to Low)", SortField::TotalPoints, SortDirection::Descending),
    preset("Goals Scored (High to Low)", SortField::GoalsScored, SortDirection::Descending),
    preset("Assists (High to Low)", SortField::Assists, SortDirection::Descending),
    preset("Minutes Played (High to Low)", SortField::Minutes, SortDirection::Descending),
];

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionStatus {
    Connected,
    Error(String),
    Connecting,
}

pub struct AppState {
    pub status: ConnectionStatus,
    /// Every stored player, unfiltered.
    pub players: Vec<PlayerRecord>,
    pub health: HealthResponse,
    pub filter: FilterConfig,
    pub sort_preset: usize,
    /// Keystrokes go to the name search box.
    pub search_mode: bool,
    pub teams: Vec<String>,
    pub positions: Vec<String>,
    pub last_refresh: Instant,
    pub base_url: String,
}

impl AppState {
    pub fn new(base_url: String) -> Self {
        Self {
            status: ConnectionStatus::Connecting,
            players: Vec::new(),
            health: HealthResponse::default(),
            filter: FilterConfig::default(),
            sort_preset: 0,
            search_mode: false,
            teams: Vec::new(),
            positions: Vec::new(),
            last_refresh: Instant::now(),
            base_url,
        }
    }

    pub async fn refresh(&mut self, client: &reqwest::Client) {
        let players_url = format!("{}/players", self.base_url);
        let health_url = format!("{}/health", self.base_url);

        let (players_res, health_res) = tokio::join!(
            client.get(&players_url).send(),
            client.get(&health_url).send(),
        );

        let resp = match players_res {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                self.status = ConnectionStatus::Error(format!("/players returned {}", r.status()));
                return;
            }
            Err(e) => {
                self.status = ConnectionStatus::Error(format!("{e}"));
                return;
            }
        };

        match resp.json::<Vec<PlayerRecord>>().await {
            Ok(players) => {
                self.set_players(players);
                self.status = ConnectionStatus::Connected;
                self.last_refresh = Instant::now();
            }
            Err(e) => {
                self.status = ConnectionStatus::Error(format!("parse error: {e}"));
                return;
            }
        }

        if let Ok(h) = health_res {
            if let Ok(health) = h.json::<HealthResponse>().await {
                self.health = health;
            }
        }
    }

    /// Replace the player set and rebuild the pick-lists. A selected team or
    /// position that no longer exists falls back to "All".
    pub fn set_players(&mut self, players: Vec<PlayerRecord>) {
        self.teams = query::distinct(&players, GroupKey::Team);
        self.positions = query::distinct(&players, GroupKey::Position);
        if let Some(t) = self.filter.team_filter() {
            if !self.teams.iter().any(|x| x == t) {
                self.filter.team = None;
            }
        }
        if let Some(p) = self.filter.position_filter() {
            if !self.positions.iter().any(|x| x == p) {
                self.filter.position = None;
            }
        }
        self.players = players;
    }

    pub fn visible(&self) -> Vec<&PlayerRecord> {
        query::apply(&self.players, &self.filter)
    }

    pub fn top_scorers(&self) -> Vec<&PlayerRecord> {
        query::top_n(self.visible(), NumericField::GoalsScored, TOP_N)
    }

    pub fn team_values(&self) -> Vec<GroupTotal> {
        let mut totals = query::sum_by(self.visible(), GroupKey::Team, NumericField::Price);
        totals.sort_by(|a, b| b.total.total_cmp(&a.total));
        totals
    }

    pub fn team_label(&self) -> &str {
        self.filter.team_filter().unwrap_or(ALL)
    }

    pub fn position_label(&self) -> &str {
        self.filter.position_filter().unwrap_or(ALL)
    }

    pub fn sort_label(&self) -> &'static str {
        SORT_PRESETS[self.sort_preset].label
    }

    pub fn search_text(&self) -> &str {
        self.filter.name_substring.as_deref().unwrap_or("")
    }

    pub fn cycle_team(&mut self, forward: bool) {
        self.filter.team = cycle(&self.teams, self.filter.team_filter(), forward);
    }

    pub fn cycle_position(&mut self, forward: bool) {
        self.filter.position = cycle(&self.positions, self.filter.position_filter(), forward);
    }

    pub fn cycle_sort(&mut self, forward: bool) {
        let n = SORT_PRESETS.len();
        self.sort_preset = if forward {
            (self.sort_preset + 1) % n
        } else {
            (self.sort_preset + n - 1) % n
        };
        let preset = &SORT_PRESETS[self.sort_preset];
        self.filter.sort_field = preset.field;
        self.filter.sort_direction = preset.direction;
    }

    pub fn push_search(&mut self, c: char) {
        self.filter.name_substring.get_or_insert_with(String::new).push(c);
    }

    pub fn pop_search(&mut self) {
        if let Some(s) = self.filter.name_substring.as_mut() {
            s.pop();
            if s.is_empty() {
                self.filter.name_substring = None;
            }
        }
    }

    pub fn clear_filters(&mut self) {
        self.filter = FilterConfig::default();
        self.sort_preset = 0;
        self.search_mode = false;
    }
}

/// Step through "All" followed by `options`, wrapping at both ends.
fn cycle(options: &[String], current: Option<&str>, forward: bool) -> Option<String> {
    let slots = options.len() + 1;
    let at = current
        .and_then(|c| options.iter().position(|o| o == c))
        .map_or(0, |i| i + 1);
    let next = if forward { (at + 1) % slots } else { (at + slots - 1) % slots };
    next.checked_sub(1).map(|i| options[i].clone())
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

pub fn format_price(price: f64) -> String {
    format!("£{price:.1}m")
}

/// Unix seconds to HH:MM:SS (UTC).
pub fn format_time_secs(secs: u64) -> String {
    let h = (secs / 3600) % 24;
    let m = (secs / 60) % 60;
    let s = secs % 60;
    format!("{h:02}:{m:02}:{s:02}")
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(name: &str, team: &str, position: &str, goals: i64, price: f64) -> PlayerRecord {
        PlayerRecord {
            name: name.to_string(),
            team: team.to_string(),
            position: position.to_string(),
            price,
            total_points: 0,
            goals_scored: goals,
            assists: 0,
            minutes: 0,
        }
    }

    fn app() -> AppState {
        let mut app = AppState::new("http://localhost:3000".to_string());
        app.set_players(vec![
            p("Mohamed Salah", "Liverpool", "Midfielder", 19, 13.0),
            p("Bukayo Saka", "Arsenal", "Midfielder", 16, 10.0),
            p("Kai Havertz", "Arsenal", "Forward", 9, 8.0),
        ]);
        app
    }

    #[test]
    fn team_cycle_wraps_through_all() {
        let mut app = app();
        assert_eq!(app.team_label(), ALL);
        app.cycle_team(true);
        assert_eq!(app.team_label(), "Arsenal");
        app.cycle_team(true);
        assert_eq!(app.team_label(), "Liverpool");
        app.cycle_team(true);
        assert_eq!(app.team_label(), ALL);
        app.cycle_team(false);
        assert_eq!(app.team_label(), "Liverpool");
    }

    #[test]
    fn filters_drive_visible_rows_and_charts() {
        let mut app = app();
        app.cycle_team(true);
        assert_eq!(app.visible().len(), 2);
        assert_eq!(app.top_scorers()[0].name, "Bukayo Saka");

        let totals = app.team_values();
        assert_eq!(totals.len(), 1);
        assert_eq!(totals[0].total, 18.0);
    }

    #[test]
    fn sort_presets_map_to_filter() {
        let mut app = app();
        app.cycle_sort(true);
        assert_eq!(app.sort_label(), "Name (A-Z)");
        assert_eq!(app.visible()[0].name, "Bukayo Saka");

        app.cycle_sort(false);
        app.cycle_sort(false);
        assert_eq!(app.sort_label(), "Minutes Played (High to Low)");
        assert_eq!(app.filter.sort_direction, SortDirection::Descending);
    }

    #[test]
    fn search_edits_and_clears() {
        let mut app = app();
        for c in "hav".chars() {
            app.push_search(c);
        }
        assert_eq!(app.visible().len(), 1);
        app.pop_search();
        app.pop_search();
        app.pop_search();
        assert_eq!(app.filter.name_substring, None);
        assert_eq!(app.visible().len(), 3);
    }

    #[test]
    fn vanished_team_selection_resets() {
        let mut app = app();
        app.cycle_team(true);
        app.set_players(vec![p("Mohamed Salah", "Liverpool", "Midfielder", 19, 13.0)]);
        assert_eq!(app.team_label(), ALL);
    }

    #[test]
    fn truncate_is_char_safe() {
        assert_eq!(truncate("Martin Ødegaard", 8), "Martin …");
        assert_eq!(truncate("Saka", 8), "Saka");
    }
}
