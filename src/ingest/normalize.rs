//! ID → name resolution and conversion of raw athletes into [`PlayerRecord`]s.

use std::collections::HashMap;

use tracing::debug;

use crate::types::{LeagueData, PlayerRecord, RawElement, RawElementType, RawTeam};

/// Display value for a team or position reference with no mapping entry.
pub const UNKNOWN: &str = "Unknown";

/// Upstream stores cost in tenths of a unit.
const COST_DIVISOR: f64 = 10.0;

/// Numeric source id → display name. Built fresh on every run.
#[derive(Debug, Clone, Default)]
pub struct NameMapping {
    names: HashMap<i64, String>,
}

impl NameMapping {
    pub fn teams(teams: &[RawTeam]) -> Self {
        Self {
            names: teams.iter().map(|t| (t.id, t.name.clone())).collect(),
        }
    }

    pub fn positions(element_types: &[RawElementType]) -> Self {
        Self {
            names: element_types
                .iter()
                .map(|p| (p.id, p.singular_name.clone()))
                .collect(),
        }
    }

    /// `None` on a mapping miss (unknown or absent id).
    pub fn get(&self, id: Option<i64>) -> Option<&str> {
        id.and_then(|id| self.names.get(&id)).map(String::as_str)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub players: Vec<PlayerRecord>,
    pub unknown_teams: usize,
    pub unknown_positions: usize,
    /// Rows dropped because an earlier row in the same payload had the same name.
    pub collapsed: usize,
}

/// Build both mappings and convert every athlete. Never fails: unresolvable
/// references become [`UNKNOWN`], and repeated names keep their last row.
pub fn normalize(data: &LeagueData) -> Normalized {
    let teams = NameMapping::teams(&data.teams);
    let positions = NameMapping::positions(&data.element_types);

    let mut out = Normalized::default();
    let mut index_by_name: HashMap<String, usize> = HashMap::with_capacity(data.elements.len());

    for raw in &data.elements {
        let team = teams.get(raw.team);
        let position = positions.get(raw.element_type);
        if team.is_none() {
            out.unknown_teams += 1;
            debug!(player = %raw.full_name(), team_id = ?raw.team, "team mapping miss");
        }
        if position.is_none() {
            out.unknown_positions += 1;
            debug!(player = %raw.full_name(), element_type = ?raw.element_type, "position mapping miss");
        }

        let record = to_player_record(raw, team.unwrap_or(UNKNOWN), position.unwrap_or(UNKNOWN));
        match index_by_name.get(&record.name) {
            Some(&i) => {
                out.players[i] = record;
                out.collapsed += 1;
            }
            None => {
                index_by_name.insert(record.name.clone(), out.players.len());
                out.players.push(record);
            }
        }
    }

    out
}

pub fn to_player_record(raw: &RawElement, team: &str, position: &str) -> PlayerRecord {
    PlayerRecord {
        name: raw.full_name(),
        team: team.to_string(),
        position: position.to_string(),
        price: price_from_cost(raw.now_cost),
        total_points: raw.total_points.max(0),
        goals_scored: raw.goals_scored.max(0),
        assists: raw.assists.max(0),
        minutes: raw.minutes.max(0),
    }
}

pub fn price_from_cost(now_cost: i64) -> f64 {
    now_cost.max(0) as f64 / COST_DIVISOR
}
