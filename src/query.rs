//! Filtering, sorting and aggregation over an in-memory set of players.
//!
//! Everything here is a pure function of its inputs. The dashboard and the
//! HTTP surface both pass an explicit [`FilterConfig`] instead of keeping
//! "currently selected" state around.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::PlayerRecord;

/// Pick-list value meaning "no filter".
pub const ALL: &str = "All";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Name,
    Price,
    TotalPoints,
    GoalsScored,
    Assists,
    Minutes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    #[serde(rename = "asc")]
    Ascending,
    #[serde(rename = "desc")]
    Descending,
}

/// Stats that can be ranked or summed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericField {
    Price,
    TotalPoints,
    GoalsScored,
    Assists,
    Minutes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKey {
    Team,
    Position,
}

/// Everything that decides which players are shown and in what order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Case-insensitive substring match on name.
    #[serde(rename = "name")]
    pub name_substring: Option<String>,
    /// Exact team; `None`, empty or "All" disables the filter.
    pub team: Option<String>,
    /// Exact position; `None`, empty or "All" disables the filter.
    pub position: Option<String>,
    #[serde(rename = "sort")]
    pub sort_field: Option<SortField>,
    #[serde(rename = "dir")]
    pub sort_direction: SortDirection,
}

impl FilterConfig {
    pub fn team_filter(&self) -> Option<&str> {
        active(self.team.as_deref())
    }

    pub fn position_filter(&self) -> Option<&str> {
        active(self.position.as_deref())
    }

    fn name_filter(&self) -> Option<String> {
        self.name_substring
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    pub fn matches(&self, player: &PlayerRecord) -> bool {
        if let Some(needle) = self.name_filter() {
            if !player.name.to_lowercase().contains(&needle) {
                return false;
            }
        }
        self.team_filter().map_or(true, |t| player.team == t)
            && self.position_filter().map_or(true, |p| player.position == p)
    }
}

fn active(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty() && *v != ALL)
}

impl NumericField {
    pub fn value(self, p: &PlayerRecord) -> f64 {
        match self {
            NumericField::Price => p.price,
            NumericField::TotalPoints => p.total_points as f64,
            NumericField::GoalsScored => p.goals_scored as f64,
            NumericField::Assists => p.assists as f64,
            NumericField::Minutes => p.minutes as f64,
        }
    }
}

impl SortField {
    fn compare(self, a: &PlayerRecord, b: &PlayerRecord) -> Ordering {
        let numeric = |f: NumericField| f.value(a).total_cmp(&f.value(b));
        match self {
            SortField::Name => a.name.cmp(&b.name),
            SortField::Price => numeric(NumericField::Price),
            SortField::TotalPoints => numeric(NumericField::TotalPoints),
            SortField::GoalsScored => numeric(NumericField::GoalsScored),
            SortField::Assists => numeric(NumericField::Assists),
            SortField::Minutes => numeric(NumericField::Minutes),
        }
    }
}

impl GroupKey {
    pub fn value(self, p: &PlayerRecord) -> &str {
        match self {
            GroupKey::Team => &p.team,
            GroupKey::Position => &p.position,
        }
    }
}

/// Filter then (stably) sort. With no sort field the input order is kept.
pub fn apply<'a>(players: &'a [PlayerRecord], filter: &FilterConfig) -> Vec<&'a PlayerRecord> {
    let mut out: Vec<&PlayerRecord> = players.iter().filter(|p| filter.matches(p)).collect();
    if let Some(field) = filter.sort_field {
        out.sort_by(|a, b| {
            let ord = field.compare(a, b);
            match filter.sort_direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            }
        });
    }
    out
}

/// The `n` highest players by `field`, highest first. Ties keep input order.
pub fn top_n<'a, I>(players: I, field: NumericField, n: usize) -> Vec<&'a PlayerRecord>
where
    I: IntoIterator<Item = &'a PlayerRecord>,
{
    let mut ranked: Vec<&PlayerRecord> = players.into_iter().collect();
    ranked.sort_by(|a, b| field.value(b).total_cmp(&field.value(a)));
    ranked.truncate(n);
    ranked
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupTotal {
    pub group: String,
    pub total: f64,
}

/// Sum `field` per distinct `key`, ordered by group name.
pub fn sum_by<'a, I>(players: I, key: GroupKey, field: NumericField) -> Vec<GroupTotal>
where
    I: IntoIterator<Item = &'a PlayerRecord>,
{
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    for p in players {
        *totals.entry(key.value(p)).or_insert(0.0) += field.value(p);
    }
    totals
        .into_iter()
        .map(|(group, total)| GroupTotal { group: group.to_string(), total })
        .collect()
}

/// Sorted distinct values of `key`, for filter pick-lists.
pub fn distinct<'a, I>(players: I, key: GroupKey) -> Vec<String>
where
    I: IntoIterator<Item = &'a PlayerRecord>,
{
    let mut values: Vec<String> = players.into_iter().map(|p| key.value(p).to_string()).collect();
    values.sort();
    values.dedup();
    values
}
