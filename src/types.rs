use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// PlayerRecord
// ---------------------------------------------------------------------------

/// One normalized athlete. `name` ("First Last") is the upsert key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub name: String,
    /// Resolved team display name, or "Unknown".
    pub team: String,
    /// Resolved position display name, or "Unknown".
    pub position: String,
    /// Upstream cost divided by 10.
    pub price: f64,
    pub total_points: i64,
    pub goals_scored: i64,
    pub assists: i64,
    pub minutes: i64,
}

// ---------------------------------------------------------------------------
// Upstream wire format (bootstrap-static)
// ---------------------------------------------------------------------------

/// The three sections of the league payload we consume. Everything else in
/// the response is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct LeagueData {
    pub teams: Vec<RawTeam>,
    pub element_types: Vec<RawElementType>,
    pub elements: Vec<RawElement>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawTeam {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawElementType {
    pub id: i64,
    pub singular_name: String,
}

/// Per-athlete stats object. Team and position references that are missing,
/// null or not an integer read as `None` and resolve to "Unknown" rather than
/// failing the batch.
#[derive(Debug, Clone, Deserialize)]
pub struct RawElement {
    #[serde(default)]
    pub id: Option<i64>,
    pub first_name: String,
    pub second_name: String,
    #[serde(default, deserialize_with = "lenient_id")]
    pub team: Option<i64>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub element_type: Option<i64>,
    /// Cost in tenths of a unit.
    pub now_cost: i64,
    pub total_points: i64,
    pub goals_scored: i64,
    pub assists: i64,
    pub minutes: i64,
}

impl RawElement {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.second_name)
    }
}

fn lenient_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(serde_json::Value::deserialize(deserializer)?.as_i64())
}
