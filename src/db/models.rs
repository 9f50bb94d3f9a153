use crate::types::PlayerRecord;

/// Row of the `players` table. `id` is internal and never leaves the store.
#[derive(Debug, sqlx::FromRow)]
pub struct PlayerRow {
    pub id: i64,
    pub name: String,
    pub team: String,
    pub position: String,
    pub price: f64,
    pub total_points: i64,
    pub goals_scored: i64,
    pub assists: i64,
    pub minutes: i64,
}

impl From<PlayerRow> for PlayerRecord {
    fn from(row: PlayerRow) -> Self {
        PlayerRecord {
            name: row.name,
            team: row.team,
            position: row.position,
            price: row.price,
            total_points: row.total_points,
            goals_scored: row.goals_scored,
            assists: row.assists,
            minutes: row.minutes,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct DuplicateRow {
    pub name: String,
    pub count: i64,
}
