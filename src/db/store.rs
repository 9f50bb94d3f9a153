use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::db::models::{DuplicateRow, PlayerRow};
use crate::error::Result;
use crate::types::PlayerRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// A set of rows sharing one name, and how many of them were deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub name: String,
    pub count: i64,
    pub removed: u64,
}

/// The `players` collection. Identity is the player name, maintained by
/// upsert rather than by a storage-level constraint.
#[derive(Debug, Clone)]
pub struct PlayerStore {
    pool: SqlitePool,
}

const SELECT_PLAYERS: &str = r#"
    SELECT id, name, team, position, price, total_points, goals_scored, assists, minutes
    FROM players
"#;

impl PlayerStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Overwrite the row named `player.name`, or insert one if none exists.
    /// Extra rows left by an earlier duplicate are folded into the oldest one.
    /// Runs in its own transaction so each player is updated atomically.
    pub async fn upsert(&self, player: &PlayerRecord) -> Result<UpsertOutcome> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE players
            SET team = ?, position = ?, price = ?, total_points = ?,
                goals_scored = ?, assists = ?, minutes = ?
            WHERE name = ?
            "#,
        )
        .bind(&player.team)
        .bind(&player.position)
        .bind(player.price)
        .bind(player.total_points)
        .bind(player.goals_scored)
        .bind(player.assists)
        .bind(player.minutes)
        .bind(&player.name)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let outcome = if updated == 0 {
            insert(&mut *tx, player).await?;
            UpsertOutcome::Inserted
        } else {
            if updated > 1 {
                sqlx::query(
                    "DELETE FROM players WHERE name = ?1 \
                     AND id > (SELECT MIN(id) FROM players WHERE name = ?1)",
                )
                .bind(&player.name)
                .execute(&mut *tx)
                .await?;
            }
            UpsertOutcome::Updated
        };

        tx.commit().await?;
        Ok(outcome)
    }

    /// Delete every row and insert `players`, all in one transaction.
    /// Returns the number of rows removed.
    pub async fn replace_all(&self, players: &[PlayerRecord]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let removed = sqlx::query("DELETE FROM players")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        for player in players {
            insert(&mut *tx, player).await?;
        }
        tx.commit().await?;
        Ok(removed)
    }

    /// All players in insertion order.
    pub async fn fetch_all(&self) -> Result<Vec<PlayerRecord>> {
        let rows = sqlx::query_as::<_, PlayerRow>(&format!("{SELECT_PLAYERS} ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(PlayerRecord::from).collect())
    }

    /// Players matching the given team and/or position exactly. `None` matches anything.
    pub async fn fetch_filtered(
        &self,
        team: Option<&str>,
        position: Option<&str>,
    ) -> Result<Vec<PlayerRecord>> {
        let rows = sqlx::query_as::<_, PlayerRow>(&format!(
            "{SELECT_PLAYERS} WHERE (?1 IS NULL OR team = ?1) AND (?2 IS NULL OR position = ?2) ORDER BY id"
        ))
        .bind(team)
        .bind(position)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(PlayerRecord::from).collect())
    }

    pub async fn count(&self) -> Result<i64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM players")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    /// Names held by more than one row.
    pub async fn find_duplicates(&self) -> Result<Vec<DuplicateGroup>> {
        let rows = sqlx::query_as::<_, DuplicateRow>(
            r#"
            SELECT name, COUNT(*) AS count
            FROM players
            GROUP BY name
            HAVING COUNT(*) > 1
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| DuplicateGroup { name: r.name, count: r.count, removed: 0 })
            .collect())
    }

    /// Collapse every duplicate group to its oldest row.
    pub async fn remove_duplicates(&self) -> Result<Vec<DuplicateGroup>> {
        let mut groups = self.find_duplicates().await?;
        if groups.is_empty() {
            return Ok(groups);
        }

        let mut tx = self.pool.begin().await?;
        for group in &mut groups {
            group.removed = sqlx::query(
                "DELETE FROM players WHERE name = ?1 AND id <> (SELECT MIN(id) FROM players WHERE name = ?1)",
            )
            .bind(&group.name)
            .execute(&mut *tx)
            .await?
            .rows_affected();
            debug!(name = %group.name, removed = group.removed, "duplicate group collapsed");
        }
        tx.commit().await?;

        Ok(groups)
    }

    /// Delete every row whose name is in `names`. Returns rows removed.
    pub async fn delete_by_names(&self, names: &[String]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut removed = 0;
        for name in names {
            removed += sqlx::query("DELETE FROM players WHERE name = ?")
                .bind(name)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }
        tx.commit().await?;
        Ok(removed)
    }
}

async fn insert(conn: &mut SqliteConnection, player: &PlayerRecord) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO players (name, team, position, price, total_points, goals_scored, assists, minutes)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&player.name)
    .bind(&player.team)
    .bind(&player.position)
    .bind(player.price)
    .bind(player.total_points)
    .bind(player.goals_scored)
    .bind(player.assists)
    .bind(player.minutes)
    .execute(conn)
    .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;

    fn player(name: &str, team: &str, position: &str, goals: i64) -> PlayerRecord {
        PlayerRecord {
            name: name.to_string(),
            team: team.to_string(),
            position: position.to_string(),
            price: 5.5,
            total_points: goals * 5,
            goals_scored: goals,
            assists: 1,
            minutes: 900,
        }
    }

    async fn insert_raw(store: &PlayerStore, p: &PlayerRecord) {
        let mut conn = store.pool().acquire().await.unwrap();
        insert(&mut *conn, p).await.unwrap();
    }

    #[tokio::test]
    async fn upsert_inserts_then_overwrites() {
        let store = PlayerStore::new(memory_pool().await);

        let first = player("Mohamed Salah", "Liverpool", "Midfielder", 10);
        assert_eq!(store.upsert(&first).await.unwrap(), UpsertOutcome::Inserted);

        let mut second = first.clone();
        second.goals_scored = 12;
        second.price = 13.7;
        assert_eq!(store.upsert(&second).await.unwrap(), UpsertOutcome::Updated);

        let all = store.fetch_all().await.unwrap();
        assert_eq!(all, vec![second]);
    }

    #[tokio::test]
    async fn upsert_folds_existing_duplicates_into_one_row() {
        let store = PlayerStore::new(memory_pool().await);
        let stale = player("Ben White", "Arsenal", "Defender", 1);
        insert_raw(&store, &stale).await;
        insert_raw(&store, &stale).await;
        insert_raw(&store, &player("Other", "Arsenal", "Defender", 0)).await;

        let fresh = player("Ben White", "Arsenal", "Defender", 4);
        assert_eq!(store.upsert(&fresh).await.unwrap(), UpsertOutcome::Updated);

        assert!(store.find_duplicates().await.unwrap().is_empty());
        let all = store.fetch_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0], fresh);
    }

    #[tokio::test]
    async fn fetch_filtered_applies_equality_on_both_fields() {
        let store = PlayerStore::new(memory_pool().await);
        store.upsert(&player("A", "X", "M", 1)).await.unwrap();
        store.upsert(&player("B", "Y", "F", 2)).await.unwrap();
        store.upsert(&player("C", "X", "F", 3)).await.unwrap();

        let names = |v: Vec<PlayerRecord>| v.into_iter().map(|p| p.name).collect::<Vec<_>>();

        assert_eq!(names(store.fetch_filtered(Some("X"), None).await.unwrap()), ["A", "C"]);
        assert_eq!(names(store.fetch_filtered(Some("X"), Some("F")).await.unwrap()), ["C"]);
        assert_eq!(names(store.fetch_filtered(None, Some("F")).await.unwrap()), ["B", "C"]);
        assert_eq!(store.fetch_filtered(None, None).await.unwrap().len(), 3);
        assert!(store.fetch_filtered(Some("Z"), None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn remove_duplicates_keeps_oldest_row() {
        let store = PlayerStore::new(memory_pool().await);
        let original = player("Bukayo Saka", "Arsenal", "Midfielder", 5);
        let mut copy = original.clone();
        copy.goals_scored = 99;

        insert_raw(&store, &original).await;
        insert_raw(&store, &copy).await;
        insert_raw(&store, &copy).await;
        insert_raw(&store, &player("Solo", "Arsenal", "Defender", 0)).await;

        let dupes = store.find_duplicates().await.unwrap();
        assert_eq!(dupes.len(), 1);
        assert_eq!(dupes[0].count, 3);

        let removed = store.remove_duplicates().await.unwrap();
        assert_eq!(removed[0].removed, 2);
        assert!(store.find_duplicates().await.unwrap().is_empty());

        let all = store.fetch_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0], original);
    }

    #[tokio::test]
    async fn replace_all_mirrors_batch() {
        let store = PlayerStore::new(memory_pool().await);
        store.upsert(&player("Stale", "X", "M", 1)).await.unwrap();
        store.upsert(&player("Kept", "X", "M", 1)).await.unwrap();

        let batch = vec![player("Kept", "Y", "F", 4), player("New", "Y", "F", 2)];
        let removed = store.replace_all(&batch).await.unwrap();

        assert_eq!(removed, 2);
        assert_eq!(store.fetch_all().await.unwrap(), batch);
    }

    #[tokio::test]
    async fn delete_by_names_only_touches_listed_players() {
        let store = PlayerStore::new(memory_pool().await);
        store.upsert(&player("M. Salah", "X", "M", 1)).await.unwrap();
        store.upsert(&player("Real Player", "X", "M", 1)).await.unwrap();

        let removed = store
            .delete_by_names(&["M. Salah".to_string(), "Nobody".to_string()])
            .await
            .unwrap();

        assert_eq!(removed, 1);
        assert_eq!(store.count().await.unwrap(), 1);
    }
}
