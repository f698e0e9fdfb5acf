use super::records::{MatchRecord, MatchRecordStatus, PlayerResultRow, PlayerStatsRow};
use super::traits::MatchStore;
use crate::error::{CoordinatorError, Result};
use crate::player::{
    ClassProfile, Player, PlayerId, PlayerRank, RankTier, TeamSide, WeaponClass,
};
use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};

/// Postgres relational store.
///
/// Bootstraps its own schema on connect and writes with upsert semantics
/// so settlement retries stay idempotent.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn new(connection_string: &str) -> Result<Self> {
        let pool = PgPool::connect(connection_string)
            .await
            .map_err(db_err)?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS players (
                id BIGINT PRIMARY KEY,
                display_name VARCHAR(64) NOT NULL,
                social_id VARCHAR(64),
                mmr INTEGER NOT NULL,
                rank_tier VARCHAR(32) NOT NULL,
                rank_points INTEGER NOT NULL,
                primary_class VARCHAR(16) NOT NULL,
                secondary_class VARCHAR(16) NOT NULL,
                banned_until BIGINT,
                created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_players_social_id
                ON players(social_id) WHERE social_id IS NOT NULL;
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS matches (
                match_id VARCHAR(32) PRIMARY KEY,
                map VARCHAR(64),
                room_id VARCHAR(16),
                host_id BIGINT,
                status VARCHAR(32) NOT NULL,
                started_at TIMESTAMP WITH TIME ZONE NOT NULL,
                ended_at TIMESTAMP WITH TIME ZONE,
                duration_seconds BIGINT,
                score_alpha INTEGER NOT NULL DEFAULT 0,
                score_bravo INTEGER NOT NULL DEFAULT 0,
                winner_team VARCHAR(8),
                end_reason VARCHAR(64)
            );

            CREATE INDEX IF NOT EXISTS idx_matches_status ON matches(status);
            CREATE INDEX IF NOT EXISTS idx_matches_started_at ON matches(started_at);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS match_players (
                match_id VARCHAR(32) NOT NULL,
                player_id BIGINT NOT NULL,
                team VARCHAR(8) NOT NULL,
                kills INTEGER NOT NULL DEFAULT 0,
                deaths INTEGER NOT NULL DEFAULT 0,
                assists INTEGER NOT NULL DEFAULT 0,
                headshots INTEGER NOT NULL DEFAULT 0,
                mmr_change INTEGER NOT NULL DEFAULT 0,
                placement_seeding_bonus INTEGER NOT NULL DEFAULT 0,
                abandoned BOOLEAN NOT NULL DEFAULT FALSE,
                confirmed_result BOOLEAN NOT NULL DEFAULT FALSE,
                confirmed_at TIMESTAMP WITH TIME ZONE,
                PRIMARY KEY (match_id, player_id)
            );

            CREATE INDEX IF NOT EXISTS idx_match_players_player ON match_players(player_id);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS player_stats (
                player_id BIGINT PRIMARY KEY,
                rank_tier VARCHAR(32) NOT NULL,
                rank_points INTEGER NOT NULL,
                elo_rating INTEGER NOT NULL,
                matches_played INTEGER NOT NULL DEFAULT 0,
                matches_won INTEGER NOT NULL DEFAULT 0,
                placement_completed BOOLEAN NOT NULL DEFAULT FALSE,
                last_match_at TIMESTAMP WITH TIME ZONE,
                updated_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    fn row_to_player(row: &PgRow) -> Result<Player> {
        let tier: String = row.try_get("rank_tier").map_err(db_err)?;
        let primary: String = row.try_get("primary_class").map_err(db_err)?;
        let secondary: String = row.try_get("secondary_class").map_err(db_err)?;
        let id: i64 = row.try_get("id").map_err(db_err)?;

        Ok(Player {
            id: PlayerId(id as u64),
            display_name: row.try_get("display_name").map_err(db_err)?,
            social_id: row.try_get("social_id").map_err(db_err)?,
            mmr: row.try_get("mmr").map_err(db_err)?,
            rank: PlayerRank {
                tier: parse_enum::<RankTier>(&tier)?,
                points: row.try_get("rank_points").map_err(db_err)?,
            },
            classes: ClassProfile {
                primary: parse_enum::<WeaponClass>(&primary)?,
                secondary: parse_enum::<WeaponClass>(&secondary)?,
            },
            banned_until: row.try_get("banned_until").map_err(db_err)?,
            created_at: row.try_get("created_at").map_err(db_err)?,
        })
    }

    fn row_to_match(row: &PgRow) -> Result<MatchRecord> {
        let status: String = row.try_get("status").map_err(db_err)?;
        let winner: Option<String> = row.try_get("winner_team").map_err(db_err)?;
        let host: Option<i64> = row.try_get("host_id").map_err(db_err)?;

        Ok(MatchRecord {
            match_id: row.try_get("match_id").map_err(db_err)?,
            map: row.try_get("map").map_err(db_err)?,
            room_id: row.try_get("room_id").map_err(db_err)?,
            host: host.map(|h| PlayerId(h as u64)),
            status: parse_enum::<MatchRecordStatus>(&status)?,
            started_at: row.try_get("started_at").map_err(db_err)?,
            ended_at: row.try_get("ended_at").map_err(db_err)?,
            duration_seconds: row.try_get("duration_seconds").map_err(db_err)?,
            score_alpha: row.try_get("score_alpha").map_err(db_err)?,
            score_bravo: row.try_get("score_bravo").map_err(db_err)?,
            winner_team: winner.map(|w| parse_enum::<TeamSide>(&w)).transpose()?,
            end_reason: row.try_get("end_reason").map_err(db_err)?,
        })
    }
}

fn db_err(e: impl std::fmt::Display) -> CoordinatorError {
    CoordinatorError::DatabaseError(e.to_string())
}

fn enum_str<T: serde::Serialize>(value: &T) -> Result<String> {
    let json = serde_json::to_string(value)?;
    Ok(json.trim_matches('"').to_string())
}

fn parse_enum<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T> {
    serde_json::from_str(&format!("\"{raw}\""))
        .map_err(|e| CoordinatorError::SerializationError(e.to_string()))
}

#[async_trait]
impl MatchStore for PostgresStore {
    async fn find_player(&self, id: PlayerId) -> Result<Option<Player>> {
        let row = sqlx::query("SELECT * FROM players WHERE id = $1")
            .bind(id.0 as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.map(|r| Self::row_to_player(&r)).transpose()
    }

    async fn find_player_by_social_id(&self, social_id: &str) -> Result<Option<Player>> {
        let row = sqlx::query("SELECT * FROM players WHERE social_id = $1")
            .bind(social_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.map(|r| Self::row_to_player(&r)).transpose()
    }

    async fn upsert_player(&self, player: &Player) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO players
                (id, display_name, social_id, mmr, rank_tier, rank_points,
                 primary_class, secondary_class, banned_until, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO UPDATE SET
                display_name = EXCLUDED.display_name,
                social_id = EXCLUDED.social_id,
                mmr = EXCLUDED.mmr,
                rank_tier = EXCLUDED.rank_tier,
                rank_points = EXCLUDED.rank_points,
                primary_class = EXCLUDED.primary_class,
                secondary_class = EXCLUDED.secondary_class,
                banned_until = EXCLUDED.banned_until
            "#,
        )
        .bind(player.id.0 as i64)
        .bind(&player.display_name)
        .bind(&player.social_id)
        .bind(player.mmr)
        .bind(enum_str(&player.rank.tier)?)
        .bind(player.rank.points)
        .bind(enum_str(&player.classes.primary)?)
        .bind(enum_str(&player.classes.secondary)?)
        .bind(player.banned_until)
        .bind(player.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn update_player_rating(&self, id: PlayerId, mmr: i32, rank: PlayerRank) -> Result<()> {
        sqlx::query(
            "UPDATE players SET mmr = $2, rank_tier = $3, rank_points = $4 WHERE id = $1",
        )
        .bind(id.0 as i64)
        .bind(mmr)
        .bind(enum_str(&rank.tier)?)
        .bind(rank.points)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn create_match(&self, record: &MatchRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO matches (match_id, map, status, started_at, score_alpha, score_bravo)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (match_id) DO NOTHING
            "#,
        )
        .bind(&record.match_id)
        .bind(&record.map)
        .bind(record.status.as_str())
        .bind(record.started_at)
        .bind(record.score_alpha)
        .bind(record.score_bravo)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn load_match(&self, match_id: &str) -> Result<Option<MatchRecord>> {
        let row = sqlx::query("SELECT * FROM matches WHERE match_id = $1")
            .bind(match_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.map(|r| Self::row_to_match(&r)).transpose()
    }

    async fn update_status(&self, match_id: &str, status: MatchRecordStatus) -> Result<()> {
        sqlx::query("UPDATE matches SET status = $2 WHERE match_id = $1")
            .bind(match_id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn set_map(&self, match_id: &str, map: &str) -> Result<()> {
        sqlx::query("UPDATE matches SET map = $2 WHERE match_id = $1")
            .bind(match_id)
            .bind(map)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn set_host(&self, match_id: &str, host: PlayerId) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE matches SET host_id = $2 WHERE match_id = $1 AND status = 'ready'",
        )
        .bind(match_id)
        .bind(host.0 as i64)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected() == 1)
    }

    async fn confirm_room(&self, match_id: &str, room_id: &str, map_number: u32) -> Result<()> {
        sqlx::query(
            "UPDATE matches SET status = 'in-progress', room_id = $2, map = COALESCE(map, $3) WHERE match_id = $1",
        )
        .bind(match_id)
        .bind(room_id)
        .bind(map_number.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn cancel_match(&self, match_id: &str, end_reason: &str) -> Result<()> {
        sqlx::query(
            "UPDATE matches SET status = 'cancelled', end_reason = $2, ended_at = NOW() WHERE match_id = $1",
        )
        .bind(match_id)
        .bind(end_reason)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn complete_match(
        &self,
        match_id: &str,
        winner: TeamSide,
        score_alpha: i32,
        score_bravo: i32,
        duration_seconds: i64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE matches
            SET status = 'completed', winner_team = $2, score_alpha = $3,
                score_bravo = $4, duration_seconds = $5, ended_at = NOW()
            WHERE match_id = $1
            "#,
        )
        .bind(match_id)
        .bind(enum_str(&winner)?)
        .bind(score_alpha)
        .bind(score_bravo)
        .bind(duration_seconds)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn insert_player_results(&self, rows: &[PlayerResultRow]) -> Result<()> {
        for row in rows {
            sqlx::query(
                r#"
                INSERT INTO match_players
                    (match_id, player_id, team, kills, deaths, assists, headshots,
                     mmr_change, placement_seeding_bonus, abandoned, confirmed_result, confirmed_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                ON CONFLICT (match_id, player_id) DO UPDATE SET
                    kills = EXCLUDED.kills,
                    deaths = EXCLUDED.deaths,
                    assists = EXCLUDED.assists,
                    headshots = EXCLUDED.headshots,
                    mmr_change = EXCLUDED.mmr_change,
                    abandoned = EXCLUDED.abandoned,
                    confirmed_result = EXCLUDED.confirmed_result,
                    confirmed_at = EXCLUDED.confirmed_at
                "#,
            )
            .bind(&row.match_id)
            .bind(row.player_id.0 as i64)
            .bind(enum_str(&row.team)?)
            .bind(row.kills as i32)
            .bind(row.deaths as i32)
            .bind(row.assists as i32)
            .bind(row.headshots as i32)
            .bind(row.mmr_change)
            .bind(row.placement_seeding_bonus)
            .bind(row.abandoned)
            .bind(row.confirmed_result)
            .bind(row.confirmed_at)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        }
        Ok(())
    }

    async fn load_player_stats(&self, id: PlayerId) -> Result<Option<PlayerStatsRow>> {
        let row = sqlx::query("SELECT * FROM player_stats WHERE player_id = $1")
            .bind(id.0 as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.map(|r| {
            let tier: String = r.try_get("rank_tier").map_err(db_err)?;
            let played: i32 = r.try_get("matches_played").map_err(db_err)?;
            let won: i32 = r.try_get("matches_won").map_err(db_err)?;
            Ok(PlayerStatsRow {
                player_id: id,
                rank_tier: parse_enum(&tier)?,
                rank_points: r.try_get("rank_points").map_err(db_err)?,
                elo_rating: r.try_get("elo_rating").map_err(db_err)?,
                matches_played: played as u32,
                matches_won: won as u32,
                placement_completed: r.try_get("placement_completed").map_err(db_err)?,
                last_match_at: r.try_get("last_match_at").map_err(db_err)?,
                updated_at: r.try_get("updated_at").map_err(db_err)?,
            })
        })
        .transpose()
    }

    async fn upsert_player_stats(&self, stats: &PlayerStatsRow) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO player_stats
                (player_id, rank_tier, rank_points, elo_rating, matches_played,
                 matches_won, placement_completed, last_match_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (player_id) DO UPDATE SET
                rank_tier = EXCLUDED.rank_tier,
                rank_points = EXCLUDED.rank_points,
                elo_rating = EXCLUDED.elo_rating,
                matches_played = EXCLUDED.matches_played,
                matches_won = EXCLUDED.matches_won,
                placement_completed = EXCLUDED.placement_completed,
                last_match_at = EXCLUDED.last_match_at,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(stats.player_id.0 as i64)
        .bind(enum_str(&stats.rank_tier)?)
        .bind(stats.rank_points)
        .bind(stats.elo_rating)
        .bind(stats.matches_played as i32)
        .bind(stats.matches_won as i32)
        .bind(stats.placement_completed)
        .bind(stats.last_match_at)
        .bind(stats.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }
}
