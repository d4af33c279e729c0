//! PostgreSQL implementation of the persistence port.
//!
//! Reviewer lists are stored one row per slot in `pr_reviewers` and read
//! back with an `ARRAY(...)` subquery ordered by slot, so every pull
//! request query returns the full reviewer list in a single round trip.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool, Postgres, Transaction};
use tracing::debug;

use super::{
    PullRequestRepository, StorageHealth, StorageResult, TeamRepository, UserRepository,
};
use crate::models::{PullRequest, PullRequestStatus, Team, TeamId, TeamMember, User, MAX_REVIEWERS};

/// PostgreSQL store implementing every repository trait.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TeamRepository for PgStore {
    async fn exists(&self, name: &str) -> StorageResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM teams WHERE name = $1)")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    async fn create(&self, name: &str) -> StorageResult<TeamId> {
        let id: TeamId = sqlx::query_scalar("INSERT INTO teams (name) VALUES ($1) RETURNING id")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;

        Ok(id)
    }

    async fn get_by_name(&self, name: &str) -> StorageResult<Option<Team>> {
        let team = sqlx::query_as::<_, Team>("SELECT id, name FROM teams WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        let Some(mut team) = team else {
            return Ok(None);
        };

        team.members = sqlx::query_as::<_, TeamMember>(
            r#"
            SELECT id AS user_id, username, is_active
            FROM users
            WHERE team_id = $1
            ORDER BY id
            "#,
        )
        .bind(team.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(team))
    }

    async fn get_by_id(&self, id: TeamId) -> StorageResult<Option<Team>> {
        let team = sqlx::query_as::<_, Team>("SELECT id, name FROM teams WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(team)
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn upsert_many(&self, team_id: TeamId, members: &[TeamMember]) -> StorageResult<()> {
        let mut tx = self.pool.begin().await?;

        for member in members {
            sqlx::query(
                r#"
                INSERT INTO users (id, username, is_active, team_id)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (id) DO UPDATE
                SET username = EXCLUDED.username,
                    is_active = EXCLUDED.is_active,
                    team_id = EXCLUDED.team_id
                "#,
            )
            .bind(&member.user_id)
            .bind(&member.username)
            .bind(member.is_active)
            .bind(team_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(team_id, count = members.len(), "Upserted team members");
        Ok(())
    }

    async fn get_active_in_team_excluding(
        &self,
        team_id: TeamId,
        exclude_id: &str,
    ) -> StorageResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT u.id, u.username, u.is_active, u.team_id, t.name AS team_name
            FROM users u
            JOIN teams t ON t.id = u.team_id
            WHERE u.team_id = $1 AND u.is_active = TRUE AND u.id <> $2
            ORDER BY u.id
            "#,
        )
        .bind(team_id)
        .bind(exclude_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn get_team_id_by_user(&self, user_id: &str) -> StorageResult<Option<TeamId>> {
        let team_id: Option<TeamId> = sqlx::query_scalar("SELECT team_id FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(team_id)
    }

    async fn get_team_by_user(&self, user_id: &str) -> StorageResult<Option<Team>> {
        let team = sqlx::query_as::<_, Team>(
            r#"
            SELECT t.id, t.name
            FROM teams t
            JOIN users u ON u.team_id = t.id
            WHERE u.id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(team)
    }

    async fn deactivate_many(&self, user_ids: &[String]) -> StorageResult<u64> {
        if user_ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query("UPDATE users SET is_active = FALSE WHERE id = ANY($1)")
            .bind(user_ids)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn set_active(&self, user_id: &str, is_active: bool) -> StorageResult<bool> {
        let result = sqlx::query("UPDATE users SET is_active = $1 WHERE id = $2")
            .bind(is_active)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_by_id(&self, user_id: &str) -> StorageResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT u.id, u.username, u.is_active, u.team_id, t.name AS team_name
            FROM users u
            JOIN teams t ON t.id = u.team_id
            WHERE u.id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}

#[async_trait]
impl PullRequestRepository for PgStore {
    async fn create(&self, pr: &PullRequest) -> StorageResult<()> {
        insert_pull_request(&self.pool, pr).await
    }

    async fn create_with_reviewers(&self, pr: &PullRequest) -> StorageResult<()> {
        let mut tx = self.pool.begin().await?;

        insert_pull_request(&mut *tx, pr).await?;
        insert_reviewers(&mut tx, &pr.id, &pr.assigned_reviewers).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> StorageResult<Option<PullRequest>> {
        let pr = sqlx::query_as::<_, PullRequest>(
            r#"
            SELECT pr.id, pr.title, pr.author_id, pr.status, pr.created_at, pr.merged_at,
                   ARRAY(SELECT r.reviewer_id FROM pr_reviewers r
                         WHERE r.pr_id = pr.id ORDER BY r.slot) AS assigned_reviewers
            FROM pull_requests pr
            WHERE pr.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(pr)
    }

    async fn assign_reviewers(&self, pr_id: &str, reviewer_ids: &[String]) -> StorageResult<()> {
        if reviewer_ids.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        insert_reviewers(&mut tx, pr_id, reviewer_ids).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn merge(&self, pr_id: &str, merged_at: DateTime<Utc>) -> StorageResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE pull_requests
            SET status = 'MERGED', merged_at = $1
            WHERE id = $2 AND status = 'OPEN'
            "#,
        )
        .bind(merged_at)
        .bind(pr_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_reviewers(&self, pr_id: &str) -> StorageResult<Vec<String>> {
        let reviewers: Vec<String> =
            sqlx::query_scalar("SELECT reviewer_id FROM pr_reviewers WHERE pr_id = $1 ORDER BY slot")
                .bind(pr_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(reviewers)
    }

    async fn replace_reviewer(
        &self,
        pr_id: &str,
        old_id: &str,
        new_id: &str,
    ) -> StorageResult<bool> {
        let mut tx = self.pool.begin().await?;

        // Serializes reassignments and merges of the same pull request
        let status: Option<PullRequestStatus> =
            sqlx::query_scalar("SELECT status FROM pull_requests WHERE id = $1 FOR UPDATE")
                .bind(pr_id)
                .fetch_optional(&mut *tx)
                .await?;

        if status != Some(PullRequestStatus::Open) {
            tx.rollback().await?;
            return Ok(false);
        }

        let result = sqlx::query(
            "UPDATE pr_reviewers SET reviewer_id = $3 WHERE pr_id = $1 AND reviewer_id = $2",
        )
        .bind(pr_id)
        .bind(old_id)
        .bind(new_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn get_by_reviewer(&self, reviewer_id: &str) -> StorageResult<Vec<PullRequest>> {
        let prs = sqlx::query_as::<_, PullRequest>(
            r#"
            SELECT pr.id, pr.title, pr.author_id, pr.status, pr.created_at, pr.merged_at,
                   ARRAY(SELECT r.reviewer_id FROM pr_reviewers r
                         WHERE r.pr_id = pr.id ORDER BY r.slot) AS assigned_reviewers
            FROM pull_requests pr
            JOIN pr_reviewers prr ON prr.pr_id = pr.id
            WHERE prr.reviewer_id = $1
            ORDER BY pr.created_at, pr.id
            "#,
        )
        .bind(reviewer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(prs)
    }

    async fn get_review_counts(&self) -> StorageResult<BTreeMap<String, i64>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT reviewer_id, COUNT(*)
            FROM pr_reviewers
            GROUP BY reviewer_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().collect())
    }

    async fn get_open_by_reviewers(&self, user_ids: &[String]) -> StorageResult<Vec<PullRequest>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let prs = sqlx::query_as::<_, PullRequest>(
            r#"
            SELECT pr.id, pr.title, pr.author_id, pr.status, pr.created_at, pr.merged_at,
                   ARRAY(SELECT r.reviewer_id FROM pr_reviewers r
                         WHERE r.pr_id = pr.id ORDER BY r.slot) AS assigned_reviewers
            FROM pull_requests pr
            WHERE pr.status = 'OPEN'
              AND EXISTS (
                  SELECT 1 FROM pr_reviewers r
                  WHERE r.pr_id = pr.id AND r.reviewer_id = ANY($1)
              )
            ORDER BY pr.created_at, pr.id
            "#,
        )
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(prs)
    }
}

async fn insert_pull_request<'e, E>(executor: E, pr: &PullRequest) -> StorageResult<()>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO pull_requests (id, title, author_id, status, created_at, merged_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(&pr.id)
    .bind(&pr.title)
    .bind(&pr.author_id)
    .bind(pr.status)
    .bind(pr.created_at)
    .bind(pr.merged_at)
    .execute(executor)
    .await?;

    Ok(())
}

/// Writes reviewer slots 0.. for at most `MAX_REVIEWERS` IDs.
async fn insert_reviewers(
    tx: &mut Transaction<'_, Postgres>,
    pr_id: &str,
    reviewer_ids: &[String],
) -> StorageResult<()> {
    for (slot, reviewer_id) in reviewer_ids.iter().take(MAX_REVIEWERS).enumerate() {
        sqlx::query("INSERT INTO pr_reviewers (pr_id, reviewer_id, slot) VALUES ($1, $2, $3)")
            .bind(pr_id)
            .bind(reviewer_id)
            .bind(slot as i16)
            .execute(&mut **tx)
            .await?;
    }

    Ok(())
}

#[async_trait]
impl StorageHealth for PgStore {
    async fn ping(&self) -> StorageResult<()> {
        crate::db::pool::health_check(&self.pool).await?;
        Ok(())
    }
}
