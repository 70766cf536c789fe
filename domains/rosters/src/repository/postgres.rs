//! PostgreSQL implementation of the roster store
//!
//! Queries are runtime-checked; every multi-row mutation runs inside a
//! single transaction. Roster assignments are re-guarded under the
//! transaction with a `team_id IS NULL` predicate and a rows-affected check,
//! so a plan computed from a stale read rolls back instead of stealing a
//! patient from whichever team claimed it first.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use carebase_common::{Error, RepositoryError, Result};

use crate::domain::entities::{Group, Patient, StaffMember, Team, TeamSummary};
use crate::domain::roster::RosterPlan;
use crate::repository::RosterStore;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

#[derive(Clone)]
pub struct PgRosterStore {
    pool: PgPool,
}

impl PgRosterStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to the database and build a store
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Run embedded schema migrations
    pub async fn migrate(&self) -> Result<()> {
        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| Error::Unexpected(e.into()))?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Map unique-constraint violations out of insert/update failures
fn constraint_error(e: sqlx::Error) -> RepositoryError {
    match e.as_database_error() {
        Some(db) if db.is_unique_violation() => {
            RepositoryError::UniqueViolation(db.message().to_string())
        }
        _ => RepositoryError::Connection(e),
    }
}

/// Apply a roster plan within an existing transaction.
///
/// Releases are unguarded (clearing an already-cleared reference is a
/// no-op); assignments require the patient to still be unassigned.
async fn apply_plan_tx(
    tx: &mut Transaction<'_, Postgres>,
    team_id: Uuid,
    plan: &RosterPlan,
) -> std::result::Result<(), RepositoryError> {
    if !plan.release.is_empty() {
        sqlx::query(
            r#"
            UPDATE patients
            SET team_id = NULL, updated_at = NOW()
            WHERE team_id = $1 AND id = ANY($2)
            "#,
        )
        .bind(team_id)
        .bind(plan.release.clone())
        .execute(&mut **tx)
        .await?;
    }

    if !plan.assign.is_empty() {
        let result = sqlx::query(
            r#"
            UPDATE patients
            SET team_id = $1, updated_at = NOW()
            WHERE id = ANY($2) AND team_id IS NULL
            "#,
        )
        .bind(team_id)
        .bind(plan.assign.clone())
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() != plan.assign.len() as u64 {
            return Err(RepositoryError::RosterConflict(format!(
                "one or more patients were claimed by another team while assigning to team {}",
                team_id
            )));
        }
    }

    Ok(())
}

#[async_trait]
impl RosterStore for PgRosterStore {
    async fn insert_group(&self, group: &Group) -> std::result::Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO groups (id, group_name, created_at, updated_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(group.id)
        .bind(&group.group_name)
        .bind(group.created_at)
        .bind(group.updated_at)
        .execute(&self.pool)
        .await
        .map_err(constraint_error)?;
        Ok(())
    }

    async fn update_group(&self, group: &Group) -> std::result::Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE groups
            SET group_name = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(group.id)
        .bind(&group.group_name)
        .execute(&self.pool)
        .await
        .map_err(constraint_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete_group(&self, id: Uuid) -> std::result::Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM groups WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn find_group(&self, id: Uuid) -> std::result::Result<Option<Group>, RepositoryError> {
        let row = sqlx::query_as::<_, Group>(
            r#"
            SELECT id, group_name, created_at, updated_at
            FROM groups
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_groups(
        &self,
        limit: i64,
        offset: i64,
    ) -> std::result::Result<(Vec<Group>, i64), RepositoryError> {
        let groups = sqlx::query_as::<_, Group>(
            r#"
            SELECT id, group_name, created_at, updated_at
            FROM groups
            ORDER BY created_at ASC, id ASC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM groups")
            .fetch_one(&self.pool)
            .await?;

        Ok((groups, total))
    }

    async fn count_teams_in_group(
        &self,
        group_id: Uuid,
    ) -> std::result::Result<i64, RepositoryError> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM teams WHERE group_id = $1")
                .bind(group_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn insert_patient(&self, patient: &Patient) -> std::result::Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO patients
                (id, document, name, last_name, gender, birthday, zone,
                 is_active, team_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(patient.id)
        .bind(&patient.document)
        .bind(&patient.name)
        .bind(&patient.last_name)
        .bind(patient.gender)
        .bind(patient.birthday)
        .bind(&patient.zone)
        .bind(patient.is_active)
        .bind(patient.team_id)
        .bind(patient.created_at)
        .bind(patient.updated_at)
        .execute(&self.pool)
        .await
        .map_err(constraint_error)?;
        Ok(())
    }

    async fn update_patient(&self, patient: &Patient) -> std::result::Result<(), RepositoryError> {
        // Demographic fields only: the team reference moves exclusively
        // through roster mutations.
        let result = sqlx::query(
            r#"
            UPDATE patients
            SET document = $2, name = $3, last_name = $4, gender = $5,
                birthday = $6, zone = $7, is_active = $8, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(patient.id)
        .bind(&patient.document)
        .bind(&patient.name)
        .bind(&patient.last_name)
        .bind(patient.gender)
        .bind(patient.birthday)
        .bind(&patient.zone)
        .bind(patient.is_active)
        .execute(&self.pool)
        .await
        .map_err(constraint_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete_patient(&self, id: Uuid) -> std::result::Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM patients WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn find_patient(
        &self,
        id: Uuid,
    ) -> std::result::Result<Option<Patient>, RepositoryError> {
        let row = sqlx::query_as::<_, Patient>(
            r#"
            SELECT id, document, name, last_name, gender, birthday, zone,
                   is_active, team_id, created_at, updated_at
            FROM patients
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_patients(
        &self,
        ids: &[Uuid],
    ) -> std::result::Result<Vec<Patient>, RepositoryError> {
        let rows = sqlx::query_as::<_, Patient>(
            r#"
            SELECT id, document, name, last_name, gender, birthday, zone,
                   is_active, team_id, created_at, updated_at
            FROM patients
            WHERE id = ANY($1)
            ORDER BY last_name ASC, name ASC
            "#,
        )
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn list_patients(
        &self,
        limit: i64,
        offset: i64,
    ) -> std::result::Result<(Vec<Patient>, i64), RepositoryError> {
        let patients = sqlx::query_as::<_, Patient>(
            r#"
            SELECT id, document, name, last_name, gender, birthday, zone,
                   is_active, team_id, created_at, updated_at
            FROM patients
            ORDER BY created_at ASC, id ASC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM patients")
            .fetch_one(&self.pool)
            .await?;

        Ok((patients, total))
    }

    async fn members_of(&self, team_id: Uuid) -> std::result::Result<Vec<Patient>, RepositoryError> {
        let rows = sqlx::query_as::<_, Patient>(
            r#"
            SELECT id, document, name, last_name, gender, birthday, zone,
                   is_active, team_id, created_at, updated_at
            FROM patients
            WHERE team_id = $1
            ORDER BY last_name ASC, name ASC
            "#,
        )
        .bind(team_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn find_team(&self, id: Uuid) -> std::result::Result<Option<Team>, RepositoryError> {
        let row = sqlx::query_as::<_, Team>(
            r#"
            SELECT id, team_name, group_id, created_at, updated_at
            FROM teams
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_teams(
        &self,
        limit: i64,
        offset: i64,
    ) -> std::result::Result<(Vec<TeamSummary>, i64), RepositoryError> {
        // Counts are subqueries over the live rows, never a stored column.
        let teams = sqlx::query_as::<_, TeamSummary>(
            r#"
            SELECT t.id, t.team_name, t.group_id, t.created_at,
                   (SELECT COUNT(*) FROM patients p WHERE p.team_id = t.id) AS patient_count,
                   (SELECT COUNT(*) FROM staff s WHERE s.team_id = t.id) AS staff_count
            FROM teams t
            ORDER BY t.created_at ASC, t.id ASC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM teams")
            .fetch_one(&self.pool)
            .await?;

        Ok((teams, total))
    }

    async fn staff_of(
        &self,
        team_id: Uuid,
    ) -> std::result::Result<Vec<StaffMember>, RepositoryError> {
        let rows = sqlx::query_as::<_, StaffMember>(
            r#"
            SELECT id, document, email, name, last_name, role,
                   is_active, team_id, created_at, updated_at
            FROM staff
            WHERE team_id = $1
            ORDER BY last_name ASC, name ASC
            "#,
        )
        .bind(team_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn insert_team(
        &self,
        team: &Team,
        plan: &RosterPlan,
    ) -> std::result::Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO teams (id, team_name, group_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(team.id)
        .bind(&team.team_name)
        .bind(team.group_id)
        .bind(team.created_at)
        .bind(team.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(constraint_error)?;

        apply_plan_tx(&mut tx, team.id, plan).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn update_team(
        &self,
        team: &Team,
        plan: Option<&RosterPlan>,
    ) -> std::result::Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE teams
            SET team_name = $2, group_id = $3, updated_at = $4
            WHERE id = $1
            "#,
        )
        .bind(team.id)
        .bind(&team.team_name)
        .bind(team.group_id)
        .bind(team.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(constraint_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        if let Some(plan) = plan {
            apply_plan_tx(&mut tx, team.id, plan).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn apply_roster(
        &self,
        team_id: Uuid,
        plan: &RosterPlan,
    ) -> std::result::Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        apply_plan_tx(&mut tx, team_id, plan).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn release_members(&self, team_id: Uuid) -> std::result::Result<u64, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE patients
            SET team_id = NULL, updated_at = NOW()
            WHERE team_id = $1
            "#,
        )
        .bind(team_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn delete_team(&self, id: Uuid) -> std::result::Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Staff are cascade-owned: detach them with the team. Patients must
        // already be released, enforced by the FK on patients.team_id.
        sqlx::query("UPDATE staff SET team_id = NULL, updated_at = NOW() WHERE team_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM teams WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;
        Ok(())
    }
}
