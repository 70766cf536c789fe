//! Entity store for the rosters domain
//!
//! The domain talks to durable storage exclusively through [`RosterStore`].
//! Every mutating method is atomic: implementations execute the whole call
//! inside one transaction (or an equivalent serialized section) and re-guard
//! roster assignments so that two concurrent writers can never both claim
//! the same patient.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use carebase_common::RepositoryError;

use crate::domain::entities::{Group, Patient, StaffMember, Team, TeamSummary};
use crate::domain::roster::RosterPlan;

pub use memory::InMemoryRosterStore;
pub use postgres::PgRosterStore;

#[async_trait]
pub trait RosterStore: Send + Sync {
    // --- groups ---

    async fn insert_group(&self, group: &Group) -> Result<(), RepositoryError>;
    async fn update_group(&self, group: &Group) -> Result<(), RepositoryError>;
    /// Delete a group row. The caller is responsible for checking that no
    /// team still references it.
    async fn delete_group(&self, id: Uuid) -> Result<(), RepositoryError>;
    async fn find_group(&self, id: Uuid) -> Result<Option<Group>, RepositoryError>;
    async fn list_groups(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Group>, i64), RepositoryError>;
    async fn count_teams_in_group(&self, group_id: Uuid) -> Result<i64, RepositoryError>;

    // --- patients ---

    async fn insert_patient(&self, patient: &Patient) -> Result<(), RepositoryError>;
    /// Persist demographic fields. Never writes the team reference; roster
    /// membership moves only through [`RosterStore::apply_roster`] and
    /// friends.
    async fn update_patient(&self, patient: &Patient) -> Result<(), RepositoryError>;
    async fn delete_patient(&self, id: Uuid) -> Result<(), RepositoryError>;
    async fn find_patient(&self, id: Uuid) -> Result<Option<Patient>, RepositoryError>;
    /// Batch lookup; missing ids are simply absent from the result.
    async fn find_patients(&self, ids: &[Uuid]) -> Result<Vec<Patient>, RepositoryError>;
    async fn list_patients(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Patient>, i64), RepositoryError>;
    /// Current roster of a team, ordered by (last_name, name).
    async fn members_of(&self, team_id: Uuid) -> Result<Vec<Patient>, RepositoryError>;

    // --- teams ---

    async fn find_team(&self, id: Uuid) -> Result<Option<Team>, RepositoryError>;
    /// Page of teams in creation order, counts computed at read time.
    async fn list_teams(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<TeamSummary>, i64), RepositoryError>;
    async fn staff_of(&self, team_id: Uuid) -> Result<Vec<StaffMember>, RepositoryError>;

    /// Insert a team row and apply its initial roster in one transaction.
    /// If the plan cannot be applied the team row is never committed.
    async fn insert_team(&self, team: &Team, plan: &RosterPlan) -> Result<(), RepositoryError>;

    /// Persist team fields and, when a plan is supplied, the roster change,
    /// all in one transaction.
    async fn update_team(
        &self,
        team: &Team,
        plan: Option<&RosterPlan>,
    ) -> Result<(), RepositoryError>;

    /// Apply a roster plan atomically. Assignments are guarded: a patient
    /// claimed by any team since the plan was computed fails the whole call
    /// with [`RepositoryError::RosterConflict`] and nothing is applied.
    async fn apply_roster(&self, team_id: Uuid, plan: &RosterPlan) -> Result<(), RepositoryError>;

    /// Clear the team reference of every member. Idempotent; returns the
    /// number of patients released.
    async fn release_members(&self, team_id: Uuid) -> Result<u64, RepositoryError>;

    /// Delete a team row, detaching cascade-owned staff in the same
    /// transaction. Member patients must have been released first.
    async fn delete_team(&self, id: Uuid) -> Result<(), RepositoryError>;
}
