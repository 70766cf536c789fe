//! Membership invariant engine
//!
//! Owns every transition of a patient's team reference. Requests are
//! resolved and checked against the current state before anything is
//! written; the store re-guards the writes inside its transaction, so a
//! stale read can reject but never corrupt.

use std::sync::Arc;

use uuid::Uuid;

use carebase_common::Result;

use crate::domain::entities::{Group, Patient, TeamView};
use crate::domain::roster::{dedupe_ids, plan_roster, RosterError};
use crate::repository::RosterStore;
use crate::service::query;

pub struct AssignmentEngine<S> {
    store: Arc<S>,
}

impl<S> Clone for AssignmentEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: RosterStore> AssignmentEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Replace the roster of `team_id` with exactly `requested`.
    ///
    /// All-or-nothing: unresolved ids or cross-team conflicts fail the call
    /// before any row is touched. Returns the team with its resulting
    /// roster.
    pub async fn assign(&self, team_id: Uuid, requested: &[Uuid]) -> Result<TeamView> {
        let team = self
            .store
            .find_team(team_id)
            .await?
            .ok_or(RosterError::TeamNotFound(team_id))?;

        let patients = self.validate_patients(requested).await?;
        let current: Vec<Uuid> = self
            .store
            .members_of(team_id)
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect();

        let plan = plan_roster(team_id, &current, &patients).map_err(|err| {
            if let RosterError::Conflicts(conflicts) = &err {
                tracing::warn!(
                    %team_id,
                    conflicts = conflicts.len(),
                    "rejected roster assignment with cross-team conflicts"
                );
            }
            err
        })?;

        if !plan.is_noop() {
            self.store.apply_roster(team_id, &plan).await?;
            tracing::debug!(
                %team_id,
                assigned = plan.assign.len(),
                released = plan.release.len(),
                "applied roster plan"
            );
        }

        query::load_view(self.store.as_ref(), team).await
    }

    /// Clear the team reference of every patient currently on `team_id`.
    ///
    /// Idempotent: an empty roster or an unknown team id is a no-op success.
    pub async fn release(&self, team_id: Uuid) -> Result<()> {
        let released = self.store.release_members(team_id).await?;
        if released > 0 {
            tracing::debug!(%team_id, released, "released team roster");
        }
        Ok(())
    }

    /// Existence precondition for a referenced group
    pub async fn validate_group(&self, group_id: Uuid) -> Result<Group> {
        let group = self
            .store
            .find_group(group_id)
            .await?
            .ok_or(RosterError::GroupNotFound(group_id))?;
        Ok(group)
    }

    /// Existence precondition for a requested roster.
    ///
    /// Duplicate ids are collapsed; every unresolved id is reported.
    pub async fn validate_patients(&self, ids: &[Uuid]) -> Result<Vec<Patient>> {
        let ids = dedupe_ids(ids);
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let patients = self.store.find_patients(&ids).await?;
        if patients.len() != ids.len() {
            let missing: Vec<Uuid> = ids
                .iter()
                .copied()
                .filter(|id| !patients.iter().any(|p| p.id == *id))
                .collect();
            return Err(RosterError::MissingPatients(missing).into());
        }

        Ok(patients)
    }
}
