//! Team lifecycle operations
//!
//! The externally-callable surface gluing validation and the assignment
//! engine into atomic operations. A team is created with its initial roster
//! in one store transaction, re-rostered through the engine, and removed by
//! releasing every member before the row is deleted.

use std::sync::Arc;

use serde::Deserialize;
use uuid::Uuid;

use carebase_common::{Error, Result};

use crate::domain::entities::{Team, TeamView};
use crate::domain::roster::{plan_roster, RosterError};
use crate::repository::RosterStore;
use crate::service::assignment::AssignmentEngine;
use crate::service::query;

/// Request for creating a new team
#[derive(Debug, Clone, Deserialize)]
pub struct NewTeam {
    pub team_name: String,
    pub group_id: Uuid,
    /// Initial roster; may be empty
    #[serde(default)]
    pub patient_ids: Vec<Uuid>,
}

/// Request for updating a team.
///
/// `patient_ids` distinguishes "omitted" (leave the roster unchanged) from
/// "present but empty" (clear the roster).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTeam {
    pub team_name: Option<String>,
    pub group_id: Option<Uuid>,
    pub patient_ids: Option<Vec<Uuid>>,
}

impl UpdateTeam {
    pub fn is_empty(&self) -> bool {
        self.team_name.is_none() && self.group_id.is_none() && self.patient_ids.is_none()
    }
}

pub struct TeamService<S> {
    store: Arc<S>,
    engine: AssignmentEngine<S>,
}

impl<S> Clone for TeamService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            engine: self.engine.clone(),
        }
    }
}

impl<S: RosterStore> TeamService<S> {
    pub fn new(store: Arc<S>) -> Self {
        let engine = AssignmentEngine::new(Arc::clone(&store));
        Self { store, engine }
    }

    /// Create a team with an optional initial roster.
    ///
    /// The team row and the roster are committed together: a conflicting
    /// roster means no team exists afterwards.
    pub async fn create(&self, new_team: NewTeam) -> Result<TeamView> {
        let group = self.engine.validate_group(new_team.group_id).await?;
        let patients = self.engine.validate_patients(&new_team.patient_ids).await?;

        let team = Team::new(new_team.team_name, group.id)?;
        let plan = plan_roster(team.id, &[], &patients)?;

        self.store.insert_team(&team, &plan).await?;
        tracing::info!(team_id = %team.id, members = plan.assign.len(), "team created");

        query::load_view(self.store.as_ref(), team).await
    }

    /// Update a team's name, group, and/or roster.
    pub async fn update(&self, team_id: Uuid, update: UpdateTeam) -> Result<TeamView> {
        if update.is_empty() {
            return Err(Error::Validation("Send data to update".to_string()));
        }

        let mut team = self
            .store
            .find_team(team_id)
            .await?
            .ok_or(RosterError::TeamNotFound(team_id))?;

        if let Some(group_id) = update.group_id {
            let group = self.engine.validate_group(group_id).await?;
            team.group_id = group.id;
        }

        if let Some(team_name) = update.team_name {
            team.rename(team_name)?;
        }

        let plan = match update.patient_ids {
            Some(ids) => {
                let patients = self.engine.validate_patients(&ids).await?;
                let current: Vec<Uuid> = self
                    .store
                    .members_of(team_id)
                    .await?
                    .into_iter()
                    .map(|p| p.id)
                    .collect();
                Some(plan_roster(team_id, &current, &patients)?)
            }
            None => None,
        };

        team.updated_at = chrono::Utc::now();
        self.store.update_team(&team, plan.as_ref()).await?;

        query::load_view(self.store.as_ref(), team).await
    }

    /// Remove a team.
    ///
    /// Every member patient is released first, then the row is deleted, so
    /// no patient is ever left pointing at a team that no longer resolves.
    pub async fn remove(&self, team_id: Uuid) -> Result<()> {
        let team = self
            .store
            .find_team(team_id)
            .await?
            .ok_or(RosterError::TeamNotFound(team_id))?;

        self.engine.release(team.id).await?;
        self.store.delete_team(team.id).await?;
        tracing::info!(%team_id, "team removed");
        Ok(())
    }
}
