//! Read-side roster projections

use std::sync::Arc;

use uuid::Uuid;

use carebase_common::{Error, Pagination, Result};

use crate::domain::entities::{Team, TeamSummary, TeamView};
use crate::domain::roster::RosterError;
use crate::repository::RosterStore;

pub struct RosterQuery<S> {
    store: Arc<S>,
}

impl<S> Clone for RosterQuery<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: RosterStore> RosterQuery<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Page of teams in creation order with live roster counts
    pub async fn list(&self, pagination: Pagination) -> Result<(Vec<TeamSummary>, i64)> {
        let (teams, total) = self
            .store
            .list_teams(pagination.limit(), pagination.offset())
            .await?;
        Ok((teams, total))
    }

    /// Single team with populated group, roster, and staff
    pub async fn get_by_id(&self, team_id: Uuid) -> Result<TeamView> {
        let team = self
            .store
            .find_team(team_id)
            .await?
            .ok_or(RosterError::TeamNotFound(team_id))?;
        load_view(self.store.as_ref(), team).await
    }
}

/// Populate a team row into its detail view
pub(crate) async fn load_view<S: RosterStore>(store: &S, team: Team) -> Result<TeamView> {
    let group = store.find_group(team.group_id).await?.ok_or_else(|| {
        Error::Internal(format!(
            "team {} references missing group {}",
            team.id, team.group_id
        ))
    })?;
    let patients = store.members_of(team.id).await?;
    let staff = store.staff_of(team.id).await?;

    Ok(TeamView {
        id: team.id,
        team_name: team.team_name,
        group,
        patients,
        staff,
        created_at: team.created_at,
        updated_at: team.updated_at,
    })
}
