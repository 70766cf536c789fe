//! Group registry operations

use std::sync::Arc;

use serde::Deserialize;
use uuid::Uuid;

use carebase_common::{Error, Pagination, Result};

use crate::domain::entities::Group;
use crate::domain::roster::RosterError;
use crate::repository::RosterStore;

/// Request for creating a group
#[derive(Debug, Clone, Deserialize)]
pub struct NewGroup {
    pub group_name: String,
}

/// Request for updating a group
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateGroup {
    pub group_name: Option<String>,
}

impl UpdateGroup {
    pub fn is_empty(&self) -> bool {
        self.group_name.is_none()
    }
}

pub struct GroupService<S> {
    store: Arc<S>,
}

impl<S> Clone for GroupService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: RosterStore> GroupService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn create(&self, new_group: NewGroup) -> Result<Group> {
        let group = Group::new(new_group.group_name)?;
        self.store.insert_group(&group).await?;
        tracing::info!(group_id = %group.id, "group created");
        Ok(group)
    }

    pub async fn list(&self, pagination: Pagination) -> Result<(Vec<Group>, i64)> {
        let (groups, total) = self
            .store
            .list_groups(pagination.limit(), pagination.offset())
            .await?;
        Ok((groups, total))
    }

    pub async fn get(&self, id: Uuid) -> Result<Group> {
        let group = self
            .store
            .find_group(id)
            .await?
            .ok_or(RosterError::GroupNotFound(id))?;
        Ok(group)
    }

    pub async fn update(&self, id: Uuid, update: UpdateGroup) -> Result<Group> {
        if update.is_empty() {
            return Err(Error::Validation("Send data to update".to_string()));
        }

        let mut group = self.get(id).await?;
        if let Some(group_name) = update.group_name {
            group.rename(group_name)?;
        }

        self.store.update_group(&group).await?;
        Ok(group)
    }

    /// Remove a group. Rejected while any team still references it, so a
    /// team can never be left pointing at a missing group.
    pub async fn remove(&self, id: Uuid) -> Result<()> {
        let group = self.get(id).await?;

        let teams = self.store.count_teams_in_group(group.id).await?;
        if teams > 0 {
            return Err(Error::Conflict(format!(
                "Group {} still has {} team(s) assigned",
                group.id, teams
            )));
        }

        self.store.delete_group(group.id).await?;
        tracing::info!(group_id = %id, "group removed");
        Ok(())
    }
}
