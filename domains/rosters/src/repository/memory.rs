//! In-memory roster store
//!
//! Backs tests and local development without a database. One mutex
//! serializes every call, which gives each operation the same atomicity the
//! PostgreSQL implementation gets from a transaction; roster assignments go
//! through the same unassigned-only guard.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use carebase_common::RepositoryError;

use crate::domain::entities::{Group, Patient, StaffMember, Team, TeamSummary};
use crate::domain::roster::RosterPlan;
use crate::repository::RosterStore;

#[derive(Debug, Default)]
struct Inner {
    groups: HashMap<Uuid, Group>,
    teams: HashMap<Uuid, Team>,
    patients: HashMap<Uuid, Patient>,
    staff: HashMap<Uuid, StaffMember>,
}

#[derive(Debug, Default)]
pub struct InMemoryRosterStore {
    inner: Mutex<Inner>,
}

impl InMemoryRosterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a staff member. Staff rows are owned by the (out of scope)
    /// staff lifecycle; tests insert them directly.
    pub fn add_staff(&self, staff: StaffMember) {
        self.lock().staff.insert(staff.id, staff);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("roster store mutex poisoned")
    }
}

/// Check a plan against current state and apply it. Mirrors the guarded
/// UPDATE of the PostgreSQL store: every assigned patient must exist and be
/// unassigned, otherwise nothing is applied.
fn apply_plan_locked(
    inner: &mut Inner,
    team_id: Uuid,
    plan: &RosterPlan,
) -> Result<(), RepositoryError> {
    for id in &plan.assign {
        match inner.patients.get(id) {
            Some(p) if p.team_id.is_none() => {}
            _ => {
                return Err(RepositoryError::RosterConflict(format!(
                    "one or more patients were claimed by another team while assigning to team {}",
                    team_id
                )));
            }
        }
    }

    for id in &plan.release {
        if let Some(p) = inner.patients.get_mut(id) {
            if p.team_id == Some(team_id) {
                p.team_id = None;
            }
        }
    }
    for id in &plan.assign {
        if let Some(p) = inner.patients.get_mut(id) {
            p.team_id = Some(team_id);
        }
    }

    Ok(())
}

fn page<T: Clone>(rows: Vec<T>, limit: i64, offset: i64) -> (Vec<T>, i64) {
    let total = rows.len() as i64;
    let page = rows
        .into_iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect();
    (page, total)
}

fn by_member_name(a: &Patient, b: &Patient) -> std::cmp::Ordering {
    (a.last_name.as_str(), a.name.as_str()).cmp(&(b.last_name.as_str(), b.name.as_str()))
}

#[async_trait]
impl RosterStore for InMemoryRosterStore {
    async fn insert_group(&self, group: &Group) -> Result<(), RepositoryError> {
        let mut inner = self.lock();
        if inner
            .groups
            .values()
            .any(|g| g.group_name == group.group_name)
        {
            return Err(RepositoryError::UniqueViolation(format!(
                "groups.group_name: {}",
                group.group_name
            )));
        }
        inner.groups.insert(group.id, group.clone());
        Ok(())
    }

    async fn update_group(&self, group: &Group) -> Result<(), RepositoryError> {
        let mut inner = self.lock();
        if !inner.groups.contains_key(&group.id) {
            return Err(RepositoryError::NotFound);
        }
        if inner
            .groups
            .values()
            .any(|g| g.id != group.id && g.group_name == group.group_name)
        {
            return Err(RepositoryError::UniqueViolation(format!(
                "groups.group_name: {}",
                group.group_name
            )));
        }
        inner.groups.insert(group.id, group.clone());
        Ok(())
    }

    async fn delete_group(&self, id: Uuid) -> Result<(), RepositoryError> {
        let mut inner = self.lock();
        inner
            .groups
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn find_group(&self, id: Uuid) -> Result<Option<Group>, RepositoryError> {
        Ok(self.lock().groups.get(&id).cloned())
    }

    async fn list_groups(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Group>, i64), RepositoryError> {
        let mut groups: Vec<Group> = self.lock().groups.values().cloned().collect();
        groups.sort_by_key(|g| (g.created_at, g.id));
        Ok(page(groups, limit, offset))
    }

    async fn count_teams_in_group(&self, group_id: Uuid) -> Result<i64, RepositoryError> {
        let count = self
            .lock()
            .teams
            .values()
            .filter(|t| t.group_id == group_id)
            .count();
        Ok(count as i64)
    }

    async fn insert_patient(&self, patient: &Patient) -> Result<(), RepositoryError> {
        let mut inner = self.lock();
        if inner
            .patients
            .values()
            .any(|p| p.document == patient.document)
        {
            return Err(RepositoryError::UniqueViolation(format!(
                "patients.document: {}",
                patient.document
            )));
        }
        inner.patients.insert(patient.id, patient.clone());
        Ok(())
    }

    async fn update_patient(&self, patient: &Patient) -> Result<(), RepositoryError> {
        let mut inner = self.lock();
        let stored_team = match inner.patients.get(&patient.id) {
            Some(stored) => stored.team_id,
            None => return Err(RepositoryError::NotFound),
        };
        if inner
            .patients
            .values()
            .any(|p| p.id != patient.id && p.document == patient.document)
        {
            return Err(RepositoryError::UniqueViolation(format!(
                "patients.document: {}",
                patient.document
            )));
        }
        // Demographic update never moves the team reference
        let mut updated = patient.clone();
        updated.team_id = stored_team;
        inner.patients.insert(updated.id, updated);
        Ok(())
    }

    async fn delete_patient(&self, id: Uuid) -> Result<(), RepositoryError> {
        let mut inner = self.lock();
        inner
            .patients
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn find_patient(&self, id: Uuid) -> Result<Option<Patient>, RepositoryError> {
        Ok(self.lock().patients.get(&id).cloned())
    }

    async fn find_patients(&self, ids: &[Uuid]) -> Result<Vec<Patient>, RepositoryError> {
        let inner = self.lock();
        let mut rows: Vec<Patient> = ids
            .iter()
            .filter_map(|id| inner.patients.get(id).cloned())
            .collect();
        rows.sort_by(by_member_name);
        Ok(rows)
    }

    async fn list_patients(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Patient>, i64), RepositoryError> {
        let mut patients: Vec<Patient> = self.lock().patients.values().cloned().collect();
        patients.sort_by_key(|p| (p.created_at, p.id));
        Ok(page(patients, limit, offset))
    }

    async fn members_of(&self, team_id: Uuid) -> Result<Vec<Patient>, RepositoryError> {
        let mut rows: Vec<Patient> = self
            .lock()
            .patients
            .values()
            .filter(|p| p.team_id == Some(team_id))
            .cloned()
            .collect();
        rows.sort_by(by_member_name);
        Ok(rows)
    }

    async fn find_team(&self, id: Uuid) -> Result<Option<Team>, RepositoryError> {
        Ok(self.lock().teams.get(&id).cloned())
    }

    async fn list_teams(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<TeamSummary>, i64), RepositoryError> {
        let inner = self.lock();
        let mut teams: Vec<Team> = inner.teams.values().cloned().collect();
        teams.sort_by_key(|t| (t.created_at, t.id));

        let summaries: Vec<TeamSummary> = teams
            .into_iter()
            .map(|t| {
                let patient_count = inner
                    .patients
                    .values()
                    .filter(|p| p.team_id == Some(t.id))
                    .count() as i64;
                let staff_count = inner
                    .staff
                    .values()
                    .filter(|s| s.team_id == Some(t.id))
                    .count() as i64;
                TeamSummary {
                    id: t.id,
                    team_name: t.team_name,
                    group_id: t.group_id,
                    patient_count,
                    staff_count,
                    created_at: t.created_at,
                }
            })
            .collect();

        Ok(page(summaries, limit, offset))
    }

    async fn staff_of(&self, team_id: Uuid) -> Result<Vec<StaffMember>, RepositoryError> {
        let mut rows: Vec<StaffMember> = self
            .lock()
            .staff
            .values()
            .filter(|s| s.team_id == Some(team_id))
            .cloned()
            .collect();
        rows.sort_by_key(|s| (s.last_name.clone(), s.name.clone()));
        Ok(rows)
    }

    async fn insert_team(&self, team: &Team, plan: &RosterPlan) -> Result<(), RepositoryError> {
        let mut inner = self.lock();
        if inner.teams.values().any(|t| t.team_name == team.team_name) {
            return Err(RepositoryError::UniqueViolation(format!(
                "teams.team_name: {}",
                team.team_name
            )));
        }
        // Guard the roster before touching anything so a conflicting plan
        // leaves no team row behind.
        apply_plan_locked(&mut inner, team.id, plan)?;
        inner.teams.insert(team.id, team.clone());
        Ok(())
    }

    async fn update_team(
        &self,
        team: &Team,
        plan: Option<&RosterPlan>,
    ) -> Result<(), RepositoryError> {
        let mut inner = self.lock();
        if !inner.teams.contains_key(&team.id) {
            return Err(RepositoryError::NotFound);
        }
        if inner
            .teams
            .values()
            .any(|t| t.id != team.id && t.team_name == team.team_name)
        {
            return Err(RepositoryError::UniqueViolation(format!(
                "teams.team_name: {}",
                team.team_name
            )));
        }
        if let Some(plan) = plan {
            apply_plan_locked(&mut inner, team.id, plan)?;
        }
        inner.teams.insert(team.id, team.clone());
        Ok(())
    }

    async fn apply_roster(&self, team_id: Uuid, plan: &RosterPlan) -> Result<(), RepositoryError> {
        let mut inner = self.lock();
        apply_plan_locked(&mut inner, team_id, plan)
    }

    async fn release_members(&self, team_id: Uuid) -> Result<u64, RepositoryError> {
        let mut inner = self.lock();
        let mut released = 0;
        for patient in inner.patients.values_mut() {
            if patient.team_id == Some(team_id) {
                patient.team_id = None;
                released += 1;
            }
        }
        Ok(released)
    }

    async fn delete_team(&self, id: Uuid) -> Result<(), RepositoryError> {
        let mut inner = self.lock();
        if inner.patients.values().any(|p| p.team_id == Some(id)) {
            // Parity with the FK on patients.team_id: members must be
            // released before the team row goes away.
            return Err(RepositoryError::InvalidData(format!(
                "team {} still has assigned patients",
                id
            )));
        }
        if inner.teams.remove(&id).is_none() {
            return Err(RepositoryError::NotFound);
        }
        for staff in inner.staff.values_mut() {
            if staff.team_id == Some(id) {
                staff.team_id = None;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Gender;
    use chrono::NaiveDate;

    fn group(name: &str) -> Group {
        Group::new(name.to_string()).unwrap()
    }

    fn patient(document: &str) -> Patient {
        Patient::new(
            document.to_string(),
            "Ana".to_string(),
            "Suarez".to_string(),
            Gender::Female,
            NaiveDate::from_ymd_opt(1990, 4, 12).unwrap(),
            "north".to_string(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_duplicate_group_name_rejected() {
        let store = InMemoryRosterStore::new();
        store.insert_group(&group("Zone North")).await.unwrap();
        let err = store.insert_group(&group("Zone North")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::UniqueViolation(_)));
    }

    #[tokio::test]
    async fn test_duplicate_team_name_rejected() {
        let store = InMemoryRosterStore::new();
        let g = group("Zone North");
        store.insert_group(&g).await.unwrap();

        let t1 = Team::new("Team A".to_string(), g.id).unwrap();
        let t2 = Team::new("Team A".to_string(), g.id).unwrap();
        store.insert_team(&t1, &RosterPlan::default()).await.unwrap();
        let err = store
            .insert_team(&t2, &RosterPlan::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::UniqueViolation(_)));
    }

    #[tokio::test]
    async fn test_assign_guard_rejects_claimed_patient() {
        let store = InMemoryRosterStore::new();
        let g = group("Zone North");
        store.insert_group(&g).await.unwrap();

        let team_a = Team::new("Team A".to_string(), g.id).unwrap();
        let team_b = Team::new("Team B".to_string(), g.id).unwrap();
        let p = patient("CC-1002003");
        store.insert_patient(&p).await.unwrap();

        let plan = RosterPlan {
            assign: vec![p.id],
            release: vec![],
        };
        store.insert_team(&team_a, &plan).await.unwrap();

        // Plan computed against a stale read: the guard must reject it and
        // leave no Team B row behind.
        let err = store.insert_team(&team_b, &plan).await.unwrap_err();
        assert!(matches!(err, RepositoryError::RosterConflict(_)));
        assert!(store.find_team(team_b.id).await.unwrap().is_none());
        assert_eq!(
            store.find_patient(p.id).await.unwrap().unwrap().team_id,
            Some(team_a.id)
        );
    }

    #[tokio::test]
    async fn test_update_patient_preserves_team_reference() {
        let store = InMemoryRosterStore::new();
        let g = group("Zone North");
        store.insert_group(&g).await.unwrap();
        let team = Team::new("Team A".to_string(), g.id).unwrap();
        let p = patient("CC-1002003");
        store.insert_patient(&p).await.unwrap();
        store
            .insert_team(
                &team,
                &RosterPlan {
                    assign: vec![p.id],
                    release: vec![],
                },
            )
            .await
            .unwrap();

        // A demographic update that (incorrectly) carries team_id = None
        // must not detach the patient.
        let mut updated = p.clone();
        updated.zone = "south".to_string();
        updated.team_id = None;
        store.update_patient(&updated).await.unwrap();

        let stored = store.find_patient(p.id).await.unwrap().unwrap();
        assert_eq!(stored.zone, "south");
        assert_eq!(stored.team_id, Some(team.id));
    }

    #[tokio::test]
    async fn test_delete_team_requires_released_roster() {
        let store = InMemoryRosterStore::new();
        let g = group("Zone North");
        store.insert_group(&g).await.unwrap();
        let team = Team::new("Team A".to_string(), g.id).unwrap();
        let p = patient("CC-1002003");
        store.insert_patient(&p).await.unwrap();
        store
            .insert_team(
                &team,
                &RosterPlan {
                    assign: vec![p.id],
                    release: vec![],
                },
            )
            .await
            .unwrap();

        assert!(store.delete_team(team.id).await.is_err());

        store.release_members(team.id).await.unwrap();
        store.delete_team(team.id).await.unwrap();
        assert!(store.find_team(team.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_release_members_is_idempotent() {
        let store = InMemoryRosterStore::new();
        let g = group("Zone North");
        store.insert_group(&g).await.unwrap();
        let team = Team::new("Team A".to_string(), g.id).unwrap();
        let p = patient("CC-1002003");
        store.insert_patient(&p).await.unwrap();
        store
            .insert_team(
                &team,
                &RosterPlan {
                    assign: vec![p.id],
                    release: vec![],
                },
            )
            .await
            .unwrap();

        assert_eq!(store.release_members(team.id).await.unwrap(), 1);
        assert_eq!(store.release_members(team.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_teams_counts_are_live() {
        let store = InMemoryRosterStore::new();
        let g = group("Zone North");
        store.insert_group(&g).await.unwrap();
        let team = Team::new("Team A".to_string(), g.id).unwrap();
        let p = patient("CC-1002003");
        store.insert_patient(&p).await.unwrap();
        store
            .insert_team(
                &team,
                &RosterPlan {
                    assign: vec![p.id],
                    release: vec![],
                },
            )
            .await
            .unwrap();

        let (summaries, total) = store.list_teams(10, 0).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(summaries[0].patient_count, 1);

        store.release_members(team.id).await.unwrap();
        let (summaries, _) = store.list_teams(10, 0).await.unwrap();
        assert_eq!(summaries[0].patient_count, 0);
    }
}
