//! Domain entities for the Carebase rosters domain
//!
//! Groups own teams; teams claim a roster of patients through the nullable
//! back-reference on the patient row. Staff members are cascade-owned by
//! their team and never touched by roster assignment.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use carebase_common::{Error, Result};
use validator::ValidateEmail;

use crate::domain::state::MembershipState;
use crate::domain::validation::validate_document;

/// Patient gender as recorded in the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "gender", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Gender::Male => write!(f, "male"),
            Gender::Female => write!(f, "female"),
        }
    }
}

/// Staff roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "staff_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum StaffRole {
    Admin,
    #[default]
    User,
}

impl std::fmt::Display for StaffRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StaffRole::Admin => write!(f, "admin"),
            StaffRole::User => write!(f, "user"),
        }
    }
}

/// Group entity - organizational grouping that owns teams
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Group {
    pub id: Uuid,
    pub group_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Group {
    /// Create a new group with validation
    pub fn new(group_name: String) -> Result<Self> {
        Self::validate_name(&group_name)?;

        let now = Utc::now();
        Ok(Group {
            id: Uuid::new_v4(),
            group_name,
            created_at: now,
            updated_at: now,
        })
    }

    /// Rename the group, re-validating the name
    pub fn rename(&mut self, group_name: String) -> Result<()> {
        Self::validate_name(&group_name)?;
        self.group_name = group_name;
        self.updated_at = Utc::now();
        Ok(())
    }

    fn validate_name(name: &str) -> Result<()> {
        if name.trim().is_empty() || name.len() > 100 {
            return Err(Error::Validation(
                "Group name must be 1-100 characters".to_string(),
            ));
        }
        Ok(())
    }
}

/// Team entity - references exactly one group and claims a roster of patients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Team {
    pub id: Uuid,
    pub team_name: String,
    pub group_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Team {
    /// Create a new team with validation
    pub fn new(team_name: String, group_id: Uuid) -> Result<Self> {
        Self::validate_name(&team_name)?;

        let now = Utc::now();
        Ok(Team {
            id: Uuid::new_v4(),
            team_name,
            group_id,
            created_at: now,
            updated_at: now,
        })
    }

    /// Rename the team, re-validating the name
    pub fn rename(&mut self, team_name: String) -> Result<()> {
        Self::validate_name(&team_name)?;
        self.team_name = team_name;
        self.updated_at = Utc::now();
        Ok(())
    }

    fn validate_name(name: &str) -> Result<()> {
        if name.trim().is_empty() || name.len() > 100 {
            return Err(Error::Validation(
                "Team name must be 1-100 characters".to_string(),
            ));
        }
        Ok(())
    }
}

/// Patient entity
///
/// `team_id` is the single nullable back-reference the membership invariant
/// protects. It transitions only through team lifecycle calls; no
/// patient-facing operation writes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Patient {
    pub id: Uuid,
    pub document: String,
    pub name: String,
    pub last_name: String,
    pub gender: Gender,
    pub birthday: NaiveDate,
    pub zone: String,
    pub is_active: bool,
    pub team_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Patient {
    /// Register a new, unassigned patient with validation
    pub fn new(
        document: String,
        name: String,
        last_name: String,
        gender: Gender,
        birthday: NaiveDate,
        zone: String,
    ) -> Result<Self> {
        if !validate_document(&document) {
            return Err(Error::Validation(format!(
                "Invalid document format: {}",
                document
            )));
        }
        Self::validate_names(&name, &last_name)?;
        if zone.trim().is_empty() {
            return Err(Error::Validation("Zone must not be empty".to_string()));
        }

        let now = Utc::now();
        Ok(Patient {
            id: Uuid::new_v4(),
            document,
            name,
            last_name,
            gender,
            birthday,
            zone,
            is_active: true,
            team_id: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Current membership state of this patient
    pub fn membership_state(&self) -> MembershipState {
        MembershipState::of(self.team_id)
    }

    pub(crate) fn validate_names(name: &str, last_name: &str) -> Result<()> {
        if name.trim().is_empty() || name.len() > 100 {
            return Err(Error::Validation(
                "Patient name must be 1-100 characters".to_string(),
            ));
        }
        if last_name.trim().is_empty() || last_name.len() > 100 {
            return Err(Error::Validation(
                "Patient last name must be 1-100 characters".to_string(),
            ));
        }
        Ok(())
    }
}

/// Staff member ("gestor") entity
///
/// Staff carry their own nullable team reference, mutated only by the staff
/// lifecycle. The roster engine reads staff for counts and the team view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct StaffMember {
    pub id: Uuid,
    pub document: String,
    pub email: String,
    pub name: String,
    pub last_name: String,
    pub role: StaffRole,
    pub is_active: bool,
    pub team_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StaffMember {
    /// Create a new staff member with validation
    pub fn new(
        document: String,
        email: String,
        name: String,
        last_name: String,
        role: StaffRole,
    ) -> Result<Self> {
        if !validate_document(&document) {
            return Err(Error::Validation(format!(
                "Invalid document format: {}",
                document
            )));
        }
        if !email.validate_email() {
            return Err(Error::Validation("Invalid email format".to_string()));
        }
        Patient::validate_names(&name, &last_name)?;

        let now = Utc::now();
        Ok(StaffMember {
            id: Uuid::new_v4(),
            document,
            email,
            name,
            last_name,
            role,
            is_active: true,
            team_id: None,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Team row annotated with live roster counts for list views.
///
/// Counts are computed by the store at read time, never stored denormalized.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct TeamSummary {
    pub id: Uuid,
    pub team_name: String,
    pub group_id: Uuid,
    pub patient_count: i64,
    pub staff_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Fully populated team for detail views.
///
/// `patients` is always a (possibly empty) list ordered by last name, never
/// null, so callers get a uniform shape regardless of roster size.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamView {
    pub id: Uuid,
    pub team_name: String,
    pub group: Group,
    pub patients: Vec<Patient>,
    pub staff: Vec<StaffMember>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
