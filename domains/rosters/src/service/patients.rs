//! Patient registry operations
//!
//! Demographic lifecycle only. The team reference is owned by the team
//! lifecycle: it is not an accepted update field, and a patient cannot be
//! removed while a team still claims it.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use carebase_common::{Error, Pagination, Result};

use crate::domain::entities::{Gender, Patient};
use crate::domain::roster::RosterError;
use crate::domain::validation::validate_document;
use crate::repository::RosterStore;

/// Request for registering a patient
#[derive(Debug, Clone, Deserialize)]
pub struct NewPatient {
    pub document: String,
    pub name: String,
    pub last_name: String,
    pub gender: Gender,
    pub birthday: NaiveDate,
    pub zone: String,
}

/// Request for updating a patient's demographic fields
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePatient {
    pub document: Option<String>,
    pub name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<Gender>,
    pub birthday: Option<NaiveDate>,
    pub zone: Option<String>,
    pub is_active: Option<bool>,
}

impl UpdatePatient {
    pub fn is_empty(&self) -> bool {
        self.document.is_none()
            && self.name.is_none()
            && self.last_name.is_none()
            && self.gender.is_none()
            && self.birthday.is_none()
            && self.zone.is_none()
            && self.is_active.is_none()
    }
}

pub struct PatientService<S> {
    store: Arc<S>,
}

impl<S> Clone for PatientService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: RosterStore> PatientService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn register(&self, new_patient: NewPatient) -> Result<Patient> {
        let patient = Patient::new(
            new_patient.document,
            new_patient.name,
            new_patient.last_name,
            new_patient.gender,
            new_patient.birthday,
            new_patient.zone,
        )?;
        self.store.insert_patient(&patient).await?;
        tracing::info!(patient_id = %patient.id, "patient registered");
        Ok(patient)
    }

    pub async fn list(&self, pagination: Pagination) -> Result<(Vec<Patient>, i64)> {
        let (patients, total) = self
            .store
            .list_patients(pagination.limit(), pagination.offset())
            .await?;
        Ok((patients, total))
    }

    pub async fn get(&self, id: Uuid) -> Result<Patient> {
        let patient = self
            .store
            .find_patient(id)
            .await?
            .ok_or(RosterError::MissingPatients(vec![id]))?;
        Ok(patient)
    }

    pub async fn update(&self, id: Uuid, update: UpdatePatient) -> Result<Patient> {
        if update.is_empty() {
            return Err(Error::Validation("Send data to update".to_string()));
        }

        let mut patient = self.get(id).await?;

        if let Some(document) = update.document {
            if !validate_document(&document) {
                return Err(Error::Validation(format!(
                    "Invalid document format: {}",
                    document
                )));
            }
            patient.document = document;
        }
        if let Some(name) = update.name {
            patient.name = name;
        }
        if let Some(last_name) = update.last_name {
            patient.last_name = last_name;
        }
        Patient::validate_names(&patient.name, &patient.last_name)?;
        if let Some(gender) = update.gender {
            patient.gender = gender;
        }
        if let Some(birthday) = update.birthday {
            patient.birthday = birthday;
        }
        if let Some(zone) = update.zone {
            if zone.trim().is_empty() {
                return Err(Error::Validation("Zone must not be empty".to_string()));
            }
            patient.zone = zone;
        }
        if let Some(is_active) = update.is_active {
            patient.is_active = is_active;
        }

        patient.updated_at = chrono::Utc::now();
        self.store.update_patient(&patient).await?;
        Ok(patient)
    }

    /// Remove a patient. Rejected while a team still claims it: removing an
    /// assigned patient would mutate a roster outside the team lifecycle.
    pub async fn remove(&self, id: Uuid) -> Result<()> {
        let patient = self.get(id).await?;

        if let Some(team_id) = patient.team_id {
            return Err(Error::Conflict(format!(
                "Patient {} is assigned to team {}; release it from the team first",
                patient.id, team_id
            )));
        }

        self.store.delete_patient(patient.id).await?;
        tracing::info!(patient_id = %id, "patient removed");
        Ok(())
    }
}
