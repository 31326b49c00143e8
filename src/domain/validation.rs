use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::domain::models::{Direction, LoadState, LogEntry, Role, SiteStatus, VehicleStatus};

pub const CONTACT_NUMBER_DIGITS: usize = 11;
pub const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),
    #[error("contact number must be exactly 11 digits")]
    ContactNumber,
    #[error("email address must contain '@'")]
    Email,
    #[error("password must be at least 6 characters")]
    PasswordTooShort,
    #[error("at least one truck entry is required")]
    NoEntries,
    #[error("truck count must be at least 1")]
    TruckCount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftMode {
    Create,
    Update,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDraft {
    pub username: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_number: Option<String>,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    pub role: Role,
}

impl AccountDraft {
    pub fn validate(&self, mode: DraftMode) -> Result<(), ValidationError> {
        require("username", &self.username)?;
        require("name", &self.name)?;
        if mode == DraftMode::Create {
            require("password", self.password.as_deref().unwrap_or(""))?;
        }
        require("location", &self.location)?;

        if let Some(contact) = present(self.contact_number.as_deref()) {
            validate_contact_number(contact)?;
        }
        if let Some(email) = present(self.email.as_deref())
            && !email.contains('@')
        {
            return Err(ValidationError::Email);
        }

        Ok(())
    }

    /// Blank optional fields are dropped so they are never sent as empty strings.
    pub fn normalized(mut self) -> Self {
        self.email = self.email.filter(|value| !value.trim().is_empty());
        self.contact_number = self.contact_number.filter(|value| !value.trim().is_empty());
        self.company = self.company.filter(|value| !value.trim().is_empty());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteDraft {
    pub name: String,
    pub location: String,
    pub operator: String,
    #[serde(rename = "quarryOwner")]
    pub owner: String,
    pub permit_number: String,
    pub status: SiteStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SiteDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("name", &self.name)?;
        require("location", &self.location)?;
        require("owner", &self.owner)?;
        require("permit number", &self.permit_number)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleDraft {
    pub plate_number: String,
    pub brand: String,
    pub model: String,
    pub capacity: String,
    pub company: String,
    pub status: VehicleStatus,
}

impl VehicleDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("plate number", &self.plate_number)?;
        require("brand", &self.brand)?;
        require("model", &self.model)?;
        require("capacity", &self.capacity)
    }

    /// A bare number is a tonnage; a blank company becomes `Unknown Quarry`.
    pub fn normalized(mut self) -> Self {
        let capacity = self.capacity.trim();
        if !capacity.is_empty() && capacity.parse::<f64>().is_ok() {
            self.capacity = format!("{capacity} tons");
        }
        if self.company.trim().is_empty() {
            self.company = "Unknown Quarry".to_string();
        }
        self
    }
}

/// One truck ticked on the field check-in sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldLogCount {
    pub truck_id: String,
    pub plate_number: String,
    pub brand: String,
    pub count: u32,
}

/// Batch submitted by a field operator; each truck counts at most once.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldLogBatch {
    pub logs: Vec<FieldLogCount>,
    pub log_type: Direction,
    pub log_date: DateTime<Utc>,
    /// Wall-clock label such as `07:45:12 AM`.
    pub log_time: String,
}

impl FieldLogBatch {
    pub fn total(&self) -> u32 {
        self.logs.iter().map(|entry| entry.count.min(1)).sum()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.total() == 0 {
            return Err(ValidationError::NoEntries);
        }
        Ok(())
    }

    pub fn normalized(mut self) -> Self {
        for entry in &mut self.logs {
            entry.count = entry.count.min(1);
        }
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminDirection {
    In,
    Out,
}

impl From<Direction> for AdminDirection {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::In => Self::In,
            Direction::Out => Self::Out,
        }
    }
}

/// Manual count recorded by an administrator against a site.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminLogDraft {
    pub quarry_id: String,
    pub log_type: AdminDirection,
    pub truck_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truck_status: Option<LoadState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub log_date: DateTime<Utc>,
}

impl AdminLogDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("quarry", &self.quarry_id)?;
        if self.truck_count == 0 {
            return Err(ValidationError::TruckCount);
        }
        Ok(())
    }
}

/// Edit of an existing admin log. The direction is not part of the payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminLogEdit {
    pub log_date: DateTime<Utc>,
    pub truck_count: u32,
    pub truck_status: LoadState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl AdminLogEdit {
    /// Moves `entry` to `log_date` with a new load state, keeping its count and notes.
    pub fn for_entry(entry: &LogEntry, log_date: DateTime<Utc>, truck_status: LoadState) -> Self {
        Self {
            log_date,
            truck_count: entry.truck_count.max(1),
            truck_status,
            notes: entry.note.clone(),
        }
    }
}

/// Self-service profile update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileEdit {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
}

impl ProfileEdit {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            require("name", name)?;
        }
        if let Some(contact) = present(self.contact_number.as_deref()) {
            validate_contact_number(contact)?;
        }
        if let Some(email) = present(self.email.as_deref())
            && !email.contains('@')
        {
            return Err(ValidationError::Email);
        }
        Ok(())
    }
}

pub fn validate_contact_number(raw: &str) -> Result<(), ValidationError> {
    if raw.len() == CONTACT_NUMBER_DIGITS && raw.bytes().all(|byte| byte.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::ContactNumber)
    }
}

pub fn validate_new_password(raw: &str) -> Result<(), ValidationError> {
    require("password", raw)?;
    if raw.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::PasswordTooShort);
    }
    Ok(())
}

fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::Required(field))
    } else {
        Ok(())
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
