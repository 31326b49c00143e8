use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Records that carry a stable server-side identity.
pub trait Identified {
    fn id(&self) -> &str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "OUT")]
    Out,
}

impl Direction {
    /// Field logs send `IN`/`OUT`, admin logs send `in`/`out`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "IN" => Some(Self::In),
            "OUT" => Some(Self::Out),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::In => "IN",
            Self::Out => "OUT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadState {
    #[serde(rename = "empty")]
    Empty,
    #[serde(rename = "half-loaded")]
    HalfLoaded,
    #[serde(rename = "full")]
    Full,
}

impl LoadState {
    pub fn label(self) -> &'static str {
        match self {
            Self::Empty => "Empty",
            Self::HalfLoaded => "Half-Loaded",
            Self::Full => "Full",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleRef {
    pub plate_number: String,
    pub brand: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteRef {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub proponent: Option<String>,
}

impl SiteRef {
    /// Stand-in for a site that no longer exists.
    pub fn unknown() -> Self {
        Self {
            id: None,
            name: "Unknown".to_string(),
            location: None,
            proponent: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorRef {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub username: Option<String>,
}

/// A directional truck movement. Direction never changes after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub id: String,
    pub direction: Direction,
    pub vehicle: Option<VehicleRef>,
    pub site: SiteRef,
    pub actor: Option<ActorRef>,
    pub occurred_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub load_state: Option<LoadState>,
    pub note: Option<String>,
    pub truck_count: u32,
}

impl Identified for LogEntry {
    fn id(&self) -> &str {
        &self.id
    }
}

impl LogEntry {
    pub fn plate_number(&self) -> &str {
        self.vehicle
            .as_ref()
            .map_or("", |vehicle| vehicle.plate_number.as_str())
    }

    pub fn brand(&self) -> &str {
        self.vehicle.as_ref().map_or("", |vehicle| vehicle.brand.as_str())
    }

    pub fn actor_name(&self) -> &str {
        self.actor.as_ref().map_or("Unknown", |actor| actor.name.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SiteStatus {
    Active,
    Inactive,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub location: String,
    #[serde(default)]
    pub operator: String,
    #[serde(rename = "quarryOwner")]
    pub owner: String,
    pub permit_number: String,
    pub status: SiteStatus,
    #[serde(default)]
    pub contact_number: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub added_by: Option<ActorRef>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Identified for Site {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
    Superadmin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
            Self::Superadmin => "superadmin",
        }
    }

    pub fn is_administrator(self) -> bool {
        matches!(self, Self::Admin | Self::Superadmin)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub contact_number: Option<String>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub company: Option<String>,
    pub role: Role,
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Identified for Account {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VehicleStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CurrentStatus {
    In,
    Out,
    #[default]
    Available,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    #[serde(rename = "_id")]
    pub id: String,
    pub plate_number: String,
    pub brand: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub capacity: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub company: String,
    #[serde(default)]
    pub owner: Option<String>,
    pub status: VehicleStatus,
    #[serde(default, deserialize_with = "null_as_default")]
    pub current_status: CurrentStatus,
    #[serde(default)]
    pub last_log_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Identified for Vehicle {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub role: Role,
}

/// Credential bundle persisted locally and read by every outgoing request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: SessionUser,
}
