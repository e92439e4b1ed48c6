use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, str::FromStr};

pub type RecordId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BusStatus {
    Active,
    #[serde(rename = "In Depot")]
    InDepot,
    Breakdown,
}

impl BusStatus {
    pub const ALL: [BusStatus; 3] = [BusStatus::Active, BusStatus::InDepot, BusStatus::Breakdown];

    pub fn as_str(self) -> &'static str {
        match self {
            BusStatus::Active => "Active",
            BusStatus::InDepot => "In Depot",
            BusStatus::Breakdown => "Breakdown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Attendance {
    Present,
    Absent,
}

impl Attendance {
    pub fn as_str(self) -> &'static str {
        match self {
            Attendance::Present => "Present",
            Attendance::Absent => "Absent",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaintenanceStatus {
    Pending,
    #[serde(rename = "In Progress")]
    InProgress,
    Resolved,
}

impl MaintenanceStatus {
    pub const ALL: [MaintenanceStatus; 3] = [
        MaintenanceStatus::Pending,
        MaintenanceStatus::InProgress,
        MaintenanceStatus::Resolved,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MaintenanceStatus::Pending => "Pending",
            MaintenanceStatus::InProgress => "In Progress",
            MaintenanceStatus::Resolved => "Resolved",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown value '{}'", self.0)
    }
}

macro_rules! labelled_enum {
    ($ty:ty, [$($variant:expr),+ $(,)?]) => {
        impl FromStr for $ty {
            type Err = UnknownVariant;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                let value = value.trim();
                [$($variant),+]
                    .into_iter()
                    .find(|candidate| candidate.as_str().eq_ignore_ascii_case(value))
                    .ok_or_else(|| UnknownVariant(value.to_string()))
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

labelled_enum!(BusStatus, [BusStatus::Active, BusStatus::InDepot, BusStatus::Breakdown]);
labelled_enum!(Attendance, [Attendance::Present, Attendance::Absent]);
labelled_enum!(
    MaintenanceStatus,
    [MaintenanceStatus::Pending, MaintenanceStatus::InProgress, MaintenanceStatus::Resolved]
);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bus {
    pub id: RecordId,
    pub number: String,
    pub route_id: Option<RecordId>,
    pub status: BusStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    pub id: RecordId,
    pub name: String,
    pub phone: String,
    pub attendance: Attendance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub id: RecordId,
    pub name: String,
    pub start_stop: String,
    pub end_stop: String,
    pub first_bus: String,
    pub last_bus: String,
    pub frequency_min: Option<u32>,
}

/// Maintenance entry as persisted; `reported_at` is an RFC 3339 timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceLog {
    pub id: RecordId,
    pub bus_id: RecordId,
    pub issue: String,
    pub status: MaintenanceStatus,
    pub reported_at: String,
}

/// Maintenance entry as shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceRecord {
    pub id: RecordId,
    pub bus_id: RecordId,
    pub issue: String,
    pub status: MaintenanceStatus,
    pub reported_on: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveLocation {
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub speed: f64,
    #[serde(default)]
    pub occupancy: u32,
    pub last_update: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FleetData {
    #[serde(default)]
    pub buses: Vec<Bus>,
    #[serde(default)]
    pub drivers: Vec<Driver>,
    #[serde(default)]
    pub routes: Vec<Route>,
    #[serde(default)]
    pub maintenance: Vec<MaintenanceLog>,
    #[serde(default)]
    pub live_locations: BTreeMap<RecordId, LiveLocation>,
}

/// The four resource collections the dashboard manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Buses,
    Drivers,
    Routes,
    Maintenance,
}

impl Resource {
    pub const ALL: [Resource; 4] = [
        Resource::Buses,
        Resource::Drivers,
        Resource::Routes,
        Resource::Maintenance,
    ];

    /// Path segment used by both the REST API and the dashboard forms.
    pub fn segment(self) -> &'static str {
        match self {
            Resource::Buses => "buses",
            Resource::Drivers => "drivers",
            Resource::Routes => "routes",
            Resource::Maintenance => "maintenance",
        }
    }

    pub fn api_path(self) -> String {
        format!("/api/{}", self.segment())
    }

    pub fn record_path(self, id: RecordId) -> String {
        format!("/api/{}/{id}", self.segment())
    }

    /// Name of the live collection backing this resource.
    pub fn collection(self) -> &'static str {
        match self {
            Resource::Maintenance => "maintenance_logs",
            other => other.segment(),
        }
    }

    pub fn parse(segment: &str) -> Option<Self> {
        Resource::ALL.into_iter().find(|resource| resource.segment() == segment.trim())
    }

    pub fn label(self) -> &'static str {
        match self {
            Resource::Buses => "bus",
            Resource::Drivers => "driver",
            Resource::Routes => "route",
            Resource::Maintenance => "maintenance record",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Resource::Buses => "Bus",
            Resource::Drivers => "Driver",
            Resource::Routes => "Route",
            Resource::Maintenance => "Maintenance record",
        }
    }

    /// DOM id of the table body rendered for this resource.
    pub fn table_id(self) -> &'static str {
        match self {
            Resource::Buses => "busesTable",
            Resource::Drivers => "driversTable",
            Resource::Routes => "routesTable",
            Resource::Maintenance => "maintenanceTable",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.segment())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Summary {
    pub total_buses: usize,
    pub active_buses: usize,
    pub inactive_buses: usize,
    pub breakdown_buses: usize,
    pub total_drivers: usize,
    pub present_drivers: usize,
    pub absent_drivers: usize,
    pub total_routes: usize,
    pub total_maintenance: usize,
    pub pending_maintenance: usize,
    pub resolved_maintenance: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub bus_id: String,
    pub predicted_eta_min: u32,
    pub crowd_level: String,
    pub is_peak_hour: bool,
    pub analysis: String,
}

/// Body of `GET /api/predictions`: either a prediction or a logical error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredictionReply {
    Failed { error: String },
    Ready(Prediction),
}

#[derive(Debug, Deserialize)]
pub struct AttendanceRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct LocationUpdateRequest {
    pub bus_id: Option<serde_json::Value>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub occupancy: Option<u32>,
}
