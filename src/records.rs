//! Backend record semantics over loosely-typed JSON field maps.
//!
//! Request bodies arrive either from the dashboard forms (every value is a
//! string) or from API clients (numbers and nulls), so numeric fields accept
//! both spellings and blank optional values read as null.

use crate::errors::AppError;
use crate::models::{
    Attendance, Bus, BusStatus, Driver, FleetData, MaintenanceLog, MaintenanceStatus, RecordId,
    Resource, Route, UnknownVariant,
};
use chrono::Local;
use serde::Serialize;
use serde_json::{Map, Value};
use std::str::FromStr;

pub type Fields = Map<String, Value>;

const DEFAULT_FIRST_BUS: &str = "06:00";
const DEFAULT_LAST_BUS: &str = "22:00";
const DEFAULT_FREQUENCY_MIN: u32 = 15;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError(pub String);

impl From<FieldError> for AppError {
    fn from(err: FieldError) -> Self {
        AppError::bad_request(err.0)
    }
}

/// A record kind stored in one of the fleet collections.
pub trait Record: Clone + Serialize + Send + Sync + 'static {
    const RESOURCE: Resource;
    /// Key carrying the new identifier in a create response.
    const ID_KEY: &'static str;

    fn id(&self) -> RecordId;
    fn create(id: RecordId, fields: &Fields) -> Result<Self, FieldError>;
    /// Applies only the keys present in `fields`; on error nothing changes.
    fn update(&mut self, fields: &Fields) -> Result<(), FieldError>;
    fn table(data: &FleetData) -> &[Self];
    fn table_mut(data: &mut FleetData) -> &mut Vec<Self>;

    fn not_found() -> AppError {
        AppError::not_found(format!("{} not found", Self::RESOURCE.title()))
    }
}

impl Record for Bus {
    const RESOURCE: Resource = Resource::Buses;
    const ID_KEY: &'static str = "bus_id";

    fn id(&self) -> RecordId {
        self.id
    }

    fn create(id: RecordId, fields: &Fields) -> Result<Self, FieldError> {
        Ok(Bus {
            id,
            number: require_text(fields, "number")?,
            route_id: optional_id(fields, "route_id")?,
            status: optional_enum(fields, "status")?.unwrap_or(BusStatus::Active),
        })
    }

    fn update(&mut self, fields: &Fields) -> Result<(), FieldError> {
        let mut next = self.clone();
        if fields.contains_key("number") {
            next.number = require_text(fields, "number")?;
        }
        if fields.contains_key("route_id") {
            next.route_id = optional_id(fields, "route_id")?;
        }
        if let Some(status) = optional_enum(fields, "status")? {
            next.status = status;
        }
        *self = next;
        Ok(())
    }

    fn table(data: &FleetData) -> &[Self] {
        &data.buses
    }

    fn table_mut(data: &mut FleetData) -> &mut Vec<Self> {
        &mut data.buses
    }
}

impl Record for Driver {
    const RESOURCE: Resource = Resource::Drivers;
    const ID_KEY: &'static str = "driver_id";

    fn id(&self) -> RecordId {
        self.id
    }

    fn create(id: RecordId, fields: &Fields) -> Result<Self, FieldError> {
        Ok(Driver {
            id,
            name: require_text(fields, "name")?,
            phone: text(fields, "phone").unwrap_or_default(),
            attendance: optional_enum(fields, "attendance")?.unwrap_or(Attendance::Absent),
        })
    }

    fn update(&mut self, fields: &Fields) -> Result<(), FieldError> {
        let mut next = self.clone();
        if fields.contains_key("name") {
            next.name = require_text(fields, "name")?;
        }
        if let Some(phone) = text(fields, "phone") {
            next.phone = phone;
        }
        if let Some(attendance) = optional_enum(fields, "attendance")? {
            next.attendance = attendance;
        }
        *self = next;
        Ok(())
    }

    fn table(data: &FleetData) -> &[Self] {
        &data.drivers
    }

    fn table_mut(data: &mut FleetData) -> &mut Vec<Self> {
        &mut data.drivers
    }
}

impl Record for Route {
    const RESOURCE: Resource = Resource::Routes;
    const ID_KEY: &'static str = "route_id";

    fn id(&self) -> RecordId {
        self.id
    }

    fn create(id: RecordId, fields: &Fields) -> Result<Self, FieldError> {
        Ok(Route {
            id,
            name: require_text(fields, "name")?,
            start_stop: text(fields, "start_stop").unwrap_or_default(),
            end_stop: text(fields, "end_stop").unwrap_or_default(),
            first_bus: non_blank(fields, "first_bus").unwrap_or_else(|| DEFAULT_FIRST_BUS.into()),
            last_bus: non_blank(fields, "last_bus").unwrap_or_else(|| DEFAULT_LAST_BUS.into()),
            frequency_min: Some(
                optional_number(fields, "frequency_min")?.unwrap_or(DEFAULT_FREQUENCY_MIN),
            ),
        })
    }

    fn update(&mut self, fields: &Fields) -> Result<(), FieldError> {
        let mut next = self.clone();
        if fields.contains_key("name") {
            next.name = require_text(fields, "name")?;
        }
        if let Some(start_stop) = text(fields, "start_stop") {
            next.start_stop = start_stop;
        }
        if let Some(end_stop) = text(fields, "end_stop") {
            next.end_stop = end_stop;
        }
        if let Some(first_bus) = text(fields, "first_bus") {
            next.first_bus = first_bus;
        }
        if let Some(last_bus) = text(fields, "last_bus") {
            next.last_bus = last_bus;
        }
        if fields.contains_key("frequency_min") {
            next.frequency_min = optional_number(fields, "frequency_min")?;
        }
        *self = next;
        Ok(())
    }

    fn table(data: &FleetData) -> &[Self] {
        &data.routes
    }

    fn table_mut(data: &mut FleetData) -> &mut Vec<Self> {
        &mut data.routes
    }
}

impl Record for MaintenanceLog {
    const RESOURCE: Resource = Resource::Maintenance;
    const ID_KEY: &'static str = "id";

    fn id(&self) -> RecordId {
        self.id
    }

    fn create(id: RecordId, fields: &Fields) -> Result<Self, FieldError> {
        Ok(MaintenanceLog {
            id,
            bus_id: optional_id(fields, "bus_id")?
                .ok_or_else(|| FieldError("bus_id is required".into()))?,
            issue: require_text(fields, "issue")?,
            status: optional_enum(fields, "status")?.unwrap_or(MaintenanceStatus::Pending),
            reported_at: Local::now().to_rfc3339(),
        })
    }

    fn update(&mut self, fields: &Fields) -> Result<(), FieldError> {
        let mut next = self.clone();
        if fields.contains_key("bus_id") {
            next.bus_id = optional_id(fields, "bus_id")?
                .ok_or_else(|| FieldError("bus_id is required".into()))?;
        }
        if fields.contains_key("issue") {
            next.issue = require_text(fields, "issue")?;
        }
        if let Some(status) = optional_enum(fields, "status")? {
            next.status = status;
        }
        *self = next;
        Ok(())
    }

    fn table(data: &FleetData) -> &[Self] {
        &data.maintenance
    }

    fn table_mut(data: &mut FleetData) -> &mut Vec<Self> {
        &mut data.maintenance
    }
}

/// Reads a field as text. Numbers and booleans are rendered; null reads as absent.
pub fn text(fields: &Fields, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::String(value) => Some(value.clone()),
        Value::Number(value) => Some(value.to_string()),
        Value::Bool(value) => Some(value.to_string()),
        _ => None,
    }
}

fn non_blank(fields: &Fields, key: &str) -> Option<String> {
    text(fields, key).filter(|value| !value.trim().is_empty())
}

fn require_text(fields: &Fields, key: &str) -> Result<String, FieldError> {
    non_blank(fields, key).ok_or_else(|| FieldError(format!("{key} is required")))
}

pub fn optional_id(fields: &Fields, key: &str) -> Result<Option<RecordId>, FieldError> {
    optional_number(fields, key)
}

fn optional_number<T: FromStr>(fields: &Fields, key: &str) -> Result<Option<T>, FieldError> {
    match non_blank(fields, key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| FieldError(format!("{key} must be a whole number"))),
    }
}

fn optional_enum<T>(fields: &Fields, key: &str) -> Result<Option<T>, FieldError>
where
    T: FromStr<Err = UnknownVariant>,
{
    match non_blank(fields, key) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|err| FieldError(format!("{key}: {err}"))),
    }
}
