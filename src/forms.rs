//! Form Handlers: serialize submitted fields, call the CRUD Client once and
//! turn the outcome into a notification.

use crate::models::{RecordId, Resource};
use crate::notify::Notification;
use crate::state::AppState;
use serde_json::{Map, Value};
use std::{
    collections::{BTreeMap, HashSet},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use tracing::{error, info};

pub type FormFields = BTreeMap<String, String>;

/// Identifies one submit control on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormKey {
    Create(Resource),
    Edit(Resource, RecordId),
    Delete(Resource, RecordId),
    Attendance(RecordId),
}

/// Fields an edit form may leave blank without clearing the stored value.
pub fn optional_fields(resource: Resource) -> &'static [&'static str] {
    match resource {
        Resource::Buses => &["route_id"],
        Resource::Routes => &["first_bus", "last_bus", "frequency_min"],
        Resource::Drivers | Resource::Maintenance => &[],
    }
}

/// Flat JSON mapping of every named field, values kept as submitted.
pub fn serialize_fields(fields: &FormFields) -> Map<String, Value> {
    fields
        .iter()
        .map(|(name, value)| (name.clone(), Value::String(value.clone())))
        .collect()
}

pub fn strip_empty_optional(resource: Resource, body: &mut Map<String, Value>) {
    for name in optional_fields(resource) {
        let blank = matches!(body.get(*name), Some(Value::String(value)) if value.trim().is_empty());
        if blank {
            body.remove(*name);
        }
    }
}

/// Disabled-button guard: at most one in-flight submission per form.
#[derive(Clone, Default)]
pub struct SubmitGuard {
    in_flight: Arc<Mutex<HashSet<FormKey>>>,
}

impl SubmitGuard {
    pub fn try_begin(&self, key: FormKey) -> Option<SubmitPermit> {
        if !self.lock().insert(key) {
            return None;
        }
        Some(SubmitPermit {
            guard: self.clone(),
            key,
        })
    }

    pub fn is_busy(&self, key: FormKey) -> bool {
        self.lock().contains(&key)
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<FormKey>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Re-enables its form when dropped, whatever the outcome.
pub struct SubmitPermit {
    guard: SubmitGuard,
    key: FormKey,
}

impl Drop for SubmitPermit {
    fn drop(&mut self) {
        self.guard.lock().remove(&self.key);
    }
}

fn already_submitting() -> Notification {
    Notification::info("This form is already being submitted. Please wait.")
}

pub async fn submit_create(state: &AppState, resource: Resource, fields: &FormFields) -> Notification {
    let Some(_permit) = state.submissions.try_begin(FormKey::Create(resource)) else {
        return already_submitting();
    };

    let body = serialize_fields(fields);
    match state
        .client
        .post_json::<_, Value>(&resource.api_path(), &body)
        .await
    {
        Ok(reply) => {
            info!(collection = resource.collection(), %reply, "record added");
            Notification::success(format!("{} added successfully!", resource.title()))
        }
        Err(err) => {
            error!(collection = resource.collection(), "add failed: {err}");
            Notification::error(format!("Failed to add {}. Please try again.", resource.label()))
        }
    }
}

pub async fn submit_edit(
    state: &AppState,
    resource: Resource,
    id: RecordId,
    fields: &FormFields,
) -> Notification {
    let Some(_permit) = state.submissions.try_begin(FormKey::Edit(resource, id)) else {
        return already_submitting();
    };

    let mut body = serialize_fields(fields);
    strip_empty_optional(resource, &mut body);
    match state
        .client
        .put_json::<_, Value>(&resource.record_path(id), &body)
        .await
    {
        Ok(_) => {
            info!(collection = resource.collection(), id, "record updated");
            Notification::success(format!("{} updated successfully!", resource.title()))
        }
        Err(err) => {
            error!(collection = resource.collection(), id, "update failed: {err}");
            Notification::error(format!("Failed to update {}.", resource.label()))
        }
    }
}

/// Deletes only when the confirmation step was accepted.
pub async fn submit_delete(
    state: &AppState,
    resource: Resource,
    id: RecordId,
    confirmed: bool,
) -> Notification {
    if !confirmed {
        return Notification::info("Deletion cancelled.");
    }
    let Some(_permit) = state.submissions.try_begin(FormKey::Delete(resource, id)) else {
        return already_submitting();
    };

    match state
        .client
        .delete_json::<Value>(&resource.record_path(id))
        .await
    {
        Ok(_) => {
            info!(collection = resource.collection(), id, "record deleted");
            Notification::success(format!("{} deleted successfully!", resource.title()))
        }
        Err(err) => {
            error!(collection = resource.collection(), id, "delete failed: {err}");
            Notification::error(format!("Failed to delete {}.", resource.label()))
        }
    }
}
