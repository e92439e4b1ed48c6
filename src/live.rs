//! Live collections: documents pushed by the store and their decoding into
//! the records the dashboard renders.

use crate::models::{Bus, Driver, MaintenanceRecord, RecordId, Resource, Route};
use chrono::{DateTime, NaiveDateTime};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use std::future::Future;
use tokio::sync::broadcast;
use tracing::warn;

const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M";

/// A document as held by the live store: identifier kept apart from fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveDocument {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl LiveDocument {
    /// Builds a document from a record, moving its `id` out of the fields.
    pub fn from_record<T: Serialize>(record: &T) -> Option<Self> {
        let Value::Object(mut fields) = serde_json::to_value(record).ok()? else {
            return None;
        };
        let id = match fields.remove("id")? {
            Value::String(id) => id,
            Value::Number(id) => id.to_string(),
            _ => return None,
        };
        Some(Self { id, fields })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionSnapshot {
    pub resource: Resource,
    pub documents: Vec<LiveDocument>,
}

/// A source of live collections the dashboard can subscribe to.
pub trait LiveFeed: Send + Sync + 'static {
    fn is_ready(&self) -> bool;

    /// Receives a full snapshot of a collection every time it changes.
    fn subscribe(&self) -> broadcast::Receiver<CollectionSnapshot>;

    fn snapshot(&self, resource: Resource) -> impl Future<Output = CollectionSnapshot> + Send;
}

pub fn decode_buses(snapshot: &CollectionSnapshot) -> Vec<Bus> {
    decode_all(snapshot, decode_record)
}

pub fn decode_drivers(snapshot: &CollectionSnapshot) -> Vec<Driver> {
    decode_all(snapshot, decode_record)
}

pub fn decode_routes(snapshot: &CollectionSnapshot) -> Vec<Route> {
    decode_all(snapshot, decode_record)
}

pub fn decode_maintenance(snapshot: &CollectionSnapshot) -> Vec<MaintenanceRecord> {
    decode_all(snapshot, decode_maintenance_document)
}

fn decode_all<T>(
    snapshot: &CollectionSnapshot,
    decode: impl Fn(&LiveDocument) -> Option<T>,
) -> Vec<T> {
    snapshot
        .documents
        .iter()
        .filter_map(|doc| {
            let record = decode(doc);
            if record.is_none() {
                warn!(
                    collection = snapshot.resource.collection(),
                    id = %doc.id,
                    "skipping undecodable live document"
                );
            }
            record
        })
        .collect()
}

fn document_id(doc: &LiveDocument) -> Option<RecordId> {
    doc.id.trim().parse().ok()
}

fn decode_record<T: DeserializeOwned>(doc: &LiveDocument) -> Option<T> {
    let mut fields = doc.fields.clone();
    fields.insert("id".into(), Value::from(document_id(doc)?));
    serde_json::from_value(Value::Object(fields)).ok()
}

fn decode_maintenance_document(doc: &LiveDocument) -> Option<MaintenanceRecord> {
    let mut fields = doc.fields.clone();
    let reported_on = fields
        .remove("reported_at")
        .as_ref()
        .and_then(display_timestamp)
        .or_else(|| match fields.get("reported_on") {
            Some(Value::String(text)) => Some(text.clone()),
            _ => None,
        })
        .unwrap_or_default();
    fields.insert("reported_on".into(), Value::String(reported_on));
    fields.insert("id".into(), Value::from(document_id(doc)?));
    serde_json::from_value(Value::Object(fields)).ok()
}

/// Normalizes a stored timestamp to `YYYY-MM-DD HH:MM`.
///
/// Accepts RFC 3339 strings (kept in their own offset), plain
/// `YYYY-MM-DD HH:MM[:SS]` strings, epoch seconds, and `{seconds, nanos}`
/// objects as emitted by document stores.
pub fn display_timestamp(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => {
            if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
                return Some(parsed.naive_local().format(DISPLAY_FORMAT).to_string());
            }
            ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
                .map(|parsed| parsed.format(DISPLAY_FORMAT).to_string())
        }
        Value::Number(seconds) => epoch_display(seconds.as_i64()?),
        Value::Object(map) => {
            let seconds = map.get("seconds").or_else(|| map.get("_seconds"))?;
            epoch_display(seconds.as_i64()?)
        }
        _ => None,
    }
}

fn epoch_display(seconds: i64) -> Option<String> {
    DateTime::from_timestamp(seconds, 0).map(|at| at.naive_utc().format(DISPLAY_FORMAT).to_string())
}
