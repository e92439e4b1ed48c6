//! Fleet REST backend: the JSON API the dashboard's CRUD Client talks to,
//! plus the public endpoints used by the rider app.

use crate::errors::AppError;
use crate::eta::predict;
use crate::models::{
    AttendanceRequest, Attendance, LiveLocation, LocationUpdateRequest, PredictionReply, RecordId,
    Summary,
};
use crate::records::{Fields, Record};
use crate::state::AppState;
use crate::stats::build_summary;
use crate::sync::LiveTables;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Local;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

pub async fn create<R: Record>(
    State(state): State<AppState>,
    Json(fields): Json<Fields>,
) -> Result<Json<Value>, AppError> {
    let id = state.store.create::<R>(&fields).await?;

    let mut body = Map::new();
    body.insert("ok".into(), Value::Bool(true));
    body.insert(R::ID_KEY.into(), json!(id));
    Ok(Json(Value::Object(body)))
}

pub async fn update<R: Record>(
    State(state): State<AppState>,
    Path(id): Path<RecordId>,
    Json(fields): Json<Fields>,
) -> Result<Json<Value>, AppError> {
    state.store.update::<R>(id, &fields).await?;
    Ok(Json(json!({ "ok": true })))
}

pub async fn delete<R: Record>(
    State(state): State<AppState>,
    Path(id): Path<RecordId>,
) -> Result<Json<Value>, AppError> {
    state.store.delete::<R>(id).await?;
    Ok(Json(json!({ "ok": true })))
}

pub async fn mark_attendance(
    State(state): State<AppState>,
    Path(id): Path<RecordId>,
    Json(payload): Json<AttendanceRequest>,
) -> Result<Json<Value>, AppError> {
    let attendance = payload
        .status
        .parse::<Attendance>()
        .map_err(|_| AppError::bad_request("status must be 'Present' or 'Absent'"))?;
    state.store.set_attendance(id, attendance).await?;
    Ok(Json(json!({ "ok": true })))
}

#[derive(Debug, Deserialize)]
pub struct PredictionQuery {
    bus_id: Option<String>,
}

/// Missing `bus_id` is a 400; a bus without live data is a 200 carrying
/// `{error}`.
pub async fn prediction(
    State(state): State<AppState>,
    Query(query): Query<PredictionQuery>,
) -> Response {
    let Some(bus_id) = query.bus_id.filter(|id| !id.trim().is_empty()) else {
        return AppError::bad_request("bus_id required").into_response();
    };
    let bus_id = bus_id.trim();

    let live = match bus_id.parse::<RecordId>() {
        Ok(id) => state.store.live_location(id).await,
        Err(_) => None,
    };
    let reply = match live {
        Some(live) => PredictionReply::Ready(predict(bus_id, &live)),
        None => {
            debug!(bus_id, "no live location for prediction");
            PredictionReply::Failed {
                error: "no data".to_string(),
            }
        }
    };
    Json(reply).into_response()
}

pub async fn summary(State(state): State<AppState>) -> Json<Summary> {
    let tables = LiveTables::load(&state.store).await;
    Json(build_summary(&tables))
}

/// Public listing; each record carries its identifier under the kind's id
/// key (`bus_id`, `driver_id`, `route_id`).
pub async fn public_list<R: Record>(State(state): State<AppState>) -> Json<Vec<Value>> {
    let records = state.store.list::<R>().await;
    Json(records.iter().filter_map(with_id_key::<R>).collect())
}

fn with_id_key<R: Record>(record: &R) -> Option<Value> {
    let Value::Object(mut fields) = serde_json::to_value(record).ok()? else {
        return None;
    };
    let id = fields.remove("id")?;
    let mut body = Map::new();
    body.insert(R::ID_KEY.to_string(), id);
    body.extend(fields);
    Some(Value::Object(body))
}

pub async fn location_update(
    State(state): State<AppState>,
    Json(payload): Json<LocationUpdateRequest>,
) -> Result<impl IntoResponse, AppError> {
    let required = || AppError::bad_request("bus_id, lat, and lng are required");
    let bus_id = payload.bus_id.as_ref().and_then(bus_id_of).ok_or_else(required)?;
    let (Some(lat), Some(lng)) = (payload.lat, payload.lng) else {
        return Err(required());
    };

    let timestamp = Local::now().naive_local().format("%Y-%m-%dT%H:%M:%S").to_string();
    let location = LiveLocation {
        lat,
        lng,
        speed: payload.speed.unwrap_or(0.0),
        occupancy: payload.occupancy.unwrap_or(0),
        last_update: timestamp.clone(),
    };
    state.store.set_live_location(bus_id, location).await?;
    info!(bus_id, lat, lng, "location updated");

    Ok((
        StatusCode::OK,
        Json(json!({
            "ok": true,
            "message": "Location updated",
            "bus_id": bus_id,
            "timestamp": timestamp,
        })),
    ))
}

fn bus_id_of(value: &Value) -> Option<RecordId> {
    match value {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Bus, BusStatus, Driver};

    #[test]
    fn public_records_use_kind_id_key() {
        let bus = Bus {
            id: 4,
            number: "B12".into(),
            route_id: Some(2),
            status: BusStatus::InDepot,
        };
        assert_eq!(
            with_id_key(&bus),
            Some(json!({ "bus_id": 4, "number": "B12", "route_id": 2, "status": "In Depot" }))
        );

        let driver = Driver {
            id: 7,
            name: "Asha".into(),
            phone: "555".into(),
            attendance: Attendance::Present,
        };
        assert_eq!(with_id_key(&driver).unwrap()["driver_id"], json!(7));
    }

    #[test]
    fn bus_id_accepts_numbers_and_numeric_strings() {
        assert_eq!(bus_id_of(&json!(3)), Some(3));
        assert_eq!(bus_id_of(&json!(" 12 ")), Some(12));
        assert_eq!(bus_id_of(&json!("B12")), None);
        assert_eq!(bus_id_of(&json!(null)), None);
    }
}
