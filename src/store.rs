use crate::errors::AppError;
use crate::live::{CollectionSnapshot, LiveDocument, LiveFeed};
use crate::models::{
    Attendance, Bus, Driver, FleetData, LiveLocation, MaintenanceLog, RecordId, Resource, Route,
};
use crate::records::{Fields, Record};
use crate::storage::persist_data;
use axum::http::StatusCode;
use chrono::DateTime;
use std::{
    cmp::Reverse,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use tokio::sync::{broadcast, Mutex};
use tracing::info;

const CHANGE_CAPACITY: usize = 64;

/// Authoritative fleet state. Every mutation is persisted and then pushed to
/// live subscribers as a full collection snapshot.
#[derive(Clone)]
pub struct FleetStore {
    data_path: PathBuf,
    data: Arc<Mutex<FleetData>>,
    changes: broadcast::Sender<CollectionSnapshot>,
    ready: Arc<AtomicBool>,
}

impl FleetStore {
    pub fn new(data_path: PathBuf, data: FleetData) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            data_path,
            data: Arc::new(Mutex::new(data)),
            changes,
            ready: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Marks the live feed as available to subscribers.
    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::SeqCst);
    }

    pub async fn list<R: Record>(&self) -> Vec<R> {
        let data = self.data.lock().await;
        R::table(&data).to_vec()
    }

    pub async fn create<R: Record>(&self, fields: &Fields) -> Result<RecordId, AppError> {
        let mut data = self.data.lock().await;
        let mut next = data.clone();
        let id = next_id::<R>(&next)?;
        R::table_mut(&mut next).push(R::create(id, fields)?);

        self.commit(&mut data, next, R::RESOURCE).await?;
        info!(collection = R::RESOURCE.collection(), id, "record created");
        Ok(id)
    }

    pub async fn update<R: Record>(&self, id: RecordId, fields: &Fields) -> Result<(), AppError> {
        let mut data = self.data.lock().await;
        let mut next = data.clone();
        R::table_mut(&mut next)
            .iter_mut()
            .find(|record| record.id() == id)
            .ok_or_else(R::not_found)?
            .update(fields)?;

        self.commit(&mut data, next, R::RESOURCE).await?;
        info!(collection = R::RESOURCE.collection(), id, "record updated");
        Ok(())
    }

    pub async fn delete<R: Record>(&self, id: RecordId) -> Result<(), AppError> {
        let mut data = self.data.lock().await;
        let mut next = data.clone();
        let table = R::table_mut(&mut next);
        let position = table
            .iter()
            .position(|record| record.id() == id)
            .ok_or_else(R::not_found)?;
        table.remove(position);

        self.commit(&mut data, next, R::RESOURCE).await?;
        info!(collection = R::RESOURCE.collection(), id, "record deleted");
        Ok(())
    }

    pub async fn set_attendance(&self, id: RecordId, attendance: Attendance) -> Result<(), AppError> {
        let mut data = self.data.lock().await;
        let mut next = data.clone();
        next.drivers
            .iter_mut()
            .find(|driver| driver.id == id)
            .ok_or_else(Driver::not_found)?
            .attendance = attendance;

        self.commit(&mut data, next, Resource::Drivers).await?;
        info!(id, attendance = attendance.as_str(), "attendance marked");
        Ok(())
    }

    pub async fn set_live_location(
        &self,
        bus_id: RecordId,
        location: LiveLocation,
    ) -> Result<(), AppError> {
        let mut data = self.data.lock().await;
        let mut next = data.clone();
        next.live_locations.insert(bus_id, location);
        persist_data(&self.data_path, &next).await?;
        *data = next;
        Ok(())
    }

    pub async fn live_location(&self, bus_id: RecordId) -> Option<LiveLocation> {
        let data = self.data.lock().await;
        data.live_locations.get(&bus_id).cloned()
    }

    /// Persists `next` and only then makes it the current state; a failed
    /// write leaves memory and subscribers untouched.
    async fn commit(
        &self,
        data: &mut FleetData,
        next: FleetData,
        resource: Resource,
    ) -> Result<(), AppError> {
        persist_data(&self.data_path, &next).await?;
        *data = next;
        // No receivers simply means no dashboard is listening.
        let _ = self.changes.send(collection_snapshot(data, resource));
        Ok(())
    }
}

fn next_id<R: Record>(data: &FleetData) -> Result<RecordId, AppError> {
    let max = R::table(data).iter().map(R::id).max().unwrap_or(0);
    max.checked_add(1).ok_or_else(|| AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: format!("no identifiers left in {}", R::RESOURCE.collection()),
    })
}

impl LiveFeed for FleetStore {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn subscribe(&self) -> broadcast::Receiver<CollectionSnapshot> {
        self.changes.subscribe()
    }

    async fn snapshot(&self, resource: Resource) -> CollectionSnapshot {
        let data = self.data.lock().await;
        collection_snapshot(&data, resource)
    }
}

/// Builds the live view of one collection; `maintenance_logs` is ordered by
/// report time, newest first.
pub fn collection_snapshot(data: &FleetData, resource: Resource) -> CollectionSnapshot {
    let documents = match resource {
        Resource::Buses => documents::<Bus>(&data.buses),
        Resource::Drivers => documents::<Driver>(&data.drivers),
        Resource::Routes => documents::<Route>(&data.routes),
        Resource::Maintenance => {
            let mut logs: Vec<&MaintenanceLog> = data.maintenance.iter().collect();
            logs.sort_by_key(|log| {
                (
                    Reverse(DateTime::parse_from_rfc3339(&log.reported_at).ok()),
                    Reverse(log.id),
                )
            });
            logs.into_iter().filter_map(LiveDocument::from_record).collect()
        }
    };
    CollectionSnapshot {
        resource,
        documents,
    }
}

fn documents<R: Record>(records: &[R]) -> Vec<LiveDocument> {
    records.iter().filter_map(LiveDocument::from_record).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BusStatus;
    use serde_json::{json, Value};

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn temp_store(name: &str) -> FleetStore {
        let mut path = std::env::temp_dir();
        path.push(format!("fleet_admin_store_{}_{name}.json", std::process::id()));
        FleetStore::new(path, FleetData::default())
    }

    #[tokio::test]
    async fn create_assigns_increasing_ids() {
        let store = temp_store("ids");
        let first = store
            .create::<Bus>(&fields(json!({ "number": "101" })))
            .await
            .unwrap();
        let second = store
            .create::<Bus>(&fields(json!({ "number": "102", "status": "In Depot" })))
            .await
            .unwrap();
        assert_eq!((first, second), (1, 2));

        let buses = store.list::<Bus>().await;
        assert_eq!(buses[1].status, BusStatus::InDepot);
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let store = temp_store("missing");
        let err = store.delete::<Route>(9).await.unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.message, "Route not found");
    }

    #[tokio::test]
    async fn mutations_push_collection_snapshots() {
        let store = temp_store("push");
        let mut changes = store.subscribe();

        let id = store
            .create::<Driver>(&fields(json!({ "name": "Asha", "phone": "555" })))
            .await
            .unwrap();
        store.set_attendance(id, Attendance::Present).await.unwrap();

        let created = changes.recv().await.unwrap();
        assert_eq!(created.resource, Resource::Drivers);
        assert_eq!(created.documents[0].fields["attendance"], "Absent");

        let marked = changes.recv().await.unwrap();
        assert_eq!(marked.documents[0].id, id.to_string());
        assert_eq!(marked.documents[0].fields["attendance"], "Present");
    }

    #[tokio::test]
    async fn failed_write_leaves_state_unchanged() {
        let mut path = std::env::temp_dir();
        path.push(format!("fleet_admin_store_{}_no_such_dir", std::process::id()));
        path.push("missing/data.json");
        let store = FleetStore::new(path, FleetData::default());
        let mut changes = store.subscribe();

        let err = store
            .create::<Bus>(&fields(json!({ "number": "B12" })))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(store.list::<Bus>().await.is_empty());
        assert!(changes.try_recv().is_err());

        let err = store
            .set_live_location(
                1,
                LiveLocation {
                    lat: 12.9,
                    lng: 77.6,
                    speed: 0.0,
                    occupancy: 0,
                    last_update: "2025-11-20T08:00:00".into(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(store.live_location(1).await.is_none());
    }

    #[tokio::test]
    async fn failed_write_keeps_existing_records() {
        let mut path = std::env::temp_dir();
        path.push(format!("fleet_admin_store_{}_gone_dir", std::process::id()));
        path.push("missing/data.json");
        let mut data = FleetData::default();
        data.buses.push(Bus {
            id: 1,
            number: "B12".into(),
            route_id: None,
            status: BusStatus::Active,
        });
        let store = FleetStore::new(path, data);

        assert!(store.delete::<Bus>(1).await.is_err());
        assert!(store
            .update::<Bus>(1, &fields(json!({ "status": "Breakdown" })))
            .await
            .is_err());
        let buses = store.list::<Bus>().await;
        assert_eq!(buses.len(), 1);
        assert_eq!(buses[0].status, BusStatus::Active);
    }

    #[tokio::test]
    async fn exhausted_ids_are_an_error() {
        let mut data = FleetData::default();
        data.routes.push(Route {
            id: RecordId::MAX,
            name: "Ring Road".into(),
            start_stop: "Depot".into(),
            end_stop: "Market".into(),
            first_bus: String::new(),
            last_bus: String::new(),
            frequency_min: None,
        });
        let err = next_id::<Route>(&data).unwrap_err();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "no identifiers left in routes");
    }

    #[test]
    fn maintenance_snapshot_is_newest_first() {
        let mut data = FleetData::default();
        for (id, reported_at) in [
            (1, "2025-11-20T08:00:00+00:00"),
            (2, "2025-11-22T08:00:00+00:00"),
            (3, "2025-11-21T08:00:00+00:00"),
        ] {
            data.maintenance.push(MaintenanceLog {
                id,
                bus_id: 1,
                issue: format!("issue {id}"),
                status: crate::models::MaintenanceStatus::Pending,
                reported_at: reported_at.to_string(),
            });
        }

        let snapshot = collection_snapshot(&data, Resource::Maintenance);
        let ids: Vec<&str> = snapshot.documents.iter().map(|doc| doc.id.as_str()).collect();
        assert_eq!(ids, ["2", "3", "1"]);
    }
}
