//! Real-time sync: keeps the dashboard tables in step with the live
//! collections and fans rendered updates out to open pages.

use crate::charts::{chart_widgets, ChartWidget};
use crate::live::{
    decode_buses, decode_drivers, decode_maintenance, decode_routes, CollectionSnapshot, LiveFeed,
};
use crate::models::{
    Attendance, Bus, Driver, MaintenanceRecord, RecordId, Resource, Route, Summary,
};
use crate::render::table_rows;
use crate::stats::build_summary;
use serde::Serialize;
use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};
use tokio::{
    sync::{broadcast, broadcast::error::RecvError, RwLock},
    task::JoinHandle,
    time::sleep,
};
use tracing::{debug, info, warn};

const UPDATE_CAPACITY: usize = 64;

/// The latest snapshot of every table shown on the dashboard.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveTables {
    pub buses: Vec<Bus>,
    pub drivers: Vec<Driver>,
    pub routes: Vec<Route>,
    pub maintenance: Vec<MaintenanceRecord>,
}

impl LiveTables {
    /// Reads every collection from `feed` once.
    pub async fn load<F: LiveFeed>(feed: &F) -> Self {
        let mut tables = Self::default();
        for resource in Resource::ALL {
            tables.apply(TableChange::Snapshot(feed.snapshot(resource).await));
        }
        tables
    }

    pub fn bus(&self, id: RecordId) -> Option<&Bus> {
        self.buses.iter().find(|bus| bus.id == id)
    }

    pub fn driver(&self, id: RecordId) -> Option<&Driver> {
        self.drivers.iter().find(|driver| driver.id == id)
    }

    pub fn route(&self, id: RecordId) -> Option<&Route> {
        self.routes.iter().find(|route| route.id == id)
    }

    pub fn maintenance_record(&self, id: RecordId) -> Option<&MaintenanceRecord> {
        self.maintenance.iter().find(|record| record.id == id)
    }

    /// Applies a change and reports which table it altered, if any.
    pub fn apply(&mut self, change: TableChange) -> Option<Resource> {
        match change {
            TableChange::Snapshot(snapshot) => {
                let resource = snapshot.resource;
                let changed = match resource {
                    Resource::Buses => replace(&mut self.buses, decode_buses(&snapshot)),
                    Resource::Drivers => replace(&mut self.drivers, decode_drivers(&snapshot)),
                    Resource::Routes => replace(&mut self.routes, decode_routes(&snapshot)),
                    Resource::Maintenance => {
                        replace(&mut self.maintenance, decode_maintenance(&snapshot))
                    }
                };
                changed.then_some(resource)
            }
            TableChange::Attendance {
                driver_id,
                attendance,
            } => {
                let driver = self.drivers.iter_mut().find(|driver| driver.id == driver_id)?;
                if driver.attendance == attendance {
                    return None;
                }
                driver.attendance = attendance;
                Some(Resource::Drivers)
            }
        }
    }
}

fn replace<T: PartialEq>(slot: &mut Vec<T>, next: Vec<T>) -> bool {
    if *slot == next {
        return false;
    }
    *slot = next;
    true
}

/// Every way a table can change: a pushed collection snapshot, or a local
/// attendance patch keyed by driver id.
#[derive(Debug, Clone)]
pub enum TableChange {
    Snapshot(CollectionSnapshot),
    Attendance {
        driver_id: RecordId,
        attendance: Attendance,
    },
}

/// What open dashboards receive after a table changed.
#[derive(Debug, Clone, Serialize)]
pub struct TableUpdate {
    pub target: &'static str,
    pub html: String,
    pub summary: Summary,
    pub charts: Vec<ChartWidget>,
}

impl TableUpdate {
    fn render(resource: Resource, tables: &LiveTables) -> Self {
        let summary = build_summary(tables);
        Self {
            target: resource.table_id(),
            html: table_rows(resource, tables, None),
            summary,
            charts: chart_widgets(&summary),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    Waiting,
    Active,
    GaveUp,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_checks: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(500),
            max_checks: 20,
        }
    }
}

#[derive(Clone)]
pub struct SyncManager {
    inner: Arc<Inner>,
}

struct Inner {
    tables: RwLock<LiveTables>,
    phase: Mutex<SyncPhase>,
    task: Mutex<Option<JoinHandle<()>>>,
    updates: broadcast::Sender<TableUpdate>,
    poll: PollSettings,
}

impl SyncManager {
    pub fn new(poll: PollSettings) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                tables: RwLock::new(LiveTables::default()),
                phase: Mutex::new(SyncPhase::Idle),
                task: Mutex::new(None),
                updates,
                poll,
            }),
        }
    }

    pub fn phase(&self) -> SyncPhase {
        *lock(&self.inner.phase)
    }

    pub async fn tables(&self) -> LiveTables {
        self.inner.tables.read().await.clone()
    }

    pub fn subscribe_updates(&self) -> broadcast::Receiver<TableUpdate> {
        self.inner.updates.subscribe()
    }

    /// Attaches to `feed`. Returns false when already waiting on or
    /// subscribed to a feed; nothing is attached twice.
    pub fn init<F: LiveFeed>(&self, feed: Arc<F>) -> bool {
        {
            let mut phase = lock(&self.inner.phase);
            if matches!(*phase, SyncPhase::Waiting | SyncPhase::Active) {
                debug!(phase = ?*phase, "live sync already attached");
                return false;
            }
            *phase = SyncPhase::Waiting;
        }

        let manager = self.clone();
        let handle = tokio::spawn(async move { manager.run(feed).await });
        if let Some(previous) = lock(&self.inner.task).replace(handle) {
            previous.abort();
        }
        true
    }

    pub fn teardown(&self) {
        if let Some(task) = lock(&self.inner.task).take() {
            task.abort();
        }
        let mut phase = lock(&self.inner.phase);
        if *phase != SyncPhase::Idle {
            *phase = SyncPhase::Stopped;
        }
        info!("live sync stopped");
    }

    /// The single update path for table state. Returns whether anything
    /// changed; unchanged tables emit no update.
    pub async fn apply(&self, change: TableChange) -> bool {
        let mut tables = self.inner.tables.write().await;
        let Some(resource) = tables.apply(change) else {
            return false;
        };
        let update = TableUpdate::render(resource, &tables);
        drop(tables);

        debug!(collection = resource.collection(), "table re-rendered");
        // Nobody listening is fine; the next page load reads the tables.
        let _ = self.inner.updates.send(update);
        true
    }

    async fn run<F: LiveFeed>(self, feed: Arc<F>) {
        if !self.wait_until_ready(feed.as_ref()).await {
            warn!(
                checks = self.inner.poll.max_checks,
                "live backend never became ready; giving up on live sync"
            );
            self.set_phase(SyncPhase::GaveUp);
            return;
        }

        let mut changes = feed.subscribe();
        self.resync(feed.as_ref()).await;
        self.set_phase(SyncPhase::Active);
        info!("live sync active");

        loop {
            match changes.recv().await {
                Ok(snapshot) => {
                    self.apply(TableChange::Snapshot(snapshot)).await;
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "live sync lagged; reloading all collections");
                    self.resync(feed.as_ref()).await;
                }
                Err(RecvError::Closed) => break,
            }
        }

        info!("live feed closed");
        self.set_phase(SyncPhase::Stopped);
    }

    async fn wait_until_ready<F: LiveFeed>(&self, feed: &F) -> bool {
        let PollSettings {
            interval,
            max_checks,
        } = self.inner.poll;
        for check in 1..=max_checks {
            if feed.is_ready() {
                return true;
            }
            if check < max_checks {
                sleep(interval).await;
            }
        }
        false
    }

    async fn resync<F: LiveFeed>(&self, feed: &F) {
        for resource in Resource::ALL {
            let snapshot = feed.snapshot(resource).await;
            self.apply(TableChange::Snapshot(snapshot)).await;
        }
    }

    fn set_phase(&self, next: SyncPhase) {
        *lock(&self.inner.phase) = next;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
