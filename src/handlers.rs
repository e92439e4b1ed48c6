//! Dashboard handlers. Every mutation is a form post answered with a
//! redirect back to the dashboard carrying the resulting notice.

use crate::attendance::mark_attendance;
use crate::edit::EditForm;
use crate::errors::AppError;
use crate::forms::{submit_create, submit_delete, submit_edit, FormFields, FormKey};
use crate::models::{Attendance, RecordId, Resource};
use crate::notify::{DeleteConfirmation, Modal, Notification};
use crate::predictions::{request_prediction, PredictionPanel};
use crate::render::Highlight;
use crate::state::AppState;
use crate::stats::build_summary;
use crate::sync::{LiveTables, TableUpdate};
use crate::tabs::Tab;
use crate::ui::{render_dashboard, DashboardView};
use axum::{
    extract::{Path, Query, State},
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, Redirect,
    },
    Form,
};
use serde::Deserialize;
use std::convert::Infallible;
use tokio_stream::{
    wrappers::{errors::BroadcastStreamRecvError, BroadcastStream},
    Stream, StreamExt,
};
use tracing::warn;

#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub tab: Option<String>,
    pub notice: Option<String>,
    pub message: Option<String>,
    pub edit: Option<String>,
    pub confirm: Option<String>,
    pub id: Option<String>,
    pub highlight: Option<String>,
    pub status: Option<String>,
}

pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Html<String> {
    let tab = Tab::parse(query.tab.as_deref());
    let tables = state.sync.tables().await;
    let modal = requested_modal(&query, &tables);
    let highlight = requested_highlight(&query);
    Html(page(&state, tab, tables, modal, highlight, None))
}

#[derive(Debug, Deserialize)]
pub struct PredictQuery {
    #[serde(default)]
    bus_id: String,
}

pub async fn predict(
    State(state): State<AppState>,
    Query(query): Query<PredictQuery>,
) -> Html<String> {
    let (panel, notice) = request_prediction(&state, &query.bus_id).await;
    let tables = state.sync.tables().await;
    Html(page(
        &state,
        Tab::Predictions,
        tables,
        notice.map(Modal::Notice),
        None,
        Some(panel),
    ))
}

pub async fn create(
    State(state): State<AppState>,
    Path(segment): Path<String>,
    Form(fields): Form<FormFields>,
) -> Result<Redirect, AppError> {
    let resource = resource_of(&segment)?;
    let notice = submit_create(&state, resource, &fields).await;
    Ok(notice.redirect(Tab::for_resource(resource), &[]))
}

pub async fn save_edit(
    State(state): State<AppState>,
    Path((segment, id)): Path<(String, RecordId)>,
    Form(fields): Form<FormFields>,
) -> Result<Redirect, AppError> {
    let resource = resource_of(&segment)?;
    let notice = submit_edit(&state, resource, id, &fields).await;
    Ok(notice.redirect(Tab::for_resource(resource), &[]))
}

#[derive(Debug, Deserialize)]
pub struct DeleteForm {
    confirm: Option<String>,
}

pub async fn delete(
    State(state): State<AppState>,
    Path((segment, id)): Path<(String, RecordId)>,
    Form(form): Form<DeleteForm>,
) -> Result<Redirect, AppError> {
    let resource = resource_of(&segment)?;
    let confirmed = form.confirm.as_deref() == Some("yes");
    let notice = submit_delete(&state, resource, id, confirmed).await;
    Ok(notice.redirect(Tab::for_resource(resource), &[]))
}

#[derive(Debug, Deserialize)]
pub struct AttendanceForm {
    status: String,
}

pub async fn attendance(
    State(state): State<AppState>,
    Path(driver_id): Path<RecordId>,
    Form(form): Form<AttendanceForm>,
) -> Redirect {
    let (notice, highlight) = mark_attendance(&state, driver_id, &form.status).await;
    match highlight {
        Some(mark) => {
            let id = mark.driver_id.to_string();
            notice.redirect(
                Tab::Drivers,
                &[("highlight", id.as_str()), ("status", mark.attendance.as_str())],
            )
        }
        None => notice.redirect(Tab::Drivers, &[]),
    }
}

/// Table updates for open dashboards, one `table` event per change. A page
/// that fell behind gets a `resync` event and reloads.
pub async fn live_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(state.sync.subscribe_updates())
        .filter_map(live_message)
        .map(|(name, data)| Ok::<_, Infallible>(Event::default().event(name).data(data)));
    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn live_message(
    update: Result<TableUpdate, BroadcastStreamRecvError>,
) -> Option<(&'static str, String)> {
    match update {
        Ok(update) => serde_json::to_string(&update).ok().map(|json| ("table", json)),
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            warn!(skipped, "dashboard stream lagged; asking the page to reload");
            Some(("resync", skipped.to_string()))
        }
    }
}

fn resource_of(segment: &str) -> Result<Resource, AppError> {
    Resource::parse(segment).ok_or_else(|| AppError::not_found(format!("unknown resource '{segment}'")))
}

fn page(
    state: &AppState,
    tab: Tab,
    tables: LiveTables,
    modal: Option<Modal>,
    highlight: Option<Highlight>,
    prediction: Option<PredictionPanel>,
) -> String {
    let modal_busy = match &modal {
        Some(Modal::Edit(form)) => state
            .submissions
            .is_busy(FormKey::Edit(form.resource(), form.id())),
        Some(Modal::ConfirmDelete(confirm)) => state
            .submissions
            .is_busy(FormKey::Delete(confirm.resource, confirm.id)),
        _ => false,
    };
    let busy_creates = Resource::ALL
        .into_iter()
        .filter(|resource| state.submissions.is_busy(FormKey::Create(*resource)))
        .collect();

    render_dashboard(&DashboardView {
        tab,
        summary: build_summary(&tables),
        tables,
        modal,
        modal_busy,
        busy_creates,
        highlight,
        prediction,
    })
}

/// Notice first, then an edit form, then a delete confirmation.
fn requested_modal(query: &DashboardQuery, tables: &LiveTables) -> Option<Modal> {
    if let Some(notice) = Notification::from_query(query.notice.as_deref(), query.message.as_deref()) {
        return Some(Modal::Notice(notice));
    }

    let id = query.id.as_deref().and_then(|id| id.trim().parse::<RecordId>().ok());
    if let Some(resource) = query.edit.as_deref().and_then(Resource::parse) {
        return Some(
            id.and_then(|id| EditForm::lookup(tables, resource, id))
                .map(Modal::Edit)
                .unwrap_or_else(|| missing_record(resource)),
        );
    }
    if let Some(resource) = query.confirm.as_deref().and_then(Resource::parse) {
        return Some(
            id.and_then(|id| DeleteConfirmation::lookup(tables, resource, id))
                .map(Modal::ConfirmDelete)
                .unwrap_or_else(|| missing_record(resource)),
        );
    }
    None
}

fn missing_record(resource: Resource) -> Modal {
    Modal::Notice(Notification::error(format!("{} not found.", resource.title())))
}

fn requested_highlight(query: &DashboardQuery) -> Option<Highlight> {
    let driver_id = query.highlight.as_deref()?.trim().parse().ok()?;
    let attendance = query.status.as_deref()?.parse::<Attendance>().ok()?;
    Some(Highlight {
        driver_id,
        attendance,
    })
}
