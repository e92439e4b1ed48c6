//! Attendance Handler. The driver row only carries its id; the current name
//! comes from the live tables and the local patch goes through the same
//! idempotent update path as pushed snapshots.

use crate::forms::FormKey;
use crate::models::{Attendance, RecordId};
use crate::notify::Notification;
use crate::render::Highlight;
use crate::state::AppState;
use crate::sync::TableChange;
use serde_json::{json, Value};
use tracing::{error, info};

pub async fn mark_attendance(
    state: &AppState,
    driver_id: RecordId,
    status: &str,
) -> (Notification, Option<Highlight>) {
    let Ok(attendance) = status.parse::<Attendance>() else {
        return (Notification::error(format!("Unknown attendance status '{status}'.")), None);
    };
    let Some(_permit) = state.submissions.try_begin(FormKey::Attendance(driver_id)) else {
        return (
            Notification::info("This form is already being submitted. Please wait."),
            None,
        );
    };

    let name = state
        .sync
        .tables()
        .await
        .driver(driver_id)
        .map(|driver| driver.name.clone())
        .unwrap_or_else(|| format!("driver {driver_id}"));

    let path = format!("/api/drivers/{driver_id}/attendance");
    let body = json!({ "status": attendance.as_str() });
    if let Err(err) = state.client.post_json::<_, Value>(&path, &body).await {
        error!(driver_id, "attendance update failed: {err}");
        return (
            Notification::error("Failed to update attendance. Please try again."),
            None,
        );
    }

    state
        .sync
        .apply(TableChange::Attendance {
            driver_id,
            attendance,
        })
        .await;
    info!(driver_id, status = attendance.as_str(), "attendance marked");

    (
        Notification::success(format!("Attendance marked as {attendance} for {name}")),
        Some(Highlight {
            driver_id,
            attendance,
        }),
    )
}
