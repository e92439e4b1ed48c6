use crate::errors::ClientError;
use crate::models::{Prediction, PredictionReply};
use crate::notify::Notification;
use crate::state::AppState;
use tracing::error;
use url::form_urlencoded;

/// Contents of the result panel on the predictions tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictionPanel {
    pub bus_id: String,
    pub text: String,
}

pub async fn request_prediction(
    state: &AppState,
    bus_id: &str,
) -> (PredictionPanel, Option<Notification>) {
    let bus_id = bus_id.trim();
    let panel = |text: String| PredictionPanel {
        bus_id: bus_id.to_string(),
        text,
    };
    if bus_id.is_empty() {
        return (panel(String::new()), Some(Notification::error("Please select a bus ID")));
    }

    let query: String = form_urlencoded::Serializer::new(String::new())
        .append_pair("bus_id", bus_id)
        .finish();
    let reply = state
        .client
        .get_json::<PredictionReply>(&format!("/api/predictions?{query}"))
        .await
        .or_else(logical_error);

    match reply {
        Ok(PredictionReply::Ready(prediction)) => (
            panel(format_prediction(&prediction)),
            Some(Notification::info("AI prediction generated successfully!")),
        ),
        Ok(PredictionReply::Failed { error }) => (
            panel(format!("Error: {error}")),
            Some(Notification::error(error)),
        ),
        Err(err) => {
            error!(bus_id, "prediction request failed: {err}");
            (
                panel("Error: Failed to fetch prediction".to_string()),
                Some(Notification::error("Failed to get AI prediction. Please try again.")),
            )
        }
    }
}

/// A non-2xx reply that still carries an `{error}` body is reported as the
/// backend's own message.
fn logical_error(err: ClientError) -> Result<PredictionReply, ClientError> {
    if let ClientError::Status { body, .. } = &err {
        if let Ok(reply @ PredictionReply::Failed { .. }) = serde_json::from_str::<PredictionReply>(body) {
            return Ok(reply);
        }
    }
    Err(err)
}

pub fn format_prediction(prediction: &Prediction) -> String {
    format!(
        "🚌 Bus ID: {}\n\n⏱️  Predicted ETA: {} minutes\n👥 Crowd Level: {}\n📊 Peak Hour: {}\n\n📝 Analysis:\n{}",
        prediction.bus_id,
        prediction.predicted_eta_min,
        prediction.crowd_level,
        if prediction.is_peak_hour { "Yes" } else { "No" },
        prediction.analysis
    )
}
