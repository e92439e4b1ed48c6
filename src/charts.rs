use crate::models::Summary;
use serde::Serialize;
use serde_json::{json, Value};

const GREEN: &str = "#059669";
const AMBER: &str = "#d97706";
const RED: &str = "#dc2626";
const BLUE: &str = "#1e40af";

/// A chart widget: the canvas it draws on and its Chart.js configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartWidget {
    pub canvas: &'static str,
    pub config: Value,
}

pub fn chart_widgets(summary: &Summary) -> Vec<ChartWidget> {
    vec![
        ChartWidget {
            canvas: "busStatusChart",
            config: json!({
                "type": "doughnut",
                "data": {
                    "labels": ["Active", "In Depot", "Breakdown"],
                    "datasets": [{
                        "data": [summary.active_buses, summary.inactive_buses, summary.breakdown_buses],
                        "backgroundColor": [GREEN, AMBER, RED],
                        "borderWidth": 3,
                        "borderColor": "#ffffff"
                    }]
                },
                "options": legend_bottom()
            }),
        },
        ChartWidget {
            canvas: "driverAttendanceChart",
            config: json!({
                "type": "bar",
                "data": {
                    "labels": ["Present", "Absent"],
                    "datasets": [{
                        "label": "Drivers",
                        "data": [summary.present_drivers, summary.absent_drivers],
                        "backgroundColor": [GREEN, RED],
                        "borderRadius": 8
                    }]
                },
                "options": counted_axis()
            }),
        },
        ChartWidget {
            canvas: "maintenanceChart",
            config: json!({
                "type": "pie",
                "data": {
                    "labels": ["Pending", "Resolved"],
                    "datasets": [{
                        "data": [summary.pending_maintenance, summary.resolved_maintenance],
                        "backgroundColor": [AMBER, GREEN],
                        "borderWidth": 3,
                        "borderColor": "#ffffff"
                    }]
                },
                "options": legend_bottom()
            }),
        },
        ChartWidget {
            canvas: "operationsChart",
            config: json!({
                "type": "line",
                "data": {
                    "labels": ["Buses", "Drivers", "Routes", "Maintenance"],
                    "datasets": [{
                        "label": "Total Count",
                        "data": [
                            summary.total_buses,
                            summary.total_drivers,
                            summary.total_routes,
                            summary.total_maintenance
                        ],
                        "borderColor": BLUE,
                        "backgroundColor": "rgba(30, 64, 175, 0.1)",
                        "borderWidth": 3,
                        "fill": true,
                        "tension": 0.4,
                        "pointRadius": 6,
                        "pointBackgroundColor": BLUE
                    }]
                },
                "options": counted_axis()
            }),
        },
    ]
}

fn legend_bottom() -> Value {
    json!({
        "responsive": true,
        "maintainAspectRatio": false,
        "plugins": {
            "legend": {
                "position": "bottom",
                "labels": { "padding": 15, "font": { "size": 12, "weight": "600" } }
            }
        }
    })
}

fn counted_axis() -> Value {
    json!({
        "responsive": true,
        "maintainAspectRatio": false,
        "plugins": { "legend": { "display": false } },
        "scales": { "y": { "beginAtZero": true, "ticks": { "stepSize": 1 } } }
    })
}
