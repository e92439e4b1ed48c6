use crate::charts::chart_widgets;
use crate::edit::{input, select};
use crate::models::{BusStatus, MaintenanceStatus, Resource, Summary};
use crate::notify::{submit_control, Modal};
use crate::predictions::PredictionPanel;
use crate::render::{escape, table_rows, Highlight};
use crate::sync::LiveTables;
use crate::tabs::{render_sidebar, Tab};
use serde::Serialize;

/// Everything one dashboard page shows.
pub struct DashboardView {
    pub tab: Tab,
    pub tables: LiveTables,
    pub summary: Summary,
    pub modal: Option<Modal>,
    pub modal_busy: bool,
    /// Add forms with a submission in flight.
    pub busy_creates: Vec<Resource>,
    pub highlight: Option<Highlight>,
    pub prediction: Option<PredictionPanel>,
}

pub fn render_dashboard(view: &DashboardView) -> String {
    let panels: String = Tab::ALL
        .into_iter()
        .map(|tab| {
            let body = match tab {
                Tab::Overview => overview_panel(&view.summary),
                Tab::Buses => resource_panel(Resource::Buses, view),
                Tab::Drivers => resource_panel(Resource::Drivers, view),
                Tab::Routes => resource_panel(Resource::Routes, view),
                Tab::Maintenance => resource_panel(Resource::Maintenance, view),
                Tab::Predictions => prediction_panel(&view.tables, view.prediction.as_ref()),
            };
            let active = if tab == view.tab { " active" } else { "" };
            format!(
                r#"<section class="tab-panel{active}" id="panel-{key}">{body}</section>"#,
                key = tab.key()
            )
        })
        .collect();

    let modal = view
        .modal
        .as_ref()
        .map(|modal| modal.render(view.tab, view.modal_busy))
        .unwrap_or_default();

    format!(
        concat!(
            "{head}<body data-tab=\"{tab}\">",
            r#"<aside class="sidebar"><div class="brand">🚍 Fleet Admin</div><ul class="nav">{sidebar}</ul></aside>"#,
            r#"<main class="content"><header><h1>{title}</h1><p class="subtitle">Buses, drivers, routes and maintenance at a glance.</p></header>{panels}</main>"#,
            "{modal}<script>window.dashboardSummary = {summary};\nwindow.dashboardCharts = {charts};</script>",
            "<script>{script}</script></body></html>"
        ),
        head = PAGE_HEAD,
        tab = view.tab.key(),
        sidebar = render_sidebar(view.tab),
        title = view.tab.title(),
        panels = panels,
        modal = modal,
        summary = script_json(&view.summary),
        charts = script_json(&chart_widgets(&view.summary)),
        script = PAGE_SCRIPT,
    )
}

/// JSON safe to embed inside a `<script>` element.
fn script_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .map(|json| json.replace('<', "\\u003c"))
        .unwrap_or_else(|_| "null".to_string())
}

fn overview_panel(summary: &Summary) -> String {
    let cards = [
        ("Total Buses", "total_buses", summary.total_buses),
        ("Active Buses", "active_buses", summary.active_buses),
        ("Drivers Present", "present_drivers", summary.present_drivers),
        ("Total Routes", "total_routes", summary.total_routes),
        ("Pending Maintenance", "pending_maintenance", summary.pending_maintenance),
    ]
    .into_iter()
    .map(|(label, key, value)| {
        format!(
            r#"<div class="stat"><span class="label">{label}</span><span class="value" data-summary="{key}">{value}</span></div>"#
        )
    })
    .collect::<String>();

    let charts = [
        ("busStatusChart", "Bus Status"),
        ("driverAttendanceChart", "Driver Attendance"),
        ("maintenanceChart", "Maintenance"),
        ("operationsChart", "Operations Overview"),
    ]
    .into_iter()
    .map(|(canvas, title)| {
        format!(r#"<div class="chart-card"><h3>{title}</h3><div class="chart-box"><canvas id="{canvas}"></canvas></div></div>"#)
    })
    .collect::<String>();

    format!(r#"<div class="stats">{cards}</div><div class="charts">{charts}</div>"#)
}

fn resource_panel(resource: Resource, view: &DashboardView) -> String {
    let busy = view.busy_creates.contains(&resource);
    let (form_id, button, fields) = add_form(resource);
    let headers: String = table_headers(resource)
        .iter()
        .map(|header| format!("<th>{header}</th>"))
        .collect();
    let highlight = match resource {
        Resource::Drivers => view.highlight,
        _ => None,
    };

    format!(
        concat!(
            r#"<div class="card"><h2>Add {title}</h2>"#,
            r#"<form id="{form_id}" class="add-form" method="post" action="/forms/{segment}">{fields}</form>"#,
            "{submit}</div>",
            r#"<div class="card"><table><thead><tr>{headers}</tr></thead><tbody id="{table_id}">{rows}</tbody></table></div>"#
        ),
        title = resource.title(),
        form_id = form_id,
        segment = resource.segment(),
        fields = fields,
        submit = submit_control(form_id, button, busy),
        headers = headers,
        table_id = resource.table_id(),
        rows = table_rows(resource, &view.tables, highlight),
    )
}

fn add_form(resource: Resource) -> (&'static str, &'static str, String) {
    match resource {
        Resource::Buses => (
            "addBusForm",
            "Add Bus",
            [
                input("Bus Number", "text", "number", "", true),
                input("Route ID", "number", "route_id", "", false),
                select(
                    "Status",
                    "status",
                    BusStatus::ALL.iter().map(|status| status.as_str()),
                    BusStatus::Active.as_str(),
                ),
            ]
            .concat(),
        ),
        Resource::Drivers => (
            "addDriverForm",
            "Add Driver",
            [
                input("Name", "text", "name", "", true),
                input("Phone", "text", "phone", "", true),
            ]
            .concat(),
        ),
        Resource::Routes => (
            "addRouteForm",
            "Add Route",
            [
                input("Route Name", "text", "name", "", true),
                input("Start Stop", "text", "start_stop", "", true),
                input("End Stop", "text", "end_stop", "", true),
                input("First Bus", "time", "first_bus", "", false),
                input("Last Bus", "time", "last_bus", "", false),
                input("Frequency (minutes)", "number", "frequency_min", "", false),
            ]
            .concat(),
        ),
        Resource::Maintenance => (
            "addMaintenanceForm",
            "Report Issue",
            [
                input("Bus ID", "number", "bus_id", "", true),
                input("Issue", "text", "issue", "", true),
                select(
                    "Status",
                    "status",
                    MaintenanceStatus::ALL.iter().map(|status| status.as_str()),
                    MaintenanceStatus::Pending.as_str(),
                ),
            ]
            .concat(),
        ),
    }
}

fn table_headers(resource: Resource) -> &'static [&'static str] {
    match resource {
        Resource::Buses => &["ID", "Number", "Route", "Status", "Actions"],
        Resource::Drivers => &["ID", "Name", "Phone", "Attendance", "Actions"],
        Resource::Routes => &["ID", "Name", "Stops", "Service", "Frequency", "Actions"],
        Resource::Maintenance => &["ID", "Bus", "Issue", "Status", "Reported", "Actions"],
    }
}

fn prediction_panel(tables: &LiveTables, panel: Option<&PredictionPanel>) -> String {
    let chosen = panel.map(|panel| panel.bus_id.as_str()).unwrap_or_default();
    let options: String = tables
        .buses
        .iter()
        .map(|bus| {
            let id = bus.id.to_string();
            let mark = if id == chosen { " selected" } else { "" };
            format!(
                r#"<option value="{id}"{mark}>{id} · {number}</option>"#,
                number = escape(&bus.number)
            )
        })
        .collect();
    let text = panel
        .map(|panel| escape(&panel.text))
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| "Select a bus to see its predicted ETA and crowd level.".to_string());

    format!(
        concat!(
            r#"<div class="card"><h2>🤖 AI Predictions</h2>"#,
            r#"<form id="aiPredictForm" class="add-form" method="get" action="/predict">"#,
            r#"<label>Bus</label><select id="aiBusId" name="bus_id"><option value="">Select a bus</option>{options}</select>"#,
            r#"<button type="submit" id="aiPredictBtn" class="btn-small btn-primary">Get Prediction</button></form>"#,
            r#"<pre id="aiResult">{text}</pre></div>"#
        ),
        options = options,
        text = text,
    )
}

const PAGE_HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Fleet Admin</title>
  <script src="https://cdn.jsdelivr.net/npm/chart.js"></script>
  <style>
    @import url('https://fonts.googleapis.com/css2?family=Space+Grotesk:wght@400;500;600&display=swap');

    :root {
      --bg: #f1f5f9;
      --ink: #1e293b;
      --muted: #64748b;
      --primary: #1e40af;
      --green: #059669;
      --amber: #d97706;
      --red: #dc2626;
      --card: #ffffff;
      --shadow: 0 12px 32px rgba(30, 41, 59, 0.08);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      display: grid;
      grid-template-columns: 240px 1fr;
      background: var(--bg);
      color: var(--ink);
      font-family: "Space Grotesk", "Trebuchet MS", sans-serif;
    }

    .sidebar {
      background: var(--primary);
      color: white;
      padding: 24px 16px;
    }

    .brand {
      font-size: 1.3rem;
      font-weight: 600;
      margin-bottom: 24px;
    }

    .nav {
      list-style: none;
      margin: 0;
      padding: 0;
      display: grid;
      gap: 6px;
    }

    .nav a {
      display: flex;
      gap: 10px;
      padding: 10px 12px;
      border-radius: 10px;
      color: rgba(255, 255, 255, 0.8);
      text-decoration: none;
    }

    .nav li.active a,
    .nav a:hover {
      background: rgba(255, 255, 255, 0.16);
      color: white;
    }

    .content {
      padding: 32px;
      display: grid;
      gap: 24px;
      align-content: start;
    }

    h1 {
      margin: 0;
      font-size: 1.9rem;
    }

    .subtitle {
      margin: 4px 0 0;
      color: var(--muted);
    }

    .tab-panel {
      display: none;
      gap: 20px;
    }

    .tab-panel.active {
      display: grid;
    }

    .card,
    .stat,
    .chart-card {
      background: var(--card);
      border-radius: 16px;
      box-shadow: var(--shadow);
      padding: 20px;
    }

    .card h2 {
      margin: 0 0 14px;
      font-size: 1.15rem;
    }

    .stats {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(170px, 1fr));
      gap: 16px;
    }

    .stat .label {
      display: block;
      font-size: 0.8rem;
      text-transform: uppercase;
      letter-spacing: 0.1em;
      color: var(--muted);
    }

    .stat .value {
      display: block;
      font-size: 1.8rem;
      font-weight: 600;
      color: var(--primary);
    }

    .charts {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(320px, 1fr));
      gap: 16px;
    }

    .chart-card h3 {
      margin: 0 0 10px;
      font-size: 1rem;
    }

    .chart-box {
      position: relative;
      height: 260px;
    }

    .add-form {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(180px, 1fr));
      gap: 8px 14px;
      align-items: end;
      margin-bottom: 12px;
    }

    .modal .modal-body form {
      display: grid;
      gap: 8px;
    }

    label {
      font-size: 0.8rem;
      color: var(--muted);
    }

    input,
    select {
      padding: 9px 10px;
      border: 1px solid #cbd5e1;
      border-radius: 8px;
      font: inherit;
    }

    table {
      width: 100%;
      border-collapse: collapse;
    }

    th,
    td {
      padding: 10px 8px;
      text-align: left;
      border-bottom: 1px solid #e2e8f0;
    }

    th {
      font-size: 0.8rem;
      text-transform: uppercase;
      color: var(--muted);
    }

    tr.empty td {
      text-align: center;
      color: var(--muted);
    }

    tr.highlight-present {
      background: rgba(5, 150, 105, 0.12);
    }

    tr.highlight-absent {
      background: rgba(220, 38, 38, 0.12);
    }

    .actions {
      display: flex;
      flex-wrap: wrap;
      gap: 6px;
    }

    .inline-form {
      display: inline-flex;
      gap: 6px;
    }

    .btn-small {
      appearance: none;
      border: none;
      border-radius: 8px;
      padding: 7px 12px;
      font: inherit;
      font-size: 0.85rem;
      font-weight: 600;
      cursor: pointer;
      text-decoration: none;
      display: inline-flex;
      align-items: center;
      gap: 6px;
    }

    .btn-small:disabled {
      opacity: 0.6;
      cursor: progress;
    }

    .btn-primary { background: var(--primary); color: white; }
    .btn-muted { background: #e2e8f0; color: var(--ink); }
    .btn-edit { background: #dbeafe; color: var(--primary); }
    .btn-delete { background: #fee2e2; color: var(--red); }
    .mark-present { background: #d1fae5; color: var(--green); }
    .mark-absent { background: #fee2e2; color: var(--red); }

    .badge {
      padding: 3px 10px;
      border-radius: 999px;
      font-size: 0.8rem;
      font-weight: 600;
      background: #e2e8f0;
    }

    .status-active,
    .status-present,
    .status-resolved { background: #d1fae5; color: var(--green); }
    .status-in-depot,
    .status-pending,
    .status-in-progress { background: #fef3c7; color: var(--amber); }
    .status-breakdown,
    .status-absent { background: #fee2e2; color: var(--red); }

    #aiResult {
      margin: 0;
      padding: 16px;
      min-height: 140px;
      border-radius: 12px;
      background: #0f172a;
      color: #e2e8f0;
      white-space: pre-wrap;
    }

    .modal-overlay {
      position: fixed;
      inset: 0;
      display: grid;
      place-items: center;
      background: rgba(15, 23, 42, 0.55);
    }

    .modal {
      width: min(480px, 92vw);
      background: var(--card);
      border-radius: 16px;
      box-shadow: var(--shadow);
      animation: rise 200ms ease;
    }

    .modal-header,
    .modal-footer {
      display: flex;
      justify-content: space-between;
      align-items: center;
      gap: 10px;
      padding: 16px 20px;
    }

    .modal-footer {
      justify-content: flex-end;
    }

    .modal-header h3 {
      margin: 0;
    }

    .modal-close {
      color: var(--muted);
      font-size: 1.4rem;
      text-decoration: none;
    }

    .modal-body {
      padding: 0 20px;
    }

    .loading {
      width: 12px;
      height: 12px;
      border: 2px solid rgba(255, 255, 255, 0.4);
      border-top-color: white;
      border-radius: 50%;
      animation: spin 700ms linear infinite;
    }

    @keyframes spin {
      to { transform: rotate(360deg); }
    }

    @keyframes rise {
      from { opacity: 0; transform: translateY(12px); }
      to { opacity: 1; transform: translateY(0); }
    }

    @media (max-width: 760px) {
      body {
        grid-template-columns: 1fr;
      }
    }
  </style>
</head>
"#;

const PAGE_SCRIPT: &str = r#"
    const charts = {};
    const overviewActive = () => document.body.dataset.tab === 'overview';

    const initializeCharts = (widgets) => {
      if (typeof Chart === 'undefined' || !overviewActive()) {
        return;
      }
      (widgets || []).forEach((widget) => {
        const canvas = document.getElementById(widget.canvas);
        if (!canvas) {
          return;
        }
        if (charts[widget.canvas]) {
          charts[widget.canvas].destroy();
        }
        charts[widget.canvas] = new Chart(canvas, widget.config);
      });
    };

    const applySummary = (summary) => {
      if (!summary) {
        return;
      }
      window.dashboardSummary = summary;
      document.querySelectorAll('[data-summary]').forEach((el) => {
        const value = summary[el.dataset.summary];
        if (value !== undefined) {
          el.textContent = value;
        }
      });
    };

    applySummary(window.dashboardSummary);
    initializeCharts(window.dashboardCharts);

    if (window.EventSource) {
      const events = new EventSource('/live/events');
      events.addEventListener('table', (event) => {
        const update = JSON.parse(event.data);
        const body = document.getElementById(update.target);
        if (body) {
          body.innerHTML = update.html;
        }
        applySummary(update.summary);
        initializeCharts(update.charts);
      });
      events.addEventListener('resync', () => window.location.reload());
    }

    document.querySelectorAll('form[id]').forEach((form) => {
      form.addEventListener('submit', () => {
        const buttons = document.querySelectorAll(`button[form="${form.id}"], #${form.id} button[type="submit"]`);
        setTimeout(() => {
          buttons.forEach((button) => {
            button.disabled = true;
            button.innerHTML = '<span class="loading"></span> Processing...';
          });
        }, 0);
      });
    });

    const overlay = document.querySelector('.modal-overlay');
    if (overlay) {
      const close = () => {
        window.location.href = overlay.dataset.closeHref;
      };
      overlay.addEventListener('click', (event) => {
        if (event.target === overlay) {
          close();
        }
      });
      document.addEventListener('keydown', (event) => {
        if (event.key === 'Escape') {
          close();
        }
      });
    }
"#;
