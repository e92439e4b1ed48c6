//! Table renderers. Rows carry only their record id; edit and delete go
//! through dashboard links and attendance through a small form, so no field
//! value is ever embedded in script.

use crate::models::{Attendance, Bus, Driver, MaintenanceRecord, RecordId, Resource, Route};
use crate::sync::LiveTables;
use crate::tabs::Tab;
use std::fmt::Write;

/// Row emphasised after an attendance change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Highlight {
    pub driver_id: RecordId,
    pub attendance: Attendance,
}

pub fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

pub fn table_rows(resource: Resource, tables: &LiveTables, highlight: Option<Highlight>) -> String {
    match resource {
        Resource::Buses => bus_rows(&tables.buses),
        Resource::Drivers => driver_rows(&tables.drivers, highlight),
        Resource::Routes => route_rows(&tables.routes),
        Resource::Maintenance => maintenance_rows(&tables.maintenance),
    }
}

pub fn bus_rows(buses: &[Bus]) -> String {
    if buses.is_empty() {
        return empty_row(5, "No buses yet.");
    }
    let mut html = String::new();
    for bus in buses {
        let route = bus
            .route_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());
        let _ = write!(
            html,
            r#"<tr data-id="{id}"><td>{id}</td><td>{number}</td><td>{route}</td><td>{status}</td><td class="actions">{actions}</td></tr>"#,
            id = bus.id,
            number = escape(&bus.number),
            status = badge(bus.status.as_str()),
            actions = row_actions(Resource::Buses, bus.id),
        );
    }
    html
}

pub fn driver_rows(drivers: &[Driver], highlight: Option<Highlight>) -> String {
    if drivers.is_empty() {
        return empty_row(5, "No drivers yet.");
    }
    let mut html = String::new();
    for driver in drivers {
        let class = match highlight {
            Some(mark) if mark.driver_id == driver.id => match mark.attendance {
                Attendance::Present => r#" class="highlight-present""#,
                Attendance::Absent => r#" class="highlight-absent""#,
            },
            _ => "",
        };
        let _ = write!(
            html,
            concat!(
                r#"<tr data-id="{id}"{class}><td>{id}</td><td>{name}</td><td>{phone}</td>"#,
                r#"<td class="attendance">{attendance}</td><td class="actions">"#,
                r#"<form method="post" action="/attendance/{id}" class="inline-form">"#,
                r#"<button type="submit" name="status" value="Present" class="btn-small mark-present">Present</button>"#,
                r#"<button type="submit" name="status" value="Absent" class="btn-small mark-absent">Absent</button>"#,
                r#"</form>{actions}</td></tr>"#
            ),
            id = driver.id,
            class = class,
            name = escape(&driver.name),
            phone = escape(&driver.phone),
            attendance = badge(driver.attendance.as_str()),
            actions = row_actions(Resource::Drivers, driver.id),
        );
    }
    html
}

pub fn route_rows(routes: &[Route]) -> String {
    if routes.is_empty() {
        return empty_row(6, "No routes yet.");
    }
    let mut html = String::new();
    for route in routes {
        let frequency = route
            .frequency_min
            .map(|minutes| format!("every {minutes} min"))
            .unwrap_or_else(|| "-".to_string());
        let _ = write!(
            html,
            concat!(
                r#"<tr data-id="{id}"><td>{id}</td><td>{name}</td><td>{start} &rarr; {end}</td>"#,
                r#"<td>{first} &ndash; {last}</td><td>{frequency}</td><td class="actions">{actions}</td></tr>"#
            ),
            id = route.id,
            name = escape(&route.name),
            start = escape(&route.start_stop),
            end = escape(&route.end_stop),
            first = escape(&route.first_bus),
            last = escape(&route.last_bus),
            frequency = frequency,
            actions = row_actions(Resource::Routes, route.id),
        );
    }
    html
}

pub fn maintenance_rows(records: &[MaintenanceRecord]) -> String {
    if records.is_empty() {
        return empty_row(6, "No maintenance records yet.");
    }
    let mut html = String::new();
    for record in records {
        let reported = if record.reported_on.is_empty() {
            "-".to_string()
        } else {
            escape(&record.reported_on)
        };
        let _ = write!(
            html,
            r#"<tr data-id="{id}"><td>{id}</td><td>{bus}</td><td>{issue}</td><td>{status}</td><td>{reported}</td><td class="actions">{actions}</td></tr>"#,
            id = record.id,
            bus = record.bus_id,
            issue = escape(&record.issue),
            status = badge(record.status.as_str()),
            reported = reported,
            actions = row_actions(Resource::Maintenance, record.id),
        );
    }
    html
}

fn row_actions(resource: Resource, id: RecordId) -> String {
    let tab = Tab::for_resource(resource);
    let id = id.to_string();
    let edit = tab.url(&[("edit", resource.segment()), ("id", id.as_str())]);
    let delete = tab.url(&[("confirm", resource.segment()), ("id", id.as_str())]);
    format!(
        r#"<a class="btn-small btn-edit" href="{}">Edit</a><a class="btn-small btn-delete" href="{}">Delete</a>"#,
        escape(&edit),
        escape(&delete)
    )
}

fn badge(label: &str) -> String {
    let slug = label.to_ascii_lowercase().replace(' ', "-");
    format!(r#"<span class="badge status-{slug}">{}</span>"#, escape(label))
}

fn empty_row(columns: usize, message: &str) -> String {
    format!(r#"<tr class="empty"><td colspan="{columns}">{message}</td></tr>"#)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BusStatus, MaintenanceStatus};

    fn driver(id: RecordId, name: &str, attendance: Attendance) -> Driver {
        Driver {
            id,
            name: name.into(),
            phone: "9876543210".into(),
            attendance,
        }
    }

    #[test]
    fn rows_carry_ids_and_dashboard_links() {
        let html = bus_rows(&[Bus {
            id: 3,
            number: "B12".into(),
            route_id: None,
            status: BusStatus::InDepot,
        }]);
        assert!(html.contains(r#"<tr data-id="3">"#));
        assert!(html.contains(r#"href="/?tab=buses&amp;edit=buses&amp;id=3""#));
        assert!(html.contains(r#"href="/?tab=buses&amp;confirm=buses&amp;id=3""#));
        assert!(html.contains("status-in-depot"));
        assert!(!html.contains("onclick"));
    }

    #[test]
    fn field_values_are_escaped() {
        let html = driver_rows(&[driver(1, "O'Brien <b>", Attendance::Absent)], None);
        assert!(html.contains("O&#39;Brien &lt;b&gt;"));
        assert!(!html.contains("<b>"));
    }

    #[test]
    fn highlight_marks_only_the_patched_row() {
        let drivers = [
            driver(1, "Ramesh", Attendance::Absent),
            driver(7, "Asha", Attendance::Present),
        ];
        let html = driver_rows(
            &drivers,
            Some(Highlight {
                driver_id: 7,
                attendance: Attendance::Present,
            }),
        );
        assert_eq!(html.matches("highlight-present").count(), 1);
        assert!(html.contains(r#"<tr data-id="7" class="highlight-present">"#));
        assert!(html.contains(r#"action="/attendance/7""#));
    }

    #[test]
    fn rendering_is_idempotent() {
        let mut tables = LiveTables::default();
        tables.maintenance.push(MaintenanceRecord {
            id: 1,
            bus_id: 2,
            issue: "Engine check".into(),
            status: MaintenanceStatus::Pending,
            reported_on: "2025-11-20 09:15".into(),
        });
        let first = table_rows(Resource::Maintenance, &tables, None);
        let second = table_rows(Resource::Maintenance, &tables, None);
        assert_eq!(first, second);
        assert!(first.contains("2025-11-20 09:15"));
    }

    #[test]
    fn empty_tables_render_placeholder() {
        assert!(route_rows(&[]).contains("No routes yet."));
    }
}
