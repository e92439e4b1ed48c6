//! Edit modals: a form pre-filled from the current table state and bound to
//! one record id.

use crate::models::{
    Bus, BusStatus, Driver, MaintenanceRecord, MaintenanceStatus, RecordId, Resource, Route,
};
use crate::render::escape;
use crate::sync::LiveTables;

#[derive(Debug, Clone, PartialEq)]
pub enum EditForm {
    Bus(Bus),
    Driver(Driver),
    Route(Route),
    Maintenance(MaintenanceRecord),
}

impl EditForm {
    pub fn lookup(tables: &LiveTables, resource: Resource, id: RecordId) -> Option<Self> {
        Some(match resource {
            Resource::Buses => EditForm::Bus(tables.bus(id)?.clone()),
            Resource::Drivers => EditForm::Driver(tables.driver(id)?.clone()),
            Resource::Routes => EditForm::Route(tables.route(id)?.clone()),
            Resource::Maintenance => EditForm::Maintenance(tables.maintenance_record(id)?.clone()),
        })
    }

    pub fn resource(&self) -> Resource {
        match self {
            EditForm::Bus(_) => Resource::Buses,
            EditForm::Driver(_) => Resource::Drivers,
            EditForm::Route(_) => Resource::Routes,
            EditForm::Maintenance(_) => Resource::Maintenance,
        }
    }

    pub fn id(&self) -> RecordId {
        match self {
            EditForm::Bus(bus) => bus.id,
            EditForm::Driver(driver) => driver.id,
            EditForm::Route(route) => route.id,
            EditForm::Maintenance(record) => record.id,
        }
    }

    pub fn title(&self) -> String {
        format!("✏️ Edit {}", self.resource().title())
    }

    pub fn form_id(&self) -> String {
        match self {
            EditForm::Bus(_) => "editBusForm",
            EditForm::Driver(_) => "editDriverForm",
            EditForm::Route(_) => "editRouteForm",
            EditForm::Maintenance(_) => "editMaintenanceForm",
        }
        .to_string()
    }

    pub fn render(&self) -> String {
        let fields = match self {
            EditForm::Bus(bus) => [
                text_input("Bus Number", "number", &bus.number, true),
                number_input(
                    "Route ID",
                    "route_id",
                    &bus.route_id.map(|id| id.to_string()).unwrap_or_default(),
                    false,
                ),
                select(
                    "Status",
                    "status",
                    BusStatus::ALL.iter().map(|status| status.as_str()),
                    bus.status.as_str(),
                ),
            ]
            .concat(),
            EditForm::Driver(driver) => [
                text_input("Name", "name", &driver.name, true),
                text_input("Phone", "phone", &driver.phone, true),
            ]
            .concat(),
            EditForm::Route(route) => [
                text_input("Route Name", "name", &route.name, true),
                text_input("Start Stop", "start_stop", &route.start_stop, true),
                text_input("End Stop", "end_stop", &route.end_stop, true),
                time_input("First Bus", "first_bus", &route.first_bus),
                time_input("Last Bus", "last_bus", &route.last_bus),
                number_input(
                    "Frequency (minutes)",
                    "frequency_min",
                    &route.frequency_min.map(|min| min.to_string()).unwrap_or_default(),
                    false,
                ),
            ]
            .concat(),
            EditForm::Maintenance(record) => [
                number_input("Bus ID", "bus_id", &record.bus_id.to_string(), true),
                text_input("Issue", "issue", &record.issue, true),
                select(
                    "Status",
                    "status",
                    MaintenanceStatus::ALL.iter().map(|status| status.as_str()),
                    record.status.as_str(),
                ),
            ]
            .concat(),
        };

        format!(
            r#"<form id="{form_id}" method="post" action="/forms/{segment}/{id}">{fields}</form>"#,
            form_id = self.form_id(),
            segment = self.resource().segment(),
            id = self.id(),
        )
    }
}

fn text_input(label: &str, name: &str, value: &str, required: bool) -> String {
    input(label, "text", name, value, required)
}

fn number_input(label: &str, name: &str, value: &str, required: bool) -> String {
    input(label, "number", name, value, required)
}

fn time_input(label: &str, name: &str, value: &str) -> String {
    input(label, "time", name, value, false)
}

pub(crate) fn input(label: &str, kind: &str, name: &str, value: &str, required: bool) -> String {
    format!(
        r#"<label>{label}</label><input type="{kind}" name="{name}" value="{value}"{required}>"#,
        value = escape(value),
        required = if required { " required" } else { "" },
    )
}

pub(crate) fn select<'a>(
    label: &str,
    name: &str,
    options: impl Iterator<Item = &'a str>,
    selected: &str,
) -> String {
    let options: String = options
        .map(|option| {
            let mark = if option == selected { " selected" } else { "" };
            format!(r#"<option value="{0}"{mark}>{0}</option>"#, escape(option))
        })
        .collect();
    format!(r#"<label>{label}</label><select name="{name}">{options}</select>"#)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Attendance;

    #[test]
    fn bus_form_is_prefilled_and_bound_to_id() {
        let mut tables = LiveTables::default();
        tables.buses.push(Bus {
            id: 5,
            number: "B12".into(),
            route_id: None,
            status: BusStatus::Breakdown,
        });

        let form = EditForm::lookup(&tables, Resource::Buses, 5).unwrap();
        let html = form.render();
        assert!(html.contains(r#"action="/forms/buses/5""#));
        assert!(html.contains(r#"name="number" value="B12" required"#));
        assert!(html.contains(r#"name="route_id" value="""#));
        assert!(html.contains(r#"<option value="Breakdown" selected>"#));
        assert_eq!(form.title(), "✏️ Edit Bus");
    }

    #[test]
    fn driver_values_are_escaped_in_attributes() {
        let mut tables = LiveTables::default();
        tables.drivers.push(Driver {
            id: 2,
            name: "Asha \"Ace\"".into(),
            phone: "555".into(),
            attendance: Attendance::Present,
        });
        let html = EditForm::lookup(&tables, Resource::Drivers, 2).unwrap().render();
        assert!(html.contains(r#"value="Asha &quot;Ace&quot;""#));
    }

    #[test]
    fn unknown_record_has_no_form() {
        assert!(EditForm::lookup(&LiveTables::default(), Resource::Routes, 1).is_none());
    }
}
