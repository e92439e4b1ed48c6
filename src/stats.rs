use crate::models::{Attendance, BusStatus, MaintenanceStatus, Summary};
use crate::sync::LiveTables;

pub fn build_summary(tables: &LiveTables) -> Summary {
    let buses_with = |status: BusStatus| tables.buses.iter().filter(|bus| bus.status == status).count();
    let drivers_with = |attendance: Attendance| {
        tables
            .drivers
            .iter()
            .filter(|driver| driver.attendance == attendance)
            .count()
    };
    let maintenance_with = |status: MaintenanceStatus| {
        tables
            .maintenance
            .iter()
            .filter(|record| record.status == status)
            .count()
    };

    Summary {
        total_buses: tables.buses.len(),
        active_buses: buses_with(BusStatus::Active),
        inactive_buses: buses_with(BusStatus::InDepot),
        breakdown_buses: buses_with(BusStatus::Breakdown),
        total_drivers: tables.drivers.len(),
        present_drivers: drivers_with(Attendance::Present),
        absent_drivers: drivers_with(Attendance::Absent),
        total_routes: tables.routes.len(),
        total_maintenance: tables.maintenance.len(),
        pending_maintenance: maintenance_with(MaintenanceStatus::Pending),
        resolved_maintenance: maintenance_with(MaintenanceStatus::Resolved),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Bus, Driver, MaintenanceRecord};

    #[test]
    fn summary_counts_by_category() {
        let mut tables = LiveTables::default();
        for (id, status) in [
            (1, BusStatus::Active),
            (2, BusStatus::Active),
            (3, BusStatus::InDepot),
            (4, BusStatus::Breakdown),
        ] {
            tables.buses.push(Bus {
                id,
                number: id.to_string(),
                route_id: None,
                status,
            });
        }
        tables.drivers.push(Driver {
            id: 1,
            name: "Ramesh".into(),
            phone: "9876543210".into(),
            attendance: Attendance::Present,
        });
        for (id, status) in [
            (1, MaintenanceStatus::Pending),
            (2, MaintenanceStatus::InProgress),
            (3, MaintenanceStatus::Resolved),
        ] {
            tables.maintenance.push(MaintenanceRecord {
                id,
                bus_id: 1,
                issue: "Engine check".into(),
                status,
                reported_on: String::new(),
            });
        }

        let summary = build_summary(&tables);
        assert_eq!(summary.total_buses, 4);
        assert_eq!(summary.active_buses, 2);
        assert_eq!(summary.inactive_buses, 1);
        assert_eq!(summary.breakdown_buses, 1);
        assert_eq!(summary.present_drivers, 1);
        assert_eq!(summary.absent_drivers, 0);
        assert_eq!(summary.total_maintenance, 3);
        assert_eq!(summary.pending_maintenance, 1);
        assert_eq!(summary.resolved_maintenance, 1);
        assert_eq!(summary.total_routes, 0);
    }

    #[test]
    fn empty_tables_give_zero_summary() {
        assert_eq!(build_summary(&LiveTables::default()), Summary::default());
    }
}
