use crate::errors::AppError;
use crate::models::FleetData;
use std::path::Path;
use tokio::fs;
use tracing::error;

pub async fn load_data(path: &Path) -> FleetData {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(data) => data,
            Err(err) => {
                error!("failed to parse data file {}: {err}", path.display());
                FleetData::default()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => FleetData::default(),
        Err(err) => {
            error!("failed to read data file {}: {err}", path.display());
            FleetData::default()
        }
    }
}

pub async fn persist_data(path: &Path, data: &FleetData) -> Result<(), AppError> {
    let payload = serde_json::to_vec_pretty(data).map_err(AppError::internal)?;
    fs::write(path, payload).await.map_err(AppError::internal)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Attendance, Driver};
    use std::{env, path::PathBuf};

    fn temp_path(name: &str) -> PathBuf {
        let mut path = env::temp_dir();
        path.push(format!("fleet_admin_storage_{}_{name}.json", std::process::id()));
        path
    }

    #[tokio::test]
    async fn missing_file_loads_empty_data() {
        let data = load_data(&temp_path("missing")).await;
        assert!(data.buses.is_empty());
        assert!(data.live_locations.is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_loads_empty_data() {
        let path = temp_path("corrupt");
        fs::write(&path, b"{ not json").await.unwrap();
        let data = load_data(&path).await;
        assert!(data.drivers.is_empty());
        let _ = fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn persisted_data_reloads() {
        let path = temp_path("persist");
        let mut data = FleetData::default();
        data.drivers.push(Driver {
            id: 7,
            name: "Asha".into(),
            phone: "9876543210".into(),
            attendance: Attendance::Present,
        });
        persist_data(&path, &data).await.unwrap();

        let loaded = load_data(&path).await;
        assert_eq!(loaded.drivers, data.drivers);
        let _ = fs::remove_file(&path).await;
    }
}
