use once_cell::sync::Lazy;
use reqwest::Client;
use serde_json::{json, Value};
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

struct TestServer {
    base_url: String,
    child: Child,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

static TEST_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
static SERVER: Lazy<Mutex<Option<Arc<TestServer>>>> = Lazy::new(|| Mutex::new(None));

#[cfg(unix)]
mod cleanup {
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Once;

    static REGISTER: Once = Once::new();
    static PID: AtomicI32 = AtomicI32::new(0);

    pub fn register(pid: u32) {
        REGISTER.call_once(|| {
            PID.store(pid as i32, Ordering::SeqCst);
            unsafe {
                libc::atexit(on_exit);
            }
        });
    }

    extern "C" fn on_exit() {
        let pid = PID.load(Ordering::SeqCst);
        if pid > 0 {
            unsafe {
                libc::kill(pid, libc::SIGTERM);
            }
        }
    }
}

fn pick_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn unique_data_path() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("fleet_admin_http_{}_{}.json", std::process::id(), nanos));
    path.to_string_lossy().to_string()
}

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/api/public/buses")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        if Instant::now() > deadline {
            panic!("server did not become ready");
        }
        sleep(Duration::from_millis(100)).await;
    }
}

async fn spawn_server() -> TestServer {
    let port = pick_free_port();
    let data_path = unique_data_path();
    let child = Command::new(env!("CARGO_BIN_EXE_fleet_admin"))
        .env("PORT", port.to_string())
        .env("APP_DATA_PATH", data_path)
        .env("RUST_LOG", "info")
        .env("LIVE_POLL_INTERVAL_MS", "50")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn server");

    #[cfg(unix)]
    cleanup::register(child.id());

    let base_url = format!("http://127.0.0.1:{port}");
    wait_until_ready(&base_url).await;

    TestServer { base_url, child }
}

async fn shared_server() -> Arc<TestServer> {
    let mut guard = SERVER.lock().await;
    if let Some(server) = guard.as_ref() {
        return Arc::clone(server);
    }
    let server = Arc::new(spawn_server().await);
    *guard = Some(Arc::clone(&server));
    server
}

fn http_client() -> Client {
    Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

fn unique(prefix: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .subsec_nanos();
    format!("{prefix}-{nanos}")
}

async fn get_json(client: &Client, url: String) -> Value {
    client.get(url).send().await.unwrap().json().await.unwrap()
}

fn find_by<'a>(records: &'a Value, key: &str, value: &str) -> Option<&'a Value> {
    records.as_array()?.iter().find(|record| record[key] == value)
}

/// Polls the dashboard until live sync has rendered `needle`.
async fn wait_for_page(client: &Client, url: String, needle: &str) {
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        let page = client.get(&url).send().await.unwrap().text().await.unwrap();
        if page.contains(needle) {
            return;
        }
        if Instant::now() > deadline {
            panic!("dashboard never showed {needle}");
        }
        sleep(Duration::from_millis(50)).await;
    }
}

#[tokio::test]
async fn http_add_bus_form_creates_bus() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = http_client();
    let number = unique("B");

    let response = client
        .post(format!("{}/forms/buses", server.base_url))
        .form(&[("number", number.as_str()), ("route_id", ""), ("status", "Active")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::SEE_OTHER);
    let location = response.headers()["location"].to_str().unwrap();
    assert!(location.contains("notice=success"));
    assert!(location.contains("Bus+added+successfully"));

    let buses = get_json(&client, format!("{}/api/public/buses", server.base_url)).await;
    let bus = find_by(&buses, "number", &number).expect("bus listed");
    assert_eq!(bus["status"], "Active");
    assert_eq!(bus["route_id"], Value::Null);
    assert!(bus["bus_id"].as_u64().is_some());

    wait_for_page(&client, format!("{}/?tab=buses", server.base_url), &number).await;
}

#[tokio::test]
async fn http_attendance_updates_driver() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = http_client();
    let name = unique("Asha");

    let created = client
        .post(format!("{}/api/drivers", server.base_url))
        .json(&json!({ "name": name, "phone": "9876543210" }))
        .send()
        .await
        .unwrap();
    assert!(created.status().is_success());
    let created: Value = created.json().await.unwrap();
    let driver_id = created["driver_id"].as_u64().unwrap();
    wait_for_page(&client, format!("{}/?tab=drivers", server.base_url), &name).await;

    let response = client
        .post(format!("{}/attendance/{driver_id}", server.base_url))
        .form(&[("status", "Present")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::SEE_OTHER);
    let location = response.headers()["location"].to_str().unwrap().to_string();
    assert!(location.contains(&format!("Attendance+marked+as+Present+for+{name}")));
    assert!(location.contains(&format!("highlight={driver_id}")));

    let drivers = get_json(&client, format!("{}/api/public/drivers", server.base_url)).await;
    let driver = find_by(&drivers, "name", &name).unwrap();
    assert_eq!(driver["attendance"], "Present");
}

#[tokio::test]
async fn http_delete_without_confirmation_keeps_record() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = http_client();
    let name = unique("Ring Road");

    let created: Value = client
        .post(format!("{}/api/routes", server.base_url))
        .json(&json!({ "name": name, "start_stop": "Depot", "end_stop": "Market" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let route_id = created["route_id"].as_u64().unwrap();

    let response = client
        .post(format!("{}/forms/routes/{route_id}/delete", server.base_url))
        .form(&[("confirm", "no")])
        .send()
        .await
        .unwrap();
    assert!(response.headers()["location"].to_str().unwrap().contains("notice=info"));

    let routes = get_json(&client, format!("{}/api/public/routes", server.base_url)).await;
    let route = find_by(&routes, "name", &name).expect("route kept");
    assert_eq!(route["first_bus"], "06:00");
    assert_eq!(route["frequency_min"], 15);

    client
        .post(format!("{}/forms/routes/{route_id}/delete", server.base_url))
        .form(&[("confirm", "yes")])
        .send()
        .await
        .unwrap();
    let routes = get_json(&client, format!("{}/api/public/routes", server.base_url)).await;
    assert!(find_by(&routes, "name", &name).is_none());
}

#[tokio::test]
async fn http_predictions_follow_live_location() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = http_client();

    let page = client
        .get(format!("{}/predict?bus_id=987654", server.base_url))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(page.contains("Error: no data"));

    let missing = client
        .get(format!("{}/api/predictions", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), reqwest::StatusCode::BAD_REQUEST);
    assert_eq!(missing.json::<Value>().await.unwrap(), json!({ "error": "bus_id required" }));

    let update = client
        .post(format!("{}/api/public/location-update", server.base_url))
        .json(&json!({ "bus_id": 42, "lat": 21.76, "lng": 72.15, "speed": 40, "occupancy": 12 }))
        .send()
        .await
        .unwrap();
    assert!(update.status().is_success());

    let prediction = get_json(&client, format!("{}/api/predictions?bus_id=42", server.base_url)).await;
    assert_eq!(prediction["bus_id"], "42");
    assert_eq!(prediction["crowd_level"], "Low");
    assert!(prediction["analysis"].as_str().unwrap().starts_with("Bus 42 is expected"));
}

#[tokio::test]
async fn http_backend_reports_missing_records() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = http_client();

    let response = client
        .put(format!("{}/api/buses/999999", server.base_url))
        .json(&json!({ "status": "Breakdown" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>().await.unwrap(), json!({ "error": "Bus not found" }));

    let response = client
        .post(format!("{}/api/buses", server.base_url))
        .json(&json!({ "number": "B1", "status": "Parked" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
}
