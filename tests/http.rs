use once_cell::sync::Lazy;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EmotionLog {
    has_negative_emotion: bool,
    negative_thought_count: u64,
    positive_thought_count: u64,
    note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DailyRecord {
    date: String,
    targets: BTreeMap<String, EmotionLog>,
    reflection: String,
    ai_advice: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrendPoint {
    date: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatsResponse {
    trend: Vec<TrendPoint>,
    targets: Vec<serde_json::Value>,
    peace_rate: u64,
    days_recorded: u64,
}

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
    path.push(format!("mindful_mirror_http_{}_{}.json", std::process::id(), nanos));
    path.to_string_lossy().to_string()
}

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/api/today")).send().await {
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
    let child = Command::new(env!("CARGO_BIN_EXE_mindful-mirror"))
        .env("PORT", port.to_string())
        .env("APP_DATA_PATH", data_path)
        .env("RUST_LOG", "info")
        .env_remove("GEMINI_API_KEY")
        .env_remove("API_KEY")
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

async fn today(client: &Client, server: &TestServer) -> DailyRecord {
    client
        .get(format!("{}/api/today", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

async fn list_records(client: &Client, server: &TestServer) -> Vec<DailyRecord> {
    client
        .get(format!("{}/api/records", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn http_today_is_created_once_with_all_targets() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let first = today(&client, &server).await;
    let second = today(&client, &server).await;
    assert_eq!(first, second);
    assert_eq!(first.targets.len(), 3);
    for name in ["Wife", "Son", "Parents"] {
        assert!(first.targets.contains_key(name), "missing {name}");
    }

    let records = list_records(&client, &server).await;
    assert!(records.iter().any(|record| record.date == first.date));
}

#[tokio::test]
async fn http_thoughts_adjust_and_clamp() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let before = today(&client, &server).await;
    let wife_before = before.targets["Wife"].clone();

    let updated: DailyRecord = client
        .post(format!("{}/api/today/thoughts", server.base_url))
        .json(&serde_json::json!({ "target": "Wife", "deltaPositive": 1, "deltaNegative": 1 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let wife = &updated.targets["Wife"];
    assert_eq!(wife.positive_thought_count, wife_before.positive_thought_count + 1);
    assert_eq!(wife.negative_thought_count, wife_before.negative_thought_count + 1);

    let response = client
        .post(format!("{}/api/today/thoughts", server.base_url))
        .json(&serde_json::json!({ "target": "Wife", "deltaPositive": -1000, "deltaNegative": -1000 }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let after = today(&client, &server).await;
    assert_eq!(after.targets["Wife"].positive_thought_count, 0);
    assert_eq!(after.targets["Wife"].negative_thought_count, 0);
    assert_eq!(after.targets["Son"], before.targets["Son"]);
}

#[tokio::test]
async fn http_verdict_and_note_are_saved() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let response = client
        .post(format!("{}/api/today/verdict", server.base_url))
        .json(&serde_json::json!({ "target": "Parents", "hasNegativeEmotion": true }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let response = client
        .post(format!("{}/api/today/note", server.base_url))
        .json(&serde_json::json!({ "target": "Parents", "note": "long phone call" }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let record = today(&client, &server).await;
    assert!(record.targets["Parents"].has_negative_emotion);
    assert_eq!(record.targets["Parents"].note.as_deref(), Some("long phone call"));

    let response = client
        .post(format!("{}/api/today/verdict", server.base_url))
        .json(&serde_json::json!({ "target": "Neighbour", "hasNegativeEmotion": true }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn http_advice_without_key_uses_fallback() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let response = client
        .post(format!("{}/api/today/reflection", server.base_url))
        .json(&serde_json::json!({ "reflection": "   " }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let response = client
        .post(format!("{}/api/today/advice", server.base_url))
        .json(&serde_json::json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let record: DailyRecord = client
        .post(format!("{}/api/today/advice", server.base_url))
        .json(&serde_json::json!({ "reflection": "I was short with my son" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(record.reflection, "I was short with my son");
    assert_eq!(
        record.ai_advice.as_deref(),
        Some(mindful_mirror::advice::MISSING_KEY_MESSAGE)
    );

    let stored = today(&client, &server).await;
    assert_eq!(stored, record);
}

#[tokio::test]
async fn http_backup_round_trip_and_rejects_corrupt_import() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    today(&client, &server).await;
    let before = list_records(&client, &server).await;

    let response = client
        .get(format!("{}/api/backup", server.base_url))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let content_type = response.headers()[reqwest::header::CONTENT_TYPE].to_str().unwrap().to_string();
    assert_eq!(content_type, "application/json");
    let disposition = response.headers()[reqwest::header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("mindful_mirror_backup_"));
    let blob = response.text().await.unwrap();

    let response = client
        .post(format!("{}/api/backup", server.base_url))
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(list_records(&client, &server).await, before);

    let response = client
        .post(format!("{}/api/backup", server.base_url))
        .body(blob)
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    assert_eq!(list_records(&client, &server).await, before);
}

#[tokio::test]
async fn http_stats_and_record_lookup() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let current = today(&client, &server).await;

    let stats: StatsResponse = client
        .get(format!("{}/api/stats?window=1", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats.trend.len(), 1);
    assert_eq!(stats.trend[0].date, current.date);
    assert_eq!(stats.targets.len(), 3);
    assert!(stats.days_recorded >= 1);
    assert!(stats.peace_rate <= 100);

    let found: DailyRecord = client
        .get(format!("{}/api/records/{}", server.base_url, current.date))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(found.date, current.date);

    let response = client
        .get(format!("{}/api/records/1999-01-01", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = client
        .get(format!("{}/api/records/yesterday", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
