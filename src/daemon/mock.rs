//! In-process aria2 stand-in for tests
//!
//! Speaks just enough HTTP/1.1 and JSON-RPC for `RpcClient` and
//! `Aria2Session`. Records are kept in aria2's own JSON shape.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

#[derive(Debug, Default)]
pub struct MockState {
    pub secret: String,
    pub records: Vec<Value>,
    pub calls: Vec<String>,
    /// Registered by the next addUri/addTorrent; the first gid is returned
    pub pending_add: Vec<Value>,
    pub last_add_params: Vec<Value>,
    /// (gid, n): the record completes on the list poll after the n-th
    pub complete_after: Option<(String, usize)>,
    pub list_polls: usize,
}

pub struct MockDaemon {
    addr: SocketAddr,
    state: Arc<Mutex<MockState>>,
    task: JoinHandle<()>,
}

impl MockDaemon {
    pub async fn start(secret: &str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(Mutex::new(MockState {
            secret: secret.to_string(),
            ..Default::default()
        }));

        let shared = state.clone();
        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve_connection(stream, shared.clone()));
            }
        });

        Self { addr, state, task }
    }

    pub fn endpoint(&self) -> String {
        format!("http://{}/jsonrpc", self.addr)
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    pub fn record(&self, gid: &str) -> Option<Value> {
        self.with_state(|s| s.records.iter().find(|r| r["gid"] == gid).cloned())
    }
}

impl Drop for MockDaemon {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// A magnet metadata placeholder record
pub fn metadata_record(gid: &str, info_hash: &str, status: &str, followed_by: &[&str]) -> Value {
    json!({
        "gid": gid,
        "status": status,
        "totalLength": "0",
        "completedLength": "0",
        "downloadSpeed": "0",
        "infoHash": info_hash,
        "followedBy": followed_by,
        "files": [{"index": "1", "path": format!("[METADATA]{}", info_hash), "length": "0", "selected": "true"}]
    })
}

/// A content record for a single-file torrent
pub fn content_record(gid: &str, path: &str, total: u64, completed: u64, status: &str, following: Option<&str>) -> Value {
    let name = path.rsplit('/').next().unwrap_or(path);
    let mut record = json!({
        "gid": gid,
        "status": status,
        "totalLength": total.to_string(),
        "completedLength": completed.to_string(),
        "downloadSpeed": if status == "active" { "1048576" } else { "0" },
        "bittorrent": {"info": {"name": name}},
        "files": [{"index": "1", "path": path, "length": total.to_string(), "selected": "true"}]
    });
    if let Some(parent) = following {
        record["following"] = json!(parent);
    }
    record
}

async fn serve_connection(stream: TcpStream, state: Arc<Mutex<MockState>>) {
    let mut reader = BufReader::new(stream);
    let mut line = String::new();

    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }

        let mut content_length = 0usize;
        loop {
            line.clear();
            match reader.read_line(&mut line).await {
                Ok(0) | Err(_) => return,
                Ok(_) => {}
            }
            let header = line.trim_end();
            if header.is_empty() {
                break;
            }
            if let Some((name, value)) = header.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse().unwrap_or(0);
                }
            }
        }

        let mut body = vec![0u8; content_length];
        if reader.read_exact(&mut body).await.is_err() {
            return;
        }

        let request: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
        let response = dispatch(&mut state.lock().unwrap(), &request);
        let payload = response.to_string();
        let status = if response.get("error").is_some() { "400 Bad Request" } else { "200 OK" };
        let head = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json-rpc\r\nContent-Length: {}\r\n\r\n",
            status,
            payload.len()
        );

        let stream = reader.get_mut();
        if stream.write_all(head.as_bytes()).await.is_err() || stream.write_all(payload.as_bytes()).await.is_err() {
            return;
        }
    }
}

fn dispatch(state: &mut MockState, request: &Value) -> Value {
    let id = request.get("id").cloned().unwrap_or(Value::Null);
    let method = request.get("method").and_then(Value::as_str).unwrap_or_default().to_string();
    let mut params: Vec<Value> = request.get("params").and_then(Value::as_array).cloned().unwrap_or_default();
    state.calls.push(method.clone());

    if !state.secret.is_empty() {
        let token = format!("token:{}", state.secret);
        if params.first().and_then(Value::as_str) != Some(token.as_str()) {
            return rpc_error(id, "Unauthorized");
        }
        params.remove(0);
    }

    let gid_param = params.first().and_then(Value::as_str).unwrap_or_default().to_string();
    let not_found = |gid: &str| format!("GID {} is not found", gid);

    let outcome: Result<Value, String> = match method.as_str() {
        "aria2.getGlobalOption" => Ok(json!({"dir": "/downloads", "max-concurrent-downloads": "5"})),
        "aria2.addUri" | "aria2.addTorrent" => {
            state.last_add_params = params.clone();
            if state.pending_add.is_empty() {
                Err("No URI to download.".to_string())
            } else {
                let added = std::mem::take(&mut state.pending_add);
                let gid = added[0]["gid"].clone();
                state.records.extend(added);
                Ok(gid)
            }
        }
        "aria2.tellStatus" => state
            .records
            .iter()
            .find(|r| r["gid"] == gid_param.as_str())
            .cloned()
            .ok_or_else(|| not_found(&gid_param)),
        "aria2.tellActive" => {
            state.list_polls += 1;
            advance(state);
            Ok(filter(state, &["active"]))
        }
        "aria2.tellWaiting" => Ok(filter(state, &["waiting", "paused"])),
        "aria2.tellStopped" => Ok(filter(state, &["complete", "error", "removed"])),
        "aria2.remove" | "aria2.forceRemove" => {
            match state.records.iter_mut().find(|r| r["gid"] == gid_param.as_str()) {
                None => Err(not_found(&gid_param)),
                Some(record) => {
                    let queued = matches!(record["status"].as_str(), Some("active" | "waiting" | "paused"));
                    if queued {
                        record["status"] = json!("removed");
                        Ok(json!(gid_param))
                    } else {
                        Err(format!("Could not remove download {}", gid_param))
                    }
                }
            }
        }
        "aria2.removeDownloadResult" => {
            match state.records.iter().position(|r| r["gid"] == gid_param.as_str()) {
                None => Err(not_found(&gid_param)),
                Some(index) => {
                    let queued = matches!(state.records[index]["status"].as_str(), Some("active" | "waiting" | "paused"));
                    if queued {
                        Err(format!("Could not remove download result of GID#{}", gid_param))
                    } else {
                        state.records.remove(index);
                        Ok(json!("OK"))
                    }
                }
            }
        }
        other => Err(format!("No such method: {}", other)),
    };

    match outcome {
        Ok(result) => json!({"jsonrpc": "2.0", "id": id, "result": result}),
        Err(message) => rpc_error(id, &message),
    }
}

fn advance(state: &mut MockState) {
    let Some((gid, after)) = state.complete_after.clone() else {
        return;
    };
    if state.list_polls <= after {
        return;
    }
    if let Some(record) = state.records.iter_mut().find(|r| r["gid"] == gid.as_str()) {
        record["status"] = json!("complete");
        record["completedLength"] = record["totalLength"].clone();
        record["downloadSpeed"] = json!("0");
    }
    state.complete_after = None;
}

fn filter(state: &MockState, statuses: &[&str]) -> Value {
    Value::Array(
        state
            .records
            .iter()
            .filter(|r| r["status"].as_str().is_some_and(|s| statuses.contains(&s)))
            .cloned()
            .collect(),
    )
}

fn rpc_error(id: Value, message: &str) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "error": {"code": 1, "message": message}})
}
