use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::future::Future;

use routecodex_pipeline::{DownstreamEvent, Event, EventSink, OperationalEvent, UpstreamEvent};
use serde_json::json;

/// Writes a best-effort per-stage snapshot tree mirroring
/// `~/.routecodex/codex-samples/<endpoint-folder>/<provider-key>/<groupRequestId>/<stage>.json`.
///
/// Never surfaces failures to the caller; a write error is swallowed, matching
/// every other sink fanned out from `EventHub`.
pub struct FsSnapshotEventSink {
    root: PathBuf,
}

impl FsSnapshotEventSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolves the default root, honoring `ROUTECODEX_SNAPSHOT_DIR`.
    pub fn default_root() -> PathBuf {
        if let Ok(dir) = std::env::var("ROUTECODEX_SNAPSHOT_DIR") {
            let trimmed = dir.trim();
            if !trimmed.is_empty() {
                return PathBuf::from(trimmed);
            }
        }
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        Path::new(&home).join(".routecodex").join("codex-samples")
    }
}

impl EventSink for FsSnapshotEventSink {
    fn write<'a>(&'a self, event: &'a Event) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            let _ = self.write_inner(event).await;
        })
    }
}

impl FsSnapshotEventSink {
    async fn write_inner(&self, event: &Event) -> std::io::Result<()> {
        match event {
            Event::Downstream(ev) => self.write_downstream(ev).await,
            Event::Upstream(ev) => self.write_upstream(ev).await,
            Event::Operational(ev) => self.write_operational(ev).await,
        }
    }

    async fn write_downstream(&self, ev: &DownstreamEvent) -> std::io::Result<()> {
        let dir = self.group_dir(&endpoint_folder(&ev.request_path), "client", &ev.trace_id);
        tokio::fs::create_dir_all(&dir).await?;

        let request = json!({
            "phase": "client-request",
            "at": timestamp_string(ev.at),
            "method": ev.request_method,
            "path": ev.request_path,
            "query": ev.request_query,
            "headers": ev.request_headers,
            "body": body_as_value(ev.request_body.as_deref()),
        });
        write_unique(&dir, "client-request", &request).await?;

        if ev.response_status.is_some() || ev.response_body.is_some() {
            let response = json!({
                "phase": "client-response",
                "at": timestamp_string(ev.at),
                "status": ev.response_status,
                "headers": ev.response_headers,
                "body": body_as_value(ev.response_body.as_deref()),
            });
            write_unique(&dir, "client-response", &response).await?;
        }
        Ok(())
    }

    async fn write_upstream(&self, ev: &UpstreamEvent) -> std::io::Result<()> {
        let provider_key = match ev.credential_id {
            Some(id) => format!("{}-{}", sanitize_segment(&ev.provider), id),
            None => sanitize_segment(&ev.provider),
        };
        let dir = self.group_dir(&endpoint_folder(&ev.request_path), &provider_key, &ev.trace_id);
        tokio::fs::create_dir_all(&dir).await?;

        let request_stage = if ev.attempt_no > 1 {
            format!("provider-request.retry{}", ev.attempt_no - 1)
        } else {
            "provider-request".to_string()
        };
        let request = json!({
            "phase": request_stage,
            "at": timestamp_string(ev.at),
            "operation": ev.operation,
            "internal": ev.internal,
            "attempt": ev.attempt_no,
            "method": ev.request_method,
            "path": ev.request_path,
            "query": ev.request_query,
            "headers": ev.request_headers,
            "body": body_as_value(ev.request_body.as_deref()),
        });
        write_unique(&dir, &request_stage, &request).await?;

        if ev.error_kind.is_some() {
            let error = json!({
                "phase": "provider-error",
                "at": timestamp_string(ev.at),
                "attempt": ev.attempt_no,
                "status": ev.response_status,
                "error_kind": ev.error_kind,
                "error_message": ev.error_message,
                "transport_kind": ev.transport_kind,
            });
            write_unique(&dir, "provider-error", &error).await?;
        } else if ev.response_status.is_some() {
            let response = json!({
                "phase": "provider-response",
                "at": timestamp_string(ev.at),
                "attempt": ev.attempt_no,
                "status": ev.response_status,
                "headers": ev.response_headers,
                "body": body_as_value(ev.response_body.as_deref()),
                "usage": ev.usage,
            });
            write_unique(&dir, "provider-response", &response).await?;
        }
        Ok(())
    }

    async fn write_operational(&self, ev: &OperationalEvent) -> std::io::Result<()> {
        let dir = self.root.join("operational");
        tokio::fs::create_dir_all(&dir).await?;
        write_unique(&dir, "operational", &json!(ev)).await
    }

    fn group_dir(&self, endpoint: &str, provider_key: &str, trace_id: &Option<String>) -> PathBuf {
        let group = trace_id
            .as_deref()
            .map(sanitize_segment)
            .unwrap_or_else(|| "unknown".to_string());
        self.root.join(endpoint).join(provider_key).join(group)
    }
}

fn endpoint_folder(path: &str) -> String {
    let trimmed = path.trim_start_matches('/');
    if trimmed.is_empty() {
        return "root".to_string();
    }
    sanitize_segment(trimmed)
}

fn sanitize_segment(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

fn body_as_value(body: Option<&[u8]>) -> serde_json::Value {
    match body {
        None => serde_json::Value::Null,
        Some(bytes) => match serde_json::from_slice::<serde_json::Value>(bytes) {
            Ok(value) => value,
            Err(_) => json!(String::from_utf8_lossy(bytes).to_string()),
        },
    }
}

fn timestamp_string(at: std::time::SystemTime) -> String {
    time::OffsetDateTime::from(at)
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "unknown".to_string())
}

/// Writes `stage.json` under `dir`, falling back to `stage-<n>.json` on
/// collision so concurrent attempts for the same `(groupRequestId, stage)`
/// never clobber each other.
async fn write_unique(dir: &Path, stage: &str, value: &serde_json::Value) -> std::io::Result<()> {
    let bytes = serde_json::to_vec_pretty(value).unwrap_or_default();
    let mut candidate = dir.join(format!("{stage}.json"));
    let mut suffix = 1u32;
    loop {
        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
            .await
        {
            Ok(mut file) => {
                use tokio::io::AsyncWriteExt;
                return file.write_all(&bytes).await;
            }
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                candidate = dir.join(format!("{stage}-{suffix}.json"));
                suffix += 1;
                if suffix > 10_000 {
                    return Err(err);
                }
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use routecodex_pipeline::Headers;
    use std::time::SystemTime;

    fn unique_root() -> PathBuf {
        std::env::temp_dir().join(format!(
            "routecodex-fs-snapshot-test-{}",
            std::process::id()
        ))
    }

    #[tokio::test]
    async fn downstream_event_writes_request_and_response() {
        let root = unique_root().join("downstream");
        let sink = FsSnapshotEventSink::new(root.clone());

        let event = Event::Downstream(DownstreamEvent {
            trace_id: Some("trace-1".to_string()),
            at: SystemTime::now(),
            user_id: None,
            user_key_id: None,
            request_method: "POST".to_string(),
            request_headers: Headers::default(),
            request_path: "/v1/chat/completions".to_string(),
            request_query: None,
            request_body: Some(br#"{"model":"gpt-oss"}"#.to_vec()),
            response_status: Some(200),
            response_headers: Headers::default(),
            response_body: Some(br#"{"ok":true}"#.to_vec()),
        });
        sink.write(&event).await;

        let dir = root
            .join("v1_chat_completions")
            .join("client")
            .join("trace-1");
        let request_raw = tokio::fs::read(dir.join("client-request.json"))
            .await
            .expect("client-request.json written");
        let request: serde_json::Value = serde_json::from_slice(&request_raw).unwrap();
        assert_eq!(request["phase"], "client-request");
        assert_eq!(request["body"]["model"], "gpt-oss");

        let response_raw = tokio::fs::read(dir.join("client-response.json"))
            .await
            .expect("client-response.json written");
        let response: serde_json::Value = serde_json::from_slice(&response_raw).unwrap();
        assert_eq!(response["status"], 200);

        let _ = tokio::fs::remove_dir_all(&root).await;
    }

    #[tokio::test]
    async fn upstream_retry_attempt_gets_distinct_stage_name() {
        let root = unique_root().join("upstream-retry");
        let sink = FsSnapshotEventSink::new(root.clone());

        let base = UpstreamEvent {
            trace_id: Some("trace-2".to_string()),
            at: SystemTime::now(),
            user_id: None,
            user_key_id: None,
            provider: "openai".to_string(),
            credential_id: Some(7),
            internal: false,
            attempt_no: 1,
            operation: "chat.completions".to_string(),
            request_method: "POST".to_string(),
            request_headers: Headers::default(),
            request_path: "/chat/completions".to_string(),
            request_query: None,
            request_body: None,
            response_status: None,
            response_headers: Headers::default(),
            response_body: None,
            usage: None,
            error_kind: None,
            error_message: None,
            transport_kind: None,
        };

        sink.write(&Event::Upstream(base.clone())).await;
        let mut retry = base.clone();
        retry.attempt_no = 2;
        sink.write(&Event::Upstream(retry)).await;

        let dir = root
            .join("chat_completions")
            .join("openai-7")
            .join("trace-2");
        assert!(tokio::fs::metadata(dir.join("provider-request.json"))
            .await
            .is_ok());
        assert!(tokio::fs::metadata(dir.join("provider-request.retry1.json"))
            .await
            .is_ok());

        let _ = tokio::fs::remove_dir_all(&root).await;
    }

    #[tokio::test]
    async fn write_unique_avoids_clobbering_on_collision() {
        let root = unique_root().join("write-unique");
        tokio::fs::create_dir_all(&root).await.unwrap();

        write_unique(&root, "provider-response", &json!({"n": 1}))
            .await
            .unwrap();
        write_unique(&root, "provider-response", &json!({"n": 2}))
            .await
            .unwrap();

        let first: serde_json::Value =
            serde_json::from_slice(&tokio::fs::read(root.join("provider-response.json")).await.unwrap())
                .unwrap();
        let second: serde_json::Value = serde_json::from_slice(
            &tokio::fs::read(root.join("provider-response-1.json"))
                .await
                .unwrap(),
        )
        .unwrap();
        assert_eq!(first["n"], 1);
        assert_eq!(second["n"], 2);

        let _ = tokio::fs::remove_dir_all(&root).await;
    }

    #[test]
    fn default_root_honors_env_override() {
        // SAFETY: test-only, single-threaded env mutation scoped to this function.
        unsafe {
            std::env::set_var("ROUTECODEX_SNAPSHOT_DIR", "/tmp/rc-snapshot-override");
        }
        assert_eq!(
            FsSnapshotEventSink::default_root(),
            PathBuf::from("/tmp/rc-snapshot-override")
        );
        unsafe {
            std::env::remove_var("ROUTECODEX_SNAPSHOT_DIR");
        }
    }
}
