//! DeepSeek anti-abuse proof-of-work challenge/response.
//!
//! Enrolled API keys must attach a solved PoW header to `/v1/chat/completions`
//! and `/anthropic/v1/messages` calls. Getting a challenge takes two upstream
//! round-trips: a chat session is created once and reused (`SessionCache`
//! holds the session id, not the solved header, for `sessionReuseTtlMs`),
//! then a fresh, single-use challenge is requested against that session for
//! every call. The hash search itself is CPU-bound, so it is delegated to an
//! external solver process (native or WASM) instead of blocking the async
//! runtime.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use base64::Engine;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tokio::time::timeout;

use routecodex_pipeline::{CredentialId, ProviderError, ProviderResult};

pub const POW_HEADER_NAME: &str = "x-ds-pow-response";
const DEFAULT_TIMEOUT_MS: u64 = 15_000;
const DEFAULT_MAX_ATTEMPTS: u32 = 2;
const DEFAULT_SESSION_TTL_MS: u64 = 30 * 60 * 1000;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowChallenge {
    pub algorithm: String,
    pub challenge: String,
    pub salt: String,
    pub difficulty: u32,
    pub expire_at: i64,
    pub signature: String,
    pub target_path: String,
}

#[derive(Debug, Serialize)]
struct PowHeaderPayload<'a> {
    algorithm: &'a str,
    challenge: &'a str,
    salt: &'a str,
    answer: &'a str,
    signature: &'a str,
    target_path: &'a str,
}

#[derive(Debug, Deserialize)]
struct UpstreamEnvelope<T> {
    data: UpstreamEnvelopeData<T>,
}

#[derive(Debug, Deserialize)]
struct UpstreamEnvelopeData<T> {
    biz_data: T,
}

#[derive(Debug, Deserialize)]
struct ChatSessionBizData {
    id: String,
}

pub struct PowSettings {
    pub solver_path: String,
    pub timeout: Duration,
    pub max_attempts: u32,
    pub session_ttl: Duration,
}

impl PowSettings {
    pub fn resolve(
        solver_path: Option<&str>,
        timeout_ms: Option<u64>,
        max_attempts: Option<u32>,
        session_ttl_ms: Option<u64>,
    ) -> ProviderResult<Self> {
        let solver_path = solver_path
            .map(str::to_string)
            .or_else(|| std::env::var("ROUTECODEX_DEEPSEEK_POW_SOLVER").ok())
            .ok_or(ProviderError::MissingCredentialField(
                "deepseek.pow_solver_path",
            ))?;
        Ok(Self {
            solver_path,
            timeout: Duration::from_millis(timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS)),
            max_attempts: max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS),
            session_ttl: Duration::from_millis(session_ttl_ms.unwrap_or(DEFAULT_SESSION_TTL_MS)),
        })
    }
}

struct CachedSession {
    chat_session_id: String,
    created: Instant,
}

/// Caches the DeepSeek chat session id per credential so concurrent requests
/// on the same key reuse a session instead of each creating their own.
#[derive(Default)]
pub struct SessionCache {
    entries: Mutex<HashMap<CredentialId, CachedSession>>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, credential_id: CredentialId, ttl: Duration) -> Option<String> {
        let entries = self.entries.lock().expect("pow session cache poisoned");
        entries.get(&credential_id).and_then(|session| {
            (session.created.elapsed() < ttl).then(|| session.chat_session_id.clone())
        })
    }

    fn put(&self, credential_id: CredentialId, chat_session_id: String) {
        let mut entries = self.entries.lock().expect("pow session cache poisoned");
        entries.insert(
            credential_id,
            CachedSession {
                chat_session_id,
                created: Instant::now(),
            },
        );
    }

    pub fn clear(&self, credential_id: CredentialId) {
        let mut entries = self.entries.lock().expect("pow session cache poisoned");
        entries.remove(&credential_id);
    }
}

/// Ensures a cached chat session, fetches a fresh single-use challenge against
/// it, solves it out-of-process and returns the header value. The session id
/// is reused across calls (within `sessionReuseTtlMs`); the challenge is not.
pub async fn ensure_pow_header(
    cache: &SessionCache,
    settings: &PowSettings,
    credential_id: CredentialId,
    base_url: &str,
    api_key: &str,
    target_path: &str,
) -> ProviderResult<String> {
    let chat_session_id = match cache.get(credential_id, settings.session_ttl) {
        Some(id) => id,
        None => {
            let id = fetch_chat_session_id(base_url, api_key).await?;
            cache.put(credential_id, id.clone());
            id
        }
    };
    let challenge = fetch_challenge(base_url, api_key, &chat_session_id, target_path).await?;
    let mut last_err = None;
    for _attempt in 0..settings.max_attempts.max(1) {
        match solve_pow(settings, &challenge).await {
            Ok(header) => return Ok(header),
            Err(err) => last_err = Some(err),
        }
    }
    Err(last_err.unwrap_or_else(|| ProviderError::Other("pow solve exhausted attempts".into())))
}

fn pow_client() -> ProviderResult<wreq::Client> {
    wreq::Client::builder()
        .build()
        .map_err(|err| ProviderError::Other(err.to_string()))
}

/// Opens a new chat session (`/api/v0/chat_session/create`), needed before a
/// PoW challenge can be requested.
async fn fetch_chat_session_id(base_url: &str, api_key: &str) -> ProviderResult<String> {
    let client = pow_client()?;
    let url = format!(
        "{}/api/v0/chat_session/create",
        base_url.trim_end_matches('/')
    );
    let response = client
        .post(url)
        .header("Authorization", format!("Bearer {api_key}"))
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&serde_json::json!({ "character_id": null }))
            .map_err(|err| ProviderError::Other(err.to_string()))?)
        .send()
        .await
        .map_err(|err| ProviderError::Other(err.to_string()))?;
    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|err| ProviderError::Other(err.to_string()))?;
    if !status.is_success() {
        return Err(ProviderError::Other(format!(
            "chat_session/create failed: {status}"
        )));
    }
    let envelope: UpstreamEnvelope<ChatSessionBizData> =
        serde_json::from_slice(&body).map_err(|err| ProviderError::Other(err.to_string()))?;
    Ok(envelope.data.biz_data.id)
}

/// Requests a fresh, single-use challenge scoped to `target_path`
/// (`/api/v0/chat/create_pow_challenge`).
async fn fetch_challenge(
    base_url: &str,
    api_key: &str,
    chat_session_id: &str,
    target_path: &str,
) -> ProviderResult<PowChallenge> {
    let client = pow_client()?;
    let url = format!(
        "{}/api/v0/chat/create_pow_challenge",
        base_url.trim_end_matches('/')
    );
    let body = serde_json::json!({
        "target_path": target_path,
        "chat_session_id": chat_session_id,
    });
    let response = client
        .post(url)
        .header("Authorization", format!("Bearer {api_key}"))
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&body).map_err(|err| ProviderError::Other(err.to_string()))?)
        .send()
        .await
        .map_err(|err| ProviderError::Other(err.to_string()))?;
    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|err| ProviderError::Other(err.to_string()))?;
    if !status.is_success() {
        return Err(ProviderError::Other(format!(
            "create_pow_challenge failed: {status}"
        )));
    }
    let envelope: UpstreamEnvelope<PowChallenge> =
        serde_json::from_slice(&body).map_err(|err| ProviderError::Other(err.to_string()))?;
    Ok(envelope.data.biz_data)
}

/// Spawns the external solver, feeding it the challenge as JSON on stdin and
/// reading the numeric answer from stdout. Regenerates a fresh attempt on
/// timeout rather than retrying the same process, since a hung solver process
/// is assumed stuck.
async fn solve_pow(settings: &PowSettings, challenge: &PowChallenge) -> ProviderResult<String> {
    use tokio::io::AsyncWriteExt;

    let mut child = Command::new(&settings.solver_path)
        .arg("--algorithm")
        .arg(&challenge.algorithm)
        .arg("--difficulty")
        .arg(challenge.difficulty.to_string())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|err| ProviderError::Other(format!("spawn pow solver: {err}")))?;

    let payload = serde_json::json!({
        "challenge": challenge.challenge,
        "salt": challenge.salt,
        "difficulty": challenge.difficulty,
        "expire_at": challenge.expire_at,
    });
    if let Some(mut stdin) = child.stdin.take() {
        let bytes = serde_json::to_vec(&payload)
            .map_err(|err| ProviderError::Other(err.to_string()))?;
        stdin
            .write_all(&bytes)
            .await
            .map_err(|err| ProviderError::Other(format!("write pow solver stdin: {err}")))?;
    }

    let output = timeout(settings.timeout, child.wait_with_output())
        .await
        .map_err(|_| ProviderError::Other("pow solver timed out".into()))?
        .map_err(|err| ProviderError::Other(format!("pow solver exited abnormally: {err}")))?;

    if !output.status.success() {
        return Err(ProviderError::Other(format!(
            "pow solver failed with status {}",
            output.status
        )));
    }
    let answer = String::from_utf8_lossy(&output.stdout).trim().to_string();
    encode_pow_header(challenge, &answer)
}

/// Packs the solved answer into the header value DeepSeek expects: a
/// base64'd JSON object naming the algorithm, challenge, salt, answer, the
/// challenge's own signature and the path it was scoped to.
fn encode_pow_header(challenge: &PowChallenge, answer: &str) -> ProviderResult<String> {
    let payload = PowHeaderPayload {
        algorithm: &challenge.algorithm,
        challenge: &challenge.challenge,
        salt: &challenge.salt,
        answer,
        signature: &challenge.signature,
        target_path: &challenge.target_path,
    };
    let json = serde_json::to_vec(&payload).map_err(|err| ProviderError::Other(err.to_string()))?;
    Ok(base64::engine::general_purpose::STANDARD.encode(json))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trips_through_base64_json() {
        let challenge = PowChallenge {
            algorithm: "DeepSeekHashV1".to_string(),
            challenge: "abc".to_string(),
            salt: "def".to_string(),
            difficulty: 20,
            expire_at: 9_999_999_999,
            signature: "sig".to_string(),
            target_path: "/v1/chat/completions".to_string(),
        };
        let header = encode_pow_header(&challenge, "1234").expect("encode");
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(header)
            .expect("decode base64");
        let value: serde_json::Value = serde_json::from_slice(&decoded).expect("decode json");
        assert_eq!(value["algorithm"], "DeepSeekHashV1");
        assert_eq!(value["answer"], "1234");
        assert_eq!(value["signature"], "sig");
        assert_eq!(value["target_path"], "/v1/chat/completions");
    }

    #[test]
    fn session_cache_expires_entries() {
        let cache = SessionCache::new();
        cache.put(42, "session-id".to_string());
        assert_eq!(
            cache.get(42, Duration::from_secs(60)),
            Some("session-id".to_string())
        );
        assert_eq!(cache.get(42, Duration::from_millis(0)), None);
    }

    #[test]
    fn resolve_without_solver_path_or_env_errors() {
        // SAFETY: test-only removal of an env var this crate doesn't otherwise rely on
        // being present; no other test in this process sets it concurrently.
        unsafe {
            std::env::remove_var("ROUTECODEX_DEEPSEEK_POW_SOLVER");
        }
        let result = PowSettings::resolve(None, None, None, None);
        assert!(result.is_err());
    }
}
