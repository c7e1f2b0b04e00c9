use serde_json::Value;

/// A credential as loaded from storage, before it is wrapped into a typed
/// [`routecodex_pipeline::Credential`] variant by a provider's `parse_credential`.
#[derive(Debug, Clone)]
pub struct BaseCredential {
    pub id: i64,
    pub name: Option<String>,
    pub secret: Value,
    pub meta: Value,
}
