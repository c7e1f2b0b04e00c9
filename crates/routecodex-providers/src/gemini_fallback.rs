//! Shared Gemini-family model-fallback-on-429 (spec §4.5): on HTTP 429, walk
//! a provider-configured list of fallback models in order, within the same
//! request, before surfacing the error to the caller.

use routecodex_pipeline::provider::{AuthRetryAction, UpstreamFailure};
use routecodex_pipeline::{GenerateContentRequest, Request};

/// Decides the next model to retry with given the request's current model
/// and the provider's configured `fallback_models` list. Returns
/// `AuthRetryAction::None` once the list is exhausted (or the failure/request
/// shape doesn't apply), letting the caller fall through to normal failure
/// handling.
pub(crate) fn model_fallback_action(
    req: &Request,
    fallback_models: &[String],
    failure: &UpstreamFailure,
) -> AuthRetryAction {
    if fallback_models.is_empty() {
        return AuthRetryAction::None;
    }
    let UpstreamFailure::Http { status, .. } = failure else {
        return AuthRetryAction::None;
    };
    if *status != 429 {
        return AuthRetryAction::None;
    }
    let Some(current) = current_gemini_model(req) else {
        return AuthRetryAction::None;
    };
    let bare = current.strip_prefix("models/").unwrap_or(current.as_str());
    let next = match fallback_models.iter().position(|m| m == bare) {
        Some(idx) => fallback_models.get(idx + 1),
        None => fallback_models.first(),
    };
    match next {
        Some(model) if model != bare => AuthRetryAction::RetryWithModel(model.clone()),
        _ => AuthRetryAction::None,
    }
}

fn current_gemini_model(req: &Request) -> Option<String> {
    match req {
        Request::GenerateContent(GenerateContentRequest::Gemini(r)) => Some(r.path.model.clone()),
        Request::GenerateContent(GenerateContentRequest::GeminiStream(r)) => {
            Some(r.path.model.clone())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use routecodex_protocol::gemini::generate_content::request::{
        GenerateContentPath, GenerateContentRequest as GeminiGenerateContentRequest,
        GenerateContentRequestBody,
    };

    fn gemini_request(model: &str) -> Request {
        Request::GenerateContent(GenerateContentRequest::Gemini(GeminiGenerateContentRequest {
            path: GenerateContentPath {
                model: model.to_string(),
            },
            body: GenerateContentRequestBody {
                contents: Vec::new(),
                model: None,
                tools: None,
                tool_config: None,
                system_instruction: None,
                safety_settings: None,
                generation_config: None,
                cached_content: None,
            },
        }))
    }

    fn not_found() -> UpstreamFailure {
        UpstreamFailure::Http {
            status: 429,
            headers: Vec::new(),
            body: bytes::Bytes::new(),
        }
    }

    #[test]
    fn empty_list_never_falls_back() {
        let req = gemini_request("models/gemini-2.5-pro");
        assert!(matches!(
            model_fallback_action(&req, &[], &not_found()),
            AuthRetryAction::None
        ));
    }

    #[test]
    fn primary_model_retries_with_first_fallback() {
        let req = gemini_request("models/gemini-2.5-pro");
        let fallbacks = vec!["gemini-2.5-pro-preview-06-05".to_string()];
        match model_fallback_action(&req, &fallbacks, &not_found()) {
            AuthRetryAction::RetryWithModel(model) => {
                assert_eq!(model, "gemini-2.5-pro-preview-06-05");
            }
            other => panic!("expected RetryWithModel, got {other:?}"),
        }
    }

    #[test]
    fn exhausted_list_surfaces_error() {
        let req = gemini_request("models/gemini-2.5-pro-preview-06-05");
        let fallbacks = vec!["gemini-2.5-pro-preview-06-05".to_string()];
        assert!(matches!(
            model_fallback_action(&req, &fallbacks, &not_found()),
            AuthRetryAction::None
        ));
    }

    #[test]
    fn non_429_failure_never_falls_back() {
        let req = gemini_request("models/gemini-2.5-pro");
        let fallbacks = vec!["gemini-2.5-pro-preview-06-05".to_string()];
        let failure = UpstreamFailure::Http {
            status: 500,
            headers: Vec::new(),
            body: bytes::Bytes::new(),
        };
        assert!(matches!(
            model_fallback_action(&req, &fallbacks, &failure),
            AuthRetryAction::None
        ));
    }
}
