use super::types::BetaMessage;

/// A non-streaming `POST /v1/messages` response is a single Beta message.
pub type CreateMessageResponse = BetaMessage;
