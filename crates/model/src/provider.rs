use std::error::Error;

use crate::error::ErrorKind;
use crate::request::ModelRequest;
use crate::response::ModelResponse;

/// Errors a provider can fail with, classified so that callers can decide
/// whether to retry.
pub trait ModelProviderError: Error + Send + Sync + 'static {
    /// Classifies this error.
    fn kind(&self) -> ErrorKind;
}

/// Samples completions from one specific model.
///
/// Providers are shared across sessions and may be dropped at any time.
/// Connection pools and similar caches are fine, but no request may
/// depend on one made before it.
pub trait ModelProvider: Send + Sync {
    /// The error requests and responses fail with.
    type Error: ModelProviderError;

    /// The streamed completion.
    type Response: ModelResponse<Error = Self::Error>;

    /// Names the model, for logs only.
    fn model_name(&self) -> &str;

    /// Submits `req`. The future resolves as soon as the provider has
    /// accepted it, with the text following through the response.
    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static;
}
