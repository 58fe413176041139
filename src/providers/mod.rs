mod error;
mod openai_compatible;

use std::time::Duration;

use reqwest::Client;

pub use error::{ProviderError, ProviderErrorKind};
pub use openai_compatible::OpenAiCompatibleProvider;

/// Build the provider HTTP client with an explicit timeout. Tests and
/// constrained runtimes skip system proxy discovery.
pub(crate) fn build_http_client(timeout: Duration) -> Result<Client, String> {
    let builder = Client::builder().timeout(timeout);
    let builder = if cfg!(test) { builder.no_proxy() } else { builder };
    builder
        .build()
        .map_err(|e| format!("Failed to build HTTP client: {}", e))
}
