pub mod callback;
pub mod docs_api;
pub mod oauth;

pub use callback::{validate_callback, wait_for_code, CallbackParams};
pub use docs_api::{DocsApi, GoogleDocsApi};
pub use oauth::{OAuthClient, TokenResponse, SCOPES};
