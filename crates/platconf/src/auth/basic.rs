use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use secrecy::ExposeSecret;

use super::{AccessCredential, AuthParams};

pub const BASIC_SCHEME: &str = "Basic";

/// Static `Basic` credential. Never touches the network.
pub fn basic_credential(params: &AuthParams) -> AccessCredential {
    let raw = format!("{}:{}", params.username(), params.password().expose_secret());
    AccessCredential::new(BASIC_SCHEME, STANDARD.encode(raw))
}
