//! Lambda function URL (payload format 2.0) request and response shapes.

use crate::app::handler::FunctionResponse;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionUrlEvent {
    pub request_context: RequestContext,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub is_base64_encoded: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequestContext {
    pub http: HttpDescription,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpDescription {
    pub method: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionUrlResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
    pub is_base64_encoded: bool,
}

impl FunctionUrlEvent {
    pub fn method(&self) -> &str {
        &self.request_context.http.method
    }

    /// Request body as text. Undecodable base64 yields `None`, which the handler
    /// reports as a missing field.
    pub fn decoded_body(&self) -> Option<String> {
        let body = self.body.as_ref()?;
        if !self.is_base64_encoded {
            return Some(body.clone());
        }
        match STANDARD.decode(body) {
            Ok(bytes) => String::from_utf8(bytes).ok(),
            Err(e) => {
                tracing::warn!("⚠️ Could not decode base64 body: {}", e);
                None
            }
        }
    }
}

impl From<FunctionResponse> for FunctionUrlResponse {
    fn from(response: FunctionResponse) -> Self {
        Self {
            status_code: response.status,
            body: response.body_string(),
            headers: response.headers,
            is_base64_encoded: false,
        }
    }
}
