use crate::core::resolver::LinkResolver;
use crate::domain::ports::LinkStrategy;
use crate::utils::error::ResolveError;
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;

const REQUEST_FIELD: &str = "scribdUrl";

/// Framework-independent HTTP response of the serverless function.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Option<serde_json::Value>,
}

impl FunctionResponse {
    fn new(status: u16, body: Option<serde_json::Value>) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Access-Control-Allow-Origin".to_string(), "*".to_string());
        headers.insert(
            "Access-Control-Allow-Methods".to_string(),
            "POST, OPTIONS".to_string(),
        );
        headers.insert(
            "Access-Control-Allow-Headers".to_string(),
            "Content-Type".to_string(),
        );
        if body.is_some() {
            headers.insert("Content-Type".to_string(), "application/json".to_string());
        }
        Self {
            status,
            headers,
            body,
        }
    }

    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self::new(status, Some(body))
    }

    pub fn error(err: &ResolveError) -> Self {
        let mut response = Self::json(err.status_code(), json!({ "error": err.to_string() }));
        if matches!(err, ResolveError::MethodNotAllowed { .. }) {
            response
                .headers
                .insert("Allow".to_string(), "POST".to_string());
        }
        response
    }

    pub fn body_string(&self) -> String {
        self.body
            .as_ref()
            .map(|body| body.to_string())
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct ResolveRequest {
    #[serde(rename = "scribdUrl", alias = "sourceUrl", alias = "url")]
    source_url: String,
}

fn parse_body(body: Option<&str>) -> Result<String, ResolveError> {
    let missing = || ResolveError::MissingField {
        field: REQUEST_FIELD.to_string(),
    };
    let body = body.filter(|b| !b.trim().is_empty()).ok_or_else(missing)?;
    let value: serde_json::Value = serde_json::from_str(body).map_err(|e| {
        tracing::error!("❌ Invalid request body: {}", e);
        missing()
    })?;
    // 只接受 JSON 物件
    if !value.is_object() {
        tracing::error!("❌ Request body is not a JSON object");
        return Err(missing());
    }
    let request: ResolveRequest = serde_json::from_value(value).map_err(|e| {
        tracing::error!("❌ Invalid request body: {}", e);
        missing()
    })?;
    if request.source_url.trim().is_empty() {
        return Err(missing());
    }
    Ok(request.source_url)
}

/// Handles one invocation: `POST {"scribdUrl": "..."}` -> `{"downloadLink": "..."}`.
pub async fn handle_request<S: LinkStrategy>(
    resolver: &LinkResolver<S>,
    method: &str,
    body: Option<&str>,
) -> FunctionResponse {
    if method.eq_ignore_ascii_case("OPTIONS") {
        return FunctionResponse::new(204, None);
    }
    if !method.eq_ignore_ascii_case("POST") {
        return FunctionResponse::error(&ResolveError::MethodNotAllowed {
            method: method.to_string(),
        });
    }

    let source_url = match parse_body(body) {
        Ok(url) => url,
        Err(e) => return FunctionResponse::error(&e),
    };

    match resolver.resolve(&source_url).await {
        Ok(resolution) => FunctionResponse::json(
            200,
            json!({ "downloadLink": resolution.download_link }),
        ),
        Err(e) => {
            tracing::error!(
                "❌ Resolution failed: {} (Category: {:?}, Status: {})",
                e,
                e.category(),
                e.status_code()
            );
            FunctionResponse::error(&e)
        }
    }
}
