use serde::de::DeserializeOwned;
use serde_json::Value;

use super::CatalogError;

// the catalog reports failures as {"message": "..."} or {"message": ["...", "..."]}
pub(in crate::catalog) fn error_message(body: &str) -> String {
    let trimmed = body.trim();
    let message = serde_json::from_str::<Value>(trimmed)
        .ok()
        .and_then(|v| match v.get("message") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Array(items)) => {
                let parts: Vec<String> = items
                    .iter()
                    .filter_map(|i| i.as_str().map(|s| s.to_string()))
                    .collect();
                if parts.is_empty() {
                    None
                } else {
                    Some(parts.join("; "))
                }
            }
            _ => None,
        });
    match message {
        Some(m) => m,
        None if trimmed.is_empty() => "empty response body".to_string(),
        None => trimmed.chars().take(200).collect(),
    }
}

pub(in crate::catalog) async fn read_json<T: DeserializeOwned>(
    url: &str,
    response: reqwest::Response,
) -> Result<T, CatalogError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| CatalogError::Transport {
            url: url.to_string(),
            source: e,
        })?;
    if !status.is_success() {
        return Err(CatalogError::Status {
            status: status.as_u16(),
            message: error_message(&body),
        });
    }
    serde_json::from_str(&body).map_err(|e| CatalogError::Decode {
        url: url.to_string(),
        source: e,
    })
}
