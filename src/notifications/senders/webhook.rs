use async_trait::async_trait;
use reqwest::{Client, Method, header};
use std::collections::HashMap;
use tera::{Context, Tera};

use super::{NotificationSender, SenderError};
use crate::version::USER_AGENT;

/// A sender for pushing notifications via a custom webhook.
pub struct WebhookSender {
    client: Client,
    url: String,
    method: Method,
    headers: header::HeaderMap,
    body_template: Option<String>,
}

impl WebhookSender {
    pub fn new(
        url: &str,
        method: &str,
        headers: Option<&HashMap<String, String>>,
        body_template: Option<String>,
    ) -> Result<Self, SenderError> {
        let method = match method.to_uppercase().as_str() {
            "POST" => Method::POST,
            "GET" => Method::GET,
            _ => {
                return Err(SenderError::InvalidConfiguration(format!(
                    "Unsupported HTTP method: {method}"
                )));
            }
        };

        let mut header_map = header::HeaderMap::new();
        for (key, value) in headers.into_iter().flatten() {
            let header_name = header::HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
                SenderError::InvalidConfiguration(format!("Invalid header name: {e}"))
            })?;
            let header_value = header::HeaderValue::from_str(value).map_err(|e| {
                SenderError::InvalidConfiguration(format!("Invalid header value: {e}"))
            })?;
            header_map.insert(header_name, header_value);
        }

        if let Some(template) = &body_template {
            // Fail at startup rather than on the first alert.
            render_body(template, "")?;
        }

        Ok(Self {
            client: Client::builder().user_agent(USER_AGENT).build()?,
            url: url.to_string(),
            method,
            headers: header_map,
            body_template,
        })
    }

    fn body(&self, message: &str) -> Result<String, SenderError> {
        match &self.body_template {
            Some(template) => render_body(template, message),
            None => Ok(serde_json::json!({ "text": message }).to_string()),
        }
    }
}

fn render_body(template: &str, message: &str) -> Result<String, SenderError> {
    let mut context = Context::new();
    context.insert("message", message);
    context.insert("message_json", &serde_json::Value::from(message).to_string());
    Ok(Tera::one_off(template, &context, false)?)
}

#[async_trait]
impl NotificationSender for WebhookSender {
    fn channel_type(&self) -> &'static str {
        "webhook"
    }

    async fn send(&self, message: &str) -> Result<(), SenderError> {
        let mut request_builder = self
            .client
            .request(self.method.clone(), &self.url)
            .headers(self.headers.clone());

        if self.method == Method::POST {
            request_builder = request_builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(self.body(message)?);
        } else {
            request_builder = request_builder.query(&[("text", message)]);
        }

        let response = request_builder.send().await?;
        let status = response.status();

        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(SenderError::SendFailed(format!(
                "Webhook returned non-success status: {status}. Body: {error_body}"
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_body_is_json_text() {
        let sender = WebhookSender::new("http://localhost/hook", "post", None, None).unwrap();
        let body: serde_json::Value =
            serde_json::from_str(&sender.body("line one\nline \"two\"").unwrap()).unwrap();
        assert_eq!(body["text"], "line one\nline \"two\"");
    }

    #[test]
    fn test_template_body_escapes_json() {
        let template = r#"{"content": {{ message_json }}}"#.to_string();
        let sender =
            WebhookSender::new("http://localhost/hook", "POST", None, Some(template)).unwrap();
        let body: serde_json::Value =
            serde_json::from_str(&sender.body("🛑 \"api\" down").unwrap()).unwrap();
        assert_eq!(body["content"], "🛑 \"api\" down");
    }

    #[test]
    fn test_rejects_bad_method_and_template() {
        assert!(matches!(
            WebhookSender::new("http://localhost/hook", "PUT", None, None),
            Err(SenderError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            WebhookSender::new("http://localhost/hook", "POST", None, Some("{{ oops".to_string())),
            Err(SenderError::TemplatingError(_))
        ));
    }

    #[test]
    fn test_rejects_bad_header() {
        let headers = HashMap::from([("bad header".to_string(), "x".to_string())]);
        assert!(matches!(
            WebhookSender::new("http://localhost/hook", "POST", Some(&headers), None),
            Err(SenderError::InvalidConfiguration(_))
        ));
    }
}
