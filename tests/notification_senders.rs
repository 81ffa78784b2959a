//! Integration tests for the HTTP-based notification backends

use std::collections::HashMap;

use mockito::Matcher;
use serde_json::json;
use sitewatch::notifications::senders::telegram::TelegramSender;
use sitewatch::notifications::senders::webhook::WebhookSender;
use sitewatch::notifications::{NotificationSender, NotificationService, SenderError};

#[tokio::test]
async fn test_telegram_posts_escaped_html() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/bot123:abc/sendMessage")
        .match_body(Matcher::Json(json!({
            "chat_id": "42",
            "text": "🛑 api &lt;prod&gt; down",
            "parse_mode": "HTML",
        })))
        .with_status(200)
        .with_body(r#"{"ok":true}"#)
        .create_async()
        .await;

    let sender = TelegramSender::new("123:abc", "42")
        .unwrap()
        .with_api_base(server.url());
    sender.send("🛑 api <prod> down").await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_telegram_error_status_is_reported() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/bot123:abc/sendMessage")
        .with_status(401)
        .with_body(r#"{"ok":false,"description":"Unauthorized"}"#)
        .create_async()
        .await;

    let sender = TelegramSender::new("123:abc", "42")
        .unwrap()
        .with_api_base(server.url());
    let result = sender.send("hello").await;
    assert!(matches!(result, Err(SenderError::SendFailed(msg)) if msg.contains("Unauthorized")));
}

#[tokio::test]
async fn test_delivery_failure_is_swallowed() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/bot123:abc/sendMessage")
        .with_status(500)
        .create_async()
        .await;

    let sender = TelegramSender::new("123:abc", "42")
        .unwrap()
        .with_api_base(server.url());
    let service = NotificationService::new(Box::new(sender));
    assert!(!service.deliver("hello").await);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_webhook_posts_default_json_with_headers() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/hook")
        .match_header("authorization", "Bearer secret")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(json!({ "text": "✅ Service web initialized" })))
        .with_status(204)
        .create_async()
        .await;

    let headers = HashMap::from([("Authorization".to_string(), "Bearer secret".to_string())]);
    let sender =
        WebhookSender::new(&format!("{}/hook", server.url()), "POST", Some(&headers), None)
            .unwrap();
    sender.send("✅ Service web initialized").await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_webhook_renders_body_template() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/hook")
        .match_body(Matcher::Json(json!({ "content": "line one\nline two" })))
        .with_status(200)
        .create_async()
        .await;

    let template = r#"{"content": {{ message_json }}}"#.to_string();
    let sender =
        WebhookSender::new(&format!("{}/hook", server.url()), "POST", None, Some(template))
            .unwrap();
    sender.send("line one\nline two").await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_webhook_get_sends_text_as_query() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/hook")
        .match_query(Matcher::UrlEncoded("text".into(), "site down".into()))
        .with_status(200)
        .create_async()
        .await;

    let sender =
        WebhookSender::new(&format!("{}/hook", server.url()), "get", None, None).unwrap();
    sender.send("site down").await.unwrap();
    mock.assert_async().await;
}
