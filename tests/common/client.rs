//! HTTP client for end-to-end tests
//!
//! This module provides a high-level HTTP client that wraps reqwest
//! and provides methods for all server endpoints.
//!
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::multipart::{Form, Part};
use reqwest::Response;
use serde_json::json;
use std::time::Duration;

/// HTTP test client with cookie-based session management
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    /// Creates a new unauthenticated client
    ///
    /// Use this for testing authentication flows.
    /// For most tests, use `authenticated()` instead.
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .cookie_store(true) // Automatically handle session cookies
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    /// Creates a client pre-authenticated as the default test user
    ///
    /// # Panics
    ///
    /// Panics if authentication fails (indicates test infrastructure problem).
    pub async fn authenticated(base_url: String) -> Self {
        Self::authenticated_as(base_url, TEST_USER, TEST_PASS).await
    }

    /// Creates a client pre-authenticated as a specific user
    pub async fn authenticated_as(base_url: String, username: &str, password: &str) -> Self {
        let client = Self::new(base_url);

        let response = client.login(username, password).await;
        assert_eq!(
            response.status(),
            reqwest::StatusCode::OK,
            "Test user authentication failed: {:?}",
            response.text().await
        );

        client
    }

    // ========================================================================
    // Authentication Endpoints
    // ========================================================================

    /// POST /v1/auth/register
    pub async fn register(&self, username: &str, password: &str) -> Response {
        self.client
            .post(format!("{}/v1/auth/register", self.base_url))
            .json(&json!({
                "username": username,
                "password": password,
            }))
            .send()
            .await
            .expect("Register request failed")
    }

    /// POST /v1/auth/login
    pub async fn login(&self, username: &str, password: &str) -> Response {
        self.client
            .post(format!("{}/v1/auth/login", self.base_url))
            .json(&json!({
                "username": username,
                "password": password,
            }))
            .send()
            .await
            .expect("Login request failed")
    }

    /// GET /v1/auth/logout
    pub async fn logout(&self) -> Response {
        self.client
            .get(format!("{}/v1/auth/logout", self.base_url))
            .send()
            .await
            .expect("Logout request failed")
    }

    /// GET /
    pub async fn home(&self) -> Response {
        self.client
            .get(format!("{}/", self.base_url))
            .send()
            .await
            .expect("Home request failed")
    }

    // ========================================================================
    // History Endpoints
    // ========================================================================

    /// POST /v1/history/upload with a multipart `file` field
    pub async fn upload_zip(&self, filename: &str, bytes: Vec<u8>) -> Response {
        let part = Part::bytes(bytes).file_name(filename.to_string());
        let form = Form::new().part("file", part);

        self.client
            .post(format!("{}/v1/history/upload", self.base_url))
            .multipart(form)
            .send()
            .await
            .expect("Upload request failed")
    }

    /// POST /v1/history/upload without any file field
    pub async fn upload_without_file(&self) -> Response {
        let form = Form::new().text("note", "there is no file here");

        self.client
            .post(format!("{}/v1/history/upload", self.base_url))
            .multipart(form)
            .send()
            .await
            .expect("Upload request failed")
    }

    /// GET /v1/history/uploads
    pub async fn list_uploads(&self) -> Response {
        self.client
            .get(format!("{}/v1/history/uploads", self.base_url))
            .send()
            .await
            .expect("List uploads request failed")
    }

    /// DELETE /v1/history
    pub async fn delete_history(&self) -> Response {
        self.client
            .delete(format!("{}/v1/history", self.base_url))
            .send()
            .await
            .expect("Delete history request failed")
    }

    // ========================================================================
    // Stats Endpoints
    // ========================================================================

    /// GET /v1/stats/{endpoint}
    pub async fn get_stats(&self, endpoint: &str) -> Response {
        self.client
            .get(format!("{}/v1/stats/{}", self.base_url, endpoint))
            .send()
            .await
            .expect("Stats request failed")
    }

    /// GET /v1/stats/{endpoint}, asserting success and returning the `data`
    /// payload.
    pub async fn get_stats_data(&self, endpoint: &str) -> serde_json::Value {
        let response = self.get_stats(endpoint).await;
        assert_eq!(
            response.status(),
            reqwest::StatusCode::OK,
            "stats endpoint {} failed",
            endpoint
        );
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["success"], json!(true));
        body["data"].clone()
    }
}
