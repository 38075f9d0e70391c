//! HTTP 执行器 - 基础设施层
//!
//! 持有唯一的 HTTP 客户端资源，只暴露"发送 JSON 请求"的能力

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::ApiError;
use crate::models::payload::ErrorBody;

/// HTTP 执行器
///
/// 职责：
/// - 持有唯一的 reqwest::Client
/// - 附加 Bearer token
/// - 把非 2xx 响应映射为 `ApiError::Rejected`（透出后端 detail）
/// - 不认识 Exam / Part
pub struct HttpExecutor {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpExecutor {
    /// 创建新的 HTTP 执行器
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        if self.token.is_empty() {
            request
        } else {
            request.header(AUTHORIZATION, format!("Bearer {}", self.token))
        }
    }

    /// GET 并反序列化响应
    ///
    /// # 参数
    /// - `endpoint`: 相对于 base_url 的路径
    /// - `fallback`: 网络失败或后端未给出 detail 时的提示
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        fallback: &'static str,
    ) -> Result<T, ApiError> {
        let request = self.authorize(self.client.get(self.url(endpoint)));
        self.send(endpoint, request, fallback).await
    }

    /// POST JSON 并反序列化响应
    pub async fn post_json<B, T>(
        &self,
        endpoint: &str,
        body: &B,
        fallback: &'static str,
    ) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        if tracing::enabled!(tracing::Level::DEBUG) {
            if let Ok(payload) = serde_json::to_string(body) {
                debug!("POST {} Payload: {}", endpoint, payload);
            }
        }
        let request = self.authorize(self.client.post(self.url(endpoint)).json(body));
        self.send(endpoint, request, fallback).await
    }

    /// DELETE 并反序列化响应
    pub async fn delete_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        fallback: &'static str,
    ) -> Result<T, ApiError> {
        let request = self.authorize(self.client.delete(self.url(endpoint)));
        self.send(endpoint, request, fallback).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        request: RequestBuilder,
        fallback: &'static str,
    ) -> Result<T, ApiError> {
        let request_failed = |source| ApiError::RequestFailed {
            endpoint: endpoint.to_string(),
            fallback,
            source,
        };

        let response = request.send().await.map_err(request_failed)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(request_failed)?;

        debug!("{} 响应状态: {}", endpoint, status);

        if !status.is_success() {
            let detail = serde_json::from_slice::<ErrorBody>(&bytes)
                .ok()
                .and_then(|body| body.detail_text())
                .unwrap_or_else(|| fallback.to_string());
            return Err(ApiError::Rejected {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                detail,
            });
        }

        serde_json::from_slice(&bytes).map_err(|source| ApiError::JsonParseFailed {
            endpoint: endpoint.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// 只应答一次的本地 HTTP 服务
    async fn one_shot_server(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn rejected_response_surfaces_detail() {
        let base = one_shot_server(
            "400 Bad Request",
            r#"{"detail":"An exam with the title 'Academic Reading A' already exists"}"#,
        )
        .await;
        let executor = HttpExecutor::new(base, "token");

        let err = executor
            .get_json::<Value>("admin/reading/reading-tests", "Failed to fetch reading tests")
            .await
            .unwrap_err();

        match err {
            ApiError::Rejected { status, detail, .. } => {
                assert_eq!(status, 400);
                assert_eq!(detail, "An exam with the title 'Academic Reading A' already exists");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn rejected_without_detail_uses_fallback() {
        let base = one_shot_server("500 Internal Server Error", "oops").await;
        let executor = HttpExecutor::new(base, "");

        let err = executor
            .get_json::<Value>("admin/reading/reading-tests", "Failed to fetch reading tests")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Failed to fetch reading tests");
    }

    #[tokio::test]
    async fn success_body_is_deserialized() {
        let base = one_shot_server("200 OK", r#"{"ok":true}"#).await;
        let executor = HttpExecutor::new(format!("{}/", base), "token");

        let value: Value = executor
            .post_json("/admin/reading/ping", &serde_json::json!({}), "ping failed")
            .await
            .unwrap();
        assert_eq!(value["ok"], Value::Bool(true));
    }

    #[tokio::test]
    async fn unreachable_backend_is_request_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let executor = HttpExecutor::new(format!("http://{}", addr), "token");
        let err = executor
            .get_json::<Value>("admin/reading/reading-tests", "Failed to fetch reading tests")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::RequestFailed { .. }));
        assert!(err.detail().is_none());
    }
}
