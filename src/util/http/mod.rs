use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use once_cell::sync::{Lazy, OnceCell};
use reqwest::{header, Client, Method, Response};

use crate::{config::SETTINGS, logging::Logger, util};

pub mod user_agent;

/// A singleton instance of the reqwest client.
static CLIENT: OnceCell<Client> = OnceCell::new();

static LOGGER: Lazy<Logger> = Lazy::new(|| Logger::new("http"));

/// An asynchronous trait that provides a method to force convert a reqwest::Response body
/// from GBK encoding to UTF-8 encoding.
#[async_trait]
pub trait TextForceGbk {
    /// Converts the body of a reqwest::Response from GBK encoding to UTF-8 encoding.
    async fn text_force_gbk(self) -> Result<String>;
}

#[async_trait]
impl TextForceGbk for Response {
    async fn text_force_gbk(self) -> Result<String> {
        util::text::gbk_2_utf8(self.bytes().await?.as_ref())
    }
}

/// reqwest 使用 rustls-no-provider，建立 client 前必須先安裝 ring
fn install_crypto_provider() {
    // 已安裝過時會回傳 Err，忽略即可
    let _ = rustls::crypto::ring::default_provider().install_default();
}

/// Returns the reqwest client singleton instance or creates one if it doesn't exist.
fn get_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        install_crypto_provider();

        Client::builder()
            // ===== 壓縮 =====
            .brotli(true)
            .gzip(true)
            .zstd(true)
            // ===== 超時設置 =====
            .connect_timeout(Duration::from_secs(8))
            .timeout(Duration::from_secs(SETTINGS.http.timeout_secs))
            .tcp_nodelay(true)
            .pool_max_idle_per_host(4)
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(user_agent::gen_random_ua())
            .build()
            .map_err(|e| anyhow!("Failed to create reqwest client: {:?}", e))
    })
}

pub async fn get_response(url: &str, headers: Option<header::HeaderMap>) -> Result<Response> {
    send(Method::GET, url, headers).await
}

/// Performs an HTTP GET request and returns the response as text.
pub async fn get(url: &str, headers: Option<header::HeaderMap>) -> Result<String> {
    get_response(url, headers)
        .await?
        .text()
        .await
        .map_err(|e| anyhow!("Error parsing response text: {:?}", e))
}

/// Performs an HTTP GET request and returns the GBK body decoded to UTF-8.
pub async fn get_use_gbk(url: &str, headers: Option<header::HeaderMap>) -> Result<String> {
    get_response(url, headers)
        .await?
        .text_force_gbk()
        .await
        .map_err(|e| anyhow!("Error parsing response text use GBK: {:?}", e))
}

/// Sends one HTTP request; a failed request is not retried.
///
/// Non-success status codes are turned into errors so callers only ever see
/// bodies that came with a 2xx answer.
async fn send(method: Method, url: &str, headers: Option<header::HeaderMap>) -> Result<Response> {
    let visit_log = format!("{method}:{url}");
    let client = get_client()?;
    let mut rb = client.request(method, url);

    if let Some(h) = headers {
        rb = rb.headers(h);
    }

    let start = Instant::now();
    let res = rb.send().await;
    let elapsed = start.elapsed().as_millis();

    match res.and_then(|response| response.error_for_status()) {
        Ok(response) => {
            LOGGER.debug(format!("{} {} {} ms", visit_log, response.status(), elapsed));
            Ok(response)
        }
        Err(why) => {
            LOGGER.debug(format!("{} failed because {:?}. {} ms", visit_log, why, elapsed));
            Err(anyhow!("Failed to send request to {} because {}", url, why))
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    use super::*;

    /// 回應一次固定內容的本機 HTTP 伺服器
    async fn serve_once(status: &'static str, body: Vec<u8>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let head = format!(
                    "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    status,
                    body.len()
                );
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(&body).await;
                let _ = socket.shutdown().await;
            }
        });

        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_get_use_gbk() {
        let (body, _, _) = encoding_rs::GBK.encode("var hq_str_gb_qqq=\"纳指100ETF,620.51\";");
        let url = serve_once("200 OK", body.into_owned()).await;

        let text = get_use_gbk(&url, None).await.unwrap();
        assert!(text.contains("纳指100ETF"));
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let url = serve_once("503 Service Unavailable", b"busy".to_vec()).await;
        assert!(get(&url, None).await.is_err());
    }

    #[tokio::test]
    async fn test_connection_refused_is_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        assert!(get(&format!("http://{}", addr), None).await.is_err());
    }
}
