use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use once_cell::sync::{Lazy, OnceCell};
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;

use crate::{error::Error, logging::Logger};

/// A singleton instance of the reqwest client.
static CLIENT: OnceCell<Client> = OnceCell::new();

static LOGGER: Lazy<Logger> = Lazy::new(|| Logger::new("http"));

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Returns the reqwest client singleton instance or creates one if it doesn't exist.
///
/// The per-request timeout is applied in [`send`], so the shared client only
/// carries connection-level settings.
fn get_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        install_crypto_provider();
        Client::builder()
            .gzip(true)
            .connect_timeout(Duration::from_secs(8))
            .tcp_nodelay(true)
            .pool_idle_timeout(Duration::from_secs(90))
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| anyhow!("Failed to create reqwest client: {:?}", e))
    })
}

/// Performs an HTTP GET request and deserializes the JSON response into the specified type.
///
/// # Arguments
///
/// * `url`: The URL to send the GET request to.
/// * `timeout`: Upper bound for the whole request including the body.
///
/// # Returns
///
/// * `Result<RES>`: The deserialized response, or [`Error::Network`] when the
///   request fails, times out or the body is not the expected JSON.
pub async fn get_json<RES: DeserializeOwned>(url: &str, timeout: Duration) -> Result<RES> {
    let res = send(Method::GET, url, timeout).await?;
    let body = res.text().await.map_err(|why| Error::Network {
        url: redact(url).to_string(),
        reason: format!("Error reading response body: {}", why.without_url()),
    })?;

    serde_json::from_str::<RES>(&body).map_err(|why| {
        Error::Network {
            url: redact(url).to_string(),
            reason: format!("Error parsing response JSON: {}", why),
        }
        .into()
    })
}

/// Sends one request. Failures are logged and returned, never retried.
async fn send(method: Method, url: &str, timeout: Duration) -> Result<Response> {
    let visit_log = format!("{method}:{}", redact(url));
    let client = get_client()?;
    let start = Instant::now();
    let res = client.request(method, url).timeout(timeout).send().await;
    let elapsed = start.elapsed().as_millis();

    match res {
        Ok(response) => {
            LOGGER.info(format!(
                "{} {} {} ms",
                visit_log,
                response.status(),
                elapsed
            ));
            Ok(response)
        }
        Err(why) => {
            // reqwest 的錯誤訊息帶有完整網址，先去掉再記錄
            let why = why.without_url();
            LOGGER.error(format!("{} failed because {:?}. {} ms", visit_log, why, elapsed));
            Err(Error::Network {
                url: redact(url).to_string(),
                reason: why.to_string(),
            }
            .into())
        }
    }
}

/// reqwest 使用 rustls-no-provider，建立 client 前必須先安裝 ring provider。
/// A provider that is already installed is left in place.
pub fn install_crypto_provider() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}

/// 去掉查詢字串，避免 API 金鑰寫進日誌
pub fn redact(url: &str) -> &str {
    url.split_once('?').map_or(url, |(path, _)| path)
}

/// Writes out everything the http logger still holds.
pub fn flush_log() {
    LOGGER.flush();
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;

    #[test]
    fn test_redact() {
        assert_eq!(
            redact("https://creativecommons.tankerkoenig.de/json/list.php?lat=1&apikey=secret"),
            "https://creativecommons.tankerkoenig.de/json/list.php"
        );
        assert_eq!(redact("https://example.com/a"), "https://example.com/a");
    }

    #[tokio::test]
    async fn test_get_json_unreachable() {
        let err = get_json::<Value>(
            "http://127.0.0.1:9/list.php?apikey=secret",
            Duration::from_secs(2),
        )
        .await
        .unwrap_err();

        match err.downcast_ref::<Error>() {
            Some(Error::Network { url, reason }) => {
                assert!(!url.contains("secret"));
                assert!(!reason.contains("secret"));
            }
            other => panic!("unexpected error: {:?}", other),
        }

        assert!(!format!("{}", err).contains("secret"));
        assert!(!format!("{:?}", err).contains("secret"));
        assert!(!format!("{:#}", err).contains("apikey"));
    }
}
