use crate::config::{BROWSER_USER_AGENT, request_timeout};
use crate::market::MarketDataError;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

pub fn build_client() -> Client {
    Client::builder()
        .timeout(request_timeout())
        .user_agent(BROWSER_USER_AGENT)
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// GET a JSON body. Non-success statuses become `Status`, 429 becomes
/// `RateLimited`, and bodies that do not match `T` become `Malformed`.
pub async fn get_json<T: DeserializeOwned>(
    client: &Client,
    provider: &str,
    url: &str,
) -> Result<T, MarketDataError> {
    debug!("{} GET {}", provider, url);
    let response = client.get(url).send().await?;
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(MarketDataError::RateLimited(provider.to_string()));
    }
    if !status.is_success() {
        return Err(MarketDataError::Status {
            provider: provider.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response.text().await?;
    serde_json::from_str::<T>(&body)
        .map_err(|e| MarketDataError::malformed(format!("{} payload: {}", provider, e)))
}

#[derive(Deserialize, Debug)]
struct RelayEnvelope {
    contents: Option<String>,
}

pub fn relay_url(relay_base: &str, target: &str) -> String {
    format!("{}/get?url={}", relay_base, urlencoding::encode(target))
}

/// GET `target` through the CORS relay. The relay returns the upstream body
/// as a string in `contents`, which is parsed a second time into `T`.
pub async fn get_json_via_relay<T: DeserializeOwned>(
    client: &Client,
    provider: &str,
    relay_base: &str,
    target: &str,
) -> Result<T, MarketDataError> {
    let envelope: RelayEnvelope = get_json(client, provider, &relay_url(relay_base, target)).await?;
    let contents = envelope
        .contents
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| MarketDataError::malformed(format!("{} relay returned no contents", provider)))?;
    serde_json::from_str::<T>(&contents)
        .map_err(|e| MarketDataError::malformed(format!("{} relayed payload: {}", provider, e)))
}

#[cfg(test)]
pub(crate) mod test_server {
    use axum::Router;
    use tokio::net::TcpListener;

    /// Serves `router` on an ephemeral localhost port and returns its base URL.
    pub async fn spawn(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        format!("http://{}", addr)
    }
}
