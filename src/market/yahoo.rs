use crate::market::http::{get_json, get_json_via_relay};
use crate::market::provider::{AssetProvider, PriceRefresher};
use crate::market::{AssetSnapshot, Currency, MarketDataError, SnapshotUpdate, decimal_from_f64};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum YahooRoute {
    Direct,
    /// Through the CORS relay at the given base URL.
    Relay(String),
}

#[derive(Deserialize, Debug)]
struct YahooChartResponse {
    chart: ChartEnvelope,
}

#[derive(Deserialize, Debug)]
struct ChartEnvelope {
    result: Option<Vec<YahooResult>>,
    error: Option<YahooError>,
}

#[derive(Deserialize, Debug)]
struct YahooError {
    code: Option<String>,
    description: Option<String>,
}

#[derive(Deserialize, Debug)]
struct YahooResult {
    meta: YahooMeta,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct YahooMeta {
    symbol: Option<String>,
    currency: Option<String>,
    long_name: Option<String>,
    short_name: Option<String>,
    regular_market_price: Option<f64>,
    chart_previous_close: Option<f64>,
    previous_close: Option<f64>,
    regular_market_volume: Option<f64>,
}

/// Quote derived from the chart endpoint's `meta` block, already in the
/// panel currency.
#[derive(Debug)]
struct ChartQuote {
    symbol: String,
    name: String,
    price: Decimal,
    previous_close: Option<Decimal>,
    volume: Option<Decimal>,
}

impl ChartQuote {
    fn change(&self) -> Decimal {
        self.previous_close
            .map(|prev| self.price - prev)
            .unwrap_or(Decimal::ZERO)
    }

    fn change_percent(&self) -> Decimal {
        match self.previous_close {
            Some(prev) if !prev.is_zero() => ((self.price - prev) / prev * Decimal::ONE_HUNDRED).round_dp(4),
            _ => Decimal::ZERO,
        }
    }
}

fn chart_quote(response: YahooChartResponse, symbol: &str, currency: Currency) -> Result<ChartQuote, MarketDataError> {
    if let Some(err) = response.chart.error {
        let code = err.code.unwrap_or_default();
        let description = err.description.unwrap_or_default();
        return Err(MarketDataError::NotFound(format!("{} ({}: {})", symbol, code, description)));
    }

    let meta = response
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .map(|r| r.meta)
        .ok_or_else(|| MarketDataError::NotFound(format!("No chart result for {}", symbol)))?;

    // Listings in another supported currency go through USD; anything else
    // is left to the next provider.
    let listed = match meta.currency.as_deref() {
        None => Currency::Usd,
        Some(code) => code.parse::<Currency>().map_err(|_| {
            MarketDataError::malformed(format!("{} is listed in {}, which cannot be converted", symbol, code))
        })?,
    };
    let convert = |v: Option<f64>| {
        v.and_then(decimal_from_f64)
            .map(|d| d * currency.usd_rate() / listed.usd_rate())
    };

    let price = convert(meta.regular_market_price)
        .ok_or_else(|| MarketDataError::malformed(format!("No regularMarketPrice for {}", symbol)))?;
    let symbol = meta.symbol.unwrap_or_else(|| symbol.to_uppercase());
    let name = meta
        .long_name
        .or(meta.short_name)
        .unwrap_or_else(|| symbol.clone());

    Ok(ChartQuote {
        symbol,
        name,
        price,
        previous_close: convert(meta.chart_previous_close.or(meta.previous_close)),
        volume: meta.regular_market_volume.and_then(decimal_from_f64),
    })
}

/// Yahoo chart endpoint used as a stock quote source.
pub struct YahooChart {
    client: Client,
    base: String,
    route: YahooRoute,
    currency: Currency,
}

impl YahooChart {
    pub fn new(client: Client, base: &str, route: YahooRoute, currency: Currency) -> Self {
        Self {
            client,
            base: base.to_string(),
            route,
            currency,
        }
    }

    fn label(&self) -> &'static str {
        match self.route {
            YahooRoute::Direct => "Yahoo",
            YahooRoute::Relay(_) => "Yahoo (Proxy)",
        }
    }

    async fn quote(&self, symbol: &str) -> Result<ChartQuote, MarketDataError> {
        let symbol = symbol.trim().to_uppercase();
        let target = format!(
            "{}/v8/finance/chart/{}?interval=1d&range=5d",
            self.base,
            urlencoding::encode(&symbol)
        );
        let response: YahooChartResponse = match &self.route {
            YahooRoute::Direct => get_json(&self.client, self.label(), &target).await?,
            YahooRoute::Relay(relay) => get_json_via_relay(&self.client, self.label(), relay, &target).await?,
        };
        chart_quote(response, &symbol, self.currency)
    }
}

#[async_trait]
impl AssetProvider for YahooChart {
    fn name(&self) -> &str {
        self.label()
    }

    async fn fetch(&self, id: &str) -> Result<AssetSnapshot, MarketDataError> {
        let quote = self.quote(id).await?;
        Ok(AssetSnapshot {
            id: quote.symbol.clone(),
            change: quote.change(),
            change_percent: quote.change_percent(),
            symbol: quote.symbol,
            name: quote.name,
            price: quote.price,
            volume: quote.volume,
            market_cap: None,
            image: None,
            currency: self.currency,
            source: self.label().to_string(),
            updated_at: Utc::now(),
        })
    }
}

#[async_trait]
impl PriceRefresher for YahooChart {
    fn name(&self) -> &str {
        self.label()
    }

    async fn refresh(&self, id: &str) -> Result<SnapshotUpdate, MarketDataError> {
        let quote = self.quote(id).await?;
        let mut update = SnapshotUpdate::new(id, self.label());
        update.change = quote.previous_close.map(|_| quote.change());
        update.change_percent = quote.previous_close.map(|_| quote.change_percent());
        update.price = Some(quote.price);
        update.volume = quote.volume;
        Ok(update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::http::{build_client, test_server};
    use axum::extract::{Path, Query};
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use axum::routing::get;
    use axum::{Json, Router};
    use rust_decimal_macros::dec;
    use serde_json::{Value, json};
    use std::collections::HashMap;

    fn chart_body(symbol: &str) -> (StatusCode, Value) {
        match symbol {
            "AAPL" => (
                StatusCode::OK,
                json!({ "chart": { "result": [{ "meta": {
                    "symbol": "AAPL", "currency": "USD", "longName": "Apple Inc.",
                    "regularMarketPrice": 200.0, "chartPreviousClose": 190.0,
                    "regularMarketVolume": 2400000
                }}], "error": null }}),
            ),
            "SAP.DE" => (
                StatusCode::OK,
                json!({ "chart": { "result": [{ "meta": {
                    "symbol": "SAP.DE", "currency": "EUR", "shortName": "SAP SE",
                    "regularMarketPrice": 92.0, "chartPreviousClose": 87.4
                }}], "error": null }}),
            ),
            "VOD.L" => (
                StatusCode::OK,
                json!({ "chart": { "result": [{ "meta": {
                    "symbol": "VOD.L", "currency": "GBp", "regularMarketPrice": 72.5
                }}], "error": null }}),
            ),
            "NOPRICE" => (
                StatusCode::OK,
                json!({ "chart": { "result": [{ "meta": { "symbol": "NOPRICE" } }], "error": null }}),
            ),
            _ => (
                StatusCode::NOT_FOUND,
                json!({ "chart": { "result": null, "error": {
                    "code": "Not Found", "description": "No data found, symbol may be delisted"
                }}}),
            ),
        }
    }

    async fn chart(Path(symbol): Path<String>) -> Response {
        let (status, body) = chart_body(&symbol);
        (status, Json(body)).into_response()
    }

    async fn relay(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
        let target = params.get("url").cloned().unwrap_or_default();
        let symbol = target
            .split("/chart/")
            .nth(1)
            .and_then(|rest| rest.split('?').next())
            .unwrap_or_default()
            .to_string();
        // the relay answers 200 even when upstream did not
        let (_, body) = chart_body(&symbol);
        Json(json!({ "contents": body.to_string() }))
    }

    async fn server() -> String {
        let app = Router::new()
            .route("/v8/finance/chart/:symbol", get(chart))
            .route("/get", get(relay));
        test_server::spawn(app).await
    }

    #[tokio::test]
    async fn test_direct_quote() {
        let base = server().await;
        let yahoo = YahooChart::new(build_client(), &base, YahooRoute::Direct, Currency::Usd);
        let snap = yahoo.fetch("aapl").await.unwrap();
        assert_eq!(snap.symbol, "AAPL");
        assert_eq!(snap.name, "Apple Inc.");
        assert_eq!(snap.price, dec!(200));
        assert_eq!(snap.change, dec!(10));
        assert_eq!(snap.change_percent, dec!(5.2632));
        assert_eq!(snap.volume, Some(dec!(2400000)));
        assert_eq!(snap.source, "Yahoo");
    }

    #[tokio::test]
    async fn test_relay_quote_and_errors() {
        let base = server().await;
        let yahoo = YahooChart::new(
            build_client(),
            &base,
            YahooRoute::Relay(base.clone()),
            Currency::Eur,
        );
        let snap = yahoo.fetch("AAPL").await.unwrap();
        assert_eq!(snap.price, dec!(184));
        assert_eq!(snap.source, "Yahoo (Proxy)");

        assert!(matches!(yahoo.fetch("ZZZZ").await, Err(MarketDataError::NotFound(_))));
        assert!(matches!(yahoo.fetch("NOPRICE").await, Err(MarketDataError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_direct_not_found_is_status() {
        let base = server().await;
        let yahoo = YahooChart::new(build_client(), &base, YahooRoute::Direct, Currency::Usd);
        assert!(matches!(
            yahoo.fetch("ZZZZ").await,
            Err(MarketDataError::Status { status: 404, .. })
        ));
    }

    #[tokio::test]
    async fn test_refresh_has_no_market_cap() {
        let base = server().await;
        let yahoo = YahooChart::new(build_client(), &base, YahooRoute::Direct, Currency::Usd);
        let update = yahoo.refresh("AAPL").await.unwrap();
        assert_eq!(update.price, Some(dec!(200)));
        assert_eq!(update.market_cap, None);
        assert!(update.change_percent.is_some());
    }

    #[tokio::test]
    async fn test_identical_refresh_keeps_change() {
        let base = server().await;
        let yahoo = YahooChart::new(build_client(), &base, YahooRoute::Direct, Currency::Usd);
        let mut snap = yahoo.fetch("AAPL").await.unwrap();
        assert_eq!(snap.change, dec!(10));

        let update = yahoo.refresh("AAPL").await.unwrap();
        assert_eq!(update.change, Some(dec!(10)));
        snap.apply_update(&update);
        assert_eq!(snap.price, dec!(200));
        assert_eq!(snap.change, dec!(10));
        assert_eq!(snap.change_percent, dec!(5.2632));
    }

    #[tokio::test]
    async fn test_foreign_listing_is_converted_to_panel_currency() {
        let base = server().await;
        let usd = YahooChart::new(build_client(), &base, YahooRoute::Direct, Currency::Usd);
        let snap = usd.fetch("SAP.DE").await.unwrap();
        assert_eq!(snap.price, dec!(100));
        assert_eq!(snap.change, dec!(5));
        assert_eq!(snap.currency, Currency::Usd);

        let eur = YahooChart::new(build_client(), &base, YahooRoute::Direct, Currency::Eur);
        let snap = eur.fetch("SAP.DE").await.unwrap();
        assert_eq!(snap.price, dec!(92));
        assert_eq!(snap.currency, Currency::Eur);
    }

    #[tokio::test]
    async fn test_unsupported_listing_currency_is_malformed() {
        let base = server().await;
        let yahoo = YahooChart::new(build_client(), &base, YahooRoute::Direct, Currency::Usd);
        assert!(matches!(yahoo.fetch("VOD.L").await, Err(MarketDataError::Malformed(_))));
        assert!(matches!(yahoo.refresh("VOD.L").await, Err(MarketDataError::Malformed(_))));
    }
}
