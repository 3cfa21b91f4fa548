use serde::Deserialize;

use crate::error::AppError;
use crate::money::Cents;

/// A priced symbol as returned by the quote provider.
#[derive(Debug, Clone)]
pub struct Quote {
    pub symbol: String,
    pub name: String,
    pub price: Cents,
}

/// Wire format of the provider's quote endpoint.
#[derive(Debug, Deserialize)]
struct QuoteResponse {
    #[serde(rename = "companyName")]
    company_name: String,
    symbol: String,
    #[serde(rename = "latestPrice")]
    latest_price: f64,
}

/// HTTP client for the external quote provider.
///
/// `lookup` distinguishes "the provider doesn't know this symbol" (`None`)
/// from "the provider can't be reached or answered garbage"
/// (`QuoteUnavailable`). No retries; callers decide what a failure means.
pub struct QuoteClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl QuoteClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    pub async fn lookup(&self, symbol: &str) -> Result<Option<Quote>, AppError> {
        let url = format!(
            "{}/stock/{}/quote?token={}",
            self.base_url, symbol, self.api_key
        );

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::QuoteUnavailable(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(AppError::QuoteUnavailable(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let body: QuoteResponse = response
            .json()
            .await
            .map_err(|e| AppError::QuoteUnavailable(e.to_string()))?;

        quote_from_response(body).ok_or_else(|| {
            AppError::QuoteUnavailable("provider returned an unusable price".to_string())
        })
        .map(Some)
    }
}

fn quote_from_response(body: QuoteResponse) -> Option<Quote> {
    let price = Cents::from_dollars(body.latest_price).filter(|p| !p.is_negative())?;
    Some(Quote {
        symbol: body.symbol.to_uppercase(),
        name: body.company_name,
        price,
    })
}
