use std::sync::Arc;

use log::*;
use rand::{distributions::Alphanumeric, Rng};
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Serialize};
use stf_common::Money;

use crate::{
    config::GatewayConfig,
    data_objects::{NewRemoteOrder, RemoteOrder},
    GatewayApiError,
};

#[derive(Clone)]
pub struct GatewayApi {
    config: GatewayConfig,
    client: Arc<Client>,
}

impl GatewayApi {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let bearer = format!("Bearer {}", config.api_key.reveal());
        let val = HeaderValue::from_str(&bearer).map_err(|e| GatewayApiError::Initialization(e.to_string()))?;
        headers.insert("Authorization", val);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client =
            Client::builder().default_headers(headers).build().map_err(|e| GatewayApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<B>,
    ) -> Result<T, GatewayApiError> {
        let url = self.url(path);
        trace!("Sending gateway query: {url}");
        let mut req = self.client.request(method, url);
        if let Some(body) = body {
            req = req.json(&body);
        }
        // The gateway dedupes on this key, so a timed-out call can be retried without opening a
        // second order.
        req = req.header("X-Idempotency-Key", idempotency_key());
        let response = req.send().await.map_err(|e| GatewayApiError::ResponseError(e.to_string()))?;
        if response.status().is_success() {
            trace!("Gateway query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| GatewayApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| GatewayApiError::ResponseError(e.to_string()))?;
            Err(GatewayApiError::QueryError { status, message })
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    /// Opens an order with the gateway and returns the gateway's record of it. The returned id
    /// is what subsequent webhook deliveries are keyed on.
    pub async fn create_order(&self, amount: Money, reference: &str) -> Result<RemoteOrder, GatewayApiError> {
        let body = NewRemoteOrder { amount, currency: self.config.currency.clone(), reference: reference.to_string() };
        debug!("Opening gateway order for {reference} ({amount} {})", self.config.currency);
        let order = self.rest_query::<RemoteOrder, NewRemoteOrder>(Method::POST, "/orders", Some(body)).await?;
        info!("Opened gateway order {} for {reference}", order.id);
        Ok(order)
    }

    pub async fn refund_payment(&self, payment_id: &str) -> Result<serde_json::Value, GatewayApiError> {
        let path = format!("/payments/{payment_id}/refund");
        debug!("Requesting refund for payment {payment_id}");
        self.rest_query::<serde_json::Value, ()>(Method::POST, &path, None).await
    }
}

fn idempotency_key() -> String {
    rand::thread_rng().sample_iter(&Alphanumeric).take(24).map(char::from).collect()
}
