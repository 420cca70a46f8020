use log::*;
use stf_common::Secret;

#[derive(Debug, Clone, Default)]
pub struct GatewayConfig {
    /// Base URL of the gateway API, e.g. "https://api.example-payments.com/v1"
    pub base_url: String,
    pub api_key: Secret<String>,
    /// ISO-4217 code used for every order this storefront opens.
    pub currency: String,
}

impl GatewayConfig {
    pub fn new_from_env_or_default() -> Self {
        let base_url = std::env::var("SFS_GATEWAY_URL").unwrap_or_else(|_| {
            warn!("SFS_GATEWAY_URL not set, using (probably useless) default");
            "https://api.example-payments.test/v1".to_string()
        });
        let api_key = Secret::new(std::env::var("SFS_GATEWAY_API_KEY").unwrap_or_else(|_| {
            warn!("SFS_GATEWAY_API_KEY not set, using (probably useless) default");
            "gw_key_00000000".to_string()
        }));
        let currency = std::env::var("SFS_GATEWAY_CURRENCY").unwrap_or_else(|_| {
            info!("SFS_GATEWAY_CURRENCY not set, using USD as default");
            stf_common::DEFAULT_CURRENCY_CODE.to_string()
        });
        Self { base_url, api_key, currency }
    }
}
