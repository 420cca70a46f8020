use std::{env, net::IpAddr};

use chrono::Duration;
use gateway_tools::GatewayConfig;
use log::*;
use stf_common::{parse_boolean_flag, Secret};

const DEFAULT_SFS_HOST: &str = "127.0.0.1";
const DEFAULT_SFS_PORT: u16 = 8360;
const DEFAULT_SIGNATURE_HEADER: &str = "x-signature";
const DEFAULT_UNPAID_ORDER_TIMEOUT: Duration = Duration::hours(48);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address,
    /// rather than the connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address, rather
    /// than the connection's remote address.
    pub use_forwarded: bool,
    /// The time before a gateway order that has never seen a capture is expired and cancelled.
    pub unpaid_order_timeout: Duration,
    /// Webhook verification settings.
    pub webhook: WebhookConfig,
    /// Payment gateway client configuration.
    pub gateway: GatewayConfig,
}

#[derive(Clone, Debug)]
pub struct WebhookConfig {
    /// Shared secret the gateway signs webhook bodies with.
    pub hmac_secret: Secret<String>,
    /// The header carrying the hex-encoded HMAC-SHA256 signature.
    pub hmac_header: String,
    pub hmac_checks: bool,
    /// If supplied, webhook deliveries are checked against this list of gateway IP addresses.
    /// To explicitly disable the whitelist, set SFS_GATEWAY_IP_WHITELIST to "false", "none", or
    /// "0".
    pub whitelist: Option<Vec<IpAddr>>,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            hmac_secret: Secret::default(),
            hmac_header: DEFAULT_SIGNATURE_HEADER.to_string(),
            hmac_checks: true,
            whitelist: None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SFS_HOST.to_string(),
            port: DEFAULT_SFS_PORT,
            database_url: String::default(),
            use_x_forwarded_for: false,
            use_forwarded: false,
            unpaid_order_timeout: DEFAULT_UNPAID_ORDER_TIMEOUT,
            webhook: WebhookConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("SFS_HOST").ok().unwrap_or_else(|| DEFAULT_SFS_HOST.into());
        let port = env::var("SFS_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!("🪛️ {s} is not a valid port for SFS_PORT. {e} Using the default, {DEFAULT_SFS_PORT}, instead.");
                    DEFAULT_SFS_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_SFS_PORT);
        let database_url = env::var("SFS_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ SFS_DATABASE_URL is not set. Please set it to the URL for the storefront database.");
            String::default()
        });
        let use_x_forwarded_for = parse_boolean_flag(env::var("SFS_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("SFS_USE_FORWARDED").ok(), false);
        let unpaid_order_timeout = configure_order_timeout();
        let webhook = WebhookConfig::from_env_or_default();
        let gateway = GatewayConfig::new_from_env_or_default();
        Self { host, port, database_url, use_x_forwarded_for, use_forwarded, unpaid_order_timeout, webhook, gateway }
    }
}

impl WebhookConfig {
    pub fn from_env_or_default() -> Self {
        let hmac_secret = env::var("SFS_WEBHOOK_SECRET").ok().unwrap_or_else(|| {
            error!(
                "🪛️ SFS_WEBHOOK_SECRET is not set. Please set it to the shared secret the payment gateway signs \
                 webhook bodies with."
            );
            String::default()
        });
        let hmac_secret = Secret::new(hmac_secret);
        let hmac_header =
            env::var("SFS_WEBHOOK_SIGNATURE_HEADER").ok().unwrap_or_else(|| DEFAULT_SIGNATURE_HEADER.to_string());
        let hmac_checks = parse_boolean_flag(env::var("SFS_WEBHOOK_HMAC_CHECKS").ok(), true);
        if !hmac_checks {
            warn!("🚨️ Webhook HMAC checks are disabled. Do not run production like this.");
        }
        let whitelist = env::var("SFS_GATEWAY_IP_WHITELIST").ok().and_then(|s| {
            if ["none", "false", "0"].contains(&s.to_lowercase().as_str()) {
                info!(
                    "🪛️ The gateway IP whitelist is disabled. If this is not what you want, set \
                     SFS_GATEWAY_IP_WHITELIST to a comma-separated list of IP addresses to enable it."
                );
                return None;
            }
            let ip_addrs = s
                .split(',')
                .filter_map(|s| {
                    s.trim()
                        .parse()
                        .map_err(|e| warn!("🪛️ Ignoring invalid IP address ({s}) in SFS_GATEWAY_IP_WHITELIST: {e}"))
                        .ok()
                })
                .collect::<Vec<IpAddr>>();
            Some(ip_addrs)
        });
        match &whitelist {
            Some(whitelist) if whitelist.is_empty() => {
                warn!(
                    "🚨️ The gateway IP whitelist was configured, but is empty. The server will run, but won't \
                     authorise any incoming webhook deliveries."
                );
            },
            None => {
                info!("🪛️ No gateway IP whitelist is set. Only HMAC validation will be used.");
            },
            Some(v) => {
                let addrs = v.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", ");
                info!("🪛️ Gateway IP whitelist: {addrs}");
            },
        }
        Self { hmac_secret, hmac_header, hmac_checks, whitelist }
    }
}

fn configure_order_timeout() -> Duration {
    env::var("SFS_UNPAID_ORDER_TIMEOUT")
        .map_err(|_| {
            info!(
                "🪛️ SFS_UNPAID_ORDER_TIMEOUT is not set. Using the default value of {} hrs.",
                DEFAULT_UNPAID_ORDER_TIMEOUT.num_hours()
            )
        })
        .and_then(|s| {
            s.parse::<i64>()
                .map(Duration::hours)
                .map_err(|e| warn!("🪛️ Invalid configuration value for SFS_UNPAID_ORDER_TIMEOUT. {e}"))
        })
        .ok()
        .unwrap_or(DEFAULT_UNPAID_ORDER_TIMEOUT)
}
