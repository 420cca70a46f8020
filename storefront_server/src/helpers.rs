use std::{net::IpAddr, str::FromStr};

use actix_web::HttpRequest;
use hmac::{Hmac, Mac};
use log::{debug, trace};
use regex::Regex;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Computes the hex-encoded HMAC-SHA256 of `data` under `secret`. This is the signature scheme
/// the payment gateway applies to the raw webhook body.
pub fn calculate_hmac(secret: &str, data: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(data);
    hex::encode(mac.finalize().into_bytes())
}

/// Verifies a hex-encoded signature over `data`. The underlying comparison is constant-time, so
/// a forged signature cannot be brute-forced byte by byte off response timing.
pub fn verify_hmac(secret: &str, data: &[u8], signature: &str) -> bool {
    let Ok(signature) = hex::decode(signature.trim()) else {
        return false;
    };
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(data);
    mac.verify_slice(&signature).is_ok()
}

/// Get the remote IP address from the request. It uses 3 sources to determine the IP address, in
/// decreasing order of preference:
/// 1. The `X-Forwarded-For` header, iif `use_x_forwarded_for` is set to true in the configuration.
/// 2. The `Forwarded` header, iif `use_forwarded` is set to true in the configuration.
/// 3. The peer address from the connection info.
pub fn get_remote_ip(req: &HttpRequest, use_x_forwarded_for: bool, use_forwarded: bool) -> Option<IpAddr> {
    let mut result = None;
    if use_x_forwarded_for {
        trace!("Checking X-Forwarded-For header");
        result =
            req.headers().get("X-Forwarded-For").and_then(|v| v.to_str().ok()).and_then(|s| IpAddr::from_str(s).ok());
        if let Some(ip) = result {
            debug!("Using X-Forwarded-For header for remote address: {ip}");
        }
    }
    if use_forwarded && result.is_none() {
        trace!("Checking Forwarded header");
        let re = Regex::new(r#"for=(?P<ip>[^;]+)"#).ok()?;
        result = req
            .headers()
            .get("Forwarded")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| re.captures(v))
            .and_then(|caps| caps.name("ip"))
            .map(|m| m.as_str())
            .and_then(|s| IpAddr::from_str(s).ok());
        if let Some(ip) = result {
            debug!("Using Forwarded header for remote address: {ip}");
        }
    }
    result.or_else(|| {
        let peer_addr = req.peer_addr();
        trace!("Using peer address for remote address: {:?}", peer_addr);
        peer_addr.map(|a| a.ip())
    })
}

#[cfg(test)]
mod test {
    use super::*;

    // Vector generated with `echo -n '{"a":1}' | openssl dgst -sha256 -hmac whsec_test`
    const BODY: &[u8] = br#"{"a":1}"#;
    const SECRET: &str = "whsec_test";
    const SIGNATURE: &str = "51426af50a41dd7ff2cd3f116594734766d4018d15d6fb07169aee5d2959adf5";

    #[test]
    fn hmac_matches_reference_vector() {
        assert_eq!(calculate_hmac(SECRET, BODY), SIGNATURE);
        assert!(verify_hmac(SECRET, BODY, SIGNATURE));
    }

    #[test]
    fn tampered_bodies_and_signatures_fail() {
        assert!(!verify_hmac(SECRET, br#"{"a":2}"#, SIGNATURE));
        assert!(!verify_hmac("other_secret", BODY, SIGNATURE));
        let mut wrong = SIGNATURE.to_string();
        wrong.replace_range(0..1, "a");
        assert!(!verify_hmac(SECRET, BODY, &wrong));
        assert!(!verify_hmac(SECRET, BODY, "not-hex"));
    }
}
