//! Stripe Checkout client and webhook verification
//!
//! Talks to the Stripe REST API directly with form-encoded requests:
//! - `POST /v1/checkout/sessions` to open a hosted checkout page
//! - `GET /v1/checkout/sessions/:id` to re-read a session after redirect
//!
//! Webhook payloads are authenticated with the `Stripe-Signature` header:
//! `t=<unix>,v1=<hex hmac-sha256 of "<t>.<body>">`.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::collections::HashMap;
use std::fmt;

use crate::domain::DomainError;

type HmacSha256 = Hmac<Sha256>;

/// Maximum age of a webhook signature, in seconds
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Event type that turns a paid session into an order
pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

#[derive(Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    pub webhook_secret: Option<String>,
    pub success_url: Option<String>,
    pub cancel_url: Option<String>,
    pub api_base: String,
}

impl StripeConfig {
    pub const DEFAULT_API_BASE: &'static str = "https://api.stripe.com";
}

// Keys stay out of logs
impl fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &"<redacted>")
            .field(
                "webhook_secret",
                &self.webhook_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("success_url", &self.success_url)
            .field("cancel_url", &self.cancel_url)
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// One line of a hosted checkout page
#[derive(Debug, Clone)]
pub struct CheckoutLineItem {
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub currency: String,
    pub unit_amount: i64,
    pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct CheckoutSessionRequest {
    pub customer_email: Option<String>,
    pub line_items: Vec<CheckoutLineItem>,
    pub success_url: String,
    pub cancel_url: String,
    pub metadata: Vec<(String, String)>,
}

impl CheckoutSessionRequest {
    /// Flatten into Stripe's bracketed form encoding
    pub fn to_form(&self) -> Vec<(String, String)> {
        let mut form = vec![
            ("mode".to_string(), "payment".to_string()),
            ("payment_method_types[0]".to_string(), "card".to_string()),
            ("success_url".to_string(), self.success_url.clone()),
            ("cancel_url".to_string(), self.cancel_url.clone()),
        ];

        if let Some(email) = &self.customer_email {
            form.push(("customer_email".to_string(), email.clone()));
        }

        for (i, item) in self.line_items.iter().enumerate() {
            let prefix = format!("line_items[{}]", i);
            form.push((format!("{prefix}[quantity]"), item.quantity.to_string()));
            form.push((
                format!("{prefix}[price_data][currency]"),
                item.currency.to_lowercase(),
            ));
            form.push((
                format!("{prefix}[price_data][unit_amount]"),
                item.unit_amount.to_string(),
            ));
            form.push((
                format!("{prefix}[price_data][product_data][name]"),
                item.name.clone(),
            ));
            if let Some(description) = &item.description {
                form.push((
                    format!("{prefix}[price_data][product_data][description]"),
                    description.clone(),
                ));
            }
            if let Some(image) = &item.image_url {
                form.push((
                    format!("{prefix}[price_data][product_data][images][0]"),
                    image.clone(),
                ));
            }
        }

        for (key, value) in &self.metadata {
            form.push((format!("metadata[{}]", key), value.clone()));
        }

        form
    }
}

/// The subset of a Checkout Session the store reads
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
}

impl CheckoutSession {
    pub fn is_paid(&self) -> bool {
        self.payment_status.as_deref() == Some("paid")
    }

    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get(key))
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
}

pub struct StripeClient {
    http: reqwest::Client,
    config: StripeConfig,
}

impl StripeClient {
    pub fn new(config: StripeConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &StripeConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base.trim_end_matches('/'), path)
    }

    pub async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, DomainError> {
        let response = self
            .http
            .post(self.endpoint("/v1/checkout/sessions"))
            .bearer_auth(&self.config.secret_key)
            .form(&request.to_form())
            .send()
            .await?;

        Self::parse_session(response).await
    }

    pub async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<CheckoutSession, DomainError> {
        let response = self
            .http
            .get(self.endpoint(&format!(
                "/v1/checkout/sessions/{}",
                urlencoding::encode(session_id)
            )))
            .bearer_auth(&self.config.secret_key)
            .send()
            .await?;

        Self::parse_session(response).await
    }

    async fn parse_session(response: reqwest::Response) -> Result<CheckoutSession, DomainError> {
        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<StripeErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error.message)
                .unwrap_or_else(|| format!("Stripe responded with {}", status));
            tracing::error!("Stripe API error: {}", message);
            return Err(DomainError::External(message));
        }

        Ok(response.json::<CheckoutSession>().await?)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum SignatureError {
    MalformedHeader,
    NoMatchingSignature,
    TimestampOutsideTolerance,
}

impl fmt::Display for SignatureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignatureError::MalformedHeader => write!(f, "Unable to parse signature header"),
            SignatureError::NoMatchingSignature => {
                write!(f, "No signatures found matching the expected signature")
            }
            SignatureError::TimestampOutsideTolerance => {
                write!(f, "Timestamp outside the tolerance zone")
            }
        }
    }
}

fn mac_for(secret: &str, timestamp: &str, payload: &[u8]) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    Some(mac)
}

/// Check a `Stripe-Signature` header against the raw request body.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
) -> Result<(), SignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::MalformedHeader)?;
    let issued_at: i64 = timestamp
        .parse()
        .map_err(|_| SignatureError::MalformedHeader)?;
    if signatures.is_empty() {
        return Err(SignatureError::MalformedHeader);
    }

    let matched = signatures.iter().any(|candidate| {
        hex::decode(candidate)
            .ok()
            .zip(mac_for(secret, timestamp, payload))
            .is_some_and(|(bytes, mac)| mac.verify_slice(&bytes).is_ok())
    });
    if !matched {
        return Err(SignatureError::NoMatchingSignature);
    }

    if (now - issued_at).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(SignatureError::TimestampOutsideTolerance);
    }

    Ok(())
}

/// Build a header value the way Stripe signs deliveries. Used to replay
/// events locally and in tests.
pub fn signature_header(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let timestamp = timestamp.to_string();
    let signature = mac_for(secret, &timestamp, payload)
        .map(|mac| hex::encode(mac.finalize().into_bytes()))
        .unwrap_or_default();
    format!("t={},v1={}", timestamp, signature)
}

/// Verify and decode a webhook delivery
pub fn construct_event(
    payload: &[u8],
    header: &str,
    secret: &str,
) -> Result<WebhookEvent, DomainError> {
    verify_signature(payload, header, secret, chrono::Utc::now().timestamp())
        .map_err(|e| DomainError::Validation(e.to_string()))?;

    serde_json::from_slice(payload)
        .map_err(|e| DomainError::Validation(format!("Invalid event payload: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";
    const BODY: &[u8] = br#"{"id":"evt_1","type":"checkout.session.completed"}"#;

    #[test]
    fn accepts_fresh_valid_signature() {
        let header = signature_header(BODY, SECRET, 1_700_000_000);
        assert_eq!(verify_signature(BODY, &header, SECRET, 1_700_000_100), Ok(()));
    }

    #[test]
    fn rejects_tampered_body_and_wrong_secret() {
        let header = signature_header(BODY, SECRET, 1_700_000_000);
        assert_eq!(
            verify_signature(b"{}", &header, SECRET, 1_700_000_000),
            Err(SignatureError::NoMatchingSignature)
        );
        assert_eq!(
            verify_signature(BODY, &header, "whsec_other", 1_700_000_000),
            Err(SignatureError::NoMatchingSignature)
        );
    }

    #[test]
    fn rejects_stale_timestamp() {
        let header = signature_header(BODY, SECRET, 1_700_000_000);
        assert_eq!(
            verify_signature(BODY, &header, SECRET, 1_700_000_000 + SIGNATURE_TOLERANCE_SECS + 1),
            Err(SignatureError::TimestampOutsideTolerance)
        );
    }

    #[test]
    fn any_v1_entry_may_match() {
        let valid = signature_header(BODY, SECRET, 1_700_000_000);
        let v1 = valid.split_once(",v1=").unwrap().1;
        let header = format!("t=1700000000,v1=deadbeef,v0=abc,v1={}", v1);
        assert_eq!(verify_signature(BODY, &header, SECRET, 1_700_000_000), Ok(()));
    }

    #[test]
    fn malformed_headers() {
        for header in ["", "v1=abc", "t=abc,v1=abc", "t=1700000000"] {
            assert_eq!(
                verify_signature(BODY, header, SECRET, 1_700_000_000),
                Err(SignatureError::MalformedHeader),
                "header {header:?}"
            );
        }
    }

    #[test]
    fn form_encoding_uses_bracket_keys() {
        let request = CheckoutSessionRequest {
            customer_email: Some("reader@booknest.mr".to_string()),
            line_items: vec![CheckoutLineItem {
                name: "Starlight Equations".to_string(),
                description: Some("Rina Patel".to_string()),
                image_url: None,
                currency: "USD".to_string(),
                unit_amount: 2399,
                quantity: 2,
            }],
            success_url: "http://localhost:3000/success?session_id={CHECKOUT_SESSION_ID}"
                .to_string(),
            cancel_url: "http://localhost:3000/cart".to_string(),
            metadata: vec![("user_id".to_string(), "7".to_string())],
        };
        let form: HashMap<String, String> = request.to_form().into_iter().collect();

        assert_eq!(form["mode"], "payment");
        assert_eq!(form["line_items[0][quantity]"], "2");
        assert_eq!(form["line_items[0][price_data][currency]"], "usd");
        assert_eq!(form["line_items[0][price_data][unit_amount]"], "2399");
        assert_eq!(
            form["line_items[0][price_data][product_data][description]"],
            "Rina Patel"
        );
        assert!(!form.contains_key("line_items[0][price_data][product_data][images][0]"));
        assert_eq!(form["metadata[user_id]"], "7");
    }
}
