use std::env;

use crate::modules::payments::manual::ManualPaymentConfig;
use crate::modules::payments::stripe::StripeConfig;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    /// Public origin of the storefront, used to absolutize image paths
    pub public_url: String,
    /// Currency recorded on every order
    pub store_currency: String,
    /// Account that is promoted to ADMIN when it signs up
    pub admin_email: Option<String>,
    /// Card payments are disabled when the secret key is missing
    pub stripe: Option<StripeConfig>,
    pub manual_payments: ManualPaymentConfig,
    /// HS256 key for bearer tokens
    pub jwt_secret: String,
}

/// Development-only signing key, refused by release builds
const DEV_JWT_SECRET: &str = "secret";

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://booknest.db?mode=rwc".to_string(),
            port: 8000,
            cors_allowed_origins: Vec::new(),
            public_url: "http://localhost:3000".to_string(),
            store_currency: "MRU".to_string(),
            admin_email: None,
            stripe: None,
            manual_payments: ManualPaymentConfig::default(),
            jwt_secret: DEV_JWT_SECRET.to_string(),
        }
    }
}

impl Config {
    /// Fails when a release build starts without `JWT_SECRET`
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();
        let jwt_secret = resolve_jwt_secret(env::var("JWT_SECRET").ok(), cfg!(debug_assertions))?;

        let stripe = env::var("STRIPE_SECRET_KEY").ok().map(|secret_key| StripeConfig {
            secret_key,
            webhook_secret: env::var("STRIPE_WEBHOOK_SECRET").ok(),
            success_url: env::var("STRIPE_SUCCESS_URL").ok(),
            cancel_url: env::var("STRIPE_CANCEL_URL").ok(),
            api_base: env::var("STRIPE_API_BASE")
                .unwrap_or_else(|_| StripeConfig::DEFAULT_API_BASE.to_string()),
        });

        let manual_defaults = ManualPaymentConfig::default();
        let manual_payments = ManualPaymentConfig {
            bankily: env::var("MANUAL_BANKILY").unwrap_or(manual_defaults.bankily),
            sedad: env::var("MANUAL_SEDAD").unwrap_or(manual_defaults.sedad),
            masrivi: env::var("MANUAL_MASRIVI").unwrap_or(manual_defaults.masrivi),
            whatsapp_number: env::var("WHATSAPP_NUMBER")
                .unwrap_or(manual_defaults.whatsapp_number),
        };

        Ok(Self {
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .ok()
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(Vec::new),
            public_url: env::var("PUBLIC_URL").unwrap_or(defaults.public_url),
            store_currency: env::var("STORE_CURRENCY").unwrap_or(defaults.store_currency),
            admin_email: env::var("ADMIN_EMAIL")
                .ok()
                .map(|email| email.trim().to_lowercase()),
            stripe,
            manual_payments,
            jwt_secret,
        })
    }
}

fn resolve_jwt_secret(value: Option<String>, debug_build: bool) -> Result<String, String> {
    match value.filter(|s| !s.trim().is_empty()) {
        Some(secret) => Ok(secret),
        None if debug_build => {
            tracing::warn!("JWT_SECRET is not set, using the development key");
            Ok(DEV_JWT_SECRET.to_string())
        }
        None => Err("JWT_SECRET environment variable must be set in production".to_string()),
    }
}
