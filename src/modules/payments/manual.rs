//! Manual payments: the customer pays by mobile-money transfer and sends the
//! receipt over WhatsApp. The order stays PENDING until an admin confirms it.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ManualPaymentConfig {
    pub bankily: String,
    pub sedad: String,
    pub masrivi: String,
    /// International number without `+`, as wa.me expects it
    pub whatsapp_number: String,
}

impl Default for ManualPaymentConfig {
    fn default() -> Self {
        Self {
            bankily: "31777732".to_string(),
            sedad: "31777732".to_string(),
            masrivi: "31777732".to_string(),
            whatsapp_number: "22231777732".to_string(),
        }
    }
}

/// What the customer needs to complete a manual payment
#[derive(Debug, Clone, Serialize)]
pub struct ManualPaymentInstructions {
    pub bankily: String,
    pub sedad: String,
    pub masrivi: String,
    pub message: String,
    pub whatsapp_url: String,
}

pub fn build_whatsapp_link(number: &str, message: &str) -> String {
    format!(
        "https://wa.me/{}?text={}",
        number,
        urlencoding::encode(message)
    )
}

impl ManualPaymentConfig {
    pub fn instructions_for(&self, order_id: i32, total_display: &str) -> ManualPaymentInstructions {
        let message = format!(
            "Hello BookNest, I placed order #{} for {}. Here is my payment receipt.",
            order_id, total_display
        );

        ManualPaymentInstructions {
            bankily: self.bankily.clone(),
            sedad: self.sedad.clone(),
            masrivi: self.masrivi.clone(),
            whatsapp_url: build_whatsapp_link(&self.whatsapp_number, &message),
            message,
        }
    }
}
