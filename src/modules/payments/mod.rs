// Payment providers
// Card payments go through Stripe Checkout; manual payments are settled
// out of band and confirmed by an admin.

pub mod manual;
pub mod stripe;

pub use manual::{ManualPaymentConfig, ManualPaymentInstructions};
pub use stripe::{CheckoutSession, StripeClient, StripeConfig};
