//! Webhook送信
//!
//! エンベロープ生成、HMAC署名、リトライ付き配信

pub mod delivery;
pub mod signature;

pub use delivery::{DeliveryReport, WebhookDispatcher, WEBHOOK_USER_AGENT};
pub use signature::{sign_payload, verify_signature, SIGNATURE_HEADER};
