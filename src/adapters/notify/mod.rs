//! Outbound notification adapters.

pub mod webhook;

pub use webhook::WebhookNotifier;
