//! Infrastructure Gateway Crate
//!
//! Production adapters behind the `core_kernel` port traits:
//!
//! - [`HttpPaymentProcessor`]: the hosted checkout processor over reqwest
//! - [`GatewayDispatcher`]: SMTP email (lettre) and HTTP SMS dispatch
//!
//! The domain crates never see these types directly; the server binary
//! wires them in as `Arc<dyn PaymentProcessor>` and
//! `Arc<dyn CommunicationDispatcher>`.

pub mod config;
pub mod dispatcher;
pub mod processor;

pub use config::{ProcessorConfig, SmsConfig, SmtpConfig};
pub use dispatcher::{DispatchSetupError, GatewayDispatcher};
pub use processor::HttpPaymentProcessor;
