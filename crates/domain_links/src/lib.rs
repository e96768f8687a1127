//! Payment Link Domain
//!
//! A payment link grants one debtor the ability to pay one amount through
//! the external processor's hosted page, until it expires. Links are
//! created in batches by staff, announced by email/SMS, instrumented with
//! view/click counters, and retired by exactly one of: completion
//! (reconciliation), the expiry sweep, or staff cancellation.
//!
//! # Lifecycle
//!
//! ```text
//! active -> completed   (reconciliation, exactly once)
//! active -> expired     (background sweep, sole writer of this state)
//! active -> cancelled   (staff)
//! ```
//!
//! Terminal links are never deleted; they stay behind for audit and
//! analytics. Each link lives behind its own async mutex - the
//! serialization scope shared with the reconciliation service, which is
//! what makes "completion wins over expiry" and at-most-one completion
//! commit enforceable.

pub mod error;
pub mod lifecycle;
pub mod link;

pub use error::LinkError;
pub use lifecycle::{
    CreateLinksRequest, LinkAnalytics, LinkCreation, LinkEntry, LinkFilter, LinkSummary,
    PaymentLinkManager,
};
pub use link::{LinkStatus, PaymentLink};
