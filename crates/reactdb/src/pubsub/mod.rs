//! Subscription bookkeeping for live selectors.
//!
//! Change delivery itself rides on the store's broadcast; this module only
//! tracks who is listening, for diagnostics and cleanup.

mod manager;
mod subscription;

pub use manager::{SubscriptionGuard, SubscriptionRegistry};
pub use subscription::SubscriptionEntry;
