//! Application lifecycle: eligibility-gated submission, status changes, job posting, cascades.

mod notifier;
mod service;

pub use notifier::{Notification, NotificationError, Notifier};
pub use service::{ApplicationService, CascadeSummary};
