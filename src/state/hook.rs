//! Hook: injectable follow-on effects fired after a write commits.
//!
//! Notification and payment set-up live behind this trait. The service calls
//! the hook only once the record is durable; a hook error is logged and never
//! undoes the committed change.

use crate::error::Result;
use crate::state::{Application, Decision};

pub trait ApprovalHook: Send + Sync {
    /// Called after a new application has been stored.
    fn on_submitted(&self, _app: &Application) -> Result<()> {
        Ok(())
    }

    /// Called after any committed approve/reject.
    fn on_decided(&self, _app: &Application, _decision: Decision) -> Result<()> {
        Ok(())
    }

    /// Called after the final approval; the application is now payment-eligible.
    fn on_approved(&self, _app: &Application) -> Result<()> {
        Ok(())
    }
}

/// No-op hook: default when nothing downstream is wired.
#[derive(Debug, Clone, Default)]
pub struct NoOpHook;

impl ApprovalHook for NoOpHook {}

/// Announces payment eligibility as a structured event for log consumers.
#[derive(Debug, Clone, Default)]
pub struct LoggingHook;

impl ApprovalHook for LoggingHook {
    fn on_approved(&self, app: &Application) -> Result<()> {
        tracing::info!(
            application_id = %app.application_id,
            user_id = %app.user_id,
            member_type = ?app.member_type,
            "application approved; eligible for payment"
        );
        Ok(())
    }
}
