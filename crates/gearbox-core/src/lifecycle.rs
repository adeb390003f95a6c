//! # Job Lifecycle State Machine
//!
//! The ordered status sequence a job follows, the guard conditions on
//! each transition, and the side-effect intents a transition produces.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Job Lifecycle (forward only)                       │
//! │                                                                         │
//! │  RECEPTION → ESTIMATION → WORK_ASSIGNMENT → WORK_IN_PROGRESS           │
//! │                                                    │                    │
//! │        ┌───────────────────────────────────────────┘                    │
//! │        ▼                                                                │
//! │  QUALITY_CONTROL → INVOICING ──[invoice exists?]──► DELIVERY → CLOSED  │
//! │                                                                         │
//! │  • RECEPTION is the only initial state                                 │
//! │  • CLOSED is the only terminal state (advance always fails there)     │
//! │  • Every successful transition queues ONE customer notification       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Purity
//! `advance` is a pure function of (job, has_invoice) → outcome. It never
//! persists anything and never dispatches anything; it returns the new
//! status plus side-effect intents for the command layer to execute after
//! validation succeeds.

use crate::error::{CoreError, CoreResult};
use crate::types::{Job, JobStatus};

// =============================================================================
// Adjacency & Progress
// =============================================================================

impl JobStatus {
    /// All states in required forward order. Index in this slice is the
    /// progress index used by reporting.
    pub const ALL: [JobStatus; 8] = [
        JobStatus::Reception,
        JobStatus::Estimation,
        JobStatus::WorkAssignment,
        JobStatus::WorkInProgress,
        JobStatus::QualityControl,
        JobStatus::Invoicing,
        JobStatus::Delivery,
        JobStatus::Closed,
    ];

    /// The single permitted next state, or None from the terminal state.
    ///
    /// This is the fixed adjacency table: there is exactly one way
    /// forward and no way back.
    pub const fn next(self) -> Option<JobStatus> {
        match self {
            JobStatus::Reception => Some(JobStatus::Estimation),
            JobStatus::Estimation => Some(JobStatus::WorkAssignment),
            JobStatus::WorkAssignment => Some(JobStatus::WorkInProgress),
            JobStatus::WorkInProgress => Some(JobStatus::QualityControl),
            JobStatus::QualityControl => Some(JobStatus::Invoicing),
            JobStatus::Invoicing => Some(JobStatus::Delivery),
            JobStatus::Delivery => Some(JobStatus::Closed),
            JobStatus::Closed => None,
        }
    }

    /// Position in the fixed state list (0-based).
    pub fn progress_index(self) -> usize {
        // ALL is tiny and fixed; a scan is clearer than a lookup table.
        JobStatus::ALL
            .iter()
            .position(|s| *s == self)
            .unwrap_or(JobStatus::ALL.len() - 1)
    }

    /// True for the one terminal state.
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Closed)
    }

    /// Fixed customer-facing message template for ENTERING this state.
    ///
    /// The `{job}` placeholder is filled with the job number by
    /// [`notification_body`].
    pub const fn customer_template(self) -> &'static str {
        match self {
            JobStatus::Reception => "Your vehicle has been received for job {job}.",
            JobStatus::Estimation => "We are preparing the estimate for job {job}.",
            JobStatus::WorkAssignment => "A technician has been assigned to job {job}.",
            JobStatus::WorkInProgress => "Work on your vehicle has started for job {job}.",
            JobStatus::QualityControl => "Job {job} is undergoing final quality checks.",
            JobStatus::Invoicing => "The invoice for job {job} is being prepared.",
            JobStatus::Delivery => "Your vehicle is ready for collection (job {job}).",
            JobStatus::Closed => "Job {job} is now closed. Thank you for your business.",
        }
    }
}

/// Renders the notification text for a job entering a state.
pub fn notification_body(status: JobStatus, job_number: &str) -> String {
    status.customer_template().replace("{job}", job_number)
}

// =============================================================================
// Side-Effect Intents
// =============================================================================

/// A side effect a successful transition asks the command layer to
/// perform. The state machine decides; the caller executes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Queue an outbound customer notification (fire-and-forget:
    /// delivery failures never fail the transition).
    Notify { recipient: String, body: String },
}

/// The result of a successful `advance` call.
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    /// The state the job was in.
    pub from: JobStatus,
    /// The state to persist.
    pub to: JobStatus,
    /// Side effects to execute after the status write succeeds.
    pub effects: Vec<Effect>,
}

// =============================================================================
// Advance
// =============================================================================

/// Advances a job one step along the fixed lifecycle.
///
/// ## Guards
/// - Terminal state → [`CoreError::CannotAdvance`], job unchanged.
/// - `INVOICING → DELIVERY` requires an invoice to exist for the job.
///   The source system enforced this in one call path and disabled it in
///   another; this implementation always enforces it (see DESIGN.md).
///
/// ## Effects
/// Exactly one `Notify` intent per successful transition, using the
/// fixed template of the state being entered, addressed to the
/// customer's phone. Jobs without a phone on file produce no intent.
///
/// ## Example
/// ```rust,ignore
/// let outcome = lifecycle::advance(&job, invoice_exists)?;
/// repo.update_status(&job.id, outcome.to).await?;
/// for effect in outcome.effects { /* enqueue */ }
/// ```
pub fn advance(job: &Job, has_invoice: bool) -> CoreResult<TransitionOutcome> {
    let from = job.status;

    let to = from.next().ok_or_else(|| CoreError::CannotAdvance {
        job_number: job.job_number.clone(),
        status: from,
    })?;

    // Invoice-before-delivery guard. Checkable because invoice ownership
    // is exclusive (at most one per job).
    if from == JobStatus::Invoicing && !has_invoice {
        return Err(CoreError::GuardViolation {
            job_number: job.job_number.clone(),
            reason: "an invoice must exist before the job can move to delivery".to_string(),
        });
    }

    let effects = match &job.customer_phone {
        Some(phone) => vec![Effect::Notify {
            recipient: phone.clone(),
            body: notification_body(to, &job.job_number),
        }],
        None => Vec::new(),
    };

    Ok(TransitionOutcome { from, to, effects })
}

/// Checks that a job's financial estimate may be edited.
///
/// Direct financial-field edits are only legal during `ESTIMATION`; every
/// other stage mutates money exclusively through payments and invoices.
pub fn ensure_estimate_editable(job: &Job) -> CoreResult<()> {
    if job.status != JobStatus::Estimation {
        return Err(CoreError::GuardViolation {
            job_number: job.job_number.clone(),
            reason: format!(
                "estimate can only be edited during ESTIMATION, job is {:?}",
                job.status
            ),
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn job_in(status: JobStatus) -> Job {
        let now = Utc::now();
        Job {
            id: "j1".into(),
            job_number: "JOB-20260825-0001".into(),
            customer_id: "c1".into(),
            customer_phone: Some("+15550001111".into()),
            vehicle: Some("ABC-123 Corolla".into()),
            advisor_id: None,
            branch_id: None,
            status,
            gross_cents: 0,
            tax_cents: 0,
            discount_cents: 0,
            net_cents: 0,
            advance_received_cents: 0,
            balance_due_cents: 0,
            lead_id: None,
            booking_id: None,
            notes: None,
            sla_started_at: None,
            created_at: now,
            updated_at: now,
            closed_at: None,
        }
    }

    #[test]
    fn test_full_forward_walk() {
        // Walk the whole lifecycle; each advance moves exactly one step.
        let mut job = job_in(JobStatus::Reception);
        for window in JobStatus::ALL.windows(2) {
            assert_eq!(job.status, window[0]);
            let outcome = advance(&job, true).unwrap();
            assert_eq!(outcome.from, window[0]);
            assert_eq!(outcome.to, window[1]);
            job.status = outcome.to;
        }
        assert_eq!(job.status, JobStatus::Closed);
    }

    #[test]
    fn test_terminal_state_cannot_advance() {
        let job = job_in(JobStatus::Closed);
        let err = advance(&job, true).unwrap_err();
        assert!(matches!(err, CoreError::CannotAdvance { .. }));
    }

    #[test]
    fn test_invoice_guard_blocks_delivery() {
        let job = job_in(JobStatus::Invoicing);

        let err = advance(&job, false).unwrap_err();
        assert!(matches!(err, CoreError::GuardViolation { .. }));

        let outcome = advance(&job, true).unwrap();
        assert_eq!(outcome.to, JobStatus::Delivery);
    }

    #[test]
    fn test_guard_only_applies_leaving_invoicing() {
        // Earlier stages do not care whether an invoice exists yet.
        let job = job_in(JobStatus::WorkInProgress);
        let outcome = advance(&job, false).unwrap();
        assert_eq!(outcome.to, JobStatus::QualityControl);
    }

    #[test]
    fn test_every_transition_notifies() {
        let job = job_in(JobStatus::Reception);
        let outcome = advance(&job, false).unwrap();
        assert_eq!(outcome.effects.len(), 1);
        match &outcome.effects[0] {
            Effect::Notify { recipient, body } => {
                assert_eq!(recipient, "+15550001111");
                assert!(body.contains("JOB-20260825-0001"));
                assert!(body.contains("estimate"));
            }
        }
    }

    #[test]
    fn test_no_phone_no_notification() {
        let mut job = job_in(JobStatus::Reception);
        job.customer_phone = None;
        let outcome = advance(&job, false).unwrap();
        assert!(outcome.effects.is_empty());
    }

    #[test]
    fn test_progress_index_matches_order() {
        assert_eq!(JobStatus::Reception.progress_index(), 0);
        assert_eq!(JobStatus::Invoicing.progress_index(), 5);
        assert_eq!(JobStatus::Closed.progress_index(), 7);
    }

    #[test]
    fn test_adjacency_covers_all_states_once() {
        // Every non-terminal state has exactly one successor, and the
        // successors are exactly the states after the first.
        let successors: Vec<JobStatus> = JobStatus::ALL
            .iter()
            .filter_map(|s| s.next())
            .collect();
        assert_eq!(&successors[..], &JobStatus::ALL[1..]);
        assert!(JobStatus::Closed.next().is_none());
    }

    #[test]
    fn test_estimate_guard() {
        assert!(ensure_estimate_editable(&job_in(JobStatus::Estimation)).is_ok());
        assert!(ensure_estimate_editable(&job_in(JobStatus::WorkInProgress)).is_err());
        assert!(ensure_estimate_editable(&job_in(JobStatus::Closed)).is_err());
    }
}
