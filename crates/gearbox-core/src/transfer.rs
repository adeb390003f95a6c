//! # Transfer State Machine
//!
//! The inter-branch stock transfer lifecycle: structurally the same
//! pattern as the job lifecycle, operating on stock quantities instead
//! of money.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Transfer Lifecycle                                 │
//! │                                                                         │
//! │   pending ──► in_transit ──► completed                                 │
//! │      │             │                                                    │
//! │      └─────────────┴────────► cancelled                                │
//! │                                                                         │
//! │   entry into in_transit:  1 OUTBOUND movement per line @ source        │
//! │   entry into completed:   1 INBOUND movement per line @ destination    │
//! │                           (destination stock record created if absent) │
//! │                                                                         │
//! │   Movements synthesize at most once per ACTUAL transition:             │
//! │   re-saving the current status is accepted and synthesizes nothing.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{CoreError, CoreResult};
use crate::types::{MovementDirection, StockTransfer, TransferItem, TransferStatus};

// =============================================================================
// Movement Intents
// =============================================================================

/// A stock movement the command layer must materialize for a transition.
///
/// Pre-approved: executing an intent inserts the movement row AND applies
/// its quantity effect to the branch stock record in the same database
/// transaction. Inbound intents carry the metadata snapshot needed to
/// create a missing destination record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementIntent {
    /// Branch whose stock record is touched.
    pub branch_id: String,
    pub part_number: String,
    /// Metadata copied to the destination record when it must be created.
    pub name: String,
    pub category: Option<String>,
    pub unit_cost_cents: i64,
    pub direction: MovementDirection,
    pub quantity: i64,
}

/// The result of a transfer status change.
#[derive(Debug, Clone)]
pub struct TransferOutcome {
    pub from: TransferStatus,
    pub to: TransferStatus,
    /// Movements to materialize; empty for re-saves and cancellations.
    pub movements: Vec<MovementIntent>,
}

// =============================================================================
// Transition
// =============================================================================

/// Whether a status change is permitted.
const fn allowed(from: TransferStatus, to: TransferStatus) -> bool {
    use TransferStatus::*;
    matches!(
        (from, to),
        (Pending, InTransit)
            | (InTransit, Completed)
            | (Pending, Cancelled)
            | (InTransit, Cancelled)
    )
}

/// Decides the effect of moving a transfer to `new_status`.
///
/// ## Guards
/// - Re-saving the current status is a no-op outcome (idempotent on
///   repeated writes), never an error.
/// - Anything outside the fixed graph fails with
///   [`CoreError::InvalidTransferTransition`], transfer unchanged.
///
/// ## Movement Synthesis
/// Guarded by comparing old vs. new status, so each synthesis step runs
/// at most once per actual transition:
/// - `→ in_transit`: one outbound intent per line at the source branch.
/// - `→ completed`: one inbound intent per line at the destination
///   branch, carrying the metadata snapshot for create-if-missing.
pub fn transition(
    transfer: &StockTransfer,
    items: &[TransferItem],
    new_status: TransferStatus,
) -> CoreResult<TransferOutcome> {
    let from = transfer.status;

    // Repeated save with the same status: accepted, synthesizes nothing.
    if from == new_status {
        return Ok(TransferOutcome {
            from,
            to: new_status,
            movements: Vec::new(),
        });
    }

    if !allowed(from, new_status) {
        return Err(CoreError::InvalidTransferTransition {
            transfer_number: transfer.transfer_number.clone(),
            from,
            to: new_status,
        });
    }

    let movements = match new_status {
        TransferStatus::InTransit => items
            .iter()
            .map(|item| MovementIntent {
                branch_id: transfer.source_branch_id.clone(),
                part_number: item.part_number.clone(),
                name: item.name.clone(),
                category: item.category.clone(),
                unit_cost_cents: item.unit_cost_cents,
                direction: MovementDirection::Outbound,
                quantity: item.quantity,
            })
            .collect(),
        TransferStatus::Completed => items
            .iter()
            .map(|item| MovementIntent {
                branch_id: transfer.dest_branch_id.clone(),
                part_number: item.part_number.clone(),
                name: item.name.clone(),
                category: item.category.clone(),
                unit_cost_cents: item.unit_cost_cents,
                direction: MovementDirection::Inbound,
                quantity: item.quantity,
            })
            .collect(),
        TransferStatus::Pending | TransferStatus::Cancelled => Vec::new(),
    };

    Ok(TransferOutcome {
        from,
        to: new_status,
        movements,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn transfer_in(status: TransferStatus) -> StockTransfer {
        let now = Utc::now();
        StockTransfer {
            id: "tr1".into(),
            transfer_number: "TRF-20260825-0001".into(),
            source_branch_id: "branch-a".into(),
            dest_branch_id: "branch-b".into(),
            status,
            created_at: now,
            updated_at: now,
            dispatched_at: None,
            completed_at: None,
        }
    }

    fn one_line(quantity: i64) -> Vec<TransferItem> {
        vec![TransferItem {
            id: "li1".into(),
            transfer_id: "tr1".into(),
            part_number: "OIL-5W30".into(),
            name: "Engine Oil 5W30".into(),
            category: Some("lubricants".into()),
            unit_cost_cents: 4_500,
            quantity,
            created_at: Utc::now(),
        }]
    }

    #[test]
    fn test_dispatch_synthesizes_outbound_at_source() {
        let transfer = transfer_in(TransferStatus::Pending);
        let outcome = transition(&transfer, &one_line(10), TransferStatus::InTransit).unwrap();

        assert_eq!(outcome.movements.len(), 1);
        let m = &outcome.movements[0];
        assert_eq!(m.branch_id, "branch-a");
        assert_eq!(m.direction, MovementDirection::Outbound);
        assert_eq!(m.quantity, 10);
    }

    #[test]
    fn test_completion_synthesizes_inbound_at_destination() {
        let transfer = transfer_in(TransferStatus::InTransit);
        let outcome = transition(&transfer, &one_line(10), TransferStatus::Completed).unwrap();

        assert_eq!(outcome.movements.len(), 1);
        let m = &outcome.movements[0];
        assert_eq!(m.branch_id, "branch-b");
        assert_eq!(m.direction, MovementDirection::Inbound);
        assert_eq!(m.quantity, 10);
        // Metadata snapshot travels with the intent for create-if-missing.
        assert_eq!(m.name, "Engine Oil 5W30");
        assert_eq!(m.unit_cost_cents, 4_500);
    }

    #[test]
    fn test_resave_same_status_synthesizes_nothing() {
        let transfer = transfer_in(TransferStatus::InTransit);
        let outcome = transition(&transfer, &one_line(10), TransferStatus::InTransit).unwrap();
        assert!(outcome.movements.is_empty());
    }

    #[test]
    fn test_skipping_in_transit_is_rejected() {
        let transfer = transfer_in(TransferStatus::Pending);
        let err = transition(&transfer, &one_line(10), TransferStatus::Completed).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransferTransition { .. }));
    }

    #[test]
    fn test_backward_and_terminal_transitions_rejected() {
        let completed = transfer_in(TransferStatus::Completed);
        assert!(transition(&completed, &one_line(1), TransferStatus::Pending).is_err());
        assert!(transition(&completed, &one_line(1), TransferStatus::Cancelled).is_err());

        let cancelled = transfer_in(TransferStatus::Cancelled);
        assert!(transition(&cancelled, &one_line(1), TransferStatus::InTransit).is_err());
    }

    #[test]
    fn test_cancellation_moves_no_stock() {
        let transfer = transfer_in(TransferStatus::InTransit);
        let outcome = transition(&transfer, &one_line(10), TransferStatus::Cancelled).unwrap();
        assert!(outcome.movements.is_empty());
    }

    #[test]
    fn test_multi_line_transfer_one_movement_per_line() {
        let mut items = one_line(10);
        items.push(TransferItem {
            id: "li2".into(),
            transfer_id: "tr1".into(),
            part_number: "FLT-AIR".into(),
            name: "Air Filter".into(),
            category: None,
            unit_cost_cents: 1_200,
            quantity: 4,
            created_at: Utc::now(),
        });

        let transfer = transfer_in(TransferStatus::Pending);
        let outcome = transition(&transfer, &items, TransferStatus::InTransit).unwrap();
        assert_eq!(outcome.movements.len(), 2);
    }
}
