//! Work-order progress tracking.
//!
//! Each advance appends one [`WorkResult`] and moves the order to the status
//! mapped from the step:
//!
//! ```text
//! S0_PLANNED ─1→ S1_READY ─2→ S2_ASSEMBLY ─3→ S3_INSPECTION ─4→ S4_PACK ─5→ S5_DONE
//! ```
//!
//! Steps are classified against the current status (see
//! [`TransitionKind::classify`]); which classes are accepted, and what
//! happens when the order does not exist, is decided by [`ProgressConfig`].

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{OrderingPolicy, ProgressConfig, UnknownOrderPolicy};
use crate::error::{MesError, Result};
use crate::types::{OperationSeq, OrderStatus};
use crate::work_order::{self, WorkOrder};
use crate::work_result::{self, WorkResult};

// ---------------------------------------------------------------------------
// TransitionKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    /// The step right after the current one.
    Forward,
    /// The step the order is already at.
    Repeat,
    /// More than one step ahead.
    Skip,
    /// A step behind the current one.
    Regression,
}

impl TransitionKind {
    pub fn classify(from: OrderStatus, to: OperationSeq) -> Self {
        let current = from.step();
        let target = to.get();
        match target.cmp(&current) {
            Ordering::Equal => TransitionKind::Repeat,
            Ordering::Less => TransitionKind::Regression,
            Ordering::Greater if target == current + 1 => TransitionKind::Forward,
            Ordering::Greater => TransitionKind::Skip,
        }
    }

    pub fn is_out_of_order(self) -> bool {
        matches!(self, TransitionKind::Skip | TransitionKind::Regression)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TransitionKind::Forward => "forward",
            TransitionKind::Repeat => "repeat",
            TransitionKind::Skip => "skip",
            TransitionKind::Regression => "regression",
        }
    }
}

// ---------------------------------------------------------------------------
// Advance
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvanceRequest {
    pub order_id: Uuid,
    pub operation_seq: OperationSeq,
    pub equipment_id: Option<String>,
}

impl AdvanceRequest {
    /// Blank equipment ids count as unset.
    pub fn new(order_id: Uuid, operation_seq: OperationSeq, equipment_id: Option<String>) -> Self {
        let equipment_id = equipment_id
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());
        Self {
            order_id,
            operation_seq,
            equipment_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvanceOutcome {
    pub result: WorkResult,
    /// The order after the step; `None` when the id did not resolve.
    pub order: Option<WorkOrder>,
    pub transition: Option<TransitionKind>,
}

/// Move `order` onto `seq` in memory.
///
/// `start_ts` is only ever set once; `end_ts` is set whenever the terminal
/// step is recorded.
pub fn apply_step(order: &mut WorkOrder, seq: OperationSeq, now: DateTime<Utc>) {
    order.status = seq.status();
    if order.start_ts.is_none() {
        order.start_ts = Some(now);
    }
    if seq.is_terminal() {
        order.end_ts = Some(now);
    }
}

/// Record a step for an order. The result row and the order update commit
/// together or not at all.
pub fn advance(
    conn: &mut Connection,
    req: AdvanceRequest,
    policy: ProgressConfig,
    now: DateTime<Utc>,
) -> Result<AdvanceOutcome> {
    let tx = conn.transaction()?;
    let seq = req.operation_seq;

    let (order, transition) = match work_order::find(&tx, req.order_id)? {
        Some(mut order) => {
            let kind = TransitionKind::classify(order.status, seq);
            if kind.is_out_of_order() {
                if policy.ordering == OrderingPolicy::Strict {
                    return Err(MesError::InvalidTransition {
                        from: order.status.to_string(),
                        to: seq.status().to_string(),
                        reason: format!("{} not allowed under strict ordering", kind.as_str()),
                    });
                }
                tracing::warn!(
                    order_id = %req.order_id,
                    from = %order.status,
                    to = %seq.status(),
                    transition = kind.as_str(),
                    "out-of-order progress step accepted"
                );
            }
            apply_step(&mut order, seq, now);
            (Some(order), Some(kind))
        }
        None => match policy.unknown_order {
            UnknownOrderPolicy::Reject => {
                return Err(MesError::OrderNotFound(req.order_id.to_string()));
            }
            UnknownOrderPolicy::Record => {
                tracing::warn!(
                    order_id = %req.order_id,
                    operation_seq = seq.get(),
                    "progress step recorded for unknown order"
                );
                (None, None)
            }
        },
    };

    let result = WorkResult::instantaneous(req.order_id, seq, req.equipment_id, now);
    work_result::insert(&tx, &result)?;
    if let Some(order) = &order {
        work_order::save_progress(&tx, order)?;
    }
    tx.commit()?;

    tracing::info!(
        order_id = %req.order_id,
        operation_seq = seq.get(),
        status = %seq.status(),
        transition = transition.map(TransitionKind::as_str).unwrap_or("orphan"),
        "progress advanced"
    );

    Ok(AdvanceOutcome {
        result,
        order,
        transition,
    })
}

// ---------------------------------------------------------------------------
// Progress board
// ---------------------------------------------------------------------------

/// Everything the progress page needs: orders plus the step and equipment
/// pick lists.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressBoard {
    pub items: Vec<work_order::OrderView>,
    pub total: usize,
    pub operations: Vec<crate::master::Operation>,
    pub equipments: Vec<crate::master::Equipment>,
}

pub fn board(conn: &Connection) -> Result<ProgressBoard> {
    let items = work_order::list(conn)?;
    Ok(ProgressBoard {
        total: items.len(),
        items,
        operations: crate::master::list_operations(conn)?,
        equipments: crate::master::list_equipment(conn)?,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
