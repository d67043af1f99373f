//! Order aggregate root.
//!
//! An order is created in `New` and reaches exactly one of the terminal
//! states `Finished` or `Cancelled` through the payment saga. Terminal
//! transitions are idempotent at the same state and illegal from the
//! opposite one. Every mutation increments the version counter used by the
//! compare-and-swap repository update.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::description::OrderDescription;
use super::errors::OrderError;
use crate::domain::shared::{Money, OrderId, UserId};

/// Lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Created, payment outcome not yet known.
    New,
    /// Paid successfully. Terminal.
    Finished,
    /// Payment declined. Terminal.
    Cancelled,
}

impl OrderStatus {
    /// Whether this status is terminal.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => write!(f, "New"),
            Self::Finished => write!(f, "Finished"),
            Self::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// Order aggregate root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    user_id: UserId,
    amount: Money,
    description: OrderDescription,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    version: u64,
}

impl Order {
    /// Create a new order in `New` status with version 1.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::InvalidValue`] if `created_at` lies in the
    /// future.
    pub fn create(
        user_id: UserId,
        amount: Money,
        description: OrderDescription,
        created_at: DateTime<Utc>,
    ) -> Result<Self, OrderError> {
        if created_at > Utc::now() {
            return Err(OrderError::InvalidValue {
                field: "created_at",
                message: "creation time cannot be in the future".to_string(),
            });
        }
        Ok(Self {
            id: OrderId::generate(),
            user_id,
            amount,
            description,
            status: OrderStatus::New,
            created_at,
            version: 1,
        })
    }

    /// Reconstitute an order from stored state.
    ///
    /// Factory for repositories; bypasses creation-time validation because
    /// the aggregate is being restored to a known valid state.
    #[must_use]
    pub const fn reconstitute(
        id: OrderId,
        user_id: UserId,
        amount: Money,
        description: OrderDescription,
        status: OrderStatus,
        created_at: DateTime<Utc>,
        version: u64,
    ) -> Self {
        Self {
            id,
            user_id,
            amount,
            description,
            status,
            created_at,
            version,
        }
    }

    /// Get the order id.
    #[must_use]
    pub const fn id(&self) -> OrderId {
        self.id
    }

    /// Get the id of the user who placed the order.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Get the order amount.
    #[must_use]
    pub const fn amount(&self) -> &Money {
        &self.amount
    }

    /// Get the description.
    #[must_use]
    pub const fn description(&self) -> &OrderDescription {
        &self.description
    }

    /// Get the current status.
    #[must_use]
    pub const fn status(&self) -> OrderStatus {
        self.status
    }

    /// Get the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Get the version counter.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Mark the order as paid.
    ///
    /// Idempotent when already `Finished`.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::InvalidTransition`] when the order is
    /// `Cancelled`.
    pub fn mark_finished(&mut self) -> Result<(), OrderError> {
        match self.status {
            OrderStatus::Finished => Ok(()),
            OrderStatus::Cancelled => Err(OrderError::InvalidTransition {
                from: self.status,
                to: OrderStatus::Finished,
            }),
            OrderStatus::New => {
                self.status = OrderStatus::Finished;
                self.version += 1;
                Ok(())
            }
        }
    }

    /// Mark the order as cancelled.
    ///
    /// Idempotent when already `Cancelled`.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::InvalidTransition`] when the order is
    /// `Finished`.
    pub fn mark_cancelled(&mut self) -> Result<(), OrderError> {
        match self.status {
            OrderStatus::Cancelled => Ok(()),
            OrderStatus::Finished => Err(OrderError::InvalidTransition {
                from: self.status,
                to: OrderStatus::Cancelled,
            }),
            OrderStatus::New => {
                self.status = OrderStatus::Cancelled;
                self.version += 1;
                Ok(())
            }
        }
    }
}
