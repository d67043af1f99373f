//! List Orders use case.

use std::sync::Arc;

use crate::application::dto::OrderDto;
use crate::application::ports::OrderQueries;
use crate::domain::shared::UserId;
use crate::error::OrderServiceError;

/// Lists orders, optionally for a single user.
pub struct ListOrdersUseCase<Q: OrderQueries> {
    queries: Arc<Q>,
}

impl<Q: OrderQueries> ListOrdersUseCase<Q> {
    /// Create the use case.
    pub fn new(queries: Arc<Q>) -> Self {
        Self { queries }
    }

    /// Execute the use case.
    ///
    /// # Errors
    ///
    /// Returns a storage error on backend failure.
    pub async fn execute(&self, user_id: Option<UserId>) -> Result<Vec<OrderDto>, OrderServiceError> {
        let orders = self.queries.list_orders(user_id).await?;
        Ok(orders.iter().map(OrderDto::from_order).collect())
    }
}
