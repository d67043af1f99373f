//! Get Order use case.

use std::sync::Arc;

use crate::application::dto::OrderDto;
use crate::application::ports::OrderQueries;
use crate::domain::shared::OrderId;
use crate::error::OrderServiceError;

/// Fetches one order for status display.
pub struct GetOrderUseCase<Q: OrderQueries> {
    queries: Arc<Q>,
}

impl<Q: OrderQueries> GetOrderUseCase<Q> {
    /// Create the use case.
    pub fn new(queries: Arc<Q>) -> Self {
        Self { queries }
    }

    /// Execute the use case.
    ///
    /// # Errors
    ///
    /// Returns [`OrderServiceError::NotFound`] for an unknown id.
    pub async fn execute(&self, id: OrderId) -> Result<OrderDto, OrderServiceError> {
        let order = self
            .queries
            .get_order(id)
            .await?
            .ok_or(OrderServiceError::NotFound(id))?;
        Ok(OrderDto::from_order(&order))
    }
}
