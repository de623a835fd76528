//! Order endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use domain::models::{
    CreateOrderRequest, ListOrdersQuery, Order, OrderWithItems, UpdateOrderStatusRequest,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::services::StatusChange;

#[derive(Debug, Deserialize)]
pub struct MessageReferenceRequest {
    pub message_id: i64,
}

/// POST /api/v1/orders
pub async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderWithItems>), ApiError> {
    let created = state.orders.create_order(request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/v1/orders
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(state.orders.list(&query).await?))
}

/// GET /api/v1/orders/:order_id
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderWithItems>, ApiError> {
    Ok(Json(state.orders.get(order_id).await?))
}

/// PATCH /api/v1/orders/:order_id/status
///
/// Confirming an order dispatches it to the POS; the dispatch result is part
/// of the response and never turns the request into an error.
pub async fn update_status(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(request): Json<UpdateOrderStatusRequest>,
) -> Result<Json<StatusChange>, ApiError> {
    Ok(Json(state.orders.transition(order_id, request.status).await?))
}

/// PUT /api/v1/orders/:order_id/message
pub async fn set_message_reference(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(request): Json<MessageReferenceRequest>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(
        state
            .orders
            .set_message_reference(order_id, request.message_id)
            .await?,
    ))
}
