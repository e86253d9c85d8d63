use crate::entities::user_entity;
use crate::models::OrderResponse;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 分层客户列表中的客户（附最近订单）
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CustomerResponse {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub lifetime_spent: i64,
    pub segment_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub recent_orders: Vec<OrderResponse>,
}

impl CustomerResponse {
    pub fn new(user: user_entity::Model, recent_orders: Vec<OrderResponse>) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            lifetime_spent: user.lifetime_spent,
            segment_id: user.segment_id,
            created_at: user.created_at,
            recent_orders,
        }
    }
}
