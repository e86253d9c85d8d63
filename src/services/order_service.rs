use crate::entities::{OrderStatus, order_entity as orders};
use crate::error::AppResult;
use crate::models::OrderResponse;
use sea_orm::sea_query::{Alias, Expr, Func, SimpleExpr};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult, QueryFilter, QueryOrder,
    QuerySelect,
};
use std::collections::HashMap;

/// 订单只读查询（订单由结账流程写入）
#[derive(Clone)]
pub struct OrderService {
    pool: DatabaseConnection,
}

impl OrderService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// 用户已确认收入的订单总额（paid/processing/shipped/delivered）
    pub async fn revenue_total(&self, user_id: i64) -> AppResult<i64> {
        #[derive(Debug, FromQueryResult)]
        struct SumRow {
            total: Option<i64>,
        }

        // postgres 下 SUM(bigint) 返回 numeric，统一转回 BIGINT
        let total_expr: SimpleExpr = Func::cast_as(
            Expr::col(orders::Column::TotalCents).sum(),
            Alias::new("BIGINT"),
        )
        .into();

        let row = orders::Entity::find()
            .filter(orders::Column::UserId.eq(user_id))
            .filter(orders::Column::Status.is_in(OrderStatus::REVENUE))
            .select_only()
            .column_as(total_expr, "total")
            .into_model::<SumRow>()
            .one(&self.pool)
            .await?;

        Ok(row.and_then(|r| r.total).unwrap_or(0))
    }

    /// 使用了某个优惠码的订单，最新的在前
    pub async fn list_by_coupon_code(&self, code: &str, limit: u64) -> AppResult<Vec<OrderResponse>> {
        let models = orders::Entity::find()
            .filter(orders::Column::CouponCode.eq(code))
            .order_by_desc(orders::Column::CreatedAt)
            .order_by_desc(orders::Column::Id)
            .limit(limit)
            .all(&self.pool)
            .await?;
        Ok(models.into_iter().map(OrderResponse::from).collect())
    }

    /// 每个用户最近的 `per_user` 笔订单
    pub async fn recent_orders_for_users(
        &self,
        user_ids: &[i64],
        per_user: usize,
    ) -> AppResult<HashMap<i64, Vec<OrderResponse>>> {
        let mut grouped: HashMap<i64, Vec<OrderResponse>> = HashMap::new();
        if user_ids.is_empty() || per_user == 0 {
            return Ok(grouped);
        }

        // 逐个用户查询，每人最多 per_user 条
        for &user_id in user_ids {
            let models = orders::Entity::find()
                .filter(orders::Column::UserId.eq(user_id))
                .order_by_desc(orders::Column::CreatedAt)
                .order_by_desc(orders::Column::Id)
                .limit(per_user as u64)
                .all(&self.pool)
                .await?;
            if !models.is_empty() {
                grouped.insert(user_id, models.into_iter().map(OrderResponse::from).collect());
            }
        }
        Ok(grouped)
    }
}
