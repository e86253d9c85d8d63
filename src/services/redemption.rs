use crate::entities::order_entity as orders;
use crate::error::AppResult;
use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};

/// 优惠券使用次数统计
///
/// 使用次数没有单独的计数列，而是统计 `orders.coupon_code` 得出。
/// 校验是“先读后判”，并发校验同一张券时可能同时通过，从而超出上限
/// （最多超出 并发数 - 1 次）。以后如需收紧，可以换成带原子自增的计数实现，
/// 调用方不需要改动。
#[async_trait]
pub trait RedemptionCounter: Send + Sync {
    /// `user_id` 为 None 时统计全局使用次数
    async fn count_redemptions(&self, code: &str, user_id: Option<i64>) -> AppResult<i64>;
}

#[derive(Clone)]
pub struct OrderRedemptionCounter {
    pool: DatabaseConnection,
}

impl OrderRedemptionCounter {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RedemptionCounter for OrderRedemptionCounter {
    async fn count_redemptions(&self, code: &str, user_id: Option<i64>) -> AppResult<i64> {
        let mut query = orders::Entity::find().filter(orders::Column::CouponCode.eq(code));
        if let Some(user_id) = user_id {
            query = query.filter(orders::Column::UserId.eq(user_id));
        }
        let count = query.count(&self.pool).await?;
        Ok(count as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::OrderStatus;
    use crate::test_support::*;

    #[tokio::test]
    async fn test_counts_global_and_per_user() {
        let db = setup_db().await;
        let alice = insert_user(&db, "alice@example.com").await;
        let bob = insert_user(&db, "bob@example.com").await;
        insert_order(&db, alice.id, OrderStatus::Paid, 1000, Some("SAVE10")).await;
        insert_order(&db, alice.id, OrderStatus::Cancelled, 1000, Some("SAVE10")).await;
        insert_order(&db, bob.id, OrderStatus::Paid, 1000, Some("SAVE10")).await;
        insert_order(&db, bob.id, OrderStatus::Paid, 1000, Some("OTHER")).await;
        insert_order(&db, bob.id, OrderStatus::Paid, 1000, None).await;

        let counter = OrderRedemptionCounter::new(db.clone());
        assert_eq!(counter.count_redemptions("SAVE10", None).await.unwrap(), 3);
        assert_eq!(
            counter
                .count_redemptions("SAVE10", Some(alice.id))
                .await
                .unwrap(),
            2
        );
        assert_eq!(
            counter.count_redemptions("SAVE10", Some(bob.id)).await.unwrap(),
            1
        );
        assert_eq!(counter.count_redemptions("save10", None).await.unwrap(), 0);
    }
}
