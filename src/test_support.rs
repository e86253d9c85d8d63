//! 测试辅助：内存 sqlite + 真实迁移 + 常用数据构造

use crate::entities::{
    DiscountType, OrderStatus, coupon_entity as coupons, order_entity as orders,
    segment_entity as segments, user_entity as users,
};
use chrono::{DateTime, TimeZone, Utc};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};

/// 测试中统一使用的“当前时间”
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
}

pub async fn setup_db() -> DatabaseConnection {
    // 内存库每个连接各自独立，必须只用一个连接
    let mut options = ConnectOptions::new("sqlite::memory:".to_string());
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options).await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    db
}

pub async fn insert_segment(
    db: &DatabaseConnection,
    slug: &str,
    min_spend: i64,
    max_spend: Option<i64>,
) -> segments::Model {
    insert_segment_with(db, slug, min_spend, max_spend, 0, true).await
}

pub async fn insert_segment_with(
    db: &DatabaseConnection,
    slug: &str,
    min_spend: i64,
    max_spend: Option<i64>,
    priority: i32,
    is_active: bool,
) -> segments::Model {
    segments::ActiveModel {
        name: Set(slug.to_uppercase()),
        slug: Set(slug.to_string()),
        description: Set(None),
        min_spend: Set(min_spend),
        max_spend: Set(max_spend),
        discount_percent: Set(5),
        color: Set(None),
        icon: Set(None),
        priority: Set(priority),
        is_active: Set(is_active),
        created_at: Set(test_now()),
        updated_at: Set(test_now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn insert_user(db: &DatabaseConnection, email: &str) -> users::Model {
    users::ActiveModel {
        email: Set(email.to_string()),
        name: Set(email.split('@').next().unwrap_or(email).to_string()),
        lifetime_spent: Set(0),
        segment_id: Set(None),
        created_at: Set(test_now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn insert_user_in_segment(
    db: &DatabaseConnection,
    email: &str,
    segment_id: Option<i64>,
    lifetime_spent: i64,
) -> users::Model {
    users::ActiveModel {
        email: Set(email.to_string()),
        name: Set(email.to_string()),
        lifetime_spent: Set(lifetime_spent),
        segment_id: Set(segment_id),
        created_at: Set(test_now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn insert_order(
    db: &DatabaseConnection,
    user_id: i64,
    status: OrderStatus,
    total_cents: i64,
    coupon_code: Option<&str>,
) -> orders::Model {
    insert_order_at(db, user_id, status, total_cents, coupon_code, test_now()).await
}

pub async fn insert_order_at(
    db: &DatabaseConnection,
    user_id: i64,
    status: OrderStatus,
    total_cents: i64,
    coupon_code: Option<&str>,
    created_at: DateTime<Utc>,
) -> orders::Model {
    orders::ActiveModel {
        user_id: Set(user_id),
        status: Set(status),
        subtotal_cents: Set(total_cents),
        discount_cents: Set(0),
        total_cents: Set(total_cents),
        coupon_code: Set(coupon_code.map(str::to_string)),
        created_at: Set(created_at),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn insert_coupon(
    db: &DatabaseConnection,
    code: &str,
    discount_type: DiscountType,
    discount_value: i64,
    expires_at: Option<DateTime<Utc>>,
) -> coupons::Model {
    coupons::ActiveModel {
        code: Set(code.to_string()),
        description: Set(None),
        discount_type: Set(discount_type),
        discount_value: Set(discount_value),
        expires_at: Set(expires_at),
        usage_limit: Set(None),
        usage_limit_per_user: Set(None),
        created_at: Set(test_now()),
        updated_at: Set(test_now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}
