use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// discount_value 为百分比 (0-100)
    #[sea_orm(string_value = "percentage")]
    Percentage,
    /// discount_value 为固定金额（美分）
    #[sea_orm(string_value = "fixed_amount")]
    FixedAmount,
}

/// 优惠券
/// 使用次数不落库，由 orders.coupon_code 统计
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "coupons")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub code: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    pub expires_at: Option<DateTime<Utc>>,
    pub usage_limit: Option<i64>,
    pub usage_limit_per_user: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    /// 过期判断：当前时间严格晚于 expires_at 才算过期
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| now > expires_at)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::coupon_segments::Entity")]
    CouponSegments,
}

impl Related<super::segments::Entity> for Entity {
    fn to() -> RelationDef {
        super::coupon_segments::Relation::Segment.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::coupon_segments::Relation::Coupon.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
