use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 客户分层
/// - min_spend / max_spend: 累计消费区间（美分，闭区间），max_spend 为 NULL 表示无上限
/// - priority: 区间重叠或 min_spend 相同时，优先级高者胜出
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "segments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    #[sea_orm(unique)]
    pub slug: String,
    pub description: Option<String>,
    pub min_spend: i64,
    pub max_spend: Option<i64>,
    pub discount_percent: i32,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub priority: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    /// 消费金额是否落在本分层区间内（两端都包含）
    pub fn contains(&self, spending: i64) -> bool {
        spending >= self.min_spend && self.max_spend.is_none_or(|max| spending <= max)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::users::Entity")]
    Users,
    #[sea_orm(has_many = "super::coupon_segments::Entity")]
    CouponSegments,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::coupons::Entity> for Entity {
    fn to() -> RelationDef {
        super::coupon_segments::Relation::Coupon.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::coupon_segments::Relation::Segment.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
