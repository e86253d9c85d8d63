use crate::entities::segment_entity;
use crate::models::{CouponResponse, deserialize_some};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// 嵌入在优惠券响应中的分层摘要
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct SegmentSummary {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub color: Option<String>,
    pub icon: Option<String>,
}

impl From<segment_entity::Model> for SegmentSummary {
    fn from(m: segment_entity::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            slug: m.slug,
            color: m.color,
            icon: m.icon,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SegmentResponse {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub min_spend: i64,
    pub max_spend: Option<i64>,
    pub discount_percent: i32,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub priority: i32,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_count: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SegmentResponse {
    pub fn with_user_count(m: segment_entity::Model, user_count: i64) -> Self {
        let mut resp = Self::from(m);
        resp.user_count = Some(user_count);
        resp
    }
}

impl From<segment_entity::Model> for SegmentResponse {
    fn from(m: segment_entity::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            slug: m.slug,
            description: m.description,
            min_spend: m.min_spend,
            max_spend: m.max_spend,
            discount_percent: m.discount_percent,
            color: m.color,
            icon: m.icon,
            priority: m.priority,
            is_active: m.is_active,
            user_count: None,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SegmentDetailResponse {
    pub segment: SegmentResponse,
    /// 仅限本分层使用的优惠券
    pub coupons: Vec<CouponResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateSegmentRequest {
    #[schema(example = "Gold")]
    pub name: String,
    #[schema(example = "gold")]
    pub slug: String,
    pub description: Option<String>,
    #[schema(example = 100000)]
    pub min_spend: i64,
    pub max_spend: Option<i64>,
    #[serde(default)]
    pub discount_percent: i32,
    pub color: Option<String>,
    pub icon: Option<String>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// 部分更新：缺失字段保持不变；可空字段传 null 表示清空
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateSegmentRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    pub min_spend: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<i64>)]
    pub max_spend: Option<Option<i64>>,
    pub discount_percent: Option<i32>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<String>)]
    pub color: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<String>)]
    pub icon: Option<Option<String>>,
    pub priority: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SegmentListQuery {
    /// 是否包含已停用的分层
    pub include_inactive: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SegmentAssignmentResponse {
    pub spending: i64,
    pub segment: Option<SegmentResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BulkRecalculationResponse {
    pub updated: u64,
    /// 重算失败的用户 id
    pub failed: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct SegmentStatistics {
    pub segment_id: i64,
    pub name: String,
    pub slug: String,
    pub customer_count: i64,
    pub total_spent: i64,
    pub discount_percent: i32,
}
