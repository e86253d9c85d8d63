use crate::entities::{DiscountType, coupon_entity};
use crate::models::{SegmentSummary, deserialize_some};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};

/// 更新优惠券时对分层限制的处理：
/// - 字段缺失或为 null: 保持现有限制
/// - 空数组: 清空限制（所有分层可用）
/// - 非空数组: 整体替换
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SegmentIdsUpdate {
    #[default]
    Keep,
    Clear,
    Replace(Vec<i64>),
}

impl From<Option<Vec<i64>>> for SegmentIdsUpdate {
    fn from(value: Option<Vec<i64>>) -> Self {
        match value {
            None => SegmentIdsUpdate::Keep,
            Some(ids) if ids.is_empty() => SegmentIdsUpdate::Clear,
            Some(ids) => SegmentIdsUpdate::Replace(ids),
        }
    }
}

impl<'de> Deserialize<'de> for SegmentIdsUpdate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<Vec<i64>>::deserialize(deserializer).map(SegmentIdsUpdate::from)
    }
}

impl Serialize for SegmentIdsUpdate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            SegmentIdsUpdate::Keep => serializer.serialize_none(),
            SegmentIdsUpdate::Clear => Vec::<i64>::new().serialize(serializer),
            SegmentIdsUpdate::Replace(ids) => ids.serialize(serializer),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CouponResponse {
    pub id: i64,
    pub code: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    pub expires_at: Option<DateTime<Utc>>,
    pub usage_limit: Option<i64>,
    pub usage_limit_per_user: Option<i64>,
    /// 可用分层，空表示不限
    pub segments: Vec<SegmentSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_count: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CouponResponse {
    pub fn new(coupon: coupon_entity::Model, segments: Vec<SegmentSummary>) -> Self {
        Self {
            id: coupon.id,
            code: coupon.code,
            description: coupon.description,
            discount_type: coupon.discount_type,
            discount_value: coupon.discount_value,
            expires_at: coupon.expires_at,
            usage_limit: coupon.usage_limit,
            usage_limit_per_user: coupon.usage_limit_per_user,
            segments,
            usage_count: None,
            created_at: coupon.created_at,
            updated_at: coupon.updated_at,
        }
    }

    pub fn with_usage_count(mut self, usage_count: i64) -> Self {
        self.usage_count = Some(usage_count);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateCouponRequest {
    /// 为空时自动生成
    #[schema(example = "SUMMER10")]
    pub code: Option<String>,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    #[schema(example = 10)]
    pub discount_value: i64,
    pub expires_at: Option<DateTime<Utc>>,
    pub usage_limit: Option<i64>,
    pub usage_limit_per_user: Option<i64>,
    #[serde(default)]
    pub segment_ids: Vec<i64>,
}

/// 部分更新：缺失字段保持不变；可空字段传 null 表示清空
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateCouponRequest {
    pub code: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    pub discount_type: Option<DiscountType>,
    pub discount_value: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<DateTime<Utc>>)]
    pub expires_at: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<i64>)]
    pub usage_limit: Option<Option<i64>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<i64>)]
    pub usage_limit_per_user: Option<Option<i64>>,
    #[serde(default)]
    #[schema(value_type = Option<Vec<i64>>)]
    pub segment_ids: SegmentIdsUpdate,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ValidateCouponRequest {
    #[schema(example = "SUMMER10")]
    pub code: String,
    pub user_id: i64,
    /// 订单小计（美分）
    #[schema(example = 50000)]
    pub subtotal: i64,
    /// 缺省时使用用户当前分层
    pub segment_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CouponValidationResponse {
    pub coupon: CouponResponse,
    /// 优惠金额（美分，百分比折扣不取整）
    pub discount_amount: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AvailableCouponsQuery {
    pub segment_id: Option<i64>,
    pub user_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_ids_three_states() {
        let absent: UpdateCouponRequest = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(absent.segment_ids, SegmentIdsUpdate::Keep);

        let null: UpdateCouponRequest = serde_json::from_str(r#"{"segment_ids": null}"#).unwrap();
        assert_eq!(null.segment_ids, SegmentIdsUpdate::Keep);

        let empty: UpdateCouponRequest = serde_json::from_str(r#"{"segment_ids": []}"#).unwrap();
        assert_eq!(empty.segment_ids, SegmentIdsUpdate::Clear);

        let ids: UpdateCouponRequest =
            serde_json::from_str(r#"{"segment_ids": [4, 5]}"#).unwrap();
        assert_eq!(ids.segment_ids, SegmentIdsUpdate::Replace(vec![4, 5]));
    }

    #[test]
    fn test_nullable_fields_distinguish_absent_and_null() {
        let req: UpdateCouponRequest =
            serde_json::from_str(r#"{"expires_at": null, "usage_limit": 5}"#).unwrap();
        assert_eq!(req.expires_at, Some(None));
        assert_eq!(req.usage_limit, Some(Some(5)));
        assert_eq!(req.usage_limit_per_user, None);
        assert_eq!(req.description, None);
    }

    #[test]
    fn test_discount_type_wire_format() {
        let req: CreateCouponRequest = serde_json::from_str(
            r#"{"discount_type": "fixed_amount", "discount_value": 7500}"#,
        )
        .unwrap();
        assert_eq!(req.discount_type, DiscountType::FixedAmount);
        assert!(req.segment_ids.is_empty());
        assert!(req.code.is_none());
    }
}
