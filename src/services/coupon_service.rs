use crate::entities::{DiscountType, coupon_entity as coupons};
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::services::OrderService;
use crate::services::redemption::{OrderRedemptionCounter, RedemptionCounter};
use crate::services::restrictions;
use crate::utils::{
    Clock, SystemClock, calculate_discount, generate_coupon_code, normalize_coupon_code,
};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use std::sync::Arc;

/// 自动生成优惠码时的最大重试次数
const CODE_GENERATION_ATTEMPTS: usize = 10;

/// 校验通过的优惠券及本次优惠金额
#[derive(Debug, Clone)]
pub struct CouponValidation {
    pub coupon: coupons::Model,
    pub segments: Vec<SegmentSummary>,
    pub discount_amount: f64,
}

impl From<CouponValidation> for CouponValidationResponse {
    fn from(v: CouponValidation) -> Self {
        Self {
            coupon: CouponResponse::new(v.coupon, v.segments),
            discount_amount: v.discount_amount,
        }
    }
}

#[derive(Clone)]
pub struct CouponService {
    pool: DatabaseConnection,
    clock: Arc<dyn Clock>,
    redemptions: Arc<dyn RedemptionCounter>,
    order_service: OrderService,
    usage_history_limit: u64,
}

impl CouponService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self {
            clock: Arc::new(SystemClock),
            redemptions: Arc::new(OrderRedemptionCounter::new(pool.clone())),
            order_service: OrderService::new(pool.clone()),
            usage_history_limit: 100,
            pool,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_redemption_counter(mut self, redemptions: Arc<dyn RedemptionCounter>) -> Self {
        self.redemptions = redemptions;
        self
    }

    pub fn with_usage_history_limit(mut self, limit: u64) -> Self {
        self.usage_history_limit = limit;
        self
    }

    /// 校验优惠券并计算优惠金额
    ///
    /// 按顺序检查：是否存在、是否过期、全局次数、个人次数、分层限制，
    /// 第一个不满足的条件直接返回错误。
    pub async fn validate_coupon(
        &self,
        code: &str,
        user_id: i64,
        subtotal: i64,
        user_segment_id: Option<i64>,
    ) -> AppResult<CouponValidation> {
        let coupon = coupons::Entity::find()
            .filter(coupons::Column::Code.eq(code))
            .one(&self.pool)
            .await?
            .ok_or_else(|| {
                log::debug!("Coupon rejected, code not found: {code}");
                AppError::NotFound("Coupon not found".to_string())
            })?;

        if coupon.is_expired_at(self.clock.now()) {
            return Err(reject(&coupon, "Coupon has expired"));
        }

        if let Some(limit) = coupon.usage_limit {
            let used = self.redemptions.count_redemptions(&coupon.code, None).await?;
            if used >= limit {
                return Err(reject(&coupon, "Coupon usage limit has been reached"));
            }
        }

        if let Some(limit) = coupon.usage_limit_per_user {
            let used = self
                .redemptions
                .count_redemptions(&coupon.code, Some(user_id))
                .await?;
            if used >= limit {
                return Err(reject(
                    &coupon,
                    "You have reached the usage limit for this coupon",
                ));
            }
        }

        let segments = restrictions::load_coupon_segments(&self.pool, &[coupon.id])
            .await?
            .remove(&coupon.id)
            .unwrap_or_default();
        if !segment_allowed(&segments, user_segment_id) {
            return Err(reject(&coupon, "Coupon is not valid for your segment"));
        }

        let discount_amount = calculate_discount(coupon.discount_type, coupon.discount_value, subtotal);
        Ok(CouponValidation {
            coupon,
            segments,
            discount_amount,
        })
    }

    /// 当前对用户可用的优惠券，即将过期的在前，永久有效的在最后
    pub async fn get_available_coupons(
        &self,
        user_segment_id: Option<i64>,
        user_id: Option<i64>,
    ) -> AppResult<Vec<CouponResponse>> {
        let now = self.clock.now();
        let candidates = coupons::Entity::find()
            .filter(
                coupons::Column::ExpiresAt
                    .is_null()
                    .or(coupons::Column::ExpiresAt.gt(now)),
            )
            .order_by_asc(Expr::col(coupons::Column::ExpiresAt).is_null())
            .order_by_asc(coupons::Column::ExpiresAt)
            .order_by_asc(coupons::Column::Id)
            .all(&self.pool)
            .await?;

        let ids: Vec<i64> = candidates.iter().map(|c| c.id).collect();
        let mut segment_map = restrictions::load_coupon_segments(&self.pool, &ids).await?;

        let mut available = Vec::new();
        for coupon in candidates {
            let segments = segment_map.remove(&coupon.id).unwrap_or_default();
            if !segment_allowed(&segments, user_segment_id) {
                continue;
            }
            if let Some(limit) = coupon.usage_limit
                && self.redemptions.count_redemptions(&coupon.code, None).await? >= limit
            {
                continue;
            }
            if let (Some(limit), Some(user_id)) = (coupon.usage_limit_per_user, user_id)
                && self
                    .redemptions
                    .count_redemptions(&coupon.code, Some(user_id))
                    .await?
                    >= limit
            {
                continue;
            }
            available.push(CouponResponse::new(coupon, segments));
        }

        Ok(available)
    }

    pub async fn list_coupons(&self) -> AppResult<Vec<CouponResponse>> {
        let models = coupons::Entity::find()
            .order_by_desc(coupons::Column::CreatedAt)
            .order_by_desc(coupons::Column::Id)
            .all(&self.pool)
            .await?;

        let ids: Vec<i64> = models.iter().map(|c| c.id).collect();
        let mut segment_map = restrictions::load_coupon_segments(&self.pool, &ids).await?;

        let mut list = Vec::with_capacity(models.len());
        for coupon in models {
            let usage_count = self.redemptions.count_redemptions(&coupon.code, None).await?;
            let segments = segment_map.remove(&coupon.id).unwrap_or_default();
            list.push(CouponResponse::new(coupon, segments).with_usage_count(usage_count));
        }
        Ok(list)
    }

    pub async fn get_coupon(&self, id: i64) -> AppResult<CouponResponse> {
        let coupon = self.find_coupon(id).await?;
        let usage_count = self.redemptions.count_redemptions(&coupon.code, None).await?;
        let segments = restrictions::load_coupon_segments(&self.pool, &[id])
            .await?
            .remove(&id)
            .unwrap_or_default();
        Ok(CouponResponse::new(coupon, segments).with_usage_count(usage_count))
    }

    pub async fn create_coupon(&self, req: CreateCouponRequest) -> AppResult<CouponResponse> {
        validate_coupon_fields(
            req.discount_type,
            req.discount_value,
            req.usage_limit,
            req.usage_limit_per_user,
        )?;

        let txn = self.pool.begin().await?;

        let code = match req.code.as_deref().map(normalize_coupon_code) {
            Some(code) if !code.is_empty() => {
                if code_exists(&txn, &code, None).await? {
                    return Err(AppError::ValidationError(
                        "Coupon code already exists".to_string(),
                    ));
                }
                code
            }
            _ => generate_unique_code(&txn).await?,
        };
        let segment_ids = restrictions::ensure_segments_exist(&txn, &req.segment_ids).await?;

        let now = Utc::now();
        let coupon = coupons::ActiveModel {
            code: Set(code),
            description: Set(req.description),
            discount_type: Set(req.discount_type),
            discount_value: Set(req.discount_value),
            expires_at: Set(req.expires_at),
            usage_limit: Set(req.usage_limit),
            usage_limit_per_user: Set(req.usage_limit_per_user),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        restrictions::insert_coupon_segments(&txn, coupon.id, &segment_ids).await?;
        let segments = restrictions::load_coupon_segments(&txn, &[coupon.id])
            .await?
            .remove(&coupon.id)
            .unwrap_or_default();

        txn.commit().await?;

        log::info!(
            "Coupon created: {} ({}), segments: {:?}",
            coupon.code,
            coupon.id,
            segment_ids
        );
        Ok(CouponResponse::new(coupon, segments).with_usage_count(0))
    }

    pub async fn update_coupon(&self, id: i64, req: UpdateCouponRequest) -> AppResult<CouponResponse> {
        let txn = self.pool.begin().await?;

        let current = coupons::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Coupon not found".to_string()))?;

        let discount_type = req.discount_type.unwrap_or(current.discount_type);
        let discount_value = req.discount_value.unwrap_or(current.discount_value);
        let usage_limit = req.usage_limit.unwrap_or(current.usage_limit);
        let usage_limit_per_user = req
            .usage_limit_per_user
            .unwrap_or(current.usage_limit_per_user);
        validate_coupon_fields(discount_type, discount_value, usage_limit, usage_limit_per_user)?;

        let code = match req.code.as_deref().map(normalize_coupon_code) {
            Some(code) if code.is_empty() => {
                return Err(AppError::ValidationError(
                    "Coupon code must not be empty".to_string(),
                ));
            }
            Some(code) if code != current.code => {
                if code_exists(&txn, &code, Some(id)).await? {
                    return Err(AppError::ValidationError(
                        "Coupon code already exists".to_string(),
                    ));
                }
                code
            }
            _ => current.code.clone(),
        };

        let mut am = current.into_active_model();
        am.code = Set(code);
        am.discount_type = Set(discount_type);
        am.discount_value = Set(discount_value);
        am.usage_limit = Set(usage_limit);
        am.usage_limit_per_user = Set(usage_limit_per_user);
        if let Some(description) = req.description {
            am.description = Set(description);
        }
        if let Some(expires_at) = req.expires_at {
            am.expires_at = Set(expires_at);
        }
        am.updated_at = Set(Utc::now());
        let updated = am.update(&txn).await?;

        match &req.segment_ids {
            SegmentIdsUpdate::Keep => {}
            SegmentIdsUpdate::Clear => {
                restrictions::clear_coupon_segments(&txn, id).await?;
            }
            SegmentIdsUpdate::Replace(ids) => {
                let ids = restrictions::ensure_segments_exist(&txn, ids).await?;
                restrictions::replace_coupon_segments(&txn, id, &ids).await?;
            }
        }
        let segments = restrictions::load_coupon_segments(&txn, &[id])
            .await?
            .remove(&id)
            .unwrap_or_default();

        txn.commit().await?;

        log::info!("Coupon updated: {} ({})", updated.code, updated.id);
        let usage_count = self.redemptions.count_redemptions(&updated.code, None).await?;
        Ok(CouponResponse::new(updated, segments).with_usage_count(usage_count))
    }

    pub async fn delete_coupon(&self, id: i64) -> AppResult<()> {
        let txn = self.pool.begin().await?;

        let coupon = coupons::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Coupon not found".to_string()))?;
        restrictions::clear_coupon_segments(&txn, id).await?;
        coupons::Entity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;

        log::info!("Coupon deleted: {} ({})", coupon.code, coupon.id);
        Ok(())
    }

    /// 使用了该优惠券的订单，最新的在前
    pub async fn coupon_usage_history(&self, id: i64) -> AppResult<Vec<OrderResponse>> {
        let coupon = self.find_coupon(id).await?;
        self.order_service
            .list_by_coupon_code(&coupon.code, self.usage_history_limit)
            .await
    }

    async fn find_coupon(&self, id: i64) -> AppResult<coupons::Model> {
        coupons::Entity::find_by_id(id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Coupon not found".to_string()))
    }
}

fn reject(coupon: &coupons::Model, reason: &str) -> AppError {
    log::debug!("Coupon rejected: {} ({}), reason: {reason}", coupon.code, coupon.id);
    AppError::ValidationError(reason.to_string())
}

/// 没有分层限制时所有人可用；有限制时调用方必须属于其中之一
fn segment_allowed(segments: &[SegmentSummary], user_segment_id: Option<i64>) -> bool {
    if segments.is_empty() {
        return true;
    }
    user_segment_id.is_some_and(|id| segments.iter().any(|s| s.id == id))
}

fn validate_coupon_fields(
    discount_type: DiscountType,
    discount_value: i64,
    usage_limit: Option<i64>,
    usage_limit_per_user: Option<i64>,
) -> AppResult<()> {
    if discount_value < 0 {
        return Err(AppError::ValidationError(
            "discount_value must not be negative".to_string(),
        ));
    }
    if discount_type == DiscountType::Percentage && discount_value > 100 {
        return Err(AppError::ValidationError(
            "Percentage discount must not exceed 100".to_string(),
        ));
    }
    if usage_limit.is_some_and(|n| n < 1) {
        return Err(AppError::ValidationError(
            "usage_limit must be at least 1".to_string(),
        ));
    }
    if usage_limit_per_user.is_some_and(|n| n < 1) {
        return Err(AppError::ValidationError(
            "usage_limit_per_user must be at least 1".to_string(),
        ));
    }
    Ok(())
}

async fn code_exists<C: ConnectionTrait>(
    conn: &C,
    code: &str,
    exclude_id: Option<i64>,
) -> AppResult<bool> {
    let mut query = coupons::Entity::find().filter(coupons::Column::Code.eq(code));
    if let Some(id) = exclude_id {
        query = query.filter(coupons::Column::Id.ne(id));
    }
    Ok(query.count(conn).await? > 0)
}

async fn generate_unique_code<C: ConnectionTrait>(conn: &C) -> AppResult<String> {
    for _ in 0..CODE_GENERATION_ATTEMPTS {
        let code = generate_coupon_code();
        if !code_exists(conn, &code, None).await? {
            return Ok(code);
        }
    }
    Err(AppError::InternalError(
        "Failed to generate a unique coupon code".to_string(),
    ))
}
