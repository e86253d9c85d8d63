use crate::entities::{segment_entity as segments, user_entity as users};
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::services::OrderService;
use crate::services::restrictions;
use chrono::Utc;
use sea_orm::sea_query::{Alias, Expr, Func, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    FromQueryResult, IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};
use std::collections::HashMap;

/// 客户分层列表中每位客户附带的最近订单数
const RECENT_ORDERS_PER_CUSTOMER: usize = 5;

/// 单个用户的分层计算结果
#[derive(Debug, Clone)]
pub struct SegmentAssignment {
    pub spending: i64,
    pub segment: Option<segments::Model>,
}

/// 全量重算结果；每个用户相互独立，失败的用户记录下来继续处理后面的
#[derive(Debug, Clone, Default)]
pub struct BulkRecalculation {
    pub updated: u64,
    pub failed: Vec<i64>,
}

/// 按扫描顺序排序：min_spend 降序；相同时 priority 高者在前，再按 id 升序
pub fn sort_for_resolution(segments: &mut [segments::Model]) {
    segments.sort_by(|a, b| {
        b.min_spend
            .cmp(&a.min_spend)
            .then(b.priority.cmp(&a.priority))
            .then(a.id.cmp(&b.id))
    });
}

/// 在已排序的分层中查找消费金额对应的分层。
///
/// 返回第一个区间命中的分层；都不命中时退回到排序后的最后一个
/// （即 min_spend 最低的入门分层）；列表为空时返回 None。
pub fn resolve_segment(ordered: &[segments::Model], spending: i64) -> Option<&segments::Model> {
    ordered
        .iter()
        .find(|s| s.contains(spending))
        .or_else(|| ordered.last())
}

#[derive(Clone)]
pub struct SegmentService {
    pool: DatabaseConnection,
    order_service: OrderService,
}

impl SegmentService {
    pub fn new(pool: DatabaseConnection) -> Self {
        let order_service = OrderService::new(pool.clone());
        Self {
            pool,
            order_service,
        }
    }

    /// 计算用户累计有效消费；用户不存在或没有有效订单时为 0
    pub async fn calculate_user_spending(&self, user_id: i64) -> AppResult<i64> {
        self.order_service.revenue_total(user_id).await
    }

    /// 根据消费金额查找分层（只考虑启用的分层）
    pub async fn find_segment_by_spending(
        &self,
        spending: i64,
    ) -> AppResult<Option<segments::Model>> {
        let mut active = segments::Entity::find()
            .filter(segments::Column::IsActive.eq(true))
            .order_by_desc(segments::Column::MinSpend)
            .all(&self.pool)
            .await?;
        sort_for_resolution(&mut active);

        Ok(resolve_segment(&active, spending).cloned())
    }

    /// 重新计算并保存用户的累计消费和分层
    pub async fn assign_segment_to_user(&self, user_id: i64) -> AppResult<SegmentAssignment> {
        let user = users::Entity::find_by_id(user_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let spending = self.calculate_user_spending(user_id).await?;
        let segment = self.find_segment_by_spending(spending).await?;

        let mut am = user.into_active_model();
        am.segment_id = Set(segment.as_ref().map(|s| s.id));
        am.lifetime_spent = Set(spending);
        am.update(&self.pool).await?;

        log::debug!(
            "Assigned segment {:?} to user {user_id} (spending: {spending})",
            segment.as_ref().map(|s| s.slug.as_str())
        );

        Ok(SegmentAssignment { spending, segment })
    }

    /// 顺序重算所有用户的分层
    pub async fn bulk_recalculate_segments(&self) -> AppResult<BulkRecalculation> {
        let user_ids: Vec<i64> = users::Entity::find()
            .select_only()
            .column(users::Column::Id)
            .order_by_asc(users::Column::Id)
            .into_tuple()
            .all(&self.pool)
            .await?;

        let mut result = BulkRecalculation::default();
        for user_id in user_ids {
            match self.assign_segment_to_user(user_id).await {
                Ok(_) => result.updated += 1,
                Err(e) => {
                    log::error!("Failed to recalculate segment for user {user_id}: {e:?}");
                    result.failed.push(user_id);
                }
            }
        }

        log::info!(
            "Segment recalculation complete, updated: {}, failed: {}",
            result.updated,
            result.failed.len()
        );
        Ok(result)
    }

    /// 用户当前保存的分层 id
    pub async fn current_segment_id(&self, user_id: i64) -> AppResult<Option<i64>> {
        let user = users::Entity::find_by_id(user_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        Ok(user.segment_id)
    }

    pub async fn list_segments(&self, include_inactive: bool) -> AppResult<Vec<SegmentResponse>> {
        let mut query = segments::Entity::find();
        if !include_inactive {
            query = query.filter(segments::Column::IsActive.eq(true));
        }
        let models = query
            .order_by_desc(segments::Column::Priority)
            .order_by_asc(segments::Column::MinSpend)
            .order_by_asc(segments::Column::Id)
            .all(&self.pool)
            .await?;

        let counts = self.user_counts_by_segment().await?;
        Ok(models
            .into_iter()
            .map(|m| {
                let count = counts.get(&m.id).copied().unwrap_or(0);
                SegmentResponse::with_user_count(m, count)
            })
            .collect())
    }

    pub async fn get_segment(&self, id: i64) -> AppResult<SegmentDetailResponse> {
        let segment = self.find_segment(id).await?;

        let user_count = users::Entity::find()
            .filter(users::Column::SegmentId.eq(id))
            .count(&self.pool)
            .await? as i64;

        let coupon_models = restrictions::coupons_for_segment(&self.pool, &segment).await?;
        let coupon_ids: Vec<i64> = coupon_models.iter().map(|c| c.id).collect();
        let mut segment_map = restrictions::load_coupon_segments(&self.pool, &coupon_ids).await?;
        let coupons = coupon_models
            .into_iter()
            .map(|c| {
                let segs = segment_map.remove(&c.id).unwrap_or_default();
                CouponResponse::new(c, segs)
            })
            .collect();

        Ok(SegmentDetailResponse {
            segment: SegmentResponse::with_user_count(segment, user_count),
            coupons,
        })
    }

    pub async fn create_segment(&self, req: CreateSegmentRequest) -> AppResult<SegmentResponse> {
        let name = req.name.trim().to_string();
        let slug = req.slug.trim().to_string();
        validate_segment_fields(
            &name,
            &slug,
            req.min_spend,
            req.max_spend,
            req.discount_percent,
        )?;
        self.ensure_slug_available(&slug, None).await?;

        let now = Utc::now();
        let model = segments::ActiveModel {
            name: Set(name),
            slug: Set(slug),
            description: Set(req.description),
            min_spend: Set(req.min_spend),
            max_spend: Set(req.max_spend),
            discount_percent: Set(req.discount_percent),
            color: Set(req.color),
            icon: Set(req.icon),
            priority: Set(req.priority),
            is_active: Set(req.is_active),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;

        log::info!("Segment created: {} ({})", model.slug, model.id);
        Ok(SegmentResponse::with_user_count(model, 0))
    }

    pub async fn update_segment(
        &self,
        id: i64,
        req: UpdateSegmentRequest,
    ) -> AppResult<SegmentResponse> {
        let current = self.find_segment(id).await?;

        let name = req
            .name
            .map(|n| n.trim().to_string())
            .unwrap_or_else(|| current.name.clone());
        let slug = req
            .slug
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|| current.slug.clone());
        let min_spend = req.min_spend.unwrap_or(current.min_spend);
        let max_spend = req.max_spend.unwrap_or(current.max_spend);
        let discount_percent = req.discount_percent.unwrap_or(current.discount_percent);

        validate_segment_fields(&name, &slug, min_spend, max_spend, discount_percent)?;
        if slug != current.slug {
            self.ensure_slug_available(&slug, Some(id)).await?;
        }

        let mut am = current.into_active_model();
        am.name = Set(name);
        am.slug = Set(slug);
        am.min_spend = Set(min_spend);
        am.max_spend = Set(max_spend);
        am.discount_percent = Set(discount_percent);
        if let Some(description) = req.description {
            am.description = Set(description);
        }
        if let Some(color) = req.color {
            am.color = Set(color);
        }
        if let Some(icon) = req.icon {
            am.icon = Set(icon);
        }
        if let Some(priority) = req.priority {
            am.priority = Set(priority);
        }
        if let Some(is_active) = req.is_active {
            am.is_active = Set(is_active);
        }
        am.updated_at = Set(Utc::now());
        let updated = am.update(&self.pool).await?;

        let user_count = users::Entity::find()
            .filter(users::Column::SegmentId.eq(id))
            .count(&self.pool)
            .await? as i64;

        log::info!("Segment updated: {} ({})", updated.slug, updated.id);
        Ok(SegmentResponse::with_user_count(updated, user_count))
    }

    /// 删除分层：成员的 segment_id 置空，优惠券的该分层限制一并删除
    pub async fn delete_segment(&self, id: i64) -> AppResult<()> {
        let txn = self.pool.begin().await?;

        let segment = segments::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Segment not found".to_string()))?;

        let released = users::Entity::update_many()
            .col_expr(users::Column::SegmentId, Expr::value(Option::<i64>::None))
            .filter(users::Column::SegmentId.eq(id))
            .exec(&txn)
            .await?
            .rows_affected;
        restrictions::clear_segment_restrictions(&txn, id).await?;
        segments::Entity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;

        log::info!(
            "Segment deleted: {} ({}), released users: {released}",
            segment.slug,
            segment.id
        );
        Ok(())
    }

    pub async fn segment_statistics(&self) -> AppResult<Vec<SegmentStatistics>> {
        #[derive(Debug, FromQueryResult)]
        struct StatsRow {
            segment_id: Option<i64>,
            customer_count: i64,
            total_spent: Option<i64>,
        }

        let total_expr: SimpleExpr = Func::cast_as(
            Expr::col(users::Column::LifetimeSpent).sum(),
            Alias::new("BIGINT"),
        )
        .into();

        let rows = users::Entity::find()
            .filter(users::Column::SegmentId.is_not_null())
            .select_only()
            .column(users::Column::SegmentId)
            .column_as(Expr::col(users::Column::Id).count(), "customer_count")
            .column_as(total_expr, "total_spent")
            .group_by(users::Column::SegmentId)
            .into_model::<StatsRow>()
            .all(&self.pool)
            .await?;
        let by_segment: HashMap<i64, StatsRow> = rows
            .into_iter()
            .filter_map(|r| r.segment_id.map(|id| (id, r)))
            .collect();

        let models = segments::Entity::find()
            .order_by_asc(segments::Column::MinSpend)
            .order_by_asc(segments::Column::Id)
            .all(&self.pool)
            .await?;

        Ok(models
            .into_iter()
            .map(|m| {
                let row = by_segment.get(&m.id);
                SegmentStatistics {
                    segment_id: m.id,
                    name: m.name,
                    slug: m.slug,
                    customer_count: row.map(|r| r.customer_count).unwrap_or(0),
                    total_spent: row.and_then(|r| r.total_spent).unwrap_or(0),
                    discount_percent: m.discount_percent,
                }
            })
            .collect())
    }

    pub async fn customers_by_segment_slug(
        &self,
        slug: &str,
        params: &PaginationParams,
    ) -> AppResult<PaginatedResponse<CustomerResponse>> {
        let segment = segments::Entity::find()
            .filter(segments::Column::Slug.eq(slug))
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Segment not found".to_string()))?;

        let base_query = users::Entity::find().filter(users::Column::SegmentId.eq(segment.id));
        let total = base_query.clone().count(&self.pool).await?;

        let user_models = base_query
            .order_by_desc(users::Column::LifetimeSpent)
            .order_by_asc(users::Column::Id)
            .limit(params.get_limit())
            .offset(params.get_offset())
            .all(&self.pool)
            .await?;

        let user_ids: Vec<i64> = user_models.iter().map(|u| u.id).collect();
        let mut recent = self
            .order_service
            .recent_orders_for_users(&user_ids, RECENT_ORDERS_PER_CUSTOMER)
            .await?;

        let items = user_models
            .into_iter()
            .map(|u| {
                let orders = recent.remove(&u.id).unwrap_or_default();
                CustomerResponse::new(u, orders)
            })
            .collect();

        Ok(PaginatedResponse::new(items, params, total))
    }

    // -----------------------------
    // 内部辅助方法
    // -----------------------------

    async fn find_segment(&self, id: i64) -> AppResult<segments::Model> {
        segments::Entity::find_by_id(id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Segment not found".to_string()))
    }

    async fn ensure_slug_available(&self, slug: &str, exclude_id: Option<i64>) -> AppResult<()> {
        ensure_slug_available_on(&self.pool, slug, exclude_id).await
    }

    async fn user_counts_by_segment(&self) -> AppResult<HashMap<i64, i64>> {
        #[derive(Debug, FromQueryResult)]
        struct CountRow {
            segment_id: Option<i64>,
            count: i64,
        }

        let rows = users::Entity::find()
            .filter(users::Column::SegmentId.is_not_null())
            .select_only()
            .column(users::Column::SegmentId)
            .column_as(Expr::col(users::Column::Id).count(), "count")
            .group_by(users::Column::SegmentId)
            .into_model::<CountRow>()
            .all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|r| r.segment_id.map(|id| (id, r.count)))
            .collect())
    }
}

async fn ensure_slug_available_on<C: ConnectionTrait>(
    conn: &C,
    slug: &str,
    exclude_id: Option<i64>,
) -> AppResult<()> {
    let mut query = segments::Entity::find().filter(segments::Column::Slug.eq(slug));
    if let Some(id) = exclude_id {
        query = query.filter(segments::Column::Id.ne(id));
    }
    if query.count(conn).await? > 0 {
        return Err(AppError::ValidationError(
            "Segment slug already exists".to_string(),
        ));
    }
    Ok(())
}

fn validate_segment_fields(
    name: &str,
    slug: &str,
    min_spend: i64,
    max_spend: Option<i64>,
    discount_percent: i32,
) -> AppResult<()> {
    if name.is_empty() {
        return Err(AppError::ValidationError(
            "Segment name is required".to_string(),
        ));
    }
    if slug.is_empty()
        || !slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(AppError::ValidationError(
            "Segment slug may only contain lowercase letters, digits and '-'".to_string(),
        ));
    }
    if min_spend < 0 {
        return Err(AppError::ValidationError(
            "min_spend must not be negative".to_string(),
        ));
    }
    if let Some(max) = max_spend
        && max < min_spend
    {
        return Err(AppError::ValidationError(
            "max_spend must be greater than or equal to min_spend".to_string(),
        ));
    }
    if !(0..=100).contains(&discount_percent) {
        return Err(AppError::ValidationError(
            "discount_percent must be between 0 and 100".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{DiscountType, OrderStatus};
    use crate::services::restrictions::insert_coupon_segments;
    use crate::test_support::*;

    fn segment(id: i64, min_spend: i64, max_spend: Option<i64>, priority: i32) -> segments::Model {
        segments::Model {
            id,
            name: format!("Tier {id}"),
            slug: format!("tier-{id}"),
            description: None,
            min_spend,
            max_spend,
            discount_percent: 0,
            color: None,
            icon: None,
            priority,
            is_active: true,
            created_at: test_now(),
            updated_at: test_now(),
        }
    }

    fn resolve(mut list: Vec<segments::Model>, spending: i64) -> Option<i64> {
        sort_for_resolution(&mut list);
        resolve_segment(&list, spending).map(|s| s.id)
    }

    #[test]
    fn test_resolution_is_boundary_inclusive() {
        let tiers = vec![
            segment(1, 0, Some(999), 0),
            segment(2, 1000, Some(4999), 0),
            segment(3, 5000, None, 0),
        ];
        assert_eq!(resolve(tiers.clone(), 1000), Some(2));
        assert_eq!(resolve(tiers.clone(), 4999), Some(2));
        assert_eq!(resolve(tiers.clone(), 999), Some(1));
        assert_eq!(resolve(tiers.clone(), 5000), Some(3));
        assert_eq!(resolve(tiers, 10_000_000), Some(3));
    }

    #[test]
    fn test_resolution_falls_back_to_entry_tier() {
        let tiers = vec![segment(1, 0, Some(999), 0), segment(2, 5000, None, 0)];
        assert_eq!(resolve(tiers.clone(), 2000), Some(1));
        assert_eq!(resolve(tiers, -5), Some(1));
    }

    #[test]
    fn test_resolution_empty_list() {
        assert_eq!(resolve(vec![], 1000), None);
    }

    #[test]
    fn test_resolution_tie_break_by_priority_then_id() {
        let tiers = vec![
            segment(1, 1000, None, 0),
            segment(2, 1000, None, 10),
            segment(3, 1000, None, 10),
        ];
        assert_eq!(resolve(tiers, 1500), Some(2));
    }

    #[test]
    fn test_resolution_overlapping_bands_prefer_higher_min_spend() {
        let tiers = vec![segment(1, 0, None, 100), segment(2, 1000, Some(2000), 0)];
        assert_eq!(resolve(tiers.clone(), 1500), Some(2));
        assert_eq!(resolve(tiers, 2500), Some(1));
    }

    #[test]
    fn test_validate_segment_fields() {
        assert!(validate_segment_fields("Gold", "gold", 1000, Some(4999), 10).is_ok());
        assert!(validate_segment_fields("Gold", "gold", 1000, None, 10).is_ok());
        assert!(validate_segment_fields("", "gold", 0, None, 0).is_err());
        assert!(validate_segment_fields("Gold", "Gold Tier", 0, None, 0).is_err());
        assert!(validate_segment_fields("Gold", "gold", -1, None, 0).is_err());
        assert!(validate_segment_fields("Gold", "gold", 1000, Some(999), 0).is_err());
        assert!(validate_segment_fields("Gold", "gold", 0, None, 101).is_err());
    }

    #[tokio::test]
    async fn test_calculate_user_spending() {
        let db = setup_db().await;
        let user = insert_user(&db, "u@example.com").await;
        insert_order(&db, user.id, OrderStatus::Paid, 1000, None).await;
        insert_order(&db, user.id, OrderStatus::Cancelled, 500, None).await;
        insert_order(&db, user.id, OrderStatus::Delivered, 2000, None).await;

        let service = SegmentService::new(db.clone());
        assert_eq!(service.calculate_user_spending(user.id).await.unwrap(), 3000);
    }

    #[tokio::test]
    async fn test_find_segment_ignores_inactive() {
        let db = setup_db().await;
        let bronze = insert_segment(&db, "bronze", 0, Some(999)).await;
        insert_segment_with(&db, "gold", 1000, None, 0, false).await;

        let service = SegmentService::new(db.clone());
        let found = service.find_segment_by_spending(5000).await.unwrap();
        assert_eq!(found.map(|s| s.id), Some(bronze.id));
    }

    #[tokio::test]
    async fn test_find_segment_none_without_active_segments() {
        let db = setup_db().await;
        insert_segment_with(&db, "gold", 1000, None, 0, false).await;

        let service = SegmentService::new(db.clone());
        assert!(service.find_segment_by_spending(5000).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_assign_segment_to_user_persists_and_is_idempotent() {
        let db = setup_db().await;
        insert_segment(&db, "bronze", 0, Some(999)).await;
        let silver = insert_segment(&db, "silver", 1000, Some(4999)).await;
        insert_segment(&db, "gold", 5000, None).await;
        let user = insert_user(&db, "u@example.com").await;
        insert_order(&db, user.id, OrderStatus::Paid, 1000, None).await;
        insert_order(&db, user.id, OrderStatus::Shipped, 2000, None).await;
        insert_order(&db, user.id, OrderStatus::Returned, 9000, None).await;

        let service = SegmentService::new(db.clone());
        let first = service.assign_segment_to_user(user.id).await.unwrap();
        assert_eq!(first.spending, 3000);
        assert_eq!(first.segment.as_ref().map(|s| s.id), Some(silver.id));

        let stored = users::Entity::find_by_id(user.id)
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.lifetime_spent, 3000);
        assert_eq!(stored.segment_id, Some(silver.id));

        let second = service.assign_segment_to_user(user.id).await.unwrap();
        assert_eq!(second.spending, first.spending);
        assert_eq!(second.segment.map(|s| s.id), Some(silver.id));
    }

    #[tokio::test]
    async fn test_assign_segment_without_segments_writes_null() {
        let db = setup_db().await;
        let user = insert_user(&db, "u@example.com").await;
        insert_order(&db, user.id, OrderStatus::Paid, 1000, None).await;

        let service = SegmentService::new(db.clone());
        let result = service.assign_segment_to_user(user.id).await.unwrap();
        assert_eq!(result.spending, 1000);
        assert!(result.segment.is_none());

        let stored = users::Entity::find_by_id(user.id)
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.segment_id, None);
        assert_eq!(stored.lifetime_spent, 1000);
    }

    #[tokio::test]
    async fn test_assign_segment_unknown_user() {
        let db = setup_db().await;
        let service = SegmentService::new(db.clone());
        let err = service.assign_segment_to_user(42).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_bulk_recalculate_segments() {
        let db = setup_db().await;
        let bronze = insert_segment(&db, "bronze", 0, Some(999)).await;
        let gold = insert_segment(&db, "gold", 5000, None).await;
        let a = insert_user(&db, "a@example.com").await;
        let b = insert_user(&db, "b@example.com").await;
        let c = insert_user(&db, "c@example.com").await;
        insert_order(&db, a.id, OrderStatus::Delivered, 6000, None).await;
        insert_order(&db, b.id, OrderStatus::Paid, 100, None).await;

        let service = SegmentService::new(db.clone());
        let result = service.bulk_recalculate_segments().await.unwrap();
        assert_eq!(result.updated, 3);
        assert!(result.failed.is_empty());

        let segment_of = |id: i64| {
            let db = db.clone();
            async move {
                users::Entity::find_by_id(id)
                    .one(&db)
                    .await
                    .unwrap()
                    .unwrap()
                    .segment_id
            }
        };
        assert_eq!(segment_of(a.id).await, Some(gold.id));
        assert_eq!(segment_of(b.id).await, Some(bronze.id));
        assert_eq!(segment_of(c.id).await, Some(bronze.id));
    }

    #[tokio::test]
    async fn test_bulk_recalculate_continues_after_failure() {
        let db = setup_db().await;
        let bronze = insert_segment(&db, "bronze", 0, None).await;
        let a = insert_user(&db, "a@example.com").await;
        let broken = insert_user(&db, "broken@example.com").await;
        let c = insert_user(&db, "c@example.com").await;
        db.execute_unprepared(&format!(
            "CREATE TRIGGER reject_user_update BEFORE UPDATE ON users \
             WHEN NEW.id = {} BEGIN SELECT RAISE(ABORT, 'locked'); END;",
            broken.id
        ))
        .await
        .unwrap();

        let service = SegmentService::new(db.clone());
        let result = service.bulk_recalculate_segments().await.unwrap();
        assert_eq!(result.updated, 2);
        assert_eq!(result.failed, vec![broken.id]);

        for id in [a.id, c.id] {
            let stored = users::Entity::find_by_id(id).one(&db).await.unwrap().unwrap();
            assert_eq!(stored.segment_id, Some(bronze.id));
        }
    }

    #[tokio::test]
    async fn test_create_segment_rejects_duplicate_slug() {
        let db = setup_db().await;
        let service = SegmentService::new(db.clone());
        let req = CreateSegmentRequest {
            name: "Gold".to_string(),
            slug: "gold".to_string(),
            description: None,
            min_spend: 5000,
            max_spend: None,
            discount_percent: 10,
            color: Some("#FFD700".to_string()),
            icon: None,
            priority: 0,
            is_active: true,
        };
        let created = service.create_segment(req.clone()).await.unwrap();
        assert_eq!(created.slug, "gold");
        assert_eq!(created.user_count, Some(0));

        let err = service.create_segment(req).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(msg) if msg.contains("slug")));
    }

    #[tokio::test]
    async fn test_update_segment_partial_and_clear() {
        let db = setup_db().await;
        let silver = insert_segment(&db, "silver", 1000, Some(4999)).await;
        insert_segment(&db, "gold", 5000, None).await;
        let service = SegmentService::new(db.clone());

        let updated = service
            .update_segment(
                silver.id,
                serde_json::from_str(r#"{"max_spend": null, "priority": 3}"#).unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(updated.max_spend, None);
        assert_eq!(updated.priority, 3);
        assert_eq!(updated.min_spend, 1000);
        assert_eq!(updated.slug, "silver");

        let err = service
            .update_segment(
                silver.id,
                UpdateSegmentRequest {
                    slug: Some("gold".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        let err = service
            .update_segment(999, UpdateSegmentRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_segment_nulls_users_and_restrictions() {
        let db = setup_db().await;
        let gold = insert_segment(&db, "gold", 5000, None).await;
        let user = insert_user_in_segment(&db, "vip@example.com", Some(gold.id), 8000).await;
        let coupon = insert_coupon(&db, "VIP", DiscountType::Percentage, 20, None).await;
        insert_coupon_segments(&db, coupon.id, &[gold.id]).await.unwrap();

        let service = SegmentService::new(db.clone());
        service.delete_segment(gold.id).await.unwrap();

        let stored = users::Entity::find_by_id(user.id)
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.segment_id, None);
        assert_eq!(stored.lifetime_spent, 8000);
        let restrictions = restrictions::load_coupon_segments(&db, &[coupon.id])
            .await
            .unwrap();
        assert!(restrictions.is_empty());

        let err = service.delete_segment(gold.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_and_get_segment() {
        let db = setup_db().await;
        let bronze = insert_segment(&db, "bronze", 0, Some(999)).await;
        let legacy = insert_segment_with(&db, "legacy", 0, None, 0, false).await;
        insert_user_in_segment(&db, "a@example.com", Some(bronze.id), 10).await;
        insert_user_in_segment(&db, "b@example.com", Some(bronze.id), 20).await;
        insert_user_in_segment(&db, "c@example.com", Some(legacy.id), 30).await;
        let coupon = insert_coupon(&db, "BRONZE5", DiscountType::Percentage, 5, None).await;
        insert_coupon_segments(&db, coupon.id, &[bronze.id]).await.unwrap();

        let service = SegmentService::new(db.clone());
        let active = service.list_segments(false).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].user_count, Some(2));

        let all = service.list_segments(true).await.unwrap();
        assert_eq!(all.len(), 2);

        let detail = service.get_segment(bronze.id).await.unwrap();
        assert_eq!(detail.segment.user_count, Some(2));
        assert_eq!(detail.coupons.len(), 1);
        assert_eq!(detail.coupons[0].code, "BRONZE5");
        assert_eq!(detail.coupons[0].segments[0].slug, "bronze");

        assert!(matches!(
            service.get_segment(999).await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_segment_statistics() {
        let db = setup_db().await;
        let bronze = insert_segment(&db, "bronze", 0, Some(999)).await;
        let gold = insert_segment(&db, "gold", 5000, None).await;
        insert_user_in_segment(&db, "a@example.com", Some(gold.id), 6000).await;
        insert_user_in_segment(&db, "b@example.com", Some(gold.id), 9000).await;
        insert_user_in_segment(&db, "c@example.com", None, 100).await;

        let service = SegmentService::new(db.clone());
        let stats = service.segment_statistics().await.unwrap();
        assert_eq!(stats.len(), 2);

        let bronze_stats = stats.iter().find(|s| s.segment_id == bronze.id).unwrap();
        assert_eq!(bronze_stats.customer_count, 0);
        assert_eq!(bronze_stats.total_spent, 0);

        let gold_stats = stats.iter().find(|s| s.segment_id == gold.id).unwrap();
        assert_eq!(gold_stats.customer_count, 2);
        assert_eq!(gold_stats.total_spent, 15000);
        assert_eq!(gold_stats.discount_percent, 5);
    }

    #[tokio::test]
    async fn test_customers_by_segment_slug() {
        let db = setup_db().await;
        let gold = insert_segment(&db, "gold", 5000, None).await;
        let top = insert_user_in_segment(&db, "top@example.com", Some(gold.id), 9000).await;
        insert_user_in_segment(&db, "mid@example.com", Some(gold.id), 7000).await;
        insert_user_in_segment(&db, "low@example.com", Some(gold.id), 5000).await;
        insert_user_in_segment(&db, "none@example.com", None, 100).await;
        for _ in 0..7 {
            insert_order(&db, top.id, OrderStatus::Paid, 100, None).await;
        }

        let service = SegmentService::new(db.clone());
        let page = service
            .customers_by_segment_slug("gold", &PaginationParams::new(Some(1), Some(2)))
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.data.len(), 2);
        assert_eq!(page.data[0].email, "top@example.com");
        assert_eq!(page.data[0].recent_orders.len(), RECENT_ORDERS_PER_CUSTOMER);
        assert!(page.data[1].recent_orders.is_empty());

        let err = service
            .customers_by_segment_slug("missing", &PaginationParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
