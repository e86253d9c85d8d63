//! 优惠券 <-> 客户分层 关联表 (coupon_segments) 的读写。
//!
//! 所有函数都接收 `ConnectionTrait`，既可以在连接池上调用，也可以在事务内调用。

use crate::entities::{
    coupon_entity as coupons, coupon_segment_entity as coupon_segments,
    segment_entity as segments,
};
use crate::error::{AppError, AppResult};
use crate::models::SegmentSummary;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};
use std::collections::HashMap;

/// 批量读取优惠券的分层限制；没有限制的优惠券不会出现在结果中
pub async fn load_coupon_segments<C: ConnectionTrait>(
    conn: &C,
    coupon_ids: &[i64],
) -> Result<HashMap<i64, Vec<SegmentSummary>>, DbErr> {
    let mut map: HashMap<i64, Vec<SegmentSummary>> = HashMap::new();
    if coupon_ids.is_empty() {
        return Ok(map);
    }

    let rows = coupon_segments::Entity::find()
        .filter(coupon_segments::Column::CouponId.is_in(coupon_ids.to_vec()))
        .find_also_related(segments::Entity)
        .order_by_asc(coupon_segments::Column::SegmentId)
        .all(conn)
        .await?;

    for (link, segment) in rows {
        if let Some(segment) = segment {
            map.entry(link.coupon_id)
                .or_default()
                .push(SegmentSummary::from(segment));
        }
    }
    Ok(map)
}

/// 校验分层 id 全部存在，返回去重排序后的 id 列表
pub async fn ensure_segments_exist<C: ConnectionTrait>(
    conn: &C,
    segment_ids: &[i64],
) -> AppResult<Vec<i64>> {
    let mut ids = segment_ids.to_vec();
    ids.sort_unstable();
    ids.dedup();

    for id in &ids {
        let exists = segments::Entity::find_by_id(*id).count(conn).await? > 0;
        if !exists {
            return Err(AppError::ValidationError(format!(
                "Segment {id} does not exist"
            )));
        }
    }
    Ok(ids)
}

pub async fn clear_coupon_segments<C: ConnectionTrait>(
    conn: &C,
    coupon_id: i64,
) -> Result<u64, DbErr> {
    let res = coupon_segments::Entity::delete_many()
        .filter(coupon_segments::Column::CouponId.eq(coupon_id))
        .exec(conn)
        .await?;
    Ok(res.rows_affected)
}

/// 先删后插，整体替换优惠券的分层限制
pub async fn replace_coupon_segments<C: ConnectionTrait>(
    conn: &C,
    coupon_id: i64,
    segment_ids: &[i64],
) -> Result<(), DbErr> {
    clear_coupon_segments(conn, coupon_id).await?;
    insert_coupon_segments(conn, coupon_id, segment_ids).await
}

pub async fn insert_coupon_segments<C: ConnectionTrait>(
    conn: &C,
    coupon_id: i64,
    segment_ids: &[i64],
) -> Result<(), DbErr> {
    if segment_ids.is_empty() {
        return Ok(());
    }
    let rows = segment_ids.iter().map(|segment_id| coupon_segments::ActiveModel {
        coupon_id: sea_orm::Set(coupon_id),
        segment_id: sea_orm::Set(*segment_id),
    });
    coupon_segments::Entity::insert_many(rows)
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

/// 仅限某个分层使用的优惠券
pub async fn coupons_for_segment<C: ConnectionTrait>(
    conn: &C,
    segment: &segments::Model,
) -> Result<Vec<coupons::Model>, DbErr> {
    segment
        .find_related(coupons::Entity)
        .order_by_asc(coupons::Column::Id)
        .all(conn)
        .await
}

pub async fn clear_segment_restrictions<C: ConnectionTrait>(
    conn: &C,
    segment_id: i64,
) -> Result<u64, DbErr> {
    let res = coupon_segments::Entity::delete_many()
        .filter(coupon_segments::Column::SegmentId.eq(segment_id))
        .exec(conn)
        .await?;
    Ok(res.rows_affected)
}
