use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::services::{CouponService, SegmentService};
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

/// 请求未带 segment_id 时使用用户当前保存的分层；未知用户视为没有分层
async fn resolve_segment_id(
    segment_service: &SegmentService,
    segment_id: Option<i64>,
    user_id: Option<i64>,
) -> AppResult<Option<i64>> {
    if segment_id.is_some() {
        return Ok(segment_id);
    }
    let Some(user_id) = user_id else {
        return Ok(None);
    };
    match segment_service.current_segment_id(user_id).await {
        Ok(id) => Ok(id),
        Err(AppError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

#[utoipa::path(
    post,
    path = "/coupons/validate",
    tag = "coupon",
    request_body = ValidateCouponRequest,
    responses(
        (status = 200, description = "优惠券可用", body = CouponValidationResponse),
        (status = 400, description = "优惠券不可用（过期、次数用完、分层不符）"),
        (status = 404, description = "优惠券不存在")
    )
)]
pub async fn validate_coupon(
    coupon_service: web::Data<CouponService>,
    segment_service: web::Data<SegmentService>,
    request: web::Json<ValidateCouponRequest>,
) -> Result<HttpResponse> {
    let req = request.into_inner();
    let segment_id =
        match resolve_segment_id(&segment_service, req.segment_id, Some(req.user_id)).await {
            Ok(id) => id,
            Err(e) => return Ok(e.error_response()),
        };

    match coupon_service
        .validate_coupon(req.code.trim(), req.user_id, req.subtotal, segment_id)
        .await
    {
        Ok(validation) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": CouponValidationResponse::from(validation)
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/coupons/available",
    tag = "coupon",
    params(AvailableCouponsQuery),
    responses(
        (status = 200, description = "获取可用优惠券成功", body = [CouponResponse])
    )
)]
pub async fn get_available_coupons(
    coupon_service: web::Data<CouponService>,
    segment_service: web::Data<SegmentService>,
    query: web::Query<AvailableCouponsQuery>,
) -> Result<HttpResponse> {
    let segment_id =
        match resolve_segment_id(&segment_service, query.segment_id, query.user_id).await {
            Ok(id) => id,
            Err(e) => return Ok(e.error_response()),
        };

    match coupon_service
        .get_available_coupons(segment_id, query.user_id)
        .await
    {
        Ok(coupons) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": coupons
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/coupons",
    tag = "admin-coupon",
    responses(
        (status = 200, description = "获取优惠券列表成功", body = [CouponResponse])
    )
)]
pub async fn list_coupons(coupon_service: web::Data<CouponService>) -> Result<HttpResponse> {
    match coupon_service.list_coupons().await {
        Ok(coupons) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": coupons
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/coupons",
    tag = "admin-coupon",
    request_body = CreateCouponRequest,
    responses(
        (status = 201, description = "创建优惠券成功", body = CouponResponse),
        (status = 400, description = "请求参数错误")
    )
)]
pub async fn create_coupon(
    coupon_service: web::Data<CouponService>,
    request: web::Json<CreateCouponRequest>,
) -> Result<HttpResponse> {
    match coupon_service.create_coupon(request.into_inner()).await {
        Ok(coupon) => Ok(HttpResponse::Created().json(json!({
            "success": true,
            "data": coupon
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/coupons/{id}",
    tag = "admin-coupon",
    params(("id" = i64, Path, description = "优惠券 ID")),
    responses(
        (status = 200, description = "获取优惠券成功", body = CouponResponse),
        (status = 404, description = "优惠券不存在")
    )
)]
pub async fn get_coupon(
    coupon_service: web::Data<CouponService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match coupon_service.get_coupon(path.into_inner()).await {
        Ok(coupon) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": coupon
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/admin/coupons/{id}",
    tag = "admin-coupon",
    params(("id" = i64, Path, description = "优惠券 ID")),
    request_body = UpdateCouponRequest,
    responses(
        (status = 200, description = "更新优惠券成功", body = CouponResponse),
        (status = 400, description = "请求参数错误"),
        (status = 404, description = "优惠券不存在")
    )
)]
pub async fn update_coupon(
    coupon_service: web::Data<CouponService>,
    path: web::Path<i64>,
    request: web::Json<UpdateCouponRequest>,
) -> Result<HttpResponse> {
    match coupon_service
        .update_coupon(path.into_inner(), request.into_inner())
        .await
    {
        Ok(coupon) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": coupon
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/admin/coupons/{id}",
    tag = "admin-coupon",
    params(("id" = i64, Path, description = "优惠券 ID")),
    responses(
        (status = 200, description = "删除优惠券成功"),
        (status = 404, description = "优惠券不存在")
    )
)]
pub async fn delete_coupon(
    coupon_service: web::Data<CouponService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let id = path.into_inner();
    match coupon_service.delete_coupon(id).await {
        Ok(()) => Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
            json!({ "id": id }),
            "Coupon deleted".to_string(),
        ))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/coupons/{id}/usage",
    tag = "admin-coupon",
    params(("id" = i64, Path, description = "优惠券 ID")),
    responses(
        (status = 200, description = "获取使用记录成功", body = [OrderResponse]),
        (status = 404, description = "优惠券不存在")
    )
)]
pub async fn get_coupon_usage(
    coupon_service: web::Data<CouponService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match coupon_service.coupon_usage_history(path.into_inner()).await {
        Ok(orders) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": orders
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn coupon_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/coupons")
            .route("/validate", web::post().to(validate_coupon))
            .route("/available", web::get().to(get_available_coupons)),
    );
}

pub fn admin_coupon_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin/coupons")
            .route("", web::get().to(list_coupons))
            .route("", web::post().to(create_coupon))
            .route("/{id}", web::get().to(get_coupon))
            .route("/{id}", web::put().to(update_coupon))
            .route("/{id}", web::delete().to(delete_coupon))
            .route("/{id}/usage", web::get().to(get_coupon_usage)),
    );
}
