use crate::models::*;
use crate::services::SegmentService;
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/admin/segments",
    tag = "admin-segment",
    params(SegmentListQuery),
    responses(
        (status = 200, description = "获取分层列表成功", body = [SegmentResponse])
    )
)]
pub async fn list_segments(
    segment_service: web::Data<SegmentService>,
    query: web::Query<SegmentListQuery>,
) -> Result<HttpResponse> {
    let include_inactive = query.include_inactive.unwrap_or(false);
    match segment_service.list_segments(include_inactive).await {
        Ok(segments) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": segments
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/segments",
    tag = "admin-segment",
    request_body = CreateSegmentRequest,
    responses(
        (status = 201, description = "创建分层成功", body = SegmentResponse),
        (status = 400, description = "请求参数错误")
    )
)]
pub async fn create_segment(
    segment_service: web::Data<SegmentService>,
    request: web::Json<CreateSegmentRequest>,
) -> Result<HttpResponse> {
    match segment_service.create_segment(request.into_inner()).await {
        Ok(segment) => Ok(HttpResponse::Created().json(json!({
            "success": true,
            "data": segment
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/segments/statistics",
    tag = "admin-segment",
    responses(
        (status = 200, description = "获取分层统计成功", body = [SegmentStatistics])
    )
)]
pub async fn get_statistics(segment_service: web::Data<SegmentService>) -> Result<HttpResponse> {
    match segment_service.segment_statistics().await {
        Ok(stats) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": stats
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/segments/recalculate",
    tag = "admin-segment",
    responses(
        (status = 200, description = "全量重算完成", body = BulkRecalculationResponse)
    )
)]
pub async fn recalculate_segments(
    segment_service: web::Data<SegmentService>,
) -> Result<HttpResponse> {
    match segment_service.bulk_recalculate_segments().await {
        Ok(result) => {
            let response = BulkRecalculationResponse {
                updated: result.updated,
                failed: result.failed,
            };
            Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "data": response
            })))
        }
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/segments/assign/{user_id}",
    tag = "admin-segment",
    params(("user_id" = i64, Path, description = "用户 ID")),
    responses(
        (status = 200, description = "分层已更新", body = SegmentAssignmentResponse),
        (status = 404, description = "用户不存在")
    )
)]
pub async fn assign_segment(
    segment_service: web::Data<SegmentService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match segment_service.assign_segment_to_user(path.into_inner()).await {
        Ok(assignment) => {
            let response = SegmentAssignmentResponse {
                spending: assignment.spending,
                segment: assignment.segment.map(SegmentResponse::from),
            };
            Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "data": response
            })))
        }
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/segments/slug/{slug}/customers",
    tag = "admin-segment",
    params(
        ("slug" = String, Path, description = "分层 slug"),
        PaginationParams
    ),
    responses(
        (status = 200, description = "获取分层客户成功"),
        (status = 404, description = "分层不存在")
    )
)]
pub async fn get_customers_by_slug(
    segment_service: web::Data<SegmentService>,
    path: web::Path<String>,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse> {
    match segment_service
        .customers_by_segment_slug(&path.into_inner(), &query)
        .await
    {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": page
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/segments/{id}",
    tag = "admin-segment",
    params(("id" = i64, Path, description = "分层 ID")),
    responses(
        (status = 200, description = "获取分层成功", body = SegmentDetailResponse),
        (status = 404, description = "分层不存在")
    )
)]
pub async fn get_segment(
    segment_service: web::Data<SegmentService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match segment_service.get_segment(path.into_inner()).await {
        Ok(detail) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": detail
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/admin/segments/{id}",
    tag = "admin-segment",
    params(("id" = i64, Path, description = "分层 ID")),
    request_body = UpdateSegmentRequest,
    responses(
        (status = 200, description = "更新分层成功", body = SegmentResponse),
        (status = 400, description = "请求参数错误"),
        (status = 404, description = "分层不存在")
    )
)]
pub async fn update_segment(
    segment_service: web::Data<SegmentService>,
    path: web::Path<i64>,
    request: web::Json<UpdateSegmentRequest>,
) -> Result<HttpResponse> {
    match segment_service
        .update_segment(path.into_inner(), request.into_inner())
        .await
    {
        Ok(segment) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": segment
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/admin/segments/{id}",
    tag = "admin-segment",
    params(("id" = i64, Path, description = "分层 ID")),
    responses(
        (status = 200, description = "删除分层成功"),
        (status = 404, description = "分层不存在")
    )
)]
pub async fn delete_segment(
    segment_service: web::Data<SegmentService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let id = path.into_inner();
    match segment_service.delete_segment(id).await {
        Ok(()) => Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
            json!({ "id": id }),
            "Segment deleted".to_string(),
        ))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn segment_config(cfg: &mut web::ServiceConfig) {
    // 固定路径必须注册在 /{id} 之前
    cfg.service(
        web::scope("/admin/segments")
            .route("", web::get().to(list_segments))
            .route("", web::post().to(create_segment))
            .route("/statistics", web::get().to(get_statistics))
            .route("/recalculate", web::post().to(recalculate_segments))
            .route("/assign/{user_id}", web::post().to(assign_segment))
            .route("/slug/{slug}/customers", web::get().to(get_customers_by_slug))
            .route("/{id}", web::get().to(get_segment))
            .route("/{id}", web::put().to(update_segment))
            .route("/{id}", web::delete().to(delete_segment)),
    );
}
