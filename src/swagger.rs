use actix_web::web;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::entities::{DiscountType, OrderStatus};
use crate::handlers;
use crate::models::*;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::coupon::validate_coupon,
        handlers::coupon::get_available_coupons,
        handlers::coupon::list_coupons,
        handlers::coupon::create_coupon,
        handlers::coupon::get_coupon,
        handlers::coupon::update_coupon,
        handlers::coupon::delete_coupon,
        handlers::coupon::get_coupon_usage,
        handlers::segment::list_segments,
        handlers::segment::create_segment,
        handlers::segment::get_statistics,
        handlers::segment::recalculate_segments,
        handlers::segment::assign_segment,
        handlers::segment::get_customers_by_slug,
        handlers::segment::get_segment,
        handlers::segment::update_segment,
        handlers::segment::delete_segment,
    ),
    components(
        schemas(
            DiscountType,
            OrderStatus,
            CouponResponse,
            CreateCouponRequest,
            UpdateCouponRequest,
            ValidateCouponRequest,
            CouponValidationResponse,
            AvailableCouponsQuery,
            SegmentSummary,
            SegmentResponse,
            SegmentDetailResponse,
            CreateSegmentRequest,
            UpdateSegmentRequest,
            SegmentListQuery,
            SegmentAssignmentResponse,
            BulkRecalculationResponse,
            SegmentStatistics,
            CustomerResponse,
            OrderResponse,
            PaginationParams,
            ApiError,
        )
    ),
    tags(
        (name = "coupon", description = "Coupon validation API"),
        (name = "admin-coupon", description = "Coupon management API"),
        (name = "admin-segment", description = "Customer segment management API"),
    ),
    info(
        title = "Storefront Backend API",
        version = "1.0.0",
        description = "Coupon and customer segment REST API documentation",
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
