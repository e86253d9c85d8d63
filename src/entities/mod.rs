pub mod coupon_segments;
pub mod coupons;
pub mod orders;
pub mod segments;
pub mod users;

pub use coupon_segments as coupon_segment_entity;
pub use coupons as coupon_entity;
pub use orders as order_entity;
pub use segments as segment_entity;
pub use users as user_entity;

pub use coupons::DiscountType;
pub use orders::OrderStatus;
