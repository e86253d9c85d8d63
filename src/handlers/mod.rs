pub mod coupon;
pub mod segment;

pub use coupon::{admin_coupon_config, coupon_config};
pub use segment::segment_config;
