pub mod coupon_service;
pub mod order_service;
pub mod redemption;
pub mod restrictions;
pub mod segment_service;

pub use coupon_service::*;
pub use order_service::*;
pub use redemption::*;
pub use segment_service::*;
