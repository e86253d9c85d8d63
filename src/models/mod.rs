pub mod common;
pub mod coupon;
pub mod order;
pub mod pagination;
pub mod segment;
pub mod user;

pub use common::*;
pub use coupon::*;
pub use order::*;
pub use pagination::*;
pub use segment::*;
pub use user::*;
