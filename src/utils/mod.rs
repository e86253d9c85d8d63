pub mod clock;
pub mod code_generator;
pub mod discount;

pub use clock::{Clock, FixedClock, SystemClock};
pub use code_generator::{generate_coupon_code, normalize_coupon_code};
pub use discount::calculate_discount;
