use crate::entities::DiscountType;

/// 计算优惠金额（美分）
///
/// - percentage: `subtotal * value / 100`，保留浮点结果，不做取整
/// - fixed_amount: 直接返回 value，不会按小计封顶，由调用方处理
pub fn calculate_discount(discount_type: DiscountType, discount_value: i64, subtotal: i64) -> f64 {
    match discount_type {
        DiscountType::Percentage => subtotal as f64 * discount_value as f64 / 100.0,
        DiscountType::FixedAmount => discount_value as f64,
    }
}
