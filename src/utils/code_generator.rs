use rand::Rng;

// 去掉容易混淆的字符 (0/O, 1/I)
const COUPON_CODE_CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const COUPON_CODE_LENGTH: usize = 8;

/// 生成随机优惠券码
pub fn generate_coupon_code() -> String {
    let mut rng = rand::thread_rng();
    (0..COUPON_CODE_LENGTH)
        .map(|_| COUPON_CODE_CHARSET[rng.gen_range(0..COUPON_CODE_CHARSET.len())] as char)
        .collect()
}

/// 规范化管理员输入的优惠券码：只去掉首尾空白，大小写保持原样（校验时按原样精确匹配）
pub fn normalize_coupon_code(code: &str) -> String {
    code.trim().to_string()
}
