//! 通用工具函数

use chrono::{DateTime, SubsecRound, Utc};
use uuid::Uuid;

/// 患者ID前缀
pub const PATIENT_ID_PREFIX: &str = "PAT";
/// 病例ID前缀
pub const CASE_ID_PREFIX: &str = "CASE";

/// 生成带前缀的短标识符，例如 `CASE-1a2b3c4d`
pub fn generate_prefixed_id(prefix: &str) -> String {
    let uuid = Uuid::new_v4().simple().to_string();
    format!("{}-{}", prefix, &uuid[..8])
}

/// 验证带前缀标识符格式
pub fn is_valid_prefixed_id(id: &str, prefix: &str) -> bool {
    match id.strip_prefix(prefix).and_then(|rest| rest.strip_prefix('-')) {
        Some(suffix) => suffix.len() == 8 && suffix.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

/// 当前时间，截断到微秒以便与数据库时间戳精度一致
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_prefixed_id() {
        let id = generate_prefixed_id(CASE_ID_PREFIX);
        assert!(id.starts_with("CASE-"));
        assert!(is_valid_prefixed_id(&id, CASE_ID_PREFIX));
        assert_ne!(id, generate_prefixed_id(CASE_ID_PREFIX));
    }

    #[test]
    fn test_is_valid_prefixed_id() {
        assert!(is_valid_prefixed_id("PAT-0a1b2c3d", PATIENT_ID_PREFIX));
        assert!(!is_valid_prefixed_id("PAT-0a1b2c3", PATIENT_ID_PREFIX));
        assert!(!is_valid_prefixed_id("CASE-0a1b2c3d", PATIENT_ID_PREFIX));
        assert!(!is_valid_prefixed_id("PAT0a1b2c3d", PATIENT_ID_PREFIX));
    }
}
