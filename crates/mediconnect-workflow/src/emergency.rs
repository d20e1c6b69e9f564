//! 紧急关键词兜底
//!
//! 与模型给出的风险等级无关，症状原文命中任一关键词即升级为 EMERGENCY。
//! 该规则只会升级，不会降级，也不受模型输出影响。

use mediconnect_core::RiskLevel;

/// 高危关键词（英文及当地语言），按定义顺序扫描
pub const EMERGENCY_KEYWORDS: &[&str] = &[
    "pre-eclampsia",
    "eclampsia",
    "convulsion",
    "seizure",
    "heavy bleeding",
    "hemorrhage",
    "unconscious",
    "not breathing",
    "behoshi",
    "zyada khoon",
    "dauraa",
    "chest pain",
    "no pulse",
    "heart attack",
    "stroke",
];

/// 触发兜底时写入的风险原因
pub const EMERGENCY_OVERRIDE_REASON: &str = "Detected high-risk emergency keywords in symptoms";

/// 返回症状中命中的关键词（按列表顺序）
pub fn detect_emergency_keywords(symptoms: &str) -> Vec<&'static str> {
    let text = symptoms.to_lowercase();
    EMERGENCY_KEYWORDS
        .iter()
        .copied()
        .filter(|keyword| text.contains(keyword))
        .collect()
}

/// 应用兜底规则，命中时改写风险等级与原因并返回命中的关键词
pub fn apply_emergency_override(
    symptoms: &str,
    risk_level: &mut RiskLevel,
    risk_reason: &mut String,
) -> Option<Vec<&'static str>> {
    let matched = detect_emergency_keywords(symptoms);
    if matched.is_empty() {
        return None;
    }

    *risk_level = RiskLevel::Emergency;
    *risk_reason = EMERGENCY_OVERRIDE_REASON.to_string();
    Some(matched)
}
