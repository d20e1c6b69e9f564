//! 诊断到医生专长的映射

use mediconnect_core::Specialization;

/// 低于该年龄的患者一律转儿科
pub const PAEDIATRIC_AGE_LIMIT: u32 = 12;

/// 疾病关键词到专长的有序映射
///
/// 匹配按数组顺序进行，首个命中的关键词生效。
/// `pre-eclampsia` 必须排在 `eclampsia` 之前。
pub const SPECIALIZATION_MAP: &[(&str, Specialization)] = &[
    ("pre-eclampsia", Specialization::Gynaecologist),
    ("eclampsia", Specialization::Gynaecologist),
    ("pregnancy", Specialization::Gynaecologist),
    ("anemia", Specialization::GeneralPhysician),
    ("dengue", Specialization::GeneralPhysician),
    ("malaria", Specialization::GeneralPhysician),
    ("child", Specialization::Paediatrician),
];

/// 根据诊断文本和患者年龄确定所需专长
pub fn required_specialization(diagnosis: &str, patient_age: u32) -> Specialization {
    if patient_age < PAEDIATRIC_AGE_LIMIT {
        return Specialization::Paediatrician;
    }

    let diagnosis = diagnosis.to_lowercase();
    SPECIALIZATION_MAP
        .iter()
        .find(|(keyword, _)| diagnosis.contains(keyword))
        .map(|(_, specialization)| specialization.clone())
        .unwrap_or(Specialization::GeneralPhysician)
}
