//! 医生匹配引擎
//!
//! 根据所需专长和请求方位置选择最近的可用医生

use mediconnect_core::{Doctor, DoctorFilter, MatchedDoctor, Result, Specialization, TriageStore};
use std::sync::Arc;

use crate::geo::distance_km;
use crate::specialization::required_specialization;

/// 医生匹配器
#[derive(Clone)]
pub struct DoctorMatcher {
    store: Arc<dyn TriageStore>,
}

impl DoctorMatcher {
    /// 创建新的匹配器
    pub fn new(store: Arc<dyn TriageStore>) -> Self {
        Self { store }
    }

    /// 获取所有可用医生（保持存储扫描顺序）
    pub async fn get_available_doctors(&self) -> Result<Vec<Doctor>> {
        self.store.scan_doctors(&DoctorFilter::available()).await
    }

    /// 为诊断匹配医生
    ///
    /// 没有任何可用医生时返回 `None`；没有对应专长时退回到全部可用医生。
    pub async fn match_doctor(
        &self,
        primary_diagnosis: &str,
        patient_age: u32,
        lat: f64,
        lng: f64,
    ) -> Result<Option<MatchedDoctor>> {
        let required = required_specialization(primary_diagnosis, patient_age);
        tracing::debug!(
            "Matching doctor for diagnosis '{}' (age {}), required specialization {}",
            primary_diagnosis,
            patient_age,
            required
        );

        let available = self.get_available_doctors().await?;
        let matched = select_nearest(available, &required, lat, lng);

        match &matched {
            Some(m) => tracing::info!(
                "Matched doctor {} ({}) at {:.2} km",
                m.doctor.doctor_id,
                m.doctor.specialization,
                m.distance_km
            ),
            None => tracing::warn!("No available doctor for specialization {}", required),
        }

        Ok(matched)
    }
}

/// 计算候选医生与请求方的距离，按距离升序排列
///
/// 使用稳定排序，距离相同时保持输入顺序。
pub fn rank_by_distance(candidates: Vec<Doctor>, lat: f64, lng: f64) -> Vec<MatchedDoctor> {
    let mut ranked: Vec<MatchedDoctor> = candidates
        .into_iter()
        .map(|doctor| MatchedDoctor {
            distance_km: distance_km(lat, lng, doctor.lat, doctor.lng),
            doctor,
        })
        .collect();

    ranked.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    ranked
}

/// 在可用医生中选出最近的一位
///
/// 先按专长过滤，过滤结果为空时使用全部可用医生。
/// 传入的医生若不可用会被剔除。
pub fn select_nearest(
    available: Vec<Doctor>,
    required: &Specialization,
    lat: f64,
    lng: f64,
) -> Option<MatchedDoctor> {
    let available: Vec<Doctor> = available.into_iter().filter(|d| d.is_available).collect();
    if available.is_empty() {
        return None;
    }

    let has_specialist = available.iter().any(|d| &d.specialization == required);
    let pool = if has_specialist {
        available
            .into_iter()
            .filter(|d| &d.specialization == required)
            .collect()
    } else {
        tracing::debug!("No {} available, falling back to all available doctors", required);
        available
    };

    rank_by_distance(pool, lat, lng).into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediconnect_database::MemoryStore;

    const ASHA_LAT: f64 = 25.5921;
    const ASHA_LNG: f64 = 85.1376;

    fn doctor(id: &str, specialization: Specialization, lat: f64, lng: f64, is_available: bool) -> Doctor {
        Doctor {
            doctor_id: id.to_string(),
            name: format!("Dr. {}", id),
            specialization,
            lat,
            lng,
            is_available,
        }
    }

    fn fixture_doctors() -> Vec<Doctor> {
        vec![
            doctor("DR-001", Specialization::Gynaecologist, 25.5941, 85.1376, true),
            doctor("DR-002", Specialization::GeneralPhysician, 25.6121, 85.1534, true),
            doctor("DR-003", Specialization::Paediatrician, 25.5712, 85.1892, true),
        ]
    }

    #[test]
    fn test_specialist_preferred_over_closer_generalist() {
        let matched = select_nearest(
            fixture_doctors(),
            &Specialization::Paediatrician,
            ASHA_LAT,
            ASHA_LNG,
        )
        .unwrap();

        assert_eq!(matched.doctor.doctor_id, "DR-003");
        assert!(matched.distance_km > 5.0);
    }

    #[test]
    fn test_fallback_to_nearest_available_when_no_specialist() {
        let matched = select_nearest(
            fixture_doctors(),
            &Specialization::Other("Cardiologist".to_string()),
            ASHA_LAT,
            ASHA_LNG,
        )
        .unwrap();

        assert_eq!(matched.doctor.doctor_id, "DR-001");
    }

    #[test]
    fn test_unavailable_doctors_never_selected() {
        let doctors = vec![
            doctor("DR-010", Specialization::Gynaecologist, ASHA_LAT, ASHA_LNG, false),
            doctor("DR-011", Specialization::GeneralPhysician, 26.0, 85.5, true),
        ];

        let matched = select_nearest(doctors, &Specialization::Gynaecologist, ASHA_LAT, ASHA_LNG)
            .unwrap();
        assert_eq!(matched.doctor.doctor_id, "DR-011");
        assert!(matched.doctor.is_available);

        let none = select_nearest(
            vec![doctor("DR-012", Specialization::GeneralPhysician, 0.0, 0.0, false)],
            &Specialization::GeneralPhysician,
            ASHA_LAT,
            ASHA_LNG,
        );
        assert!(none.is_none());
    }

    #[test]
    fn test_ties_go_to_first_in_scan_order() {
        let doctors = vec![
            doctor("DR-A", Specialization::GeneralPhysician, 25.60, 85.14, true),
            doctor("DR-B", Specialization::GeneralPhysician, 25.60, 85.14, true),
            doctor("DR-C", Specialization::GeneralPhysician, 25.60, 85.14, true),
        ];

        let matched =
            select_nearest(doctors, &Specialization::GeneralPhysician, ASHA_LAT, ASHA_LNG).unwrap();
        assert_eq!(matched.doctor.doctor_id, "DR-A");
    }

    #[test]
    fn test_rank_annotates_every_candidate() {
        let ranked = rank_by_distance(fixture_doctors(), ASHA_LAT, ASHA_LNG);
        let ids: Vec<_> = ranked.iter().map(|m| m.doctor.doctor_id.as_str()).collect();
        assert_eq!(ids, vec!["DR-001", "DR-002", "DR-003"]);
        assert!(ranked.windows(2).all(|w| w[0].distance_km <= w[1].distance_km));
    }

    #[tokio::test]
    async fn test_match_doctor_uses_store_availability() {
        let store = Arc::new(MemoryStore::with_doctors(fixture_doctors()));
        let matcher = DoctorMatcher::new(store.clone());

        let matched = matcher
            .match_doctor("Severe pre-eclampsia", 27, ASHA_LAT, ASHA_LNG)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(matched.doctor.doctor_id, "DR-001");

        store.set_doctor_availability("DR-001", false).await.unwrap();
        let matched = matcher
            .match_doctor("Severe pre-eclampsia", 27, ASHA_LAT, ASHA_LNG)
            .await
            .unwrap()
            .unwrap();
        // 没有妇科医生时退回到最近的可用医生
        assert_eq!(matched.doctor.doctor_id, "DR-002");
    }

    #[tokio::test]
    async fn test_match_doctor_none_when_nobody_available() {
        let store = Arc::new(MemoryStore::new());
        store
            .put_doctor(&doctor("DR-001", Specialization::Gynaecologist, 25.5941, 85.1376, false))
            .await
            .unwrap();

        let matcher = DoctorMatcher::new(store);
        let matched = matcher.match_doctor("fever", 30, ASHA_LAT, ASHA_LNG).await.unwrap();
        assert!(matched.is_none());
    }
}
