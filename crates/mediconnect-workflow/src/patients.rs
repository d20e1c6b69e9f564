//! 患者登记与查询

use mediconnect_core::utils::{self, PATIENT_ID_PREFIX};
use mediconnect_core::{Patient, PatientRegistration, PatientUpdate, Result, TriageError, TriageStore};
use std::sync::Arc;

/// 默认所属区块
pub const DEFAULT_BLOCK: &str = "Bikram";
/// 默认所属县
pub const DEFAULT_DISTRICT: &str = "Patna";
/// 允许登记的最大年龄
pub const MAX_PATIENT_AGE: u32 = 120;

/// 患者登记簿
#[derive(Clone)]
pub struct PatientRegistry {
    store: Arc<dyn TriageStore>,
}

impl PatientRegistry {
    pub fn new(store: Arc<dyn TriageStore>) -> Self {
        Self { store }
    }

    /// 登记新患者
    pub async fn register(&self, registration: PatientRegistration) -> Result<Patient> {
        validate_registration(&registration)?;

        let patient = Patient {
            patient_id: utils::generate_prefixed_id(PATIENT_ID_PREFIX),
            asha_worker_id: registration.asha_worker_id,
            name: registration.name.trim().to_string(),
            age: registration.age,
            gender: registration.gender,
            village: registration.village.trim().to_string(),
            block: registration.block.or_else(|| Some(DEFAULT_BLOCK.to_string())),
            district: registration
                .district
                .or_else(|| Some(DEFAULT_DISTRICT.to_string())),
            phone: registration.phone,
            abha_id: registration.abha_id,
            blood_group: registration.blood_group,
            known_conditions: registration.known_conditions,
            known_allergies: registration.known_allergies,
            current_medications: registration.current_medications,
            registered_date: utils::now(),
            last_visit_date: None,
        };

        self.store.put_patient(&patient).await?;
        tracing::info!(
            "Registered patient {} for ASHA worker {}",
            patient.patient_id,
            patient.asha_worker_id
        );
        Ok(patient)
    }

    /// 获取患者档案
    pub async fn get_patient(&self, patient_id: &str) -> Result<Patient> {
        self.store
            .get_patient(patient_id)
            .await?
            .ok_or_else(|| TriageError::NotFound(format!("Patient {} not found", patient_id)))
    }

    /// 获取ASHA工作者名下的所有患者
    pub async fn list_for_worker(&self, asha_worker_id: &str) -> Result<Vec<Patient>> {
        self.store.query_patients_by_worker(asha_worker_id).await
    }

    /// 按姓名或村庄搜索（忽略大小写）
    pub async fn search(&self, asha_worker_id: &str, query: &str) -> Result<Vec<Patient>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Err(TriageError::Validation("Search query must not be empty".to_string()));
        }

        let patients = self.store.query_patients_by_worker(asha_worker_id).await?;
        Ok(patients
            .into_iter()
            .filter(|p| {
                p.name.to_lowercase().contains(&needle) || p.village.to_lowercase().contains(&needle)
            })
            .collect())
    }

    /// 部分更新患者信息
    pub async fn update(&self, patient_id: &str, update: PatientUpdate) -> Result<Patient> {
        if update.is_empty() {
            return Err(TriageError::Validation("No fields to update".to_string()));
        }

        let mut patient = self.get_patient(patient_id).await?;

        if let Some(conditions) = update.known_conditions {
            patient.known_conditions = conditions;
        }
        if let Some(allergies) = update.known_allergies {
            patient.known_allergies = allergies;
        }
        if let Some(medications) = update.current_medications {
            patient.current_medications = medications;
        }
        if let Some(phone) = update.phone {
            patient.phone = Some(phone);
        }
        if let Some(blood_group) = update.blood_group {
            patient.blood_group = Some(blood_group);
        }

        self.store.put_patient(&patient).await?;
        tracing::info!("Updated patient {}", patient_id);
        Ok(patient)
    }
}

fn validate_registration(registration: &PatientRegistration) -> Result<()> {
    if registration.asha_worker_id.trim().is_empty() {
        return Err(TriageError::Validation("ASHA worker id is required".to_string()));
    }
    if registration.name.trim().is_empty() {
        return Err(TriageError::Validation("Patient name is required".to_string()));
    }
    if registration.village.trim().is_empty() {
        return Err(TriageError::Validation("Village is required".to_string()));
    }
    if registration.age > MAX_PATIENT_AGE {
        return Err(TriageError::Validation(format!(
            "Age {} outside 0-{}",
            registration.age, MAX_PATIENT_AGE
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediconnect_core::{ErrorKind, Sex};
    use mediconnect_database::MemoryStore;
    use std::collections::BTreeSet;

    fn registration(name: &str, village: &str, age: u32) -> PatientRegistration {
        PatientRegistration {
            asha_worker_id: "ASHA-001".to_string(),
            name: name.to_string(),
            age,
            gender: Sex::Female,
            village: village.to_string(),
            block: None,
            district: None,
            phone: Some("+919800000001".to_string()),
            abha_id: None,
            blood_group: None,
            known_conditions: BTreeSet::new(),
            known_allergies: BTreeSet::new(),
            current_medications: BTreeSet::new(),
        }
    }

    fn registry() -> PatientRegistry {
        PatientRegistry::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_register_applies_defaults() {
        let registry = registry();
        let patient = registry.register(registration("Sunita Kumari", "Bikram", 26)).await.unwrap();

        assert!(utils::is_valid_prefixed_id(&patient.patient_id, PATIENT_ID_PREFIX));
        assert_eq!(patient.block.as_deref(), Some(DEFAULT_BLOCK));
        assert_eq!(patient.district.as_deref(), Some(DEFAULT_DISTRICT));
        assert!(patient.known_conditions.is_empty());
        assert!(patient.last_visit_date.is_none());

        let fetched = registry.get_patient(&patient.patient_id).await.unwrap();
        assert_eq!(fetched, patient);
    }

    #[tokio::test]
    async fn test_register_validates_input() {
        let registry = registry();

        let err = registry.register(registration("Old", "Bikram", 121)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = registry.register(registration("  ", "Bikram", 30)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        assert!(registry.register(registration("Newborn", "Bikram", 0)).await.is_ok());
        assert!(registry.register(registration("Elder", "Bikram", 120)).await.is_ok());
    }

    #[tokio::test]
    async fn test_search_by_name_or_village() {
        let registry = registry();
        registry.register(registration("Sunita Kumari", "Bikram", 26)).await.unwrap();
        registry.register(registration("Rekha Devi", "Naubatpur", 34)).await.unwrap();
        registry.register(registration("Meena Kumari", "Paliganj", 41)).await.unwrap();

        let by_name = registry.search("ASHA-001", "KUMARI").await.unwrap();
        assert_eq!(by_name.len(), 2);

        let by_village = registry.search("ASHA-001", "naubat").await.unwrap();
        assert_eq!(by_village.len(), 1);
        assert_eq!(by_village[0].name, "Rekha Devi");

        let other_worker = registry.search("ASHA-002", "Kumari").await.unwrap();
        assert!(other_worker.is_empty());

        let err = registry.search("ASHA-001", " ").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_update_patient() {
        let registry = registry();
        let patient = registry.register(registration("Sunita Kumari", "Bikram", 26)).await.unwrap();

        let err = registry
            .update(&patient.patient_id, PatientUpdate::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let update = PatientUpdate {
            known_allergies: Some(["Penicillin".to_string()].into_iter().collect()),
            blood_group: Some("B+".to_string()),
            ..PatientUpdate::default()
        };
        let updated = registry.update(&patient.patient_id, update).await.unwrap();
        assert!(updated.known_allergies.contains("Penicillin"));
        assert_eq!(updated.blood_group.as_deref(), Some("B+"));
        assert_eq!(updated.phone, patient.phone);

        let err = registry
            .update("PAT-missing0", PatientUpdate { phone: Some("1".into()), ..Default::default() })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_list_for_worker() {
        let registry = registry();
        registry.register(registration("Sunita Kumari", "Bikram", 26)).await.unwrap();
        let mut other = registration("Rekha Devi", "Bikram", 30);
        other.asha_worker_id = "ASHA-002".to_string();
        registry.register(other).await.unwrap();

        let mine = registry.list_for_worker("ASHA-001").await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].name, "Sunita Kumari");
    }
}
