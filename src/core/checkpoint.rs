use crate::config::TelephoneFormat;
use crate::core::dataset;
use crate::domain::model::{Area, EnrichedRecord, ListingRecord, Stage};
use crate::domain::ports::Storage;
use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    NotStarted,
    Complete,
}

/// Written next to a stage's data file once that file is fully on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageState {
    pub area: String,
    pub stage: Stage,
    pub status: StageStatus,
    pub records: usize,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Per-area, per-stage persistence under `data_dir/<area>/`.
pub struct CheckpointStore<S: Storage> {
    storage: S,
    data_dir: String,
    search_word: String,
}

impl<S: Storage> CheckpointStore<S> {
    pub fn new(storage: S, data_dir: impl Into<String>, search_word: impl Into<String>) -> Self {
        Self {
            storage,
            data_dir: data_dir.into(),
            search_word: search_word.into(),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn data_dir(&self) -> &str {
        &self.data_dir
    }

    fn file_stem(&self, stage: Stage) -> String {
        match stage {
            Stage::Raw => self.search_word.clone(),
            Stage::Enriched => format!("{}_kw", self.search_word),
        }
    }

    fn data_path_in(&self, dir: &str, stage: Stage) -> String {
        format!("{}/{}/{}.csv", self.data_dir, dir, self.file_stem(stage))
    }

    fn state_path_in(&self, dir: &str, stage: Stage) -> String {
        format!("{}/{}/{}.state.json", self.data_dir, dir, self.file_stem(stage))
    }

    pub fn data_path(&self, area: &Area, stage: Stage) -> String {
        self.data_path_in(&area.dir_name(), stage)
    }

    pub fn state_path(&self, area: &Area, stage: Stage) -> String {
        self.state_path_in(&area.dir_name(), stage)
    }

    async fn read_state_in(&self, dir: &str, stage: Stage) -> Result<Option<StageState>> {
        let state_path = self.state_path_in(dir, stage);
        if !self.storage.exists(&state_path).await? {
            return Ok(None);
        }
        let bytes = self.storage.read_file(&state_path).await?;
        let state: StageState = match serde_json::from_slice(&bytes) {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(
                    "Unreadable state record {} ({}), treating {} as not started",
                    state_path,
                    e,
                    stage
                );
                return Ok(None);
            }
        };

        if state.status == StageStatus::Complete
            && !self.storage.exists(&self.data_path_in(dir, stage)).await?
        {
            tracing::warn!(
                "State for {} marks {} complete but its data file is missing, treating as not started",
                state.area,
                stage
            );
            return Ok(None);
        }
        Ok(Some(state))
    }

    pub async fn status(&self, area: &Area, stage: Stage) -> Result<StageStatus> {
        Ok(self
            .read_state_in(&area.dir_name(), stage)
            .await?
            .map(|s| s.status)
            .unwrap_or(StageStatus::NotStarted))
    }

    pub async fn is_complete(&self, area: &Area, stage: Stage) -> Result<bool> {
        Ok(self.status(area, stage).await? == StageStatus::Complete)
    }

    async fn mark_complete(&self, area: &Area, stage: Stage, records: usize) -> Result<()> {
        let state = StageState {
            area: area.name().to_string(),
            stage,
            status: StageStatus::Complete,
            records,
            completed_at: Some(Utc::now()),
        };
        let bytes = serde_json::to_vec_pretty(&state)?;
        self.storage
            .write_file(&self.state_path(area, stage), &bytes)
            .await
    }

    pub async fn write_raw(&self, area: &Area, records: &[ListingRecord]) -> Result<()> {
        let bytes = dataset::encode_listings(records)?;
        self.storage
            .write_file(&self.data_path(area, Stage::Raw), &bytes)
            .await?;
        self.mark_complete(area, Stage::Raw, records.len()).await
    }

    pub async fn read_raw(&self, area: &Area) -> Result<Vec<ListingRecord>> {
        let bytes = self
            .storage
            .read_file(&self.data_path(area, Stage::Raw))
            .await?;
        dataset::decode_listings(&bytes)
    }

    pub async fn write_enriched(
        &self,
        area: &Area,
        records: &[EnrichedRecord],
        keywords: &[String],
    ) -> Result<()> {
        let bytes = dataset::encode_enriched(records, keywords, TelephoneFormat::Plain)?;
        self.storage
            .write_file(&self.data_path(area, Stage::Enriched), &bytes)
            .await?;
        self.mark_complete(area, Stage::Enriched, records.len())
            .await
    }

    pub async fn read_enriched(&self, area: &Area) -> Result<Vec<EnrichedRecord>> {
        let bytes = self
            .storage
            .read_file(&self.data_path(area, Stage::Enriched))
            .await?;
        dataset::decode_enriched(&bytes)
    }

    /// Every area on disk whose `stage` is complete, ordered by directory name.
    pub async fn completed_areas(&self, stage: Stage) -> Result<Vec<Area>> {
        if !self.storage.exists(&self.data_dir).await? {
            return Ok(Vec::new());
        }

        let mut areas = Vec::new();
        for dir in self.storage.list_dirs(&self.data_dir).await? {
            if let Some(state) = self.read_state_in(&dir, stage).await? {
                if state.status == StageStatus::Complete {
                    areas.push(Area::new(state.area));
                }
            }
        }
        Ok(areas)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::model::KeywordFlag;
    use crate::utils::error::HarvestError;
    use std::collections::{BTreeSet, HashMap};
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    pub(crate) struct MockStorage {
        pub files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }

        pub async fn remove_file(&self, path: &str) {
            self.files.lock().await.remove(path);
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                HarvestError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }

        async fn exists(&self, path: &str) -> Result<bool> {
            let files = self.files.lock().await;
            let dir_prefix = format!("{}/", path);
            Ok(files
                .keys()
                .any(|k| k == path || k.starts_with(&dir_prefix)))
        }

        async fn list_dirs(&self, path: &str) -> Result<Vec<String>> {
            let files = self.files.lock().await;
            let prefix = format!("{}/", path);
            let dirs: BTreeSet<String> = files
                .keys()
                .filter_map(|k| k.strip_prefix(&prefix))
                .filter_map(|rest| rest.split_once('/').map(|(dir, _)| dir.to_string()))
                .collect();
            Ok(dirs.into_iter().collect())
        }
    }

    fn listing(telephone: &str) -> ListingRecord {
        ListingRecord {
            business_name: Some("Paws & Claws".to_string()),
            address: Some("2 Market Street".to_string()),
            telephone: Some(telephone.to_string()),
            website: Some("https://paws.example.com".to_string()),
            listing_url: Some("https://www.yell.com/biz/paws-and-claws-leeds-123/".to_string()),
        }
    }

    #[tokio::test]
    async fn test_layout_follows_area_and_search_word() {
        let store = CheckpointStore::new(MockStorage::new(), "data", "pet_shop");
        let area = Area::new("Leeds");
        assert_eq!(store.data_path(&area, Stage::Raw), "data/Leeds/pet_shop.csv");
        assert_eq!(
            store.data_path(&area, Stage::Enriched),
            "data/Leeds/pet_shop_kw.csv"
        );
        assert_eq!(
            store.state_path(&area, Stage::Enriched),
            "data/Leeds/pet_shop_kw.state.json"
        );
    }

    #[tokio::test]
    async fn test_write_raw_marks_stage_complete() {
        let storage = MockStorage::new();
        let store = CheckpointStore::new(storage.clone(), "data", "pet_shop");
        let area = Area::new("Leeds");

        assert_eq!(
            store.status(&area, Stage::Raw).await.unwrap(),
            StageStatus::NotStarted
        );

        store.write_raw(&area, &[listing("01132345678")]).await.unwrap();

        assert!(store.is_complete(&area, Stage::Raw).await.unwrap());
        assert!(!store.is_complete(&area, Stage::Enriched).await.unwrap());

        let state: StageState = serde_json::from_slice(
            &storage
                .get_file("data/Leeds/pet_shop.state.json")
                .await
                .unwrap(),
        )
        .unwrap();
        assert_eq!(state.records, 1);
        assert_eq!(state.area, "Leeds");

        let read = store.read_raw(&area).await.unwrap();
        assert_eq!(read[0].telephone.as_deref(), Some("01132345678"));
    }

    #[tokio::test]
    async fn test_missing_data_file_resets_stage() {
        let storage = MockStorage::new();
        let store = CheckpointStore::new(storage.clone(), "data", "pet_shop");
        let area = Area::new("Leeds");

        store.write_raw(&area, &[listing("01132345678")]).await.unwrap();
        storage.remove_file("data/Leeds/pet_shop.csv").await;

        assert!(!store.is_complete(&area, Stage::Raw).await.unwrap());
    }

    #[tokio::test]
    async fn test_truncated_state_record_counts_as_not_started() {
        let storage = MockStorage::new();
        let store = CheckpointStore::new(storage.clone(), "data", "pet_shop");
        let area = Area::new("Bath");

        store.write_raw(&area, &[listing("01225000000")]).await.unwrap();
        storage
            .write_file("data/Bath/pet_shop.state.json", br#"{"area":"Ba"#)
            .await
            .unwrap();

        assert_eq!(
            store.status(&area, Stage::Raw).await.unwrap(),
            StageStatus::NotStarted
        );
        assert!(store.completed_areas(Stage::Raw).await.unwrap().is_empty());

        store.write_raw(&area, &[listing("01225000000")]).await.unwrap();
        assert!(store.is_complete(&area, Stage::Raw).await.unwrap());
    }

    #[tokio::test]
    async fn test_completed_areas_reads_state_names() {
        let store = CheckpointStore::new(MockStorage::new(), "data", "pet_shop");
        let keywords = vec!["dog".to_string()];
        let enriched = EnrichedRecord {
            listing: listing("01132345678"),
            flags: vec![KeywordFlag {
                keyword: "dog".to_string(),
                present: true,
            }],
        };

        assert!(store
            .completed_areas(Stage::Enriched)
            .await
            .unwrap()
            .is_empty());

        for name in ["York", "Newcastle/Gateshead"] {
            let area = Area::new(name);
            store.write_raw(&area, &[listing("01132345678")]).await.unwrap();
            store
                .write_enriched(&area, &[enriched.clone()], &keywords)
                .await
                .unwrap();
        }
        store
            .write_raw(&Area::new("Bath"), &[listing("01225000000")])
            .await
            .unwrap();

        let areas = store.completed_areas(Stage::Enriched).await.unwrap();
        assert_eq!(
            areas,
            vec![Area::new("Newcastle/Gateshead"), Area::new("York")]
        );
        assert_eq!(store.completed_areas(Stage::Raw).await.unwrap().len(), 3);
    }
}
