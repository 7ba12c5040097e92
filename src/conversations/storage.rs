use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use uuid::Uuid;

use super::models::*;
use crate::cache::{ListCache, DEFAULT_CACHE_TTL};
use crate::clock::{Clock, SystemClock};
use crate::document::DocumentSchema;
use crate::encryption::FieldCipher;
use crate::storage::{Partition, PartitionedCollection, Result, StoreError};

/// Storage for conversations (one encrypted JSON file per conversation,
/// bucketed by the month it was created)
pub struct ConversationStore {
    collection: PartitionedCollection,
    clock: Arc<dyn Clock>,
    pages: ListCache<Option<String>, ConversationPage>,
}

impl ConversationStore {
    pub fn new(conversations_dir: PathBuf, cipher: Arc<dyn FieldCipher>) -> Result<Self> {
        Self::with_clock(
            conversations_dir,
            cipher,
            Arc::new(SystemClock),
            DEFAULT_CACHE_TTL,
        )
    }

    pub fn with_clock(
        conversations_dir: PathBuf,
        cipher: Arc<dyn FieldCipher>,
        clock: Arc<dyn Clock>,
        cache_ttl: Duration,
    ) -> Result<Self> {
        let schema = DocumentSchema::new(json!({}), SENSITIVE_PATHS)?;
        let collection = PartitionedCollection::with_clock(
            conversations_dir,
            schema,
            cipher,
            Arc::clone(&clock),
        )?;
        Ok(Self {
            collection,
            pages: ListCache::new(Arc::clone(&clock), cache_ttl),
            clock,
        })
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.collection = self.collection.with_page_size(page_size);
        self
    }

    pub fn collection(&self) -> &PartitionedCollection {
        &self.collection
    }

    /// Create and persist an empty conversation
    pub fn create(&self, title: &str) -> Result<Conversation> {
        let conversation = Conversation::new(title.to_string(), self.clock.now());
        self.save(&conversation)?;
        log::info!("Created conversation {}", conversation.id);
        Ok(conversation)
    }

    /// Write a conversation into the partition that already holds it, or the
    /// current one if it is new
    pub fn save(&self, conversation: &Conversation) -> Result<Partition> {
        let value = serde_json::to_value(conversation)?;
        let partition = self.collection.save_file(&conversation.file_name(), &value)?;
        self.pages.invalidate_all();
        Ok(partition)
    }

    pub fn get(&self, id: Uuid) -> Result<Option<Conversation>> {
        let name = file_name(id);
        let partition = match self.collection.locate(&name)? {
            Some(partition) => partition,
            None => return Ok(None),
        };
        match self.collection.get_file(&name, Some(partition))? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    pub fn delete(&self, id: Uuid) -> Result<()> {
        let name = file_name(id);
        let partition = self
            .collection
            .locate(&name)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        self.collection.delete_file(&name, Some(partition))?;
        self.pages.invalidate_all();
        log::info!("Deleted conversation {}", id);
        Ok(())
    }

    pub fn rename(&self, id: Uuid, title: &str) -> Result<Conversation> {
        let title = title.to_string();
        self.modify(id, move |conversation| conversation.title = title)
    }

    pub fn append_message(&self, id: Uuid, message: Message) -> Result<Conversation> {
        self.modify(id, move |conversation| conversation.messages.push(message))
    }

    /// Read-modify-write one conversation under its file lock, bumping
    /// `updated_at`
    fn modify<F>(&self, id: Uuid, change: F) -> Result<Conversation>
    where
        F: FnOnce(&mut Conversation),
    {
        let name = file_name(id);
        let partition = self
            .collection
            .locate(&name)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let now = self.clock.now();

        let written = self.collection.update_file(&name, Some(partition), |doc| {
            let mut conversation: Conversation = serde_json::from_value(doc.take())?;
            change(&mut conversation);
            conversation.updated_at = now;
            *doc = serde_json::to_value(&conversation)?;
            Ok(())
        })?;

        self.pages.invalidate_all();
        Ok(serde_json::from_value(written)?)
    }

    /// One page of summaries, most recently updated first within the page
    pub fn list_page(&self, token: Option<&str>) -> Result<ConversationPage> {
        let key = token.map(str::to_string);
        if let Some(page) = self.pages.get(&key) {
            return Ok(page);
        }

        let listing = self.collection.list_entries(token)?;
        let mut conversations = Vec::with_capacity(listing.entries.len());
        for entry in &listing.entries {
            let Some(id) = id_from_file_name(&entry.name) else {
                log::warn!("Skipping unexpected file in conversations: {}", entry.name);
                continue;
            };
            let loaded = self
                .collection
                .get_file(&entry.name, Some(entry.partition))
                .and_then(|value| match value {
                    Some(value) => Ok(Some(serde_json::from_value::<Conversation>(value)?)),
                    None => Ok(None),
                });
            match loaded {
                Ok(Some(conversation)) => conversations.push(conversation.summary()),
                Ok(None) => {}
                Err(e) => log::warn!("Skipping unreadable conversation {}: {}", id, e),
            }
        }
        conversations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        let page = ConversationPage {
            conversations,
            next_token: listing.next_token,
        };
        self.pages.insert(key, page.clone());
        Ok(page)
    }

    /// Every summary, following page tokens to the end
    pub fn list_all(&self) -> Result<Vec<ConversationSummary>> {
        let mut all = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let page = self.list_page(token.as_deref())?;
            all.extend(page.conversations);
            match page.next_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::encryption::{generate_key, ChaChaFieldCipher};
    use chrono::{TimeZone, Utc};
    use std::collections::HashSet;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_store() -> (ConversationStore, Arc<ManualClock>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 10, 19, 8, 0, 0).unwrap(),
        ));
        let store = ConversationStore::with_clock(
            temp_dir.path().join("conversations"),
            Arc::new(ChaChaFieldCipher::new(generate_key())),
            clock.clone(),
            Duration::from_secs(60),
        )
        .unwrap();
        (store, clock, temp_dir)
    }

    #[test]
    fn test_create_and_get() {
        let (store, _clock, temp) = create_test_store();
        let created = store.create("Rust questions").unwrap();

        let path = temp
            .path()
            .join("conversations")
            .join("2026")
            .join("10")
            .join(created.file_name());
        assert!(path.is_file());
        assert_eq!(store.get(created.id).unwrap(), Some(created));
    }

    #[test]
    fn test_get_missing_is_none_and_delete_missing_is_not_found() {
        let (store, _clock, _temp) = create_test_store();
        let id = Uuid::new_v4();
        assert!(store.get(id).unwrap().is_none());
        assert!(store.delete(id).unwrap_err().is_not_found());
        assert!(store.rename(id, "x").unwrap_err().is_not_found());
    }

    #[test]
    fn test_system_prompt_is_encrypted() {
        let (store, clock, _temp) = create_test_store();
        let mut conversation = store.create("Private").unwrap();
        conversation.system_prompt = Some("my diary says".into());
        store.save(&conversation).unwrap();

        let path = store
            .collection()
            .base_dir()
            .join(clock.now().format("%Y").to_string())
            .join(clock.now().format("%m").to_string())
            .join(conversation.file_name());
        let raw = fs::read_to_string(path).unwrap();
        assert!(!raw.contains("my diary says"));
        assert!(raw.contains("Private"));

        let loaded = store.get(conversation.id).unwrap().unwrap();
        assert_eq!(loaded.system_prompt.as_deref(), Some("my diary says"));
    }

    #[test]
    fn test_updates_stay_in_creation_partition() {
        let (store, clock, _temp) = create_test_store();
        let conversation = store.create("Long running").unwrap();

        clock.set(Utc.with_ymd_and_hms(2026, 12, 2, 8, 0, 0).unwrap());
        let later = clock.now();
        let updated = store
            .append_message(conversation.id, Message::new(Role::User, "still here?", later))
            .unwrap();
        assert_eq!(updated.messages.len(), 1);
        assert_eq!(updated.updated_at, later);

        let renamed = store.rename(conversation.id, "Renamed").unwrap();
        assert_eq!(renamed.title, "Renamed");
        assert_eq!(renamed.messages.len(), 1);

        let partitions = store.collection().partitions().unwrap();
        assert_eq!(partitions, vec!["2026/10".parse::<Partition>().unwrap()]);
    }

    #[test]
    fn test_list_all_spans_partitions() {
        let (store, clock, _temp) = create_test_store();
        let store = store.with_page_size(2);

        let mut expected = HashSet::new();
        for month in [7, 8, 9, 10] {
            clock.set(Utc.with_ymd_and_hms(2026, month, 3, 8, 0, 0).unwrap());
            for i in 0..3 {
                expected.insert(store.create(&format!("{}-{}", month, i)).unwrap().id);
            }
        }

        let first = store.list_page(None).unwrap();
        assert_eq!(first.conversations.len(), 3);
        assert!(first.next_token.is_some());

        let all: HashSet<Uuid> = store.list_all().unwrap().iter().map(|s| s.id).collect();
        assert_eq!(all, expected);
    }

    #[test]
    fn test_mutations_invalidate_cached_pages() {
        let (store, _clock, _temp) = create_test_store();
        let first = store.create("one").unwrap();
        assert_eq!(store.list_page(None).unwrap().conversations.len(), 1);

        store.create("two").unwrap();
        assert_eq!(store.list_page(None).unwrap().conversations.len(), 2);

        store.delete(first.id).unwrap();
        let page = store.list_page(None).unwrap();
        assert_eq!(page.conversations.len(), 1);
        assert_eq!(page.conversations[0].title, "two");
    }

    #[test]
    fn test_unrelated_files_are_skipped_in_listing() {
        let (store, _clock, _temp) = create_test_store();
        let conversation = store.create("real").unwrap();
        let dir = store.collection().base_dir().join("2026").join("10");
        fs::write(dir.join("notes.json"), "{}").unwrap();

        let page = store.list_page(None).unwrap();
        assert_eq!(page.conversations.len(), 1);
        assert_eq!(page.conversations[0].id, conversation.id);
    }

    #[test]
    fn test_listing_reads_from_the_listed_partition() {
        let (store, _clock, _temp) = create_test_store();
        let conversation = store.create("october").unwrap();

        let base = store.collection().base_dir().to_path_buf();
        fs::create_dir_all(base.join("2026").join("12")).unwrap();
        // A corrupt copy in a newer partition must not shadow the listed one.
        fs::write(
            base.join("2026").join("12").join(conversation.file_name()),
            "{ not json",
        )
        .unwrap();

        let page = store.list_page(None).unwrap();
        assert_eq!(page.conversations.len(), 1);
        assert_eq!(page.conversations[0].id, conversation.id);
    }

    #[test]
    fn test_concurrent_saves_from_two_stores_keep_one_copy() {
        let temp_dir = TempDir::new().unwrap();
        let cipher: Arc<dyn FieldCipher> = Arc::new(ChaChaFieldCipher::new(generate_key()));
        let open = |month: u32| {
            let clock = Arc::new(ManualClock::new(
                Utc.with_ymd_and_hms(2026, month, 19, 8, 0, 0).unwrap(),
            ));
            ConversationStore::with_clock(
                temp_dir.path().join("conversations"),
                Arc::clone(&cipher),
                clock,
                Duration::from_secs(60),
            )
            .unwrap()
        };
        let stores = Arc::new([open(10), open(11)]);

        for _ in 0..10 {
            let conversation = Conversation::new(
                "shared".to_string(),
                Utc.with_ymd_and_hms(2026, 10, 19, 8, 0, 0).unwrap(),
            );
            let handles: Vec<_> = (0..2)
                .map(|i| {
                    let stores = Arc::clone(&stores);
                    let conversation = conversation.clone();
                    std::thread::spawn(move || stores[i].save(&conversation).unwrap())
                })
                .collect();
            let partitions: HashSet<Partition> =
                handles.into_iter().map(|h| h.join().unwrap()).collect();
            assert_eq!(partitions.len(), 1);
        }

        assert_eq!(stores[0].list_all().unwrap().len(), 10);
    }
}
