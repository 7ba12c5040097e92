use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;

use super::collection::{DocumentAccess, ListPage};
use super::cursor::PageToken;
use super::errors::{Result, StoreError};
use super::fs::{ensure_dir, list_document_names, validate_file_name};
use super::locks::PathLocks;
use super::partition::Partition;
use crate::clock::{Clock, SystemClock};
use crate::document::DocumentSchema;
use crate::encryption::FieldCipher;

/// Default number of names after which a listing page is closed
pub const PAGE_SIZE: usize = 25;

/// A document name together with the partition it was found in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionedEntry {
    pub partition: Partition,
    pub name: String,
}

/// One page of a cross-partition listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryPage {
    pub entries: Vec<PartitionedEntry>,
    pub next_token: Option<String>,
}

/// Documents bucketed into `<base>/<YYYY>/<MM>/` by creation month.
///
/// Operations without an explicit partition act on the current month
/// according to the injected clock. An explicit partition is an
/// administrative override and must already exist on disk.
#[derive(Clone)]
pub struct PartitionedCollection {
    base_dir: PathBuf,
    access: DocumentAccess,
    clock: Arc<dyn Clock>,
    page_size: usize,
}

impl PartitionedCollection {
    pub fn new(
        base_dir: PathBuf,
        schema: DocumentSchema,
        cipher: Arc<dyn FieldCipher>,
    ) -> Result<Self> {
        Self::with_clock(base_dir, schema, cipher, Arc::new(SystemClock))
    }

    pub fn with_clock(
        base_dir: PathBuf,
        schema: DocumentSchema,
        cipher: Arc<dyn FieldCipher>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        ensure_dir(&base_dir)?;
        Ok(Self {
            base_dir,
            access: DocumentAccess::new(schema, cipher),
            clock,
            page_size: PAGE_SIZE,
        })
    }

    /// Override the page size (minimum 1)
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn schema(&self) -> &DocumentSchema {
        self.access.schema()
    }

    pub fn current_partition(&self) -> Partition {
        Partition::containing(self.clock.now())
    }

    fn partition_dir(&self, partition: &Partition) -> PathBuf {
        self.base_dir.join(partition.relative_dir())
    }

    fn existing_partition_dir(&self, partition: &Partition) -> Result<PathBuf> {
        let dir = self.partition_dir(partition);
        if !dir.is_dir() {
            return Err(StoreError::Partition(format!(
                "partition {} does not exist",
                partition
            )));
        }
        Ok(dir)
    }

    /// Directory an operation targets: an explicit, existing partition or the
    /// current month.
    fn resolve(&self, partition: Option<Partition>) -> Result<(Partition, PathBuf)> {
        match partition {
            Some(partition) => Ok((partition, self.existing_partition_dir(&partition)?)),
            None => {
                let current = self.current_partition();
                let dir = self.partition_dir(&current);
                Ok((current, dir))
            }
        }
    }

    /// Create or replace a document; returns the partition it was written to
    pub fn add_file(
        &self,
        name: &str,
        data: &Value,
        partition: Option<Partition>,
    ) -> Result<Partition> {
        validate_file_name(name)?;
        let (partition, dir) = self.resolve(partition)?;
        ensure_dir(&dir)?;
        self.access.write(dir.join(name), data)?;
        log::debug!("Stored {} in partition {}", name, partition);
        Ok(partition)
    }

    /// Write a document into the partition that already holds it, or the
    /// current one if it is new.
    ///
    /// The lookup and the write run under one lock per name, so concurrent
    /// savers of the same name (even through different handles, or with
    /// clocks in different months) never leave copies in two partitions.
    pub fn save_file(&self, name: &str, data: &Value) -> Result<Partition> {
        validate_file_name(name)?;
        PathLocks::global().with_lock(&self.base_dir.join(name), || {
            let existing = self.locate(name)?;
            self.add_file(name, data, existing)
        })
    }

    pub fn get_file(&self, name: &str, partition: Option<Partition>) -> Result<Option<Value>> {
        validate_file_name(name)?;
        let (_, dir) = self.resolve(partition)?;
        self.access.read(dir.join(name))
    }

    /// Read-modify-write under the document's lock, starting from the schema
    /// defaults when the document does not exist yet.
    pub fn update_file<F>(&self, name: &str, partition: Option<Partition>, apply: F) -> Result<Value>
    where
        F: FnOnce(&mut Value) -> Result<()>,
    {
        validate_file_name(name)?;
        let (_, dir) = self.resolve(partition)?;
        self.access.update(dir.join(name), apply)
    }

    pub fn delete_file(&self, name: &str, partition: Option<Partition>) -> Result<()> {
        validate_file_name(name)?;
        let (_, dir) = self.resolve(partition)?;
        self.access.delete(dir.join(name), name)
    }

    /// Existing partitions, newest first
    pub fn partitions(&self) -> Result<Vec<Partition>> {
        let mut partitions = Vec::new();

        for year_entry in fs::read_dir(&self.base_dir)? {
            let year_entry = year_entry?;
            if !year_entry.file_type()?.is_dir() {
                continue;
            }
            let year_name = year_entry.file_name();
            let year_name = match year_name.to_str() {
                Some(name) => name,
                None => continue,
            };

            for month_entry in fs::read_dir(year_entry.path())? {
                let month_entry = month_entry?;
                if !month_entry.file_type()?.is_dir() {
                    continue;
                }
                let month_name = month_entry.file_name();
                if let Some(partition) = month_name
                    .to_str()
                    .and_then(|month| Partition::from_dir_names(year_name, month))
                {
                    partitions.push(partition);
                }
            }
        }

        partitions.sort_by(|a, b| b.cmp(a));
        Ok(partitions)
    }

    /// Find the partition holding `name`, searching newest first
    pub fn locate(&self, name: &str) -> Result<Option<Partition>> {
        validate_file_name(name)?;
        for partition in self.partitions()? {
            if self.partition_dir(&partition).join(name).is_file() {
                return Ok(Some(partition));
            }
        }
        Ok(None)
    }

    /// List document names.
    ///
    /// With an explicit partition, returns that partition's names unpaged.
    /// Otherwise pages across partitions like [`list_entries`](Self::list_entries).
    pub fn list_files(
        &self,
        token: Option<&str>,
        partition: Option<Partition>,
    ) -> Result<ListPage> {
        if let Some(partition) = partition {
            let dir = self.existing_partition_dir(&partition)?;
            return Ok(ListPage {
                files: list_document_names(&dir)?,
                next_token: None,
            });
        }

        let page = self.list_entries(token)?;
        Ok(ListPage {
            files: page.entries.into_iter().map(|entry| entry.name).collect(),
            next_token: page.next_token,
        })
    }

    /// Walk partitions newest first from the position in `token`, closing
    /// the page once at least `page_size` entries have accumulated.
    ///
    /// Partitions are never split across pages, so one page can hold more
    /// than `page_size` entries when a single partition is large.
    pub fn list_entries(&self, token: Option<&str>) -> Result<EntryPage> {
        let partitions = self.partitions()?;
        let (start, mut skip) = match token {
            Some(raw) => {
                let token = PageToken::decode(raw)?;
                (token.resolve(&partitions)?, token.offset)
            }
            None => (0, 0),
        };

        let mut entries = Vec::new();
        for (index, partition) in partitions.iter().enumerate().skip(start) {
            let names = list_document_names(&self.partition_dir(partition))?;
            entries.extend(names.into_iter().skip(skip).map(|name| PartitionedEntry {
                partition: *partition,
                name,
            }));
            skip = 0;

            if entries.len() >= self.page_size {
                let next = index + 1;
                let next_token = partitions
                    .get(next)
                    .map(|p| PageToken::new(next, *p, 0).encode());
                return Ok(EntryPage {
                    entries,
                    next_token,
                });
            }
        }

        Ok(EntryPage {
            entries,
            next_token: None,
        })
    }
}
