use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::Stream;
use miette::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::blocklist::BlockListConfig;
use crate::form::{Form, FormId};

/// One blocked submission attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectionRecord {
    pub email: String,
    pub time: String,
    pub form_id: FormId,
}

pub type RecordStream = Pin<Box<dyn Stream<Item = Result<RejectionRecord>> + Send>>;

/// Where the administrator's block-list lives.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// `None` until an administrator has saved settings at least once.
    async fn load_block_list(&self) -> Result<Option<BlockListConfig>>;
    /// Replaces domains and message together.
    async fn save_block_list(&self, config: &BlockListConfig) -> Result<()>;
}

/// Form definitions owned by the host, including the per-form toggle.
#[async_trait]
pub trait FormStore: Send + Sync {
    async fn get_form(&self, id: &FormId) -> Result<Option<Form>>;
    async fn put_form(&self, form: &Form) -> Result<()>;
}

/// Append-only record of rejections.
#[async_trait]
pub trait RejectionLog: Send + Sync {
    /// Inserts a single record without touching the ones already stored.
    async fn append(&self, record: &RejectionRecord) -> Result<()>;
    /// All records, oldest first. Ordering is only as good as the store's
    /// notion of time: stores shared by several writer processes may list
    /// records written within the same instant in either order.
    fn list(&self) -> RecordStream;
}

/// Keeps everything in process memory. Handy for hosts that persist
/// elsewhere and for tests.
#[derive(Clone, Default)]
pub struct MemoryStore {
    block_list: Arc<Mutex<Option<BlockListConfig>>>,
    forms: Arc<Mutex<HashMap<FormId, Form>>>,
    records: Arc<Mutex<Vec<RejectionRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn load_block_list(&self) -> Result<Option<BlockListConfig>> {
        Ok(self.block_list.lock().await.clone())
    }

    async fn save_block_list(&self, config: &BlockListConfig) -> Result<()> {
        *self.block_list.lock().await = Some(config.clone());
        Ok(())
    }
}

#[async_trait]
impl FormStore for MemoryStore {
    async fn get_form(&self, id: &FormId) -> Result<Option<Form>> {
        Ok(self.forms.lock().await.get(id).cloned())
    }

    async fn put_form(&self, form: &Form) -> Result<()> {
        self.forms
            .lock()
            .await
            .insert(form.id.clone(), form.clone());
        Ok(())
    }
}

#[async_trait]
impl RejectionLog for MemoryStore {
    async fn append(&self, record: &RejectionRecord) -> Result<()> {
        self.records.lock().await.push(record.clone());
        Ok(())
    }

    fn list(&self) -> RecordStream {
        let records = self.records.clone();
        Box::pin(async_stream::stream! {
            let snapshot = records.lock().await.clone();
            for record in snapshot {
                yield Ok::<_, miette::Report>(record);
            }
        })
    }
}
