use std::sync::Mutex;

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use guard::store::RecordStream;
use guard::{
    BlockListConfig, Form, FormId, FormStore, GuardError, RejectionLog, RejectionRecord,
    SettingsStore,
};
use miette::{Context, IntoDiagnostic, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;
use ulid::Generator;

use super::write_atomic;

/// Settings as they sit on disk: the domain list stays one comma-separated
/// string, exactly as the administrator typed it.
#[derive(Serialize, Deserialize)]
struct StoredOptions {
    domains: String,
    message: String,
}

/// Keeps settings, forms and rejections under one directory:
///
/// ```text
/// <base>/options.json
/// <base>/forms/<form id>.json
/// <base>/failed_emails/<ulid>.json
/// ```
pub struct FileSystemStorage {
    base_path: Utf8PathBuf,
    ids: Mutex<Generator>,
}

impl FileSystemStorage {
    pub async fn new<P: AsRef<Utf8Path>>(base_path: P) -> Result<Self> {
        let base_path = base_path.as_ref();
        for dir in [base_path.to_owned(), base_path.join("forms"), base_path.join("failed_emails")] {
            fs::create_dir_all(&dir)
                .await
                .into_diagnostic()
                .wrap_err_with(|| format!("creating {}", dir))?;
        }

        Ok(FileSystemStorage {
            base_path: base_path.to_owned(),
            ids: Mutex::new(Generator::new()),
        })
    }

    fn options_path(&self) -> Utf8PathBuf {
        self.base_path.join("options.json")
    }

    fn form_path(&self, id: &FormId) -> Result<Utf8PathBuf> {
        let valid = !id.as_str().is_empty()
            && id
                .as_str()
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(GuardError::Storage {
                message: format!("form id '{}' cannot be used as a file name", id),
            }
            .into());
        }
        Ok(self.base_path.join("forms").join(format!("{}.json", id)))
    }

    fn log_dir(&self) -> Utf8PathBuf {
        self.base_path.join("failed_emails")
    }

    fn next_record_key(&self) -> Result<String> {
        let mut ids = self.ids.lock().map_err(|_| GuardError::Storage {
            message: "record id generator lock poisoned".to_string(),
        })?;
        let id = ids.generate().map_err(|e| GuardError::Storage {
            message: format!("generating record id: {}", e),
        })?;
        Ok(id.to_string())
    }
}

#[async_trait]
impl SettingsStore for FileSystemStorage {
    async fn load_block_list(&self) -> Result<Option<BlockListConfig>> {
        let path = self.options_path();
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path).await.into_diagnostic()?;
        let options: StoredOptions = serde_json::from_str(&contents)
            .into_diagnostic()
            .wrap_err_with(|| format!("parsing {}", path))?;
        Ok(Some(BlockListConfig::from_csv(&options.domains, options.message)))
    }

    async fn save_block_list(&self, config: &BlockListConfig) -> Result<()> {
        let options = StoredOptions {
            domains: config.domains_csv(),
            message: config.rejection_message.clone(),
        };
        let json = serde_json::to_vec_pretty(&options).into_diagnostic()?;
        write_atomic(&self.options_path(), &json).await
    }
}

#[async_trait]
impl FormStore for FileSystemStorage {
    async fn get_form(&self, id: &FormId) -> Result<Option<Form>> {
        let path = self.form_path(id)?;
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path).await.into_diagnostic()?;
        Ok(Some(Form::from_json(path.as_str(), &contents)?))
    }

    async fn put_form(&self, form: &Form) -> Result<()> {
        let path = self.form_path(&form.id)?;
        let json = serde_json::to_vec_pretty(form).into_diagnostic()?;
        write_atomic(&path, &json).await
    }
}

#[async_trait]
impl RejectionLog for FileSystemStorage {
    async fn append(&self, record: &RejectionRecord) -> Result<()> {
        let key = self.next_record_key()?;
        let path = self.log_dir().join(format!("{}.json", key));
        let json = serde_json::to_vec(record).into_diagnostic()?;
        write_atomic(&path, &json)
            .await
            .wrap_err("appending rejection record")
    }

    fn list(&self) -> RecordStream {
        let dir = self.log_dir();
        Box::pin(async_stream::try_stream! {
            let mut paths = Vec::new();
            let mut entries = fs::read_dir(&dir).await.into_diagnostic()?;
            while let Some(entry) = entries.next_entry().await.into_diagnostic()? {
                if let Ok(path) = Utf8PathBuf::from_path_buf(entry.path()) {
                    if path.extension() == Some("json") {
                        paths.push(path);
                    }
                }
            }
            // ULID file names sort in write order for a single writing process.
            paths.sort();

            for path in paths {
                let contents = fs::read_to_string(&path).await.into_diagnostic()?;
                let record: RejectionRecord = serde_json::from_str(&contents)
                    .into_diagnostic()
                    .wrap_err_with(|| format!("parsing {}", path))?;
                yield record;
            }
        })
    }
}
