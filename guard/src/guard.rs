use std::sync::Arc;

use futures::TryStreamExt;
use miette::Result;
use tracing::{debug, error, info, warn};

use crate::blocklist::BlockListConfig;
use crate::clock::{Clock, LocalClock};
use crate::form::{Field, Form, FormId, FormSettings};
use crate::store::{FormStore, RejectionLog, RejectionRecord, SettingsStore};
use crate::validator::{check_field, extract_domain, Outcome};
use crate::GuardError;

/// Outcome for one field of a submitted form, by position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldOutcome {
    pub index: usize,
    pub outcome: Outcome,
}

/// The entry point a host calls from its validation pipeline, plus the
/// handful of administrator operations that go with it.
pub struct EmailGuard {
    settings: Arc<dyn SettingsStore>,
    forms: Arc<dyn FormStore>,
    log: Arc<dyn RejectionLog>,
    clock: Arc<dyn Clock>,
    defaults: BlockListConfig,
}

impl EmailGuard {
    pub fn new(
        settings: Arc<dyn SettingsStore>,
        forms: Arc<dyn FormStore>,
        log: Arc<dyn RejectionLog>,
    ) -> Self {
        EmailGuard {
            settings,
            forms,
            log,
            clock: Arc::new(LocalClock),
            defaults: BlockListConfig::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the built-in list used while nothing has been saved.
    pub fn with_defaults(mut self, defaults: BlockListConfig) -> Self {
        self.defaults = defaults;
        self
    }

    /// Saved block-list, or the defaults if none was ever saved.
    pub async fn block_list(&self) -> Result<BlockListConfig> {
        Ok(self
            .settings
            .load_block_list()
            .await?
            .unwrap_or_else(|| self.defaults.clone()))
    }

    /// Stores a settings-page submission: a comma-separated domain list and
    /// the rejection message.
    pub async fn save_block_list(&self, domains: &str, message: &str) -> Result<BlockListConfig> {
        let config = BlockListConfig::from_csv(domains, message);
        self.settings.save_block_list(&config).await?;
        info!(domains = config.domains.len(), "saved email block-list");
        Ok(config)
    }

    pub async fn form(&self, id: &FormId) -> Result<Form> {
        self.forms
            .get_form(id)
            .await?
            .ok_or_else(|| GuardError::FormNotFound(id.clone()).into())
    }

    /// Saves a form's settings page. `checkbox` is the submitted value of the
    /// blocker checkbox, absent when it was left unticked.
    pub async fn save_form_settings(&self, id: &FormId, checkbox: Option<&str>) -> Result<Form> {
        let mut form = self.form(id).await?;
        form.settings = FormSettings::from_checkbox(checkbox);
        self.forms.put_form(&form).await?;
        info!(form_id = %id, enabled = form.is_enabled(), "updated email blocker toggle");
        Ok(form)
    }

    /// Flips the per-form toggle and persists the form.
    pub async fn set_form_enabled(&self, id: &FormId, enabled: bool) -> Result<Form> {
        self.save_form_settings(id, enabled.then_some("1")).await
    }

    /// Validates one field of `form`. A denial is recorded in the rejection
    /// log; failing to record it is logged but does not change the verdict.
    pub async fn validate_field(&self, form: &Form, field: &Field) -> Result<Outcome> {
        if !form.is_enabled() || !field.is_email() {
            return Ok(Outcome::Allow);
        }

        let config = self.block_list().await?;
        let outcome = check_field(form, field, &config);
        debug!(form_id = %form.id, valid = outcome.is_valid(), "checked email field");

        if let Outcome::Deny(_) = outcome {
            warn!(
                form_id = %form.id,
                email = %field.value,
                domain = extract_domain(&field.value).unwrap_or_default(),
                "rejected submission from blocked domain"
            );
            let record = RejectionRecord {
                email: field.value.clone(),
                time: self.clock.now(),
                form_id: form.id.clone(),
            };
            if let Err(e) = self.log.append(&record).await {
                error!(form_id = %form.id, error = ?e, "failed to record rejected email");
            }
        }

        Ok(outcome)
    }

    /// Validates every field of a submission in order.
    pub async fn validate_form(&self, form: &Form) -> Result<Vec<FieldOutcome>> {
        let mut outcomes = Vec::with_capacity(form.fields.len());
        for (index, field) in form.fields.iter().enumerate() {
            let outcome = self.validate_field(form, field).await?;
            outcomes.push(FieldOutcome { index, outcome });
        }
        Ok(outcomes)
    }

    pub async fn rejections(&self) -> Result<Vec<RejectionRecord>> {
        self.log.list().try_collect().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocklist::DEFAULT_MESSAGE;
    use crate::form::FieldType;
    use crate::store::{MemoryStore, RecordStream};
    use async_trait::async_trait;
    use miette::miette;

    struct FixedClock;

    impl Clock for FixedClock {
        fn now(&self) -> String {
            "2024-05-01 10:00:00".to_string()
        }
    }

    struct BrokenLog;

    #[async_trait]
    impl RejectionLog for BrokenLog {
        async fn append(&self, _record: &RejectionRecord) -> Result<()> {
            Err(miette!("disk full"))
        }

        fn list(&self) -> RecordStream {
            Box::pin(futures::stream::empty::<Result<RejectionRecord>>())
        }
    }

    fn create_test_guard(store: &MemoryStore) -> EmailGuard {
        let store = Arc::new(store.clone());
        EmailGuard::new(store.clone(), store.clone(), store).with_clock(Arc::new(FixedClock))
    }

    fn enabled_form(id: &str) -> Form {
        let mut form = Form::new(id);
        form.set_enabled(true);
        form
    }

    #[tokio::test]
    async fn test_defaults_when_unset() {
        let store = MemoryStore::new();
        let guard = create_test_guard(&store);
        assert_eq!(guard.block_list().await.unwrap(), BlockListConfig::default());
    }

    #[tokio::test]
    async fn test_custom_defaults_when_unset() {
        let store = MemoryStore::new();
        let guard = create_test_guard(&store)
            .with_defaults(BlockListConfig::from_csv("example.org", "no"));
        let cfg = guard.block_list().await.unwrap();
        assert_eq!(cfg.domains, vec!["example.org"]);
    }

    #[tokio::test]
    async fn test_saved_settings_win() {
        let store = MemoryStore::new();
        let guard = create_test_guard(&store);
        guard
            .save_block_list("gmail.com, yahoo.com", "Use a work email.")
            .await
            .unwrap();
        let cfg = guard.block_list().await.unwrap();
        assert_eq!(cfg.domains, vec!["gmail.com", "yahoo.com"]);
        assert_eq!(cfg.rejection_message, "Use a work email.");
    }

    #[tokio::test]
    async fn test_blocked_email_rejected_and_logged() {
        let store = MemoryStore::new();
        let guard = create_test_guard(&store);
        guard
            .save_block_list("gmail.com,yahoo.com", DEFAULT_MESSAGE)
            .await
            .unwrap();

        let form = enabled_form("12");
        let outcome = guard
            .validate_field(&form, &Field::email("user@gmail.com"))
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Deny(DEFAULT_MESSAGE.to_string()));

        let records = guard.rejections().await.unwrap();
        assert_eq!(
            records,
            vec![RejectionRecord {
                email: "user@gmail.com".to_string(),
                time: "2024-05-01 10:00:00".to_string(),
                form_id: FormId::from("12"),
            }]
        );
    }

    #[tokio::test]
    async fn test_allowed_email_not_logged() {
        let store = MemoryStore::new();
        let guard = create_test_guard(&store);
        guard
            .save_block_list("gmail.com,yahoo.com", DEFAULT_MESSAGE)
            .await
            .unwrap();

        let outcome = guard
            .validate_field(&enabled_form("12"), &Field::email("user@company.com"))
            .await
            .unwrap();
        assert!(outcome.is_valid());
        assert!(guard.rejections().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_disabled_form_not_logged() {
        let store = MemoryStore::new();
        let guard = create_test_guard(&store);

        let outcome = guard
            .validate_field(&Form::new("3"), &Field::email("user@gmail.com"))
            .await
            .unwrap();
        assert!(outcome.is_valid());
        assert!(guard.rejections().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_each_rejection_logged_once() {
        let store = MemoryStore::new();
        let guard = create_test_guard(&store);
        let form = enabled_form("4");
        let field = Field::email("someone@aol.com");

        let first = guard.validate_field(&form, &field).await.unwrap();
        let second = guard.validate_field(&form, &field).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(guard.rejections().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_list_blocks_nothing() {
        let store = MemoryStore::new();
        let guard = create_test_guard(&store);
        guard.save_block_list("", DEFAULT_MESSAGE).await.unwrap();

        let outcome = guard
            .validate_field(&enabled_form("4"), &Field::email("user@gmail.com"))
            .await
            .unwrap();
        assert!(outcome.is_valid());
    }

    #[tokio::test]
    async fn test_validate_form_checks_every_field() {
        let store = MemoryStore::new();
        let guard = create_test_guard(&store);
        let form = enabled_form("8")
            .with_field(Field::new(FieldType::Text, "Jane"))
            .with_field(Field::email("jane@gmail.com"))
            .with_field(Field::email("jane@acme.io"));

        let outcomes = guard.validate_form(&form).await.unwrap();
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].outcome.is_valid());
        assert!(!outcomes[1].outcome.is_valid());
        assert_eq!(outcomes[1].index, 1);
        assert!(outcomes[2].outcome.is_valid());
        assert_eq!(guard.rejections().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_toggle_persisted() {
        let store = MemoryStore::new();
        let guard = create_test_guard(&store);
        store.put_form(&Form::new("21")).await.unwrap();

        let form = guard.set_form_enabled(&FormId::from("21"), true).await.unwrap();
        assert!(form.is_enabled());
        assert!(guard.form(&FormId::from("21")).await.unwrap().is_enabled());
    }

    #[tokio::test]
    async fn test_unticked_checkbox_disables() {
        let store = MemoryStore::new();
        let guard = create_test_guard(&store);
        store.put_form(&enabled_form("22")).await.unwrap();

        let form = guard
            .save_form_settings(&FormId::from("22"), None)
            .await
            .unwrap();
        assert!(!form.is_enabled());
        assert!(!guard.form(&FormId::from("22")).await.unwrap().is_enabled());

        let form = guard
            .save_form_settings(&FormId::from("22"), Some("1"))
            .await
            .unwrap();
        assert!(form.is_enabled());
    }

    #[tokio::test]
    async fn test_toggle_unknown_form() {
        let store = MemoryStore::new();
        let guard = create_test_guard(&store);
        let err = guard
            .set_form_enabled(&FormId::from("404"), true)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GuardError>(),
            Some(GuardError::FormNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_append_keeps_verdict() {
        let store = Arc::new(MemoryStore::new());
        let guard = EmailGuard::new(store.clone(), store, Arc::new(BrokenLog))
            .with_clock(Arc::new(FixedClock));

        let outcome = guard
            .validate_field(&enabled_form("1"), &Field::email("x@gmail.com"))
            .await
            .unwrap();
        assert_eq!(outcome.message(), Some(DEFAULT_MESSAGE));
    }
}
