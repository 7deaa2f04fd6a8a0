//! Blocks form submissions whose email address belongs to a configured list of
//! disallowed (typically free) email providers, and keeps a log of the
//! attempts it turned away.
//!
//! The decision itself lives in [`validator`] and is a pure function of the
//! submitted value, the form and the [`BlockListConfig`]. [`EmailGuard`] wires
//! it to the storage traits in [`store`] for hosts that want the whole flow.

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

pub mod blocklist;
pub mod clock;
pub mod form;
mod guard;
pub mod store;
pub mod validator;

pub use blocklist::{BlockListConfig, DEFAULT_DOMAINS, DEFAULT_MESSAGE};
pub use clock::{Clock, LocalClock};
pub use form::{Field, FieldType, Form, FormId, FormSettings};
pub use guard::{EmailGuard, FieldOutcome};
pub use store::{FormStore, MemoryStore, RejectionLog, RejectionRecord, SettingsStore};
pub use validator::{check_email, check_field, extract_domain, Outcome};

#[derive(Debug, Error, Diagnostic)]
pub enum GuardError {
    #[error("Form {0} not found")]
    #[diagnostic(
        code(guard::form_not_found),
        help("import the form definition before changing its settings")
    )]
    FormNotFound(FormId),

    #[error("Invalid form definition: {message}")]
    #[diagnostic(code(guard::form_parse))]
    FormParse {
        message: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("here")]
        span: SourceSpan,
    },

    #[error("Storage error: {message}")]
    #[diagnostic(code(guard::storage))]
    Storage { message: String },
}
