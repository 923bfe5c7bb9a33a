//! Formfill engine: form extraction, streaming decode, population and job execution.
mod completion;
mod config;
mod controller;
mod decode;
mod dom;
mod extract;
mod form;
mod page;
mod persist;
mod populate;
mod prompt;
mod select;
mod snapshot;
mod types;

pub use completion::{CompletionService, CompletionSettings, FragmentSink, OpenAiClient};
pub use config::{EngineConfig, PayloadMode};
pub use controller::{CancelHandle, EngineHandle, PageSource, StaticPages};
pub use decode::StreamDecoder;
pub use extract::extract_field_definitions;
pub use form::{
    ControlEvent, ControlEventKind, ControlKind, FieldGroup, FormControl, LiveForm, SelectOption,
};
pub use page::{decode_page, DecodedPage, PageError};
pub use persist::{write_atomically, PersistError};
pub use populate::{populate, PopulateReport};
pub use prompt::{
    build_request, ChatMessage, CompletionRequest, FormPayload, Role, SYSTEM_INSTRUCTION,
};
pub use select::{resolve_form, SelectionError, MAX_SELECTOR_SEGMENTS, SHADOW_ROOT_SEPARATOR};
pub use snapshot::snapshot_form;
pub use types::{CompletionError, ConfigurationError, EngineEvent, FailureKind, JobError};
