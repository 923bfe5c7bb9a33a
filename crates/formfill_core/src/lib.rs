//! Formfill core: field model types and the pure job lifecycle state machine.
mod effect;
mod model;
mod msg;
mod state;
mod update;
mod view_model;

pub use effect::{Effect, StartRejection};
pub use model::{
    FieldDefinition, FieldValue, FieldValues, JobTarget, PicklistFieldDefinition, StartRequest,
    TabId, TextFieldDefinition,
};
pub use msg::Msg;
pub use state::{JobId, JobPhase, JobState, JobStatus, DEFAULT_MAX_ATTEMPTS};
pub use update::update;
pub use view_model::JobView;
