pub mod actor;
pub mod callback;
pub mod document;
pub mod settings;
pub mod submission;
pub mod tenant;

pub use actor::Actor;
pub use callback::{
    CallbackEventType, CallbackRef, RemoteSubmissionStatus, SimilarityPayload,
    SubmissionCompletePayload,
};
pub use document::{Document, DocumentStatus, SimilarityReport};
pub use settings::SimilaritySettings;
pub use submission::Submission;
pub use tenant::Tenant;
