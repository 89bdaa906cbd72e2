pub mod actor;
pub mod document;
pub mod submission;
pub mod tenant;

pub use actor::ActorRepository;
pub use document::DocumentRepository;
pub use submission::SubmissionRepository;
pub use tenant::TenantRepository;
