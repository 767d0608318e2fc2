pub mod active_roster;
pub mod context;
pub mod jobs;
pub mod pipeline;
pub mod sources;

pub use context::AppContext;
pub use jobs::JobError;
