#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod loader;
pub mod payload;
pub mod session;
pub mod submitter;
pub mod workflow;

pub use vote_core::Clock;

pub use config::{Messages, VotingConfig};
pub use error::{AppServicesError, LoadError, SubmitError, TransportError, VotingError};
pub use loader::{DatasetLoader, DatasetSource, HttpDatasetSource};
pub use session::{SessionEvent, VotingSession};
pub use submitter::{CollectorTransport, HttpCollector, SubmissionOutcome, VoteSubmitter};
pub use workflow::{VoteReceipt, VotingService};
