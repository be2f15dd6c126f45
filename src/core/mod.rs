pub mod classifier;
pub mod dispatcher;
pub mod events;
pub mod pool;
pub mod registry;
pub mod template;

pub use crate::domain::model::{FaxActionType, FaxJob, FaxJobStatus};
pub use crate::domain::ports::{ConnectionFactory, FaxBackend, RequestParser};
pub use crate::utils::error::Result;
