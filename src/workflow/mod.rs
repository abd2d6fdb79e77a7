pub mod enrollment;
pub mod transaction;
pub mod validation;

pub use enrollment::{EnrollmentWorkflow, WorkflowError};
pub use transaction::{transact, Notifier, WorkflowEvent};
pub use validation::GroupDraft;
