pub mod deadline;
pub mod error;
pub mod logger;
pub mod validation;
