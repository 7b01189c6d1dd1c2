//! Types shared by every Nexa CRM crate: entity identifiers, the closed
//! enumerations of the data model, persisted constants and the domain error
//! taxonomy.

pub mod constants;
pub mod error;
pub mod types;
pub mod validation;

pub use error::CrmError;
pub use types::*;
