// Models module - Database entity representations

pub mod status_record;

pub use status_record::{CertStatus, StatusRecord};
