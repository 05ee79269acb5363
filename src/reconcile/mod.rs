pub mod conflict;
pub mod discovery;
pub mod matcher;
