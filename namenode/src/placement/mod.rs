pub mod coordinator;
pub mod request;
