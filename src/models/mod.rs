// Data models for provider payloads

pub mod ecobee;
pub mod weather;
