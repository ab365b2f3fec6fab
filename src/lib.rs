// ecobee poller - Library root for testing

pub mod auth;
pub mod config;
pub mod error;
pub mod http_client;
pub mod influx;
pub mod models;
pub mod poller;
pub mod thermostat;
pub mod weather;
