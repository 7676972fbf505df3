//! Use cases of the platform. Handlers parse requests, services decide.

pub mod roles;
pub mod accounts;
pub mod catalog;
pub mod commerce;
pub mod progress;
pub mod certification;
pub mod dashboards;
