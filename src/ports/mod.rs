//! Port traits at the edges of the domain.

pub mod config_port;
pub mod report_port;
pub mod results_port;
pub mod symbol_port;
