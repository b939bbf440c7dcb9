//! Concrete adapter implementations for ports.

pub mod csv_adapter;
pub mod csv_report_adapter;
pub mod exchange_info_adapter;
pub mod file_config_adapter;
pub mod layered_config_adapter;
