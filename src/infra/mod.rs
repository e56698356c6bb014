pub mod api2pdf;
pub mod error;
pub mod http;
pub mod telemetry;
pub mod templates;
