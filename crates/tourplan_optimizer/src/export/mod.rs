pub mod geo_export;
pub mod route_report;
