//! HTTP API surface: the dashboard render endpoint, filter options, exports
//! and per-user preferences.

pub mod dashboard;

pub use dashboard::{
    dashboard, export_csv, export_xlsx, get_config, get_options, put_config, AppState,
};
