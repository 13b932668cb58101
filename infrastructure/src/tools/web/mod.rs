//! Web tools (requires the `web-tools` feature)

mod fetch;

pub use fetch::WebFetchTool;
