//! Logging facilities for Ribs.
//!
//! Ribs uses the `tracing` crate for instrumentation. To see logs, install a
//! tracing subscriber in your application:
//!
//! ```ignore
//! fn main() {
//!     tracing_subscriber::fmt()
//!         .with_env_filter("ribs_core::backstack=debug,ribs_core::node=trace")
//!         .init();
//! }
//! ```
//!
//! Non-fatal errors, warnings and debug messages raised by the framework are
//! routed through the installed [`Configuration`](crate::config::Configuration);
//! the default configurations log them under [`targets::CONFIG`].

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core framework target.
    pub const CORE: &str = "ribs_core";
    /// Node tree target.
    pub const NODE: &str = "ribs_core::node";
    /// Router target.
    pub const ROUTER: &str = "ribs_core::router";
    /// Backstack manager target.
    pub const BACKSTACK: &str = "ribs_core::backstack";
    /// Lifecycle signal target.
    pub const LIFECYCLE: &str = "ribs_core::lifecycle";
    /// Work binder target.
    pub const WORKER: &str = "ribs_core::worker";
    /// Configuration and reported violations target.
    pub const CONFIG: &str = "ribs_core::config";
    /// Observer list target.
    pub const SIGNAL: &str = "ribs_core::signal";
    /// Leak auditing target.
    pub const REF_WATCHER: &str = "ribs_core::ref_watcher";
    /// Deep-link workflow target.
    pub const WORKFLOW: &str = "ribs_core::workflow";
}
