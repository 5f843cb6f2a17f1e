//! Logging shorthands shared by every crate in the workspace.
//!
//! All of them forward to `tracing`. `success!` is an `INFO` event on a
//! dedicated target so terminal formatters can give it its own symbol.

pub const SUCCESS_TARGET: &str = "netlens::success";
pub const PRINT_TARGET: &str = "netlens::print";

#[macro_export]
macro_rules! success {
    ($($arg:tt)*) => {
        ::tracing::info!(target: "netlens::success", $($arg)*)
    };
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        ::tracing::info!($($arg)*)
    };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        ::tracing::warn!($($arg)*)
    };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        ::tracing::error!($($arg)*)
    };
}
