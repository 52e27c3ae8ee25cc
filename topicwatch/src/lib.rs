#[macro_use]
extern crate log;

#[macro_use]
mod macros;

pub mod config;
pub mod decoder;
pub mod error;
pub mod event;
pub mod ingester;
pub mod kafka;
pub mod logger;
pub mod shutdown;
pub mod sink;
pub mod version;

#[cfg(test)]
mod testing;

pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_VERS: &str = env!("CARGO_PKG_VERSION");

pub const RUST_VERS: &str = match option_env!("RUSTC_VERSION") {
    Some(v) => v,
    None => "unknown",
};

pub const GIT_BRANCH: &str = match option_env!("GIT_BRANCH") {
    Some(v) => v,
    None => "unknown",
};

pub const GIT_SHA: &str = match option_env!("GIT_SHA") {
    Some(v) => v,
    None => "unknown",
};

pub const BANNER: &str = r"
 _              _                 _       _
| |_ ___  _ __ (_) _____      __ | |_ ___| |__
| __/ _ \| '_ \| |/ __\ \ /\ / / | __/ __| '_ \
| || (_) | |_) | | (__ \ V  V /  | || (__| | | |
 \__\___/| .__/|_|\___| \_/\_/    \__\___|_| |_|
         |_|
";
