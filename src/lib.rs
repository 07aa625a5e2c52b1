pub mod builder;
pub mod config;
pub mod error;
pub mod exec;
pub mod gitrepo;
pub mod jenkins;
pub mod mhd;
pub mod release;
pub mod ui;
pub mod version;
pub mod volume;

pub use error::{ReleaseError, Result};
