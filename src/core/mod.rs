//! Device internals
//!
//! Leaf-first: [`validation`] and [`io`] underpin the [`cells`] store and the
//! [`endurance`] tracker; [`integrity`] computes checksums; [`audit`] records
//! operations; [`device`] orchestrates all of them.

pub mod audit;
pub mod cells;
pub mod config;
pub mod device;
pub mod dump;
pub mod endurance;
pub mod error;
pub mod integrity;
pub mod io;
pub mod record;
pub mod validation;

pub use device::{Device, ResetReport, SharedDevice};
