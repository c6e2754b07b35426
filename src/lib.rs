#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
// #![warn(clippy::cargo)]

pub mod calibration;
pub mod config;
pub mod error;
pub mod experiment;
pub mod export;
pub mod logging;
pub(crate) mod minimisation;
pub mod model;
pub mod parameters;
pub mod table;

pub type Result<T> = ::std::result::Result<T, Box<dyn ::std::error::Error>>;
