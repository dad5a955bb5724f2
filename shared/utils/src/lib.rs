pub mod basket;
pub mod config;
pub mod error;
pub mod logging;
pub mod validation;
pub mod workbook;

pub use basket::*;
pub use self::config::*;
pub use error::*;
pub use logging::*;
pub use validation::*;
pub use workbook::*;
