//! # LCM Basket Domain Models
//!
//! Data model for normalized vendor hardware baskets. Everything here is
//! plain data plus derived computations; parsing lives in `lcm-utils`.
//!
//! ## Key Models
//!
//! - **Sheet / Cell**: the decoded spreadsheet grid the engine consumes
//! - **Money**: currency-tagged decimal price
//! - **ComponentLine**: one part of a model, with its `ComponentType` and `Specification`
//! - **HardwareModel**: a priced lot and its ordered components
//! - **Basket**: all models parsed from one vendor sheet
//! - **CompletionReport**: per-field fill counts over a basket
//!
//! All models serialize with serde; field names match the JSON handed to
//! the catalog service.

pub mod sheet;
pub mod money;
pub mod component;
pub mod hardware;
pub mod report;


pub use sheet::*;
pub use money::*;
pub use component::*;
pub use hardware::*;
pub use report::*;
