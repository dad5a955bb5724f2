//! Basket normalization engine
//!
//! Turns a vendor pricing sheet into a [`Basket`](lcm_models::Basket) of
//! hardware models. Leaf components first: price and spec extraction,
//! component classification, header location, row classification, then the
//! grouping state machine and the assembler that drives them.

pub mod assembler;
pub mod classifier;
pub mod grouper;
pub mod header;
pub mod price;
pub mod row;
pub mod rules;
pub mod spec;

pub use assembler::{assemble_concurrently, parse_period, AssembledBasket, AssemblyJob, BasketAssembler};
pub use classifier::ComponentClassifier;
pub use grouper::{GrouperState, ModelGrouper};
pub use header::{ColumnMap, HeaderLocator, HeaderMatch, HeaderMiss};
pub use price::PriceExtractor;
pub use row::{RowClass, RowClassifier, RowView};
pub use rules::{
    CategoryRule, ColumnField, ComponentRule, FormFactorRule, RuleSet, VendorRegistry, VendorRules,
};
pub use spec::SpecExtractor;
