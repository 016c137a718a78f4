//! The concrete payload type and the pools that hold base values.
pub mod array;
pub mod kernel;
pub mod pool;

pub use array::{DType, DataArray, Metadata, Values};
pub use pool::{BaseNames, BasePool, Dataset, DependencyPool};
