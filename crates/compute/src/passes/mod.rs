//! Graph rewriting passes run while building an execution system, in order:
//! type conversion, resolution determination, resolution conversion,
//! buffering and grouping.

pub mod buffering;
pub mod grouping;
pub mod resolution;
pub mod type_conversion;

pub use buffering::add_buffers;
pub use grouping::{group_operations, Grouping};
pub use resolution::{add_resolution_conversions, determine_resolutions};
pub use type_conversion::add_type_conversions;
