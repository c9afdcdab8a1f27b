//! Runtime data model definitions.
//!
//! Entities describe themselves with an `EntityDecl` (what exists); the
//! registry validates that declaration once per type and installs an
//! immutable `TableDescriptor` (what runs). Compilation, hydration and
//! persistence only ever read descriptors.
pub mod declare;
pub mod registry;
pub mod table;


pub use declare::{EntityDecl, FieldDecl, FieldShape, KeyGeneration, RelationKind};
pub use registry::descriptor;
pub use table::{ColumnDescriptor, ColumnSpecial, RelationDescriptor, TableDescriptor};
