//! Sharding metadata core for distributed multi-device arrays.
//!
//! The [`shardings`] module defines the central [`Sharding`](shardings::Sharding) contract and its five variants;
//! the remaining modules provide the value types it is built from: device handles and lists, memory kinds, static
//! and dynamic shapes, index domains, and mesh partition descriptors.

pub mod devices;
pub mod errors;
pub mod index_domains;
pub mod memories;
pub mod meshes;
pub mod shapes;
pub mod shardings;

pub use devices::*;
pub use errors::*;
pub use index_domains::*;
pub use memories::*;
pub use meshes::*;
pub use shapes::*;
pub use shardings::*;
