pub use weft_core as core;

pub use weft_core::devices::{Device, DeviceId, DeviceList, ProcessIndex};
pub use weft_core::errors::Error;
pub use weft_core::index_domains::{Index, IndexDomain};
pub use weft_core::memories::MemoryKind;
pub use weft_core::meshes::{DimensionSharding, MeshAxis, MeshPartition, MeshTopology};
pub use weft_core::shapes::{DynamicShape, Shape};
pub use weft_core::shardings::{
    ConcreteEvenSharding, ConcreteSharding, MeshSharding, OpaqueSharding, Sharding, SingleDeviceSharding,
};
