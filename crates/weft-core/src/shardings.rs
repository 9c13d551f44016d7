//! Sharding metadata for distributed multi-device arrays.
//!
//! A [`Sharding`] describes how a logical array shape is partitioned across an ordered [`DeviceList`], without ever
//! touching array data. It answers two questions for any given shape:
//!
//!   - [`Sharding::disassemble`]: what shape and sub-sharding does each device's shard have?
//!   - [`Sharding::index_domains`]: what coordinate sub-region of the logical array does each device's shard occupy?
//!
//! Five partitioning semantics exist behind the one contract:
//!
//! | Variant | Semantics |
//! |---|---|
//! | [`SingleDeviceSharding`] | Identity partitioning: one device, no splitting. |
//! | [`OpaqueSharding`] | Devices are known; the partitioning rule is not expressible here. |
//! | [`ConcreteSharding`] | Explicit, possibly non-uniform per-shard (dynamic) shapes. |
//! | [`ConcreteEvenSharding`] | Uniform tiles: every shard has the same shape. |
//! | [`MeshSharding`] | Partitioning derived from a [`MeshPartition`] descriptor. |
//!
//! The variant set is closed and stable, so [`Sharding`] is a sum type matched exhaustively rather than an open
//! trait hierarchy. Whenever both operations succeed for the same shape and instance, they return exactly one entry
//! per device, in device order, and entry *i* of either result corresponds to `devices()[i]`; downstream array
//! assembly, executable binding, and copy logic rely on this without re-validating it. Multiple shard indices may
//! map onto equal index domains, which is the definition of _replication_: the contributions of such shards are
//! interchangeable, not merely co-located.
//!
//! Shardings are immutable after construction and commonly shared by reference across many arrays, so disassembly
//! hands out sub-shardings as [`Arc`]s. All operations are pure synchronous computations over shape metadata; no
//! locking, I/O, or device communication is involved anywhere.
//!
//! Each concrete variant exposes a distinct, stable [`type name`](Sharding::type_name) under which an external
//! serialization registry can register codecs for persisting sharding values independently of the arrays they
//! describe; the wire encoding itself is owned by that registry.

use std::fmt::Display;
use std::sync::Arc;

use crate::devices::{Device, DeviceList};
use crate::errors::Error;
use crate::index_domains::{Index, IndexDomain};
use crate::memories::MemoryKind;
use crate::meshes::MeshPartition;
use crate::shapes::{DynamicShape, Shape};

/// A partitioning scheme binding a logical array shape to a [`DeviceList`] and a [`MemoryKind`].
///
/// See the [module documentation](self) for the semantics of the individual variants and the invariants shared by
/// all of them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Sharding {
    /// Identity partitioning over exactly one device.
    SingleDevice(SingleDeviceSharding),

    /// Devices are known, but the partitioning rule is not expressible here.
    Opaque(OpaqueSharding),

    /// Explicit, possibly non-uniform per-shard shapes.
    Concrete(ConcreteSharding),

    /// Uniform tiles: all shards share one shape.
    ConcreteEven(ConcreteEvenSharding),

    /// Partitioning derived from a mesh descriptor.
    Mesh(MeshSharding),
}

impl Sharding {
    /// All devices in this sharding, in canonical shard order. Devices may appear more than once.
    pub fn devices(&self) -> &DeviceList {
        match self {
            Self::SingleDevice(sharding) => &sharding.devices,
            Self::Opaque(sharding) => &sharding.devices,
            Self::Concrete(sharding) => &sharding.devices,
            Self::ConcreteEven(sharding) => &sharding.devices,
            Self::Mesh(sharding) => &sharding.devices,
        }
    }

    /// Memory kind for all shards of this sharding.
    pub fn memory_kind(&self) -> &MemoryKind {
        match self {
            Self::SingleDevice(sharding) => &sharding.memory_kind,
            Self::Opaque(sharding) => &sharding.memory_kind,
            Self::Concrete(sharding) => &sharding.memory_kind,
            Self::ConcreteEven(sharding) => &sharding.memory_kind,
            Self::Mesh(sharding) => &sharding.memory_kind,
        }
    }

    /// Breaks `shape` up into one `(shard shape, sub-sharding)` pair per device, in device order.
    ///
    /// Returns [`Error::Unimplemented`] if this sharding defines no decomposition rule for any shape, and
    /// [`Error::InvalidArgument`] if `shape` is incompatible with the shape stored in this sharding.
    pub fn disassemble(&self, shape: &Shape) -> Result<Vec<(Shape, Arc<Sharding>)>, Error> {
        match self {
            Self::SingleDevice(sharding) => sharding.disassemble(shape),
            Self::Opaque(sharding) => sharding.disassemble(shape),
            Self::Concrete(sharding) => sharding.disassemble(shape),
            Self::ConcreteEven(sharding) => sharding.disassemble(shape),
            Self::Mesh(sharding) => sharding.disassemble(shape),
        }
    }

    /// Variant of [`disassemble`](Self::disassemble) that takes a dynamic shape. The failure policy is the same.
    pub fn disassemble_dynamic(
        &self,
        dynamic_shape: &DynamicShape,
    ) -> Result<Vec<(DynamicShape, Arc<Sharding>)>, Error> {
        match self {
            Self::SingleDevice(sharding) => sharding.disassemble_dynamic(dynamic_shape),
            Self::Opaque(sharding) => sharding.disassemble_dynamic(dynamic_shape),
            Self::Concrete(sharding) => sharding.disassemble_dynamic(dynamic_shape),
            Self::ConcreteEven(sharding) => sharding.disassemble_dynamic(dynamic_shape),
            Self::Mesh(sharding) => sharding.disassemble_dynamic(dynamic_shape),
        }
    }

    /// Maps each shard to the [`IndexDomain`] over `shape` that it occupies, one domain per device, in device order.
    /// Multiple shard indices may yield identical domains; such shards are replicas of the same region.
    ///
    /// The failure policy is the same as for [`disassemble`](Self::disassemble).
    pub fn index_domains(&self, shape: &Shape) -> Result<Vec<IndexDomain>, Error> {
        match self {
            Self::SingleDevice(sharding) => sharding.index_domains(shape),
            Self::Opaque(sharding) => sharding.index_domains(shape),
            Self::Concrete(sharding) => sharding.index_domains(shape),
            Self::ConcreteEven(sharding) => sharding.index_domains(shape),
            Self::Mesh(sharding) => sharding.index_domains(shape),
        }
    }

    /// Stable, distinct identity of the concrete variant of this sharding, used by the external serialization
    /// registry to look up the codec for a sharding value. Never used for equality.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::SingleDevice(_) => SingleDeviceSharding::TYPE_NAME,
            Self::Opaque(_) => OpaqueSharding::TYPE_NAME,
            Self::Concrete(_) => ConcreteSharding::TYPE_NAME,
            Self::ConcreteEven(_) => ConcreteEvenSharding::TYPE_NAME,
            Self::Mesh(_) => MeshSharding::TYPE_NAME,
        }
    }

    /// Stable, non-empty, human-readable description of this sharding. Only for diagnostics, never for equality.
    pub fn debug_string(&self) -> String {
        self.to_string()
    }
}

impl Display for Sharding {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SingleDevice(sharding) => write!(formatter, "{sharding}"),
            Self::Opaque(sharding) => write!(formatter, "{sharding}"),
            Self::Concrete(sharding) => write!(formatter, "{sharding}"),
            Self::ConcreteEven(sharding) => write!(formatter, "{sharding}"),
            Self::Mesh(sharding) => write!(formatter, "{sharding}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Single-device sharding
// ---------------------------------------------------------------------------

/// Identity partitioning: exactly one device and no splitting.
///
/// Disassembly returns the unchanged shape paired with a `SingleDeviceSharding` over the same device, making this
/// variant a fixed point under decomposition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SingleDeviceSharding {
    devices: DeviceList,
    memory_kind: MemoryKind,
}

impl SingleDeviceSharding {
    /// Stable type identity used by the external serialization registry.
    pub const TYPE_NAME: &'static str = "weft.shardings.SingleDeviceSharding";

    /// Creates a single-device sharding.
    pub fn new(device: Device, memory_kind: MemoryKind) -> Self {
        Self { devices: DeviceList::new(vec![device]), memory_kind }
    }

    /// The device holding the one shard of this sharding.
    pub fn device(&self) -> Device {
        self.devices.devices()[0]
    }

    /// Devices of this sharding.
    pub fn devices(&self) -> &DeviceList {
        &self.devices
    }

    /// Memory kind of this sharding.
    pub fn memory_kind(&self) -> &MemoryKind {
        &self.memory_kind
    }

    fn disassemble(&self, shape: &Shape) -> Result<Vec<(Shape, Arc<Sharding>)>, Error> {
        Ok(vec![(shape.clone(), Arc::new(Sharding::SingleDevice(self.clone())))])
    }

    fn disassemble_dynamic(&self, dynamic_shape: &DynamicShape) -> Result<Vec<(DynamicShape, Arc<Sharding>)>, Error> {
        Ok(vec![(dynamic_shape.clone(), Arc::new(Sharding::SingleDevice(self.clone())))])
    }

    fn index_domains(&self, shape: &Shape) -> Result<Vec<IndexDomain>, Error> {
        Ok(vec![IndexDomain::full(shape.clone())])
    }
}

impl Display for SingleDeviceSharding {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "SingleDeviceSharding(device: {}, memory_kind: {})", self.device().id(), self.memory_kind)
    }
}

// ---------------------------------------------------------------------------
// Opaque sharding
// ---------------------------------------------------------------------------

/// Sharding whose devices are known but whose partitioning rule is not expressible in this crate.
///
/// Disassembly and index-domain computation unconditionally fail with [`Error::Unimplemented`]. This is deliberate
/// policy rather than a missing feature: callers must obtain shard interpretation from whatever external mechanism
/// assigned this sharding instead of having this layer guess one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpaqueSharding {
    devices: DeviceList,
    memory_kind: MemoryKind,
}

impl OpaqueSharding {
    /// Stable type identity used by the external serialization registry.
    pub const TYPE_NAME: &'static str = "weft.shardings.OpaqueSharding";

    /// Creates an opaque sharding. No relationship between any shape and the devices is established.
    ///
    /// # Panics
    ///
    /// Panics if `devices` is empty.
    pub fn new(devices: DeviceList, memory_kind: MemoryKind) -> Self {
        assert!(!devices.is_empty(), "opaque shardings require a non-empty device list");
        Self { devices, memory_kind }
    }

    /// Devices of this sharding.
    pub fn devices(&self) -> &DeviceList {
        &self.devices
    }

    /// Memory kind of this sharding.
    pub fn memory_kind(&self) -> &MemoryKind {
        &self.memory_kind
    }

    fn disassemble(&self, _shape: &Shape) -> Result<Vec<(Shape, Arc<Sharding>)>, Error> {
        Err(Error::unimplemented("opaque shardings do not define per-shard shapes"))
    }

    fn disassemble_dynamic(&self, _dynamic_shape: &DynamicShape) -> Result<Vec<(DynamicShape, Arc<Sharding>)>, Error> {
        Err(Error::unimplemented("opaque shardings do not define per-shard dynamic shapes"))
    }

    fn index_domains(&self, _shape: &Shape) -> Result<Vec<IndexDomain>, Error> {
        Err(Error::unimplemented("opaque shardings do not define index domains"))
    }
}

impl Display for OpaqueSharding {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "OpaqueSharding(devices: {}, memory_kind: {})", self.devices, self.memory_kind)
    }
}

// ---------------------------------------------------------------------------
// Concrete sharding
// ---------------------------------------------------------------------------

/// Static or dynamic shape data stored by a [`ConcreteSharding`]. Exactly one representation is active per instance,
/// selected at construction.
#[derive(Clone, Debug, PartialEq, Eq)]
enum ConcreteShapes {
    Static { shape: Shape, shard_shapes: Vec<Shape> },
    Dynamic { shape: DynamicShape, shard_shapes: Vec<DynamicShape> },
}

/// Sharding with explicit, possibly non-uniform per-shard shapes.
///
/// An instance stores either a static shape with per-shard static shapes, or a dynamic shape with per-shard dynamic
/// shapes; [`has_static_shape`](Self::has_static_shape) and [`has_dynamic_shape`](Self::has_dynamic_shape) query
/// which representation is active, and the shape accessors panic when the wrong representation is read.
///
/// When all shard shapes are identical, prefer [`ConcreteEvenSharding`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConcreteSharding {
    devices: DeviceList,
    memory_kind: MemoryKind,
    shapes: ConcreteShapes,
}

impl ConcreteSharding {
    /// Stable type identity used by the external serialization registry.
    pub const TYPE_NAME: &'static str = "weft.shardings.ConcreteSharding";

    /// Creates a concrete sharding with static per-shard shapes.
    ///
    /// # Panics
    ///
    /// Panics if `devices` and `shard_shapes` have different lengths.
    pub fn new(devices: DeviceList, memory_kind: MemoryKind, shape: Shape, shard_shapes: Vec<Shape>) -> Self {
        assert_eq!(
            devices.len(),
            shard_shapes.len(),
            "concrete shardings require exactly one shard shape per device",
        );
        Self { devices, memory_kind, shapes: ConcreteShapes::Static { shape, shard_shapes } }
    }

    /// Creates a concrete sharding with dynamic per-shard shapes.
    ///
    /// # Panics
    ///
    /// Panics if `devices` and `shard_dynamic_shapes` have different lengths.
    pub fn with_dynamic_shapes(
        devices: DeviceList,
        memory_kind: MemoryKind,
        dynamic_shape: DynamicShape,
        shard_dynamic_shapes: Vec<DynamicShape>,
    ) -> Self {
        assert_eq!(
            devices.len(),
            shard_dynamic_shapes.len(),
            "concrete shardings require exactly one shard dynamic shape per device",
        );
        let shapes = ConcreteShapes::Dynamic { shape: dynamic_shape, shard_shapes: shard_dynamic_shapes };
        Self { devices, memory_kind, shapes }
    }

    /// Devices of this sharding.
    pub fn devices(&self) -> &DeviceList {
        &self.devices
    }

    /// Memory kind of this sharding.
    pub fn memory_kind(&self) -> &MemoryKind {
        &self.memory_kind
    }

    /// Returns `true` iff this sharding stores a static shape and static shard shapes.
    pub fn has_static_shape(&self) -> bool {
        matches!(self.shapes, ConcreteShapes::Static { .. })
    }

    /// Returns `true` iff this sharding stores a dynamic shape and dynamic shard shapes.
    pub fn has_dynamic_shape(&self) -> bool {
        matches!(self.shapes, ConcreteShapes::Dynamic { .. })
    }

    /// Static shape of this sharding.
    ///
    /// # Panics
    ///
    /// Panics if this sharding holds a dynamic shape.
    pub fn shape(&self) -> &Shape {
        match &self.shapes {
            ConcreteShapes::Static { shape, .. } => shape,
            ConcreteShapes::Dynamic { .. } => panic!("this concrete sharding holds a dynamic shape"),
        }
    }

    /// Static per-shard shapes of this sharding, in device order.
    ///
    /// # Panics
    ///
    /// Panics if this sharding holds dynamic shard shapes.
    pub fn shard_shapes(&self) -> &[Shape] {
        match &self.shapes {
            ConcreteShapes::Static { shard_shapes, .. } => shard_shapes.as_slice(),
            ConcreteShapes::Dynamic { .. } => panic!("this concrete sharding holds dynamic shard shapes"),
        }
    }

    /// Dynamic shape of this sharding.
    ///
    /// # Panics
    ///
    /// Panics if this sharding holds a static shape.
    pub fn dynamic_shape(&self) -> &DynamicShape {
        match &self.shapes {
            ConcreteShapes::Dynamic { shape, .. } => shape,
            ConcreteShapes::Static { .. } => panic!("this concrete sharding holds a static shape"),
        }
    }

    /// Dynamic per-shard shapes of this sharding, in device order.
    ///
    /// # Panics
    ///
    /// Panics if this sharding holds static shard shapes.
    pub fn shard_dynamic_shapes(&self) -> &[DynamicShape] {
        match &self.shapes {
            ConcreteShapes::Dynamic { shard_shapes, .. } => shard_shapes.as_slice(),
            ConcreteShapes::Static { .. } => panic!("this concrete sharding holds static shard shapes"),
        }
    }

    fn disassemble(&self, shape: &Shape) -> Result<Vec<(Shape, Arc<Sharding>)>, Error> {
        match &self.shapes {
            ConcreteShapes::Dynamic { .. } => Err(Error::invalid_argument(format!(
                "this concrete sharding holds a dynamic shape and cannot disassemble static shape {shape}"
            ))),
            ConcreteShapes::Static { shape: stored_shape, shard_shapes } => {
                if shape != stored_shape {
                    return Err(Error::invalid_argument(format!(
                        "concrete sharding holds shape {stored_shape}, but was asked to disassemble shape {shape}"
                    )));
                }
                Ok(shard_shapes
                    .iter()
                    .zip(self.devices.devices())
                    .map(|(shard_shape, device)| {
                        (shard_shape.clone(), single_device_sharding(*device, &self.memory_kind))
                    })
                    .collect())
            }
        }
    }

    fn disassemble_dynamic(&self, dynamic_shape: &DynamicShape) -> Result<Vec<(DynamicShape, Arc<Sharding>)>, Error> {
        match &self.shapes {
            ConcreteShapes::Static { .. } => Err(Error::invalid_argument(format!(
                "this concrete sharding holds a static shape and cannot disassemble dynamic shape {dynamic_shape}"
            ))),
            ConcreteShapes::Dynamic { shape: stored_shape, shard_shapes } => {
                if dynamic_shape != stored_shape {
                    return Err(Error::invalid_argument(format!(
                        "concrete sharding holds dynamic shape {stored_shape}, but was asked to disassemble dynamic \
                         shape {dynamic_shape}"
                    )));
                }
                Ok(shard_shapes
                    .iter()
                    .zip(self.devices.devices())
                    .map(|(shard_shape, device)| {
                        (shard_shape.clone(), single_device_sharding(*device, &self.memory_kind))
                    })
                    .collect())
            }
        }
    }

    /// Computes per-device index domains by inferring a deterministic tiling from the stored shard shapes alone.
    ///
    /// A canonical coordinate mapping is derivable only when the shard shapes are unambiguous: full replication
    /// (every shard covers the whole array), a uniform tile grid enumerated in row-major order, or a single-axis
    /// concatenation. A general concrete sharding makes no universal tiling claim, so anything else fails with
    /// [`Error::Unimplemented`] rather than guessing a layout.
    fn index_domains(&self, shape: &Shape) -> Result<Vec<IndexDomain>, Error> {
        let (stored_shape, shard_shapes) = match &self.shapes {
            ConcreteShapes::Static { shape, shard_shapes } => (shape, shard_shapes),
            ConcreteShapes::Dynamic { .. } => {
                return Err(Error::invalid_argument(format!(
                    "this concrete sharding holds a dynamic shape and cannot compute index domains over shape {shape}"
                )));
            }
        };
        if shape != stored_shape {
            return Err(Error::invalid_argument(format!(
                "concrete sharding holds shape {stored_shape}, but was asked for index domains over shape {shape}"
            )));
        }

        // Full replication: every shard covers the whole array.
        if shard_shapes.iter().all(|shard_shape| shard_shape == stored_shape) {
            return Ok(vec![IndexDomain::full(stored_shape.clone()); self.devices.len()]);
        }

        // Uniform shard shapes: an even tile grid in row-major order.
        let first_shard_shape = &shard_shapes[0];
        if shard_shapes.iter().all(|shard_shape| shard_shape == first_shard_shape) {
            return tile_grid_index_domains(stored_shape, first_shard_shape, self.devices.len()).ok_or_else(|| {
                Error::unimplemented(format!(
                    "shard shape {first_shard_shape} does not form an unambiguous tiling of shape {stored_shape} \
                     across {} device(s)",
                    self.devices.len(),
                ))
            });
        }

        // Non-uniform shard shapes: the only deterministic interpretation is a single-axis concatenation.
        concatenation_index_domains(stored_shape, shard_shapes).ok_or_else(|| {
            Error::unimplemented(format!(
                "no deterministic tiling of shape {stored_shape} can be inferred from the stored shard shapes"
            ))
        })
    }
}

impl Display for ConcreteSharding {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "ConcreteSharding(devices: {}, memory_kind: {}, ", self.devices, self.memory_kind)?;
        match &self.shapes {
            ConcreteShapes::Static { shape, shard_shapes } => {
                write!(formatter, "shape: {shape}, shard_shapes: [")?;
                for (shard_index, shard_shape) in shard_shapes.iter().enumerate() {
                    if shard_index > 0 {
                        write!(formatter, ", ")?;
                    }
                    write!(formatter, "{shard_shape}")?;
                }
            }
            ConcreteShapes::Dynamic { shape, shard_shapes } => {
                write!(formatter, "dynamic_shape: {shape}, shard_dynamic_shapes: [")?;
                for (shard_index, shard_shape) in shard_shapes.iter().enumerate() {
                    if shard_index > 0 {
                        write!(formatter, ", ")?;
                    }
                    write!(formatter, "{shard_shape}")?;
                }
            }
        }
        write!(formatter, "])")
    }
}

// ---------------------------------------------------------------------------
// Concrete even sharding
// ---------------------------------------------------------------------------

/// Uniform-tile partitioning: all shards share one shape.
///
/// Construction stores the logical shape and the shard shape without verifying that the latter evenly tiles the
/// former across the device count; that responsibility is the caller's, and it is only re-checked by
/// [`index_domains`](Sharding::index_domains) at call time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConcreteEvenSharding {
    devices: DeviceList,
    memory_kind: MemoryKind,
    shape: Shape,
    shard_shape: Shape,
}

impl ConcreteEvenSharding {
    /// Stable type identity used by the external serialization registry.
    pub const TYPE_NAME: &'static str = "weft.shardings.ConcreteEvenSharding";

    /// Creates a concrete even sharding.
    pub fn new(devices: DeviceList, memory_kind: MemoryKind, shape: Shape, shard_shape: Shape) -> Self {
        Self { devices, memory_kind, shape, shard_shape }
    }

    /// Devices of this sharding.
    pub fn devices(&self) -> &DeviceList {
        &self.devices
    }

    /// Memory kind of this sharding.
    pub fn memory_kind(&self) -> &MemoryKind {
        &self.memory_kind
    }

    /// Logical shape of this sharding.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Shape shared by every shard of this sharding.
    pub fn shard_shape(&self) -> &Shape {
        &self.shard_shape
    }

    fn disassemble(&self, shape: &Shape) -> Result<Vec<(Shape, Arc<Sharding>)>, Error> {
        if shape != &self.shape {
            return Err(Error::invalid_argument(format!(
                "concrete even sharding holds shape {}, but was asked to disassemble shape {shape}",
                self.shape,
            )));
        }
        Ok(self
            .devices
            .devices()
            .iter()
            .map(|device| (self.shard_shape.clone(), single_device_sharding(*device, &self.memory_kind)))
            .collect())
    }

    fn disassemble_dynamic(&self, dynamic_shape: &DynamicShape) -> Result<Vec<(DynamicShape, Arc<Sharding>)>, Error> {
        Err(Error::invalid_argument(format!(
            "concrete even shardings hold static shapes and cannot disassemble dynamic shape {dynamic_shape}"
        )))
    }

    fn index_domains(&self, shape: &Shape) -> Result<Vec<IndexDomain>, Error> {
        if shape != &self.shape {
            return Err(Error::invalid_argument(format!(
                "concrete even sharding holds shape {}, but was asked for index domains over shape {shape}",
                self.shape,
            )));
        }
        if self.shard_shape.rank() != self.shape.rank() {
            return Err(Error::invalid_argument(format!(
                "shard shape {} and shape {} must have the same rank",
                self.shard_shape, self.shape,
            )));
        }

        let mut tile_counts = Vec::with_capacity(shape.rank());
        for (dimension, (size, tile)) in shape.dims().iter().zip(self.shard_shape.dims()).enumerate() {
            if *tile == 0 || size % tile != 0 {
                return Err(Error::invalid_argument(format!(
                    "shard shape {} does not evenly divide shape {} along dimension #{dimension}",
                    self.shard_shape, self.shape,
                )));
            }
            tile_counts.push(size / tile);
        }
        let tile_count: usize = tile_counts.iter().product();
        if tile_count != self.devices.len() {
            return Err(Error::invalid_argument(format!(
                "shard shape {} tiles shape {} into {tile_count} shard(s), but this sharding has {} device(s)",
                self.shard_shape,
                self.shape,
                self.devices.len(),
            )));
        }

        Ok((0..tile_count)
            .map(|linear_index| {
                let tile_coordinate = tile_coordinate_for_linear_index(linear_index, tile_counts.as_slice());
                let origin = Index::new(
                    tile_coordinate
                        .iter()
                        .zip(self.shard_shape.dims())
                        .map(|(tile_index, tile)| tile_index * tile)
                        .collect(),
                );
                IndexDomain::new(origin, self.shard_shape.clone())
            })
            .collect())
    }
}

impl Display for ConcreteEvenSharding {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "ConcreteEvenSharding(devices: {}, memory_kind: {}, shape: {}, shard_shape: {})",
            self.devices, self.memory_kind, self.shape, self.shard_shape,
        )
    }
}

// ---------------------------------------------------------------------------
// Mesh sharding
// ---------------------------------------------------------------------------

/// Partitioning derived from a validated [`MeshPartition`] descriptor.
///
/// Device *i* of the sharding occupies the mesh coordinate with linear index *i* in the topology's canonical
/// row-major iteration order. Sharded dimensions are split evenly across the product of their assigned axis sizes;
/// replicated dimensions contribute their full extent to every device, so devices that differ only along replicated
/// mesh axes receive identical index domains.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MeshSharding {
    partition: MeshPartition,
    devices: DeviceList,
    memory_kind: MemoryKind,
}

impl MeshSharding {
    /// Stable type identity used by the external serialization registry.
    pub const TYPE_NAME: &'static str = "weft.shardings.MeshSharding";

    /// Creates a mesh sharding.
    ///
    /// Returns [`Error::InvalidArgument`] if the partition's mesh spans a different number of devices than
    /// `devices` contains.
    pub fn new(partition: MeshPartition, devices: DeviceList, memory_kind: MemoryKind) -> Result<Self, Error> {
        let mesh_device_count = partition.topology().device_count()?;
        if mesh_device_count != devices.len() {
            return Err(Error::invalid_argument(format!(
                "mesh partition spans {mesh_device_count} device(s), but got a device list with {} device(s)",
                devices.len(),
            )));
        }
        Ok(Self { partition, devices, memory_kind })
    }

    /// The mesh partition descriptor of this sharding.
    pub fn partition(&self) -> &MeshPartition {
        &self.partition
    }

    /// Devices of this sharding.
    pub fn devices(&self) -> &DeviceList {
        &self.devices
    }

    /// Memory kind of this sharding.
    pub fn memory_kind(&self) -> &MemoryKind {
        &self.memory_kind
    }

    /// Computes the per-shard dimension sizes for `shape`, validating the rank and that every sharded dimension is
    /// evenly divisible by its shard count. Replicated dimensions keep their full size.
    fn shard_dims(&self, shape: &Shape) -> Result<Vec<usize>, Error> {
        if shape.rank() != self.partition.rank() {
            return Err(Error::invalid_argument(format!(
                "mesh partition applies to arrays of rank {}, but got shape {shape} of rank {}",
                self.partition.rank(),
                shape.rank(),
            )));
        }
        shape
            .dims()
            .iter()
            .enumerate()
            .map(|(dimension, size)| {
                let shard_count = self.partition.shard_count(dimension)?;
                if size % shard_count != 0 {
                    return Err(Error::invalid_argument(format!(
                        "dimension #{dimension} of shape {shape} has size {size}, which does not divide evenly into \
                         {shard_count} shard(s)"
                    )));
                }
                Ok(size / shard_count)
            })
            .collect()
    }

    fn disassemble(&self, shape: &Shape) -> Result<Vec<(Shape, Arc<Sharding>)>, Error> {
        let shard_shape = Shape::new(self.shard_dims(shape)?);
        Ok(self
            .devices
            .devices()
            .iter()
            .map(|device| (shard_shape.clone(), single_device_sharding(*device, &self.memory_kind)))
            .collect())
    }

    fn disassemble_dynamic(&self, dynamic_shape: &DynamicShape) -> Result<Vec<(DynamicShape, Arc<Sharding>)>, Error> {
        if dynamic_shape.rank() != self.partition.rank() {
            return Err(Error::invalid_argument(format!(
                "mesh partition applies to arrays of rank {}, but got dynamic shape {dynamic_shape} of rank {}",
                self.partition.rank(),
                dynamic_shape.rank(),
            )));
        }

        let mut shard_bounds = Vec::with_capacity(dynamic_shape.rank());
        for (dimension, bound) in dynamic_shape.bounds().dims().iter().enumerate() {
            let shard_count = self.partition.shard_count(dimension)?;
            if shard_count == 1 {
                shard_bounds.push(*bound);
                continue;
            }
            // Partitioning a dimension whose size is only known at runtime has no defined convention; splitting the
            // bound instead of the actual size would change which elements each shard holds.
            if dynamic_shape.is_dynamic_dim(dimension) {
                return Err(Error::unimplemented(format!(
                    "dimension #{dimension} of dynamic shape {dynamic_shape} is dynamically sized and cannot be \
                     partitioned across mesh axes"
                )));
            }
            if bound % shard_count != 0 {
                return Err(Error::invalid_argument(format!(
                    "dimension #{dimension} of dynamic shape {dynamic_shape} has size {bound}, which does not divide \
                     evenly into {shard_count} shard(s)"
                )));
            }
            shard_bounds.push(bound / shard_count);
        }

        let shard_shape = DynamicShape::new(Shape::new(shard_bounds), dynamic_shape.dynamic_dims().to_vec())?;
        Ok(self
            .devices
            .devices()
            .iter()
            .map(|device| (shard_shape.clone(), single_device_sharding(*device, &self.memory_kind)))
            .collect())
    }

    fn index_domains(&self, shape: &Shape) -> Result<Vec<IndexDomain>, Error> {
        let shard_dims = self.shard_dims(shape)?;
        let extent = Shape::new(shard_dims.clone());
        Ok((0..self.devices.len())
            .map(|device_index| {
                let mesh_coordinate = self.partition.topology().coordinate_for_linear_index(device_index);
                let origin = Index::new(
                    shard_dims
                        .iter()
                        .enumerate()
                        .map(|(dimension, shard_dim)| {
                            self.partition.partition_index(mesh_coordinate.as_slice(), dimension) * shard_dim
                        })
                        .collect(),
                );
                IndexDomain::new(origin, extent.clone())
            })
            .collect())
    }
}

impl Display for MeshSharding {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "MeshSharding(devices: {}, memory_kind: {}, {})",
            self.devices, self.memory_kind, self.partition,
        )
    }
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn single_device_sharding(device: Device, memory_kind: &MemoryKind) -> Arc<Sharding> {
    Arc::new(Sharding::SingleDevice(SingleDeviceSharding::new(device, memory_kind.clone())))
}

fn tile_coordinate_for_linear_index(mut linear_index: usize, tile_counts: &[usize]) -> Vec<usize> {
    let mut coordinate = vec![0usize; tile_counts.len()];
    for dimension in (0..tile_counts.len()).rev() {
        coordinate[dimension] = linear_index % tile_counts[dimension];
        linear_index /= tile_counts[dimension];
    }
    coordinate
}

/// Enumerates the row-major tile grid of `shard_shape` over `shape`, or [`None`] if the shard shape does not tile
/// the shape evenly into exactly `device_count` tiles.
fn tile_grid_index_domains(shape: &Shape, shard_shape: &Shape, device_count: usize) -> Option<Vec<IndexDomain>> {
    if shard_shape.rank() != shape.rank() {
        return None;
    }
    let mut tile_counts = Vec::with_capacity(shape.rank());
    for (size, tile) in shape.dims().iter().zip(shard_shape.dims()) {
        if *tile == 0 || size % tile != 0 {
            return None;
        }
        tile_counts.push(size / tile);
    }
    if tile_counts.iter().product::<usize>() != device_count {
        return None;
    }
    Some(
        (0..device_count)
            .map(|linear_index| {
                let tile_coordinate = tile_coordinate_for_linear_index(linear_index, tile_counts.as_slice());
                let origin = Index::new(
                    tile_coordinate
                        .iter()
                        .zip(shard_shape.dims())
                        .map(|(tile_index, tile)| tile_index * tile)
                        .collect(),
                );
                IndexDomain::new(origin, shard_shape.clone())
            })
            .collect(),
    )
}

/// Interprets `shard_shapes` as a concatenation along a single axis of `shape`, or [`None`] if the shapes do not
/// admit that interpretation: they must differ from one another along exactly one axis, match `shape` exactly along
/// every other axis, and their extents along the concatenation axis must sum to the corresponding extent of `shape`.
fn concatenation_index_domains(shape: &Shape, shard_shapes: &[Shape]) -> Option<Vec<IndexDomain>> {
    let rank = shape.rank();
    if shard_shapes.iter().any(|shard_shape| shard_shape.rank() != rank) {
        return None;
    }

    let first_shard_shape = &shard_shapes[0];
    let mut concatenation_axis = None;
    for axis in 0..rank {
        if shard_shapes.iter().any(|shard_shape| shard_shape.dims()[axis] != first_shard_shape.dims()[axis]) {
            match concatenation_axis {
                None => concatenation_axis = Some(axis),
                Some(_) => return None,
            }
        }
    }
    let concatenation_axis = concatenation_axis?;

    for axis in 0..rank {
        if axis != concatenation_axis && first_shard_shape.dims()[axis] != shape.dims()[axis] {
            return None;
        }
    }
    let total: usize = shard_shapes.iter().map(|shard_shape| shard_shape.dims()[concatenation_axis]).sum();
    if total != shape.dims()[concatenation_axis] {
        return None;
    }

    let mut offset = 0;
    Some(
        shard_shapes
            .iter()
            .map(|shard_shape| {
                let mut origin = vec![0usize; rank];
                origin[concatenation_axis] = offset;
                offset += shard_shape.dims()[concatenation_axis];
                IndexDomain::new(Index::new(origin), shard_shape.clone())
            })
            .collect(),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
