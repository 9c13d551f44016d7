//! Mesh descriptor types consumed by mesh-parameterized shardings.
//!
//! A [`MeshTopology`] organizes the devices of a sharding into a logical multi-dimensional grid with named axes, and
//! a [`MeshPartition`] maps each logical array dimension onto a subset of those axes (or marks it replicated). Both
//! are validated at construction; shardings consume them as pre-validated values and never re-check their internal
//! consistency.

use std::collections::{HashMap, HashSet};
use std::fmt::Display;

use crate::errors::Error;

/// A named axis in a logical device mesh, with a size equal to the number of devices along that axis.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MeshAxis {
    name: String,
    size: usize,
}

impl MeshAxis {
    /// Creates a mesh axis. Returns [`Error::InvalidArgument`] if the name is empty or the size is `0`.
    pub fn new<N: Into<String>>(name: N, size: usize) -> Result<Self, Error> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::invalid_argument("mesh axis names must be non-empty"));
        }
        if size == 0 {
            return Err(Error::invalid_argument(format!("mesh axis '{name}' must have size > 0")));
        }
        Ok(Self { name, size })
    }

    /// Name of this axis.
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Size of this axis.
    pub fn size(&self) -> usize {
        self.size
    }
}

impl Display for MeshAxis {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}={}", self.name, self.size)
    }
}

/// Logical multi-dimensional grid of devices, described by named axes.
///
/// A topology captures only axis names and sizes; binding to concrete devices happens when a mesh-parameterized
/// sharding combines a topology with a device list. The canonical iteration order over mesh coordinates is
/// **row-major** with respect to the axis list: for axes `(x=4, y=2)`, the coordinate `(i, j)` has linear index
/// `i * 2 + j`, and the device at that linear index in the sharding's device list occupies that coordinate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MeshTopology {
    axes: Vec<MeshAxis>,
    axis_index_by_name: HashMap<String, usize>,
}

impl MeshTopology {
    /// Creates a topology from named axes.
    ///
    /// Returns [`Error::InvalidArgument`] if any axis name appears more than once.
    pub fn new(axes: Vec<MeshAxis>) -> Result<Self, Error> {
        let mut axis_index_by_name = HashMap::with_capacity(axes.len());
        for (axis_index, axis) in axes.iter().enumerate() {
            if axis_index_by_name.insert(axis.name.clone(), axis_index).is_some() {
                return Err(Error::invalid_argument(format!("mesh axis '{}' appears more than once", axis.name)));
            }
        }
        Ok(Self { axes, axis_index_by_name })
    }

    /// Returns the axes of this topology.
    pub fn axes(&self) -> &[MeshAxis] {
        self.axes.as_slice()
    }

    /// Returns the index of `axis_name` in this topology, if present.
    pub fn axis_index<S: AsRef<str>>(&self, axis_name: S) -> Option<usize> {
        self.axis_index_by_name.get(axis_name.as_ref()).copied()
    }

    /// Returns the size of `axis_name` in this topology, if present.
    pub fn axis_size<S: AsRef<str>>(&self, axis_name: S) -> Option<usize> {
        self.axis_index(axis_name).map(|axis_index| self.axes[axis_index].size)
    }

    /// Returns the total number of devices spanned by this topology (the product of all axis sizes; `1` for an empty
    /// axis list). Returns [`Error::InvalidArgument`] if the product overflows.
    pub fn device_count(&self) -> Result<usize, Error> {
        self.axes.iter().try_fold(1usize, |count, axis| {
            count
                .checked_mul(axis.size)
                .ok_or_else(|| Error::invalid_argument("mesh device count overflows usize"))
        })
    }

    /// Returns the mesh coordinate at the provided linear index in the canonical row-major iteration order.
    pub fn coordinate_for_linear_index(&self, mut linear_index: usize) -> Vec<usize> {
        let mut coordinate = vec![0usize; self.axes.len()];
        for axis_index in (0..self.axes.len()).rev() {
            let axis_size = self.axes[axis_index].size;
            coordinate[axis_index] = linear_index % axis_size;
            linear_index /= axis_size;
        }
        coordinate
    }
}

impl Display for MeshTopology {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "[")?;
        for (axis_index, axis) in self.axes.iter().enumerate() {
            if axis_index > 0 {
                write!(formatter, ", ")?;
            }
            write!(formatter, "{axis}")?;
        }
        write!(formatter, "]")
    }
}

/// Assignment of one logical array dimension to mesh axes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum DimensionSharding {
    /// The dimension is replicated: its entire extent is present on every device.
    Replicated,

    /// The dimension is partitioned by the named mesh axes, from major to minor. The number of shards along the
    /// dimension equals the product of the referenced axis sizes.
    Sharded(Vec<String>),
}

impl DimensionSharding {
    /// Creates a replicated dimension assignment.
    pub fn replicated() -> Self {
        Self::Replicated
    }

    /// Creates a dimension assignment partitioned by exactly one mesh axis.
    pub fn sharded<N: Into<String>>(axis_name: N) -> Self {
        Self::Sharded(vec![axis_name.into()])
    }

    /// Creates a dimension assignment partitioned by multiple mesh axes (major to minor).
    pub fn sharded_by<I, N>(axis_names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        Self::Sharded(axis_names.into_iter().map(Into::into).collect())
    }

    /// Returns the mesh axes partitioning this dimension, if it is sharded.
    pub fn mesh_axes(&self) -> Option<&[String]> {
        match self {
            Self::Sharded(axis_names) => Some(axis_names.as_slice()),
            Self::Replicated => None,
        }
    }
}

impl Display for DimensionSharding {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Replicated => write!(formatter, "replicated"),
            Self::Sharded(axis_names) => {
                write!(formatter, "{{")?;
                for (axis_index, axis_name) in axis_names.iter().enumerate() {
                    if axis_index > 0 {
                        write!(formatter, ", ")?;
                    }
                    write!(formatter, "{axis_name}")?;
                }
                write!(formatter, "}}")
            }
        }
    }
}

/// Validated mesh descriptor: a [`MeshTopology`] plus one [`DimensionSharding`] per logical array dimension.
///
/// Mesh axes that no dimension references are the _replicated axes_ of the partition: devices that differ only along
/// those axes hold replicas of the same array region.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MeshPartition {
    topology: MeshTopology,
    dimensions: Vec<DimensionSharding>,
}

impl MeshPartition {
    /// Creates a mesh partition from a topology and per-dimension assignments.
    ///
    /// Returns [`Error::InvalidArgument`] if a sharded dimension references an axis that does not exist in the
    /// topology, references no axes at all, or if any mesh axis is used by more than one dimension (or more than once
    /// within one dimension).
    pub fn new(topology: MeshTopology, dimensions: Vec<DimensionSharding>) -> Result<Self, Error> {
        let mut used_axes = HashSet::new();
        for (dimension, dimension_sharding) in dimensions.iter().enumerate() {
            if let DimensionSharding::Sharded(axis_names) = dimension_sharding {
                if axis_names.is_empty() {
                    return Err(Error::invalid_argument(format!(
                        "sharded dimension #{dimension} references no mesh axes"
                    )));
                }
                for axis_name in axis_names {
                    if topology.axis_index(axis_name).is_none() {
                        return Err(Error::invalid_argument(format!(
                            "dimension #{dimension} references unknown mesh axis '{axis_name}'"
                        )));
                    }
                    if !used_axes.insert(axis_name.clone()) {
                        return Err(Error::invalid_argument(format!(
                            "mesh axis '{axis_name}' is used more than once in the partition"
                        )));
                    }
                }
            }
        }
        Ok(Self { topology, dimensions })
    }

    /// Returns the topology of this partition.
    pub fn topology(&self) -> &MeshTopology {
        &self.topology
    }

    /// Returns the per-dimension assignments of this partition.
    pub fn dimensions(&self) -> &[DimensionSharding] {
        self.dimensions.as_slice()
    }

    /// Rank of the logical arrays that this partition applies to.
    pub fn rank(&self) -> usize {
        self.dimensions.len()
    }

    /// Returns the mesh axes that no dimension references. Devices that differ only along these axes hold replicas.
    pub fn replicated_axes(&self) -> Vec<&str> {
        let used: HashSet<&str> = self
            .dimensions
            .iter()
            .filter_map(DimensionSharding::mesh_axes)
            .flatten()
            .map(String::as_str)
            .collect();
        self.topology.axes().iter().map(MeshAxis::name).filter(|name| !used.contains(name)).collect()
    }

    /// Number of shards that the provided dimension is split into (the product of its assigned axis sizes; `1` for a
    /// replicated dimension). Returns [`Error::InvalidArgument`] if the product overflows.
    pub fn shard_count(&self, dimension: usize) -> Result<usize, Error> {
        match &self.dimensions[dimension] {
            DimensionSharding::Replicated => Ok(1),
            DimensionSharding::Sharded(axis_names) => axis_names.iter().try_fold(1usize, |count, axis_name| {
                let axis_size = self
                    .topology
                    .axis_size(axis_name)
                    .expect("partition validation guarantees that all referenced axes exist");
                count.checked_mul(axis_size).ok_or_else(|| {
                    Error::invalid_argument(format!("shard count of dimension #{dimension} overflows usize"))
                })
            }),
        }
    }

    /// Returns the partition index of the provided mesh coordinate along the provided dimension, accumulating the
    /// coordinate's components over the dimension's assigned axes from major to minor. Replicated dimensions always
    /// map to partition index `0`.
    pub(crate) fn partition_index(&self, mesh_coordinate: &[usize], dimension: usize) -> usize {
        match &self.dimensions[dimension] {
            DimensionSharding::Replicated => 0,
            DimensionSharding::Sharded(axis_names) => {
                let mut partition_index = 0usize;
                for axis_name in axis_names {
                    let axis_index = self
                        .topology
                        .axis_index(axis_name)
                        .expect("partition validation guarantees that all referenced axes exist");
                    partition_index = partition_index * self.topology.axes()[axis_index].size()
                        + mesh_coordinate[axis_index];
                }
                partition_index
            }
        }
    }
}

impl Display for MeshPartition {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "mesh={}, dimensions=[", self.topology)?;
        for (dimension, dimension_sharding) in self.dimensions.iter().enumerate() {
            if dimension > 0 {
                write!(formatter, ", ")?;
            }
            write!(formatter, "{dimension_sharding}")?;
        }
        write!(formatter, "]")
    }
}
