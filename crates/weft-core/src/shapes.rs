use std::fmt::Display;

use crate::errors::Error;

/// Static shape of a logical or per-shard array: an ordered sequence of non-negative dimension sizes.
///
/// The dimension count is fixed at construction. Shapes are plain values with structural equality; a shape carries no
/// element type or layout information.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    /// Creates a shape from dimension sizes.
    pub fn new(dims: Vec<usize>) -> Self {
        Self { dims }
    }

    /// Dimension sizes of this shape.
    pub fn dims(&self) -> &[usize] {
        self.dims.as_slice()
    }

    /// Number of dimensions of this shape.
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Total number of elements in an array of this shape.
    pub fn num_elements(&self) -> usize {
        self.dims.iter().product()
    }
}

impl Display for Shape {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "[")?;
        for (dimension, size) in self.dims.iter().enumerate() {
            if dimension > 0 {
                write!(formatter, ", ")?;
            }
            write!(formatter, "{size}")?;
        }
        write!(formatter, "]")
    }
}

/// Shape whose dimensions may be dynamically sized at runtime.
///
/// Each dimension is either statically sized or dynamically sized with an upper bound; the stored [`Shape`] holds the
/// static size for static dimensions and the bound for dynamic ones. The bound of a dynamic dimension is always at
/// least as large as the actual runtime size, which allows buffers to be allocated up front while the exact size is
/// only discovered during execution.
///
/// At least one dimension of a dynamic shape must be dynamically sized; fully static shapes are represented by
/// [`Shape`] alone.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DynamicShape {
    bounds: Shape,
    dynamic_dims: Vec<bool>,
}

impl DynamicShape {
    /// Creates a dynamic shape from per-dimension bounds and dynamic/static tags.
    ///
    /// Returns [`Error::InvalidArgument`] if the number of tags does not match the rank of `bounds`.
    ///
    /// # Panics
    ///
    /// Panics if no dimension is tagged as dynamic. Fully static shapes must be represented by [`Shape`].
    pub fn new(bounds: Shape, dynamic_dims: Vec<bool>) -> Result<Self, Error> {
        if dynamic_dims.len() != bounds.rank() {
            return Err(Error::invalid_argument(format!(
                "got {} dynamic-dimension tag(s) for shape {bounds} with rank {}",
                dynamic_dims.len(),
                bounds.rank(),
            )));
        }
        assert!(
            dynamic_dims.iter().any(|is_dynamic| *is_dynamic),
            "at least one dimension of a dynamic shape must be dynamically sized",
        );
        Ok(Self { bounds, dynamic_dims })
    }

    /// Per-dimension sizes of this shape, holding the bound for dynamic dimensions and the exact size for static
    /// ones. This is the shape of the padded buffer that can hold any runtime instance of this dynamic shape.
    pub fn bounds(&self) -> &Shape {
        &self.bounds
    }

    /// Number of dimensions of this shape.
    pub fn rank(&self) -> usize {
        self.bounds.rank()
    }

    /// Per-dimension dynamic/static tags of this shape.
    pub fn dynamic_dims(&self) -> &[bool] {
        self.dynamic_dims.as_slice()
    }

    /// Returns `true` iff the provided dimension is dynamically sized.
    pub fn is_dynamic_dim(&self, dimension: usize) -> bool {
        self.dynamic_dims[dimension]
    }
}

impl Display for DynamicShape {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "[")?;
        for (dimension, size) in self.bounds.dims().iter().enumerate() {
            if dimension > 0 {
                write!(formatter, ", ")?;
            }
            if self.dynamic_dims[dimension] {
                write!(formatter, "<={size}")?;
            } else {
                write!(formatter, "{size}")?;
            }
        }
        write!(formatter, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_accessors() {
        let shape = Shape::new(vec![4, 2, 3]);
        assert_eq!(shape.dims(), &[4, 2, 3]);
        assert_eq!(shape.rank(), 3);
        assert_eq!(shape.num_elements(), 24);

        let scalar = Shape::new(Vec::new());
        assert_eq!(scalar.rank(), 0);
        assert_eq!(scalar.num_elements(), 1);
    }

    #[test]
    fn test_shape_display() {
        assert_eq!(Shape::new(vec![4, 2]).to_string(), "[4, 2]");
        assert_eq!(Shape::new(Vec::new()).to_string(), "[]");
    }

    #[test]
    fn test_dynamic_shape_construction() {
        let shape = DynamicShape::new(Shape::new(vec![4, 2]), vec![true, false]).unwrap();
        assert_eq!(shape.bounds(), &Shape::new(vec![4, 2]));
        assert_eq!(shape.rank(), 2);
        assert_eq!(shape.dynamic_dims(), &[true, false]);
        assert!(shape.is_dynamic_dim(0));
        assert!(!shape.is_dynamic_dim(1));
    }

    #[test]
    fn test_dynamic_shape_tag_count_mismatch() {
        assert!(matches!(
            DynamicShape::new(Shape::new(vec![4, 2]), vec![true]),
            Err(Error::InvalidArgument { .. }),
        ));
    }

    #[test]
    #[should_panic(expected = "at least one dimension")]
    fn test_dynamic_shape_requires_a_dynamic_dimension() {
        let _ = DynamicShape::new(Shape::new(vec![4, 2]), vec![false, false]);
    }

    #[test]
    fn test_dynamic_shape_display() {
        let shape = DynamicShape::new(Shape::new(vec![4, 2]), vec![true, false]).unwrap();
        assert_eq!(shape.to_string(), "[<=4, 2]");
    }
}
