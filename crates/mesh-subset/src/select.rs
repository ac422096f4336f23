//! Index selection along one axis of a row-major array.

use mesh_common::{Values, Variable};

/// Gather `indices` along `axis` of a row-major array with the given shape.
///
/// All other axes are kept whole. Output order follows `indices`.
pub fn take_along_axis<T: Copy>(
    data: &[T],
    shape: &[usize],
    axis: usize,
    indices: &[usize],
) -> Vec<T> {
    let outer: usize = shape[..axis].iter().product();
    let axis_len = shape[axis];
    let inner: usize = shape[axis + 1..].iter().product();

    let mut out = Vec::with_capacity(outer * indices.len() * inner);
    for o in 0..outer {
        let base = o * axis_len;
        for &i in indices {
            let start = (base + i) * inner;
            out.extend_from_slice(&data[start..start + inner]);
        }
    }
    out
}

/// Restrict a variable to `indices` along the named dimension.
///
/// Returns the variable unchanged when it does not carry that dimension.
pub fn restrict_variable(var: &Variable, dim: &str, indices: &[usize]) -> Variable {
    let Some(axis) = var.axis_of(dim) else {
        return var.clone();
    };

    let values = match &var.values {
        Values::F32(v) => Values::F32(take_along_axis(v, &var.shape, axis, indices)),
        Values::F64(v) => Values::F64(take_along_axis(v, &var.shape, axis, indices)),
        Values::I32(v) => Values::I32(take_along_axis(v, &var.shape, axis, indices)),
    };

    let mut shape = var.shape.clone();
    shape[axis] = indices.len();

    Variable {
        dims: var.dims.clone(),
        shape,
        values,
        attributes: var.attributes.clone(),
    }
}
