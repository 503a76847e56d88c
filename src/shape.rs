//! Shaping flat tensor values into nested lists and back.

use crate::error::{Error, Result};

/// A value nested to the depth of a tensor's rank.
#[derive(Clone, Debug, PartialEq)]
pub enum Nested<T> {
    Scalar(T),
    List(Vec<Nested<T>>),
}

impl<T> Nested<T> {
    /// Concatenates all leaves in row-major order.
    pub fn flatten(self) -> Vec<T> {
        let mut out = Vec::new();
        self.flatten_into(&mut out);
        out
    }

    fn flatten_into(self, out: &mut Vec<T>) {
        match self {
            Nested::Scalar(v) => out.push(v),
            Nested::List(items) => {
                for item in items {
                    item.flatten_into(out);
                }
            }
        }
    }

    /// Nesting depth: 0 for a scalar, 1 for a flat list.
    pub fn rank(&self) -> usize {
        match self {
            Nested::Scalar(_) => 0,
            Nested::List(items) => 1 + items.first().map_or(0, Nested::rank),
        }
    }
}

/// Product of `dims`, or `None` if it overflows `usize`.
pub(crate) fn checked_product<I: IntoIterator<Item = usize>>(dims: I) -> Option<usize> {
    dims.into_iter().try_fold(1usize, usize::checked_mul)
}

/// Resolves `-1` entries of `dims` against `len` elements.
///
/// Unknown dims are filled left to right, each taking whatever the known
/// dims after it leave over, so `[-1, -1]` over 6 values is `[6, 1]`.
pub fn resolve_dims(len: usize, dims: &[i64]) -> Result<Vec<usize>> {
    let mismatch = |expected: Vec<usize>| Error::ShapeMismatch {
        expected,
        found: vec![len],
    };
    let known = |d: i64| usize::try_from(d).unwrap_or(1);

    let mut resolved = Vec::with_capacity(dims.len());
    let mut remaining = len;
    for (i, &dim) in dims.iter().enumerate() {
        let size = match dim {
            d if d >= 0 => usize::try_from(d).map_err(|_| mismatch(resolved.clone()))?,
            -1 => match checked_product(dims[i + 1..].iter().map(|&d| known(d))) {
                Some(0) => 0,
                Some(later) => remaining / later,
                None => return Err(mismatch(resolved)),
            },
            other => {
                return Err(Error::Unsupported(format!("dimension size {}", other)));
            }
        };
        if size != 0 {
            remaining /= size;
        }
        resolved.push(size);
    }
    if checked_product(resolved.iter().copied()) != Some(len) {
        return Err(mismatch(resolved));
    }
    Ok(resolved)
}

/// Builds a nested value of `dims` from flat `values`.
pub fn nest<T: Clone>(values: &[T], dims: &[i64]) -> Result<Nested<T>> {
    let dims = resolve_dims(values.len(), dims)?;
    Ok(build(values, &dims))
}

fn build<T: Clone>(values: &[T], dims: &[usize]) -> Nested<T> {
    match dims.split_first() {
        None => Nested::Scalar(values[0].clone()),
        Some((&n, rest)) => {
            let stride = checked_product(rest.iter().copied()).unwrap_or(0);
            Nested::List(
                (0..n)
                    .map(|i| build(&values[i * stride..(i + 1) * stride], rest))
                    .collect(),
            )
        }
    }
}

pub fn reshape<T: Clone>(nested: Nested<T>, dims: &[i64]) -> Result<Nested<T>> {
    nest(&nested.flatten(), dims)
}

/// Renders nested text values the way numpy prints arrays: elements padded
/// to a common width with decimal points aligned, rows broken per axis.
pub fn render(nested: &Nested<String>) -> String {
    let mut leaves = Vec::new();
    collect_leaves(nested, &mut leaves);
    let pad = Padding::measure(&leaves);
    let mut out = String::new();
    render_into(nested, 0, &pad, &mut out);
    out
}

fn collect_leaves<'a>(nested: &'a Nested<String>, out: &mut Vec<&'a str>) {
    match nested {
        Nested::Scalar(s) => out.push(s),
        Nested::List(items) => items.iter().for_each(|item| collect_leaves(item, out)),
    }
}

struct Padding {
    int_width: usize,
    frac_width: Option<usize>,
}

impl Padding {
    fn measure(leaves: &[&str]) -> Self {
        let mut int_width = 0;
        let mut frac_width = None;
        for leaf in leaves {
            match leaf.split_once('.') {
                Some((int, frac)) => {
                    int_width = int_width.max(int.len());
                    frac_width = Some(frac_width.unwrap_or(0).max(frac.len()));
                }
                None => int_width = int_width.max(leaf.len()),
            }
        }
        Padding {
            int_width,
            frac_width,
        }
    }

    fn apply(&self, leaf: &str) -> String {
        match (self.frac_width, leaf.split_once('.')) {
            (Some(fw), Some((int, frac))) => {
                format!("{:>iw$}.{:<fw$}", int, frac, iw = self.int_width, fw = fw)
            }
            (Some(fw), None) => format!("{:>w$}", leaf, w = self.int_width + 1 + fw),
            (None, _) => format!("{:>w$}", leaf, w = self.int_width),
        }
    }
}

fn render_into(nested: &Nested<String>, depth: usize, pad: &Padding, out: &mut String) {
    match nested {
        Nested::Scalar(s) => out.push_str(&pad.apply(s)),
        Nested::List(items) => {
            out.push('[');
            let child_rank = items.first().map_or(0, Nested::rank);
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    if child_rank == 0 {
                        out.push(' ');
                    } else {
                        out.push_str(&"\n".repeat(child_rank));
                        out.push_str(&" ".repeat(depth + 1));
                    }
                }
                render_into(item, depth + 1, pad, out);
            }
            out.push(']');
        }
    }
}
