use std::fmt;

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, Result};
pub use crate::proto::tensorflow::DataType;
use crate::shape;

/// The name TensorFlow uses for a dtype, e.g. `DT_FLOAT`.
pub fn dtype_name(dtype: DataType) -> &'static str {
    match dtype {
        DataType::DtInvalid => "DT_INVALID",
        DataType::DtFloat => "DT_FLOAT",
        DataType::DtDouble => "DT_DOUBLE",
        DataType::DtInt32 => "DT_INT32",
        DataType::DtUint8 => "DT_UINT8",
        DataType::DtInt16 => "DT_INT16",
        DataType::DtInt8 => "DT_INT8",
        DataType::DtString => "DT_STRING",
        DataType::DtComplex64 => "DT_COMPLEX64",
        DataType::DtInt64 => "DT_INT64",
        DataType::DtBool => "DT_BOOL",
        DataType::DtQint8 => "DT_QINT8",
        DataType::DtQuint8 => "DT_QUINT8",
        DataType::DtQint32 => "DT_QINT32",
        DataType::DtBfloat16 => "DT_BFLOAT16",
        DataType::DtQint16 => "DT_QINT16",
        DataType::DtQuint16 => "DT_QUINT16",
        DataType::DtUint16 => "DT_UINT16",
        DataType::DtComplex128 => "DT_COMPLEX128",
        DataType::DtHalf => "DT_HALF",
        DataType::DtResource => "DT_RESOURCE",
        DataType::DtVariant => "DT_VARIANT",
        DataType::DtUint32 => "DT_UINT32",
        DataType::DtUint64 => "DT_UINT64",
    }
}

/// Byte width of one element, or `None` for variable-length and unsupported
/// dtypes.
pub fn element_size(dtype: DataType) -> Option<usize> {
    match dtype {
        DataType::DtFloat | DataType::DtInt32 | DataType::DtUint32 => Some(4),
        DataType::DtDouble | DataType::DtInt64 | DataType::DtUint64 => Some(8),
        DataType::DtInt16 | DataType::DtUint16 => Some(2),
        DataType::DtInt8 | DataType::DtUint8 | DataType::DtBool => Some(1),
        _ => None,
    }
}

/// A value type that can be stored in a checkpointed tensor.
pub trait TensorElement: Copy + Default + PartialEq + fmt::Debug + 'static {
    const DATA_TYPE: DataType;
    const SIZE: usize;

    /// Encodes `values` little-endian into `out`, which holds exactly
    /// `values.len() * SIZE` bytes.
    fn encode(values: &[Self], out: &mut [u8]);

    /// Decodes `bytes` into `out`, which holds exactly `bytes.len() / SIZE`
    /// elements.
    fn decode(bytes: &[u8], out: &mut [Self]);

    /// Renders a single value the way numpy prints array elements.
    fn render(&self) -> String;
}

fn render_float(v: f64) -> String {
    if v.is_nan() {
        "nan".to_string()
    } else if v.is_infinite() {
        (if v > 0.0 { "inf" } else { "-inf" }).to_string()
    } else if v.fract() == 0.0 && v.abs() < 1e16 {
        format!("{:.0}.", v)
    } else {
        format!("{}", v)
    }
}

/// Whether numpy would print these values in scientific notation: any
/// magnitude of at least 1e8, a non-zero one below 1e-4, or a spread of more
/// than three orders.
fn needs_scientific(values: &[f64]) -> bool {
    let mut magnitudes = values
        .iter()
        .map(|v| v.abs())
        .filter(|v| v.is_finite() && *v != 0.0);
    let first = match magnitudes.next() {
        Some(first) => first,
        None => return false,
    };
    let (min, max) = magnitudes.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
    max >= 1e8 || min < 1e-4 || max / min > 1e3
}

/// Renders values as `1.5e+20`, with every mantissa carrying the same number
/// of fraction digits and exponents of at least two digits.
fn render_scientific(values: &[f64]) -> Vec<String> {
    let parts: Vec<Option<(String, String, i32)>> = values
        .iter()
        .map(|v| -> Option<(String, String, i32)> {
            if !v.is_finite() {
                return None;
            }
            let shortest = format!("{:e}", v);
            let (mantissa, exp) = shortest.split_once('e')?;
            let (int, frac) = mantissa.split_once('.').unwrap_or((mantissa, ""));
            Some((int.to_string(), frac.to_string(), exp.parse().ok()?))
        })
        .collect();
    let precision = parts.iter().flatten().map(|(_, frac, _)| frac.len()).max().unwrap_or(0);
    let exp_width = parts
        .iter()
        .flatten()
        .map(|(_, _, exp)| exp.unsigned_abs().to_string().len())
        .max()
        .unwrap_or(0)
        .max(2);
    values
        .iter()
        .zip(parts)
        .map(|(&v, part)| match part {
            Some((int, frac, exp)) => format!(
                "{}.{:0<p$}e{}{:0>w$}",
                int,
                frac,
                if exp < 0 { '-' } else { '+' },
                exp.unsigned_abs(),
                p = precision,
                w = exp_width
            ),
            None => render_float(v),
        })
        .collect()
}

fn render_floats(values: &[f64]) -> Vec<String> {
    if needs_scientific(values) {
        render_scientific(values)
    } else {
        values.iter().map(|&v| render_float(v)).collect()
    }
}

/// Widens an `f32` through its shortest decimal form, so `0.1f32` stays
/// `0.1` instead of `0.10000000149011612`.
fn widen(v: f32) -> f64 {
    format!("{}", v).parse().unwrap_or(f64::NAN)
}

macro_rules! impl_float_element {
    ($ty:ty, $dtype:ident, $size:expr, $write:ident, $read:ident, $widen:expr) => {
        impl TensorElement for $ty {
            const DATA_TYPE: DataType = DataType::$dtype;
            const SIZE: usize = $size;

            fn encode(values: &[Self], out: &mut [u8]) {
                LittleEndian::$write(values, out)
            }

            fn decode(bytes: &[u8], out: &mut [Self]) {
                LittleEndian::$read(bytes, out)
            }

            fn render(&self) -> String {
                render_floats(&[$widen(*self)]).remove(0)
            }
        }
    };
}

macro_rules! impl_int_element {
    ($ty:ty, $dtype:ident, $size:expr, $write:ident, $read:ident) => {
        impl TensorElement for $ty {
            const DATA_TYPE: DataType = DataType::$dtype;
            const SIZE: usize = $size;

            fn encode(values: &[Self], out: &mut [u8]) {
                LittleEndian::$write(values, out)
            }

            fn decode(bytes: &[u8], out: &mut [Self]) {
                LittleEndian::$read(bytes, out)
            }

            fn render(&self) -> String {
                self.to_string()
            }
        }
    };
}

impl_float_element!(f32, DtFloat, 4, write_f32_into, read_f32_into, widen);
impl_float_element!(f64, DtDouble, 8, write_f64_into, read_f64_into, f64::from);
impl_int_element!(i16, DtInt16, 2, write_i16_into, read_i16_into);
impl_int_element!(i32, DtInt32, 4, write_i32_into, read_i32_into);
impl_int_element!(i64, DtInt64, 8, write_i64_into, read_i64_into);
impl_int_element!(u16, DtUint16, 2, write_u16_into, read_u16_into);
impl_int_element!(u32, DtUint32, 4, write_u32_into, read_u32_into);
impl_int_element!(u64, DtUint64, 8, write_u64_into, read_u64_into);

impl TensorElement for u8 {
    const DATA_TYPE: DataType = DataType::DtUint8;
    const SIZE: usize = 1;

    fn encode(values: &[Self], out: &mut [u8]) {
        out.copy_from_slice(values);
    }

    fn decode(bytes: &[u8], out: &mut [Self]) {
        out.copy_from_slice(bytes);
    }

    fn render(&self) -> String {
        self.to_string()
    }
}

impl TensorElement for i8 {
    const DATA_TYPE: DataType = DataType::DtInt8;
    const SIZE: usize = 1;

    fn encode(values: &[Self], out: &mut [u8]) {
        for (dst, &v) in out.iter_mut().zip(values) {
            *dst = v as u8;
        }
    }

    fn decode(bytes: &[u8], out: &mut [Self]) {
        for (dst, &b) in out.iter_mut().zip(bytes) {
            *dst = b as i8;
        }
    }

    fn render(&self) -> String {
        self.to_string()
    }
}

impl TensorElement for bool {
    const DATA_TYPE: DataType = DataType::DtBool;
    const SIZE: usize = 1;

    fn encode(values: &[Self], out: &mut [u8]) {
        for (dst, &v) in out.iter_mut().zip(values) {
            *dst = u8::from(v);
        }
    }

    fn decode(bytes: &[u8], out: &mut [Self]) {
        for (dst, &b) in out.iter_mut().zip(bytes) {
            *dst = b != 0;
        }
    }

    fn render(&self) -> String {
        (if *self { "True" } else { "False" }).to_string()
    }
}

/// A dense, row-major tensor holding little-endian encoded values.
#[derive(Clone, Debug, PartialEq)]
pub struct Tensor {
    dtype: DataType,
    shape: Vec<usize>,
    content: Vec<u8>,
}

impl Tensor {
    pub fn new<T: TensorElement>(shape: &[usize], values: &[T]) -> Result<Self> {
        if shape::checked_product(shape.iter().copied()) != Some(values.len()) {
            return Err(Error::ShapeMismatch {
                expected: shape.to_vec(),
                found: vec![values.len()],
            });
        }
        let mut content = vec![0u8; values.len() * T::SIZE];
        T::encode(values, &mut content);
        Ok(Self {
            dtype: T::DATA_TYPE,
            shape: shape.to_vec(),
            content,
        })
    }

    /// A tensor of `shape` with every element equal to `value`.
    ///
    /// # Panics
    ///
    /// Panics if the element count of `shape` overflows `usize`.
    pub fn filled<T: TensorElement>(shape: &[usize], value: T) -> Self {
        let count = match shape::checked_product(shape.iter().copied()) {
            Some(count) => count,
            None => panic!("tensor shape {:?} overflows usize", shape),
        };
        let values = vec![value; count];
        let mut content = vec![0u8; values.len() * T::SIZE];
        T::encode(&values, &mut content);
        Self {
            dtype: T::DATA_TYPE,
            shape: shape.to_vec(),
            content,
        }
    }

    pub fn scalar<T: TensorElement>(value: T) -> Self {
        Self::filled(&[], value)
    }

    /// Wraps already-encoded bytes. For fixed-width dtypes the length must
    /// match the shape; other dtypes are kept as opaque bytes.
    pub fn from_raw(dtype: DataType, shape: Vec<usize>, content: Vec<u8>) -> Result<Self> {
        let count = shape::checked_product(shape.iter().copied());
        if let Some(size) = element_size(dtype) {
            if count.and_then(|n| n.checked_mul(size)) != Some(content.len()) {
                return Err(Error::ShapeMismatch {
                    expected: shape,
                    found: vec![content.len() / size],
                });
            }
        } else if count.is_none() {
            return Err(Error::ShapeMismatch {
                expected: shape,
                found: vec![content.len()],
            });
        }
        Ok(Self {
            dtype,
            shape,
            content,
        })
    }

    pub fn dtype(&self) -> DataType {
        self.dtype
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn num_elements(&self) -> usize {
        self.shape.iter().product()
    }

    /// The encoded bytes, exactly as they are stored in a data shard.
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn into_content(self) -> Vec<u8> {
        self.content
    }

    pub fn values<T: TensorElement>(&self) -> Result<Vec<T>> {
        if self.dtype != T::DATA_TYPE {
            return Err(Error::DataTypeMismatch {
                expected: dtype_name(T::DATA_TYPE),
                found: dtype_name(self.dtype),
            });
        }
        let mut values = vec![T::default(); self.content.len() / T::SIZE];
        T::decode(&self.content, &mut values);
        Ok(values)
    }

    /// Every element rendered as text, in row-major order.
    pub fn rendered_values(&self) -> Result<Vec<String>> {
        macro_rules! render_as {
            ($ty:ty) => {
                self.values::<$ty>()?.iter().map(TensorElement::render).collect()
            };
        }
        Ok(match self.dtype {
            DataType::DtFloat => {
                let widened: Vec<f64> = self.values::<f32>()?.into_iter().map(widen).collect();
                render_floats(&widened)
            }
            DataType::DtDouble => render_floats(&self.values::<f64>()?),
            DataType::DtInt8 => render_as!(i8),
            DataType::DtInt16 => render_as!(i16),
            DataType::DtInt32 => render_as!(i32),
            DataType::DtInt64 => render_as!(i64),
            DataType::DtUint8 => render_as!(u8),
            DataType::DtUint16 => render_as!(u16),
            DataType::DtUint32 => render_as!(u32),
            DataType::DtUint64 => render_as!(u64),
            DataType::DtBool => render_as!(bool),
            other => {
                return Err(Error::Unsupported(format!(
                    "rendering {} values",
                    dtype_name(other)
                )))
            }
        })
    }
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = match self.rendered_values() {
            Ok(rendered) => rendered,
            Err(_) => {
                return write!(
                    f,
                    "<{} bytes of {}>",
                    self.content.len(),
                    dtype_name(self.dtype)
                )
            }
        };
        let dims: Vec<i64> = self.shape.iter().map(|&d| d as i64).collect();
        match shape::nest(&rendered, &dims) {
            Ok(nested) => f.write_str(&shape::render(&nested)),
            Err(_) => write!(f, "[{}]", rendered.join(" ")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_encodes_little_endian() {
        let t = Tensor::new(&[2], &[1.0f32, -2.0]).unwrap();
        assert_eq!(t.dtype(), DataType::DtFloat);
        assert_eq!(t.content(), &[0, 0, 0x80, 0x3f, 0, 0, 0, 0xc0]);
        assert_eq!(t.values::<f32>().unwrap(), vec![1.0, -2.0]);
    }

    #[test]
    fn test_new_rejects_wrong_element_count() {
        match Tensor::new(&[2, 2], &[1i32, 2, 3]) {
            Err(Error::ShapeMismatch { expected, found }) => {
                assert_eq!(expected, vec![2, 2]);
                assert_eq!(found, vec![3]);
            }
            other => panic!("expected shape mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_values_checks_dtype() {
        let t = Tensor::new(&[1], &[7i64]).unwrap();
        match t.values::<f32>() {
            Err(Error::DataTypeMismatch { expected, found }) => {
                assert_eq!(expected, "DT_FLOAT");
                assert_eq!(found, "DT_INT64");
            }
            other => panic!("expected dtype mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_scalar_and_empty_shapes() {
        let s = Tensor::scalar(3u16);
        assert!(s.shape().is_empty());
        assert_eq!(s.num_elements(), 1);
        assert_eq!(s.to_string(), "3");

        let e = Tensor::new::<f64>(&[0, 4], &[]).unwrap();
        assert_eq!(e.num_elements(), 0);
        assert!(e.content().is_empty());
        assert_eq!(e.to_string(), "[]");
    }

    #[test]
    fn test_from_raw_validates_fixed_width_lengths() {
        assert!(Tensor::from_raw(DataType::DtInt32, vec![2], vec![0; 8]).is_ok());
        assert!(Tensor::from_raw(DataType::DtInt32, vec![2], vec![0; 7]).is_err());
        // Variable-length types are carried as opaque bytes.
        let opaque = Tensor::from_raw(DataType::DtString, vec![1], vec![1, 2, 3]).unwrap();
        assert!(opaque.rendered_values().is_err());
        assert_eq!(opaque.to_string(), "<3 bytes of DT_STRING>");
    }

    #[test]
    fn test_display_matches_numpy() {
        let ones = Tensor::new(&[3], &[1.0f32; 3]).unwrap();
        assert_eq!(ones.to_string(), "[1. 1. 1.]");

        let mixed = Tensor::new(&[2, 2], &[0.0f32, 1.5, -2.0, 3.0]).unwrap();
        assert_eq!(mixed.to_string(), "[[ 0.   1.5]\n [-2.   3. ]]");

        let flags = Tensor::new(&[2], &[true, false]).unwrap();
        assert_eq!(flags.to_string(), "[ True False]");
    }

    #[test]
    fn test_extreme_floats_switch_to_scientific() {
        let t = Tensor::new(&[3], &[1e20f32, 1e-30, 0.5]).unwrap();
        assert_eq!(t.to_string(), "[1.e+20 1.e-30 5.e-01]");

        let t = Tensor::new(&[2], &[1.5e20f64, -1e-30]).unwrap();
        assert_eq!(t.to_string(), "[ 1.5e+20 -1.0e-30]");

        let spread = Tensor::new(&[2], &[1.0f64, 2000.0]).unwrap();
        assert_eq!(spread.to_string(), "[1.e+00 2.e+03]");

        assert_eq!(Tensor::scalar(1e-5f64).to_string(), "1.e-05");
        assert_eq!(Tensor::new(&[2], &[0.5f32, 100.0]).unwrap().to_string(), "[  0.5 100. ]");
    }

    #[test]
    fn test_overflowing_shapes_are_rejected() {
        let huge = vec![1usize << 33, 1 << 33];
        assert!(matches!(
            Tensor::new::<f32>(&huge, &[]),
            Err(Error::ShapeMismatch { .. })
        ));
        assert!(matches!(
            Tensor::from_raw(DataType::DtFloat, huge.clone(), Vec::new()),
            Err(Error::ShapeMismatch { .. })
        ));
        assert!(matches!(
            Tensor::from_raw(DataType::DtString, huge, Vec::new()),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_small_ints_round_trip() {
        let t = Tensor::new(&[3], &[-1i8, 0, 127]).unwrap();
        assert_eq!(t.content(), &[0xff, 0, 0x7f]);
        assert_eq!(t.values::<i8>().unwrap(), vec![-1, 0, 127]);
    }
}
