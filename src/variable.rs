use crate::error::{Error, Result};
use crate::tensor::{Tensor, TensorElement};

/// A named tensor whose values can be updated in place and saved to a
/// checkpoint.
#[derive(Clone, Debug, PartialEq)]
pub struct Variable {
    name: String,
    tensor: Tensor,
}

impl Variable {
    pub fn new(name: &str, tensor: Tensor) -> Self {
        Self {
            name: name.to_string(),
            tensor,
        }
    }

    /// A variable of `shape` with every element set to zero.
    pub fn zeros<T: TensorElement>(name: &str, shape: &[usize]) -> Self {
        Self::filled(name, shape, T::default())
    }

    pub fn filled<T: TensorElement>(name: &str, shape: &[usize], value: T) -> Self {
        Self::new(name, Tensor::filled(shape, value))
    }

    pub fn from_values<T: TensorElement>(name: &str, shape: &[usize], values: &[T]) -> Result<Self> {
        Ok(Self::new(name, Tensor::new(shape, values)?))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tensor(&self) -> &Tensor {
        &self.tensor
    }

    pub fn shape(&self) -> &[usize] {
        self.tensor.shape()
    }

    pub fn values<T: TensorElement>(&self) -> Result<Vec<T>> {
        self.tensor.values()
    }

    /// Replaces every value, keeping the shape.
    pub fn assign<T: TensorElement>(&mut self, values: &[T]) -> Result<()> {
        // Checks the dtype before the shape.
        self.tensor.values::<T>()?;
        self.tensor = Tensor::new(self.tensor.shape(), values)?;
        Ok(())
    }

    /// Applies `f` to each element in place, e.g. `v.update(|x: f32| x + 1.0)`.
    pub fn update<T, F>(&mut self, f: F) -> Result<()>
    where
        T: TensorElement,
        F: FnMut(T) -> T,
    {
        let values: Vec<T> = self.values::<T>()?.into_iter().map(f).collect();
        self.assign(&values)
    }

    /// Combines two variables of the same shape element by element.
    pub fn zip_with<T, F>(a: &Variable, b: &Variable, mut f: F) -> Result<Vec<T>>
    where
        T: TensorElement,
        F: FnMut(T, T) -> T,
    {
        if a.shape() != b.shape() {
            return Err(Error::ShapeMismatch {
                expected: a.shape().to_vec(),
                found: b.shape().to_vec(),
            });
        }
        let lhs = a.values::<T>()?;
        let rhs = b.values::<T>()?;
        Ok(lhs.into_iter().zip(rhs).map(|(x, y)| f(x, y)).collect())
    }
}
