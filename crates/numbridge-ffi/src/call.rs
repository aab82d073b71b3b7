//! Call-form resolution and invocation of native entry points.

use numbridge_marshal::{
    to_native_scalar, DimensionPolicy, MatrixBuffer, NativeComplex, NativeInt, NumericKind,
    ValueShape, VectorBuffer,
};
use numbridge_value::Value;

use crate::abi::{EntryPoint, NativeSlot, ScalarCell};
use crate::error::{CallError, Result};
use crate::types::{CallSignature, SizeExpr};

/// Which of a signature's two accepted argument lists a call used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallForm {
    /// Every parameter was supplied.
    Full,
    /// Derived size parameters were omitted and computed from the arrays.
    Short,
}

/// A call whose argument list has been matched against its signature.
#[derive(Debug, Clone)]
pub struct ResolvedCall<'a> {
    pub signature: &'a CallSignature,
    pub form: CallForm,
    /// One value per parameter, derived sizes filled in.
    pub args: Vec<Value>,
}

impl CallSignature {
    /// Pick the call form for `args`. The choice is made once, from the
    /// argument count alone.
    pub fn resolve(&self, args: &[Value]) -> Result<ResolvedCall<'_>> {
        let form = if args.len() == self.full_arity() {
            CallForm::Full
        } else if self.short_arity() == Some(args.len()) {
            CallForm::Short
        } else {
            return Err(CallError::ArgumentCount {
                function: self.name.clone(),
                got: args.len(),
                full: self.full_arity(),
                short: self.short_arity(),
            });
        };
        log::debug!("{}: {:?} form with {} argument(s)", self.name, form, args.len());

        let args = match form {
            CallForm::Full => args.to_vec(),
            CallForm::Short => self.complete_short_form(args)?,
        };
        Ok(ResolvedCall {
            signature: self,
            form,
            args,
        })
    }

    fn complete_short_form(&self, supplied: &[Value]) -> Result<Vec<Value>> {
        let mut slots: Vec<Option<Value>> = Vec::with_capacity(self.params.len());
        let mut supplied = supplied.iter();
        for param in &self.params {
            slots.push(match param.derived {
                Some(_) => None,
                None => supplied.next().cloned(),
            });
        }

        for (i, param) in self.params.iter().enumerate() {
            if let Some(expr) = &param.derived {
                let size = expr.eval(self.bound(expr, &slots))?;
                slots[i] = Some(Value::Int(size));
            }
        }

        let args: Vec<Value> = slots
            .into_iter()
            .zip(&self.params)
            .map(|(slot, param)| {
                slot.ok_or_else(|| {
                    CallError::Signature(format!("parameter '{}' was not bound", param.name))
                })
            })
            .collect::<Result<_>>()?;

        self.check_sizes(&args)?;
        Ok(args)
    }

    /// Every declared size of every array must agree with the derived sizes.
    fn check_sizes(&self, args: &[Value]) -> Result<()> {
        for (param, value) in self.params.iter().zip(args) {
            for (axis, expr) in param.dims.iter().enumerate() {
                let expected = expr.eval(self.argument(expr, args))?;
                let actual = match param.ty.shape {
                    ValueShape::Vector => SizeExpr::Len(param.name.clone()).eval(Some(value))?,
                    ValueShape::Matrix if axis == 0 => {
                        SizeExpr::Rows(param.name.clone()).eval(Some(value))?
                    }
                    ValueShape::Matrix => SizeExpr::Cols(param.name.clone()).eval(Some(value))?,
                    ValueShape::Scalar => continue,
                };
                if actual != expected {
                    return Err(CallError::WrongSize {
                        function: self.name.clone(),
                        detail: format!(
                            "'{}' has size {} along axis {}, expected {} = {}",
                            param.name, actual, axis, expr, expected
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    fn bound<'v>(&self, expr: &SizeExpr, slots: &'v [Option<Value>]) -> Option<&'v Value> {
        let idx = self.param_index(expr.referenced()?)?;
        slots.get(idx)?.as_ref()
    }

    fn argument<'v>(&self, expr: &SizeExpr, args: &'v [Value]) -> Option<&'v Value> {
        args.get(self.param_index(expr.referenced()?)?)
    }
}

enum Storage {
    Scalar(NumericKind, ScalarCell),
    Vector(VectorBuffer),
    Matrix(MatrixBuffer),
}

impl Storage {
    fn input(value: &Value, kind: NumericKind, shape: ValueShape, label: &str) -> Result<Self> {
        Ok(match shape {
            ValueShape::Scalar => Storage::Scalar(kind, scalar_cell(value, kind, label)?),
            ValueShape::Vector => Storage::Vector(VectorBuffer::marshal_in(value, kind, label)?),
            ValueShape::Matrix => Storage::Matrix(MatrixBuffer::marshal_in(value, kind, label)?),
        })
    }

    fn slot(&mut self, is_output: bool) -> NativeSlot {
        match self {
            Storage::Scalar(kind, cell) => NativeSlot::scalar(*kind, *cell, is_output),
            Storage::Vector(buf) => NativeSlot::vector(buf.kind(), buf.raw(), is_output),
            Storage::Matrix(buf) => NativeSlot::matrix(buf.kind(), buf.raw(), is_output),
        }
    }

    fn marshal_out(&self, slot: &NativeSlot) -> Option<Value> {
        match self {
            Storage::Scalar(..) => slot.scalar_value(),
            Storage::Vector(buf) => Some(buf.marshal_out()),
            Storage::Matrix(buf) => Some(buf.marshal_out()),
        }
    }
}

fn scalar_cell(value: &Value, kind: NumericKind, label: &str) -> Result<ScalarCell> {
    Ok(match kind {
        NumericKind::Boolean => ScalarCell::boolean(to_native_scalar::<bool>(value, label)?),
        NumericKind::Integer => ScalarCell::integer(to_native_scalar::<NativeInt>(value, label)?),
        NumericKind::Real => ScalarCell::real(to_native_scalar::<f64>(value, label)?),
        NumericKind::Complex => {
            ScalarCell::complex(to_native_scalar::<NativeComplex>(value, label)?)
        }
    })
}

impl ResolvedCall<'_> {
    /// Marshal the arguments in, run `entry`, and marshal the outputs out.
    ///
    /// # Safety
    ///
    /// `entry` must follow the slot convention in [`crate::abi`] and must only
    /// write within the buffers the slots describe.
    pub unsafe fn invoke(&self, entry: EntryPoint, policy: DimensionPolicy) -> Result<Vec<Value>> {
        let sig = self.signature;

        let mut storage = Vec::with_capacity(sig.params.len() + sig.outputs.len());
        for (param, value) in sig.params.iter().zip(&self.args) {
            storage.push(Storage::input(value, param.ty.kind, param.ty.shape, &param.name)?);
        }
        for output in &sig.outputs {
            storage.push(self.allocate_output(output.ty.kind, output.ty.shape, &output.dims, policy)?);
        }

        let n_inputs = sig.params.len();
        let mut slots: Vec<NativeSlot> = storage
            .iter_mut()
            .enumerate()
            .map(|(i, s)| s.slot(i >= n_inputs))
            .collect();

        log::trace!("{}: invoking with {} slot(s)", sig.name, slots.len());
        let status = entry(slots.as_mut_ptr(), slots.len());
        if status != 0 {
            return Err(CallError::Native {
                name: sig.name.clone(),
                status,
            });
        }

        storage[n_inputs..]
            .iter()
            .zip(&slots[n_inputs..])
            .map(|(s, slot)| {
                s.marshal_out(slot).ok_or_else(|| {
                    CallError::Library(format!(
                        "{}: native code changed an output datatype to {}",
                        sig.name, slot.datatype
                    ))
                })
            })
            .collect()
    }

    fn allocate_output(
        &self,
        kind: NumericKind,
        shape: ValueShape,
        dims: &[SizeExpr],
        policy: DimensionPolicy,
    ) -> Result<Storage> {
        let sizes = dims
            .iter()
            .map(|d| d.eval(self.signature.argument(d, &self.args)))
            .collect::<Result<Vec<i64>>>()?;
        Ok(match (shape, sizes.as_slice()) {
            (ValueShape::Scalar, _) => Storage::Scalar(kind, ScalarCell::zeroed()),
            (ValueShape::Vector, [n]) => Storage::Vector(VectorBuffer::allocate(kind, *n, policy)?),
            (ValueShape::Matrix, [r, c]) => {
                Storage::Matrix(MatrixBuffer::allocate(kind, *r, *c, policy)?)
            }
            _ => {
                return Err(CallError::Signature(format!(
                    "{}: output {} has {} size(s)",
                    self.signature.name,
                    shape,
                    sizes.len()
                )))
            }
        })
    }
}
