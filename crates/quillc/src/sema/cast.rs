//! Implicit and explicit conversions between value types

use super::types::{fits, normalize, Ty, TypedValue};
use crate::common::{CompileError, CompileResult, Span};
use crate::ir::{CastKind, CmpOp, IrBuilder, Value};

/// Convert `value` to `target`.
///
/// Identical types are returned untouched. Float to integer and any
/// conversion involving bool or pointers need `implicit == false`. An
/// integer constant that does not fit its implicit target is rejected;
/// explicit casts wrap it.
pub fn cast(
    builder: &mut IrBuilder,
    value: TypedValue,
    target: &Ty,
    implicit: bool,
    span: Span,
) -> CompileResult<TypedValue> {
    if value.ty == *target {
        return Ok(value);
    }

    let from = &value.ty;
    let refuse = || {
        CompileError::no_implicit_cast(
            format!("cannot implicitly convert `{}` to `{}`; use `as`", from, target),
            span,
        )
    };
    let impossible = || {
        CompileError::no_implicit_cast(format!("cannot convert `{}` to `{}`", from, target), span)
    };

    let kind = if from.is_float() && target.is_float() {
        if target.bits() > from.bits() { CastKind::FpExt } else { CastKind::FpTrunc }
    } else if from.is_float() && target.is_integer() {
        if implicit {
            return Err(refuse());
        }
        if target.is_signed() { CastKind::FpToSi } else { CastKind::FpToUi }
    } else if from.is_integer() && target.is_float() {
        if from.is_signed() { CastKind::SiToFp } else { CastKind::UiToFp }
    } else if from.is_integer() && target.is_integer() {
        if let Value::Int(n) = value.value {
            if implicit && !fits(n, target.bits(), target.is_signed()) {
                return Err(CompileError::no_implicit_cast(
                    format!("literal `{}` does not fit in `{}`", n, target),
                    span,
                ));
            }
        }
        match target.bits().cmp(&from.bits()) {
            std::cmp::Ordering::Greater if from.is_signed() => CastKind::SExt,
            std::cmp::Ordering::Greater => CastKind::ZExt,
            std::cmp::Ordering::Less => CastKind::Trunc,
            // Same width: only the signedness changes
            std::cmp::Ordering::Equal => {
                let value = match value.value {
                    Value::Int(n) => Value::Int(normalize(n, target.bits(), target.is_signed())),
                    other => other,
                };
                return Ok(TypedValue::new(value, target.clone()));
            }
        }
    } else if from.is_bool() && target.is_integer() {
        if implicit {
            return Err(refuse());
        }
        CastKind::ZExt
    } else if from.is_integer() && target.is_bool() {
        if implicit {
            return Err(refuse());
        }
        if let Value::Int(n) = value.value {
            return Ok(TypedValue::new(Value::Int(i128::from(n != 0)), Ty::bool()));
        }
        let result = builder.build_compare(
            CmpOp::Ne,
            from.ir(),
            from.is_signed(),
            value.value,
            Value::Int(0),
        );
        return Ok(TypedValue::new(result, Ty::bool()));
    } else if matches!(from, Ty::Pointer(_)) && matches!(target, Ty::Pointer(_)) {
        if implicit {
            return Err(refuse());
        }
        CastKind::Bitcast
    } else {
        return Err(impossible());
    };

    if let Some(folded) = fold(kind, &value.value, target) {
        return Ok(TypedValue::new(folded, target.clone()));
    }
    let result = builder.build_cast(kind, from.ir(), target.ir(), value.value);
    Ok(TypedValue::new(result, target.clone()))
}

/// Evaluate a cast of a constant at compile time
fn fold(kind: CastKind, value: &Value, target: &Ty) -> Option<Value> {
    let bits = target.bits();
    let signed = target.is_signed();
    match (kind, value) {
        (CastKind::FpExt | CastKind::FpTrunc, Value::Float(x)) => Some(Value::Float(round_to(*x, bits))),
        (CastKind::FpToSi | CastKind::FpToUi, Value::Float(x)) => {
            // Saturating, like Rust's `as`
            let n = if signed { i128::from(*x as i64) } else { i128::from(*x as u64) };
            Some(Value::Int(normalize(n, bits, signed)))
        }
        (CastKind::SiToFp | CastKind::UiToFp, Value::Int(n)) => {
            Some(Value::Float(round_to(*n as f64, bits)))
        }
        (CastKind::SExt | CastKind::ZExt | CastKind::Trunc, Value::Int(n)) => {
            Some(Value::Int(normalize(*n, bits, signed)))
        }
        _ => None,
    }
}

fn round_to(x: f64, bits: u8) -> f64 {
    if bits == 32 { f64::from(x as f32) } else { x }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ErrorKind;
    use crate::ir::{Inst, Temp};
    use crate::types::IrType;

    fn builder() -> IrBuilder {
        let mut b = IrBuilder::new("test");
        let f = b.declare_function("f", vec![], IrType::void(), false);
        b.begin_body(f);
        b
    }

    fn temp(ty: Ty) -> TypedValue {
        TypedValue::new(Value::Temp(Temp(99)), ty)
    }

    #[test]
    fn test_identical_types_are_noop() {
        let mut b = builder();
        let v = temp(Ty::int(32, true));
        let out = cast(&mut b, v.clone(), &Ty::int(32, true), true, Span::default()).unwrap();
        assert_eq!(out, v);
        assert!(b.module().functions[0].insts().next().is_none());
    }

    #[test]
    fn test_float_to_int_needs_explicit_cast() {
        for (from, to) in [(Ty::float(64), Ty::int(32, true)), (Ty::float(32), Ty::int(8, false))] {
            let mut b = builder();
            let err = cast(&mut b, temp(from.clone()), &to, true, Span::default()).unwrap_err();
            assert_eq!(err.kind, ErrorKind::NoImplicitCast);
            assert!(cast(&mut b, temp(from), &to, false, Span::default()).is_ok());
        }
    }

    #[test]
    fn test_int_to_float_is_implicit() {
        let mut b = builder();
        let out = cast(&mut b, temp(Ty::int(16, false)), &Ty::float(64), true, Span::default()).unwrap();
        assert_eq!(out.ty, Ty::float(64));
        assert!(matches!(
            b.module().functions[0].insts().next(),
            Some(Inst::Cast { kind: CastKind::UiToFp, .. })
        ));
    }

    #[test]
    fn test_int_widen_respects_signedness() {
        let mut b = builder();
        cast(&mut b, temp(Ty::int(8, true)), &Ty::int(32, true), true, Span::default()).unwrap();
        cast(&mut b, temp(Ty::int(8, false)), &Ty::int(32, true), true, Span::default()).unwrap();
        cast(&mut b, temp(Ty::int(64, true)), &Ty::int(16, true), true, Span::default()).unwrap();
        let kinds: Vec<CastKind> = b.module().functions[0]
            .insts()
            .filter_map(|i| match i {
                Inst::Cast { kind, .. } => Some(*kind),
                _ => None,
            })
            .collect();
        assert_eq!(kinds, vec![CastKind::SExt, CastKind::ZExt, CastKind::Trunc]);
    }

    #[test]
    fn test_constant_narrowing() {
        let mut b = builder();
        let wide = TypedValue::new(Value::Int(300), Ty::int(16, false));
        let err = cast(&mut b, wide.clone(), &Ty::int(8, false), true, Span::default()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NoImplicitCast);

        let out = cast(&mut b, wide, &Ty::int(8, false), false, Span::default()).unwrap();
        assert_eq!(out.value, Value::Int(44));

        let small = TypedValue::new(Value::Int(5), Ty::int(8, false));
        let out = cast(&mut b, small, &Ty::int(32, true), true, Span::default()).unwrap();
        assert_eq!(out, TypedValue::new(Value::Int(5), Ty::int(32, true)));
        assert!(b.module().functions[0].insts().next().is_none());
    }

    #[test]
    fn test_bool_and_pointer_conversions_are_explicit() {
        let mut b = builder();
        let flag = temp(Ty::bool());
        assert!(cast(&mut b, flag.clone(), &Ty::int(32, true), true, Span::default()).is_err());
        assert!(cast(&mut b, flag, &Ty::int(32, true), false, Span::default()).is_ok());

        let ptr = temp(Ty::pointer(Ty::int(8, false)));
        let target = Ty::pointer(Ty::int(32, true));
        assert!(cast(&mut b, ptr.clone(), &target, true, Span::default()).is_err());
        assert!(cast(&mut b, ptr, &target, false, Span::default()).is_ok());
    }

    #[test]
    fn test_unrelated_types_fail() {
        let mut b = builder();
        let arr = temp(Ty::array(Ty::int(8, false), 2));
        let err = cast(&mut b, arr, &Ty::int(32, true), false, Span::default()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NoImplicitCast);
    }
}
