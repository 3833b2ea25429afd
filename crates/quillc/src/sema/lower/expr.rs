//! Expression lowering

use super::member::Resolved;
use crate::common::{CompileError, CompileResult, Span};
use crate::frontend::ast::{BinaryOp, Expr, ExprKind, UnaryOp};
use crate::ir::{BinOp, CmpOp, Terminator, UnOp, Value};
use crate::sema::resolve::{common_type, infer_literal_type};
use crate::sema::scope::ScopeKind;
use crate::sema::types::{fits, min_signed_width, min_unsigned_width, normalize, FnTy, Ty, TypedValue};
use crate::sema::{cast, Sema};

impl<'ast> Sema<'ast> {
    pub(crate) fn lower_expr(&mut self, expr: &'ast Expr) -> CompileResult<TypedValue> {
        self.lower_expr_hinted(expr, None)
    }

    /// Lower `expr` in value mode; `hint` is the type the context expects
    pub(crate) fn lower_expr_hinted(&mut self, expr: &'ast Expr, hint: Option<Ty>) -> CompileResult<TypedValue> {
        let reference_mode = std::mem::replace(&mut self.state.reference_mode, false);
        let type_hint = std::mem::replace(&mut self.state.type_hint, hint);
        let result = self.lower_value(expr);
        self.state.reference_mode = reference_mode;
        self.state.type_hint = type_hint;
        result
    }

    fn lower_value(&mut self, expr: &'ast Expr) -> CompileResult<TypedValue> {
        match &expr.kind {
            ExprKind::IntLiteral(n) => Ok(TypedValue::new(Value::Int(i128::from(*n)), infer_literal_type(expr)?)),
            ExprKind::FloatLiteral(x) => Ok(TypedValue::new(Value::Float(*x), Ty::float(64))),
            ExprKind::BoolLiteral(b) => Ok(TypedValue::new(Value::Int(i128::from(*b)), Ty::bool())),
            ExprKind::StringLiteral(s) => {
                let mut bytes = s.clone().into_bytes();
                bytes.push(0);
                let ty = Ty::array(Ty::int(8, false), bytes.len() as u64);
                let (global, ir) = self.builder.add_string(bytes);
                let value = self.builder.build_load(ir, global);
                Ok(TypedValue::new(value, ty))
            }
            ExprKind::ArrayLiteral(items) => self.lower_array_literal(items, expr.span),
            ExprKind::Initializer(_) => {
                let Some(ty) = self.state.type_hint.clone() else {
                    return Err(CompileError::invalid(
                        "cannot infer the type of an initializer list",
                        expr.span,
                    ));
                };
                let slot = self.temporary(&ty);
                self.lower_into(slot.clone(), &ty, expr)?;
                let value = self.builder.build_load(ty.ir(), slot);
                Ok(TypedValue::new(value, ty))
            }
            ExprKind::Identifier(_) | ExprKind::Member { .. } | ExprKind::Index { .. } | ExprKind::Deref(_) => {
                let resolved = self.resolve_expr(expr)?;
                self.rvalue(resolved, expr.span)
            }
            ExprKind::Call { callee, args } => self.lower_call(callee, args, expr.span),
            ExprKind::Binary { op, left, right } => self.lower_binary(*op, left, right, expr.span),
            ExprKind::Unary { op, operand } => self.lower_unary(*op, operand, expr),
            ExprKind::AddressOf(inner) => {
                let place = self.lower_place(inner)?;
                Ok(TypedValue::new(place.addr, Ty::pointer(place.ty)))
            }
            ExprKind::Cast { expr: inner, ty } => {
                let target = self.resolve_type(ty, self.tree.current())?;
                let value = self.lower_expr(inner)?;
                cast(&mut self.builder, value, &target, false, expr.span)
            }
        }
    }

    fn lower_array_literal(&mut self, items: &'ast [Expr], span: Span) -> CompileResult<TypedValue> {
        let ty = match &self.state.type_hint {
            Some(hint @ Ty::Array { .. }) => hint.clone(),
            _ => {
                let values = items
                    .iter()
                    .map(|item| self.lower_expr(item))
                    .collect::<CompileResult<Vec<_>>>()?;
                return self.build_array(values, items, span);
            }
        };
        let slot = self.temporary(&ty);
        self.store_entries(slot.clone(), &ty, items, span)?;
        let value = self.builder.build_load(ty.ir(), slot);
        Ok(TypedValue::new(value, ty))
    }

    /// Store already lowered entries into a new array of their common type
    fn build_array(&mut self, values: Vec<TypedValue>, items: &[Expr], span: Span) -> CompileResult<TypedValue> {
        let Some(first) = values.first() else {
            return Err(CompileError::invalid("cannot infer the type of an empty array", span));
        };
        let mut element = first.ty.clone();
        for (value, item) in values.iter().zip(items).skip(1) {
            element = common_type(&element, &value.ty).ok_or_else(|| {
                CompileError::arg_mismatch(
                    format!("array entries of type `{}` and `{}` have no common type", element, value.ty),
                    item.span,
                )
            })?;
        }

        let ty = Ty::array(element.clone(), values.len() as u64);
        let slot = self.temporary(&ty);
        for (index, (value, item)) in values.into_iter().zip(items).enumerate() {
            let value = cast(&mut self.builder, value, &element, true, item.span)?;
            let addr = self.builder.build_elem_addr(element.ir(), slot.clone(), Value::Int(index as i128));
            self.store_typed(&element, addr, value.value);
        }
        let value = self.builder.build_load(ty.ir(), slot);
        Ok(TypedValue::new(value, ty))
    }

    fn lower_call(&mut self, callee: &'ast Expr, args: &'ast [Expr], span: Span) -> CompileResult<TypedValue> {
        let (func, ty, receiver, name) = match self.resolve_expr(callee)? {
            Resolved::Function { scope, receiver } => {
                let ScopeKind::Function(entry) = self.tree.kind(scope) else {
                    return Err(CompileError::non_function(
                        format!("`{}` is not a function", self.tree.name(scope)),
                        callee.span,
                    ));
                };
                if entry.ir.is_none() {
                    return Err(CompileError::invalid(
                        format!("spec function `{}` has no body to call", entry.decl.name),
                        callee.span,
                    ));
                }
                (
                    Value::Function(entry.ir_name.clone()),
                    entry.ty.clone(),
                    receiver,
                    entry.decl.name.clone(),
                )
            }
            Resolved::Namespace(id) => {
                return Err(CompileError::non_function(
                    format!("`{}` is not a function", self.tree.name(id)),
                    callee.span,
                ));
            }
            other => {
                let value = self.rvalue(other, callee.span)?;
                let Ty::Function(ty) = &value.ty else {
                    return Err(CompileError::non_function(
                        format!("value of type `{}` is not callable", value.ty),
                        callee.span,
                    ));
                };
                let ty = ty.clone();
                (value.value, ty, None, "function value".to_string())
            }
        };

        check_receiver(&ty, receiver.is_some(), &name, span)?;
        if args.len() != ty.params.len() {
            return Err(CompileError::arg_count(&name, ty.params.len(), args.len(), span));
        }

        let mut values: Vec<Value> = receiver.map(|r| r.value).into_iter().collect();
        for (arg, param) in args.iter().zip(&ty.params) {
            let value = self.lower_expr_hinted(arg, Some(param.clone()))?;
            let value = cast(&mut self.builder, value, param, true, arg.span)?;
            values.push(value.value);
        }

        let ret = (*ty.ret).clone();
        let result = self.builder.build_call(func, values, ret.ir());
        Ok(TypedValue::new(result, ret))
    }

    fn lower_binary(
        &mut self,
        op: BinaryOp,
        left: &'ast Expr,
        right: &'ast Expr,
        span: Span,
    ) -> CompileResult<TypedValue> {
        if op.is_logical() {
            return self.lower_logical(op, left, right);
        }
        let lhs = self.lower_expr(left)?;
        let rhs = self.lower_expr(right)?;

        if let (Ty::Pointer(_), Some(cmp @ (CmpOp::Eq | CmpOp::Ne))) = (&lhs.ty, compare_op(op)) {
            if lhs.ty != rhs.ty {
                return Err(mismatch(op, &lhs.ty, &rhs.ty, span));
            }
            let value = self.builder.build_compare(cmp, lhs.ty.ir(), false, lhs.value, rhs.value);
            return Ok(TypedValue::new(value, Ty::bool()));
        }

        if let (Some(a), Some(b)) = (int_constant(&lhs), int_constant(&rhs)) {
            return fold_constants(op, (a, &lhs.ty), (b, &rhs.ty), right.span, span);
        }
        // A constant takes the other operand's type when it fits there
        let (lhs_ty, rhs_ty) = (lhs.ty.clone(), rhs.ty.clone());
        let lhs = adopt_type(lhs, &rhs_ty);
        let rhs = adopt_type(rhs, &lhs_ty);

        let ty = common_type(&lhs.ty, &rhs.ty).ok_or_else(|| mismatch(op, &lhs.ty, &rhs.ty, span))?;
        let allowed = if ty.is_bool() {
            matches!(op, BinaryOp::Eq | BinaryOp::Ne | BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor)
        } else if ty.is_float() {
            !matches!(
                op,
                BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor | BinaryOp::Shl | BinaryOp::Shr
            )
        } else {
            ty.is_integer()
        };
        if !allowed {
            return Err(mismatch(op, &lhs.ty, &rhs.ty, span));
        }

        let lhs = cast(&mut self.builder, lhs, &ty, true, left.span)?;
        let rhs = cast(&mut self.builder, rhs, &ty, true, right.span)?;

        if let Some(cmp) = compare_op(op) {
            let value = match fold_compare(cmp, &lhs.value, &rhs.value) {
                Some(result) => Value::Int(i128::from(result)),
                None => self.builder.build_compare(cmp, ty.ir(), ty.is_signed(), lhs.value, rhs.value),
            };
            return Ok(TypedValue::new(value, Ty::bool()));
        }

        let ir_op = arith_op(op);
        if matches!(ir_op, BinOp::Div | BinOp::Rem) && rhs.value.as_int() == Some(0) {
            return Err(CompileError::invalid("division by zero", right.span));
        }
        let value = match fold_arith(ir_op, &lhs.value, &rhs.value, &ty) {
            Some(value) => value,
            None => self.builder.build_binary(ir_op, ty.ir(), ty.is_signed(), lhs.value, rhs.value),
        };
        Ok(TypedValue::new(value, ty))
    }

    /// `&&` and `||` evaluate their right side only when it decides the result
    fn lower_logical(&mut self, op: BinaryOp, left: &'ast Expr, right: &'ast Expr) -> CompileResult<TypedValue> {
        let lhs = self.lower_condition(left)?;
        let short_circuit = i128::from(op == BinaryOp::Or);
        match lhs.value.as_int() {
            Some(n) if n == short_circuit => return Ok(lhs),
            Some(_) => return self.lower_condition(right),
            None => {}
        }

        let slot = self.temporary(&Ty::bool());
        self.store_typed(&Ty::bool(), slot.clone(), lhs.value.clone());
        let rhs_bb = self.builder.append_block("rhs");
        let end = self.builder.append_block("endlogic");
        let (then_block, else_block) = if op == BinaryOp::Or { (end, rhs_bb) } else { (rhs_bb, end) };
        self.builder.terminate(Terminator::Branch { cond: lhs.value, then_block, else_block })?;

        self.builder.position_at_end(rhs_bb);
        let rhs = self.lower_condition(right)?;
        self.store_typed(&Ty::bool(), slot.clone(), rhs.value);
        self.builder.terminate(Terminator::Jump(end))?;

        self.builder.position_at_end(end);
        let value = self.builder.build_load(Ty::bool().ir(), slot);
        Ok(TypedValue::new(value, Ty::bool()))
    }

    fn lower_unary(&mut self, op: UnaryOp, operand: &'ast Expr, expr: &'ast Expr) -> CompileResult<TypedValue> {
        if let (UnaryOp::Neg, ExprKind::IntLiteral(n)) = (op, &operand.kind) {
            return Ok(TypedValue::new(Value::Int(-i128::from(*n)), infer_literal_type(expr)?));
        }

        let value = self.lower_expr(operand)?;
        let ty = value.ty.clone();
        match op {
            UnaryOp::Neg => {
                if !ty.is_numeric() {
                    return Err(CompileError::invalid(format!("cannot negate `{}`", ty), expr.span));
                }
                let folded = match value.value {
                    Value::Int(n) => Some(Value::Int(normalize(-n, ty.bits(), ty.is_signed()))),
                    Value::Float(x) => Some(Value::Float(-x)),
                    _ => None,
                };
                let result = match folded {
                    Some(folded) => folded,
                    None => self.builder.build_unary(UnOp::Neg, ty.ir(), value.value),
                };
                Ok(TypedValue::new(result, ty))
            }
            UnaryOp::Not => {
                if !ty.is_bool() {
                    return Err(CompileError::not_boolean(&ty, operand.span));
                }
                let result = match value.value {
                    Value::Int(n) => Value::Int(i128::from(n == 0)),
                    other => self.builder.build_unary(UnOp::Not, ty.ir(), other),
                };
                Ok(TypedValue::new(result, ty))
            }
            UnaryOp::BitNot => {
                if !ty.is_integer() {
                    return Err(CompileError::invalid(
                        format!("`~` needs an integer, found `{}`", ty),
                        expr.span,
                    ));
                }
                let result = match value.value {
                    Value::Int(n) => Value::Int(normalize(!n, ty.bits(), ty.is_signed())),
                    other => self.builder.build_unary(UnOp::Not, ty.ir(), other),
                };
                Ok(TypedValue::new(result, ty))
            }
        }
    }
}

fn check_receiver(ty: &FnTy, has_receiver: bool, name: &str, span: Span) -> CompileResult<()> {
    match (ty.is_member, has_receiver) {
        (true, false) => Err(CompileError::non_instance(
            format!("`{}` takes `self`; call it through an instance", name),
            span,
        )),
        (false, true) => Err(CompileError::non_instance(
            format!("`{}` does not take `self`; call it through its template", name),
            span,
        )),
        _ => Ok(()),
    }
}

fn mismatch(op: BinaryOp, left: &Ty, right: &Ty, span: Span) -> CompileError {
    CompileError::arg_mismatch(
        format!("cannot apply `{}` to `{}` and `{}`", op, left, right),
        span,
    )
}

fn compare_op(op: BinaryOp) -> Option<CmpOp> {
    Some(match op {
        BinaryOp::Eq => CmpOp::Eq,
        BinaryOp::Ne => CmpOp::Ne,
        BinaryOp::Lt => CmpOp::Lt,
        BinaryOp::Le => CmpOp::Le,
        BinaryOp::Gt => CmpOp::Gt,
        BinaryOp::Ge => CmpOp::Ge,
        _ => return None,
    })
}

fn arith_op(op: BinaryOp) -> BinOp {
    match op {
        BinaryOp::Sub => BinOp::Sub,
        BinaryOp::Mul => BinOp::Mul,
        BinaryOp::Div => BinOp::Div,
        BinaryOp::Rem => BinOp::Rem,
        BinaryOp::BitAnd => BinOp::And,
        BinaryOp::BitOr => BinOp::Or,
        BinaryOp::BitXor => BinOp::Xor,
        BinaryOp::Shl => BinOp::Shl,
        BinaryOp::Shr => BinOp::Shr,
        _ => BinOp::Add,
    }
}

fn int_constant(value: &TypedValue) -> Option<i128> {
    if value.ty.is_integer() { value.value.as_int() } else { None }
}

fn adopt_type(value: TypedValue, other: &Ty) -> TypedValue {
    match int_constant(&value) {
        Some(n) if other.is_integer() && fits(n, other.bits(), other.is_signed()) => {
            TypedValue::new(value.value, other.clone())
        }
        _ => value,
    }
}

/// Evaluate an operation on two integer constants exactly
///
/// The result keeps the operands' common type when it fits there and
/// otherwise takes the narrowest integer type holding it.
fn fold_constants(
    op: BinaryOp,
    (a, a_ty): (i128, &Ty),
    (b, b_ty): (i128, &Ty),
    rhs_span: Span,
    span: Span,
) -> CompileResult<TypedValue> {
    let ty = common_type(a_ty, b_ty).ok_or_else(|| mismatch(op, a_ty, b_ty, span))?;
    if let Some(cmp) = compare_op(op) {
        let result = fold_compare(cmp, &Value::Int(a), &Value::Int(b)).unwrap_or(false);
        return Ok(TypedValue::new(Value::Int(i128::from(result)), Ty::bool()));
    }

    let ir_op = arith_op(op);
    if matches!(ir_op, BinOp::Div | BinOp::Rem) && b == 0 {
        return Err(CompileError::invalid("division by zero", rhs_span));
    }
    let shift = || u32::try_from(b).ok().filter(|s| *s < 64);
    let result = match ir_op {
        BinOp::Add => a.checked_add(b),
        BinOp::Sub => a.checked_sub(b),
        BinOp::Mul => a.checked_mul(b),
        BinOp::Div => a.checked_div(b),
        BinOp::Rem => a.checked_rem(b),
        BinOp::And => Some(a & b),
        BinOp::Or => Some(a | b),
        BinOp::Xor => Some(a ^ b),
        BinOp::Shl => shift().and_then(|s| a.checked_shl(s)),
        BinOp::Shr => shift().map(|s| a >> s),
    };
    let in_range = |n: &i128| (i128::from(i64::MIN)..=i128::from(u64::MAX)).contains(n);
    let Some(result) = result.filter(in_range) else {
        return Err(CompileError::invalid("constant expression overflows 64 bits", span));
    };

    let ty = if fits(result, ty.bits(), ty.is_signed()) {
        ty
    } else if result >= 0 {
        Ty::int(min_unsigned_width(result as u64), false)
    } else {
        Ty::int(min_signed_width(result), true)
    };
    Ok(TypedValue::new(Value::Int(result), ty))
}

fn fold_compare(op: CmpOp, left: &Value, right: &Value) -> Option<bool> {
    let ordering = match (left, right) {
        (Value::Int(a), Value::Int(b)) => a.cmp(b),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b)?,
        _ => return None,
    };
    Some(match op {
        CmpOp::Eq => ordering.is_eq(),
        CmpOp::Ne => ordering.is_ne(),
        CmpOp::Lt => ordering.is_lt(),
        CmpOp::Le => ordering.is_le(),
        CmpOp::Gt => ordering.is_gt(),
        CmpOp::Ge => ordering.is_ge(),
    })
}

fn fold_arith(op: BinOp, left: &Value, right: &Value, ty: &Ty) -> Option<Value> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => {
            let (a, b) = (*a, *b);
            let result = match op {
                BinOp::Add => a.checked_add(b)?,
                BinOp::Sub => a.checked_sub(b)?,
                BinOp::Mul => a.checked_mul(b)?,
                BinOp::Div => a.checked_div(b)?,
                BinOp::Rem => a.checked_rem(b)?,
                BinOp::And => a & b,
                BinOp::Or => a | b,
                BinOp::Xor => a ^ b,
                BinOp::Shl => {
                    let amount = u32::try_from(b).ok().filter(|s| *s < u32::from(ty.bits()))?;
                    a << amount
                }
                BinOp::Shr => {
                    let amount = u32::try_from(b).ok().filter(|s| *s < u32::from(ty.bits()))?;
                    a >> amount
                }
            };
            Some(Value::Int(normalize(result, ty.bits(), ty.is_signed())))
        }
        (Value::Float(a), Value::Float(b)) => {
            let result = match op {
                BinOp::Add => a + b,
                BinOp::Sub => a - b,
                BinOp::Mul => a * b,
                BinOp::Div => a / b,
                BinOp::Rem => a % b,
                _ => return None,
            };
            let result = if ty.bits() == 32 { f64::from(result as f32) } else { result };
            Some(Value::Float(result))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_arith_wraps_to_width() {
        let ty = Ty::int(8, false);
        assert_eq!(fold_arith(BinOp::Add, &Value::Int(250), &Value::Int(10), &ty), Some(Value::Int(4)));
        let ty = Ty::int(32, true);
        assert_eq!(fold_arith(BinOp::Sub, &Value::Int(2), &Value::Int(5), &ty), Some(Value::Int(-3)));
        assert_eq!(fold_arith(BinOp::Shl, &Value::Int(1), &Value::Int(40), &ty), None);
    }

    #[test]
    fn test_fold_compare() {
        assert_eq!(fold_compare(CmpOp::Lt, &Value::Int(-1), &Value::Int(0)), Some(true));
        assert_eq!(fold_compare(CmpOp::Eq, &Value::Float(1.5), &Value::Float(1.5)), Some(true));
        assert_eq!(fold_compare(CmpOp::Ne, &Value::Temp(crate::ir::Temp(0)), &Value::Int(0)), None);
    }
}
