//! Type descriptors and typed values
//!
//! Descriptors are immutable values: every transformation (address-of,
//! dereference, cast) builds a new descriptor.

use super::scope::ScopeId;
use crate::ir::{BlockId, FunctionId, Value};
use crate::types::IrType;
use std::fmt;

/// Type of a Quill value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Ty {
    /// Integers, floats, bool (`i1`) and void
    Scalar { ir: IrType, signed: bool },
    Function(FnTy),
    /// Template instance; `name` is the IR struct name
    Struct { name: String, scope: ScopeId },
    /// A spec, or an associated type placeholder inside one; has no storage
    Trait { name: String, scope: ScopeId },
    Array { element: Box<Ty>, len: u64 },
    Pointer(Box<Ty>),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FnTy {
    pub ret: Box<Ty>,
    /// Declared parameters, excluding the implicit `self`
    pub params: Vec<Ty>,
    pub is_member: bool,
}

impl Ty {
    pub fn void() -> Self {
        Ty::Scalar { ir: IrType::Void, signed: false }
    }

    pub fn bool() -> Self {
        Ty::Scalar { ir: IrType::bool(), signed: false }
    }

    pub fn int(bits: u8, signed: bool) -> Self {
        Ty::Scalar { ir: IrType::int(bits), signed }
    }

    pub fn float(bits: u8) -> Self {
        Ty::Scalar { ir: IrType::float(bits), signed: true }
    }

    pub fn pointer(to: Ty) -> Self {
        Ty::Pointer(Box::new(to))
    }

    pub fn array(element: Ty, len: u64) -> Self {
        Ty::Array { element: Box::new(element), len }
    }

    /// Storage type in the IR
    pub fn ir(&self) -> IrType {
        match self {
            Ty::Scalar { ir, .. } => ir.clone(),
            Ty::Function(f) => IrType::ptr(f.ir_signature(None)),
            Ty::Struct { name, .. } => IrType::structure(name.clone()),
            Ty::Trait { .. } => IrType::Void,
            Ty::Array { element, len } => IrType::array(element.ir(), *len),
            Ty::Pointer(inner) => IrType::ptr(inner.ir()),
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Ty::Scalar { ir: IrType::Void, .. })
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Ty::Scalar { ir, .. } if ir.is_bool())
    }

    /// Integer other than bool
    pub fn is_integer(&self) -> bool {
        matches!(self, Ty::Scalar { ir, .. } if ir.is_integer() && !ir.is_bool())
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Ty::Scalar { ir, .. } if ir.is_float())
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    pub fn is_signed(&self) -> bool {
        matches!(self, Ty::Scalar { signed: true, .. })
    }

    /// Built-in scalar or boolean kind
    pub fn is_scalar(&self) -> bool {
        matches!(self, Ty::Scalar { .. }) && !self.is_void()
    }

    pub fn bits(&self) -> u8 {
        match self {
            Ty::Scalar { ir, .. } => ir.bits().unwrap_or(0),
            _ => 0,
        }
    }

    pub fn pointee(&self) -> Option<&Ty> {
        match self {
            Ty::Pointer(inner) => Some(inner),
            _ => None,
        }
    }

    pub fn struct_scope(&self) -> Option<ScopeId> {
        match self {
            Ty::Struct { scope, .. } => Some(*scope),
            _ => None,
        }
    }
}

impl FnTy {
    /// IR function type; members take the receiver pointer first
    pub fn ir_signature(&self, receiver: Option<&Ty>) -> IrType {
        let mut params: Vec<IrType> = receiver.map(|r| IrType::ptr(r.ir())).into_iter().collect();
        params.extend(self.params.iter().map(Ty::ir));
        IrType::function(params, self.ret.ir())
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Scalar { ir, signed } => match ir {
                IrType::Void => write!(f, "void"),
                IrType::Int(1) => write!(f, "bool"),
                IrType::Int(32) if *signed => write!(f, "int"),
                IrType::Int(32) => write!(f, "uint"),
                IrType::Int(bits) if *signed => write!(f, "int{}", bits),
                IrType::Int(bits) => write!(f, "uint{}", bits),
                IrType::Float(32) => write!(f, "float"),
                IrType::Float(_) => write!(f, "double"),
                other => write!(f, "{}", other),
            },
            Ty::Function(func) => {
                let params: Vec<String> = func.params.iter().map(ToString::to_string).collect();
                write!(f, "func({}) => {}", params.join(", "), func.ret)
            }
            Ty::Struct { name, .. } => write!(f, "{}", name),
            Ty::Trait { name, .. } => write!(f, "{}", name),
            Ty::Array { element, len } => write!(f, "[{}; {}]", element, len),
            Ty::Pointer(inner) => write!(f, "&{}", inner),
        }
    }
}

/// A value handle paired with its type
#[derive(Debug, Clone, PartialEq)]
pub struct TypedValue {
    pub value: Value,
    pub ty: Ty,
}

impl TypedValue {
    pub fn new(value: Value, ty: Ty) -> Self {
        Self { value, ty }
    }

    pub fn void() -> Self {
        Self::new(Value::Undef, Ty::void())
    }
}

/// Return bookkeeping for the function whose body is being lowered
#[derive(Debug, Clone)]
pub struct FunctionValue {
    pub id: FunctionId,
    pub ty: FnTy,
    /// Stack slot written by every return when returns are unified
    pub ret_slot: Option<Value>,
    /// Shared exit block when returns are unified
    pub ret_block: Option<BlockId>,
    /// Returns lowered so far
    pub return_count: usize,
    /// Returns counted in the body before lowering
    pub expected_returns: usize,
}

impl FunctionValue {
    pub fn unified(&self) -> bool {
        self.ret_block.is_some()
    }
}

/// Smallest width in {8, 16, 32, 64} holding `value` as an unsigned integer
pub fn min_unsigned_width(value: u64) -> u8 {
    match value {
        0..=0xFF => 8,
        0x100..=0xFFFF => 16,
        0x1_0000..=0xFFFF_FFFF => 32,
        _ => 64,
    }
}

/// Smallest width in {8, 16, 32, 64} holding `value` as a signed integer
pub fn min_signed_width(value: i128) -> u8 {
    [8u8, 16, 32, 64]
        .into_iter()
        .find(|bits| fits(value, *bits, true))
        .unwrap_or(64)
}

/// Whether `value` is representable in an integer of the given shape
///
/// Zero-width shapes (non-scalars) hold nothing.
pub fn fits(value: i128, bits: u8, signed: bool) -> bool {
    let bits = u32::from(bits);
    if bits == 0 {
        return false;
    }
    if signed {
        let half = 1i128 << (bits - 1);
        (-half..half).contains(&value)
    } else {
        (0..(1i128 << bits)).contains(&value)
    }
}

/// Wrap `value` into the range of an integer of the given shape
pub fn normalize(value: i128, bits: u8, signed: bool) -> i128 {
    let bits = u32::from(bits);
    if bits >= 128 {
        return value;
    }
    let modulus = 1i128 << bits;
    let wrapped = value.rem_euclid(modulus);
    if signed && wrapped >= modulus >> 1 { wrapped - modulus } else { wrapped }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_unsigned_width_is_monotonic() {
        let samples = [0u64, 1, 255, 256, 65_535, 65_536, 0xFFFF_FFFF, 0x1_0000_0000, u64::MAX];
        let mut last = 0;
        for value in samples {
            let width = min_unsigned_width(value);
            assert!([8, 16, 32, 64].contains(&width));
            assert!(width >= last, "width for {} went down", value);
            last = width;
        }
        assert_eq!(min_unsigned_width(255), 8);
        assert_eq!(min_unsigned_width(256), 16);
        assert_eq!(min_unsigned_width(300), 16);
    }

    #[test]
    fn test_normalize_and_fits() {
        assert_eq!(normalize(300, 8, false), 44);
        assert_eq!(normalize(255, 8, true), -1);
        assert_eq!(normalize(-1, 16, false), 65_535);
        assert!(fits(127, 8, true));
        assert!(!fits(128, 8, true));
        assert!(!fits(-1, 32, false));
        assert_eq!(min_signed_width(-129), 16);
    }

    #[test]
    fn test_nothing_fits_a_zero_width() {
        let shape = Ty::pointer(Ty::bool());
        assert_eq!(shape.bits(), 0);
        assert!(!fits(0, shape.bits(), true));
        assert!(!fits(0, shape.bits(), false));
    }

    #[test]
    fn test_structural_equality_and_names() {
        assert_eq!(Ty::int(32, true), Ty::int(32, true));
        assert_ne!(Ty::int(32, true), Ty::int(32, false));
        assert_eq!(Ty::int(32, true).to_string(), "int");
        assert_eq!(Ty::int(8, false).to_string(), "uint8");
        assert_eq!(Ty::float(64).to_string(), "double");
        assert_eq!(Ty::pointer(Ty::bool()).to_string(), "&bool");
        assert_eq!(Ty::array(Ty::int(8, false), 3).ir().to_string(), "[3 x i8]");
    }
}
