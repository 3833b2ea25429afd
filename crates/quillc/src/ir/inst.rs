//! IR instruction definitions

use crate::types::IrType;
use std::fmt;

/// A temporary value (virtual register)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Temp(pub u32);

impl fmt::Display for Temp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Basic block ID, an index into the owning function's block list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(pub usize);

/// An IR value (operand)
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A temporary (virtual register)
    Temp(Temp),
    /// An integer constant, wide enough for every signed and unsigned 64-bit value
    Int(i128),
    /// A floating point constant
    Float(f64),
    /// The n-th incoming function parameter
    Param(usize),
    /// Address of a global
    Global(String),
    /// Handle of a function
    Function(String),
    /// Result of a void call
    Undef,
}

impl Value {
    pub fn as_int(&self) -> Option<i128> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Temp(t) => write!(f, "{}", t),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{:?}", n),
            Value::Param(i) => write!(f, "%arg{}", i),
            Value::Global(name) | Value::Function(name) => write!(f, "@{}", name),
            Value::Undef => write!(f, "undef"),
        }
    }
}

/// Binary operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BinOp::Add => "add",
            BinOp::Sub => "sub",
            BinOp::Mul => "mul",
            BinOp::Div => "div",
            BinOp::Rem => "rem",
            BinOp::And => "and",
            BinOp::Or => "or",
            BinOp::Xor => "xor",
            BinOp::Shl => "shl",
            BinOp::Shr => "shr",
        };
        f.write_str(name)
    }
}

/// Comparison predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CmpOp::Eq => "eq",
            CmpOp::Ne => "ne",
            CmpOp::Lt => "lt",
            CmpOp::Le => "le",
            CmpOp::Gt => "gt",
            CmpOp::Ge => "ge",
        };
        f.write_str(name)
    }
}

/// Unary operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
}

impl fmt::Display for UnOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnOp::Neg => write!(f, "neg"),
            UnOp::Not => write!(f, "not"),
        }
    }
}

/// Value conversions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastKind {
    Trunc,
    ZExt,
    SExt,
    FpExt,
    FpTrunc,
    FpToSi,
    FpToUi,
    SiToFp,
    UiToFp,
    Bitcast,
}

impl fmt::Display for CastKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CastKind::Trunc => "trunc",
            CastKind::ZExt => "zext",
            CastKind::SExt => "sext",
            CastKind::FpExt => "fpext",
            CastKind::FpTrunc => "fptrunc",
            CastKind::FpToSi => "fptosi",
            CastKind::FpToUi => "fptoui",
            CastKind::SiToFp => "sitofp",
            CastKind::UiToFp => "uitofp",
            CastKind::Bitcast => "bitcast",
        };
        f.write_str(name)
    }
}

/// IR instruction
#[derive(Debug, Clone, PartialEq)]
pub enum Inst {
    /// Reserve a stack slot; dst holds its address
    Alloca {
        dst: Temp,
        ty: IrType,
    },

    /// dst = *addr
    Load {
        dst: Temp,
        ty: IrType,
        addr: Value,
    },

    /// *addr = src
    Store {
        ty: IrType,
        addr: Value,
        src: Value,
    },

    /// dst = left op right
    Binary {
        dst: Temp,
        op: BinOp,
        ty: IrType,
        signed: bool,
        left: Value,
        right: Value,
    },

    /// dst = left cmp right, an i1
    Compare {
        dst: Temp,
        op: CmpOp,
        ty: IrType,
        signed: bool,
        left: Value,
        right: Value,
    },

    /// dst = op src
    Unary {
        dst: Temp,
        op: UnOp,
        ty: IrType,
        src: Value,
    },

    /// dst = src converted between types
    Cast {
        dst: Temp,
        kind: CastKind,
        from: IrType,
        to: IrType,
        src: Value,
    },

    /// dst = address of field `index` of the struct at `base`
    FieldAddr {
        dst: Temp,
        struct_name: String,
        base: Value,
        index: usize,
    },

    /// dst = address of element `index` of the array at `base`
    ElemAddr {
        dst: Temp,
        element: IrType,
        base: Value,
        index: Value,
    },

    /// dst = func(args...)
    Call {
        dst: Option<Temp>,
        func: Value,
        args: Vec<Value>,
        return_type: IrType,
    },
}

impl Inst {
    /// Types this instruction mentions, for module verification
    pub fn types(&self) -> Vec<&IrType> {
        match self {
            Inst::Alloca { ty, .. }
            | Inst::Load { ty, .. }
            | Inst::Store { ty, .. }
            | Inst::Binary { ty, .. }
            | Inst::Compare { ty, .. }
            | Inst::Unary { ty, .. } => vec![ty],
            Inst::Cast { from, to, .. } => vec![from, to],
            Inst::ElemAddr { element, .. } => vec![element],
            Inst::Call { return_type, .. } => vec![return_type],
            Inst::FieldAddr { .. } => Vec::new(),
        }
    }
}

impl fmt::Display for Inst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Inst::Alloca { dst, ty } => write!(f, "  {} = alloca {}", dst, ty),
            Inst::Load { dst, ty, addr } => write!(f, "  {} = load {}, {}", dst, ty, addr),
            Inst::Store { ty, addr, src } => write!(f, "  store {} {}, {}", ty, src, addr),
            Inst::Binary { dst, op, ty, signed, left, right } => {
                let sign = if *signed { "s" } else { "" };
                write!(f, "  {} = {}{} {} {}, {}", dst, sign, op, ty, left, right)
            }
            Inst::Compare { dst, op, ty, signed, left, right } => {
                let sign = if *signed { "s" } else { "" };
                write!(f, "  {} = cmp {}{} {} {}, {}", dst, sign, op, ty, left, right)
            }
            Inst::Unary { dst, op, ty, src } => write!(f, "  {} = {} {} {}", dst, op, ty, src),
            Inst::Cast { dst, kind, from, to, src } => {
                write!(f, "  {} = {} {} {} to {}", dst, kind, from, src, to)
            }
            Inst::FieldAddr { dst, struct_name, base, index } => {
                write!(f, "  {} = fieldaddr %{}, {}, {}", dst, struct_name, base, index)
            }
            Inst::ElemAddr { dst, element, base, index } => {
                write!(f, "  {} = elemaddr {}, {}, {}", dst, element, base, index)
            }
            Inst::Call { dst, func, args, return_type } => {
                if let Some(d) = dst {
                    write!(f, "  {} = call {} {}(", d, return_type, func)?;
                } else {
                    write!(f, "  call {} {}(", return_type, func)?;
                }
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Instruction that ends a basic block
#[derive(Debug, Clone, PartialEq)]
pub enum Terminator {
    /// Return from the function
    Return(Option<Value>),
    /// Unconditional jump
    Jump(BlockId),
    /// Conditional branch on an i1
    Branch {
        cond: Value,
        then_block: BlockId,
        else_block: BlockId,
    },
    /// Control never reaches this point
    Unreachable,
}

impl Terminator {
    pub fn successors(&self) -> Vec<BlockId> {
        match self {
            Terminator::Jump(target) => vec![*target],
            Terminator::Branch { then_block, else_block, .. } => vec![*then_block, *else_block],
            Terminator::Return(_) | Terminator::Unreachable => Vec::new(),
        }
    }
}

/// A basic block
#[derive(Debug, Clone, PartialEq)]
pub struct IrBlock {
    pub id: BlockId,
    pub name: String,
    pub insts: Vec<Inst>,
    pub terminator: Option<Terminator>,
}

impl IrBlock {
    pub fn new(id: BlockId, name: String) -> Self {
        Self { id, name, insts: Vec::new(), terminator: None }
    }

    pub fn is_empty(&self) -> bool {
        self.insts.is_empty() && self.terminator.is_none()
    }

    pub fn is_terminated(&self) -> bool {
        self.terminator.is_some()
    }
}

/// A function in IR form; a function without blocks is a declaration
#[derive(Debug, Clone, PartialEq)]
pub struct IrFunction {
    pub name: String,
    pub params: Vec<IrType>,
    pub return_type: IrType,
    pub blocks: Vec<IrBlock>,
    pub exported: bool,
}

impl IrFunction {
    pub fn new(name: String, params: Vec<IrType>, return_type: IrType) -> Self {
        Self {
            name,
            params,
            return_type,
            blocks: Vec::new(),
            exported: false,
        }
    }

    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn block(&self, id: BlockId) -> Option<&IrBlock> {
        self.blocks.get(id.0)
    }

    pub fn block_named(&self, name: &str) -> Option<&IrBlock> {
        self.blocks.iter().find(|b| b.name == name)
    }

    /// Every instruction of the function, in block order
    pub fn insts(&self) -> impl Iterator<Item = &Inst> {
        self.blocks.iter().flat_map(|b| b.insts.iter())
    }

    pub fn returns(&self) -> usize {
        self.blocks
            .iter()
            .filter(|b| matches!(b.terminator, Some(Terminator::Return(_))))
            .count()
    }
}

impl fmt::Display for IrFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keyword = if self.is_declaration() { "declare" } else { "func" };
        let export = if self.exported { "export " } else { "" };
        write!(f, "{}{} @{}(", export, keyword, self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", param)?;
        }
        write!(f, ") -> {}", self.return_type)?;
        if self.is_declaration() {
            return writeln!(f);
        }
        writeln!(f, " {{")?;
        for block in &self.blocks {
            writeln!(f, "{}:", block.name)?;
            for inst in &block.insts {
                writeln!(f, "{}", inst)?;
            }
            match &block.terminator {
                Some(Terminator::Return(Some(v))) => writeln!(f, "  ret {}", v)?,
                Some(Terminator::Return(None)) => writeln!(f, "  ret")?,
                Some(Terminator::Jump(target)) => {
                    writeln!(f, "  br {}", self.blocks[target.0].name)?;
                }
                Some(Terminator::Branch { cond, then_block, else_block }) => writeln!(
                    f,
                    "  condbr {}, {}, {}",
                    cond, self.blocks[then_block.0].name, self.blocks[else_block.0].name
                )?,
                Some(Terminator::Unreachable) => writeln!(f, "  unreachable")?,
                None => writeln!(f, "  ; unterminated")?,
            }
        }
        writeln!(f, "}}")
    }
}

/// A named aggregate; `fields` is `None` until the body is defined
#[derive(Debug, Clone, PartialEq)]
pub struct IrStruct {
    pub name: String,
    pub fields: Option<Vec<IrType>>,
}

/// Initial value of a global
#[derive(Debug, Clone, PartialEq)]
pub enum GlobalInit {
    Int(i128),
    Float(f64),
    Bytes(Vec<u8>),
}

impl fmt::Display for GlobalInit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GlobalInit::Int(n) => write!(f, "{}", n),
            GlobalInit::Float(n) => write!(f, "{:?}", n),
            GlobalInit::Bytes(bytes) => write!(f, "\"{}\"", bytes.escape_ascii()),
        }
    }
}

/// Global variable in IR
#[derive(Debug, Clone, PartialEq)]
pub struct IrGlobal {
    pub name: String,
    pub ty: IrType,
    pub init: Option<GlobalInit>,
    pub constant: bool,
}

/// IR module (one compilation unit)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IrModule {
    pub name: String,
    pub structs: Vec<IrStruct>,
    pub globals: Vec<IrGlobal>,
    pub functions: Vec<IrFunction>,
}

impl IrModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn function(&self, name: &str) -> Option<&IrFunction> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn struct_def(&self, name: &str) -> Option<&IrStruct> {
        self.structs.iter().find(|s| s.name == name)
    }

    pub fn global(&self, name: &str) -> Option<&IrGlobal> {
        self.globals.iter().find(|g| g.name == name)
    }
}

impl fmt::Display for IrModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "module {}", self.name)?;
        for def in &self.structs {
            match &def.fields {
                Some(fields) => {
                    let fields: Vec<String> = fields.iter().map(|t| t.to_string()).collect();
                    writeln!(f, "struct %{} = {{ {} }}", def.name, fields.join(", "))?;
                }
                None => writeln!(f, "struct %{} = opaque", def.name)?,
            }
        }
        for global in &self.globals {
            let keyword = if global.constant { "const" } else { "global" };
            match &global.init {
                Some(init) => writeln!(f, "{} @{}: {} = {}", keyword, global.name, global.ty, init)?,
                None => writeln!(f, "{} @{}: {}", keyword, global.name, global.ty)?,
            }
        }
        for func in &self.functions {
            writeln!(f)?;
            write!(f, "{}", func)?;
        }
        Ok(())
    }
}
