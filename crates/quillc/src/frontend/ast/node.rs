//! Uniform read-only view over syntax tree nodes
//!
//! Every node exposes a kind tag, indexed children and a source span, which
//! is all that generic traversal, printing and diagnostics need.

use super::*;
use crate::common::{LineIndex, Span};
use std::fmt::Write;

#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Module(&'a Module),
    Item(&'a Item),
    Func(&'a FuncDecl),
    Param(&'a Param),
    Field(&'a FieldDecl),
    Generic(&'a GenericParam),
    Alias(&'a AliasDecl),
    Block(&'a Block),
    Stmt(&'a Stmt),
    Expr(&'a Expr),
    InitField(&'a InitField),
    Type(&'a TypeExpr),
}

impl<'a> NodeRef<'a> {
    pub fn kind(&self) -> &'static str {
        match self {
            NodeRef::Module(_) => "Module",
            NodeRef::Item(item) => match &item.kind {
                ItemKind::Func(_) => "Func",
                ItemKind::Template(_) => "Template",
                ItemKind::Alias(_) => "TypeAlias",
                ItemKind::Spec(_) => "Spec",
                ItemKind::Action(_) => "Action",
                ItemKind::Const(_) => "Const",
                ItemKind::Package(_) => "Package",
            },
            NodeRef::Func(_) => "Func",
            NodeRef::Param(_) => "Param",
            NodeRef::Field(_) => "Field",
            NodeRef::Generic(_) => "GenericParam",
            NodeRef::Alias(_) => "TypeAlias",
            NodeRef::Block(_) => "Block",
            NodeRef::Stmt(stmt) => match &stmt.kind {
                StmtKind::Let { constant: true, .. } => "ConstStmt",
                StmtKind::Let { .. } => "LetStmt",
                StmtKind::Assign { .. } => "AssignStmt",
                StmtKind::Expr(_) => "ExprStmt",
                StmtKind::Return(_) => "ReturnStmt",
                StmtKind::If { .. } => "IfStmt",
                StmtKind::While { .. } => "WhileStmt",
                StmtKind::Break => "BreakStmt",
                StmtKind::Continue => "ContinueStmt",
                StmtKind::Block(_) => "BlockStmt",
            },
            NodeRef::Expr(expr) => match &expr.kind {
                ExprKind::IntLiteral(_) => "IntLiteral",
                ExprKind::FloatLiteral(_) => "FloatLiteral",
                ExprKind::BoolLiteral(_) => "BoolLiteral",
                ExprKind::StringLiteral(_) => "StringLiteral",
                ExprKind::ArrayLiteral(_) => "ArrayLiteral",
                ExprKind::Initializer(_) => "Initializer",
                ExprKind::Identifier(_) => "Identifier",
                ExprKind::Member { .. } => "Member",
                ExprKind::Call { .. } => "Call",
                ExprKind::Index { .. } => "Index",
                ExprKind::Binary { .. } => "Binary",
                ExprKind::Unary { .. } => "Unary",
                ExprKind::AddressOf(_) => "AddressOf",
                ExprKind::Deref(_) => "Deref",
                ExprKind::Cast { .. } => "Cast",
            },
            NodeRef::InitField(_) => "InitField",
            NodeRef::Type(_) => "Type",
        }
    }

    pub fn span(&self) -> Span {
        match self {
            NodeRef::Module(n) => n.span,
            NodeRef::Item(n) => n.span,
            NodeRef::Func(n) => n.span,
            NodeRef::Param(n) => n.span,
            NodeRef::Field(n) => n.span,
            NodeRef::Generic(n) => n.span,
            NodeRef::Alias(n) => n.span,
            NodeRef::Block(n) => n.span,
            NodeRef::Stmt(n) => n.span,
            NodeRef::Expr(n) => n.span,
            NodeRef::InitField(n) => n.span,
            NodeRef::Type(n) => n.span,
        }
    }

    /// Short node payload for printing: a name, operator or literal
    pub fn label(&self) -> Option<String> {
        match self {
            NodeRef::Item(item) => {
                let name = match &item.kind {
                    ItemKind::Action(a) => match &a.spec {
                        Some(spec) => format!("{} in {}", spec, a.target),
                        None => a.target.to_string(),
                    },
                    _ => item.name().unwrap_or_default().to_string(),
                };
                Some(if item.exported { format!("export {}", name) } else { name })
            }
            NodeRef::Func(f) => Some(f.name.clone()),
            NodeRef::Param(p) => Some(p.name.clone()),
            NodeRef::Field(f) => Some(f.name.clone()),
            NodeRef::Generic(g) => Some(g.name.clone()),
            NodeRef::Alias(a) => Some(a.name.clone()),
            NodeRef::Stmt(stmt) => match &stmt.kind {
                StmtKind::Let { name, .. } => Some(name.clone()),
                _ => None,
            },
            NodeRef::Expr(expr) => match &expr.kind {
                ExprKind::IntLiteral(n) => Some(n.to_string()),
                ExprKind::FloatLiteral(n) => Some(n.to_string()),
                ExprKind::BoolLiteral(b) => Some(b.to_string()),
                ExprKind::StringLiteral(s) => Some(format!("{:?}", s)),
                ExprKind::Identifier(name) => Some(name.clone()),
                ExprKind::Member { member, .. } => Some(member.clone()),
                ExprKind::Binary { op, .. } => Some(op.to_string()),
                ExprKind::Unary { op, .. } => Some(op.to_string()),
                _ => None,
            },
            NodeRef::InitField(f) => f.name.clone(),
            NodeRef::Type(ty) => Some(ty.to_string()),
            NodeRef::Module(_) | NodeRef::Block(_) => None,
        }
    }

    pub fn children(&self) -> Vec<NodeRef<'a>> {
        let mut out = Vec::new();
        match *self {
            NodeRef::Module(m) => out.extend(m.items.iter().map(NodeRef::Item)),
            NodeRef::Item(item) => match &item.kind {
                ItemKind::Func(f) => return NodeRef::Func(f).children(),
                ItemKind::Template(t) => {
                    out.extend(t.generics.iter().map(NodeRef::Generic));
                    out.extend(t.fields.iter().map(NodeRef::Field));
                    out.extend(t.methods.iter().map(NodeRef::Func));
                }
                ItemKind::Alias(a) => return NodeRef::Alias(a).children(),
                ItemKind::Spec(s) => {
                    out.extend(s.aliases.iter().map(NodeRef::Alias));
                    out.extend(s.methods.iter().map(NodeRef::Func));
                }
                ItemKind::Action(a) => {
                    out.extend(a.spec.iter().map(NodeRef::Type));
                    out.push(NodeRef::Type(&a.target));
                    out.extend(a.aliases.iter().map(NodeRef::Alias));
                    out.extend(a.methods.iter().map(NodeRef::Func));
                }
                ItemKind::Const(c) => {
                    out.extend(c.ty.iter().map(NodeRef::Type));
                    out.push(NodeRef::Expr(&c.value));
                }
                ItemKind::Package(p) => out.extend(p.items.iter().map(NodeRef::Item)),
            },
            NodeRef::Func(f) => {
                out.extend(f.params.iter().map(NodeRef::Param));
                out.extend(f.return_type.iter().map(NodeRef::Type));
                out.extend(f.body.iter().map(NodeRef::Block));
            }
            NodeRef::Param(p) => out.push(NodeRef::Type(&p.ty)),
            NodeRef::Field(f) => out.push(NodeRef::Type(&f.ty)),
            NodeRef::Generic(g) => out.extend(g.constraints.iter().map(NodeRef::Type)),
            NodeRef::Alias(a) => {
                out.extend(a.generics.iter().map(NodeRef::Generic));
                out.extend(a.target.iter().map(NodeRef::Type));
            }
            NodeRef::Block(b) => out.extend(b.stmts.iter().map(NodeRef::Stmt)),
            NodeRef::Stmt(stmt) => match &stmt.kind {
                StmtKind::Let { ty, init, .. } => {
                    out.extend(ty.iter().map(NodeRef::Type));
                    out.extend(init.iter().map(NodeRef::Expr));
                }
                StmtKind::Assign { target, value } => {
                    out.push(NodeRef::Expr(target));
                    out.push(NodeRef::Expr(value));
                }
                StmtKind::Expr(e) => out.push(NodeRef::Expr(e)),
                StmtKind::Return(value) => out.extend(value.iter().map(NodeRef::Expr)),
                StmtKind::If { cond, then_block, else_branch } => {
                    out.push(NodeRef::Expr(cond));
                    out.push(NodeRef::Block(then_block));
                    match else_branch {
                        Some(ElseBranch::Block(b)) => out.push(NodeRef::Block(b)),
                        Some(ElseBranch::If(s)) => out.push(NodeRef::Stmt(s)),
                        None => {}
                    }
                }
                StmtKind::While { cond, body } => {
                    out.push(NodeRef::Expr(cond));
                    out.push(NodeRef::Block(body));
                }
                StmtKind::Block(b) => out.push(NodeRef::Block(b)),
                StmtKind::Break | StmtKind::Continue => {}
            },
            NodeRef::Expr(expr) => match &expr.kind {
                ExprKind::ArrayLiteral(elems) => out.extend(elems.iter().map(NodeRef::Expr)),
                ExprKind::Initializer(fields) => out.extend(fields.iter().map(NodeRef::InitField)),
                ExprKind::Member { object, .. } => out.push(NodeRef::Expr(object)),
                ExprKind::Call { callee, args } => {
                    out.push(NodeRef::Expr(callee));
                    out.extend(args.iter().map(NodeRef::Expr));
                }
                ExprKind::Index { base, index } => {
                    out.push(NodeRef::Expr(base));
                    out.push(NodeRef::Expr(index));
                }
                ExprKind::Binary { left, right, .. } => {
                    out.push(NodeRef::Expr(left));
                    out.push(NodeRef::Expr(right));
                }
                ExprKind::Unary { operand, .. } => out.push(NodeRef::Expr(operand)),
                ExprKind::AddressOf(inner) | ExprKind::Deref(inner) => {
                    out.push(NodeRef::Expr(inner));
                }
                ExprKind::Cast { expr, ty } => {
                    out.push(NodeRef::Expr(expr));
                    out.push(NodeRef::Type(ty));
                }
                ExprKind::IntLiteral(_)
                | ExprKind::FloatLiteral(_)
                | ExprKind::BoolLiteral(_)
                | ExprKind::StringLiteral(_)
                | ExprKind::Identifier(_) => {}
            },
            NodeRef::InitField(f) => out.push(NodeRef::Expr(&f.value)),
            NodeRef::Type(_) => {}
        }
        out
    }

    pub fn child(&self, index: usize) -> Option<NodeRef<'a>> {
        self.children().get(index).copied()
    }

    pub fn child_count(&self) -> usize {
        self.children().len()
    }
}

/// Print a syntax tree, one node per line, with line:character ranges
pub fn dump_tree(root: NodeRef<'_>, index: &LineIndex) -> String {
    fn walk(node: NodeRef<'_>, depth: usize, index: &LineIndex, out: &mut String) {
        let _ = write!(out, "{}{}", "  ".repeat(depth), node.kind());
        if let Some(label) = node.label() {
            let _ = write!(out, " {}", label);
        }
        let _ = writeln!(out, " @{}", index.range(node.span()));
        for i in 0..node.child_count() {
            if let Some(child) = node.child(i) {
                walk(child, depth + 1, index, out);
            }
        }
    }

    let mut out = String::new();
    walk(root, 0, index, &mut out);
    out
}
