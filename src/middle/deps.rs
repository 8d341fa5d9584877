//! Dependency resolver
//!
//! Computes what an expression, statement or view subtree reads, and what a
//! statement list writes. Everything here is a pure function of the tree it
//! is given; the same subtree always yields the same sets.

use std::collections::BTreeSet;
use std::fmt;

use crate::frontend::ast::{CallArg, Expr, Stmt, StrPart, UnOp, ViewNode};

/// A qualified `object.member` read
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemberPath {
    pub object: String,
    pub member: String,
}

impl MemberPath {
    pub fn new(object: &str, member: &str) -> Self {
        Self { object: object.to_string(), member: member.to_string() }
    }
}

impl fmt::Display for MemberPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.object, self.member)
    }
}

/// A write performed by a statement
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Change {
    /// The variable as a whole changed
    Var(String),
    /// Only one member of the object changed
    Member(String, String),
}

impl Change {
    pub fn var(&self) -> &str {
        match self {
            Change::Var(v) | Change::Member(v, _) => v,
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Change::Var(v) => write!(f, "{}", v),
            Change::Member(o, m) => write!(f, "{}.{}", o, m),
        }
    }
}

/// Read-set of a tree.
///
/// `vars` is the coarse set. `members` holds the qualified reads and
/// `opaque` the objects that are also read as a whole, so a member change
/// `(o, m)` only matters when `(o, m)` is in `members` or `o` is opaque.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencySet {
    pub vars: BTreeSet<String>,
    pub members: BTreeSet<MemberPath>,
    pub opaque: BTreeSet<String>,
}

impl DependencySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains(name)
    }

    fn read_whole(&mut self, name: &str) {
        self.vars.insert(name.to_string());
        self.opaque.insert(name.to_string());
    }

    fn read_member(&mut self, object: &str, member: &str) {
        self.vars.insert(object.to_string());
        self.members.insert(MemberPath::new(object, member));
    }

    pub fn extend(&mut self, other: DependencySet) {
        self.vars.extend(other.vars);
        self.members.extend(other.members);
        self.opaque.extend(other.opaque);
    }

    /// Drop a name bound locally (loop variables)
    pub fn remove(&mut self, name: &str) {
        self.vars.remove(name);
        self.opaque.remove(name);
        self.members.retain(|m| m.object != name);
    }

    /// Keep only the names accepted by `keep`
    pub fn retain(&mut self, keep: impl Fn(&str) -> bool) {
        self.vars.retain(|v| keep(v));
        self.opaque.retain(|v| keep(v));
        self.members.retain(|m| keep(&m.object));
    }

    pub fn triggered_by(&self, change: &Change) -> bool {
        match change {
            Change::Var(v) => self.vars.contains(v),
            Change::Member(o, m) => {
                self.opaque.contains(o)
                    || self.members.iter().any(|p| &p.object == o && &p.member == m)
            }
        }
    }

    pub fn triggered_by_any<'a>(&self, changes: impl IntoIterator<Item = &'a Change>) -> bool {
        changes.into_iter().any(|c| self.triggered_by(c))
    }
}

/// Coarse (`vars`) and qualified (`members`) read-sets of an expression
pub fn expr_deps(expr: &Expr) -> DependencySet {
    let mut deps = DependencySet::new();
    visit_expr(expr, &mut deps);
    deps
}

pub fn stmt_deps(stmt: &Stmt) -> DependencySet {
    let mut deps = DependencySet::new();
    visit_stmt(stmt, &mut deps);
    deps
}

pub fn stmts_deps(stmts: &[Stmt]) -> DependencySet {
    let mut deps = DependencySet::new();
    for stmt in stmts {
        visit_stmt(stmt, &mut deps);
    }
    deps
}

/// Free reads of a view subtree (loop variables bound inside are excluded)
pub fn view_deps(nodes: &[ViewNode]) -> DependencySet {
    let mut deps = DependencySet::new();
    for node in nodes {
        visit_view(node, &mut deps);
    }
    deps
}

fn visit_expr(expr: &Expr, deps: &mut DependencySet) {
    match expr {
        Expr::Int { .. } | Expr::Float { .. } | Expr::Bool { .. } | Expr::EnumAccess { .. } => {}
        Expr::Ident { name, .. } => deps.read_whole(name),
        Expr::Str { parts, .. } => {
            for part in parts {
                if let StrPart::Expr(e) = part {
                    visit_expr(e, deps);
                }
            }
        }
        Expr::Binary { left, right, .. } => {
            visit_expr(left, deps);
            visit_expr(right, deps);
        }
        Expr::Unary { operand, .. } | Expr::Postfix { operand, .. } => visit_expr(operand, deps),
        Expr::Member { object, member, .. } => match object.as_ref() {
            Expr::Ident { name, .. } => deps.read_member(name, member),
            other => visit_expr(other, deps),
        },
        Expr::Index { array, index, .. } => {
            visit_expr(array, deps);
            visit_expr(index, deps);
        }
        Expr::Call { callee, args, .. } => {
            // a bare callee names a function, not a value
            if let Expr::Member { object, .. } = callee.as_ref() {
                visit_receiver(object, deps);
            }
            visit_args(args, deps);
        }
        Expr::Construct { args, .. } => visit_args(args, deps),
        Expr::Ternary { cond, then_expr, else_expr, .. } => {
            visit_expr(cond, deps);
            visit_expr(then_expr, deps);
            visit_expr(else_expr, deps);
        }
        Expr::Array { elements, .. } => {
            for e in elements {
                visit_expr(e, deps);
            }
        }
        Expr::ArrayRepeat { value, .. } => visit_expr(value, deps),
    }
}

/// A method receiver may be read in full by the method
fn visit_receiver(object: &Expr, deps: &mut DependencySet) {
    match object {
        Expr::Ident { name, .. } => deps.read_whole(name),
        Expr::Member { object, member, .. } => match object.as_ref() {
            Expr::Ident { name, .. } => deps.read_member(name, member),
            other => visit_receiver(other, deps),
        },
        other => visit_expr(other, deps),
    }
}

fn visit_args(args: &[CallArg], deps: &mut DependencySet) {
    for arg in args {
        visit_expr(&arg.value, deps);
    }
}

fn visit_stmt(stmt: &Stmt, deps: &mut DependencySet) {
    match stmt {
        Stmt::VarDecl { init, .. } => {
            if let Some(init) = init {
                visit_expr(init, deps);
            }
        }
        Stmt::Assign { target, value, op, .. } => {
            visit_expr(value, deps);
            if op.is_some() {
                deps.read_whole(target);
            }
        }
        Stmt::IndexAssign { array, index, value, op, .. } => {
            visit_expr(index, deps);
            visit_expr(value, deps);
            if op.is_some() {
                visit_expr(array, deps);
            }
        }
        Stmt::MemberAssign { object, member, value, op, .. } => {
            visit_expr(value, deps);
            if op.is_some() {
                match object {
                    Expr::Ident { name, .. } => deps.read_member(name, member),
                    other => visit_expr(other, deps),
                }
            }
        }
        Stmt::Expr { expr, .. } => visit_expr(expr, deps),
        Stmt::Return { value, .. } => {
            if let Some(v) = value {
                visit_expr(v, deps);
            }
        }
        Stmt::If { cond, then_branch, else_branch, .. } => {
            visit_expr(cond, deps);
            for s in then_branch.iter().chain(else_branch) {
                visit_stmt(s, deps);
            }
        }
        Stmt::ForRange { var, start, end, body, .. } => {
            visit_expr(start, deps);
            visit_expr(end, deps);
            let mut inner = stmts_deps(body);
            inner.remove(var);
            deps.extend(inner);
        }
        Stmt::ForEach { var, iterable, body, .. } => {
            visit_expr(iterable, deps);
            let mut inner = stmts_deps(body);
            inner.remove(var);
            deps.extend(inner);
        }
        Stmt::Block { stmts, .. } => {
            for s in stmts {
                visit_stmt(s, deps);
            }
        }
    }
}

fn visit_view(node: &ViewNode, deps: &mut DependencySet) {
    match node {
        ViewNode::Text { .. } => {}
        ViewNode::Expr { expr, .. } => visit_expr(expr, deps),
        ViewNode::Element(el) => {
            for attr in &el.attributes {
                if attr.event_kind().is_none() {
                    visit_expr(&attr.value, deps);
                }
            }
            for child in &el.children {
                visit_view(child, deps);
            }
        }
        ViewNode::Component(inst) => {
            for prop in &inst.props {
                visit_expr(&prop.value, deps);
            }
        }
        ViewNode::If { cond, then_children, else_children, .. } => {
            visit_expr(cond, deps);
            for child in then_children.iter().chain(else_children) {
                visit_view(child, deps);
            }
        }
        ViewNode::ForRange { var, start, end, children, .. } => {
            visit_expr(start, deps);
            visit_expr(end, deps);
            let mut inner = view_deps(children);
            inner.remove(var);
            deps.extend(inner);
        }
        ViewNode::ForEach { var, iterable, key, children, .. } => {
            visit_expr(iterable, deps);
            let mut inner = view_deps(children);
            if let Some(key) = key {
                visit_expr(key, &mut inner);
            }
            inner.remove(var);
            deps.extend(inner);
        }
    }
}

// ==================== Writes ====================

/// Array members that modify their receiver
pub const ARRAY_MUTATORS: [&str; 4] = ["push", "pop", "clear", "remove"];

/// Write-set of a statement list, treating only array built-ins as mutating
/// method calls
pub fn collect_modifications(stmts: &[Stmt]) -> BTreeSet<Change> {
    collect_modifications_with(stmts, &|_, method| ARRAY_MUTATORS.contains(&method))
}

/// Write-set of a statement list.
///
/// `mutates(root, method)` decides whether calling `method` on a receiver
/// rooted at variable `root` modifies it.
pub fn collect_modifications_with(
    stmts: &[Stmt],
    mutates: &dyn Fn(&str, &str) -> bool,
) -> BTreeSet<Change> {
    let mut changes = BTreeSet::new();
    for stmt in stmts {
        mods_stmt(stmt, mutates, &mut changes);
    }
    changes
}

/// Variable an lvalue ultimately writes into
pub fn root_var(expr: &Expr) -> Option<&str> {
    match expr {
        Expr::Ident { name, .. } => Some(name),
        Expr::Member { object, .. } | Expr::Index { array: object, .. } => root_var(object),
        _ => None,
    }
}

/// A write through loop item `var` is a write into `iterable`
pub fn redirect_item_write(change: Change, var: &str, iterable: &Expr) -> Option<Change> {
    if change.var() == var {
        lvalue_change(iterable)
    } else {
        Some(change)
    }
}

/// Most precise change describing a write through `target`
fn lvalue_change(target: &Expr) -> Option<Change> {
    match target {
        Expr::Ident { name, .. } => Some(Change::Var(name.clone())),
        Expr::Member { object, member, .. } => match object.as_ref() {
            Expr::Ident { name, .. } => Some(Change::Member(name.clone(), member.clone())),
            other => lvalue_change(other),
        },
        Expr::Index { array, .. } => root_var(array).map(|r| Change::Var(r.to_string())),
        _ => None,
    }
}

fn mods_stmt(stmt: &Stmt, mutates: &dyn Fn(&str, &str) -> bool, out: &mut BTreeSet<Change>) {
    match stmt {
        Stmt::VarDecl { init, .. } => {
            if let Some(init) = init {
                mods_expr(init, mutates, out);
            }
        }
        Stmt::Assign { target, value, .. } => {
            mods_expr(value, mutates, out);
            out.insert(Change::Var(target.clone()));
        }
        Stmt::IndexAssign { array, index, value, .. } => {
            mods_expr(index, mutates, out);
            mods_expr(value, mutates, out);
            if let Some(root) = root_var(array) {
                out.insert(Change::Var(root.to_string()));
            }
        }
        Stmt::MemberAssign { object, member, value, .. } => {
            mods_expr(value, mutates, out);
            let change = match object {
                Expr::Ident { name, .. } => Some(Change::Member(name.clone(), member.clone())),
                other => lvalue_change(other),
            };
            out.extend(change);
        }
        Stmt::Expr { expr, .. } => mods_expr(expr, mutates, out),
        Stmt::Return { value, .. } => {
            if let Some(v) = value {
                mods_expr(v, mutates, out);
            }
        }
        Stmt::If { cond, then_branch, else_branch, .. } => {
            mods_expr(cond, mutates, out);
            for s in then_branch.iter().chain(else_branch) {
                mods_stmt(s, mutates, out);
            }
        }
        Stmt::ForRange { var, start, end, body, .. } => {
            mods_expr(start, mutates, out);
            mods_expr(end, mutates, out);
            let inner = collect_modifications_with(body, mutates);
            out.extend(inner.into_iter().filter(|c| c.var() != var));
        }
        Stmt::ForEach { var, iterable, body, .. } => {
            mods_expr(iterable, mutates, out);
            let inner = collect_modifications_with(body, mutates);
            out.extend(inner.into_iter().filter_map(|c| redirect_item_write(c, var, iterable)));
        }
        Stmt::Block { stmts, .. } => {
            for s in stmts {
                mods_stmt(s, mutates, out);
            }
        }
    }
}

fn mods_expr(expr: &Expr, mutates: &dyn Fn(&str, &str) -> bool, out: &mut BTreeSet<Change>) {
    match expr {
        Expr::Postfix { operand, .. } => {
            out.extend(lvalue_change(operand));
        }
        Expr::Unary { op, operand, .. } => {
            if op.is_increment() {
                out.extend(lvalue_change(operand));
            } else {
                mods_expr(operand, mutates, out);
            }
        }
        Expr::Call { callee, args, .. } => {
            if let Expr::Member { object, member, .. } = callee.as_ref() {
                if let Some(root) = root_var(object) {
                    if mutates(root, member) {
                        out.extend(lvalue_change(object));
                    }
                }
                mods_expr(object, mutates, out);
            }
            for arg in args {
                mods_expr(&arg.value, mutates, out);
            }
        }
        Expr::Construct { args, .. } => {
            for arg in args {
                mods_expr(&arg.value, mutates, out);
            }
        }
        Expr::Binary { left, right, .. } => {
            mods_expr(left, mutates, out);
            mods_expr(right, mutates, out);
        }
        Expr::Member { object, .. } => mods_expr(object, mutates, out),
        Expr::Index { array, index, .. } => {
            mods_expr(array, mutates, out);
            mods_expr(index, mutates, out);
        }
        Expr::Ternary { cond, then_expr, else_expr, .. } => {
            mods_expr(cond, mutates, out);
            mods_expr(then_expr, mutates, out);
            mods_expr(else_expr, mutates, out);
        }
        Expr::Str { parts, .. } => {
            for part in parts {
                if let StrPart::Expr(e) = part {
                    mods_expr(e, mutates, out);
                }
            }
        }
        Expr::Array { elements, .. } => {
            for e in elements {
                mods_expr(e, mutates, out);
            }
        }
        Expr::ArrayRepeat { value, .. } => mods_expr(value, mutates, out),
        Expr::Int { .. }
        | Expr::Float { .. }
        | Expr::Bool { .. }
        | Expr::Ident { .. }
        | Expr::EnumAccess { .. } => {}
    }
}

/// Side-effect free: no writes, increments, calls or constructions
pub fn is_pure(expr: &Expr) -> bool {
    match expr {
        Expr::Int { .. }
        | Expr::Float { .. }
        | Expr::Bool { .. }
        | Expr::Ident { .. }
        | Expr::EnumAccess { .. } => true,
        Expr::Postfix { .. } | Expr::Call { .. } | Expr::Construct { .. } => false,
        Expr::Unary { op, operand, .. } => {
            !matches!(op, UnOp::PreInc | UnOp::PreDec) && is_pure(operand)
        }
        Expr::Str { parts, .. } => parts.iter().all(|p| match p {
            StrPart::Text(_) => true,
            StrPart::Expr(e) => is_pure(e),
        }),
        Expr::Binary { left, right, .. } => is_pure(left) && is_pure(right),
        Expr::Member { object, .. } => is_pure(object),
        Expr::Index { array, index, .. } => is_pure(array) && is_pure(index),
        Expr::Ternary { cond, then_expr, else_expr, .. } => {
            is_pure(cond) && is_pure(then_expr) && is_pure(else_expr)
        }
        Expr::Array { elements, .. } => elements.iter().all(is_pure),
        Expr::ArrayRepeat { value, .. } => is_pure(value),
    }
}
