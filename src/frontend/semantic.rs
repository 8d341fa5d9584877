//! Semantic Analysis for viewc
//!
//! Performs:
//! - Symbol table management (component, method and loop scopes)
//! - Type inference for every expression
//! - Type checking of state initializers, prop defaults, method bodies and views
//!
//! Prop and callback contracts of child components are validated by
//! `view_check`; writes to immutable bindings by `mutability`.

use std::collections::HashMap;

use crate::frontend::ast::*;
use crate::frontend::view_check;
use crate::middle::deps::ARRAY_MUTATORS;
use crate::types::type_system::{common_type, literal_fits, Type};
use crate::types::TypeEnv;
use crate::utils::{Error, Result, Span};

// ==================== Symbol Table ====================

/// Unique identifier for a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

/// Symbol information
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub ty: Type,
    pub span: Span,
    pub mutable: bool,
}

/// Kind of symbol
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolKind {
    State,
    Param { reference: bool },
    /// `def name(..)` parameter; `ty` holds the callback signature
    Callback,
    /// Component method; `ty` holds the parameter list
    Method { ret: Type },
    Local,
    LoopVar,
}

/// A scope containing symbols
#[derive(Debug)]
struct Scope {
    parent: Option<ScopeId>,
    symbols: HashMap<String, Symbol>,
}

/// Symbol table with nested scopes
pub struct SymbolTable {
    scopes: Vec<Scope>,
    current: ScopeId,
}

impl SymbolTable {
    pub fn new() -> Self {
        let global = Scope { parent: None, symbols: HashMap::new() };
        Self { scopes: vec![global], current: ScopeId(0) }
    }

    /// Enter a new scope
    pub fn enter_scope(&mut self) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope { parent: Some(self.current), symbols: HashMap::new() });
        self.current = id;
        id
    }

    /// Exit the current scope
    pub fn exit_scope(&mut self) {
        if let Some(parent) = self.scopes[self.current.0].parent {
            self.current = parent;
        }
    }

    /// Define a symbol in the current scope
    pub fn define(&mut self, symbol: Symbol) -> Result<()> {
        let scope = &mut self.scopes[self.current.0];
        if scope.symbols.contains_key(&symbol.name) {
            return Err(Error::DuplicateDefinition { name: symbol.name.clone(), span: symbol.span });
        }
        scope.symbols.insert(symbol.name.clone(), symbol);
        Ok(())
    }

    /// Look up a symbol, searching from current scope upward
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        let mut scope_id = Some(self.current);
        while let Some(id) = scope_id {
            if let Some(symbol) = self.scopes[id.0].symbols.get(name) {
                return Some(symbol);
            }
            scope_id = self.scopes[id.0].parent;
        }
        None
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Does calling `method` on a value of type `ty` modify that value?
pub fn is_mutating_call(env: &TypeEnv<'_>, ty: &Type, method: &str) -> bool {
    match ty {
        Type::Array(_) | Type::FixedArray(..) => {
            ARRAY_MUTATORS.contains(&method)
                || env.schema.lookup_method("array", method).map(|m| m.mutates).unwrap_or(false)
        }
        Type::String => env.schema.lookup_method("string", method).map(|m| m.mutates).unwrap_or(false),
        Type::Handle(name) => env.schema.lookup_method(name, method).map(|m| m.mutates).unwrap_or(false),
        _ => false,
    }
}

/// Is this expression an integer literal, possibly negated?
fn int_literal(expr: &Expr) -> Option<i128> {
    match expr {
        Expr::Int { value, .. } => Some(*value as i128),
        Expr::Unary { op: UnOp::Neg, operand, .. } => int_literal(operand).map(|v| -v),
        _ => None,
    }
}

fn is_float_literal(expr: &Expr) -> bool {
    match expr {
        Expr::Float { .. } => true,
        Expr::Unary { op: UnOp::Neg, operand, .. } => is_float_literal(operand),
        _ => false,
    }
}

/// Values that can be rendered as text or attribute values
fn is_printable(ty: &Type) -> bool {
    matches!(ty, Type::Primitive(_) | Type::String | Type::Enum(_))
}

// ==================== Type Checker ====================

/// Type checker for one program
pub struct TypeChecker<'a> {
    env: &'a TypeEnv<'a>,
    symbols: SymbolTable,
    component: Option<&'a Component>,
    return_type: Type,
}

impl<'a> TypeChecker<'a> {
    pub fn new(env: &'a TypeEnv<'a>) -> Self {
        Self { env, symbols: SymbolTable::new(), component: None, return_type: Type::Void }
    }

    pub fn env(&self) -> &'a TypeEnv<'a> {
        self.env
    }

    pub fn current_component(&self) -> Option<&'a Component> {
        self.component
    }

    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.symbols.lookup(name)
    }

    pub fn enter_scope(&mut self) {
        self.symbols.enter_scope();
    }

    pub fn exit_scope(&mut self) {
        self.symbols.exit_scope();
    }

    /// Bind a name in the current scope
    pub fn define_local(&mut self, name: &str, ty: Type, kind: SymbolKind, mutable: bool, span: Span) -> Result<()> {
        self.symbols.define(Symbol { name: name.to_string(), kind, ty, span, mutable })
    }

    pub fn normalize(&self, ty: &TypeExpr, span: Span) -> Result<Type> {
        self.env.normalize(ty, self.component, span)
    }

    /// Check the whole program
    pub fn check_program(&mut self, program: &'a Program) -> Result<()> {
        for s in &program.structs {
            self.check_struct(s, None)?;
        }
        for comp in &program.components {
            self.check_component(comp)?;
        }
        Ok(())
    }

    fn check_struct(&self, def: &StructDef, owner: Option<&'a Component>) -> Result<()> {
        for field in &def.fields {
            let ty = self.env.normalize(&field.ty, owner, def.span)?;
            if self.env.is_nocopy(&ty) {
                return Err(Error::NocopyField {
                    owner: def.name.clone(),
                    field: field.name.clone(),
                    ty: ty.to_string(),
                    span: def.span,
                });
            }
        }
        Ok(())
    }

    /// Enter a component's scope and define everything it declares
    pub fn enter_component(&mut self, comp: &'a Component) -> Result<()> {
        self.component = Some(comp);
        self.symbols.enter_scope();

        for p in &comp.params {
            let (ty, kind) = match &p.callback {
                Some(args) => {
                    let args = args.iter().map(|a| self.normalize(a, p.span)).collect::<Result<Vec<_>>>()?;
                    (Type::Callback(args), SymbolKind::Callback)
                }
                None => (self.normalize(&p.ty, p.span)?, SymbolKind::Param { reference: p.is_reference }),
            };
            self.define_local(&p.name, ty, kind, p.mutable, p.span)?;
        }
        for v in &comp.state {
            let ty = self.normalize(&v.ty, v.span)?;
            self.define_local(&v.name, ty, SymbolKind::State, v.mutable, v.span)?;
        }
        for m in &comp.methods {
            let params = m.params.iter().map(|p| self.normalize(&p.ty, m.param_span(p))).collect::<Result<Vec<_>>>()?;
            let ret = match &m.ret {
                Some(t) => self.normalize(t, m.span)?,
                None => Type::Void,
            };
            self.define_local(&m.name, Type::Callback(params), SymbolKind::Method { ret }, false, m.span)?;
        }
        Ok(())
    }

    pub fn exit_component(&mut self) {
        self.symbols.exit_scope();
        self.component = None;
    }

    fn check_component(&mut self, comp: &'a Component) -> Result<()> {
        log::debug!("type checking component {}", comp.name);
        for s in &comp.structs {
            self.check_struct(s, Some(comp))?;
        }
        self.enter_component(comp)?;

        for p in &comp.params {
            if let Some(default) = &p.default {
                let target = self.symbol_type(&p.name)?;
                self.check_assignable(default, &target, p.span)?;
            }
        }
        for v in &comp.state {
            if let Some(init) = &v.init {
                let target = self.symbol_type(&v.name)?;
                self.check_assignable(init, &target, v.span)?;
            }
        }
        for m in &comp.methods {
            self.check_method(m)?;
        }
        self.check_view(&comp.view)?;

        self.exit_component();
        Ok(())
    }

    fn symbol_type(&self, name: &str) -> Result<Type> {
        self.symbols
            .lookup(name)
            .map(|s| s.ty.clone())
            .ok_or_else(|| Error::UnresolvedIdentifier { name: name.to_string(), span: Span::dummy() })
    }

    /// `init` and `mount` take nothing; `tick` takes at most a float delta
    fn check_hook_signature(&mut self, method: &Method) -> Result<()> {
        let fail = |message: &str, span: Span| Error::HookSignature {
            method: method.name.clone(),
            message: message.to_string(),
            span,
        };
        match method.name.as_str() {
            INIT_METHOD | MOUNT_METHOD if !method.params.is_empty() => Err(fail("takes no parameters", method.span)),
            TICK_METHOD => match method.params.as_slice() {
                [] => Ok(()),
                [dt] => {
                    let span = method.param_span(dt);
                    let ty = self.normalize(&dt.ty, span)?;
                    if ty.as_primitive().is_some_and(|p| p.is_float()) {
                        Ok(())
                    } else {
                        Err(fail("takes the frame delta as a float", span))
                    }
                }
                _ => Err(fail("takes at most one parameter", method.span)),
            },
            _ => Ok(()),
        }
    }

    fn check_method(&mut self, method: &'a Method) -> Result<()> {
        self.check_hook_signature(method)?;
        self.return_type = match &method.ret {
            Some(t) => self.normalize(t, method.span)?,
            None => Type::Void,
        };
        self.symbols.enter_scope();
        for p in &method.params {
            let span = method.param_span(p);
            let ty = self.normalize(&p.ty, span)?;
            self.define_local(&p.name, ty, SymbolKind::Local, p.mutable, span)?;
        }
        let result = self.check_block(&method.body);
        self.symbols.exit_scope();
        self.return_type = Type::Void;
        result
    }

    fn check_block(&mut self, stmts: &[Stmt]) -> Result<()> {
        for stmt in stmts {
            self.check_stmt(stmt)?;
        }
        Ok(())
    }

    fn check_scoped_block(&mut self, stmts: &[Stmt]) -> Result<()> {
        self.symbols.enter_scope();
        let result = self.check_block(stmts);
        self.symbols.exit_scope();
        result
    }

    /// Check that `value` may initialize or be assigned to a `target`
    pub fn check_assignable(&mut self, value: &Expr, target: &Type, span: Span) -> Result<()> {
        if let Some(v) = int_literal(value) {
            if literal_fits(v, target) {
                return Ok(());
            }
        }
        if is_float_literal(value) && target.as_primitive().map(|p| p.is_float()).unwrap_or(false) {
            return Ok(());
        }
        let got = self.infer(value)?;
        if self.env.is_compatible(&got, target) {
            Ok(())
        } else {
            Err(Error::TypeMismatch { expected: target.to_string(), got: got.to_string(), span })
        }
    }

    fn expect_type(&mut self, expr: &Expr, pred: fn(&Type) -> bool, expected: &str) -> Result<Type> {
        let ty = self.infer(expr)?;
        if pred(&ty) {
            Ok(ty)
        } else {
            Err(Error::TypeMismatch { expected: expected.to_string(), got: ty.to_string(), span: expr.span() })
        }
    }

    // ==================== Statements ====================

    fn check_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::VarDecl { name, ty, mutable, init, span } => {
                let declared = ty.as_ref().map(|t| self.normalize(t, *span)).transpose()?;
                let final_ty = match (declared, init) {
                    (Some(d), Some(init)) => {
                        self.check_assignable(init, &d, *span)?;
                        d
                    }
                    (Some(d), None) => d,
                    (None, Some(init)) => {
                        let t = self.infer(init)?;
                        if t == Type::array(Type::Unknown) {
                            return Err(Error::TypeMismatch {
                                expected: "an explicitly typed array".to_string(),
                                got: t.to_string(),
                                span: *span,
                            });
                        }
                        t
                    }
                    (None, None) => {
                        return Err(Error::TypeMismatch {
                            expected: "a declared type or initializer".to_string(),
                            got: "nothing".to_string(),
                            span: *span,
                        })
                    }
                };
                self.define_local(name, final_ty, SymbolKind::Local, *mutable, *span)
            }
            Stmt::Assign { target, value, op, span } => {
                let symbol = self
                    .symbols
                    .lookup(target)
                    .ok_or_else(|| Error::UnresolvedIdentifier { name: target.clone(), span: *span })?;
                if matches!(symbol.kind, SymbolKind::Method { .. } | SymbolKind::Callback) {
                    return Err(Error::TypeMismatch {
                        expected: "an assignable variable".to_string(),
                        got: format!("method '{}'", target),
                        span: *span,
                    });
                }
                let target_ty = symbol.ty.clone();
                self.check_store(&target_ty, *op, value, *span)
            }
            Stmt::IndexAssign { array, index, value, op, span } => {
                let array_ty = self.infer(array)?;
                let elem = array_ty
                    .element_type()
                    .cloned()
                    .ok_or_else(|| Error::NotIndexable { ty: array_ty.to_string(), span: *span })?;
                self.expect_type(index, Type::is_integer, "an integer index")?;
                self.check_store(&elem, *op, value, *span)
            }
            Stmt::MemberAssign { object, member, value, op, span } => {
                let object_ty = self.infer(object)?;
                let field_ty = self.member_type(&object_ty, member, *span)?;
                self.check_store(&field_ty, *op, value, *span)
            }
            Stmt::Expr { expr, .. } => self.infer(expr).map(|_| ()),
            Stmt::Return { value, span } => {
                let expected = self.return_type.clone();
                match value {
                    Some(v) => self.check_assignable(v, &expected, *span),
                    None if expected == Type::Void => Ok(()),
                    None => Err(Error::TypeMismatch {
                        expected: expected.to_string(),
                        got: "void".to_string(),
                        span: *span,
                    }),
                }
            }
            Stmt::If { cond, then_branch, else_branch, .. } => {
                self.expect_type(cond, Type::is_bool, "bool")?;
                self.check_scoped_block(then_branch)?;
                self.check_scoped_block(else_branch)
            }
            Stmt::ForRange { var, start, end, body, span } => {
                self.expect_type(start, Type::is_integer, "an integer range bound")?;
                self.expect_type(end, Type::is_integer, "an integer range bound")?;
                self.symbols.enter_scope();
                let result = self
                    .define_local(var, Type::INT, SymbolKind::LoopVar, false, *span)
                    .and_then(|_| self.check_block(body));
                self.symbols.exit_scope();
                result
            }
            Stmt::ForEach { var, iterable, body, span } => {
                let elem = self.iterable_element(iterable)?;
                self.symbols.enter_scope();
                let result = self
                    .define_local(var, elem, SymbolKind::LoopVar, false, *span)
                    .and_then(|_| self.check_block(body));
                self.symbols.exit_scope();
                result
            }
            Stmt::Block { stmts, .. } => self.check_scoped_block(stmts),
        }
    }

    /// Plain or compound store of `value` into a location of type `target`
    fn check_store(&mut self, target: &Type, op: Option<BinOp>, value: &Expr, span: Span) -> Result<()> {
        match op {
            None => self.check_assignable(value, target, span),
            Some(op) => {
                let value_ty = self.infer(value)?;
                let result = self.binary_result(op, target, &value_ty, None, int_literal(value), span)?;
                if self.env.is_compatible(&result, target) {
                    Ok(())
                } else {
                    Err(Error::TypeMismatch { expected: target.to_string(), got: result.to_string(), span })
                }
            }
        }
    }

    pub fn iterable_element(&mut self, iterable: &Expr) -> Result<Type> {
        let ty = self.infer(iterable)?;
        match ty.element_type() {
            Some(elem) if *elem != Type::Unknown => Ok(elem.clone()),
            _ => Err(Error::TypeMismatch {
                expected: "an array".to_string(),
                got: ty.to_string(),
                span: iterable.span(),
            }),
        }
    }

    // ==================== Expressions ====================

    /// Infer the type of an expression in the current scope
    pub fn infer(&mut self, expr: &Expr) -> Result<Type> {
        match expr {
            Expr::Int { value, .. } => {
                if literal_fits(*value as i128, &Type::INT) {
                    Ok(Type::INT)
                } else {
                    Ok(Type::INT64)
                }
            }
            Expr::Float { .. } => Ok(Type::FLOAT),
            Expr::Bool { .. } => Ok(Type::BOOL),
            Expr::Str { parts, .. } => {
                for part in parts {
                    if let StrPart::Expr(e) = part {
                        let t = self.infer(e)?;
                        if !is_printable(&t) {
                            return Err(Error::TypeMismatch {
                                expected: "a printable value".to_string(),
                                got: t.to_string(),
                                span: e.span(),
                            });
                        }
                    }
                }
                Ok(Type::String)
            }
            Expr::Ident { name, span } => self
                .symbols
                .lookup(name)
                .map(|s| s.ty.clone())
                .ok_or_else(|| Error::UnresolvedIdentifier { name: name.clone(), span: *span }),
            Expr::Binary { op, left, right, span } => {
                let lt = self.infer(left)?;
                let rt = self.infer(right)?;
                self.binary_result(*op, &lt, &rt, int_literal(left), int_literal(right), *span)
            }
            Expr::Unary { op, operand, span } => {
                let t = self.infer(operand)?;
                let ok = match op {
                    UnOp::Neg => t.is_numeric(),
                    UnOp::Not => t.is_bool(),
                    UnOp::PreInc | UnOp::PreDec => t.is_numeric() && is_lvalue(operand),
                };
                if ok {
                    Ok(t)
                } else {
                    Err(Error::InvalidOperand { op: op.symbol().to_string(), ty: t.to_string(), span: *span })
                }
            }
            Expr::Postfix { op, operand, span } => {
                let t = self.infer(operand)?;
                if t.is_numeric() && is_lvalue(operand) {
                    Ok(t)
                } else {
                    Err(Error::InvalidOperand { op: op.symbol().to_string(), ty: t.to_string(), span: *span })
                }
            }
            Expr::Member { object, member, span } => {
                let t = self.infer(object)?;
                self.member_type(&t, member, *span)
            }
            Expr::Index { array, index, span } => {
                let t = self.infer(array)?;
                let elem = t
                    .element_type()
                    .cloned()
                    .ok_or_else(|| Error::NotIndexable { ty: t.to_string(), span: *span })?;
                self.expect_type(index, Type::is_integer, "an integer index")?;
                Ok(elem)
            }
            Expr::Call { callee, args, span } => self.infer_call(callee, args, *span),
            Expr::Construct { component, args, span } => {
                let target = self
                    .env
                    .component(component)
                    .ok_or_else(|| Error::UnknownType { name: component.clone(), span: *span })?;
                let supplied: Vec<_> = args.iter().map(view_check::SuppliedArg::from_call_arg).collect();
                view_check::check_arguments(self, target, &supplied)?;
                Ok(Type::Component(component.clone()))
            }
            Expr::Ternary { cond, then_expr, else_expr, span } => {
                self.expect_type(cond, Type::is_bool, "bool")?;
                let a = self.infer(then_expr)?;
                let b = self.infer(else_expr)?;
                self.unify(&a, &b, int_literal(then_expr), int_literal(else_expr))
                    .ok_or_else(|| Error::TypeMismatch { expected: a.to_string(), got: b.to_string(), span: *span })
            }
            Expr::Array { elements, span } => {
                let mut elem: Option<(Type, Option<i128>)> = None;
                for e in elements {
                    let t = self.infer(e)?;
                    let lit = int_literal(e);
                    elem = Some(match elem {
                        None => (t, lit),
                        Some((prev, prev_lit)) => {
                            let unified = self.unify(&prev, &t, prev_lit, lit).ok_or_else(|| Error::TypeMismatch {
                                expected: prev.to_string(),
                                got: t.to_string(),
                                span: *span,
                            })?;
                            (unified, None)
                        }
                    });
                }
                Ok(Type::array(elem.map(|(t, _)| t).unwrap_or(Type::Unknown)))
            }
            Expr::ArrayRepeat { value, count, .. } => {
                let t = self.infer(value)?;
                Ok(Type::FixedArray(Box::new(t), *count))
            }
            Expr::EnumAccess { enum_name, variant, span } => {
                let def = self
                    .env
                    .enum_def(enum_name, self.component)
                    .ok_or_else(|| Error::UnknownType { name: enum_name.clone(), span: *span })?;
                if def.variants.iter().any(|v| v == variant) {
                    Ok(Type::Enum(enum_name.clone()))
                } else {
                    Err(Error::UnknownField { ty: enum_name.clone(), field: variant.clone(), span: *span })
                }
            }
        }
    }

    /// Common type of two values where integer literals adapt to the other side
    fn unify(&self, a: &Type, b: &Type, a_lit: Option<i128>, b_lit: Option<i128>) -> Option<Type> {
        if let Some(v) = b_lit {
            if literal_fits(v, a) {
                return Some(a.clone());
            }
        }
        if let Some(v) = a_lit {
            if literal_fits(v, b) {
                return Some(b.clone());
            }
        }
        common_type(a, b, self.env.schema)
    }

    fn binary_result(
        &self,
        op: BinOp,
        lt: &Type,
        rt: &Type,
        l_lit: Option<i128>,
        r_lit: Option<i128>,
        span: Span,
    ) -> Result<Type> {
        let invalid = |ty: &Type| Error::InvalidOperand { op: op.symbol().to_string(), ty: ty.to_string(), span };

        if op.is_logical() {
            if !lt.is_bool() {
                return Err(invalid(lt));
            }
            if !rt.is_bool() {
                return Err(invalid(rt));
            }
            return Ok(Type::BOOL);
        }

        if op == BinOp::Add && (*lt == Type::String || *rt == Type::String) {
            for t in [lt, rt] {
                if !is_printable(t) {
                    return Err(invalid(t));
                }
            }
            return Ok(Type::String);
        }

        if op.is_comparison() {
            let comparable = match (lt, rt) {
                (Type::String, Type::String) => true,
                (Type::Enum(a), Type::Enum(b)) => a == b && matches!(op, BinOp::Eq | BinOp::Ne),
                (Type::Primitive(_), Type::Primitive(_)) => {
                    let unified = self.unify(lt, rt, l_lit, r_lit);
                    match op {
                        BinOp::Eq | BinOp::Ne => unified.is_some(),
                        _ => unified.map(|t| t.is_numeric()).unwrap_or(false),
                    }
                }
                (Type::Handle(_), Type::Handle(_)) => {
                    matches!(op, BinOp::Eq | BinOp::Ne) && common_type(lt, rt, self.env.schema).is_some()
                }
                _ => false,
            };
            return if comparable {
                Ok(Type::BOOL)
            } else {
                Err(Error::TypeMismatch { expected: lt.to_string(), got: rt.to_string(), span })
            };
        }

        // arithmetic and bitwise
        if !lt.is_numeric() {
            return Err(invalid(lt));
        }
        if !rt.is_numeric() {
            return Err(invalid(rt));
        }
        let result = self
            .unify(lt, rt, l_lit, r_lit)
            .ok_or_else(|| Error::TypeMismatch { expected: lt.to_string(), got: rt.to_string(), span })?;
        if (op.is_bitwise() || op == BinOp::Mod) && !result.is_integer() {
            return Err(invalid(&result));
        }
        Ok(result)
    }

    /// Type of `object.member` where the object has type `ty`
    pub fn member_type(&self, ty: &Type, member: &str, span: Span) -> Result<Type> {
        let unknown = || Error::UnknownField { ty: ty.to_string(), field: member.to_string(), span };
        match ty {
            Type::Struct(name) => {
                let owner = self.component.filter(|c| c.structs.iter().any(|s| &s.name == name));
                let def = self.env.struct_def(name, self.component).ok_or_else(unknown)?;
                let field = def.fields.iter().find(|f| f.name == member).ok_or_else(unknown)?;
                self.env.normalize(&field.ty, owner, span)
            }
            Type::Component(name) => {
                let comp = self.env.component(name).ok_or_else(unknown)?;
                if let Some(v) = comp.state_var(member).filter(|v| v.is_public) {
                    return self.env.normalize(&v.ty, Some(comp), span);
                }
                if let Some(p) = comp.param(member).filter(|p| p.is_public && !p.is_callback()) {
                    return self.env.normalize(&p.ty, Some(comp), span);
                }
                Err(unknown())
            }
            _ => Err(unknown()),
        }
    }

    fn check_args(&mut self, callee: &str, params: &[Type], args: &[CallArg], span: Span) -> Result<()> {
        if params.len() != args.len() {
            return Err(Error::ArgCountMismatch {
                callee: callee.to_string(),
                expected: params.len(),
                got: args.len(),
                span,
            });
        }
        for (param, arg) in params.iter().zip(args) {
            self.check_assignable(&arg.value, param, arg.value.span())?;
        }
        Ok(())
    }

    /// Check a call of a schema method; `on_type` is set for `Type.method(..)`
    fn check_schema_call(
        &mut self,
        type_name: &str,
        method: &str,
        args: &[CallArg],
        on_type: bool,
        span: Span,
    ) -> Result<Type> {
        let entry = self.env.schema.require_method(type_name, method, span)?.clone();
        if entry.shared != on_type {
            let message = if entry.shared {
                "is shared; call it on the type"
            } else {
                "needs a value; call it on an instance"
            };
            return Err(Error::SharedMethod {
                type_name: type_name.to_string(),
                method: method.to_string(),
                message: message.to_string(),
                span,
            });
        }
        let params = entry
            .params
            .iter()
            .map(|p| self.normalize(&p.ty, span))
            .collect::<Result<Vec<_>>>()?;
        self.check_args(&format!("{}.{}", type_name, method), &params, args, span)?;
        match &entry.returns {
            Some(t) => self.normalize(t, span),
            None => Ok(Type::Void),
        }
    }

    fn infer_call(&mut self, callee: &Expr, args: &[CallArg], span: Span) -> Result<Type> {
        match callee {
            Expr::Ident { name, span: name_span } => {
                let symbol = self
                    .symbols
                    .lookup(name)
                    .cloned()
                    .ok_or_else(|| Error::UnresolvedIdentifier { name: name.clone(), span: *name_span })?;
                match (&symbol.kind, &symbol.ty) {
                    (SymbolKind::Method { ret }, Type::Callback(params)) => {
                        self.check_args(name, params, args, span)?;
                        Ok(ret.clone())
                    }
                    (SymbolKind::Callback, Type::Callback(params)) => {
                        self.check_args(name, params, args, span)?;
                        Ok(Type::Void)
                    }
                    _ => Err(Error::NotCallable { name: name.clone(), span }),
                }
            }
            Expr::Member { object, member, .. } => {
                // `Type.method(..)` on a schema type with shared methods
                if let Expr::Ident { name, .. } = object.as_ref() {
                    if self.symbols.lookup(name).is_none() && self.env.schema.lookup_type(name).is_some() {
                        return self.check_schema_call(name, member, args, true, span);
                    }
                }
                let receiver = self.infer(object)?;
                self.infer_method_call(&receiver, member, args, span)
            }
            other => Err(Error::NotCallable { name: format!("{:?}", other), span }),
        }
    }

    fn infer_method_call(&mut self, receiver: &Type, method: &str, args: &[CallArg], span: Span) -> Result<Type> {
        match receiver {
            Type::Array(elem) | Type::FixedArray(elem, _) => {
                let elem = (**elem).clone();
                match method {
                    "size" => {
                        self.check_args("size", &[], args, span)?;
                        Ok(Type::INT)
                    }
                    "push" if matches!(receiver, Type::Array(_)) => {
                        self.check_args("push", &[elem], args, span)?;
                        Ok(Type::Void)
                    }
                    "pop" | "clear" if matches!(receiver, Type::Array(_)) => {
                        self.check_args(method, &[], args, span)?;
                        Ok(Type::Void)
                    }
                    "remove" if matches!(receiver, Type::Array(_)) => {
                        self.check_args("remove", &[Type::INT], args, span)?;
                        Ok(Type::Void)
                    }
                    _ => self.check_schema_call("array", method, args, false, span),
                }
            }
            Type::String if method == "length" => {
                self.check_args("length", &[], args, span)?;
                Ok(Type::INT)
            }
            Type::String => self.check_schema_call("string", method, args, false, span),
            Type::Handle(name) => self.check_schema_call(name, method, args, false, span),
            Type::Component(name) => {
                let comp = self
                    .env
                    .component(name)
                    .ok_or_else(|| Error::UnknownType { name: name.clone(), span })?;
                let m = comp
                    .method(method)
                    .filter(|m| m.is_public)
                    .ok_or_else(|| Error::UnknownField { ty: name.clone(), field: method.to_string(), span })?;
                let params = m
                    .params
                    .iter()
                    .map(|p| self.env.normalize(&p.ty, Some(comp), span))
                    .collect::<Result<Vec<_>>>()?;
                self.check_args(&format!("{}.{}", name, method), &params, args, span)?;
                match &m.ret {
                    Some(t) => self.env.normalize(t, Some(comp), span),
                    None => Ok(Type::Void),
                }
            }
            other => Err(Error::NotCallable { name: format!("{}.{}", other, method), span }),
        }
    }

    // ==================== View ====================

    pub fn check_view(&mut self, nodes: &[ViewNode]) -> Result<()> {
        for node in nodes {
            self.check_view_node(node)?;
        }
        Ok(())
    }

    fn check_printable(&mut self, expr: &Expr) -> Result<()> {
        let t = self.infer(expr)?;
        if is_printable(&t) {
            Ok(())
        } else {
            Err(Error::TypeMismatch { expected: "a printable value".to_string(), got: t.to_string(), span: expr.span() })
        }
    }

    fn check_view_node(&mut self, node: &ViewNode) -> Result<()> {
        match node {
            ViewNode::Text { .. } => Ok(()),
            ViewNode::Expr { expr, .. } => self.check_printable(expr),
            ViewNode::Element(el) => {
                for attr in &el.attributes {
                    match attr.event_kind() {
                        Some(kind) => self.check_handler(kind, &attr.value, attr.span)?,
                        None => self.check_printable(&attr.value)?,
                    }
                }
                if let Some(target) = &el.ref_binding {
                    let ty = self
                        .symbols
                        .lookup(target)
                        .map(|s| s.ty.clone())
                        .ok_or_else(|| Error::UnresolvedIdentifier { name: target.clone(), span: el.span })?;
                    if !matches!(ty, Type::Handle(_)) {
                        return Err(Error::TypeMismatch {
                            expected: "an element handle".to_string(),
                            got: ty.to_string(),
                            span: el.span,
                        });
                    }
                }
                self.check_view(&el.children)
            }
            ViewNode::Component(inst) => view_check::check_instantiation(self, inst),
            ViewNode::If { cond, then_children, else_children, .. } => {
                self.expect_type(cond, Type::is_bool, "bool")?;
                self.symbols.enter_scope();
                let then_result = self.check_view(then_children);
                self.symbols.exit_scope();
                then_result?;
                self.symbols.enter_scope();
                let else_result = self.check_view(else_children);
                self.symbols.exit_scope();
                else_result
            }
            ViewNode::ForRange { var, start, end, children, span } => {
                self.expect_type(start, Type::is_integer, "an integer range bound")?;
                self.expect_type(end, Type::is_integer, "an integer range bound")?;
                self.symbols.enter_scope();
                let result = self
                    .define_local(var, Type::INT, SymbolKind::LoopVar, false, *span)
                    .and_then(|_| self.check_view(children));
                self.symbols.exit_scope();
                result
            }
            ViewNode::ForEach { var, iterable, key, children, span } => {
                let elem = self.iterable_element(iterable)?;
                self.symbols.enter_scope();
                let result = self
                    .define_local(var, elem, SymbolKind::LoopVar, false, *span)
                    .and_then(|_| match key {
                        Some(k) => self.key_type(k).map(|_| ()),
                        None => Ok(()),
                    })
                    .and_then(|_| self.check_view(children));
                self.symbols.exit_scope();
                result
            }
        }
    }

    /// Type of a loop key expression; keys must be primitive, string or enum
    pub fn key_type(&mut self, key: &Expr) -> Result<Type> {
        let t = self.infer(key)?;
        if t.is_key_type() {
            Ok(t)
        } else {
            Err(Error::TypeMismatch { expected: "a primitive or string key".to_string(), got: t.to_string(), span: key.span() })
        }
    }

    /// Event handlers: a method name, a call, or an inline statement expression
    fn check_handler(&mut self, kind: EventKind, handler: &Expr, span: Span) -> Result<()> {
        if let Expr::Ident { name, .. } = handler {
            let symbol = self
                .symbols
                .lookup(name)
                .cloned()
                .ok_or_else(|| Error::UnresolvedIdentifier { name: name.clone(), span })?;
            let params = match (&symbol.kind, symbol.ty) {
                (SymbolKind::Method { .. } | SymbolKind::Callback, Type::Callback(params)) => params,
                _ => return Err(Error::NotCallable { name: name.clone(), span }),
            };
            let provided = kind
                .handler_params()
                .iter()
                .map(|t| self.normalize(&TypeExpr::named(t), span))
                .collect::<Result<Vec<_>>>()?;
            // a handler may ignore the event payload
            if params.is_empty() || params == provided {
                return Ok(());
            }
            let render = |ts: &[Type]| ts.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(", ");
            return Err(Error::CallbackSignature {
                component: self.component.map(|c| c.name.clone()).unwrap_or_default(),
                param: format!("on{}", kind.name()),
                expected: render(&provided),
                got: render(&params),
                span,
            });
        }
        self.infer(handler).map(|_| ())
    }
}

/// Expressions that denote a storage location
pub fn is_lvalue(expr: &Expr) -> bool {
    match expr {
        Expr::Ident { .. } => true,
        Expr::Member { object, .. } | Expr::Index { array: object, .. } => is_lvalue(object),
        _ => false,
    }
}

/// Type check a program against the schema
pub fn check_program<'a>(program: &'a Program, env: &'a TypeEnv<'a>) -> Result<()> {
    let mut checker = TypeChecker::new(env);
    checker.check_program(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use crate::types::schema::{MethodEntry, TypeEntry};
    use crate::types::TypeSchema;
    use crate::utils::ErrorKind;

    fn check_with(comp: Component, schema: &TypeSchema) -> Result<()> {
        let program = program(vec![comp]);
        let env = TypeEnv::new(&program, schema);
        check_program(&program, &env)
    }

    fn check(comp: Component) -> Result<()> {
        check_with(comp, &TypeSchema::empty())
    }

    #[test]
    fn test_counter_checks() {
        assert!(check(counter()).is_ok());
    }

    #[test]
    fn test_initializer_mismatch() {
        let mut comp = component("App");
        comp.state.push(state("name", "string", false, Some(int(3))));
        let err = check(comp).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeError);
        assert!(matches!(err, Error::TypeMismatch { .. }));
    }

    #[test]
    fn test_literal_ranges() {
        let mut comp = component("App");
        comp.state.push(state("small", "uint8", false, Some(int(255))));
        comp.state.push(state("ratio", "float32", false, Some(float(0.5))));
        assert!(check(comp).is_ok());

        let mut comp = component("App");
        comp.state.push(state("small", "uint8", false, Some(int(256))));
        assert!(check(comp).is_err());
    }

    #[test]
    fn test_no_narrowing_assignment() {
        let mut comp = component("App");
        comp.state.push(state("big", "long", false, Some(int(1))));
        comp.state.push(state("small", "int", true, Some(int(0))));
        comp.methods.push(method("f", &[], vec![assign("small", ident("big"))]));
        assert!(matches!(check(comp), Err(Error::TypeMismatch { .. })));

        let mut comp = component("App");
        comp.state.push(state("big", "long", true, Some(int(1))));
        comp.state.push(state("small", "int", false, Some(int(0))));
        comp.methods.push(method("f", &[], vec![assign("big", ident("small"))]));
        assert!(check(comp).is_ok());
    }

    #[test]
    fn test_undeclared_identifier() {
        let mut comp = component("App");
        comp.view.push(element("p", vec![], vec![text_expr(ident("missing"))]));
        let err = check(comp).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnresolvedIdentifierError);
    }

    #[test]
    fn test_interpolation_parts_are_checked() {
        let mut comp = component("App");
        comp.state.push(state("count", "int", false, Some(int(1))));
        comp.view.push(text_expr(interp(vec![
            StrPart::Text("n = ".into()),
            StrPart::Expr(ident("count")),
        ])));
        assert!(check(comp.clone()).is_ok());

        comp.view.push(text_expr(interp(vec![StrPart::Expr(ident("nope"))])));
        assert!(check(comp).is_err());
    }

    #[test]
    fn test_ternary_common_type() {
        let mut comp = component("App");
        comp.state.push(state("flag", "bool", false, Some(boolean(true))));
        comp.state.push(state("a", "int", false, Some(int(1))));
        comp.state.push(state("b", "long", false, Some(int(2))));
        comp.state.push(state("c", "long", false, Some(ternary(ident("flag"), ident("a"), ident("b")))));
        assert!(check(comp.clone()).is_ok());

        comp.state.push(state("d", "int", false, Some(ternary(ident("flag"), ident("a"), string("x")))));
        assert!(check(comp).is_err());
    }

    #[test]
    fn test_arity_mismatch() {
        let mut comp = component("App");
        comp.methods.push(method("add", &[("x", "int")], vec![]));
        comp.methods.push(method("f", &[], vec![expr_stmt(call(ident("add"), vec![]))]));
        assert!(matches!(check(comp), Err(Error::ArgCountMismatch { expected: 1, got: 0, .. })));
    }

    #[test]
    fn test_array_builtins() {
        let mut comp = component("App");
        comp.state.push(state("items", "int[]", true, Some(array(vec![]))));
        comp.methods.push(method(
            "f",
            &[],
            vec![
                expr_stmt(call(member(ident("items"), "push"), vec![int(3)])),
                var_decl("n", "int", false, call(member(ident("items"), "size"), vec![])),
            ],
        ));
        assert!(check(comp.clone()).is_ok());

        comp.methods.push(method("g", &[], vec![expr_stmt(call(member(ident("items"), "push"), vec![string("x")]))]));
        assert!(check(comp).is_err());
    }

    #[test]
    fn test_schema_method_lookup() {
        let schema = TypeSchema::from_entries(vec![TypeEntry::handle("Canvas")
            .with_method(MethodEntry::new("clear", &[("color", "string")], None).unwrap())]);

        let mut comp = component("App");
        comp.state.push(state("canvas", "Canvas", true, None));
        comp.methods.push(method("f", &[], vec![expr_stmt(call(member(ident("canvas"), "clear"), vec![string("#fff")]))]));
        assert!(check_with(comp.clone(), &schema).is_ok());

        comp.methods.push(method("g", &[], vec![expr_stmt(call(member(ident("canvas"), "draw"), vec![]))]));
        let err = check_with(comp, &schema).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaLookupError);
    }

    #[test]
    fn test_shared_methods_are_called_on_the_type() {
        let schema = TypeSchema::from_entries(vec![TypeEntry::handle("Canvas")
            .with_method(MethodEntry::new("create", &[], Some("Canvas")).unwrap().shared())
            .with_method(MethodEntry::new("clear", &[], None).unwrap())]);

        let mut comp = component("App");
        comp.state.push(state("canvas", "Canvas", true, None));
        comp.methods.push(method("f", &[], vec![assign("canvas", call(member(ident("Canvas"), "create"), vec![]))]));
        comp.methods.push(method("g", &[], vec![expr_stmt(call(member(ident("canvas"), "clear"), vec![]))]));
        assert!(check_with(comp.clone(), &schema).is_ok());

        let mut on_value = comp.clone();
        on_value.methods.push(method("h", &[], vec![expr_stmt(call(member(ident("canvas"), "create"), vec![]))]));
        assert!(matches!(check_with(on_value, &schema), Err(Error::SharedMethod { .. })));

        comp.methods.push(method("h", &[], vec![expr_stmt(call(member(ident("Canvas"), "clear"), vec![]))]));
        assert!(matches!(check_with(comp, &schema), Err(Error::SharedMethod { .. })));
    }

    #[test]
    fn test_parameter_errors_point_at_the_parameter() {
        let mut m = method("f", &[("x", "Missing")], vec![]);
        m.span = Span::line(4);
        m.params[0].span = Span::line(6);
        let mut comp = component("App");
        comp.methods.push(m);
        let err = check(comp).unwrap_err();
        assert!(matches!(err, Error::UnknownType { .. }));
        assert_eq!(err.line(), Some(6));
    }

    #[test]
    fn test_enum_variants() {
        let mut comp = component("Light");
        comp.enums.push(EnumDef { name: "Color".into(), variants: vec!["Red".into(), "Green".into()], span: sp() });
        comp.state.push(state("color", "Color", true, Some(enum_access("Color", "Red"))));
        comp.methods.push(method("go", &[], vec![assign("color", enum_access("Color", "Green"))]));
        assert!(check(comp.clone()).is_ok());

        comp.methods.push(method("warn", &[], vec![assign("color", enum_access("Color", "Amber"))]));
        assert!(matches!(check(comp), Err(Error::UnknownField { .. })));
    }

    #[test]
    fn test_lifecycle_signatures() {
        let with = |m: Method| {
            let mut comp = component("App");
            comp.methods.push(m);
            check(comp)
        };
        assert!(with(method("tick", &[], vec![])).is_ok());
        assert!(with(method("tick", &[("dt", "float")], vec![])).is_ok());
        assert!(with(method("mount", &[], vec![])).is_ok());
        assert!(matches!(with(method("tick", &[("dt", "int")], vec![])), Err(Error::HookSignature { .. })));
        assert!(matches!(
            with(method("tick", &[("dt", "float"), ("n", "int")], vec![])),
            Err(Error::HookSignature { .. })
        ));
        assert!(matches!(with(method("mount", &[("x", "int")], vec![])), Err(Error::HookSignature { .. })));
    }

    #[test]
    fn test_struct_fields_and_nocopy() {
        let mut comp = component("App");
        comp.structs.push(struct_def("Todo", &[("title", "string"), ("done", "bool")]));
        comp.state.push(state("todos", "Todo[]", true, Some(array(vec![]))));
        comp.view.push(for_each(
            "t",
            ident("todos"),
            Some(member(ident("t"), "title")),
            vec![text_expr(member(ident("t"), "title"))],
        ));
        assert!(check(comp.clone()).is_ok());

        comp.view.push(for_each("t", ident("todos"), None, vec![text_expr(member(ident("t"), "missing"))]));
        assert!(matches!(check(comp), Err(Error::UnknownField { .. })));

        let schema = TypeSchema::from_json(r#"{ "types": [ { "name": "Canvas", "nocopy": true } ] }"#).unwrap();
        let mut comp = component("App");
        comp.structs.push(struct_def("Layer", &[("surface", "Canvas")]));
        assert!(matches!(check_with(comp, &schema), Err(Error::NocopyField { .. })));
    }

    #[test]
    fn test_loop_keys_must_be_primitive() {
        let mut comp = component("App");
        comp.structs.push(struct_def("Todo", &[("title", "string")]));
        comp.state.push(state("todos", "Todo[]", false, Some(array(vec![]))));
        comp.view.push(for_each("t", ident("todos"), Some(ident("t")), vec![]));
        assert!(matches!(check(comp), Err(Error::TypeMismatch { .. })));
    }

    #[test]
    fn test_view_conditions_are_bool() {
        let mut comp = component("App");
        comp.state.push(state("count", "int", false, Some(int(0))));
        comp.view.push(view_if(ident("count"), vec![text("x")], vec![]));
        assert!(check(comp).is_err());
    }

    #[test]
    fn test_event_handler_signatures() {
        let mut comp = component("App");
        comp.methods.push(method("typed", &[("value", "string")], vec![]));
        comp.view.push(element("input", vec![("oninput", ident("typed"))], vec![]));
        assert!(check(comp.clone()).is_ok());

        comp.view.push(element("button", vec![("onclick", ident("typed"))], vec![]));
        assert!(matches!(check(comp), Err(Error::CallbackSignature { .. })));
    }

    #[test]
    fn test_duplicate_state() {
        let mut comp = component("App");
        comp.state.push(state("x", "int", false, None));
        comp.state.push(state("x", "int", false, None));
        assert!(matches!(check(comp), Err(Error::DuplicateDefinition { .. })));
    }
}
