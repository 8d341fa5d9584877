//! Mutability enforcement
//!
//! A variable may be assigned, compound-assigned, incremented, index- or
//! member-assigned, or receive a mutating method call only if it was declared
//! `mut`. The first violation aborts with `Error::Mutability`.

use std::collections::HashMap;

use crate::frontend::ast::*;
use crate::frontend::semantic::is_mutating_call;
use crate::middle::deps::root_var;
use crate::types::{Type, TypeEnv};
use crate::utils::{Error, Result, Span};

#[derive(Debug, Clone)]
struct Binding {
    mutable: bool,
    ty: Option<Type>,
}

/// Mutability checker for one component
struct MutabilityChecker<'a> {
    env: &'a TypeEnv<'a>,
    component: &'a Component,
    scopes: Vec<HashMap<String, Binding>>,
}

impl<'a> MutabilityChecker<'a> {
    fn new(env: &'a TypeEnv<'a>, component: &'a Component) -> Result<Self> {
        let mut top = HashMap::new();
        for p in &component.params {
            let ty = match p.callback {
                Some(_) => None,
                None => Some(env.normalize(&p.ty, Some(component), p.span)?),
            };
            top.insert(p.name.clone(), Binding { mutable: p.mutable, ty });
        }
        for v in &component.state {
            let ty = env.normalize(&v.ty, Some(component), v.span)?;
            top.insert(v.name.clone(), Binding { mutable: v.mutable, ty: Some(ty) });
        }
        for m in &component.methods {
            top.insert(m.name.clone(), Binding { mutable: false, ty: None });
        }
        Ok(Self { env, component, scopes: vec![top] })
    }

    fn lookup(&self, name: &str) -> Option<&Binding> {
        self.scopes.iter().rev().find_map(|s| s.get(name))
    }

    fn bind(&mut self, name: &str, mutable: bool, ty: Option<Type>) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), Binding { mutable, ty });
        }
    }

    fn with_scope<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.scopes.push(HashMap::new());
        let result = f(self);
        self.scopes.pop();
        result
    }

    /// Fail unless the variable behind `name` may be written
    fn require_mut(&self, name: &str, span: Span) -> Result<()> {
        match self.lookup(name) {
            Some(b) if b.mutable => Ok(()),
            Some(_) => Err(Error::Mutability { name: name.to_string(), span }),
            // undeclared names are reported by the type checker
            None => Ok(()),
        }
    }

    fn require_mut_lvalue(&self, target: &Expr, span: Span) -> Result<()> {
        match root_var(target) {
            Some(root) => self.require_mut(root, pick(target.span(), span)),
            None => Ok(()),
        }
    }

    /// Static type of the root variable of a receiver, when known
    fn receiver_type(&self, receiver: &Expr) -> Option<Type> {
        match receiver {
            Expr::Ident { name, .. } => self.lookup(name).and_then(|b| b.ty.clone()),
            Expr::Member { object, member, .. } => {
                let owner = self.receiver_type(object)?;
                self.member_type(&owner, member)
            }
            Expr::Index { array, .. } => self.receiver_type(array)?.element_type().cloned(),
            _ => None,
        }
    }

    fn member_type(&self, owner: &Type, member: &str) -> Option<Type> {
        match owner {
            Type::Struct(name) => {
                let def = self.env.struct_def(name, Some(self.component))?;
                let field = def.fields.iter().find(|f| f.name == member)?;
                self.env.normalize(&field.ty, Some(self.component), def.span).ok()
            }
            Type::Component(name) => {
                let comp = self.env.component(name)?;
                let v = comp.state_var(member)?;
                self.env.normalize(&v.ty, Some(comp), v.span).ok()
            }
            _ => None,
        }
    }

    // ==================== Statements ====================

    fn check_block(&mut self, stmts: &[Stmt]) -> Result<()> {
        for stmt in stmts {
            self.check_stmt(stmt)?;
        }
        Ok(())
    }

    fn check_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::VarDecl { name, ty, mutable, init, span } => {
                if let Some(init) = init {
                    self.check_expr(init, *span)?;
                }
                let ty = ty
                    .as_ref()
                    .and_then(|t| self.env.normalize(t, Some(self.component), *span).ok());
                self.bind(name, *mutable, ty);
                Ok(())
            }
            Stmt::Assign { target, value, span, .. } => {
                self.check_expr(value, *span)?;
                self.require_mut(target, *span)
            }
            Stmt::IndexAssign { array, index, value, span, .. } => {
                self.check_expr(index, *span)?;
                self.check_expr(value, *span)?;
                self.require_mut_lvalue(array, *span)
            }
            Stmt::MemberAssign { object, value, span, .. } => {
                self.check_expr(value, *span)?;
                self.require_mut_lvalue(object, *span)
            }
            Stmt::Expr { expr, span } => self.check_expr(expr, *span),
            Stmt::Return { value, span } => match value {
                Some(v) => self.check_expr(v, *span),
                None => Ok(()),
            },
            Stmt::If { cond, then_branch, else_branch, span } => {
                self.check_expr(cond, *span)?;
                self.with_scope(|c| c.check_block(then_branch))?;
                self.with_scope(|c| c.check_block(else_branch))
            }
            Stmt::ForRange { var, start, end, body, span } => {
                self.check_expr(start, *span)?;
                self.check_expr(end, *span)?;
                self.with_scope(|c| {
                    c.bind(var, false, Some(Type::INT));
                    c.check_block(body)
                })
            }
            Stmt::ForEach { var, iterable, body, span } => {
                self.check_expr(iterable, *span)?;
                let (mutable, elem) = self.item_binding(iterable);
                self.with_scope(|c| {
                    c.bind(var, mutable, elem);
                    c.check_block(body)
                })
            }
            Stmt::Block { stmts, .. } => self.with_scope(|c| c.check_block(stmts)),
        }
    }

    /// A loop item aliases an element of the iterable, so it is writable
    /// exactly when the iterable is
    fn item_binding(&self, iterable: &Expr) -> (bool, Option<Type>) {
        let mutable = root_var(iterable)
            .and_then(|r| self.lookup(r))
            .map(|b| b.mutable)
            .unwrap_or(false);
        let elem = self.receiver_type(iterable).and_then(|t| t.element_type().cloned());
        (mutable, elem)
    }

    // ==================== Expressions ====================

    fn check_expr(&mut self, expr: &Expr, stmt_span: Span) -> Result<()> {
        match expr {
            Expr::Postfix { operand, .. } => self.require_mut_lvalue(operand, pick(expr.span(), stmt_span)),
            Expr::Unary { op, operand, .. } => {
                if op.is_increment() {
                    self.require_mut_lvalue(operand, pick(expr.span(), stmt_span))
                } else {
                    self.check_expr(operand, stmt_span)
                }
            }
            Expr::Call { callee, args, .. } => {
                if let Expr::Member { object, member, .. } = callee.as_ref() {
                    if let Some(ty) = self.receiver_type(object) {
                        if is_mutating_call(self.env, &ty, member) {
                            self.require_mut_lvalue(object, pick(expr.span(), stmt_span))?;
                        }
                    }
                    self.check_expr(object, stmt_span)?;
                }
                for arg in args {
                    self.check_expr(&arg.value, stmt_span)?;
                }
                Ok(())
            }
            Expr::Construct { component, args, .. } => {
                for (position, arg) in args.iter().enumerate() {
                    let param = match &arg.name {
                        Some(n) => self.env.component(component).and_then(|c| c.param(n)),
                        None => self.env.component(component).and_then(|c| c.params.get(position)),
                    };
                    if arg.is_reference && param.map(|p| p.mutable).unwrap_or(false) {
                        self.require_mut_lvalue(&arg.value, pick(arg.value.span(), stmt_span))?;
                    }
                    self.check_expr(&arg.value, stmt_span)?;
                }
                Ok(())
            }
            Expr::Binary { left, right, .. } => {
                self.check_expr(left, stmt_span)?;
                self.check_expr(right, stmt_span)
            }
            Expr::Member { object, .. } => self.check_expr(object, stmt_span),
            Expr::Index { array, index, .. } => {
                self.check_expr(array, stmt_span)?;
                self.check_expr(index, stmt_span)
            }
            Expr::Ternary { cond, then_expr, else_expr, .. } => {
                self.check_expr(cond, stmt_span)?;
                self.check_expr(then_expr, stmt_span)?;
                self.check_expr(else_expr, stmt_span)
            }
            Expr::Str { parts, .. } => {
                for part in parts {
                    if let StrPart::Expr(e) = part {
                        self.check_expr(e, stmt_span)?;
                    }
                }
                Ok(())
            }
            Expr::Array { elements, .. } => {
                for e in elements {
                    self.check_expr(e, stmt_span)?;
                }
                Ok(())
            }
            Expr::ArrayRepeat { value, .. } => self.check_expr(value, stmt_span),
            Expr::Int { .. }
            | Expr::Float { .. }
            | Expr::Bool { .. }
            | Expr::Ident { .. }
            | Expr::EnumAccess { .. } => Ok(()),
        }
    }

    // ==================== View ====================

    fn check_view(&mut self, nodes: &[ViewNode]) -> Result<()> {
        for node in nodes {
            self.check_view_node(node)?;
        }
        Ok(())
    }

    fn check_view_node(&mut self, node: &ViewNode) -> Result<()> {
        match node {
            ViewNode::Text { .. } => Ok(()),
            ViewNode::Expr { expr, span } => self.check_expr(expr, *span),
            ViewNode::Element(el) => {
                for attr in &el.attributes {
                    self.check_expr(&attr.value, attr.span)?;
                }
                if let Some(target) = &el.ref_binding {
                    self.require_mut(target, el.span)?;
                }
                self.check_view(&el.children)
            }
            ViewNode::Component(inst) => {
                let target = self.env.component(&inst.component);
                for prop in &inst.props {
                    let param = target.and_then(|c| c.param(&prop.name));
                    if prop.is_reference && param.map(|p| p.mutable).unwrap_or(false) {
                        self.require_mut_lvalue(&prop.value, prop.span)?;
                    }
                    self.check_expr(&prop.value, prop.span)?;
                }
                Ok(())
            }
            ViewNode::If { cond, then_children, else_children, span } => {
                self.check_expr(cond, *span)?;
                self.with_scope(|c| c.check_view(then_children))?;
                self.with_scope(|c| c.check_view(else_children))
            }
            ViewNode::ForRange { var, start, end, children, span } => {
                self.check_expr(start, *span)?;
                self.check_expr(end, *span)?;
                self.with_scope(|c| {
                    c.bind(var, false, Some(Type::INT));
                    c.check_view(children)
                })
            }
            ViewNode::ForEach { var, iterable, key, children, span } => {
                self.check_expr(iterable, *span)?;
                let (mutable, elem) = self.item_binding(iterable);
                self.with_scope(|c| {
                    c.bind(var, mutable, elem);
                    if let Some(key) = key {
                        c.check_expr(key, *span)?;
                    }
                    c.check_view(children)
                })
            }
        }
    }

    fn check_component(&mut self) -> Result<()> {
        let component = self.component;
        for m in &component.methods {
            self.with_scope(|c| {
                for p in &m.params {
                    let ty = c.env.normalize(&p.ty, Some(component), m.span).ok();
                    c.bind(&p.name, p.mutable, ty);
                }
                c.check_block(&m.body)
            })?;
        }
        self.check_view(&component.view)
    }
}

/// Prefer the node's own position over the enclosing statement's
fn pick(own: Span, fallback: Span) -> Span {
    if own.is_known() {
        own
    } else {
        fallback
    }
}

/// Check every method body and view of every component
pub fn check_program(program: &Program, env: &TypeEnv<'_>) -> Result<()> {
    for comp in &program.components {
        log::debug!("checking mutability of {}", comp.name);
        MutabilityChecker::new(env, comp)?.check_component()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use crate::types::TypeSchema;
    use crate::utils::ErrorKind;

    fn check(comp: Component) -> Result<()> {
        let program = program(vec![comp]);
        let schema = TypeSchema::empty();
        let env = TypeEnv::new(&program, &schema);
        check_program(&program, &env)
    }

    #[test]
    fn test_assignment_to_immutable_state() {
        let mut comp = component("App");
        comp.state.push(state("x", "int", false, Some(int(0))));
        comp.methods.push(method("set", &[], vec![assign_at("x", int(1), 7)]));

        let err = check(comp).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MutabilityError);
        assert_eq!(err.line(), Some(7));
        match err {
            Error::Mutability { name, .. } => assert_eq!(name, "x"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_mut_state_is_writable() {
        assert!(check(counter()).is_ok());
    }

    #[test]
    fn test_increment_of_immutable() {
        let mut comp = counter();
        comp.state[0].mutable = false;
        assert!(matches!(check(comp), Err(Error::Mutability { .. })));
    }

    #[test]
    fn test_index_and_mutating_calls() {
        let mut comp = component("App");
        comp.state.push(state("items", "int[]", false, Some(array(vec![]))));
        comp.methods.push(method("peek", &[], vec![expr_stmt(call(member(ident("items"), "size"), vec![]))]));
        assert!(check(comp.clone()).is_ok());

        comp.methods.push(method("add", &[], vec![expr_stmt(call(member(ident("items"), "push"), vec![int(1)]))]));
        assert!(matches!(check(comp.clone()), Err(Error::Mutability { .. })));

        let mut comp2 = component("App");
        comp2.state.push(state("items", "int[]", false, Some(array(vec![]))));
        comp2.methods.push(method("set", &[], vec![index_assign(ident("items"), int(0), int(1))]));
        assert!(matches!(check(comp2), Err(Error::Mutability { .. })));
    }

    #[test]
    fn test_locals_and_params() {
        let mut comp = component("App");
        comp.methods.push(method(
            "f",
            &[("n", "int")],
            vec![
                var_decl("total", "int", true, int(0)),
                compound_assign("total", BinOp::Add, ident("n")),
            ],
        ));
        assert!(check(comp.clone()).is_ok());

        comp.methods.push(method("g", &[("n", "int")], vec![assign("n", int(2))]));
        assert!(matches!(check(comp), Err(Error::Mutability { .. })));
    }

    #[test]
    fn test_loop_items_follow_iterable() {
        let mut comp = component("App");
        comp.structs.push(struct_def("Todo", &[("done", "bool")]));
        comp.state.push(state("todos", "Todo[]", false, Some(array(vec![]))));
        comp.methods.push(method(
            "finish",
            &[],
            vec![Stmt::ForEach {
                var: "t".into(),
                iterable: ident("todos"),
                body: vec![member_assign(ident("t"), "done", boolean(true))],
                span: sp(),
            }],
        ));
        assert!(matches!(check(comp.clone()), Err(Error::Mutability { .. })));

        comp.state[0].mutable = true;
        assert!(check(comp).is_ok());
    }

    #[test]
    fn test_inline_event_handler_writes() {
        let mut comp = component("App");
        comp.state.push(state("count", "int", false, Some(int(0))));
        comp.view.push(element("button", vec![("onclick", postfix_inc(ident("count")))], vec![]));
        assert!(matches!(check(comp), Err(Error::Mutability { .. })));
    }
}
