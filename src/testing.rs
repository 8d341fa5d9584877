//! Builders for ASTs used across unit tests

use std::collections::BTreeSet;

use crate::frontend::ast::*;
use crate::utils::Span;

pub fn sp() -> Span {
    Span::dummy()
}

pub fn names_set(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|n| n.to_string()).collect()
}

pub fn ty(s: &str) -> TypeExpr {
    s.parse().expect("valid type in test")
}

// ==================== Expressions ====================

pub fn int(value: i64) -> Expr {
    Expr::Int { value, span: sp() }
}

pub fn float(value: f64) -> Expr {
    Expr::Float { value, span: sp() }
}

pub fn boolean(value: bool) -> Expr {
    Expr::Bool { value, span: sp() }
}

pub fn string(text: &str) -> Expr {
    Expr::Str { parts: vec![StrPart::Text(text.to_string())], span: sp() }
}

pub fn interp(parts: Vec<StrPart>) -> Expr {
    Expr::Str { parts, span: sp() }
}

pub fn ident(name: &str) -> Expr {
    Expr::Ident { name: name.to_string(), span: sp() }
}

pub fn binary(op: BinOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary { op, left: Box::new(left), right: Box::new(right), span: sp() }
}

pub fn add(left: Expr, right: Expr) -> Expr {
    binary(BinOp::Add, left, right)
}

pub fn not(operand: Expr) -> Expr {
    Expr::Unary { op: UnOp::Not, operand: Box::new(operand), span: sp() }
}

pub fn postfix_inc(operand: Expr) -> Expr {
    Expr::Postfix { op: PostfixOp::Inc, operand: Box::new(operand), span: sp() }
}

pub fn member(object: Expr, name: &str) -> Expr {
    Expr::Member { object: Box::new(object), member: name.to_string(), span: sp() }
}

pub fn index(array: Expr, idx: Expr) -> Expr {
    Expr::Index { array: Box::new(array), index: Box::new(idx), span: sp() }
}

pub fn call(callee: Expr, args: Vec<Expr>) -> Expr {
    Expr::Call {
        callee: Box::new(callee),
        args: args.into_iter().map(CallArg::positional).collect(),
        span: sp(),
    }
}

pub fn ternary(cond: Expr, then_expr: Expr, else_expr: Expr) -> Expr {
    Expr::Ternary {
        cond: Box::new(cond),
        then_expr: Box::new(then_expr),
        else_expr: Box::new(else_expr),
        span: sp(),
    }
}

pub fn array(elements: Vec<Expr>) -> Expr {
    Expr::Array { elements, span: sp() }
}

pub fn enum_access(enum_name: &str, variant: &str) -> Expr {
    Expr::EnumAccess { enum_name: enum_name.to_string(), variant: variant.to_string(), span: sp() }
}

// ==================== Statements ====================

pub fn expr_stmt(expr: Expr) -> Stmt {
    Stmt::Expr { expr, span: sp() }
}

pub fn assign(target: &str, value: Expr) -> Stmt {
    Stmt::Assign { target: target.to_string(), value, op: None, span: sp() }
}

pub fn assign_at(target: &str, value: Expr, line: u32) -> Stmt {
    Stmt::Assign { target: target.to_string(), value, op: None, span: Span::line(line) }
}

pub fn compound_assign(target: &str, op: BinOp, value: Expr) -> Stmt {
    Stmt::Assign { target: target.to_string(), value, op: Some(op), span: sp() }
}

pub fn member_assign(object: Expr, name: &str, value: Expr) -> Stmt {
    Stmt::MemberAssign { object, member: name.to_string(), value, op: None, span: sp() }
}

pub fn index_assign(array: Expr, idx: Expr, value: Expr) -> Stmt {
    Stmt::IndexAssign { array, index: idx, value, op: None, span: sp() }
}

pub fn var_decl(name: &str, type_name: &str, mutable: bool, init: Expr) -> Stmt {
    Stmt::VarDecl {
        name: name.to_string(),
        ty: Some(ty(type_name)),
        mutable,
        init: Some(init),
        span: sp(),
    }
}

// ==================== View ====================

pub fn text(s: &str) -> ViewNode {
    ViewNode::Text { text: s.to_string(), span: sp() }
}

pub fn text_expr(expr: Expr) -> ViewNode {
    ViewNode::Expr { expr, span: sp() }
}

pub fn element(tag: &str, attributes: Vec<(&str, Expr)>, children: Vec<ViewNode>) -> ViewNode {
    ViewNode::Element(HtmlElement {
        tag: tag.to_string(),
        attributes: attributes
            .into_iter()
            .map(|(name, value)| Attribute { name: name.to_string(), value, span: sp() })
            .collect(),
        children,
        ref_binding: None,
        span: sp(),
    })
}

pub fn child(component: &str, props: Vec<(&str, Expr)>) -> ViewNode {
    ViewNode::Component(ComponentInstantiation {
        component: component.to_string(),
        props: props
            .into_iter()
            .map(|(name, value)| PropArg { name: name.to_string(), value, is_reference: false, span: sp() })
            .collect(),
        span: sp(),
    })
}

pub fn child_ref(component: &str, prop: &str, value: Expr) -> ViewNode {
    ViewNode::Component(ComponentInstantiation {
        component: component.to_string(),
        props: vec![PropArg { name: prop.to_string(), value, is_reference: true, span: sp() }],
        span: sp(),
    })
}

pub fn view_if(cond: Expr, then_children: Vec<ViewNode>, else_children: Vec<ViewNode>) -> ViewNode {
    ViewNode::If { cond, then_children, else_children, span: sp() }
}

pub fn for_range(var: &str, start: Expr, end: Expr, children: Vec<ViewNode>) -> ViewNode {
    ViewNode::ForRange { var: var.to_string(), start, end, children, span: sp() }
}

pub fn for_each(var: &str, iterable: Expr, key: Option<Expr>, children: Vec<ViewNode>) -> ViewNode {
    ViewNode::ForEach { var: var.to_string(), iterable, key, children, span: sp() }
}

// ==================== Components ====================

pub fn component(name: &str) -> Component {
    Component {
        name: name.to_string(),
        is_public: false,
        params: Vec::new(),
        state: Vec::new(),
        methods: Vec::new(),
        structs: Vec::new(),
        enums: Vec::new(),
        view: Vec::new(),
        span: sp(),
    }
}

pub fn state(name: &str, type_name: &str, mutable: bool, init: Option<Expr>) -> StateVar {
    StateVar {
        name: name.to_string(),
        ty: ty(type_name),
        mutable,
        is_public: false,
        init,
        span: sp(),
    }
}

pub fn param(name: &str, type_name: &str) -> Param {
    Param {
        name: name.to_string(),
        ty: ty(type_name),
        mutable: false,
        is_public: true,
        is_reference: false,
        callback: None,
        default: None,
        span: sp(),
    }
}

pub fn callback_param(name: &str, arg_types: &[&str]) -> Param {
    Param {
        callback: Some(arg_types.iter().map(|t| ty(t)).collect()),
        ..param(name, "void")
    }
}

pub fn method(name: &str, params: &[(&str, &str)], body: Vec<Stmt>) -> Method {
    Method {
        name: name.to_string(),
        params: params
            .iter()
            .map(|(n, t)| MethodParam { name: n.to_string(), ty: ty(t), mutable: false, span: sp() })
            .collect(),
        ret: None,
        body,
        is_public: false,
        span: sp(),
    }
}

pub fn struct_def(name: &str, fields: &[(&str, &str)]) -> StructDef {
    StructDef {
        name: name.to_string(),
        fields: fields.iter().map(|(n, t)| Field { name: n.to_string(), ty: ty(t) }).collect(),
        span: sp(),
    }
}

pub fn program(components: Vec<Component>) -> Program {
    Program { components, ..Default::default() }
}

/// `mut int count = 0;` rendered as `<p>{count}</p>` with an `inc` method
pub fn counter() -> Component {
    let mut comp = component("Counter");
    comp.state.push(state("count", "int", true, Some(int(0))));
    comp.methods.push(method("inc", &[], vec![expr_stmt(postfix_inc(ident("count")))]));
    comp.view.push(element(
        "div",
        vec![],
        vec![
            element("p", vec![], vec![text_expr(ident("count"))]),
            element("button", vec![("onclick", ident("inc"))], vec![text("+")]),
        ],
    ));
    comp
}
