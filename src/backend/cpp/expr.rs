//! C++ rendering of types, expressions and method bodies

use std::fmt::{self, Write};

use crate::frontend::ast::*;
use crate::types::{PrimitiveType, Type, TypeEnv};
use crate::utils::Result;

/// C++ spelling of a canonical type
pub fn cpp_type(ty: &Type) -> String {
    match ty {
        Type::Primitive(p) => primitive(*p).to_string(),
        Type::String => "std::string".to_string(),
        Type::Void => "void".to_string(),
        Type::Array(elem) => format!("std::vector<{}>", cpp_type(elem)),
        Type::FixedArray(elem, n) => format!("std::array<{}, {}>", cpp_type(elem), n),
        Type::Handle(name) => format!("webcc::{}", name),
        Type::Struct(name) | Type::Enum(name) | Type::Component(name) => name.clone(),
        Type::Callback(params) => {
            let params: Vec<String> = params.iter().map(cpp_type).collect();
            format!("std::function<void({})>", params.join(", "))
        }
        Type::Unknown => "int32_t".to_string(),
    }
}

fn primitive(p: PrimitiveType) -> &'static str {
    match p {
        PrimitiveType::Int8 => "int8_t",
        PrimitiveType::Int16 => "int16_t",
        PrimitiveType::Int32 => "int32_t",
        PrimitiveType::Int64 => "int64_t",
        PrimitiveType::UInt8 => "uint8_t",
        PrimitiveType::UInt16 => "uint16_t",
        PrimitiveType::UInt32 => "uint32_t",
        PrimitiveType::UInt64 => "uint64_t",
        PrimitiveType::Float32 => "float",
        PrimitiveType::Float64 => "double",
        PrimitiveType::Bool => "bool",
    }
}

/// Quoted C++ string literal
pub fn string_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Array built-ins, rendered through the prelude's overloads so that
/// handle methods of the same name still resolve to the handle
const BUILTIN_CALLS: [&str; 6] = ["size", "length", "push", "pop", "clear", "remove"];

/// Renders expressions of one component in one emission context.
///
/// Loop variables map to whatever reaches the current item from here:
/// `_it0._value` inside item functions, `_c0->_value` inside handler
/// closures.
pub struct ExprRenderer<'r> {
    env: &'r TypeEnv<'r>,
    comp: &'r Component,
    loop_vars: Vec<(String, String)>,
    locals: Vec<String>,
}

impl<'r> ExprRenderer<'r> {
    pub fn new(env: &'r TypeEnv<'r>, comp: &'r Component) -> Self {
        Self { env, comp, loop_vars: Vec::new(), locals: Vec::new() }
    }

    pub fn with_loop_vars(mut self, vars: Vec<(String, String)>) -> Self {
        self.loop_vars = vars;
        self
    }

    pub fn with_locals(mut self, locals: impl IntoIterator<Item = String>) -> Self {
        self.locals.extend(locals);
        self
    }

    pub fn expr(&self, expr: &Expr) -> String {
        match expr {
            Expr::Int { value, .. } => {
                if i32::try_from(*value).is_ok() {
                    value.to_string()
                } else {
                    format!("{}LL", value)
                }
            }
            Expr::Float { value, .. } => format!("{:?}", value),
            Expr::Bool { value, .. } => value.to_string(),
            Expr::Str { parts, .. } => self.string(parts),
            Expr::Ident { name, .. } => self.ident(name),
            Expr::Binary { op: BinOp::Add, left, right, .. } => {
                format!("viewc::add({}, {})", self.expr(left), self.expr(right))
            }
            Expr::Binary { op, left, right, .. } => {
                format!("({} {} {})", self.expr(left), op.symbol(), self.expr(right))
            }
            Expr::Unary { op, operand, .. } => format!("({}{})", op.symbol(), self.expr(operand)),
            Expr::Postfix { op, operand, .. } => format!("({}{})", self.expr(operand), op.symbol()),
            Expr::Member { object, member, .. } => format!("{}.{}", self.expr(object), member),
            Expr::Index { array, index, .. } => format!("{}[{}]", self.expr(array), self.expr(index)),
            Expr::Call { callee, args, .. } => self.call(callee, args),
            Expr::Construct { component, args, .. } => self.construct(component, args),
            Expr::Ternary { cond, then_expr, else_expr, .. } => format!(
                "({} ? {} : {})",
                self.expr(cond),
                self.expr(then_expr),
                self.expr(else_expr)
            ),
            Expr::Array { elements, .. } if elements.is_empty() => "{}".to_string(),
            Expr::Array { elements, .. } => format!("std::vector{{{}}}", self.list(elements)),
            Expr::ArrayRepeat { value, count, .. } => format!("viewc::repeat<{}>({})", count, self.expr(value)),
            Expr::EnumAccess { enum_name, variant, .. } => format!("{}::{}", enum_name, variant),
        }
    }

    /// Expression converted to text for the DOM
    pub fn text(&self, expr: &Expr) -> String {
        match expr {
            Expr::Str { .. } => self.expr(expr),
            other => format!("viewc::str({})", self.expr(other)),
        }
    }

    fn list(&self, exprs: &[Expr]) -> String {
        exprs.iter().map(|e| self.expr(e)).collect::<Vec<_>>().join(", ")
    }

    fn is_local(&self, name: &str) -> bool {
        self.locals.iter().any(|l| l == name)
    }

    fn ident(&self, name: &str) -> String {
        if self.is_local(name) {
            return name.to_string();
        }
        if let Some((_, access)) = self.loop_vars.iter().rev().find(|(v, _)| v == name) {
            return access.clone();
        }
        match self.comp.param(name) {
            Some(p) if p.is_reference => format!("(*{})", name),
            _ => name.to_string(),
        }
    }

    fn is_value(&self, name: &str) -> bool {
        self.is_local(name)
            || self.loop_vars.iter().any(|(v, _)| v == name)
            || self.comp.param(name).is_some()
            || self.comp.state_var(name).is_some()
    }

    fn string(&self, parts: &[StrPart]) -> String {
        match parts {
            [] => "std::string()".to_string(),
            [StrPart::Text(t)] => format!("std::string({})", string_literal(t)),
            _ => {
                let pieces: Vec<String> = parts
                    .iter()
                    .map(|p| match p {
                        StrPart::Text(t) => format!("std::string({})", string_literal(t)),
                        StrPart::Expr(e) => format!("viewc::str({})", self.expr(e)),
                    })
                    .collect();
                format!("({})", pieces.join(" + "))
            }
        }
    }

    fn call(&self, callee: &Expr, args: &[CallArg]) -> String {
        let values: Vec<Expr> = args.iter().map(|a| a.value.clone()).collect();
        let rendered = self.list(&values);
        match callee {
            Expr::Member { object, member, .. } => {
                if let Expr::Ident { name, .. } = object.as_ref() {
                    // shared schema methods: `System.log(x)`
                    if !self.is_value(name) && self.env.schema.lookup_type(name).is_some() {
                        return format!("webcc::{}::{}({})", name.to_lowercase(), member, rendered);
                    }
                }
                let receiver = self.expr(object);
                if BUILTIN_CALLS.contains(&member.as_str()) {
                    let sep = if rendered.is_empty() { "" } else { ", " };
                    format!("viewc::{}({}{}{})", member, receiver, sep, rendered)
                } else {
                    format!("{}.{}({})", receiver, member, rendered)
                }
            }
            other => format!("{}({})", self.expr(other), rendered),
        }
    }

    fn construct(&self, component: &str, args: &[CallArg]) -> String {
        let target = self.env.component(component);
        let mut body = format!("[&] {{ {} _c; ", component);
        for (i, arg) in args.iter().enumerate() {
            let name = match (&arg.name, target) {
                (Some(n), _) => n.clone(),
                (None, Some(t)) => match t.params.get(i) {
                    Some(p) => p.name.clone(),
                    None => continue,
                },
                (None, None) => continue,
            };
            let value = self.expr(&arg.value);
            if arg.is_reference {
                let _ = write!(body, "_c.{} = &{}; ", name, value);
            } else if arg.is_move {
                let _ = write!(body, "_c.{} = std::move({}); ", name, value);
            } else {
                let _ = write!(body, "_c.{} = {}; ", name, value);
            }
        }
        body.push_str("return _c; }()");
        body
    }

    // ==================== Statements ====================

    /// Write `stmts` at `indent`, four spaces per level
    pub fn block(&mut self, out: &mut String, stmts: &[Stmt], indent: usize) -> Result<()> {
        let depth = self.locals.len();
        for stmt in stmts {
            self.stmt(out, stmt, indent)?;
        }
        self.locals.truncate(depth);
        Ok(())
    }

    fn stmt(&mut self, out: &mut String, stmt: &Stmt, indent: usize) -> Result<()> {
        let pad = "    ".repeat(indent);
        match stmt {
            Stmt::VarDecl { name, ty, init, span, .. } => {
                let ty = match ty {
                    Some(t) => cpp_type(&self.env.normalize(t, Some(self.comp), *span)?),
                    None => "auto".to_string(),
                };
                match init {
                    Some(init) => line(out, &pad, format_args!("{} {} = {};", ty, name, self.expr(init))),
                    None => line(out, &pad, format_args!("{} {}{{}};", ty, name)),
                }
                self.locals.push(name.clone());
            }
            Stmt::Assign { target, value, op, .. } => {
                let target = self.ident(target);
                line(out, &pad, format_args!("{};", self.assignment(&target, *op, value)));
            }
            Stmt::IndexAssign { array, index, value, op, .. } => {
                let target = format!("{}[{}]", self.expr(array), self.expr(index));
                line(out, &pad, format_args!("{};", self.assignment(&target, *op, value)));
            }
            Stmt::MemberAssign { object, member, value, op, .. } => {
                let target = format!("{}.{}", self.expr(object), member);
                line(out, &pad, format_args!("{};", self.assignment(&target, *op, value)));
            }
            Stmt::Expr { expr, .. } => line(out, &pad, format_args!("{};", self.expr(expr))),
            Stmt::Return { value: Some(v), .. } => line(out, &pad, format_args!("return {};", self.expr(v))),
            Stmt::Return { value: None, .. } => line(out, &pad, format_args!("return;")),
            Stmt::If { cond, then_branch, else_branch, .. } => {
                line(out, &pad, format_args!("if ({}) {{", self.expr(cond)));
                self.block(out, then_branch, indent + 1)?;
                if !else_branch.is_empty() {
                    line(out, &pad, format_args!("}} else {{"));
                    self.block(out, else_branch, indent + 1)?;
                }
                line(out, &pad, format_args!("}}"));
            }
            Stmt::ForRange { var, start, end, body, .. } => {
                line(
                    out,
                    &pad,
                    format_args!("for (int32_t {v} = {}; {v} < {}; {v}++) {{", self.expr(start), self.expr(end), v = var),
                );
                self.locals.push(var.clone());
                self.block(out, body, indent + 1)?;
                self.locals.pop();
                line(out, &pad, format_args!("}}"));
            }
            Stmt::ForEach { var, iterable, body, .. } => {
                line(out, &pad, format_args!("for (auto& {} : {}) {{", var, self.expr(iterable)));
                self.locals.push(var.clone());
                self.block(out, body, indent + 1)?;
                self.locals.pop();
                line(out, &pad, format_args!("}}"));
            }
            Stmt::Block { stmts, .. } => {
                line(out, &pad, format_args!("{{"));
                self.block(out, stmts, indent + 1)?;
                line(out, &pad, format_args!("}}"));
            }
        }
        Ok(())
    }

    fn assignment(&self, target: &str, op: Option<BinOp>, value: &Expr) -> String {
        match op {
            None => format!("{} = {}", target, self.expr(value)),
            // `+=` on strings must not take the char overload
            Some(BinOp::Add) => format!("{t} = viewc::add({t}, {})", self.expr(value), t = target),
            Some(op) => format!("{} {}= {}", target, op.symbol(), self.expr(value)),
        }
    }
}

fn line(out: &mut String, pad: &str, args: fmt::Arguments<'_>) {
    out.push_str(pad);
    // writing into a String cannot fail
    let _ = out.write_fmt(args);
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use crate::types::schema::TypeEntry;
    use crate::types::TypeSchema;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_types() {
        assert_eq!(cpp_type(&Type::array(Type::String)), "std::vector<std::string>");
        assert_eq!(cpp_type(&Type::FixedArray(Box::new(Type::FLOAT32), 4)), "std::array<float, 4>");
        assert_eq!(cpp_type(&Type::Callback(vec![Type::INT])), "std::function<void(int32_t)>");
        assert_eq!(cpp_type(&Type::Handle("Canvas".into())), "webcc::Canvas");
    }

    #[test]
    fn test_expressions() {
        let mut comp = counter();
        comp.params.push(Param { is_reference: true, ..param("shared", "int") });
        let program = program(vec![comp.clone()]);
        let schema = TypeSchema::from_entries([TypeEntry::handle("System")]);
        let env = TypeEnv::new(&program, &schema);
        let r = ExprRenderer::new(&env, &comp).with_loop_vars(vec![("item".into(), "_it0._value".into())]);

        assert_eq!(r.expr(&add(ident("count"), int(1))), "viewc::add(count, 1)");
        assert_eq!(r.expr(&ident("shared")), "(*shared)");
        assert_eq!(r.expr(&member(ident("item"), "name")), "_it0._value.name");
        assert_eq!(r.expr(&call(member(ident("items"), "push"), vec![int(2)])), "viewc::push(items, 2)");
        assert_eq!(r.expr(&call(member(ident("System"), "log"), vec![string("hi")])), "webcc::system::log(std::string(\"hi\"))");
        assert_eq!(
            r.text(&interp(vec![StrPart::Text("n = ".into()), StrPart::Expr(ident("count"))])),
            "(std::string(\"n = \") + viewc::str(count))"
        );
        assert_eq!(r.expr(&int(5_000_000_000)), "5000000000LL");
        assert_eq!(string_literal("a\"b\n"), "\"a\\\"b\\n\"");
    }

    #[test]
    fn test_method_body() {
        let comp = counter();
        let program = program(vec![comp.clone()]);
        let schema = TypeSchema::empty();
        let env = TypeEnv::new(&program, &schema);
        let mut r = ExprRenderer::new(&env, &comp);
        let mut out = String::new();
        let body = vec![
            var_decl("step", "int", false, int(2)),
            compound_assign("count", BinOp::Add, ident("step")),
            Stmt::If { cond: binary(BinOp::Gt, ident("count"), int(9)), then_branch: vec![assign("count", int(0))], else_branch: vec![], span: sp() },
        ];
        r.block(&mut out, &body, 1).unwrap();
        assert_eq!(
            out,
            "    int32_t step = 2;\n    count = viewc::add(count, step);\n    if ((count > 9)) {\n        count = 0;\n    }\n"
        );
    }
}
