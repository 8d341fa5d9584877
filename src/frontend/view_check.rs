//! View-hierarchy validation
//!
//! Every prop passed to a child component must name a declared parameter and
//! carry a compatible value. Reference parameters take assignable locations
//! of exactly the declared type, passed with `&`. Callback parameters take
//! methods whose parameter list matches the declared signature exactly, or
//! an inline handler when the callback has no parameters. Every parameter
//! without a default must be supplied; callbacks may be left unset.

use crate::frontend::ast::{CallArg, Component, ComponentInstantiation, Expr, Param};
use crate::frontend::semantic::{is_lvalue, SymbolKind, TypeChecker};
use crate::types::Type;
use crate::utils::{Error, Result, Span};

/// A prop or construction argument as seen by the validator
#[derive(Debug, Clone, Copy)]
pub struct SuppliedArg<'e> {
    pub name: Option<&'e str>,
    pub value: &'e Expr,
    pub is_reference: bool,
    pub span: Span,
}

impl<'e> SuppliedArg<'e> {
    pub fn from_call_arg(arg: &'e CallArg) -> Self {
        Self {
            name: arg.name.as_deref(),
            value: &arg.value,
            is_reference: arg.is_reference,
            span: arg.value.span(),
        }
    }
}

/// Validate `<Child .../>` against the child's declared parameters
pub fn check_instantiation(checker: &mut TypeChecker<'_>, inst: &ComponentInstantiation) -> Result<()> {
    let target = checker
        .env()
        .component(&inst.component)
        .ok_or_else(|| Error::UnknownType { name: inst.component.clone(), span: inst.span })?;
    let supplied: Vec<_> = inst
        .props
        .iter()
        .map(|p| SuppliedArg { name: Some(&p.name), value: &p.value, is_reference: p.is_reference, span: p.span })
        .collect();
    check_arguments(checker, target, &supplied)
}

/// Match supplied arguments to `target`'s parameters and check each pair.
///
/// Positional arguments bind to parameters in declaration order.
pub fn check_arguments(checker: &mut TypeChecker<'_>, target: &Component, args: &[SuppliedArg<'_>]) -> Result<()> {
    let mut bound: Vec<&str> = Vec::new();
    for (position, arg) in args.iter().enumerate() {
        let param = match arg.name {
            Some(name) => target.param(name),
            None => target.params.get(position),
        }
        .ok_or_else(|| Error::UnknownProp {
            component: target.name.clone(),
            prop: arg.name.map(str::to_string).unwrap_or_else(|| format!("#{}", position)),
            span: arg.span,
        })?;
        if bound.contains(&param.name.as_str()) {
            return Err(Error::DuplicateDefinition { name: param.name.clone(), span: arg.span });
        }
        bound.push(&param.name);

        if param.is_callback() {
            check_callback(checker, target, param, arg)?;
        } else if param.is_reference {
            check_reference(checker, target, param, arg)?;
        } else {
            if arg.is_reference {
                return Err(Error::ReferenceArgument {
                    component: target.name.clone(),
                    param: param.name.clone(),
                    message: "is not a reference parameter; remove the '&'".to_string(),
                    span: arg.span,
                });
            }
            let expected = checker.env().normalize(&param.ty, Some(target), arg.span)?;
            checker.check_assignable(arg.value, &expected, arg.span)?;
        }
    }

    // callbacks are optional; the child checks them before calling
    let span = args.first().map(|a| a.span).unwrap_or_default();
    for missing in target.params.iter().filter(|p| !bound.contains(&p.name.as_str())) {
        if missing.is_reference {
            return Err(Error::ReferenceArgument {
                component: target.name.clone(),
                param: missing.name.clone(),
                message: "reference parameter must be supplied".to_string(),
                span,
            });
        }
        if !missing.is_callback() && missing.default.is_none() {
            return Err(Error::MissingProp {
                component: target.name.clone(),
                prop: missing.name.clone(),
                span,
            });
        }
    }
    Ok(())
}

fn check_reference(checker: &mut TypeChecker<'_>, target: &Component, param: &Param, arg: &SuppliedArg<'_>) -> Result<()> {
    let fail = |message: &str| Error::ReferenceArgument {
        component: target.name.clone(),
        param: param.name.clone(),
        message: message.to_string(),
        span: arg.span,
    };
    if !arg.is_reference {
        return Err(fail("expects a reference; pass it with '&'"));
    }
    if !is_lvalue(arg.value) {
        return Err(fail("reference argument must be an assignable variable"));
    }
    if let Some(name) = arg.value.as_ident() {
        if let Some(symbol) = checker.lookup(name) {
            if matches!(symbol.kind, SymbolKind::Method { .. } | SymbolKind::Callback | SymbolKind::LoopVar) {
                return Err(fail("reference argument must be an assignable variable"));
            }
        }
    }
    let expected = checker.env().normalize(&param.ty, Some(target), arg.span)?;
    // the child aliases the location, so no conversion may happen
    let got = checker.infer(arg.value)?;
    if got == expected {
        Ok(())
    } else {
        Err(Error::TypeMismatch { expected: expected.to_string(), got: got.to_string(), span: arg.span })
    }
}

fn check_callback(checker: &mut TypeChecker<'_>, target: &Component, param: &Param, arg: &SuppliedArg<'_>) -> Result<()> {
    let declared = param
        .callback
        .iter()
        .flatten()
        .map(|t| checker.env().normalize(t, Some(target), arg.span))
        .collect::<Result<Vec<_>>>()?;
    let render = |ts: &[Type]| ts.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(", ");

    let Some(name) = arg.value.as_ident() else {
        // inline handler: the child supplies no arguments to it
        if !declared.is_empty() {
            return Err(Error::CallbackSignature {
                component: target.name.clone(),
                param: param.name.clone(),
                expected: render(&declared),
                got: "an inline handler; pass a method by name".to_string(),
                span: arg.span,
            });
        }
        checker.infer(arg.value)?;
        return Ok(());
    };
    let symbol = checker
        .lookup(name)
        .cloned()
        .ok_or_else(|| Error::UnresolvedIdentifier { name: name.to_string(), span: arg.span })?;
    let got = match (&symbol.kind, &symbol.ty) {
        (SymbolKind::Method { .. } | SymbolKind::Callback, Type::Callback(params)) => params.clone(),
        _ => return Err(Error::NotCallable { name: name.to_string(), span: arg.span }),
    };
    if got != declared {
        return Err(Error::CallbackSignature {
            component: target.name.clone(),
            param: param.name.clone(),
            expected: render(&declared),
            got: render(&got),
            span: arg.span,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::frontend::ast::{Component, Expr};
    use crate::frontend::semantic::check_program;
    use crate::testing::*;
    use crate::types::{TypeEnv, TypeSchema};
    use crate::utils::{Error, Result};

    fn check(components: Vec<Component>) -> Result<()> {
        let program = program(components);
        let schema = TypeSchema::empty();
        let env = TypeEnv::new(&program, &schema);
        check_program(&program, &env)
    }

    fn item_component() -> Component {
        let mut item = component("Item");
        item.params.push(param("label", "string"));
        item.params.push(callback_param("onRemove", &["int"]));
        let mut value = param("value", "int");
        value.is_reference = true;
        value.mutable = true;
        item.params.push(value);
        item
    }

    fn parent(props: Vec<crate::frontend::ast::ViewNode>, methods: Vec<crate::frontend::ast::Method>) -> Component {
        let mut app = component("App");
        app.state.push(state("count", "int", true, Some(int(0))));
        app.methods.extend(methods);
        app.view.extend(props);
        app
    }

    fn instantiate(props: Vec<(&str, Expr, bool)>) -> crate::frontend::ast::ViewNode {
        use crate::frontend::ast::{ComponentInstantiation, PropArg, ViewNode};
        ViewNode::Component(ComponentInstantiation {
            component: "Item".into(),
            props: props
                .into_iter()
                .map(|(name, value, is_reference)| PropArg { name: name.into(), value, is_reference, span: sp() })
                .collect(),
            span: sp(),
        })
    }

    #[test]
    fn test_valid_props() {
        let app = parent(
            vec![instantiate(vec![
                ("label", string("hi"), false),
                ("onRemove", ident("remove"), false),
                ("value", ident("count"), true),
            ])],
            vec![method("remove", &[("index", "int")], vec![])],
        );
        assert!(check(vec![item_component(), app]).is_ok());
    }

    #[test]
    fn test_unknown_prop() {
        let app = parent(
            vec![instantiate(vec![("value", ident("count"), true), ("title", string("x"), false)])],
            vec![],
        );
        assert!(matches!(check(vec![item_component(), app]), Err(Error::UnknownProp { .. })));
    }

    #[test]
    fn test_prop_type_mismatch() {
        let app = parent(
            vec![instantiate(vec![("value", ident("count"), true), ("label", int(3), false)])],
            vec![],
        );
        assert!(matches!(check(vec![item_component(), app]), Err(Error::TypeMismatch { .. })));
    }

    #[test]
    fn test_callback_signature_must_match_exactly() {
        let app = parent(
            vec![instantiate(vec![("value", ident("count"), true), ("onRemove", ident("remove"), false)])],
            vec![method("remove", &[("index", "long")], vec![])],
        );
        assert!(matches!(check(vec![item_component(), app]), Err(Error::CallbackSignature { .. })));

        let app = parent(
            vec![instantiate(vec![("value", ident("count"), true), ("onRemove", ident("remove"), false)])],
            vec![method("remove", &[], vec![])],
        );
        assert!(matches!(check(vec![item_component(), app]), Err(Error::CallbackSignature { .. })));
    }

    #[test]
    fn test_reference_rules() {
        // missing '&'
        let app = parent(vec![instantiate(vec![("value", ident("count"), false)])], vec![]);
        assert!(matches!(check(vec![item_component(), app]), Err(Error::ReferenceArgument { .. })));

        // not an lvalue
        let app = parent(vec![instantiate(vec![("value", int(3), true)])], vec![]);
        assert!(matches!(check(vec![item_component(), app]), Err(Error::ReferenceArgument { .. })));

        // '&' on a value parameter
        let app = parent(
            vec![instantiate(vec![("value", ident("count"), true), ("label", string("x"), true)])],
            vec![],
        );
        assert!(matches!(check(vec![item_component(), app]), Err(Error::ReferenceArgument { .. })));

        // reference parameter omitted
        let app = parent(vec![instantiate(vec![("label", string("x"), false)])], vec![]);
        assert!(matches!(check(vec![item_component(), app]), Err(Error::ReferenceArgument { .. })));
    }

    #[test]
    fn test_reference_type_must_match_exactly() {
        let mut slider = component("Slider");
        let mut value = param("value", "float");
        value.is_reference = true;
        value.mutable = true;
        slider.params.push(value);
        // int would widen to float as a value, but not behind a reference
        let app = parent(vec![child_ref("Slider", "value", ident("count"))], vec![]);
        assert!(matches!(check(vec![slider, app]), Err(Error::TypeMismatch { .. })));
    }

    #[test]
    fn test_required_props_must_be_supplied() {
        let app = parent(vec![instantiate(vec![("value", ident("count"), true)])], vec![]);
        match check(vec![item_component(), app]) {
            Err(Error::MissingProp { component, prop, .. }) => {
                assert_eq!(component, "Item");
                assert_eq!(prop, "label");
            }
            other => panic!("expected a missing prop, got {:?}", other),
        }

        // a default makes the prop optional
        let mut item = item_component();
        item.params[0].default = Some(string("untitled"));
        let app = parent(vec![instantiate(vec![("value", ident("count"), true)])], vec![]);
        assert!(check(vec![item, app]).is_ok());
    }

    #[test]
    fn test_inline_handler_for_parameterless_callback() {
        let mut btn = component("Btn");
        btn.params.push(callback_param("onPress", &[]));
        let mut app = component("App");
        app.state.push(state("count", "int", true, Some(int(0))));
        app.methods.push(method("bump", &[], vec![]));
        app.view.push(child("Btn", vec![("onPress", call(ident("bump"), vec![]))]));
        assert!(check(vec![btn, app]).is_ok());
    }

    #[test]
    fn test_inline_handler_cannot_take_callback_arguments() {
        let app = parent(
            vec![instantiate(vec![
                ("label", string("x"), false),
                ("value", ident("count"), true),
                ("onRemove", postfix_inc(ident("count")), false),
            ])],
            vec![],
        );
        assert!(matches!(check(vec![item_component(), app]), Err(Error::CallbackSignature { .. })));
    }

    #[test]
    fn test_unknown_child_component() {
        let app = parent(vec![child("Missing", vec![])], vec![]);
        assert!(matches!(check(vec![app]), Err(Error::UnknownType { .. })));
    }
}
