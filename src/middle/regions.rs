//! Reactive region builder
//!
//! Walks a component's view once and flattens it into arenas addressed by
//! typed ids: elements (text nodes and anchors included), bindings, event
//! handlers, child instances, loops and ifs. Parent links are ids into the
//! arenas, never owning pointers.
//!
//! Every node lives in a `Scope`: either the component itself or the
//! per-item template of a loop, plus the innermost if branch it sits in
//! within that owner.

use std::fmt;

use crate::feedback::{Diagnostics, Warning};
use crate::frontend::ast::*;
use crate::frontend::semantic::{SymbolKind, TypeChecker};
use crate::middle::deps::{expr_deps, is_pure, view_deps, DependencySet};
use crate::types::{Type, TypeEnv};
use crate::utils::{Result, Span};

macro_rules! region_id {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub usize);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

region_id!(
    /// DOM node identity (elements, text nodes, anchors)
    ElementId, "el"
);
region_id!(BindingId, "b");
region_id!(LoopId, "loop");
region_id!(IfId, "if");
region_id!(
    /// Child component instance identity
    InstanceId, "child"
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Branch {
    Then,
    Else,
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Branch::Then => write!(f, "then"),
            Branch::Else => write!(f, "else"),
        }
    }
}

/// Who creates and destroys a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Owner {
    Component,
    /// Created once per item of the loop
    LoopItem(LoopId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Scope {
    pub owner: Owner,
    /// Innermost enclosing if branch under the same owner
    pub branch: Option<(IfId, Branch)>,
}

impl Scope {
    pub const COMPONENT: Scope = Scope { owner: Owner::Component, branch: None };

    pub fn item(loop_id: LoopId) -> Self {
        Scope { owner: Owner::LoopItem(loop_id), branch: None }
    }

    pub fn in_branch(self, id: IfId, branch: Branch) -> Self {
        Scope { branch: Some((id, branch)), ..self }
    }
}

/// Where a node's DOM root is inserted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertionPoint {
    /// `None` is the component's own mount parent
    pub parent: Option<ElementId>,
    /// Insert before this anchor instead of appending
    pub anchor: Option<ElementId>,
}

impl InsertionPoint {
    pub const ROOT: InsertionPoint = InsertionPoint { parent: None, anchor: None };

    fn append(parent: ElementId) -> Self {
        InsertionPoint { parent: Some(parent), anchor: None }
    }
}

/// Anything with its own identity, in creation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Element(ElementId),
    Instance(InstanceId),
    Loop(LoopId),
    If(IfId),
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Element(id) => write!(f, "{}", id),
            Slot::Instance(id) => write!(f, "{}", id),
            Slot::Loop(id) => write!(f, "{}", id),
            Slot::If(id) => write!(f, "{}", id),
        }
    }
}

// ==================== Arena entries ====================

#[derive(Debug, Clone, PartialEq)]
pub enum TextSource {
    Literal(String),
    /// Constant expression, evaluated once at construction
    Static(Expr),
    Bound(BindingId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    Tag(String),
    Text(TextSource),
    /// Empty marker that loops and ifs insert their content before
    Anchor,
}

/// Attribute with a constant value
#[derive(Debug, Clone, PartialEq)]
pub struct StaticAttr {
    pub name: String,
    pub value: Expr,
    pub property: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementNode {
    pub id: ElementId,
    pub kind: ElementKind,
    pub at: InsertionPoint,
    pub scope: Scope,
    pub static_attrs: Vec<StaticAttr>,
    /// State variable receiving the element handle
    pub ref_binding: Option<String>,
    pub span: Span,
}

impl ElementNode {
    pub fn tag(&self) -> Option<&str> {
        match &self.kind {
            ElementKind::Tag(t) => Some(t),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingKind {
    Attribute(String),
    /// DOM property (`value`, `checked`, `selected`)
    Property(String),
    Text,
}

impl fmt::Display for BindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingKind::Attribute(name) => write!(f, "attr {}", name),
            BindingKind::Property(name) => write!(f, "prop {}", name),
            BindingKind::Text => write!(f, "text"),
        }
    }
}

/// One dynamic attribute or text value
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub id: BindingId,
    pub element: ElementId,
    pub kind: BindingKind,
    pub expr: Expr,
    pub deps: DependencySet,
    pub scope: Scope,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventHandler {
    pub element: ElementId,
    pub event: EventKind,
    pub handler: Expr,
    pub scope: Scope,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropBinding {
    pub name: String,
    pub value: Expr,
    pub is_reference: bool,
    pub deps: DependencySet,
}

impl PropBinding {
    pub fn is_static(&self) -> bool {
        self.value.is_static()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChildInstance {
    pub id: InstanceId,
    pub component: String,
    pub at: InsertionPoint,
    pub scope: Scope,
    pub props: Vec<PropBinding>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoopSource {
    Range { start: Expr, end: Expr },
    Each { iterable: Expr },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemKind {
    Html,
    /// The template is a single child component
    Component(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoopKey {
    pub expr: Expr,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoopRegion {
    pub id: LoopId,
    pub at: InsertionPoint,
    pub anchor: ElementId,
    pub scope: Scope,
    pub var: String,
    pub var_ty: Type,
    pub source: LoopSource,
    pub item_kind: ItemKind,
    /// Source reads plus the template's free reads
    pub deps: DependencySet,
    /// `None` for unkeyed loops
    pub key: Option<LoopKey>,
    /// Template roots, in creation order
    pub roots: Vec<Slot>,
    pub span: Span,
}

impl LoopRegion {
    pub fn is_keyed(&self) -> bool {
        self.key.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BranchContent {
    pub roots: Vec<Slot>,
    /// Every identity the branch creates, nested branches and loop
    /// anchors included, in creation order
    pub owned: Vec<Slot>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfRegion {
    pub id: IfId,
    pub at: InsertionPoint,
    pub anchor: ElementId,
    pub scope: Scope,
    pub cond: Expr,
    pub deps: DependencySet,
    pub then_branch: BranchContent,
    pub else_branch: BranchContent,
    pub span: Span,
}

impl IfRegion {
    pub fn branch(&self, branch: Branch) -> &BranchContent {
        match branch {
            Branch::Then => &self.then_branch,
            Branch::Else => &self.else_branch,
        }
    }
}

// ==================== Region tables ====================

/// Everything the generator needs about one component's view
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentRegions {
    pub component: String,
    pub elements: Vec<ElementNode>,
    pub bindings: Vec<Binding>,
    pub handlers: Vec<EventHandler>,
    pub instances: Vec<ChildInstance>,
    pub loops: Vec<LoopRegion>,
    pub ifs: Vec<IfRegion>,
    pub roots: Vec<Slot>,
    /// Creation order of every identity
    pub order: Vec<Slot>,
}

impl ComponentRegions {
    pub fn element(&self, id: ElementId) -> &ElementNode {
        &self.elements[id.0]
    }

    pub fn binding(&self, id: BindingId) -> &Binding {
        &self.bindings[id.0]
    }

    pub fn loop_region(&self, id: LoopId) -> &LoopRegion {
        &self.loops[id.0]
    }

    pub fn if_region(&self, id: IfId) -> &IfRegion {
        &self.ifs[id.0]
    }

    pub fn instance(&self, id: InstanceId) -> &ChildInstance {
        &self.instances[id.0]
    }

    pub fn scope_of(&self, slot: Slot) -> Scope {
        match slot {
            Slot::Element(id) => self.element(id).scope,
            Slot::Instance(id) => self.instance(id).scope,
            Slot::Loop(id) => self.loop_region(id).scope,
            Slot::If(id) => self.if_region(id).scope,
        }
    }

    /// Identities created directly in `scope`, in creation order
    pub fn slots_in(&self, scope: Scope) -> Vec<Slot> {
        self.order.iter().copied().filter(|s| self.scope_of(*s) == scope).collect()
    }

    /// Identities created by `owner`, whatever branch they sit in
    pub fn owned_by(&self, owner: Owner) -> Vec<Slot> {
        self.order.iter().copied().filter(|s| self.scope_of(*s).owner == owner).collect()
    }

    pub fn handlers_for(&self, element: ElementId) -> impl Iterator<Item = &EventHandler> {
        self.handlers.iter().filter(move |h| h.element == element)
    }

    /// Loops whose items enclose `scope`, outermost first
    pub fn loop_chain(&self, scope: Scope) -> Vec<LoopId> {
        let mut chain = Vec::new();
        let mut owner = scope.owner;
        while let Owner::LoopItem(id) = owner {
            chain.push(id);
            owner = self.loop_region(id).scope.owner;
        }
        chain.reverse();
        chain
    }
}

// ==================== Builder ====================

/// Attributes bound as DOM properties
const DOM_PROPERTIES: [&str; 3] = ["value", "checked", "selected"];

pub struct RegionBuilder<'c, 'a> {
    checker: &'c mut TypeChecker<'a>,
    diagnostics: &'c mut Diagnostics,
    regions: ComponentRegions,
}

impl<'c, 'a> RegionBuilder<'c, 'a> {
    pub fn new(checker: &'c mut TypeChecker<'a>, diagnostics: &'c mut Diagnostics) -> Self {
        Self { checker, diagnostics, regions: ComponentRegions::default() }
    }

    /// Build the region tables of one type checked component
    pub fn build(mut self, comp: &'a Component) -> Result<ComponentRegions> {
        self.regions.component = comp.name.clone();
        self.checker.enter_component(comp)?;
        let result = self.build_nodes(&comp.view, InsertionPoint::ROOT, Scope::COMPONENT);
        self.checker.exit_component();
        self.regions.roots = result?;

        let r = &self.regions;
        log::debug!(
            "{}: {} elements, {} bindings, {} handlers, {} children, {} loops, {} ifs",
            r.component,
            r.elements.len(),
            r.bindings.len(),
            r.handlers.len(),
            r.instances.len(),
            r.loops.len(),
            r.ifs.len()
        );
        Ok(self.regions)
    }

    fn build_nodes(&mut self, nodes: &[ViewNode], at: InsertionPoint, scope: Scope) -> Result<Vec<Slot>> {
        let mut roots = Vec::with_capacity(nodes.len());
        for node in nodes {
            roots.push(self.build_node(node, at, scope)?);
        }
        Ok(roots)
    }

    fn build_node(&mut self, node: &ViewNode, at: InsertionPoint, scope: Scope) -> Result<Slot> {
        match node {
            ViewNode::Text { text, span } => {
                let id = self.new_element(ElementKind::Text(TextSource::Literal(text.clone())), at, scope, *span);
                Ok(Slot::Element(id))
            }
            ViewNode::Expr { expr, span } => {
                // kind is patched once the binding id is known
                let id = self.new_element(ElementKind::Text(TextSource::Static(expr.clone())), at, scope, *span);
                if !expr.is_static() {
                    let binding = self.new_binding(id, BindingKind::Text, expr, scope);
                    self.regions.elements[id.0].kind = ElementKind::Text(TextSource::Bound(binding));
                }
                Ok(Slot::Element(id))
            }
            ViewNode::Element(el) => self.build_element(el, at, scope),
            ViewNode::Component(inst) => Ok(Slot::Instance(self.build_instance(inst, at, scope))),
            ViewNode::If { cond, then_children, else_children, span } => {
                self.build_if(cond, then_children, else_children, at, scope, *span)
            }
            ViewNode::ForRange { var, start, end, children, span } => {
                let source = LoopSource::Range { start: start.clone(), end: end.clone() };
                self.build_loop(node, var, Type::INT, source, None, children, at, scope, *span)
            }
            ViewNode::ForEach { var, iterable, key, children, span } => {
                let elem = self.checker.iterable_element(iterable)?;
                let source = LoopSource::Each { iterable: iterable.clone() };
                self.build_loop(node, var, elem, source, key.as_ref(), children, at, scope, *span)
            }
        }
    }

    fn build_element(&mut self, el: &HtmlElement, at: InsertionPoint, scope: Scope) -> Result<Slot> {
        let id = self.new_element(ElementKind::Tag(el.tag.clone()), at, scope, el.span);
        self.regions.elements[id.0].ref_binding = el.ref_binding.clone();

        for attr in &el.attributes {
            if let Some(event) = attr.event_kind() {
                self.regions.handlers.push(EventHandler { element: id, event, handler: attr.value.clone(), scope });
                continue;
            }
            let property = DOM_PROPERTIES.contains(&attr.name.as_str());
            if attr.value.is_static() {
                self.regions.elements[id.0].static_attrs.push(StaticAttr {
                    name: attr.name.clone(),
                    value: attr.value.clone(),
                    property,
                });
            } else {
                let kind = if property {
                    BindingKind::Property(attr.name.clone())
                } else {
                    BindingKind::Attribute(attr.name.clone())
                };
                self.new_binding(id, kind, &attr.value, scope);
            }
        }

        self.build_nodes(&el.children, InsertionPoint::append(id), scope)?;
        Ok(Slot::Element(id))
    }

    fn build_instance(&mut self, inst: &ComponentInstantiation, at: InsertionPoint, scope: Scope) -> InstanceId {
        let id = InstanceId(self.regions.instances.len());
        let props = inst
            .props
            .iter()
            .map(|p| PropBinding {
                name: p.name.clone(),
                value: p.value.clone(),
                is_reference: p.is_reference,
                deps: expr_deps(&p.value),
            })
            .collect();
        self.regions.instances.push(ChildInstance {
            id,
            component: inst.component.clone(),
            at,
            scope,
            props,
            span: inst.span,
        });
        self.regions.order.push(Slot::Instance(id));
        id
    }

    fn build_if(
        &mut self,
        cond: &Expr,
        then_children: &[ViewNode],
        else_children: &[ViewNode],
        at: InsertionPoint,
        scope: Scope,
        span: Span,
    ) -> Result<Slot> {
        let anchor = self.new_element(ElementKind::Anchor, at, scope, span);
        let id = IfId(self.regions.ifs.len());
        self.regions.ifs.push(IfRegion {
            id,
            at,
            anchor,
            scope,
            cond: cond.clone(),
            deps: expr_deps(cond),
            then_branch: BranchContent::default(),
            else_branch: BranchContent::default(),
            span,
        });
        self.regions.order.push(Slot::If(id));

        let inner = InsertionPoint { parent: at.parent, anchor: Some(anchor) };
        let then_branch = self.build_branch(then_children, inner, scope.in_branch(id, Branch::Then))?;
        let else_branch = self.build_branch(else_children, inner, scope.in_branch(id, Branch::Else))?;
        let region = &mut self.regions.ifs[id.0];
        region.then_branch = then_branch;
        region.else_branch = else_branch;
        Ok(Slot::If(id))
    }

    fn build_branch(&mut self, children: &[ViewNode], at: InsertionPoint, scope: Scope) -> Result<BranchContent> {
        let start = self.regions.order.len();
        self.checker.enter_scope();
        let roots = self.build_nodes(children, at, scope);
        self.checker.exit_scope();
        let roots = roots?;
        let owned = self.regions.order[start..]
            .iter()
            .copied()
            .filter(|s| self.regions.scope_of(*s).owner == scope.owner)
            .collect();
        Ok(BranchContent { roots, owned })
    }

    #[allow(clippy::too_many_arguments)]
    fn build_loop(
        &mut self,
        node: &ViewNode,
        var: &str,
        var_ty: Type,
        source: LoopSource,
        key: Option<&Expr>,
        children: &[ViewNode],
        at: InsertionPoint,
        scope: Scope,
        span: Span,
    ) -> Result<Slot> {
        let anchor = self.new_element(ElementKind::Anchor, at, scope, span);
        let id = LoopId(self.regions.loops.len());
        let item_kind = match children {
            [ViewNode::Component(inst)] => ItemKind::Component(inst.component.clone()),
            _ => ItemKind::Html,
        };
        self.regions.loops.push(LoopRegion {
            id,
            at,
            anchor,
            scope,
            var: var.to_string(),
            var_ty: var_ty.clone(),
            source,
            item_kind,
            deps: view_deps(std::slice::from_ref(node)),
            key: None,
            roots: Vec::new(),
            span,
        });
        self.regions.order.push(Slot::Loop(id));

        self.checker.enter_scope();
        let result = self.build_loop_body(id, var, var_ty, key, children, at, anchor, span);
        self.checker.exit_scope();
        let (key, roots) = result?;
        let region = &mut self.regions.loops[id.0];
        region.key = key;
        region.roots = roots;
        Ok(Slot::Loop(id))
    }

    #[allow(clippy::too_many_arguments)]
    fn build_loop_body(
        &mut self,
        id: LoopId,
        var: &str,
        var_ty: Type,
        key: Option<&Expr>,
        children: &[ViewNode],
        at: InsertionPoint,
        anchor: ElementId,
        span: Span,
    ) -> Result<(Option<LoopKey>, Vec<Slot>)> {
        self.checker.define_local(var, var_ty, SymbolKind::LoopVar, false, span)?;
        let key = match key {
            Some(expr) if !is_pure(expr) => {
                self.diagnostics.warn(Warning::ImpureLoopKey {
                    component: self.regions.component.clone(),
                    loop_id: id.0,
                    span: expr.span(),
                });
                None
            }
            Some(expr) => Some(LoopKey { expr: expr.clone(), ty: self.checker.key_type(expr)? }),
            None => None,
        };
        let inner = InsertionPoint { parent: at.parent, anchor: Some(anchor) };
        let roots = self.build_nodes(children, inner, Scope::item(id))?;
        Ok((key, roots))
    }

    fn new_element(&mut self, kind: ElementKind, at: InsertionPoint, scope: Scope, span: Span) -> ElementId {
        let id = ElementId(self.regions.elements.len());
        self.regions.elements.push(ElementNode {
            id,
            kind,
            at,
            scope,
            static_attrs: Vec::new(),
            ref_binding: None,
            span,
        });
        self.regions.order.push(Slot::Element(id));
        id
    }

    fn new_binding(&mut self, element: ElementId, kind: BindingKind, expr: &Expr, scope: Scope) -> BindingId {
        let id = BindingId(self.regions.bindings.len());
        self.regions.bindings.push(Binding { id, element, kind, expr: expr.clone(), deps: expr_deps(expr), scope });
        id
    }
}

/// Build the region tables of every component
pub fn build_program_regions<'a>(
    program: &'a Program,
    env: &'a TypeEnv<'a>,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<ComponentRegions>> {
    let mut checker = TypeChecker::new(env);
    let mut all = Vec::with_capacity(program.components.len());
    for comp in &program.components {
        all.push(RegionBuilder::new(&mut checker, diagnostics).build(comp)?);
    }
    Ok(all)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use crate::types::TypeSchema;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    fn regions_of(comp: Component) -> (ComponentRegions, Diagnostics) {
        let program = program(vec![comp]);
        let schema = TypeSchema::empty();
        let env = TypeEnv::new(&program, &schema);
        let mut diagnostics = Diagnostics::new();
        let mut all = build_program_regions(&program, &env, &mut diagnostics).unwrap();
        (all.remove(0), diagnostics)
    }

    #[test]
    fn test_counter_regions() {
        let (r, _) = regions_of(counter());
        // div, p, text, button, "+"
        assert_eq!(r.elements.len(), 5);
        assert_eq!(r.bindings.len(), 1);
        assert_eq!(r.bindings[0].kind, BindingKind::Text);
        assert_eq!(r.bindings[0].deps.vars, names_set(&["count"]));
        assert_eq!(r.handlers.len(), 1);
        assert_eq!(r.handlers[0].event, EventKind::Click);
        assert_eq!(r.roots, vec![Slot::Element(ElementId(0))]);
        assert_eq!(r.element(ElementId(2)).at, InsertionPoint::append(ElementId(1)));
    }

    #[test]
    fn test_static_expressions_get_no_binding() {
        let mut comp = component("Static");
        comp.state.push(state("count", "int", true, Some(int(0))));
        comp.view.push(element(
            "p",
            vec![("class", string("big")), ("width", add(int(1), int(2)))],
            vec![text_expr(add(int(1), int(2))), text_expr(string("hi"))],
        ));
        let (r, _) = regions_of(comp);
        assert!(r.bindings.is_empty());
        assert_eq!(r.element(ElementId(0)).static_attrs.len(), 2);
        assert!(matches!(r.element(ElementId(1)).kind, ElementKind::Text(TextSource::Static(_))));
    }

    #[test]
    fn test_value_binds_as_property() {
        let mut comp = component("Form");
        comp.state.push(state("name", "string", true, Some(string(""))));
        comp.view.push(element("input", vec![("value", ident("name")), ("title", ident("name"))], vec![]));
        let (r, _) = regions_of(comp);
        assert_eq!(r.bindings[0].kind, BindingKind::Property("value".into()));
        assert_eq!(r.bindings[1].kind, BindingKind::Attribute("title".into()));
    }

    #[test]
    fn test_if_branches_own_disjoint_identities() {
        let mut comp = component("Toggle");
        comp.state.push(state("on", "bool", true, Some(boolean(false))));
        comp.state.push(state("items", "int[]", true, Some(array(vec![]))));
        comp.view.push(element(
            "div",
            vec![],
            vec![view_if(
                ident("on"),
                vec![element("span", vec![], vec![text("yes")]), for_each("i", ident("items"), None, vec![text_expr(ident("i"))])],
                vec![view_if(ident("on"), vec![text("never")], vec![]), text("no")],
            )],
        ));
        let (r, _) = regions_of(comp);
        let outer = r.if_region(IfId(0));
        assert_eq!(outer.deps.vars, names_set(&["on"]));
        let then_ids: HashSet<_> = outer.then_branch.owned.iter().collect();
        let else_ids: HashSet<_> = outer.else_branch.owned.iter().collect();
        assert!(then_ids.is_disjoint(&else_ids));
        // span, "yes", loop anchor, loop; the loop's item text is per item
        assert_eq!(outer.then_branch.owned.len(), 4);
        assert!(outer.then_branch.owned.contains(&Slot::Loop(LoopId(0))));
        // the nested if and its contents belong to the else branch
        assert!(outer.else_branch.owned.contains(&Slot::If(IfId(1))));
        assert_eq!(r.if_region(IfId(1)).scope.branch, Some((IfId(0), Branch::Else)));
        assert_eq!(outer.then_branch.roots.len(), 2);
    }

    #[test]
    fn test_loop_deps_include_template_reads() {
        let mut comp = component("List");
        comp.state.push(state("items", "string[]", true, Some(array(vec![]))));
        comp.state.push(state("prefix", "string", true, Some(string(">"))));
        comp.view.push(element(
            "ul",
            vec![],
            vec![for_each("item", ident("items"), Some(ident("item")), vec![element(
                "li",
                vec![],
                vec![text_expr(add(ident("prefix"), ident("item")))],
            )])],
        ));
        let (r, _) = regions_of(comp);
        let l = r.loop_region(LoopId(0));
        assert_eq!(l.deps.vars, names_set(&["items", "prefix"]));
        assert_eq!(l.var_ty, Type::String);
        assert_eq!(l.key.as_ref().map(|k| k.ty.clone()), Some(Type::String));
        assert_eq!(l.item_kind, ItemKind::Html);
        assert_eq!(r.bindings[0].scope, Scope::item(LoopId(0)));
        assert_eq!(r.owned_by(Owner::LoopItem(LoopId(0))).len(), 2);
    }

    #[test]
    fn test_impure_key_warns_and_drops_key() {
        let mut comp = component("List");
        comp.state.push(state("items", "int[]", true, Some(array(vec![]))));
        comp.state.push(state("n", "int", true, Some(int(0))));
        comp.view.push(for_each("item", ident("items"), Some(postfix_inc(ident("n"))), vec![text_expr(ident("item"))]));
        let (r, diagnostics) = regions_of(comp);
        assert!(!r.loop_region(LoopId(0)).is_keyed());
        assert_eq!(diagnostics.warnings().len(), 1);
    }

    #[test]
    fn test_component_items_and_loop_chain() {
        let mut row = component("Row");
        row.params.push(param("value", "int"));
        let mut grid = component("Grid");
        grid.view.push(for_range(
            "y",
            int(0),
            int(3),
            vec![element("div", vec![], vec![for_range("x", int(0), ident("y"), vec![child("Row", vec![("value", ident("x"))])])])],
        ));
        let program = program(vec![row, grid]);
        let schema = TypeSchema::empty();
        let env = TypeEnv::new(&program, &schema);
        let mut diagnostics = Diagnostics::new();
        let all = build_program_regions(&program, &env, &mut diagnostics).unwrap();
        let r = &all[1];
        let inner = r.loop_region(LoopId(1));
        assert_eq!(inner.item_kind, ItemKind::Component("Row".into()));
        assert_eq!(inner.scope, Scope::item(LoopId(0)));
        assert_eq!(r.loop_chain(r.instance(InstanceId(0)).scope), vec![LoopId(0), LoopId(1)]);
        // outer loop reads nothing but constants; y is bound by it
        assert!(r.loop_region(LoopId(0)).deps.is_empty());
    }
}
