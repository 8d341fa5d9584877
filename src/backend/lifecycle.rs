//! Lifecycle plans
//!
//! Structured fragments for everything a component's generated code does:
//! construction, mount, one updater per state change, the sync functions
//! of its ifs and loops, user methods with their update notifications,
//! event handlers and destruction. Backends only render these.

use std::collections::BTreeSet;

use crate::frontend::ast::*;
use crate::frontend::semantic::is_mutating_call;
use crate::middle::deps::{collect_modifications_with, redirect_item_write, Change, ARRAY_MUTATORS};
use crate::middle::regions::*;
use crate::middle::update_plan::UpdatePlan;
use crate::types::{Type, TypeEnv};
use crate::utils::{Result, Span};

#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// Constructor: evaluate a state initializer
    InitState(String),
    /// Constructor: apply a parameter's default
    InitParam(String),
    CreateElement(ElementId),
    /// Text node with its initial content
    CreateText(ElementId),
    CreateAnchor(ElementId),
    SetStaticAttr { element: ElementId, index: usize },
    Insert { node: ElementId, at: InsertionPoint },
    /// Store the element handle into a state variable
    BindRef { element: ElementId, var: String },
    Listen { element: ElementId, event: EventKind },
    Unlisten { element: ElementId, event: EventKind },
    /// Re-evaluate a binding and write it to the DOM
    Apply(BindingId),
    /// Construct, pass props to and mount a child
    CreateChild(InstanceId),
    PushProp { instance: InstanceId, prop: String },
    DestroyChild(InstanceId),
    RemoveElement(ElementId),
    SyncLoop(LoopId),
    /// Destroy every item of a loop
    ClearLoop(LoopId),
    SyncIf(IfId),
    /// Destroy the active branch of an if
    ClearIf(IfId),
    /// Re-insert a node before the caller's target, moving it
    Place(ElementId),
    /// Move every item of a loop, in order
    PlaceLoop(LoopId),
    PlaceChild(InstanceId),
    /// Run only while the branch is live
    Guarded { region: IfId, branch: Branch, ops: Vec<Op> },
    CallMethod(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Updater {
    pub change: Change,
    pub ops: Vec<Op>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfSync {
    pub id: IfId,
    pub create_then: Vec<Op>,
    pub create_else: Vec<Op>,
    pub destroy_then: Vec<Op>,
    pub destroy_else: Vec<Op>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoopSync {
    pub id: LoopId,
    pub keyed: bool,
    pub create_item: Vec<Op>,
    /// Refresh of a matched item in a keyed loop
    pub update_item: Vec<Op>,
    pub destroy_item: Vec<Op>,
    /// Moves the item's DOM nodes, used when keyed items reorder
    pub place_item: Vec<Op>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodPlan {
    pub name: String,
    pub is_init: bool,
    /// Updaters called after the body runs
    pub notify: Vec<Change>,
    /// Reference params written by the method; their owners are told
    pub ref_notify: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HandlerPlan {
    pub element: ElementId,
    pub event: EventKind,
    pub handler: Expr,
    /// Updaters called after an inline handler runs
    pub notify: Vec<Change>,
    /// Loops whose item variable the handler writes; it must write the
    /// backing element, not the item's copy
    pub through_items: Vec<LoopId>,
}

/// An inline handler passed to a child's callback parameter
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackPlan {
    pub instance: InstanceId,
    pub prop: String,
    pub notify: Vec<Change>,
    pub through_items: Vec<LoopId>,
}

/// Per-frame work of a component that ticks
#[derive(Debug, Clone, PartialEq)]
pub struct TickPlan {
    /// The user's `tick`, and whether it takes the frame delta
    pub user: Option<bool>,
    /// Children that tick, wherever they live
    pub children: Vec<InstanceId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComponentPlan {
    pub name: String,
    pub regions: ComponentRegions,
    pub construct: Vec<Op>,
    pub mount: Vec<Op>,
    /// Runs once the component counts as mounted
    pub after_mount: Vec<Op>,
    pub tick: Option<TickPlan>,
    pub updaters: Vec<Updater>,
    pub ifs: Vec<IfSync>,
    pub loops: Vec<LoopSync>,
    pub methods: Vec<MethodPlan>,
    pub handlers: Vec<HandlerPlan>,
    pub callbacks: Vec<CallbackPlan>,
    pub destroy: Vec<Op>,
    /// Moves the component's top-level nodes, for keyed loops of it
    pub place: Vec<Op>,
}

impl ComponentPlan {
    pub fn updater(&self, change: &Change) -> Option<&Updater> {
        self.updaters.iter().find(|u| &u.change == change)
    }

    pub fn method(&self, name: &str) -> Option<&MethodPlan> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn callback(&self, instance: InstanceId, prop: &str) -> Option<&CallbackPlan> {
        self.callbacks.iter().find(|c| c.instance == instance && c.prop == prop)
    }
}

/// Builds the plan of one component from its region tables
pub struct LifecyclePlanner<'a> {
    env: &'a TypeEnv<'a>,
    comp: &'a Component,
    regions: ComponentRegions,
}

impl<'a> LifecyclePlanner<'a> {
    pub fn new(env: &'a TypeEnv<'a>, comp: &'a Component, regions: ComponentRegions) -> Self {
        Self { env, comp, regions }
    }

    /// `ticking` holds the components planned so far that tick
    pub fn plan(self, ticking: &BTreeSet<String>) -> Result<ComponentPlan> {
        let comp = self.comp;
        let mut construct = Vec::new();
        for p in &comp.params {
            if p.default.is_some() {
                construct.push(Op::InitParam(p.name.clone()));
            }
        }
        for v in &comp.state {
            if v.init.is_some() {
                construct.push(Op::InitState(v.name.clone()));
            }
        }

        let mut mount = Vec::new();
        if comp.method(INIT_METHOD).is_some() {
            mount.push(Op::CallMethod(INIT_METHOD.to_string()));
        }
        mount.extend(self.create_scope(Scope::COMPONENT));
        let mut after_mount = Vec::new();
        if comp.method(MOUNT_METHOD).is_some() {
            after_mount.push(Op::CallMethod(MOUNT_METHOD.to_string()));
        }
        let tick = self.tick_plan(ticking);

        let methods = self.method_plans()?;
        let handlers = self.handler_plans()?;
        let callbacks = self.callback_plans()?;
        let updaters = self
            .tracked_changes(&methods, &handlers, &callbacks)
            .into_iter()
            .map(|change| Updater { ops: self.update_ops(&change), change })
            .collect();

        let ifs = self
            .regions
            .ifs
            .iter()
            .map(|r| {
                let then_scope = r.scope.in_branch(r.id, Branch::Then);
                let else_scope = r.scope.in_branch(r.id, Branch::Else);
                IfSync {
                    id: r.id,
                    create_then: self.create_scope(then_scope),
                    create_else: self.create_scope(else_scope),
                    destroy_then: self.destroy_scope(then_scope),
                    destroy_else: self.destroy_scope(else_scope),
                }
            })
            .collect();

        let loops = self
            .regions
            .loops
            .iter()
            .map(|l| {
                let item = Scope::item(l.id);
                LoopSync {
                    id: l.id,
                    keyed: l.is_keyed(),
                    create_item: self.create_scope(item),
                    update_item: self.refresh_owner(Owner::LoopItem(l.id)),
                    destroy_item: self.destroy_scope(item),
                    place_item: self.place_scope(item),
                }
            })
            .collect();

        let destroy = self.destroy_scope(Scope::COMPONENT);
        let place = self.place_scope(Scope::COMPONENT);
        log::debug!("{}: {} mount ops, {} destroy ops", comp.name, mount.len(), destroy.len());

        Ok(ComponentPlan {
            name: comp.name.clone(),
            construct,
            mount,
            after_mount,
            tick,
            updaters,
            ifs,
            loops,
            methods,
            handlers,
            callbacks,
            destroy,
            place,
            regions: self.regions,
        })
    }

    // ==================== Creation and destruction ====================

    /// Ops creating everything directly in `scope`, in creation order.
    /// Nested branches and loop items are created by their syncs.
    fn create_scope(&self, scope: Scope) -> Vec<Op> {
        let r = &self.regions;
        let mut ops = Vec::new();
        for slot in r.slots_in(scope) {
            match slot {
                Slot::Element(id) => {
                    let el = r.element(id);
                    match &el.kind {
                        ElementKind::Tag(_) => {
                            ops.push(Op::CreateElement(id));
                            for index in 0..el.static_attrs.len() {
                                ops.push(Op::SetStaticAttr { element: id, index });
                            }
                            for b in r.bindings.iter().filter(|b| b.element == id) {
                                ops.push(Op::Apply(b.id));
                            }
                            for h in r.handlers_for(id) {
                                ops.push(Op::Listen { element: id, event: h.event });
                            }
                            if let Some(var) = &el.ref_binding {
                                ops.push(Op::BindRef { element: id, var: var.clone() });
                            }
                        }
                        ElementKind::Text(_) => ops.push(Op::CreateText(id)),
                        ElementKind::Anchor => ops.push(Op::CreateAnchor(id)),
                    }
                    ops.push(Op::Insert { node: id, at: el.at });
                }
                Slot::Instance(id) => ops.push(Op::CreateChild(id)),
                Slot::Loop(id) => ops.push(Op::SyncLoop(id)),
                Slot::If(id) => ops.push(Op::SyncIf(id)),
            }
        }
        ops
    }

    /// Ops tearing down `scope` in reverse creation order. Only nodes whose
    /// DOM parent lies outside the scope are detached; their subtrees go
    /// with them.
    fn destroy_scope(&self, scope: Scope) -> Vec<Op> {
        let r = &self.regions;
        let slots = r.slots_in(scope);
        let inside = |id: ElementId| slots.contains(&Slot::Element(id));
        let mut ops = Vec::new();
        for slot in slots.iter().rev() {
            match *slot {
                Slot::Element(id) => {
                    for h in r.handlers_for(id) {
                        ops.push(Op::Unlisten { element: id, event: h.event });
                    }
                    let el = r.element(id);
                    if !el.at.parent.map(inside).unwrap_or(false) {
                        ops.push(Op::RemoveElement(id));
                    }
                }
                Slot::Instance(id) => ops.push(Op::DestroyChild(id)),
                Slot::Loop(id) => ops.push(Op::ClearLoop(id)),
                Slot::If(id) => ops.push(Op::ClearIf(id)),
            }
        }
        ops
    }

    /// Ops moving the top-level DOM nodes of `scope`, in document order.
    /// Branch contents and loop items sit before their anchor.
    fn place_scope(&self, scope: Scope) -> Vec<Op> {
        let r = &self.regions;
        let slots = r.slots_in(scope);
        let anchors: BTreeSet<ElementId> =
            r.ifs.iter().map(|i| i.anchor).chain(r.loops.iter().map(|l| l.anchor)).collect();
        let top = |id: ElementId| !r.element(id).at.parent.map(|p| slots.contains(&Slot::Element(p))).unwrap_or(false);
        let mut ops = Vec::new();
        for slot in slots.iter().copied() {
            match slot {
                Slot::Element(id) if top(id) && !anchors.contains(&id) => ops.push(Op::Place(id)),
                Slot::Element(_) => {}
                Slot::Instance(id) if top_instance(r, id, &slots) => ops.push(Op::PlaceChild(id)),
                Slot::Instance(_) => {}
                Slot::Loop(id) => {
                    let l = r.loop_region(id);
                    if top(l.anchor) {
                        ops.push(Op::PlaceLoop(id));
                        ops.push(Op::Place(l.anchor));
                    }
                }
                Slot::If(id) => {
                    let region = r.if_region(id);
                    if top(region.anchor) {
                        for branch in [Branch::Then, Branch::Else] {
                            let inner = self.place_scope(region.scope.in_branch(id, branch));
                            if !inner.is_empty() {
                                ops.push(Op::Guarded { region: id, branch, ops: inner });
                            }
                        }
                        ops.push(Op::Place(region.anchor));
                    }
                }
            }
        }
        ops
    }

    // ==================== Updates ====================

    /// Re-evaluate everything a changed state variable reaches
    fn update_ops(&self, change: &Change) -> Vec<Op> {
        let plan = UpdatePlan::for_change(&self.regions, change);
        let r = &self.regions;
        let mut ops = Vec::new();
        for id in plan.ifs {
            ops.push(guard(r.if_region(id).scope, Op::SyncIf(id)));
        }
        for id in plan.bindings {
            ops.push(guard(r.binding(id).scope, Op::Apply(id)));
        }
        for (instance, prop) in plan.props {
            ops.push(guard(r.instance(instance).scope, Op::PushProp { instance, prop }));
        }
        for id in plan.loops {
            ops.push(guard(r.loop_region(id).scope, Op::SyncLoop(id)));
        }
        ops
    }

    /// Refresh of everything a loop item owns, for matched keyed items
    fn refresh_owner(&self, owner: Owner) -> Vec<Op> {
        let r = &self.regions;
        let mut ops = Vec::new();
        for region in r.ifs.iter().filter(|i| i.scope.owner == owner) {
            ops.push(guard(region.scope, Op::SyncIf(region.id)));
        }
        for b in r.bindings.iter().filter(|b| b.scope.owner == owner) {
            ops.push(guard(b.scope, Op::Apply(b.id)));
        }
        for inst in r.instances.iter().filter(|i| i.scope.owner == owner) {
            for prop in inst.props.iter().filter(|p| !p.is_static()) {
                ops.push(guard(inst.scope, Op::PushProp { instance: inst.id, prop: prop.name.clone() }));
            }
        }
        for l in r.loops.iter().filter(|l| l.scope.owner == owner) {
            ops.push(guard(l.scope, Op::SyncLoop(l.id)));
        }
        ops
    }

    /// Changes that get an updater: every mutable state variable, every
    /// parameter, and whatever member changes methods and handlers perform
    fn tracked_changes(
        &self,
        methods: &[MethodPlan],
        handlers: &[HandlerPlan],
        callbacks: &[CallbackPlan],
    ) -> BTreeSet<Change> {
        let mut changes = BTreeSet::new();
        for v in self.comp.state.iter().filter(|v| v.mutable) {
            changes.insert(Change::Var(v.name.clone()));
        }
        for p in self.comp.params.iter().filter(|p| !p.is_callback()) {
            changes.insert(Change::Var(p.name.clone()));
        }
        for m in methods {
            changes.extend(m.notify.iter().cloned());
        }
        for h in handlers {
            changes.extend(h.notify.iter().cloned());
        }
        for c in callbacks {
            changes.extend(c.notify.iter().cloned());
        }
        changes
    }

    fn tick_plan(&self, ticking: &BTreeSet<String>) -> Option<TickPlan> {
        let user = self.comp.method(TICK_METHOD).map(|m| !m.params.is_empty());
        let children: Vec<InstanceId> =
            self.regions.instances.iter().filter(|i| ticking.contains(&i.component)).map(|i| i.id).collect();
        if user.is_none() && children.is_empty() {
            return None;
        }
        Some(TickPlan { user, children })
    }

    // ==================== Methods and handlers ====================

    fn method_plans(&self) -> Result<Vec<MethodPlan>> {
        let mut plans = Vec::with_capacity(self.comp.methods.len());
        for m in &self.comp.methods {
            let notify = self.writes(&m.body, m.span)?;
            let ref_notify = self
                .comp
                .params
                .iter()
                .filter(|p| p.is_reference && notify.iter().any(|c| c.var() == p.name))
                .map(|p| p.name.clone())
                .collect();
            let is_init = m.name == INIT_METHOD;
            plans.push(MethodPlan {
                name: m.name.clone(),
                is_init,
                // nothing is mounted yet when init runs
                notify: if is_init { Vec::new() } else { notify },
                ref_notify,
            });
        }
        Ok(plans)
    }

    fn handler_plans(&self) -> Result<Vec<HandlerPlan>> {
        let mut plans = Vec::with_capacity(self.regions.handlers.len());
        for h in &self.regions.handlers {
            let (notify, through_items) = match &h.handler {
                // method wrappers notify for themselves
                Expr::Ident { .. } => (Vec::new(), Vec::new()),
                expr => self.inline_writes(expr, h.scope)?,
            };
            plans.push(HandlerPlan {
                element: h.element,
                event: h.event,
                handler: h.handler.clone(),
                notify,
                through_items,
            });
        }
        Ok(plans)
    }

    fn callback_plans(&self) -> Result<Vec<CallbackPlan>> {
        let mut plans = Vec::new();
        for inst in &self.regions.instances {
            let Some(target) = self.env.component(&inst.component) else { continue };
            for prop in &inst.props {
                let inline = !matches!(prop.value, Expr::Ident { .. });
                if !inline || !target.param(&prop.name).is_some_and(|p| p.is_callback()) {
                    continue;
                }
                let (notify, through_items) = self.inline_writes(&prop.value, inst.scope)?;
                plans.push(CallbackPlan { instance: inst.id, prop: prop.name.clone(), notify, through_items });
            }
        }
        Ok(plans)
    }

    fn inline_writes(&self, expr: &Expr, scope: Scope) -> Result<(Vec<Change>, Vec<LoopId>)> {
        let stmts = [Stmt::Expr { expr: expr.clone(), span: expr.span() }];
        self.writes_in(&stmts, &self.regions.loop_chain(scope), expr.span())
    }

    /// Changes to the component's own state and params made by `stmts`
    fn writes(&self, stmts: &[Stmt], span: Span) -> Result<Vec<Change>> {
        self.writes_in(stmts, &[], span).map(|(changes, _)| changes)
    }

    /// Like `writes`, for code running inside the items of `chain`. A write
    /// through an item variable lands in its iterable; range variables are
    /// locals. Also returns the loops written through, outermost first.
    fn writes_in(&self, stmts: &[Stmt], chain: &[LoopId], span: Span) -> Result<(Vec<Change>, Vec<LoopId>)> {
        let mut member_types = Vec::new();
        for p in self.comp.params.iter().filter(|p| !p.is_callback()) {
            member_types.push((p.name.as_str(), self.env.normalize(&p.ty, Some(self.comp), span)?));
        }
        for v in &self.comp.state {
            member_types.push((v.name.as_str(), self.env.normalize(&v.ty, Some(self.comp), span)?));
        }
        let mut receivers = member_types.clone();
        for &id in chain {
            let l = self.regions.loop_region(id);
            receivers.push((l.var.as_str(), l.var_ty.clone()));
        }
        let env = self.env;
        // innermost binding wins
        let mutates = |root: &str, method: &str| match receivers.iter().rev().find(|(n, _)| *n == root) {
            Some((_, Type::Struct(_))) => ARRAY_MUTATORS.contains(&method),
            Some((_, ty)) => is_mutating_call(env, ty, method),
            None => false,
        };
        let mut changes = collect_modifications_with(stmts, &mutates);

        let mut through = Vec::new();
        for &id in chain.iter().rev() {
            let l = self.regions.loop_region(id);
            if !changes.iter().any(|c| c.var() == l.var) {
                continue;
            }
            match &l.source {
                LoopSource::Each { iterable } => {
                    through.push(id);
                    changes = changes.into_iter().filter_map(|c| redirect_item_write(c, &l.var, iterable)).collect();
                }
                LoopSource::Range { .. } => changes.retain(|c| c.var() != l.var),
            }
        }
        through.reverse();
        let changes = changes.into_iter().filter(|c| member_types.iter().any(|(n, _)| *n == c.var())).collect();
        Ok((changes, through))
    }
}

fn top_instance(r: &ComponentRegions, id: InstanceId, slots: &[Slot]) -> bool {
    match r.instance(id).at.parent {
        Some(p) => !slots.contains(&Slot::Element(p)),
        None => true,
    }
}

fn guard(scope: Scope, op: Op) -> Op {
    match scope.branch {
        Some((region, branch)) => Op::Guarded { region, branch, ops: vec![op] },
        None => op,
    }
}

/// Plan every component, in the given order
pub fn plan_components<'a>(
    program: &'a Program,
    env: &'a TypeEnv<'a>,
    order: &[String],
    mut regions: Vec<ComponentRegions>,
) -> Result<Vec<ComponentPlan>> {
    let mut plans = Vec::with_capacity(order.len());
    let mut ticking = BTreeSet::new();
    for name in order {
        let Some(comp) = program.component(name) else { continue };
        let Some(pos) = regions.iter().position(|r| &r.component == name) else { continue };
        let tables = regions.swap_remove(pos);
        let plan = LifecyclePlanner::new(env, comp, tables).plan(&ticking)?;
        if plan.tick.is_some() {
            ticking.insert(plan.name.clone());
        }
        plans.push(plan);
    }
    Ok(plans)
}
