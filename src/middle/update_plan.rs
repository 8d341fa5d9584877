//! Update selection
//!
//! Given the state changes a method performs, pick exactly the component
//! level regions whose dependency sets they trigger. Regions inside a loop
//! item are refreshed by their loop and never selected directly.

use crate::middle::deps::Change;
use crate::middle::regions::{BindingId, ComponentRegions, IfId, InstanceId, LoopId, Owner};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdatePlan {
    pub bindings: Vec<BindingId>,
    /// Child props to push, by prop name
    pub props: Vec<(InstanceId, String)>,
    pub loops: Vec<LoopId>,
    pub ifs: Vec<IfId>,
}

impl UpdatePlan {
    pub fn for_change(regions: &ComponentRegions, change: &Change) -> Self {
        let changes = std::slice::from_ref(change);
        let top = |owner: Owner| owner == Owner::Component;
        let mut plan = UpdatePlan::default();

        for b in &regions.bindings {
            if top(b.scope.owner) && b.deps.triggered_by_any(changes) {
                plan.bindings.push(b.id);
            }
        }
        for inst in &regions.instances {
            if !top(inst.scope.owner) {
                continue;
            }
            for prop in &inst.props {
                if !prop.is_static() && prop.deps.triggered_by_any(changes) {
                    plan.props.push((inst.id, prop.name.clone()));
                }
            }
        }
        for l in &regions.loops {
            if top(l.scope.owner) && l.deps.triggered_by_any(changes) {
                plan.loops.push(l.id);
            }
        }
        for r in &regions.ifs {
            if top(r.scope.owner) && r.deps.triggered_by_any(changes) {
                plan.ifs.push(r.id);
            }
        }
        plan
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty() && self.props.is_empty() && self.loops.is_empty() && self.ifs.is_empty()
    }
}
