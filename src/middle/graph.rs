//! Component instantiation graph
//!
//! An edge `A -> B` means A's definition needs B first: A's view
//! instantiates B, A constructs B, or one of A's state variables or
//! parameters is typed by B.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::frontend::ast::*;
use crate::utils::{Error, Result};

#[derive(Debug, Default)]
pub struct ComponentGraph {
    /// Component names in declaration order
    names: Vec<String>,
    /// Component -> components it depends on
    edges: BTreeMap<String, BTreeSet<String>>,
}

impl ComponentGraph {
    pub fn build(program: &Program) -> Self {
        let known: BTreeSet<&str> = program.components.iter().map(|c| c.name.as_str()).collect();
        let mut graph = Self::default();
        for comp in &program.components {
            let mut deps = BTreeSet::new();
            collect_view_deps(&comp.view, &mut deps);
            for v in &comp.state {
                type_dep(&v.ty, &mut deps);
                if let Some(init) = &v.init {
                    collect_construct_deps(init, &mut deps);
                }
            }
            for p in &comp.params {
                type_dep(&p.ty, &mut deps);
            }
            for m in &comp.methods {
                for stmt in &m.body {
                    collect_stmt_deps(stmt, &mut deps);
                }
            }
            deps.retain(|d| known.contains(d.as_str()));
            graph.names.push(comp.name.clone());
            graph.edges.insert(comp.name.clone(), deps);
        }
        graph
    }

    pub fn dependencies(&self, name: &str) -> impl Iterator<Item = &str> {
        self.edges.get(name).into_iter().flatten().map(String::as_str)
    }

    /// Order components so every dependency precedes its dependents.
    ///
    /// Kahn's algorithm; among ready components declaration order wins, so the
    /// result is deterministic.
    pub fn topological_order(&self) -> Result<Vec<String>> {
        let position: HashMap<&str, usize> =
            self.names.iter().enumerate().map(|(i, n)| (n.as_str(), i)).collect();
        let mut in_degree: HashMap<&str, usize> = self
            .names
            .iter()
            .map(|n| (n.as_str(), self.edges.get(n).map(|d| d.len()).unwrap_or(0)))
            .collect();
        let mut ready: BTreeSet<usize> = in_degree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(n, _)| position[n])
            .collect();

        let mut sorted = Vec::with_capacity(self.names.len());
        while let Some(&next) = ready.iter().next() {
            ready.remove(&next);
            let current = self.names[next].as_str();
            sorted.push(current.to_string());
            for (name, deps) in &self.edges {
                if deps.contains(current) {
                    if let Some(d) = in_degree.get_mut(name.as_str()) {
                        *d -= 1;
                        if *d == 0 {
                            ready.insert(position[name.as_str()]);
                        }
                    }
                }
            }
        }

        if sorted.len() != self.names.len() {
            let cycle = self.find_cycle(&sorted);
            return Err(Error::CircularDependency { cycle });
        }
        Ok(sorted)
    }

    /// A cycle among the components that could not be ordered, first name
    /// repeated at the end
    fn find_cycle(&self, sorted: &[String]) -> Vec<String> {
        let remaining: Vec<&str> = self
            .names
            .iter()
            .map(String::as_str)
            .filter(|n| !sorted.iter().any(|s| s == n))
            .collect();
        // every remaining node has an unsorted dependency; walking them must
        // revisit a node
        let mut path: Vec<&str> = Vec::new();
        let mut current = match remaining.first() {
            Some(n) => *n,
            None => return Vec::new(),
        };
        loop {
            if let Some(start) = path.iter().position(|n| *n == current) {
                let mut cycle: Vec<String> = path[start..].iter().map(|s| s.to_string()).collect();
                cycle.push(current.to_string());
                return cycle;
            }
            path.push(current);
            match self.dependencies(current).find(|d| remaining.contains(d)) {
                Some(next) => current = next,
                None => return path.iter().map(|s| s.to_string()).collect(),
            }
        }
    }
}

fn type_dep(ty: &TypeExpr, deps: &mut BTreeSet<String>) {
    match ty {
        TypeExpr::Named(n) => {
            deps.insert(n.clone());
        }
        TypeExpr::Array(e) | TypeExpr::FixedArray(e, _) => type_dep(e, deps),
    }
}

fn collect_view_deps(nodes: &[ViewNode], deps: &mut BTreeSet<String>) {
    for node in nodes {
        match node {
            ViewNode::Text { .. } => {}
            ViewNode::Expr { expr, .. } => collect_construct_deps(expr, deps),
            ViewNode::Element(el) => {
                for attr in &el.attributes {
                    collect_construct_deps(&attr.value, deps);
                }
                collect_view_deps(&el.children, deps);
            }
            ViewNode::Component(inst) => {
                deps.insert(inst.component.clone());
            }
            ViewNode::If { then_children, else_children, .. } => {
                collect_view_deps(then_children, deps);
                collect_view_deps(else_children, deps);
            }
            ViewNode::ForRange { children, .. } | ViewNode::ForEach { children, .. } => {
                collect_view_deps(children, deps)
            }
        }
    }
}

fn collect_stmt_deps(stmt: &Stmt, deps: &mut BTreeSet<String>) {
    match stmt {
        Stmt::VarDecl { ty, init, .. } => {
            if let Some(ty) = ty {
                type_dep(ty, deps);
            }
            if let Some(init) = init {
                collect_construct_deps(init, deps);
            }
        }
        Stmt::Assign { value, .. }
        | Stmt::IndexAssign { value, .. }
        | Stmt::MemberAssign { value, .. }
        | Stmt::Expr { expr: value, .. } => collect_construct_deps(value, deps),
        Stmt::Return { value, .. } => {
            if let Some(v) = value {
                collect_construct_deps(v, deps);
            }
        }
        Stmt::If { then_branch, else_branch, .. } => {
            for s in then_branch.iter().chain(else_branch) {
                collect_stmt_deps(s, deps);
            }
        }
        Stmt::ForRange { body, .. } | Stmt::ForEach { body, .. } | Stmt::Block { stmts: body, .. } => {
            for s in body {
                collect_stmt_deps(s, deps);
            }
        }
    }
}

fn collect_construct_deps(expr: &Expr, deps: &mut BTreeSet<String>) {
    match expr {
        Expr::Construct { component, args, .. } => {
            deps.insert(component.clone());
            for a in args {
                collect_construct_deps(&a.value, deps);
            }
        }
        Expr::Call { callee, args, .. } => {
            collect_construct_deps(callee, deps);
            for a in args {
                collect_construct_deps(&a.value, deps);
            }
        }
        Expr::Binary { left, right, .. } => {
            collect_construct_deps(left, deps);
            collect_construct_deps(right, deps);
        }
        Expr::Ternary { cond, then_expr, else_expr, .. } => {
            collect_construct_deps(cond, deps);
            collect_construct_deps(then_expr, deps);
            collect_construct_deps(else_expr, deps);
        }
        Expr::Array { elements, .. } => {
            for e in elements {
                collect_construct_deps(e, deps);
            }
        }
        Expr::ArrayRepeat { value: inner, .. }
        | Expr::Unary { operand: inner, .. }
        | Expr::Postfix { operand: inner, .. }
        | Expr::Member { object: inner, .. } => collect_construct_deps(inner, deps),
        Expr::Index { array, index, .. } => {
            collect_construct_deps(array, deps);
            collect_construct_deps(index, deps);
        }
        Expr::Str { .. }
        | Expr::Int { .. }
        | Expr::Float { .. }
        | Expr::Bool { .. }
        | Expr::Ident { .. }
        | Expr::EnumAccess { .. } => {}
    }
}

/// Topologically sort the program's components
pub fn topological_sort(program: &Program) -> Result<Vec<String>> {
    ComponentGraph::build(program).topological_order()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use crate::utils::ErrorKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_children_come_first() {
        let mut app = component("App");
        app.view.push(element("div", vec![], vec![child("Header", vec![]), child("List", vec![])]));
        let mut list = component("List");
        list.view.push(for_range("i", int(0), int(3), vec![child("Row", vec![])]));
        let order = topological_sort(&program(vec![app, list, component("Row"), component("Header")])).unwrap();
        assert_eq!(order, vec!["Row", "Header", "List", "App"]);
    }

    #[test]
    fn test_typed_state_creates_edge() {
        let mut app = component("App");
        app.state.push(state("rows", "Row[]", true, None));
        let order = topological_sort(&program(vec![app, component("Row")])).unwrap();
        assert_eq!(order, vec!["Row", "App"]);
    }

    #[test]
    fn test_cycle_is_reported() {
        let mut a = component("A");
        a.view.push(child("B", vec![]));
        let mut b = component("B");
        b.view.push(view_if(boolean(true), vec![child("A", vec![])], vec![]));
        let err = topological_sort(&program(vec![a, b, component("C")])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CircularDependencyError);
        match err {
            Error::CircularDependency { cycle } => assert_eq!(cycle, vec!["A", "B", "A"]),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_self_instantiation_is_a_cycle() {
        let mut tree = component("Tree");
        tree.view.push(child("Tree", vec![]));
        assert!(matches!(
            topological_sort(&program(vec![tree])),
            Err(Error::CircularDependency { .. })
        ));
    }
}
