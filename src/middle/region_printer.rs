//! Region printer
//!
//! Human-readable dump of region tables, for `viewc regions`.

use std::fmt::{self, Write};

use crate::middle::deps::DependencySet;
use crate::middle::regions::*;

/// Pretty printer for region tables
pub struct RegionPrinter {
    output: String,
}

impl RegionPrinter {
    pub fn new() -> Self {
        Self { output: String::new() }
    }

    /// Print the tables of several components
    pub fn print_all(&mut self, all: &[ComponentRegions]) -> String {
        self.output.clear();
        for (i, regions) in all.iter().enumerate() {
            if i > 0 {
                self.output.push('\n');
            }
            // writing into a String cannot fail
            let _ = self.print_component(regions);
        }
        std::mem::take(&mut self.output)
    }

    fn print_component(&mut self, r: &ComponentRegions) -> fmt::Result {
        writeln!(self.output, "component {}", r.component)?;
        writeln!(self.output, "  roots: {}", slot_list(&r.roots))?;

        writeln!(self.output, "  elements:")?;
        for el in &r.elements {
            let what = match &el.kind {
                ElementKind::Tag(tag) => format!("<{}>", tag),
                ElementKind::Text(TextSource::Literal(t)) => format!("text {:?}", t),
                ElementKind::Text(TextSource::Static(e)) => format!("text {}", e),
                ElementKind::Text(TextSource::Bound(b)) => format!("text <- {}", b),
                ElementKind::Anchor => "anchor".to_string(),
            };
            write!(self.output, "    {} {} at {}{}", el.id, what, insertion(&el.at), scope(&el.scope))?;
            for attr in &el.static_attrs {
                write!(self.output, " {}={}", attr.name, attr.value)?;
            }
            if let Some(var) = &el.ref_binding {
                write!(self.output, " &={}", var)?;
            }
            writeln!(self.output)?;
        }

        if !r.bindings.is_empty() {
            writeln!(self.output, "  bindings:")?;
            for b in &r.bindings {
                writeln!(
                    self.output,
                    "    {} {}.{} = {} deps {}{}",
                    b.id,
                    b.element,
                    b.kind,
                    b.expr,
                    deps(&b.deps),
                    scope(&b.scope)
                )?;
            }
        }

        if !r.handlers.is_empty() {
            writeln!(self.output, "  handlers:")?;
            for h in &r.handlers {
                writeln!(self.output, "    {} on{} = {}", h.element, h.event.name(), h.handler)?;
            }
        }

        if !r.instances.is_empty() {
            writeln!(self.output, "  children:")?;
            for c in &r.instances {
                write!(self.output, "    {} {} at {}{}", c.id, c.component, insertion(&c.at), scope(&c.scope))?;
                for p in &c.props {
                    let amp = if p.is_reference { "&" } else { "" };
                    write!(self.output, " {}{}={}", amp, p.name, p.value)?;
                }
                writeln!(self.output)?;
            }
        }

        if !r.loops.is_empty() {
            writeln!(self.output, "  loops:")?;
            for l in &r.loops {
                let source = match &l.source {
                    LoopSource::Range { start, end } => format!("{}..{}", start, end),
                    LoopSource::Each { iterable } => iterable.to_string(),
                };
                write!(self.output, "    {} for {}: {} in {}", l.id, l.var, l.var_ty, source)?;
                match &l.key {
                    Some(key) => write!(self.output, " key {}: {}", key.expr, key.ty)?,
                    None => write!(self.output, " unkeyed")?,
                }
                if let ItemKind::Component(name) = &l.item_kind {
                    write!(self.output, " items {}", name)?;
                }
                writeln!(self.output, " deps {}{}", deps(&l.deps), scope(&l.scope))?;
                writeln!(self.output, "      template {}", slot_list(&l.roots))?;
            }
        }

        if !r.ifs.is_empty() {
            writeln!(self.output, "  ifs:")?;
            for i in &r.ifs {
                writeln!(self.output, "    {} if {} deps {}{}", i.id, i.cond, deps(&i.deps), scope(&i.scope))?;
                writeln!(self.output, "      then {}", slot_list(&i.then_branch.owned))?;
                writeln!(self.output, "      else {}", slot_list(&i.else_branch.owned))?;
            }
        }
        Ok(())
    }
}

impl Default for RegionPrinter {
    fn default() -> Self {
        Self::new()
    }
}

fn slot_list(slots: &[Slot]) -> String {
    let names: Vec<String> = slots.iter().map(|s| s.to_string()).collect();
    format!("[{}]", names.join(", "))
}

fn insertion(at: &InsertionPoint) -> String {
    let parent = at.parent.map(|p| p.to_string()).unwrap_or_else(|| "root".to_string());
    match at.anchor {
        Some(anchor) => format!("{} before {}", parent, anchor),
        None => parent,
    }
}

fn scope(s: &Scope) -> String {
    let mut out = String::new();
    if let Owner::LoopItem(id) = s.owner {
        out.push_str(&format!(" in {} item", id));
    }
    if let Some((id, branch)) = s.branch {
        out.push_str(&format!(" in {}.{}", id, branch));
    }
    out
}

fn deps(d: &DependencySet) -> String {
    let mut names: Vec<String> = d.opaque.iter().cloned().collect();
    names.extend(d.members.iter().map(|m| m.to_string()));
    format!("{{{}}}", names.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::Diagnostics;
    use crate::testing::*;
    use crate::types::{TypeEnv, TypeSchema};

    #[test]
    fn test_prints_counter() {
        let program = program(vec![counter()]);
        let schema = TypeSchema::empty();
        let env = TypeEnv::new(&program, &schema);
        let all = build_program_regions(&program, &env, &mut Diagnostics::new()).unwrap();
        let out = RegionPrinter::new().print_all(&all);
        assert!(out.starts_with("component Counter\n  roots: [el0]\n"));
        assert!(out.contains("    b0 el2.text = count deps {count}\n"));
        assert!(out.contains("    el3 onclick = inc\n"));
        assert!(out.contains("    el4 text \"+\" at el3\n"));
    }
}
