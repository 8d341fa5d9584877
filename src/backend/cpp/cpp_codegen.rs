//! C++ Code Generator
//!
//! Renders lifecycle plans as one C++ translation unit for the webcc host
//! runtime: a small prelude, forward declarations, struct and enum
//! definitions, one struct per component in dependency order, and the
//! application's event dispatch table.

use crate::backend::codegen::CodeGen;
use crate::backend::cpp::expr::{cpp_type, string_literal, ExprRenderer};
use crate::backend::lifecycle::*;
use crate::frontend::ast::*;
use crate::middle::deps::{root_var, Change};
use crate::middle::regions::*;
use crate::types::TypeEnv;
use crate::utils::{Error, Result};

const PRELUDE: &str = r#"#include <webcc/webcc.h>
#include <array>
#include <cstdint>
#include <functional>
#include <memory>
#include <string>
#include <type_traits>
#include <unordered_map>
#include <unordered_set>
#include <utility>
#include <vector>

namespace viewc {

template <typename T>
std::string str(const T& v) {
    if constexpr (std::is_same_v<T, std::string>) {
        return v;
    } else if constexpr (std::is_same_v<T, bool>) {
        return v ? "true" : "false";
    } else if constexpr (std::is_enum_v<T>) {
        return std::to_string(static_cast<int64_t>(v));
    } else {
        return std::to_string(v);
    }
}

template <typename A, typename B>
auto add(const A& a, const B& b) {
    if constexpr (std::is_same_v<A, std::string> || std::is_same_v<B, std::string>) {
        return str(a) + str(b);
    } else {
        return a + b;
    }
}

template <size_t N, typename T>
std::array<T, N> repeat(const T& v) {
    std::array<T, N> a;
    a.fill(v);
    return a;
}

template <typename T> int32_t size(std::vector<T>& v) { return static_cast<int32_t>(v.size()); }
template <typename T, size_t N> int32_t size(std::array<T, N>&) { return static_cast<int32_t>(N); }
template <typename H> auto size(H& h) { return h.size(); }
inline int32_t length(const std::string& s) { return static_cast<int32_t>(s.size()); }
template <typename H> auto length(H& h) { return h.length(); }
template <typename T, typename V> void push(std::vector<T>& v, V&& x) { v.push_back(std::forward<V>(x)); }
template <typename H, typename... A> auto push(H& h, A&&... a) { return h.push(std::forward<A>(a)...); }
template <typename T> void pop(std::vector<T>& v) { if (!v.empty()) v.pop_back(); }
template <typename H> auto pop(H& h) { return h.pop(); }
template <typename T> void clear(std::vector<T>& v) { v.clear(); }
template <typename H> auto clear(H& h) { return h.clear(); }
template <typename T> void remove(std::vector<T>& v, int32_t i) {
    if (i >= 0 && i < static_cast<int32_t>(v.size())) v.erase(v.begin() + i);
}
template <typename H, typename... A> auto remove(H& h, A&&... a) { return h.remove(std::forward<A>(a)...); }

// marks a longest run of ascending non-negative entries of `seq`
inline std::vector<bool> lis(const std::vector<int64_t>& seq) {
    std::vector<size_t> tails;
    std::vector<int64_t> prev(seq.size(), -1);
    for (size_t i = 0; i < seq.size(); i++) {
        if (seq[i] < 0) continue;
        size_t lo = 0, hi = tails.size();
        while (lo < hi) {
            size_t mid = (lo + hi) / 2;
            if (seq[tails[mid]] < seq[i]) lo = mid + 1; else hi = mid;
        }
        if (lo > 0) prev[i] = static_cast<int64_t>(tails[lo - 1]);
        if (lo == tails.size()) tails.push_back(i); else tails[lo] = i;
    }
    std::vector<bool> keep(seq.size(), false);
    if (tails.empty()) return keep;
    for (int64_t i = static_cast<int64_t>(tails.back()); i >= 0; i = prev[i]) keep[i] = true;
    return keep;
}

inline void insert(webcc::handle parent, webcc::handle node, webcc::handle before) {
    if (before.is_valid()) {
        webcc::dom::insert_before(parent, node, before);
    } else {
        webcc::dom::append_child(parent, node);
    }
}

template <typename... Args>
struct Dispatcher {
    std::unordered_map<int32_t, std::function<void(Args...)>> handlers;
    void set(webcc::handle h, std::function<void(Args...)> f) { handlers[static_cast<int32_t>(h)] = std::move(f); }
    void remove(webcc::handle h) { handlers.erase(static_cast<int32_t>(h)); }
    void dispatch(webcc::handle h, Args... args) {
        auto it = handlers.find(static_cast<int32_t>(h));
        if (it == handlers.end()) return;
        // the handler may unregister itself
        auto f = it->second;
        f(args...);
    }
};

} // namespace viewc

viewc::Dispatcher<> g_dispatcher;
viewc::Dispatcher<const std::string&> g_input_dispatcher;
viewc::Dispatcher<const std::string&> g_change_dispatcher;
viewc::Dispatcher<int32_t> g_keydown_dispatcher;
"#;

/// Emission context: the component and the loop items in reach
struct Ctx<'p> {
    plan: &'p ComponentPlan,
    comp: &'p Component,
    /// Items passed in as `_itN` references, outermost first
    chain: Vec<LoopId>,
}

impl<'p> Ctx<'p> {
    fn regions(&self) -> &'p ComponentRegions {
        &self.plan.regions
    }

    fn with_chain(&self, chain: Vec<LoopId>) -> Ctx<'p> {
        Ctx { plan: self.plan, comp: self.comp, chain }
    }

    fn loop_vars(&self, access: impl Fn(LoopId) -> String) -> Vec<(String, String)> {
        self.chain.iter().map(|&id| (self.regions().loop_region(id).var.clone(), access(id))).collect()
    }
}

/// C++ code generator
pub struct CppCodeGen<'a> {
    program: &'a Program,
    env: &'a TypeEnv<'a>,
    /// Component mounted into the page body; defaults to the last one
    root: Option<String>,
    output: String,
    indent: usize,
}

impl<'a> CppCodeGen<'a> {
    pub fn new(program: &'a Program, env: &'a TypeEnv<'a>) -> Self {
        Self { program, env, root: None, output: String::new(), indent: 0 }
    }

    pub fn with_root(mut self, root: Option<String>) -> Self {
        self.root = root;
        self
    }

    /// Write indented line
    fn writeln(&mut self, line: &str) {
        for _ in 0..self.indent {
            self.output.push_str("    ");
        }
        self.output.push_str(line);
        self.output.push('\n');
    }

    fn open(&mut self, line: &str) {
        self.writeln(line);
        self.indent += 1;
    }

    fn close(&mut self, line: &str) {
        self.indent -= 1;
        self.writeln(line);
    }

    fn renderer<'r>(&self, cx: &'r Ctx<'_>) -> ExprRenderer<'r>
    where
        'a: 'r,
    {
        ExprRenderer::new(self.env, cx.comp).with_loop_vars(cx.loop_vars(|id| format!("_it{}._value", id.0)))
    }

    fn component_of(&self, name: &str) -> Result<&'a Component> {
        self.program.component(name).ok_or_else(|| Error::Codegen(format!("no component named '{}'", name)))
    }

    // ==================== Declarations ====================

    fn generate_enum(&mut self, def: &EnumDef) {
        self.writeln(&format!("enum class {} : int32_t {{ {} }};", def.name, def.variants.join(", ")));
    }

    fn generate_struct(&mut self, def: &StructDef, local: Option<&Component>) -> Result<()> {
        self.open(&format!("struct {} {{", def.name));
        for field in &def.fields {
            let ty = cpp_type(&self.env.normalize(&field.ty, local, def.span)?);
            self.writeln(&format!("{} {}{{}};", ty, field.name));
        }
        self.close("};");
        Ok(())
    }

    /// Handles, if states, loop vectors and children stored per owner
    fn storage_fields(&mut self, r: &ComponentRegions, owner: Owner) {
        for el in r.elements.iter().filter(|e| e.scope.owner == owner) {
            self.writeln(&format!("webcc::handle _el{};", el.id.0));
        }
        for i in r.ifs.iter().filter(|i| i.scope.owner == owner) {
            self.writeln(&format!("int8_t _if{} = -1;", i.id.0));
        }
        for l in r.loops.iter().filter(|l| l.scope.owner == owner) {
            self.writeln(&format!("std::vector<std::unique_ptr<_Loop{}Item>> _loop{};", l.id.0, l.id.0));
        }
        for c in r.instances.iter().filter(|c| c.scope.owner == owner) {
            self.writeln(&format!("std::unique_ptr<{}> _child{};", c.component, c.id.0));
        }
    }

    fn generate_component(&mut self, plan: &ComponentPlan) -> Result<()> {
        let comp = self.component_of(&plan.name)?;
        let cx = Ctx { plan, comp, chain: Vec::new() };
        let r = &plan.regions;
        log::debug!("emitting {}", comp.name);

        self.open(&format!("struct {} {{", comp.name));
        for e in &comp.enums {
            self.generate_enum(e);
        }
        for s in &comp.structs {
            self.generate_struct(s, Some(comp))?;
        }
        // inner loops first, their item vectors live in outer items
        for l in r.loops.iter().rev() {
            self.open(&format!("struct _Loop{}Item {{", l.id.0));
            self.writeln(&format!("{} _value{{}};", cpp_type(&l.var_ty)));
            self.writeln("size_t _index = 0;");
            if let Some(key) = &l.key {
                self.writeln(&format!("{} _key{{}};", cpp_type(&key.ty)));
                self.writeln("webcc::handle _start;");
            }
            self.storage_fields(r, Owner::LoopItem(l.id));
            self.close("};");
        }

        self.writeln("webcc::handle _parent;");
        self.writeln("webcc::handle _anchor;");
        self.writeln("bool _mounted = false;");
        for p in &comp.params {
            let ty = self.env.normalize(&p.ty, Some(comp), p.span)?;
            if let Some(args) = &p.callback {
                let mut params = Vec::with_capacity(args.len());
                for a in args {
                    params.push(cpp_type(&self.env.normalize(a, Some(comp), p.span)?));
                }
                self.writeln(&format!("std::function<void({})> {};", params.join(", "), p.name));
            } else if p.is_reference {
                self.writeln(&format!("{}* {} = nullptr;", cpp_type(&ty), p.name));
                self.writeln(&format!("std::function<void()> {};", change_hook(&p.name)));
            } else {
                self.writeln(&format!("{} {}{{}};", cpp_type(&ty), p.name));
            }
        }
        for v in &comp.state {
            let ty = self.env.normalize(&v.ty, Some(comp), v.span)?;
            self.writeln(&format!("{} {}{{}};", cpp_type(&ty), v.name));
        }
        self.storage_fields(r, Owner::Component);
        self.writeln("");

        self.open(&format!("{}() {{", comp.name));
        self.ops(&cx, &plan.construct)?;
        self.close("}");
        self.writeln("");

        self.open("void _mount(webcc::handle parent, webcc::handle anchor = webcc::handle()) {");
        self.writeln("_parent = parent;");
        self.writeln("_anchor = anchor;");
        self.ops(&cx, &plan.mount)?;
        self.writeln("_mounted = true;");
        self.ops(&cx, &plan.after_mount)?;
        self.close("}");
        self.writeln("");

        self.open("void _destroy() {");
        self.ops(&cx, &plan.destroy)?;
        self.writeln("_mounted = false;");
        self.close("}");
        self.writeln("");

        self.open("void _move_before(webcc::handle _into, webcc::handle _before) {");
        self.ops(&cx, &plan.place)?;
        self.close("}");

        if let Some(tick) = &plan.tick {
            self.writeln("");
            self.generate_tick(r, tick);
        }

        for u in &plan.updaters {
            self.writeln("");
            self.open(&format!("void {}() {{", updater_name(&u.change)));
            self.writeln("if (!_mounted) return;");
            self.ops(&cx, &u.ops)?;
            self.close("}");
        }

        for m in &comp.methods {
            self.writeln("");
            self.generate_method(&cx, m)?;
        }
        for s in &plan.ifs {
            self.writeln("");
            self.generate_if_sync(&cx, s)?;
        }
        for s in &plan.loops {
            self.writeln("");
            self.generate_loop_sync(&cx, s)?;
        }
        self.close("};");
        Ok(())
    }

    fn generate_tick(&mut self, r: &ComponentRegions, tick: &TickPlan) {
        self.open("void _tick(float dt) {");
        self.writeln("if (!_mounted) return;");
        match tick.user {
            Some(true) => self.writeln(&format!("{}(dt);", TICK_METHOD)),
            Some(false) => self.writeln(&format!("{}();", TICK_METHOD)),
            None => {}
        }
        for &id in &tick.children {
            // children in loop items are reached through the item vectors
            let mut line = String::new();
            let mut owner = String::new();
            for k in r.loop_chain(r.instance(id).scope) {
                line.push_str(&format!("for (auto& _t{k} : {owner}_loop{k}) ", k = k.0, owner = owner));
                owner = format!("_t{}->", k.0);
            }
            line.push_str(&format!("if ({o}_child{i}) {o}_child{i}->_tick(dt);", o = owner, i = id.0));
            self.writeln(&line);
        }
        self.close("}");
    }

    fn generate_method(&mut self, cx: &Ctx<'_>, m: &Method) -> Result<()> {
        let comp = cx.comp;
        let plan = cx.plan.method(&m.name);
        let ret = match &m.ret {
            Some(t) => cpp_type(&self.env.normalize(t, Some(comp), m.span)?),
            None => "void".to_string(),
        };
        let mut params = Vec::with_capacity(m.params.len());
        for p in &m.params {
            params.push(format!("{} {}", cpp_type(&self.env.normalize(&p.ty, Some(comp), m.span)?), p.name));
        }
        let params = params.join(", ");
        let wrapped = plan.map(|p| !p.notify.is_empty() || !p.ref_notify.is_empty()).unwrap_or(false);
        let body_name = if wrapped { format!("_{}_body", m.name) } else { m.name.clone() };

        self.open(&format!("{} {}({}) {{", ret, body_name, params));
        let mut r = ExprRenderer::new(self.env, comp).with_locals(m.params.iter().map(|p| p.name.clone()));
        r.block(&mut self.output, &m.body, self.indent)?;
        self.close("}");

        if let (true, Some(plan)) = (wrapped, plan) {
            let args: Vec<&str> = m.params.iter().map(|p| p.name.as_str()).collect();
            let call = format!("{}({})", body_name, args.join(", "));
            self.writeln("");
            self.open(&format!("{} {}({}) {{", ret, m.name, params));
            if ret == "void" {
                self.writeln(&format!("{};", call));
            } else {
                self.writeln(&format!("{} _r = {};", ret, call));
            }
            for change in &plan.notify {
                self.writeln(&format!("{}();", updater_name(change)));
            }
            for name in &plan.ref_notify {
                let hook = change_hook(name);
                self.writeln(&format!("if ({h}) {h}();", h = hook));
            }
            if ret != "void" {
                self.writeln("return _r;");
            }
            self.close("}");
        }
        Ok(())
    }

    // ==================== Ifs ====================

    fn generate_if_sync(&mut self, cx: &Ctx<'_>, sync: &IfSync) -> Result<()> {
        let region = cx.regions().if_region(sync.id);
        let cx = cx.with_chain(cx.regions().loop_chain(region.scope));
        let id = sync.id.0;
        let state = if_state(cx.regions(), sync.id);
        let params = chain_params(&cx.chain, &[]);
        let args = chain_args(&cx.chain, &[]);
        let cond = self.renderer(&cx).expr(&region.cond);

        self.open(&format!("void _sync_if_{}({}) {{", id, params));
        self.writeln(&format!("int8_t _next = {} ? 0 : 1;", cond));
        self.writeln(&format!("if ({} == _next) return;", state));
        self.writeln(&format!("_clear_if_{}({});", id, args));
        self.writeln(&format!("{} = _next;", state));
        self.open("if (_next == 0) {");
        self.ops(&cx, &sync.create_then)?;
        self.close("} else {");
        self.indent += 1;
        self.ops(&cx, &sync.create_else)?;
        self.close("}");
        self.close("}");
        self.writeln("");

        self.open(&format!("void _clear_if_{}({}) {{", id, params));
        self.open(&format!("if ({} == 0) {{", state));
        self.ops(&cx, &sync.destroy_then)?;
        self.close(&format!("}} else if ({} == 1) {{", state));
        self.indent += 1;
        self.ops(&cx, &sync.destroy_else)?;
        self.close("}");
        self.writeln(&format!("{} = -1;", state));
        self.close("}");
        Ok(())
    }

    // ==================== Loops ====================

    fn generate_loop_sync(&mut self, cx: &Ctx<'_>, sync: &LoopSync) -> Result<()> {
        let l = cx.regions().loop_region(sync.id);
        let outer = cx.with_chain(cx.regions().loop_chain(l.scope));
        let mut item_chain = outer.chain.clone();
        item_chain.push(l.id);
        let inner = cx.with_chain(item_chain.clone());

        let id = l.id.0;
        let item_type = format!("_Loop{}Item", id);
        let item_param = format!("{}& _it{}", item_type, id);
        let params = chain_params(&outer.chain, &[]);
        let args = chain_args(&outer.chain, &[]);
        let item_args = chain_args(&outer.chain, &[format!("*_items[_i]")]);
        let storage = format!("{}_loop{}", prefix(l.scope), id);

        // iteration with the loop variable bound to `_v`
        let mut vars = outer.loop_vars(|k| format!("_it{}._value", k.0));
        vars.push((l.var.clone(), "_v".to_string()));
        let source = ExprRenderer::new(self.env, cx.comp).with_loop_vars(vars);
        let header = match &l.source {
            LoopSource::Range { start, end } => format!(
                "for ({} _v = {}; _v < {}; _v++) {{",
                cpp_type(&l.var_ty),
                source.expr(start),
                source.expr(end)
            ),
            LoopSource::Each { iterable } => format!("for (const auto& _v : {}) {{", source.expr(iterable)),
        };

        self.open(&format!("void _sync_loop_{}({}) {{", id, params));
        match &l.key {
            Some(key) => {
                let key_ty = cpp_type(&key.ty);
                let value_ty = cpp_type(&l.var_ty);
                let key_expr = source.expr(&key.expr);
                let into = match l.at.parent {
                    Some(p) => element_ref(cx.regions(), p),
                    None => "_parent".to_string(),
                };
                let anchor = element_ref(cx.regions(), l.anchor);
                self.writeln(&format!("auto& _items = {};", storage));
                self.writeln(&format!("std::vector<{}> _keys;", key_ty));
                self.writeln(&format!("std::vector<{}> _values;", value_ty));
                self.writeln(&format!("std::unordered_set<{}> _seen;", key_ty));
                self.open(&header);
                self.writeln(&format!("{} _k = {};", key_ty, key_expr));
                self.open("if (!_seen.insert(_k).second) {");
                let message = format!("viewc: duplicate key in {} loop {}", cx.comp.name, id);
                self.writeln(&format!("webcc::system::log({});", string_literal(&message)));
                self.writeln("return;");
                self.close("}");
                self.writeln("_keys.push_back(_k);");
                self.writeln("_values.push_back(_v);");
                self.close("}");
                self.writeln(&format!("std::unordered_map<{}, size_t> _old;", key_ty));
                self.writeln("for (size_t _i = 0; _i < _items.size(); _i++) _old.emplace(_items[_i]->_key, _i);");
                self.open("for (size_t _i = _items.size(); _i-- > 0;) {");
                self.writeln(&format!(
                    "if (!_seen.count(_items[_i]->_key)) _destroy_loop{}_item({});",
                    id, item_args
                ));
                self.close("}");
                self.writeln(&format!("std::vector<std::unique_ptr<{}>> _next;", item_type));
                self.writeln("_next.reserve(_keys.size());");
                // old position of each item, -1 for new ones
                self.writeln("std::vector<int64_t> _from;");
                self.writeln("_from.reserve(_keys.size());");
                self.open("for (size_t _i = 0; _i < _keys.size(); _i++) {");
                self.writeln("auto _found = _old.find(_keys[_i]);");
                self.open("if (_found != _old.end()) {");
                self.writeln("auto _item = std::move(_items[_found->second]);");
                self.writeln("_item->_value = _values[_i];");
                self.writeln("_item->_index = _i;");
                self.writeln(&format!("_update_loop{}_item({});", id, chain_args(&outer.chain, &["*_item".to_string()])));
                self.writeln("_from.push_back(static_cast<int64_t>(_found->second));");
                self.writeln("_next.push_back(std::move(_item));");
                self.close("} else {");
                self.indent += 1;
                self.writeln(&format!("auto _item = std::make_unique<{}>();", item_type));
                self.writeln("_item->_key = _keys[_i];");
                self.writeln("_item->_value = _values[_i];");
                self.writeln("_item->_index = _i;");
                self.writeln(&format!("_create_loop{}_item({});", id, chain_args(&outer.chain, &["*_item".to_string()])));
                self.writeln("_from.push_back(-1);");
                self.writeln("_next.push_back(std::move(_item));");
                self.close("}");
                self.close("}");
                self.writeln("_items = std::move(_next);");
                // items on the longest ascending run of old positions stay put
                self.writeln("auto _keep = viewc::lis(_from);");
                self.writeln(&format!("webcc::handle _before = {};", anchor));
                self.open("for (size_t _i = _items.size(); _i-- > 0;) {");
                self.writeln(&format!(
                    "if (!_keep[_i]) _place_loop{}_item({});",
                    id,
                    chain_args(&outer.chain, &["*_items[_i]".to_string(), into, "_before".to_string()])
                ));
                self.writeln("_before = _items[_i]->_start;");
                self.close("}");
            }
            None => {
                self.writeln(&format!("_clear_loop_{}({});", id, args));
                self.writeln(&format!("auto& _items = {};", storage));
                self.open(&header);
                self.writeln(&format!("auto _item = std::make_unique<{}>();", item_type));
                self.writeln("_item->_value = _v;");
                self.writeln("_item->_index = _items.size();");
                self.writeln(&format!("_create_loop{}_item({});", id, chain_args(&outer.chain, &["*_item".to_string()])));
                self.writeln("_items.push_back(std::move(_item));");
                self.close("}");
            }
        }
        self.close("}");
        self.writeln("");

        self.open(&format!("void _clear_loop_{}({}) {{", id, params));
        self.writeln(&format!("auto& _items = {};", storage));
        self.writeln(&format!("for (size_t _i = _items.size(); _i-- > 0;) _destroy_loop{}_item({});", id, item_args));
        self.writeln("_items.clear();");
        self.close("}");

        let item_params = chain_params(&outer.chain, &[item_param.clone()]);
        self.writeln("");
        let start = format!("_it{}._start", id);
        self.open(&format!("void _create_loop{}_item({}) {{", id, item_params));
        if sync.keyed {
            self.writeln(&format!("{} = webcc::dom::create_comment(\"\");", start));
            let insert = match l.at.parent {
                Some(p) => format!(
                    "webcc::dom::insert_before({}, {}, {});",
                    element_ref(cx.regions(), p),
                    start,
                    element_ref(cx.regions(), l.anchor)
                ),
                None => format!("viewc::insert(_parent, {}, {});", start, element_ref(cx.regions(), l.anchor)),
            };
            self.writeln(&insert);
        }
        self.ops(&inner, &sync.create_item)?;
        self.close("}");
        if sync.keyed {
            self.writeln("");
            self.open(&format!("void _update_loop{}_item({}) {{", id, item_params));
            self.ops(&inner, &sync.update_item)?;
            self.close("}");
        }
        self.writeln("");
        self.open(&format!("void _destroy_loop{}_item({}) {{", id, item_params));
        self.ops(&inner, &sync.destroy_item)?;
        if sync.keyed {
            self.writeln(&format!("webcc::dom::remove_element({});", start));
        }
        self.close("}");
        self.writeln("");
        let place_params = chain_params(
            &outer.chain,
            &[item_param, "webcc::handle _into".to_string(), "webcc::handle _before".to_string()],
        );
        self.open(&format!("void _place_loop{}_item({}) {{", id, place_params));
        if sync.keyed {
            self.writeln(&format!("webcc::dom::insert_before(_into, {}, _before);", start));
        }
        self.ops(&inner, &sync.place_item)?;
        self.close("}");
        Ok(())
    }

    // ==================== Ops ====================

    fn ops(&mut self, cx: &Ctx<'_>, ops: &[Op]) -> Result<()> {
        for op in ops {
            self.op(cx, op)?;
        }
        Ok(())
    }

    fn op(&mut self, cx: &Ctx<'_>, op: &Op) -> Result<()> {
        let r = cx.regions();
        let x = self.renderer(cx);
        match op {
            Op::InitState(name) => {
                if let Some(init) = cx.comp.state_var(name).and_then(|v| v.init.as_ref()) {
                    self.writeln(&format!("{} = {};", name, x.expr(init)));
                }
            }
            Op::InitParam(name) => {
                if let Some(p) = cx.comp.param(name).filter(|p| !p.is_reference && !p.is_callback()) {
                    if let Some(default) = &p.default {
                        self.writeln(&format!("{} = {};", name, x.expr(default)));
                    }
                }
            }
            Op::CreateElement(id) => {
                let tag = r.element(*id).tag().unwrap_or("div");
                self.writeln(&format!(
                    "{} = webcc::dom::create_element({});",
                    element_ref(r, *id),
                    string_literal(tag)
                ));
            }
            Op::CreateText(id) => {
                let content = match &r.element(*id).kind {
                    ElementKind::Text(TextSource::Literal(t)) => string_literal(t),
                    ElementKind::Text(TextSource::Static(e)) => x.text(e),
                    ElementKind::Text(TextSource::Bound(b)) => x.text(&r.binding(*b).expr),
                    _ => string_literal(""),
                };
                self.writeln(&format!("{} = webcc::dom::create_text_node({});", element_ref(r, *id), content));
            }
            Op::CreateAnchor(id) => {
                self.writeln(&format!("{} = webcc::dom::create_comment(\"\");", element_ref(r, *id)));
            }
            Op::SetStaticAttr { element, index } => {
                if let Some(attr) = r.element(*element).static_attrs.get(*index) {
                    let setter = if attr.property { "set_property" } else { "set_attribute" };
                    self.writeln(&format!(
                        "webcc::dom::{}({}, {}, {});",
                        setter,
                        element_ref(r, *element),
                        string_literal(&attr.name),
                        x.text(&attr.value)
                    ));
                }
            }
            Op::Insert { node, at } => {
                let node = element_ref(r, *node);
                let line = match (at.parent, at.anchor) {
                    (Some(p), Some(a)) => {
                        format!("webcc::dom::insert_before({}, {}, {});", element_ref(r, p), node, element_ref(r, a))
                    }
                    (Some(p), None) => format!("webcc::dom::append_child({}, {});", element_ref(r, p), node),
                    (None, Some(a)) => format!("viewc::insert(_parent, {}, {});", node, element_ref(r, a)),
                    (None, None) => format!("viewc::insert(_parent, {}, _anchor);", node),
                };
                self.writeln(&line);
            }
            Op::BindRef { element, var } => {
                self.writeln(&format!("{} = {};", var, element_ref(r, *element)));
            }
            Op::Listen { element, event } => self.listen(cx, *element, *event)?,
            Op::Unlisten { element, event } => {
                self.writeln(&format!("{}.remove({});", dispatcher(*event), element_ref(r, *element)));
            }
            Op::Apply(id) => {
                let b = r.binding(*id);
                let el = element_ref(r, b.element);
                let line = match &b.kind {
                    BindingKind::Attribute(name) => {
                        format!("webcc::dom::set_attribute({}, {}, {});", el, string_literal(name), x.text(&b.expr))
                    }
                    BindingKind::Property(name) => {
                        format!("webcc::dom::set_property({}, {}, {});", el, string_literal(name), x.text(&b.expr))
                    }
                    BindingKind::Text => format!("webcc::dom::set_text_content({}, {});", el, x.text(&b.expr)),
                };
                self.writeln(&line);
            }
            Op::CreateChild(id) => self.create_child(cx, *id)?,
            Op::PushProp { instance, prop } => {
                let inst = r.instance(*instance);
                let target = self.component_of(&inst.component)?;
                let child = child_ref(r, *instance);
                match (inst.props.iter().find(|p| &p.name == prop), target.param(prop)) {
                    (_, Some(p)) if p.is_callback() => {}
                    (Some(binding), Some(_)) if binding.is_reference => {
                        self.writeln(&format!("{}->_update_{}();", child, prop));
                    }
                    (Some(binding), Some(_)) => {
                        self.writeln(&format!("{}->{} = {};", child, prop, x.expr(&binding.value)));
                        self.writeln(&format!("{}->_update_{}();", child, prop));
                    }
                    _ => {}
                }
            }
            Op::DestroyChild(id) => {
                let child = child_ref(r, *id);
                self.writeln(&format!("if ({c}) {{ {c}->_destroy(); {c}.reset(); }}", c = child));
            }
            Op::RemoveElement(id) => {
                self.writeln(&format!("webcc::dom::remove_element({});", element_ref(r, *id)));
            }
            Op::SyncLoop(id) => {
                let args = chain_args(&r.loop_chain(r.loop_region(*id).scope), &[]);
                self.writeln(&format!("_sync_loop_{}({});", id.0, args));
            }
            Op::ClearLoop(id) => {
                let args = chain_args(&r.loop_chain(r.loop_region(*id).scope), &[]);
                self.writeln(&format!("_clear_loop_{}({});", id.0, args));
            }
            Op::SyncIf(id) => {
                let args = chain_args(&r.loop_chain(r.if_region(*id).scope), &[]);
                self.writeln(&format!("_sync_if_{}({});", id.0, args));
            }
            Op::ClearIf(id) => {
                let args = chain_args(&r.loop_chain(r.if_region(*id).scope), &[]);
                self.writeln(&format!("_clear_if_{}({});", id.0, args));
            }
            Op::Place(id) => {
                self.writeln(&format!("webcc::dom::insert_before(_into, {}, _before);", element_ref(r, *id)));
            }
            Op::PlaceLoop(id) => {
                let l = r.loop_region(*id);
                let args = chain_args(
                    &r.loop_chain(l.scope),
                    &["*_item".to_string(), "_into".to_string(), "_before".to_string()],
                );
                self.writeln(&format!(
                    "for (auto& _item : {}_loop{}) _place_loop{}_item({});",
                    prefix(l.scope),
                    id.0,
                    id.0,
                    args
                ));
            }
            Op::PlaceChild(id) => {
                let child = child_ref(r, *id);
                self.writeln(&format!("if ({c}) {c}->_move_before(_into, _before);", c = child));
            }
            Op::Guarded { region, branch, ops } => {
                let index = match branch {
                    Branch::Then => 0,
                    Branch::Else => 1,
                };
                self.open(&format!("if ({} == {}) {{", if_state(r, *region), index));
                self.ops(cx, ops)?;
                self.close("}");
            }
            Op::CallMethod(name) => self.writeln(&format!("{}();", name)),
        }
        Ok(())
    }

    /// Closure capturing `this` and a pointer to every item in reach
    fn closure_head(&self, cx: &Ctx<'_>, params: &str) -> String {
        let mut captures = vec!["this".to_string()];
        captures.extend(cx.chain.iter().map(|k| format!("_c{k} = &_it{k}", k = k.0)));
        format!("[{}]({})", captures.join(", "), params)
    }

    /// Renders captured items as `_cN->_value`, except items in `through`,
    /// which render as their backing element so writes reach the iterable
    fn closure_renderer<'r>(&self, cx: &'r Ctx<'_>, through: &[LoopId]) -> ExprRenderer<'r>
    where
        'a: 'r,
    {
        let mut vars: Vec<(String, String)> = Vec::with_capacity(cx.chain.len());
        for &id in &cx.chain {
            let l = cx.regions().loop_region(id);
            let access = match &l.source {
                LoopSource::Each { iterable } if through.contains(&id) => {
                    let outer = ExprRenderer::new(self.env, cx.comp).with_loop_vars(vars.clone());
                    format!("{}[_c{}->_index]", outer.expr(iterable), id.0)
                }
                _ => format!("_c{}->_value", id.0),
            };
            vars.push((l.var.clone(), access));
        }
        ExprRenderer::new(self.env, cx.comp).with_loop_vars(vars)
    }

    fn listen(&mut self, cx: &Ctx<'_>, element: ElementId, event: EventKind) -> Result<()> {
        let Some(plan) = cx.plan.handlers.iter().find(|h| h.element == element && h.event == event) else {
            return Ok(());
        };
        let (params, value) = match event {
            EventKind::Click => ("", None),
            EventKind::Input | EventKind::Change => ("const std::string& _v", Some("_v")),
            EventKind::KeyDown => ("int32_t _v", Some("_v")),
        };
        let head = self.closure_head(cx, params);
        let x = self.closure_renderer(cx, &plan.through_items);
        let mut body = Vec::new();
        match &plan.handler {
            Expr::Ident { name, .. } => {
                let takes_value = match (cx.comp.method(name), cx.comp.param(name)) {
                    (Some(m), _) => !m.params.is_empty(),
                    (None, Some(p)) => p.callback.as_ref().map(|a| !a.is_empty()).unwrap_or(false),
                    (None, None) => false,
                };
                let arg = if takes_value { value.unwrap_or("") } else { "" };
                if cx.comp.param(name).is_some() {
                    body.push(format!("if ({n}) {n}({a});", n = name, a = arg));
                } else {
                    body.push(format!("{}({});", name, arg));
                }
            }
            expr => {
                body.push(format!("{};", x.expr(expr)));
                body.extend(plan.notify.iter().map(|c| format!("{}();", updater_name(c))));
            }
        }
        let el = element_ref(cx.regions(), element);
        self.open(&format!("{}.set({}, {} {{", dispatcher(event), el, head));
        for line in &body {
            self.writeln(line);
        }
        self.close("});");
        Ok(())
    }

    fn create_child(&mut self, cx: &Ctx<'_>, id: InstanceId) -> Result<()> {
        let r = cx.regions();
        let inst = r.instance(id);
        let target = self.component_of(&inst.component)?;
        let child = child_ref(r, id);
        let x = self.renderer(cx);
        self.writeln(&format!("{} = std::make_unique<{}>();", child, inst.component));
        for prop in &inst.props {
            let Some(param) = target.param(&prop.name) else {
                return Err(Error::UnknownProp {
                    component: inst.component.clone(),
                    prop: prop.name.clone(),
                    span: inst.span,
                });
            };
            if param.is_callback() {
                let head = self.closure_head(cx, "auto&&... _a");
                let own_callback = |name: &str| cx.comp.param(name).is_some_and(|p| p.is_callback());
                let call = match &prop.value {
                    Expr::Ident { name, .. } if cx.comp.method(name).is_some() => format!("{}(_a...);", name),
                    Expr::Ident { name, .. } if own_callback(name) => format!("if ({n}) {n}(_a...);", n = name),
                    other => {
                        let plan = cx.plan.callback(id, &prop.name);
                        let through = plan.map(|c| c.through_items.as_slice()).unwrap_or(&[]);
                        let mut lines = vec![format!("{};", self.closure_renderer(cx, through).expr(other))];
                        lines.extend(plan.iter().flat_map(|c| &c.notify).map(|c| format!("{}();", updater_name(c))));
                        lines.join(" ")
                    }
                };
                self.writeln(&format!("{}->{} = {} {{ {} }};", child, prop.name, head, call));
            } else if prop.is_reference {
                self.writeln(&format!("{}->{} = &{};", child, prop.name, x.expr(&prop.value)));
                let root = root_var(&prop.value).map(|v| Change::Var(v.to_string()));
                if let Some(change) = root.filter(|c| cx.plan.updater(c).is_some()) {
                    self.writeln(&format!(
                        "{}->{} = [this]() {{ {}(); }};",
                        child,
                        change_hook(&prop.name),
                        updater_name(&change)
                    ));
                }
            } else {
                self.writeln(&format!("{}->{} = {};", child, prop.name, x.expr(&prop.value)));
            }
        }
        let (parent, anchor) = match (inst.at.parent, inst.at.anchor) {
            (Some(p), Some(a)) => (element_ref(r, p), element_ref(r, a)),
            (Some(p), None) => (element_ref(r, p), "webcc::handle()".to_string()),
            (None, Some(a)) => ("_parent".to_string(), element_ref(r, a)),
            (None, None) => ("_parent".to_string(), "_anchor".to_string()),
        };
        self.writeln(&format!("{}->_mount({}, {});", child, parent, anchor));
        Ok(())
    }

    // ==================== Application ====================

    fn generate_entry(&mut self, root: &str, ticks: bool) {
        self.writeln(&format!("{}* g_app = nullptr;", root));
        self.writeln("");
        self.open("void dispatch_events(const webcc::Event* events, uint32_t count) {");
        self.open("for (uint32_t i = 0; i < count; i++) {");
        self.writeln("const auto& e = events[i];");
        self.open("if (e.opcode == webcc::dom::ClickEvent::OPCODE) {");
        self.writeln("if (auto evt = e.as<webcc::dom::ClickEvent>()) g_dispatcher.dispatch(evt->handle);");
        self.close("} else if (e.opcode == webcc::dom::InputEvent::OPCODE) {");
        self.indent += 1;
        self.writeln(
            "if (auto evt = e.as<webcc::dom::InputEvent>()) g_input_dispatcher.dispatch(evt->handle, std::string(evt->value));",
        );
        self.close("} else if (e.opcode == webcc::dom::ChangeEvent::OPCODE) {");
        self.indent += 1;
        self.writeln(
            "if (auto evt = e.as<webcc::dom::ChangeEvent>()) g_change_dispatcher.dispatch(evt->handle, std::string(evt->value));",
        );
        self.close("} else if (e.opcode == webcc::dom::KeydownEvent::OPCODE) {");
        self.indent += 1;
        self.writeln("if (auto evt = e.as<webcc::dom::KeydownEvent>()) g_keydown_dispatcher.dispatch(evt->handle, evt->keycode);");
        self.close("}");
        self.close("}");
        self.close("}");
        self.writeln("");
        self.open("void update_wrapper(double time) {");
        self.writeln("static double last_time = time;");
        self.writeln("double dt = (time - last_time) / 1000.0;");
        self.writeln("last_time = time;");
        // a stalled tab must not jump the simulation
        self.writeln("if (dt > 0.1) dt = 0.1;");
        self.writeln("static webcc::Event events[64];");
        self.writeln("uint32_t count = 0;");
        self.writeln("webcc::Event e;");
        self.writeln("while (count < 64 && webcc::poll_event(e)) events[count++] = e;");
        self.writeln("dispatch_events(events, count);");
        if ticks {
            self.writeln("g_app->_tick(static_cast<float>(dt));");
        }
        self.writeln("webcc::flush();");
        self.close("}");
        self.writeln("");
        self.open("int main() {");
        self.writeln(&format!("g_app = new {}();", root));
        self.writeln("g_app->_mount(webcc::dom::get_body());");
        self.writeln("webcc::system::set_main_loop(update_wrapper);");
        self.writeln("webcc::flush();");
        self.writeln("return 0;");
        self.close("}");
    }
}

impl CodeGen for CppCodeGen<'_> {
    fn generate(&mut self, plans: &[ComponentPlan]) -> Result<String> {
        self.output.clear();
        self.indent = 0;
        self.output.push_str(PRELUDE);
        self.writeln("");

        let program = self.program;
        for e in &program.enums {
            self.generate_enum(e);
        }
        for plan in plans {
            self.writeln(&format!("struct {};", plan.name));
        }
        self.writeln("");
        for s in &program.structs {
            self.generate_struct(s, None)?;
            self.writeln("");
        }
        for plan in plans {
            self.generate_component(plan)?;
            self.writeln("");
        }

        let root = self.root.clone().or_else(|| plans.last().map(|p| p.name.clone()));
        if let Some(root) = root {
            let Some(plan) = plans.iter().find(|p| p.name == root) else {
                return Err(Error::Codegen(format!("root component '{}' is not defined", root)));
            };
            self.generate_entry(&root, plan.tick.is_some());
        }
        log::info!("generated {} bytes of C++ for {} components", self.output.len(), plans.len());
        Ok(std::mem::take(&mut self.output))
    }

    fn name(&self) -> &str {
        "cpp"
    }
}

// ==================== Naming ====================

/// Storage path of an owner: empty for the component, `_itN.` for items
fn prefix(scope: Scope) -> String {
    match scope.owner {
        Owner::Component => String::new(),
        Owner::LoopItem(id) => format!("_it{}.", id.0),
    }
}

fn element_ref(r: &ComponentRegions, id: ElementId) -> String {
    format!("{}_el{}", prefix(r.element(id).scope), id.0)
}

fn child_ref(r: &ComponentRegions, id: InstanceId) -> String {
    format!("{}_child{}", prefix(r.instance(id).scope), id.0)
}

fn if_state(r: &ComponentRegions, id: IfId) -> String {
    format!("{}_if{}", prefix(r.if_region(id).scope), id.0)
}

fn chain_params(chain: &[LoopId], extra: &[String]) -> String {
    let mut params: Vec<String> = chain.iter().map(|k| format!("_Loop{k}Item& _it{k}", k = k.0)).collect();
    params.extend(extra.iter().cloned());
    params.join(", ")
}

fn chain_args(chain: &[LoopId], extra: &[String]) -> String {
    let mut args: Vec<String> = chain.iter().map(|k| format!("_it{}", k.0)).collect();
    args.extend(extra.iter().cloned());
    args.join(", ")
}

/// Name of the function refreshing everything a change reaches
pub fn updater_name(change: &Change) -> String {
    match change {
        Change::Var(v) => format!("_update_{}", v),
        Change::Member(o, m) => format!("_update_{}_{}", o, m),
    }
}

/// Callback a child uses to report writes through a reference param
fn change_hook(param: &str) -> String {
    let mut chars = param.chars();
    let capitalized: String = match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    format!("on{}Change", capitalized)
}

fn dispatcher(event: EventKind) -> &'static str {
    match event {
        EventKind::Click => "g_dispatcher",
        EventKind::Input => "g_input_dispatcher",
        EventKind::Change => "g_change_dispatcher",
        EventKind::KeyDown => "g_keydown_dispatcher",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::lifecycle::plan_components;
    use crate::feedback::Diagnostics;
    use crate::middle::graph::topological_sort;
    use crate::middle::regions::build_program_regions;
    use crate::testing::*;
    use crate::types::TypeSchema;

    fn emit(comps: Vec<Component>) -> String {
        let program = program(comps);
        let schema = TypeSchema::empty();
        let env = TypeEnv::new(&program, &schema);
        let regions = build_program_regions(&program, &env, &mut Diagnostics::new()).unwrap();
        let order = topological_sort(&program).unwrap();
        let plans = plan_components(&program, &env, &order, regions).unwrap();
        CppCodeGen::new(&program, &env).generate(&plans).unwrap()
    }

    #[test]
    fn test_counter_output() {
        let out = emit(vec![counter()]);
        assert!(out.contains("struct Counter;\n"));
        assert!(out.contains("    Counter() {\n        count = 0;\n    }\n"));
        assert!(out.contains("        _el2 = webcc::dom::create_text_node(viewc::str(count));\n"));
        assert!(out.contains(
            "    void _update_count() {\n        if (!_mounted) return;\n        webcc::dom::set_text_content(_el2, viewc::str(count));\n    }\n"
        ));
        assert!(out.contains("    void inc() {\n        _inc_body();\n        _update_count();\n    }\n"));
        assert!(out.contains("        g_dispatcher.set(_el3, [this]() {\n            inc();\n        });\n"));
        assert!(out.contains("        g_dispatcher.remove(_el3);\n        webcc::dom::remove_element(_el0);\n"));
        assert!(out.contains("g_app = new Counter();"));
    }

    #[test]
    fn test_children_are_defined_first() {
        let mut badge = component("Badge");
        badge.params.push(param("count", "int"));
        badge.view.push(text_expr(ident("count")));
        let mut app = component("App");
        app.state.push(state("n", "int", true, Some(int(0))));
        app.view.push(child("Badge", vec![("count", ident("n"))]));
        let out = emit(vec![app, badge]);

        let badge_at = out.find("struct Badge {").unwrap();
        let app_at = out.find("struct App {").unwrap();
        assert!(badge_at < app_at);
        assert!(out.contains("        _child0 = std::make_unique<Badge>();\n        _child0->count = n;\n"));
        assert!(out.contains("        _child0->count = n;\n        _child0->_update_count();\n"));
        assert!(out.contains("g_app = new App();"));
    }

    #[test]
    fn test_if_switch() {
        let mut comp = component("Toggle");
        comp.state.push(state("on", "bool", true, Some(boolean(true))));
        comp.view.push(view_if(ident("on"), vec![element("b", vec![], vec![])], vec![text("off")]));
        let out = emit(vec![comp]);
        assert!(out.contains("    void _sync_if_0() {\n        int8_t _next = on ? 0 : 1;\n        if (_if0 == _next) return;\n"));
        assert!(out.contains("        _clear_if_0();\n        _if0 = _next;\n"));
        assert!(out.contains("        if (_if0 == 0) {\n            webcc::dom::remove_element(_el1);\n        } else if (_if0 == 1) {\n"));
    }

    #[test]
    fn test_keyed_loop() {
        let mut comp = component("List");
        comp.state.push(state("items", "string[]", true, Some(array(vec![]))));
        comp.view.push(element(
            "ul",
            vec![],
            vec![for_each("item", ident("items"), Some(ident("item")), vec![element("li", vec![], vec![text_expr(ident("item"))])])],
        ));
        let out = emit(vec![comp]);
        assert!(out.contains(
            "    struct _Loop0Item {\n        std::string _value{};\n        size_t _index = 0;\n        std::string _key{};\n        webcc::handle _start;\n        webcc::handle _el2;\n"
        ));
        assert!(out.contains("        for (const auto& _v : items) {\n            std::string _k = _v;\n"));
        assert!(out.contains("webcc::system::log(\"viewc: duplicate key in List loop 0\");"));
        // matched items are refreshed in place, unmatched keys get new items
        assert!(out.contains(
            "                auto _item = std::move(_items[_found->second]);\n                _item->_value = _values[_i];\n                _item->_index = _i;\n                _update_loop0_item(*_item);\n"
        ));
        assert!(out.contains("                _create_loop0_item(*_item);\n                _from.push_back(-1);\n"));
        // only items off the longest ascending run move
        assert!(out.contains(
            "        auto _keep = viewc::lis(_from);\n        webcc::handle _before = _el1;\n        for (size_t _i = _items.size(); _i-- > 0;) {\n            if (!_keep[_i]) _place_loop0_item(*_items[_i], _el0, _before);\n            _before = _items[_i]->_start;\n        }\n"
        ));
        assert!(out.contains(
            "    void _create_loop0_item(_Loop0Item& _it0) {\n        _it0._start = webcc::dom::create_comment(\"\");\n        webcc::dom::insert_before(_el0, _it0._start, _el1);\n"
        ));
        assert!(out.contains("        webcc::dom::remove_element(_it0._el2);\n        webcc::dom::remove_element(_it0._start);\n    }\n"));
        assert!(out.contains("        _it0._el3 = webcc::dom::create_text_node(viewc::str(_it0._value));\n"));
        assert!(out.contains("    void _update_loop0_item(_Loop0Item& _it0) {\n        webcc::dom::set_text_content(_it0._el3, viewc::str(_it0._value));\n    }\n"));
    }

    #[test]
    fn test_unkeyed_loop_rebuilds() {
        let mut comp = component("Grid");
        comp.state.push(state("n", "int", true, Some(int(3))));
        comp.view.push(for_range("i", int(0), ident("n"), vec![text_expr(ident("i"))]));
        let out = emit(vec![comp]);
        assert!(out.contains(
            "    void _sync_loop_0() {\n        _clear_loop_0();\n        auto& _items = _loop0;\n        for (int32_t _v = 0; _v < n; _v++) {\n"
        ));
        assert!(!out.contains("_update_loop0_item"));
    }

    #[test]
    fn test_handler_in_loop_captures_item() {
        let mut comp = component("Todos");
        comp.state.push(state("items", "int[]", true, Some(array(vec![]))));
        comp.methods.push(method("drop", &[("id", "int")], vec![expr_stmt(call(member(ident("items"), "remove"), vec![ident("id")]))]));
        comp.view.push(for_each(
            "id",
            ident("items"),
            Some(ident("id")),
            vec![element("button", vec![("onclick", call(ident("drop"), vec![ident("id")]))], vec![])],
        ));
        let out = emit(vec![comp]);
        assert!(out.contains("g_dispatcher.set(_it0._el1, [this, _c0 = &_it0]() {\n            drop(_c0->_value);\n"));
        assert!(out.contains("    void drop(int32_t id) {\n        _drop_body(id);\n        _update_items();\n    }\n"));
    }

    #[test]
    fn test_item_writes_reach_the_backing_array() {
        let mut comp = component("Todos");
        comp.structs.push(struct_def("Todo", &[("n", "int")]));
        comp.state.push(state("todos", "Todo[]", true, Some(array(vec![]))));
        comp.view.push(for_each(
            "t",
            ident("todos"),
            None,
            vec![element("button", vec![("onclick", postfix_inc(member(ident("t"), "n")))], vec![])],
        ));
        let out = emit(vec![comp]);
        assert!(out.contains("todos[_c0->_index].n++"));
        assert!(!out.contains("_c0->_value.n++"));
        assert!(out.contains("            _update_todos();\n        });\n"));
        assert!(out.contains("            _item->_value = _v;\n            _item->_index = _items.size();\n"));
    }

    #[test]
    fn test_inline_callback_is_wired() {
        let mut btn = component("Btn");
        btn.params.push(callback_param("onPress", &[]));
        btn.view.push(element("button", vec![("onclick", ident("onPress"))], vec![]));
        let mut app = component("App");
        app.state.push(state("count", "int", true, Some(int(0))));
        app.methods.push(method("bump", &[], vec![expr_stmt(postfix_inc(ident("count")))]));
        app.view.push(child("Btn", vec![("onPress", call(ident("bump"), vec![]))]));
        app.view.push(child("Btn", vec![("onPress", postfix_inc(ident("count")))]));
        let out = emit(vec![btn, app]);
        assert!(out.contains("        _child0->onPress = [this](auto&&... _a) { bump(); };\n"));
        assert!(out.contains("        _child1->onPress = [this](auto&&... _a) { (count++); _update_count(); };\n"));
        assert!(out.contains("        g_dispatcher.set(_el0, [this]() {\n            if (onPress) onPress();\n"));
    }

    #[test]
    fn test_tick_reaches_children_in_loops() {
        let mut ball = component("Ball");
        ball.state.push(state("x", "float", true, Some(float(0.0))));
        ball.methods.push(method("tick", &[("dt", "float")], vec![assign("x", ident("dt"))]));
        ball.methods.push(method("mount", &[], vec![]));
        let mut app = component("App");
        app.state.push(state("n", "int", true, Some(int(2))));
        app.view.push(for_range("i", int(0), ident("n"), vec![child("Ball", vec![])]));
        let out = emit(vec![ball, app]);

        assert!(out.contains("    void _tick(float dt) {\n        if (!_mounted) return;\n        tick(dt);\n    }\n"));
        assert!(out.contains("        for (auto& _t0 : _loop0) if (_t0->_child0) _t0->_child0->_tick(dt);\n"));
        assert!(out.contains("        _mounted = true;\n        mount();\n    }\n"));
        assert!(out.contains("    g_app->_tick(static_cast<float>(dt));\n"));
    }

    #[test]
    fn test_no_tick_without_ticking_components() {
        let out = emit(vec![counter()]);
        assert!(!out.contains("_tick"));
        assert!(out.contains("void update_wrapper(double time) {"));
    }

    #[test]
    fn test_change_hook_names() {
        assert_eq!(change_hook("text"), "onTextChange");
        assert_eq!(updater_name(&Change::Member("user".into(), "name".into())), "_update_user_name");
    }
}
