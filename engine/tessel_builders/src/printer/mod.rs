//! Human-readable rendering.
//!
//! Unlike `Value`'s `Display`, a printer knows member names and enum member
//! names, so records render as `Point { x: 1, y: 2 }` and enums as
//! `Color::Red`. Surrogate types render as their surrogate; union values as
//! whichever case they are.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use tessel_gen::construct;
use tessel_gen::{ArtifactKind, Builder, Delayed, GenResult, GenerationContext};
use tessel_shape::{
    DictionaryShape, EnumShape, EnumerableShape, FunctionShape, Getter, Node, ObjectShape,
    OptionalShape, PrimitiveKind, ShapeVisitor, SurrogateShape, UnionShape, Value,
};
use tessel_stack::ensure_sufficient_stack;

pub type PrintFn = Arc<dyn Fn(&Value, &mut String) -> GenResult<()> + Send + Sync>;

fn print_fn(f: impl Fn(&Value, &mut String) -> GenResult<()> + Send + Sync + 'static) -> PrintFn {
    Arc::new(f)
}

#[derive(Copy, Clone, Debug, Default)]
pub struct Printer;

impl Printer {
    /// Render one value to a fresh string.
    pub fn render(print: &PrintFn, value: &Value) -> GenResult<String> {
        let mut out = String::new();
        print(value, &mut out)?;
        Ok(out)
    }
}

impl Builder for Printer {
    type Artifact = PrintFn;
    const KIND: ArtifactKind = ArtifactKind::new("printer");

    fn delayed(&self, delayed: Delayed<PrintFn>) -> PrintFn {
        print_fn(move |value, out| ensure_sufficient_stack(|| (delayed.get())(value, out)))
    }
}

/// Print `items` separated by `, `.
fn print_joined<T>(
    out: &mut String,
    items: impl IntoIterator<Item = T>,
    mut print: impl FnMut(T, &mut String) -> GenResult<()>,
) -> GenResult<()> {
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        print(item, out)?;
    }
    Ok(())
}

impl<'a> ShapeVisitor<GenerationContext<'a, Printer>> for Printer {
    type Output = GenResult<PrintFn>;

    fn visit_primitive(
        &self,
        _: Node<'_, PrimitiveKind>,
        _: &mut GenerationContext<'a, Printer>,
    ) -> GenResult<PrintFn> {
        Ok(print_fn(|value, out| {
            out.push_str(&value.to_string());
            Ok(())
        }))
    }

    fn visit_object(
        &self,
        node: Node<'_, ObjectShape>,
        cx: &mut GenerationContext<'a, Printer>,
    ) -> GenResult<PrintFn> {
        let type_name = cx.type_name(node.id);
        let mut members: Vec<(Arc<str>, Getter, PrintFn)> = Vec::new();
        for prop in &node.properties {
            if let Some(getter) = &prop.getter {
                members.push((
                    Arc::clone(&prop.name),
                    Arc::clone(getter),
                    cx.get_or_add(prop.shape)?,
                ));
            }
        }
        Ok(print_fn(move |value, out| {
            out.push_str(&type_name);
            if members.is_empty() {
                out.push_str(" {}");
                return Ok(());
            }
            out.push_str(" { ");
            print_joined(out, &members, |(name, get, print), out| {
                out.push_str(name);
                out.push_str(": ");
                print(&get(value)?, out)
            })?;
            out.push_str(" }");
            Ok(())
        }))
    }

    fn visit_enum(
        &self,
        node: Node<'_, EnumShape>,
        cx: &mut GenerationContext<'a, Printer>,
    ) -> GenResult<PrintFn> {
        let type_name = cx.type_name(node.id);
        let names: FxHashMap<i64, Arc<str>> = node
            .members
            .iter()
            .map(|m| (m.ordinal, Arc::clone(&m.name)))
            .collect();
        let ordinal_of = Arc::clone(&node.ordinal_of);
        Ok(print_fn(move |value, out| {
            let ordinal = ordinal_of(value)?;
            out.push_str(&type_name);
            match names.get(&ordinal) {
                Some(name) => {
                    out.push_str("::");
                    out.push_str(name);
                }
                // Flag enums and out-of-range values still print.
                None => out.push_str(&format!("({ordinal})")),
            }
            Ok(())
        }))
    }

    fn visit_optional(
        &self,
        node: Node<'_, OptionalShape>,
        cx: &mut GenerationContext<'a, Printer>,
    ) -> GenResult<PrintFn> {
        let inner = cx.get_or_add(node.element)?;
        let deconstruct = Arc::clone(&node.deconstruct);
        Ok(print_fn(move |value, out| {
            match deconstruct(value)? {
                Some(present) => {
                    out.push_str("Some(");
                    inner(&present, out)?;
                    out.push(')');
                }
                None => out.push_str("None"),
            }
            Ok(())
        }))
    }

    fn visit_enumerable(
        &self,
        node: Node<'_, EnumerableShape>,
        cx: &mut GenerationContext<'a, Printer>,
    ) -> GenResult<PrintFn> {
        let type_name = cx.type_name(node.id);
        let element = cx.get_or_add(node.element)?;
        let shape = node.data().clone();
        Ok(print_fn(move |value, out| {
            if let Some(dims) = construct::dimensions(&shape, &type_name, value)? {
                let dims: Vec<String> = dims.iter().map(ToString::to_string).collect();
                out.push_str(&format!("grid[{}]", dims.join("x")));
            }
            out.push('[');
            print_joined(out, construct::elements(&shape, value)?, |item, out| {
                element(&item, out)
            })?;
            out.push(']');
            Ok(())
        }))
    }

    fn visit_dictionary(
        &self,
        node: Node<'_, DictionaryShape>,
        cx: &mut GenerationContext<'a, Printer>,
    ) -> GenResult<PrintFn> {
        let key = cx.get_or_add(node.key)?;
        let val = cx.get_or_add(node.value)?;
        let entries = Arc::clone(&node.entries);
        Ok(print_fn(move |value, out| {
            out.push('{');
            print_joined(out, entries(value)?, |(k, v), out| {
                key(&k, out)?;
                out.push_str(": ");
                val(&v, out)
            })?;
            out.push('}');
            Ok(())
        }))
    }

    fn visit_surrogate(
        &self,
        node: Node<'_, SurrogateShape>,
        cx: &mut GenerationContext<'a, Printer>,
    ) -> GenResult<PrintFn> {
        let inner = cx.get_or_add(node.surrogate)?;
        let to = Arc::clone(&node.to_surrogate);
        Ok(print_fn(move |value, out| inner(&to(value)?, out)))
    }

    fn visit_union(
        &self,
        node: Node<'_, UnionShape>,
        cx: &mut GenerationContext<'a, Printer>,
    ) -> GenResult<PrintFn> {
        let base = cx.get_or_add(node.base)?;
        let mut cases = Vec::with_capacity(node.cases.len());
        for case in &node.cases {
            cases.push((Arc::clone(&case.downcast), cx.get_or_add(case.shape)?));
        }
        let selector = Arc::clone(&node.selector);
        Ok(print_fn(move |value, out| {
            match selector(value).and_then(|index| cases.get(index)) {
                Some((downcast, print)) => print(&downcast(value)?, out),
                None => base(value, out),
            }
        }))
    }

    fn visit_function(
        &self,
        node: Node<'_, FunctionShape>,
        cx: &mut GenerationContext<'a, Printer>,
    ) -> GenResult<PrintFn> {
        // The signature is fixed per shape; only the function name varies.
        let params: Vec<String> = node
            .params
            .iter()
            .map(|p| format!("{}: {}", p.name, cx.type_name(p.shape)))
            .collect();
        let mut signature = format!("({})", params.join(", "));
        if let Some(returns) = node.returns {
            signature.push_str(" -> ");
            signature.push_str(&cx.type_name(returns));
        }
        let keyword = if node.is_async { "async fn" } else { "fn" };
        Ok(print_fn(move |value, out| {
            let name = value.as_function().map(|f| Arc::clone(&f.name))?;
            out.push_str(&format!("<{keyword} {name}{signature}>"));
            Ok(())
        }))
    }
}
