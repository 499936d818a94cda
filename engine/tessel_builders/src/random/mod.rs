//! Seeded random values of any shape.
//!
//! Generators are driven by a [`Budget`]. The size part bounds collection
//! lengths and string lengths and halves at every level; the depth part
//! stops collections, optionals and union cases from expanding past
//! `GenOptions::max_depth`. Together they make recursive types terminate:
//! a `Node { children: List<Node> }` bottoms out in empty lists, and an
//! exhausted union only picks options that do not lead back to it. Grids
//! keep the product of their dimensions within the size.
//!
//! Dictionaries built from random keys may see the same key twice; they are
//! built with [`DuplicateKeyPolicy::LastWins`] regardless of the options.

use std::sync::Arc;

use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use smallvec::SmallVec;
use tessel_gen::construct::{self, ObjectAssembler};
use tessel_gen::{
    ArtifactKind, Builder, Delayed, DuplicateKeyPolicy, GenError, GenOptions, GenResult,
    GenerationContext,
};
use tessel_shape::{
    reachable, Dims, DictionaryShape, Edges, EnumShape, EnumerableShape, FunctionShape, Node,
    ObjectShape, OptionalShape, PrimitiveKind, Rebuild, ShapeId, ShapeVisitor, SurrogateShape,
    UnionShape, Value,
};
use tessel_stack::ensure_sufficient_stack;

pub type GenerateFn = Arc<dyn Fn(&mut StdRng, Budget) -> GenResult<Value> + Send + Sync>;

fn generate_fn(
    f: impl Fn(&mut StdRng, Budget) -> GenResult<Value> + Send + Sync + 'static,
) -> GenerateFn {
    Arc::new(f)
}

/// Remaining room for one generated value.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Budget {
    pub size: usize,
    pub depth: usize,
    pub max_depth: usize,
}

impl Budget {
    pub fn new(options: &GenOptions) -> Self {
        Budget {
            size: options.max_collection_len,
            depth: 0,
            max_depth: options.max_depth,
        }
    }

    /// Budget for a value nested one level down.
    #[must_use]
    pub fn child(self) -> Self {
        Budget {
            size: self.size / 2,
            depth: self.depth + 1,
            max_depth: self.max_depth,
        }
    }

    /// No room left to expand collections or optionals.
    pub fn exhausted(self) -> bool {
        self.size == 0 || self.depth >= self.max_depth
    }

    fn pick_len(self, rng: &mut StdRng) -> usize {
        if self.exhausted() {
            0
        } else {
            rng.gen_range(0..=self.size)
        }
    }

    /// Grid dimensions whose product stays within `size`. Each axis draws
    /// from the room the earlier axes left.
    fn pick_dims(self, rank: u8, rng: &mut StdRng) -> Dims {
        let mut room = if self.exhausted() { 0 } else { self.size };
        let mut dims = Dims::new();
        for _ in 0..rank {
            let len = rng.gen_range(0..=room);
            room = room.checked_div(len).unwrap_or(0);
            dims.push(len);
        }
        dims
    }
}

#[derive(Clone, Debug, Default)]
pub struct RandomGenerator {
    options: GenOptions,
}

impl RandomGenerator {
    pub fn new(options: GenOptions) -> Self {
        RandomGenerator { options }
    }

    /// One value from a fresh generator seeded with `seed`.
    pub fn sample(&self, generate: &GenerateFn, seed: u64) -> GenResult<Value> {
        let mut rng = StdRng::seed_from_u64(seed);
        generate(&mut rng, Budget::new(&self.options))
    }

    /// `count` values from one seeded stream.
    pub fn samples(&self, generate: &GenerateFn, seed: u64, count: usize) -> GenResult<Vec<Value>> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..count)
            .map(|_| generate(&mut rng, Budget::new(&self.options)))
            .collect()
    }
}

impl Builder for RandomGenerator {
    type Artifact = GenerateFn;
    const KIND: ArtifactKind = ArtifactKind::new("random");

    fn delayed(&self, delayed: Delayed<GenerateFn>) -> GenerateFn {
        generate_fn(move |rng, budget| ensure_sufficient_stack(|| (delayed.get())(rng, budget)))
    }
}

fn text(rng: &mut StdRng, len: usize) -> String {
    (0..len).map(|_| char::from(rng.sample(Alphanumeric))).collect()
}

fn scalar(kind: PrimitiveKind, rng: &mut StdRng, budget: Budget) -> Value {
    match kind {
        PrimitiveKind::Unit => Value::Unit,
        PrimitiveKind::Bool => Value::Bool(rng.gen()),
        PrimitiveKind::Int => Value::Int(rng.gen_range(-1_000_000..=1_000_000)),
        PrimitiveKind::UInt => Value::UInt(rng.gen_range(0..=1_000_000)),
        PrimitiveKind::Float => Value::Float(rng.gen_range(-1.0e6..1.0e6)),
        PrimitiveKind::Char => Value::Char(char::from(rng.sample(Alphanumeric))),
        PrimitiveKind::Str => {
            let len = rng.gen_range(0..=budget.size);
            Value::string(text(rng, len))
        }
        PrimitiveKind::Bytes => {
            let len = rng.gen_range(0..=budget.size);
            let bytes: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
            Value::bytes(bytes)
        }
        // 1970 to 2100, in microseconds.
        PrimitiveKind::Timestamp => Value::Timestamp(rng.gen_range(0..=4_102_444_800_000_000)),
    }
}

impl<'a> ShapeVisitor<GenerationContext<'a, RandomGenerator>> for RandomGenerator {
    type Output = GenResult<GenerateFn>;

    fn visit_primitive(
        &self,
        node: Node<'_, PrimitiveKind>,
        _: &mut GenerationContext<'a, RandomGenerator>,
    ) -> GenResult<GenerateFn> {
        let kind = *node.data();
        Ok(generate_fn(move |rng, budget| Ok(scalar(kind, rng, budget))))
    }

    fn visit_object(
        &self,
        node: Node<'_, ObjectShape>,
        cx: &mut GenerationContext<'a, RandomGenerator>,
    ) -> GenResult<GenerateFn> {
        let type_name = cx.type_name(node.id);
        construct::check_object(node.data(), &type_name)?;

        let mut members = Vec::new();
        for (index, prop) in node.properties.iter().enumerate() {
            if construct::is_assignable(node.data(), index) {
                members.push((index, cx.get_or_add(prop.shape)?));
            }
        }

        let shape = Arc::new(node.data().clone());
        Ok(generate_fn(move |rng, budget| {
            let mut assembler = ObjectAssembler::new(&shape, &type_name);
            for (index, generate) in &members {
                assembler.set(*index, generate(rng, budget.child())?)?;
            }
            assembler.finish()
        }))
    }

    fn visit_enum(
        &self,
        node: Node<'_, EnumShape>,
        cx: &mut GenerationContext<'a, RandomGenerator>,
    ) -> GenResult<GenerateFn> {
        if node.members.is_empty() {
            return Err(GenError::construction(cx.type_name(node.id), "enum has no members"));
        }
        let ordinals: Vec<i64> = node.members.iter().map(|m| m.ordinal).collect();
        let from_ordinal = Arc::clone(&node.from_ordinal);
        Ok(generate_fn(move |rng, _| {
            let ordinal = ordinals[rng.gen_range(0..ordinals.len())];
            Ok(from_ordinal(ordinal)?)
        }))
    }

    fn visit_optional(
        &self,
        node: Node<'_, OptionalShape>,
        cx: &mut GenerationContext<'a, RandomGenerator>,
    ) -> GenResult<GenerateFn> {
        let inner = cx.get_or_add(node.element)?;
        let shape = node.data().clone();
        Ok(generate_fn(move |rng, budget| {
            if budget.exhausted() || rng.gen_bool(0.5) {
                return Ok((shape.none)());
            }
            Ok((shape.some)(inner(rng, budget.child())?))
        }))
    }

    fn visit_enumerable(
        &self,
        node: Node<'_, EnumerableShape>,
        cx: &mut GenerationContext<'a, RandomGenerator>,
    ) -> GenResult<GenerateFn> {
        let type_name = cx.type_name(node.id);
        construct::check_strategy(&node.construction, &type_name)?;
        let element = cx.get_or_add(node.element)?;
        let shape = node.data().clone();
        Ok(generate_fn(move |rng, budget| {
            let (dims, count) = if shape.rank > 1 {
                let dims = budget.pick_dims(shape.rank, rng);
                let count = dims
                    .iter()
                    .try_fold(1_usize, |acc, &len| acc.checked_mul(len))
                    .ok_or_else(|| GenError::construction(&*type_name, "grid is too large"))?;
                (Some(dims), count)
            } else {
                (None, budget.pick_len(rng))
            };
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                items.push(element(rng, budget.child()));
            }
            construct::collect_enumerable(&shape, &type_name, dims, items)
        }))
    }

    fn visit_dictionary(
        &self,
        node: Node<'_, DictionaryShape>,
        cx: &mut GenerationContext<'a, RandomGenerator>,
    ) -> GenResult<GenerateFn> {
        let type_name = cx.type_name(node.id);
        construct::check_strategy(&node.construction, &type_name)?;
        let key = cx.get_or_add(node.key)?;
        let val = cx.get_or_add(node.value)?;
        let shape = node.data().clone();
        Ok(generate_fn(move |rng, budget| {
            let count = budget.pick_len(rng);
            let mut entries = Vec::with_capacity(count);
            for _ in 0..count {
                let k = key(rng, budget.child())?;
                let v = val(rng, budget.child())?;
                entries.push(Ok((k, v)));
            }
            construct::collect_dictionary(&shape, &type_name, DuplicateKeyPolicy::LastWins, entries)
        }))
    }

    fn visit_surrogate(
        &self,
        node: Node<'_, SurrogateShape>,
        cx: &mut GenerationContext<'a, RandomGenerator>,
    ) -> GenResult<GenerateFn> {
        let inner = cx.get_or_add(node.surrogate)?;
        let from = Arc::clone(&node.from_surrogate);
        Ok(generate_fn(move |rng, budget| Ok(from(inner(rng, budget)?)?)))
    }

    fn visit_union(
        &self,
        node: Node<'_, UnionShape>,
        cx: &mut GenerationContext<'a, RandomGenerator>,
    ) -> GenResult<GenerateFn> {
        let type_name = cx.type_name(node.id);
        // Options in case order, the base last. `None` stands for the base.
        let mut options: SmallVec<[(Option<Rebuild>, GenerateFn); 4]> = SmallVec::new();
        let mut shapes: SmallVec<[ShapeId; 4]> = SmallVec::new();
        for case in &node.cases {
            options.push((Some(Arc::clone(&case.upcast)), cx.get_or_add(case.shape)?));
            shapes.push(case.shape);
        }
        options.push((None, cx.get_or_add(node.base)?));
        shapes.push(node.base);

        // Once the budget runs out only options that cannot lead back here
        // are taken; anything else would expand forever.
        let leaves: SmallVec<[usize; 4]> = shapes
            .iter()
            .enumerate()
            .filter(|&(_, &shape)| {
                !reachable(cx.provider(), shape, Edges::Required).contains(&node.id)
            })
            .map(|(index, _)| index)
            .collect();

        Ok(generate_fn(move |rng, budget| {
            let pick = if budget.exhausted() {
                if leaves.is_empty() {
                    return Err(GenError::construction(
                        &*type_name,
                        "every union option recurses into the union",
                    ));
                }
                leaves[rng.gen_range(0..leaves.len())]
            } else {
                rng.gen_range(0..options.len())
            };
            let (upcast, generate) = &options[pick];
            let value = generate(rng, budget)?;
            match upcast {
                Some(upcast) => Ok(upcast(value)?),
                None => Ok(value),
            }
        }))
    }

    fn visit_function(
        &self,
        node: Node<'_, FunctionShape>,
        cx: &mut GenerationContext<'a, RandomGenerator>,
    ) -> GenResult<GenerateFn> {
        Err(cx.unsupported(node.id, "functions cannot be generated"))
    }
}

#[cfg(test)]
mod tests;
