//! Type-directed value generation.
//!
//! Describe types once as shapes, then derive what you need from them:
//! deep cloners, structural comparers, document encoders and decoders,
//! seeded random generators, cross-schema mappers, printers and function
//! marshalers. Artifacts are built once per type and cached.
//!
//! ```ignore
//! use tessel::{RecordBuilder, Session, ShapeId, ShapePool};
//!
//! let mut pool = ShapePool::new();
//! let point = RecordBuilder::new("Point")
//!     .field("x", ShapeId::INT)
//!     .field("y", ShapeId::INT)
//!     .build(&mut pool)?;
//!
//! let mut session = Session::new(pool);
//! let value = session.generate(point, 7)?;
//! let doc = session.encode(point, &value)?;
//! assert_eq!(session.decode(point, &doc)?, value);
//! ```
//!
//! The engine crates are re-exported for custom builders: [`shape`] holds
//! the shape graph, [`engine`] the generation context and caches.

mod session;

use std::sync::Once;

pub use session::Session;
pub use tessel_builders::{
    Budget, CloneFn, Cloner, Comparer, DecodeFn, Decoder, Document, EncodeFn, Encoder,
    EqualityArtifact, GenerateFn, InvokeFn, MapFn, Mapper, Marshaler, PrintFn, Printer,
    RandomGenerator,
};
pub use tessel_gen::{DuplicateKeyPolicy, GenError, GenOptions, GenResult};
pub use tessel_shape::{
    FunctionValue, RecordBuilder, ShapeError, ShapeId, ShapePool, ShapeProvider, Value,
};

pub use tessel_gen as engine;
pub use tessel_shape as shape;

static TRACING_INIT: Once = Once::new();

/// Install a global tracing subscriber filtered by `RUST_LOG`.
///
/// Does nothing unless `RUST_LOG` is set. With `TESSEL_LOG_TREE` set, output
/// is indented by span, which makes nested builds easy to follow. Safe to
/// call more than once; only the first call has any effect.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_err() {
            return;
        }
        let filter = EnvFilter::from_default_env();
        let registry = tracing_subscriber::registry().with(filter);
        // `try_init` fails if the host already installed a subscriber; theirs wins.
        let installed = if std::env::var_os("TESSEL_LOG_TREE").is_some() {
            registry
                .with(
                    tracing_tree::HierarchicalLayer::new(2)
                        .with_targets(true)
                        .with_bracketed_fields(true),
                )
                .try_init()
        } else {
            registry
                .with(fmt::layer().with_target(true).with_level(true))
                .try_init()
        };
        if installed.is_err() {
            tracing::debug!("tracing subscriber already installed");
        }
    });
}
