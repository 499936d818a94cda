//! Concrete builders over the tessel generation engine.
//!
//! Each builder turns shapes into one family of artifacts. Artifacts are
//! `Send + Sync` closures that own what they need from the shape graph, so
//! they outlive the traversal that built them and can be shared across
//! threads.
//!
//! | Builder            | Artifact                                      |
//! |--------------------|-----------------------------------------------|
//! | [`Cloner`]         | deep structural clone                         |
//! | [`Comparer`]       | equality and hash                             |
//! | [`Encoder`]        | value to [`Document`]                         |
//! | [`Decoder`]        | [`Document`] to value                         |
//! | [`RandomGenerator`]| seeded random values                          |
//! | [`Mapper`]         | value of one provider to value of another     |
//! | [`Printer`]        | readable text                                 |
//!
//! [`Marshaler`] composes a decoder and an encoder into a document-level
//! function invoker.

mod cloner;
mod codec;
mod compare;
mod mapper;
mod marshal;
mod printer;
mod random;

pub use cloner::{CloneFn, Cloner};
pub use codec::{DecodeFn, Decoder, Document, EncodeFn, Encoder};
pub use compare::{Comparer, EqualityArtifact};
pub use mapper::{MapFn, Mapper};
pub use marshal::{InvokeFn, Marshaler};
pub use printer::{PrintFn, Printer};
pub use random::{Budget, GenerateFn, RandomGenerator};

#[cfg(test)]
mod test_helpers;
