//! Encoding shaped values to a format-neutral document tree, and back.
//!
//! [`Document`] sits between shaped values and concrete wire formats: an
//! encoder for JSON or CBOR only has to walk a `Document`, never a shape.
//! With the `serde` feature, documents serialize directly.
//!
//! # Mapping
//!
//! | Shape kind        | Document                                  |
//! |-------------------|-------------------------------------------|
//! | primitive         | matching scalar; `char` as a 1-char `Str` |
//! | object            | `Record` of readable properties           |
//! | enum              | `Str` member name                         |
//! | optional          | `Null` or the inner document              |
//! | enumerable        | `Seq`; grids as `Record { dims, items }`  |
//! | dictionary        | `Map`                                     |
//! | surrogate         | the surrogate's document                  |
//! | union             | `Tagged` for cases, plain for the base    |
//!
//! Functions have no document form.

mod decode;
mod encode;

pub use decode::{DecodeFn, Decoder};
pub use encode::{EncodeFn, Encoder};

/// Format-neutral data tree.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Document {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    Seq(Vec<Document>),
    /// Entries in encounter order.
    Map(Vec<(Document, Document)>),
    /// Named members in declaration order.
    Record(Vec<(String, Document)>),
    /// A union case, identified by its stable tag.
    Tagged { tag: i32, value: Box<Document> },
}

impl Document {
    pub fn string(s: impl Into<String>) -> Self {
        Document::Str(s.into())
    }

    pub fn record<'n>(members: impl IntoIterator<Item = (&'n str, Document)>) -> Self {
        Document::Record(
            members
                .into_iter()
                .map(|(name, doc)| (name.to_owned(), doc))
                .collect(),
        )
    }

    pub fn tagged(tag: i32, value: Document) -> Self {
        Document::Tagged {
            tag,
            value: Box::new(value),
        }
    }

    pub const fn kind_name(&self) -> &'static str {
        match self {
            Document::Null => "null",
            Document::Bool(_) => "bool",
            Document::Int(_) => "int",
            Document::UInt(_) => "uint",
            Document::Float(_) => "float",
            Document::Str(_) => "string",
            Document::Bytes(_) => "bytes",
            Document::Seq(_) => "sequence",
            Document::Map(_) => "map",
            Document::Record(_) => "record",
            Document::Tagged { .. } => "tagged value",
        }
    }

    /// First member named `name`, if this is a record.
    pub fn member(&self, name: &str) -> Option<&Document> {
        match self {
            Document::Record(members) => members
                .iter()
                .find(|(member, _)| member == name)
                .map(|(_, doc)| doc),
            _ => None,
        }
    }
}

const GRID_DIMS: &str = "dims";
const GRID_ITEMS: &str = "items";
