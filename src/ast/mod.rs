//! AST layer (§4.2): immutable bit-vector expression DAG, hash-consing
//! dictionary, named-variable registry and the simplification pipeline.

pub mod context;
pub mod dictionary;
pub mod node;
pub mod repr;
pub mod simplify;

pub use context::AstContext;
pub use dictionary::AstDictionary;
pub use node::{AbstractNode, Children, NodeId, NodeKind};
pub use repr::AstRepresentationMode;
