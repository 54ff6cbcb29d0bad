pub mod genealogy;

pub use genealogy::{
    GenealogyEdge, NewGenealogyEdge, Part, PartType, SerialMatchMode, SerializedPart,
    SerializedPartStatus,
};
