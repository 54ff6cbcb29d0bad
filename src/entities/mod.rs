//! sea-orm entities backing [`SeaOrmGenealogyStore`](crate::repositories::SeaOrmGenealogyStore).

pub mod part;
pub mod part_genealogy;
pub mod serialized_part;
pub mod work_order;
