use async_trait::async_trait;
use sea_orm::sea_query::{Expr, LikeExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::entities::{part, part_genealogy, serialized_part, work_order};
use crate::errors::ServiceError;
use crate::models::{GenealogyEdge, NewGenealogyEdge, Part, SerialMatchMode, SerializedPart};

use super::GenealogyStore;

const LIKE_ESCAPE: char = '\\';

/// Builds a `LIKE` pattern that treats every character of `pattern` literally.
fn like_pattern(pattern: &str, mode: SerialMatchMode) -> String {
    let mut escaped = String::with_capacity(pattern.len() + 2);
    for ch in pattern.chars() {
        if matches!(ch, '%' | '_') || ch == LIKE_ESCAPE {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(ch);
    }

    match mode {
        SerialMatchMode::StartsWith => format!("{escaped}%"),
        SerialMatchMode::Contains => format!("%{escaped}%"),
        SerialMatchMode::EndsWith => format!("%{escaped}"),
    }
}

/// [`GenealogyStore`] backed by a sea-orm connection.
#[derive(Debug, Clone)]
pub struct SeaOrmGenealogyStore {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmGenealogyStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Attaches parts and work order numbers to raw rows with two batched
    /// queries. Rows whose part is gone are dropped.
    async fn hydrate(
        &self,
        rows: Vec<serialized_part::Model>,
    ) -> Result<Vec<SerializedPart>, ServiceError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let part_ids: HashSet<Uuid> = rows.iter().map(|row| row.part_id).collect();
        let parts: HashMap<Uuid, Part> = part::Entity::find()
            .filter(part::Column::Id.is_in(part_ids))
            .all(self.db())
            .await?
            .into_iter()
            .map(|model| (model.id, Part::from(model)))
            .collect();

        let work_order_ids: HashSet<Uuid> = rows.iter().filter_map(|row| row.work_order_id).collect();
        let work_orders: HashMap<Uuid, String> = if work_order_ids.is_empty() {
            HashMap::new()
        } else {
            work_order::Entity::find()
                .filter(work_order::Column::Id.is_in(work_order_ids))
                .all(self.db())
                .await?
                .into_iter()
                .map(|model| (model.id, model.work_order_number))
                .collect()
        };

        let mut hydrated = Vec::with_capacity(rows.len());
        for row in rows {
            let Some(part) = parts.get(&row.part_id).cloned() else {
                warn!(
                    serialized_part_id = %row.id,
                    part_id = %row.part_id,
                    "Serialized part references a missing part; skipping"
                );
                continue;
            };
            let work_order_number = row
                .work_order_id
                .and_then(|id| work_orders.get(&id).cloned());
            hydrated.push(row.into_domain(part, work_order_number));
        }

        Ok(hydrated)
    }

    async fn load_serialized_parts(
        &self,
        ids: HashSet<Uuid>,
    ) -> Result<HashMap<Uuid, SerializedPart>, ServiceError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = serialized_part::Entity::find()
            .filter(serialized_part::Column::Id.is_in(ids))
            .all(self.db())
            .await?;

        Ok(self
            .hydrate(rows)
            .await?
            .into_iter()
            .map(|sp| (sp.id, sp))
            .collect())
    }

    async fn resolve_edges(
        &self,
        rows: Vec<part_genealogy::Model>,
    ) -> Result<Vec<GenealogyEdge>, ServiceError> {
        let ids: HashSet<Uuid> = rows
            .iter()
            .flat_map(|row| [row.parent_part_id, row.component_part_id])
            .collect();
        let parts = self.load_serialized_parts(ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| GenealogyEdge {
                id: row.id,
                parent_part_id: row.parent_part_id,
                component_part_id: row.component_part_id,
                assembly_date: row.assembly_date,
                assembly_operator: row.assembly_operator,
                created_at: row.created_at,
                parent_part: parts.get(&row.parent_part_id).cloned(),
                component_part: parts.get(&row.component_part_id).cloned(),
            })
            .collect())
    }
}

#[async_trait]
impl GenealogyStore for SeaOrmGenealogyStore {
    #[instrument(skip(self))]
    async fn find_serialized_part_by_serial_number(
        &self,
        serial_number: &str,
    ) -> Result<Option<SerializedPart>, ServiceError> {
        let row = serialized_part::Entity::find()
            .filter(serialized_part::Column::SerialNumber.eq(serial_number))
            .one(self.db())
            .await?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.into_iter().next()),
            None => Ok(None),
        }
    }

    #[instrument(skip(self))]
    async fn find_serialized_parts_by_serial_pattern(
        &self,
        pattern: &str,
        mode: SerialMatchMode,
    ) -> Result<Vec<SerializedPart>, ServiceError> {
        let rows = serialized_part::Entity::find()
            .filter(
                Expr::col(serialized_part::Column::SerialNumber)
                    .like(LikeExpr::new(like_pattern(pattern, mode)).escape(LIKE_ESCAPE)),
            )
            .order_by_asc(serialized_part::Column::CreatedAt)
            .order_by_asc(serialized_part::Column::Id)
            .all(self.db())
            .await?;

        // LIKE is case-insensitive on some backends; keep matching exact.
        let rows = rows
            .into_iter()
            .filter(|row| mode.matches(&row.serial_number, pattern))
            .collect();

        self.hydrate(rows).await
    }

    #[instrument(skip(self))]
    async fn find_serialized_parts_by_lot_number(
        &self,
        lot_number: &str,
    ) -> Result<Vec<SerializedPart>, ServiceError> {
        let rows = serialized_part::Entity::find()
            .filter(serialized_part::Column::LotNumber.eq(lot_number))
            .order_by_asc(serialized_part::Column::CreatedAt)
            .order_by_asc(serialized_part::Column::Id)
            .all(self.db())
            .await?;

        self.hydrate(rows).await
    }

    #[instrument(skip(self))]
    async fn find_genealogy_edges_by_component_lot(
        &self,
        lot_number: &str,
    ) -> Result<Vec<GenealogyEdge>, ServiceError> {
        let component_ids: Vec<Uuid> = serialized_part::Entity::find()
            .filter(serialized_part::Column::LotNumber.eq(lot_number))
            .all(self.db())
            .await?
            .into_iter()
            .map(|row| row.id)
            .collect();

        if component_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = part_genealogy::Entity::find()
            .filter(part_genealogy::Column::ComponentPartId.is_in(component_ids))
            .order_by_asc(part_genealogy::Column::CreatedAt)
            .order_by_asc(part_genealogy::Column::Id)
            .all(self.db())
            .await?;

        self.resolve_edges(rows).await
    }

    #[instrument(skip(self))]
    async fn find_genealogy_edges_by_parent_id(
        &self,
        parent_id: Uuid,
    ) -> Result<Vec<GenealogyEdge>, ServiceError> {
        let rows = part_genealogy::Entity::find()
            .filter(part_genealogy::Column::ParentPartId.eq(parent_id))
            .order_by_asc(part_genealogy::Column::CreatedAt)
            .order_by_asc(part_genealogy::Column::Id)
            .all(self.db())
            .await?;

        self.resolve_edges(rows).await
    }

    #[instrument(skip(self))]
    async fn create_genealogy_edge(
        &self,
        new_edge: NewGenealogyEdge,
    ) -> Result<GenealogyEdge, ServiceError> {
        let model = part_genealogy::ActiveModel {
            parent_part_id: Set(new_edge.parent_part_id),
            component_part_id: Set(new_edge.component_part_id),
            assembly_date: Set(new_edge.assembly_date),
            assembly_operator: Set(new_edge.assembly_operator),
            ..Default::default()
        }
        .insert(self.db())
        .await?;

        self.resolve_edges(vec![model])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::InternalError("Inserted genealogy edge vanished".into()))
    }
}
