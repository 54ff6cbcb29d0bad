mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{DateTime, Duration, TimeZone, Utc};
use machshop_genealogy::{
    dto::CreateGenealogyRequest,
    entities::{part, part_genealogy, serialized_part, work_order},
    errors::ServiceError,
    models::{NewGenealogyEdge, PartType, SerialMatchMode, SerializedPartStatus},
    repositories::{GenealogyStore, SeaOrmGenealogyStore},
    services::GenealogyService,
};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, PaginatorTrait, Set};
use uuid::Uuid;

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
}

async fn insert_part(db: &DatabaseConnection, number: &str, part_type: PartType) -> part::Model {
    part::ActiveModel {
        part_number: Set(number.to_string()),
        part_name: Set(format!("Part {number}")),
        part_type: Set(part_type.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

async fn insert_work_order(db: &DatabaseConnection, number: &str) -> work_order::Model {
    work_order::ActiveModel {
        work_order_number: Set(number.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

/// Inserts a unit created `minutes` after the base time so ordering is stable.
async fn insert_unit(
    db: &DatabaseConnection,
    serial: &str,
    part_id: Uuid,
    lot: Option<&str>,
    minutes: i64,
) -> serialized_part::Model {
    serialized_part::ActiveModel {
        serial_number: Set(serial.to_string()),
        part_id: Set(part_id),
        lot_number: Set(lot.map(str::to_string)),
        created_at: Set(base_time() + Duration::minutes(minutes)),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

async fn insert_edge(
    db: &DatabaseConnection,
    parent: Uuid,
    component: Uuid,
    minutes: i64,
) -> part_genealogy::Model {
    part_genealogy::ActiveModel {
        parent_part_id: Set(parent),
        component_part_id: Set(component),
        created_at: Set(base_time() + Duration::minutes(minutes)),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

#[tokio::test]
async fn migration_creates_every_table() {
    let db = common::sqlite_db().await;

    assert_eq!(part::Entity::find().count(db.as_ref()).await.unwrap(), 0);
    assert_eq!(work_order::Entity::find().count(db.as_ref()).await.unwrap(), 0);
    assert_eq!(serialized_part::Entity::find().count(db.as_ref()).await.unwrap(), 0);
    assert_eq!(part_genealogy::Entity::find().count(db.as_ref()).await.unwrap(), 0);

    // Applying again is a no-op.
    machshop_genealogy::migrator::run_migrations(&db).await.unwrap();
}

#[tokio::test]
async fn serial_lookup_hydrates_part_and_work_order() {
    let db = common::sqlite_db().await;
    let pump = insert_part(&db, "PN-PUMP", PartType::FinishedGood).await;
    let wo = insert_work_order(&db, "WO-2024-001").await;

    serialized_part::ActiveModel {
        serial_number: Set("PUMP-001".to_string()),
        part_id: Set(pump.id),
        work_order_id: Set(Some(wo.id)),
        status: Set(SerializedPartStatus::Shipped.to_string()),
        supplier: Set(Some("In-house".to_string())),
        ..Default::default()
    }
    .insert(db.as_ref())
    .await
    .unwrap();

    let store = SeaOrmGenealogyStore::new(db.clone());
    let found = store
        .find_serialized_part_by_serial_number("PUMP-001")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(found.part.part_number, "PN-PUMP");
    assert_eq!(found.part.part_type, PartType::FinishedGood);
    assert_eq!(found.work_order_number.as_deref(), Some("WO-2024-001"));
    assert_eq!(found.status, SerializedPartStatus::Shipped);
    assert_eq!(found.supplier.as_deref(), Some("In-house"));

    assert!(store
        .find_serialized_part_by_serial_number("PUMP-999")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn default_status_is_active() {
    let db = common::sqlite_db().await;
    let p = insert_part(&db, "PN-1", PartType::Component).await;
    let row = insert_unit(&db, "C-1", p.id, None, 0).await;
    assert_eq!(row.status, "ACTIVE");
}

#[tokio::test]
async fn pattern_and_lot_queries_are_ordered_by_creation() {
    let db = common::sqlite_db().await;
    let p = insert_part(&db, "PN-SEAL", PartType::Purchased).await;
    insert_unit(&db, "SEAL-0003", p.id, Some("LOT-7"), 3).await;
    insert_unit(&db, "SEAL-0001", p.id, Some("LOT-7"), 1).await;
    insert_unit(&db, "XSEAL-0002", p.id, Some("LOT-8"), 2).await;

    let store = SeaOrmGenealogyStore::new(db.clone());

    let serials = |parts: Vec<machshop_genealogy::models::SerializedPart>| {
        parts.into_iter().map(|p| p.serial_number).collect::<Vec<_>>()
    };

    assert_eq!(
        serials(
            store
                .find_serialized_parts_by_serial_pattern("SEAL", SerialMatchMode::StartsWith)
                .await
                .unwrap()
        ),
        vec!["SEAL-0001", "SEAL-0003"]
    );
    assert_eq!(
        serials(
            store
                .find_serialized_parts_by_serial_pattern("SEAL-000", SerialMatchMode::Contains)
                .await
                .unwrap()
        ),
        vec!["SEAL-0001", "XSEAL-0002", "SEAL-0003"]
    );
    assert_eq!(
        serials(
            store
                .find_serialized_parts_by_serial_pattern("0002", SerialMatchMode::EndsWith)
                .await
                .unwrap()
        ),
        vec!["XSEAL-0002"]
    );
    assert_eq!(
        serials(store.find_serialized_parts_by_lot_number("LOT-7").await.unwrap()),
        vec!["SEAL-0001", "SEAL-0003"]
    );
    assert!(store
        .find_serialized_parts_by_lot_number("LOT-404")
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn edge_queries_resolve_both_endpoints() {
    let db = common::sqlite_db().await;
    let asm = insert_part(&db, "PN-ASM", PartType::Assembly).await;
    let raw = insert_part(&db, "PN-RAW", PartType::RawMaterial).await;
    let parent = insert_unit(&db, "ASM-1", asm.id, None, 0).await;
    let other_parent = insert_unit(&db, "ASM-2", asm.id, None, 1).await;
    let bar = insert_unit(&db, "BAR-1", raw.id, Some("HEAT-9"), 2).await;
    let plate = insert_unit(&db, "PLATE-1", raw.id, None, 3).await;

    insert_edge(&db, parent.id, plate.id, 5).await;
    insert_edge(&db, parent.id, bar.id, 4).await;
    insert_edge(&db, other_parent.id, bar.id, 6).await;

    let store = SeaOrmGenealogyStore::new(db.clone());

    let children = store.find_genealogy_edges_by_parent_id(parent.id).await.unwrap();
    let components: Vec<_> = children
        .iter()
        .map(|e| e.component_part.as_ref().unwrap().serial_number.as_str())
        .collect();
    assert_eq!(components, vec!["BAR-1", "PLATE-1"]);
    assert!(children
        .iter()
        .all(|e| e.parent_part.as_ref().unwrap().serial_number == "ASM-1"));

    let by_lot = store.find_genealogy_edges_by_component_lot("HEAT-9").await.unwrap();
    let parents: Vec<_> = by_lot
        .iter()
        .map(|e| e.parent_part.as_ref().unwrap().serial_number.as_str())
        .collect();
    assert_eq!(parents, vec!["ASM-1", "ASM-2"]);

    assert!(store
        .find_genealogy_edges_by_component_lot("HEAT-0")
        .await
        .unwrap()
        .is_empty());
    assert!(store
        .find_genealogy_edges_by_parent_id(Uuid::new_v4())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn create_edge_persists_and_rejects_duplicate_pair() {
    let db = common::sqlite_db().await;
    let p = insert_part(&db, "PN-X", PartType::Assembly).await;
    let parent = insert_unit(&db, "P-1", p.id, None, 0).await;
    let component = insert_unit(&db, "C-1", p.id, None, 1).await;
    let store = SeaOrmGenealogyStore::new(db.clone());

    let edge = store
        .create_genealogy_edge(NewGenealogyEdge {
            parent_part_id: parent.id,
            component_part_id: component.id,
            assembly_date: Some(base_time()),
            assembly_operator: Some("op-7".into()),
        })
        .await
        .unwrap();

    assert_eq!(edge.parent_part.as_ref().unwrap().serial_number, "P-1");
    assert_eq!(edge.component_part.as_ref().unwrap().serial_number, "C-1");
    assert_eq!(edge.assembly_date, Some(base_time()));
    assert_eq!(edge.assembly_operator.as_deref(), Some("op-7"));

    let err = store
        .create_genealogy_edge(NewGenealogyEdge {
            parent_part_id: parent.id,
            component_part_id: component.id,
            assembly_date: None,
            assembly_operator: None,
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::DatabaseError(_));
    assert_eq!(part_genealogy::Entity::find().count(db.as_ref()).await.unwrap(), 1);
}

#[tokio::test]
async fn service_traces_over_the_database() {
    let db = common::sqlite_db().await;
    let fg = insert_part(&db, "PN-FG", PartType::FinishedGood).await;
    let asm = insert_part(&db, "PN-ASM", PartType::Assembly).await;
    let raw = insert_part(&db, "PN-RAW", PartType::RawMaterial).await;
    let wo = insert_work_order(&db, "WO-77").await;

    let engine = serialized_part::ActiveModel {
        serial_number: Set("ENG-0001".to_string()),
        part_id: Set(fg.id),
        work_order_id: Set(Some(wo.id)),
        created_at: Set(base_time()),
        ..Default::default()
    }
    .insert(db.as_ref())
    .await
    .unwrap();
    let block = insert_unit(&db, "BLK-0001", asm.id, None, 1).await;
    let ingot = insert_unit(&db, "ING-0001", raw.id, Some("HEAT-42"), 2).await;

    let service = GenealogyService::new(Arc::new(SeaOrmGenealogyStore::new(db.clone())));

    service
        .create_genealogy_relationship(CreateGenealogyRequest {
            parent_identifier: "ENG-0001".into(),
            component_identifier: "BLK-0001".into(),
            assembly_date: None,
            assembly_operator: None,
        })
        .await
        .unwrap();
    service
        .create_genealogy_relationship(CreateGenealogyRequest {
            parent_identifier: "BLK".into(),
            component_identifier: "ING-0001".into(),
            assembly_date: None,
            assembly_operator: None,
        })
        .await
        .unwrap();

    let backward = service.get_backward_traceability("ENG", None).await.unwrap();
    assert_eq!(backward.serial_number, engine.serial_number);
    let levels: Vec<_> = backward
        .components
        .iter()
        .map(|c| (c.serial_number.as_str(), c.level))
        .collect();
    assert_eq!(levels, vec![("BLK-0001", 0), ("ING-0001", 1)]);

    let forward = service.get_forward_traceability("HEAT-42").await.unwrap();
    let used: Vec<_> = forward
        .used_in_products
        .iter()
        .map(|p| p.serial_number.as_str())
        .collect();
    assert_eq!(used, vec!["ING-0001", "BLK-0001"]);

    let graph = service.get_genealogy_graph("ENG-0001", None).await.unwrap();
    assert_eq!(graph.nodes.len(), 3);
    assert_eq!(graph.edges.len(), 2);
    assert_eq!(graph.max_depth, 2);

    let err = service
        .create_genealogy_relationship(CreateGenealogyRequest {
            parent_identifier: "ING-0001".into(),
            component_identifier: "ENG-0001".into(),
            assembly_date: None,
            assembly_operator: None,
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));

    let duplicate = service
        .create_genealogy_relationship(CreateGenealogyRequest {
            parent_identifier: "ENG-0001".into(),
            component_identifier: "BLK-0001".into(),
            assembly_date: None,
            assembly_operator: None,
        })
        .await
        .unwrap_err();
    assert_matches!(duplicate, ServiceError::StorageError { source: Some(_), .. });

    assert!(!service.detect_circular_references("ENG-0001").await);
    assert_eq!(block.lot_number, None);
    assert_eq!(ingot.lot_number.as_deref(), Some("HEAT-42"));
}

async fn pattern_serials(
    store: &dyn GenealogyStore,
    pattern: &str,
    mode: SerialMatchMode,
) -> Vec<String> {
    store
        .find_serialized_parts_by_serial_pattern(pattern, mode)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.serial_number)
        .collect()
}

#[tokio::test]
async fn pattern_queries_treat_wildcards_literally_and_match_case() {
    let db = common::sqlite_db().await;
    let p = insert_part(&db, "PN-W", PartType::Component).await;
    insert_unit(&db, "SNX1-001", p.id, None, 0).await;
    insert_unit(&db, "SN_1-002", p.id, None, 1).await;
    insert_unit(&db, "RATE-50%", p.id, None, 2).await;
    let sql = SeaOrmGenealogyStore::new(db.clone());

    let memory = machshop_genealogy::repositories::InMemoryGenealogyStore::new();
    for serial in ["SNX1-001", "SN_1-002", "RATE-50%"] {
        memory
            .insert_part(machshop_genealogy::models::SerializedPart::new(
                serial,
                machshop_genealogy::models::Part::new("PN-W", "W", PartType::Component),
            ))
            .await;
    }

    let cases: [(&str, SerialMatchMode, Vec<&str>); 6] = [
        ("SN_1", SerialMatchMode::StartsWith, vec!["SN_1-002"]),
        ("%", SerialMatchMode::Contains, vec!["RATE-50%"]),
        ("_", SerialMatchMode::Contains, vec!["SN_1-002"]),
        ("snx1", SerialMatchMode::StartsWith, vec![]),
        ("-00_", SerialMatchMode::EndsWith, vec![]),
        ("X1-", SerialMatchMode::Contains, vec!["SNX1-001"]),
    ];

    for (pattern, mode, expected) in cases {
        let from_sql = pattern_serials(&sql, pattern, mode).await;
        let from_memory = pattern_serials(&memory, pattern, mode).await;
        assert_eq!(from_sql, expected, "{mode} {pattern:?}");
        assert_eq!(from_sql, from_memory, "{mode} {pattern:?}");
    }
}

#[tokio::test]
async fn wildcard_identifier_does_not_resolve_to_another_unit() {
    let db = common::sqlite_db().await;
    let p = insert_part(&db, "PN-W", PartType::Assembly).await;
    insert_unit(&db, "SNX1-001", p.id, None, 0).await;
    let service = GenealogyService::new(Arc::new(SeaOrmGenealogyStore::new(db.clone())));

    for identifier in ["SN_1", "snx1", "%"] {
        let err = service
            .get_backward_traceability(identifier, None)
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::NotFound(_), "{identifier}");
    }

    let found = service.get_backward_traceability("SNX1", None).await.unwrap();
    assert_eq!(found.serial_number, "SNX1-001");
}
