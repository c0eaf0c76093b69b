//! Integration tests for derived models: descriptors, table planning,
//! snapshots and query templates.

use pgshape_core::migrations::{LiveIndex, SqlModel, is_up_to_date, plan_alter, plan_create};
use pgshape_core::{ElemType, Error, Lookup, Model, SqlArg, SqlTyped, Store, ToSqlArg};
use pgshape_derive::Model;

// =============================================================================
// Field types
// =============================================================================

#[derive(Debug, Clone)]
pub struct Uuid(pub String);

impl SqlTyped for Uuid {
    fn elem_type() -> ElemType {
        ElemType::custom("Uuid", "UUID")
    }
}

#[derive(Debug, Clone)]
pub struct Xid(pub String);

impl SqlTyped for Xid {
    fn elem_type() -> ElemType {
        ElemType::custom("Xid", "VARCHAR(20)").default_value("'00000000000000000000'")
    }
}

#[derive(Debug, Clone)]
pub struct NullJsonb(pub Option<serde_json::Value>);

impl SqlTyped for NullJsonb {
    fn elem_type() -> ElemType {
        ElemType::custom("NullJsonb", "JSONB").nullable()
    }
}

// =============================================================================
// Models
// =============================================================================

#[allow(dead_code)]
#[derive(Debug, Clone, Model)]
#[model(table = "basic_models")]
pub struct BasicModel {
    pub id: Uuid,
    pub data: NullJsonb,
    #[field(name = "AppXID", json = "appId", unikey = "appidx", key = "traceappidx")]
    pub app_xid: Xid,
    #[field(name = "TraceXID", json = "traceId", key = "traceappidx")]
    pub trace_xid: Xid,
}

#[allow(dead_code)]
#[derive(Debug, Clone, Model)]
#[model(
    table = "basic_views",
    view = "SELECT\n\t\t:ID, :AppXID, :TraceXID\n\t\tFROM &BasicModel"
)]
pub struct BasicView {
    pub id: Uuid,
    #[field(name = "AppXID", json = "appId")]
    pub app_xid: Xid,
    #[field(name = "TraceXID", json = "traceId")]
    pub trace_xid: Xid,
}

#[allow(dead_code)]
#[derive(Debug, Clone, Model)]
pub struct Timestamps {
    #[field(sql = "TIMESTAMPTZ", default = "now()")]
    pub created_at: String,
    #[field(sql = "TIMESTAMPTZ", nullable, key = "deleted_at_idx")]
    pub deleted_at: Option<String>,
}

#[allow(dead_code)]
#[derive(Debug, Clone, Model)]
#[model(table = "documents")]
pub struct Document {
    pub id: i64,
    #[field(len = 200, fulltext)]
    pub title: String,
    #[field(ginkey = "tagsidx jsonb_path_ops")]
    pub tags: serde_json::Value,
    #[field(skip)]
    pub cache: String,
    #[field(db = "-")]
    pub scratch: String,
    #[field(sql = "BIGSERIAL", no_upsert)]
    pub seq: i64,
    #[field(embed)]
    pub stamps: Timestamps,
}

#[allow(dead_code)]
#[derive(Debug, Clone, Model)]
pub struct Clash {
    pub id: i64,
    #[field(db = "id")]
    pub other: i64,
}

fn shard() -> Store {
    let mut store = Store::new("shard1");
    store.register::<BasicModel>().unwrap();
    store.register::<BasicView>().unwrap();
    store.register::<Document>().unwrap();
    store
}

// =============================================================================
// Descriptors
// =============================================================================

#[test]
fn test_derived_descriptor() {
    let store = shard();
    let md = store.model("BasicModel").unwrap();

    assert_eq!(md.table(), "basic_models");
    let db_names: Vec<_> = md.stored_fields().map(|fd| fd.db_name.as_str()).collect();
    assert_eq!(db_names, ["id", "data", "app_xid", "trace_xid"]);

    assert_eq!(md.id_field().unwrap().name, "ID");
    assert!(md.id_field().unwrap().primary_key);
    assert_eq!(md.field_by_json_name("appId").unwrap().name, "AppXID");
    assert_eq!(md.field_by_db_name("trace_xid").unwrap().json_name, "traceId");
    assert!(matches!(
        md.field("Missing"),
        Err(Error::NotFound { lookup: Lookup::Field, .. })
    ));
}

#[test]
fn test_embedded_and_skipped_fields() {
    let store = shard();
    let md = store.model("Document").unwrap();

    let db_names: Vec<_> = md.stored_fields().map(|fd| fd.db_name.as_str()).collect();
    assert_eq!(db_names, ["id", "title", "tags", "seq", "created_at", "deleted_at"]);
    assert!(md.field("Cache").unwrap().skip);
    assert!(md.field("Scratch").unwrap().skip);
    assert!(md.field("Seq").unwrap().skip_upsert);
    assert!(md.field("Title").unwrap().full_text);
}

#[test]
fn test_duplicate_column_is_rejected() {
    let mut store = Store::new("s");
    assert!(matches!(
        store.register::<Clash>(),
        Err(Error::DuplicateColumn { .. })
    ));
    assert!(store.models().is_empty());
}

// =============================================================================
// Table planning and snapshots
// =============================================================================

#[test]
fn test_basic_model_is_created() {
    let store = shard();
    let desired = store
        .desired_model(store.model("BasicModel").unwrap())
        .unwrap();

    let plan = plan_create("shard1", &desired);
    assert_eq!(
        plan.queries(),
        [
            "CREATE TABLE shard1.basic_models (app_xid VARCHAR(20) NOT NULL DEFAULT '00000000000000000000',data JSONB,id UUID NOT NULL,trace_xid VARCHAR(20) NOT NULL DEFAULT '00000000000000000000',PRIMARY KEY (id))",
            "CREATE UNIQUE INDEX basic_modelsappidx ON shard1.basic_models(app_xid)",
            "CREATE INDEX basic_modelstraceappidx ON shard1.basic_models(app_xid, trace_xid)",
        ]
    );
}

#[test]
fn test_snapshot_round_trip_equals_desired() {
    let store = shard();
    let desired = store
        .desired_model(store.model("BasicModel").unwrap())
        .unwrap();

    let reloaded = SqlModel::from_json(&desired.to_json().unwrap()).unwrap();
    assert_eq!(reloaded, desired);

    let live = [
        LiveIndex {
            name: "basic_modelsappidx".to_string(),
            table: "shard1.basic_models".to_string(),
            schema: "shard1".to_string(),
            columns: vec!["app_xid".to_string()],
        },
        LiveIndex {
            name: "basic_modelstraceappidx".to_string(),
            table: "shard1.basic_models".to_string(),
            schema: "shard1".to_string(),
            columns: vec!["app_xid".to_string(), "trace_xid".to_string()],
        },
    ];
    assert!(is_up_to_date(&reloaded, &desired, &live));
    assert!(plan_alter("shard1", &reloaded, &desired, &[], &live)
        .unwrap()
        .is_empty());
}

#[test]
fn test_view_model_resolves_its_query() {
    let store = shard();
    let desired = store
        .desired_model(store.model("BasicView").unwrap())
        .unwrap();

    assert!(desired.is_view);
    assert!(!desired.is_materialized);
    assert_eq!(
        desired.view_query,
        "SELECT  id, app_xid, trace_xid  FROM shard1.basic_models"
    );
    assert_eq!(
        plan_create("shard1", &desired).queries(),
        ["CREATE OR REPLACE VIEW shard1.basic_views AS SELECT  id, app_xid, trace_xid  FROM shard1.basic_models"]
    );
}

#[test]
fn test_gin_and_embedded_indexes() {
    let store = shard();
    let desired = store
        .desired_model(store.model("Document").unwrap())
        .unwrap();

    let names: Vec<_> = desired.indexes.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, ["deleted_at_idx", "tagsidx"]);
    let tags = desired.index("tagsidx").unwrap();
    assert_eq!(tags.method, "gin");
    assert_eq!(tags.options, "jsonb_path_ops");
    assert_eq!(desired.column("title").unwrap().data_type, "VARCHAR(200)");
    assert_eq!(desired.column("created_at").unwrap().default_value, "now()");
}

// =============================================================================
// Query templates
// =============================================================================

#[test]
fn test_template_symbols() {
    let store = shard();
    let sql = store
        .resolve(
            "SELECT :BasicModel.*, :BasicModel.json.AppXID FROM &BasicModel WHERE :TraceXID = ? -- :Ignored\n",
            None,
        )
        .unwrap();
    assert_eq!(
        sql,
        "SELECT shard1.basic_models.*, 'appId' FROM shard1.basic_models WHERE trace_xid = ? "
    );
}

#[test]
fn test_current_schema_override() {
    let store = shard();
    assert_eq!(
        store
            .resolve("SELECT :ID FROM &CURRSCHEMA.&BasicModel", Some("shard2"))
            .unwrap(),
        "SELECT id FROM shard2.basic_models"
    );
}

#[test]
fn test_prepare_expands_and_rebinds() {
    let store = shard();
    let q = store
        .prepare(
            "SELECT :ID FROM &BasicModel WHERE :AppXID IN (?) AND data ?| ? AND :TraceXID = ?",
            vec![
                SqlArg::list(["a", "b", "c"]),
                SqlArg::list(["k"]),
                "t".to_sql_arg(),
            ],
            None,
        )
        .unwrap();
    assert_eq!(
        q.sql,
        "SELECT id FROM shard1.basic_models WHERE app_xid IN ($1,$2,$3) AND data ?| $4 AND trace_xid = $5"
    );
    assert_eq!(q.args.len(), 5);
    assert_eq!(q.args[3], SqlArg::Text("k".to_string()));

    let err = store
        .prepare("SELECT 1 FROM &BasicModel WHERE :ID IN (?)", vec![SqlArg::List(vec![])], None)
        .unwrap_err();
    assert!(matches!(err, Error::EmptyList { position: 1, .. }));
}

#[test]
fn test_upsert_for_derived_model() {
    let store = shard();
    assert_eq!(
        store.upsert_sql(store.model("Document").unwrap()).unwrap(),
        "INSERT INTO shard1.documents (id,title,tags,created_at,deleted_at) VALUES($1,$2,$3,$4,$5) ON CONFLICT(id) DO UPDATE SET (title,tags,created_at,deleted_at)=(excluded.title,excluded.tags,excluded.created_at,excluded.deleted_at)"
    );
}

#[test]
fn test_manual_and_derived_declarations_agree() {
    let derived = <BasicView as Model>::model();
    assert_eq!(derived.type_name(), "BasicView");
    let names: Vec<_> = derived.fields().into_iter().map(|fd| fd.name).collect();
    assert_eq!(names, ["ID", "AppXID", "TraceXID"]);
}
