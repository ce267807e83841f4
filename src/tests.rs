use super::*;
use crate::catalog::{IntrospectError, LocalIntrospector, SchemaSnapshot, TableFilter};
use crate::describe::{DescribeError, LlmDescriptions, TemplateDescriptions, TextGenerator};
use crate::emitter::Emitter;
use crate::schema::{ColumnInfo, DomainTag, TableClassification, TableInfo};
use crate::semantic_model::{DimensionType, MeasureFormat, Relationship};
use crate::type_mapper::TypeMapper;
use async_trait::async_trait;
use rstest::{fixture, rstest};
use serde_json::json;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

fn pk(name: &str, source_type: &str, pos: i32) -> ColumnInfo {
    ColumnInfo {
        is_primary_key: true,
        nullable: false,
        ..ColumnInfo::new(name, source_type, pos)
    }
}

/// A trimmed-down Brazilian e-commerce schema.
#[fixture]
fn olist() -> SchemaSnapshot {
    let tables = vec![
        TableInfo::new("public", "customers")
            .with_column(pk("customer_id", "character varying", 1))
            .with_column(ColumnInfo::new("customer_city", "character varying", 2))
            .with_column(ColumnInfo::new("customer_state", "character varying", 3)),
        TableInfo::new("public", "orders")
            .with_column(pk("order_id", "character varying", 1))
            .with_column(ColumnInfo::new("customer_id", "character varying", 2))
            .with_column(ColumnInfo::new("order_status", "character varying", 3))
            .with_column(ColumnInfo::new(
                "order_purchase_timestamp",
                "timestamp without time zone",
                4,
            ))
            .with_foreign_key("customer_id", "customers", "customer_id"),
        TableInfo::new("public", "order_payments")
            .with_column(ColumnInfo::new("order_id", "character varying", 1))
            .with_column(ColumnInfo::new("payment_sequential", "integer", 2))
            .with_column(ColumnInfo::new("payment_type", "character varying", 3))
            .with_column(ColumnInfo::new("payment_installments", "integer", 4))
            .with_column(ColumnInfo::new("payment_value", "numeric(12,2)", 5))
            .with_foreign_key("order_id", "orders", "order_id"),
        TableInfo::new("public", "products")
            .with_column(pk("product_id", "character varying", 1))
            .with_column(ColumnInfo::new("product_category_name", "text", 2))
            .with_column(ColumnInfo::new("product_weight_g", "real", 3))
            .with_column(ColumnInfo::new("is_active", "boolean", 4)),
        TableInfo::new("public", "order_items")
            .with_column(ColumnInfo::new("order_id", "character varying", 1))
            .with_column(ColumnInfo::new("product_id", "character varying", 2))
            .with_column(ColumnInfo::new("seller_id", "character varying", 3))
            .with_column(ColumnInfo::new("price", "numeric", 4))
            .with_column(ColumnInfo::new("shipping_limit_date", "timestamp", 5))
            .with_foreign_key("order_id", "orders", "order_id")
            .with_foreign_key("product_id", "products", "product_id")
            // sellers is not part of the snapshot
            .with_foreign_key("seller_id", "sellers", "seller_id"),
    ];
    let mut snapshot = SchemaSnapshot::new(tables);
    snapshot.samples.insert(
        "orders".to_string(),
        vec![json!({"order_id": "e481f51c", "order_status": "delivered"})],
    );
    snapshot
}

fn options() -> GeneratorOptions {
    GeneratorOptions::new(TableFilter::schema("public"))
}

fn template_generator(
    snapshot: SchemaSnapshot,
) -> Generator<LocalIntrospector, TemplateDescriptions> {
    Generator::new(LocalIntrospector::new(snapshot), TemplateDescriptions, options())
}

struct AlwaysFails {
    calls: AtomicUsize,
}

#[async_trait]
impl TextGenerator for AlwaysFails {
    async fn generate(&self, _system: &str, _prompt: &str) -> Result<String, DescribeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(DescribeError::Timeout)
    }
}

/// Answers with a description for every cube and its `count` measure.
struct Describes;

#[async_trait]
impl TextGenerator for Describes {
    async fn generate(&self, _system: &str, prompt: &str) -> Result<String, DescribeError> {
        assert!(prompt.contains("\"table\""));
        Ok(json!({
            "cube": "Described by the model",
            "measures": {"count": "How many rows there are"},
        })
        .to_string())
    }
}

fn read_tree(root: &Path) -> BTreeMap<String, Vec<u8>> {
    let mut files = BTreeMap::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                pending.push(path);
            } else {
                let key = path.strip_prefix(root).unwrap().display().to_string();
                files.insert(key, fs::read(&path).unwrap());
            }
        }
    }
    files
}

#[rstest]
#[tokio::test]
async fn test_orders_scenario(olist: SchemaSnapshot) {
    let model = template_generator(olist).generate().await.unwrap();
    assert_eq!(model.domain, DomainTag::Ecommerce);

    let orders = model.cubes.iter().find(|c| c.name == "orders").unwrap();
    assert_eq!(orders.classification, TableClassification::Fact);

    let dims: Vec<_> = orders.dimensions.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(
        dims,
        vec!["order_id", "customer_id", "order_status", "order_purchase_timestamp"]
    );
    assert!(orders.dimension("order_id").unwrap().primary_key);
    let purchased = orders.dimension("order_purchase_timestamp").unwrap();
    assert_eq!(purchased.dimension_type, DimensionType::Time);
    assert_eq!(purchased.granularities.len(), 6);

    let measures: Vec<_> = orders.measures.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(measures, vec!["count", "count_distinct"]);

    assert_eq!(orders.joins.len(), 1);
    assert_eq!(orders.joins[0].name, "customers");
    assert_eq!(orders.joins[0].relationship, Relationship::ManyToOne);
}

#[rstest]
#[tokio::test]
async fn test_payment_value_is_currency(olist: SchemaSnapshot) {
    let model = template_generator(olist).generate().await.unwrap();
    let payments = model
        .cubes
        .iter()
        .find(|c| c.name == "order_payments")
        .unwrap();
    for aggregation in ["sum", "avg", "min", "max"] {
        let measure = payments
            .measure(&format!("{}_payment_value", aggregation))
            .unwrap();
        assert_eq!(measure.format, Some(MeasureFormat::Currency));
    }
}

#[rstest]
#[tokio::test]
async fn test_dimension_and_measure_counts(olist: SchemaSnapshot) {
    let model = template_generator(olist).generate().await.unwrap();
    let mapper = TypeMapper::new();
    for (table, cube) in model.tables.iter().zip(&model.cubes) {
        assert_eq!(cube.dimensions.len(), table.columns.len(), "{}", table.name);
        let numeric = table
            .columns
            .iter()
            .filter(|c| !c.is_key() && mapper.is_numeric(&c.source_type))
            .count();
        assert_eq!(cube.measures.len(), 2 + 4 * numeric, "{}", table.name);
        assert!(cube.validate().is_empty(), "{:?}", cube.validate());
    }
}

#[rstest]
#[tokio::test]
async fn test_joins_only_reference_introspected_tables(olist: SchemaSnapshot) {
    let mut options = options();
    options.joins.reverse = true;
    options.joins.infer = true;
    let generator = Generator::new(LocalIntrospector::new(olist), TemplateDescriptions, options);
    let model = generator.generate().await.unwrap();

    let items = model.cubes.iter().find(|c| c.name == "order_items").unwrap();
    let targets: Vec<_> = items.joins.iter().map(|j| j.target_table.as_str()).collect();
    assert_eq!(targets, vec!["orders", "products"]);

    for cube in &model.cubes {
        for join in &cube.joins {
            assert!(
                model.tables.iter().any(|t| t.name == join.target_table),
                "{} joins unknown table {}",
                cube.name,
                join.target_table
            );
        }
    }
}

#[rstest]
#[tokio::test]
async fn test_failing_llm_falls_back_to_templates(olist: SchemaSnapshot) {
    let expected = template_generator(olist.clone()).generate().await.unwrap();

    let mut options = options();
    options.sample_rows = 2;
    options.concurrency = 3;
    let generator = Generator::new(
        LocalIntrospector::new(olist),
        LlmDescriptions::new(AlwaysFails {
            calls: AtomicUsize::new(0),
        }),
        options,
    );
    let model = generator.generate().await.unwrap();

    assert_eq!(model.cubes, expected.cubes);
    assert_eq!(generator.description_provider(), "llm");
}

#[rstest]
#[tokio::test]
async fn test_llm_descriptions_override_templates(olist: SchemaSnapshot) {
    let generator = Generator::new(
        LocalIntrospector::new(olist),
        LlmDescriptions::new(Describes),
        options(),
    );
    let model = generator.generate().await.unwrap();
    for cube in &model.cubes {
        assert_eq!(cube.description, "Described by the model");
        assert_eq!(cube.measures[0].description, "How many rows there are");
        assert_eq!(
            cube.measures[1].description,
            format!("Count of unique {} records", cube.table)
        );
    }
}

#[rstest]
#[tokio::test]
async fn test_output_is_byte_identical_across_runs(olist: SchemaSnapshot) {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    let generator = template_generator(olist);

    generator.run(&Emitter::new(first.path()), true).await.unwrap();
    generator.run(&Emitter::new(second.path()), true).await.unwrap();

    let first_files = read_tree(first.path());
    assert!(first_files.contains_key("cubes/orders.yml"));
    assert!(first_files.contains_key("views/business_metrics.yml"));
    assert!(first_files.contains_key("README.md"));
    assert!(first_files.contains_key("generation_summary.json"));
    assert_eq!(first_files, read_tree(second.path()));
}

#[rstest]
#[tokio::test]
async fn test_cube_file_contents(olist: SchemaSnapshot) {
    let dir = tempfile::tempdir().unwrap();
    template_generator(olist)
        .run(&Emitter::new(dir.path()), false)
        .await
        .unwrap();

    let yaml = fs::read_to_string(dir.path().join("cubes/orders.yml")).unwrap();
    let doc: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
    let cube = &doc["cubes"][0];
    assert_eq!(cube["name"].as_str(), Some("orders"));
    assert_eq!(cube["sql_table"].as_str(), Some("public.orders"));
    assert_eq!(cube["measures"][0]["type"].as_str(), Some("count"));
    assert!(cube["measures"][0].get("sql").is_none());
    assert_eq!(
        cube["joins"][0]["sql"].as_str(),
        Some("{CUBE}.customer_id = {customers}.customer_id")
    );
    assert_eq!(
        cube["dimensions"][3]["granularities"][0]["interval"].as_str(),
        Some("1 hour")
    );
    assert!(!dir.path().join("generation_summary.json").exists());
}

#[rstest]
#[tokio::test]
async fn test_unknown_schema_aborts(olist: SchemaSnapshot) {
    let generator = Generator::new(
        LocalIntrospector::new(olist),
        TemplateDescriptions,
        GeneratorOptions::new(TableFilter::schema("warehouse")),
    );
    let err = generator.generate().await.unwrap_err();
    assert!(matches!(
        err,
        GenerateError::Introspect(IntrospectError::SchemaNotFound(_))
    ));
}

#[rstest]
#[tokio::test]
async fn test_write_failures_are_reported_after_the_run(olist: SchemaSnapshot) {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("views"), "in the way").unwrap();
    let err = template_generator(olist)
        .run(&Emitter::new(dir.path()), false)
        .await
        .unwrap_err();
    assert!(matches!(err, GenerateError::PartialWrite(n) if n == 3));
    // cubes were still written
    assert!(dir.path().join("cubes/orders.yml").exists());
}

#[rstest]
#[tokio::test]
async fn test_dry_run_render_and_options(olist: SchemaSnapshot) {
    let mut options = options();
    options.views = false;
    options.domain = Some(DomainTag::Generic);
    options.synthesis.pre_aggregations = true;
    options.filter = TableFilter::schema("public")
        .with_tables(vec!["orders".to_string(), "customers".to_string()]);
    let generator = Generator::new(LocalIntrospector::new(olist), TemplateDescriptions, options);
    let model = generator.generate().await.unwrap();

    assert_eq!(model.domain, DomainTag::Generic);
    assert!(model.views.is_empty());
    // generic profile has no `orders` table list, so no fact and no rollup
    assert!(model.cubes.iter().all(|c| c.pre_aggregations.is_empty()));

    let rendered = model.render().unwrap();
    assert!(rendered.starts_with("---\n# cubes/customers.yml\ncubes:\n"));
    assert!(rendered.contains("# cubes/orders.yml"));
    assert!(!rendered.contains("# views/"));
}

#[rstest]
#[tokio::test]
async fn test_pre_aggregations_for_fact_tables(olist: SchemaSnapshot) {
    let mut options = options();
    options.synthesis.pre_aggregations = true;
    let generator = Generator::new(LocalIntrospector::new(olist), TemplateDescriptions, options);
    let model = generator.generate().await.unwrap();
    let orders = model.cubes.iter().find(|c| c.name == "orders").unwrap();
    assert_eq!(orders.pre_aggregations.len(), 1);
    assert_eq!(
        orders.pre_aggregations[0].dimensions,
        vec!["CUBE.order_status"]
    );
    let customers = model.cubes.iter().find(|c| c.name == "customers").unwrap();
    assert!(customers.pre_aggregations.is_empty());
}

#[rstest]
#[tokio::test]
async fn test_dump_schema_round_trips(olist: SchemaSnapshot) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("schema.json");
    let mut dump_options = options();
    dump_options.sample_rows = 5;
    let generator = Generator::new(LocalIntrospector::new(olist), TemplateDescriptions, dump_options);
    assert_eq!(generator.dump_schema(&path).await.unwrap(), 5);

    let reloaded = LocalIntrospector::from_path(&path).unwrap();
    let again = Generator::new(reloaded, TemplateDescriptions, options());
    let model = again.generate().await.unwrap();
    assert_eq!(model.cubes.len(), 5);

    let snapshot = SchemaSnapshot::read(&path).unwrap();
    assert_eq!(snapshot.samples.len(), 1);
    assert_eq!(snapshot.samples["orders"][0]["order_status"], "delivered");
}

#[rstest]
#[tokio::test]
async fn test_tables_that_sanitize_alike_get_their_own_cube_files(mut olist: SchemaSnapshot) {
    olist.tables.push(
        TableInfo::new("public", "Orders")
            .with_column(pk("Order Id", "integer", 1))
            .with_column(ColumnInfo::new("customer_id", "character varying", 2))
            .with_foreign_key("customer_id", "customers", "customer_id"),
    );
    let dir = tempfile::tempdir().unwrap();
    let model = template_generator(olist)
        .run(&Emitter::new(dir.path()), false)
        .await
        .unwrap();

    let orders = model.cubes.iter().find(|c| c.name == "orders").unwrap();
    assert_eq!(orders.sql_table, "public.orders");
    let shadow = model.cubes.iter().find(|c| c.name == "orders_2").unwrap();
    assert_eq!(shadow.sql_table, "public.\"Orders\"");

    let files = read_tree(dir.path());
    assert!(files.contains_key("cubes/orders.yml"));
    let doc: serde_yaml::Value = serde_yaml::from_slice(&files["cubes/orders_2.yml"]).unwrap();
    assert_eq!(doc["cubes"][0]["sql_table"].as_str(), Some("public.\"Orders\""));

    // joins into the lowercase table still target its cube
    let payments = model.cubes.iter().find(|c| c.name == "order_payments").unwrap();
    assert_eq!(payments.joins[0].target_cube, "orders");
}

#[rstest]
#[tokio::test]
async fn test_backup_clears_cubes_of_dropped_tables(olist: SchemaSnapshot) {
    let dir = tempfile::tempdir().unwrap();
    let emitter = Emitter::new(dir.path());
    template_generator(olist.clone())
        .run(&emitter, false)
        .await
        .unwrap();

    let backup = emitter.backup_existing("20261017_120000").unwrap().unwrap();
    let mut narrowed = options();
    narrowed.filter = TableFilter::schema("public")
        .with_tables(vec!["orders".to_string(), "customers".to_string()]);
    Generator::new(LocalIntrospector::new(olist), TemplateDescriptions, narrowed)
        .run(&emitter, false)
        .await
        .unwrap();

    let cubes: Vec<String> = read_tree(&dir.path().join("cubes")).into_keys().collect();
    assert_eq!(cubes, vec!["customers.yml", "orders.yml"]);
    assert!(backup.join("cubes/order_items.yml").exists());
    assert!(backup.join("views/business_metrics.yml").exists());
}

#[rstest]
#[tokio::test]
async fn test_type_override_maps_user_defined_columns(mut olist: SchemaSnapshot) {
    olist.tables[3] = olist.tables[3]
        .clone()
        .with_column(ColumnInfo::new("shelf_rank", "shelf_rank_t", 5));
    let mut overridden = options();
    overridden.type_overrides = vec!["shelf_rank_t=number".parse().unwrap()];
    let generator = Generator::new(
        LocalIntrospector::new(olist.clone()),
        TemplateDescriptions,
        overridden,
    );
    let model = generator.generate().await.unwrap();
    let products = model.cubes.iter().find(|c| c.name == "products").unwrap();
    assert_eq!(
        products.dimension("shelf_rank").unwrap().dimension_type,
        DimensionType::Number
    );
    assert!(products.measure("sum_shelf_rank").is_some());

    let model = template_generator(olist).generate().await.unwrap();
    let products = model.cubes.iter().find(|c| c.name == "products").unwrap();
    assert_eq!(
        products.dimension("shelf_rank").unwrap().dimension_type,
        DimensionType::String
    );
}
