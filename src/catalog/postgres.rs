use super::{IntrospectError, SchemaIntrospector, TableFilter};
use crate::config::PostgresConfig;
use crate::schema::{ColumnInfo, ColumnRef, ForeignKey, TableInfo};
use crate::synthesizer::naming::quote_identifier;
use async_trait::async_trait;
use log::{debug, error, info, warn};
use serde_json::Value;
use std::collections::BTreeMap;
use tokio_postgres::{Client, NoTls};

const SCHEMA_EXISTS_SQL: &str =
    "SELECT EXISTS (SELECT 1 FROM information_schema.schemata WHERE schema_name = $1)";

const TABLES_SQL: &str = "SELECT table_name::text
    FROM information_schema.tables
    WHERE table_schema = $1 AND table_type = 'BASE TABLE'
    ORDER BY table_name";

const COLUMNS_SQL: &str = "SELECT table_name::text, column_name::text, data_type::text,
        udt_name::text, (is_nullable = 'YES') AS nullable, ordinal_position::int4
    FROM information_schema.columns
    WHERE table_schema = $1
    ORDER BY table_name, ordinal_position";

const PRIMARY_KEYS_SQL: &str = "SELECT kcu.table_name::text, kcu.column_name::text
    FROM information_schema.table_constraints tc
    JOIN information_schema.key_column_usage kcu
      ON tc.constraint_name = kcu.constraint_name
     AND tc.table_schema = kcu.table_schema
     AND tc.table_name = kcu.table_name
    WHERE tc.constraint_type = 'PRIMARY KEY' AND tc.table_schema = $1
    ORDER BY kcu.table_name, kcu.ordinal_position";

const FOREIGN_KEYS_SQL: &str = "SELECT con.conname::text, src.relname::text,
        tgt_ns.nspname::text, tgt.relname::text, sa.attname::text, ta.attname::text
    FROM pg_constraint con
    JOIN pg_class src ON src.oid = con.conrelid
    JOIN pg_namespace src_ns ON src_ns.oid = src.relnamespace
    JOIN pg_class tgt ON tgt.oid = con.confrelid
    JOIN pg_namespace tgt_ns ON tgt_ns.oid = tgt.relnamespace
    CROSS JOIN LATERAL unnest(con.conkey, con.confkey)
        WITH ORDINALITY AS k(src_attnum, tgt_attnum, ord)
    JOIN pg_attribute sa ON sa.attrelid = con.conrelid AND sa.attnum = k.src_attnum
    JOIN pg_attribute ta ON ta.attrelid = con.confrelid AND ta.attnum = k.tgt_attnum
    WHERE con.contype = 'f' AND src_ns.nspname = $1
    ORDER BY src.relname, con.conname, k.ord";

/// One row of `information_schema.columns`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRow {
    pub table: String,
    pub name: String,
    pub data_type: String,
    pub udt_name: String,
    pub nullable: bool,
    pub ordinal_position: i32,
}

impl ColumnRow {
    /// `ARRAY` and `USER-DEFINED` say nothing useful; the udt name does.
    fn source_type(&self) -> &str {
        match self.data_type.as_str() {
            "ARRAY" | "USER-DEFINED" => &self.udt_name,
            _ => &self.data_type,
        }
    }
}

/// One column pair of a foreign key constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyRow {
    pub constraint: String,
    pub table: String,
    pub referenced_schema: String,
    pub referenced_table: String,
    pub column: String,
    pub referenced_column: String,
}

/// Builds [`TableInfo`]s from raw catalog rows. Rows for tables outside
/// `table_names` are ignored.
pub fn assemble_tables(
    schema: &str,
    table_names: &[String],
    columns: Vec<ColumnRow>,
    primary_keys: Vec<(String, String)>,
    foreign_keys: Vec<ForeignKeyRow>,
) -> Vec<TableInfo> {
    let mut tables: BTreeMap<String, TableInfo> = table_names
        .iter()
        .map(|name| (name.clone(), TableInfo::new(schema, name)))
        .collect();

    for row in columns {
        if let Some(table) = tables.get_mut(&row.table) {
            let mut column = ColumnInfo::new(&row.name, row.source_type(), row.ordinal_position);
            column.nullable = row.nullable;
            table.columns.push(column);
        }
    }

    for (table_name, column_name) in primary_keys {
        if let Some(column) = tables
            .get_mut(&table_name)
            .and_then(|t| t.columns.iter_mut().find(|c| c.name == column_name))
        {
            column.is_primary_key = true;
        }
    }

    // Rows arrive ordered by table, constraint, then key position.
    for row in foreign_keys {
        let Some(table) = tables.get_mut(&row.table) else {
            continue;
        };
        if let Some(column) = table.columns.iter_mut().find(|c| c.name == row.column) {
            column.references = Some(ColumnRef {
                table: row.referenced_table.clone(),
                column: row.referenced_column.clone(),
            });
        }
        match table.foreign_keys.iter_mut().find(|fk| fk.name == row.constraint) {
            Some(fk) => {
                fk.columns.push(row.column);
                fk.referenced_columns.push(row.referenced_column);
            }
            None => table.foreign_keys.push(ForeignKey {
                name: row.constraint,
                columns: vec![row.column],
                referenced_schema: row.referenced_schema,
                referenced_table: row.referenced_table,
                referenced_columns: vec![row.referenced_column],
            }),
        }
    }

    tables.into_values().collect()
}

pub struct PostgresIntrospector {
    client: Client,
}

impl PostgresIntrospector {
    pub async fn connect(config: &PostgresConfig) -> Result<Self, IntrospectError> {
        let mut pg_config = tokio_postgres::Config::new();
        pg_config
            .host(&config.host)
            .port(config.port)
            .dbname(&config.dbname)
            .user(&config.user)
            .password(config.password.as_str());

        let (client, connection) = pg_config
            .connect(NoTls)
            .await
            .map_err(|e| IntrospectError::Connection(e.to_string()))?;

        // Spawn a task to drive the connection
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("Postgres connection error: {}", e);
            }
        });

        info!(
            "Connected to postgres at {}:{}/{}",
            config.host, config.port, config.dbname
        );
        Ok(PostgresIntrospector { client })
    }

    async fn query(
        &self,
        sql: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> Result<Vec<tokio_postgres::Row>, IntrospectError> {
        debug!("Catalog query: {}", sql);
        self.client
            .query(sql, params)
            .await
            .map_err(|e| IntrospectError::Query(e.to_string()))
    }
}

fn get<'a, T: tokio_postgres::types::FromSql<'a>>(
    row: &'a tokio_postgres::Row,
    idx: usize,
) -> Result<T, IntrospectError> {
    row.try_get(idx)
        .map_err(|e| IntrospectError::Query(e.to_string()))
}

#[async_trait]
impl SchemaIntrospector for PostgresIntrospector {
    async fn introspect(&self, filter: &TableFilter) -> Result<Vec<TableInfo>, IntrospectError> {
        let schema = filter.schema.as_str();

        let exists = self.query(SCHEMA_EXISTS_SQL, &[&schema]).await?;
        let found: bool = match exists.first() {
            Some(row) => get(row, 0)?,
            None => false,
        };
        if !found {
            return Err(IntrospectError::SchemaNotFound(schema.to_string()));
        }

        let mut table_names = Vec::new();
        for row in self.query(TABLES_SQL, &[&schema]).await? {
            let name: String = get(&row, 0)?;
            if filter.allows(&name) {
                table_names.push(name);
            }
        }

        let mut columns = Vec::new();
        for row in self.query(COLUMNS_SQL, &[&schema]).await? {
            columns.push(ColumnRow {
                table: get(&row, 0)?,
                name: get(&row, 1)?,
                data_type: get(&row, 2)?,
                udt_name: get(&row, 3)?,
                nullable: get(&row, 4)?,
                ordinal_position: get(&row, 5)?,
            });
        }

        let mut primary_keys = Vec::new();
        for row in self.query(PRIMARY_KEYS_SQL, &[&schema]).await? {
            primary_keys.push((get(&row, 0)?, get(&row, 1)?));
        }

        let mut foreign_keys = Vec::new();
        for row in self.query(FOREIGN_KEYS_SQL, &[&schema]).await? {
            foreign_keys.push(ForeignKeyRow {
                constraint: get(&row, 0)?,
                table: get(&row, 1)?,
                referenced_schema: get(&row, 2)?,
                referenced_table: get(&row, 3)?,
                column: get(&row, 4)?,
                referenced_column: get(&row, 5)?,
            });
        }

        let tables = assemble_tables(schema, &table_names, columns, primary_keys, foreign_keys);
        for missing in filter.missing(&tables) {
            warn!("Table {}.{} not found, skipping", schema, missing);
        }
        info!("Introspected {} tables in schema {}", tables.len(), schema);
        Ok(tables)
    }

    async fn sample_rows(
        &self,
        table: &TableInfo,
        limit: usize,
    ) -> Result<Vec<Value>, IntrospectError> {
        let sql = format!(
            "SELECT row_to_json(t)::text FROM {}.{} t LIMIT $1",
            quote_identifier(&table.schema),
            quote_identifier(&table.name)
        );
        let limit = limit as i64;
        let mut samples = Vec::new();
        for row in self.query(&sql, &[&limit]).await? {
            let text: String = get(&row, 0)?;
            let value = serde_json::from_str(&text)
                .map_err(|e| IntrospectError::Query(e.to_string()))?;
            samples.push(value);
        }
        Ok(samples)
    }
}
