//! PostgreSQL catalog reader.
//!
//! Every query is read-only and keyed by (schema, table). No transaction is
//! held across queries; a slightly stale view of the catalog is acceptable.

use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use tokio_postgres::Client;
use tracing::{debug, info, warn};

use super::types::{
    merge_unique_sources, CatalogModel, Column, EnumColumn, ForeignKeyConstraint,
    ReverseForeignKey, UniqueConstraint, UniqueOrigin,
};
use super::{CatalogSource, SslMode};
use crate::config::DatabaseConfig;
use crate::error::{MigrateError, Result};

const COLUMNS_QUERY: &str = r#"
    SELECT
        column_name::text,
        data_type::text,
        udt_name::text,
        is_nullable = 'YES',
        column_default::text,
        character_maximum_length::int4,
        numeric_precision::int4,
        numeric_scale::int4,
        ordinal_position::int4
    FROM information_schema.columns
    WHERE table_schema = $1 AND table_name = $2
    ORDER BY ordinal_position
"#;

const PRIMARY_KEY_QUERY: &str = r#"
    SELECT a.attname::text
    FROM pg_catalog.pg_constraint c
    JOIN pg_catalog.pg_class t ON t.oid = c.conrelid
    JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
    JOIN pg_catalog.pg_attribute a ON a.attrelid = t.oid
    WHERE n.nspname = $1
      AND t.relname = $2
      AND c.contype = 'p'
      AND a.attnum = ANY(c.conkey)
    ORDER BY array_position(c.conkey, a.attnum)
"#;

const FOREIGN_KEYS_QUERY: &str = r#"
    SELECT
        c.conname::text,
        array_agg(a.attname::text ORDER BY k.ord) AS columns,
        rt.relname::text AS ref_table,
        array_agg(ra.attname::text ORDER BY k.ord) AS ref_columns
    FROM pg_catalog.pg_constraint c
    JOIN pg_catalog.pg_class t ON t.oid = c.conrelid
    JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
    JOIN pg_catalog.pg_class rt ON rt.oid = c.confrelid
    CROSS JOIN LATERAL unnest(c.conkey, c.confkey) WITH ORDINALITY AS k(attnum, ref_attnum, ord)
    JOIN pg_catalog.pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum
    JOIN pg_catalog.pg_attribute ra ON ra.attrelid = rt.oid AND ra.attnum = k.ref_attnum
    WHERE n.nspname = $1
      AND t.relname = $2
      AND c.contype = 'f'
    GROUP BY c.conname, rt.relname
    ORDER BY min(a.attnum), c.conname
"#;

const UNIQUE_CONSTRAINTS_QUERY: &str = r#"
    SELECT
        c.conname::text,
        array_agg(a.attname::text ORDER BY k.ord) AS columns
    FROM pg_catalog.pg_constraint c
    JOIN pg_catalog.pg_class t ON t.oid = c.conrelid
    JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
    CROSS JOIN LATERAL unnest(c.conkey) WITH ORDINALITY AS k(attnum, ord)
    JOIN pg_catalog.pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum
    WHERE n.nspname = $1
      AND t.relname = $2
      AND c.contype = 'u'
    GROUP BY c.conname
    ORDER BY c.conname
"#;

// Expression and partial indexes do not describe a plain column set.
const UNIQUE_INDEXES_QUERY: &str = r#"
    SELECT
        i.relname::text,
        array_agg(a.attname::text ORDER BY k.ord) AS columns
    FROM pg_catalog.pg_index ix
    JOIN pg_catalog.pg_class i ON i.oid = ix.indexrelid
    JOIN pg_catalog.pg_class t ON t.oid = ix.indrelid
    JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
    CROSS JOIN LATERAL unnest(ix.indkey::int2[]) WITH ORDINALITY AS k(attnum, ord)
    JOIN pg_catalog.pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum
    WHERE n.nspname = $1
      AND t.relname = $2
      AND ix.indisunique
      AND NOT ix.indisprimary
      AND ix.indexprs IS NULL
      AND ix.indpred IS NULL
      AND k.ord <= ix.indnkeyatts
      AND NOT EXISTS (
          SELECT 1 FROM pg_catalog.pg_constraint c WHERE c.conindid = ix.indexrelid
      )
    GROUP BY i.relname
    ORDER BY i.relname
"#;

const ENUM_COLUMNS_QUERY: &str = r#"
    SELECT
        a.attname::text,
        ty.typname::text,
        array_agg(e.enumlabel::text ORDER BY e.enumsortorder) AS labels
    FROM pg_catalog.pg_attribute a
    JOIN pg_catalog.pg_class t ON t.oid = a.attrelid
    JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
    JOIN pg_catalog.pg_type ty ON ty.oid = a.atttypid
    JOIN pg_catalog.pg_enum e ON e.enumtypid = ty.oid
    WHERE n.nspname = $1
      AND t.relname = $2
      AND a.attnum > 0
      AND NOT a.attisdropped
      AND ty.typtype = 'e'
    GROUP BY a.attname, a.attnum, ty.typname
    ORDER BY a.attnum
"#;

const REVERSE_FOREIGN_KEYS_QUERY: &str = r#"
    SELECT
        st.relname::text AS source_table,
        sa.attname::text AS source_column,
        ta.attname::text AS target_column
    FROM pg_catalog.pg_constraint c
    JOIN pg_catalog.pg_class t ON t.oid = c.confrelid
    JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
    JOIN pg_catalog.pg_class st ON st.oid = c.conrelid
    JOIN pg_catalog.pg_attribute sa ON sa.attrelid = st.oid AND sa.attnum = c.conkey[1]
    JOIN pg_catalog.pg_attribute ta ON ta.attrelid = t.oid AND ta.attnum = c.confkey[1]
    WHERE n.nspname = $1
      AND t.relname = $2
      AND c.contype = 'f'
      AND array_length(c.conkey, 1) = 1
    ORDER BY st.relname, sa.attnum
"#;

/// Catalog reader backed by a deadpool-postgres pool.
pub struct PgCatalog {
    pool: Pool,
}

impl PgCatalog {
    /// Connect to the catalog described by `config`.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pg_config = config.pg_config()?;
        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };

        let ssl_mode = SslMode::parse(&config.ssl_mode)?;
        let pool = match ssl_mode.connector()? {
            None => {
                let mgr = Manager::from_config(pg_config, tokio_postgres::NoTls, mgr_config);
                Pool::builder(mgr)
                    .max_size(2)
                    .build()
                    .map_err(|e| MigrateError::pool(e, "creating catalog pool"))?
            }
            Some(tls) => {
                let mgr = Manager::from_config(pg_config, tls, mgr_config);
                Pool::builder(mgr)
                    .max_size(2)
                    .build()
                    .map_err(|e| MigrateError::pool(e, "creating catalog pool"))?
            }
        };

        let client = pool
            .get()
            .await
            .map_err(|e| MigrateError::pool(e, "testing catalog connection"))?;
        client.simple_query("SELECT 1").await?;

        info!(
            "Connected to catalog: {} (TLS {})",
            config.endpoint(),
            if ssl_mode.requires_tls() { "on" } else { "off" }
        );

        Ok(Self { pool })
    }
}

#[async_trait]
impl CatalogSource for PgCatalog {
    async fn read_table(&self, schema: &str, table: &str) -> Result<CatalogModel> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| MigrateError::pool(e, "getting connection for read_table"))?;

        let columns = load_columns(&client, schema, table).await?;
        if columns.is_empty() {
            return Err(MigrateError::TableNotFound {
                schema: schema.to_string(),
                table: table.to_string(),
            });
        }

        let primary_key = load_primary_key(&client, schema, table).await?;
        let (foreign_keys, skipped_foreign_keys) =
            load_foreign_keys(&client, schema, table).await?;
        let unique_constraints = merge_unique_sources(
            load_unique(&client, UNIQUE_CONSTRAINTS_QUERY, UniqueOrigin::Constraint, schema, table)
                .await?,
            load_unique(&client, UNIQUE_INDEXES_QUERY, UniqueOrigin::Index, schema, table).await?,
        );
        let enum_columns = load_enum_columns(&client, schema, table).await?;
        let reverse_foreign_keys = load_reverse_foreign_keys(&client, schema, table).await?;

        let model = CatalogModel {
            schema: schema.to_string(),
            table: table.to_string(),
            columns,
            primary_key,
            foreign_keys,
            reverse_foreign_keys,
            unique_constraints,
            enum_columns,
            skipped_foreign_keys,
        };

        info!(
            "Read catalog for {}: {} columns, {} foreign keys, {} reverse foreign keys, {} unique, {} enums",
            model.full_name(),
            model.columns.len(),
            model.foreign_keys.len(),
            model.reverse_foreign_keys.len(),
            model.unique_constraints.len(),
            model.enum_columns.len()
        );
        Ok(model)
    }

    fn db_type(&self) -> &str {
        "postgres"
    }
}

async fn load_columns(client: &Client, schema: &str, table: &str) -> Result<Vec<Column>> {
    let rows = client.query(COLUMNS_QUERY, &[&schema, &table]).await?;

    let columns: Vec<Column> = rows
        .iter()
        .map(|row| Column {
            name: row.get(0),
            data_type: row.get(1),
            udt_name: row.get(2),
            is_nullable: row.get(3),
            default: row.get(4),
            max_length: row.get(5),
            precision: row.get(6),
            scale: row.get(7),
            ordinal_pos: row.get(8),
        })
        .collect();

    debug!("Loaded {} columns for {}.{}", columns.len(), schema, table);
    Ok(columns)
}

async fn load_primary_key(client: &Client, schema: &str, table: &str) -> Result<Vec<String>> {
    let rows = client.query(PRIMARY_KEY_QUERY, &[&schema, &table]).await?;
    let primary_key: Vec<String> = rows.iter().map(|row| row.get(0)).collect();

    debug!("Primary key for {}.{}: {:?}", schema, table, primary_key);
    Ok(primary_key)
}

async fn load_foreign_keys(
    client: &Client,
    schema: &str,
    table: &str,
) -> Result<(Vec<ForeignKeyConstraint>, Vec<String>)> {
    let rows = client.query(FOREIGN_KEYS_QUERY, &[&schema, &table]).await?;

    let mut foreign_keys = Vec::new();
    let mut skipped = Vec::new();
    for row in rows {
        let name: String = row.get(0);
        let columns: Vec<String> = row.get(1);
        let ref_table: String = row.get(2);
        let ref_columns: Vec<String> = row.get(3);

        match (columns.as_slice(), ref_columns.as_slice()) {
            ([column], [ref_column]) => foreign_keys.push(ForeignKeyConstraint {
                name,
                column: column.clone(),
                ref_table,
                ref_column: ref_column.clone(),
            }),
            _ => {
                warn!(
                    "Skipping composite foreign key {} on {}.{} ({:?} -> {}{:?})",
                    name, schema, table, columns, ref_table, ref_columns
                );
                skipped.push(name);
            }
        }
    }

    debug!(
        "Loaded {} foreign keys for {}.{}",
        foreign_keys.len(),
        schema,
        table
    );
    Ok((foreign_keys, skipped))
}

async fn load_unique(
    client: &Client,
    query: &str,
    origin: UniqueOrigin,
    schema: &str,
    table: &str,
) -> Result<Vec<UniqueConstraint>> {
    let rows = client.query(query, &[&schema, &table]).await?;

    let uniques: Vec<UniqueConstraint> = rows
        .iter()
        .map(|row| UniqueConstraint {
            name: row.get(0),
            columns: row.get(1),
            origin,
        })
        .collect();

    debug!(
        "Loaded {} unique {:?} entries for {}.{}",
        uniques.len(),
        origin,
        schema,
        table
    );
    Ok(uniques)
}

async fn load_enum_columns(client: &Client, schema: &str, table: &str) -> Result<Vec<EnumColumn>> {
    let rows = client.query(ENUM_COLUMNS_QUERY, &[&schema, &table]).await?;

    let enums: Vec<EnumColumn> = rows
        .iter()
        .map(|row| EnumColumn {
            column: row.get(0),
            type_name: row.get(1),
            labels: row.get(2),
        })
        .collect();

    debug!("Loaded {} enum columns for {}.{}", enums.len(), schema, table);
    Ok(enums)
}

async fn load_reverse_foreign_keys(
    client: &Client,
    schema: &str,
    table: &str,
) -> Result<Vec<ReverseForeignKey>> {
    let rows = client
        .query(REVERSE_FOREIGN_KEYS_QUERY, &[&schema, &table])
        .await?;

    let reverse: Vec<ReverseForeignKey> = rows
        .iter()
        .map(|row| ReverseForeignKey {
            source_table: row.get(0),
            source_column: row.get(1),
            target_column: row.get(2),
        })
        .collect();

    debug!(
        "Loaded {} reverse foreign keys for {}.{}",
        reverse.len(),
        schema,
        table
    );
    Ok(reverse)
}
