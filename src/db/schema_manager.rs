//! Schema introspection.
//!
//! The schema is read once at startup and rendered into the plain-text form
//! that is handed to the model with every question. It is never refreshed,
//! so tables created after startup are invisible until the next restart.

use async_trait::async_trait;
use sqlx::mysql::{MySqlPool, MySqlRow};
use sqlx::Row;
use std::fmt::Write;
use tracing::{debug, info, warn};

/// A single column as reported by the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub data_type: String,
}

/// A table and, if they could be read, its columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub name: String,
    /// `None` when the column listing failed for this table.
    pub columns: Option<Vec<Column>>,
}

/// Source of table and column listings.
#[async_trait]
pub trait SchemaCatalog: Send + Sync {
    /// Table names, in the order the database reports them.
    async fn list_tables(&self) -> Result<Vec<String>, sqlx::Error>;

    /// Columns of `table`, in the order the database reports them.
    async fn list_columns(&self, table: &str) -> Result<Vec<Column>, sqlx::Error>;
}

/// Reads every table and its columns from `catalog`.
///
/// Failing to list tables is an error. Failing to list one table's columns
/// is logged and that table is kept without columns.
pub async fn introspect(catalog: &dyn SchemaCatalog) -> Result<Vec<TableSchema>, sqlx::Error> {
    let tables = catalog.list_tables().await?;
    info!("Found {} tables", tables.len());

    let mut schema = Vec::with_capacity(tables.len());
    for table in tables {
        let columns = match catalog.list_columns(&table).await {
            Ok(columns) => {
                debug!("Table {} has {} columns", table, columns.len());
                Some(columns)
            }
            Err(e) => {
                warn!(table = %table, error = %e, "Failed to read columns, skipping them");
                None
            }
        };
        schema.push(TableSchema {
            name: table,
            columns,
        });
    }

    Ok(schema)
}

/// Renders the schema as text for the model.
///
/// ```text
/// Table: users
///  - id (int)
///  - email (varchar(255))
///
/// ```
pub fn render_schema(tables: &[TableSchema]) -> String {
    let mut out = String::new();
    for table in tables {
        let _ = writeln!(out, "Table: {}", table.name);
        if let Some(columns) = &table.columns {
            for column in columns {
                let _ = writeln!(out, " - {} ({})", column.name, column.data_type);
            }
            out.push('\n');
        }
    }
    out
}

/// Introspects and renders in one go.
pub async fn load_schema_text(catalog: &dyn SchemaCatalog) -> Result<String, sqlx::Error> {
    let tables = introspect(catalog).await?;
    let text = render_schema(&tables);
    info!("Schema text built ({} bytes)", text.len());
    Ok(text)
}

/// Quotes a MySQL identifier with backticks.
fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// MySQL may hand back VARBINARY instead of VARCHAR depending on charset configuration.
fn get_string_by_index(row: &MySqlRow, index: usize) -> Option<String> {
    row.try_get::<String, _>(index).ok().or_else(|| {
        row.try_get::<Vec<u8>, _>(index)
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
    })
}

fn get_string(row: &MySqlRow, column: &str) -> Option<String> {
    row.try_get::<String, _>(column).ok().or_else(|| {
        row.try_get::<Vec<u8>, _>(column)
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
    })
}

/// Every listed table must have a readable name; one that does not fails the listing.
fn collect_table_names<I>(names: I) -> Result<Vec<String>, sqlx::Error>
where
    I: IntoIterator<Item = Option<String>>,
{
    names
        .into_iter()
        .enumerate()
        .map(|(index, name)| {
            name.ok_or_else(|| {
                sqlx::Error::Decode(format!("table name in row {} is not valid UTF-8", index).into())
            })
        })
        .collect()
}

#[async_trait]
impl SchemaCatalog for MySqlPool {
    async fn list_tables(&self) -> Result<Vec<String>, sqlx::Error> {
        let rows = sqlx::query("SHOW TABLES").fetch_all(self).await?;

        // The single column is named after the database ("Tables_in_<db>")
        collect_table_names(rows.iter().map(|row| get_string_by_index(row, 0)))
    }

    async fn list_columns(&self, table: &str) -> Result<Vec<Column>, sqlx::Error> {
        let query = format!("SHOW COLUMNS FROM {}", quote_identifier(table));
        let rows = sqlx::query(&query).fetch_all(self).await?;

        rows.iter()
            .map(|row| {
                let name = get_string(row, "Field")
                    .ok_or_else(|| sqlx::Error::ColumnNotFound("Field".to_string()))?;
                let data_type = get_string(row, "Type")
                    .ok_or_else(|| sqlx::Error::ColumnNotFound("Type".to_string()))?;
                Ok(Column { name, data_type })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    /// In-memory catalog; tables listed in `broken` fail their column listing.
    struct FakeCatalog {
        tables: Vec<(String, Vec<Column>)>,
        broken: HashSet<String>,
        unlistable: bool,
    }

    impl FakeCatalog {
        fn new(tables: Vec<(&str, Vec<(&str, &str)>)>) -> Self {
            Self {
                tables: tables
                    .into_iter()
                    .map(|(name, cols)| {
                        (
                            name.to_string(),
                            cols.iter()
                                .map(|(n, t)| Column {
                                    name: n.to_string(),
                                    data_type: t.to_string(),
                                })
                                .collect(),
                        )
                    })
                    .collect(),
                broken: HashSet::new(),
                unlistable: false,
            }
        }

        fn break_table(mut self, name: &str) -> Self {
            self.broken.insert(name.to_string());
            self
        }
    }

    #[async_trait]
    impl SchemaCatalog for FakeCatalog {
        async fn list_tables(&self) -> Result<Vec<String>, sqlx::Error> {
            if self.unlistable {
                return Err(sqlx::Error::Protocol("SHOW TABLES denied".to_string()));
            }
            Ok(self.tables.iter().map(|(name, _)| name.clone()).collect())
        }

        async fn list_columns(&self, table: &str) -> Result<Vec<Column>, sqlx::Error> {
            if self.broken.contains(table) {
                return Err(sqlx::Error::Protocol(format!("cannot describe {}", table)));
            }
            self.tables
                .iter()
                .find(|(name, _)| name == table)
                .map(|(_, cols)| cols.clone())
                .ok_or(sqlx::Error::RowNotFound)
        }
    }

    fn shop_catalog() -> FakeCatalog {
        FakeCatalog::new(vec![
            ("customers", vec![("id", "int"), ("email", "varchar(255)")]),
            ("orders", vec![("id", "int"), ("customer_id", "int"), ("total", "decimal(10,2)")]),
            ("audit_log", vec![("message", "text")]),
        ])
    }

    #[tokio::test]
    async fn test_render_full_schema() {
        let text = load_schema_text(&shop_catalog()).await.unwrap();

        assert_eq!(
            text,
            "Table: customers\n - id (int)\n - email (varchar(255))\n\n\
             Table: orders\n - id (int)\n - customer_id (int)\n - total (decimal(10,2))\n\n\
             Table: audit_log\n - message (text)\n\n"
        );
    }

    #[tokio::test]
    async fn test_header_and_column_counts() {
        let text = load_schema_text(&shop_catalog()).await.unwrap();

        let headers = text.lines().filter(|l| l.starts_with("Table: ")).count();
        let columns = text.lines().filter(|l| l.starts_with(" - ")).count();
        assert_eq!(headers, 3);
        assert_eq!(columns, 6);
    }

    #[tokio::test]
    async fn test_table_order_is_preserved() {
        let tables = introspect(&shop_catalog()).await.unwrap();
        let names: Vec<_> = tables.iter().map(|t| t.name.as_str()).collect();

        assert_eq!(names, ["customers", "orders", "audit_log"]);
    }

    #[tokio::test]
    async fn test_failed_column_listing_keeps_going() {
        let catalog = shop_catalog().break_table("orders");

        let tables = introspect(&catalog).await.unwrap();
        assert_eq!(tables.len(), 3);
        assert!(tables[1].columns.is_none());

        let text = render_schema(&tables);
        assert_eq!(
            text,
            "Table: customers\n - id (int)\n - email (varchar(255))\n\n\
             Table: orders\n\
             Table: audit_log\n - message (text)\n\n"
        );
    }

    #[tokio::test]
    async fn test_failed_table_listing_is_an_error() {
        let mut catalog = shop_catalog();
        catalog.unlistable = true;

        assert!(introspect(&catalog).await.is_err());
    }

    #[tokio::test]
    async fn test_empty_database_renders_empty_text() {
        let text = load_schema_text(&FakeCatalog::new(vec![])).await.unwrap();
        assert!(text.is_empty());
    }

    #[test]
    fn test_collect_table_names_keeps_order() {
        let names = collect_table_names(vec![Some("b".to_string()), Some("a".to_string())]).unwrap();
        assert_eq!(names, ["b", "a"]);
    }

    #[test]
    fn test_unreadable_table_name_fails_listing() {
        let result = collect_table_names(vec![
            Some("customers".to_string()),
            None,
            Some("orders".to_string()),
        ]);
        assert!(matches!(result, Err(sqlx::Error::Decode(_))));
    }

    #[tokio::test]
    async fn test_unreadable_table_name_fails_introspection() {
        struct UndecodableCatalog;

        #[async_trait]
        impl SchemaCatalog for UndecodableCatalog {
            async fn list_tables(&self) -> Result<Vec<String>, sqlx::Error> {
                collect_table_names(vec![Some("customers".to_string()), None])
            }

            async fn list_columns(&self, _table: &str) -> Result<Vec<Column>, sqlx::Error> {
                Ok(Vec::new())
            }
        }

        assert!(introspect(&UndecodableCatalog).await.is_err());
    }

    #[test]
    fn test_quote_identifier_escapes_backticks() {
        assert_eq!(quote_identifier("orders"), "`orders`");
        assert_eq!(quote_identifier("we`ird"), "`we``ird`");
    }
}
