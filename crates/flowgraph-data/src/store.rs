// Structured Data Store backing `database_save` / `database_query`.
//
// Tables are caller-named and caller-shaped: a workflow author decides the
// column set by whatever keys show up in `data_template`. Primary-key
// columns are stored as TEXT (so they can sit in a Postgres PRIMARY KEY);
// every other column is JSONB, which lets a single generic store host
// arbitrarily-shaped rows without a migration per workflow.

use serde_json::{Map, Value};
use sqlx::postgres::PgRow;
use sqlx::{Column, PgPool, Row, TypeInfo};

use crate::error::{DataError, Result};

#[derive(Clone)]
pub struct DataStore {
    pool: PgPool,
}

impl DataStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    /// Upsert `data` (a JSON object) into `table_name`. Creates the table on
    /// first use. If `primary_key_columns` is empty, or every column is a
    /// primary key, falls back to insert-or-ignore (there is nothing to
    /// update on conflict).
    pub async fn upsert(&self, table_name: &str, data: &Value, primary_key_columns: &[String]) -> Result<()> {
        let Value::Object(map) = data else {
            return Err(DataError::NotAnObject);
        };
        let table = sanitize_identifier(table_name)?;
        for key in map.keys() {
            sanitize_identifier(key)?;
        }
        for pk in primary_key_columns {
            sanitize_identifier(pk)?;
        }

        self.ensure_table(&table, map, primary_key_columns).await?;

        let columns: Vec<&String> = map.keys().collect();
        let column_list = columns.iter().map(|c| format!("\"{c}\"")).collect::<Vec<_>>().join(", ");
        let placeholders = (1..=columns.len()).map(|i| format!("${i}")).collect::<Vec<_>>().join(", ");
        let mut sql = format!("INSERT INTO \"{table}\" ({column_list}) VALUES ({placeholders})");

        let non_pk: Vec<&&String> = columns.iter().filter(|c| !primary_key_columns.contains(**c)).collect();
        if !primary_key_columns.is_empty() && !non_pk.is_empty() {
            let conflict_cols = primary_key_columns.iter().map(|c| format!("\"{c}\"")).collect::<Vec<_>>().join(", ");
            let updates = non_pk.iter().map(|c| format!("\"{c}\" = EXCLUDED.\"{c}\"")).collect::<Vec<_>>().join(", ");
            sql.push_str(&format!(" ON CONFLICT ({conflict_cols}) DO UPDATE SET {updates}"));
        } else {
            sql.push_str(" ON CONFLICT DO NOTHING");
        }

        let mut query = sqlx::query(&sql);
        for col in &columns {
            let value = &map[*col];
            if primary_key_columns.contains(col) {
                query = query.bind(pk_to_text(value));
            } else {
                query = query.bind(value.clone());
            }
        }
        query.execute(&self.pool).await?;
        Ok(())
    }

    async fn ensure_table(&self, table: &str, sample: &Map<String, Value>, primary_key_columns: &[String]) -> Result<()> {
        let mut columns = Vec::new();
        for key in sample.keys() {
            let ty = if primary_key_columns.contains(key) { "TEXT" } else { "JSONB" };
            columns.push(format!("\"{key}\" {ty}"));
        }
        for pk in primary_key_columns {
            if !sample.contains_key(pk) {
                columns.push(format!("\"{pk}\" TEXT"));
            }
        }
        let pk_clause = if primary_key_columns.is_empty() {
            String::new()
        } else {
            let cols = primary_key_columns.iter().map(|c| format!("\"{c}\"")).collect::<Vec<_>>().join(", ");
            format!(", PRIMARY KEY ({cols})")
        };
        let sql = format!("CREATE TABLE IF NOT EXISTS \"{table}\" ({}{pk_clause})", columns.join(", "));
        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }

    /// Execute an already-parameterised SQL statement (see SQL-parameterisation
    /// template mode) and return each row as a JSON object.
    pub async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Value>> {
        let mut query = sqlx::query(sql);
        for param in params {
            query = bind_param(query, param);
        }
        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.iter().map(row_to_json).collect())
    }
}

fn sanitize_identifier(name: &str) -> Result<String> {
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') || name.chars().next().unwrap().is_ascii_digit() {
        return Err(DataError::invalid_identifier(name));
    }
    Ok(name.to_string())
}

fn pk_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn bind_param<'q>(
    query: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
    value: &'q Value,
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    match value {
        Value::String(s) => query.bind(s.as_str()),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) if n.is_i64() => query.bind(n.as_i64().unwrap()),
        Value::Number(n) => query.bind(n.as_f64().unwrap_or_default()),
        Value::Null => query.bind(Option::<String>::None),
        other => query.bind(other.clone()),
    }
}

fn row_to_json(row: &PgRow) -> Value {
    let mut obj = Map::new();
    for column in row.columns() {
        let name = column.name();
        let type_name = column.type_info().name();
        let value = match type_name {
            "INT2" | "INT4" | "INT8" => row.try_get::<i64, _>(name).map(Value::from).unwrap_or(Value::Null),
            "FLOAT4" | "FLOAT8" | "NUMERIC" => row.try_get::<f64, _>(name).map(Value::from).unwrap_or(Value::Null),
            "BOOL" => row.try_get::<bool, _>(name).map(Value::from).unwrap_or(Value::Null),
            "JSON" | "JSONB" => row.try_get::<Value, _>(name).unwrap_or(Value::Null),
            "TIMESTAMPTZ" | "TIMESTAMP" => row
                .try_get::<chrono::DateTime<chrono::Utc>, _>(name)
                .map(|t| Value::String(t.to_rfc3339()))
                .unwrap_or(Value::Null),
            _ => row.try_get::<String, _>(name).map(Value::String).unwrap_or(Value::Null),
        };
        obj.insert(name.to_string(), value);
    }
    Value::Object(obj)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_rejects_bad_identifiers() {
        assert!(sanitize_identifier("tickets").is_ok());
        assert!(sanitize_identifier("tickets; DROP TABLE x").is_err());
        assert!(sanitize_identifier("1table").is_err());
        assert!(sanitize_identifier("").is_err());
    }
}
