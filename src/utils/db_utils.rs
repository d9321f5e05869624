use actix_web::error::ErrorBadRequest;
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;
use sqlx::MySqlPool;

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, PartialEq)]
pub enum SqlValue {
    String(String),
    I64(i64),
    U64(u64),
    F64(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Null,
}

/// ===============================
/// SQL update container
/// ===============================
#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// ===============================
/// Build dynamic UPDATE SQL
/// ===============================
///
/// Only keys listed in `allowed` may appear in `payload`; anything else is a
/// 400. Column names are never taken from the request verbatim.
pub fn build_update_sql(
    table: &str,
    payload: &Value,
    allowed: &[&str],
    id_column: &str,
    id_value: u64,
) -> Result<SqlUpdate, actix_web::Error> {
    let obj = payload
        .as_object()
        .ok_or_else(|| ErrorBadRequest("Payload must be a JSON object"))?;

    if obj.is_empty() {
        return Err(ErrorBadRequest("No fields provided for update"));
    }

    let mut columns = Vec::with_capacity(obj.len());
    let mut values = Vec::with_capacity(obj.len() + 1);

    for (key, value) in obj {
        let column = allowed
            .iter()
            .find(|c| **c == key.as_str())
            .ok_or_else(|| ErrorBadRequest(format!("Field '{}' cannot be updated", key)))?;
        columns.push(format!("{} = ?", column));

        // Convert JSON values → SqlValue
        match value {
            Value::String(s) => {
                if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                    values.push(SqlValue::Date(d));
                } else if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
                    values.push(SqlValue::DateTime(dt));
                } else {
                    values.push(SqlValue::String(s.clone()));
                }
            }
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    values.push(SqlValue::I64(i));
                } else if let Some(f) = n.as_f64() {
                    values.push(SqlValue::F64(f));
                }
            }
            Value::Bool(b) => values.push(SqlValue::Bool(*b)),
            Value::Null => values.push(SqlValue::Null),
            _ => return Err(ErrorBadRequest("Unsupported JSON value type")),
        }
    }

    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?",
        table,
        columns.join(", "),
        id_column
    );

    // WHERE id = ?
    values.push(SqlValue::U64(id_value));

    Ok(SqlUpdate { sql, values })
}

/// ===============================
/// Execute the update
/// ===============================
pub async fn execute_update(pool: &MySqlPool, update: SqlUpdate) -> Result<u64, sqlx::Error> {
    let mut query = sqlx::query(&update.sql);

    for value in update.values {
        query = match value {
            SqlValue::String(v) => query.bind(v),
            SqlValue::I64(v) => query.bind(v),
            SqlValue::U64(v) => query.bind(v),
            SqlValue::F64(v) => query.bind(v),
            SqlValue::Bool(v) => query.bind(v),
            SqlValue::Date(v) => query.bind(v),
            SqlValue::DateTime(v) => query.bind(v),
            SqlValue::Null => query.bind(None::<String>),
        };
    }

    let result = query.execute(pool).await?;
    Ok(result.rows_affected())
}

/// `?, ?, ?` for an `IN (...)` list of `n` values.
pub fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Drops blank strings from a partial-update payload so that "" leaves the
/// stored value unchanged.
pub fn strip_blank_fields(payload: &mut Value) {
    if let Some(obj) = payload.as_object_mut() {
        obj.retain(|_, v| !matches!(v, Value::String(s) if s.trim().is_empty()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const STUDENT_FIELDS: &[&str] = &["name", "year", "semester"];

    #[test]
    fn builds_update_for_allowed_columns() {
        let payload = json!({"name": "Pema", "year": "3rd"});
        let update = build_update_sql("students", &payload, STUDENT_FIELDS, "id", 7).unwrap();

        assert_eq!(update.sql, "UPDATE students SET name = ?, year = ? WHERE id = ?");
        assert_eq!(
            update.values,
            vec![
                SqlValue::String("Pema".to_string()),
                SqlValue::String("3rd".to_string()),
                SqlValue::U64(7),
            ]
        );
    }

    #[test]
    fn rejects_columns_outside_the_whitelist() {
        let payload = json!({"password": "x"});
        assert!(build_update_sql("students", &payload, STUDENT_FIELDS, "id", 1).is_err());

        let payload = json!({"name = name, password": "x"});
        assert!(build_update_sql("students", &payload, STUDENT_FIELDS, "id", 1).is_err());
    }

    #[test]
    fn rejects_empty_and_non_object_payloads() {
        assert!(build_update_sql("students", &json!({}), STUDENT_FIELDS, "id", 1).is_err());
        assert!(build_update_sql("students", &json!([1]), STUDENT_FIELDS, "id", 1).is_err());
    }

    #[test]
    fn parses_dates_and_nulls() {
        let payload = json!({"semester": null, "year": "2025-01-31"});
        let update = build_update_sql("students", &payload, STUDENT_FIELDS, "id", 1).unwrap();
        assert!(update.values.contains(&SqlValue::Null));
        assert!(update.values.contains(&SqlValue::Date(
            NaiveDate::from_ymd_opt(2025, 1, 31).unwrap()
        )));
    }

    #[test]
    fn placeholder_lists() {
        assert_eq!(placeholders(1), "?");
        assert_eq!(placeholders(3), "?, ?, ?");
    }

    #[test]
    fn blank_strings_are_stripped() {
        let mut payload = json!({"name": " ", "phone": "+975 1234", "address": ""});
        strip_blank_fields(&mut payload);
        assert_eq!(payload, json!({"phone": "+975 1234"}));
    }
}
