use askdb_core::TableColumns;
use askdb_sql::{DatabaseTools, Rows, SqlDatabase, SqliteDatabase, TOO_LONG_SENTINEL};
use serde_json::json;

async fn hospital_db() -> SqliteDatabase {
    let db = SqliteDatabase::builder("sqlite::memory:")
        .build()
        .await
        .expect("in-memory sqlite");
    let statements = [
        "CREATE TABLE hospitals (name TEXT, district TEXT, district_type TEXT, beds INTEGER)",
        "INSERT INTO hospitals VALUES
            ('City General', 'Pune', 'urban', 120),
            ('Rural Clinic', 'Satara', 'rural', 12),
            ('Hill Centre', 'Sangli', 'hilly', 30),
            ('Coast Care', 'Ratnagiri', 'coastal', 45),
            ('Tribal PHC', 'Nandurbar', 'tribal', 8),
            ('Border Unit', 'Kolhapur', 'border', 20),
            ('Metro Heart', 'Mumbai', 'metro', 300),
            ('Desert Aid', 'Jalna', 'arid', 15)",
    ];
    for sql in statements {
        sqlx::query(sql).execute(db.pool()).await.expect("seed");
    }
    db
}

fn table_columns(table: &str, columns: &[&str]) -> TableColumns {
    let mut map = TableColumns::new();
    map.insert(
        table.to_string(),
        columns.iter().map(|c| c.to_string()).collect(),
    );
    map
}

#[tokio::test]
async fn reflects_ddl_and_three_sample_rows() {
    let db = hospital_db().await;
    let tools = DatabaseTools::default();

    let schema = tools
        .get_tables_schema(&db, &["hospitals".to_string()], "health")
        .await
        .unwrap()
        .into_value()
        .expect("short schema");

    assert!(schema.contains("Table: hospitals"));
    assert!(schema.contains("CREATE TABLE hospitals"));
    let samples = schema.split("Sample rows:\n").nth(1).expect("samples");
    assert_eq!(samples.trim_end().lines().count(), 3);
    assert!(samples.starts_with("City General\tPune\turban\t120"));
}

#[tokio::test]
async fn indicator_columns_are_not_limited() {
    let db = hospital_db().await;
    let tools = DatabaseTools::default();

    let values = tools
        .get_common_column_values(
            &db,
            &table_columns("hospitals", &["District_Type", "district"]),
            "health",
            5,
            &["district_type".to_string()],
        )
        .await
        .unwrap()
        .into_value()
        .expect("short values");

    assert_eq!(values["hospitals"]["District_Type"].len(), 8);
    assert_eq!(values["hospitals"]["district"].len(), 5);
    assert!(values["hospitals"]["district"].iter().all(|v| v.count == 1));
}

#[tokio::test]
async fn run_sql_returns_typed_rows() {
    let db = hospital_db().await;
    let tools = DatabaseTools::default();

    let rows = tools
        .run_sql(&db, "SELECT SUM(beds) AS total_beds, AVG(beds) AS avg_beds FROM hospitals", "health")
        .await
        .unwrap()
        .into_value()
        .expect("short result");

    assert_eq!(
        rows,
        Rows {
            columns: vec!["total_beds".to_string(), "avg_beds".to_string()],
            rows: vec![vec![json!(550), json!(68.75)]],
        }
    );
}

#[tokio::test]
async fn oversized_results_become_sentinel() {
    let db = hospital_db().await;
    let tools = DatabaseTools::default();

    let result = tools
        .run_sql(&db, "SELECT hex(zeroblob(15000)) AS padding", "health")
        .await
        .unwrap();

    assert!(result.is_too_long());
    assert_eq!(result.render().unwrap(), TOO_LONG_SENTINEL);
}

#[tokio::test]
async fn sql_errors_propagate() {
    let db = hospital_db().await;
    let err = db.fetch_rows("SELECT * FROM missing_table").await.unwrap_err();
    assert!(err.to_string().contains("missing_table"));
}

#[tokio::test]
async fn unknown_tables_reflect_to_none() {
    let db = hospital_db().await;
    assert_eq!(db.reflect_table(None, "missing_table").await.unwrap(), None);
    assert!(db
        .reflect_table(Some("main"), "hospitals")
        .await
        .unwrap()
        .is_some());
}
