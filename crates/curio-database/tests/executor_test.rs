//! Integration tests for the query executor against a real SQLite file.

use chrono::{NaiveDate, Utc};
use curio_core::config::DatabaseConfig;
use curio_core::error::QueryError;
use curio_core::types::{Category, Collectible, Credential, CURRENT_HASH_VERSION};
use curio_database::connection::SqliteFactory;
use curio_database::executor::{QueryExecutor, QueryRequest, SqlValue};
use curio_database::pool::{Pool, PoolConfig};
use curio_database::repositories::{CollectibleRepository, CredentialRepository};
use curio_database::schema::ensure_schema;
use tempfile::TempDir;
use uuid::Uuid;

struct TestDb {
    executor: QueryExecutor,
    _dir: TempDir,
}

async fn test_db() -> TestDb {
    let dir = TempDir::new().unwrap();
    let config = DatabaseConfig {
        url: format!("sqlite://{}", dir.path().join("test.db").display()),
        ..DatabaseConfig::default()
    };
    let factory = SqliteFactory::new(&config).unwrap();
    let pool = Pool::connect(factory, PoolConfig::from(&config))
        .await
        .unwrap();
    let executor = QueryExecutor::new(pool, &config);
    ensure_schema(&executor).await.unwrap();
    TestDb {
        executor,
        _dir: dir,
    }
}

fn sample_item(name: &str, category: Category, released_on: &str) -> Collectible {
    Collectible {
        id: Uuid::new_v4(),
        name: name.to_string(),
        category,
        price: 19.99,
        released_on: released_on.parse::<NaiveDate>().unwrap(),
    }
}

fn sample_credential(username: &str) -> Credential {
    Credential {
        user_id: Uuid::new_v4(),
        username: username.to_string(),
        password_hash: "$argon2id$v=19$m=8,t=1,p=1$c29tZXNhbHQ$placeholder".to_string(),
        hash_version: CURRENT_HASH_VERSION,
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn test_bound_parameters_round_trip_through_rows() {
    let db = test_db().await;
    let request = QueryRequest::new(
        "INSERT INTO collectibles (id, name, category, price, released_on) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind("a1")
    .bind("Darth Vader")
    .bind("film")
    .bind(29.5)
    .bind("2023-05-04");
    assert_eq!(db.executor.execute(&request).await.unwrap(), 1);

    let rows = db
        .executor
        .fetch_all(&QueryRequest::new(
            "SELECT name, price FROM collectibles WHERE id = 'a1'",
        ))
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].text("name").unwrap(), "Darth Vader");
    assert_eq!(rows[0].real("price").unwrap(), 29.5);
    assert_eq!(
        rows[0].get("name"),
        Some(&SqlValue::Text("Darth Vader".to_string()))
    );
}

#[tokio::test]
async fn test_duplicate_key_maps_to_constraint_violation() {
    let db = test_db().await;
    let repo = CredentialRepository::new(db.executor.clone());
    repo.insert(&sample_credential("ana")).await.unwrap();

    let err = repo.insert(&sample_credential("ana")).await.unwrap_err();
    assert!(matches!(err, QueryError::ConstraintViolation(_)), "{err:?}");
}

#[tokio::test]
async fn test_unknown_table_maps_to_syntax_or_schema() {
    let db = test_db().await;
    let err = db
        .executor
        .fetch_all(&QueryRequest::new("SELECT * FROM no_such_table"))
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::SyntaxOrSchema(_)), "{err:?}");
}

#[tokio::test]
async fn test_fetch_optional_distinguishes_absent_rows() {
    let db = test_db().await;
    let repo = CollectibleRepository::new(db.executor.clone());

    assert!(repo.find_by_id(Uuid::new_v4()).await.unwrap().is_none());

    let item = sample_item("Goku", Category::Anime, "2021-01-15");
    repo.insert(&item).await.unwrap();
    let found = repo.find_by_id(item.id).await.unwrap().unwrap();
    assert_eq!(found, item);
}

#[tokio::test]
async fn test_category_and_year_filters() {
    let db = test_db().await;
    let repo = CollectibleRepository::new(db.executor.clone());
    repo.insert(&sample_item("Goku", Category::Anime, "2021-01-15"))
        .await
        .unwrap();
    repo.insert(&sample_item("Vegeta", Category::Anime, "2022-06-01"))
        .await
        .unwrap();
    repo.insert(&sample_item("Messi", Category::Sports, "2022-12-18"))
        .await
        .unwrap();

    let anime = repo.find_by_category(Category::Anime).await.unwrap();
    assert_eq!(anime.len(), 2);
    assert!(anime.iter().all(|c| c.category == Category::Anime));

    let in_2022 = repo.released_in(2022).await.unwrap();
    let names: Vec<_> = in_2022.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["Vegeta", "Messi"]);
}

#[tokio::test]
async fn test_update_and_delete_report_matched_rows() {
    let db = test_db().await;
    let repo = CollectibleRepository::new(db.executor.clone());
    let mut item = sample_item("Walter White", Category::Series, "2019-10-11");
    repo.insert(&item).await.unwrap();

    item.price = 49.9;
    assert!(repo.update(&item).await.unwrap());

    let missing = sample_item("Nobody", Category::Other, "2020-01-01");
    assert!(!repo.update(&missing).await.unwrap());

    assert!(repo.delete(item.id).await.unwrap());
    assert!(!repo.delete(item.id).await.unwrap());
}

#[tokio::test]
async fn test_credential_password_update() {
    let db = test_db().await;
    let repo = CredentialRepository::new(db.executor.clone());
    let credential = sample_credential("bruno");
    repo.insert(&credential).await.unwrap();

    assert!(repo
        .update_password(credential.user_id, "$argon2id$v=19$new", 2)
        .await
        .unwrap());
    let stored = repo
        .find_by_username("bruno")
        .await
        .unwrap()
        .expect("row should exist");
    assert_eq!(stored.password_hash, "$argon2id$v=19$new");
    assert_eq!(stored.hash_version, 2);

    assert!(!repo
        .update_password(Uuid::new_v4(), "x", 1)
        .await
        .unwrap());
    assert_eq!(repo.count().await.unwrap(), 1);
}
