//! End-to-end integration tests for Trellis.
//!
//! These tests drive the client and all four views against an in-process
//! cluster, from connect through the row store and back.

use trellis_client::{
    Client, ClientConfig, ConnectionState, Statement, TransactionOptions, TrellisError, Tuple, Value,
};
use trellis_store::MemoryCluster;
use trellis_test::{Album, AlbumKey, AlbumValue, TestCluster};

/// Test the Artist scenario through the tuple key/value view.
#[tokio::test]
async fn test_artist_key_value_scenario() {
    let test = TestCluster::music().await.expect("Failed to start cluster");
    let view = test
        .client
        .tables()
        .table("Artist")
        .await
        .expect("Artist table missing")
        .key_value_view();

    let key = Tuple::new().set("artistId", 277);
    view.put(None, &key, &Tuple::new().set("name", "New Order"))
        .await
        .expect("put failed");

    let value = view.get(None, &key).await.expect("get failed");
    assert_eq!(value, Some(Tuple::new().set("name", "New Order")));
}

/// Test the Album scenario through the mapped key/value view.
#[tokio::test]
async fn test_album_key_value_scenario() {
    let test = TestCluster::music().await.expect("Failed to start cluster");
    let view = test
        .client
        .tables()
        .table("Album")
        .await
        .expect("Album table missing")
        .key_value_view_of::<AlbumKey, AlbumValue>()
        .expect("mapping rejected");

    let key = AlbumKey {
        album_id: 349,
        artist_id: 277,
    };
    let value = AlbumValue {
        title: "Technique".to_string(),
        release_year: Some(1989),
    };
    view.put(None, &key, &value).await.expect("put failed");
    assert_eq!(view.get(None, &key).await.expect("get failed"), Some(value));
}

/// Test that every view of a table sees rows written through the others.
#[tokio::test]
async fn test_views_share_rows() {
    let test = TestCluster::music().await.expect("Failed to start cluster");
    let table = test.client.tables().table("Album").await.expect("Album table missing");

    let records = table.record_view_of::<Album>().expect("mapping rejected");
    records
        .upsert(None, &Album::new(348, "First Light", 276, Some(2023)))
        .await
        .expect("upsert failed");

    let row = table
        .record_view()
        .get(None, &Tuple::new().set("albumId", 348).set("artistId", 276))
        .await
        .expect("get failed")
        .expect("row missing");
    assert_eq!(row.get("title"), Some(&Value::from("First Light")));
    assert_eq!(row.len(), 4);

    let value = table
        .key_value_view()
        .get(None, &Tuple::new().set("ALBUMID", 348).set("ARTISTID", 276))
        .await
        .expect("get failed");
    assert_eq!(
        value,
        Some(Tuple::new().set("title", "First Light").set("releaseYear", 2023))
    );

    let seeded = records.get(None, &Album::key(4, 1)).await.expect("get failed");
    assert_eq!(seeded, Some(Album::new(4, "Let There Be Rock", 1, None)));
}

/// Test failover to the next endpoint when the first is down.
#[tokio::test]
async fn test_connect_failover() {
    let test = TestCluster::start().await.expect("Failed to start cluster");
    assert_eq!(test.client.connections(), vec!["localhost:10800".to_string()]);

    test.cluster.set_reachable("localhost:10800", false);
    let other = test.connect_another().await.expect("failover failed");
    assert_eq!(other.connections(), vec!["localhost:10801".to_string()]);
    assert_eq!(other.stats().connection_failures, 1);
    assert_eq!(test.cluster.connection_count("localhost:10801"), 1);

    // The first client keeps its endpoint and now fails.
    assert!(matches!(
        test.client.sql().execute(None, "SELECT * FROM Artist").await,
        Err(TrellisError::Connection { .. })
    ));
    assert_eq!(test.client.state(), ConnectionState::Failed);
}

/// Test that connecting without a reachable endpoint is a connection error.
#[tokio::test]
async fn test_connect_without_reachable_endpoint() {
    let cluster = MemoryCluster::with_default_endpoints();
    for endpoint in cluster.endpoints() {
        cluster.set_reachable(&endpoint, false);
    }

    let err = Client::connect(ClientConfig::default(), &cluster)
        .await
        .expect_err("connect should fail");
    assert!(matches!(err, TrellisError::Connection { .. }));
    assert!(err.is_retryable());
}

/// Test that uncommitted writes are invisible to other clients.
#[tokio::test]
async fn test_transaction_isolation() {
    let test = TestCluster::music().await.expect("Failed to start cluster");
    let reader = test.connect_another().await.expect("connect failed");

    let writer_view = test.client.tables().table("Artist").await.unwrap().record_view();
    let reader_view = reader.tables().table("artist").await.unwrap().record_view();
    let key = Tuple::new().set("artistId", 276);

    let tx = test.client.begin().await.expect("begin failed");
    writer_view
        .upsert(Some(&tx), &key.clone().set("name", "New Discovery Band"))
        .await
        .expect("upsert failed");
    assert!(reader_view.get(None, &key).await.unwrap().is_none());

    tx.commit().await.expect("commit failed");
    let row = reader_view.get(None, &key).await.unwrap().expect("row missing");
    assert_eq!(row.get("name"), Some(&Value::from("New Discovery Band")));
}

/// Test that rollback discards writes made through several views.
#[tokio::test]
async fn test_transaction_rollback() {
    let test = TestCluster::music().await.expect("Failed to start cluster");
    let tables = test.client.tables();
    let albums = tables.table("Album").await.unwrap().record_view_of::<Album>().unwrap();
    let artists = tables.table("Artist").await.unwrap().key_value_view_of::<i32, String>().unwrap();

    let tx = test.client.begin().await.unwrap();
    albums
        .upsert(Some(&tx), &Album::new(10, "Unreleased", 1, None))
        .await
        .unwrap();
    assert!(artists.remove(Some(&tx), &2).await.unwrap());
    tx.rollback().await.unwrap();

    assert!(albums.get(None, &Album::key(10, 1)).await.unwrap().is_none());
    assert_eq!(artists.get(None, &2).await.unwrap().as_deref(), Some("Accept"));

    let ro = test.client.begin_with(TransactionOptions::read_only()).await.unwrap();
    assert!(matches!(
        artists.put(Some(&ro), &3, &"Aerosmith".to_string()).await,
        Err(TrellisError::ReadOnlyTransaction { .. })
    ));
    ro.rollback().await.unwrap();
}

/// Test a parameterised query and the query builder.
#[tokio::test]
async fn test_parameterised_query() {
    let test = TestCluster::music().await.expect("Failed to start cluster");
    let sql = test.client.sql();

    let titles: Vec<String> = sql
        .execute(
            None,
            Statement::new("SELECT title FROM Album WHERE artistId = ? ORDER BY title").bind(1),
        )
        .await
        .expect("query failed")
        .filter_map(|row| row.get_as::<String>("title").ok().flatten())
        .collect();
    assert_eq!(titles, vec!["For Those About To Rock", "Let There Be Rock"]);

    let built = sql
        .query()
        .select(&["albumId", "releaseYear"])
        .from("Album")
        .where_eq("title", "it's; not there")
        .or_eq("artistId", 2);
    let rows: Vec<Tuple> = sql.execute(None, built).await.expect("query failed").collect();
    assert_eq!(
        rows,
        vec![Tuple::new().set("albumId", 2).set("releaseYear", 1983)]
    );
}

/// Test that unquoted identifiers are case-insensitive everywhere.
#[tokio::test]
async fn test_identifier_case_insensitivity() {
    let test = TestCluster::music().await.expect("Failed to start cluster");
    let tables = test.client.tables();

    let lower = tables.table("album").await.expect("lowercase lookup failed");
    let upper = tables.table("ALBUM").await.expect("uppercase lookup failed");
    assert_eq!(lower.name(), upper.name());
    assert!(matches!(
        tables.table("\"Album\"").await,
        Err(TrellisError::TableNotFound { .. })
    ));

    let row = lower
        .record_view()
        .get(None, &Tuple::new().set("ALBUMID", 2).set("artistid", 2))
        .await
        .unwrap()
        .expect("row missing");
    assert_eq!(row.get("Title"), row.get("TITLE"));

    let rows: Vec<Tuple> = test
        .client
        .sql()
        .execute(None, "select TITLE from album where ARTISTID = 2")
        .await
        .unwrap()
        .collect();
    assert_eq!(rows.len(), 1);
}

/// Test shape errors are reported before the row store is reached.
#[tokio::test]
async fn test_errors_before_store_call() {
    let test = TestCluster::music().await.expect("Failed to start cluster");
    let view = test.client.tables().table("Album").await.unwrap().record_view();
    for endpoint in test.cluster.endpoints() {
        test.cluster.set_reachable(&endpoint, false);
    }

    assert!(matches!(
        view.get(None, &Tuple::new().set("albumId", 1)).await,
        Err(TrellisError::KeyIncomplete { .. })
    ));
    assert!(matches!(
        view.upsert(None, &Tuple::new().set("albumId", 1).set("artistId", 1).set("genre", "rock"))
            .await,
        Err(TrellisError::SchemaMismatch { .. })
    ));
    assert!(matches!(
        view.get(None, &Tuple::new().set("albumId", 1).set("artistId", 1)).await,
        Err(TrellisError::Connection { .. })
    ));
}

/// Test the schema registry follows catalog changes.
#[tokio::test]
async fn test_schema_registry_and_catalog() {
    let test = TestCluster::music().await.expect("Failed to start cluster");
    let tables = test.client.tables();

    assert!(matches!(
        tables.table("Person2").await,
        Err(TrellisError::TableNotFound { .. })
    ));
    assert_eq!(tables.cached(), vec!["ALBUM".to_string(), "ARTIST".to_string()]);

    let catalog = test.client.catalog();
    assert!(catalog.drop_table("Album", false).await.unwrap());
    assert!(catalog.create_table(trellis_test::album_table()).await.unwrap());

    let albums = tables.table("Album").await.unwrap().record_view();
    assert!(albums
        .get(None, &Tuple::new().set("albumId", 1).set("artistId", 1))
        .await
        .unwrap()
        .is_none());
}
