//! # trellis-test
//!
//! End-to-end test support for Trellis.
//!
//! This crate contains:
//! - A `TestCluster` that starts an in-process cluster and connects a client
//! - The music catalogue schemas and mapped types shared by the tests

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::sync::Once;

use trellis_client::{
    Client, ClientConfig, ColumnSchema, DataType, Mapped, ObjectMapping, TableDefinition, TrellisResult,
    Tuple,
};
use trellis_store::MemoryCluster;

/// Installs a test subscriber once. Honors `RUST_LOG`.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// An in-process cluster with a connected client.
pub struct TestCluster {
    /// The cluster, for reachability control and inspection.
    pub cluster: MemoryCluster,
    /// A client connected to the cluster.
    pub client: Client,
}

impl TestCluster {
    /// Starts a cluster on the default endpoints and connects to it.
    pub async fn start() -> TrellisResult<Self> {
        init_tracing();
        let cluster = MemoryCluster::with_default_endpoints();
        let client = Client::connect(ClientConfig::default(), &cluster).await?;
        Ok(Self { cluster, client })
    }

    /// Starts a cluster holding the music tables, with two artists and
    /// three albums.
    pub async fn music() -> TrellisResult<Self> {
        let test = Self::start().await?;
        let catalog = test.client.catalog();
        catalog.create_table(artist_table()).await?;
        catalog.create_table(album_table()).await?;

        let tables = test.client.tables();
        let artists = tables.table("Artist").await?.record_view();
        artists
            .upsert_all(
                None,
                &[
                    Tuple::new().set("artistId", 1).set("name", "AC/DC"),
                    Tuple::new().set("artistId", 2).set("name", "Accept"),
                ],
            )
            .await?;

        let albums = tables.table("Album").await?.record_view_of::<Album>()?;
        albums
            .upsert_all(
                None,
                &[
                    Album::new(1, "For Those About To Rock", 1, Some(1981)),
                    Album::new(2, "Balls to the Wall", 2, Some(1983)),
                    Album::new(4, "Let There Be Rock", 1, None),
                ],
            )
            .await?;
        Ok(test)
    }

    /// Connects a second client to the same cluster.
    pub async fn connect_another(&self) -> TrellisResult<Client> {
        Client::connect(ClientConfig::default(), &self.cluster).await
    }
}

/// Definition of the `Artist` table.
pub fn artist_table() -> TableDefinition {
    TableDefinition::new("Artist")
        .column(ColumnSchema::new("artistId", DataType::Int32))
        .column(ColumnSchema::new("name", DataType::String).nullable(true))
        .primary_key(&["artistId"])
}

/// Definition of the `Album` table.
pub fn album_table() -> TableDefinition {
    TableDefinition::new("Album")
        .column(ColumnSchema::new("albumId", DataType::Int32))
        .column(ColumnSchema::new("title", DataType::String).max_length(25))
        .column(ColumnSchema::new("artistId", DataType::Int32))
        .column(ColumnSchema::new("releaseYear", DataType::Int32).nullable(true))
        .primary_key(&["albumId", "artistId"])
}

/// A full `Album` row.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Album {
    /// Album id, part of the key.
    pub album_id: i32,
    /// Title.
    pub title: String,
    /// Artist id, part of the key.
    pub artist_id: i32,
    /// Release year, if known.
    pub release_year: Option<i32>,
}

impl Album {
    /// Creates an album.
    pub fn new(album_id: i32, title: &str, artist_id: i32, release_year: Option<i32>) -> Self {
        Self {
            album_id,
            title: title.to_string(),
            artist_id,
            release_year,
        }
    }

    /// Creates a key-only album.
    pub fn key(album_id: i32, artist_id: i32) -> Self {
        Self {
            album_id,
            artist_id,
            ..Self::default()
        }
    }
}

impl Mapped for Album {
    fn mapping() -> ObjectMapping<Self> {
        ObjectMapping::builder()
            .column("albumId", |a: &Album| &a.album_id, |a: &mut Album| &mut a.album_id)
            .column("title", |a: &Album| &a.title, |a: &mut Album| &mut a.title)
            .column("artistId", |a: &Album| &a.artist_id, |a: &mut Album| &mut a.artist_id)
            .column("releaseYear", |a: &Album| &a.release_year, |a: &mut Album| &mut a.release_year)
            .build()
    }
}

/// Key half of an `Album` row.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct AlbumKey {
    /// Album id.
    pub album_id: i32,
    /// Artist id.
    pub artist_id: i32,
}

impl Mapped for AlbumKey {
    fn mapping() -> ObjectMapping<Self> {
        ObjectMapping::builder()
            .column("albumId", |k: &AlbumKey| &k.album_id, |k: &mut AlbumKey| &mut k.album_id)
            .column("artistId", |k: &AlbumKey| &k.artist_id, |k: &mut AlbumKey| &mut k.artist_id)
            .build()
    }
}

/// Value half of an `Album` row.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct AlbumValue {
    /// Title.
    pub title: String,
    /// Release year, if known.
    pub release_year: Option<i32>,
}

impl Mapped for AlbumValue {
    fn mapping() -> ObjectMapping<Self> {
        ObjectMapping::builder()
            .column("title", |v: &AlbumValue| &v.title, |v: &mut AlbumValue| &mut v.title)
            .column("releaseYear", |v: &AlbumValue| &v.release_year, |v: &mut AlbumValue| &mut v.release_year)
            .build()
    }
}
