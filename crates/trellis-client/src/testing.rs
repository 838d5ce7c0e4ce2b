//! Shared fixtures for unit tests.

use trellis_common::schema::{ColumnSchema, TableSchema};
use trellis_common::tuple::Tuple;
use trellis_common::types::DataType;
use trellis_store::MemoryCluster;

use crate::client::{Client, ClientConfig};

/// Initial contents of the music tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MusicStore {
    /// Tables exist but hold no rows.
    Empty,
    /// Two artists and three albums.
    Seeded,
}

pub(crate) fn artist_schema() -> TableSchema {
    TableSchema::builder("Artist")
        .column(ColumnSchema::new("artistId", DataType::Int32))
        .column(ColumnSchema::new("name", DataType::String).nullable(true))
        .primary_key(&["artistId"])
        .build()
        .unwrap()
}

pub(crate) fn album_schema() -> TableSchema {
    TableSchema::builder("Album")
        .column(ColumnSchema::new("albumId", DataType::Int32))
        .column(ColumnSchema::new("title", DataType::String).max_length(25))
        .column(ColumnSchema::new("artistId", DataType::Int32))
        .column(ColumnSchema::new("releaseYear", DataType::Int32).nullable(true))
        .primary_key(&["albumId", "artistId"])
        .build()
        .unwrap()
}

/// Starts a single-node cluster holding the music tables and connects a
/// client to it.
pub(crate) async fn connect(store: MusicStore) -> (MemoryCluster, Client) {
    let cluster = MemoryCluster::new(["node:1"]);
    let db = cluster.database();
    db.create_table(artist_schema(), false).unwrap();
    db.create_table(album_schema(), false).unwrap();

    if store == MusicStore::Seeded {
        for (id, name) in [(1, "AC/DC"), (2, "Accept")] {
            db.upsert(None, "ARTIST", &Tuple::new().set("artistId", id).set("name", name))
                .unwrap();
        }
        for (id, title, artist) in [
            (1, "For Those About To Rock", 1),
            (2, "Balls to the Wall", 2),
            (4, "Let There Be Rock", 1),
        ] {
            let row = Tuple::new()
                .set("albumId", id)
                .set("title", title)
                .set("artistId", artist);
            db.upsert(None, "ALBUM", &row).unwrap();
        }
    }

    let config = ClientConfig::new().endpoints(["node:1"]);
    let client = Client::connect(config, &cluster).await.unwrap();
    (cluster, client)
}
