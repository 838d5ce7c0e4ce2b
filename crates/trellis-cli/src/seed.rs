//! Sample music catalogue loaded into the in-process cluster.

use trellis_client::{Client, ColumnSchema, DataType, TableDefinition, TrellisResult, Tuple};

const ARTISTS: &[(i32, &str)] = &[
    (1, "AC/DC"),
    (2, "Accept"),
    (3, "Aerosmith"),
    (4, "Alanis Morissette"),
    (5, "Alice In Chains"),
];

const ALBUMS: &[(i32, &str, i32, Option<i32>)] = &[
    (1, "For Those About To Rock", 1, Some(1981)),
    (2, "Balls to the Wall", 2, Some(1983)),
    (3, "Restless and Wild", 2, Some(1982)),
    (4, "Let There Be Rock", 1, Some(1977)),
    (5, "Big Ones", 3, Some(1994)),
    (6, "Jagged Little Pill", 4, Some(1995)),
    (7, "Facelift", 5, Some(1990)),
    (8, "Live Bootleg", 3, None),
];

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

/// Creates the music tables and loads the sample rows.
pub async fn seed(client: &Client) -> TrellisResult<()> {
    let catalog = client.catalog();
    catalog.create_table(artist_table().if_not_exists()).await?;
    catalog.create_table(album_table().if_not_exists()).await?;

    let artists: Vec<Tuple> = ARTISTS
        .iter()
        .map(|&(id, name)| Tuple::new().set("artistId", id).set("name", name))
        .collect();
    let albums: Vec<Tuple> = ALBUMS
        .iter()
        .map(|&(id, title, artist, year)| {
            Tuple::new()
                .set("albumId", id)
                .set("title", title)
                .set("artistId", artist)
                .set("releaseYear", year)
        })
        .collect();

    let tables = client.tables();
    tables.table("Artist").await?.record_view().upsert_all(None, &artists).await?;
    tables.table("Album").await?.record_view().upsert_all(None, &albums).await?;

    tracing::debug!(artists = artists.len(), albums = albums.len(), "sample catalogue loaded");
    Ok(())
}
