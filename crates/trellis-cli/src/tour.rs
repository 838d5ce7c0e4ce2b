//! The four-view walkthrough.
//!
//! Each step writes through one view and reads the result back, so the
//! output shows the same tables seen as tuples, as mapped structs and as
//! key/value pairs.

use trellis_client::{
    Client, ColumnSchema, DataType, Mapped, ObjectMapping, Statement, TableDefinition, TrellisResult,
    Tuple,
};

use crate::formatter::Rows;

/// One step of the tour and the rows it produced.
#[derive(Debug, Clone)]
pub struct Step {
    /// What the step did.
    pub title: String,
    /// Rows read back.
    pub rows: Rows,
}

impl Step {
    fn new(title: impl Into<String>, rows: Rows) -> Self {
        Self {
            title: title.into(),
            rows,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Album {
    album_id: i32,
    title: String,
    artist_id: i32,
    release_year: Option<i32>,
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

#[derive(Debug, Default, Clone, PartialEq)]
struct AlbumKey {
    album_id: i32,
    artist_id: i32,
}

impl Mapped for AlbumKey {
    fn mapping() -> ObjectMapping<Self> {
        ObjectMapping::builder()
            .column("albumId", |k: &AlbumKey| &k.album_id, |k: &mut AlbumKey| &mut k.album_id)
            .column("artistId", |k: &AlbumKey| &k.artist_id, |k: &mut AlbumKey| &mut k.artist_id)
            .build()
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct AlbumValue {
    title: String,
    release_year: Option<i32>,
}

impl Mapped for AlbumValue {
    fn mapping() -> ObjectMapping<Self> {
        ObjectMapping::builder()
            .column("title", |v: &AlbumValue| &v.title, |v: &mut AlbumValue| &mut v.title)
            .column("releaseYear", |v: &AlbumValue| &v.release_year, |v: &mut AlbumValue| &mut v.release_year)
            .build()
    }
}

/// Runs the tour against a client whose cluster holds the sample catalogue.
pub async fn run(client: &Client) -> TrellisResult<Vec<Step>> {
    let mut steps = Vec::new();
    let sql = client.sql();
    let tables = client.tables();

    let albums = sql.execute(None, "SELECT * FROM Album LIMIT 10").await?;
    steps.push(Step::new("SQL: first albums", Rows::from_result_set(albums)));

    // RecordView<Tuple>
    let artists = tables.table("Artist").await?.record_view();
    artists
        .upsert(None, &Tuple::new().set("artistId", 276).set("name", "New Discovery Band"))
        .await?;
    let row = artists.get(None, &Tuple::new().set("artistId", 276)).await?;
    steps.push(Step::new("RecordView<Tuple>: Artist 276", Rows::from_tuples(row)));

    // RecordView<Album>
    let album_table = tables.table("Album").await?;
    let album_view = album_table.record_view_of::<Album>()?;
    album_view
        .upsert(
            None,
            &Album {
                album_id: 348,
                title: "First Light".into(),
                artist_id: 276,
                release_year: Some(2023),
            },
        )
        .await?;
    let key = Album {
        album_id: 348,
        artist_id: 276,
        ..Album::default()
    };
    let album = album_view.get(None, &key).await?;
    let rows = album.iter().map(|a| {
        Tuple::new()
            .set("albumId", a.album_id)
            .set("title", a.title.as_str())
            .set("artistId", a.artist_id)
            .set("releaseYear", a.release_year)
    });
    steps.push(Step::new("RecordView<Album>: album 348", Rows::from_tuples(rows)));

    // KeyValueView<Tuple, Tuple>
    let artist_kv = tables.table("Artist").await?.key_value_view();
    let key = Tuple::new().set("artistId", 277);
    artist_kv
        .put(None, &key, &Tuple::new().set("name", "New Order"))
        .await?;
    let value = artist_kv.get(None, &key).await?;
    steps.push(Step::new("KeyValueView<Tuple, Tuple>: artist 277", Rows::from_tuples(value)));

    // KeyValueView<AlbumKey, AlbumValue>
    let album_kv = album_table.key_value_view_of::<AlbumKey, AlbumValue>()?;
    let key = AlbumKey {
        album_id: 349,
        artist_id: 277,
    };
    album_kv
        .put(
            None,
            &key,
            &AlbumValue {
                title: "Technique".into(),
                release_year: Some(1989),
            },
        )
        .await?;
    let value = album_kv.get(None, &key).await?;
    let rows = value.iter().map(|v| {
        Tuple::new()
            .set("title", v.title.as_str())
            .set("releaseYear", v.release_year)
    });
    steps.push(Step::new("KeyValueView<AlbumKey, AlbumValue>: album 349", Rows::from_tuples(rows)));

    let statement = Statement::new("SELECT albumId, title, releaseYear FROM Album WHERE artistId = ?").bind(277);
    let rows = sql.execute(None, statement).await?;
    steps.push(Step::new("SQL: albums of artist 277", Rows::from_result_set(rows)));

    // KeyValueView<i32, String>
    client
        .catalog()
        .create_table(
            TableDefinition::new("Person2")
                .if_not_exists()
                .column(ColumnSchema::new("id", DataType::Int32))
                .column(ColumnSchema::new("name", DataType::String).nullable(true))
                .primary_key(&["id"]),
        )
        .await?;
    let people = tables.table("Person2").await?.key_value_view_of::<i32, String>()?;
    people.put(None, &5, &"Joe".to_string()).await?;
    let name = people.get(None, &5).await?;
    let rows = name.map(|n| Tuple::new().set("id", 5).set("name", n));
    steps.push(Step::new("KeyValueView<i32, String>: person 5", Rows::from_tuples(rows)));

    Ok(steps)
}
