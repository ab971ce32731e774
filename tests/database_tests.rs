//! Database integration tests
//!
//! Tests the schema and repositories to ensure:
//! - Songs require an existing group
//! - Titles are unique within a group
//! - Group creation is idempotent by name
//! - Listing filters and pagination behave as documented

use chrono::{NaiveDate, Utc};
use fake::{faker::name::en::Name, Fake};
use sea_orm::{ActiveModelTrait, EntityTrait, Set};

use song_library::db::entities::{groups, songs};
use song_library::db::repositories::{GroupRepository, NewSong, SongFilter, SongRepository};
use song_library::test_utils::*;

fn new_song(title: &str, text: &str) -> NewSong {
    NewSong {
        title: title.to_string(),
        release_date: NaiveDate::from_ymd_opt(2006, 7, 16).unwrap(),
        text: text.to_string(),
        link: "https://example.com".to_string(),
    }
}

#[tokio::test]
async fn test_create_group_and_song() {
    let db = setup_test_db().await;

    let name: String = Name().fake();
    let group = create_test_group(&db, &name).await;
    let song = create_test_song(&db, group.id, "Starlight", "Far away\n\nThis ship").await;

    assert_eq!(group.name, name);
    assert!(group.id > 0);
    assert_eq!(song.group_id, group.id);
    assert_eq!(song.title, "Starlight");
    assert!(song.created_at.timestamp() > 0);
}

#[tokio::test]
async fn test_song_requires_valid_group() {
    let db = setup_test_db().await;

    let invalid_song = songs::ActiveModel {
        group_id: Set(99999),
        title: Set("Orphan".to_string()),
        release_date: Set(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()),
        text: Set(String::new()),
        link: Set(String::new()),
        created_at: Set(Utc::now().into()),
        ..Default::default()
    };

    let result = invalid_song.insert(&db).await;
    assert!(result.is_err(), "Should fail to create song with invalid group_id");
}

#[tokio::test]
async fn test_title_unique_within_group() {
    let db = setup_test_db().await;

    let muse = create_test_group(&db, "Muse").await;
    let queen = create_test_group(&db, "Queen").await;
    create_test_song(&db, muse.id, "Madness", "").await;

    // Same title under another group is fine
    create_test_song(&db, queen.id, "Madness", "").await;

    let duplicate = songs::ActiveModel {
        group_id: Set(muse.id),
        title: Set("Madness".to_string()),
        release_date: Set(NaiveDate::from_ymd_opt(2012, 8, 20).unwrap()),
        text: Set(String::new()),
        link: Set(String::new()),
        created_at: Set(Utc::now().into()),
        ..Default::default()
    };
    assert!(duplicate.insert(&db).await.is_err());
}

#[tokio::test]
async fn test_deleting_group_cascades_to_songs() {
    let db = setup_test_db().await;

    let group = create_test_group(&db, "Muse").await;
    create_test_song(&db, group.id, "Hysteria", "").await;

    groups::Entity::delete_by_id(group.id).exec(&db).await.unwrap();

    let remaining = songs::Entity::find().all(&db).await.unwrap();
    assert!(remaining.is_empty());
}

#[tokio::test]
async fn test_create_with_group_reuses_existing_group() {
    let db = setup_test_db().await;
    let repo = SongRepository::new(db.clone());
    let group_repo = GroupRepository::new(db.clone());

    let first = repo.create_with_group("Muse", new_song("Uprising", "a")).await.unwrap();
    let second = repo.create_with_group("Muse", new_song("Resistance", "b")).await.unwrap();

    assert_eq!(first.group_id, second.group_id);

    let group = group_repo.find_by_name("Muse").await.unwrap().unwrap();
    assert_eq!(group.id, first.group_id);
    assert_eq!(groups::Entity::find().all(&db).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_with_group_is_idempotent_per_title() {
    let db = setup_test_db().await;
    let repo = SongRepository::new(db.clone());

    let first = repo.create_with_group("Muse", new_song("Uprising", "original")).await.unwrap();
    let second = repo.create_with_group("Muse", new_song("Uprising", "replacement")).await.unwrap();

    // The conflicting insert is dropped and the stored row comes back
    assert_eq!(first.id, second.id);
    assert_eq!(second.text, "original");
    assert_eq!(songs::Entity::find().all(&db).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_find_by_group_and_title() {
    let db = setup_test_db().await;
    let repo = SongRepository::new(db.clone());

    let muse = create_test_group(&db, "Muse").await;
    let song = create_test_song(&db, muse.id, "Uprising", "").await;

    let found = repo.find_by_group_and_title("Muse", "Uprising").await.unwrap();
    assert_eq!(found.map(|s| s.id), Some(song.id));

    assert!(repo.find_by_group_and_title("Queen", "Uprising").await.unwrap().is_none());
    assert!(repo.find_by_group_and_title("Muse", "uprising").await.unwrap().is_none());
}

#[tokio::test]
async fn test_list_filters_are_case_insensitive_substrings() {
    let db = setup_test_db().await;
    let repo = SongRepository::new(db.clone());

    let muse = create_test_group(&db, "Muse").await;
    let queen = create_test_group(&db, "Queen").await;
    create_test_song(&db, muse.id, "Supermassive Black Hole", "Ooh baby").await;
    create_test_song(&db, muse.id, "Starlight", "Far away").await;
    create_test_song(&db, queen.id, "Bohemian Rhapsody", "Is this the real life").await;

    let by_group = SongFilter {
        group: Some("muS".to_string()),
        ..Default::default()
    };
    assert_eq!(repo.list(&by_group, 0, 10).await.unwrap().len(), 2);

    let by_title = SongFilter {
        title: Some("black".to_string()),
        ..Default::default()
    };
    let rows = repo.list(&by_title, 0, 10).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].0.title, "Supermassive Black Hole");
    assert_eq!(rows[0].1.as_ref().map(|g| g.name.as_str()), Some("Muse"));

    let combined = SongFilter {
        group: Some("queen".to_string()),
        text: Some("REAL".to_string()),
        ..Default::default()
    };
    assert_eq!(repo.list(&combined, 0, 10).await.unwrap().len(), 1);

    let wildcard = SongFilter {
        title: Some("%".to_string()),
        ..Default::default()
    };
    assert!(repo.list(&wildcard, 0, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_filter_matches_non_ascii_names() {
    let db = setup_test_db().await;
    let repo = SongRepository::new(db.clone());

    let kino = create_test_group(&db, "Кино").await;
    let muse = create_test_group(&db, "Muse").await;
    create_test_song(&db, kino.id, "Группа крови", "Тёплое место").await;
    create_test_song(&db, muse.id, "Uprising", "Paranoia is in bloom").await;

    let by_group = SongFilter {
        group: Some("Кин".to_string()),
        ..Default::default()
    };
    let rows = repo.list(&by_group, 0, 10).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].0.title, "Группа крови");

    let by_text = SongFilter {
        text: Some("Тёплое".to_string()),
        ..Default::default()
    };
    assert_eq!(repo.list(&by_text, 0, 10).await.unwrap().len(), 1);

    let ascii_fold = SongFilter {
        group: Some("MUSE".to_string()),
        text: Some("PARANOIA".to_string()),
        ..Default::default()
    };
    assert_eq!(repo.list(&ascii_fold, 0, 10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_list_filter_by_release_date() {
    let db = setup_test_db().await;
    let repo = SongRepository::new(db.clone());

    let muse = create_test_group(&db, "Muse").await;
    let song = create_test_song(&db, muse.id, "Knights of Cydonia", "").await;

    let mut active: songs::ActiveModel = song.into();
    active.release_date = Set(NaiveDate::from_ymd_opt(2006, 11, 27).unwrap());
    active.update(&db).await.unwrap();
    create_test_song(&db, muse.id, "Map of the Problematique", "").await;

    let filter = SongFilter {
        release_date: NaiveDate::from_ymd_opt(2006, 11, 27),
        ..Default::default()
    };
    let rows = repo.list(&filter, 0, 10).await.unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].0.title, "Knights of Cydonia");
}

#[tokio::test]
async fn test_list_pages_partition_results() {
    let db = setup_test_db().await;
    let repo = SongRepository::new(db.clone());

    let group = create_test_group(&db, "Muse").await;
    for i in 1..=7 {
        create_test_song(&db, group.id, &format!("Song {}", i), "").await;
    }

    let filter = SongFilter::default();
    let mut seen = Vec::new();
    for page in 0..4u64 {
        let rows = repo.list(&filter, page * 3, 3).await.unwrap();
        assert!(rows.len() <= 3);
        seen.extend(rows.into_iter().map(|(song, _)| song.id));
    }

    let mut expected: Vec<i32> = songs::Entity::find()
        .all(&db)
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();
    expected.sort();

    assert_eq!(seen, expected);
}

#[tokio::test]
async fn test_delete_reports_rows_affected() {
    let db = setup_test_db().await;
    let repo = SongRepository::new(db.clone());

    let group = create_test_group(&db, "Muse").await;
    let song = create_test_song(&db, group.id, "Hysteria", "").await;

    assert_eq!(repo.delete(song.id).await.unwrap(), 1);
    assert_eq!(repo.delete(song.id).await.unwrap(), 0);
    assert!(repo.find_by_id(song.id).await.unwrap().is_none());
}
