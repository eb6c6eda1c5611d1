use hometree_core::db::open_db_in_memory;
use hometree_core::{
    Device, EntityKind, EntityListQuery, EntityStore, House, RepoError, Room, SqliteEntityStore,
    User,
};
use rusqlite::Connection;

fn seeded() -> Connection {
    let conn = open_db_in_memory().unwrap();
    {
        let store = SqliteEntityStore::try_new(&conn).unwrap();
        store.insert(&User::new("john@example.com", "John")).unwrap();
        store
            .insert(&House::new("123 Main St", "john@example.com"))
            .unwrap();
        store.insert(&Room::new("Kitchen", "123 Main St")).unwrap();
        store.insert(&Device::new("Light", "Kitchen")).unwrap();
    }
    conn
}

#[test]
fn insert_and_find_roundtrip() {
    let conn = seeded();
    let store = SqliteEntityStore::try_new(&conn).unwrap();

    let house = store.find_by_key::<House>("123 Main St").unwrap().unwrap();
    assert_eq!(house, House::new("123 Main St", "john@example.com"));
    assert!(store.find_by_key::<Room>("Bathroom").unwrap().is_none());
    assert!(store.exists(EntityKind::Device, "Light").unwrap());
}

#[test]
fn duplicate_insert_returns_duplicate_key() {
    let conn = seeded();
    let store = SqliteEntityStore::try_new(&conn).unwrap();

    let err = store
        .insert(&User::new("john@example.com", "Other John"))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::DuplicateKey { kind: EntityKind::User, ref key } if key == "john@example.com"
    ));
}

#[test]
fn storage_rejects_missing_parents_as_constraint_errors() {
    let conn = seeded();
    let store = SqliteEntityStore::try_new(&conn).unwrap();

    let house_err = store
        .insert(&House::new("1 Ghost Ln", "ghost@example.com"))
        .unwrap_err();
    assert!(matches!(house_err, RepoError::Constraint(_)), "{house_err}");

    let room_err = store.insert(&Room::new("Attic", "1 Ghost Ln")).unwrap_err();
    assert!(matches!(room_err, RepoError::Constraint(_)), "{room_err}");

    let device_err = store.insert(&Device::new("Fan", "Attic")).unwrap_err();
    assert!(matches!(device_err, RepoError::Constraint(_)), "{device_err}");
}

#[test]
fn storage_rejects_moving_room_to_missing_house() {
    let conn = seeded();
    let store = SqliteEntityStore::try_new(&conn).unwrap();

    let err = store
        .update("Kitchen", &Room::new("Kitchen", "1 Nowhere"))
        .unwrap_err();
    assert!(matches!(err, RepoError::Constraint(_)), "{err}");
    assert_eq!(
        store.find_by_key::<Room>("Kitchen").unwrap().unwrap().house_address,
        "123 Main St"
    );

    store.insert(&Room::new("Attic", "123 Main St")).unwrap();
    store.delete::<House>("123 Main St").unwrap();
    store
        .update("Attic", &Room::new("Loft", "123 Main St"))
        .unwrap();
    assert!(store.find_by_key::<Room>("Loft").unwrap().is_some());
}

#[test]
fn storage_cascades_user_and_room_deletes_but_orphans_rooms() {
    let conn = seeded();
    let store = SqliteEntityStore::try_new(&conn).unwrap();

    let removed = store.delete::<User>("john@example.com").unwrap();
    assert_eq!(removed.name, "John");
    assert!(store.find_by_key::<House>("123 Main St").unwrap().is_none());
    assert!(store.find_by_key::<Room>("Kitchen").unwrap().is_some());

    store.delete::<Room>("Kitchen").unwrap();
    assert!(store.find_by_key::<Device>("Light").unwrap().is_none());
}

#[test]
fn update_replaces_key_and_rejects_collisions() {
    let conn = seeded();
    let store = SqliteEntityStore::try_new(&conn).unwrap();
    store
        .insert(&House::new("9 Side Rd", "john@example.com"))
        .unwrap();

    let err = store
        .update("9 Side Rd", &House::new("123 Main St", "john@example.com"))
        .unwrap_err();
    assert!(matches!(err, RepoError::DuplicateKey { .. }));

    store
        .update("9 Side Rd", &House::new("10 Side Rd", "john@example.com"))
        .unwrap();
    assert!(store.find_by_key::<House>("10 Side Rd").unwrap().is_some());

    let missing = store
        .update("nowhere", &House::new("11 Side Rd", "john@example.com"))
        .unwrap_err();
    assert!(matches!(missing, RepoError::NotFound { kind: EntityKind::House, .. }));
}

#[test]
fn reparent_children_moves_all_references() {
    let conn = seeded();
    let store = SqliteEntityStore::try_new(&conn).unwrap();
    store.insert(&Device::new("Fridge", "Kitchen")).unwrap();
    store.insert(&Room::new("Pantry", "123 Main St")).unwrap();

    let moved = store
        .reparent_children(EntityKind::Device, "Kitchen", "Pantry")
        .unwrap();
    assert_eq!(moved, 2);
    assert_eq!(
        store.child_keys(EntityKind::Device, "Pantry").unwrap(),
        vec!["Light".to_string(), "Fridge".to_string()]
    );
}

#[test]
fn list_respects_offset_limit_and_insertion_order() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteEntityStore::try_new(&conn).unwrap();
    for index in 0..15 {
        store
            .insert(&User::new(format!("user{index:02}@example.com"), "User"))
            .unwrap();
    }

    let first_page = store.list::<User>(&EntityListQuery::default()).unwrap();
    assert_eq!(first_page.len(), 10);
    assert_eq!(first_page[0].email, "user00@example.com");

    let second_page = store
        .list::<User>(&EntityListQuery::new(10, Some(10)))
        .unwrap();
    assert_eq!(second_page.len(), 5);
    assert_eq!(second_page[0].email, "user10@example.com");
}

#[test]
fn read_rejects_invalid_persisted_rows() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO users (email, name) VALUES ('broken', '   ');",
        [],
    )
    .unwrap();

    let store = SqliteEntityStore::try_new(&conn).unwrap();
    let err = store.find_by_key::<User>("broken").unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));
}

#[test]
fn try_new_rejects_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();
    let err = SqliteEntityStore::try_new(&conn).err().unwrap();
    assert!(matches!(
        err,
        RepoError::UninitializedConnection {
            actual_version: 0,
            ..
        }
    ));
}
