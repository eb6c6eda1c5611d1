use hometree_core::{
    Database, Device, DevicePatch, EngineError, EntityKind, EntityListQuery, House, HousePatch,
    IntegrityEngine, Room, RoomPatch, User, UserPatch,
};

fn engine() -> IntegrityEngine {
    IntegrityEngine::new(Database::open_in_memory().unwrap())
}

fn seeded() -> IntegrityEngine {
    let engine = engine();
    engine
        .create(User::new("john@example.com", "John"))
        .unwrap();
    engine
        .create(House::new("123 Main St", "john@example.com"))
        .unwrap();
    engine.create(Room::new("Kitchen", "123 Main St")).unwrap();
    engine.create(Device::new("Light", "Kitchen")).unwrap();
    engine
}

#[test]
fn create_child_requires_existing_parent() {
    let engine = engine();

    let err = engine
        .create(House::new("123 Main St", "ghost@example.com"))
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::ParentNotFound { kind: EntityKind::User, ref key } if key == "ghost@example.com"
    ));

    let err = engine.create(Room::new("Kitchen", "123 Main St")).unwrap_err();
    assert!(matches!(
        err,
        EngineError::ParentNotFound {
            kind: EntityKind::House,
            ..
        }
    ));

    let err = engine.create(Device::new("Light", "Kitchen")).unwrap_err();
    assert!(matches!(
        err,
        EngineError::ParentNotFound {
            kind: EntityKind::Room,
            ..
        }
    ));
}

#[test]
fn second_create_with_same_key_is_duplicate_for_every_kind() {
    let engine = seeded();

    let user_err = engine
        .create(User::new("john@example.com", "John Again"))
        .unwrap_err();
    let house_err = engine
        .create(House::new("123 Main St", "john@example.com"))
        .unwrap_err();
    let room_err = engine.create(Room::new("Kitchen", "123 Main St")).unwrap_err();
    let device_err = engine.create(Device::new("Light", "Kitchen")).unwrap_err();

    for (err, kind) in [
        (user_err, EntityKind::User),
        (house_err, EntityKind::House),
        (room_err, EntityKind::Room),
        (device_err, EntityKind::Device),
    ] {
        assert!(
            matches!(err, EngineError::DuplicateKey { kind: actual, .. } if actual == kind),
            "{kind}: {err}"
        );
    }
}

#[test]
fn parent_is_checked_before_duplicate_key() {
    let engine = seeded();

    let err = engine
        .create(House::new("123 Main St", "ghost@example.com"))
        .unwrap_err();
    assert!(matches!(err, EngineError::ParentNotFound { .. }));
}

#[test]
fn create_rejects_blank_fields_only() {
    let engine = engine();

    let err = engine
        .create(User::new("john@example.com", "   "))
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let admin = engine.create(User::new("admin", "Admin")).unwrap();
    assert_eq!(engine.read::<User>("admin").unwrap(), admin);

    let err = engine.create(House::new("   ", "admin")).unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[test]
fn missing_parent_wins_over_field_checks() {
    let engine = engine();

    let err = engine.create(House::new("123 Main St", "bob")).unwrap_err();
    assert!(matches!(
        err,
        EngineError::ParentNotFound { kind: EntityKind::User, ref key } if key == "bob"
    ));

    let err = engine.create(House::new("   ", "bob")).unwrap_err();
    assert!(matches!(err, EngineError::ParentNotFound { .. }));

    let err = engine.create(Room::new("Kitchen", "")).unwrap_err();
    assert!(matches!(
        err,
        EngineError::ParentNotFound {
            kind: EntityKind::House,
            ..
        }
    ));
}

#[test]
fn read_missing_entity_is_not_found() {
    let engine = seeded();

    let err = engine.read::<User>("nonexistent@example.com").unwrap_err();
    assert!(matches!(
        err,
        EngineError::NotFound {
            kind: EntityKind::User,
            ..
        }
    ));
    assert_eq!(
        engine.read::<Device>("Light").unwrap(),
        Device::new("Light", "Kitchen")
    );
}

#[test]
fn user_email_change_is_always_rejected() {
    let engine = seeded();

    for patch in [
        UserPatch {
            name: None,
            email: Some("jane@example.com".to_string()),
        },
        UserPatch {
            name: Some("Jane".to_string()),
            email: Some("jane@example.com".to_string()),
        },
        UserPatch {
            name: None,
            email: Some("not even an email".to_string()),
        },
    ] {
        let err = engine
            .update::<User>("john@example.com", patch)
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::ImmutableKey {
                kind: EntityKind::User,
                field: "email",
            }
        ));
    }

    assert_eq!(engine.read::<User>("john@example.com").unwrap().name, "John");
}

#[test]
fn user_name_update_keeps_email() {
    let engine = seeded();

    let updated = engine
        .update::<User>(
            "john@example.com",
            UserPatch {
                name: Some("Johnny".to_string()),
                email: Some("john@example.com".to_string()),
            },
        )
        .unwrap();
    assert_eq!(updated, User::new("john@example.com", "Johnny"));

    let unchanged = engine
        .update::<User>(
            "john@example.com",
            UserPatch {
                name: Some(String::new()),
                email: None,
            },
        )
        .unwrap();
    assert_eq!(unchanged.name, "Johnny");

    let err = engine
        .update::<User>("ghost@example.com", UserPatch::default())
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound { .. }));
}

#[test]
fn house_rename_repoints_rooms() {
    let engine = seeded();

    let renamed = engine
        .update::<House>(
            "123 Main St",
            HousePatch {
                address: Some("124 Main St".to_string()),
                user_email: None,
            },
        )
        .unwrap();
    assert_eq!(renamed, House::new("124 Main St", "john@example.com"));

    assert!(matches!(
        engine.read::<House>("123 Main St"),
        Err(EngineError::NotFound { .. })
    ));
    assert_eq!(
        engine.read::<Room>("Kitchen").unwrap().house_address,
        "124 Main St"
    );
}

#[test]
fn room_rename_repoints_devices() {
    let engine = seeded();

    engine
        .update::<Room>(
            "Kitchen",
            RoomPatch {
                name: Some("Galley".to_string()),
                house_address: None,
            },
        )
        .unwrap();

    assert_eq!(engine.read::<Device>("Light").unwrap().room_name, "Galley");
}

#[test]
fn rename_onto_existing_key_is_duplicate() {
    let engine = seeded();
    engine
        .create(House::new("9 Side Rd", "john@example.com"))
        .unwrap();

    let err = engine
        .update::<House>(
            "9 Side Rd",
            HousePatch {
                address: Some("123 Main St".to_string()),
                user_email: None,
            },
        )
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::DuplicateKey {
            kind: EntityKind::House,
            ..
        }
    ));

    let same_key = engine
        .update::<House>(
            "9 Side Rd",
            HousePatch {
                address: Some("9 Side Rd".to_string()),
                user_email: Some("john@example.com".to_string()),
            },
        )
        .unwrap();
    assert_eq!(same_key.address, "9 Side Rd");
}

#[test]
fn parent_change_is_revalidated() {
    let engine = seeded();

    let err = engine
        .update::<Device>(
            "Light",
            DevicePatch {
                name: None,
                room_name: Some("Attic".to_string()),
            },
        )
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::ParentNotFound {
            kind: EntityKind::Room,
            ..
        }
    ));

    engine.create(Room::new("Attic", "123 Main St")).unwrap();
    let moved = engine
        .update::<Device>(
            "Light",
            DevicePatch {
                name: None,
                room_name: Some("Attic".to_string()),
            },
        )
        .unwrap();
    assert_eq!(moved.room_name, "Attic");
}

#[test]
fn deleting_user_cascades_to_all_houses_only() {
    let engine = seeded();
    engine
        .create(House::new("9 Side Rd", "john@example.com"))
        .unwrap();
    engine
        .create(House::new("77 Lake Dr", "john@example.com"))
        .unwrap();

    let outcome = engine.delete::<User>("john@example.com").unwrap();
    assert_eq!(outcome.entity.email, "john@example.com");
    assert_eq!(outcome.cascaded, 3);
    assert_eq!(outcome.orphaned, 1);

    for address in ["123 Main St", "9 Side Rd", "77 Lake Dr"] {
        assert!(matches!(
            engine.read::<House>(address),
            Err(EngineError::NotFound { .. })
        ));
    }
    assert!(engine.read::<Room>("Kitchen").is_ok());
    assert!(engine.read::<Device>("Light").is_ok());
}

#[test]
fn deleting_house_orphans_rooms() {
    let engine = seeded();

    let outcome = engine.delete::<House>("123 Main St").unwrap();
    assert_eq!(outcome.cascaded, 0);
    assert_eq!(outcome.orphaned, 1);

    let room = engine.read::<Room>("Kitchen").unwrap();
    assert_eq!(room.house_address, "123 Main St");
    assert!(engine.read::<Device>("Light").is_ok());
}

#[test]
fn orphaned_room_can_be_renamed_but_not_moved_to_missing_house() {
    let engine = seeded();
    engine.delete::<House>("123 Main St").unwrap();

    let renamed = engine
        .update::<Room>(
            "Kitchen",
            RoomPatch {
                name: Some("Old Kitchen".to_string()),
                house_address: Some("123 Main St".to_string()),
            },
        )
        .unwrap();
    assert_eq!(renamed, Room::new("Old Kitchen", "123 Main St"));
    assert_eq!(
        engine.read::<Device>("Light").unwrap().room_name,
        "Old Kitchen"
    );

    let err = engine
        .update::<Room>(
            "Old Kitchen",
            RoomPatch {
                name: None,
                house_address: Some("1 Nowhere".to_string()),
            },
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::ParentNotFound { .. }));
}

#[test]
fn recreated_house_adopts_orphaned_rooms() {
    let engine = seeded();
    engine.delete::<House>("123 Main St").unwrap();
    engine
        .create(House::new("123 Main St", "john@example.com"))
        .unwrap();

    let outcome = engine.delete::<House>("123 Main St").unwrap();
    assert_eq!(outcome.orphaned, 1);
}

#[test]
fn deleting_room_cascades_to_devices() {
    let engine = seeded();
    engine.create(Device::new("Fridge", "Kitchen")).unwrap();

    let outcome = engine.delete::<Room>("Kitchen").unwrap();
    assert_eq!(outcome.cascaded, 2);

    for name in ["Light", "Fridge"] {
        assert!(matches!(
            engine.read::<Device>(name),
            Err(EngineError::NotFound {
                kind: EntityKind::Device,
                ..
            })
        ));
    }
}

#[test]
fn delete_missing_entity_is_not_found() {
    let engine = seeded();

    let err = engine.delete::<Device>("Toaster").unwrap_err();
    assert!(matches!(err, EngineError::NotFound { .. }));
}

#[test]
fn list_uses_offset_and_limit() {
    let engine = seeded();
    for name in ["Bath", "Hall", "Study"] {
        engine.create(Room::new(name, "123 Main St")).unwrap();
    }

    let rooms = engine
        .list::<Room>(&EntityListQuery::new(1, Some(2)))
        .unwrap();
    let names = rooms.into_iter().map(|room| room.name).collect::<Vec<_>>();
    assert_eq!(names, vec!["Bath".to_string(), "Hall".to_string()]);
}
