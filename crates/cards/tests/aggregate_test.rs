use sqlx::types::Uuid;
use sqlx::PgPool;
use tempfile::TempDir;

use linkcard_assets::{ImageAssetStore, ImageField, QrCodeGenerator, StorageConfig};
use linkcard_cards::{
    Card, CardAggregateService, CardError, CardInput, CardItem, ItemInput,
};
use linkcard_database::{SqlxCrud, SqlxSchema};
use linkcard_themes::ThemeCatalog;

async fn pool() -> PgPool {
    dotenv::dotenv().ok();
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPool::connect(&url).await.expect("connect to postgres");
    for sql in [
        <Card as SqlxSchema>::create_table_sql(),
        <CardItem as SqlxSchema>::create_table_sql(),
        <linkcard_cards::CardImage as SqlxSchema>::create_table_sql(),
    ] {
        sqlx::query(&sql).execute(&pool).await.expect("create table");
    }
    pool
}

fn service(pool: PgPool, storage_root: &TempDir) -> CardAggregateService {
    let config = StorageConfig::new(
        "http://localhost:8080/assets",
        storage_root.path().to_path_buf(),
    );
    // empty catalog: theme normalization falls through to the bare default
    let catalog = ThemeCatalog::discover(storage_root.path().join("no-themes"));
    CardAggregateService::new(
        pool,
        ImageAssetStore::new(config.clone()),
        QrCodeGenerator::new(config),
        catalog,
        None,
    )
}

fn item(item_type: &str, value: &str) -> ItemInput {
    ItemInput {
        id: None,
        item_type: item_type.to_string(),
        value: value.to_string(),
        label: None,
    }
}

fn input(name: &str, items: Vec<ItemInput>) -> CardInput {
    CardInput {
        name: name.to_string(),
        items,
        ..Default::default()
    }
}

fn extract_card(data: &serde_json::Value) -> Card {
    serde_json::from_value(data["card"].clone()).expect("card in response body")
}

#[tokio::test]
#[ignore = "requires a Postgres instance via DATABASE_URL"]
async fn create_persists_dense_positions_and_qr() {
    let pool = pool().await;
    let storage = TempDir::new().unwrap();
    let service = service(pool.clone(), &storage);
    let owner = Uuid::new_v4();

    let response = service
        .create(
            &input("Jane Doe", vec![item("name", "Jane"), item("name", "JD")]),
            &owner,
        )
        .await
        .expect("create succeeds");
    assert_eq!(response.status, 201);

    let card = extract_card(&response.data);
    assert_eq!(card.owner_id, owner);
    assert!(card.qr_image_url.is_some());
    assert!(card.qr_target_url.as_deref().unwrap().ends_with(&card.id.to_string()));

    let items = CardItem::find_by_card(&card.id, &pool).await.unwrap();
    let positions: Vec<i32> = items.iter().map(|i| i.position).collect();
    assert_eq!(positions, vec![1, 2]);

    let qr_path = card.qr_image_path.as_deref().unwrap();
    assert!(std::path::Path::new(qr_path).exists());
}

#[tokio::test]
#[ignore = "requires a Postgres instance via DATABASE_URL"]
async fn create_with_rejected_item_leaves_no_card_row() {
    let pool = pool().await;
    let storage = TempDir::new().unwrap();
    let service = service(pool.clone(), &storage);
    let owner = Uuid::new_v4();

    let err = service
        .create(
            &input("Jane Doe", vec![item("name", "Jane"), item("bio", "hi")]),
            &owner,
        )
        .await
        .expect_err("unknown item type must be rejected");

    let (card, outcomes) = match err {
        CardError::ItemsRejected { card, outcomes } => (card, outcomes),
        other => panic!("expected ItemsRejected, got {:?}", other),
    };
    assert_eq!(outcomes.len(), 2);
    assert!(Card::find_by_id(card.id, &pool).await.unwrap().is_none());
    assert!(CardItem::find_by_card(&card.id, &pool).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore = "requires a Postgres instance via DATABASE_URL"]
async fn update_rolls_back_card_fields_on_item_rejection() {
    let pool = pool().await;
    let storage = TempDir::new().unwrap();
    let service = service(pool.clone(), &storage);
    let owner = Uuid::new_v4();

    let created = service
        .create(&input("Original Name", vec![item("name", "One")]), &owner)
        .await
        .unwrap();
    let card = extract_card(&created.data);

    let err = service
        .update(
            &card.id,
            &input("Renamed", vec![item("name", ""), item("name", "Two")]),
            &owner,
        )
        .await
        .expect_err("empty value must be rejected");
    assert!(matches!(err, CardError::ItemSyncRejected(_)));
    assert_eq!(err.status(), 422);

    let reloaded = Card::find_by_id(card.id, &pool).await.unwrap().unwrap();
    assert_eq!(reloaded.name, "Original Name");
    let items = CardItem::find_by_card(&card.id, &pool).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].value, "One");
}

#[tokio::test]
#[ignore = "requires a Postgres instance via DATABASE_URL"]
async fn update_replaces_items_and_renumbers() {
    let pool = pool().await;
    let storage = TempDir::new().unwrap();
    let service = service(pool.clone(), &storage);
    let owner = Uuid::new_v4();

    let created = service
        .create(
            &input("List Owner", vec![item("name", "A"), item("name", "B")]),
            &owner,
        )
        .await
        .unwrap();
    let card = extract_card(&created.data);
    let before = CardItem::find_by_card(&card.id, &pool).await.unwrap();

    // keep the second item (reordered first), drop the first, add a new one
    let kept = ItemInput {
        id: Some(before[1].id),
        ..item("name", "B2")
    };
    let response = service
        .update(&card.id, &input("List Owner", vec![kept, item("name", "C")]), &owner)
        .await
        .unwrap();
    assert_eq!(response.status, 200);

    let after = CardItem::find_by_card(&card.id, &pool).await.unwrap();
    assert_eq!(after.len(), 2);
    assert_eq!(after[0].id, before[1].id);
    assert_eq!(after[0].value, "B2");
    assert_eq!(after[0].position, 1);
    assert_eq!(after[1].value, "C");
    assert_eq!(after[1].position, 2);
}

#[tokio::test]
#[ignore = "requires a Postgres instance via DATABASE_URL"]
async fn update_rejects_duplicate_item_ids_without_touching_rows() {
    let pool = pool().await;
    let storage = TempDir::new().unwrap();
    let service = service(pool.clone(), &storage);
    let owner = Uuid::new_v4();

    let created = service
        .create(
            &input("Dup Holder", vec![item("name", "A"), item("name", "B")]),
            &owner,
        )
        .await
        .unwrap();
    let card = extract_card(&created.data);
    let before = CardItem::find_by_card(&card.id, &pool).await.unwrap();

    // the same row submitted twice must not collapse the list
    let twice = |value: &str| ItemInput {
        id: Some(before[0].id),
        ..item("name", value)
    };
    let err = service
        .update(&card.id, &input("Dup Holder", vec![twice("A1"), twice("A2")]), &owner)
        .await
        .expect_err("duplicate ids must be rejected");
    assert!(matches!(err, CardError::ItemSyncRejected(_)));

    let after = CardItem::find_by_card(&card.id, &pool).await.unwrap();
    assert_eq!(after.len(), 2);
    let positions: Vec<i32> = after.iter().map(|i| i.position).collect();
    assert_eq!(positions, vec![1, 2]);
    assert_eq!(after[0].value, "A");
}

#[tokio::test]
#[ignore = "requires a Postgres instance via DATABASE_URL"]
async fn rejected_banner_after_insert_reports_the_persisted_card() {
    let pool = pool().await;
    let storage = TempDir::new().unwrap();
    let service = service(pool.clone(), &storage);
    let owner = Uuid::new_v4();

    let payload = CardInput {
        name: "Banner Victim".to_string(),
        banner: ImageField::Data("!!not-base64!!".to_string()),
        ..Default::default()
    };
    let err = service
        .create(&payload, &owner)
        .await
        .expect_err("undecodable banner must fail");
    assert_eq!(err.status(), 422);
    assert!(matches!(err, CardError::ArtifactFailed { .. }));

    // the body names the card that now exists
    let body = err.to_response();
    let card_id: Uuid =
        serde_json::from_value(body.data["card_id"].clone()).expect("card id in error body");
    assert!(Card::find_by_id(card_id, &pool).await.unwrap().is_some());
}

#[tokio::test]
#[ignore = "requires a Postgres instance via DATABASE_URL"]
async fn other_owners_cannot_touch_the_card() {
    let pool = pool().await;
    let storage = TempDir::new().unwrap();
    let service = service(pool.clone(), &storage);
    let owner = Uuid::new_v4();

    let created = service.create(&input("Private", vec![]), &owner).await.unwrap();
    let card = extract_card(&created.data);

    let stranger = Uuid::new_v4();
    let err = service.delete(&card.id, &stranger).await.expect_err("must refuse");
    assert!(matches!(err, CardError::Unauthorized));
    assert_eq!(err.status(), 401);

    let err = service
        .update(&card.id, &input("Taken Over", vec![]), &stranger)
        .await
        .expect_err("must refuse");
    assert!(matches!(err, CardError::Unauthorized));

    let missing = Uuid::new_v4();
    let err = service.delete(&missing, &owner).await.expect_err("unknown id");
    assert!(matches!(err, CardError::NotFound));
}

#[tokio::test]
#[ignore = "requires a Postgres instance via DATABASE_URL"]
async fn regenerate_qr_swaps_the_artifact_file() {
    let pool = pool().await;
    let storage = TempDir::new().unwrap();
    let service = service(pool.clone(), &storage);
    let owner = Uuid::new_v4();

    let created = service.create(&input("Qr Holder", vec![]), &owner).await.unwrap();
    let card = extract_card(&created.data);
    let first_path = card.qr_image_path.clone().unwrap();

    let response = service.regenerate_qr(&card.id, &owner, None).await.unwrap();
    let card = extract_card(&response.data);
    let second_path = card.qr_image_path.unwrap();

    assert_ne!(first_path, second_path);
    assert!(!std::path::Path::new(&first_path).exists());
    assert!(std::path::Path::new(&second_path).exists());
}

#[tokio::test]
#[ignore = "requires a Postgres instance via DATABASE_URL"]
async fn delete_removes_rows_and_files() {
    let pool = pool().await;
    let storage = TempDir::new().unwrap();
    let service = service(pool.clone(), &storage);
    let owner = Uuid::new_v4();

    let created = service
        .create(&input("Short Lived", vec![item("name", "X")]), &owner)
        .await
        .unwrap();
    let card = extract_card(&created.data);
    let qr_path = card.qr_image_path.clone().unwrap();

    let response = service.delete(&card.id, &owner).await.unwrap();
    assert_eq!(response.status, 200);

    assert!(Card::find_by_id(card.id, &pool).await.unwrap().is_none());
    assert!(CardItem::find_by_card(&card.id, &pool).await.unwrap().is_empty());
    assert!(!std::path::Path::new(&qr_path).exists());
    assert!(service.load_aggregate(&card.id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires a Postgres instance via DATABASE_URL"]
async fn slug_collision_gets_a_suffix() {
    let pool = pool().await;
    let storage = TempDir::new().unwrap();
    let service = service(pool.clone(), &storage);

    let first = service
        .create(&input("Collision Target", vec![]), &Uuid::new_v4())
        .await
        .unwrap();
    let second = service
        .create(&input("Collision Target", vec![]), &Uuid::new_v4())
        .await
        .unwrap();

    let first = extract_card(&first.data);
    let second = extract_card(&second.data);
    assert_eq!(first.slug, "collision-target");
    assert!(second.slug.starts_with("collision-target-"));
    assert_ne!(first.slug, second.slug);
}
