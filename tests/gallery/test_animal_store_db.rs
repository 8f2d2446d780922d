//! `AnimalStore` against PostgreSQL: row-locked append, unique-name retry and
//! JSONB round-trips. Skipped when no database is configured.

use futures_util::future::join_all;
use wildlife_gallery_lib::db::AnimalStore;
use wildlife_gallery_lib::models::{
    AnimalFilter, AnimalPatch, AnimalUpload, Category, Classification, ImageDetail,
};

use super::test_helpers::*;

fn upload(name: &str, category: Category, hint: Option<&str>, paths: &[&str]) -> AnimalUpload {
    AnimalUpload {
        name: name.to_string(),
        location: "Boreal Forest".to_string(),
        species_hint: hint.map(str::to_string),
        first: Classification {
            species: "Vulpes vulpes".to_string(),
            category,
            description: "A cunning forest dweller.".to_string(),
        },
        image_details: paths
            .iter()
            .map(|p| ImageDetail {
                path: format!("https://cdn.test/animals/{}", p),
                species: "Vulpes vulpes".to_string(),
                description: format!("About {}", p),
            })
            .collect(),
    }
}

#[actix_rt::test]
async fn test_append_upload_creates_then_appends() {
    let Some(pool) = create_test_pool().await else {
        return;
    };
    let name = unique_name("Red Fox");

    let created = pool
        .append_upload(&upload(&name, Category::Mammals, None, &["a.jpg", "b.jpg"]))
        .await
        .unwrap();
    assert!(created.created);

    let mut second = upload(&name, Category::Birds, None, &["c.jpg"]);
    second.location = "Tundra".to_string();
    let appended = pool.append_upload(&second).await.unwrap();
    assert!(!appended.created);
    assert_eq!(appended.animal.id, created.animal.id);

    let stored = pool.find_by_id(created.animal.id).await.unwrap().unwrap();
    assert_eq!(stored, appended.animal);
    assert_eq!(stored.images.len(), 3);
    assert!(stored.images[2].ends_with("c.jpg"));
    assert_eq!(stored.image_details[0].description, "About a.jpg");
    assert_eq!(stored.category, Category::Mammals);
    assert_eq!(stored.location, "Boreal Forest");
    assert!(stored.images_consistent());

    assert_eq!(pool.find_by_name(&name).await.unwrap(), Some(stored));
    assert!(pool.delete(created.animal.id).await.unwrap());
}

#[actix_rt::test]
async fn test_append_upload_backfills_blank_fields() {
    let Some(pool) = create_test_pool().await else {
        return;
    };
    let name = unique_name("Clownfish");

    let mut blank = upload(&name, Category::Fish, None, &["c1.jpg"]);
    blank.first.species = String::new();
    blank.first.description = String::new();
    let created = pool.append_upload(&blank).await.unwrap();
    assert_eq!(created.animal.species, "");

    pool.append_upload(&upload(&name, Category::Fish, Some("Amphiprion ocellaris"), &["c2.jpg"]))
        .await
        .unwrap();

    let fish = pool.find_by_id(created.animal.id).await.unwrap().unwrap();
    assert_eq!(fish.species, "Amphiprion ocellaris");
    assert_eq!(fish.description, "A cunning forest dweller.");
    pool.delete(fish.id).await.unwrap();
}

/// Several first uploads for one name race; all land in a single row.
#[actix_rt::test]
async fn test_concurrent_first_uploads_merge_into_one_row() {
    let Some(pool) = create_test_pool().await else {
        return;
    };
    let name = unique_name("Grey Wolf");
    let batches: Vec<AnimalUpload> = (0..4)
        .map(|i| upload(&name, Category::Mammals, None, &[&format!("wolf-{}.jpg", i)]))
        .collect();

    let results = join_all(batches.iter().map(|b| pool.append_upload(b))).await;
    let results: Vec<_> = results.into_iter().map(Result::unwrap).collect();

    assert_eq!(results.iter().filter(|r| r.created).count(), 1);
    let id = results[0].animal.id;
    assert!(results.iter().all(|r| r.animal.id == id));

    let wolf = pool.find_by_id(id).await.unwrap().unwrap();
    assert_eq!(wolf.images.len(), 4);
    assert!(wolf.images_consistent());
    for i in 0..4 {
        let suffix = format!("wolf-{}.jpg", i);
        assert!(wolf.images.iter().any(|u| u.ends_with(&suffix)));
    }
    pool.delete(id).await.unwrap();
}

#[actix_rt::test]
async fn test_list_by_species_and_update() {
    let Some(pool) = create_test_pool().await else {
        return;
    };
    let name = unique_name("Arctic Fox");
    let species = unique_name("Vulpes lagopus");
    let created = pool
        .append_upload(&upload(&name, Category::Mammals, Some(&species), &["x.jpg"]))
        .await
        .unwrap();

    let filter = AnimalFilter {
        category: Some(Category::Mammals),
        species: Some(species.to_uppercase()),
    };
    let found = pool.list(&filter).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, name);

    let patch = AnimalPatch {
        location: Some("Svalbard".to_string()),
        ..Default::default()
    };
    let updated = pool.update(created.animal.id, &patch).await.unwrap().unwrap();
    assert_eq!(updated.location, "Svalbard");
    assert_eq!(updated.category, Category::Mammals);

    pool.delete(created.animal.id).await.unwrap();
    assert!(pool.find_by_id(created.animal.id).await.unwrap().is_none());
}
