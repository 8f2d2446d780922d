//! Animal records and the rules for merging uploaded images into them.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Species recorded on an image when neither the classifier nor the
/// uploader supplied one.
pub const UNKNOWN_SPECIES: &str = "Unknown Species";

/// Description recorded on an image when the classifier returned none.
pub const NO_DESCRIPTION: &str = "No description available.";

/// Longest accepted animal name or location, in characters.
pub const MAX_FIELD_LEN: usize = 255;

/// Reject a name or location that does not fit its column.
pub fn check_field_len(field: &str, value: &str) -> AppResult<()> {
    if value.chars().count() > MAX_FIELD_LEN {
        return Err(AppError::InvalidInput(format!(
            "{} must be at most {} characters",
            field, MAX_FIELD_LEN
        )));
    }
    Ok(())
}

/// Animal category. The set is closed; anything else is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Category {
    Arthropods,
    Mollusks,
    Worms,
    Cnidarians,
    Echinoderms,
    Sponges,
    Fish,
    Birds,
    Reptiles,
    Amphibians,
    Mammals,
}

impl Category {
    /// All categories in display order.
    pub const ALL: [Category; 11] = [
        Self::Arthropods,
        Self::Mollusks,
        Self::Worms,
        Self::Cnidarians,
        Self::Echinoderms,
        Self::Sponges,
        Self::Fish,
        Self::Birds,
        Self::Reptiles,
        Self::Amphibians,
        Self::Mammals,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Arthropods => "Arthropods",
            Self::Mollusks => "Mollusks",
            Self::Worms => "Worms",
            Self::Cnidarians => "Cnidarians",
            Self::Echinoderms => "Echinoderms",
            Self::Sponges => "Sponges",
            Self::Fish => "Fish",
            Self::Birds => "Birds",
            Self::Reptiles => "Reptiles",
            Self::Amphibians => "Amphibians",
            Self::Mammals => "Mammals",
        }
    }

    /// Parse a category name, ignoring case and surrounding whitespace.
    pub fn parse(s: &str) -> Option<Self> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One uploaded image and what the classifier said about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ImageDetail {
    /// Public URL of the stored image.
    pub path: String,
    pub species: String,
    pub description: String,
}

/// Classifier output for a single image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Classification {
    pub species: String,
    pub category: Category,
    pub description: String,
}

/// A persisted animal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Animal {
    pub id: Uuid,
    pub name: String,
    /// Scientific name. May be empty until an upload fills it in.
    pub species: String,
    pub description: String,
    pub category: Category,
    pub location: String,
    pub image_details: Vec<ImageDetail>,
    /// Raw image URLs, kept parallel to `image_details`.
    pub images: Vec<String>,
}

/// The result of one successful upload batch, ready to merge into a record.
#[derive(Debug, Clone)]
pub struct AnimalUpload {
    pub name: String,
    pub location: String,
    pub species_hint: Option<String>,
    /// Classification of the first image in the batch.
    pub first: Classification,
    /// One entry per image, in upload order.
    pub image_details: Vec<ImageDetail>,
}

impl AnimalUpload {
    /// Species to record at the animal level: the uploader's hint wins.
    fn record_species(&self) -> String {
        self.species_hint
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.first.species.clone())
    }
}

impl Animal {
    /// Build a new record from the first upload for a name.
    pub fn create_from(upload: &AnimalUpload, id: Uuid) -> Self {
        Self {
            id,
            name: upload.name.clone(),
            species: upload.record_species(),
            description: upload.first.description.clone(),
            category: upload.first.category,
            location: upload.location.clone(),
            image_details: upload.image_details.clone(),
            images: upload
                .image_details
                .iter()
                .map(|d| d.path.clone())
                .collect(),
        }
    }

    /// Append an upload to an existing record.
    ///
    /// Images are appended in order; `species` and `description` are only
    /// filled when empty. `category`, `location` and `name` never change.
    pub fn absorb(&mut self, upload: &AnimalUpload) {
        for detail in &upload.image_details {
            self.images.push(detail.path.clone());
            self.image_details.push(detail.clone());
        }

        if self.species.trim().is_empty() {
            self.species = upload.record_species();
        }

        if self.description.trim().is_empty() {
            self.description = upload.first.description.clone();
        }
    }

    /// Whether `images` mirrors `image_details` entry for entry.
    pub fn images_consistent(&self) -> bool {
        self.images.len() == self.image_details.len()
            && self
                .images
                .iter()
                .zip(&self.image_details)
                .all(|(image, detail)| *image == detail.path)
    }
}

/// Filters for listing animals.
#[derive(Debug, Clone, Default)]
pub struct AnimalFilter {
    pub category: Option<Category>,
    /// Scientific name, matched case-insensitively.
    pub species: Option<String>,
}

impl AnimalFilter {
    pub fn matches(&self, animal: &Animal) -> bool {
        self.category.is_none_or(|c| animal.category == c)
            && self
                .species
                .as_deref()
                .is_none_or(|s| animal.species.trim().eq_ignore_ascii_case(s.trim()))
    }
}

/// Administrative edit of an animal's descriptive fields.
///
/// Category and images are deliberately absent.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct AnimalPatch {
    pub name: Option<String>,
    pub species: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
}

impl AnimalPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.species.is_none()
            && self.description.is_none()
            && self.location.is_none()
    }

    /// Check edited fields against their column limits.
    pub fn validate(&self) -> AppResult<()> {
        if let Some(ref name) = self.name {
            if name.trim().is_empty() {
                return Err(AppError::InvalidInput("Animal name cannot be empty".to_string()));
            }
            check_field_len("name", name.trim())?;
        }
        if let Some(ref location) = self.location {
            check_field_len("location", location.trim())?;
        }
        Ok(())
    }

    /// Apply the patch in place.
    pub fn apply(&self, animal: &mut Animal) {
        if let Some(ref name) = self.name {
            animal.name = name.trim().to_string();
        }
        if let Some(ref species) = self.species {
            animal.species = species.trim().to_string();
        }
        if let Some(ref description) = self.description {
            animal.description = description.clone();
        }
        if let Some(ref location) = self.location {
            animal.location = location.trim().to_string();
        }
    }
}

/// Number of animals in a category.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CategoryCount {
    pub category: Category,
    pub count: u64,
}

/// One image in the home page slideshow.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SlideshowImage {
    pub path: String,
    pub name: String,
    pub id: Uuid,
    pub category: Category,
}
