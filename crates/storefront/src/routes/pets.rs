//! Pet listing route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::Redirect,
};
use chrono::Datelike;
use pawmart_core::{Pet, PetId, PetType};
use serde::Deserialize;
use tracing::instrument;

use crate::error::AppError;
use crate::filters;
use crate::state::AppState;

/// Pet card display data for templates.
#[derive(Debug, Clone)]
pub struct PetCardView {
    pub id: PetId,
    pub name: String,
    pub breed: String,
    pub age: Option<String>,
    pub price: String,
    pub image_url: String,
}

impl PetCardView {
    fn new(pet: &Pet, image_url: String, current_year: i32) -> Self {
        Self {
            id: pet.id,
            name: pet.name.clone(),
            breed: pet.breed.clone(),
            age: pet.birth_year.map(|year| format_age(current_year.saturating_sub(year))),
            price: pet.price.to_string(),
            image_url,
        }
    }
}

fn format_age(years: i32) -> String {
    match years {
        ..=0 => "Under a year".to_string(),
        1 => "1 year".to_string(),
        n => format!("{n} years"),
    }
}

/// Pet type filter link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterLink {
    pub label: String,
    pub href: String,
    pub active: bool,
}

fn filter_links(selected: Option<PetType>) -> Vec<FilterLink> {
    let all = FilterLink {
        label: "All".to_string(),
        href: "/pets".to_string(),
        active: selected.is_none(),
    };

    std::iter::once(all)
        .chain(PetType::ALL.into_iter().map(|pet_type| FilterLink {
            label: plural_label(pet_type),
            href: format!("/pets?type={pet_type}"),
            active: selected == Some(pet_type),
        }))
        .collect()
}

fn plural_label(pet_type: PetType) -> String {
    match pet_type {
        PetType::Dog => "Dogs".to_string(),
        PetType::Cat => "Cats".to_string(),
    }
}

/// Listing query parameters.
#[derive(Debug, Deserialize)]
pub struct ListingQuery {
    #[serde(rename = "type")]
    pub pet_type: Option<String>,
}

/// Pet listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "pets/index.html")]
pub struct PetsIndexTemplate {
    pub heading: String,
    pub filters: Vec<FilterLink>,
    pub pets: Vec<PetCardView>,
}

/// Display the pet listing, optionally filtered by type.
///
/// Images use provisional URLs; a card whose image fails to load asks
/// [`image_fallback`] for a better one.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ListingQuery>,
) -> Result<PetsIndexTemplate, AppError> {
    let selected = query
        .pet_type
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(str::parse::<PetType>)
        .transpose()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let pets = state.api().list_pets(selected).await?;
    let current_year = chrono::Utc::now().year();

    let mut cards = Vec::with_capacity(pets.len());
    for pet in &pets {
        let url = state.images().provisional(pet).await;
        cards.push(PetCardView::new(pet, url, current_year));
    }

    Ok(PetsIndexTemplate {
        heading: selected.map_or_else(|| "All pets".to_string(), plural_label),
        filters: filter_links(selected),
        pets: cards,
    })
}

/// Redirect to the best image for a pet whose current image failed to load.
///
/// Used as the `onerror` target of pet images. Probes alternate extensions
/// and ends at the placeholder.
#[instrument(skip(state))]
pub async fn image_fallback(
    State(state): State<AppState>,
    Path(pet_id): Path<PetId>,
) -> Result<Redirect, AppError> {
    let pet = state.api().get_pet(pet_id).await?;
    let url = state.images().report_failure(&pet).await;
    Ok(Redirect::temporary(&url))
}
