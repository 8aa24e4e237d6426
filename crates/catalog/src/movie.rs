use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use movierent_core::{ActorId, CategoryId, DomainError, DomainResult, MovieId, entity::Entity};

/// Case-insensitive name equality used for actors and categories.
pub fn names_match(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub name: String,
}

impl Actor {
    pub fn new(name: &str) -> DomainResult<Self> {
        Ok(Self {
            id: ActorId::new(),
            name: required_name(name, "actor name")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

impl Category {
    pub fn new(name: &str) -> DomainResult<Self> {
        Ok(Self {
            id: CategoryId::new(),
            name: required_name(name, "category name")?,
        })
    }
}

fn required_name(raw: &str, what: &str) -> DomainResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(DomainError::validation(format!("{what} cannot be empty")));
    }
    Ok(name.to_string())
}

/// Admin input for creating or revising a movie. Actors and categories are
/// resolved to entities by the caller (find-or-create by name).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieDraft {
    pub title: String,
    pub description: Option<String>,
    pub release_year: Option<i32>,
    pub director: Option<String>,
    pub duration_minutes: Option<i32>,
    pub image_id: Option<String>,
    pub stock_quantity: i32,
}

impl MovieDraft {
    fn validate(&self) -> DomainResult<()> {
        if self.title.trim().is_empty() {
            return Err(DomainError::validation("title cannot be empty"));
        }
        if self.stock_quantity < 0 {
            return Err(DomainError::validation("stock quantity cannot be negative"));
        }
        if matches!(self.duration_minutes, Some(d) if d <= 0) {
            return Err(DomainError::validation("duration must be positive"));
        }
        Ok(())
    }
}

/// Movie catalog entry.
///
/// # Invariants
/// - `title` is never empty.
/// - `stock_quantity` is never negative.
/// - actors and categories hold no duplicate names (case-insensitive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    pub description: Option<String>,
    pub release_year: Option<i32>,
    pub director: Option<String>,
    pub duration_minutes: Option<i32>,
    pub image_id: Option<String>,
    pub actors: Vec<Actor>,
    pub categories: Vec<Category>,
    pub stock_quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Movie {
    pub fn create(
        draft: MovieDraft,
        actors: Vec<Actor>,
        categories: Vec<Category>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        draft.validate()?;
        Ok(Self {
            id: MovieId::new(),
            title: draft.title.trim().to_string(),
            description: draft.description,
            release_year: draft.release_year,
            director: draft.director,
            duration_minutes: draft.duration_minutes,
            image_id: draft.image_id,
            actors: dedup_actors(actors),
            categories: dedup_categories(categories),
            stock_quantity: draft.stock_quantity,
            created_at: now,
            updated_at: now,
        })
    }

    /// Replace the editable fields. `None` for actors or categories keeps the
    /// current set. Returns the previous image id when the revision no longer
    /// points at it, so the caller can delete the file.
    pub fn revise(
        &mut self,
        draft: MovieDraft,
        actors: Option<Vec<Actor>>,
        categories: Option<Vec<Category>>,
        now: DateTime<Utc>,
    ) -> DomainResult<Option<String>> {
        draft.validate()?;

        let replaced_image = match &self.image_id {
            Some(old) if draft.image_id.as_ref() != Some(old) => Some(old.clone()),
            _ => None,
        };

        self.title = draft.title.trim().to_string();
        self.description = draft.description;
        self.release_year = draft.release_year;
        self.director = draft.director;
        self.duration_minutes = draft.duration_minutes;
        self.image_id = draft.image_id;
        if let Some(actors) = actors {
            self.actors = dedup_actors(actors);
        }
        if let Some(categories) = categories {
            self.categories = dedup_categories(categories);
        }
        self.stock_quantity = draft.stock_quantity;
        self.updated_at = now;

        Ok(replaced_image)
    }

    pub fn is_available(&self) -> bool {
        self.stock_quantity > 0
    }

    pub fn adjust_stock(&mut self, delta: i32) -> DomainResult<()> {
        let new_stock = self
            .stock_quantity
            .checked_add(delta)
            .ok_or_else(|| DomainError::invariant("stock overflow"))?;
        if new_stock < 0 {
            return Err(DomainError::invariant("stock cannot go negative"));
        }
        self.stock_quantity = new_stock;
        Ok(())
    }

    pub fn has_category(&self, name: &str) -> bool {
        self.categories.iter().any(|c| names_match(&c.name, name))
    }
}

impl Entity for Movie {
    type Id = MovieId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

fn dedup_actors(actors: Vec<Actor>) -> Vec<Actor> {
    let mut out: Vec<Actor> = Vec::with_capacity(actors.len());
    for a in actors {
        if !out.iter().any(|x| names_match(&x.name, &a.name)) {
            out.push(a);
        }
    }
    out
}

fn dedup_categories(categories: Vec<Category>) -> Vec<Category> {
    let mut out: Vec<Category> = Vec::with_capacity(categories.len());
    for c in categories {
        if !out.iter().any(|x| names_match(&x.name, &c.name)) {
            out.push(c);
        }
    }
    out
}
