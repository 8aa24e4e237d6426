use serde::{Deserialize, Serialize};

use crate::{Movie, names_match};

/// Movie search criteria. Every field is optional; set fields are combined
/// with AND.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovieFilter {
    /// Case-insensitive category name.
    pub category: Option<String>,
    /// Exact release year.
    pub year: Option<i32>,
    /// Minimum average rating. Unrated movies never match.
    pub min_rating: Option<f64>,
    /// Case-insensitive substring of title, description or director.
    pub search: Option<String>,
}

impl MovieFilter {
    pub fn is_empty(&self) -> bool {
        self.category.is_none() && self.year.is_none() && self.min_rating.is_none() && self.search.is_none()
    }

    /// `average` is the movie's current average rating, if it has any.
    pub fn matches(&self, movie: &Movie, average: Option<f64>) -> bool {
        if let Some(category) = self.category.as_deref().filter(|c| !c.trim().is_empty()) {
            if !movie.categories.iter().any(|c| names_match(&c.name, category)) {
                return false;
            }
        }

        if let Some(year) = self.year {
            if movie.release_year != Some(year) {
                return false;
            }
        }

        if let Some(min) = self.min_rating {
            match average {
                Some(avg) if avg >= min => {}
                _ => return false,
            }
        }

        if let Some(needle) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let needle = needle.to_lowercase();
            let hit = |field: Option<&str>| field.is_some_and(|f| f.to_lowercase().contains(&needle));
            if !(hit(Some(&movie.title)) || hit(movie.description.as_deref()) || hit(movie.director.as_deref())) {
                return false;
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::{Category, MovieDraft};

    fn movie(title: &str, year: i32, director: &str, category: &str) -> Movie {
        Movie::create(
            MovieDraft {
                title: title.into(),
                description: Some(format!("{title} description")),
                release_year: Some(year),
                director: Some(director.into()),
                duration_minutes: Some(120),
                image_id: None,
                stock_quantity: 1,
            },
            vec![],
            vec![Category::new(category).unwrap()],
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn empty_filter_matches_everything() {
        let f = MovieFilter::default();
        assert!(f.is_empty());
        assert!(f.matches(&movie("Inception", 2010, "Christopher Nolan", "Sci-Fi"), None));
    }

    #[test]
    fn criteria_combine_with_and() {
        let m = movie("Inception", 2010, "Christopher Nolan", "Sci-Fi");

        let f = MovieFilter {
            category: Some("sci-fi".into()),
            year: Some(2010),
            search: Some("NOLAN".into()),
            ..Default::default()
        };
        assert!(f.matches(&m, None));

        let wrong_year = MovieFilter { year: Some(2011), ..f.clone() };
        assert!(!wrong_year.matches(&m, None));

        let partial_category = MovieFilter { category: Some("Sci".into()), ..Default::default() };
        assert!(!partial_category.matches(&m, None));
    }

    #[test]
    fn min_rating_excludes_unrated() {
        let m = movie("Up", 2009, "Pete Docter", "Animation");
        let f = MovieFilter { min_rating: Some(3.0), ..Default::default() };

        assert!(!f.matches(&m, None));
        assert!(!f.matches(&m, Some(2.5)));
        assert!(f.matches(&m, Some(3.0)));
    }
}
