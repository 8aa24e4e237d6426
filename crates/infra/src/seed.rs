//! Demo catalog, accounts, ratings and rentals for local runs.
//!
//! Runs only against an empty catalog, so restarting the API never
//! duplicates data.

use chrono::{Duration, Utc};
use tracing::info;

use movierent_accounts::{RegisterUser, Role, User, hash_password};
use movierent_catalog::{Movie, MovieDraft, RatingScore};
use movierent_rentals::{Rental, RentalCode, RentalStatus};

use crate::store::{CatalogStore, RatingStore, RentalStore, Store, StoreError, StoreResult, UserStore};

/// Password shared by every demo account.
pub const DEMO_PASSWORD: &str = "Aa123456";

const CATEGORIES: &[&str] = &[
    "Action", "Comedy", "Drama", "Sci-Fi", "Horror", "Romance", "Thriller", "Documentary", "Animation",
    "Adventure", "Fantasy", "Crime", "Mystery", "Biography", "Family", "History", "War", "Music", "Western",
    "Sport",
];

struct DemoMovie {
    title: &'static str,
    description: &'static str,
    year: i32,
    director: &'static str,
    minutes: i32,
    stock: i32,
    actors: &'static [&'static str],
    categories: &'static [&'static str],
}

const MOVIES: &[DemoMovie] = &[
    DemoMovie {
        title: "Inception",
        description: "A thief who steals corporate secrets through dream-sharing technology is given the inverse task of planting an idea into the mind of a C.E.O.",
        year: 2010,
        director: "Christopher Nolan",
        minutes: 148,
        stock: 10,
        actors: &["Leonardo DiCaprio"],
        categories: &["Action", "Sci-Fi", "Thriller"],
    },
    DemoMovie {
        title: "The Avengers",
        description: "Earth's mightiest heroes must come together and learn to fight as a team.",
        year: 2012,
        director: "Joss Whedon",
        minutes: 143,
        stock: 15,
        actors: &["Robert Downey Jr.", "Scarlett Johansson", "Chris Evans"],
        categories: &["Action", "Sci-Fi", "Adventure"],
    },
    DemoMovie {
        title: "Forrest Gump",
        description: "The presidencies of Kennedy and Johnson, the Vietnam War, the Watergate scandal and other historical events unfold from the perspective of an Alabama man with an IQ of 75.",
        year: 1994,
        director: "Robert Zemeckis",
        minutes: 142,
        stock: 8,
        actors: &["Tom Hanks"],
        categories: &["Drama", "Romance"],
    },
    DemoMovie {
        title: "The Shawshank Redemption",
        description: "Two imprisoned men bond over a number of years, finding solace and eventual redemption through acts of common decency.",
        year: 1994,
        director: "Frank Darabont",
        minutes: 142,
        stock: 7,
        actors: &["Denzel Washington"],
        categories: &["Drama"],
    },
    DemoMovie {
        title: "The Dark Knight",
        description: "When the menace known as the Joker wreaks havoc and chaos on the people of Gotham, Batman must accept one of the greatest psychological and physical tests of his ability to fight injustice.",
        year: 2008,
        director: "Christopher Nolan",
        minutes: 152,
        stock: 12,
        actors: &["Brad Pitt", "Johnny Depp"],
        categories: &["Action", "Crime", "Drama"],
    },
    DemoMovie {
        title: "Pulp Fiction",
        description: "The lives of two mob hitmen, a boxer, a gangster and his wife, and a pair of diner bandits intertwine in four tales of violence and redemption.",
        year: 1994,
        director: "Quentin Tarantino",
        minutes: 154,
        stock: 6,
        actors: &["Brad Pitt", "Scarlett Johansson"],
        categories: &["Crime", "Drama"],
    },
    DemoMovie {
        title: "The Godfather",
        description: "The aging patriarch of an organized crime dynasty transfers control of his clandestine empire to his reluctant son.",
        year: 1972,
        director: "Francis Ford Coppola",
        minutes: 175,
        stock: 5,
        actors: &["Denzel Washington", "Robert Downey Jr."],
        categories: &["Crime", "Drama"],
    },
    DemoMovie {
        title: "Fight Club",
        description: "An insomniac office worker and a devil-may-care soapmaker form an underground fight club that evolves into something much, much more.",
        year: 1999,
        director: "David Fincher",
        minutes: 139,
        stock: 9,
        actors: &["Brad Pitt"],
        categories: &["Drama", "Thriller"],
    },
    DemoMovie {
        title: "The Matrix",
        description: "A computer hacker learns from mysterious rebels about the true nature of his reality and his role in the war against its controllers.",
        year: 1999,
        director: "The Wachowskis",
        minutes: 136,
        stock: 14,
        actors: &["Leonardo DiCaprio", "Meryl Streep"],
        categories: &["Action", "Sci-Fi"],
    },
    DemoMovie {
        title: "Titanic",
        description: "A seventeen-year-old aristocrat falls in love with a kind but poor artist aboard the luxurious, ill-fated R.M.S. Titanic.",
        year: 1997,
        director: "James Cameron",
        minutes: 194,
        stock: 8,
        actors: &["Leonardo DiCaprio", "Meryl Streep"],
        categories: &["Drama", "Romance"],
    },
    DemoMovie {
        title: "The Lord of the Rings: The Fellowship of the Ring",
        description: "A meek Hobbit from the Shire and eight companions set out on a journey to destroy the powerful One Ring and save Middle-earth from the Dark Lord Sauron.",
        year: 2001,
        director: "Peter Jackson",
        minutes: 178,
        stock: 10,
        actors: &["Chris Hemsworth", "Margot Robbie"],
        categories: &["Adventure", "Drama", "Fantasy"],
    },
    DemoMovie {
        title: "La La Land",
        description: "While navigating their careers in Los Angeles, a pianist and an actress fall in love while attempting to reconcile their aspirations for the future.",
        year: 2016,
        director: "Damien Chazelle",
        minutes: 128,
        stock: 12,
        actors: &["Emma Stone", "Jennifer Lawrence"],
        categories: &["Comedy", "Drama", "Romance"],
    },
];

/// (email, full name, phone, address, admin)
const USERS: &[(&str, &str, &str, &str, bool)] = &[
    ("john@example.com", "John Doe", "555-123-4567", "123 Main St, Springfield, IL 62701", false),
    ("jane@example.com", "Jane Smith", "555-987-6543", "456 Oak Ave, Springfield, IL 62702", false),
    ("admin@example.com", "Admin User", "555-555-5555", "789 Admin Blvd, Springfield, IL 62703", true),
    ("michael@example.com", "Michael Johnson", "555-222-3333", "890 Pine Rd, Springfield, IL 62704", false),
    ("sarah@example.com", "Sarah Williams", "555-444-5555", "567 Maple Dr, Springfield, IL 62705", false),
    ("manager@example.com", "Manager User", "555-777-8888", "123 Manager St, Springfield, IL 62712", true),
];

/// (email, movie title, score)
const RATINGS: &[(&str, &str, i32)] = &[
    ("john@example.com", "Inception", 5),
    ("jane@example.com", "Inception", 4),
    ("john@example.com", "The Avengers", 4),
    ("jane@example.com", "Forrest Gump", 5),
    ("john@example.com", "The Dark Knight", 5),
    ("john@example.com", "Pulp Fiction", 4),
    ("michael@example.com", "The Matrix", 3),
    ("sarah@example.com", "Titanic", 4),
];

/// (email, movie title, code, days ago rented, final status)
const RENTALS: &[(&str, &str, &str, i64, RentalStatus)] = &[
    ("john@example.com", "Inception", "A7B23C", 5, RentalStatus::Taken),
    ("john@example.com", "The Avengers", "XY89Z5", 15, RentalStatus::Returned),
    ("john@example.com", "Forrest Gump", "QW3RT7", 3, RentalStatus::Taken),
    ("jane@example.com", "The Matrix", "JN45KL", 1, RentalStatus::Ordered),
    ("michael@example.com", "Fight Club", "MK90PQ", 20, RentalStatus::Cancelled),
];

/// Populate an empty store. Returns `false` when the catalog already had
/// movies and nothing was written.
///
/// `bcrypt_cost` is the work factor for the demo password hash.
pub async fn seed_demo_data(store: &dyn Store, bcrypt_cost: u32) -> StoreResult<bool> {
    if store.count_movies().await? > 0 {
        info!("catalog already contains data, skipping demo seed");
        return Ok(false);
    }

    let now = Utc::now();

    for name in CATEGORIES {
        store.find_or_create_category(name).await?;
    }

    let mut movies: Vec<Movie> = Vec::with_capacity(MOVIES.len());
    for demo in MOVIES {
        let mut actors = Vec::with_capacity(demo.actors.len());
        for name in demo.actors {
            actors.push(store.find_or_create_actor(name).await?);
        }
        let mut categories = Vec::with_capacity(demo.categories.len());
        for name in demo.categories {
            categories.push(store.find_or_create_category(name).await?);
        }

        let movie = Movie::create(
            MovieDraft {
                title: demo.title.to_string(),
                description: Some(demo.description.to_string()),
                release_year: Some(demo.year),
                director: Some(demo.director.to_string()),
                duration_minutes: Some(demo.minutes),
                image_id: None,
                stock_quantity: demo.stock,
            },
            actors,
            categories,
            now,
        )
        .map_err(seed_error)?;
        movies.push(store.insert_movie(movie).await?);
    }

    let password_hash = hash_password(DEMO_PASSWORD, bcrypt_cost).map_err(|e| StoreError::Backend(e.to_string()))?;
    let mut users: Vec<User> = Vec::with_capacity(USERS.len());
    for (email, name, phone, address, admin) in USERS {
        let user = User::register(
            RegisterUser {
                email: email.to_string(),
                full_name: name.to_string(),
                phone_number: Some(phone.to_string()),
                address: Some(address.to_string()),
            },
            password_hash.clone(),
            now,
        )
        .map_err(seed_error)?;
        let user = if *admin { user.with_role(Role::admin()) } else { user };
        users.push(store.insert_user(user).await?);
    }

    let user = |email: &str| users.iter().find(|u| u.email == email).ok_or(StoreError::NotFound("user"));
    let movie = |title: &str| movies.iter().find(|m| m.title == title).ok_or(StoreError::NotFound("movie"));

    for (email, title, score) in RATINGS {
        let score = RatingScore::new(*score).map_err(seed_error)?;
        store.upsert_rating(user(*email)?.id, movie(*title)?.id, score, now).await?;
    }

    for (email, title, code, days_ago, status) in RENTALS {
        let rented_at = now - Duration::days(*days_ago);
        let mut rental = Rental::order(
            user(*email)?.id,
            movie(*title)?.id,
            RentalCode::parse(code).map_err(seed_error)?,
            Some(rented_at),
            None,
            rented_at,
        )
        .map_err(seed_error)?;
        rental = store.create_rental(rental).await?;

        // Walk the state machine so stock stays consistent with status.
        if matches!(status, RentalStatus::Taken | RentalStatus::Returned) {
            let effect = rental.take(now).map_err(seed_error)?;
            rental = store.apply_transition(&rental, RentalStatus::Ordered, effect).await?;
        }
        match status {
            RentalStatus::Returned => {
                let effect = rental.mark_returned(now).map_err(seed_error)?;
                store.apply_transition(&rental, RentalStatus::Taken, effect).await?;
            }
            RentalStatus::Cancelled => {
                let effect = rental.cancel(now).map_err(seed_error)?;
                store.apply_transition(&rental, RentalStatus::Ordered, effect).await?;
            }
            RentalStatus::Ordered | RentalStatus::Taken => {}
        }
    }

    info!(
        categories = CATEGORIES.len(),
        movies = movies.len(),
        users = users.len(),
        ratings = RATINGS.len(),
        rentals = RENTALS.len(),
        "demo data seeded"
    );
    Ok(true)
}

fn seed_error(err: movierent_core::DomainError) -> StoreError {
    StoreError::Backend(format!("invalid demo data: {err}"))
}

#[cfg(test)]
mod tests {
    use movierent_accounts::verify_password;

    use super::*;
    use crate::InMemoryStore;
    use crate::store::RentalQuery;

    #[tokio::test]
    async fn seeds_once_with_consistent_stock() {
        let store = InMemoryStore::new();
        assert!(seed_demo_data(&store, 4).await.unwrap());
        assert!(!seed_demo_data(&store, 4).await.unwrap());

        let movies = store.list_movies().await.unwrap();
        assert_eq!(movies.len(), MOVIES.len());

        // Inception: 10 copies, one TAKEN rental.
        let inception = movies.iter().find(|m| m.title == "Inception").unwrap();
        assert_eq!(inception.stock_quantity, 9);
        // The Avengers: rental returned, stock restored.
        let avengers = movies.iter().find(|m| m.title == "The Avengers").unwrap();
        assert_eq!(avengers.stock_quantity, 15);
        // Fight Club: ORDERED then cancelled keeps the copy out.
        let fight_club = movies.iter().find(|m| m.title == "Fight Club").unwrap();
        assert_eq!(fight_club.stock_quantity, 8);

        let admin = store.find_user_by_email("admin@example.com").await.unwrap().unwrap();
        assert!(admin.is_admin());
        assert!(verify_password(DEMO_PASSWORD, &admin.password_hash));

        assert_eq!(store.list_categories().await.unwrap().len(), CATEGORIES.len());
        assert_eq!(
            store.list_rentals(RentalQuery::default()).await.unwrap().len(),
            RENTALS.len()
        );
    }
}
