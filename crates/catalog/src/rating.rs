use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use movierent_core::{DomainError, DomainResult, MovieId, RatingId, UserId, entity::Entity, value_object::ValueObject};

/// A 1..=5 star score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct RatingScore(u8);

impl RatingScore {
    pub const MIN: i32 = 1;
    pub const MAX: i32 = 5;

    pub fn new(value: i32) -> DomainResult<Self> {
        if !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(DomainError::validation(format!(
                "rating must be between {} and {}",
                Self::MIN,
                Self::MAX
            )));
        }
        Ok(Self(value as u8))
    }

    pub fn value(self) -> i32 {
        i32::from(self.0)
    }
}

impl ValueObject for RatingScore {}

impl TryFrom<i32> for RatingScore {
    type Error = DomainError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RatingScore> for i32 {
    fn from(value: RatingScore) -> Self {
        value.value()
    }
}

/// One user's rating of one movie. A user holds at most one rating per movie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating {
    pub id: RatingId,
    pub user_id: UserId,
    pub movie_id: MovieId,
    pub score: RatingScore,
    pub created_at: DateTime<Utc>,
}

impl Rating {
    pub fn new(user_id: UserId, movie_id: MovieId, score: RatingScore, now: DateTime<Utc>) -> Self {
        Self {
            id: RatingId::new(),
            user_id,
            movie_id,
            score,
            created_at: now,
        }
    }

    /// Re-rating keeps identity and creation time.
    pub fn rescore(&mut self, score: RatingScore) {
        self.score = score;
    }
}

impl Entity for Rating {
    type Id = RatingId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Arithmetic mean of the scores, `None` when there are none.
pub fn average_rating(scores: &[RatingScore]) -> Option<f64> {
    if scores.is_empty() {
        return None;
    }
    let sum: i64 = scores.iter().map(|s| i64::from(s.value())).sum();
    Some(sum as f64 / scores.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn score_bounds() {
        assert!(RatingScore::new(0).is_err());
        assert!(RatingScore::new(6).is_err());
        assert_eq!(RatingScore::new(5).unwrap().value(), 5);
    }

    #[test]
    fn score_deserialization_is_validated() {
        assert!(serde_json::from_str::<RatingScore>("4").is_ok());
        assert!(serde_json::from_str::<RatingScore>("9").is_err());
    }

    #[test]
    fn rescore_keeps_identity() {
        let mut r = Rating::new(UserId::new(), MovieId::new(), RatingScore::new(2).unwrap(), Utc::now());
        let (id, created) = (r.id, r.created_at);
        r.rescore(RatingScore::new(5).unwrap());
        assert_eq!((r.id, r.created_at, r.score.value()), (id, created, 5));
    }

    #[test]
    fn average_of_nothing_is_none() {
        assert_eq!(average_rating(&[]), None);
        let scores = [4, 5].map(|v| RatingScore::new(v).unwrap());
        assert_eq!(average_rating(&scores), Some(4.5));
    }

    proptest! {
        #[test]
        fn average_stays_within_bounds(values in proptest::collection::vec(1i32..=5, 1..50)) {
            let scores: Vec<_> = values.iter().map(|v| RatingScore::new(*v).unwrap()).collect();
            let avg = average_rating(&scores).unwrap();
            prop_assert!((1.0..=5.0).contains(&avg));
        }
    }
}
