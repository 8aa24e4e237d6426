use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use movierent_core::{DomainError, DomainResult, MovieId, RentalId, UserId, entity::Entity};

use crate::RentalCode;

/// Loan period used when an order does not name a return date.
pub const DEFAULT_RENTAL_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RentalStatus {
    Ordered,
    Taken,
    Returned,
    Cancelled,
}

impl RentalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RentalStatus::Ordered => "ORDERED",
            RentalStatus::Taken => "TAKEN",
            RentalStatus::Returned => "RETURNED",
            RentalStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RentalStatus::Returned | RentalStatus::Cancelled)
    }
}

impl core::fmt::Display for RentalStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for RentalStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ORDERED" => Ok(RentalStatus::Ordered),
            "TAKEN" => Ok(RentalStatus::Taken),
            "RETURNED" => Ok(RentalStatus::Returned),
            "CANCELLED" => Ok(RentalStatus::Cancelled),
            other => Err(DomainError::validation(format!("unknown rental status: {other}"))),
        }
    }
}

/// Signed change to the movie's stock that must be applied together with a
/// status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockEffect(pub i32);

impl StockEffect {
    pub const NONE: StockEffect = StockEffect(0);
    pub const RESTOCK: StockEffect = StockEffect(1);

    pub fn delta(self) -> i32 {
        self.0
    }
}

/// A user's rental of one copy of a movie.
///
/// Creating the rental takes one copy out of stock (the store does that in
/// the same transaction as the insert). Transitions report the stock effect
/// the store must apply alongside the new status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rental {
    pub id: RentalId,
    pub user_id: UserId,
    pub movie_id: MovieId,
    pub code: RentalCode,
    pub rental_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub status: RentalStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Rental {
    pub fn order(
        user_id: UserId,
        movie_id: MovieId,
        code: RentalCode,
        rental_date: Option<DateTime<Utc>>,
        return_date: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let rental_date = rental_date.unwrap_or(now);
        let return_date = return_date.unwrap_or(rental_date + Duration::days(DEFAULT_RENTAL_DAYS));
        if return_date < rental_date {
            return Err(DomainError::validation("return date cannot be before rental date"));
        }

        Ok(Self {
            id: RentalId::new(),
            user_id,
            movie_id,
            code,
            rental_date,
            return_date: Some(return_date),
            status: RentalStatus::Ordered,
            created_at: now,
            updated_at: now,
        })
    }

    /// Same rental under a fresh code; used when the first code collided.
    pub fn with_code(mut self, code: RentalCode) -> Self {
        self.code = code;
        self
    }

    pub fn take(&mut self, now: DateTime<Utc>) -> DomainResult<StockEffect> {
        if self.status != RentalStatus::Ordered {
            return Err(DomainError::invariant("rental is not in ORDERED status"));
        }
        self.status = RentalStatus::Taken;
        self.updated_at = now;
        Ok(StockEffect::NONE)
    }

    pub fn mark_returned(&mut self, now: DateTime<Utc>) -> DomainResult<StockEffect> {
        if self.status != RentalStatus::Taken {
            return Err(DomainError::invariant("rental is not active"));
        }
        self.status = RentalStatus::Returned;
        self.return_date = Some(now);
        self.updated_at = now;
        Ok(StockEffect::RESTOCK)
    }

    /// Only a TAKEN rental gives its copy back; the copy reserved by an
    /// ORDERED rental stays out of stock.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> DomainResult<StockEffect> {
        let effect = match self.status {
            RentalStatus::Taken => StockEffect::RESTOCK,
            RentalStatus::Ordered => StockEffect::NONE,
            RentalStatus::Returned | RentalStatus::Cancelled => {
                return Err(DomainError::invariant("rental cannot be cancelled"));
            }
        };
        self.status = RentalStatus::Cancelled;
        self.return_date = None;
        self.updated_at = now;
        Ok(effect)
    }
}

impl Entity for Rental {
    type Id = RentalId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ordered() -> Rental {
        Rental::order(
            UserId::new(),
            MovieId::new(),
            RentalCode::parse("ABCD1234").unwrap(),
            None,
            None,
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn order_defaults_dates() {
        let now = Utc::now();
        let r = Rental::order(UserId::new(), MovieId::new(), RentalCode::parse("X1").unwrap(), None, None, now)
            .unwrap();
        assert_eq!(r.status, RentalStatus::Ordered);
        assert_eq!(r.rental_date, now);
        assert_eq!(r.return_date, Some(now + Duration::days(7)));
    }

    #[test]
    fn order_rejects_inverted_dates() {
        let now = Utc::now();
        let res = Rental::order(
            UserId::new(),
            MovieId::new(),
            RentalCode::parse("X1").unwrap(),
            Some(now),
            Some(now - Duration::days(1)),
            now,
        );
        assert!(matches!(res, Err(DomainError::Validation(_))));
    }

    #[test]
    fn happy_path_take_then_return() {
        let mut r = ordered();
        let now = Utc::now();
        assert_eq!(r.take(now).unwrap(), StockEffect::NONE);
        assert_eq!(r.mark_returned(now).unwrap(), StockEffect::RESTOCK);
        assert_eq!(r.status, RentalStatus::Returned);
        assert_eq!(r.return_date, Some(now));
    }

    #[test]
    fn cancel_restocks_only_taken_rentals() {
        let now = Utc::now();

        let mut a = ordered();
        assert_eq!(a.cancel(now).unwrap(), StockEffect::NONE);
        assert_eq!(a.return_date, None);

        let mut b = ordered();
        b.take(now).unwrap();
        assert_eq!(b.cancel(now).unwrap(), StockEffect::RESTOCK);
    }

    #[test]
    fn invalid_transitions_carry_messages() {
        let now = Utc::now();
        let mut r = ordered();
        assert_eq!(r.mark_returned(now), Err(DomainError::invariant("rental is not active")));

        r.take(now).unwrap();
        assert_eq!(r.take(now), Err(DomainError::invariant("rental is not in ORDERED status")));

        r.mark_returned(now).unwrap();
        assert_eq!(r.cancel(now), Err(DomainError::invariant("rental cannot be cancelled")));
    }

    #[test]
    fn status_parsing_is_case_insensitive() {
        assert_eq!("taken".parse::<RentalStatus>().unwrap(), RentalStatus::Taken);
        assert!("lost".parse::<RentalStatus>().is_err());
        assert_eq!(serde_json::to_string(&RentalStatus::Cancelled).unwrap(), "\"CANCELLED\"");
    }

    #[derive(Debug, Clone, Copy)]
    enum Op {
        Take,
        Return,
        Cancel,
    }

    proptest! {
        // Starting from the copy taken at order time, the net stock change
        // never exceeds +1 and terminal states stay terminal.
        #[test]
        fn transitions_never_restock_twice(ops in proptest::collection::vec(
            prop_oneof![Just(Op::Take), Just(Op::Return), Just(Op::Cancel)], 0..12)
        ) {
            let mut r = ordered();
            let mut net = -1;
            let now = Utc::now();
            for op in ops {
                let before = r.status;
                let res = match op {
                    Op::Take => r.take(now),
                    Op::Return => r.mark_returned(now),
                    Op::Cancel => r.cancel(now),
                };
                match res {
                    Ok(effect) => {
                        prop_assert!(!before.is_terminal());
                        net += effect.delta();
                    }
                    Err(_) => prop_assert_eq!(r.status, before),
                }
                prop_assert!(net <= 0);
            }
        }
    }
}
