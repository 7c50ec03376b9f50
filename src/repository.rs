use chrono::NaiveDateTime;
use diesel::mysql::MysqlConnection;
use diesel::r2d2::{self, ConnectionManager, PoolError};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use failsafe::backoff::EqualJittered;
use failsafe::failure_policy::{ConsecutiveFailures, OrElse, SuccessRateOverTimeWindow};
use failsafe::{CircuitBreaker, StateMachine};
use thiserror::Error;

use crate::auth::RequestContext;
use crate::models::{Food, FoodCategory, FoodChangeset, NewFood, NewFoodCategory};
use crate::query;

#[cfg(test)]
pub(crate) mod memory;

pub(crate) type DbPool = r2d2::Pool<ConnectionManager<MysqlConnection>>;

pub(crate) type CircuitBreakerType = StateMachine<
    OrElse<SuccessRateOverTimeWindow<EqualJittered>, ConsecutiveFailures<EqualJittered>>,
    (),
>;

#[derive(Debug, Error)]
pub(crate) enum StoreError {
    #[error("could not get a database connection: {0}")]
    Pool(#[from] PoolError),

    #[error("database query failed: {0}")]
    Query(#[from] DieselError),

    #[error("datastore unavailable")]
    Unavailable,
}

impl StoreError {
    // only datastore health failures trip the breaker
    fn is_outage(&self) -> bool {
        match self {
            StoreError::Pool(_) | StoreError::Unavailable => true,
            StoreError::Query(DieselError::DatabaseError(
                DatabaseErrorKind::UnableToSendCommand,
                _,
            )) => true,
            StoreError::Query(_) => false,
        }
    }
}

pub(crate) trait Store: Send + Sync {
    fn find_session(
        &self,
        token_hash: &str,
        now: NaiveDateTime,
    ) -> Result<Option<RequestContext>, StoreError>;

    fn list_foods(&self) -> Result<Vec<Food>, StoreError>;

    fn find_by_id(&self, id: i32) -> Result<Option<Food>, StoreError>;

    fn find_by_name_fragment(&self, fragment: &str) -> Result<Vec<Food>, StoreError>;

    fn insert(&self, food: NewFood) -> Result<Food, StoreError>;

    fn update_partial(&self, id: i32, changes: FoodChangeset) -> Result<Option<Food>, StoreError>;

    fn delete(&self, id: i32) -> Result<bool, StoreError>;

    fn category_exists(&self, id: i32) -> Result<bool, StoreError>;

    fn list_categories(&self) -> Result<Vec<FoodCategory>, StoreError>;

    fn insert_category(&self, category: NewFoodCategory) -> Result<FoodCategory, StoreError>;
}

pub(crate) struct MysqlStore {
    pool: DbPool,
    circuit_breaker: CircuitBreakerType,
}

impl MysqlStore {
    pub(crate) fn new(pool: DbPool, circuit_breaker: CircuitBreakerType) -> Self {
        MysqlStore {
            pool,
            circuit_breaker,
        }
    }

    fn run<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&MysqlConnection) -> Result<T, DieselError>,
    {
        let result = self
            .circuit_breaker
            .call_with(StoreError::is_outage, || -> Result<T, StoreError> {
                let conn = self.pool.get()?;
                Ok(f(&*conn)?)
            });
        match result {
            Ok(value) => Ok(value),
            Err(failsafe::Error::Inner(e)) => Err(e),
            Err(failsafe::Error::Rejected) => {
                log::warn!("circuit breaker open, rejecting database call");
                Err(StoreError::Unavailable)
            }
        }
    }
}

impl Store for MysqlStore {
    fn find_session(
        &self,
        token_hash: &str,
        now: NaiveDateTime,
    ) -> Result<Option<RequestContext>, StoreError> {
        let session = self.run(|conn| query::find_session(token_hash, now, conn))?;
        Ok(session.map(|(user_id, roles)| RequestContext { user_id, roles }))
    }

    fn list_foods(&self) -> Result<Vec<Food>, StoreError> {
        self.run(query::find_all_foods)
    }

    fn find_by_id(&self, id: i32) -> Result<Option<Food>, StoreError> {
        self.run(|conn| query::find_food(id, conn))
    }

    fn find_by_name_fragment(&self, fragment: &str) -> Result<Vec<Food>, StoreError> {
        self.run(|conn| query::search_foods(fragment, conn))
    }

    fn insert(&self, food: NewFood) -> Result<Food, StoreError> {
        self.run(|conn| query::insert_food(&food, conn))
    }

    fn update_partial(&self, id: i32, changes: FoodChangeset) -> Result<Option<Food>, StoreError> {
        self.run(|conn| query::update_food(id, &changes, conn))
    }

    fn delete(&self, id: i32) -> Result<bool, StoreError> {
        self.run(|conn| query::delete_food(id, conn))
    }

    fn category_exists(&self, id: i32) -> Result<bool, StoreError> {
        self.run(|conn| query::category_exists(id, conn))
    }

    fn list_categories(&self) -> Result<Vec<FoodCategory>, StoreError> {
        self.run(query::find_all_categories)
    }

    fn insert_category(&self, category: NewFoodCategory) -> Result<FoodCategory, StoreError> {
        self.run(|conn| query::insert_category(&category, conn))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraint_violations_do_not_count_as_outages() {
        let violation = StoreError::Query(DieselError::DatabaseError(
            DatabaseErrorKind::ForeignKeyViolation,
            Box::new("foods_category_id_foreign".to_string()),
        ));
        assert!(!violation.is_outage());
        assert!(!StoreError::Query(DieselError::NotFound).is_outage());

        let lost = StoreError::Query(DieselError::DatabaseError(
            DatabaseErrorKind::UnableToSendCommand,
            Box::new("server has gone away".to_string()),
        ));
        assert!(lost.is_outage());
    }
}
