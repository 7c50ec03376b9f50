use std::ops::DerefMut;
use std::sync::Arc;
use std::time::Duration;

use r2d2_redis::r2d2;
use r2d2_redis::redis::{Commands, RedisError};
use r2d2_redis::RedisConnectionManager;
use thiserror::Error;

use crate::models::Food;

pub(crate) type RedisPool = r2d2::Pool<RedisConnectionManager>;

const CACHE_POOL_MAX_OPEN: u32 = 16;
const CACHE_POOL_MIN_IDLE: u32 = 8;
const CACHE_POOL_EXPIRE_SECONDS: u64 = 60;

const GET_ALL_FOOD_KEY: &str = "foods:all";
const GENERATION_KEY: &str = "foods:gen";

#[derive(Debug, Error)]
pub(crate) enum CacheError {
    #[error(transparent)]
    Pool(#[from] r2d2::Error),

    #[error(transparent)]
    Redis(#[from] RedisError),
}

pub(crate) trait CacheBackend: Send + Sync {
    fn generation(&self) -> Result<u64, CacheError>;
    fn bump_generation(&self) -> Result<(), CacheError>;
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;
    fn set_ex(&self, key: &str, value: Vec<u8>, ttl_seconds: usize) -> Result<(), CacheError>;
}

struct RedisBackend {
    pool: RedisPool,
}

impl CacheBackend for RedisBackend {
    fn generation(&self) -> Result<u64, CacheError> {
        let mut conn = self.pool.get()?;
        let generation: Option<u64> = conn.deref_mut().get(GENERATION_KEY)?;
        Ok(generation.unwrap_or(0))
    }

    fn bump_generation(&self) -> Result<(), CacheError> {
        let mut conn = self.pool.get()?;
        let _: u64 = conn.deref_mut().incr(GENERATION_KEY, 1)?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.pool.get()?;
        let value: Option<Vec<u8>> = conn.deref_mut().get(key)?;
        Ok(value)
    }

    fn set_ex(&self, key: &str, value: Vec<u8>, ttl_seconds: usize) -> Result<(), CacheError> {
        let mut conn = self.pool.get()?;
        let _: () = conn.deref_mut().set_ex(key, value, ttl_seconds)?;
        Ok(())
    }
}

pub(crate) enum Lookup {
    Hit(Vec<Food>),
    // a list loaded after this read may only be stored under `generation`
    Miss { generation: u64 },
    Bypass,
}

// The list lives under foods:all:<gen>. Mutations bump the generation, so a
// list read before a mutation can only be written to a key nobody reads.
#[derive(Clone)]
pub(crate) struct FoodListCache {
    backend: Option<Arc<dyn CacheBackend>>,
    ttl_seconds: usize,
}

impl FoodListCache {
    pub(crate) fn disabled() -> Self {
        FoodListCache {
            backend: None,
            ttl_seconds: 0,
        }
    }

    // pool is built lazily so an unreachable Redis does not block startup
    pub(crate) fn connect(redis_url: &str, ttl_seconds: u64) -> Result<Self, RedisError> {
        let manager = RedisConnectionManager::new(redis_url)?;
        let pool = r2d2::Pool::builder()
            .max_size(CACHE_POOL_MAX_OPEN)
            .max_lifetime(Some(Duration::from_secs(CACHE_POOL_EXPIRE_SECONDS)))
            .min_idle(Some(CACHE_POOL_MIN_IDLE))
            .build_unchecked(manager);
        Ok(Self::with_backend(Arc::new(RedisBackend { pool }), ttl_seconds))
    }

    pub(crate) fn with_backend(backend: Arc<dyn CacheBackend>, ttl_seconds: u64) -> Self {
        FoodListCache {
            backend: Some(backend),
            ttl_seconds: usize::try_from(ttl_seconds).unwrap_or(usize::MAX),
        }
    }

    pub(crate) fn lookup(&self) -> Lookup {
        let backend = match &self.backend {
            Some(backend) => backend,
            None => return Lookup::Bypass,
        };
        let generation = match backend.generation() {
            Ok(generation) => generation,
            Err(e) => {
                log::warn!("redis unavailable, skipping food cache: {}", e);
                return Lookup::Bypass;
            }
        };
        match backend.get(&list_key(generation)) {
            Ok(Some(bytes)) if !bytes.is_empty() => match Food::list_from_u8(&bytes) {
                Ok(foods) => Lookup::Hit(foods),
                Err(e) => {
                    log::warn!("discarding undecodable food cache entry: {}", e);
                    Lookup::Miss { generation }
                }
            },
            Ok(_) => Lookup::Miss { generation },
            Err(e) => {
                log::warn!("food cache read failed: {}", e);
                Lookup::Bypass
            }
        }
    }

    pub(crate) fn put(&self, generation: u64, foods: &[Food]) {
        let backend = match &self.backend {
            Some(backend) => backend,
            None => return,
        };
        let value = match Food::list_to_u8(foods) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("could not encode food list for cache: {}", e);
                return;
            }
        };
        if let Err(e) = backend.set_ex(&list_key(generation), value, self.ttl_seconds) {
            log::warn!("food cache write failed: {}", e);
        }
    }

    // called after every food mutation
    pub(crate) fn invalidate(&self) {
        if let Some(backend) = &self.backend {
            if let Err(e) = backend.bump_generation() {
                log::warn!("food cache invalidation failed: {}", e);
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn in_memory() -> Self {
        Self::with_backend(Arc::new(tests::MemoryBackend::default()), 60)
    }
}

fn list_key(generation: u64) -> String {
    format!("{}:{}", GET_ALL_FOOD_KEY, generation)
}
