//! Password hashing on the worker pool.
//!
//! bcrypt is pure CPU work; hashing and verification run on the shared
//! rayon pool, never on a reactor thread.

use crate::exception::AppError;
use crate::worker::WorkerPool;

#[derive(Clone)]
pub struct PasswordHasher {
    pool: WorkerPool,
    cost: u32,
}

impl PasswordHasher {
    pub fn new(pool: WorkerPool, cost: u32) -> Self {
        Self { pool, cost }
    }

    pub async fn hash(&self, password: String) -> Result<String, AppError> {
        let cost = self.cost;
        self.pool
            .execute(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| AppError::internal(e.to_string()))?
            .map_err(|e| AppError::internal(format!("failed to hash password: {e}")))
    }

    pub async fn verify(&self, password: String, hash: String) -> Result<bool, AppError> {
        self.pool
            .execute(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| AppError::internal(e.to_string()))?
            .map_err(|e| AppError::internal(format!("failed to verify password: {e}")))
    }
}
