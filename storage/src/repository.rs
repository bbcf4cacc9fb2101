use async_trait::async_trait;

use crate::error::StorageError;

/// Id-keyed access to one memory table. Seeding goes through this trait so it works against
/// either environment.
#[async_trait]
pub trait Repository<T: Sync>: Send + Sync {
    /// Inserts `entity` keeping its id; a taken id is [`StorageError::AlreadyExists`].
    async fn save(&self, entity: &T) -> Result<(), StorageError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<T>, StorageError>;
    async fn find_all(&self) -> Result<Vec<T>, StorageError>;
    async fn delete(&self, id: &str) -> Result<bool, StorageError>;

    /// Saves in order and stops at the first failure. Returns the number saved.
    async fn save_all(&self, entities: &[T]) -> Result<usize, StorageError> {
        for entity in entities {
            self.save(entity).await?;
        }
        Ok(entities.len())
    }
}
