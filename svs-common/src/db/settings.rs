//! Key-value settings table

use sqlx::{Executor, Sqlite};

use crate::{Error, Result};

/// Version of the persisted range table
pub const TABLE_VERSION_KEY: &str = "table_version";

/// Read and parse a setting; `None` when unset
pub async fn get_setting<'e, E, T>(executor: E, key: &str) -> Result<Option<T>>
where
    E: Executor<'e, Database = Sqlite>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(executor)
        .await
        .map_err(Error::Database)?;

    match row {
        Some((value,)) => {
            let parsed = value
                .parse::<T>()
                .map_err(|e| Error::Config(format!("Parse setting '{}' failed: {}", key, e)))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

/// Insert or overwrite a setting
pub async fn set_setting<'e, E, T>(executor: E, key: &str, value: T) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
    T: ToString,
{
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )
    .bind(key)
    .bind(value.to_string())
    .execute(executor)
    .await
    .map_err(Error::Database)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_setting_round_trip() {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("settings.db")).await.unwrap();

        assert_eq!(get_setting::<_, u64>(&pool, TABLE_VERSION_KEY).await.unwrap(), None);

        set_setting(&pool, TABLE_VERSION_KEY, 3u64).await.unwrap();
        set_setting(&pool, TABLE_VERSION_KEY, 4u64).await.unwrap();

        assert_eq!(get_setting::<_, u64>(&pool, TABLE_VERSION_KEY).await.unwrap(), Some(4));
    }

    #[tokio::test]
    async fn test_unparseable_setting_is_config_error() {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("settings.db")).await.unwrap();

        set_setting(&pool, TABLE_VERSION_KEY, "not-a-number").await.unwrap();
        let err = get_setting::<_, u64>(&pool, TABLE_VERSION_KEY).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
