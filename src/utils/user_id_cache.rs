use anyhow::Result;
use futures_util::StreamExt;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::time::Duration;

use super::user_id_filter::normalize;

/// Holds user ids known to be TAKEN. Absence means "unknown", not "available".
pub static USER_ID_CACHE: Lazy<Cache<String, bool>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(500_000) // tune based on memory
        .time_to_live(Duration::from_secs(86400)) // 24h TTL
        .build()
});

/// Mark a single user id as taken
pub async fn mark_taken(user_id: &str) {
    USER_ID_CACHE.insert(normalize(user_id), true).await;
}

/// Forget a user id after its account is deleted
pub async fn forget(user_id: &str) {
    USER_ID_CACHE.invalidate(&normalize(user_id)).await;
}

/// Check if user id is taken
pub async fn is_taken(user_id: &str) -> bool {
    USER_ID_CACHE
        .get(&normalize(user_id))
        .await
        .unwrap_or(false)
}

/// Batch mark user ids as taken
async fn batch_mark(user_ids: &[String]) {
    let futures: Vec<_> = user_ids
        .iter()
        .map(|u| USER_ID_CACHE.insert(normalize(u), true))
        .collect();

    futures::future::join_all(futures).await;
}

/// Load ids of accounts that logged in recently (batched)
pub async fn warmup_user_id_cache(pool: &MySqlPool, days: u32, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_as::<_, (String,)>(
        r#"
        SELECT user_id FROM students WHERE last_login_at >= NOW() - INTERVAL ? DAY
        UNION ALL
        SELECT user_id FROM instructors WHERE last_login_at >= NOW() - INTERVAL ? DAY
        "#,
    )
    .bind(days)
    .bind(days)
    .fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total_count = 0usize;

    while let Some(row) = stream.next().await {
        let (user_id,) = row?;
        batch.push(user_id);
        total_count += 1;

        if batch.len() >= batch_size {
            batch_mark(&batch).await;
            batch.clear();
        }
    }

    if !batch.is_empty() {
        batch_mark(&batch).await;
    }

    tracing::info!(
        total = total_count,
        days,
        "User id cache warmup complete"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn marked_ids_are_taken_until_forgotten() {
        mark_taken("CacheTest-02239999").await;
        assert!(is_taken("cachetest-02239999").await);

        forget("cachetest-02239999").await;
        assert!(!is_taken("CacheTest-02239999").await);
    }
}
