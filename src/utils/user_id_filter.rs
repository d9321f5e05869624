use anyhow::{Result, anyhow};
use autoscale_cuckoo_filter::CuckooFilter;
use futures::StreamExt;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::sync::RwLock;

/// Expected capacity and false-positive rate.
/// Tune these based on real enrolment numbers.
const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

static USER_ID_FILTER: Lazy<RwLock<CuckooFilter<String>>> =
    Lazy::new(|| RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)));

#[inline]
pub fn normalize(user_id: &str) -> String {
    user_id.trim().to_lowercase()
}

/// Check if a user id might be taken (false positives possible)
pub fn might_exist(user_id: &str) -> bool {
    let user_id = normalize(user_id);
    USER_ID_FILTER
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .contains(&user_id)
}

/// Insert a single user id into the filter
pub fn insert(user_id: &str) {
    let user_id = normalize(user_id);
    USER_ID_FILTER
        .write()
        .unwrap_or_else(|e| e.into_inner())
        .add(&user_id);
}

/// Remove a user id from the filter
pub fn remove(user_id: &str) {
    let user_id = normalize(user_id);
    USER_ID_FILTER
        .write()
        .unwrap_or_else(|e| e.into_inner())
        .remove(&user_id);
}

/// Warm up the filter with every account id, streamed in batches
pub async fn warmup_user_id_filter(pool: &MySqlPool, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_as::<_, (String,)>(
        r#"
        SELECT user_id FROM students
        UNION ALL SELECT user_id FROM instructors
        UNION ALL SELECT user_id FROM admins
        "#,
    )
    .fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total = 0usize;

    while let Some(row) = stream.next().await {
        let (user_id,) = row.map_err(|e| anyhow!("DB row fetch failed: {}", e))?;

        batch.push(normalize(&user_id));
        total += 1;

        if batch.len() == batch_size {
            insert_batch(&batch);
            batch.clear();
        }
    }

    if !batch.is_empty() {
        insert_batch(&batch);
    }

    tracing::info!(total, "User id filter warmup complete");
    Ok(())
}

/// Insert a batch of normalized user ids
fn insert_batch(user_ids: &[String]) {
    let mut filter = USER_ID_FILTER.write().unwrap_or_else(|e| e.into_inner());

    for user_id in user_ids {
        filter.add(user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserted_ids_are_found_case_insensitively() {
        insert("FilterTest-INS900");
        assert!(might_exist("filtertest-ins900"));
        assert!(might_exist("  FILTERTEST-INS900 "));
    }

    #[test]
    fn removed_ids_are_forgotten() {
        insert("filtertest-removed");
        remove("filtertest-removed");
        assert!(!might_exist("filtertest-removed"));
    }
}
