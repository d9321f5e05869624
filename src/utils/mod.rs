pub mod db_utils;
pub mod user_id_cache;
pub mod user_id_filter;
