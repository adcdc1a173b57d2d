use super::{ApiError, FeedParams};
use crate::db::{FeedQuery, SortDirection};
use crate::services::validation::validate_id;

pub const FEED_MIN_LIMIT: i64 = 1;
pub const FEED_MAX_LIMIT: i64 = 20;

pub fn validate_user_id(id: i32) -> Result<i32, ApiError> {
    Ok(validate_id("user", id)?)
}

pub fn validate_post_id(id: i32) -> Result<i32, ApiError> {
    Ok(validate_id("post", id)?)
}

pub fn validate_limit(limit: i64) -> Result<u64, ApiError> {
    if !(FEED_MIN_LIMIT..=FEED_MAX_LIMIT).contains(&limit) {
        return Err(ApiError::validation(format!(
            "Invalid limit: {limit}. Limit must be between {FEED_MIN_LIMIT} and {FEED_MAX_LIMIT}"
        )));
    }
    u64::try_from(limit).map_err(|_| ApiError::validation("Invalid limit"))
}

pub fn validate_offset(offset: i64) -> Result<u64, ApiError> {
    u64::try_from(offset).map_err(|_| {
        ApiError::validation(format!("Invalid offset: {offset}. Offset cannot be negative"))
    })
}

pub fn validate_sort(sort: &str) -> Result<SortDirection, ApiError> {
    match sort.to_ascii_lowercase().as_str() {
        "asc" => Ok(SortDirection::Asc),
        "desc" => Ok(SortDirection::Desc),
        _ => Err(ApiError::validation(format!(
            "Invalid sort: {sort}. Sort must be 'asc' or 'desc'"
        ))),
    }
}

/// Applies defaults (limit 10, offset 0, newest first) and bounds.
pub fn feed_query(params: &FeedParams) -> Result<FeedQuery, ApiError> {
    let defaults = FeedQuery::default();

    Ok(FeedQuery {
        limit: params
            .limit
            .map(validate_limit)
            .transpose()?
            .unwrap_or(defaults.limit),
        offset: params
            .offset
            .map(validate_offset)
            .transpose()?
            .unwrap_or(defaults.offset),
        sort: params
            .sort
            .as_deref()
            .map(validate_sort)
            .transpose()?
            .unwrap_or(defaults.sort),
    })
}
