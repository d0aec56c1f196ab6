/// Lowest and highest rating a single review may carry.
pub const MIN_REVIEW_RATING: i32 = 1;
pub const MAX_REVIEW_RATING: i32 = 10;

/// aggregate_rating
///
/// Mean of the given review ratings rounded to one decimal place. A movie without
/// reviews has a rating of 0.0.
pub fn aggregate_rating(ratings: &[i32]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    // Half-up rounding, done in integer tenths.
    let total: i64 = ratings.iter().map(|&r| i64::from(r)).sum();
    let count = ratings.len() as i64;
    let tenths = (total * 20 + count).div_euclid(2 * count);
    tenths as f64 / 10.0
}
