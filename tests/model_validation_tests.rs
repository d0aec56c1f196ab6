use movie_catalog::{
    dto::v1::{MovieDto, UserSummary},
    models::{Movie, User},
    pagination::{Page, PageRequest, UserSort, UserSortKey},
    rating::aggregate_rating,
};

// --- Rating ---

#[test]
fn rating_is_zero_without_reviews() {
    assert_eq!(aggregate_rating(&[]), 0.0);
}

#[test]
fn rating_is_rounded_to_one_decimal() {
    assert_eq!(aggregate_rating(&[8, 6]), 7.0);
    assert_eq!(aggregate_rating(&[7, 8, 8]), 7.7);
    assert_eq!(aggregate_rating(&[1, 2]), 1.5);
    assert_eq!(aggregate_rating(&[10, 10, 9]), 9.7);
}

#[test]
fn rating_halves_round_up_exactly() {
    // 143 / 20 = 7.15, which is not representable as a float.
    let mut ratings = vec![7; 17];
    ratings.extend([8, 8, 8]);
    assert_eq!(ratings.iter().sum::<i32>(), 143);
    assert_eq!(ratings.len(), 20);
    assert_eq!(aggregate_rating(&ratings), 7.2);

    assert_eq!(aggregate_rating(&[5, 5, 5, 6]), 5.3);
    assert_eq!(aggregate_rating(&[1; 20]), 1.0);
}

// --- Pagination ---

#[test]
fn page_request_clamps_negative_pages() {
    assert_eq!(PageRequest::new(Some(-3), 5).page, 0);
    assert_eq!(PageRequest::new(None, 5).page, 0);
    assert_eq!(PageRequest::new(Some(2), 5).offset(), 10);
    assert_eq!(PageRequest::new(Some(i64::MAX), 5).offset(), i64::MAX);
}

#[test]
fn page_totals_round_up() {
    let page: Page<i32> = Page::new(vec![1], PageRequest::new(Some(1), 5), 6);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.last_page(), 1);
    assert!(!page.is_past_last_page());
}

#[test]
fn only_pages_beyond_the_end_are_missing() {
    let empty: Page<i32> = Page::empty(PageRequest::new(Some(0), 5));
    assert!(!empty.is_past_last_page());
    assert_eq!(empty.last_page(), 0);

    let beyond: Page<i32> = Page::new(vec![], PageRequest::new(Some(2), 5), 10);
    assert!(beyond.is_past_last_page());
    assert_eq!(beyond.last_page(), 1);
}

#[test]
fn page_map_keeps_totals() {
    let page = Page::new(vec![1, 2], PageRequest::new(Some(0), 2), 3).map(|n| n * 10);
    assert_eq!(page.content, vec![10, 20]);
    assert_eq!(page.total_elements, 3);
    assert_eq!(page.total_pages, 2);
}

// --- Sorting ---

#[test]
fn user_sort_parses_property_and_direction() {
    let sort = UserSort::parse(Some("login,desc"));
    assert_eq!(sort.key, UserSortKey::Login);
    assert!(sort.descending);

    let sort = UserSort::parse(Some("Banned"));
    assert_eq!(sort.key, UserSortKey::Banned);
    assert!(!sort.descending);

    assert_eq!(UserSort::parse(Some("username,DESC")).key.column(), "name");
}

#[test]
fn unknown_sort_property_falls_back_to_id() {
    let sort = UserSort::parse(Some("password_hash; DROP TABLE users,sideways"));
    assert_eq!(sort.key, UserSortKey::Id);
    assert!(!sort.descending);
    assert_eq!(UserSort::parse(None), UserSort::default());
}

// --- Response Mapping ---

#[test]
fn user_summary_never_carries_the_hash() {
    let user = User {
        id: 4,
        name: "Ripley".to_string(),
        login: "ripley@nostromo.com".to_string(),
        password_hash: "$argon2id$secret".to_string(),
        is_admin: false,
        is_banned: true,
    };
    let json = serde_json::to_string(&UserSummary::from(user.clone())).unwrap();
    assert!(!json.contains("argon2"));
    assert!(json.contains(r#""banned":true"#));

    // The row type itself also skips the hash when serialized.
    assert!(!serde_json::to_string(&user).unwrap().contains("argon2"));
}

#[test]
fn movie_dto_mirrors_the_record() {
    let movie = Movie {
        id: 1,
        title: "Alien".to_string(),
        rating: 8.4,
        description: "Space horror".to_string(),
        ..Movie::default()
    };
    let dto = MovieDto::from(movie);
    assert_eq!(dto.id, 1);
    assert_eq!(dto.rating, 8.4);
    assert_eq!(dto.poster_url, None);
}
