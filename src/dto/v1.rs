use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{borrow::Cow, sync::LazyLock};
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError, ValidateUrl};

use crate::{
    auth::IssuedToken,
    models::{Movie, MovieFields, Review, User},
};

/// Display names: letters and digits, single spaces, apostrophes or hyphens between words.
static NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\p{L}0-9]+([ '-][\p{L}0-9]+)*$").expect("NAME_REGEX: invalid regex pattern")
});

/// Movie titles and director names additionally allow brackets and light punctuation.
static TITLE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\p{L}\p{Nd}(){},.:']+([ '-][\p{L}\p{Nd}(){},.:']+)*$")
        .expect("TITLE_REGEX: invalid regex pattern")
});

/// Descriptions: letters, digits, marks, most punctuation, math symbols and brackets,
/// with single spaces, apostrophes or hyphens between runs.
static DESCRIPTION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[\p{L}\p{Po}\p{Mn}\p{Mc}\p{Nd}\p{Sm}\p{Ps}\p{Pe}\p{Pi}\p{Pf}]+([ '-][\p{L}\p{Po}\p{Mn}\p{Mc}\p{Nd}\p{Sm}\p{Ps}\p{Pe}\p{Pi}\p{Pf}]+)*$",
    )
    .expect("DESCRIPTION_REGEX: invalid regex pattern")
});

/// Empty means "no URL". Anything else must be 7 to 255 characters and parse as a URL.
fn valid_optional_url(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Ok(());
    }
    let length = value.chars().count();
    if !(7..=255).contains(&length) || !value.validate_url() {
        return Err(ValidationError::new("url").with_message(Cow::Borrowed(
            "Url should be a valid address of 7 to 255 characters",
        )));
    }
    Ok(())
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

// --- Users & Auth ---

/// RegisterRequest
///
/// Body of `POST /registration`. The password is checked against the configured
/// length policy separately, since its bounds are not known at compile time.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct RegisterRequest {
    #[validate(
        length(min = 3, max = 20, message = "Name should be 3 to 20 characters long"),
        regex(
            path = *NAME_REGEX,
            message = "Name may contain only letters, digits and single spaces, apostrophes or hyphens between words"
        )
    )]
    pub name: String,
    #[validate(
        length(min = 3, max = 60, message = "Login should be 3 to 60 characters long"),
        email(message = "Login should be a valid email address")
    )]
    pub login: String,
    pub password: String,
}

/// UserRequest
///
/// Body of `POST /admin/users`. Same rules as registration, plus the admin flag.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct UserRequest {
    #[validate(
        length(min = 3, max = 20, message = "Name should be 3 to 20 characters long"),
        regex(
            path = *NAME_REGEX,
            message = "Name may contain only letters, digits and single spaces, apostrophes or hyphens between words"
        )
    )]
    pub name: String,
    #[validate(
        length(min = 3, max = 60, message = "Login should be 3 to 60 characters long"),
        email(message = "Login should be a valid email address")
    )]
    pub login: String,
    pub password: String,
    #[serde(default)]
    pub admin: bool,
}

/// AccountUpdateRequest
///
/// Body of `PUT /account`. An empty `password` keeps the current one.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct AccountUpdateRequest {
    #[validate(
        length(min = 3, max = 20, message = "Name should be 3 to 20 characters long"),
        regex(
            path = *NAME_REGEX,
            message = "Name may contain only letters, digits and single spaces, apostrophes or hyphens between words"
        )
    )]
    pub name: String,
    #[validate(
        length(min = 3, max = 60, message = "Login should be 3 to 60 characters long"),
        email(message = "Login should be a valid email address")
    )]
    pub login: String,
    #[serde(default)]
    pub password: String,
}

/// LoginRequest
///
/// Credentials for `POST /loginPage`, accepted as JSON or as a urlencoded form.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

/// TokenResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct TokenResponse {
    pub token: String,
    /// Always `Bearer`.
    pub token_type: String,
    #[ts(type = "string")]
    pub expires_at: DateTime<Utc>,
}

impl From<IssuedToken> for TokenResponse {
    fn from(issued: IssuedToken) -> Self {
        Self {
            expires_at: issued.expires_at(),
            token: issued.token,
            token_type: "Bearer".to_string(),
        }
    }
}

/// UserSummary
///
/// Public view of an account. Never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct UserSummary {
    pub id: i64,
    pub name: String,
    pub login: String,
    pub admin: bool,
    pub banned: bool,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            login: user.login,
            admin: user.is_admin,
            banned: user.is_banned,
        }
    }
}

// --- Movies & Reviews ---

/// MovieRequest
///
/// Body of `POST /admin/movies` and `PUT /admin/movies/{id}`. The rating is not part of
/// it: ratings only ever come from reviews.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct MovieRequest {
    #[validate(
        length(min = 1, max = 100, message = "Title should be 1 to 100 characters long"),
        regex(path = *TITLE_REGEX, message = "Title contains unsupported characters")
    )]
    pub title: String,
    #[validate(
        length(min = 1, max = 40, message = "Director should be 1 to 40 characters long"),
        regex(path = *TITLE_REGEX, message = "Director contains unsupported characters")
    )]
    pub director: Option<String>,
    #[ts(type = "string | null")]
    pub release_date: Option<NaiveDate>,
    #[validate(custom(function = "valid_optional_url"))]
    pub poster_url: Option<String>,
    #[validate(custom(function = "valid_optional_url"))]
    pub trailer_url: Option<String>,
    #[validate(
        length(
            min = 5,
            max = 2000,
            message = "Description should be 5 to 2000 characters long"
        ),
        regex(
            path = *DESCRIPTION_REGEX,
            message = "Description contains unsupported characters or spacing"
        )
    )]
    pub description: String,
}

impl From<MovieRequest> for MovieFields {
    fn from(req: MovieRequest) -> Self {
        Self {
            title: req.title,
            director: req.director,
            release_date: req.release_date,
            poster_url: blank_to_none(req.poster_url),
            trailer_url: blank_to_none(req.trailer_url),
            description: req.description,
        }
    }
}

/// MovieDto
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct MovieDto {
    pub id: i64,
    pub title: String,
    pub director: Option<String>,
    #[ts(type = "string | null")]
    pub release_date: Option<NaiveDate>,
    pub poster_url: Option<String>,
    pub trailer_url: Option<String>,
    pub rating: f64,
    pub description: String,
}

impl From<Movie> for MovieDto {
    fn from(movie: Movie) -> Self {
        Self {
            id: movie.id,
            title: movie.title,
            director: movie.director,
            release_date: movie.release_date,
            poster_url: movie.poster_url,
            trailer_url: movie.trailer_url,
            rating: movie.rating,
            description: movie.description,
        }
    }
}

/// ReviewRequest
///
/// Body of `POST /movies/{id}/reviews`. Author and movie come from the request context.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct ReviewRequest {
    #[validate(length(min = 1, max = 100, message = "Review title should be 1 to 100 characters long"))]
    pub title: String,
    #[validate(length(min = 1, max = 5000, message = "Review text should be 1 to 5000 characters long"))]
    pub text: String,
    #[validate(range(min = 1, max = 10, message = "Rating should be between 1 and 10"))]
    pub rating: i32,
}

/// ReviewDto
///
/// A review as shown to clients. The author is identified by display name only.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct ReviewDto {
    pub id: i64,
    pub movie_id: i64,
    pub user_id: i64,
    pub author_name: Option<String>,
    #[ts(type = "string")]
    pub post_date: DateTime<Utc>,
    pub title: String,
    pub text: String,
    pub rating: i32,
}

impl From<Review> for ReviewDto {
    fn from(review: Review) -> Self {
        Self {
            id: review.id,
            movie_id: review.movie_id,
            user_id: review.user_id,
            author_name: review.author_name,
            post_date: review.post_date,
            title: review.title,
            text: review.text,
            rating: review.rating,
        }
    }
}

/// MovieDetails
///
/// A movie together with its reviews, newest first.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct MovieDetails {
    pub movie: MovieDto,
    pub reviews: Vec<ReviewDto>,
}

// --- Query Parameters ---

#[derive(Debug, Clone, Deserialize, IntoParams, Default)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// Zero-based page index. Negative values are treated as 0.
    pub page: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, IntoParams, Default)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Title fragment, matched case-insensitively.
    pub t: Option<String>,
    pub page: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, IntoParams, Default)]
#[into_params(parameter_in = Query)]
pub struct UserListQuery {
    pub page: Option<i64>,
    /// `property[,asc|desc]` where property is one of id, login, username, admin, banned.
    pub sort: Option<String>,
}

#[derive(Debug, Clone, Deserialize, IntoParams, Default)]
#[into_params(parameter_in = Query)]
pub struct AccountQuery {
    /// Must equal the caller's own id when given.
    pub id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie_request() -> MovieRequest {
        MovieRequest {
            title: "Alien: Covenant (2017)".to_string(),
            director: Some("Ridley Scott".to_string()),
            release_date: NaiveDate::from_ymd_opt(2017, 5, 19),
            poster_url: Some(String::new()),
            trailer_url: Some("https://example.com/trailer".to_string()),
            description: "Space horror".to_string(),
        }
    }

    #[test]
    fn names_accept_unicode_letters() {
        let req = RegisterRequest {
            name: "Jean-Luc Picard".to_string(),
            login: "jl@example.com".to_string(),
            password: "secret".to_string(),
        };
        assert!(req.validate().is_ok());

        let req = RegisterRequest {
            name: "Гоша".to_string(),
            ..req
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn names_reject_doubled_separators() {
        let req = RegisterRequest {
            name: "Jean  Luc".to_string(),
            login: "jl@example.com".to_string(),
            password: "secret".to_string(),
        };
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("name"));
    }

    #[test]
    fn login_must_be_an_email() {
        let req = RegisterRequest {
            name: "Tester".to_string(),
            login: "not-an-email".to_string(),
            password: "secret".to_string(),
        };
        assert!(req.validate().unwrap_err().field_errors().contains_key("login"));
    }

    #[test]
    fn movie_urls_may_be_empty_but_not_garbage() {
        assert!(movie_request().validate().is_ok());

        let bad = MovieRequest {
            poster_url: Some("nope".to_string()),
            ..movie_request()
        };
        assert!(bad.validate().unwrap_err().field_errors().contains_key("poster_url"));
    }

    #[test]
    fn descriptions_allow_punctuation_but_not_stray_spacing() {
        let ok = MovieRequest {
            description: "A crew of seven (plus a cat) answers a distress call, and regrets it!".to_string(),
            ..movie_request()
        };
        assert!(ok.validate().is_ok());

        for description in ["Two  spaces here", " Leading space", "Line\nbreak inside", "Price $5 only"] {
            let bad = MovieRequest {
                description: description.to_string(),
                ..movie_request()
            };
            let errors = bad.validate().unwrap_err();
            assert!(errors.field_errors().contains_key("description"), "{description:?}");
        }
    }

    #[test]
    fn empty_urls_are_stored_as_none() {
        let fields = MovieFields::from(movie_request());
        assert_eq!(fields.poster_url, None);
        assert_eq!(fields.trailer_url.as_deref(), Some("https://example.com/trailer"));
    }

    #[test]
    fn review_rating_is_bounded() {
        let review = ReviewRequest {
            title: "Great".to_string(),
            text: "Loved it".to_string(),
            rating: 11,
        };
        assert!(review.validate().unwrap_err().field_errors().contains_key("rating"));
        let review = ReviewRequest { rating: 10, ..review };
        assert!(review.validate().is_ok());
    }
}
