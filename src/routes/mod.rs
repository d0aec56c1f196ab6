/// Router Module Index
///
/// Routes are split by who may call them. Access control is attached per router with
/// `route_layer` in `create_router`, so a handler cannot end up in the wrong group by
/// accident.

/// Routes open to anonymous callers: browsing, search, registration and login.
pub mod public;

/// Routes behind the `authenticate` stage. Handlers receive a `Principal`.
pub mod authenticated;

/// Routes behind `authenticate` and `require_admin`, nested under `/admin`.
pub mod admin;
