/// Versioned request/response contracts.
///
/// Database records from `models` are mapped into these types before they leave the
/// server. A breaking change to the wire format means a new module next to `v1`.
pub mod v1;
