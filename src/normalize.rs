use serde_json::Number;

/// Cache key for an address lookup: lower-cased, nothing else.
pub fn normalize_address(raw: &str) -> String {
    raw.to_lowercase()
}

/// Cache key for a single route request. Origin and destination are used
/// exactly as supplied, so `"1,2"` and `"1, 2"` are different keys.
pub fn route_key(origin: &str, destination: &str) -> (String, String) {
    (origin.to_string(), destination.to_string())
}

/// Joins a batch coordinate pair as `lat,lng`. Numbers keep their JSON
/// form: `42` stays `42` and `42.0` stays `42.0`.
pub fn coords_key(coords: &[Number; 2]) -> String {
    format!("{},{}", coords[0], coords[1])
}
