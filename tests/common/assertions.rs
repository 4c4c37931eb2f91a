//! Assertion macros for recorded wire requests.
//!
//! Requests captured by the fake service are kept as `serde_json::Value`, so
//! these check field presence the way the service sees it: an absent key, not
//! a `null`.

/// Assert that a recorded request has `key` with the expected JSON value.
///
/// ```rust
/// assert_request_field!(request, "sortDirection", "desc");
/// ```
#[macro_export]
macro_rules! assert_request_field {
    ($request:expr, $key:expr, $value:expr) => {{
        let request: &serde_json::Value = &$request;
        let key: &str = $key;
        let expected = serde_json::json!($value);
        match request.get(key) {
            Some(actual) if *actual == expected => {}
            Some(actual) => panic!(
                "assert_request_field! failed:\n  request[{:?}]\n  expected: {}\n  actual:   {}",
                key, expected, actual
            ),
            None => panic!(
                "assert_request_field! failed: {:?} not sent.\n  request: {}",
                key, request
            ),
        }
    }};
}

/// Assert that none of `keys` were sent.
///
/// ```rust
/// assert_request_omits!(request, "searchText", "logger");
/// ```
#[macro_export]
macro_rules! assert_request_omits {
    ($request:expr, $($key:expr),+ $(,)?) => {{
        let request: &serde_json::Value = &$request;
        $(
            if let Some(actual) = request.get($key) {
                panic!(
                    "assert_request_omits! failed: {:?} was sent as {}.\n  request: {}",
                    $key, actual, request
                );
            }
        )+
    }};
}
