/// Release version, overridable at build time through `SITEWATCH_VERSION`.
pub const VERSION: &str = match option_env!("SITEWATCH_VERSION") {
    Some(val) => val,
    None => env!("CARGO_PKG_VERSION"),
};

/// User agent sent with every outgoing HTTP request.
pub const USER_AGENT: &str = concat!("sitewatch/", env!("CARGO_PKG_VERSION"));
