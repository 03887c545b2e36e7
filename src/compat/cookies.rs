use std::sync::Arc;

use reqwest::cookie::Jar;

/// Empty cookie store, ready to hand to a client builder.
pub fn cookie_jar() -> Arc<Jar> {
    Arc::new(Jar::default())
}
