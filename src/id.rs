//! ID generation utilities
//!
//! Record ids are `{prefix}-{timestamp_ms}-{random_hex}`.

use rand::Rng;

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn generate_id(prefix: &str) -> String {
    let random: u16 = rand::rng().random();
    format!("{}-{}-{:04x}", prefix, now_ms(), random)
}

/// Generate a project ID
///
/// Example: `prj-1738300800123-a1b2`
pub fn generate_project_id() -> String {
    generate_id("prj")
}

/// Generate a final review record ID
pub fn generate_review_id() -> String {
    generate_id("rev")
}

/// Generate a method evaluation record ID
pub fn generate_evaluation_id() -> String {
    generate_id("eval")
}
