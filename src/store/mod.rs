pub mod orders;
pub mod session;

pub use orders::OrderStore;
pub use session::SessionStore;

/// Server messages can arrive empty; user-facing error slots never do.
pub(crate) fn or_fallback(message: String, fallback: &str) -> String {
    if message.is_empty() {
        fallback.to_string()
    } else {
        message
    }
}
