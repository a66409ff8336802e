mod utils;

pub use self::utils::{display_width, sanitize_text, truncate_display};
