//! ANSI cursor helpers used by the terminal stage.
//!
//! Wrapping the escape sequences here keeps the painting code free of
//! hand-rolled escape strings.

const CSI: &str = "\x1b[";

/// Move the cursor to an absolute 1-based `row` and `column`.
pub fn move_to(row: u16, column: u16) -> String {
    format!("{CSI}{row};{column}H")
}

/// Clear the entire screen.
pub fn clear_all() -> &'static str {
    "\x1b[2J"
}

/// Clear from the cursor to the end of the line.
pub fn clear_to_line_end() -> &'static str {
    "\x1b[K"
}

/// Hide the cursor.
pub fn hide() -> &'static str {
    "\x1b[?25l"
}

/// Show the cursor.
pub fn show() -> &'static str {
    "\x1b[?25h"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_position_is_well_formed() {
        assert_eq!(move_to(3, 5), "\x1b[3;5H");
    }
}
