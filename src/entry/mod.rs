pub mod parser;

pub use parser::{parse_line, parse_lines, LineFilter, LogEntry, ParseError};
