mod io_utils;
mod literal;
pub mod math;
mod readers;
mod util;

pub use io_utils::create_writer;
pub use literal::{parse_literal, Literal};
pub use readers::{list_event_files, load_events, open_events_reader, read_ranked_events};
pub use util::{handle_error_and_exit, Result};
