pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{dependency, dependent, header, module_line, success, warn};
pub use table::{modules_table, stats_table};
pub use theme::{EdgeKind, Theme, theme};
