use crate::identifier::ModuleId;
use crate::ui::{EdgeKind, Icons, theme};
use owo_colors::OwoColorize;

pub fn header(text: &str) {
    println!("{} {}", Icons::ROCKET, text.style(theme().header.clone()));
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(theme().success.clone()));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, label.style(theme().warn.clone()));
}

/// A graph key with its number of dependencies
pub fn module_line(id: &ModuleId, deps: usize) {
    println!(
        "{} {} {}",
        Icons::PACKAGE,
        id.as_str().style(theme().module.clone()),
        format!("({} deps)", deps).style(theme().count.clone())
    );
}

/// One dependency edge below a module line
pub fn dependency(id: &ModuleId, kind: EdgeKind) {
    println!("   {} {}", kind.icon(), id.as_str().style(theme().edge(kind)));
}

/// A module reached at some distance, as in `dependents`
pub fn dependent(id: &ModuleId, distance: usize) {
    let icon = if distance == 1 { Icons::DIRECT } else { Icons::INDIRECT };
    println!(
        "{} {} {}",
        icon,
        id,
        format!("(depth: {})", distance).style(theme().count.clone())
    );
}
