pub struct Icons;

impl Icons {
    pub const ROCKET: &str = "🚀";
    pub const CHECK: &str = "✅";
    pub const WARN: &str = "⚠️";
    pub const STATS: &str = "📊";
    pub const LINK: &str = "🔗";
    pub const PACKAGE: &str = "📦";
    pub const HOLE: &str = "🕳️";
    pub const PLUG: &str = "🔌";
    pub const DIRECT: &str = "🔴";
    pub const INDIRECT: &str = "🟠";
}
