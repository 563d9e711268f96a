use console::{Emoji, Style};
use std::sync::LazyLock;

pub static CHECK: Emoji<'_, '_> = Emoji("✅", "v");
pub static CROSS: Emoji<'_, '_> = Emoji("❌", "x");
pub static PACKAGE: Emoji<'_, '_> = Emoji("📦", "[]");
pub static WARN: Emoji<'_, '_> = Emoji("⚠", "!");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀", ">");
pub static DOT: Emoji<'_, '_> = Emoji("•", "-");

pub static BOLD: LazyLock<Style> = LazyLock::new(|| Style::new().bold());
pub static DIM: LazyLock<Style> = LazyLock::new(|| Style::new().dim());
pub static GREEN: LazyLock<Style> = LazyLock::new(|| Style::new().green());
pub static YELLOW: LazyLock<Style> = LazyLock::new(|| Style::new().yellow());
pub static RED: LazyLock<Style> = LazyLock::new(|| Style::new().red());
