//! Shared UI icons and emojis.
//!
//! Each icon falls back to plain text on terminals without emoji support.

use console::Emoji;

// Status indicators
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK]");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR]");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[!]");
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "*");

// Lead indicators
pub static STAR: Emoji<'_, '_> = Emoji("⭐ ", "*");
pub static ROBOT: Emoji<'_, '_> = Emoji("🤖 ", "[AI]");
pub static TRASH: Emoji<'_, '_> = Emoji("🗑️  ", "-");
pub static OFFLINE: Emoji<'_, '_> = Emoji("📡 ", "[OFFLINE]");

// Funnel and tasks
pub static FUNNEL: Emoji<'_, '_> = Emoji("📊 ", "");
pub static TROPHY: Emoji<'_, '_> = Emoji("🏆 ", "[WON]");
pub static CLOCK: Emoji<'_, '_> = Emoji("⏱️  ", "[T]");
pub static PIN: Emoji<'_, '_> = Emoji("📌 ", "-");
pub static REFRESH: Emoji<'_, '_> = Emoji("🔄 ", "[SYNC]");
