//! Shared UI icons.

use console::Emoji;

// Status indicators
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK]");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR]");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[!]");
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "*");

// File indicators
pub static FILE_NEW: Emoji<'_, '_> = Emoji("📄 ", "+");
pub static FILE_DEL: Emoji<'_, '_> = Emoji("🗑️  ", "-");
pub static DRY_RUN: Emoji<'_, '_> = Emoji("👀 ", "[DRY]");
