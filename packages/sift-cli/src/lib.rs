use clap::builder::{
	Styles,
	styling::{AnsiColor, Effects},
};

/// Shared `--version` string for every sift binary.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Help colors shared by every sift binary.
pub fn styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Cyan.on_default() | Effects::BOLD)
		.usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
		.literal(AnsiColor::Blue.on_default() | Effects::BOLD)
		.placeholder(AnsiColor::Green.on_default())
}
