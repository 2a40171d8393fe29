//! Log output of the translator crates
//!
//! The library only emits through the `log` facade. `kslc` and the tests
//! install a logger with [`init`] or [`init_test`]; both raise only the
//! translator's own modules, so a verbose run does not flood the output with
//! records from the crates underneath.
//!
//! | module | records |
//! |---|---|
//! | `compiler::factory` | source assembly (`info`), cache hits and misses (`debug`), failed stages (`error`) |
//! | `compiler::pipeline` | per-stage counts (`debug`), promoted warnings (`warn`) |
//! | `compiler::analyzer` | skipped declarations (`debug`) |
//! | `compiler::codegen` | token rewrites and Metal argument threading (`trace`) |
//! | `parser::preprocessor` | unterminated conditional blocks (`warn`) |
//!
//! `RUST_LOG` is applied last and wins over the level given here:
//!
//! ```bash
//! RUST_LOG=compiler::factory=debug kslc build --config factory.toml --descriptors shaders.json
//! ```

use env_logger::{Builder, Env};
use log::LevelFilter;
use std::io::Write;

/// Crates whose records follow the requested level
const TRANSLATOR_MODULES: &[&str] = &["compiler", "parser", "kslc"];

/// `env_logger` filter: dependencies at Warn, translator modules at `level`
fn filter_directives(level: LevelFilter) -> String {
    let mut directives = String::from("warn");
    for module in TRANSLATOR_MODULES {
        directives.push_str(&format!(",{}={}", module, level.as_str().to_ascii_lowercase()));
    }
    directives
}

/// Install the command-line logger; a second call keeps the first logger
pub fn init(level: LevelFilter) {
    let mut builder = Builder::new();
    builder
        .parse_filters(&filter_directives(level))
        .parse_env(Env::default())
        .format(|buf, record| {
            writeln!(
                buf,
                "[{:5}] {} - {}",
                record.level(),
                record.module_path().unwrap_or("kslc"),
                record.args()
            )
        });
    let _ = builder.try_init();
}

/// Logger for unit and integration tests, captured by the test harness
pub fn init_test() {
    let _ = Builder::new()
        .parse_filters(&filter_directives(LevelFilter::Warn))
        .parse_env(Env::default())
        .is_test(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_raises_translator_modules_only() {
        assert_eq!(
            filter_directives(LevelFilter::Debug),
            "warn,compiler=debug,parser=debug,kslc=debug"
        );
        assert_eq!(filter_directives(LevelFilter::Off), "warn,compiler=off,parser=off,kslc=off");
    }

    #[test]
    fn test_repeated_init_keeps_first_logger() {
        init_test();
        init(LevelFilter::Trace);
        log::debug!(target: "compiler::factory", "cache miss for test shader");
    }
}
