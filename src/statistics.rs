//! Writing of statistics to stdout in a `name=value` format that downstream
//! benchmark tooling can scrape. The prefix is configured once at startup.

use once_cell::sync::OnceCell;

#[derive(Clone, Debug)]
struct StatisticOptions {
    prefix: &'static str,
    enabled: bool,
}

static STATISTIC_OPTIONS: OnceCell<StatisticOptions> = OnceCell::new();

/// Configure statistic logging. Calling this more than once has no effect.
pub fn configure_statistics(enabled: bool, prefix: &'static str) {
    let _ = STATISTIC_OPTIONS.set(StatisticOptions { prefix, enabled });
}

/// Log a single statistic, e.g. `c numberOfConflicts=42`.
pub fn log_statistic(name: &str, value: impl std::fmt::Display) {
    let options = STATISTIC_OPTIONS.get_or_init(|| StatisticOptions {
        prefix: "c ",
        enabled: false,
    });

    if options.enabled {
        println!("{}{name}={value}", options.prefix);
    }
}
