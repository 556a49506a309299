use std::sync::Once;

static INIT: Once = Once::new();

/// Installs `env_logger` as the global logger. Only the first call has any
/// effect.
///
/// `filter` uses the `env_logger` syntax (`"glquad=debug"`). Without one,
/// `RUST_LOG` is used, and `info` if that is unset as well.
pub fn init_logging(filter: Option<&str>) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        match (filter, std::env::var("RUST_LOG")) {
            (Some(filter), _) => builder.parse_filters(filter),
            (None, Ok(filter)) => builder.parse_filters(&filter),
            (None, Err(_)) => builder.filter_level(log::LevelFilter::Info),
        };
        builder.write_style(env_logger::WriteStyle::Auto);
        builder.init();

        log::debug!("logging initialized");
    });
}
