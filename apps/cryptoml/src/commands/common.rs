use cryptoml_application::config::Config;
use cryptoml_application::{parse_interval, resolve_build_config};

pub(super) fn print_config_summary(command: &str, config: &Config) -> Result<(), String> {
    println!(
        "cryptoml cli: {} (symbol={}, currency={}, interval={})",
        command, config.dataset.symbol, config.dataset.currency, config.dataset.interval
    );
    println!(
        "data: ticks_csv={}, ohlcv_csv={}, metrics_csv={}, out_dir={}",
        config.paths.ticks_csv.as_deref().unwrap_or("none"),
        config.paths.ohlcv_csv.as_deref().unwrap_or("none"),
        config.paths.metrics_csv.as_deref().unwrap_or("none"),
        config.paths.out_dir
    );

    let interval = parse_interval(config)?;
    let build = resolve_build_config(config, &interval)?;
    println!(
        "features: lags={} residual_period={} splines={} resample_periods={:?} volatility_windows={:?}",
        build.lags(),
        build.residual_period(),
        build.splines(),
        build.resample_periods(),
        build.volatility_windows()
    );
    Ok(())
}
