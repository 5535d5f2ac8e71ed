pub mod capi;
pub mod encoder;
pub mod registry;

/// Install a `pretty_env_logger` logger. `RUST_LOG` defaults to `trace`.
#[no_mangle]
pub extern "C" fn rtenc_enable_log_tracing() {
    let log_env_var_name = "RUST_LOG";
    let log_env_var_level = "trace";
    if std::env::var(log_env_var_name).is_err() {
        std::env::set_var(log_env_var_name, log_env_var_level);
    }
    _ = pretty_env_logger::try_init();
    log::set_max_level(log::LevelFilter::Trace);
}
