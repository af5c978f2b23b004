use sidechat_host::config::AppConfig;
use sidechat_host::{app, logging};

fn main() {
    logging::initialize(logging::LogDestination::File);
    let config = AppConfig::from_env();
    if let Err(err) = app::run(config) {
        eprintln!("sidechat: {err}");
        std::process::exit(1);
    }
}
