mod app;
pub use app::App;

use gazex_experiment::ExperimentConfig;

const CONFIG_ENV: &str = "GAZEX_CONFIG";

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::var_os(CONFIG_ENV) {
        Some(path) => ExperimentConfig::load(path)?,
        None => {
            let config = ExperimentConfig::default();
            config.validate()?;
            config
        }
    };

    let app = App::new(config)?;
    let code = app.run()?;
    if code != 0 {
        std::process::exit(code);
    }

    Ok(())
}
