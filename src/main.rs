use proctree::commands::Cli;
use proctree::utils::config_paths::Settings;
use proctree::utils::logger::init_logger;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = match Cli::try_parse_args_from(std::env::args_os()) {
        Ok(cli) => cli,
        Err(err) => err.exit(),
    };

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("{}", err.user_message());
            Settings::default()
        }
    };

    // 命令行参数优先于配置文件
    let log_level = cli.log_level.as_deref().or(settings.log_level.as_deref());
    if let Err(err) = init_logger(log_level, cli.log_file.clone()) {
        eprintln!("Failed to initialize logging: {err}");
    }

    match run(&cli, &settings) {
        Ok(output) => {
            if !output.is_empty() {
                println!("{output}");
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::debug!(category = ?err.category(), fatal = err.is_fatal(), "invocation failed");
            eprintln!("{}", err.user_message());
            ExitCode::from(1)
        }
    }
}

#[cfg(unix)]
fn run(cli: &Cli, settings: &Settings) -> proctree::ProcTreeResult<String> {
    proctree::commands::runner::run(cli, settings)
}

#[cfg(not(unix))]
fn run(cli: &Cli, _settings: &Settings) -> proctree::ProcTreeResult<String> {
    cli.invocation()?;
    Err(proctree::ProcTreeError::UnsupportedPlatform)
}
