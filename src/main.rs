use clap::Parser;

use crossrelease::{
    cli::{self, Command},
    command,
    result::Result,
};

fn initialize_logger(debug: bool) -> Result<()> {
    let filter = if debug {
        simplelog::LevelFilter::Debug
    } else {
        simplelog::LevelFilter::Info
    };

    let config = simplelog::ConfigBuilder::new()
        .add_filter_allow_str("crossrelease")
        .build();

    simplelog::TermLogger::init(
        filter,
        config,
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli_args = cli::Args::parse();

    initialize_logger(cli_args.debug)?;

    match cli_args.command.clone() {
        Command::Changelog {
            project,
            release_version,
        } => command::changelog::execute(&cli_args, &project, &release_version),
        Command::StageRelease {
            branch,
            release_type,
            project,
            force,
        } => {
            let request = command::stage::StageRequest {
                branch,
                release_type,
                project,
                force,
            };
            command::stage::execute(&cli_args, request).await
        }
        Command::UploadRelease { branch } => {
            command::upload::execute(&cli_args, &branch).await
        }
        Command::PublishRelease { branch } => {
            command::publish::execute(&cli_args, &branch).await
        }
        Command::DeleteRelease { release_version } => {
            command::delete::execute(&cli_args, &release_version).await
        }
    }
}
