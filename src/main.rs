use substation::prelude::*;

#[tokio::main]
async fn main() {
    let code = CliApp::new("substation").run(run_command).await;
    std::process::exit(code);
}

/// Read process settings once, then dispatch the command line
async fn run_command(ctx: CancellationToken) -> Result<(), AppError> {
    let settings = Settings::from_env()?;
    init_logging(&settings);

    let command = Command::parse(std::env::args().collect())?;
    command.execute(settings, ctx).await
}
