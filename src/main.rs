use clap::Parser;
use credvault::cli::{commands, output, Cli, Commands};

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init => commands::init(&cli),
        Commands::Add {
            ref service,
            ref username,
            ref secret,
            ref url,
            ref notes,
            ref tags,
        } => commands::add(
            &cli,
            service,
            username,
            secret.as_deref(),
            url.as_deref(),
            notes.as_deref(),
            tags.as_deref(),
        ),
        Commands::Get { ref id, copy } => commands::get(&cli, id, copy),
        Commands::List => commands::list(&cli),
        Commands::Search { ref query, ref tag } => commands::search(&cli, query.as_deref(), tag),
        Commands::Update {
            ref id,
            ref service,
            ref username,
            ref secret,
            ref url,
            ref notes,
            ref tags,
        } => commands::update(
            &cli,
            id,
            service.as_deref(),
            username.as_deref(),
            secret.as_deref(),
            url.as_deref(),
            notes.as_deref(),
            tags.as_deref(),
        ),
        Commands::Delete { ref id, force } => commands::delete(&cli, id, force),
        Commands::Passwd => commands::passwd(&cli),
        Commands::Export { ref output } => commands::export(&cli, output),
        Commands::Import { ref file } => commands::import(&cli, file),
        Commands::Audit { last } => commands::audit(&cli, last),
        Commands::Verify => commands::verify(&cli),
        Commands::Completions { ref shell } => commands::completions(shell),
    };

    if let Err(e) = result {
        output::error(&e.to_string());
        std::process::exit(1);
    }
}
