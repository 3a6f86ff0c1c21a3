use clap::Parser;
use form_reconciler::cli::commands::{SubmitArgs, cmd_reconcile, cmd_submit};
use form_reconciler::cli::config::{Cli, Commands, load_config};
use form_reconciler::init_tracing;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = load_config(cli.config.as_deref());

    match cli.command {
        Commands::Submit {
            page,
            form,
            index,
            url,
            set,
            strategy,
            reload_url,
            reload_target,
        } => {
            let args = SubmitArgs {
                page,
                form,
                index,
                url,
                set,
                strategy,
                reload_url,
                reload_target,
            };
            cmd_submit(&args, &config)?;
        }
        Commands::Reconcile { body, form } => {
            cmd_reconcile(&body, form.as_deref(), &config)?;
        }
    }

    Ok(())
}
