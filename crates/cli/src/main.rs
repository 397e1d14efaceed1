//! multisave binary

use multisave::tracing::{TracingConfig, init_tracing};
use multisave::{EXIT_FAILURE, EXIT_OK, cli, exit_code_for, render_error, run};

fn main() {
    // Tracing may be unusable while panicking
    #[allow(clippy::print_stderr)]
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panicked: {panic_info}");
        eprintln!("Internal error occurred. Run with RUST_LOG=debug for more information.");
    }));

    let cli = cli::parse();

    if let Err(e) = init_tracing(&TracingConfig::for_verbosity(cli.verbose, cli.log_format)) {
        #[allow(clippy::print_stderr)]
        {
            eprintln!("{e:?}");
        }
        std::process::exit(EXIT_FAILURE);
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create tokio runtime: {e}");
            std::process::exit(EXIT_FAILURE);
        }
    };

    let exit_code = match rt.block_on(run(&cli)) {
        Ok(_) => EXIT_OK,
        Err(e) => {
            let code = exit_code_for(&e);
            render_error(e);
            code
        }
    };
    std::process::exit(exit_code);
}
