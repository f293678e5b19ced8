//! examkit CLI — the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

use commands::Context;

#[derive(Parser)]
#[command(name = "examkit", version, about = "Timed multiple-choice exams in the terminal")]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database URL, overriding the config (e.g. sqlite://exams.db)
    #[arg(long, global = true)]
    database: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a starter config and an example exam
    Init,

    /// Validate exam TOML files
    Validate {
        /// Path to an exam file or directory
        #[arg(long)]
        exams: PathBuf,
    },

    /// Publish exam TOML files (instructors only)
    Import {
        /// Path to an exam file or directory
        #[arg(long)]
        exams: PathBuf,

        #[arg(long)]
        user: String,

        #[arg(long)]
        password: String,
    },

    /// List exams with their question counts and results so far
    Exams,

    /// Take (or resume) an exam interactively
    Take {
        /// Exam id, as shown by `examkit exams`
        exam_id: i64,

        #[arg(long)]
        user: String,

        #[arg(long)]
        password: String,
    },

    /// List your submitted results, newest first
    Results {
        #[arg(long)]
        user: String,

        #[arg(long)]
        password: String,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Review one submitted result question by question
    Review {
        result_id: i64,

        #[arg(long)]
        user: String,

        #[arg(long)]
        password: String,
    },

    /// Exam statistics (instructors only)
    Stats {
        exam_id: i64,

        #[arg(long)]
        user: String,

        #[arg(long)]
        password: String,

        /// Also write an HTML report to this path
        #[arg(long)]
        html: Option<PathBuf>,
    },

    /// Create an account
    Register {
        #[arg(long)]
        username: String,

        #[arg(long)]
        password: String,

        /// Display name
        #[arg(long)]
        name: String,

        /// student or instructor
        #[arg(long, default_value = "student")]
        role: String,
    },

    /// Log out, discarding every in-progress attempt
    Logout {
        #[arg(long)]
        user: String,

        #[arg(long)]
        password: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("examkit_core=warn".parse().unwrap())
                .add_directive("examkit_store=warn".parse().unwrap())
                .add_directive("examkit=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init => commands::init::execute(),
        Commands::Validate { exams } => commands::validate::execute(exams),
        command => match Context::load(cli.config, cli.database) {
            Ok(ctx) => run(&ctx, command).await,
            Err(e) => Err(e),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(ctx: &Context, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Import {
            exams,
            user,
            password,
        } => commands::import::execute(ctx, exams, user, password).await,
        Commands::Exams => commands::exams::execute(ctx).await,
        Commands::Take {
            exam_id,
            user,
            password,
        } => commands::take::execute(ctx, exam_id, user, password).await,
        Commands::Results {
            user,
            password,
            json,
        } => commands::results::execute(ctx, user, password, json).await,
        Commands::Review {
            result_id,
            user,
            password,
        } => commands::review::execute(ctx, result_id, user, password).await,
        Commands::Stats {
            exam_id,
            user,
            password,
            html,
        } => commands::stats::execute(ctx, exam_id, user, password, html).await,
        Commands::Register {
            username,
            password,
            name,
            role,
        } => commands::register::execute(ctx, username, password, name, role).await,
        Commands::Logout { user, password } => {
            commands::logout::execute(ctx, user, password).await
        }
        Commands::Init | Commands::Validate { .. } => Ok(()),
    }
}
