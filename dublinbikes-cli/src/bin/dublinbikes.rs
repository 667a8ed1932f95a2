use dublinbikes::{Config, TripClient};
use dublinbikes_cli::pretty::pp_trips;
use dublinbikes_cli::*;

use anyhow::Context;
use colored_json::to_colored_json_auto;
use log::{self, debug};
use std::io::Write;
use std::time::Duration;
use structopt::StructOpt;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

#[derive(StructOpt)]
#[structopt(
    rename_all = "kebab-case",
    about = "Lists the trip history of a Dublin Bikes account"
)]
struct Opt {
    /// Account id, as shown on the dublinbikes.ie account page
    #[structopt(long = "--account-id", alias = "account_id", env = "ACCOUNT_ID")]
    account_id: Option<String>,

    #[structopt(long = "--account-email", alias = "account_email", env = "ACCOUNT_EMAIL")]
    account_email: Option<String>,

    #[structopt(
        long = "--account-password",
        alias = "account_password",
        env = "ACCOUNT_PASSWORD",
        hide_env_values = true
    )]
    account_password: Option<String>,

    #[structopt(
        long = "--api-host",
        env = "DUBLINBIKES_API_HOST",
        default_value = dublinbikes::config::DEFAULT_API_BASE
    )]
    api_host: String,

    /// Contract (city) the account belongs to
    #[structopt(
        long = "--contract",
        env = "DUBLINBIKES_CONTRACT",
        default_value = dublinbikes::config::DEFAULT_CONTRACT
    )]
    contract: String,

    /// HTTP request timeout, in seconds
    #[structopt(
        long = "--timeout",
        default_value = "30",
        parse(try_from_str = parse_timeout_secs)
    )]
    timeout: u64,

    /// Print trips as JSON instead of a listing
    #[structopt(long = "--json")]
    json: bool,

    /// Log more messages. Pass multiple times for ever more verbosity
    ///
    /// By default, it'll only report errors. Passing `-v` one time also prints
    /// warnings, `-vv` enables info logging, `-vvv` debug, and `-vvvv` trace.
    #[structopt(long, short = "v", parse(from_occurrences))]
    verbose: i8,

    #[structopt(long = "--shell-completions", hidden = true)]
    shell_completions: Option<structopt::clap::Shell>,
}

fn main() -> Result<()> {
    // a missing .env is fine; anything it sets shows up as env defaults below
    dotenvy::dotenv().ok();
    let opt = Opt::from_args();

    let log_level = match opt.verbose {
        std::i8::MIN..=-1 => "none",
        0 => "error",
        1 => "warn",
        2 => "info",
        3 => "debug",
        4..=std::i8::MAX => "trace",
    };
    // hyper logging is very verbose, so crank that down even if everything else is more verbose
    let log_filter = format!("{},hyper=error", log_level);
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_filter))
        .format_timestamp(None)
        .init();

    debug!("Args parsed, starting up");

    #[cfg(windows)]
    colored_json::enable_ansi_support();

    if let Some(shell) = opt.shell_completions {
        Opt::clap().gen_completions_to("dublinbikes", shell, &mut std::io::stdout());
        std::process::exit(0);
    }

    if let Err(err) = run(opt) {
        // Be graceful about some errors
        if let Some(io_err) = err.root_cause().downcast_ref::<std::io::Error>() {
            if let std::io::ErrorKind::BrokenPipe = io_err.kind() {
                // presumably due to something like writing to stdout and piped to `head -n10` and
                // stdout was closed
                debug!("got BrokenPipe error, assuming stdout closed as expected and exiting with success");
                std::process::exit(0);
            }
        }
        let mut color_stderr = StandardStream::stderr(if atty::is(atty::Stream::Stderr) {
            ColorChoice::Auto
        } else {
            ColorChoice::Never
        });
        color_stderr.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
        writeln!(&mut color_stderr, "Error: {:?}", err)?;
        color_stderr.reset()?;
        std::process::exit(1);
    }
    Ok(())
}

fn run(opt: Opt) -> Result<()> {
    let credentials =
        credentials_from_args(opt.account_id, opt.account_email, opt.account_password)?;
    let config = Config {
        api_base: opt.api_host,
        contract: opt.contract,
        timeout: Duration::from_secs(opt.timeout),
        ..Default::default()
    };

    let mut client =
        TripClient::connect(config, credentials).context("Error initializing client")?;
    let trips = client.fetch_trips().context("Error getting trips")?;

    if opt.json {
        let val = serde_json::to_value(&trips)?;
        writeln!(&mut std::io::stdout(), "{}", to_colored_json_auto(&val)?)?;
    } else {
        let mut stdout = StandardStream::stdout(if atty::is(atty::Stream::Stdout) {
            ColorChoice::Auto
        } else {
            ColorChoice::Never
        });
        pp_trips(&mut stdout, &trips)?;
    }
    Ok(())
}
