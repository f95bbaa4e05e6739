use lingofeed::app::{Command, DEFAULT_LIMIT};

const HELP: &str = "Lingofeed - short-video English practice feed, headless.

  --version, -V              Show version and exit
  --help,    -h              Show this help message
  --feed [N]                 Print the first N cards of the feed (default 10)
  --demo [N]                 Same, against built-in sample videos
  --login EMAIL PASSWORD     Sign in and remember the session
  --logout                   Forget the saved session
  --dictionary               List your saved words (requires sign-in)

Logging goes to stderr; set RUST_LOG (default lingofeed=info).";

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match parse_args(&args) {
        Ok(Some(command)) => command,
        Ok(None) => return,
        Err(message) => {
            eprintln!("error: {message}\n\n{HELP}");
            std::process::exit(2);
        }
    };

    init_tracing();
    if let Err(err) = lingofeed::run(command) {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lingofeed=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// `Ok(None)` means an informational flag was handled and there is nothing
/// left to run.
fn parse_args(args: &[String]) -> Result<Option<Command>, String> {
    let mut iter = args.iter().peekable();
    let mut command = None;
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("Lingofeed {}", lingofeed::VERSION);
                return Ok(None);
            }
            "--help" | "-h" => {
                println!("{HELP}");
                return Ok(None);
            }
            "--feed" | "--demo" => {
                let limit = match iter.peek() {
                    Some(next) if !next.starts_with('-') => {
                        let value = iter.next().map(String::as_str).unwrap_or_default();
                        value
                            .parse::<usize>()
                            .map_err(|_| format!("invalid card count: {value}"))?
                    }
                    _ => DEFAULT_LIMIT,
                };
                command = Some(if arg == "--feed" {
                    Command::Feed { limit }
                } else {
                    Command::Demo { limit }
                });
            }
            "--login" => {
                let email = iter.next().ok_or("--login needs EMAIL and PASSWORD")?;
                let password = iter.next().ok_or("--login needs EMAIL and PASSWORD")?;
                command = Some(Command::Login {
                    email: email.clone(),
                    password: password.clone(),
                });
            }
            "--logout" => command = Some(Command::Logout),
            "--dictionary" => command = Some(Command::Dictionary),
            other => return Err(format!("unknown argument: {other}")),
        }
    }
    Ok(Some(command.unwrap_or(Command::Feed {
        limit: DEFAULT_LIMIT,
    })))
}
