use affiliate_hub::{Config, create_admin, init_tracing, purge_expired_sessions};

const ADMIN_PASSWORD_VAR: &str = "AFFILIATE_ADMIN_PASSWORD";
const USAGE_EXIT_CODE: i32 = 2;

fn print_usage(bin_name: &str) {
    eprintln!("Usage:");
    eprintln!("  {bin_name} purge-sessions");
    eprintln!("  {bin_name} create-admin <username> <email>   (password from {ADMIN_PASSWORD_VAR})");
}

#[derive(Debug, PartialEq)]
enum Command {
    PurgeSessions,
    CreateAdmin { username: String, email: String },
}

fn parse_args(args: &[String]) -> Option<Command> {
    match args {
        [command] if command == "purge-sessions" => Some(Command::PurgeSessions),
        [command, username, email] if command == "create-admin" => Some(Command::CreateAdmin {
            username: username.clone(),
            email: email.clone(),
        }),
        _ => None,
    }
}

fn admin_password(raw: Option<String>) -> Option<String> {
    raw.filter(|password| !password.is_empty())
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let mut args = std::env::args();
    let bin_name = args.next().unwrap_or_else(|| "manage".to_string());
    let rest: Vec<String> = args.collect();

    let Some(command) = parse_args(&rest) else {
        print_usage(&bin_name);
        std::process::exit(USAGE_EXIT_CODE);
    };

    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to load configuration: {err}");
            std::process::exit(1);
        }
    };

    init_tracing(&config.logging.level, config.logging.json_format);

    match command {
        Command::PurgeSessions => match purge_expired_sessions(&config).await {
            Ok(deleted) => println!("Expired sessions purged: {deleted}"),
            Err(err) => {
                eprintln!("Session purge failed: {err}");
                std::process::exit(1);
            }
        },
        Command::CreateAdmin { username, email } => {
            let Some(password) = admin_password(std::env::var(ADMIN_PASSWORD_VAR).ok()) else {
                eprintln!("{ADMIN_PASSWORD_VAR} must be set");
                std::process::exit(USAGE_EXIT_CODE);
            };

            match create_admin(&config, &username, &email, &password).await {
                Ok(admin) => println!("Admin created: id={} username={}", admin.id, admin.username),
                Err(err) => {
                    eprintln!("Admin creation failed: {err}");
                    std::process::exit(1);
                }
            }
        }
    }
}
