//! CLI tool to create an administrator account.
//!
//! Usage:
//!   cargo run --bin create-admin -- --name "Park Ranger" --email ranger@example.com --password '...'

use std::env;

use wildlife_gallery_lib::auth;
use wildlife_gallery_lib::config::Config;
use wildlife_gallery_lib::db::{DbPool, admins};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let args: Vec<String> = env::args().collect();

    let mut name: Option<String> = None;
    let mut email: Option<String> = None;
    let mut password: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--name" | "-n" => {
                i += 1;
                name = args.get(i).cloned();
            }
            "--email" | "-e" => {
                i += 1;
                email = args.get(i).cloned();
            }
            "--password" | "-p" => {
                i += 1;
                password = args.get(i).cloned();
            }
            "--help" | "-h" => {
                print_usage();
                return;
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let (name, email, password) = match (name, email, password) {
        (Some(n), Some(e), Some(p)) if !n.trim().is_empty() && !e.trim().is_empty() => (n, e, p),
        _ => {
            eprintln!("Error: --name, --email and --password are required");
            print_usage();
            std::process::exit(1);
        }
    };

    if password.chars().count() < 8 {
        eprintln!("Error: password must be at least 8 characters");
        std::process::exit(1);
    }

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            std::process::exit(1);
        }
    };

    let pool = match DbPool::new(&config).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error connecting to database: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = pool.run_migrations().await {
        eprintln!("Error running migrations: {}", e);
        std::process::exit(1);
    }

    let password_hash = match auth::hash_password(&password) {
        Ok(h) => h,
        Err(e) => {
            eprintln!("Error hashing password: {}", e);
            std::process::exit(1);
        }
    };

    let admin = match admins::insert(pool.connection(), &name, &email, &password_hash).await {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Error creating admin: {}", e);
            std::process::exit(1);
        }
    };

    println!();
    println!("════════════════════════════════════════════════════════════════");
    println!("  Admin Created");
    println!("════════════════════════════════════════════════════════════════");
    println!();
    println!("  ID:      {}", admin.id);
    println!("  Name:    {}", admin.name);
    println!("  Email:   {}", admin.email);
    println!();
    println!("  Log in at POST /api/v1/auth/login with this email and password.");
    println!();
}

fn print_usage() {
    eprintln!();
    eprintln!("Usage: create-admin --name <NAME> --email <EMAIL> --password <PASSWORD>");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -n, --name <NAME>          Display name");
    eprintln!("  -e, --email <EMAIL>        Login email (stored lowercased)");
    eprintln!("  -p, --password <PASSWORD>  At least 8 characters");
    eprintln!("  -h, --help                 Show this help");
    eprintln!();
    eprintln!("Reads RUST_ENV and DATABASE_URL from the environment or a .env file.");
}
