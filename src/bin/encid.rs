//! encid command-line tool
//!
//! Usage:
//!   encid [--keystore PATH] [--key-length N] enc [-50] TYPE N
//!   encid [--keystore PATH] [--key-length N] dec [-50] KEYID STRING
//!   encid [--keystore PATH] [--key-length N] newkey TYPE

use std::fs;
use std::process::ExitCode;
use std::str::FromStr;

use encid::{Config, SqliteKeyStore};
use tracing::info;
use tracing_subscriber::EnvFilter;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn print_usage() {
    eprintln!(
        r#"encid - encrypt integer IDs into short strings

USAGE:
    encid [OPTIONS] <COMMAND>

COMMANDS:
    enc [-50] TYPE N          Encode N with a key of TYPE, creating one if needed
    dec [-50] KEYID STRING    Decode STRING with key KEYID
    newkey TYPE               Create a new key of TYPE

OPTIONS:
    --keystore PATH           Keystore file (default: ${}, or encid/keystore.db
                              in the user config directory)
    --key-length N            Length of new keys: 16, 24 or 32 (default: 16)
    -50                       Use base 50 instead of base 30
    -h, --help                Print this help"#,
        encid::KEYSTORE_ENV
    );
}

fn run(args: &[String]) -> CliResult<()> {
    let mut path = None;
    let mut key_length = None;
    let mut rest = args;
    loop {
        match rest.first().map(String::as_str) {
            Some("--keystore") => {
                path = Some(rest.get(1).ok_or("--keystore requires a path")?.clone());
                rest = &rest[2..];
            }
            Some("--key-length") => {
                let n = rest.get(1).ok_or("--key-length requires a number")?;
                key_length = Some(parse_arg::<usize>("key length", n)?);
                rest = &rest[2..];
            }
            Some("-h") | Some("--help") => {
                print_usage();
                return Ok(());
            }
            _ => break,
        }
    }

    let Some((cmd, rest)) = rest.split_first() else {
        print_usage();
        return Err("missing command".into());
    };

    let mut config = match path {
        Some(path) => Config::new(path),
        None => Config::from_env()?,
    };
    if let Some(n) = key_length {
        config = config.key_length(n)?;
    }
    if let Some(dir) = config.path().parent() {
        fs::create_dir_all(dir)
            .map_err(|e| format!("creating directory {}: {}", dir.display(), e))?;
    }
    let store = SqliteKeyStore::open(&config)
        .map_err(|e| format!("opening {}: {}", config.path().display(), e))?;

    match cmd.as_str() {
        "enc" => cmd_enc(&store, rest),
        "dec" => cmd_dec(&store, rest),
        "newkey" => cmd_newkey(&store, rest),
        other => {
            print_usage();
            Err(format!("unknown command '{}'", other).into())
        }
    }
}

fn parse_arg<T>(what: &str, s: &str) -> CliResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    s.parse()
        .map_err(|e| format!("invalid {} '{}': {}", what, s, e).into())
}

fn split_base50(args: &[String]) -> (bool, &[String]) {
    match args.split_first() {
        Some((flag, rest)) if flag == "-50" => (true, rest),
        _ => (false, args),
    }
}

fn cmd_enc(store: &SqliteKeyStore, args: &[String]) -> CliResult<()> {
    let (fifty, args) = split_base50(args);
    let [typ, n] = args else {
        return Err("usage: enc [-50] TYPE N".into());
    };
    let typ = parse_arg::<i32>("type", typ)?;
    let n = parse_arg::<i64>("number", n)?;

    let encode = |typ, n| {
        if fifty {
            encid::encode50(store, typ, n)
        } else {
            encid::encode(store, typ, n)
        }
    };

    let id = match encode(typ, n) {
        Err(e) if e.is_not_found() => {
            let key_id = store.create_key(typ)?;
            info!(typ, key_id, "created key for type");
            encode(typ, n)?
        }
        other => other?,
    };

    println!("{}", id);
    Ok(())
}

fn cmd_dec(store: &SqliteKeyStore, args: &[String]) -> CliResult<()> {
    let (fifty, args) = split_base50(args);
    let [key_id, input] = args else {
        return Err("usage: dec [-50] KEYID STRING".into());
    };
    let key_id = parse_arg::<i64>("key ID", key_id)?;

    let decoded = if fifty {
        encid::decode50(store, key_id, input)?
    } else {
        encid::decode(store, key_id, input)?
    };

    println!("{} {}", decoded.typ, decoded.n);
    Ok(())
}

fn cmd_newkey(store: &SqliteKeyStore, args: &[String]) -> CliResult<()> {
    let [typ] = args else {
        return Err("usage: newkey TYPE".into());
    };
    let typ = parse_arg::<i32>("type", typ)?;
    let key_id = store.create_key(typ)?;
    println!("{}", key_id);
    Ok(())
}
