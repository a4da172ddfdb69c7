use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use nigori_engine::{Database, EngineConfig, EngineError, StorageEngine};
use nigori_store::InMemoryKvStore;
use nigori_types::{Revision, User};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let store = Arc::new(
        InMemoryKvStore::open_or_default(&cli.store)
            .with_context(|| format!("opening store {}", cli.store.display()))?,
    );
    let engine = StorageEngine::with_config(store.clone(), config)?;

    let dirty = match cli.command {
        Command::AddUser(args) => cmd_add_user(&engine, args)?,
        Command::HaveUser(args) => cmd_have_user(&engine, args)?,
        Command::GetUser(args) => cmd_get_user(&engine, args)?,
        Command::DeleteUser(args) => cmd_delete_user(&engine, args)?,
        Command::Put(args) => cmd_put(&engine, args)?,
        Command::Get(args) => cmd_get(&engine, args)?,
        Command::Update(args) => cmd_update(&engine, args)?,
        Command::Delete(args) => cmd_delete(&engine, args)?,
        Command::Revision(args) => cmd_revision(&engine, args)?,
        Command::History(args) => cmd_history(&engine, args)?,
    };

    if dirty {
        store
            .save_snapshot(&cli.store)
            .with_context(|| format!("saving store {}", cli.store.display()))?;
    }
    Ok(())
}

fn cmd_add_user(engine: &StorageEngine, args: UserArgs) -> anyhow::Result<bool> {
    let pk = parse_bytes(&args.public_key)?;
    let added = engine.add_user(&pk)?;
    if added {
        println!("{} Registered {}", "✓".green().bold(), args.public_key.bold());
    } else {
        println!("{} already registered", args.public_key.bold());
    }
    Ok(added)
}

fn cmd_have_user(engine: &StorageEngine, args: UserArgs) -> anyhow::Result<bool> {
    let pk = parse_bytes(&args.public_key)?;
    println!("{}", engine.have_user(&pk)?);
    Ok(false)
}

fn cmd_get_user(engine: &StorageEngine, args: UserArgs) -> anyhow::Result<bool> {
    let user = resolve_user(engine, &args.public_key)?;
    println!("User {}", user.id().short_id().cyan());
    println!("  Namespace:  {}", user.id().to_hex());
    println!("  Public key: {}", user.public_key().to_hex());
    println!("  Registered: {}", user.registered_at());
    Ok(false)
}

fn cmd_delete_user(engine: &StorageEngine, args: UserArgs) -> anyhow::Result<bool> {
    let pk = parse_bytes(&args.public_key)?;
    if !engine.have_user(&pk)? {
        println!("No registration for {}", args.public_key.bold());
        return Ok(false);
    }
    engine.delete_user(&engine.get_user(&pk)?)?;
    println!("{} Removed {}", "✓".green().bold(), args.public_key.bold());
    Ok(true)
}

fn cmd_put(engine: &StorageEngine, args: PutArgs) -> anyhow::Result<bool> {
    let user = resolve_user(engine, &args.public_key)?;
    let key = parse_bytes(&args.key)?;
    let revision = engine.write_record(&user, &key, &parse_bytes(&args.value)?)?;
    println!(
        "{} Wrote {} at {}",
        "✓".green().bold(),
        args.key.bold(),
        revision.to_string().yellow()
    );
    Ok(true)
}

fn cmd_get(engine: &StorageEngine, args: GetArgs) -> anyhow::Result<bool> {
    let user = resolve_user(engine, &args.public_key)?;
    let key = parse_bytes(&args.key)?;
    let value = match args.revision {
        Some(revision) => engine.get_record_at(&user, &key, revision)?,
        None => engine.get_record(&user, &key)?,
    };
    match value {
        Some(value) => println!("{}", render_bytes(&value)),
        None => println!("{}", "(absent)".dimmed()),
    }
    Ok(false)
}

fn cmd_update(engine: &StorageEngine, args: UpdateArgs) -> anyhow::Result<bool> {
    let user = resolve_user(engine, &args.public_key)?;
    let key = parse_bytes(&args.key)?;
    let value = parse_bytes(&args.value)?;
    let new_revision = match args.new_revision {
        Some(revision) => revision,
        None => args
            .expected
            .next()
            .context("expected revision has no successor")?,
    };

    match engine.try_update_record(&user, &key, &value, args.expected, new_revision) {
        Ok(revision) => {
            println!(
                "{} Updated {} to {}",
                "✓".green().bold(),
                args.key.bold(),
                revision.to_string().yellow()
            );
            Ok(true)
        }
        Err(EngineError::ConflictRejected { expected, actual }) => {
            println!(
                "{} Rejected: expected {}, current is {}",
                "✗".red().bold(),
                expected.to_string().yellow(),
                render_revision(actual).yellow()
            );
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

fn cmd_delete(engine: &StorageEngine, args: KeyArgs) -> anyhow::Result<bool> {
    let user = resolve_user(engine, &args.public_key)?;
    let deleted = engine.delete_record(&user, &parse_bytes(&args.key)?)?;
    if deleted {
        println!("{} Deleted {}", "✓".green().bold(), args.key.bold());
    } else {
        println!("Nothing to delete at {}", args.key.bold());
    }
    Ok(deleted)
}

fn cmd_revision(engine: &StorageEngine, args: KeyArgs) -> anyhow::Result<bool> {
    let user = resolve_user(engine, &args.public_key)?;
    let revision = engine.current_revision(&user, &parse_bytes(&args.key)?)?;
    println!("{}", render_revision(revision));
    Ok(false)
}

fn cmd_history(engine: &StorageEngine, args: KeyArgs) -> anyhow::Result<bool> {
    let user = resolve_user(engine, &args.public_key)?;
    let revisions = engine.revisions(&user, &parse_bytes(&args.key)?)?;
    if revisions.is_empty() {
        println!("{}", "(absent)".dimmed());
    }
    let last = revisions.len().saturating_sub(1);
    for (i, revision) in revisions.iter().enumerate() {
        if i == last {
            println!("{} {}", revision.to_string().yellow().bold(), "(current)".green());
        } else {
            println!("{}", revision.to_string().yellow());
        }
    }
    Ok(false)
}

fn resolve_user(engine: &StorageEngine, public_key: &str) -> anyhow::Result<User> {
    let pk = parse_bytes(public_key)?;
    engine
        .get_user(&pk)
        .with_context(|| format!("no user registered for {public_key}"))
}

/// Text is taken literally; `hex:` introduces hex-encoded bytes.
fn parse_bytes(arg: &str) -> anyhow::Result<Vec<u8>> {
    match arg.strip_prefix("hex:") {
        Some(encoded) => hex::decode(encoded).with_context(|| format!("invalid hex in {arg:?}")),
        None => Ok(arg.as_bytes().to_vec()),
    }
}

fn render_bytes(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) if !s.chars().any(char::is_control) => s.to_string(),
        _ => format!("hex:{}", hex::encode(bytes)),
    }
}

fn render_revision(revision: Option<Revision>) -> String {
    revision.map_or_else(|| "(absent)".to_string(), |r| r.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn run(store: &std::path::Path, args: &[&str]) -> anyhow::Result<()> {
        let mut argv = vec!["nigori", "--store", store.to_str().unwrap()];
        argv.extend_from_slice(args);
        run_command(Cli::parse_from(argv))
    }

    #[test]
    fn parse_bytes_text_and_hex() {
        assert_eq!(parse_bytes("abc").unwrap(), b"abc".to_vec());
        assert_eq!(parse_bytes("hex:00ff").unwrap(), vec![0x00, 0xff]);
        assert!(parse_bytes("hex:zz").is_err());
    }

    #[test]
    fn render_bytes_falls_back_to_hex() {
        assert_eq!(render_bytes(b"hello"), "hello");
        assert_eq!(render_bytes(&[0xff, 0x00]), "hex:ff00");
        assert_eq!(render_bytes(b"a\nb"), "hex:610a62");
    }

    #[test]
    fn render_missing_revision() {
        assert_eq!(render_revision(None), "(absent)");
        assert_eq!(render_revision(Some(Revision::new(2))), "r2");
    }

    #[test]
    fn state_persists_between_runs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.snap");

        run(&path, &["add-user", "pk1"]).unwrap();
        run(&path, &["put", "pk1", "k1", "v1"]).unwrap();
        run(&path, &["update", "pk1", "k1", "v2", "--expected", "r0"]).unwrap();

        let store = Arc::new(InMemoryKvStore::load_snapshot(&path).unwrap());
        let engine = StorageEngine::new(store);
        let user = engine.get_user(b"pk1").unwrap();
        assert_eq!(engine.get_record(&user, b"k1").unwrap(), Some(b"v2".to_vec()));
        assert_eq!(engine.current_revision(&user, b"k1").unwrap(), Some(Revision::new(1)));
    }

    #[test]
    fn commands_on_unknown_user_fail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.snap");
        assert!(run(&path, &["put", "ghost", "k", "v"]).is_err());
        assert!(!path.exists());
    }
}
