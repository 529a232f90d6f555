//!
//! policyhub CLI binary
//! ---------------------
//! Command-line tool for a running policyhub server. `login` prints a token;
//! policy commands take it from `--token` or `POLICYHUB_TOKEN`.

use std::env;

use anyhow::{anyhow, Context, Result};
use serde_json::{json, Map, Value};

use policyhub::client::HttpSession;
use policyhub::config::log_filter;

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--url <base>] [--token <t>] <command> [args]\n\nCommands:\n  register <email> <password>          create an account\n  login <email> <password>             print an access token\n  create <name> <roleNumber>           create a policy\n  list                                 list all policies\n  get <id>                             show one policy\n  update <id> [--name N] [--role-number R] [--enabled true|false]\n  delete <id>                          delete a policy\n\nFlags:\n  --url <base>     Server base URL (env: POLICYHUB_URL, default http://127.0.0.1:3000)\n  --token <t>      Bearer token for policy commands (env: POLICYHUB_TOKEN)\n  -h, --help       Show this help\n\nExamples:\n  {program} register someone@example.com s3cret\n  {program} --token $({program} login someone@example.com s3cret) create \"Car cover\" 3"
    );
}

fn arg(rest: &[String], i: usize, what: &str) -> Result<String> {
    rest.get(i).cloned().ok_or_else(|| anyhow!("missing {}", what))
}

fn parse_number(s: &str) -> Result<Value> {
    let n: serde_json::Number = s.parse().with_context(|| format!("'{}' is not a number", s))?;
    Ok(Value::Number(n))
}

fn update_fields(rest: &[String]) -> Result<Value> {
    let mut out = Map::new();
    let mut i = 0;
    while i < rest.len() {
        let val = arg(rest, i + 1, &format!("value for {}", rest[i]))?;
        match rest[i].as_str() {
            "--name" => { out.insert("name".into(), Value::String(val)); }
            "--role-number" => { out.insert("roleNumber".into(), parse_number(&val)?); }
            "--enabled" => {
                let b: bool = val.parse().with_context(|| format!("'{}' is not true/false", val))?;
                out.insert("enabled".into(), Value::Bool(b));
            }
            other => return Err(anyhow!("unknown update flag '{}'", other)),
        }
        i += 2;
    }
    Ok(Value::Object(out))
}

fn print_json(v: &Value) {
    println!("{}", serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string()));
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(log_filter(env::var("RUST_LOG").ok().as_deref()))
        .try_init();

    let mut args: Vec<String> = env::args().collect();
    let program = args.remove(0);
    let mut url = env::var("POLICYHUB_URL").unwrap_or_else(|_| "http://127.0.0.1:3000".to_string());
    let mut token = env::var("POLICYHUB_TOKEN").ok();

    let mut rest: Vec<String> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => { print_usage(&program); return Ok(()); }
            "--url" => { url = arg(&args, i + 1, "value for --url")?; i += 2; }
            "--token" => { token = Some(arg(&args, i + 1, "value for --token")?); i += 2; }
            _ => { rest.extend_from_slice(&args[i..]); break; }
        }
    }
    if rest.is_empty() {
        print_usage(&program);
        std::process::exit(2);
    }

    let mut session = HttpSession::new(&url)?;
    if let Some(t) = token { session.set_token(t); }
    let cmd = rest.remove(0);
    match cmd.as_str() {
        "register" => {
            let email = session.register(&arg(&rest, 0, "email")?, &arg(&rest, 1, "password")?).await?;
            println!("registered {}", email);
        }
        "login" => {
            let tok = session.login(&arg(&rest, 0, "email")?, &arg(&rest, 1, "password")?).await?;
            println!("{}", tok);
        }
        "create" => {
            let fields = json!({"name": arg(&rest, 0, "name")?, "roleNumber": parse_number(&arg(&rest, 1, "roleNumber")?)?});
            print_json(&session.create_policy(fields).await?);
        }
        "list" => print_json(&Value::Array(session.list_policies().await?)),
        "get" => print_json(&session.get_policy(&arg(&rest, 0, "id")?).await?),
        "update" => {
            let id = arg(&rest, 0, "id")?;
            print_json(&session.update_policy(&id, update_fields(&rest[1..])?).await?);
        }
        "delete" => print_json(&session.delete_policy(&arg(&rest, 0, "id")?).await?),
        other => {
            eprintln!("unknown command '{}'", other);
            print_usage(&program);
            std::process::exit(2);
        }
    }
    Ok(())
}
