use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use dedupe_api::{
    AddAccountRequest, AddContactRequest, CheckAccountRequest, CheckContactRequest, DedupeApi,
};
use dedupe_core::{AccountId, CheckError, ContactId, ProjectId};
use serde_json::Value;
use time::OffsetDateTime;
use ulid::Ulid;

const CLI_CONTRACT_VERSION: &str = "cli.v1";

#[derive(Debug, Parser)]
#[command(name = "dk")]
#[command(about = "Dedupe Kernel CLI")]
struct Cli {
    #[arg(long, default_value = "./dedupe_kernel.sqlite3")]
    db: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Db {
        #[command(subcommand)]
        command: DbCommand,
    },
    Account {
        #[command(subcommand)]
        command: AccountCommand,
    },
    Contact {
        #[command(subcommand)]
        command: ContactCommand,
    },
    Suppression {
        #[command(subcommand)]
        command: SuppressionCommand,
    },
    Check {
        #[command(subcommand)]
        command: CheckCommand,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommand {
    SchemaVersion,
    Migrate(DbMigrateArgs),
}

#[derive(Debug, Args)]
struct DbMigrateArgs {
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

#[derive(Debug, Subcommand)]
enum AccountCommand {
    Add(AddAccountArgs),
    List,
}

#[derive(Debug, Subcommand)]
enum ContactCommand {
    Add(AddContactArgs),
    List,
}

#[derive(Debug, Subcommand)]
enum SuppressionCommand {
    Account(AddAccountArgs),
    Contact(AddContactArgs),
}

#[derive(Debug, Subcommand)]
enum CheckCommand {
    Account(CheckAccountArgs),
    Contact(CheckContactArgs),
}

#[derive(Debug, Args)]
struct AddAccountArgs {
    #[arg(long)]
    project_id: String,
    #[arg(long)]
    company_name: String,
    #[arg(long)]
    website_domain: Option<String>,
    #[arg(long)]
    scrubbed_company_name: Option<String>,
    #[arg(long)]
    alias_company_name: Option<String>,
    #[arg(long)]
    company_name_tokens: Option<String>,
    #[arg(long)]
    created_at: Option<String>,
}

#[derive(Debug, Args)]
struct AddContactArgs {
    #[arg(long)]
    project_id: String,
    #[arg(long)]
    full_name: String,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    email_dedupe_key: Option<String>,
    #[arg(long)]
    phone_dedupe_key: Option<String>,
    #[arg(long)]
    company_dedupe_key: Option<String>,
    #[arg(long)]
    created_at: Option<String>,
}

#[derive(Debug, Args)]
struct CheckAccountArgs {
    #[arg(long)]
    account_id: Option<String>,
    #[arg(long, default_value_t = false)]
    skip_duplicate: bool,
    #[arg(long, default_value_t = false)]
    skip_suppression: bool,
}

#[derive(Debug, Args)]
struct CheckContactArgs {
    #[arg(long)]
    contact_id: Option<String>,
    #[arg(long, default_value_t = false)]
    skip_duplicate: bool,
    #[arg(long, default_value_t = false)]
    skip_suppression: bool,
}

fn with_contract_version(value: Value) -> Value {
    match value {
        Value::Object(mut object) => {
            object.insert(
                "contract_version".to_string(),
                Value::String(CLI_CONTRACT_VERSION.to_string()),
            );
            Value::Object(object)
        }
        other => serde_json::json!({
            "contract_version": CLI_CONTRACT_VERSION,
            "payload": other
        }),
    }
}

fn emit_json(value: Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&with_contract_version(value))?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let api = DedupeApi::new(cli.db);
    match cli.command {
        Command::Db { command } => run_db(command, &api),
        Command::Account { command } => run_account(command, &api),
        Command::Contact { command } => run_contact(command, &api),
        Command::Suppression { command } => run_suppression(command, &api),
        Command::Check { command } => run_check(command, &api),
    }
}

fn run_db(command: DbCommand, api: &DedupeApi) -> Result<()> {
    match command {
        DbCommand::SchemaVersion => {
            let status = api.schema_status()?;
            emit_json(serde_json::json!({
                "current_version": status.current_version,
                "target_version": status.target_version,
                "pending_versions": status.pending_versions,
                "up_to_date": status.pending_versions.is_empty()
            }))
        }
        DbCommand::Migrate(args) => {
            let result = api.migrate(args.dry_run)?;
            emit_json(serde_json::to_value(&result).context("failed to serialize migrate result")?)
        }
    }
}

fn run_account(command: AccountCommand, api: &DedupeApi) -> Result<()> {
    match command {
        AccountCommand::Add(args) => {
            let record = api.add_account(account_request(args)?)?;
            emit_json(serde_json::to_value(&record).context("failed to serialize account")?)
        }
        AccountCommand::List => {
            let accounts = api.list_accounts()?;
            emit_json(serde_json::json!({
                "count": accounts.len(),
                "accounts": accounts
            }))
        }
    }
}

fn run_contact(command: ContactCommand, api: &DedupeApi) -> Result<()> {
    match command {
        ContactCommand::Add(args) => {
            let record = api.add_contact(contact_request(args)?)?;
            emit_json(serde_json::to_value(&record).context("failed to serialize contact")?)
        }
        ContactCommand::List => {
            let contacts = api.list_contacts()?;
            emit_json(serde_json::json!({
                "count": contacts.len(),
                "contacts": contacts
            }))
        }
    }
}

fn run_suppression(command: SuppressionCommand, api: &DedupeApi) -> Result<()> {
    match command {
        SuppressionCommand::Account(args) => {
            let entry = api.suppress_account(account_request(args)?)?;
            emit_json(
                serde_json::to_value(&entry).context("failed to serialize suppression entry")?,
            )
        }
        SuppressionCommand::Contact(args) => {
            let entry = api.suppress_contact(contact_request(args)?)?;
            emit_json(
                serde_json::to_value(&entry).context("failed to serialize suppression entry")?,
            )
        }
    }
}

fn run_check(command: CheckCommand, api: &DedupeApi) -> Result<()> {
    match command {
        CheckCommand::Account(args) => {
            let request = CheckAccountRequest {
                account_id: args
                    .account_id
                    .as_deref()
                    .map(|raw| parse_ulid(raw, "account_id").map(AccountId))
                    .transpose()?,
                check_duplicate: !args.skip_duplicate,
                check_suppression: !args.skip_suppression,
            };
            match api.check_account(request) {
                Ok(result) => emit_json(
                    serde_json::to_value(&result).context("failed to serialize check result")?,
                ),
                Err(err) => emit_check_error(&err),
            }
        }
        CheckCommand::Contact(args) => {
            let request = CheckContactRequest {
                contact_id: args
                    .contact_id
                    .as_deref()
                    .map(|raw| parse_ulid(raw, "contact_id").map(ContactId))
                    .transpose()?,
                check_duplicate: !args.skip_duplicate,
                check_suppression: !args.skip_suppression,
            };
            match api.check_contact(request) {
                Ok(result) => emit_json(
                    serde_json::to_value(&result).context("failed to serialize check result")?,
                ),
                Err(err) => emit_check_error(&err),
            }
        }
    }
}

fn emit_check_error(err: &CheckError) -> Result<()> {
    emit_json(serde_json::json!({
        "error": {
            "code": err.code(),
            "message": err.to_string()
        }
    }))?;
    std::process::exit(1)
}

fn account_request(args: AddAccountArgs) -> Result<AddAccountRequest> {
    Ok(AddAccountRequest {
        project_id: ProjectId(parse_ulid(&args.project_id, "project_id")?),
        company_name: args.company_name,
        website_domain: args.website_domain,
        scrubbed_company_name: args.scrubbed_company_name,
        alias_company_name: args.alias_company_name,
        company_name_tokens: args.company_name_tokens,
        created_at: args.created_at.as_deref().map(parse_timestamp).transpose()?,
    })
}

fn contact_request(args: AddContactArgs) -> Result<AddContactRequest> {
    Ok(AddContactRequest {
        project_id: ProjectId(parse_ulid(&args.project_id, "project_id")?),
        full_name: args.full_name,
        email: args.email,
        email_dedupe_key: args.email_dedupe_key,
        phone_dedupe_key: args.phone_dedupe_key,
        company_dedupe_key: args.company_dedupe_key,
        created_at: args.created_at.as_deref().map(parse_timestamp).transpose()?,
    })
}

fn parse_ulid(raw: &str, field: &str) -> Result<Ulid> {
    Ulid::from_string(raw).map_err(|err| anyhow!("invalid {field} '{raw}': {err}"))
}

fn parse_timestamp(raw: &str) -> Result<OffsetDateTime> {
    OffsetDateTime::parse(raw, &time::format_description::well_known::Rfc3339)
        .with_context(|| format!("invalid RFC 3339 timestamp '{raw}'"))
}
