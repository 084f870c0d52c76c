//! hireloopctl - command-line client for the Hireloop scheduling daemon

mod format;
mod rpc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use format::{
    fmt_time, parse_time, parse_working_hours, rows, BusyRow, InterviewRow, SlotRow, UserRow,
};
use rpc::RpcClient;
use serde_json::{json, Map, Value};
use tabled::Table;

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:9610";

#[derive(Parser)]
#[command(name = "hireloopctl")]
#[command(about = "Hireloop scheduling engine CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// RPC server URL
    #[arg(long, env = "HIRELOOP_RPC_URL", default_value = DEFAULT_RPC_URL, global = true)]
    rpc_url: String,

    /// Tenant the command acts on
    #[arg(long, env = "HIRELOOP_TENANT", global = true)]
    tenant: Option<String>,

    /// Print raw JSON results
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a tenant
    TenantCreate {
        name: String,
    },

    /// Manage users
    #[command(subcommand)]
    User(UserCommand),

    /// Create a candidate
    CandidateCreate {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
    },

    /// Working hours and busy blocks
    #[command(subcommand)]
    Availability(AvailabilityCommand),

    /// Show or change the tenant's scheduling rule
    #[command(subcommand)]
    Rules(RulesCommand),

    /// Suggest interview slots
    Slots {
        /// Interviewers who must attend
        #[arg(long = "required", required = true)]
        required: Vec<String>,
        /// Interviewers who may attend
        #[arg(long = "optional")]
        optional: Vec<String>,
        /// Interview length in minutes
        #[arg(long, default_value = "60")]
        duration: u32,
        /// Window start (RFC 3339 or epoch ms)
        #[arg(long)]
        from: Option<String>,
        /// Window end (RFC 3339 or epoch ms)
        #[arg(long)]
        to: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
    },

    /// Schedule and manage interviews
    #[command(subcommand)]
    Interview(InterviewCommand),

    /// External calendar connections
    #[command(subcommand)]
    Calendar(CalendarCommand),

    /// Show system status
    Status,

    /// Run maintenance operations
    Maintenance {
        /// Force VACUUM even if not needed
        #[arg(long)]
        force_vacuum: bool,
    },
}

#[derive(Subcommand)]
enum UserCommand {
    Create {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long, value_enum, default_value = "interviewer")]
        role: Role,
        /// Offset of the user's local time from UTC in minutes
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        utc_offset: i32,
    },
    List,
}

#[derive(Clone, Copy, ValueEnum)]
enum Role {
    Admin,
    Recruiter,
    Interviewer,
}

impl Role {
    fn wire(self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Recruiter => "RECRUITER",
            Role::Interviewer => "INTERVIEWER",
        }
    }
}

#[derive(Subcommand)]
enum AvailabilityCommand {
    /// Replace working hours; no --day restores the defaults
    Hours {
        #[arg(long)]
        user: String,
        /// DAY=HH:MM-HH:MM, repeatable (e.g. mon=09:00-17:00)
        #[arg(long = "day")]
        days: Vec<String>,
    },
    BusyAdd {
        #[arg(long)]
        user: String,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
        #[arg(long)]
        title: Option<String>,
    },
    BusyList {
        #[arg(long)]
        user: String,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
    },
    BusyRemove {
        block_id: String,
    },
}

#[derive(Subcommand)]
enum RulesCommand {
    Get,
    Set {
        #[arg(long)]
        min_notice_minutes: Option<u32>,
        #[arg(long)]
        buffer_before_minutes: Option<u32>,
        #[arg(long)]
        buffer_after_minutes: Option<u32>,
        #[arg(long)]
        slot_increment_minutes: Option<u32>,
        #[arg(long)]
        max_days_ahead: Option<u32>,
        #[arg(long)]
        max_interviews_per_day: Option<u32>,
        #[arg(long)]
        max_suggestions: Option<u32>,
        #[arg(long)]
        max_slots_per_day: Option<u32>,
        #[arg(long)]
        reminder_lead_minutes: Option<u32>,
    },
}

#[derive(Subcommand)]
enum InterviewCommand {
    Schedule {
        #[arg(long)]
        candidate: String,
        #[arg(long = "interviewer", required = true)]
        interviewers: Vec<String>,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
        #[arg(long)]
        title: Option<String>,
    },
    Reschedule {
        interview_id: String,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
    },
    Confirm {
        interview_id: String,
    },
    Complete {
        interview_id: String,
    },
    Cancel {
        interview_id: String,
    },
    Get {
        interview_id: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Provider {
    Google,
    Microsoft,
}

#[derive(Subcommand)]
enum CalendarCommand {
    /// Start an OAuth authorization and print the consent URL
    Connect {
        #[arg(long)]
        user: String,
        #[arg(long, value_enum)]
        provider: Provider,
    },
    /// Finish an authorization with the provider's redirect parameters
    Callback {
        #[arg(long)]
        state: String,
        #[arg(long)]
        code: String,
    },
    Sync {
        connection_id: String,
    },
    Disconnect {
        connection_id: String,
    },
}

impl Cli {
    fn tenant(&self) -> Result<String> {
        self.tenant
            .clone()
            .context("--tenant (or HIRELOOP_TENANT) is required for this command")
    }
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn success(message: impl AsRef<str>) {
    println!("{}", format!("✓ {}", message.as_ref()).green().bold());
}

fn print_interview(result: &Value) {
    println!(
        "{}",
        Table::new(vec![InterviewRow::from(result)]).to_string()
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = RpcClient::new(cli.rpc_url.clone());

    match &cli.command {
        Commands::TenantCreate { name } => {
            let result = client
                .call("tenant.create.v1", json!({ "name": name }))
                .await?;
            if cli.json {
                return print_json(&result);
            }
            success(format!("Tenant created: {}", result["id"].as_str().unwrap_or("-")));
        }

        Commands::User(UserCommand::Create {
            email,
            name,
            role,
            utc_offset,
        }) => {
            let params = json!({
                "tenant_id": cli.tenant()?,
                "email": email,
                "name": name,
                "role": role.wire(),
                "utc_offset_minutes": utc_offset,
            });
            let result = client.call("user.create.v1", params).await?;
            if cli.json {
                return print_json(&result);
            }
            success("User created");
            println!("{}", Table::new(vec![UserRow::from(&result)]).to_string());
        }

        Commands::User(UserCommand::List) => {
            let result = client
                .call("user.list.v1", json!({ "tenant_id": cli.tenant()? }))
                .await?;
            if cli.json {
                return print_json(&result);
            }
            let users: Vec<UserRow> = rows(&result, "users");
            if users.is_empty() {
                println!("{}", "No users".yellow());
            } else {
                println!("{}", Table::new(users).to_string());
            }
        }

        Commands::CandidateCreate { name, email } => {
            let params = json!({
                "tenant_id": cli.tenant()?,
                "name": name,
                "email": email,
            });
            let result = client.call("candidate.create.v1", params).await?;
            if cli.json {
                return print_json(&result);
            }
            success(format!(
                "Candidate created: {}",
                result["id"].as_str().unwrap_or("-")
            ));
        }

        Commands::Availability(cmd) => availability(&cli, &client, cmd).await?,

        Commands::Rules(RulesCommand::Get) => {
            let result = client
                .call("rules.get.v1", json!({ "tenant_id": cli.tenant()? }))
                .await?;
            print_json(&result)?;
        }

        Commands::Rules(RulesCommand::Set {
            min_notice_minutes,
            buffer_before_minutes,
            buffer_after_minutes,
            slot_increment_minutes,
            max_days_ahead,
            max_interviews_per_day,
            max_suggestions,
            max_slots_per_day,
            reminder_lead_minutes,
        }) => {
            let mut params = Map::new();
            params.insert("tenant_id".into(), json!(cli.tenant()?));
            for (key, value) in [
                ("min_notice_minutes", min_notice_minutes),
                ("buffer_before_minutes", buffer_before_minutes),
                ("buffer_after_minutes", buffer_after_minutes),
                ("slot_increment_minutes", slot_increment_minutes),
                ("max_days_ahead", max_days_ahead),
                ("max_interviews_per_day", max_interviews_per_day),
                ("max_suggestions", max_suggestions),
                ("max_slots_per_day", max_slots_per_day),
                ("reminder_lead_minutes", reminder_lead_minutes),
            ] {
                if let Some(v) = value {
                    params.insert(key.into(), json!(v));
                }
            }
            let result = client.call("rules.set.v1", Value::Object(params)).await?;
            if !cli.json {
                success("Scheduling rule saved");
            }
            print_json(&result)?;
        }

        Commands::Slots {
            required,
            optional,
            duration,
            from,
            to,
            limit,
        } => {
            let params = json!({
                "tenant_id": cli.tenant()?,
                "required_participants": required,
                "optional_participants": optional,
                "duration_minutes": duration,
                "window_start": from.as_deref().map(parse_time).transpose()?,
                "window_end": to.as_deref().map(parse_time).transpose()?,
                "limit": limit,
            });
            let result = client.call("slots.suggest.v1", params).await?;
            if cli.json {
                return print_json(&result);
            }
            let slots: Vec<SlotRow> = rows(&result, "slots");
            if slots.is_empty() {
                println!("{}", "No free slots in the window".yellow());
            } else {
                println!("{}", format!("{} slot(s) found", slots.len()).cyan().bold());
                println!("{}", Table::new(slots).to_string());
            }
        }

        Commands::Interview(cmd) => interview(&cli, &client, cmd).await?,

        Commands::Calendar(cmd) => calendar(&cli, &client, cmd).await?,

        Commands::Status => {
            println!("{}", "System Status".cyan().bold());
            println!();

            match client.call("admin.stats.v1", json!({})).await {
                Ok(stats) => {
                    if cli.json {
                        return print_json(&stats);
                    }
                    println!("  {} {}", "RPC URL:".bold(), client.url());
                    println!("  {} {}", "Status:".bold(), "ONLINE".green());
                    println!();
                    if let Some(queues) = stats["queues"].as_array() {
                        for q in queues {
                            println!(
                                "  {} queued {}, running {}",
                                format!("{}:", q["queue"].as_str().unwrap_or("?")).bold(),
                                q["queued"],
                                q["running"]
                            );
                        }
                    }
                    println!("  {} {}", "Total Jobs:".bold(), stats["total_jobs"]);
                    println!("  {} {}", "Interviews:".bold(), stats["interviews"]);
                    println!("  {} {}", "Busy Blocks:".bold(), stats["busy_blocks"]);
                    println!();
                    let db_mb =
                        stats["db_size_bytes"].as_i64().unwrap_or(0) as f64 / (1024.0 * 1024.0);
                    println!("  {} {:.2} MB", "DB Size:".bold(), db_mb);
                    println!("  {} {} seconds", "Uptime:".bold(), stats["uptime_seconds"]);
                }
                Err(e) => {
                    println!("  {} {}", "Status:".bold(), "ERROR".red());
                    println!("  {} {}", "Error:".bold(), e);
                }
            }
        }

        Commands::Maintenance { force_vacuum } => {
            println!("{}", "Running maintenance...".cyan().bold());
            println!();

            let params = json!({ "force_vacuum": force_vacuum });
            match client.call("admin.maintenance.v1", params).await {
                Ok(result) => {
                    if cli.json {
                        return print_json(&result);
                    }
                    println!("  ✓ Maintenance completed");
                    if result["vacuum_run"].as_bool().unwrap_or(false) {
                        println!("  {} VACUUM executed", "✓".green());
                    } else {
                        println!("  ○ VACUUM skipped (not needed)");
                    }
                    println!("  {} {} jobs deleted", "✓".green(), result["jobs_deleted"]);
                    println!(
                        "  {} {} busy blocks deleted",
                        "✓".green(),
                        result["busy_blocks_deleted"]
                    );
                    println!(
                        "  {} {} expired OAuth states deleted",
                        "✓".green(),
                        result["oauth_states_deleted"]
                    );
                    println!(
                        "  {} {} expired rate limit counters deleted",
                        "✓".green(),
                        result["rate_limit_counters_deleted"]
                    );
                    let before =
                        result["db_size_before"].as_i64().unwrap_or(0) as f64 / (1024.0 * 1024.0);
                    let after =
                        result["db_size_after"].as_i64().unwrap_or(0) as f64 / (1024.0 * 1024.0);
                    println!("  {} {:.2} MB → {:.2} MB", "DB Size:".bold(), before, after);
                }
                Err(e) => {
                    println!("  {} Maintenance failed: {}", "✗".red(), e);
                }
            }
        }
    }

    Ok(())
}

async fn availability(cli: &Cli, client: &RpcClient, cmd: &AvailabilityCommand) -> Result<()> {
    let tenant_id = cli.tenant()?;
    match cmd {
        AvailabilityCommand::Hours { user, days } => {
            let entries = days
                .iter()
                .map(|d| parse_working_hours(d))
                .collect::<Result<Vec<_>>>()?;
            let params = json!({
                "tenant_id": tenant_id,
                "user_id": user,
                "entries": entries,
            });
            let result = client
                .call("availability.working_hours.set.v1", params)
                .await?;
            if !cli.json {
                success(format!("Working hours saved for {}", user));
            }
            print_json(&result)?;
        }
        AvailabilityCommand::BusyAdd {
            user,
            start,
            end,
            title,
        } => {
            let params = json!({
                "tenant_id": tenant_id,
                "user_id": user,
                "start": parse_time(start)?,
                "end": parse_time(end)?,
                "title": title,
            });
            let result = client.call("availability.busy.add.v1", params).await?;
            if cli.json {
                return print_json(&result);
            }
            success("Busy block added");
            println!("{}", Table::new(vec![BusyRow::from(&result)]).to_string());
        }
        AvailabilityCommand::BusyList { user, start, end } => {
            let params = json!({
                "tenant_id": tenant_id,
                "user_id": user,
                "start": parse_time(start)?,
                "end": parse_time(end)?,
            });
            let result = client.call("availability.busy.list.v1", params).await?;
            if cli.json {
                return print_json(&result);
            }
            let blocks: Vec<BusyRow> = rows(&result, "blocks");
            if blocks.is_empty() {
                println!("{}", "No busy blocks".yellow());
            } else {
                println!("{}", Table::new(blocks).to_string());
            }
        }
        AvailabilityCommand::BusyRemove { block_id } => {
            let params = json!({ "tenant_id": tenant_id, "block_id": block_id });
            client.call("availability.busy.remove.v1", params).await?;
            success(format!("Busy block {} removed", block_id));
        }
    }
    Ok(())
}

async fn interview(cli: &Cli, client: &RpcClient, cmd: &InterviewCommand) -> Result<()> {
    let tenant_id = cli.tenant()?;
    let (method, params, message) = match cmd {
        InterviewCommand::Schedule {
            candidate,
            interviewers,
            start,
            end,
            title,
        } => (
            "interview.schedule.v1",
            json!({
                "tenant_id": tenant_id,
                "candidate_id": candidate,
                "interviewer_ids": interviewers,
                "start": parse_time(start)?,
                "end": parse_time(end)?,
                "title": title,
            }),
            Some("Interview scheduled"),
        ),
        InterviewCommand::Reschedule {
            interview_id,
            start,
            end,
        } => (
            "interview.reschedule.v1",
            json!({
                "tenant_id": tenant_id,
                "interview_id": interview_id,
                "start": parse_time(start)?,
                "end": parse_time(end)?,
            }),
            Some("Interview rescheduled"),
        ),
        InterviewCommand::Confirm { interview_id } => (
            "interview.confirm.v1",
            json!({ "tenant_id": tenant_id, "interview_id": interview_id }),
            Some("Interview confirmed"),
        ),
        InterviewCommand::Complete { interview_id } => (
            "interview.complete.v1",
            json!({ "tenant_id": tenant_id, "interview_id": interview_id }),
            Some("Interview completed"),
        ),
        InterviewCommand::Cancel { interview_id } => (
            "interview.cancel.v1",
            json!({ "tenant_id": tenant_id, "interview_id": interview_id }),
            Some("Interview cancelled"),
        ),
        InterviewCommand::Get { interview_id } => (
            "interview.get.v1",
            json!({ "tenant_id": tenant_id, "interview_id": interview_id }),
            None,
        ),
    };

    let result = client.call(method, params).await?;
    if cli.json {
        return print_json(&result);
    }
    if let Some(message) = message {
        success(message);
    }
    print_interview(&result);
    Ok(())
}

async fn calendar(cli: &Cli, client: &RpcClient, cmd: &CalendarCommand) -> Result<()> {
    match cmd {
        CalendarCommand::Connect { user, provider } => {
            let provider = match provider {
                Provider::Google => "GOOGLE",
                Provider::Microsoft => "MICROSOFT",
            };
            let params = json!({
                "tenant_id": cli.tenant()?,
                "user_id": user,
                "provider": provider,
            });
            let result = client.call("oauth.authorize.v1", params).await?;
            if cli.json {
                return print_json(&result);
            }
            println!("{}", "Open this URL to grant calendar access:".cyan().bold());
            println!("{}", result["authorization_url"].as_str().unwrap_or("-"));
            println!("  {} {}", "State:".bold(), result["state"].as_str().unwrap_or("-"));
        }
        CalendarCommand::Callback { state, code } => {
            let params = json!({ "state": state, "code": code });
            let result = client.call("oauth.callback.v1", params).await?;
            if cli.json {
                return print_json(&result);
            }
            success(format!(
                "Calendar connected: {} ({})",
                result["connection_id"].as_str().unwrap_or("-"),
                result["provider"].as_str().unwrap_or("-")
            ));
        }
        CalendarCommand::Sync { connection_id } => {
            let params = json!({ "tenant_id": cli.tenant()?, "connection_id": connection_id });
            let result = client.call("calendar.sync.v1", params).await?;
            if cli.json {
                return print_json(&result);
            }
            match result["outcome"].as_str() {
                Some("SYNCED") => success(format!(
                    "Synced {} busy block(s), replaced {}",
                    result["blocks"], result["removed"]
                )),
                Some("SKIPPED") => println!(
                    "{} {}",
                    "○ Sync skipped:".yellow(),
                    result["reason"].as_str().unwrap_or("-")
                ),
                _ => println!(
                    "{} {}",
                    "✗ Sync failed:".red(),
                    result["reason"].as_str().unwrap_or("-")
                ),
            }
        }
        CalendarCommand::Disconnect { connection_id } => {
            let params = json!({ "tenant_id": cli.tenant()?, "connection_id": connection_id });
            let result = client.call("calendar.disconnect.v1", params).await?;
            if cli.json {
                return print_json(&result);
            }
            success(format!("Calendar {} disconnected", connection_id));
            println!(
                "  {} {}",
                "Last synced:".bold(),
                fmt_time(&result["last_synced_at"])
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_slots_command() {
        let cli = Cli::try_parse_from([
            "hireloopctl",
            "--tenant",
            "acme",
            "slots",
            "--required",
            "u-1",
            "--required",
            "u-2",
            "--duration",
            "45",
        ])
        .unwrap();

        assert_eq!(cli.tenant.as_deref(), Some("acme"));
        match cli.command {
            Commands::Slots {
                required, duration, ..
            } => {
                assert_eq!(required, vec!["u-1", "u-2"]);
                assert_eq!(duration, 45);
            }
            _ => panic!("expected slots command"),
        }
    }

    #[test]
    fn test_tenant_required_for_scoped_commands() {
        let cli = Cli::try_parse_from(["hireloopctl", "user", "list"]).unwrap();
        assert!(cli.tenant().is_err());
    }
}
