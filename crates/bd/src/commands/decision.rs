//! `bd decision` -- human-in-the-loop decision gates.

use std::time::Duration;

use anyhow::{bail, Context, Result};

use beads_core::decision::{DecisionOption, DecisionPoint};
use beads_core::enums::{IssueType, GATE_TYPE};
use beads_core::idgen;
use beads_core::issue::IssueBuilder;
use beads_daemon::{stop_check, wait_for_decision, WaitOptions};
use beads_storage::{DecisionResponseInput, Storage};

use crate::cli::{DecisionArgs, DecisionCommands};
use crate::commands::resolve_id;
use crate::context::RuntimeContext;
use crate::output::{output_json, parse_duration_secs};
use crate::rpc;

/// Execute the `bd decision` command.
pub fn run(ctx: &RuntimeContext, args: &DecisionArgs) -> Result<()> {
    match &args.command {
        DecisionCommands::Create {
            prompt,
            title,
            options,
            default,
            timeout,
            urgency,
        } => cmd_create(ctx, prompt, title.as_deref(), options, default.as_deref(), timeout.as_deref(), urgency.as_deref()),
        DecisionCommands::Respond {
            id,
            selected,
            text,
            rationale,
            guidance,
        } => cmd_respond(ctx, id, selected, text.as_deref(), rationale.as_deref(), guidance.as_deref()),
        DecisionCommands::List => cmd_list(ctx),
        DecisionCommands::Get { id } => cmd_get(ctx, id),
        DecisionCommands::Watch { id, timeout } => cmd_watch(ctx, id, timeout.as_deref()),
        DecisionCommands::Remind { id } => cmd_remind(ctx, id),
        DecisionCommands::StopCheck => cmd_stop_check(ctx),
    }
}

/// Parses an `id:short:label` option spec; missing parts default from the id.
fn parse_option(spec: &str) -> DecisionOption {
    let mut parts = spec.splitn(3, ':');
    let id = parts.next().unwrap_or(spec).to_owned();
    let short = parts.next().unwrap_or("").to_owned();
    let label = parts.next().unwrap_or("").to_owned();
    DecisionOption { id, short, label }
}

#[allow(clippy::too_many_arguments)]
fn cmd_create(
    ctx: &RuntimeContext,
    prompt: &str,
    title: Option<&str>,
    option_specs: &[String],
    default: Option<&str>,
    timeout: Option<&str>,
    urgency: Option<&str>,
) -> Result<()> {
    let workspace = ctx.workspace()?;
    let store = ctx.open_store(&workspace)?;

    let timeout_secs = match timeout {
        Some(raw) => parse_duration_secs(raw).context("parsing --timeout")?,
        None => 0,
    };

    let mut gate = IssueBuilder::new(title.unwrap_or(prompt))
        .issue_type(IssueType::Custom(GATE_TYPE.into()))
        .await_type("decision")
        .created_by(&ctx.actor)
        .build();
    if timeout_secs > 0 {
        gate.timeout = Some(Duration::from_secs(timeout_secs));
    }

    let prefix = store
        .get_config("issue_prefix")
        .unwrap_or_else(|_| "bd".to_owned());
    let count = store.count_issues()? as usize;
    let length = idgen::compute_adaptive_length(
        count,
        idgen::adaptive_defaults::MIN_LENGTH,
        idgen::adaptive_defaults::MAX_LENGTH,
        idgen::adaptive_defaults::MAX_COLLISION_PROB,
    );

    let mut gate_id = None;
    for nonce in 0..idgen::MAX_NONCE_ATTEMPTS {
        gate.id = idgen::generate_hash_id(
            &prefix,
            &gate.title,
            prompt,
            &ctx.actor,
            gate.created_at,
            length,
            nonce,
        );
        match store.create_issue(&gate, &ctx.actor) {
            Ok(()) => {
                gate_id = Some(gate.id.clone());
                break;
            }
            Err(e) if e.is_conflict() => continue,
            Err(e) => return Err(e.into()),
        }
    }
    let Some(id) = gate_id else {
        bail!("could not find a free gate ID");
    };

    let mut dp = DecisionPoint::new(&id, prompt);
    dp.requested_by = ctx.actor.clone();
    dp.options = option_specs.iter().map(|s| parse_option(s)).collect();
    dp.default_option = default.unwrap_or("").to_owned();
    dp.urgency = urgency.unwrap_or("").to_owned();
    dp.timeout_secs = timeout_secs as i64;
    store.create_decision_point(&dp, &ctx.actor)?;

    if ctx.json {
        output_json(&serde_json::json!({"id": id}));
    } else {
        println!("{id}");
    }
    Ok(())
}

fn cmd_respond(
    ctx: &RuntimeContext,
    id: &str,
    selected: &str,
    text: Option<&str>,
    rationale: Option<&str>,
    guidance: Option<&str>,
) -> Result<()> {
    let workspace = ctx.workspace()?;
    let store = ctx.open_store(&workspace)?;
    let id = resolve_id(&store, id)?;

    // Route through the daemon when one is up: the response commits there
    // and its event bus wakes blocked waiters immediately. Pollers converge
    // on the store either way.
    let socket = workspace.paths.socket_path();
    let dp = if rpc::daemon_available(&socket) {
        let data = rpc::call(
            &socket,
            "decisionRespond",
            serde_json::json!({
                "id": id,
                "selected": selected,
                "text": text.unwrap_or(""),
                "rationale": rationale.unwrap_or(""),
                "guidance": guidance.unwrap_or(""),
                "actor": ctx.actor,
            }),
            Duration::from_secs(10),
        )?;
        serde_json::from_value(data)?
    } else {
        let response = DecisionResponseInput {
            selected_option: selected.to_owned(),
            response_text: text.unwrap_or("").to_owned(),
            rationale: rationale.unwrap_or("").to_owned(),
            guidance: guidance.unwrap_or("").to_owned(),
        };
        store.respond_decision(&id, &response, &ctx.actor)?
    };

    if ctx.json {
        output_json(&dp);
    } else if !ctx.quiet {
        println!("Recorded {} for {id}", dp.selected_option);
    }
    Ok(())
}

fn cmd_list(ctx: &RuntimeContext) -> Result<()> {
    let workspace = ctx.workspace()?;
    let store = ctx.open_store(&workspace)?;
    let pending = store.list_pending_decisions()?;

    if ctx.json {
        output_json(&pending);
    } else if pending.is_empty() {
        println!("No pending decisions.");
    } else {
        for dp in &pending {
            println!(
                "{}  [{}]  {}",
                dp.issue_id,
                dp.requested_by,
                dp.prompt
            );
        }
    }
    Ok(())
}

fn cmd_get(ctx: &RuntimeContext, id: &str) -> Result<()> {
    let workspace = ctx.workspace()?;
    let store = ctx.open_store(&workspace)?;
    let id = resolve_id(&store, id)?;
    let dp = store.get_decision_point(&id)?;

    if ctx.json {
        output_json(&dp);
    } else {
        println!("{}: {}", dp.issue_id, dp.prompt);
        for option in &dp.options {
            println!("  {} ({}): {}", option.id, option.short, option.label);
        }
        if dp.is_responded() {
            println!("Responded: {} -- {}", dp.selected_option, dp.response_text);
        } else {
            println!("Pending (requested by {})", dp.requested_by);
        }
    }
    Ok(())
}

fn cmd_watch(ctx: &RuntimeContext, id: &str, timeout: Option<&str>) -> Result<()> {
    let workspace = ctx.workspace()?;
    let store = ctx.open_store(&workspace)?;
    let id = resolve_id(&store, id)?;

    let timeout_secs = match timeout {
        Some(raw) => parse_duration_secs(raw).context("parsing --timeout")?,
        None => 300,
    };

    // Prefer the daemon: its event bus wakes the waiter the moment the
    // response commits. The local polling wait is the bus-less fallback.
    let socket = workspace.paths.socket_path();
    let response = if rpc::daemon_available(&socket) {
        let data = rpc::call(
            &socket,
            "decisionWait",
            serde_json::json!({"id": id, "timeout_secs": timeout_secs}),
            Duration::from_secs(timeout_secs + 5),
        )?;
        serde_json::from_value(data)?
    } else {
        let options = WaitOptions {
            timeout: Duration::from_secs(timeout_secs),
            ..Default::default()
        };
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;
        runtime.block_on(wait_for_decision(&store, None, &id, &options))?
    };

    if ctx.json {
        output_json(&response);
    } else if response.is_empty() {
        println!("No response within {timeout_secs}s.");
    } else {
        println!("{}  {}", response.selected_option, response.response_text);
    }
    Ok(())
}

fn cmd_remind(ctx: &RuntimeContext, id: &str) -> Result<()> {
    let workspace = ctx.workspace()?;
    let store = ctx.open_store(&workspace)?;
    let id = resolve_id(&store, id)?;

    let mut dp = store.get_decision_point(&id)?;
    if dp.is_responded() {
        bail!("decision {id} already responded");
    }
    dp.reminder_count += 1;
    store.update_decision_point(&dp)?;

    if ctx.json {
        output_json(&serde_json::json!({"id": id, "reminder_count": dp.reminder_count}));
    } else if !ctx.quiet {
        println!("Reminder {} sent for {id}", dp.reminder_count);
    }
    Ok(())
}

/// Exit 0 = allow the agent to yield; exit 1 = block with guidance.
fn cmd_stop_check(ctx: &RuntimeContext) -> Result<()> {
    let workspace = ctx.workspace()?;
    let store = ctx.open_store(&workspace)?;

    let outcome = stop_check(&store, &ctx.actor)?;
    if ctx.json {
        output_json(&serde_json::json!({
            "allow": outcome.allow,
            "reason": outcome.reason,
            "decision_id": outcome.decision_id,
        }));
    } else {
        println!("{}", outcome.reason);
    }
    std::process::exit(if outcome.allow { 0 } else { 1 });
}
