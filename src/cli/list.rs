//! Read-only listing commands for programs, targets and observations

use anyhow::{Context, Result, bail};

use ferri::recon::{Program, ReconManager};

use super::CliContext;

/// Resolve a program by name, falling back to a numeric id
fn find_program(manager: &ReconManager, program: &str) -> Result<Program> {
    let program = program.trim();
    if let Some(found) = manager.get_program_by_name(program)? {
        return Ok(found);
    }
    if let Ok(id) = program.parse::<i64>() {
        if let Some(found) = manager.programs().get(id)? {
            return Ok(found);
        }
    }
    bail!("Program not found: {}\nList programs with: ferri programs", program)
}

/// List all programs with their target counts
pub fn programs(ctx: &CliContext, json: bool) -> Result<()> {
    let manager = ctx.open_manager()?;
    let programs = manager.list_programs()?;

    if json {
        #[derive(serde::Serialize)]
        struct ProgramListItem {
            #[serde(flatten)]
            program: Program,
            targets_total: usize,
        }

        let mut items = Vec::with_capacity(programs.len());
        for program in programs {
            let targets_total = manager.targets().count_by_program(program.id)?;
            items.push(ProgramListItem {
                program,
                targets_total,
            });
        }
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if programs.is_empty() {
        println!("No programs found.");
        println!("Ingest some recon output with: subfinder -d example.com | ferri");
        return Ok(());
    }

    println!("{:<6} {:<24} {:<8} {:<40}", "ID", "NAME", "TARGETS", "SCOPE");
    println!("{}", "-".repeat(80));
    for program in &programs {
        let count = manager.targets().count_by_program(program.id)?;
        println!(
            "{:<6} {:<24} {:<8} {:<40}",
            program.id,
            program.name,
            count,
            program.scope.as_deref().unwrap_or("-")
        );
    }

    Ok(())
}

/// List the targets of one program
pub fn targets(ctx: &CliContext, program: &str, alive_only: bool, json: bool) -> Result<()> {
    let manager = ctx.open_manager()?;
    let program = find_program(&manager, program)?;
    let targets = manager.list_targets(program.id, alive_only)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&targets)?);
        return Ok(());
    }

    if targets.is_empty() {
        println!("No targets for program {} (ID: {})", program.name, program.id);
        return Ok(());
    }

    println!(
        "{:<6} {:<10} {:<6} {:<14} {:<50}",
        "ID", "TYPE", "ALIVE", "SOURCE", "TARGET"
    );
    println!("{}", "-".repeat(90));
    for target in &targets {
        println!(
            "{:<6} {:<10} {:<6} {:<14} {:<50}",
            target.id,
            target.target_type.as_str(),
            if target.alive { "yes" } else { "-" },
            target.source.as_deref().unwrap_or("-"),
            target.target
        );
    }
    println!("\n{} target(s)", targets.len());

    Ok(())
}

/// List the observation trail of one target
pub fn recon(ctx: &CliContext, target_id: i64, json: bool) -> Result<()> {
    let manager = ctx.open_manager()?;
    let target = manager
        .targets()
        .get(target_id)?
        .with_context(|| format!("Target not found: {}", target_id))?;
    let observations = manager.recon_data().list_by_target(target.id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&observations)?);
        return Ok(());
    }

    println!("{} ({})", target.target, target.target_type);
    if observations.is_empty() {
        println!("  No observations.");
        return Ok(());
    }
    for obs in &observations {
        println!(
            "  {}  {:<14} {}",
            obs.timestamp.format("%Y-%m-%d %H:%M:%S"),
            obs.tool,
            obs.context.as_deref().unwrap_or("")
        );
    }

    Ok(())
}
